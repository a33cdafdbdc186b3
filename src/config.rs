use std::path::Path;

use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "hydro.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

/// How the report is rendered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Id of the element the report mounts into. Created under `<body>` if missing.
    pub root_id: String,
    /// Query parameter used by suite and test deep links.
    pub focus_param: String,
    pub highlight: bool,
    /// Double-clicking a test heading requests its focus view.
    pub focus_on_dblclick: bool,
    /// `<title>` of the written page.
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            root_id: "hydro".to_string(),
            focus_param: "focus".to_string(),
            highlight: true,
            focus_on_dblclick: true,
            title: "Hydro".to_string(),
        }
    }
}

/// Where lifecycle events come from when no input file is given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Engine command emitting NDJSON events on stdout.
    /// Example: "node run-tests.js --reporter ndjson"
    pub command: Option<String>,
    /// Threshold used to derive a speed for results that carry none.
    pub slow_ms: Option<u64>,
}

impl Config {
    /// Load `hydro.toml` from the working directory, falling back to defaults if absent or invalid.
    pub fn load(workspace: &Path) -> Self {
        Self::load_from(&workspace.join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring invalid config");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path());
        assert_eq!(config.report.root_id, "hydro");
        assert_eq!(config.report.focus_param, "focus");
        assert!(config.report.highlight);
        assert!(config.source.command.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[report]\nfocus_param = \"grep\"\nhighlight = false\n\n[source]\nslow_ms = 40\n",
        )
        .unwrap();

        let config = Config::load(dir.path());
        assert_eq!(config.report.focus_param, "grep");
        assert!(!config.report.highlight);
        assert_eq!(config.report.title, "Hydro");
        assert_eq!(config.source.slow_ms, Some(40));
    }

    #[test]
    fn invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[report\nroot_id = 3").unwrap();
        assert_eq!(Config::load_from(&path).report.root_id, "hydro");
    }
}
