use std::sync::LazyLock;

use regex::Regex;

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\r\n?|[\u{2028}\u{2029}]").expect("valid pattern"));

// `function name(a, b) {`, `async function () {`, `(done) => {`, `done => {`
static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:async\s+)?(?:function\s*[\w$]*\s*\([^)]*\)|\([^)]*\)\s*=>|[\w$]+\s*=>)\s*\{")
        .expect("valid pattern")
});

static CLOSING_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\}$").expect("valid pattern"));

/// Reduce a test function's source to its dedented body.
///
/// The indentation unit is taken from the first body line: a run of tabs if it
/// starts with tabs, otherwise its run of spaces. That many units are removed
/// from the start of every line.
pub fn clean(source: &str) -> String {
    let normalized = LINE_BREAKS.replace_all(source, "\n");
    let normalized = normalized.strip_prefix('\u{feff}').unwrap_or(&normalized);
    let body = SIGNATURE.replace(normalized, "");
    let body = CLOSING_BRACE.replace(&body, "");

    let first = body.strip_prefix('\n').unwrap_or(&body);
    let tabs = first.chars().take_while(|&c| c == '\t').count();
    let spaces = first.chars().take_while(|&c| c == ' ').count();
    let (unit, count) = if tabs > 0 { ('\t', tabs) } else { (' ', spaces) };

    let indent = Regex::new(&format!(r"(?m)^\n?{}{{{}}}", regex::escape(&unit.to_string()), count));
    match indent {
        Ok(indent) => indent.replace_all(&body, "").trim().to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_signature_braces_and_indentation() {
        let source = "function () {\n    var a = 1;\n    if (a) {\n      a++;\n    }\n  }";
        assert_eq!(clean(source), "var a = 1;\nif (a) {\n  a++;\n}");
    }

    #[test]
    fn handles_tab_indentation() {
        let source = "function(done){\n\t\tdone();\n\t\tdone();\n\t}";
        assert_eq!(clean(source), "done();\ndone();");
    }

    #[test]
    fn handles_arrow_functions() {
        assert_eq!(clean("() => {\n  expect(1)\n}"), "expect(1)");
        assert_eq!(clean("async done => {\n  await done()\n}"), "await done()");
    }

    #[test]
    fn normalizes_line_endings_and_bom() {
        let source = "\u{feff}function () {\r\n  a();\r  b();\u{2028}  c();\n}";
        assert_eq!(clean(source), "a();\nb();\nc();");
    }

    #[test]
    fn leaves_unrecognized_sources_trimmed() {
        assert_eq!(clean("  plain text  "), "plain text");
        assert_eq!(clean(""), "");
    }
}
