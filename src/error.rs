use thiserror::Error;

/// Errors raised while building report markup.
///
/// None of these escape an event handler: the renderer logs them and skips the
/// offending node. They surface directly only from `use_reporter`, whose
/// templates are fixed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("template expects argument {index} but only {given} were supplied")]
    MissingArgument { index: usize, given: usize },

    #[error("malformed markup at byte {offset}: {reason}")]
    Markup { offset: usize, reason: String },

    #[error("unclosed <{tag}> in fragment")]
    Unclosed { tag: String },

    #[error("closing </{found}> does not match open <{expected}>")]
    Mismatched { expected: String, found: String },

    #[error("fragment must have exactly one root element, found {count}")]
    RootCount { count: usize },

    #[error("template is missing element `{0}`")]
    MissingElement(&'static str),
}

pub type Result<T> = std::result::Result<T, ReportError>;
