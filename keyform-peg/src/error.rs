//! Error types for keyform-peg

use thiserror::Error;

/// Errors raised while turning a grammar description into a [`crate::Parser`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("grammar syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("rule '{rule}' references undefined rule '{name}'")]
    UndefinedRule { rule: String, name: String },

    #[error("rule '{rule}' is defined more than once")]
    DuplicateRule { rule: String },

    #[error("rule '{rule}' has an invalid pattern /{pattern}/: {message}")]
    InvalidRegex {
        rule: String,
        pattern: String,
        message: String,
    },
}

/// Errors raised by [`crate::Parser::parse`].
///
/// Lines and columns are 0-based positions in the parsed text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseFailure {
    #[error("no match at line {}, column {}: expected {}", .line + 1, .column + 1, expected_list(.expected))]
    NoMatch {
        position: usize,
        line: usize,
        column: usize,
        expected: Vec<String>,
    },

    #[error("action for rule '{rule}' failed at line {}: {message}", .line + 1)]
    Action {
        rule: String,
        line: usize,
        message: String,
    },

    #[error("unknown start rule '{0}'")]
    UnknownStartRule(String),
}

impl ParseFailure {
    /// 0-based line of the failure, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseFailure::NoMatch { line, .. } | ParseFailure::Action { line, .. } => Some(*line),
            ParseFailure::UnknownStartRule(_) => None,
        }
    }
}

fn expected_list(expected: &[String]) -> String {
    if expected.is_empty() {
        "nothing".to_string()
    } else {
        expected.join(" or ")
    }
}
