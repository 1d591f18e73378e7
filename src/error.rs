//! Error types for the front end
//!
//! Every error that can be traced back to the source carries the original
//! (pre-preprocessing) line number, 1-based.

use std::fmt;
use std::path::PathBuf;

use keyform_peg::CompileError;

/// Why a block comment is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentError {
    /// A close marker at depth 0
    TooManyCloses,
    /// Open markers left unclosed at end of input
    Unterminated { depth: usize },
}

/// Why a line's indentation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentationError {
    /// Leading whitespace other than spaces or tabs
    InvalidWhitespace,
    /// Leading whitespace mixing two characters
    MixedIndentation,
    /// Indentation that is not a whole number of units
    InconsistentUnit,
}

impl fmt::Display for IndentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndentationError::InvalidWhitespace => write!(f, "invalid whitespace"),
            IndentationError::MixedIndentation => write!(f, "mixed indentation"),
            IndentationError::InconsistentUnit => write!(f, "inconsistent indentation unit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    MalformedComment { reason: CommentError, line: usize },
    InvalidIndentation { reason: IndentationError, line: usize },
    UnbalancedBrackets { line: usize },
}

impl PreprocessError {
    pub fn line(&self) -> usize {
        match self {
            PreprocessError::MalformedComment { line, .. }
            | PreprocessError::InvalidIndentation { line, .. }
            | PreprocessError::UnbalancedBrackets { line } => *line,
        }
    }
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::MalformedComment {
                reason: CommentError::TooManyCloses,
                ..
            } => write!(f, "too many close comments"),
            PreprocessError::MalformedComment {
                reason: CommentError::Unterminated { depth },
                ..
            } => write!(f, "unmatched block comment (depth {} at end of input)", depth),
            PreprocessError::InvalidIndentation { reason, .. } => write!(f, "{}", reason),
            PreprocessError::UnbalancedBrackets { .. } => write!(f, "unbalanced brackets"),
        }
    }
}

impl std::error::Error for PreprocessError {}

#[derive(Debug, Clone, PartialEq)]
pub enum GrammarError {
    /// A reference with no rule of that name in the grammar
    UndefinedRule { rule: String, name: String },
    /// Slicing from a rule the grammar does not define
    UnknownRoot { name: String },
    /// The engine rejected the rendered description
    Compile { grammar: String, source: CompileError },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UndefinedRule { rule, name } => {
                write!(f, "rule '{}' references undefined rule '{}'", rule, name)
            }
            GrammarError::UnknownRoot { name } => write!(f, "no rule named '{}'", name),
            GrammarError::Compile { grammar, source } => {
                write!(f, "cannot compile grammar {}: {}", grammar, source)
            }
        }
    }
}

impl std::error::Error for GrammarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrammarError::Compile { source, .. } => Some(source),
            GrammarError::UndefinedRule { .. } | GrammarError::UnknownRoot { .. } => None,
        }
    }
}

/// The compiled parser could not match its input.
///
/// `line` is an original source line; `column` is relative to the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub grammar: String,
    pub line: usize,
    pub column: usize,
    pub expected: Vec<String>,
    /// Set when a construction action rejected the match
    pub detail: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parse error", self.grammar)?;
        if let Some(detail) = &self.detail {
            return write!(f, ": {}", detail);
        }
        write!(f, " at column {}", self.column)?;
        if !self.expected.is_empty() {
            write!(f, ": expected {}", self.expected.join(" or "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKeyword {
    pub keyword: String,
    pub line: usize,
}

impl fmt::Display for UnknownKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown keyword '{}'", self.keyword)
    }
}

impl std::error::Error for UnknownKeyword {}

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorError {
    /// Two associativities registered at the same precedence level
    MixedAssociativity {
        op: String,
        precedence: u32,
        existing: String,
        requested: String,
    },
    /// The same operator registered twice
    DuplicateOperator { op: String },
    /// A flat sequence that the synthesized grammar does not accept
    Unresolvable { sequence: String, line: usize },
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorError::MixedAssociativity {
                op,
                precedence,
                existing,
                requested,
            } => write!(
                f,
                "operator '{}' is {} but precedence {} is already {}",
                op, requested, precedence, existing
            ),
            OperatorError::DuplicateOperator { op } => {
                write!(f, "operator '{}' is defined more than once", op)
            }
            OperatorError::Unresolvable { sequence, .. } => {
                write!(f, "cannot resolve operators in '{}'", sequence)
            }
        }
    }
}

impl std::error::Error for OperatorError {}

/// Any failure of a front-end run.
#[derive(Debug)]
pub enum FrontendError {
    Preprocess(PreprocessError),
    Grammar(GrammarError),
    Parse(ParseError),
    UnknownKeyword(UnknownKeyword),
    Operator(OperatorError),
    Config(config::ConfigError),
    Io { path: PathBuf, source: std::io::Error },
}

impl FrontendError {
    /// Original 1-based source line, where the error has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            FrontendError::Preprocess(e) => Some(e.line()),
            FrontendError::Parse(e) => Some(e.line),
            FrontendError::UnknownKeyword(e) => Some(e.line),
            FrontendError::Operator(OperatorError::Unresolvable { line, .. }) => Some(*line),
            FrontendError::Operator(_)
            | FrontendError::Grammar(_)
            | FrontendError::Config(_)
            | FrontendError::Io { .. } => None,
        }
    }
}

impl fmt::Display for FrontendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontendError::Preprocess(e) => write!(f, "{}", e)?,
            FrontendError::Grammar(e) => write!(f, "{}", e)?,
            FrontendError::Parse(e) => write!(f, "{}", e)?,
            FrontendError::UnknownKeyword(e) => write!(f, "{}", e)?,
            FrontendError::Operator(e) => write!(f, "{}", e)?,
            FrontendError::Config(e) => write!(f, "configuration error: {}", e)?,
            FrontendError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)?
            }
        }
        if let Some(line) = self.line() {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for FrontendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrontendError::Preprocess(e) => Some(e),
            FrontendError::Grammar(e) => Some(e),
            FrontendError::Parse(e) => Some(e),
            FrontendError::UnknownKeyword(e) => Some(e),
            FrontendError::Operator(e) => Some(e),
            FrontendError::Config(e) => Some(e),
            FrontendError::Io { source, .. } => Some(source),
        }
    }
}

impl From<PreprocessError> for FrontendError {
    fn from(e: PreprocessError) -> Self {
        FrontendError::Preprocess(e)
    }
}

impl From<GrammarError> for FrontendError {
    fn from(e: GrammarError) -> Self {
        FrontendError::Grammar(e)
    }
}

impl From<ParseError> for FrontendError {
    fn from(e: ParseError) -> Self {
        FrontendError::Parse(e)
    }
}

impl From<UnknownKeyword> for FrontendError {
    fn from(e: UnknownKeyword) -> Self {
        FrontendError::UnknownKeyword(e)
    }
}

impl From<OperatorError> for FrontendError {
    fn from(e: OperatorError) -> Self {
        FrontendError::Operator(e)
    }
}

impl From<config::ConfigError> for FrontendError {
    fn from(e: config::ConfigError) -> Self {
        FrontendError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_appends_line() {
        let err = FrontendError::from(PreprocessError::InvalidIndentation {
            reason: IndentationError::MixedIndentation,
            line: 4,
        });
        assert_eq!(err.to_string(), "mixed indentation (line 4)");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            grammar: "structural".into(),
            line: 2,
            column: 5,
            expected: vec!["'='".into(), "'#[ENDL]#'".into()],
            detail: None,
        };
        assert_eq!(
            FrontendError::from(err).to_string(),
            "structural parse error at column 5: expected '=' or '#[ENDL]#' (line 2)"
        );
    }

    #[test]
    fn test_lineless_errors() {
        let err = FrontendError::from(OperatorError::DuplicateOperator { op: "+".into() });
        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "operator '+' is defined more than once");
    }
}
