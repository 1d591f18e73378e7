//! Preprocessing pipeline infrastructure
//!
//! Stages implement [`Runnable`] and are chained into a [`Transform`] with
//! `.then()`; the compiler checks that each stage's input matches the output
//! of the one before. The standard chain is built once in [`PREPROCESSING`].
//!
//! ```rust,ignore
//! let pipeline = Transform::from_fn(|source: String| Ok(Staged::new(source)))
//!     .then(StripBlockComments)
//!     .then(StripLineComments);
//! ```

use once_cell::sync::Lazy;
use tracing::trace;

use super::brackets::{EscapeInnerNewlines, RestoreInnerNewlines};
use super::comments::{StripBlockComments, StripLineComments};
use super::indentation::{EncodeIndentation, MarkStatementEnds};
use super::line_map::LineMap;
use super::Preprocessed;
use crate::error::PreprocessError;

/// A single preprocessing stage.
pub trait Runnable<I, O> {
    fn run(&self, input: I) -> Result<O, PreprocessError>;
}

/// A composable chain of stages from `I` to `O`.
pub struct Transform<I, O> {
    run_fn: Box<dyn Fn(I) -> Result<O, PreprocessError> + Send + Sync>,
}

impl<I, O> Transform<I, O> {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(I) -> Result<O, PreprocessError> + Send + Sync + 'static,
    {
        Transform {
            run_fn: Box::new(f),
        }
    }

    /// Feed this transform's output into `stage`.
    pub fn then<O2, S>(self, stage: S) -> Transform<I, O2>
    where
        S: Runnable<O, O2> + Send + Sync + 'static,
        I: 'static,
        O: 'static,
        O2: 'static,
    {
        let prev_run = self.run_fn;
        Transform {
            run_fn: Box::new(move |input| {
                let intermediate = prev_run(input)?;
                stage.run(intermediate)
            }),
        }
    }

    pub fn run(&self, input: I) -> Result<O, PreprocessError> {
        (self.run_fn)(input)
    }
}

impl<I: 'static, O: 'static> Runnable<I, O> for Transform<I, O> {
    fn run(&self, input: I) -> Result<O, PreprocessError> {
        Transform::run(self, input)
    }
}

/// Text between stages, with the line maps needed to report source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    pub text: String,
    /// Source line of every line of `text`
    pub lines: LineMap,
    /// Source line of every statement line, once bracketed newlines are escaped
    pub statement_lines: LineMap,
    pub indent_unit: String,
}

impl Staged {
    /// Start from raw source. A missing final newline is added so the last
    /// statement gets terminated like the others.
    pub fn new(mut source: String) -> Self {
        if !source.ends_with('\n') {
            source.push('\n');
        }
        let lines = LineMap::identity(&source);
        Staged {
            statement_lines: lines.clone(),
            lines,
            text: source,
            indent_unit: String::new(),
        }
    }

    pub(crate) fn traced(self, stage: &str) -> Self {
        trace!(stage, lines = self.lines.len(), "preprocessing stage done");
        self
    }
}

pub type PreprocessTransform = Transform<String, Preprocessed>;

/// Source text to token text.
pub static PREPROCESSING: Lazy<PreprocessTransform> = Lazy::new(|| {
    Transform::from_fn(|source: String| Ok(Staged::new(source)))
        .then(StripBlockComments)
        .then(StripLineComments)
        .then(EscapeInnerNewlines)
        .then(MarkStatementEnds)
        .then(EncodeIndentation)
        .then(RestoreInnerNewlines)
});

#[cfg(test)]
mod tests {
    use super::*;

    struct Shout;
    impl Runnable<Staged, Staged> for Shout {
        fn run(&self, mut input: Staged) -> Result<Staged, PreprocessError> {
            input.text = input.text.to_uppercase();
            Ok(input)
        }
    }

    struct Reject;
    impl Runnable<Staged, Staged> for Reject {
        fn run(&self, _input: Staged) -> Result<Staged, PreprocessError> {
            Err(PreprocessError::UnbalancedBrackets { line: 1 })
        }
    }

    #[test]
    fn test_staged_appends_newline() {
        let staged = Staged::new("a".to_string());
        assert_eq!(staged.text, "a\n");
        assert_eq!(staged.lines.len(), 2);
    }

    #[test]
    fn test_then_chains_stages() {
        let transform = Transform::from_fn(|s: String| Ok(Staged::new(s))).then(Shout);
        assert_eq!(transform.run("ab\n".into()).unwrap().text, "AB\n");
    }

    #[test]
    fn test_error_stops_chain() {
        let transform = Transform::from_fn(|s: String| Ok(Staged::new(s)))
            .then(Reject)
            .then(Shout);
        assert_eq!(
            transform.run("x".into()).unwrap_err(),
            PreprocessError::UnbalancedBrackets { line: 1 }
        );
    }
}
