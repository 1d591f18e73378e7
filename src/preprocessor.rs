//! Preprocessor
//!
//! Turns source text into token text: comments removed, statement ends and
//! indentation changes made explicit as markers, and a [`LineMap`] from every
//! line of the result back to the source.
//!
//! ```text
//! fun add(a, b)          fun add(a, b)#[ENDL]#
//!     a + b        =>        #[INDENT]#a + b#[ENDL]#
//!                        #[DEDENT]#
//! ```
//!
//! Stages, in order (see [`pipeline::PREPROCESSING`]):
//!
//!     1. strip block comments `#[ ... ]#` (nestable)
//!     2. strip line comments `# ...`
//!     3. escape newlines inside brackets
//!     4. mark statement ends
//!     5. encode indentation
//!     6. restore escaped newlines

mod brackets;
mod comments;
mod indentation;
pub mod line_map;
pub mod markers;
pub mod pipeline;

use serde::Serialize;
use tracing::debug;

pub use comments::strip_block_comments;
pub use indentation::{encode_indentation, find_indent_unit};
pub use line_map::LineMap;

use crate::error::PreprocessError;
use pipeline::PREPROCESSING;

/// Result of preprocessing one source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preprocessed {
    pub text: String,
    pub line_map: LineMap,
    /// Indentation unit, empty when nothing is indented
    pub indent_unit: String,
}

pub fn preprocess(source: &str) -> Result<Preprocessed, PreprocessError> {
    let preprocessed = PREPROCESSING.run(source.to_string())?;
    debug!(
        lines = preprocessed.line_map.len(),
        indent_unit = ?preprocessed.indent_unit,
        "preprocessed source"
    );
    Ok(preprocessed)
}
