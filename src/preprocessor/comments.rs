//! Comment stripping stages
//!
//! Block comments `#[ ... ]#` nest and may span lines; the lines they span
//! are removed from the line map so later stages still report source lines.
//! Line comments run from `#` to the end of the line; the newline stays.

use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;

use super::line_map::LineMap;
use super::pipeline::{Runnable, Staged};
use crate::error::{CommentError, PreprocessError};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum CommentToken {
    #[token("#[")]
    Open,
    #[token("]#")]
    Close,
    #[token("\n")]
    Newline,
    #[regex(r"[^#\]\n]+")]
    Text,
    #[token("#")]
    #[token("]")]
    Stray,
}

/// Removes nested block comments in one forward scan.
pub struct StripBlockComments;

impl Runnable<Staged, Staged> for StripBlockComments {
    fn run(&self, input: Staged) -> Result<Staged, PreprocessError> {
        let (text, lines) = strip_block_comments(&input.text, &input.lines)?;
        Ok(Staged {
            text,
            statement_lines: lines.clone(),
            lines,
            ..input
        }
        .traced("strip_block_comments"))
    }
}

/// Strip block comments from `source`, returning the text and its line map.
pub fn strip_block_comments(
    source: &str,
    source_lines: &LineMap,
) -> Result<(String, LineMap), PreprocessError> {
    let mut text = String::with_capacity(source.len());
    let mut lines = vec![source_lines.original(0)];
    let mut line = 0;
    let mut depth = 0;
    let mut opened_at = 0;

    let mut lexer = CommentToken::lexer(source);
    while let Some(token) = lexer.next() {
        match token {
            Ok(CommentToken::Open) => {
                if depth == 0 {
                    opened_at = line;
                }
                depth += 1;
            }
            Ok(CommentToken::Close) if depth == 0 => {
                return Err(PreprocessError::MalformedComment {
                    reason: CommentError::TooManyCloses,
                    line: source_lines.report(line),
                });
            }
            Ok(CommentToken::Close) => depth -= 1,
            Ok(CommentToken::Newline) => {
                line += 1;
                if depth == 0 {
                    text.push('\n');
                    lines.push(source_lines.original(line));
                }
            }
            Ok(CommentToken::Text) | Ok(CommentToken::Stray) | Err(()) => {
                if depth == 0 {
                    text.push_str(lexer.slice());
                }
            }
        }
    }

    if depth > 0 {
        return Err(PreprocessError::MalformedComment {
            reason: CommentError::Unterminated { depth },
            line: source_lines.report(opened_at),
        });
    }
    Ok((text, LineMap::from_lines(lines)))
}

static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[^\n]*\n").expect("valid regex"));

/// Removes `#` comments up to, not including, the newline.
pub struct StripLineComments;

impl Runnable<Staged, Staged> for StripLineComments {
    fn run(&self, input: Staged) -> Result<Staged, PreprocessError> {
        let text = LINE_COMMENT.replace_all(&input.text, "\n").into_owned();
        Ok(Staged { text, ..input }.traced("strip_line_comments"))
    }
}
