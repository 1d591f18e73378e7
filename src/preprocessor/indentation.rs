//! Statement ends and indentation markers
//!
//! Every remaining newline ends a statement and gets an ENDL marker. Leading
//! whitespace is then turned into INDENT/DEDENT markers:
//!
//!     1. The leading whitespace of the first indented line is the unit. It
//!        must be a run of one character, space or tab.
//!     2. Every other indented line must use a whole number of units.
//!     3. When the level changes, the markers go right after the line's
//!        leading whitespace. Blank lines keep the current level.
//!     4. DEDENTs back to level 0 are appended at the end of the text.

use super::line_map::LineMap;
use super::markers::{DEDENT, ENDL, INDENT};
use super::pipeline::{Runnable, Staged};
use crate::error::{IndentationError, PreprocessError};

/// Puts an ENDL marker before every newline.
pub struct MarkStatementEnds;

impl Runnable<Staged, Staged> for MarkStatementEnds {
    fn run(&self, input: Staged) -> Result<Staged, PreprocessError> {
        let text = input.text.replace('\n', &format!("{}\n", ENDL));
        Ok(Staged { text, ..input }.traced("mark_statement_ends"))
    }
}

/// Replaces indentation levels with INDENT/DEDENT markers.
pub struct EncodeIndentation;

impl Runnable<Staged, Staged> for EncodeIndentation {
    fn run(&self, input: Staged) -> Result<Staged, PreprocessError> {
        let (text, indent_unit) = encode_indentation(&input.text, &input.statement_lines)?;
        Ok(Staged {
            text,
            indent_unit,
            ..input
        }
        .traced("encode_indentation"))
    }
}

/// A line with only whitespace before its statement end.
fn is_blank(line: &str) -> bool {
    let rest = line.trim_start();
    rest.is_empty() || rest == ENDL
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Check that `whitespace` is a run of one space or tab character.
fn single_run(whitespace: &str) -> Result<char, IndentationError> {
    let mut chars = whitespace.chars();
    let first = chars.next().unwrap_or(' ');
    if !whitespace.chars().all(|c| c == ' ' || c == '\t') {
        return Err(IndentationError::InvalidWhitespace);
    }
    if !chars.all(|c| c == first) {
        return Err(IndentationError::MixedIndentation);
    }
    Ok(first)
}

/// Detect the indentation unit: the leading whitespace of the first
/// non-blank indented line.
pub fn find_indent_unit(text: &str, lines: &LineMap) -> Result<Option<String>, PreprocessError> {
    for (i, line) in text.split('\n').enumerate() {
        let whitespace = leading_whitespace(line);
        if whitespace.is_empty() || is_blank(line) {
            continue;
        }
        return match single_run(whitespace) {
            Ok(_) => Ok(Some(whitespace.to_string())),
            Err(reason) => Err(PreprocessError::InvalidIndentation {
                reason,
                line: lines.report(i),
            }),
        };
    }
    Ok(None)
}

fn indent_level(whitespace: &str, unit: &str) -> Result<usize, IndentationError> {
    if whitespace.is_empty() {
        return Ok(0);
    }
    let c = single_run(whitespace)?;
    if !unit.starts_with(c) || whitespace.len() % unit.len() != 0 {
        return Err(IndentationError::InconsistentUnit);
    }
    Ok(whitespace.len() / unit.len())
}

/// Insert INDENT/DEDENT markers, returning the text and the unit found.
pub fn encode_indentation(text: &str, lines: &LineMap) -> Result<(String, String), PreprocessError> {
    let Some(unit) = find_indent_unit(text, lines)? else {
        return Ok((text.to_string(), String::new()));
    };

    let mut encoded = Vec::new();
    let mut level = 0;
    for (i, line) in text.split('\n').enumerate() {
        if is_blank(line) {
            encoded.push(line.to_string());
            continue;
        }
        let whitespace = leading_whitespace(line);
        let next = indent_level(whitespace, &unit).map_err(|reason| {
            PreprocessError::InvalidIndentation {
                reason,
                line: lines.report(i),
            }
        })?;
        let markers = if next > level {
            INDENT.repeat(next - level)
        } else {
            DEDENT.repeat(level - next)
        };
        encoded.push(format!("{}{}{}", whitespace, markers, &line[whitespace.len()..]));
        level = next;
    }
    if let Some(last) = encoded.last_mut() {
        last.push_str(&DEDENT.repeat(level));
    }
    Ok((encoded.join("\n"), unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> Result<(String, String), PreprocessError> {
        encode_indentation(text, &LineMap::identity(text))
    }

    #[test]
    fn test_no_indentation_is_unchanged() {
        let (text, unit) = encode("a#[ENDL]#\nb#[ENDL]#\n").unwrap();
        assert_eq!(text, "a#[ENDL]#\nb#[ENDL]#\n");
        assert_eq!(unit, "");
    }

    #[test]
    fn test_indent_and_dedent() {
        let (text, unit) = encode("a#[ENDL]#\n  b#[ENDL]#\nc#[ENDL]#\n").unwrap();
        assert_eq!(unit, "  ");
        assert_eq!(text, "a#[ENDL]#\n  #[INDENT]#b#[ENDL]#\n#[DEDENT]#c#[ENDL]#\n");
    }

    #[test]
    fn test_dedent_at_end() {
        let (text, _) = encode("a#[ENDL]#\n\tb#[ENDL]#\n\t\tc#[ENDL]#\n").unwrap();
        assert!(text.ends_with("c#[ENDL]#\n#[DEDENT]##[DEDENT]#"));
    }

    #[test]
    fn test_blank_lines_keep_level() {
        let (text, _) = encode("a#[ENDL]#\n  b#[ENDL]#\n#[ENDL]#\n  c#[ENDL]#\n").unwrap();
        assert_eq!(text.matches(INDENT).count(), 1);
        assert_eq!(text.matches(DEDENT).count(), 1);
    }

    #[test]
    fn test_mixed_unit_rejected() {
        let err = encode("a#[ENDL]#\n\t  b#[ENDL]#\n").unwrap_err();
        assert_eq!(
            err,
            PreprocessError::InvalidIndentation {
                reason: IndentationError::MixedIndentation,
                line: 2
            }
        );
    }

    #[test]
    fn test_non_multiple_rejected() {
        let err = encode("a#[ENDL]#\n  b#[ENDL]#\n   c#[ENDL]#\n").unwrap_err();
        assert_eq!(
            err,
            PreprocessError::InvalidIndentation {
                reason: IndentationError::InconsistentUnit,
                line: 3
            }
        );
    }

    #[test]
    fn test_other_character_rejected() {
        let err = encode("a#[ENDL]#\n  b#[ENDL]#\n\t\tc#[ENDL]#\n").unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::InvalidIndentation {
                reason: IndentationError::InconsistentUnit,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_whitespace() {
        let err = encode("a#[ENDL]#\n\u{a0}b#[ENDL]#\n").unwrap_err();
        assert!(matches!(
            err,
            PreprocessError::InvalidIndentation {
                reason: IndentationError::InvalidWhitespace,
                line: 2
            }
        ));
    }
}
