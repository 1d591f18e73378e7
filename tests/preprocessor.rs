//! Preprocessor properties: comment stripping, nesting, indentation encoding
//! and the errors each stage reports.

use keyform::error::{CommentError, IndentationError, PreprocessError};
use keyform::preprocessor::markers::{DEDENT, INDENT};
use keyform::preprocessor::{encode_indentation, preprocess, strip_block_comments, LineMap};
use proptest::prelude::*;
use rstest::rstest;

fn strip(text: &str) -> Result<(String, LineMap), PreprocessError> {
    strip_block_comments(text, &LineMap::identity(text))
}

#[rstest]
#[case("]# x\n", PreprocessError::MalformedComment { reason: CommentError::TooManyCloses, line: 1 })]
#[case(
    "a\n#[ b\n#[ c ]#\n",
    PreprocessError::MalformedComment { reason: CommentError::Unterminated { depth: 1 }, line: 2 }
)]
#[case(
    "a\n    b\n  c\n",
    PreprocessError::InvalidIndentation { reason: IndentationError::InconsistentUnit, line: 3 }
)]
#[case(
    "a\n  b\n\tc\n",
    PreprocessError::InvalidIndentation { reason: IndentationError::InconsistentUnit, line: 3 }
)]
#[case(
    "a\n \tb\n",
    PreprocessError::InvalidIndentation { reason: IndentationError::MixedIndentation, line: 2 }
)]
fn test_preprocess_errors(#[case] source: &str, #[case] expected: PreprocessError) {
    assert_eq!(preprocess(source).unwrap_err(), expected);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
fn test_nested_comments(#[case] depth: usize) {
    let comment = format!("{}x{}", "#[".repeat(depth), "]#".repeat(depth));
    let (text, _) = strip(&format!("a {} b\n", comment)).unwrap();
    assert_eq!(text, "a  b\n");

    let unclosed = format!("{}x{}", "#[".repeat(depth), "]#".repeat(depth - 1));
    assert_eq!(
        strip(&unclosed).unwrap_err(),
        PreprocessError::MalformedComment {
            reason: CommentError::Unterminated { depth: 1 },
            line: 1
        }
    );
}

#[test]
fn test_comment_lines_map_to_source() {
    let source = "x = 1\n#[ two\nthree ]# y = 2\nz = oops +\n";
    let (text, lines) = strip(source).unwrap();
    assert_eq!(text, "x = 1\n y = 2\nz = oops +\n");
    assert_eq!(lines.report(1), 2);
    assert_eq!(lines.report(2), 4);
}

fn words() -> impl Strategy<Value = String> {
    "[a-z]{1,6}( [a-z0-9]{1,6}){0,3}"
}

/// Lines with the indentation level each one asks for.
fn indented_program() -> impl Strategy<Value = Vec<(usize, String)>> {
    prop::collection::vec((0usize..4, words()), 1..12)
}

/// Render `program` so that every line is at most one level deeper than the
/// line before it, starting at level 0.
fn render(program: &[(usize, String)], unit: &str) -> String {
    let mut rendered = Vec::new();
    let mut previous: Option<usize> = None;
    for (level, line) in program {
        let level = previous.map_or(0, |previous| (*level).min(previous + 1));
        rendered.push(format!("{}{}", unit.repeat(level), line));
        previous = Some(level);
    }
    rendered.join("\n") + "\n"
}

proptest! {
    #[test]
    fn comments_leave_no_markers(
        lines in prop::collection::vec(words(), 1..8),
        comment in prop::collection::vec(words(), 1..4),
        at in 0usize..8,
    ) {
        let mut source: Vec<String> = lines.clone();
        let at = at.min(source.len());
        source.insert(at, format!("#[ {} ]#", comment.join("\n")));
        let source = source.join("\n") + "\n";

        let (text, map) = strip(&source).unwrap();
        prop_assert!(!text.contains("#["));
        prop_assert!(!text.contains("]#"));
        prop_assert_eq!(map.len(), text.matches('\n').count() + 1);
        for (i, line) in text.split('\n').enumerate() {
            if let Some(position) = lines.iter().position(|l| l == line) {
                prop_assert!(map.original(i) >= position);
            }
        }
    }

    #[test]
    fn indentation_round_trips(program in indented_program(), unit in prop_oneof![Just("  "), Just("    "), Just("\t")]) {
        let source = render(&program, unit);
        let (encoded, found) = encode_indentation(&source, &LineMap::identity(&source)).unwrap();

        prop_assert_eq!(encoded.matches(INDENT).count(), encoded.matches(DEDENT).count());
        prop_assert_eq!(encoded.replace(INDENT, "").replace(DEDENT, ""), source.clone());
        if source.lines().any(|line| line.starts_with(unit)) {
            prop_assert_eq!(found, unit);
        } else {
            prop_assert_eq!(found, "");
        }
    }

    #[test]
    fn preprocess_never_loses_lines(program in indented_program()) {
        let source = render(&program, "    ");
        let out = preprocess(&source).unwrap();
        prop_assert_eq!(out.line_map.len(), out.text.matches('\n').count() + 1);
        prop_assert_eq!(out.text.matches(INDENT).count(), out.text.matches(DEDENT).count());
    }
}
