//! Bracket-aware newline handling
//!
//! Newlines inside `()`, `[]` and `{}` do not end statements. They are
//! replaced by a placeholder marker while statement ends and indentation are
//! encoded, and put back at the end of the pipeline.

use chumsky::prelude::*;

use super::markers::INNER_NEWLINE;
use super::pipeline::{Runnable, Staged};
use super::Preprocessed;
use crate::error::PreprocessError;

/// Top-level piece of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    /// Text outside any brackets
    Plain(String),
    /// A balanced bracketed region, brackets included
    Surround(String),
}

fn sections() -> impl Parser<char, Vec<Section>, Error = Simple<char>> {
    let plain = none_of("(){}[]").repeated().at_least(1).collect::<String>();

    let surround = recursive(|surround| {
        let contents = surround
            .or(plain.clone())
            .repeated()
            .map(|parts: Vec<String>| parts.concat());
        choice((
            contents
                .clone()
                .delimited_by(just('('), just(')'))
                .map(|inner| format!("({})", inner)),
            contents
                .clone()
                .delimited_by(just('['), just(']'))
                .map(|inner| format!("[{}]", inner)),
            contents
                .delimited_by(just('{'), just('}'))
                .map(|inner| format!("{{{}}}", inner)),
        ))
    });

    surround
        .map(Section::Surround)
        .or(plain.map(Section::Plain))
        .repeated()
        .then_ignore(end())
}

/// Byte offset of the bracket that breaks the nesting.
fn unbalanced_offset(text: &str) -> usize {
    let mut open = Vec::new();
    for (offset, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => open.push((offset, c)),
            ')' | ']' | '}' => match open.pop() {
                Some((_, '(')) if c == ')' => {}
                Some((_, '[')) if c == ']' => {}
                Some((_, '{')) if c == '}' => {}
                _ => return offset,
            },
            _ => {}
        }
    }
    open.first().map(|(offset, _)| *offset).unwrap_or(text.len())
}

/// Escapes newlines inside brackets and collapses their lines in
/// `statement_lines`.
pub struct EscapeInnerNewlines;

impl Runnable<Staged, Staged> for EscapeInnerNewlines {
    fn run(&self, input: Staged) -> Result<Staged, PreprocessError> {
        let parsed = sections().parse(input.text.as_str()).map_err(|_| {
            let offset = unbalanced_offset(&input.text);
            let line = input.text[..offset].matches('\n').count();
            PreprocessError::UnbalancedBrackets {
                line: input.lines.report(line),
            }
        })?;

        let mut text = String::with_capacity(input.text.len());
        let mut statement_lines = input.lines.clone();
        let mut line = 0;
        for section in parsed {
            match section {
                Section::Plain(plain) => {
                    line += plain.matches('\n').count();
                    text.push_str(&plain);
                }
                Section::Surround(region) => {
                    // The region's first line keeps its entry; the rest join it.
                    statement_lines.splice(line + 1, region.matches('\n').count());
                    text.push_str(&region.replace('\n', INNER_NEWLINE));
                }
            }
        }

        Ok(Staged {
            text,
            statement_lines,
            ..input
        }
        .traced("escape_inner_newlines"))
    }
}

/// Turns placeholders back into newlines and finishes the pipeline.
pub struct RestoreInnerNewlines;

impl Runnable<Staged, Preprocessed> for RestoreInnerNewlines {
    fn run(&self, input: Staged) -> Result<Preprocessed, PreprocessError> {
        Ok(Preprocessed {
            text: input.text.replace(INNER_NEWLINE, "\n"),
            line_map: input.lines,
            indent_unit: input.indent_unit,
        })
    }
}
