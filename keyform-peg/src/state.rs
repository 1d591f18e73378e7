//! Parse state
//!
//! Tracks the input position, the farthest failure for error reporting, the
//! cut flag of the innermost option being tried, and the packrat memo table.

use std::collections::HashMap;

use crate::error::ParseFailure;
use crate::value::Value;

/// Why an expression did not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fail {
    /// Ordinary failure; the caller may backtrack
    Soft,
    /// Failure after a cut inside a repetition; fails the nearest choice
    Cut,
    /// A semantic action failed; aborts the parse
    Fatal,
}

pub(crate) type Outcome<T> = Result<Value<T>, Fail>;

/// Memoized result of a rule at a position.
#[derive(Debug, Clone)]
pub(crate) struct MemoEntry<T> {
    pub outcome: Result<(Value<T>, usize), Fail>,
    /// The rule body passed a cut that commits the caller's option
    pub cut: bool,
}

pub(crate) struct ParseState<'a, T> {
    input: &'a str,
    pos: usize,
    line_starts: Vec<usize>,
    /// Cut flag of the current option frame
    pub cut: bool,
    furthest_pos: usize,
    furthest_expected: Vec<String>,
    /// Depth of lookaheads being evaluated; failures inside are not reported
    quiet: usize,
    memo: HashMap<(usize, usize), MemoEntry<T>>,
    fatal: Option<ParseFailure>,
}

impl<'a, T: Clone> ParseState<'a, T> {
    pub fn new(input: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in input.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        ParseState {
            input,
            pos: 0,
            line_starts,
            cut: false,
            furthest_pos: 0,
            furthest_expected: Vec::new(),
            quiet: 0,
            memo: HashMap::new(),
            fatal: None,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn advance(&mut self, len: usize) {
        self.pos += len;
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Character immediately after the current position.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// 0-based (line, column) of a byte offset.
    pub fn line_column(&self, pos: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&pos) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = self.input[self.line_starts[line]..pos].chars().count();
        (line, column)
    }

    /// Record that `what` was expected at the current position.
    pub fn expected(&mut self, what: impl Into<String>) -> Fail {
        if self.quiet > 0 {
            return Fail::Soft;
        }
        if self.pos > self.furthest_pos {
            self.furthest_pos = self.pos;
            self.furthest_expected.clear();
        }
        if self.pos == self.furthest_pos {
            let what = what.into();
            if !self.furthest_expected.contains(&what) {
                self.furthest_expected.push(what);
            }
        }
        Fail::Soft
    }

    pub fn abort(&mut self, failure: ParseFailure) -> Fail {
        self.fatal = Some(failure);
        Fail::Fatal
    }

    pub fn memo_get(&self, rule: usize, pos: usize) -> Option<&MemoEntry<T>> {
        self.memo.get(&(rule, pos))
    }

    pub fn memo_remove(&mut self, rule: usize, pos: usize) {
        self.memo.remove(&(rule, pos));
    }

    pub fn enter_quiet(&mut self) {
        self.quiet += 1;
    }

    pub fn exit_quiet(&mut self) {
        self.quiet = self.quiet.saturating_sub(1);
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn memo_put(&mut self, rule: usize, pos: usize, entry: MemoEntry<T>) {
        self.memo.insert((rule, pos), entry);
    }

    pub fn into_failure(self) -> ParseFailure {
        if let Some(fatal) = self.fatal {
            return fatal;
        }
        let (line, column) = self.line_column(self.furthest_pos);
        ParseFailure::NoMatch {
            position: self.furthest_pos,
            line,
            column,
            expected: self.furthest_expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let state: ParseState<'_, ()> = ParseState::new("ab\ncd\n\nef");
        assert_eq!(state.line_column(0), (0, 0));
        assert_eq!(state.line_column(4), (1, 1));
        assert_eq!(state.line_column(6), (2, 0));
        assert_eq!(state.line_column(8), (3, 1));
    }

    #[test]
    fn test_expected_keeps_furthest() {
        let mut state: ParseState<'_, ()> = ParseState::new("abc");
        state.expected("x");
        state.set_pos(2);
        state.expected("y");
        state.expected("z");
        state.set_pos(1);
        state.expected("w");
        match state.into_failure() {
            ParseFailure::NoMatch {
                position, expected, ..
            } => {
                assert_eq!(position, 2);
                assert_eq!(expected, vec!["y".to_string(), "z".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_quiet_failures_are_not_reported() {
        let mut state: ParseState<'_, ()> = ParseState::new("abc");
        state.expected("x");
        state.set_pos(2);
        state.enter_quiet();
        state.expected("y");
        state.exit_quiet();
        match state.into_failure() {
            ParseFailure::NoMatch {
                position, expected, ..
            } => {
                assert_eq!(position, 0);
                assert_eq!(expected, vec!["x".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
