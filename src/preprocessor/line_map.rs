//! Mapping from transformed lines back to source lines

use serde::Serialize;

/// For each line of a transformed text, the 0-based source line it starts on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineMap {
    lines: Vec<usize>,
}

impl LineMap {
    /// One entry per line of `text`, each mapping to itself.
    pub fn identity(text: &str) -> Self {
        let count = text.matches('\n').count() + 1;
        LineMap {
            lines: (0..count).collect(),
        }
    }

    pub fn from_lines(lines: Vec<usize>) -> Self {
        LineMap { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.lines
    }

    /// Source line of transformed `line`; lines past the end map to the last entry.
    pub fn original(&self, line: usize) -> usize {
        match self.lines.get(line) {
            Some(original) => *original,
            None => self.lines.last().copied().unwrap_or(line),
        }
    }

    /// 1-based source line, as reported to users.
    pub fn report(&self, line: usize) -> usize {
        self.original(line) + 1
    }

    /// Drop `count` lines starting at `start`.
    pub fn splice(&mut self, start: usize, count: usize) {
        let start = start.min(self.lines.len());
        let end = (start + count).min(self.lines.len());
        self.lines.drain(start..end);
    }

    /// Map for a text whose lines came from `lines` of the text this map describes.
    pub fn compose(&self, lines: &[usize]) -> LineMap {
        LineMap {
            lines: lines.iter().map(|line| self.original(*line)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_counts_trailing_line() {
        assert_eq!(LineMap::identity("a\nb\n").as_slice(), &[0, 1, 2]);
        assert_eq!(LineMap::identity("").len(), 1);
    }

    #[test]
    fn test_splice_removes_range() {
        let mut map = LineMap::identity("a\nb\nc\nd");
        map.splice(1, 2);
        assert_eq!(map.as_slice(), &[0, 3]);
    }

    #[test]
    fn test_compose_and_report() {
        let map = LineMap::from_lines(vec![0, 4, 5, 9]);
        let nested = map.compose(&[1, 3]);
        assert_eq!(nested.as_slice(), &[4, 9]);
        assert_eq!(nested.report(1), 10);
        assert_eq!(nested.report(7), 10);
    }
}
