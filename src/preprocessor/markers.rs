//! Structural markers embedded in the token text

pub const INDENT: &str = "#[INDENT]#";
pub const DEDENT: &str = "#[DEDENT]#";
pub const ENDL: &str = "#[ENDL]#";
/// Stands in for a newline inside brackets until indentation is encoded
pub const INNER_NEWLINE: &str = "#[INNERNEWLINE]#";

pub const BLOCK_COMMENT_OPEN: &str = "#[";
pub const BLOCK_COMMENT_CLOSE: &str = "]#";
