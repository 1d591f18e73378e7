//! # keyform
//!
//! Front end for an indentation-sensitive language whose block keywords are
//! extensible.
//!
//! A run goes through three passes:
//!
//!     1. [`preprocessor`]: comments out, statement ends and indentation
//!        changes in as `#[ENDL]#`, `#[INDENT]#` and `#[DEDENT]#` markers
//!     2. [`structural`]: one grammar parses ordinary statements fully and
//!        captures every keyword block as a [`ast::RawBlock`] of literal text
//!     3. [`dispatch`]: flat binary expressions are resolved against the
//!        operator table, and each block goes to the handler its keyword
//!        selects, which parses it with a grammar sliced from the structural
//!        one ([`grammar::Grammar::slice`])
//!
//! Grammars are plain data ([`rules::Rule`], [`grammar::Grammar`]) rendered
//! to a description and compiled by the `keyform-peg` engine.
//!
//! ```text
//! fun add(a, b)          FUNCTION add
//!     a + b        =>    BinaryExpr(+, Identifier(a), Identifier(b))
//!                        END FUNCTION add
//! ```
//!
//! Every reported error carries the 1-based line of the original source.

pub mod ast;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod grammar;
pub mod keywords;
pub mod operators;
pub mod preprocessor;
pub mod rules;
pub mod structural;

pub use ast::Node;
pub use dispatch::Event;
pub use driver::Frontend;
pub use error::FrontendError;
