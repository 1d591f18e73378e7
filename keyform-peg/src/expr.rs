//! Compiled expression tree
//!
//! A grammar description is parsed into one [`Expr`] per rule. References are
//! resolved to rule indices once all rules are known, and regex terminals are
//! compiled anchored at the match position.

use regex::Regex;

/// How the values of a separated repetition are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// `(s)%{e}`: keep separators, producing `[e, s, e, ...]`
    Keep,
    /// `(s).{e}`: drop separators, producing `[e, e, ...]`
    Gather,
    /// `(s)<{e}+`: left fold into `Fold { op, left, right }`
    Left,
    /// `(s)>{e}+`: right fold into `Fold { op, left, right }`
    Right,
}

impl JoinMode {
    pub fn symbol(self) -> char {
        match self {
            JoinMode::Keep => '%',
            JoinMode::Gather => '.',
            JoinMode::Left => '<',
            JoinMode::Right => '>',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '%' => Some(JoinMode::Keep),
            '.' => Some(JoinMode::Gather),
            '<' => Some(JoinMode::Left),
            '>' => Some(JoinMode::Right),
            _ => None,
        }
    }
}

/// Label attached to a sequence element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// `name:e` stores the value in the sequence record under `name`
    Named(String),
    /// `@:e` makes the value the result of the whole sequence
    Override,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub label: Option<Label>,
    pub expr: Expr,
}

/// A regex terminal, kept with its source for diagnostics.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    pub regex: Regex,
}

/// A reference to another rule. `index` is filled in during resolution.
#[derive(Debug, Clone)]
pub struct RuleRef {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(String),
    /// Regex source as written; compiled into [`Expr::Pattern`] during resolution
    Regex(String),
    Pattern(Pattern),
    Reference(RuleRef),
    Cut,
    EndOfInput,
    Closure {
        expr: Box<Expr>,
        positive: bool,
    },
    Join {
        separator: Box<Expr>,
        expr: Box<Expr>,
        mode: JoinMode,
        positive: bool,
    },
    Lookahead(Box<Expr>),
    NegativeLookahead(Box<Expr>),
    Optional(Box<Expr>),
    Choice(Vec<Expr>),
    Sequence(Vec<Element>),
}

impl Expr {
    pub fn reference(name: impl Into<String>) -> Self {
        Expr::Reference(RuleRef {
            name: name.into(),
            index: usize::MAX,
        })
    }

    /// Visit every sub-expression mutably, depth first.
    pub(crate) fn walk_mut<E>(
        &mut self,
        visit: &mut impl FnMut(&mut Expr) -> Result<(), E>,
    ) -> Result<(), E> {
        visit(self)?;
        match self {
            Expr::Closure { expr, .. }
            | Expr::Lookahead(expr)
            | Expr::NegativeLookahead(expr)
            | Expr::Optional(expr) => expr.walk_mut(visit),
            Expr::Join {
                separator, expr, ..
            } => {
                separator.walk_mut(visit)?;
                expr.walk_mut(visit)
            }
            Expr::Choice(options) => options.iter_mut().try_for_each(|o| o.walk_mut(visit)),
            Expr::Sequence(elements) => elements
                .iter_mut()
                .try_for_each(|e| e.expr.walk_mut(visit)),
            Expr::Literal(_)
            | Expr::Regex(_)
            | Expr::Pattern(_)
            | Expr::Reference(_)
            | Expr::Cut
            | Expr::EndOfInput => Ok(()),
        }
    }
}
