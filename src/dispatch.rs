//! Context and keyword dispatch
//!
//! The second pass over parsed statements. Ordinary statements get their
//! flat binary expressions resolved by the context's operator parser; blocks
//! go to the handler registered for their keyword, which parses the block's
//! literal text with its own grammar and dispatches the result in turn.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::ast::Node;
use crate::error::{FrontendError, OperatorError, UnknownKeyword};
use crate::grammar::GrammarRegistry;
use crate::keywords::KeywordTable;
use crate::operators::OperatorParser;
use crate::preprocessor::LineMap;

/// What dispatch produced, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Statement { node: Node },
    EnterFunction { name: String, params: Vec<String> },
    ExitFunction { name: String },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Statement { node } => write!(f, "{}", node),
            Event::EnterFunction { name, .. } => write!(f, "FUNCTION {}", name),
            Event::ExitFunction { name } => write!(f, "END FUNCTION {}", name),
        }
    }
}

/// Everything a statement list is dispatched with.
///
/// `lines` maps lines of the text the statements were parsed from to
/// original source lines.
#[derive(Debug, Clone)]
pub struct Context<'r> {
    registry: &'r GrammarRegistry,
    operators: Rc<OperatorParser>,
    keywords: Rc<KeywordTable>,
    lines: LineMap,
}

impl<'r> Context<'r> {
    pub fn new(
        registry: &'r GrammarRegistry,
        operators: Rc<OperatorParser>,
        keywords: Rc<KeywordTable>,
        lines: LineMap,
    ) -> Self {
        Context {
            registry,
            operators,
            keywords,
            lines,
        }
    }

    /// Context for a text derived from this one, sharing operators and
    /// keywords.
    pub fn child(&self, lines: LineMap) -> Context<'r> {
        Context {
            registry: self.registry,
            operators: Rc::clone(&self.operators),
            keywords: Rc::clone(&self.keywords),
            lines,
        }
    }

    /// Replace the operator parser, e.g. for a block with its own operators.
    pub fn with_operators(mut self, operators: Rc<OperatorParser>) -> Self {
        self.operators = operators;
        self
    }

    pub fn registry(&self) -> &'r GrammarRegistry {
        self.registry
    }

    pub fn operators(&self) -> &OperatorParser {
        &self.operators
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn lines(&self) -> &LineMap {
        &self.lines
    }
}

/// Replace every [`Node::PartialBinaryExpr`] under `node` with its resolved
/// tree.
pub fn resolve_operators(node: &Node, context: &Context<'_>) -> Result<Node, OperatorError> {
    node.try_cata(&mut |node| match node {
        Node::PartialBinaryExpr { sequence, line } => context
            .operators
            .resolve(&sequence, context.lines.report(line)),
        other => Ok(other),
    })
}

/// Dispatch parsed statements: blocks to their keyword handler, everything
/// else resolved and emitted as a [`Event::Statement`].
///
/// `global` is the top-level context of the run.
pub fn dispatch(
    statements: &[Node],
    context: &Context<'_>,
    global: &Context<'_>,
    events: &mut Vec<Event>,
) -> Result<(), FrontendError> {
    for statement in statements {
        match statement {
            Node::Block(block) => {
                let line = context.lines.report(block.line);
                let Some(handler) = context.keywords.get(&block.keyword) else {
                    return Err(UnknownKeyword {
                        keyword: block.keyword.clone(),
                        line,
                    }
                    .into());
                };
                debug!(keyword = %block.keyword, line, ?handler, "dispatching block");
                handler.handle(block, context, global, events)?;
            }
            other => events.push(Event::Statement {
                node: resolve_operators(other, context)?,
            }),
        }
    }
    Ok(())
}
