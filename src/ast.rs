//! Structural model
//!
//! The nodes built by the structural parser. Blocks are deferred: their
//! header and body are kept as literal token text in a [`RawBlock`] until a
//! keyword handler parses them with its own grammar.
//!
//! Rewrites go through [`Node::cata`] / [`Node::try_cata`], which rebuild the
//! tree bottom-up and hand every rebuilt node to a function.

use std::convert::Infallible;
use std::fmt;

use serde::Serialize;

use crate::preprocessor::markers::{DEDENT, ENDL, INDENT};

/// Bracket pair around trailers, collections and surrounded chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Surrounder {
    Paren,
    Bracket,
    Brace,
}

impl Surrounder {
    pub fn from_open(open: &str) -> Option<Self> {
        match open {
            "(" => Some(Surrounder::Paren),
            "[" => Some(Surrounder::Bracket),
            "{" => Some(Surrounder::Brace),
            _ => None,
        }
    }

    pub fn open(self) -> &'static str {
        match self {
            Surrounder::Paren => "(",
            Surrounder::Bracket => "[",
            Surrounder::Brace => "{",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Surrounder::Paren => ")",
            Surrounder::Bracket => "]",
            Surrounder::Brace => "}",
        }
    }
}

/// A statement kept as literal fragments, only found in block bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub fragments: Vec<String>,
    /// Line in the parsed text
    pub line: usize,
}

impl Chunk {
    /// The statement as one line of token text.
    pub fn literal(&self) -> String {
        if self.fragments.is_empty() {
            ENDL.to_string()
        } else {
            format!("{} {}", self.fragments.join(" "), ENDL)
        }
    }
}

/// A block whose header and body are still literal token text.
///
/// `line` is the keyword's line in the parsed text; `body_lines` holds, for
/// every line of `body`, the line of the parsed text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawBlock {
    pub keyword: String,
    pub header: String,
    pub body: String,
    pub line: usize,
    pub body_lines: Vec<usize>,
}

impl RawBlock {
    /// Token text lines of the whole block with the line each came from.
    ///
    /// The first body line opens with INDENT and the last closes with DEDENT,
    /// so nested blocks re-parse as blocks.
    pub fn render_lines(&self) -> Vec<(usize, String)> {
        let header = if self.header.is_empty() {
            format!("{} {}", self.keyword, ENDL)
        } else {
            format!("{} {} {}", self.keyword, self.header, ENDL)
        };
        let mut lines = vec![(self.line, header)];
        let mut body: Vec<(usize, String)> = self
            .body
            .lines()
            .zip(self.body_lines.iter().copied())
            .map(|(text, line)| (line, text.to_string()))
            .collect();
        if let Some((_, first)) = body.first_mut() {
            *first = format!("{} {}", INDENT, first);
        }
        if let Some((_, last)) = body.last_mut() {
            last.push(' ');
            last.push_str(DEDENT);
        }
        lines.append(&mut body);
        lines
    }

    /// The block as token text, parseable by the structural grammar.
    pub fn literal(&self) -> String {
        let lines: Vec<String> = self.render_lines().into_iter().map(|(_, text)| text).collect();
        format!("{}\n", lines.join("\n"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Integer(i64),
    Float(f64),
    Character(String),
    String(String),
    Symbol(String),
    Identifier(String),
    Operator(String),
    UnaryExpr {
        op: String,
        expr: Box<Node>,
    },
    TrailerExpr {
        expr: Box<Node>,
        surrounder: Surrounder,
        contents: Vec<Node>,
    },
    Tuple(Vec<Node>),
    Collection {
        surrounder: Surrounder,
        contents: Vec<Node>,
    },
    /// Operands at even positions, operators at odd positions
    PartialBinaryExpr {
        sequence: Vec<Node>,
        line: usize,
    },
    BinaryExpr {
        op: String,
        left: Box<Node>,
        right: Box<Node>,
    },
    ChainExpr {
        operands: Vec<Node>,
        operators: Vec<String>,
    },
    TupleTarget(Vec<Node>),
    CollectionTarget {
        surrounder: Surrounder,
        contents: Vec<Node>,
    },
    Assignment {
        target: Box<Node>,
        expr: Box<Node>,
    },
    Block(RawBlock),
    EmptyStatement,
    Chunk(Chunk),
}

impl Node {
    /// Rebuild bottom-up, applying `f` to every rebuilt node.
    pub fn cata<F>(&self, f: &mut F) -> Node
    where
        F: FnMut(Node) -> Node,
    {
        let result: Result<Node, Infallible> = self.try_cata(&mut |node| Ok(f(node)));
        match result {
            Ok(node) => node,
            Err(never) => match never {},
        }
    }

    /// Fallible [`Node::cata`]; the first error stops the rewrite.
    pub fn try_cata<E, F>(&self, f: &mut F) -> Result<Node, E>
    where
        F: FnMut(Node) -> Result<Node, E>,
    {
        let rebuilt = match self {
            Node::UnaryExpr { op, expr } => Node::UnaryExpr {
                op: op.clone(),
                expr: Box::new(expr.try_cata(f)?),
            },
            Node::TrailerExpr {
                expr,
                surrounder,
                contents,
            } => Node::TrailerExpr {
                expr: Box::new(expr.try_cata(f)?),
                surrounder: *surrounder,
                contents: try_cata_all(contents, f)?,
            },
            Node::Tuple(contents) => Node::Tuple(try_cata_all(contents, f)?),
            Node::Collection {
                surrounder,
                contents,
            } => Node::Collection {
                surrounder: *surrounder,
                contents: try_cata_all(contents, f)?,
            },
            Node::PartialBinaryExpr { sequence, line } => {
                let mut rebuilt = Vec::with_capacity(sequence.len());
                for (i, node) in sequence.iter().enumerate() {
                    if i % 2 == 0 {
                        rebuilt.push(node.try_cata(f)?);
                    } else {
                        rebuilt.push(node.clone());
                    }
                }
                Node::PartialBinaryExpr {
                    sequence: rebuilt,
                    line: *line,
                }
            }
            Node::BinaryExpr { op, left, right } => Node::BinaryExpr {
                op: op.clone(),
                left: Box::new(left.try_cata(f)?),
                right: Box::new(right.try_cata(f)?),
            },
            Node::ChainExpr {
                operands,
                operators,
            } => Node::ChainExpr {
                operands: try_cata_all(operands, f)?,
                operators: operators.clone(),
            },
            Node::TupleTarget(targets) => Node::TupleTarget(try_cata_all(targets, f)?),
            Node::CollectionTarget {
                surrounder,
                contents,
            } => Node::CollectionTarget {
                surrounder: *surrounder,
                contents: try_cata_all(contents, f)?,
            },
            Node::Assignment { target, expr } => Node::Assignment {
                target: Box::new(target.try_cata(f)?),
                expr: Box::new(expr.try_cata(f)?),
            },
            leaf => leaf.clone(),
        };
        f(rebuilt)
    }
}

fn try_cata_all<E, F>(nodes: &[Node], f: &mut F) -> Result<Vec<Node>, E>
where
    F: FnMut(Node) -> Result<Node, E>,
{
    nodes.iter().map(|node| node.try_cata(f)).collect()
}

struct Joined<'a>(&'a [Node]);

impl fmt::Display for Joined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Integer(value) => write!(f, "Integer({})", value),
            Node::Float(value) => write!(f, "Float({:?})", value),
            Node::Character(value) => write!(f, "Character('{}')", value),
            Node::String(value) => write!(f, "String(\"{}\")", value),
            Node::Symbol(value) => write!(f, "Symbol(~{})", value),
            Node::Identifier(name) => write!(f, "Identifier({})", name),
            Node::Operator(op) => write!(f, "Operator({})", op),
            Node::UnaryExpr { op, expr } => write!(f, "UnaryExpr({}, {})", op, expr),
            Node::TrailerExpr {
                expr,
                surrounder,
                contents,
            } => write!(
                f,
                "TrailerExpr({}, {}{}{})",
                expr,
                surrounder.open(),
                Joined(contents),
                surrounder.close()
            ),
            Node::Tuple(contents) => write!(f, "Tuple({})", Joined(contents)),
            Node::Collection {
                surrounder,
                contents,
            } => write!(
                f,
                "Collection({}{}{})",
                surrounder.open(),
                Joined(contents),
                surrounder.close()
            ),
            Node::PartialBinaryExpr { sequence, .. } => {
                let parts: Vec<String> = sequence.iter().map(Node::to_string).collect();
                write!(f, "PartialBinaryExpr({})", parts.join(" "))
            }
            Node::BinaryExpr { op, left, right } => {
                write!(f, "BinaryExpr({}, {}, {})", op, left, right)
            }
            Node::ChainExpr {
                operands,
                operators,
            } => {
                write!(f, "ChainExpr(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        let op = operators.get(i - 1).map(String::as_str).unwrap_or("?");
                        write!(f, ", {}, ", op)?;
                    }
                    write!(f, "{}", operand)?;
                }
                write!(f, ")")
            }
            Node::TupleTarget(targets) => write!(f, "TupleTarget({})", Joined(targets)),
            Node::CollectionTarget {
                surrounder,
                contents,
            } => write!(
                f,
                "CollectionTarget({}{}{})",
                surrounder.open(),
                Joined(contents),
                surrounder.close()
            ),
            Node::Assignment { target, expr } => write!(f, "Assignment({}, {})", target, expr),
            Node::Block(block) => write!(f, "Block({}, {})", block.keyword, block.header),
            Node::EmptyStatement => write!(f, "EmptyStatement"),
            Node::Chunk(chunk) => write!(f, "Chunk({})", chunk.fragments.join(" ")),
        }
    }
}
