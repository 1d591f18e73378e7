//! Operator-precedence synthesizer
//!
//! The structural parser leaves binary operators flat. An [`OperatorTable`]
//! turns into a grammar with one layer per precedence level, loosest first:
//!
//! ```text
//! opexpr0 = (ops0)>{opexpr1}+ | opexpr1 ;     && ||      right, 3
//! opexpr1 = (ops1)%{opexpr2}+ | opexpr2 ;     == < ...   chain, 4
//! opexpr2 = (ops2)<{opexpr3}+ | opexpr3 ;     + -        left,  6
//! ...
//! opexprN = atom ;
//! atom = /[0-9]+/ ;
//! ```
//!
//! A flat sequence is resolved by writing its operands as their positions
//! (`a + b * c` becomes `0 + 1 * 2`), parsing that, and putting the operands
//! back into the resulting tree.

use std::collections::BTreeMap;
use std::fmt;

use keyform_peg::{Fold, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Node;
use crate::error::{GrammarError, OperatorError};
use crate::grammar::{alt, CompiledGrammar, Element, Grammar};
use crate::preprocessor::LineMap;
use crate::rules::Rule;

/// Any character an operator can continue with.
const OPERATOR_CHAR: &str = "[-@$%^&*+~<>/:=!|]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Associativity {
    Left,
    Right,
    /// Comparison chains: `a < b < c` stays one flat node
    Chain,
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Associativity::Left => write!(f, "left"),
            Associativity::Right => write!(f, "right"),
            Associativity::Chain => write!(f, "chain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Level {
    associativity: Associativity,
    ops: Vec<String>,
}

/// Operators by precedence; a higher precedence binds tighter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorTable {
    levels: BTreeMap<u32, Level>,
}

const STANDARD: [(&str, Associativity, u32); 13] = [
    ("^", Associativity::Right, 8),
    ("*", Associativity::Left, 7),
    ("/", Associativity::Left, 7),
    ("+", Associativity::Left, 6),
    ("-", Associativity::Left, 6),
    ("==", Associativity::Chain, 4),
    ("!=", Associativity::Chain, 4),
    ("<", Associativity::Chain, 4),
    (">", Associativity::Chain, 4),
    ("<=", Associativity::Chain, 4),
    (">=", Associativity::Chain, 4),
    ("&&", Associativity::Right, 3),
    ("||", Associativity::Right, 3),
];

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arithmetic, comparison and logical operators.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (op, associativity, precedence) in STANDARD {
            table
                .levels
                .entry(precedence)
                .or_insert_with(|| Level {
                    associativity,
                    ops: Vec::new(),
                })
                .ops
                .push(op.to_string());
        }
        table
    }

    /// Register an operator. Every operator of a level shares one
    /// associativity.
    pub fn add(
        &mut self,
        op: impl Into<String>,
        associativity: Associativity,
        precedence: u32,
    ) -> Result<&mut Self, OperatorError> {
        let op = op.into();
        if self.contains(&op) {
            return Err(OperatorError::DuplicateOperator { op });
        }
        let level = self.levels.entry(precedence).or_insert_with(|| Level {
            associativity,
            ops: Vec::new(),
        });
        if level.associativity != associativity {
            return Err(OperatorError::MixedAssociativity {
                op,
                precedence,
                existing: level.associativity.to_string(),
                requested: associativity.to_string(),
            });
        }
        level.ops.push(op);
        Ok(self)
    }

    pub fn contains(&self, op: &str) -> bool {
        self.levels
            .values()
            .any(|level| level.ops.iter().any(|known| known == op))
    }

    /// `(op, associativity, precedence)` for every operator, loosest first.
    pub fn operators(&self) -> impl Iterator<Item = (&str, Associativity, u32)> {
        self.levels.iter().flat_map(|(precedence, level)| {
            level
                .ops
                .iter()
                .map(move |op| (op.as_str(), level.associativity, *precedence))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The layered precedence grammar for this table.
    pub fn grammar(&self) -> Grammar {
        let mut grammar = Grammar::new("Operator");
        grammar
            .add_rule(
                "start",
                vec![alt(vec![
                    Element::promote(Rule::reference("expr")),
                    Element::new(Rule::EndOfInput),
                ])],
                None,
            )
            .add_choice("expr", vec![Rule::reference("opexpr0")], None);

        for (i, level) in self.levels.values().enumerate() {
            let ops = format!("ops{}", i);
            let next = Rule::reference(format!("opexpr{}", i + 1));

            let mut literals: Vec<&String> = level.ops.iter().collect();
            literals.sort_by(|a, b| b.len().cmp(&a.len()));
            let alternatives = literals
                .into_iter()
                .map(|op| {
                    alt(vec![
                        Element::new(Rule::literal(op.as_str())),
                        Element::new(Rule::not(Rule::regex(OPERATOR_CHAR))),
                    ])
                })
                .collect();
            grammar.add_rule(ops.as_str(), alternatives, None);

            let layer = match level.associativity {
                Associativity::Left => Rule::left_join(Rule::reference(ops), next.clone()),
                Associativity::Right => Rule::right_join(Rule::reference(ops), next.clone()),
                Associativity::Chain => Rule::join(Rule::reference(ops), next.clone()),
            };
            grammar.add_choice(format!("opexpr{}", i), vec![layer, next], None);
        }

        grammar
            .add_choice(
                format!("opexpr{}", self.levels.len()),
                vec![Rule::reference("atom")],
                None,
            )
            .add_choice("atom", vec![Rule::regex("[0-9]+")], None);
        grammar
    }
}

/// A compiled [`OperatorTable`].
#[derive(Debug)]
pub struct OperatorParser {
    table: OperatorTable,
    parser: CompiledGrammar,
}

impl OperatorParser {
    pub fn new(table: OperatorTable) -> Result<Self, GrammarError> {
        let parser = table.grammar().compile()?;
        Ok(OperatorParser { table, parser })
    }

    pub fn table(&self) -> &OperatorTable {
        &self.table
    }

    pub fn description(&self) -> &str {
        self.parser.description()
    }

    /// Resolve an alternating operand/operator sequence into
    /// [`Node::BinaryExpr`] and [`Node::ChainExpr`] trees. `line` is only used
    /// for the error report.
    pub fn resolve(&self, sequence: &[Node], line: usize) -> Result<Node, OperatorError> {
        let mut operands = Vec::new();
        let mut projected = Vec::with_capacity(sequence.len());
        let mut written = Vec::with_capacity(sequence.len());
        for (i, node) in sequence.iter().enumerate() {
            if i % 2 == 0 {
                projected.push(operands.len().to_string());
                written.push(node.to_string());
                operands.push(node);
            } else {
                let op = match node {
                    Node::Operator(op) => op.clone(),
                    other => other.to_string(),
                };
                projected.push(op.clone());
                written.push(op);
            }
        }
        let projected = projected.join(" ");
        let unresolvable = || OperatorError::Unresolvable {
            sequence: written.join(" "),
            line,
        };

        let value = self
            .parser
            .parse(&projected, &LineMap::identity(&projected))
            .map_err(|_| unresolvable())?;
        let resolved = substitute(value, &operands).ok_or_else(unresolvable)?;
        debug!(%projected, %resolved, "resolved operators");
        Ok(resolved)
    }
}

fn substitute(value: Value<Node>, operands: &[&Node]) -> Option<Node> {
    match value {
        Value::Text(index) => {
            let index: usize = index.parse().ok()?;
            operands.get(index).map(|node| (*node).clone())
        }
        Value::Fold(fold) => {
            let Fold { op, left, right } = *fold;
            Some(Node::BinaryExpr {
                op: op.into_text()?,
                left: Box::new(substitute(left, operands)?),
                right: Box::new(substitute(right, operands)?),
            })
        }
        Value::List(mut items) if items.len() == 1 => substitute(items.remove(0), operands),
        Value::List(items) => {
            let mut chain_operands = Vec::new();
            let mut operators = Vec::new();
            for (i, item) in items.into_iter().enumerate() {
                if i % 2 == 0 {
                    chain_operands.push(substitute(item, operands)?);
                } else {
                    operators.push(item.into_text()?);
                }
            }
            Some(Node::ChainExpr {
                operands: chain_operands,
                operators,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use rstest::rstest;

    fn standard() -> OperatorParser {
        OperatorParser::new(OperatorTable::standard()).unwrap()
    }

    /// `1 + 2` style text to a flat sequence of integers and operators.
    fn sequence(text: &str) -> Vec<Node> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, token)| match token.parse() {
                Ok(n) if i % 2 == 0 => Node::Integer(n),
                _ if i % 2 == 0 => Node::Identifier(token.to_string()),
                _ => Node::Operator(token.to_string()),
            })
            .collect()
    }

    fn resolve(text: &str) -> String {
        standard().resolve(&sequence(text), 1).unwrap().to_string()
    }

    #[rstest]
    #[case(
        "1 + 2 * 3",
        "BinaryExpr(+, Integer(1), BinaryExpr(*, Integer(2), Integer(3)))"
    )]
    #[case(
        "1 * 2 + 3",
        "BinaryExpr(+, BinaryExpr(*, Integer(1), Integer(2)), Integer(3))"
    )]
    #[case(
        "1 - 2 - 3",
        "BinaryExpr(-, BinaryExpr(-, Integer(1), Integer(2)), Integer(3))"
    )]
    #[case(
        "2 ^ 3 ^ 4",
        "BinaryExpr(^, Integer(2), BinaryExpr(^, Integer(3), Integer(4)))"
    )]
    #[case(
        "1 < 2 < 3",
        "ChainExpr(Integer(1), <, Integer(2), <, Integer(3))"
    )]
    #[case(
        "a <= b + 1 != c",
        "ChainExpr(Identifier(a), <=, BinaryExpr(+, Identifier(b), Integer(1)), !=, Identifier(c))"
    )]
    #[case(
        "a && b || c",
        "BinaryExpr(&&, Identifier(a), BinaryExpr(||, Identifier(b), Identifier(c)))"
    )]
    #[case("x < y", "ChainExpr(Identifier(x), <, Identifier(y))")]
    fn test_resolve(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(resolve(text), expected);
    }

    #[test]
    fn test_single_operand() {
        assert_eq!(resolve("7"), "Integer(7)");
    }

    #[test]
    fn test_unknown_operator() {
        let err = standard().resolve(&sequence("a ** b"), 12).unwrap_err();
        assert_eq!(
            err,
            OperatorError::Unresolvable {
                sequence: "Identifier(a) ** Identifier(b)".into(),
                line: 12
            }
        );
    }

    #[test]
    fn test_cross_level_prefix_is_not_split() {
        let mut table = OperatorTable::new();
        table.add("*", Associativity::Left, 7).unwrap();
        table.add("**", Associativity::Right, 9).unwrap();
        let parser = OperatorParser::new(table).unwrap();
        let resolved = parser.resolve(&sequence("2 ** 3 * 4"), 1).unwrap();
        assert_eq!(
            resolved.to_string(),
            "BinaryExpr(*, BinaryExpr(**, Integer(2), Integer(3)), Integer(4))"
        );
    }

    #[test]
    fn test_add_rejects_conflicts() {
        let mut table = OperatorTable::standard();
        assert_eq!(
            table.add("<>", Associativity::Left, 4).unwrap_err(),
            OperatorError::MixedAssociativity {
                op: "<>".into(),
                precedence: 4,
                existing: "chain".into(),
                requested: "left".into()
            }
        );
        assert_eq!(
            table.add("+", Associativity::Left, 6).unwrap_err(),
            OperatorError::DuplicateOperator { op: "+".into() }
        );
        assert!(table.add("%", Associativity::Left, 7).is_ok());
    }

    #[test]
    fn test_grammar_description() {
        let mut table = OperatorTable::new();
        table.add("+", Associativity::Left, 6).unwrap();
        table.add("==", Associativity::Chain, 4).unwrap();
        table.add("<", Associativity::Chain, 4).unwrap();
        assert_snapshot!(table.grammar().description(), @r###"
        @@grammar :: Operator

        start = @:expr $ ;
        expr = opexpr0 ;
        ops0 = '==' !/[-@$%^&*+~<>\/:=!|]/ | '<' !/[-@$%^&*+~<>\/:=!|]/ ;
        opexpr0 = (ops0)%{opexpr1}+ | opexpr1 ;
        ops1 = '+' !/[-@$%^&*+~<>\/:=!|]/ ;
        opexpr1 = (ops1)<{opexpr2}+ | opexpr2 ;
        opexpr2 = atom ;
        atom = /[0-9]+/ ;
        "###);
    }

    #[test]
    fn test_operators_loosest_first() {
        let table = OperatorTable::standard();
        let first = table.operators().next();
        assert_eq!(first, Some(("&&", Associativity::Right, 3)));
        assert_eq!(table.operators().count(), 13);
    }
}
