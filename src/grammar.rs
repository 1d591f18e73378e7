//! Grammar builder
//!
//! A [`Grammar`] is an ordered table of named rules, each a list of
//! alternatives plus an optional construction action. Grammars are plain
//! data: they can be sliced down to the rules reachable from one root,
//! merged, rendered to the engine's description syntax and compiled.
//!
//! Keyword handlers build their specialized grammars by slicing the
//! structural grammar and adding a few rules of their own:
//!
//! ```rust,ignore
//! let mut header = registry.structural().slice("identifier")?;
//! header.add_rule("start", vec![Alternative::from(vec![
//!     Element::promote(Rule::reference("signature")),
//!     Element::new(Rule::EndOfInput),
//! ])], None);
//! ```

mod registry;

use std::collections::{HashSet, VecDeque};
use std::fmt;

use indexmap::IndexMap;
use keyform_peg::{ParseFailure, Semantics, Value};
use tracing::debug;

pub use registry::GrammarRegistry;

use crate::ast::Node;
use crate::error::{GrammarError, ParseError};
use crate::preprocessor::LineMap;
use crate::rules::Rule;

/// Construction action run on a rule's matched value.
pub type Action = keyform_peg::Action<Node>;

/// Label promoting one element to be the whole value of its alternative.
pub const OVERRIDE: &str = "@";

/// One element of an alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub label: Option<String>,
    pub rule: Rule,
}

impl Element {
    pub fn new(rule: Rule) -> Self {
        Element { label: None, rule }
    }

    pub fn labeled(label: impl Into<String>, rule: Rule) -> Self {
        Element {
            label: Some(label.into()),
            rule,
        }
    }

    pub fn promote(rule: Rule) -> Self {
        Self::labeled(OVERRIDE, rule)
    }

    fn describe(&self) -> String {
        match &self.label {
            Some(label) => format!("{}:{}", label, self.rule.describe()),
            None => self.rule.describe(),
        }
    }
}

/// A sequence of elements; one option of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative(pub Vec<Element>);

impl Alternative {
    pub fn elements(&self) -> &[Element] {
        &self.0
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(Element::describe).collect();
        parts.join(" ")
    }
}

impl From<Rule> for Alternative {
    fn from(rule: Rule) -> Self {
        Alternative(vec![Element::new(rule)])
    }
}

impl From<Element> for Alternative {
    fn from(element: Element) -> Self {
        Alternative(vec![element])
    }
}

impl From<Vec<Element>> for Alternative {
    fn from(elements: Vec<Element>) -> Self {
        Alternative(elements)
    }
}

/// Shorthand for an alternative from anything convertible.
pub fn alt(alternative: impl Into<Alternative>) -> Alternative {
    alternative.into()
}

#[derive(Clone)]
pub struct RuleDef {
    pub alternatives: Vec<Alternative>,
    pub action: Option<Action>,
}

impl RuleDef {
    fn referenced_names(&self) -> impl Iterator<Item = &str> {
        self.alternatives
            .iter()
            .flat_map(|alternative| alternative.0.iter())
            .flat_map(|element| element.rule.referenced_names())
    }
}

impl fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDef")
            .field("alternatives", &self.alternatives)
            .field("action", &self.action.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    rules: IndexMap<String, RuleDef>,
}

impl Grammar {
    pub fn new(name: impl Into<String>) -> Self {
        Grammar {
            name: name.into(),
            rules: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same rules under another grammar name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Define or replace a rule. A replaced rule keeps its position.
    pub fn add_rule(
        &mut self,
        name: impl Into<String>,
        alternatives: Vec<Alternative>,
        action: Option<Action>,
    ) -> &mut Self {
        self.rules.insert(
            name.into(),
            RuleDef {
                alternatives,
                action,
            },
        );
        self
    }

    /// Define a rule whose alternatives are single bare rules.
    pub fn add_choice(
        &mut self,
        name: impl Into<String>,
        options: Vec<Rule>,
        action: Option<Action>,
    ) -> &mut Self {
        let alternatives = options.into_iter().map(Alternative::from).collect();
        self.add_rule(name, alternatives, action)
    }

    /// Merge every rule of `other` into this grammar.
    pub fn add_rules(&mut self, other: &Grammar) -> &mut Self {
        for (name, rule) in &other.rules {
            self.rules.insert(name.clone(), rule.clone());
        }
        self
    }

    pub fn rule(&self, name: &str) -> Option<&RuleDef> {
        self.rules.get(name)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The sub-grammar of every rule reachable from `root`, in this
    /// grammar's order.
    pub fn slice(&self, root: &str) -> Result<Grammar, GrammarError> {
        if !self.rules.contains_key(root) {
            return Err(GrammarError::UnknownRoot {
                name: root.to_string(),
            });
        }

        let mut reached: HashSet<&str> = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        while let Some(name) = queue.pop_front() {
            let Some(rule) = self.rules.get(name) else {
                continue;
            };
            for reference in rule.referenced_names() {
                if !self.rules.contains_key(reference) {
                    return Err(GrammarError::UndefinedRule {
                        rule: name.to_string(),
                        name: reference.to_string(),
                    });
                }
                if reached.insert(reference) {
                    queue.push_back(reference);
                }
            }
        }

        let rules = self
            .rules
            .iter()
            .filter(|(name, _)| reached.contains(name.as_str()))
            .map(|(name, rule)| (name.clone(), rule.clone()))
            .collect();
        Ok(Grammar {
            name: self.name.clone(),
            rules,
        })
    }

    /// Check that every referenced rule is defined.
    pub fn validate(&self) -> Result<(), GrammarError> {
        for (name, rule) in &self.rules {
            if let Some(missing) = rule
                .referenced_names()
                .find(|reference| !self.rules.contains_key(*reference))
            {
                return Err(GrammarError::UndefinedRule {
                    rule: name.clone(),
                    name: missing.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Textual form accepted by the engine.
    pub fn description(&self) -> String {
        let mut out = format!("@@grammar :: {}\n\n", self.name);
        for (name, rule) in &self.rules {
            let alternatives: Vec<String> =
                rule.alternatives.iter().map(Alternative::describe).collect();
            out.push_str(&format!("{} = {} ;\n", name, alternatives.join(" | ")));
        }
        out
    }

    pub fn semantics(&self) -> Semantics<Node> {
        let mut semantics = Semantics::new();
        for (name, rule) in &self.rules {
            if let Some(action) = rule.action {
                semantics.register(name.clone(), action);
            }
        }
        semantics
    }

    /// Compile into a parser starting at rule `start`.
    pub fn compile(&self) -> Result<CompiledGrammar, GrammarError> {
        if !self.rules.contains_key("start") {
            return Err(GrammarError::UnknownRoot {
                name: "start".to_string(),
            });
        }
        self.validate()?;
        let parser =
            keyform_peg::compile(&self.description()).map_err(|source| GrammarError::Compile {
                grammar: self.name.clone(),
                source,
            })?;
        debug!(grammar = %self.name, rules = self.rules.len(), "compiled");
        Ok(CompiledGrammar {
            name: self.name.clone(),
            parser,
            semantics: self.semantics(),
        })
    }
}

/// A compiled grammar together with its construction actions.
pub struct CompiledGrammar {
    name: String,
    parser: keyform_peg::Parser,
    semantics: Semantics<Node>,
}

impl CompiledGrammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        self.parser.description()
    }

    /// Parse `text` from rule `start`. `lines` maps lines of `text` to
    /// original source lines for error reports.
    pub fn parse(&self, text: &str, lines: &LineMap) -> Result<Value<Node>, ParseError> {
        self.parser
            .parse(text, "start", &self.semantics)
            .map_err(|failure| self.parse_error(failure, lines))
    }

    fn parse_error(&self, failure: ParseFailure, lines: &LineMap) -> ParseError {
        let line = lines.report(failure.line().unwrap_or(0));
        match failure {
            ParseFailure::NoMatch {
                column, expected, ..
            } => ParseError {
                grammar: self.name.clone(),
                line,
                column: column + 1,
                expected,
                detail: None,
            },
            ParseFailure::Action { message, .. } => ParseError {
                grammar: self.name.clone(),
                line,
                column: 0,
                expected: Vec::new(),
                detail: Some(message),
            },
            other @ ParseFailure::UnknownStartRule(_) => ParseError {
                grammar: self.name.clone(),
                line,
                column: 0,
                expected: Vec::new(),
                detail: Some(other.to_string()),
            },
        }
    }
}

impl fmt::Debug for CompiledGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGrammar")
            .field("name", &self.name)
            .field("actions", &self.semantics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyform_peg::Span;

    fn sample() -> Grammar {
        let mut grammar = Grammar::new("Sample");
        grammar
            .add_rule(
                "start",
                vec![alt(vec![
                    Element::promote(Rule::reference("list")),
                    Element::new(Rule::EndOfInput),
                ])],
                None,
            )
            .add_rule(
                "list",
                vec![alt(Rule::gather(Rule::literal(","), Rule::reference("item")))],
                None,
            )
            .add_choice(
                "item",
                vec![Rule::reference("word"), Rule::reference("number")],
                None,
            )
            .add_rule("word", vec![alt(Rule::regex("[a-z]+"))], None)
            .add_rule("number", vec![alt(Rule::regex("[0-9]+"))], Some(number))
            .add_rule("unused", vec![alt(Rule::literal("x"))], None);
        grammar
    }

    fn number(value: Value<Node>, _: &Span<'_>) -> Result<Value<Node>, String> {
        let text = value.into_text().unwrap_or_default();
        text.parse()
            .map(|n| Value::Node(Node::Integer(n)))
            .map_err(|e| format!("{}", e))
    }

    #[test]
    fn test_description() {
        let mut grammar = Grammar::new("Tiny");
        grammar.add_rule(
            "start",
            vec![
                alt(vec![
                    Element::labeled("name", Rule::reference("id")),
                    Element::new(Rule::Cut),
                ]),
                alt(Rule::literal("pass")),
            ],
            None,
        );
        assert_eq!(
            grammar.description(),
            "@@grammar :: Tiny\n\nstart = name:id ~ | 'pass' ;\n"
        );
    }

    #[test]
    fn test_slice_keeps_reachable_rules_in_order() {
        let slice = sample().slice("list").unwrap();
        let names: Vec<&str> = slice.rule_names().collect();
        assert_eq!(names, vec!["list", "item", "word", "number"]);
        assert!(slice.rule("number").and_then(|rule| rule.action).is_some());
    }

    #[test]
    fn test_slice_errors() {
        assert_eq!(
            sample().slice("missing").unwrap_err(),
            GrammarError::UnknownRoot {
                name: "missing".into()
            }
        );

        let mut broken = sample();
        broken.add_choice("item", vec![Rule::reference("nothing")], None);
        assert_eq!(
            broken.slice("start").unwrap_err(),
            GrammarError::UndefinedRule {
                rule: "item".into(),
                name: "nothing".into()
            }
        );
    }

    #[test]
    fn test_add_rules_merges_slice() {
        let mut grammar = Grammar::new("Merged");
        grammar.add_rules(&sample().slice("word").unwrap());
        grammar.add_rule(
            "start",
            vec![alt(Rule::positive_closure(Rule::reference("word")))],
            None,
        );
        let compiled = grammar.compile().unwrap();
        let value = compiled.parse("a b c", &LineMap::identity("a b c")).unwrap();
        assert_eq!(value.into_items().len(), 3);
    }

    #[test]
    fn test_compile_and_parse() {
        let compiled = sample().compile().unwrap();
        let value = compiled
            .parse("a, 12, b", &LineMap::identity("a, 12, b"))
            .unwrap();
        assert_eq!(
            value.into_items()[1].clone().into_node(),
            Some(Node::Integer(12))
        );
    }

    #[test]
    fn test_compile_requires_start() {
        let mut grammar = Grammar::new("NoStart");
        grammar.add_rule("word", vec![alt(Rule::regex("[a-z]+"))], None);
        assert!(matches!(
            grammar.compile(),
            Err(GrammarError::UnknownRoot { .. })
        ));
    }

    #[test]
    fn test_parse_error_uses_line_map() {
        let compiled = sample().compile().unwrap();
        let lines = LineMap::from_lines(vec![4, 9]);
        let err = compiled.parse("a,\n!", &lines).unwrap_err();
        assert_eq!(err.line, 10);
        assert_eq!(err.grammar, "Sample");
    }
}
