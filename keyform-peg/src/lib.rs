//! Runtime PEG engine
//!
//! Compiles a textual grammar description at runtime and parses text with it.
//! Grammars are built as plain text so that callers can assemble, slice and
//! extend them before compiling.
//!
//! ```text
//! @@grammar :: Calc
//! start = expr $ ;
//! expr = (op)<{term}+ ;
//! op = '+' | '-' ;
//! term = value:/[0-9]+/ ;
//! ```
//!
//! Matching follows PEG rules with packrat memoization:
//!
//! - whitespace is skipped before every terminal and at rule entry
//! - alphanumeric literals do not match a prefix of a longer word
//! - regexes are anchored at the current position
//! - `~` commits the enclosing choice option
//! - failures inside `&e` and `!e` are not reported as expectations
//!
//! Each rule may have a semantic action registered in [`Semantics`], which
//! replaces the rule's [`Value`] with the action's result.
//!
//! Left recursion is not supported: a left-recursive call fails.

mod description;
mod error;
mod expr;
mod interpreter;
mod semantics;
mod state;
mod value;

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

pub use description::{parse_description, Description, RuleDecl};
pub use error::{CompileError, ParseFailure};
pub use expr::{Element, Expr, JoinMode, Label};
pub use semantics::{Action, Semantics, Span};
pub use value::{Fold, Record, Value};

use expr::Pattern;
use interpreter::{Interpreter, RuleDef};

/// A compiled grammar.
#[derive(Debug, Clone)]
pub struct Parser {
    name: Option<String>,
    source: String,
    rules: Vec<RuleDef>,
    index: HashMap<String, usize>,
}

/// Compile a grammar description.
pub fn compile(description: &str) -> Result<Parser, CompileError> {
    let Description { name, rules: decls } = parse_description(description)?;

    let mut index = HashMap::with_capacity(decls.len());
    for (i, decl) in decls.iter().enumerate() {
        if index.insert(decl.name.clone(), i).is_some() {
            return Err(CompileError::DuplicateRule {
                rule: decl.name.clone(),
            });
        }
    }

    let mut rules = Vec::with_capacity(decls.len());
    for RuleDecl { name: rule, mut body } in decls {
        body.walk_mut(&mut |expr: &mut Expr| resolve(&rule, &index, expr))?;
        rules.push(RuleDef { name: rule, body });
    }

    debug!(grammar = ?name, rules = rules.len(), "compiled grammar");
    Ok(Parser {
        name,
        source: description.to_string(),
        rules,
        index,
    })
}

fn resolve(rule: &str, index: &HashMap<String, usize>, expr: &mut Expr) -> Result<(), CompileError> {
    match expr {
        Expr::Reference(reference) => match index.get(&reference.name) {
            Some(&i) => {
                reference.index = i;
                Ok(())
            }
            None => Err(CompileError::UndefinedRule {
                rule: rule.to_string(),
                name: reference.name.clone(),
            }),
        },
        Expr::Regex(source) => {
            let regex = Regex::new(&format!("^(?:{})", source)).map_err(|e| {
                CompileError::InvalidRegex {
                    rule: rule.to_string(),
                    pattern: source.clone(),
                    message: e.to_string(),
                }
            })?;
            *expr = Expr::Pattern(Pattern {
                source: source.clone(),
                regex,
            });
            Ok(())
        }
        _ => Ok(()),
    }
}

impl Parser {
    /// Grammar name from the `@@grammar` header.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The description this parser was compiled from.
    pub fn description(&self) -> &str {
        &self.source
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Parse `text` starting from rule `start`.
    ///
    /// Trailing input is allowed unless the start rule ends with `$`.
    pub fn parse<T: Clone>(
        &self,
        text: &str,
        start: &str,
        semantics: &Semantics<T>,
    ) -> Result<Value<T>, ParseFailure> {
        let index = *self
            .index
            .get(start)
            .ok_or_else(|| ParseFailure::UnknownStartRule(start.to_string()))?;
        debug!(grammar = ?self.name, start, len = text.len(), "parse");
        Interpreter::new(&self.rules, semantics, text).run(index)
    }
}
