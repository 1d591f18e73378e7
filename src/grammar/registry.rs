//! Owner of compiled grammars
//!
//! The structural grammar is built and compiled once when the registry is
//! created. Sub-grammars sliced from it by keyword handlers are compiled on
//! first use and cached under a name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::{CompiledGrammar, Grammar};
use crate::error::GrammarError;
use crate::structural;

#[derive(Debug)]
pub struct GrammarRegistry {
    structural: Grammar,
    parser: Rc<CompiledGrammar>,
    cache: RefCell<HashMap<String, Rc<CompiledGrammar>>>,
}

impl GrammarRegistry {
    pub fn new() -> Result<Self, GrammarError> {
        let structural = structural::grammar();
        let parser = Rc::new(structural.compile()?);
        Ok(GrammarRegistry {
            structural,
            parser,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// The structural grammar, for slicing.
    pub fn structural(&self) -> &Grammar {
        &self.structural
    }

    pub fn structural_parser(&self) -> Rc<CompiledGrammar> {
        Rc::clone(&self.parser)
    }

    /// The grammar cached under `key`, building and compiling it from the
    /// structural grammar on first request.
    pub fn get_or_compile<F>(&self, key: &str, build: F) -> Result<Rc<CompiledGrammar>, GrammarError>
    where
        F: FnOnce(&Grammar) -> Result<Grammar, GrammarError>,
    {
        if let Some(compiled) = self.cache.borrow().get(key) {
            debug!(grammar = key, "grammar cache hit");
            return Ok(Rc::clone(compiled));
        }
        debug!(grammar = key, "grammar cache miss");
        let compiled = Rc::new(build(&self.structural)?.renamed(key).compile()?);
        self.cache
            .borrow_mut()
            .insert(key.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    }

    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{alt, Element};
    use crate::rules::Rule;

    fn identifiers(structural: &Grammar) -> Result<Grammar, GrammarError> {
        let mut grammar = structural.slice("identifier")?;
        grammar.add_rule(
            "start",
            vec![alt(vec![
                Element::promote(Rule::positive_closure(Rule::reference("identifier"))),
                Element::new(Rule::EndOfInput),
            ])],
            None,
        );
        Ok(grammar)
    }

    #[test]
    fn test_compiles_once() {
        let registry = GrammarRegistry::new().unwrap();
        let first = registry.get_or_compile("identifiers", identifiers).unwrap();
        let second = registry
            .get_or_compile("identifiers", |_| panic!("rebuilt a cached grammar"))
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.cached(), 1);
        assert_eq!(first.name(), "identifiers");
    }

    #[test]
    fn test_build_errors_are_not_cached() {
        let registry = GrammarRegistry::new().unwrap();
        let err = registry
            .get_or_compile("broken", |structural| structural.slice("nonexistent"))
            .unwrap_err();
        assert!(matches!(err, GrammarError::UnknownRoot { .. }));
        assert_eq!(registry.cached(), 0);
    }
}
