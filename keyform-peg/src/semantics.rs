//! Semantic actions
//!
//! An action runs when its rule succeeds and replaces the rule's value.
//! Actions are looked up by rule name, so one set of actions can serve
//! several grammars that share rule names.

use std::collections::HashMap;

use crate::value::Value;

/// Location and text of a matched rule.
///
/// `start` is taken after leading whitespace. `line` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub text: &'a str,
}

pub type Action<T> = fn(Value<T>, &Span<'_>) -> Result<Value<T>, String>;

#[derive(Clone)]
pub struct Semantics<T> {
    actions: HashMap<String, Action<T>>,
}

impl<T> Default for Semantics<T> {
    fn default() -> Self {
        Semantics {
            actions: HashMap::new(),
        }
    }
}

impl<T> Semantics<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl Into<String>, action: Action<T>) -> Self {
        self.register(rule, action);
        self
    }

    pub fn register(&mut self, rule: impl Into<String>, action: Action<T>) {
        self.actions.insert(rule.into(), action);
    }

    pub fn get(&self, rule: &str) -> Option<Action<T>> {
        self.actions.get(rule).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
