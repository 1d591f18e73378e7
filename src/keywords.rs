//! Keyword handlers
//!
//! Each block keyword maps to one [`KeywordHandler`]. The set of handlers is
//! closed; which keywords select them is configuration.

mod function;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::RawBlock;
use crate::dispatch::{Context, Event};
use crate::error::FrontendError;

pub use function::Signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordHandler {
    /// `fun name(params)` with a statement body
    Function,
}

impl KeywordHandler {
    pub fn handle(
        self,
        block: &RawBlock,
        context: &Context<'_>,
        global: &Context<'_>,
        events: &mut Vec<Event>,
    ) -> Result<(), FrontendError> {
        match self {
            KeywordHandler::Function => function::handle(block, context, global, events),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    handlers: HashMap<String, KeywordHandler>,
}

impl KeywordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut table = Self::new();
        table.insert("fun", KeywordHandler::Function);
        table
    }

    pub fn insert(&mut self, keyword: impl Into<String>, handler: KeywordHandler) -> &mut Self {
        self.handlers.insert(keyword.into(), handler);
        self
    }

    pub fn get(&self, keyword: &str) -> Option<KeywordHandler> {
        self.handlers.get(keyword).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl FromIterator<(String, KeywordHandler)> for KeywordTable {
    fn from_iter<I: IntoIterator<Item = (String, KeywordHandler)>>(iter: I) -> Self {
        KeywordTable {
            handlers: iter.into_iter().collect(),
        }
    }
}
