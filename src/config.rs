//! Configuration loader
//!
//! `defaults/keyform.default.toml` is embedded into the crate so the built-in
//! operator and keyword tables live in one place. Callers layer their own
//! files on top with [`Loader`] before deserializing into [`FrontendConfig`].

use std::collections::BTreeMap;
use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;

use crate::error::OperatorError;
use crate::keywords::{KeywordHandler, KeywordTable};
use crate::operators::{Associativity, OperatorTable};

const DEFAULT_TOML: &str = include_str!("../defaults/keyform.default.toml");

/// Project configuration picked up from the working directory when present.
pub const PROJECT_FILE: &str = "keyform.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    pub operators: Vec<OperatorConfig>,
    pub keywords: BTreeMap<String, KeywordHandler>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperatorConfig {
    pub op: String,
    pub associativity: Associativity,
    pub precedence: u32,
}

impl FrontendConfig {
    pub fn operator_table(&self) -> Result<OperatorTable, OperatorError> {
        let mut table = OperatorTable::new();
        for operator in &self.operators {
            table.add(
                operator.op.clone(),
                operator.associativity,
                operator.precedence,
            )?;
        }
        Ok(table)
    }

    pub fn keyword_table(&self) -> KeywordTable {
        self.keywords
            .iter()
            .map(|(keyword, handler)| (keyword.clone(), *handler))
            .collect()
    }
}

/// Layers configuration sources over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files are an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file if it exists.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer TOML text.
    pub fn with_toml(mut self, text: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(text, FileFormat::Toml));
        self
    }

    /// Apply a single key/value override.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Select `handler` for `keyword`, over every layered file.
    pub fn with_keyword(self, keyword: &str, handler: &str) -> Result<Self, ConfigError> {
        self.set_override(&format!("keywords.{}", keyword), handler)
    }

    pub fn build(self) -> Result<FrontendConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<FrontendConfig, ConfigError> {
    Loader::new().build()
}
