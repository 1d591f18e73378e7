//! Driver
//!
//! One front-end run: preprocess the source, parse it with the structural
//! grammar, then dispatch the statements under a top-level context.

use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use tracing::debug;

use crate::ast::Node;
use crate::config::{load_defaults, FrontendConfig};
use crate::dispatch::{dispatch, Context, Event};
use crate::error::FrontendError;
use crate::grammar::GrammarRegistry;
use crate::keywords::KeywordTable;
use crate::operators::OperatorParser;
use crate::preprocessor::{preprocess, LineMap, Preprocessed};
use crate::structural::statements;

/// Statements of a source unit, before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub statements: Vec<Node>,
    pub line_map: LineMap,
}

#[derive(Debug)]
pub struct Frontend {
    registry: GrammarRegistry,
    operators: Rc<OperatorParser>,
    keywords: Rc<KeywordTable>,
}

impl Frontend {
    pub fn new(config: &FrontendConfig) -> Result<Self, FrontendError> {
        let operators = OperatorParser::new(config.operator_table()?)?;
        Ok(Frontend {
            registry: GrammarRegistry::new()?,
            operators: Rc::new(operators),
            keywords: Rc::new(config.keyword_table()),
        })
    }

    /// Front end with the built-in operator and keyword tables.
    pub fn with_defaults() -> Result<Self, FrontendError> {
        Self::new(&load_defaults()?)
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    pub fn tokens(&self, source: &str) -> Result<Preprocessed, FrontendError> {
        Ok(preprocess(source)?)
    }

    pub fn parse(&self, source: &str) -> Result<Parsed, FrontendError> {
        let Preprocessed {
            text, line_map, ..
        } = preprocess(source)?;
        let value = self.registry.structural_parser().parse(&text, &line_map)?;
        let statements = statements(value);
        debug!(statements = statements.len(), "parsed source");
        Ok(Parsed {
            statements,
            line_map,
        })
    }

    pub fn run(&self, source: &str) -> Result<Vec<Event>, FrontendError> {
        let Parsed {
            statements,
            line_map,
        } = self.parse(source)?;
        let global = Context::new(
            &self.registry,
            Rc::clone(&self.operators),
            Rc::clone(&self.keywords),
            line_map,
        );
        let mut events = Vec::new();
        dispatch(&statements, &global, &global, &mut events)?;
        debug!(
            events = events.len(),
            grammars = self.registry.cached(),
            "run complete"
        );
        Ok(events)
    }

    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<Vec<Event>, FrontendError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| FrontendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.run(&source)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Events as printed by the binary: one line each, or a JSON array.
pub fn render(events: &[Event], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(events
            .iter()
            .map(|event| format!("{}\n", event))
            .collect()),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(events)?;
            json.push('\n');
            Ok(json)
        }
    }
}
