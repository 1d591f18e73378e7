//! Command-line interface for keyform
//!
//! Usage:
//!   keyform `<path>` [--format text|json] [--config `<file>`]
//!           [--keyword `<kw>=<handler>`]... [--tokens]
//!
//! Configuration is layered: built-in defaults, then `keyform.toml` in the
//! working directory if there is one, then `--config`. `--keyword` entries
//! win over every file.
//!
//! Prints one line per dispatched statement, with `FUNCTION <name>` and
//! `END FUNCTION <name>` around function bodies. `--tokens` prints the
//! preprocessed token text instead. Set `KEYFORM_LOG` (e.g. `debug`) for logs
//! on stderr.

use std::process;

use clap::{Arg, ArgAction, Command};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use keyform::config::{Loader, PROJECT_FILE};
use keyform::driver::{render, Frontend, OutputFormat};
use keyform::FrontendError;

fn main() {
    let matches = Command::new("keyform")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse keyform source and print the dispatched statements")
        .arg(
            Arg::new("path")
                .help("Path to the source file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file layered over the built-in operators and keywords"),
        )
        .arg(
            Arg::new("keyword")
                .long("keyword")
                .short('k')
                .value_name("KW=HANDLER")
                .help("Bind a keyword to a handler, e.g. def=function")
                .value_parser(keyword_binding)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .help("Print the preprocessed token text")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    init_logging();

    let Some(path) = matches.get_one::<String>("path") else {
        unreachable!("path is required")
    };
    let format = matches
        .get_one::<String>("format")
        .and_then(|format| format.parse::<OutputFormat>().ok())
        .unwrap_or_default();
    let config = matches.get_one::<String>("config");
    let keywords: Vec<(String, String)> = matches
        .get_many::<(String, String)>("keyword")
        .map(|bindings| bindings.cloned().collect())
        .unwrap_or_default();

    if let Err(e) = execute(path, format, config, &keywords, matches.get_flag("tokens")) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn keyword_binding(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((keyword, handler)) if !keyword.is_empty() && !handler.is_empty() => {
            Ok((keyword.to_string(), handler.to_string()))
        }
        _ => Err(format!("expected KW=HANDLER, got '{}'", text)),
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var("KEYFORM_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(
    path: &str,
    format: OutputFormat,
    config: Option<&String>,
    keywords: &[(String, String)],
    tokens: bool,
) -> Result<(), FrontendError> {
    let mut loader = Loader::new().with_optional_file(PROJECT_FILE);
    if let Some(config) = config {
        loader = loader.with_file(config);
    }
    for (keyword, handler) in keywords {
        loader = loader.with_keyword(keyword, handler)?;
    }
    let frontend = Frontend::new(&loader.build()?)?;

    if tokens {
        let source = std::fs::read_to_string(path).map_err(|source| FrontendError::Io {
            path: path.into(),
            source,
        })?;
        print!("{}", frontend.tokens(&source)?.text);
        return Ok(());
    }

    let events = frontend.run_file(path)?;
    match render(&events, format) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("error: cannot serialize events: {}", e);
            process::exit(1);
        }
    }
    Ok(())
}
