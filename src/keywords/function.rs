//! `fun` blocks
//!
//! ```text
//! fun add(a, b)
//!     a + b
//! ```
//!
//! The header is parsed into a [`Signature`] and the body as a statement list,
//! both with grammars sliced from the structural one. The body is dispatched
//! in a child context between `FUNCTION` and `END FUNCTION` events.

use serde::Serialize;
use tracing::debug;

use keyform_peg::Value;

use crate::ast::{Node, RawBlock};
use crate::dispatch::{dispatch, Context, Event};
use crate::error::{FrontendError, GrammarError, ParseError};
use crate::grammar::{alt, Element, Grammar};
use crate::preprocessor::LineMap;
use crate::rules::Rule;
use crate::structural::statements;

/// Registry keys; they become grammar names, so they must be identifiers.
const HEADER_GRAMMAR: &str = "function_header";
const BODY_GRAMMAR: &str = "function_body";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

fn header_grammar(structural: &Grammar) -> Result<Grammar, GrammarError> {
    let mut grammar = structural.slice("identifier")?;
    grammar
        .add_rule(
            "start",
            vec![alt(vec![
                Element::promote(Rule::reference("signature")),
                Element::new(Rule::EndOfInput),
            ])],
            None,
        )
        .add_rule(
            "signature",
            vec![alt(vec![
                Element::labeled("name", Rule::reference("identifier")),
                Element::labeled("params", Rule::reference("params")),
            ])],
            None,
        )
        .add_rule(
            "params",
            vec![alt(vec![
                Element::new(Rule::literal("(")),
                Element::promote(Rule::gather(
                    Rule::literal(","),
                    Rule::reference("identifier"),
                )),
                Element::new(Rule::literal(")")),
            ])],
            None,
        );
    Ok(grammar)
}

fn body_grammar(structural: &Grammar) -> Result<Grammar, GrammarError> {
    let mut grammar = structural.slice("stmtlist")?;
    grammar.add_rule(
        "start",
        vec![alt(vec![
            Element::promote(Rule::reference("stmtlist")),
            Element::new(Rule::EndOfInput),
        ])],
        None,
    );
    Ok(grammar)
}

fn identifier_name(value: Value<Node>) -> Option<String> {
    match value.into_node()? {
        Node::Identifier(name) => Some(name),
        _ => None,
    }
}

fn signature(value: Value<Node>) -> Option<Signature> {
    let mut fields = value.into_record()?;
    let name = identifier_name(fields.take("name"))?;
    let params = fields
        .take("params")
        .into_items()
        .into_iter()
        .map(identifier_name)
        .collect::<Option<Vec<_>>>()?;
    Some(Signature { name, params })
}

/// Parse a function header such as `add ( a , b )`.
pub fn parse_signature(
    header: &str,
    context: &Context<'_>,
    lines: &LineMap,
) -> Result<Signature, FrontendError> {
    let parser = context
        .registry()
        .get_or_compile(HEADER_GRAMMAR, header_grammar)?;
    let value = parser.parse(header, lines)?;
    signature(value).ok_or_else(|| {
        ParseError {
            grammar: HEADER_GRAMMAR.to_string(),
            line: lines.report(0),
            column: 0,
            expected: Vec::new(),
            detail: Some(format!("malformed function signature '{}'", header)),
        }
        .into()
    })
}

pub(super) fn handle(
    block: &RawBlock,
    context: &Context<'_>,
    global: &Context<'_>,
    events: &mut Vec<Event>,
) -> Result<(), FrontendError> {
    let header_lines = LineMap::from_lines(vec![context.lines().original(block.line)]);
    let Signature { name, params } = parse_signature(&block.header, context, &header_lines)?;

    let body_lines = context.lines().compose(&block.body_lines);
    let parser = context
        .registry()
        .get_or_compile(BODY_GRAMMAR, body_grammar)?;
    let body = statements(parser.parse(&block.body, &body_lines)?);
    debug!(function = %name, params = params.len(), statements = body.len(), "function");

    events.push(Event::EnterFunction {
        name: name.clone(),
        params,
    });
    let child = context.child(body_lines);
    dispatch(&body, &child, global, events)?;
    events.push(Event::ExitFunction { name });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::grammar::GrammarRegistry;
    use crate::keywords::KeywordTable;
    use crate::operators::{OperatorParser, OperatorTable};

    fn run(block: RawBlock) -> Result<Vec<Event>, FrontendError> {
        let registry = GrammarRegistry::new().unwrap();
        let context = Context::new(
            &registry,
            Rc::new(OperatorParser::new(OperatorTable::standard()).unwrap()),
            Rc::new(KeywordTable::standard()),
            LineMap::from_lines(vec![10, 11, 12, 13]),
        );
        let mut events = Vec::new();
        handle(&block, &context, &context, &mut events)?;
        Ok(events)
    }

    fn block(header: &str, body: &str) -> RawBlock {
        RawBlock {
            keyword: "fun".into(),
            header: header.into(),
            body: body.into(),
            line: 0,
            body_lines: (1..=body.lines().count()).collect(),
        }
    }

    #[test]
    fn test_signature() {
        let registry = GrammarRegistry::new().unwrap();
        let context = Context::new(
            &registry,
            Rc::new(OperatorParser::new(OperatorTable::standard()).unwrap()),
            Rc::new(KeywordTable::standard()),
            LineMap::default(),
        );
        let lines = LineMap::from_lines(vec![0]);
        assert_eq!(
            parse_signature("add ( a , b )", &context, &lines).unwrap(),
            Signature {
                name: "add".into(),
                params: vec!["a".into(), "b".into()]
            }
        );
        assert_eq!(
            parse_signature("main ( )", &context, &lines).unwrap().params,
            Vec::<String>::new()
        );
        assert!(parse_signature("add", &context, &lines).is_err());
    }

    #[test]
    fn test_handler_grammars_compile_under_their_keys() {
        let registry = GrammarRegistry::new().unwrap();
        let header = registry
            .get_or_compile(HEADER_GRAMMAR, header_grammar)
            .unwrap();
        let body = registry.get_or_compile(BODY_GRAMMAR, body_grammar).unwrap();
        assert_eq!(header.name(), HEADER_GRAMMAR);
        assert_eq!(body.name(), BODY_GRAMMAR);
        assert!(header
            .description()
            .starts_with("@@grammar :: function_header\n"));
        assert_eq!(registry.cached(), 2);
    }

    #[test]
    fn test_function_events() {
        let events = run(block("add ( a , b )", "a + b #[ENDL]#\n")).unwrap();
        let rendered: Vec<String> = events.iter().map(Event::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "FUNCTION add",
                "BinaryExpr(+, Identifier(a), Identifier(b))",
                "END FUNCTION add"
            ]
        );
    }

    #[test]
    fn test_nested_function() {
        let body = "x = 1 #[ENDL]#\nfun inner ( ) #[ENDL]#\n#[INDENT]# x #[ENDL]# #[DEDENT]#\n";
        let events = run(block("outer ( )", body)).unwrap();
        let rendered: Vec<String> = events.iter().map(Event::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "FUNCTION outer",
                "Assignment(Identifier(x), Integer(1))",
                "FUNCTION inner",
                "Identifier(x)",
                "END FUNCTION inner",
                "END FUNCTION outer"
            ]
        );
    }

    #[test]
    fn test_body_errors_report_source_lines() {
        let body = "x = 1 #[ENDL]#\ny = #[ENDL]#\n";
        let err = run(block("f ( )", body)).unwrap_err();
        assert_eq!(err.line(), Some(13));

        let err = run(block("f ( x", "x #[ENDL]#\n")).unwrap_err();
        assert_eq!(err.line(), Some(11));
    }
}
