//! Structural grammar
//!
//! The first parsing pass over preprocessed token text. Ordinary statements
//! are parsed to expression trees with binary operators left flat
//! ([`Node::PartialBinaryExpr`]). Blocks (`keyword header ENDL INDENT body
//! DEDENT`) are recognized generically: their statements are only split into
//! lexemes and rebuilt as literal text in a [`RawBlock`], for the keyword's
//! handler to parse later.
//!
//! Rule order matters: alternatives are tried in order and keyword handlers
//! slice their grammars out of this one.
//!
//! Every statement is first tried as a block. The INDENT after the header is
//! checked with a lookahead so that looking past the line end never shows up
//! as the farthest failure.

use keyform_peg::{Record, Span, Value};

use crate::ast::{Chunk, Node, RawBlock, Surrounder};
use crate::grammar::{alt, Alternative, Element, Grammar};
use crate::preprocessor::markers::{DEDENT, ENDL, INDENT};
use crate::rules::Rule;

const IDENTIFIER: &str = "[_a-zA-Z][_a-zA-Z0-9]*[?!]?";
const FLOAT: &str = r"[0-9]+\.[0-9]*|\.[0-9]+";
const INT: &str = "[0-9]+";
const CHAR: &str = r"'([^'\\]|\\.)'";
const STRING: &str = r#""([^"\\]|\\.)*""#;
const SYMBOL: &str = "[a-zA-Z][a-zA-Z0-9]*[?!]?";
const OPERATOR: &str = "[-@$%^&*+~<>/:=!|][-@$%^&*+<>/=:|]*";

const SURROUNDERS: [Surrounder; 3] = [Surrounder::Paren, Surrounder::Bracket, Surrounder::Brace];

type Built = Result<Value<Node>, String>;

fn refer(name: &str) -> Rule {
    Rule::reference(name)
}

fn lit(text: &str) -> Rule {
    Rule::literal(text)
}

fn el(rule: Rule) -> Element {
    Element::new(rule)
}

fn label(name: &str, rule: Rule) -> Element {
    Element::labeled(name, rule)
}

fn comma_exprs() -> Rule {
    Rule::gather(lit(","), refer("expr"))
}

fn target_item() -> Rule {
    Rule::or(vec![refer("parenstarget"), refer("identifier")])
}

/// `open ~ contents:(',').{expr} close` for each bracket pair.
fn bracketed(pairs: &[Surrounder]) -> Vec<Alternative> {
    pairs
        .iter()
        .map(|pair| {
            alt(vec![
                label("surrounder", lit(pair.open())),
                el(Rule::Cut),
                label("contents", comma_exprs()),
                el(lit(pair.close())),
            ])
        })
        .collect()
}

pub fn grammar() -> Grammar {
    let mut grammar = Grammar::new("Structural");

    grammar
        .add_rule(
            "start",
            vec![alt(vec![Element::promote(refer("program")), el(Rule::EndOfInput)])],
            None,
        )
        .add_rule(
            "program",
            vec![alt(vec![Element::promote(refer("stmtlist")), el(Rule::EndOfInput)])],
            None,
        );
    for (name, marker) in [("indent", INDENT), ("dedent", DEDENT), ("endl", ENDL)] {
        grammar.add_choice(name, vec![lit(marker)], None);
    }

    grammar
        .add_choice("identifier", vec![Rule::regex(IDENTIFIER)], Some(identifier))
        .add_choice("float", vec![Rule::regex(FLOAT)], Some(float))
        .add_choice("int", vec![Rule::regex(INT)], Some(int))
        .add_choice("char", vec![Rule::regex(CHAR)], Some(character))
        .add_choice("string", vec![Rule::regex(STRING)], Some(string))
        .add_rule(
            "symbol",
            vec![alt(vec![el(lit("~")), Element::promote(Rule::regex(SYMBOL))])],
            Some(symbol),
        )
        .add_choice(
            "atom",
            ["identifier", "float", "int", "char", "string", "symbol"]
                .into_iter()
                .map(refer)
                .collect(),
            None,
        );

    grammar
        .add_rule("trailer", bracketed(&SURROUNDERS), None)
        .add_rule(
            "trailerexpr",
            vec![alt(vec![
                label("name", refer("identifier")),
                label("trailers", Rule::positive_closure(refer("trailer"))),
            ])],
            Some(trailerexpr),
        )
        .add_rule(
            "tuple",
            vec![
                alt(vec![el(lit("(")), el(lit(")"))]),
                alt(vec![
                    el(lit("(")),
                    el(Rule::Cut),
                    label("first", refer("expr")),
                    el(lit(",")),
                    label("contents", comma_exprs()),
                    el(lit(")")),
                ]),
            ],
            Some(tuple),
        )
        .add_rule(
            "collection",
            bracketed(&[Surrounder::Bracket, Surrounder::Brace]),
            Some(collection),
        )
        .add_choice("op", vec![Rule::regex(OPERATOR)], Some(operator))
        .add_rule(
            "atomexpr",
            vec![
                alt(refer("trailerexpr")),
                alt(refer("atom")),
                alt(vec![el(lit("(")), Element::promote(refer("expr")), el(lit(")"))]),
                alt(refer("tuple")),
                alt(refer("collection")),
            ],
            None,
        )
        .add_rule(
            "unaryexpr",
            vec![
                alt(vec![
                    label("op", Rule::or(vec![lit("!"), lit("-")])),
                    label("expr", refer("atomexpr")),
                ]),
                alt(label("subexpr", refer("atomexpr"))),
            ],
            Some(unaryexpr),
        )
        .add_choice(
            "binaryexpr",
            vec![Rule::join(refer("op"), refer("unaryexpr"))],
            Some(binaryexpr),
        )
        .add_choice("expr", vec![refer("binaryexpr")], None);

    grammar
        .add_choice("separator", vec![lit(","), lit(";")], None)
        .add_choice(
            "lexeme",
            vec![refer("atom"), refer("op"), refer("separator")],
            Some(lexeme),
        )
        .add_choice("bundle", vec![Rule::positive_closure(refer("lexeme"))], None)
        .add_choice(
            "chunk",
            vec![Rule::positive_closure(Rule::or(vec![
                refer("surrounded"),
                refer("bundle"),
            ]))],
            Some(chunk),
        )
        .add_rule(
            "surrounded",
            SURROUNDERS
                .iter()
                .map(|pair| {
                    alt(vec![
                        label("surrounder", lit(pair.open())),
                        label("contents", Rule::optional(refer("chunk"))),
                        el(lit(pair.close())),
                    ])
                })
                .collect(),
            Some(surrounded),
        )
        .add_rule(
            "chunkstmt",
            vec![alt(vec![
                label("chunk", Rule::optional(refer("chunk"))),
                label("endl", refer("endl")),
            ])],
            Some(chunkstmt),
        )
        .add_rule(
            "block",
            vec![alt(vec![
                label("keyword", refer("identifier")),
                label("header", Rule::optional(refer("chunk"))),
                el(refer("endl")),
                el(Rule::lookahead(Rule::and(vec![
                    Rule::closure(refer("endl")),
                    refer("indent"),
                ]))),
                el(Rule::closure(refer("endl"))),
                el(refer("indent")),
                el(Rule::Cut),
                label(
                    "body",
                    Rule::positive_closure(Rule::or(vec![refer("block"), refer("chunkstmt")])),
                ),
                el(refer("dedent")),
            ])],
            Some(block),
        );

    grammar
        .add_choice(
            "target",
            vec![
                refer("parenstarget"),
                refer("tupletarget"),
                refer("collectiontarget"),
            ],
            None,
        )
        .add_rule(
            "parenstarget",
            vec![alt(vec![
                el(lit("(")),
                el(Rule::Cut),
                label("first", target_item()),
                el(lit(",")),
                label("contents", Rule::gather(lit(","), target_item())),
                el(lit(")")),
            ])],
            Some(parenstarget),
        )
        .add_choice(
            "tupletarget",
            vec![Rule::positive_gather(lit(","), target_item())],
            Some(tupletarget),
        )
        .add_choice("collectiontarget", vec![refer("collection")], Some(collectiontarget))
        .add_rule(
            "assignment",
            vec![alt(vec![
                label("target", refer("target")),
                el(lit("=")),
                el(Rule::not(lit("="))),
                el(Rule::Cut),
                label("expr", refer("expr")),
                el(refer("endl")),
            ])],
            Some(assignment),
        )
        .add_rule(
            "emptystmt",
            vec![
                alt(refer("endl")),
                alt(vec![el(lit("pass")), el(Rule::Cut), el(refer("endl"))]),
            ],
            Some(emptystmt),
        )
        .add_rule(
            "stmt",
            vec![
                alt(refer("block")),
                alt(refer("assignment")),
                alt(refer("emptystmt")),
                alt(vec![Element::promote(refer("expr")), el(refer("endl"))]),
            ],
            None,
        )
        .add_choice("stmtlist", vec![Rule::closure(refer("stmt"))], Some(stmtlist));

    grammar
}

/// Statements of a parsed `stmtlist`.
pub fn statements(value: Value<Node>) -> Vec<Node> {
    value
        .into_items()
        .into_iter()
        .filter_map(Value::into_node)
        .collect()
}

fn node(value: Value<Node>) -> Result<Node, String> {
    match value {
        Value::Node(node) => Ok(node),
        other => Err(format!("expected a syntax node, found {:?}", other)),
    }
}

fn nodes(value: Value<Node>) -> Result<Vec<Node>, String> {
    value.into_items().into_iter().map(node).collect()
}

fn record(value: Value<Node>) -> Result<Record<Node>, String> {
    match value {
        Value::Record(record) => Ok(record),
        other => Err(format!("expected labeled values, found {:?}", other)),
    }
}

fn text(value: Value<Node>) -> Result<String, String> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(format!("expected text, found {:?}", other)),
    }
}

fn surrounder(value: Value<Node>) -> Result<Surrounder, String> {
    let open = text(value)?;
    Surrounder::from_open(&open).ok_or_else(|| format!("unknown bracket '{}'", open))
}

/// Literal fragments of a chunk value, in order.
fn fragments(value: Value<Node>) -> Vec<String> {
    let mut out = Vec::new();
    collect_fragments(value, &mut out);
    out
}

fn collect_fragments(value: Value<Node>, out: &mut Vec<String>) {
    match value {
        Value::Text(text) => out.push(text),
        Value::List(items) => items
            .into_iter()
            .for_each(|item| collect_fragments(item, out)),
        _ => {}
    }
}

fn quoted(value: Value<Node>) -> Result<String, String> {
    let literal = text(value)?;
    let inner = literal
        .get(1..literal.len().saturating_sub(1))
        .unwrap_or_default();
    Ok(inner.to_string())
}

fn identifier(value: Value<Node>, _: &Span<'_>) -> Built {
    Ok(Value::Node(Node::Identifier(text(value)?)))
}

fn float(value: Value<Node>, _: &Span<'_>) -> Built {
    let literal = text(value)?;
    literal
        .parse()
        .map(|n| Value::Node(Node::Float(n)))
        .map_err(|_| format!("invalid float literal {}", literal))
}

fn int(value: Value<Node>, _: &Span<'_>) -> Built {
    let literal = text(value)?;
    literal
        .parse()
        .map(|n| Value::Node(Node::Integer(n)))
        .map_err(|_| format!("integer literal {} is out of range", literal))
}

fn character(value: Value<Node>, _: &Span<'_>) -> Built {
    Ok(Value::Node(Node::Character(quoted(value)?)))
}

fn string(value: Value<Node>, _: &Span<'_>) -> Built {
    Ok(Value::Node(Node::String(quoted(value)?)))
}

fn symbol(value: Value<Node>, _: &Span<'_>) -> Built {
    Ok(Value::Node(Node::Symbol(text(value)?)))
}

fn operator(value: Value<Node>, _: &Span<'_>) -> Built {
    Ok(Value::Node(Node::Operator(text(value)?)))
}

fn trailerexpr(value: Value<Node>, _: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    let mut expr = node(fields.take("name"))?;
    for trailer in fields.take("trailers").into_items() {
        let mut trailer = record(trailer)?;
        expr = Node::TrailerExpr {
            expr: Box::new(expr),
            surrounder: surrounder(trailer.take("surrounder"))?,
            contents: nodes(trailer.take("contents"))?,
        };
    }
    Ok(Value::Node(expr))
}

fn tuple(value: Value<Node>, _: &Span<'_>) -> Built {
    let Value::Record(mut fields) = value else {
        return Ok(Value::Node(Node::Tuple(Vec::new())));
    };
    let mut contents = vec![node(fields.take("first"))?];
    contents.extend(nodes(fields.take("contents"))?);
    Ok(Value::Node(Node::Tuple(contents)))
}

fn collection(value: Value<Node>, _: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    Ok(Value::Node(Node::Collection {
        surrounder: surrounder(fields.take("surrounder"))?,
        contents: nodes(fields.take("contents"))?,
    }))
}

fn unaryexpr(value: Value<Node>, _: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    let subexpr = fields.take("subexpr");
    if !subexpr.is_nil() {
        return Ok(subexpr);
    }
    Ok(Value::Node(Node::UnaryExpr {
        op: text(fields.take("op"))?,
        expr: Box::new(node(fields.take("expr"))?),
    }))
}

fn binaryexpr(value: Value<Node>, span: &Span<'_>) -> Built {
    let mut sequence = nodes(value)?;
    if sequence.len() == 1 {
        return Ok(Value::Node(sequence.remove(0)));
    }
    Ok(Value::Node(Node::PartialBinaryExpr {
        sequence,
        line: span.line,
    }))
}

fn lexeme(_: Value<Node>, span: &Span<'_>) -> Built {
    Ok(Value::Text(span.text.to_string()))
}

fn chunk(value: Value<Node>, _: &Span<'_>) -> Built {
    Ok(Value::List(
        fragments(value).into_iter().map(Value::Text).collect(),
    ))
}

fn surrounded(value: Value<Node>, _: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    let pair = surrounder(fields.take("surrounder"))?;
    let mut parts = vec![Value::Text(pair.open().to_string())];
    parts.extend(fragments(fields.take("contents")).into_iter().map(Value::Text));
    parts.push(Value::Text(pair.close().to_string()));
    Ok(Value::List(parts))
}

fn chunkstmt(value: Value<Node>, span: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    Ok(Value::Node(Node::Chunk(Chunk {
        fragments: fragments(fields.take("chunk")),
        line: span.line,
    })))
}

fn block(value: Value<Node>, span: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    let keyword = match node(fields.take("keyword"))? {
        Node::Identifier(name) => name,
        other => return Err(format!("block keyword must be an identifier, found {}", other)),
    };
    let header = fragments(fields.take("header")).join(" ");

    let mut lines = Vec::new();
    for statement in nodes(fields.take("body"))? {
        match statement {
            Node::Block(inner) => lines.extend(inner.render_lines()),
            Node::Chunk(chunk) => lines.push((chunk.line, chunk.literal())),
            other => return Err(format!("unexpected statement in block body: {}", other)),
        }
    }
    let (body_lines, texts): (Vec<usize>, Vec<String>) = lines.into_iter().unzip();

    Ok(Value::Node(Node::Block(RawBlock {
        keyword,
        header,
        body: format!("{}\n", texts.join("\n")),
        line: span.line,
        body_lines,
    })))
}

fn parenstarget(value: Value<Node>, _: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    let mut targets = vec![node(fields.take("first"))?];
    targets.extend(nodes(fields.take("contents"))?);
    Ok(Value::Node(Node::TupleTarget(targets)))
}

fn tupletarget(value: Value<Node>, _: &Span<'_>) -> Built {
    let mut targets = nodes(value)?;
    if targets.len() == 1 {
        return Ok(Value::Node(targets.remove(0)));
    }
    Ok(Value::Node(Node::TupleTarget(targets)))
}

fn collectiontarget(value: Value<Node>, _: &Span<'_>) -> Built {
    match node(value)? {
        Node::Collection {
            surrounder,
            contents,
        } => Ok(Value::Node(Node::CollectionTarget {
            surrounder,
            contents,
        })),
        other => Err(format!("expected a collection target, found {}", other)),
    }
}

fn assignment(value: Value<Node>, _: &Span<'_>) -> Built {
    let mut fields = record(value)?;
    Ok(Value::Node(Node::Assignment {
        target: Box::new(node(fields.take("target"))?),
        expr: Box::new(node(fields.take("expr"))?),
    }))
}

fn emptystmt(_: Value<Node>, _: &Span<'_>) -> Built {
    Ok(Value::Node(Node::EmptyStatement))
}

fn stmtlist(value: Value<Node>, _: &Span<'_>) -> Built {
    let kept = nodes(value)?
        .into_iter()
        .filter(|statement| *statement != Node::EmptyStatement)
        .map(Value::Node)
        .collect();
    Ok(Value::List(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::CompiledGrammar;
    use crate::preprocessor::{preprocess, LineMap};
    use rstest::rstest;

    fn parser() -> CompiledGrammar {
        grammar().compile().unwrap()
    }

    fn parse(text: &str) -> Vec<Node> {
        statements(parser().parse(text, &LineMap::identity(text)).unwrap())
    }

    fn single(text: &str) -> String {
        let statements = parse(text);
        assert_eq!(statements.len(), 1, "{:?}", statements);
        statements[0].to_string()
    }

    #[test]
    fn test_rule_order() {
        let grammar = grammar();
        let names: Vec<&str> = grammar.rule_names().collect();
        assert_eq!(names.first(), Some(&"start"));
        assert_eq!(names.last(), Some(&"stmtlist"));
        let position = |name| names.iter().position(|n| *n == name).unwrap();
        assert!(position("float") < position("int"));
        assert!(position("block") < position("assignment"));
    }

    #[test]
    fn test_expr_slice_is_closed() {
        let full = grammar();
        let slice = full.slice("expr").unwrap();
        slice.validate().unwrap();

        let names: Vec<&str> = slice.rule_names().collect();
        for name in ["expr", "binaryexpr", "unaryexpr", "atom", "identifier", "trailer"] {
            assert!(names.contains(&name), "{} missing from {:?}", name, names);
        }
        for name in ["stmt", "block", "chunk", "assignment", "stmtlist", "start"] {
            assert!(!names.contains(&name), "{} leaked into {:?}", name, names);
        }
        let order: Vec<&str> = full.rule_names().filter(|n| names.contains(n)).collect();
        assert_eq!(names, order);
        assert!(slice.compile().is_err());
    }

    #[rstest]
    #[case(
        "x = 1 + 2#[ENDL]#",
        "Assignment(Identifier(x), PartialBinaryExpr(Integer(1) Operator(+) Integer(2)))"
    )]
    #[case("y = 1.50#[ENDL]#", "Assignment(Identifier(y), Float(1.5))")]
    #[case("z = .5#[ENDL]#", "Assignment(Identifier(z), Float(0.5))")]
    #[case(
        "s = \"a b\"#[ENDL]#",
        "Assignment(Identifier(s), String(\"a b\"))"
    )]
    #[case("c = 'q'#[ENDL]#", "Assignment(Identifier(c), Character('q'))")]
    #[case("~done#[ENDL]#", "Symbol(~done)")]
    #[case("-x#[ENDL]#", "UnaryExpr(-, Identifier(x))")]
    #[case("!ok?#[ENDL]#", "UnaryExpr(!, Identifier(ok?))")]
    #[case(
        "f(1, g[2]){}#[ENDL]#",
        "TrailerExpr(TrailerExpr(Identifier(f), (Integer(1), TrailerExpr(Identifier(g), [Integer(2)]))), {})"
    )]
    #[case("t = ()#[ENDL]#", "Assignment(Identifier(t), Tuple())")]
    #[case(
        "t = (1, 2)#[ENDL]#",
        "Assignment(Identifier(t), Tuple(Integer(1), Integer(2)))"
    )]
    #[case("t = (1,)#[ENDL]#", "Assignment(Identifier(t), Tuple(Integer(1)))")]
    #[case("(7)#[ENDL]#", "Integer(7)")]
    #[case(
        "v = [1, {2}]#[ENDL]#",
        "Assignment(Identifier(v), Collection([Integer(1), Collection({Integer(2)})]))"
    )]
    #[case(
        "a == b#[ENDL]#",
        "PartialBinaryExpr(Identifier(a) Operator(==) Identifier(b))"
    )]
    fn test_statements(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(single(text), expected);
    }

    #[rstest]
    #[case(
        "a, b = t#[ENDL]#",
        "TupleTarget(Identifier(a), Identifier(b))"
    )]
    #[case(
        "(a, (b, c)) = t#[ENDL]#",
        "TupleTarget(Identifier(a), TupleTarget(Identifier(b), Identifier(c)))"
    )]
    #[case("a = t#[ENDL]#", "Identifier(a)")]
    #[case(
        "[a, b] = t#[ENDL]#",
        "CollectionTarget([Identifier(a), Identifier(b)])"
    )]
    fn test_assignment_targets(#[case] text: &str, #[case] target: &str) {
        assert_eq!(
            single(text),
            format!("Assignment({}, Identifier(t))", target)
        );
    }

    #[test]
    fn test_empty_statements_are_dropped() {
        assert!(parse("pass#[ENDL]#\n#[ENDL]#\n").is_empty());
        assert_eq!(parse("pass#[ENDL]#\nx#[ENDL]#\n").len(), 1);
    }

    #[test]
    fn test_block_is_deferred() {
        let source = preprocess("fun add(a, b)\n    a + b\n    if a\n        b\n").unwrap();
        let statements = parse(&source.text);
        let [Node::Block(block)] = statements.as_slice() else {
            panic!("expected one block, got {:?}", statements);
        };
        assert_eq!(block.keyword, "fun");
        assert_eq!(block.header, "add ( a , b )");
        assert_eq!(
            block.body,
            "a + b #[ENDL]#\nif a #[ENDL]#\n#[INDENT]# b #[ENDL]# #[DEDENT]#\n"
        );
        assert_eq!(block.line, 0);
        assert_eq!(block.body_lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_block_literal_reparses() {
        let source = preprocess("loop\n  f(x,\n    y)\n  when x\n    \"s  t\"\n").unwrap();
        let first = parse(&source.text);
        let [Node::Block(block)] = first.as_slice() else {
            panic!("expected one block, got {:?}", first);
        };
        let again = parse(&block.literal());
        let [Node::Block(reparsed)] = again.as_slice() else {
            panic!("expected one block, got {:?}", again);
        };
        assert_eq!(reparsed.keyword, block.keyword);
        assert_eq!(reparsed.header, block.header);
        assert_eq!(reparsed.body, block.body);
        assert!(block.body.contains("\"s  t\""));
    }

    #[test]
    fn test_blank_line_before_block_body() {
        let source = preprocess("fun f()\n\n  x\n").unwrap();
        let statements = parse(&source.text);
        assert!(matches!(statements.as_slice(), [Node::Block(_)]));
    }

    #[test]
    fn test_errors() {
        let compiled = parser();
        let text = "x = 1#[ENDL]#\ny = #[ENDL]#\n";
        let err = compiled.parse(text, &LineMap::identity(text)).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.grammar, "Structural");

        let text = "n = 99999999999999999999#[ENDL]#";
        let err = compiled.parse(text, &LineMap::identity(text)).unwrap_err();
        assert!(err.detail.unwrap_or_default().contains("out of range"));
    }
}
