//! Grammar description parser
//!
//! Reads the textual form of a grammar into rule declarations:
//!
//! ```text
//! @@grammar :: Name
//! rule = label:element other | alternative ;
//! ```
//!
//! Elements are `'lit'`, `/re/`, `name`, `~` (cut), `$` (end of input),
//! `{e}` and `{e}+` (closures), `(s)%{e}`, `(s).{e}`, `(s)<{e}+`, `(s)>{e}+`
//! (joins, `+` for at least one element), `&e`, `!e`, `[e]` and `(choice)`.
//! A label is `name:` or `@:`.

use chumsky::prelude::*;

use crate::error::CompileError;
use crate::expr::{Element, Expr, JoinMode, Label};

/// A rule as declared in the description, before reference resolution.
#[derive(Debug, Clone)]
pub struct RuleDecl {
    pub name: String,
    pub body: Expr,
}

/// A parsed description: optional grammar name plus rules in declaration order.
#[derive(Debug, Clone)]
pub struct Description {
    pub name: Option<String>,
    pub rules: Vec<RuleDecl>,
}

/// Parse a grammar description.
pub fn parse_description(text: &str) -> Result<Description, CompileError> {
    description().parse(text).map_err(|errors| {
        let first = errors.into_iter().next();
        CompileError::Syntax {
            offset: first.as_ref().map(|e| e.span().start).unwrap_or(0),
            message: first
                .map(|e| e.to_string())
                .unwrap_or_else(|| "invalid grammar description".to_string()),
        }
    })
}

fn description() -> impl Parser<char, Description, Error = Simple<char>> {
    let header = just("@@grammar")
        .padded()
        .ignore_then(just("::").padded())
        .ignore_then(text::ident().padded());

    let rule = text::ident()
        .padded()
        .then_ignore(just('=').padded())
        .then(choice_expr())
        .then_ignore(just(';').padded())
        .map(|(name, body)| RuleDecl { name, body });

    header
        .or_not()
        .then(rule.repeated())
        .then_ignore(end())
        .map(|(name, rules)| Description { name, rules })
}

fn literal() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    let escaped = just('\\').ignore_then(any());
    escaped
        .or(none_of("\\'"))
        .repeated()
        .delimited_by(just('\''), just('\''))
        .collect::<String>()
}

fn regex() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    // `\/` is the escaped delimiter; every other escape is kept for the regex engine.
    let escaped = just('\\').ignore_then(any()).map(|c| {
        if c == '/' {
            vec!['/']
        } else {
            vec!['\\', c]
        }
    });
    escaped
        .or(none_of("/\\").map(|c| vec![c]))
        .repeated()
        .delimited_by(just('/'), just('/'))
        .map(|chunks: Vec<Vec<char>>| chunks.into_iter().flatten().collect::<String>())
}

fn choice_expr() -> impl Parser<char, Expr, Error = Simple<char>> + Clone {
    recursive(|alternatives| {
        let closure = alternatives
            .clone()
            .delimited_by(just('{').padded(), just('}'))
            .then(just('+').or_not())
            .map(|(expr, plus)| Expr::Closure {
                expr: Box::new(expr),
                positive: plus.is_some(),
            });

        let join_tail = one_of("%.<>")
            .then_ignore(just('{').padded())
            .then(alternatives.clone())
            .then_ignore(just('}'))
            .then(just('+').or_not());

        let group = alternatives
            .clone()
            .delimited_by(just('(').padded(), just(')'))
            .then(join_tail.or_not())
            .try_map(|(separator, tail), span| match tail {
                None => Ok(separator),
                Some(((symbol, expr), plus)) => {
                    let mode = JoinMode::from_symbol(symbol)
                        .ok_or_else(|| Simple::custom(span, "unknown join operator"))?;
                    Ok(Expr::Join {
                        separator: Box::new(separator),
                        expr: Box::new(expr),
                        mode,
                        positive: plus.is_some(),
                    })
                }
            });

        let optional = alternatives
            .clone()
            .delimited_by(just('[').padded(), just(']'))
            .map(|expr| Expr::Optional(Box::new(expr)));

        let term = recursive(|term| {
            let lookahead = just('&')
                .ignore_then(term.clone())
                .map(|expr| Expr::Lookahead(Box::new(expr)));
            let negative = just('!')
                .ignore_then(term)
                .map(|expr| Expr::NegativeLookahead(Box::new(expr)));

            choice((
                literal().map(Expr::Literal),
                regex().map(Expr::Regex),
                just('~').to(Expr::Cut),
                just('$').to(Expr::EndOfInput),
                closure.clone(),
                group.clone(),
                optional.clone(),
                lookahead,
                negative,
                text::ident().map(Expr::reference),
            ))
            .padded()
            .boxed()
        });

        let label = text::ident()
            .map(Label::Named)
            .or(just('@').to(Label::Override))
            .then_ignore(just(':'));

        let element = label
            .or_not()
            .then(term)
            .padded()
            .map(|(label, expr)| Element { label, expr });

        let sequence = element.repeated().at_least(1).map(|mut elements| {
            if elements.len() == 1 && elements[0].label.is_none() {
                elements.remove(0).expr
            } else {
                Expr::Sequence(elements)
            }
        });

        sequence
            .separated_by(just('|').padded())
            .at_least(1)
            .map(|mut options| {
                if options.len() == 1 {
                    options.remove(0)
                } else {
                    Expr::Choice(options)
                }
            })
            .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_rule(text: &str) -> Expr {
        let description = parse_description(text).unwrap();
        assert_eq!(description.rules.len(), 1);
        description.rules.into_iter().next().unwrap().body
    }

    #[test]
    fn test_header_and_rules() {
        let description =
            parse_description("@@grammar :: Demo\nstart = expr $ ;\nexpr = /[0-9]+/ ;").unwrap();
        assert_eq!(description.name.as_deref(), Some("Demo"));
        let names: Vec<_> = description.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["start", "expr"]);
    }

    #[test]
    fn test_literal_escapes() {
        match single_rule(r"quote = '\'' ;") {
            Expr::Literal(text) => assert_eq!(text, "'"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_regex_delimiter_escape() {
        match single_rule(r"op = /[+\/]/ ;") {
            Expr::Regex(source) => assert_eq!(source, "[+/]"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_labels_and_override() {
        match single_rule("r = name:identifier '(' @:args ')' ;") {
            Expr::Sequence(elements) => {
                assert_eq!(elements.len(), 4);
                assert_eq!(elements[0].label, Some(Label::Named("name".into())));
                assert_eq!(elements[1].label, None);
                assert_eq!(elements[2].label, Some(Label::Override));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_join_modes() {
        for (text, expected) in [
            ("r = (',')%{x} ;", JoinMode::Keep),
            ("r = (',').{x}+ ;", JoinMode::Gather),
            ("r = (op)<{x}+ ;", JoinMode::Left),
            ("r = (op)>{x}+ ;", JoinMode::Right),
        ] {
            match single_rule(text) {
                Expr::Join { mode, .. } => assert_eq!(mode, expected, "{}", text),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_group_without_join_is_transparent() {
        match single_rule("r = ('a' | 'b') ;") {
            Expr::Choice(options) => assert_eq!(options.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cut_closure_optional_lookahead() {
        match single_rule("r = '(' ~ {x}+ [y] &z !w ;") {
            Expr::Sequence(elements) => {
                assert!(matches!(elements[1].expr, Expr::Cut));
                assert!(matches!(elements[2].expr, Expr::Closure { positive: true, .. }));
                assert!(matches!(elements[3].expr, Expr::Optional(_)));
                assert!(matches!(elements[4].expr, Expr::Lookahead(_)));
                assert!(matches!(elements[5].expr, Expr::NegativeLookahead(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            parse_description("r = 'unterminated ;"),
            Err(CompileError::Syntax { .. })
        ));
    }
}
