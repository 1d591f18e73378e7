//! Rule algebra
//!
//! Grammar rules are kept as data so grammars can be sliced and recombined
//! before being rendered to the engine's description syntax. Every rule
//! knows the rule names it references and its own textual form.
//!
//! ```rust,ignore
//! let args = Rule::gather(Rule::literal(","), Rule::reference("expr"));
//! assert_eq!(args.describe(), "(',').{expr}");
//! assert_eq!(args.referenced_names(), vec!["expr"]);
//! ```

/// Fold direction of a [`Rule::Join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAssociativity {
    /// Flat list keeping the separators
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Literal(String),
    Regex(String),
    Reference(String),
    Cut,
    EndOfInput,
    Closure(Box<Rule>),
    PositiveClosure(Box<Rule>),
    Join {
        separator: Box<Rule>,
        rule: Box<Rule>,
        associativity: JoinAssociativity,
        positive: bool,
    },
    Gather {
        separator: Box<Rule>,
        rule: Box<Rule>,
        positive: bool,
    },
    Lookahead(Box<Rule>),
    /// Negative lookahead
    Not(Box<Rule>),
    Optional(Box<Rule>),
    Or(Vec<Rule>),
    And(Vec<Rule>),
}

impl Rule {
    pub fn literal(text: impl Into<String>) -> Self {
        Rule::Literal(text.into())
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Rule::Regex(pattern.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Rule::Reference(name.into())
    }

    pub fn closure(rule: Rule) -> Self {
        Rule::Closure(Box::new(rule))
    }

    pub fn positive_closure(rule: Rule) -> Self {
        Rule::PositiveClosure(Box::new(rule))
    }

    /// `(s)%{r}+`: at least one `rule`, separators kept.
    pub fn join(separator: Rule, rule: Rule) -> Self {
        Self::join_with(separator, rule, JoinAssociativity::None)
    }

    pub fn left_join(separator: Rule, rule: Rule) -> Self {
        Self::join_with(separator, rule, JoinAssociativity::Left)
    }

    pub fn right_join(separator: Rule, rule: Rule) -> Self {
        Self::join_with(separator, rule, JoinAssociativity::Right)
    }

    fn join_with(separator: Rule, rule: Rule, associativity: JoinAssociativity) -> Self {
        Rule::Join {
            separator: Box::new(separator),
            rule: Box::new(rule),
            associativity,
            positive: true,
        }
    }

    /// `(s).{r}`: zero or more `rule`, separators dropped.
    pub fn gather(separator: Rule, rule: Rule) -> Self {
        Rule::Gather {
            separator: Box::new(separator),
            rule: Box::new(rule),
            positive: false,
        }
    }

    pub fn positive_gather(separator: Rule, rule: Rule) -> Self {
        Rule::Gather {
            separator: Box::new(separator),
            rule: Box::new(rule),
            positive: true,
        }
    }

    pub fn lookahead(rule: Rule) -> Self {
        Rule::Lookahead(Box::new(rule))
    }

    pub fn not(rule: Rule) -> Self {
        Rule::Not(Box::new(rule))
    }

    pub fn optional(rule: Rule) -> Self {
        Rule::Optional(Box::new(rule))
    }

    pub fn or(rules: Vec<Rule>) -> Self {
        Rule::Or(rules)
    }

    pub fn and(rules: Vec<Rule>) -> Self {
        Rule::And(rules)
    }

    /// Names of the rules this rule refers to, in order of appearance.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Rule::Reference(name) => names.push(name),
            Rule::Closure(rule)
            | Rule::PositiveClosure(rule)
            | Rule::Lookahead(rule)
            | Rule::Not(rule)
            | Rule::Optional(rule) => rule.collect_names(names),
            Rule::Join {
                separator, rule, ..
            }
            | Rule::Gather {
                separator, rule, ..
            } => {
                separator.collect_names(names);
                rule.collect_names(names);
            }
            Rule::Or(rules) | Rule::And(rules) => {
                rules.iter().for_each(|rule| rule.collect_names(names))
            }
            Rule::Literal(_) | Rule::Regex(_) | Rule::Cut | Rule::EndOfInput => {}
        }
    }

    /// Grammar-description fragment for this rule.
    pub fn describe(&self) -> String {
        match self {
            Rule::Literal(text) => format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'")),
            Rule::Regex(pattern) => format!("/{}/", pattern.replace('/', "\\/")),
            Rule::Reference(name) => name.clone(),
            Rule::Cut => "~".to_string(),
            Rule::EndOfInput => "$".to_string(),
            Rule::Closure(rule) => format!("{{{}}}", rule.describe()),
            Rule::PositiveClosure(rule) => format!("{{{}}}+", rule.describe()),
            Rule::Join {
                separator,
                rule,
                associativity,
                positive,
            } => {
                let symbol = match associativity {
                    JoinAssociativity::None => '%',
                    JoinAssociativity::Left => '<',
                    JoinAssociativity::Right => '>',
                };
                format!(
                    "({}){}{{{}}}{}",
                    separator.describe(),
                    symbol,
                    rule.describe(),
                    plus(*positive)
                )
            }
            Rule::Gather {
                separator,
                rule,
                positive,
            } => format!(
                "({}).{{{}}}{}",
                separator.describe(),
                rule.describe(),
                plus(*positive)
            ),
            Rule::Lookahead(rule) => format!("&{}", rule.describe()),
            Rule::Not(rule) => format!("!{}", rule.describe()),
            Rule::Optional(rule) => format!("[{}]", rule.describe()),
            Rule::Or(rules) => group(rules, " | "),
            Rule::And(rules) => group(rules, " "),
        }
    }
}

fn plus(positive: bool) -> &'static str {
    if positive {
        "+"
    } else {
        ""
    }
}

fn group(rules: &[Rule], separator: &str) -> String {
    let parts: Vec<String> = rules.iter().map(Rule::describe).collect();
    format!("({})", parts.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Rule::literal("fun"), "'fun'")]
    #[case(Rule::literal("it's"), r"'it\'s'")]
    #[case(Rule::regex("[+/]"), r"/[+\/]/")]
    #[case(Rule::Cut, "~")]
    #[case(Rule::EndOfInput, "$")]
    #[case(Rule::closure(Rule::reference("stmt")), "{stmt}")]
    #[case(Rule::positive_closure(Rule::reference("lexeme")), "{lexeme}+")]
    #[case(Rule::join(Rule::reference("op"), Rule::reference("e")), "(op)%{e}+")]
    #[case(Rule::left_join(Rule::reference("op"), Rule::reference("e")), "(op)<{e}+")]
    #[case(Rule::right_join(Rule::reference("op"), Rule::reference("e")), "(op)>{e}+")]
    #[case(Rule::gather(Rule::literal(","), Rule::reference("e")), "(',').{e}")]
    #[case(Rule::positive_gather(Rule::literal(","), Rule::reference("e")), "(',').{e}+")]
    #[case(Rule::lookahead(Rule::literal("(")), "&'('")]
    #[case(Rule::not(Rule::literal("=")), "!'='")]
    #[case(Rule::optional(Rule::reference("chunk")), "[chunk]")]
    #[case(Rule::or(vec![Rule::literal("!"), Rule::literal("-")]), "('!' | '-')")]
    #[case(Rule::and(vec![Rule::literal("pass"), Rule::Cut]), "('pass' ~)")]
    fn test_describe(#[case] rule: Rule, #[case] expected: &str) {
        assert_eq!(rule.describe(), expected);
    }

    #[test]
    fn test_referenced_names_in_order() {
        let rule = Rule::or(vec![
            Rule::reference("block"),
            Rule::gather(Rule::reference("sep"), Rule::optional(Rule::reference("chunk"))),
            Rule::literal("x"),
            Rule::not(Rule::reference("endl")),
        ]);
        assert_eq!(rule.referenced_names(), vec!["block", "sep", "chunk", "endl"]);
    }

    #[test]
    fn test_descriptions_compile() {
        let rule = Rule::and(vec![
            Rule::literal("("),
            Rule::Cut,
            Rule::gather(Rule::literal(","), Rule::regex("[a-z]+")),
            Rule::literal(")"),
        ]);
        let description = format!("start = {} $ ;", rule.describe());
        let parser = keyform_peg::compile(&description).unwrap();
        let value = parser
            .parse::<()>("(a, b)", "start", &keyform_peg::Semantics::new())
            .unwrap();
        assert_eq!(value.into_items().len(), 3);
    }
}
