//! Expression interpreter
//!
//! Walks the compiled [`Expr`] trees directly against the input text. Rule
//! results are memoized per (rule, position), which keeps backtracking linear.
//!
//! Cut handling: every choice option, repetition step and rule call opens a
//! frame on the cut flag. A cut sets the flag of the innermost frame. When an
//! option fails after its cut, the choice gives up instead of trying the next
//! option. Rule calls pass their flag on to the caller's frame, so a cut in a
//! rule that is not itself a choice commits the option that called it.

use tracing::trace;

use crate::error::ParseFailure;
use crate::expr::{Element, Expr, JoinMode, Label, Pattern};
use crate::semantics::{Semantics, Span};
use crate::state::{Fail, MemoEntry, Outcome, ParseState};
use crate::value::{Fold, Record, Value};

/// A resolved rule.
#[derive(Debug, Clone)]
pub(crate) struct RuleDef {
    pub name: String,
    pub body: Expr,
}

pub(crate) struct Interpreter<'p, 'a, T> {
    rules: &'p [RuleDef],
    semantics: &'p Semantics<T>,
    state: ParseState<'a, T>,
}

impl<'p, 'a, T: Clone> Interpreter<'p, 'a, T> {
    pub fn new(rules: &'p [RuleDef], semantics: &'p Semantics<T>, input: &'a str) -> Self {
        Interpreter {
            rules,
            semantics,
            state: ParseState::new(input),
        }
    }

    /// Run the rule at `index` from the start of the input.
    pub fn run(mut self, index: usize) -> Result<Value<T>, ParseFailure> {
        match self.call_rule(index) {
            Ok(value) => Ok(value),
            Err(_) => Err(self.state.into_failure()),
        }
    }

    fn call_rule(&mut self, index: usize) -> Outcome<T> {
        let origin = self.state.pos();
        if let Some(entry) = self.state.memo_get(index, origin) {
            let entry = entry.clone();
            self.state.cut |= entry.cut;
            return match entry.outcome {
                Ok((value, end)) => {
                    self.state.set_pos(end);
                    Ok(value)
                }
                Err(fail) => Err(fail),
            };
        }

        let rules = self.rules;
        let rule = &rules[index];
        trace!(rule = %rule.name, pos = origin, "enter");

        // Seed the memo so a left-recursive call fails instead of looping.
        self.state.memo_put(
            index,
            origin,
            MemoEntry {
                outcome: Err(Fail::Soft),
                cut: false,
            },
        );

        let saved = std::mem::replace(&mut self.state.cut, false);
        self.state.skip_whitespace();
        let start = self.state.pos();
        let result = self.eval(&rule.body);
        let leaked = self.state.cut;
        self.state.cut = saved || leaked;

        let result = match result {
            Ok(value) => self.apply_action(rule, value, start),
            Err(fail) => Err(fail),
        };

        let outcome = match &result {
            Ok(value) => Ok((value.clone(), self.state.pos())),
            Err(fail) => {
                self.state.set_pos(origin);
                Err(*fail)
            }
        };
        if outcome.is_err() && self.state.is_quiet() {
            // Failures inside a lookahead left no expectations behind.
            self.state.memo_remove(index, origin);
        } else {
            self.state.memo_put(
                index,
                origin,
                MemoEntry {
                    outcome,
                    cut: leaked,
                },
            );
        }
        result
    }

    fn apply_action(&mut self, rule: &RuleDef, value: Value<T>, start: usize) -> Outcome<T> {
        let Some(action) = self.semantics.get(&rule.name) else {
            return Ok(value);
        };
        let end = self.state.pos();
        let span = Span {
            start,
            end,
            line: self.state.line_column(start).0,
            text: self.state.slice(start, end),
        };
        action(value, &span).map_err(|message| {
            self.state.abort(ParseFailure::Action {
                rule: rule.name.clone(),
                line: span.line,
                message,
            })
        })
    }

    fn eval(&mut self, expr: &Expr) -> Outcome<T> {
        match expr {
            Expr::Literal(text) => self.literal(text),
            Expr::Pattern(pattern) => self.pattern(pattern),
            Expr::Regex(source) => Err(self.state.expected(format!("/{}/", source))),
            Expr::Reference(reference) => self.call_rule(reference.index),
            Expr::Cut => {
                self.state.cut = true;
                Ok(Value::Nil)
            }
            Expr::EndOfInput => {
                self.state.skip_whitespace();
                if self.state.at_end() {
                    Ok(Value::Nil)
                } else {
                    Err(self.state.expected("end of input"))
                }
            }
            Expr::Closure { expr, positive } => self.closure(expr, *positive),
            Expr::Join {
                separator,
                expr,
                mode,
                positive,
            } => self.join(separator, expr, *mode, *positive),
            Expr::Lookahead(inner) => {
                let origin = self.state.pos();
                let saved = self.state.cut;
                self.state.enter_quiet();
                let result = self.eval(inner);
                self.state.exit_quiet();
                self.state.cut = saved;
                self.state.set_pos(origin);
                match result {
                    Ok(_) => Ok(Value::Nil),
                    Err(Fail::Fatal) => Err(Fail::Fatal),
                    Err(_) => Err(Fail::Soft),
                }
            }
            Expr::NegativeLookahead(inner) => {
                let origin = self.state.pos();
                let saved = self.state.cut;
                self.state.enter_quiet();
                let result = self.eval(inner);
                self.state.exit_quiet();
                self.state.cut = saved;
                self.state.set_pos(origin);
                match result {
                    Ok(_) => Err(Fail::Soft),
                    Err(Fail::Fatal) => Err(Fail::Fatal),
                    Err(_) => Ok(Value::Nil),
                }
            }
            Expr::Optional(inner) => {
                let origin = self.state.pos();
                let (result, committed) = self.framed(inner);
                match result {
                    Ok(value) => Ok(value),
                    Err(Fail::Fatal) => Err(Fail::Fatal),
                    Err(Fail::Cut) => Err(Fail::Soft),
                    Err(Fail::Soft) if committed => Err(Fail::Soft),
                    Err(Fail::Soft) => {
                        self.state.set_pos(origin);
                        Ok(Value::Nil)
                    }
                }
            }
            Expr::Choice(options) => self.choice(options),
            Expr::Sequence(elements) => self.sequence(elements),
        }
    }

    /// Evaluate in a fresh cut frame, returning whether the frame was cut.
    fn framed(&mut self, expr: &Expr) -> (Outcome<T>, bool) {
        let saved = std::mem::replace(&mut self.state.cut, false);
        let result = self.eval(expr);
        let committed = self.state.cut;
        self.state.cut = saved;
        (result, committed)
    }

    fn literal(&mut self, text: &str) -> Outcome<T> {
        self.state.skip_whitespace();
        if !self.state.rest().starts_with(text) {
            return Err(self.state.expected(format!("'{}'", text)));
        }
        let origin = self.state.pos();
        self.state.advance(text.len());
        if is_word(text) && self.state.peek().is_some_and(is_word_char) {
            self.state.set_pos(origin);
            return Err(self.state.expected(format!("'{}'", text)));
        }
        Ok(Value::Text(text.to_string()))
    }

    fn pattern(&mut self, pattern: &Pattern) -> Outcome<T> {
        self.state.skip_whitespace();
        match pattern.regex.find(self.state.rest()) {
            Some(found) => {
                let text = found.as_str().to_string();
                self.state.advance(found.end());
                Ok(Value::Text(text))
            }
            None => Err(self.state.expected(format!("/{}/", pattern.source))),
        }
    }

    fn choice(&mut self, options: &[Expr]) -> Outcome<T> {
        let origin = self.state.pos();
        for option in options {
            let (result, committed) = self.framed(option);
            match result {
                Ok(value) => return Ok(value),
                Err(Fail::Fatal) => return Err(Fail::Fatal),
                Err(Fail::Cut) => {
                    self.state.set_pos(origin);
                    return Err(Fail::Soft);
                }
                Err(Fail::Soft) => {
                    self.state.set_pos(origin);
                    if committed {
                        return Err(Fail::Soft);
                    }
                }
            }
        }
        Err(Fail::Soft)
    }

    fn sequence(&mut self, elements: &[Element]) -> Outcome<T> {
        let origin = self.state.pos();
        let mut record = Record::new();
        let mut labeled = false;
        let mut promoted = None;
        let mut parts = Vec::new();

        for element in elements {
            let value = match self.eval(&element.expr) {
                Ok(value) => value,
                Err(fail) => {
                    self.state.set_pos(origin);
                    return Err(fail);
                }
            };
            match &element.label {
                Some(Label::Named(name)) => {
                    labeled = true;
                    record.insert(name.as_str(), value);
                }
                Some(Label::Override) => promoted = Some(value),
                None if value.is_nil() => {}
                None => parts.push(value),
            }
        }

        Ok(match promoted {
            Some(value) => value,
            None if labeled => Value::Record(record),
            None => Value::from_parts(parts),
        })
    }

    /// One repetition step in its own cut frame. `Ok(None)` ends the repetition.
    fn step(&mut self, exprs: &[&Expr]) -> Result<Option<Vec<Value<T>>>, Fail> {
        let origin = self.state.pos();
        let saved = std::mem::replace(&mut self.state.cut, false);
        let mut values = Vec::with_capacity(exprs.len());
        let mut failure = None;
        for expr in exprs {
            match self.eval(expr) {
                Ok(value) => values.push(value),
                Err(fail) => {
                    failure = Some(fail);
                    break;
                }
            }
        }
        let committed = self.state.cut;
        self.state.cut = saved;

        match failure {
            None if self.state.pos() == origin => Ok(None),
            None => Ok(Some(values)),
            Some(Fail::Soft) if !committed => {
                self.state.set_pos(origin);
                Ok(None)
            }
            Some(Fail::Fatal) => Err(Fail::Fatal),
            Some(_) => {
                self.state.set_pos(origin);
                Err(Fail::Cut)
            }
        }
    }

    fn closure(&mut self, expr: &Expr, positive: bool) -> Outcome<T> {
        let origin = self.state.pos();
        let mut items = Vec::new();
        while let Some(mut values) = self.step(&[expr])? {
            items.append(&mut values);
        }
        if positive && items.is_empty() {
            self.state.set_pos(origin);
            return Err(Fail::Soft);
        }
        Ok(Value::List(items))
    }

    fn join(&mut self, separator: &Expr, expr: &Expr, mode: JoinMode, positive: bool) -> Outcome<T> {
        let origin = self.state.pos();
        let Some(mut first) = self.step(&[expr])? else {
            if positive {
                return Err(Fail::Soft);
            }
            return Ok(match mode {
                JoinMode::Keep | JoinMode::Gather => Value::List(Vec::new()),
                JoinMode::Left | JoinMode::Right => Value::Nil,
            });
        };
        let head = first.pop().unwrap_or(Value::Nil);

        let mut pairs = Vec::new();
        loop {
            match self.step(&[separator, expr]) {
                Ok(Some(mut values)) => {
                    let item = values.pop().unwrap_or(Value::Nil);
                    let sep = values.pop().unwrap_or(Value::Nil);
                    pairs.push((sep, item));
                }
                Ok(None) => break,
                Err(fail) => {
                    self.state.set_pos(origin);
                    return Err(fail);
                }
            }
        }

        Ok(match mode {
            JoinMode::Keep => {
                let mut items = vec![head];
                for (sep, item) in pairs {
                    items.push(sep);
                    items.push(item);
                }
                Value::List(items)
            }
            JoinMode::Gather => {
                let mut items = vec![head];
                items.extend(pairs.into_iter().map(|(_, item)| item));
                Value::List(items)
            }
            JoinMode::Left => pairs.into_iter().fold(head, |left, (op, right)| {
                Value::Fold(Box::new(Fold { op, left, right }))
            }),
            JoinMode::Right => fold_right(head, pairs),
        })
    }
}

fn fold_right<T>(head: Value<T>, pairs: Vec<(Value<T>, Value<T>)>) -> Value<T> {
    // a op1 b op2 c => Fold(op1, a, Fold(op2, b, c))
    let mut operands = vec![head];
    let mut ops = Vec::with_capacity(pairs.len());
    for (op, item) in pairs {
        ops.push(op);
        operands.push(item);
    }
    let mut acc = operands.pop().unwrap_or(Value::Nil);
    while let (Some(op), Some(left)) = (ops.pop(), operands.pop()) {
        acc = Value::Fold(Box::new(Fold {
            op,
            left,
            right: acc,
        }));
    }
    acc
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_word_char)
}
