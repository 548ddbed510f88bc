//! Parser for the automaton description language, see `automaton.pest`.

use bimap::BiMap;
use lazy_static::lazy_static;
use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::clock::{ClockPart, Retention};
use crate::error::{MonitorError, Result};
use crate::expr::{Arithmetic, Expr};
use crate::table::{ClockId, Table, TableBuilder};
use crate::truth::Comparison;

#[derive(Parser)]
#[grammar = "automaton.pest"]
struct AutomatonParser;

lazy_static! {
    // lowest binding first
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::not) | Op::prefix(Rule::neg));
}

impl From<pest::error::Error<Rule>> for MonitorError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let (line, col) = match e.line_col {
            LineColLocation::Pos((line, col)) => (line, col),
            LineColLocation::Span((line, col), _) => (line, col),
        };
        MonitorError::Parse {
            message: e.to_string(),
            line: Some(line),
            col: Some(col),
        }
    }
}

fn located(pair: &Pair<Rule>, message: String) -> MonitorError {
    let (line, col) = pair.as_span().start_pos().line_col();
    MonitorError::Parse {
        message,
        line: Some(line),
        col: Some(col),
    }
}

fn number(pair: &Pair<Rule>) -> Result<i64> {
    pair.as_str()
        .parse::<i64>()
        .map_err(|e| located(pair, format!("{}: {}", pair.as_str(), e)))
}

fn depth(pair: &Pair<Rule>) -> Result<usize> {
    pair.as_str()
        .parse::<usize>()
        .map_err(|e| located(pair, format!("{}: {}", pair.as_str(), e)))
}

fn idents(pairs: Pairs<Rule>) -> Vec<String> {
    pairs
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_owned())
        .collect()
}

/// Parses a whole automaton description into a table.
pub fn table(text: &str) -> Result<Table> {
    let automaton = AutomatonParser::parse(Rule::automaton, text)?
        .next()
        .ok_or_else(|| MonitorError::Parse {
            message: "empty description".into(),
            line: None,
            col: None,
        })?;
    let mut items = automaton.into_inner();
    let name = items.next().map(|p| p.as_str().to_owned()).unwrap_or_default();
    let items: Vec<Pair<Rule>> = items.collect();

    // clocks first, so that rules may precede the declarations they read
    let mut builder = TableBuilder::new(&name);
    for item in items.iter().filter(|p| p.as_rule() == Rule::clocks) {
        let mut retention = None;
        let mut names = Vec::new();
        for part in item.clone().into_inner() {
            match part.as_rule() {
                Rule::ident => names.push(part.as_str().to_owned()),
                Rule::keep => retention = Some(keep(part)?),
                _ => (),
            }
        }
        for clock in names {
            builder = builder.declare(&clock, retention);
        }
    }
    for item in items {
        match item.as_rule() {
            Rule::initial => {
                for mode in idents(item.into_inner()) {
                    builder = builder.initial(&mode);
                }
            }
            Rule::rule => {
                let mut from = String::new();
                let mut to = String::new();
                let mut precondition = Expr::Bool(true);
                let mut postcondition = Expr::Bool(true);
                let mut resets = Vec::new();
                for part in item.into_inner() {
                    match part.as_rule() {
                        Rule::ident if from.is_empty() => from = part.as_str().to_owned(),
                        Rule::ident => to = part.as_str().to_owned(),
                        Rule::precondition => {
                            precondition = condition(part, builder.clock_ids())?;
                        }
                        Rule::postcondition => {
                            postcondition = condition(part, builder.clock_ids())?;
                        }
                        Rule::resets => resets = idents(part.into_inner()),
                        _ => (),
                    }
                }
                builder = builder.rule_expr(&from, &to, precondition, postcondition, resets);
            }
            _ => (),
        }
    }
    builder.build()
}

fn keep(pair: Pair<Rule>) -> Result<Retention> {
    match pair.into_inner().next() {
        Some(p) if p.as_rule() == Rule::keep_latest => Ok(Retention::Latest),
        Some(p) if p.as_rule() == Rule::keep_all => Ok(Retention::Unbounded),
        Some(p) => match depth(&p)? {
            0 => Err(located(&p, "a clock must keep at least one frame".into())),
            1 => Ok(Retention::Latest),
            n => Ok(Retention::Ring(n)),
        },
        None => Ok(Retention::Latest),
    }
}

fn condition(pair: Pair<Rule>, clocks: &BiMap<String, ClockId>) -> Result<Expr> {
    match pair.into_inner().next() {
        Some(expression) => expr(expression.into_inner(), clocks),
        None => Ok(Expr::Bool(true)),
    }
}

/// Parses a single guard, resolving names against the given clocks.
pub fn guard(text: &str, clocks: &BiMap<String, ClockId>) -> Result<Expr> {
    let mut pairs = AutomatonParser::parse(Rule::guard, text)?;
    let expression = pairs
        .next()
        .and_then(|guard| guard.into_inner().next())
        .ok_or_else(|| MonitorError::Parse {
            message: format!("'{}' is not a guard", text),
            line: None,
            col: None,
        })?;
    expr(expression.into_inner(), clocks)
}

fn expr(pairs: Pairs<Rule>, clocks: &BiMap<String, ClockId>) -> Result<Expr> {
    PRATT
        .map_primary(|primary| match primary.as_rule() {
            Rule::boolean => Ok(Expr::Bool(primary.as_str() == "true")),
            Rule::literal => Ok(Expr::Int(number(&primary)?)),
            Rule::reference => reference(primary, clocks),
            Rule::expression => expr(primary.into_inner(), clocks),
            other => Err(located(&primary, format!("unexpected {:?}", other))),
        })
        .map_prefix(|op, operand| {
            let operand = operand?;
            match op.as_rule() {
                Rule::not => Ok(Expr::not(operand)),
                // fold literals so that - 5 stays a literal
                Rule::neg => match operand {
                    Expr::Int(v) if v != i64::MIN => Ok(Expr::Int(-v)),
                    operand => Ok(Expr::Neg(Box::new(operand))),
                },
                other => Err(located(&op, format!("unexpected prefix {:?}", other))),
            }
        })
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (lhs?, rhs?);
            let e = match op.as_rule() {
                Rule::or => Expr::or(lhs, rhs),
                Rule::and => Expr::and(lhs, rhs),
                Rule::eq => Expr::compare(Comparison::Eq, lhs, rhs),
                Rule::ne => Expr::compare(Comparison::Ne, lhs, rhs),
                Rule::lt => Expr::compare(Comparison::Lt, lhs, rhs),
                Rule::le => Expr::compare(Comparison::Le, lhs, rhs),
                Rule::gt => Expr::compare(Comparison::Gt, lhs, rhs),
                Rule::ge => Expr::compare(Comparison::Ge, lhs, rhs),
                Rule::add => Expr::arith(Arithmetic::Add, lhs, rhs),
                Rule::sub => Expr::arith(Arithmetic::Sub, lhs, rhs),
                Rule::mul => Expr::arith(Arithmetic::Mul, lhs, rhs),
                Rule::div => Expr::arith(Arithmetic::Div, lhs, rhs),
                Rule::rem => Expr::arith(Arithmetic::Rem, lhs, rhs),
                other => return Err(located(&op, format!("unexpected operator {:?}", other))),
            };
            Ok(e)
        })
        .parse(pairs)
}

// name, name@depth, name.env, name@depth.sys
fn reference(pair: Pair<Rule>, clocks: &BiMap<String, ClockId>) -> Result<Expr> {
    let mut name = "";
    let mut at = 0;
    let mut part = None;
    for piece in pair.clone().into_inner() {
        match piece.as_rule() {
            Rule::ident => name = piece.as_str(),
            Rule::integer => at = depth(&piece)?,
            Rule::part if piece.as_str() == "env" => part = Some(ClockPart::Env),
            Rule::part => part = Some(ClockPart::Sys),
            _ => (),
        }
    }
    match (clocks.get_by_left(name), part) {
        (Some(id), part) => Ok(Expr::Clock {
            id: *id,
            name: name.to_owned(),
            depth: at,
            part: part.unwrap_or(ClockPart::Total),
        }),
        (None, None) => Ok(Expr::Var {
            name: name.to_owned(),
            depth: at,
        }),
        (None, Some(_)) => Err(located(
            &pair,
            format!("{} is not a clock, so it has no env or sys part", name),
        )),
    }
}
