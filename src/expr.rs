//! Guard expressions and their evaluation against a snapshot and a token's
//! clock traces.
//!
//! Values produced while evaluating are either integers, carrying the set of
//! clocks they were computed from, or truth values. Integers used where a
//! truth value is expected mean true when non-zero, which is how boolean
//! variables travel through the transport.

use std::collections::BTreeMap;
use std::fmt;

use crate::clock::{Clock, ClockPart, Stale, StalePolicy, Trace};
use crate::error::MonitorError;
use crate::snapshot::{History, Snapshot};
use crate::table::ClockId;
use crate::truth::{ClockTags, Comparison, Norm, Substitutions, Truth};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arithmetic {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}
impl Arithmetic {
    pub fn symbol(&self) -> &'static str {
        match self {
            Arithmetic::Add => "+",
            Arithmetic::Sub => "-",
            Arithmetic::Mul => "*",
            Arithmetic::Div => "/",
            Arithmetic::Rem => "%",
        }
    }
    fn apply(&self, lhs: i64, rhs: i64) -> Result<i64, MonitorError> {
        let result = match self {
            Arithmetic::Add => lhs.checked_add(rhs),
            Arithmetic::Sub => lhs.checked_sub(rhs),
            Arithmetic::Mul => lhs.checked_mul(rhs),
            Arithmetic::Div if rhs == 0 => {
                return Err(MonitorError::Evaluation(format!("division by zero in {} / 0", lhs)));
            }
            Arithmetic::Rem if rhs == 0 => {
                return Err(MonitorError::Evaluation(format!("remainder by zero in {} % 0", lhs)));
            }
            Arithmetic::Div => lhs.checked_div(rhs),
            Arithmetic::Rem => lhs.checked_rem(rhs),
        };
        result.ok_or_else(|| {
            MonitorError::Evaluation(format!("overflow in {} {} {}", lhs, self.symbol(), rhs))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Bool(bool),
    Int(i64),
    /// A snapshot variable, `depth` steps ago.
    Var { name: String, depth: usize },
    Clock {
        id: ClockId,
        name: String,
        depth: usize,
        part: ClockPart,
    },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Arith(Arithmetic, Box<Expr>, Box<Expr>),
    Compare(Comparison, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Static type of an expression, checked when a table is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Int,
    Truth,
    /// Variables, which are integers on the wire but double as booleans.
    Either,
}
impl Kind {
    fn admits(&self, wanted: Kind) -> bool {
        *self == Kind::Either || *self == wanted
    }
}
impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kind::Int => write!(f, "integer"),
            Kind::Truth => write!(f, "truth value"),
            Kind::Either => write!(f, "variable"),
        }
    }
}

/// Why a guard produced no truth value.
#[derive(Debug)]
pub enum Fault {
    /// Clock history that is not retained; absorbed by the rule loop.
    Stale(Stale),
    Failed(MonitorError),
}
impl From<Stale> for Fault {
    fn from(stale: Stale) -> Self {
        Fault::Stale(stale)
    }
}
impl From<MonitorError> for Fault {
    fn from(error: MonitorError) -> Self {
        Fault::Failed(error)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value<T: Truth> {
    Int(i64, ClockTags),
    Truth(T),
}
impl<T: Truth> Value<T> {
    pub fn truth(self) -> T {
        match self {
            Value::Int(v, _) => T::from_bool(v != 0),
            Value::Truth(t) => t,
        }
    }
    fn int(self, context: &Expr) -> Result<(i64, ClockTags), Fault> {
        match self {
            Value::Int(v, tags) => Ok((v, tags)),
            Value::Truth(_) => Err(Fault::Failed(MonitorError::Evaluation(format!(
                "expected an integer in {}",
                context
            )))),
        }
    }
}

/// Everything a guard may look at.
pub struct Scope<'a> {
    pub snapshot: &'a Snapshot,
    pub history: &'a History,
    pub traces: &'a [Trace],
    pub substitutions: &'a Substitutions,
    pub norm: Norm,
    pub stale: StalePolicy,
}

impl Expr {
    pub fn not(e: Expr) -> Expr {
        Expr::Not(Box::new(e))
    }
    pub fn and(l: Expr, r: Expr) -> Expr {
        Expr::And(Box::new(l), Box::new(r))
    }
    pub fn or(l: Expr, r: Expr) -> Expr {
        Expr::Or(Box::new(l), Box::new(r))
    }
    pub fn compare(op: Comparison, l: Expr, r: Expr) -> Expr {
        Expr::Compare(op, Box::new(l), Box::new(r))
    }
    pub fn arith(op: Arithmetic, l: Expr, r: Expr) -> Expr {
        Expr::Arith(op, Box::new(l), Box::new(r))
    }
    pub fn var(name: &str) -> Expr {
        Expr::Var {
            name: name.to_owned(),
            depth: 0,
        }
    }

    pub fn kind(&self) -> Result<Kind, MonitorError> {
        let expect = |e: &Expr, wanted: Kind| -> Result<(), MonitorError> {
            let found = e.kind()?;
            if found.admits(wanted) {
                Ok(())
            } else {
                Err(MonitorError::Specification(format!(
                    "{} is a {} where a {} is expected",
                    e, found, wanted
                )))
            }
        };
        match self {
            Expr::Bool(_) => Ok(Kind::Truth),
            Expr::Int(_) | Expr::Clock { .. } => Ok(Kind::Int),
            Expr::Var { .. } => Ok(Kind::Either),
            Expr::Not(e) => expect(e, Kind::Truth).map(|_| Kind::Truth),
            Expr::Neg(e) => expect(e, Kind::Int).map(|_| Kind::Int),
            Expr::Arith(_, l, r) => {
                expect(l, Kind::Int)?;
                expect(r, Kind::Int)?;
                Ok(Kind::Int)
            }
            Expr::Compare(_, l, r) => {
                expect(l, Kind::Int)?;
                expect(r, Kind::Int)?;
                Ok(Kind::Truth)
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                expect(l, Kind::Truth)?;
                expect(r, Kind::Truth)?;
                Ok(Kind::Truth)
            }
        }
    }

    /// Deepest history depth per referenced variable.
    pub fn variables(&self, found: &mut BTreeMap<String, usize>) {
        self.visit(&mut |e| {
            if let Expr::Var { name, depth } = e {
                let deepest = found.entry(name.clone()).or_insert(0);
                *deepest = (*deepest).max(*depth);
            }
        });
    }
    /// Deepest history depth per referenced clock.
    pub fn clocks(&self, found: &mut BTreeMap<ClockId, usize>) {
        self.visit(&mut |e| {
            if let Expr::Clock { id, depth, .. } = e {
                let deepest = found.entry(*id).or_insert(0);
                *deepest = (*deepest).max(*depth);
            }
        });
    }
    fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Not(e) | Expr::Neg(e) => e.visit(f),
            Expr::Arith(_, l, r) | Expr::Compare(_, l, r) | Expr::And(l, r) | Expr::Or(l, r) => {
                l.visit(f);
                r.visit(f);
            }
            _ => (),
        }
    }

    /// Evaluates the expression as a guard.
    pub fn holds_in<T: Truth>(&self, scope: &Scope) -> Result<T, Fault> {
        Ok(self.value::<T>(scope)?.truth())
    }

    // Both sides of && and || are always evaluated, so a stale reference is
    // reported regardless of the other operand and of the truth representation.
    pub fn value<T: Truth>(&self, scope: &Scope) -> Result<Value<T>, Fault> {
        match self {
            Expr::Bool(b) => Ok(Value::Truth(T::from_bool(*b))),
            Expr::Int(v) => Ok(Value::Int(*v, ClockTags::new())),
            Expr::Var { name, depth } => {
                let v = if *depth == 0 {
                    scope
                        .snapshot
                        .get(name)
                        .ok_or_else(|| MonitorError::MissingVariable(name.clone()))?
                } else {
                    scope.history.value(name, *depth)
                };
                Ok(Value::Int(v, ClockTags::new()))
            }
            Expr::Clock {
                id, name, depth, part,
            } => {
                let trace = scope.traces.get(*id as usize).ok_or_else(|| {
                    MonitorError::Evaluation(format!("token carries no trace for clock {}", name))
                })?;
                let clock = match (trace.at(*depth), scope.stale) {
                    (Ok(clock), _) => clock,
                    (Err(_), StalePolicy::Zero) => Clock::default(),
                    (Err(stale), StalePolicy::Skip) => return Err(Fault::Stale(stale)),
                };
                let v = i64::try_from(part.of(&clock)).unwrap_or(i64::MAX);
                let mut tags = ClockTags::new();
                tags.insert(*id);
                Ok(Value::Int(v, tags))
            }
            Expr::Not(e) => Ok(Value::Truth(e.value::<T>(scope)?.truth().negate())),
            Expr::Neg(e) => {
                let (v, tags) = e.value::<T>(scope)?.int(self)?;
                let v = v.checked_neg().ok_or_else(|| {
                    MonitorError::Evaluation(format!("overflow negating {}", v))
                })?;
                Ok(Value::Int(v, tags))
            }
            Expr::Arith(op, l, r) => {
                let (lv, lt) = l.value::<T>(scope)?.int(self)?;
                let (rv, rt) = r.value::<T>(scope)?.int(self)?;
                Ok(Value::Int(op.apply(lv, rv)?, lt | rt))
            }
            Expr::Compare(op, l, r) => {
                let (lv, lt) = l.value::<T>(scope)?.int(self)?;
                let (rv, rt) = r.value::<T>(scope)?.int(self)?;
                let tags = lt | rt;
                Ok(Value::Truth(
                    scope.substitutions.compare(&tags, *op, lv, rv, scope.norm),
                ))
            }
            Expr::And(l, r) => {
                let lv = l.value::<T>(scope)?.truth();
                let rv = r.value::<T>(scope)?.truth();
                Ok(Value::Truth(lv.t_norm(rv, scope.norm)))
            }
            Expr::Or(l, r) => {
                let lv = l.value::<T>(scope)?.truth();
                let rv = r.value::<T>(scope)?.truth();
                Ok(Value::Truth(lv.s_norm(rv, scope.norm)))
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(..) => 1,
            Expr::And(..) => 2,
            Expr::Compare(..) => 3,
            Expr::Arith(Arithmetic::Add | Arithmetic::Sub, ..) => 4,
            Expr::Arith(..) => 5,
            Expr::Not(_) | Expr::Neg(_) => 6,
            _ => 7,
        }
    }
    fn fmt_operand(&self, f: &mut fmt::Formatter, operand: &Expr, tight: bool) -> fmt::Result {
        let wrap = operand.precedence() < self.precedence()
            || (tight && operand.precedence() == self.precedence());
        if wrap {
            write!(f, "({})", operand)
        } else {
            write!(f, "{}", operand)
        }
    }
    fn fmt_binary(&self, f: &mut fmt::Formatter, symbol: &str, l: &Expr, r: &Expr) -> fmt::Result {
        self.fmt_operand(f, l, false)?;
        write!(f, " {} ", symbol)?;
        self.fmt_operand(f, r, true)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Int(v) => write!(f, "{}", v),
            Expr::Var { name, depth } => match depth {
                0 => write!(f, "{}", name),
                d => write!(f, "{}@{}", name, d),
            },
            Expr::Clock {
                name, depth, part, ..
            } => {
                write!(f, "{}", name)?;
                if *depth > 0 {
                    write!(f, "@{}", depth)?;
                }
                match part {
                    ClockPart::Total => Ok(()),
                    ClockPart::Env => write!(f, ".env"),
                    ClockPart::Sys => write!(f, ".sys"),
                }
            }
            Expr::Not(e) => {
                write!(f, "!")?;
                self.fmt_operand(f, e, false)
            }
            Expr::Neg(e) => {
                write!(f, "-")?;
                self.fmt_operand(f, e, false)
            }
            Expr::Arith(op, l, r) => self.fmt_binary(f, op.symbol(), l, r),
            // comparisons do not chain
            Expr::Compare(op, l, r) => {
                self.fmt_operand(f, l, true)?;
                write!(f, " {} ", op)?;
                self.fmt_operand(f, r, true)
            }
            Expr::And(l, r) => self.fmt_binary(f, "&&", l, r),
            Expr::Or(l, r) => self.fmt_binary(f, "||", l, r),
        }
    }
}
