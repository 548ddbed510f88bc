//! Truth values, norms and per-clock predicate substitution.
//!
//! A guard evaluates to a [`Truth`] value. Two representations are
//! provided: plain `bool` for crisp monitors and [`Degree`], a bounded real
//! in [0,1], for quantitative ones. The representation is a type parameter
//! of the monitor and therefore fixed when the monitor is constructed.
//!
//! Conjunction and disjunction go through a [`Norm`], so that alternative
//! t-norm families can be selected per monitor. Comparisons between clock
//! derived values go through [`Substitutions`], where each clock may
//! register its own (fuzzy) notion of equality and ordering.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::table::{ClockId, NameHasher};

// ------------- Norms -------------
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Norm {
    /// min / max
    #[default]
    Godel,
    /// a*b / a+b-a*b
    Product,
    /// max(0,a+b-1) / min(1,a+b)
    Lukasiewicz,
}

// ------------- Degree -------------
/*
A degree is the quantitative counterpart of a boolean guard. It is kept as
an exact count of millionths rather than as a float: negation then is an
exact involution, and degrees can take part in ordering, hashing and hence
token deduplication without any epsilon handling.
*/
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Degree {
    millionths: u32,
}

impl Degree {
    pub const SCALE: u32 = 1_000_000;
    pub const ZERO: Degree = Degree { millionths: 0 };
    pub const ONE: Degree = Degree { millionths: Self::SCALE };

    pub fn new<T: Into<f64>>(d: T) -> Self {
        let d = d.into();
        let d = if d.is_nan() || d < 0. {
            0.
        } else if d > 1. {
            1.
        } else {
            d
        };
        Self {
            millionths: (d * Self::SCALE as f64).round() as u32,
        }
    }
    /// `numerator / denominator` clamped to [0,1], rounded to the nearest millionth.
    pub fn ratio(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 || numerator >= denominator {
            return Self::ONE;
        }
        let scaled = (numerator as u128 * Self::SCALE as u128 + denominator as u128 / 2)
            / denominator as u128;
        Self {
            millionths: scaled as u32,
        }
    }
    pub fn millionths(&self) -> u32 {
        self.millionths
    }
    pub fn value(&self) -> f64 {
        self.millionths as f64 / Self::SCALE as f64
    }
    fn product(a: u32, b: u32) -> u32 {
        ((a as u64 * b as u64 + Self::SCALE as u64 / 2) / Self::SCALE as u64) as u32
    }
}
impl Default for Degree {
    fn default() -> Self {
        Self::ONE
    }
}
impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Q({})", self.value())
    }
}
impl From<Degree> for f64 {
    fn from(d: Degree) -> f64 {
        d.value()
    }
}
impl From<bool> for Degree {
    fn from(b: bool) -> Degree {
        if b { Degree::ONE } else { Degree::ZERO }
    }
}

// ------------- Truth -------------
pub trait Truth: Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    // static stuff which needs to be implemented downstream
    const QUANTITATIVE: bool;
    const KIND: &'static str;
    fn from_bool(b: bool) -> Self;
    fn from_degree(d: Degree) -> Self;
    fn degree(&self) -> Degree;
    fn negate(self) -> Self;
    fn t_norm(self, other: Self, norm: Norm) -> Self;
    fn s_norm(self, other: Self, norm: Norm) -> Self;
    // instance callable with pre-made implementation
    fn top() -> Self {
        Self::from_bool(true)
    }
    fn bottom() -> Self {
        Self::from_bool(false)
    }
    /// "True enough" for a transition to be taken.
    fn holds(&self) -> bool {
        self.degree() > Degree::ZERO
    }
    fn kind(&self) -> &'static str {
        Self::KIND
    }
}

impl Truth for bool {
    const QUANTITATIVE: bool = false;
    const KIND: &'static str = "boolean";
    fn from_bool(b: bool) -> Self {
        b
    }
    fn from_degree(d: Degree) -> Self {
        d > Degree::ZERO
    }
    fn degree(&self) -> Degree {
        Degree::from(*self)
    }
    fn negate(self) -> Self {
        !self
    }
    // every norm collapses to classical logic on {0,1}
    fn t_norm(self, other: Self, _norm: Norm) -> Self {
        self && other
    }
    fn s_norm(self, other: Self, _norm: Norm) -> Self {
        self || other
    }
}

impl Truth for Degree {
    const QUANTITATIVE: bool = true;
    const KIND: &'static str = "quantitative";
    fn from_bool(b: bool) -> Self {
        Degree::from(b)
    }
    fn from_degree(d: Degree) -> Self {
        d
    }
    fn degree(&self) -> Degree {
        *self
    }
    fn negate(self) -> Self {
        Degree {
            millionths: Degree::SCALE - self.millionths,
        }
    }
    fn t_norm(self, other: Self, norm: Norm) -> Self {
        let (a, b) = (self.millionths, other.millionths);
        let millionths = match norm {
            Norm::Godel => a.min(b),
            Norm::Product => Degree::product(a, b),
            Norm::Lukasiewicz => (a + b).saturating_sub(Degree::SCALE),
        };
        Degree { millionths }
    }
    fn s_norm(self, other: Self, norm: Norm) -> Self {
        let (a, b) = (self.millionths, other.millionths);
        let millionths = match norm {
            Norm::Godel => a.max(b),
            Norm::Product => a + b - Degree::product(a, b),
            Norm::Lukasiewicz => (a + b).min(Degree::SCALE),
        };
        Degree { millionths }
    }
}

// ------------- Comparison -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparison::Eq | Comparison::Ne)
    }
}
impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The set of clocks that contributed to a computed value.
pub type ClockTags = RoaringBitmap;

// ------------- Substitution -------------
/// A clock-specific replacement for crisp `==` and `<`.
pub trait Substitution: fmt::Debug + Send + Sync {
    fn equal(&self, lhs: i64, rhs: i64) -> Degree;
    fn less(&self, lhs: i64, rhs: i64) -> Degree;
}

/// Crisp comparison, used for clocks without a registered substitution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crisp;
impl Substitution for Crisp {
    fn equal(&self, lhs: i64, rhs: i64) -> Degree {
        Degree::from(lhs == rhs)
    }
    fn less(&self, lhs: i64, rhs: i64) -> Degree {
        Degree::from(lhs < rhs)
    }
}

/// Comparison that fades out linearly over `band` milliseconds.
/// A band of zero is exactly [`Crisp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    pub band: u32,
}
impl Tolerance {
    pub fn new(band: u32) -> Self {
        Self { band }
    }
    fn fade(&self, distance: u64) -> Degree {
        let width = self.band as u64 + 1;
        Degree::ratio(width.saturating_sub(distance), width)
    }
}
impl Substitution for Tolerance {
    fn equal(&self, lhs: i64, rhs: i64) -> Degree {
        self.fade(lhs.abs_diff(rhs))
    }
    fn less(&self, lhs: i64, rhs: i64) -> Degree {
        if lhs < rhs {
            Degree::ONE
        } else {
            self.fade(lhs.abs_diff(rhs) + 1)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    registered: HashMap<ClockId, Arc<dyn Substitution>, NameHasher>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn register(&mut self, clock: ClockId, substitution: Arc<dyn Substitution>) {
        self.registered.insert(clock, substitution);
    }
    pub fn get(&self, clock: ClockId) -> Option<&Arc<dyn Substitution>> {
        self.registered.get(&clock)
    }
    pub fn len(&self) -> usize {
        self.registered.len()
    }
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
    /// Equality for a single clock, falling back to crisp `==`.
    pub fn equal<T: Truth>(&self, clock: ClockId, lhs: i64, rhs: i64) -> T {
        match self.registered.get(&clock) {
            Some(substitution) => T::from_degree(substitution.equal(lhs, rhs)),
            None => T::from_bool(lhs == rhs),
        }
    }
    /// Strict ordering for a single clock, falling back to crisp `<`.
    pub fn less<T: Truth>(&self, clock: ClockId, lhs: i64, rhs: i64) -> T {
        match self.registered.get(&clock) {
            Some(substitution) => T::from_degree(substitution.less(lhs, rhs)),
            None => T::from_bool(lhs < rhs),
        }
    }
    fn fold<T: Truth>(
        &self,
        tags: &ClockTags,
        norm: Norm,
        crisp: bool,
        per_clock: impl Fn(ClockId) -> T,
    ) -> T {
        if tags.is_empty() {
            return T::from_bool(crisp);
        }
        tags.iter()
            .map(per_clock)
            .fold(T::bottom(), |acc, t| acc.s_norm(t, norm))
    }
    /// Resolves `lhs op rhs` where the operands carry the clocks in `tags`.
    /// Untagged values compare crisply; tagged ones take the disjunction
    /// over every contributing clock's substitution.
    pub fn compare<T: Truth>(
        &self,
        tags: &ClockTags,
        op: Comparison,
        lhs: i64,
        rhs: i64,
        norm: Norm,
    ) -> T {
        let equal = |l: i64, r: i64| -> T {
            self.fold(tags, norm, l == r, |clock| self.equal(clock, l, r))
        };
        let less = |l: i64, r: i64| -> T {
            self.fold(tags, norm, l < r, |clock| self.less(clock, l, r))
        };
        match op {
            Comparison::Eq => equal(lhs, rhs),
            Comparison::Ne => equal(lhs, rhs).negate(),
            Comparison::Lt => less(lhs, rhs),
            Comparison::Le => less(lhs, rhs).s_norm(equal(lhs, rhs), norm),
            Comparison::Gt => less(rhs, lhs),
            Comparison::Ge => less(rhs, lhs).s_norm(equal(rhs, lhs), norm),
        }
    }
}
