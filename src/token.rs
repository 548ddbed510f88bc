//! Tokens: candidate interpretations of the observations so far.
//!
//! A [`Token`] pairs a mode with the histories of every clock and the
//! accumulated assumption and guarantee degrees. Tokens are never changed in
//! place by a transition; taking a rule produces a new token.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use tracing::trace;

use crate::clock::{StalePolicy, Trace};
use crate::error::Result;
use crate::expr::{Fault, Scope};
use crate::snapshot::{History, Snapshot};
use crate::table::{ModeId, Rule, Table};
use crate::truth::{Norm, Substitutions, Truth};

#[derive(Clone, Debug)]
pub struct Token<T: Truth> {
    mode: ModeId,
    clocks: Vec<Trace>,
    assume: T,
    guarantee: T,
}

impl<T: Truth> Token<T> {
    /// A token with fully true assumption and guarantee.
    pub fn new(mode: ModeId, clocks: Vec<Trace>) -> Self {
        Self {
            mode,
            clocks,
            assume: T::top(),
            guarantee: T::top(),
        }
    }
    pub fn mode(&self) -> ModeId {
        self.mode
    }
    pub fn clocks(&self) -> &[Trace] {
        &self.clocks
    }
    pub fn trace(&self, clock: usize) -> Option<&Trace> {
        self.clocks.get(clock)
    }
    pub fn assume(&self) -> T {
        self.assume
    }
    pub fn guarantee(&self) -> T {
        self.guarantee
    }
    /// The same token after time has passed.
    pub fn aged(mut self, delta_env: u64, delta_sys: u64) -> Self {
        for trace in self.clocks.iter_mut() {
            trace.advance(delta_env, delta_sys);
        }
        self
    }

    /// Tries every rule leaving this token's mode against the current
    /// observation, adding a successor to `pool` for each rule whose
    /// precondition and postcondition both hold. Stale clock reads disable
    /// the rule and are counted in `firing`; any other evaluation failure
    /// aborts.
    pub fn fire(
        &self,
        table: &Table,
        context: &Context,
        pool: &mut TokenPool<T>,
        firing: &mut Firing,
    ) -> Result<()> {
        let scope = context.scope(&self.clocks);
        for rule in table.rules(self.mode) {
            let pre = match rule.precondition().holds_in::<T>(&scope) {
                Ok(pre) => self.assume.t_norm(pre, context.norm),
                Err(Fault::Stale(stale)) => {
                    trace!(mode = table.mode_name(self.mode), %stale, "stale precondition");
                    firing.precondition_stale += 1;
                    continue;
                }
                Err(Fault::Failed(e)) => return Err(e),
            };
            if !pre.holds() {
                continue;
            }
            firing.any_precondition = true;
            let post = match rule.postcondition().holds_in::<T>(&scope) {
                Ok(post) => self.guarantee.t_norm(post, context.norm),
                Err(Fault::Stale(stale)) => {
                    trace!(mode = table.mode_name(self.mode), %stale, "stale postcondition");
                    firing.postcondition_stale += 1;
                    continue;
                }
                Err(Fault::Failed(e)) => return Err(e),
            };
            if !post.holds() {
                continue;
            }
            pool.insert(self.successor(rule, pre, post));
            firing.spawned += 1;
        }
        Ok(())
    }

    fn successor(&self, rule: &Rule, assume: T, guarantee: T) -> Self {
        let mut clocks = self.clocks.clone();
        for trace in clocks.iter_mut() {
            trace.push_frame();
        }
        for clock in rule.resets() {
            if let Some(trace) = clocks.get_mut(*clock as usize) {
                trace.reset();
            }
        }
        Self {
            mode: rule.target(),
            clocks,
            assume,
            guarantee,
        }
    }
}

// Degrees only distinguish tokens when they are quantitative.
impl<T: Truth> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<T: Truth> Eq for Token<T> {}
impl<T: Truth> Ord for Token<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        let structural = self
            .mode
            .cmp(&other.mode)
            .then_with(|| self.clocks.cmp(&other.clocks));
        if T::QUANTITATIVE {
            structural
                .then_with(|| self.assume.cmp(&other.assume))
                .then_with(|| self.guarantee.cmp(&other.guarantee))
        } else {
            structural
        }
    }
}
impl<T: Truth> PartialOrd for Token<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: Truth> Hash for Token<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mode.hash(state);
        self.clocks.hash(state);
        if T::QUANTITATIVE {
            self.assume.hash(state);
            self.guarantee.hash(state);
        }
    }
}

/// The observation every token of one step is evaluated against.
pub struct Context<'a> {
    pub snapshot: &'a Snapshot,
    pub history: &'a History,
    pub substitutions: &'a Substitutions,
    pub norm: Norm,
    pub stale: StalePolicy,
}
impl Context<'_> {
    pub fn scope<'s>(&'s self, traces: &'s [Trace]) -> Scope<'s> {
        Scope {
            snapshot: self.snapshot,
            history: self.history,
            traces,
            substitutions: self.substitutions,
            norm: self.norm,
            stale: self.stale,
        }
    }
}

/// What evaluating a set of tokens against one observation found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Firing {
    pub any_precondition: bool,
    pub precondition_stale: usize,
    pub postcondition_stale: usize,
    pub spawned: usize,
}

/// Collects successor tokens, either merging equal ones or keeping all.
#[derive(Clone, Debug)]
pub enum TokenPool<T: Truth> {
    Deduplicated(BTreeSet<Token<T>>),
    Sequence(Vec<Token<T>>),
}

impl<T: Truth> TokenPool<T> {
    pub fn new(deduplicate: bool) -> Self {
        if deduplicate {
            TokenPool::Deduplicated(BTreeSet::new())
        } else {
            TokenPool::Sequence(Vec::new())
        }
    }
    pub fn insert(&mut self, token: Token<T>) {
        match self {
            TokenPool::Deduplicated(set) => {
                set.insert(token);
            }
            TokenPool::Sequence(list) => list.push(token),
        }
    }
    pub fn len(&self) -> usize {
        match self {
            TokenPool::Deduplicated(set) => set.len(),
            TokenPool::Sequence(list) => list.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Tokens in enumeration order: sorted when deduplicated, otherwise as inserted.
    pub fn into_vec(self) -> Vec<Token<T>> {
        match self {
            TokenPool::Deduplicated(set) => set.into_iter().collect(),
            TokenPool::Sequence(list) => list,
        }
    }
}
