//! The generic monitor: a token-set simulation of one transition table.
//!
//! Between observations the monitor is told how much time passed
//! ([`Monitor::advance`]); on each observation ([`Monitor::step`]) every
//! token tries every rule of its mode and the surviving successors replace
//! the token set. When no token could even assume the observation, the
//! environment broke its contract; when some could but none could guarantee
//! it, the system did. Both verdicts latch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Retention, StalePolicy, Trace};
use crate::error::{MonitorError, Result};
use crate::snapshot::{History, Snapshot};
use crate::table::Table;
use crate::token::{Context, Firing, Token, TokenPool};
use crate::truth::{Norm, Substitutions, Truth};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorOptions {
    /// Merge structurally equal successor tokens.
    pub deduplicate: bool,
    /// Retention for clocks that do not declare their own.
    pub retention: Retention,
    pub norm: Norm,
    /// Treat an empty token set as a reason to stop.
    pub stop_on_empty: bool,
    /// What reading clock history that is not retained does.
    pub stale: StalePolicy,
}
impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            deduplicate: true,
            retention: Retention::Latest,
            norm: Norm::Godel,
            stop_on_empty: true,
            stale: StalePolicy::Skip,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Running,
    EnvironmentLost,
    SystemLost,
    StoppedEmpty,
}
impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Verdict::Running => write!(f, "running"),
            Verdict::EnvironmentLost => write!(f, "environment loses"),
            Verdict::SystemLost => write!(f, "system loses"),
            Verdict::StoppedEmpty => write!(f, "stopped with no tokens"),
        }
    }
}

/// Stale clock reads over the lifetime of a monitor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StaleCounts {
    pub precondition: u64,
    pub postcondition: u64,
}

pub struct Monitor<T: Truth> {
    table: Arc<Table>,
    options: MonitorOptions,
    substitutions: Substitutions,
    tokens: Vec<Token<T>>,
    snapshot: Snapshot,
    history: History,
    environment_loses: bool,
    system_loses: bool,
    precondition_stale: bool,
    postcondition_stale: bool,
    stale: StaleCounts,
    iteration: u64,
}

impl<T: Truth> Monitor<T> {
    /// One seed token per initial mode, every clock zeroed.
    ///
    /// A clock without a declared retention keeps at least as much history
    /// as its guards read; a declared retention is taken as given.
    pub fn new(table: Arc<Table>, options: MonitorOptions, substitutions: Substitutions) -> Self {
        let mut retentions: Vec<Retention> = table
            .clocks()
            .iter()
            .map(|decl| decl.retention().unwrap_or(options.retention))
            .collect();
        for (clock, depth) in table.clock_depths() {
            let declared = table
                .clocks()
                .get(*clock as usize)
                .and_then(|decl| decl.retention());
            let Some(retention) = retentions.get_mut(*clock as usize) else {
                continue;
            };
            if retention.retains(*depth) {
                continue;
            }
            if declared.is_none() {
                *retention = Retention::Ring(depth.saturating_add(1));
                debug!(
                    automaton = table.name(),
                    clock = table.clock_name(*clock),
                    %retention,
                    "clock history sized to its deepest read"
                );
            } else {
                warn!(
                    automaton = table.name(),
                    clock = table.clock_name(*clock),
                    depth,
                    %retention,
                    "clock history is read deeper than it is retained"
                );
            }
        }
        let tokens = table
            .initial()
            .iter()
            .map(|mode| {
                let clocks = retentions.iter().map(|r| Trace::new(*r)).collect();
                Token::new(*mode, clocks)
            })
            .collect();
        let history = History::new(table.variables());
        info!(
            automaton = table.name(),
            truth = T::KIND,
            deduplicate = options.deduplicate,
            norm = ?options.norm,
            "monitor created"
        );
        Self {
            table,
            options,
            substitutions,
            tokens,
            snapshot: Snapshot::new(),
            history,
            environment_loses: false,
            system_loses: false,
            precondition_stale: false,
            postcondition_stale: false,
            stale: StaleCounts::default(),
            iteration: 0,
        }
    }
    pub fn table(&self) -> &Table {
        &self.table
    }
    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }
    pub fn tokens(&self) -> &[Token<T>] {
        &self.tokens
    }
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
    pub fn iteration(&self) -> u64 {
        self.iteration
    }
    pub fn environment_loses(&self) -> bool {
        self.environment_loses
    }
    pub fn system_loses(&self) -> bool {
        self.system_loses
    }
    /// Whether the latest step read clock history that is not retained
    /// while evaluating a precondition.
    pub fn precondition_stale(&self) -> bool {
        self.precondition_stale
    }
    pub fn postcondition_stale(&self) -> bool {
        self.postcondition_stale
    }
    pub fn stale_counts(&self) -> StaleCounts {
        self.stale
    }
    pub fn is_terminal(&self) -> bool {
        self.environment_loses || self.system_loses
    }
    pub fn verdict(&self) -> Verdict {
        if self.environment_loses {
            Verdict::EnvironmentLost
        } else if self.system_loses {
            Verdict::SystemLost
        } else if self.options.stop_on_empty && self.tokens.is_empty() {
            Verdict::StoppedEmpty
        } else {
            Verdict::Running
        }
    }
    pub fn should_stop(&self) -> bool {
        self.verdict() != Verdict::Running
    }

    /// Ages the live clock of every trace of every token.
    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        if self.is_terminal() {
            return;
        }
        debug!(delta_env, delta_sys, tokens = self.tokens.len(), "advance");
        let tokens = std::mem::take(&mut self.tokens);
        self.tokens = tokens
            .into_iter()
            .map(|token| token.aged(delta_env, delta_sys))
            .collect();
    }

    /// Takes one observation. Fails when the snapshot lacks a variable a
    /// guard reads or when a guard cannot be evaluated, in which case the
    /// monitor is left as it was. Stale clock reads only raise the stale flags.
    pub fn step(&mut self, snapshot: Snapshot) -> Result<Verdict> {
        if let Some(missing) = self
            .table
            .variables()
            .keys()
            .find(|name| !snapshot.contains(name))
        {
            return Err(MonitorError::MissingVariable(missing.clone()));
        }
        // nothing is committed until every token has fired
        let mut history = self.history.clone();
        history.record(&snapshot);
        let tokens = if self.is_terminal() {
            None
        } else {
            let mut pool = TokenPool::new(self.options.deduplicate);
            let mut firing = Firing::default();
            let context = Context {
                snapshot: &snapshot,
                history: &history,
                substitutions: &self.substitutions,
                norm: self.options.norm,
                stale: self.options.stale,
            };
            for token in &self.tokens {
                token.fire(&self.table, &context, &mut pool, &mut firing)?;
            }
            Some((pool.into_vec(), firing))
        };
        self.history = history;
        self.snapshot = snapshot;
        self.iteration += 1;
        self.precondition_stale = false;
        self.postcondition_stale = false;
        let Some((tokens, firing)) = tokens else {
            return Ok(self.verdict());
        };
        self.tokens = tokens;

        self.precondition_stale = firing.precondition_stale > 0;
        self.postcondition_stale = firing.postcondition_stale > 0;
        self.stale.precondition += firing.precondition_stale as u64;
        self.stale.postcondition += firing.postcondition_stale as u64;
        debug!(
            iteration = self.iteration,
            spawned = firing.spawned,
            tokens = self.tokens.len(),
            "step"
        );
        // an empty token set with no enabled precondition is the environment's fault
        if !firing.any_precondition {
            self.environment_loses = true;
            warn!(automaton = self.table.name(), iteration = self.iteration, "environment loses");
        } else if self.tokens.is_empty() {
            self.system_loses = true;
            warn!(automaton = self.table.name(), iteration = self.iteration, "system loses");
        }
        Ok(self.verdict())
    }

    pub fn report(&self) -> Report {
        let tokens = self
            .tokens
            .iter()
            .map(|token| TokenReport {
                mode: self.table.mode_name(token.mode()).to_owned(),
                assume: token.assume().degree().value(),
                guarantee: token.guarantee().degree().value(),
                clocks: token
                    .clocks()
                    .iter()
                    .enumerate()
                    .map(|(id, trace)| {
                        let frames = trace.iter().map(|c| (c.env(), c.sys())).collect();
                        (self.table.clock_name(id as u32).to_owned(), frames)
                    })
                    .collect(),
            })
            .collect();
        Report {
            automaton: self.table.name().to_owned(),
            iteration: self.iteration,
            verdict: self.verdict(),
            precondition_stale: self.precondition_stale,
            postcondition_stale: self.postcondition_stale,
            stale: self.stale,
            snapshot: self.snapshot.clone(),
            tokens,
        }
    }

    /// The observational dump, optionally without the clock histories.
    pub fn render(&self, traces: bool) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}Monitor\n", self.table.name()));
        for name in self.table.variables().keys() {
            if let Some(value) = self.snapshot.get(name) {
                out.push_str(&format!(" {} = {},", name, value));
            }
        }
        out.push('\n');
        for token in &self.tokens {
            let mode = self.table.mode_name(token.mode());
            if T::QUANTITATIVE {
                out.push_str(&format!(
                    "      {}    ({},{})\n",
                    mode,
                    token.assume(),
                    token.guarantee()
                ));
            } else {
                out.push_str(&format!("      {}\n", mode));
            }
            if traces {
                for (id, trace) in token.clocks().iter().enumerate() {
                    out.push_str(&format!(
                        "        {}\n           {}\n",
                        self.table.clock_name(id as u32),
                        trace
                    ));
                }
            }
        }
        if self.precondition_stale {
            out.push_str("         (precondition accessed incorrect clock history)\n");
        }
        if self.postcondition_stale {
            out.push_str("         (postcondition accessed incorrect clock history)\n");
        }
        if self.system_loses {
            out.push_str("         (SYSTEM LOSES)\n");
        }
        if self.environment_loses {
            out.push_str("         (ENVIRONMENT LOSES)\n");
        }
        out
    }
}

impl<T: Truth> fmt::Display for Monitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(true))
    }
}

/// Machine readable state of a monitor after a step.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub automaton: String,
    pub iteration: u64,
    pub verdict: Verdict,
    pub precondition_stale: bool,
    pub postcondition_stale: bool,
    pub stale: StaleCounts,
    pub snapshot: Snapshot,
    pub tokens: Vec<TokenReport>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TokenReport {
    pub mode: String,
    pub assume: f64,
    pub guarantee: f64,
    /// (env, sys) frames per clock, oldest first.
    pub clocks: BTreeMap<String, Vec<(u64, u64)>>,
}
