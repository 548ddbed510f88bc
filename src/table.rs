//! Declarative transition tables.
//!
//! A [`Table`] is the data that drives one generic monitor: the modes of an
//! assume/guarantee timed automaton, its clocks, its start modes and, for
//! every mode, the ordered list of [`Rule`]s leaving it. Tables come either
//! from the automaton description language (see [`crate::parse`]) or from a
//! [`TableBuilder`].

use std::collections::BTreeMap;
use std::fmt;
use std::hash::BuildHasherDefault;

use bimap::BiMap;
use seahash::SeaHasher;
use tracing::debug;

use crate::clock::Retention;
use crate::error::{MonitorError, Result};
use crate::expr::{Expr, Kind};
use crate::parse;

pub type ModeId = u32;
pub type ClockId = u32;

// used for hashmaps keyed by names and small ids
pub type NameHasher = BuildHasherDefault<SeaHasher>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockDecl {
    name: String,
    retention: Option<Retention>,
}
impl ClockDecl {
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Retention declared for this clock, if it overrides the monitor's.
    pub fn retention(&self) -> Option<Retention> {
        self.retention
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    precondition: Expr,
    postcondition: Expr,
    target: ModeId,
    resets: Vec<ClockId>,
}
impl Rule {
    pub fn precondition(&self) -> &Expr {
        &self.precondition
    }
    pub fn postcondition(&self) -> &Expr {
        &self.postcondition
    }
    pub fn target(&self) -> ModeId {
        self.target
    }
    pub fn resets(&self) -> &[ClockId] {
        &self.resets
    }
}

#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    modes: BiMap<String, ModeId>,
    clocks: BiMap<String, ClockId>,
    declarations: Vec<ClockDecl>,
    initial: Vec<ModeId>,
    rules: Vec<Vec<Rule>>,
    variables: BTreeMap<String, usize>,
    clock_depths: BTreeMap<ClockId, usize>,
}

impl Table {
    /// Parses an automaton description.
    pub fn parse(text: &str) -> Result<Table> {
        parse::table(text)
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }
    pub fn mode_id(&self, name: &str) -> Option<ModeId> {
        self.modes.get_by_left(name).copied()
    }
    pub fn mode_name(&self, mode: ModeId) -> &str {
        self.modes.get_by_right(&mode).map(String::as_str).unwrap_or("?")
    }
    pub fn clock_count(&self) -> usize {
        self.declarations.len()
    }
    pub fn clock_id(&self, name: &str) -> Option<ClockId> {
        self.clocks.get_by_left(name).copied()
    }
    pub fn clock_name(&self, clock: ClockId) -> &str {
        self.declarations
            .get(clock as usize)
            .map(|decl| decl.name())
            .unwrap_or("?")
    }
    /// Declared clocks in id order.
    pub fn clocks(&self) -> &[ClockDecl] {
        &self.declarations
    }
    pub fn initial(&self) -> &[ModeId] {
        &self.initial
    }
    /// Rules leaving `mode`, in declaration order.
    pub fn rules(&self, mode: ModeId) -> &[Rule] {
        self.rules.get(mode as usize).map(Vec::as_slice).unwrap_or(&[])
    }
    pub fn rule_count(&self) -> usize {
        self.rules.iter().map(Vec::len).sum()
    }
    /// Every variable a guard reads, with the deepest history it asks for.
    pub fn variables(&self) -> &BTreeMap<String, usize> {
        &self.variables
    }
    /// Deepest history asked for per clock, for clocks read at all.
    pub fn clock_depths(&self) -> &BTreeMap<ClockId, usize> {
        &self.clock_depths
    }

    /// Renders the automaton as a Graphviz digraph.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        dot.push_str(&format!("digraph {} {{\n", self.name));
        dot.push_str("    rankdir=LR;\n");
        dot.push_str("    node [shape=record];\n");
        dot.push_str("    start [shape=point];\n");
        for mode in 0..self.mode_count() as ModeId {
            let mut label = escape(self.mode_name(mode));
            for (n, rule) in self.rules(mode).iter().enumerate() {
                label.push_str(&format!(
                    "|{}: {} / {}",
                    n + 1,
                    escape(&rule.precondition.to_string()),
                    escape(&rule.postcondition.to_string())
                ));
            }
            dot.push_str(&format!("    m{} [label=\"{{{}}}\"];\n", mode, label));
        }
        for mode in &self.initial {
            dot.push_str(&format!("    start -> m{};\n", mode));
        }
        for mode in 0..self.mode_count() as ModeId {
            for (n, rule) in self.rules(mode).iter().enumerate() {
                let mut label = format!("{}", n + 1);
                if !rule.resets.is_empty() {
                    let resets: Vec<&str> =
                        rule.resets.iter().map(|c| self.clock_name(*c)).collect();
                    label.push_str(&format!(" reset {}", resets.join(", ")));
                }
                dot.push_str(&format!(
                    "    m{} -> m{} [label=\"{}\"];\n",
                    mode, rule.target, label
                ));
            }
        }
        dot.push_str("}\n");
        dot
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '<' | '>' | '{' | '}' | '|' | '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Prints the table back in the description language.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "automaton {} {{", self.name)?;
        for decl in &self.declarations {
            match decl.retention {
                None => writeln!(f, "    clock {};", decl.name)?,
                Some(Retention::Latest) => writeln!(f, "    clock {} keep latest;", decl.name)?,
                Some(Retention::Ring(n)) => writeln!(f, "    clock {} keep {};", decl.name, n)?,
                Some(Retention::Unbounded) => writeln!(f, "    clock {} keep all;", decl.name)?,
            }
        }
        let initial: Vec<&str> = self.initial.iter().map(|m| self.mode_name(*m)).collect();
        writeln!(f, "    initial {};", initial.join(", "))?;
        for mode in 0..self.mode_count() as ModeId {
            for rule in self.rules(mode) {
                write!(
                    f,
                    "    {} -> {} when {} ensure {}",
                    self.mode_name(mode),
                    self.mode_name(rule.target),
                    rule.precondition,
                    rule.postcondition
                )?;
                if !rule.resets.is_empty() {
                    let resets: Vec<&str> =
                        rule.resets.iter().map(|c| self.clock_name(*c)).collect();
                    write!(f, " reset {}", resets.join(", "))?;
                }
                writeln!(f, ";")?;
            }
        }
        write!(f, "}}")
    }
}

// ------------- Builder -------------
struct PendingRule {
    from: String,
    to: String,
    precondition: Expr,
    postcondition: Expr,
    resets: Vec<String>,
}

/// Assembles a [`Table`]; guards may be given as description language text.
///
/// Errors are held back until [`TableBuilder::build`].
pub struct TableBuilder {
    name: String,
    clocks: BiMap<String, ClockId>,
    declarations: Vec<ClockDecl>,
    initial: Vec<String>,
    rules: Vec<PendingRule>,
    error: Option<MonitorError>,
}

impl TableBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            clocks: BiMap::new(),
            declarations: Vec::new(),
            initial: Vec::new(),
            rules: Vec::new(),
            error: None,
        }
    }
    fn fail(&mut self, error: MonitorError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
    pub fn clock(self, name: &str) -> Self {
        self.declare(name, None)
    }
    pub fn clock_keeping(self, name: &str, retention: Retention) -> Self {
        self.declare(name, Some(retention))
    }
    pub fn declare(mut self, name: &str, retention: Option<Retention>) -> Self {
        if self.clocks.contains_left(name) {
            self.fail(MonitorError::Specification(format!(
                "clock {} is declared twice",
                name
            )));
            return self;
        }
        let id = self.declarations.len() as ClockId;
        self.clocks.insert(name.to_owned(), id);
        self.declarations.push(ClockDecl {
            name: name.to_owned(),
            retention,
        });
        self
    }
    /// Clocks declared so far, for resolving names in guards.
    pub fn clock_ids(&self) -> &BiMap<String, ClockId> {
        &self.clocks
    }
    pub fn initial(mut self, mode: &str) -> Self {
        if !self.initial.iter().any(|m| m == mode) {
            self.initial.push(mode.to_owned());
        }
        self
    }
    /// Adds a rule with guards in the description language. An empty guard
    /// is `true`. Clocks must be declared before the rules that read them.
    pub fn rule(mut self, from: &str, to: &str, when: &str, ensure: &str, resets: &[&str]) -> Self {
        let guard = |text: &str, clocks: &BiMap<String, ClockId>| -> Result<Expr> {
            if text.trim().is_empty() {
                Ok(Expr::Bool(true))
            } else {
                parse::guard(text, clocks)
            }
        };
        let parsed = guard(when, &self.clocks).and_then(|pre| Ok((pre, guard(ensure, &self.clocks)?)));
        match parsed {
            Ok((precondition, postcondition)) => {
                let resets = resets.iter().map(|c| c.to_string()).collect();
                self.rule_expr(from, to, precondition, postcondition, resets)
            }
            Err(e) => {
                self.fail(e);
                self
            }
        }
    }
    pub fn rule_expr(
        mut self,
        from: &str,
        to: &str,
        precondition: Expr,
        postcondition: Expr,
        resets: Vec<String>,
    ) -> Self {
        self.rules.push(PendingRule {
            from: from.to_owned(),
            to: to.to_owned(),
            precondition,
            postcondition,
            resets,
        });
        self
    }

    pub fn build(self) -> Result<Table> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.initial.is_empty() {
            return Err(MonitorError::Specification(format!(
                "automaton {} has no initial mode",
                self.name
            )));
        }
        let mut modes = BiMap::<String, ModeId>::new();
        let mut intern = |name: &str| -> ModeId {
            if let Some(id) = modes.get_by_left(name) {
                return *id;
            }
            let id = modes.len() as ModeId;
            modes.insert(name.to_owned(), id);
            id
        };
        let initial: Vec<ModeId> = self.initial.iter().map(|m| intern(m)).collect();
        let mut placed = Vec::new();
        for pending in &self.rules {
            placed.push((intern(&pending.from), intern(&pending.to)));
        }
        let mut rules: Vec<Vec<Rule>> = vec![Vec::new(); modes.len()];
        let mut variables = BTreeMap::new();
        let mut clock_depths = BTreeMap::new();
        for (pending, (from, to)) in self.rules.into_iter().zip(placed) {
            for guard in [&pending.precondition, &pending.postcondition] {
                match guard.kind()? {
                    Kind::Truth | Kind::Either => (),
                    Kind::Int => {
                        return Err(MonitorError::Specification(format!(
                            "guard {} of {} -> {} is not a condition",
                            guard, pending.from, pending.to
                        )));
                    }
                }
                guard.variables(&mut variables);
                guard.clocks(&mut clock_depths);
            }
            let mut resets = Vec::with_capacity(pending.resets.len());
            for clock in &pending.resets {
                let id = self.clocks.get_by_left(clock).ok_or_else(|| {
                    MonitorError::Specification(format!(
                        "{} -> {} resets undeclared clock {}",
                        pending.from, pending.to, clock
                    ))
                })?;
                if !resets.contains(id) {
                    resets.push(*id);
                }
            }
            rules[from as usize].push(Rule {
                precondition: pending.precondition,
                postcondition: pending.postcondition,
                target: to,
                resets,
            });
        }
        debug!(
            automaton = %self.name,
            modes = modes.len(),
            clocks = self.declarations.len(),
            variables = variables.len(),
            "table built"
        );
        Ok(Table {
            name: self.name,
            modes,
            clocks: self.clocks,
            declarations: self.declarations,
            initial,
            rules,
            variables,
            clock_depths,
        })
    }
}
