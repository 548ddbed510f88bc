//! Tamon – online monitors for non-deterministic assume/guarantee timed automata.
//!
//! A specification is a timed automaton whose transitions carry a
//! *precondition* (what the environment is assumed to do) and a
//! *postcondition* (what the system guarantees in return). Because several
//! transitions may be enabled at once, the monitor does not track a single
//! state but a set of *tokens*, each one a candidate interpretation of the
//! observations so far:
//! * A [`token::Token`] is a mode together with the recent history of every clock.
//! * A [`clock::Clock`] counts milliseconds since its last reset, split into the
//!   time the environment took and the time the system spent processing.
//! * A [`clock::Trace`] keeps past valuations of one clock according to a
//!   [`clock::Retention`] policy, so guards may ask for `c@1`.
//! * A [`table::Table`] holds the rules of every mode as data, one generic
//!   engine ([`monitor::Monitor`]) runs any table.
//!
//! On every observation each token tries every rule of its mode. If no token
//! finds an enabled precondition the environment broke its contract; if some
//! do but every branch fails its postcondition the system did. Both verdicts
//! latch.
//!
//! ## Modules
//! * [`clock`] – Clocks, traces and retention.
//! * [`ring`] – The fixed-capacity circular buffer behind ring-retained traces.
//! * [`truth`] – The [`truth::Truth`] trait with boolean and quantitative
//!   ([`truth::Degree`]) implementations, norms and predicate substitutions.
//! * [`expr`] – Guard expressions and their evaluation.
//! * [`table`] – Transition tables, the builder and Graphviz rendering.
//! * [`parse`] – The automaton description language (grammar in `automaton.pest`).
//! * [`token`] – Tokens and the per-token transition step.
//! * [`monitor`] – Orchestration, verdicts and observation output.
//! * [`snapshot`] – Observed valuations and the transport record codec.
//! * [`transport`] – Cursor-based reading of the shared log.
//! * [`settings`] – Configuration through files and environment.
//!
//! ## Quantitative truth
//! Monitors are generic over their truth representation. With `bool` guards
//! are crisp; with [`truth::Degree`] they evaluate to a degree in [0,1] under a
//! selectable [`truth::Norm`], and comparisons against clocks may be softened
//! per clock by registering a [`truth::Substitution`] such as a
//! [`truth::Tolerance`] band.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use tamon::{Monitor, MonitorOptions, Snapshot, Table, Verdict};
//! use tamon::truth::Substitutions;
//!
//! let table = Table::parse("
//!     automaton Gate {
//!         clock timer;
//!         initial open, closed;
//!         open -> open when wl <= tl;
//!         closed -> closed when wl >= tl;
//!     }").unwrap();
//! let mut monitor: Monitor<bool> =
//!     Monitor::new(Arc::new(table), MonitorOptions::default(), Substitutions::new());
//! monitor.advance(100, 2);
//! let verdict = monitor.step(Snapshot::new().with("wl", 60).with("tl", 50)).unwrap();
//! assert_eq!(verdict, Verdict::Running);
//! assert_eq!(monitor.tokens().len(), 1);
//! ```
//!
//! ## Binary
//! The `tamon` binary follows a transport file written by a trace producer,
//! one `key=value,` record per line, and prints the token set after every
//! observation. See [`settings::Settings`] for what can be configured.

pub mod clock;
pub mod error;
pub mod expr;
pub mod monitor;
pub mod parse;
pub mod ring;
pub mod settings;
pub mod snapshot;
pub mod table;
pub mod token;
pub mod transport;
pub mod truth;

pub use crate::error::{MonitorError, Result};
pub use crate::monitor::{Monitor, MonitorOptions, Report, Verdict};
pub use crate::snapshot::Snapshot;
pub use crate::table::{Table, TableBuilder};
pub use crate::truth::{Degree, Norm, Truth};
