//! Runtime configuration.
//!
//! Settings are read from an optional `tamon.toml` (or `.json`, `.yaml`) in
//! the working directory, or from the file named by `TAMON_CONFIG`, and
//! then overridden by `TAMON_*` environment variables, for example
//! `TAMON_TRUTH=quantitative`, `TAMON_STALE=zero` or `TAMON_SPECIFICATIONS=a.ta,b.ta`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Retention, StalePolicy};
use crate::error::Result;
use crate::monitor::MonitorOptions;
use crate::table::Table;
use crate::truth::{Norm, Substitutions, Tolerance};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruthKind {
    #[default]
    Boolean,
    Quantitative,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Automaton description files, one monitor each.
    pub specifications: Vec<PathBuf>,
    pub deduplicate: bool,
    pub retention: Retention,
    pub truth: TruthKind,
    pub norm: Norm,
    pub stop_on_empty: bool,
    /// `skip` disables rules that read clock history that is not retained,
    /// `zero` reads it as a zeroed clock.
    pub stale: StalePolicy,
    pub poll_interval_ms: u64,
    pub display_snapshot: bool,
    pub display_traces: bool,
    pub output: Output,
    /// Clock name to tolerance band in milliseconds.
    pub tolerances: BTreeMap<String, u32>,
    /// Destination variable to the record key it is copied from.
    pub aliases: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let options = MonitorOptions::default();
        Self {
            specifications: Vec::new(),
            deduplicate: options.deduplicate,
            retention: options.retention,
            truth: TruthKind::default(),
            norm: options.norm,
            stop_on_empty: options.stop_on_empty,
            stale: options.stale,
            poll_interval_ms: 100,
            display_snapshot: true,
            display_traces: true,
            output: Output::default(),
            tolerances: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let file = std::env::var("TAMON_CONFIG").unwrap_or_else(|_| "tamon".to_string());
        Self::from_sources(&file)
    }
    /// Reads the named file (extension optional, may be absent) and the environment.
    pub fn from_sources(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("TAMON")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("specifications"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            deduplicate: self.deduplicate,
            retention: self.retention,
            norm: self.norm,
            stop_on_empty: self.stop_on_empty,
            stale: self.stale,
        }
    }
    /// Registers the configured tolerance bands against the table's clocks.
    /// Bands for clocks the table does not declare are skipped, since one
    /// configuration serves every monitor.
    pub fn substitutions(&self, table: &Table) -> Substitutions {
        let mut substitutions = Substitutions::new();
        for (clock, band) in &self.tolerances {
            match table.clock_id(clock) {
                Some(id) => substitutions.register(id, Arc::new(Tolerance::new(*band))),
                None => debug!(automaton = table.name(), clock = clock.as_str(), "no such clock for tolerance"),
            }
        }
        substitutions
    }
}
