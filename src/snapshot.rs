//! Observed variable valuations and their line encoding on the transport.
//!
//! A record is a sequence of comma-terminated `key=value` pairs, for example
//! `t_e=100,t_s=3,HW=1,P=0,`. Booleans travel as `0`/`1`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::{MonitorError, Result};
use crate::ring::RingBuffer;
use crate::table::NameHasher;

/// Environment delay since the previous observation, in milliseconds.
pub const ENV_DELAY: &str = "t_e";
/// Processing time of the last system step, in milliseconds.
pub const SYS_DELAY: &str = "t_s";

lazy_static! {
    static ref PAIR: Regex = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(-?[0-9]+)$")
        .expect("the pair pattern is valid");
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, i64>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, name: &str, value: i64) -> Self {
        self.insert(name, value);
        self
    }
    pub fn insert(&mut self, name: &str, value: i64) {
        self.values.insert(name.to_owned(), value);
    }
    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &i64)> {
        self.values.iter()
    }
    /// The `(t_e, t_s)` delays carried by every record.
    pub fn delays(&self) -> Result<(u64, u64)> {
        let delay = |key: &str| -> Result<u64> {
            let value = self
                .get(key)
                .ok_or_else(|| MonitorError::MissingVariable(key.to_owned()))?;
            u64::try_from(value).map_err(|_| MonitorError::Delay {
                key: key.to_owned(),
                value,
            })
        };
        Ok((delay(ENV_DELAY)?, delay(SYS_DELAY)?))
    }
    /// Copies the value of each source key to its destination name.
    pub fn alias(&mut self, aliases: &BTreeMap<String, String>) {
        for (destination, source) in aliases {
            if let Some(value) = self.get(source) {
                self.insert(destination, value);
            }
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (name, value) in &self.values {
            write!(f, "{}={} ", name, value)?;
        }
        Ok(())
    }
}

pub fn encode(snapshot: &Snapshot) -> String {
    let mut line = String::new();
    for (name, value) in snapshot.iter() {
        line.push_str(name);
        line.push('=');
        line.push_str(&value.to_string());
        line.push(',');
    }
    line
}

/// Decodes one record. The offset is only used to locate errors.
pub fn decode(line: &str, offset: u64) -> Result<Snapshot> {
    let malformed = |message: String| MonitorError::Malformed { offset, message };
    let line = line.trim_end_matches(['\r', '\n']);
    let mut snapshot = Snapshot::new();
    for pair in line.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let captures = PAIR
            .captures(pair)
            .ok_or_else(|| malformed(format!("'{}' is not a key=value pair", pair)))?;
        let value = captures[2]
            .parse::<i64>()
            .map_err(|e| malformed(format!("'{}': {}", pair, e)))?;
        // last duplicate wins
        snapshot.insert(&captures[1], value);
    }
    if snapshot.is_empty() {
        return Err(malformed("empty record".into()));
    }
    Ok(snapshot)
}

// ------------- History -------------
/// Recent values of the variables that guards reference as `x@d`.
#[derive(Clone, Debug, Default)]
pub struct History {
    variables: HashMap<String, RingBuffer<i64>, NameHasher>,
}

impl History {
    /// Keeps `depth + 1` values for each listed variable.
    pub fn new<'a>(depths: impl IntoIterator<Item = (&'a String, &'a usize)>) -> Self {
        let mut variables = HashMap::<String, RingBuffer<i64>, NameHasher>::default();
        for (name, depth) in depths {
            if *depth > 0 {
                variables.insert(name.clone(), RingBuffer::new(depth + 1));
            }
        }
        Self { variables }
    }
    /// Shifts every tracked variable; absent variables shift in 0.
    pub fn record(&mut self, snapshot: &Snapshot) {
        for (name, values) in self.variables.iter_mut() {
            values.push(snapshot.get(name).unwrap_or(0));
        }
    }
    /// Value `depth` steps ago, 0 when not observed that far back.
    pub fn value(&self, name: &str, depth: usize) -> i64 {
        self.variables
            .get(name)
            .and_then(|values| values.recent(depth))
            .copied()
            .unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_reads_zero_before_enough_steps() {
        let depths = BTreeMap::from([("P".to_string(), 2usize)]);
        let mut history = History::new(&depths);
        history.record(&Snapshot::new().with("P", 7));
        assert_eq!(history.value("P", 0), 7);
        assert_eq!(history.value("P", 1), 0);
        history.record(&Snapshot::new().with("P", 8));
        history.record(&Snapshot::new().with("P", 9));
        history.record(&Snapshot::new().with("P", 10));
        assert_eq!(history.value("P", 2), 8);
    }
}
