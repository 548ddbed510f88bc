//! Clocks and their bounded histories.
//!
//! A [`Clock`] counts elapsed milliseconds since its last reset, split into
//! the part that passed while the environment was acting and the part the
//! system spent processing. A [`Trace`] keeps the recent valuations of one
//! clock variable: the newest frame is the live clock that `advance` ages,
//! older frames are the valuations at previous transitions.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ring::RingBuffer;

// ------------- Clock -------------
// Field order gives the derived lexicographic (env, sys) ordering used for
// deterministic token enumeration; it is not a measure of duration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Clock {
    env: u64,
    sys: u64,
}

impl Clock {
    pub fn new(env: u64, sys: u64) -> Self {
        Self { env, sys }
    }
    pub fn env(&self) -> u64 {
        self.env
    }
    pub fn sys(&self) -> u64 {
        self.sys
    }
    pub fn total(&self) -> u64 {
        self.env.saturating_add(self.sys)
    }
    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        self.env = self.env.saturating_add(delta_env);
        self.sys = self.sys.saturating_add(delta_sys);
    }
    pub fn reset(&mut self) {
        self.env = 0;
        self.sys = 0;
    }
}
impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.env, self.sys)
    }
}

/// Which portion of a clock an expression reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockPart {
    Total,
    Env,
    Sys,
}
impl ClockPart {
    pub fn of(&self, clock: &Clock) -> u64 {
        match self {
            ClockPart::Total => clock.total(),
            ClockPart::Env => clock.env(),
            ClockPart::Sys => clock.sys(),
        }
    }
}

// ------------- Retention -------------
/// How many frames of a clock's history survive each step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Only the live valuation, a ring of capacity one.
    #[default]
    Latest,
    /// The given number of frames, oldest silently overwritten.
    Ring(usize),
    /// Append-only, for audit runs.
    Unbounded,
}
impl Retention {
    /// Whether a lookup `depth` frames back can ever succeed.
    pub fn retains(&self, depth: usize) -> bool {
        match self {
            Retention::Latest => depth == 0,
            Retention::Ring(capacity) => depth < *capacity,
            Retention::Unbounded => true,
        }
    }
}
impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Retention::Latest => write!(f, "latest"),
            Retention::Ring(capacity) => write!(f, "ring of {}", capacity),
            Retention::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// What a guard reads when it asks for clock history that is not retained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// The rule is not taken and the access is flagged.
    #[default]
    Skip,
    /// The read yields a zeroed clock.
    Zero,
}

/// A query for clock history that is not (or no longer) retained.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("clock history at depth {depth} is not retained ({retained} frames kept)")]
pub struct Stale {
    pub depth: usize,
    pub retained: usize,
}

// ------------- Trace -------------
#[derive(Clone, Debug)]
enum Frames {
    Ring(RingBuffer<Clock>),
    Unbounded(Vec<Clock>),
}

#[derive(Clone, Debug)]
pub struct Trace {
    frames: Frames,
}

impl Trace {
    /// A trace holding a single zeroed clock.
    pub fn new(retention: Retention) -> Self {
        let frames = match retention {
            Retention::Latest => Frames::Ring(RingBuffer::new(1)),
            Retention::Ring(capacity) => Frames::Ring(RingBuffer::new(capacity.max(1))),
            Retention::Unbounded => Frames::Unbounded(Vec::new()),
        };
        let mut trace = Self { frames };
        trace.push(Clock::default());
        trace
    }
    pub fn push(&mut self, clock: Clock) {
        match &mut self.frames {
            Frames::Ring(ring) => ring.push(clock),
            Frames::Unbounded(frames) => frames.push(clock),
        }
    }
    pub fn len(&self) -> usize {
        match &self.frames {
            Frames::Ring(ring) => ring.len(),
            Frames::Unbounded(frames) => frames.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The valuation `depth` frames back, 0 being the live clock.
    pub fn at(&self, depth: usize) -> Result<Clock, Stale> {
        let found = match &self.frames {
            Frames::Ring(ring) => ring.recent(depth).copied(),
            Frames::Unbounded(frames) => frames.iter().rev().nth(depth).copied(),
        };
        found.ok_or(Stale {
            depth,
            retained: self.len(),
        })
    }
    pub fn latest(&self) -> Clock {
        // a trace is created with one frame and never shrinks below it
        self.at(0).unwrap_or_default()
    }
    fn latest_mut(&mut self) -> Option<&mut Clock> {
        match &mut self.frames {
            Frames::Ring(ring) => ring.back_mut(),
            Frames::Unbounded(frames) => frames.last_mut(),
        }
    }
    pub fn env(&self) -> u64 {
        self.latest().env()
    }
    pub fn sys(&self) -> u64 {
        self.latest().sys()
    }
    pub fn total(&self) -> u64 {
        self.latest().total()
    }
    /// Ages the live clock only; recorded frames are history.
    pub fn advance(&mut self, delta_env: u64, delta_sys: u64) {
        if let Some(clock) = self.latest_mut() {
            clock.advance(delta_env, delta_sys);
        }
    }
    pub fn reset(&mut self) {
        if let Some(clock) = self.latest_mut() {
            clock.reset();
        }
    }
    /// Records the live valuation so it becomes queryable at depth 1,
    /// trimming to the retention policy on the way.
    pub fn push_frame(&mut self) {
        let live = self.latest();
        self.push(live);
    }
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Clock> + '_> {
        match &self.frames {
            Frames::Ring(ring) => Box::new(ring.iter()),
            Frames::Unbounded(frames) => Box::new(frames.iter()),
        }
    }
}

impl PartialEq for Trace {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}
impl Eq for Trace {}
impl Ord for Trace {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}
impl PartialOrd for Trace {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Hash for Trace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for clock in self.iter() {
            clock.hash(state);
        }
    }
}
impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let frames: Vec<String> = self.iter().map(|clock| clock.to_string()).collect();
        write!(f, "[{}]", frames.join(","))
    }
}
