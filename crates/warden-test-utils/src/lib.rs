//! Test utilities and mock collaborators for Warden development.
//!
//! Provides mock implementations of [`InferenceBackend`] and
//! [`WorldStateProvider`] plus snapshot [`fixtures`]. Every mock exposes
//! a cloneable log handle so tests can inspect what happened after the
//! mock has been boxed and moved into the engine.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use smallvec::smallvec;
use warden_core::{
    Action, AgentHandle, BackendError, InferenceBackend, Vec2, WorldStateProvider,
    WorldStateSnapshot,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared record of the batches a mock backend has seen.
#[derive(Clone, Debug, Default)]
pub struct BackendLog {
    batches: Arc<Mutex<Vec<usize>>>,
}

impl BackendLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, len: usize) {
        lock(&self.batches).push(len);
    }

    /// Number of `run_batch` calls.
    pub fn calls(&self) -> usize {
        lock(&self.batches).len()
    }

    /// Size of every batch, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        lock(&self.batches).clone()
    }

    /// Sum of all batch sizes.
    pub fn total_inputs(&self) -> usize {
        lock(&self.batches).iter().sum()
    }
}

fn echo(inputs: &[&[f32]]) -> Vec<Action> {
    inputs
        .iter()
        .map(|input| smallvec![input.first().copied().unwrap_or(0.0)])
        .collect()
}

/// Succeeds on every batch, echoing the first element of each input as
/// a one-element action.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: BackendLog,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> BackendLog {
        self.log.clone()
    }
}

impl InferenceBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn run_batch(&mut self, inputs: &[&[f32]]) -> Result<Vec<Action>, BackendError> {
        self.log.record(inputs.len());
        Ok(echo(inputs))
    }
}

/// Fails deterministically after a configurable number of successful
/// batches. Failed batches are still recorded in the log.
#[derive(Debug)]
pub struct FailingBackend {
    succeed_count: usize,
    log: BackendLog,
}

impl FailingBackend {
    /// Create a backend that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            log: BackendLog::new(),
        }
    }

    pub fn log(&self) -> BackendLog {
        self.log.clone()
    }
}

impl InferenceBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn run_batch(&mut self, inputs: &[&[f32]]) -> Result<Vec<Action>, BackendError> {
        let n = self.log.calls();
        self.log.record(inputs.len());
        if n >= self.succeed_count {
            return Err(BackendError::Failed {
                reason: format!(
                    "deliberate failure after {} successful batches",
                    self.succeed_count
                ),
            });
        }
        Ok(echo(inputs))
    }
}

/// Returns one action fewer than it was given inputs.
#[derive(Debug, Default)]
pub struct ShortBackend {
    log: BackendLog,
}

impl ShortBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> BackendLog {
        self.log.clone()
    }
}

impl InferenceBackend for ShortBackend {
    fn name(&self) -> &str {
        "short"
    }

    fn run_batch(&mut self, inputs: &[&[f32]]) -> Result<Vec<Action>, BackendError> {
        self.log.record(inputs.len());
        let mut actions = echo(inputs);
        actions.pop();
        Ok(actions)
    }
}

/// Sleeps `fixed + per_input × batch_len` before echoing, to model a
/// backend whose cost grows with batch size.
#[derive(Debug)]
pub struct SleepBackend {
    fixed: Duration,
    per_input: Duration,
    log: BackendLog,
}

impl SleepBackend {
    pub fn new(fixed: Duration, per_input: Duration) -> Self {
        Self {
            fixed,
            per_input,
            log: BackendLog::new(),
        }
    }

    pub fn log(&self) -> BackendLog {
        self.log.clone()
    }
}

impl InferenceBackend for SleepBackend {
    fn name(&self) -> &str {
        "sleep"
    }

    fn run_batch(&mut self, inputs: &[&[f32]]) -> Result<Vec<Action>, BackendError> {
        self.log.record(inputs.len());
        let n = u32::try_from(inputs.len()).unwrap_or(u32::MAX);
        thread::sleep(self.fixed + self.per_input * n);
        Ok(echo(inputs))
    }
}

/// Panics on its first batch, then echoes like [`RecordingBackend`].
#[derive(Debug, Default)]
pub struct PanicOnceBackend {
    log: BackendLog,
}

impl PanicOnceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> BackendLog {
        self.log.clone()
    }
}

impl InferenceBackend for PanicOnceBackend {
    fn name(&self) -> &str {
        "panic-once"
    }

    fn run_batch(&mut self, inputs: &[&[f32]]) -> Result<Vec<Action>, BackendError> {
        let first = self.log.calls() == 0;
        self.log.record(inputs.len());
        if first {
            panic!("backend panicked on a batch of {}", inputs.len());
        }
        Ok(echo(inputs))
    }
}

/// Shared record of the handles a mock provider was asked about.
#[derive(Clone, Debug, Default)]
pub struct ProviderLog {
    queries: Arc<Mutex<Vec<AgentHandle>>>,
}

impl ProviderLog {
    fn record(&self, handle: AgentHandle) {
        lock(&self.queries).push(handle);
    }

    /// Every queried handle, in query order.
    pub fn queries(&self) -> Vec<AgentHandle> {
        lock(&self.queries).clone()
    }

    /// How many times `handle` was queried.
    pub fn count(&self, handle: AgentHandle) -> usize {
        lock(&self.queries).iter().filter(|&&h| h == handle).count()
    }
}

/// Serves the same snapshot to every agent.
///
/// With [`tag_handles`](StaticWorldProvider::tag_handles) enabled, the
/// owner's x position is overwritten with the handle value, so the
/// first encoded element identifies which agent an input came from.
#[derive(Debug, Default)]
pub struct StaticWorldProvider {
    snapshot: WorldStateSnapshot,
    missing: HashSet<AgentHandle>,
    tag_handles: bool,
    log: ProviderLog,
}

impl StaticWorldProvider {
    pub fn new(snapshot: WorldStateSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Write each handle's value into the owner's x position.
    pub fn tag_handles(mut self) -> Self {
        self.tag_handles = true;
        self
    }

    /// Report no state for `handle`.
    pub fn without(mut self, handle: AgentHandle) -> Self {
        self.missing.insert(handle);
        self
    }

    pub fn log(&self) -> ProviderLog {
        self.log.clone()
    }
}

impl WorldStateProvider for StaticWorldProvider {
    fn fill_snapshot(&mut self, handle: AgentHandle, out: &mut WorldStateSnapshot) -> bool {
        self.log.record(handle);
        if self.missing.contains(&handle) {
            return false;
        }
        out.clone_from(&self.snapshot);
        if self.tag_handles {
            out.owner.position = Vec2::new(handle.0 as f32, out.owner.position.y);
        }
        true
    }
}

/// Serves a fresh seeded-random snapshot on every query.
///
/// The snapshot depends only on the seed, the handle, and how many
/// queries came before, so two providers with the same seed queried
/// in the same order produce identical streams.
#[derive(Debug, Default)]
pub struct SeededWorldProvider {
    seed: u64,
    queries: u64,
    log: ProviderLog,
}

impl SeededWorldProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn log(&self) -> ProviderLog {
        self.log.clone()
    }
}

impl WorldStateProvider for SeededWorldProvider {
    fn fill_snapshot(&mut self, handle: AgentHandle, out: &mut WorldStateSnapshot) -> bool {
        self.log.record(handle);
        let seed = self.seed ^ handle.0.rotate_left(17) ^ self.queries.rotate_left(41);
        self.queries += 1;
        *out = fixtures::random_snapshot(seed);
        true
    }
}
