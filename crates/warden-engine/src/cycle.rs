//! The decision cycle: admission, per-agent updates, flush, feedback.
//!
//! [`CycleOrchestrator`] owns every other component and is driven by the
//! host calling [`tick`](CycleOrchestrator::tick) from its simulation
//! loop. A tick either returns [`TickOutcome::Throttled`] (the decision
//! interval has not elapsed) or runs one cycle:
//!
//! 1. Drain the ingress channel (worker-thread enqueues and despawns).
//! 2. Flush the batch scheduler.
//! 3. Run due per-agent updates from the round-robin cursor, bounded by
//!    `max_agent_updates_per_tick`: fill the agent's pooled snapshot,
//!    encode it, enqueue a request. A full batch is flushed mid-loop.
//! 4. Report the cycle's wall-clock time to the admission controller and
//!    re-estimate if the re-estimation interval has elapsed.
//!
//! Backend failures never abort a cycle. They are counted, and the
//! first one is returned in [`CycleReport::flush_error`].

use std::fmt;
use std::time::{Duration, Instant};
use std::vec::Drain;

use indexmap::IndexMap;
use log::{debug, info, warn};
use warden_core::{
    AgentHandle, AgentRole, CycleId, Decision, InferenceBackend, WorldStateProvider,
};
use warden_obs::{ObsPool, ObservationEncoder, SlotIndex};

use crate::admission::{AdmissionController, AdmissionReason, Reestimate};
use crate::batch::{BatchScheduler, FlushError};
use crate::config::{ConfigError, CycleConfig, EngineConfig};
use crate::ingress::{self, IngressMessage, IngressReceiver, IngressSender};
use crate::metrics::{BatchingStats, CycleStats, LimiterStats};

// ── Public outcome types ───────────────────────────────────────────

/// Result of a spawn request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// The agent may use the learned policy under this handle.
    Admitted(AgentHandle),
    /// The agent must use the fallback path.
    Denied(AdmissionReason),
}

impl SpawnOutcome {
    /// The handle, if admitted.
    pub fn handle(self) -> Option<AgentHandle> {
        match self {
            Self::Admitted(h) => Some(h),
            Self::Denied(_) => None,
        }
    }

    /// Whether the agent was admitted.
    pub fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted(_))
    }
}

/// What one running cycle did.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    /// Id of the cycle.
    pub cycle: CycleId,
    /// Requests resolved by flushes during the cycle.
    pub flushed: usize,
    /// First backend failure during the cycle, if any.
    pub flush_error: Option<FlushError>,
    /// Agents whose observation was encoded and enqueued.
    pub updates_run: usize,
    /// Due agents pushed to the next cycle by the update bound.
    pub updates_deferred: usize,
    /// Due agents the provider had no state for.
    pub provider_misses: usize,
    /// Ingress messages applied.
    pub ingress_applied: usize,
    /// Ingress messages dropped (unknown handle).
    pub ingress_dropped: usize,
    /// Wall-clock time spent in the cycle.
    pub elapsed: Duration,
    /// Re-estimation performed at the end of the cycle, if due.
    pub reestimate: Option<Reestimate>,
}

/// Result of [`CycleOrchestrator::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The decision interval has not elapsed; nothing ran.
    Throttled,
    /// A cycle ran.
    Ran(CycleReport),
}

// ── Orchestrator ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
struct AgentEntry {
    role: AgentRole,
    slot: SlotIndex,
    /// First cycle the agent takes part in.
    spawn_cycle: CycleId,
    /// Deferred by the update bound; runs next cycle regardless of stride.
    owed: bool,
}

impl AgentEntry {
    fn is_due(&self, cycle: CycleId) -> bool {
        let stride = u64::from(self.role.profile().update_stride.max(1));
        self.owed || cycle.0.wrapping_sub(self.spawn_cycle.0) % stride == 0
    }
}

#[derive(Default)]
struct CycleTally {
    flushed: usize,
    flush_error: Option<FlushError>,
    failures: u64,
}

impl CycleTally {
    fn record(&mut self, result: Result<usize, FlushError>) {
        match result {
            Ok(n) => self.flushed += n,
            Err(e) => {
                self.failures += 1;
                self.flush_error.get_or_insert(e);
            }
        }
    }
}

/// Owns the decision pipeline and drives it one cycle per eligible tick.
pub struct CycleOrchestrator {
    config: CycleConfig,
    admission: AdmissionController,
    scheduler: BatchScheduler,
    encoder: ObservationEncoder,
    pool: ObsPool,
    provider: Box<dyn WorldStateProvider>,
    /// Registered agents in registration order.
    agents: IndexMap<AgentHandle, AgentEntry>,
    next_handle: u64,
    cursor: usize,
    cycle: CycleId,
    last_decision: Option<Instant>,
    ingress_tx: IngressSender,
    ingress_rx: IngressReceiver,
    stats: CycleStats,
}

impl CycleOrchestrator {
    /// Validate `config` and build the pipeline around the injected
    /// backend and world-state provider.
    pub fn new(
        config: EngineConfig,
        backend: Box<dyn InferenceBackend>,
        provider: Box<dyn WorldStateProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let now = Instant::now();
        let EngineConfig {
            admission,
            batching,
            cycle,
            encoder,
        } = config;
        let pool = ObsPool::new(admission.max_agents_hard_cap);
        let (ingress_tx, ingress_rx) = ingress::channel(cycle.ingress_capacity);
        Ok(Self {
            admission: AdmissionController::new(admission, now)?,
            scheduler: BatchScheduler::new(batching, backend, now)?,
            encoder: ObservationEncoder::new(encoder)?,
            pool,
            provider,
            agents: IndexMap::new(),
            next_handle: 1,
            cursor: 0,
            cycle: CycleId::default(),
            last_decision: None,
            ingress_tx,
            ingress_rx,
            stats: CycleStats::default(),
            config: cycle,
        })
    }

    // ── Agent lifecycle ────────────────────────────────────────────

    /// Ask the admission controller for a costly-decision slot.
    ///
    /// A denial is recorded as a fallback; the caller should run its
    /// cheap non-learned behaviour for this agent.
    pub fn on_agent_spawn_requested(&mut self, role: AgentRole) -> SpawnOutcome {
        let d = self.admission.try_admit();
        if !d.admit {
            debug!("spawn of {role} agent denied: {}", d.reason);
            return SpawnOutcome::Denied(d.reason);
        }
        // The pool holds max_agents_hard_cap slots and the ceiling never
        // exceeds it, so this only fails if the two drift apart.
        let Some(slot) = self.pool.acquire() else {
            self.admission.release();
            self.admission.record_fallback();
            warn!("observation pool exhausted at {} agents", self.pool.capacity());
            return SpawnOutcome::Denied(AdmissionReason::CeilingReached);
        };
        let handle = AgentHandle(self.next_handle);
        self.next_handle += 1;
        self.agents.insert(
            handle,
            AgentEntry {
                role,
                slot,
                spawn_cycle: self.cycle.next(),
                owed: false,
            },
        );
        SpawnOutcome::Admitted(handle)
    }

    /// Release the agent's slot. Returns `false` for unknown handles.
    ///
    /// Requests the agent still has pending are discarded.
    pub fn on_agent_despawned(&mut self, handle: AgentHandle) -> bool {
        let Some((idx, _, entry)) = self.agents.shift_remove_full(&handle) else {
            return false;
        };
        if idx < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.agents.len() {
            self.cursor = 0;
        }
        self.pool.release(entry.slot);
        self.admission.release();
        self.scheduler.discard(handle);
        true
    }

    /// Role of a registered agent.
    pub fn role_of(&self, handle: AgentHandle) -> Option<AgentRole> {
        self.agents.get(&handle).map(|e| e.role)
    }

    /// Registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    // ── Cycle ──────────────────────────────────────────────────────

    /// Run one decision cycle if `decision_interval` has elapsed since
    /// the last one. The first tick always runs.
    ///
    /// Cycles never overlap: `&mut self` holds the orchestrator for the
    /// whole cycle. If the backend panics mid-flush and the host catches
    /// the unwind, that batch is already off the queue and the next tick
    /// runs normally.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if let Some(last) = self.last_decision {
            let since = now.saturating_duration_since(last);
            if since < self.config.decision_interval {
                self.stats.cycles_throttled += 1;
                debug!("tick throttled ({since:?} since last cycle)");
                return TickOutcome::Throttled;
            }
        }

        let started = Instant::now();
        self.cycle = self.cycle.next();
        let mut tally = CycleTally::default();

        let (ingress_applied, ingress_dropped) = self.drain_ingress(now);
        tally.record(self.scheduler.flush_at(now, false));
        let (updates_run, updates_deferred, provider_misses) =
            self.run_agent_updates(now, &mut tally);

        let elapsed = started.elapsed();
        self.admission.report_latency(elapsed);
        let reestimate = self.admission.maybe_reestimate(now);
        self.last_decision = Some(now);

        self.stats.cycles_run += 1;
        self.stats.last_cycle_time = elapsed;
        self.stats.last_updates_run = updates_run;
        self.stats.last_updates_deferred = updates_deferred;
        self.stats.provider_misses += provider_misses as u64;
        self.stats.backend_failures += tally.failures;
        self.stats.ingress_applied += ingress_applied as u64;
        self.stats.ingress_dropped += ingress_dropped as u64;

        TickOutcome::Ran(CycleReport {
            cycle: self.cycle,
            flushed: tally.flushed,
            flush_error: tally.flush_error,
            updates_run,
            updates_deferred,
            provider_misses,
            ingress_applied,
            ingress_dropped,
            elapsed,
            reestimate,
        })
    }

    /// Apply queued ingress messages; at most one channel's worth per
    /// cycle so a busy producer cannot stall the cycle.
    fn drain_ingress(&mut self, now: Instant) -> (usize, usize) {
        let (mut applied, mut dropped) = (0, 0);
        for _ in 0..self.config.ingress_capacity {
            let Some(msg) = self.ingress_rx.try_recv() else {
                break;
            };
            let ok = match msg {
                IngressMessage::Enqueue { handle, vector } => {
                    let known = self.agents.contains_key(&handle);
                    if known {
                        self.scheduler.enqueue_at(handle, vector, now);
                    }
                    known
                }
                IngressMessage::Despawn(handle) => self.on_agent_despawned(handle),
            };
            if ok {
                applied += 1;
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!("dropped {dropped} ingress messages for unknown agents");
        }
        (applied, dropped)
    }

    /// Returns `(run, deferred, misses)`.
    fn run_agent_updates(&mut self, now: Instant, tally: &mut CycleTally) -> (usize, usize, usize) {
        let n = self.agents.len();
        if n == 0 {
            self.cursor = 0;
            return (0, 0, 0);
        }
        let budget = self.config.max_agent_updates_per_tick;
        let max_batch = self.scheduler.config().max_batch_size;
        let start = self.cursor % n;
        let (mut attempts, mut run, mut deferred, mut misses) = (0usize, 0usize, 0usize, 0usize);
        let mut first_deferred = None;

        for step in 0..n {
            let idx = (start + step) % n;
            let Some((&handle, entry)) = self.agents.get_index_mut(idx) else {
                continue;
            };
            if !entry.is_due(self.cycle) {
                continue;
            }
            if attempts >= budget {
                entry.owed = true;
                deferred += 1;
                first_deferred.get_or_insert(idx);
                continue;
            }
            entry.owed = false;
            attempts += 1;
            let slot = entry.slot;

            let Some(snapshot) = self.pool.prepare(slot) else {
                continue;
            };
            if !self.provider.fill_snapshot(handle, snapshot) {
                misses += 1;
                continue;
            }
            let Some(vector) = self.pool.encode_slot(&self.encoder, slot) else {
                continue;
            };
            self.scheduler.enqueue_at(handle, *vector, now);
            run += 1;

            if self.scheduler.pending() >= max_batch {
                tally.record(self.scheduler.flush_at(now, false));
            }
        }

        if let Some(idx) = first_deferred {
            self.cursor = idx;
        }
        (run, deferred, misses)
    }

    // ── Telemetry ──────────────────────────────────────────────────

    /// Take every resolved decision, in dispatch order.
    pub fn drain_decisions(&mut self) -> Drain<'_, Decision> {
        self.scheduler.drain_decisions()
    }

    /// Admission controller snapshot.
    pub fn limiter_stats(&self) -> LimiterStats {
        self.admission.stats()
    }

    /// Batch scheduler snapshot.
    pub fn batching_stats(&self) -> BatchingStats {
        self.scheduler.stats()
    }

    /// Orchestrator counters.
    pub fn cycle_stats(&self) -> CycleStats {
        CycleStats {
            registered_agents: self.agents.len(),
            ..self.stats.clone()
        }
    }

    /// Id of the most recent cycle.
    pub fn current_cycle(&self) -> CycleId {
        self.cycle
    }

    /// A sender for worker threads.
    pub fn ingress_sender(&self) -> IngressSender {
        self.ingress_tx.clone()
    }

    /// Drop every agent, pending request, undrained decision, and queued
    /// ingress message, and return admission to its initial state.
    ///
    /// Handles are not reused after a reset.
    pub fn reset_session(&mut self, now: Instant) {
        let agents = self.agents.len();
        let pending = self.scheduler.pending();
        let fallbacks = self.admission.stats().fallback_count;
        while self.ingress_rx.try_recv().is_some() {}
        self.scheduler.reset(now);
        self.agents.clear();
        self.pool.clear();
        self.admission.reset(now);
        self.cursor = 0;
        self.last_decision = None;
        self.stats = CycleStats::default();
        info!(
            "session reset: {agents} agents released, {pending} pending requests dropped, \
             {fallbacks} spawn denials this session"
        );
    }
}

impl fmt::Debug for CycleOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleOrchestrator")
            .field("cycle", &self.cycle)
            .field("agents", &self.agents.len())
            .field("cursor", &self.cursor)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
