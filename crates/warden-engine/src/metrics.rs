//! Read-only telemetry snapshots.
//!
//! Each struct is recomputed on demand from the owning component and
//! carries no references back into it, so callers can keep or log them
//! freely. Producing one never mutates engine state.

use std::time::Duration;

/// Admission controller state, from
/// [`AdmissionController::stats`](crate::AdmissionController::stats).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LimiterStats {
    /// Agents currently holding a costly-decision slot.
    pub active_agents: usize,
    /// Current admission ceiling.
    pub ceiling: usize,
    /// Cumulative denied admissions routed to the fallback path.
    pub fallback_count: u64,
    /// Exponential moving average of cycle latency.
    pub ema_latency: Duration,
    /// Estimated cost of one agent's decision per cycle.
    pub estimated_per_agent_cost: Duration,
    /// Configured per-cycle budget.
    pub target_budget: Duration,
    /// Latency samples currently in the window.
    pub window_samples: usize,
    /// Mean of the windowed samples.
    pub window_mean: Duration,
    /// 95th-percentile (nearest rank) of the windowed samples.
    pub window_p95: Duration,
    /// Largest windowed sample.
    pub window_max: Duration,
    /// `ema_latency / target_budget`.
    pub utilization: f64,
    /// Re-estimations performed since the last reset.
    pub reestimations: u64,
}

/// Batch scheduler counters, from
/// [`BatchScheduler::stats`](crate::BatchScheduler::stats).
///
/// Averages cover successful batches only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchingStats {
    /// Batches dispatched successfully.
    pub total_batches: u64,
    /// Requests resolved by successful batches.
    pub total_requests: u64,
    /// `total_requests / total_batches`.
    pub avg_batch_size: f64,
    /// Mean wall-clock time of a successful backend call.
    pub avg_dispatch_latency: Duration,
    /// Batches the backend failed.
    pub failed_batches: u64,
    /// Requests dropped with failed batches.
    pub dropped_requests: u64,
    /// Longest time any dispatched request spent pending.
    pub max_queue_wait: Duration,
    /// Requests currently pending.
    pub pending: usize,
}

/// Orchestrator counters, from
/// [`CycleOrchestrator::cycle_stats`](crate::CycleOrchestrator::cycle_stats).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Decision cycles that ran.
    pub cycles_run: u64,
    /// Ticks skipped because the decision interval had not elapsed.
    pub cycles_throttled: u64,
    /// Wall-clock time of the most recent cycle.
    pub last_cycle_time: Duration,
    /// Agent updates run in the most recent cycle.
    pub last_updates_run: usize,
    /// Agents due but deferred to a later cycle in the most recent cycle.
    pub last_updates_deferred: usize,
    /// Agents skipped because the provider had no state for them.
    pub provider_misses: u64,
    /// Backend failures observed by the orchestrator.
    pub backend_failures: u64,
    /// Ingress messages applied.
    pub ingress_applied: u64,
    /// Ingress messages dropped (unknown handle).
    pub ingress_dropped: u64,
    /// Registered agents.
    pub registered_agents: usize,
}
