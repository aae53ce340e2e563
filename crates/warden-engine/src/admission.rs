//! Adaptive admission control for costly agent decisions.
//!
//! [`AdmissionController`] decides whether one more agent may use the
//! learned policy. It keeps a latency EMA fed by
//! [`report_latency`](AdmissionController::report_latency) and, on a
//! fixed wall-clock interval, re-estimates the per-agent cost and the
//! ceiling:
//!
//! ```text
//! cost'    = blend_old × cost + (1 − blend_old) × ema / max(1, active)
//! target   = floor(budget / cost' × safety_margin)
//! ceiling' = clamp(clamp(target, ceiling ± max_step), min_agents, hard_cap)
//! ```
//!
//! A slow backend raises the measured latency, which lowers the ceiling,
//! which sheds future load. That feedback loop is the only backpressure
//! in the system.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{AdmissionConfig, ConfigError};
use crate::metrics::LimiterStats;

/// Nudge applied before flooring so exact ratios are not lost to
/// floating-point error.
const FLOOR_EPSILON: f64 = 1e-9;

// ── Decision types ─────────────────────────────────────────────────

/// Why an admission decision came out the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdmissionReason {
    /// Below the ceiling and within the latency projection.
    WithinCapacity,
    /// Active agents already equal the ceiling.
    CeilingReached,
    /// One more agent would push projected cost past the budget.
    LatencyProjectionExceeded,
}

impl fmt::Display for AdmissionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WithinCapacity => "within capacity",
            Self::CeilingReached => "ceiling reached",
            Self::LatencyProjectionExceeded => "latency projection exceeded",
        })
    }
}

/// Result of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmissionDecision {
    /// Whether the agent may use the learned policy.
    pub admit: bool,
    /// Why.
    pub reason: AdmissionReason,
}

/// Outcome of one re-estimation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reestimate {
    /// Ceiling before the step.
    pub old_ceiling: usize,
    /// Ceiling after the step.
    pub new_ceiling: usize,
    /// Per-agent cost after blending.
    pub estimated_cost: Duration,
    /// Latency average the step was based on.
    pub recent_latency: Duration,
}

// ── LatencyWindow ──────────────────────────────────────────────────

/// Fixed-capacity ring of recent latency samples.
#[derive(Clone, Debug)]
struct LatencyWindow {
    samples: Vec<Duration>,
    pos: usize,
    len: usize,
}

impl LatencyWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![Duration::ZERO; capacity.max(1)],
            pos: 0,
            len: 0,
        }
    }

    fn push(&mut self, sample: Duration) {
        self.samples[self.pos] = sample;
        self.pos = (self.pos + 1) % self.samples.len();
        self.len = (self.len + 1).min(self.samples.len());
    }

    fn clear(&mut self) {
        self.pos = 0;
        self.len = 0;
    }

    fn live(&self) -> &[Duration] {
        // Until the ring wraps, the live samples are the prefix.
        &self.samples[..self.len]
    }

    fn mean(&self) -> Duration {
        if self.len == 0 {
            return Duration::ZERO;
        }
        let total: Duration = self.live().iter().sum();
        total / self.len as u32
    }

    fn max(&self) -> Duration {
        self.live().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    fn p95(&self) -> Duration {
        if self.len == 0 {
            return Duration::ZERO;
        }
        let mut sorted = self.live().to_vec();
        sorted.sort_unstable();
        let rank = ((0.95 * self.len as f64).ceil() as usize).clamp(1, self.len);
        sorted[rank - 1]
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

// ── AdmissionController ────────────────────────────────────────────

/// Decides how many agents may make costly decisions per cycle.
#[derive(Clone, Debug)]
pub struct AdmissionController {
    config: AdmissionConfig,
    active: usize,
    ceiling: usize,
    fallbacks: u64,
    /// `None` until the first sample, which then seeds the average.
    ema_secs: Option<f64>,
    cost_secs: f64,
    window: LatencyWindow,
    last_reestimate: Instant,
    reestimations: u64,
}

impl AdmissionController {
    /// Create a controller whose re-estimation clock starts at `now`.
    pub fn new(config: AdmissionConfig, now: Instant) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            active: 0,
            ceiling: config.initial_ceiling,
            fallbacks: 0,
            ema_secs: None,
            cost_secs: config.seed_per_agent_cost.as_secs_f64(),
            window: LatencyWindow::new(config.latency_window),
            last_reestimate: now,
            reestimations: 0,
            config,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Whether one more agent may be admitted.
    pub fn can_admit(&self) -> bool {
        self.decision().admit
    }

    /// Admission decision with its reason.
    ///
    /// The ceiling check wins over the latency projection. Before the
    /// first latency sample the per-agent cost may be zero, in which
    /// case the projection always passes.
    pub fn decision(&self) -> AdmissionDecision {
        if self.active >= self.ceiling {
            return AdmissionDecision {
                admit: false,
                reason: AdmissionReason::CeilingReached,
            };
        }
        if self.cost_secs > 0.0 {
            let projected = self.cost_secs * (self.active + 1) as f64;
            if projected > self.config.target_budget.as_secs_f64() {
                return AdmissionDecision {
                    admit: false,
                    reason: AdmissionReason::LatencyProjectionExceeded,
                };
            }
        }
        AdmissionDecision {
            admit: true,
            reason: AdmissionReason::WithinCapacity,
        }
    }

    /// Count one more active agent.
    pub fn admit(&mut self) {
        self.active = self.active.saturating_add(1);
    }

    /// Count one fewer active agent (never below zero).
    pub fn release(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    /// Decide, then either admit or record a fallback.
    pub fn try_admit(&mut self) -> AdmissionDecision {
        let d = self.decision();
        if d.admit {
            self.admit();
        } else {
            self.record_fallback();
        }
        d
    }

    /// Record that a denied agent took the fallback path.
    pub fn record_fallback(&mut self) {
        self.fallbacks += 1;
    }

    /// Feed one measured cycle latency.
    pub fn report_latency(&mut self, measured: Duration) {
        let x = measured.as_secs_f64();
        let a = self.config.ema_alpha;
        self.ema_secs = Some(match self.ema_secs {
            None => x,
            Some(prev) => a * x + (1.0 - a) * prev,
        });
        self.window.push(measured);
    }

    /// Re-estimate if `reestimate_interval` has elapsed since the last one.
    pub fn maybe_reestimate(&mut self, now: Instant) -> Option<Reestimate> {
        if now.saturating_duration_since(self.last_reestimate) < self.config.reestimate_interval {
            return None;
        }
        self.last_reestimate = now;
        Some(self.reestimate())
    }

    /// Run one re-estimation step unconditionally.
    ///
    /// Without any latency sample yet, the cost and ceiling are left
    /// unchanged. An unseeded cost (zero) is replaced by the first
    /// observation instead of blended, so it does not crawl up from zero.
    pub fn reestimate(&mut self) -> Reestimate {
        self.reestimations += 1;
        let old = self.ceiling;
        let Some(ema) = self.ema_secs else {
            return Reestimate {
                old_ceiling: old,
                new_ceiling: old,
                estimated_cost: secs_to_duration(self.cost_secs),
                recent_latency: Duration::ZERO,
            };
        };

        let observed = ema / self.active.max(1) as f64;
        self.cost_secs = if self.cost_secs > 0.0 {
            let w = self.config.cost_blend_old;
            w * self.cost_secs + (1.0 - w) * observed
        } else {
            observed
        };

        let budget = self.config.target_budget.as_secs_f64();
        let target = if self.cost_secs > 0.0 {
            let raw = (budget / self.cost_secs * self.config.safety_margin + FLOOR_EPSILON).floor();
            if raw >= usize::MAX as f64 {
                usize::MAX
            } else {
                raw as usize
            }
        } else {
            self.config.max_agents_hard_cap
        };

        let step = self.config.max_ceiling_step;
        let stepped = target.clamp(old.saturating_sub(step), old.saturating_add(step));
        let new = stepped.clamp(self.config.min_agents, self.config.max_agents_hard_cap);
        self.ceiling = new;

        if new != old {
            debug!(
                "admission ceiling {old} -> {new} (target {target}, cost {:.3} ms, ema {:.3} ms)",
                self.cost_secs * 1e3,
                ema * 1e3,
            );
        }
        if new == self.config.min_agents && ema > budget {
            warn!(
                "admission ceiling saturated at min_agents={} with latency {:.3} ms over budget {:.3} ms",
                new,
                ema * 1e3,
                budget * 1e3,
            );
        }

        Reestimate {
            old_ceiling: old,
            new_ceiling: new,
            estimated_cost: secs_to_duration(self.cost_secs),
            recent_latency: secs_to_duration(ema),
        }
    }

    /// Agents currently admitted.
    pub fn active_agents(&self) -> usize {
        self.active
    }

    /// Current ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Telemetry snapshot.
    pub fn stats(&self) -> LimiterStats {
        let ema = self.ema_secs.unwrap_or(0.0);
        let budget = self.config.target_budget.as_secs_f64();
        LimiterStats {
            active_agents: self.active,
            ceiling: self.ceiling,
            fallback_count: self.fallbacks,
            ema_latency: secs_to_duration(ema),
            estimated_per_agent_cost: secs_to_duration(self.cost_secs),
            target_budget: self.config.target_budget,
            window_samples: self.window.len,
            window_mean: self.window.mean(),
            window_p95: self.window.p95(),
            window_max: self.window.max(),
            utilization: ema / budget,
            reestimations: self.reestimations,
        }
    }

    /// Return to the just-constructed state, restarting the
    /// re-estimation clock at `now`.
    pub fn reset(&mut self, now: Instant) {
        info!(
            "admission reset (was {} active, ceiling {}, {} fallbacks)",
            self.active, self.ceiling, self.fallbacks
        );
        self.active = 0;
        self.ceiling = self.config.initial_ceiling;
        self.fallbacks = 0;
        self.ema_secs = None;
        self.cost_secs = self.config.seed_per_agent_cost.as_secs_f64();
        self.window.clear();
        self.last_reestimate = now;
        self.reestimations = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn controller(cfg: AdmissionConfig) -> (AdmissionController, Instant) {
        let t0 = Instant::now();
        (AdmissionController::new(cfg, t0).unwrap(), t0)
    }

    #[test]
    fn ceiling_reached_blocks_admission() {
        let (mut ac, _) = controller(AdmissionConfig::default());
        for _ in 0..50 {
            ac.admit();
        }
        assert_eq!(ac.ceiling(), 50);
        assert!(!ac.can_admit());
        assert_eq!(ac.decision().reason, AdmissionReason::CeilingReached);
    }

    #[test]
    fn unseeded_cost_always_admits_below_ceiling() {
        let (ac, _) = controller(AdmissionConfig::default());
        let d = ac.decision();
        assert!(d.admit);
        assert_eq!(d.reason, AdmissionReason::WithinCapacity);
    }

    #[test]
    fn latency_projection_denies_before_ceiling() {
        let (mut ac, _) = controller(AdmissionConfig {
            seed_per_agent_cost: ms(4),
            ..AdmissionConfig::default()
        });
        // 4 ms × 4 = 16 ms fits; a fifth would be 20 ms.
        for _ in 0..4 {
            assert!(ac.try_admit().admit);
        }
        let d = ac.try_admit();
        assert!(!d.admit);
        assert_eq!(d.reason, AdmissionReason::LatencyProjectionExceeded);
        assert_eq!(ac.active_agents(), 4);
        assert_eq!(ac.stats().fallback_count, 1);
    }

    #[test]
    fn release_floors_at_zero() {
        let (mut ac, _) = controller(AdmissionConfig::default());
        ac.release();
        ac.release();
        assert_eq!(ac.active_agents(), 0);
        ac.admit();
        ac.release();
        ac.release();
        assert_eq!(ac.active_agents(), 0);
    }

    #[test]
    fn first_sample_seeds_ema() {
        let (mut ac, _) = controller(AdmissionConfig::default());
        ac.report_latency(ms(10));
        let ema = ac.stats().ema_latency.as_secs_f64();
        assert!((ema - 0.010).abs() < 1e-9, "ema = {ema}");
        ac.report_latency(ms(20));
        // 0.2 × 20 + 0.8 × 10 = 12
        let ema = ac.stats().ema_latency.as_secs_f64();
        assert!((ema - 0.012).abs() < 1e-9, "ema = {ema}");
    }

    #[test]
    fn reestimate_without_samples_keeps_ceiling() {
        let (mut ac, _) = controller(AdmissionConfig::default());
        let r = ac.reestimate();
        assert_eq!(r.old_ceiling, 50);
        assert_eq!(r.new_ceiling, 50);
        assert_eq!(ac.stats().reestimations, 1);
    }

    #[test]
    fn reestimate_steps_toward_target() {
        let (mut ac, _) = controller(AdmissionConfig::default());
        for _ in 0..40 {
            ac.admit();
        }
        ac.report_latency(ms(16));
        // cost = 16 / 40 = 0.4 ms; target = 16 / 0.4 × 0.8 = 32.
        let expected = [45, 40, 35, 32, 32];
        for want in expected {
            let r = ac.reestimate();
            assert_eq!(r.new_ceiling, want);
            assert!(r.old_ceiling.abs_diff(r.new_ceiling) <= 5);
        }
        let cost = ac.stats().estimated_per_agent_cost.as_secs_f64();
        assert!((cost - 0.0004).abs() < 1e-9, "cost = {cost}");
    }

    #[test]
    fn cost_blends_heavy_old() {
        let (mut ac, _) = controller(AdmissionConfig {
            seed_per_agent_cost: ms(1),
            ..AdmissionConfig::default()
        });
        ac.report_latency(ms(2));
        ac.reestimate();
        // 0.9 × 1 + 0.1 × 2 = 1.1 ms
        let cost = ac.stats().estimated_per_agent_cost.as_secs_f64();
        assert!((cost - 0.0011).abs() < 1e-9, "cost = {cost}");
    }

    #[test]
    fn ceiling_never_leaves_bounds() {
        let (mut ac, _) = controller(AdmissionConfig {
            min_agents: 3,
            initial_ceiling: 5,
            ..AdmissionConfig::default()
        });
        ac.report_latency(Duration::from_secs(1));
        for _ in 0..10 {
            ac.reestimate();
        }
        assert_eq!(ac.ceiling(), 3);

        let (mut ac, _) = controller(AdmissionConfig {
            max_agents_hard_cap: 60,
            ..AdmissionConfig::default()
        });
        ac.report_latency(Duration::from_micros(1));
        for _ in 0..10 {
            ac.reestimate();
        }
        assert_eq!(ac.ceiling(), 60);
    }

    #[test]
    fn maybe_reestimate_respects_interval() {
        let (mut ac, t0) = controller(AdmissionConfig::default());
        ac.report_latency(ms(5));
        assert!(ac.maybe_reestimate(t0 + ms(1999)).is_none());
        assert!(ac.maybe_reestimate(t0 + ms(2000)).is_some());
        assert!(ac.maybe_reestimate(t0 + ms(3000)).is_none());
        assert!(ac.maybe_reestimate(t0 + ms(4000)).is_some());
        assert_eq!(ac.stats().reestimations, 2);
    }

    #[test]
    fn window_stats_track_recent_samples() {
        let (mut ac, _) = controller(AdmissionConfig {
            latency_window: 4,
            ..AdmissionConfig::default()
        });
        for n in [1, 2, 3, 4, 100] {
            ac.report_latency(ms(n));
        }
        let s = ac.stats();
        // The 1 ms sample has been overwritten.
        assert_eq!(s.window_samples, 4);
        assert_eq!(s.window_max, ms(100));
        assert_eq!(s.window_p95, ms(100));
        assert_eq!(s.window_mean, Duration::from_micros(27_250));
    }

    #[test]
    fn utilization_is_ema_over_budget() {
        let (mut ac, _) = controller(AdmissionConfig::default());
        ac.report_latency(ms(8));
        assert!((ac.stats().utilization - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reset_restores_initial_state() {
        let (mut ac, t0) = controller(AdmissionConfig::default());
        for _ in 0..10 {
            ac.admit();
        }
        ac.record_fallback();
        ac.report_latency(ms(50));
        ac.reestimate();
        ac.reset(t0 + ms(10));

        let s = ac.stats();
        assert_eq!(s.active_agents, 0);
        assert_eq!(s.ceiling, 50);
        assert_eq!(s.fallback_count, 0);
        assert_eq!(s.window_samples, 0);
        assert_eq!(s.ema_latency, Duration::ZERO);
        assert_eq!(s.reestimations, 0);
        assert!(ac.maybe_reestimate(t0 + ms(1000)).is_none());
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = AdmissionConfig {
            min_agents: 0,
            ..AdmissionConfig::default()
        };
        assert_eq!(
            AdmissionController::new(cfg, Instant::now()).unwrap_err(),
            ConfigError::MinAgentsZero
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Admit,
            TryAdmit,
            Release,
            Report(u64),
            Reestimate,
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Admit),
                Just(Op::TryAdmit),
                Just(Op::Release),
                (0u64..50_000).prop_map(Op::Report),
                Just(Op::Reestimate),
            ]
        }

        proptest! {
            #[test]
            fn ceiling_stays_bounded_and_steps_are_small(
                ops in prop::collection::vec(arb_op(), 0..200),
                min in 1usize..10,
                span in 0usize..100,
                step in 1usize..8,
            ) {
                let max = min + span;
                let cfg = AdmissionConfig {
                    min_agents: min,
                    max_agents_hard_cap: max,
                    initial_ceiling: min + span / 2,
                    max_ceiling_step: step,
                    ..AdmissionConfig::default()
                };
                let mut ac = AdmissionController::new(cfg, Instant::now()).unwrap();
                for op in ops {
                    match op {
                        Op::Admit => ac.admit(),
                        Op::TryAdmit => { ac.try_admit(); }
                        Op::Release => ac.release(),
                        Op::Report(us) => ac.report_latency(Duration::from_micros(us)),
                        Op::Reestimate => {
                            let r = ac.reestimate();
                            prop_assert!(r.old_ceiling.abs_diff(r.new_ceiling) <= step);
                        }
                    }
                    prop_assert!(ac.ceiling() >= min && ac.ceiling() <= max);
                    if ac.active_agents() >= ac.ceiling() {
                        prop_assert!(!ac.can_admit());
                    }
                }
            }

            #[test]
            fn try_admit_never_exceeds_ceiling(n in 0usize..300) {
                let mut ac = AdmissionController::new(AdmissionConfig::default(), Instant::now()).unwrap();
                for _ in 0..n {
                    ac.try_admit();
                }
                prop_assert!(ac.active_agents() <= ac.ceiling());
                prop_assert_eq!(ac.stats().fallback_count as usize, n - ac.active_agents());
            }
        }
    }
}
