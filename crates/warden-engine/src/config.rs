//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] bundles the per-component configs. Every struct is
//! plain data with documented defaults; [`validate()`](EngineConfig::validate)
//! checks all invariants once at construction so nothing is rejected
//! at runtime.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use warden_obs::{EncoderConfig, EncoderConfigError};

// ── AdmissionConfig ────────────────────────────────────────────────

/// Configuration for the adaptive admission controller.
#[derive(Clone, Debug, PartialEq)]
pub struct AdmissionConfig {
    /// Wall-clock budget for one decision cycle. Default: 16 ms.
    pub target_budget: Duration,
    /// Lower bound on the ceiling. Default: 1.
    pub min_agents: usize,
    /// Upper bound on the ceiling. Default: 200.
    pub max_agents_hard_cap: usize,
    /// Ceiling before the first re-estimation. Default: 50.
    pub initial_ceiling: usize,
    /// Per-agent cost assumed before any latency sample. Default: 0
    /// (always admit until the first sample arrives).
    pub seed_per_agent_cost: Duration,
    /// Weight of the newest sample in the latency EMA. Default: 0.2.
    pub ema_alpha: f64,
    /// Wall-clock interval between re-estimations. Default: 2 s.
    pub reestimate_interval: Duration,
    /// Fraction of the budget the ceiling targets. Default: 0.8.
    pub safety_margin: f64,
    /// Largest ceiling change per re-estimation. Default: 5.
    pub max_ceiling_step: usize,
    /// Weight of the previous per-agent cost when blending in a new
    /// estimate. Default: 0.9.
    pub cost_blend_old: f64,
    /// Number of recent cycle latencies kept for stats. Default: 64.
    pub latency_window: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            target_budget: Duration::from_millis(16),
            min_agents: 1,
            max_agents_hard_cap: 200,
            initial_ceiling: 50,
            seed_per_agent_cost: Duration::ZERO,
            ema_alpha: 0.2,
            reestimate_interval: Duration::from_secs(2),
            safety_margin: 0.8,
            max_ceiling_step: 5,
            cost_blend_old: 0.9,
            latency_window: 64,
        }
    }
}

impl AdmissionConfig {
    /// Check the admission invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        nonzero("target_budget", self.target_budget)?;
        nonzero("reestimate_interval", self.reestimate_interval)?;
        if self.min_agents == 0 {
            return Err(ConfigError::MinAgentsZero);
        }
        if self.min_agents > self.max_agents_hard_cap {
            return Err(ConfigError::InvertedBounds {
                min: self.min_agents,
                max: self.max_agents_hard_cap,
            });
        }
        if self.initial_ceiling < self.min_agents || self.initial_ceiling > self.max_agents_hard_cap
        {
            return Err(ConfigError::InitialCeilingOutOfBounds {
                initial: self.initial_ceiling,
                min: self.min_agents,
                max: self.max_agents_hard_cap,
            });
        }
        // Alpha and margin live in (0, 1]; the blend weight in [0, 1).
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::InvalidFraction {
                name: "ema_alpha",
                value: self.ema_alpha,
            });
        }
        if !(self.safety_margin > 0.0 && self.safety_margin <= 1.0) {
            return Err(ConfigError::InvalidFraction {
                name: "safety_margin",
                value: self.safety_margin,
            });
        }
        if !(self.cost_blend_old >= 0.0 && self.cost_blend_old < 1.0) {
            return Err(ConfigError::InvalidFraction {
                name: "cost_blend_old",
                value: self.cost_blend_old,
            });
        }
        if self.max_ceiling_step == 0 {
            return Err(ConfigError::ZeroCount {
                name: "max_ceiling_step",
            });
        }
        if self.latency_window == 0 {
            return Err(ConfigError::ZeroCount {
                name: "latency_window",
            });
        }
        Ok(())
    }
}

// ── BatchConfig ────────────────────────────────────────────────────

/// Configuration for the batch scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Pending requests that force a flush. Default: 32.
    pub max_batch_size: usize,
    /// Longest a non-empty queue may wait since the last flush. Default: 5 ms.
    pub batch_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 32,
            batch_timeout: Duration::from_millis(5),
        }
    }
}

impl BatchConfig {
    /// Check the batching invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroCount {
                name: "max_batch_size",
            });
        }
        nonzero("batch_timeout", self.batch_timeout)
    }
}

// ── CycleConfig ────────────────────────────────────────────────────

/// Configuration for the decision-cycle orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleConfig {
    /// Minimum time between decision cycles. Default: 100 ms.
    pub decision_interval: Duration,
    /// Per-agent updates allowed in one cycle. Default: 64.
    pub max_agent_updates_per_tick: usize,
    /// Capacity of the cross-thread ingress channel. Default: 1024.
    pub ingress_capacity: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            decision_interval: Duration::from_millis(100),
            max_agent_updates_per_tick: 64,
            ingress_capacity: 1024,
        }
    }
}

impl CycleConfig {
    /// Check the cycle invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        nonzero("decision_interval", self.decision_interval)?;
        if self.max_agent_updates_per_tick == 0 {
            return Err(ConfigError::ZeroCount {
                name: "max_agent_updates_per_tick",
            });
        }
        if self.ingress_capacity == 0 {
            return Err(ConfigError::ZeroCount {
                name: "ingress_capacity",
            });
        }
        Ok(())
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete configuration for a [`CycleOrchestrator`](crate::CycleOrchestrator).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    /// Admission controller settings.
    pub admission: AdmissionConfig,
    /// Batch scheduler settings.
    pub batching: BatchConfig,
    /// Decision cycle settings.
    pub cycle: CycleConfig,
    /// Observation normalization constants.
    pub encoder: EncoderConfig,
}

impl EngineConfig {
    /// Validate every component config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.admission.validate()?;
        self.batching.validate()?;
        self.cycle.validate()?;
        self.encoder.validate()?;
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during configuration validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// An encoder constant is invalid.
    Encoder(EncoderConfigError),
    /// A budget or interval is zero.
    ZeroDuration {
        /// Name of the offending field.
        name: &'static str,
    },
    /// `min_agents` is zero.
    MinAgentsZero,
    /// `min_agents` exceeds `max_agents_hard_cap`.
    InvertedBounds {
        /// Configured lower bound.
        min: usize,
        /// Configured upper bound.
        max: usize,
    },
    /// `initial_ceiling` lies outside `[min_agents, max_agents_hard_cap]`.
    InitialCeilingOutOfBounds {
        /// Configured initial ceiling.
        initial: usize,
        /// Configured lower bound.
        min: usize,
        /// Configured upper bound.
        max: usize,
    },
    /// A weight or margin is NaN or outside its allowed interval.
    InvalidFraction {
        /// Name of the offending field.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A count that must be at least 1 is zero.
    ZeroCount {
        /// Name of the offending field.
        name: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder(e) => write!(f, "encoder: {e}"),
            Self::ZeroDuration { name } => write!(f, "{name} must be greater than zero"),
            Self::MinAgentsZero => write!(f, "min_agents must be at least 1"),
            Self::InvertedBounds { min, max } => {
                write!(f, "min_agents ({min}) exceeds max_agents_hard_cap ({max})")
            }
            Self::InitialCeilingOutOfBounds { initial, min, max } => {
                write!(f, "initial_ceiling {initial} is outside [{min}, {max}]")
            }
            Self::InvalidFraction { name, value } => {
                write!(f, "{name} is out of range, got {value}")
            }
            Self::ZeroCount { name } => write!(f, "{name} must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encoder(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EncoderConfigError> for ConfigError {
    fn from(e: EncoderConfigError) -> Self {
        Self::Encoder(e)
    }
}

fn nonzero(name: &'static str, d: Duration) -> Result<(), ConfigError> {
    if d.is_zero() {
        return Err(ConfigError::ZeroDuration { name });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_succeeds() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_inverted_bounds_fails() {
        let mut cfg = EngineConfig::default();
        cfg.admission.min_agents = 10;
        cfg.admission.max_agents_hard_cap = 5;
        match cfg.validate() {
            Err(ConfigError::InvertedBounds { min: 10, max: 5 }) => {}
            other => panic!("expected InvertedBounds, got {other:?}"),
        }
    }

    #[test]
    fn validate_initial_ceiling_outside_bounds_fails() {
        let mut cfg = EngineConfig::default();
        cfg.admission.initial_ceiling = 500;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InitialCeilingOutOfBounds { initial: 500, .. })
        ));
    }

    #[test]
    fn validate_zero_batch_size_fails() {
        let mut cfg = EngineConfig::default();
        cfg.batching.max_batch_size = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroCount {
                name: "max_batch_size"
            })
        );
    }

    #[test]
    fn validate_zero_budget_fails() {
        let mut cfg = EngineConfig::default();
        cfg.admission.target_budget = Duration::ZERO;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroDuration {
                name: "target_budget"
            })
        );
    }

    #[test]
    fn validate_fractions() {
        let bad = [
            AdmissionConfig {
                ema_alpha: 0.0,
                ..AdmissionConfig::default()
            },
            AdmissionConfig {
                ema_alpha: f64::NAN,
                ..AdmissionConfig::default()
            },
            AdmissionConfig {
                safety_margin: 1.5,
                ..AdmissionConfig::default()
            },
            AdmissionConfig {
                cost_blend_old: 1.0,
                ..AdmissionConfig::default()
            },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidFraction { .. })),
                "{cfg:?} should be rejected"
            );
        }
        let ok = AdmissionConfig {
            ema_alpha: 1.0,
            cost_blend_old: 0.0,
            ..AdmissionConfig::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn validate_zero_counts_fail() {
        let mut cfg = EngineConfig::default();
        cfg.cycle.ingress_capacity = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroCount {
                name: "ingress_capacity"
            })
        ));

        let mut cfg = EngineConfig::default();
        cfg.admission.latency_window = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroCount {
                name: "latency_window"
            })
        ));
    }

    #[test]
    fn encoder_errors_chain_as_source() {
        let mut cfg = EngineConfig::default();
        cfg.encoder.world_extent = -1.0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Encoder(_)));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("encoder: world_extent"));
    }
}
