//! Benchmark profiles and utilities for the Warden decision-budget framework.
//!
//! Provides pre-built [`EngineConfig`] profiles for benchmarking and examples:
//!
//! - [`reference_profile`]: defaults with a 60 Hz frame budget
//! - [`stress_profile`]: large hard cap and batches for stress testing
//! - [`role_mix`]: deterministic role assignment via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

use warden_core::AgentRole;
use warden_engine::{AdmissionConfig, BatchConfig, CycleConfig, EngineConfig};

/// Build the reference profile: 16 ms budget, 10 Hz decisions,
/// up to 200 agents, batches of 32.
pub fn reference_profile() -> EngineConfig {
    EngineConfig::default()
}

/// Build a stress profile: 1000-agent hard cap, 200 initial ceiling,
/// batches of 128, and a re-estimation every 250 ms so the ceiling
/// reacts within a short run.
pub fn stress_profile() -> EngineConfig {
    EngineConfig {
        admission: AdmissionConfig {
            max_agents_hard_cap: 1000,
            initial_ceiling: 200,
            reestimate_interval: Duration::from_millis(250),
            latency_window: 256,
            ..AdmissionConfig::default()
        },
        batching: BatchConfig {
            max_batch_size: 128,
            batch_timeout: Duration::from_millis(2),
        },
        cycle: CycleConfig {
            decision_interval: Duration::from_millis(16),
            max_agent_updates_per_tick: 256,
            ingress_capacity: 4096,
        },
        ..EngineConfig::default()
    }
}

/// Deterministic roles for `n` agents.
///
/// Roughly half melee, a quarter ranged, the rest split between support
/// and elite, shuffled by a simple hash of the seed.
pub fn role_mix(n: usize, seed: u64) -> Vec<AgentRole> {
    (0..n as u64)
        .map(|i| {
            let h = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(i.wrapping_mul(1442695040888963407));
            match (h >> 33) % 8 {
                0..=3 => AgentRole::Melee,
                4 | 5 => AgentRole::Ranged,
                6 => AgentRole::Support,
                _ => AgentRole::Elite,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_validates() {
        reference_profile().validate().unwrap();
    }

    #[test]
    fn stress_profile_validates() {
        stress_profile().validate().unwrap();
    }

    #[test]
    fn role_mix_deterministic() {
        assert_eq!(role_mix(64, 42), role_mix(64, 42));
        assert_ne!(role_mix(64, 42), role_mix(64, 43));
    }

    #[test]
    fn role_mix_covers_every_role() {
        let roles = role_mix(256, 7);
        for role in AgentRole::ALL {
            assert!(roles.contains(&role), "{role} missing from mix");
        }
    }
}
