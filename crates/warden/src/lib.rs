//! Warden: latency-aware admission control and batched inference
//! scheduling for learned game-AI agents.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Warden sub-crates. For most users, adding `warden` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::time::Instant;
//! use warden::prelude::*;
//!
//! // A backend that answers every observation with a single zero action.
//! struct Idle;
//! impl InferenceBackend for Idle {
//!     fn name(&self) -> &str { "idle" }
//!     fn run_batch(&mut self, inputs: &[&[f32]]) -> Result<Vec<Action>, BackendError> {
//!         Ok(inputs.iter().map(|_| Action::from_slice(&[0.0])).collect())
//!     }
//! }
//!
//! // Every agent sees an empty world.
//! struct Empty;
//! impl WorldStateProvider for Empty {
//!     fn fill_snapshot(&mut self, _: AgentHandle, _: &mut WorldStateSnapshot) -> bool {
//!         true
//!     }
//! }
//!
//! let mut warden =
//!     CycleOrchestrator::new(EngineConfig::default(), Box::new(Idle), Box::new(Empty)).unwrap();
//! let agent = warden.on_agent_spawn_requested(AgentRole::Ranged).handle().unwrap();
//!
//! let t0 = Instant::now();
//! warden.tick(t0); // encode and enqueue
//! warden.tick(t0 + EngineConfig::default().cycle.decision_interval); // flush
//! let decisions: Vec<Decision> = warden.drain_decisions().collect();
//! assert_eq!(decisions[0].handle, agent);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `warden-core` | Handles, world-state snapshots, roles, errors, collaborator traits |
//! | [`obs`] | `warden-obs` | Fixed-layout observation encoding and per-agent buffers |
//! | [`engine`] | `warden-engine` | Admission control, batch scheduling, the decision cycle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`warden-core`).
///
/// Implement [`types::InferenceBackend`] and
/// [`types::WorldStateProvider`] to plug Warden into a game.
pub use warden_core as types;

/// Observation encoding (`warden-obs`).
///
/// [`obs::ObservationEncoder`] turns a snapshot into a fixed-length
/// normalized vector; [`obs::layout`] documents where each block lives.
pub use warden_obs as obs;

/// Admission control and the decision cycle (`warden-engine`).
pub use warden_engine as engine;

/// Common imports for typical Warden usage.
///
/// ```rust
/// use warden::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use warden_core::{
        Action, AgentHandle, AgentRole, CycleId, Decision, InferenceBackend, Vec2,
        WorldStateProvider, WorldStateSnapshot,
    };

    // Errors
    pub use warden_core::{BackendError, IngressError};

    // Observation
    pub use warden_obs::{EncodedVector, EncoderConfig, ObservationEncoder, OBS_SIZE};

    // Engine
    pub use warden_engine::{
        AdmissionReason, BatchingStats, ConfigError, CycleOrchestrator, CycleReport, CycleStats,
        EngineConfig, IngressSender, LimiterStats, SpawnOutcome, TickOutcome,
    };
}
