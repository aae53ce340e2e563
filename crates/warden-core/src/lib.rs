//! Core types and traits for the Warden decision-budget framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Warden workspace:
//! agent identifiers, world-state snapshots, agent roles, error types,
//! and the traits implemented by external collaborators (the inference
//! backend and the world-state provider).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod decision;
pub mod error;
pub mod id;
pub mod role;
pub mod state;
pub mod traits;

pub use decision::{Action, Decision};
pub use error::{BackendError, IngressError};
pub use id::{AgentHandle, CycleId};
pub use role::{AgentRole, RoleProfile};
pub use state::{
    HostileState, PickupState, SelfState, TargetState, TeammateState, TemporalState, Vec2,
    WorldStateSnapshot, MAX_AGENT_ID, MAX_HOSTILES, MAX_PICKUPS, MAX_TEAMMATES,
};
pub use traits::{InferenceBackend, WorldStateProvider};
