//! Resolved policy decisions.

use smallvec::SmallVec;

use crate::id::AgentHandle;

/// Opaque action values produced by the inference backend for one agent.
///
/// The core never interprets these; the host maps them to behaviour.
pub type Action = SmallVec<[f32; 8]>;

/// A resolved decision for one agent, produced by a batch flush.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// The agent the decision belongs to.
    pub handle: AgentHandle,
    /// Backend output for this agent.
    pub action: Action,
}
