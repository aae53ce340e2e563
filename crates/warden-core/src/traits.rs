//! Traits implemented by the external collaborators of the decision core.
//!
//! Both are injected once at construction time and owned by the
//! orchestrator; nothing is looked up through globals.

use crate::decision::Action;
use crate::error::BackendError;
use crate::id::AgentHandle;
use crate::state::WorldStateSnapshot;

/// The learned-policy inference engine.
///
/// Treated as a black box: the core hands it one batch of encoded
/// observations and measures how long it takes. Implementations may
/// run a single vectorized call or loop over inputs; either way the
/// batch must resolve atomically (all actions, or an error).
pub trait InferenceBackend: Send {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Run inference for one batch.
    ///
    /// `inputs[i]` is the encoded observation of the i-th request.
    /// On success, returns exactly one action per input, in order.
    fn run_batch(&mut self, inputs: &[&[f32]]) -> Result<Vec<Action>, BackendError>;
}

/// Source of per-agent world state, queried once per agent per cycle.
pub trait WorldStateProvider: Send {
    /// Fill `out` with the current state observed by `handle`.
    ///
    /// `out` arrives cleared. Returns `false` if no state is available
    /// for this agent this cycle (e.g. the host entity is mid-respawn);
    /// the agent is then skipped until the next cycle.
    fn fill_snapshot(&mut self, handle: AgentHandle, out: &mut WorldStateSnapshot) -> bool;
}
