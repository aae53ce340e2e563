//! Strongly-typed identifiers.

use std::fmt;

/// Identifies an admitted agent for the lifetime of its admission.
///
/// Handles are allocated by the cycle orchestrator from a per-instance
/// monotonic counter and are never reused within a session, so a stale
/// handle held by the host after despawn can never alias a newer agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentHandle(pub u64);

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

impl From<u64> for AgentHandle {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Monotonically increasing decision-cycle counter.
///
/// Incremented each time the orchestrator runs a (non-throttled) cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub u64);

impl CycleId {
    /// The cycle following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CycleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
