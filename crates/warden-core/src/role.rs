//! Agent roles and their per-role decision defaults.
//!
//! The role table is an exhaustive `match`, so adding a role without a
//! profile is a compile error rather than a silently-missing table entry.

use std::fmt;

/// The role an agent was spawned with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentRole {
    /// Close-range fighter.
    Melee,
    /// Long-range fighter.
    Ranged,
    /// Healer / buffer.
    Support,
    /// High-value unit that decides every cycle.
    Elite,
}

/// Per-role decision defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleProfile {
    /// The agent is updated on every `update_stride`-th decision cycle
    /// (counted from its spawn cycle). Always at least 1.
    pub update_stride: u32,
}

impl AgentRole {
    /// Every role, in declaration order.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Melee,
        AgentRole::Ranged,
        AgentRole::Support,
        AgentRole::Elite,
    ];

    /// Decision defaults for this role.
    pub const fn profile(self) -> RoleProfile {
        match self {
            AgentRole::Melee => RoleProfile { update_stride: 1 },
            AgentRole::Ranged => RoleProfile { update_stride: 2 },
            AgentRole::Support => RoleProfile { update_stride: 3 },
            AgentRole::Elite => RoleProfile { update_stride: 1 },
        }
    }

    /// Lowercase name used in log lines.
    pub const fn name(self) -> &'static str {
        match self {
            AgentRole::Melee => "melee",
            AgentRole::Ranged => "ranged",
            AgentRole::Support => "support",
            AgentRole::Elite => "elite",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_a_positive_stride() {
        for role in AgentRole::ALL {
            assert!(role.profile().update_stride >= 1, "{role} has zero stride");
        }
    }

    #[test]
    fn elite_decides_every_cycle() {
        assert_eq!(AgentRole::Elite.profile().update_stride, 1);
    }

    #[test]
    fn display_uses_lowercase_name() {
        assert_eq!(AgentRole::Support.to_string(), "support");
    }
}
