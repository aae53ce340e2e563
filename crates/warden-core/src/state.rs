//! World-state snapshot types consumed by the observation encoder.
//!
//! A [`WorldStateSnapshot`] is everything one agent can observe during
//! one decision cycle. Variable-arity groups (teammates, hostiles,
//! pickups) are stored in [`SmallVec`]s whose inline capacity equals the
//! fixed slot count of the encoded layout, so filling a snapshot never
//! touches the heap in the common case.
//!
//! Entries beyond the fixed capacity are ignored by the encoder; slots
//! with no entry are absent and encode as exact zeros.

use smallvec::SmallVec;

/// Fixed number of teammate slots in an observation.
pub const MAX_TEAMMATES: usize = 3;
/// Fixed number of nearby-hostile slots in an observation.
pub const MAX_HOSTILES: usize = 5;
/// Fixed number of nearby-pickup slots in an observation.
pub const MAX_PICKUPS: usize = 10;
/// Largest valid group-membership id (`agent_id` ranges over `0..=3`).
pub const MAX_AGENT_ID: u8 = 3;

/// A 2D world-space vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Construct a vector from components.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Vec2) -> f32 {
        Vec2::new(self.x - other.x, self.y - other.y).length()
    }
}

/// The observing agent's own kinematic state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SelfState {
    /// World-space position.
    pub position: Vec2,
    /// World-space velocity.
    pub velocity: Vec2,
    /// Current health in raw game units.
    pub health: f32,
}

/// One teammate slot.
///
/// `active` is the explicit presence bit: a teammate at the origin with
/// zero health is a legal, present value and must not be confused with
/// an empty slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TeammateState {
    /// Whether this slot holds a live, present teammate.
    pub active: bool,
    /// World-space position.
    pub position: Vec2,
    /// World-space velocity.
    pub velocity: Vec2,
    /// Current health in raw game units.
    pub health: f32,
    /// Downed / incapacitated flag.
    pub incapacitated: bool,
    /// Cumulative damage dealt this episode (feeds the team aggregate).
    pub damage_dealt: f32,
    /// Cumulative damage taken this episode (feeds the team aggregate).
    pub damage_taken: f32,
}

/// The agent's primary target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TargetState {
    /// World-space position.
    pub position: Vec2,
    /// Current health in raw game units.
    pub health: f32,
}

/// A nearby hostile entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HostileState {
    /// World-space position.
    pub position: Vec2,
    /// Hostile category index (`0..hostile_type_count`).
    pub kind: u8,
    /// Current health in raw game units.
    pub health: f32,
}

/// A nearby pickup item.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PickupState {
    /// World-space position.
    pub position: Vec2,
    /// Pickup category index (`0..pickup_type_count`).
    pub kind: u8,
}

/// Time-related observation inputs. All durations are in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TemporalState {
    /// Seconds since the episode started.
    pub episode_time_s: f32,
    /// Seconds since this agent last took damage.
    pub since_damage_taken_s: f32,
    /// Seconds since this agent last dealt damage.
    pub since_damage_dealt_s: f32,
    /// Current wave / stage index.
    pub wave: u32,
    /// Fraction of the ability cooldown still remaining, `0.0` = ready.
    pub ability_cooldown: f32,
}

/// Everything one agent observes during one decision cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldStateSnapshot {
    /// Group-membership id, `0..=MAX_AGENT_ID`.
    pub agent_id: u8,
    /// The observing agent.
    pub owner: SelfState,
    /// Up to [`MAX_TEAMMATES`] teammates.
    pub teammates: SmallVec<[TeammateState; MAX_TEAMMATES]>,
    /// The primary target, if any. Absent targets encode as zeros.
    pub target: Option<TargetState>,
    /// Up to [`MAX_HOSTILES`] nearby hostiles.
    pub hostiles: SmallVec<[HostileState; MAX_HOSTILES]>,
    /// Up to [`MAX_PICKUPS`] nearby pickups.
    pub pickups: SmallVec<[PickupState; MAX_PICKUPS]>,
    /// Time-related inputs.
    pub temporal: TemporalState,
}

impl WorldStateSnapshot {
    /// Reset to the empty snapshot, keeping the inline storage.
    ///
    /// Used by pooled snapshot buffers that are refilled every cycle.
    pub fn clear(&mut self) {
        self.agent_id = 0;
        self.owner = SelfState::default();
        self.teammates.clear();
        self.target = None;
        self.hostiles.clear();
        self.pickups.clear();
        self.temporal = TemporalState::default();
    }

    /// Teammate entries that fall inside the fixed slot capacity.
    pub fn teammate_slots(&self) -> &[TeammateState] {
        &self.teammates[..self.teammates.len().min(MAX_TEAMMATES)]
    }

    /// Hostile entries that fall inside the fixed slot capacity.
    pub fn hostile_slots(&self) -> &[HostileState] {
        &self.hostiles[..self.hostiles.len().min(MAX_HOSTILES)]
    }

    /// Pickup entries that fall inside the fixed slot capacity.
    pub fn pickup_slots(&self) -> &[PickupState] {
        &self.pickups[..self.pickups.len().min(MAX_PICKUPS)]
    }

    /// Number of teammate slots whose `active` bit is set.
    pub fn active_teammate_count(&self) -> usize {
        self.teammate_slots().iter().filter(|t| t.active).count()
    }
}
