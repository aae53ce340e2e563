//! Fixed offsets of every block in the encoded observation vector.
//!
//! ```text
//! [0..5)    self: pos x, pos y, vel x, vel y, health
//! [5]       agent id
//! [6..24)   teammates 3 × (pos x, pos y, vel x, vel y, health, incapacitated)
//! [24..27)  teammate active mask
//! [27..32)  team aggregate: active count, mean distance to target,
//!           centroid x, centroid y, damage dealt/taken ratio
//! [32..35)  target: pos x, pos y, health
//! [35..55)  hostiles 5 × (pos x, pos y, kind, health)
//! [55..85)  pickups 10 × (pos x, pos y, kind)
//! [85..90)  temporal: episode time, since damage taken, since damage
//!           dealt, wave, ability cooldown
//! ```
//!
//! The team position carried in the aggregate block is the centroid of
//! the active teammates' positions, not the target's position, which
//! already has its own block. Every aggregate element is 0 when no
//! teammate is active.
//!
//! Every offset is a `const`, and [`NORM_TABLE`] assigns each element
//! its normalization rule at compile time.

use std::ops::Range;

use warden_core::{MAX_HOSTILES, MAX_PICKUPS, MAX_TEAMMATES};

/// Elements in the self block.
pub const SELF_LEN: usize = 5;
/// Offset of the self block.
pub const SELF_OFFSET: usize = 0;

/// Offset of the agent-id element.
pub const AGENT_ID_OFFSET: usize = SELF_OFFSET + SELF_LEN;

/// Elements per teammate slot.
pub const TEAMMATE_STRIDE: usize = 6;
/// Offset of the teammates block.
pub const TEAMMATE_OFFSET: usize = AGENT_ID_OFFSET + 1;
/// Elements in the teammates block.
pub const TEAMMATE_LEN: usize = TEAMMATE_STRIDE * MAX_TEAMMATES;

/// Offset of the teammate active-mask block (one element per slot).
pub const TEAMMATE_MASK_OFFSET: usize = TEAMMATE_OFFSET + TEAMMATE_LEN;

/// Elements in the team-aggregate block. The position pair is the
/// active-teammate centroid.
pub const TEAM_AGG_LEN: usize = 5;
/// Offset of the team-aggregate block.
pub const TEAM_AGG_OFFSET: usize = TEAMMATE_MASK_OFFSET + MAX_TEAMMATES;

/// Elements in the target block.
pub const TARGET_LEN: usize = 3;
/// Offset of the target block.
pub const TARGET_OFFSET: usize = TEAM_AGG_OFFSET + TEAM_AGG_LEN;

/// Elements per hostile slot.
pub const HOSTILE_STRIDE: usize = 4;
/// Offset of the hostiles block.
pub const HOSTILE_OFFSET: usize = TARGET_OFFSET + TARGET_LEN;

/// Elements per pickup slot.
pub const PICKUP_STRIDE: usize = 3;
/// Offset of the pickups block.
pub const PICKUP_OFFSET: usize = HOSTILE_OFFSET + HOSTILE_STRIDE * MAX_HOSTILES;

/// Elements in the temporal block.
pub const TEMPORAL_LEN: usize = 5;
/// Offset of the temporal block.
pub const TEMPORAL_OFFSET: usize = PICKUP_OFFSET + PICKUP_STRIDE * MAX_PICKUPS;

/// Total length of an encoded observation.
pub const OBS_SIZE: usize = TEMPORAL_OFFSET + TEMPORAL_LEN;

const _: () = assert!(OBS_SIZE == 90);

// Sub-field indices inside a teammate slot.
pub(crate) const TM_POS_X: usize = 0;
pub(crate) const TM_POS_Y: usize = 1;
pub(crate) const TM_VEL_X: usize = 2;
pub(crate) const TM_VEL_Y: usize = 3;
pub(crate) const TM_HEALTH: usize = 4;
pub(crate) const TM_INCAPACITATED: usize = 5;

// Team-aggregate element indices (relative to TEAM_AGG_OFFSET).
pub(crate) const AGG_ACTIVE_COUNT: usize = 0;
pub(crate) const AGG_MEAN_TARGET_DIST: usize = 1;
pub(crate) const AGG_CENTROID_X: usize = 2;
pub(crate) const AGG_CENTROID_Y: usize = 3;
pub(crate) const AGG_DAMAGE_RATIO: usize = 4;

/// Offset of teammate slot `slot`.
pub const fn teammate_offset(slot: usize) -> usize {
    TEAMMATE_OFFSET + slot * TEAMMATE_STRIDE
}

/// Offset of hostile slot `slot`.
pub const fn hostile_offset(slot: usize) -> usize {
    HOSTILE_OFFSET + slot * HOSTILE_STRIDE
}

/// Offset of pickup slot `slot`.
pub const fn pickup_offset(slot: usize) -> usize {
    PICKUP_OFFSET + slot * PICKUP_STRIDE
}

/// Named blocks of the encoded vector, in layout order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObsBlock {
    /// Observing agent's own state.
    SelfState,
    /// Group-membership id.
    AgentId,
    /// Per-slot teammate state.
    Teammates,
    /// Per-slot teammate presence bits.
    TeammateMask,
    /// Aggregates over active teammates.
    TeamAggregate,
    /// Primary target.
    Target,
    /// Nearby hostiles.
    Hostiles,
    /// Nearby pickups.
    Pickups,
    /// Time-related inputs.
    Temporal,
}

impl ObsBlock {
    /// Every block, in layout order.
    pub const ALL: [ObsBlock; 9] = [
        ObsBlock::SelfState,
        ObsBlock::AgentId,
        ObsBlock::Teammates,
        ObsBlock::TeammateMask,
        ObsBlock::TeamAggregate,
        ObsBlock::Target,
        ObsBlock::Hostiles,
        ObsBlock::Pickups,
        ObsBlock::Temporal,
    ];

    /// Element range covered by this block.
    pub const fn range(self) -> Range<usize> {
        match self {
            ObsBlock::SelfState => SELF_OFFSET..SELF_OFFSET + SELF_LEN,
            ObsBlock::AgentId => AGENT_ID_OFFSET..AGENT_ID_OFFSET + 1,
            ObsBlock::Teammates => TEAMMATE_OFFSET..TEAMMATE_OFFSET + TEAMMATE_LEN,
            ObsBlock::TeammateMask => {
                TEAMMATE_MASK_OFFSET..TEAMMATE_MASK_OFFSET + MAX_TEAMMATES
            }
            ObsBlock::TeamAggregate => TEAM_AGG_OFFSET..TEAM_AGG_OFFSET + TEAM_AGG_LEN,
            ObsBlock::Target => TARGET_OFFSET..TARGET_OFFSET + TARGET_LEN,
            ObsBlock::Hostiles => HOSTILE_OFFSET..PICKUP_OFFSET,
            ObsBlock::Pickups => PICKUP_OFFSET..TEMPORAL_OFFSET,
            ObsBlock::Temporal => TEMPORAL_OFFSET..OBS_SIZE,
        }
    }
}

/// Normalization rule for one element of the encoded vector.
///
/// Divisors come from [`EncoderConfig`](crate::EncoderConfig) at
/// normalize time; the rule only says which divisor and which range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Norm {
    /// `/ world_extent`, clamped to `[-1, 1]`.
    Position,
    /// `/ max_speed`, clamped to `[-1, 1]`.
    Velocity,
    /// `/ max_health`, clamped to `[0, 1]`.
    Health,
    /// `/ MAX_AGENT_ID`, clamped to `[0, 1]`.
    AgentId,
    /// Already a 0/1 flag or fraction, clamped to `[0, 1]`.
    Unit,
    /// `/ MAX_TEAMMATES`, clamped to `[0, 1]`.
    TeamCount,
    /// `/ (2 * world_extent)`, clamped to `[0, 1]`.
    TeamDistance,
    /// Capped at `damage_ratio_cap`, then `/ damage_ratio_cap`.
    DamageRatio,
    /// `/ (hostile_type_count - 1)`, clamped to `[0, 1]`.
    HostileKind,
    /// `/ (pickup_type_count - 1)`, clamped to `[0, 1]`.
    PickupKind,
    /// `/ max_episode_s`, clamped to `[0, 1]`.
    EpisodeTime,
    /// `/ event_window_s`, clamped to `[0, 1]`.
    EventWindow,
    /// `/ max_wave`, clamped to `[0, 1]`.
    Wave,
}

/// Normalization rule per element, in layout order.
pub const NORM_TABLE: [Norm; OBS_SIZE] = build_norm_table();

const fn build_norm_table() -> [Norm; OBS_SIZE] {
    let mut t = [Norm::Unit; OBS_SIZE];

    t[SELF_OFFSET] = Norm::Position;
    t[SELF_OFFSET + 1] = Norm::Position;
    t[SELF_OFFSET + 2] = Norm::Velocity;
    t[SELF_OFFSET + 3] = Norm::Velocity;
    t[SELF_OFFSET + 4] = Norm::Health;

    t[AGENT_ID_OFFSET] = Norm::AgentId;

    let mut slot = 0;
    while slot < MAX_TEAMMATES {
        let o = teammate_offset(slot);
        t[o + TM_POS_X] = Norm::Position;
        t[o + TM_POS_Y] = Norm::Position;
        t[o + TM_VEL_X] = Norm::Velocity;
        t[o + TM_VEL_Y] = Norm::Velocity;
        t[o + TM_HEALTH] = Norm::Health;
        t[o + TM_INCAPACITATED] = Norm::Unit;
        t[TEAMMATE_MASK_OFFSET + slot] = Norm::Unit;
        slot += 1;
    }

    t[TEAM_AGG_OFFSET + AGG_ACTIVE_COUNT] = Norm::TeamCount;
    t[TEAM_AGG_OFFSET + AGG_MEAN_TARGET_DIST] = Norm::TeamDistance;
    t[TEAM_AGG_OFFSET + AGG_CENTROID_X] = Norm::Position;
    t[TEAM_AGG_OFFSET + AGG_CENTROID_Y] = Norm::Position;
    t[TEAM_AGG_OFFSET + AGG_DAMAGE_RATIO] = Norm::DamageRatio;

    t[TARGET_OFFSET] = Norm::Position;
    t[TARGET_OFFSET + 1] = Norm::Position;
    t[TARGET_OFFSET + 2] = Norm::Health;

    let mut slot = 0;
    while slot < MAX_HOSTILES {
        let o = hostile_offset(slot);
        t[o] = Norm::Position;
        t[o + 1] = Norm::Position;
        t[o + 2] = Norm::HostileKind;
        t[o + 3] = Norm::Health;
        slot += 1;
    }

    let mut slot = 0;
    while slot < MAX_PICKUPS {
        let o = pickup_offset(slot);
        t[o] = Norm::Position;
        t[o + 1] = Norm::Position;
        t[o + 2] = Norm::PickupKind;
        slot += 1;
    }

    t[TEMPORAL_OFFSET] = Norm::EpisodeTime;
    t[TEMPORAL_OFFSET + 1] = Norm::EventWindow;
    t[TEMPORAL_OFFSET + 2] = Norm::EventWindow;
    t[TEMPORAL_OFFSET + 3] = Norm::Wave;
    t[TEMPORAL_OFFSET + 4] = Norm::Unit;

    t
}

impl Norm {
    /// Whether this rule produces values in `[-1, 1]` (otherwise `[0, 1]`).
    pub const fn is_signed(self) -> bool {
        matches!(self, Norm::Position | Norm::Velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_contiguous_and_cover_the_vector() {
        let mut cursor = 0;
        for block in ObsBlock::ALL {
            let r = block.range();
            assert_eq!(r.start, cursor, "{block:?} does not start where the previous block ended");
            assert!(r.end > r.start, "{block:?} is empty");
            cursor = r.end;
        }
        assert_eq!(cursor, OBS_SIZE);
    }

    #[test]
    fn teammate_slots_stay_inside_their_block() {
        let r = ObsBlock::Teammates.range();
        assert_eq!(teammate_offset(0), r.start);
        assert_eq!(teammate_offset(MAX_TEAMMATES - 1) + TEAMMATE_STRIDE, r.end);
    }

    #[test]
    fn norm_table_matches_block_semantics() {
        assert_eq!(NORM_TABLE[AGENT_ID_OFFSET], Norm::AgentId);
        assert_eq!(NORM_TABLE[teammate_offset(1) + TM_HEALTH], Norm::Health);
        assert_eq!(NORM_TABLE[hostile_offset(4) + 2], Norm::HostileKind);
        assert_eq!(NORM_TABLE[pickup_offset(9) + 2], Norm::PickupKind);
        assert_eq!(NORM_TABLE[OBS_SIZE - 1], Norm::Unit);
        for i in ObsBlock::TeammateMask.range() {
            assert_eq!(NORM_TABLE[i], Norm::Unit);
        }
    }
}
