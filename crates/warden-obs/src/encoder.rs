//! Two-phase observation encoder: flatten, then normalize.
//!
//! [`ObservationEncoder::flatten`] copies every snapshot field into a
//! [`RawVector`] at its fixed offset (see [`layout`](crate::layout)) and
//! computes the team aggregates from active teammates only.
//! [`ObservationEncoder::normalize`] maps each raw element through its
//! [`Norm`] rule and then forces every absent slot to exact zero.
//!
//! The encoder holds only configuration constants. Encoding is a pure
//! function of the snapshot: no randomness, no interior state, and the
//! same snapshot always produces a bit-identical vector.

use warden_core::{WorldStateSnapshot, MAX_AGENT_ID, MAX_HOSTILES, MAX_PICKUPS, MAX_TEAMMATES};

use crate::config::{EncoderConfig, EncoderConfigError};
use crate::layout::{
    hostile_offset, pickup_offset, teammate_offset, Norm, ObsBlock, AGENT_ID_OFFSET,
    AGG_ACTIVE_COUNT, AGG_CENTROID_X, AGG_CENTROID_Y, AGG_DAMAGE_RATIO, AGG_MEAN_TARGET_DIST,
    NORM_TABLE, OBS_SIZE, SELF_OFFSET, TARGET_OFFSET,
    TEAMMATE_MASK_OFFSET, TEAMMATE_STRIDE, TEAM_AGG_OFFSET, TEMPORAL_OFFSET, TM_HEALTH,
    TM_INCAPACITATED, TM_POS_X, TM_POS_Y, TM_VEL_X, TM_VEL_Y,
};
use crate::vector::{EncodedVector, MaskInfo, RawVector};

/// Converts world-state snapshots into fixed-length normalized vectors.
#[derive(Clone, Debug)]
pub struct ObservationEncoder {
    config: EncoderConfig,
    hostile_kind_div: f32,
    pickup_kind_div: f32,
}

impl ObservationEncoder {
    /// Length of every encoded vector.
    pub const SIZE: usize = OBS_SIZE;

    /// Create an encoder, validating the normalization constants.
    pub fn new(config: EncoderConfig) -> Result<Self, EncoderConfigError> {
        config.validate()?;
        Ok(Self {
            hostile_kind_div: f32::from(config.hostile_type_count.saturating_sub(1).max(1)),
            pickup_kind_div: f32::from(config.pickup_type_count.saturating_sub(1).max(1)),
            config,
        })
    }

    /// The normalization constants in use.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Length of every encoded vector (always [`OBS_SIZE`]).
    pub const fn size(&self) -> usize {
        OBS_SIZE
    }

    /// Encode a snapshot into a fresh vector.
    pub fn encode(&self, snapshot: &WorldStateSnapshot) -> EncodedVector {
        let mut out = EncodedVector::zeroed();
        self.encode_into(snapshot, &mut out);
        out
    }

    /// Encode a snapshot into a caller-provided vector (no allocation).
    pub fn encode_into(&self, snapshot: &WorldStateSnapshot, out: &mut EncodedVector) {
        let mut raw = RawVector::zeroed();
        let mask = self.flatten(snapshot, &mut raw);
        self.normalize_into(&raw, &mask, out);
    }

    /// Phase one: copy snapshot fields into `raw` at their fixed offsets.
    ///
    /// `raw` is cleared first. Entries past a group's fixed capacity are
    /// ignored; missing entries leave their slot at zero and unmarked in
    /// the returned mask. An absent target leaves the target block and
    /// the distance-to-target aggregate at zero.
    pub fn flatten(&self, snapshot: &WorldStateSnapshot, raw: &mut RawVector) -> MaskInfo {
        raw.clear();
        let r = raw.as_mut_slice();
        let mut mask = MaskInfo::default();

        let owner = &snapshot.owner;
        r[SELF_OFFSET] = owner.position.x;
        r[SELF_OFFSET + 1] = owner.position.y;
        r[SELF_OFFSET + 2] = owner.velocity.x;
        r[SELF_OFFSET + 3] = owner.velocity.y;
        r[SELF_OFFSET + 4] = owner.health;
        r[AGENT_ID_OFFSET] = f32::from(snapshot.agent_id.min(MAX_AGENT_ID));

        let target = snapshot.target;
        mask.target_present = target.is_some();

        let mut active = 0u32;
        let mut dist_sum = 0.0f32;
        let (mut cx, mut cy) = (0.0f32, 0.0f32);
        let (mut dealt, mut taken) = (0.0f32, 0.0f32);

        for (slot, tm) in snapshot.teammate_slots().iter().enumerate() {
            if !tm.active {
                continue;
            }
            mask.teammate_active[slot] = true;
            let o = teammate_offset(slot);
            r[o + TM_POS_X] = tm.position.x;
            r[o + TM_POS_Y] = tm.position.y;
            r[o + TM_VEL_X] = tm.velocity.x;
            r[o + TM_VEL_Y] = tm.velocity.y;
            r[o + TM_HEALTH] = tm.health;
            r[o + TM_INCAPACITATED] = if tm.incapacitated { 1.0 } else { 0.0 };
            r[TEAMMATE_MASK_OFFSET + slot] = 1.0;

            active += 1;
            cx += tm.position.x;
            cy += tm.position.y;
            dealt += tm.damage_dealt;
            taken += tm.damage_taken;
            if let Some(t) = target {
                dist_sum += tm.position.distance(t.position);
            }
        }

        if active > 0 {
            let n = active as f32;
            r[TEAM_AGG_OFFSET + AGG_ACTIVE_COUNT] = n;
            if target.is_some() {
                r[TEAM_AGG_OFFSET + AGG_MEAN_TARGET_DIST] = dist_sum / n;
            }
            r[TEAM_AGG_OFFSET + AGG_CENTROID_X] = cx / n;
            r[TEAM_AGG_OFFSET + AGG_CENTROID_Y] = cy / n;
            // Nothing taken yet means no meaningful ratio.
            r[TEAM_AGG_OFFSET + AGG_DAMAGE_RATIO] = if taken > 0.0 { dealt / taken } else { 0.0 };
        }

        if let Some(t) = target {
            r[TARGET_OFFSET] = t.position.x;
            r[TARGET_OFFSET + 1] = t.position.y;
            r[TARGET_OFFSET + 2] = t.health;
        }

        let hostiles = snapshot.hostile_slots();
        for (slot, h) in hostiles.iter().enumerate() {
            let o = hostile_offset(slot);
            r[o] = h.position.x;
            r[o + 1] = h.position.y;
            r[o + 2] = f32::from(h.kind);
            r[o + 3] = h.health;
        }
        mask.hostile_count = hostiles.len() as u8;

        let pickups = snapshot.pickup_slots();
        for (slot, p) in pickups.iter().enumerate() {
            let o = pickup_offset(slot);
            r[o] = p.position.x;
            r[o + 1] = p.position.y;
            r[o + 2] = f32::from(p.kind);
        }
        mask.pickup_count = pickups.len() as u8;

        let temporal = &snapshot.temporal;
        r[TEMPORAL_OFFSET] = temporal.episode_time_s;
        r[TEMPORAL_OFFSET + 1] = temporal.since_damage_taken_s;
        r[TEMPORAL_OFFSET + 2] = temporal.since_damage_dealt_s;
        r[TEMPORAL_OFFSET + 3] = temporal.wave as f32;
        r[TEMPORAL_OFFSET + 4] = temporal.ability_cooldown;

        mask
    }

    /// Phase two: normalize `raw` into a fresh vector, honouring `mask`.
    pub fn normalize(&self, raw: &RawVector, mask: &MaskInfo) -> EncodedVector {
        let mut out = EncodedVector::zeroed();
        self.normalize_into(raw, mask, &mut out);
        out
    }

    /// Phase two into a caller-provided vector.
    ///
    /// Every element is mapped through its [`Norm`] rule; non-finite raw
    /// values become 0. Then every slot the mask marks absent is forced
    /// to exactly 0 regardless of what `raw` contained, the teammate mask
    /// block is rewritten from `mask`, and the team aggregates are zeroed
    /// when no teammate is active.
    pub fn normalize_into(&self, raw: &RawVector, mask: &MaskInfo, out: &mut EncodedVector) {
        let o = out.as_mut_array();
        for ((dst, &src), &norm) in o.iter_mut().zip(raw.iter()).zip(NORM_TABLE.iter()) {
            *dst = self.apply(norm, src);
        }

        for slot in 0..MAX_TEAMMATES {
            if mask.teammate_active[slot] {
                o[TEAMMATE_MASK_OFFSET + slot] = 1.0;
            } else {
                let start = teammate_offset(slot);
                o[start..start + TEAMMATE_STRIDE].fill(0.0);
                o[TEAMMATE_MASK_OFFSET + slot] = 0.0;
            }
        }

        if mask.active_teammates() == 0 {
            o[ObsBlock::TeamAggregate.range()].fill(0.0);
        }

        if !mask.target_present {
            o[ObsBlock::Target.range()].fill(0.0);
            o[TEAM_AGG_OFFSET + AGG_MEAN_TARGET_DIST] = 0.0;
        }

        let hostiles = usize::from(mask.hostile_count).min(MAX_HOSTILES);
        o[hostile_offset(hostiles)..hostile_offset(MAX_HOSTILES)].fill(0.0);

        let pickups = usize::from(mask.pickup_count).min(MAX_PICKUPS);
        o[pickup_offset(pickups)..pickup_offset(MAX_PICKUPS)].fill(0.0);
    }

    fn apply(&self, norm: Norm, v: f32) -> f32 {
        if !v.is_finite() {
            return 0.0;
        }
        let c = &self.config;
        match norm {
            Norm::Position => signed_unit(v / c.world_extent),
            Norm::Velocity => signed_unit(v / c.max_speed),
            Norm::Health => unit(v / c.max_health),
            Norm::AgentId => unit(v / f32::from(MAX_AGENT_ID)),
            Norm::Unit => unit(v),
            Norm::TeamCount => unit(v / MAX_TEAMMATES as f32),
            Norm::TeamDistance => unit(v / (2.0 * c.world_extent)),
            Norm::DamageRatio => unit(v.min(c.damage_ratio_cap) / c.damage_ratio_cap),
            Norm::HostileKind => unit(v / self.hostile_kind_div),
            Norm::PickupKind => unit(v / self.pickup_kind_div),
            Norm::EpisodeTime => unit(v / c.max_episode_s),
            Norm::EventWindow => unit(v / c.event_window_s),
            Norm::Wave => unit(v / c.max_wave as f32),
        }
    }
}

fn signed_unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else if v > 0.0 {
        1.0
    } else {
        -1.0
    }
}

fn unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else if v > 0.0 {
        1.0
    } else {
        0.0
    }
}
