//! Property tests for the observation encoder: fixed length, value
//! ranges, masking of absent slots, and bit-exact determinism.

use proptest::prelude::*;

use warden_core::{
    HostileState, PickupState, SelfState, TargetState, TeammateState, TemporalState, Vec2,
    WorldStateSnapshot, MAX_HOSTILES, MAX_PICKUPS, MAX_TEAMMATES,
};
use warden_obs::layout::{
    hostile_offset, pickup_offset, teammate_offset, NORM_TABLE, TEAMMATE_MASK_OFFSET,
    TEAMMATE_STRIDE,
};
use warden_obs::{EncoderConfig, ObsBlock, ObsPool, ObservationEncoder, OBS_SIZE};
use warden_test_utils::fixtures::{random_snapshot, snapshot_with_teammates};

fn encoder() -> ObservationEncoder {
    ObservationEncoder::new(EncoderConfig::default()).unwrap()
}

fn arb_vec2() -> impl Strategy<Value = Vec2> {
    (-200.0f32..200.0, -200.0f32..200.0).prop_map(|(x, y)| Vec2::new(x, y))
}

fn arb_teammate() -> impl Strategy<Value = TeammateState> {
    (
        any::<bool>(),
        arb_vec2(),
        arb_vec2(),
        -10.0f32..400.0,
        any::<bool>(),
        0.0f32..500.0,
        0.0f32..500.0,
    )
        .prop_map(
            |(active, position, velocity, health, incapacitated, damage_dealt, damage_taken)| {
                TeammateState {
                    active,
                    position,
                    velocity,
                    health,
                    incapacitated,
                    damage_dealt,
                    damage_taken,
                }
            },
        )
}

fn arb_hostile() -> impl Strategy<Value = HostileState> {
    (arb_vec2(), any::<u8>(), -10.0f32..400.0).prop_map(|(position, kind, health)| {
        HostileState {
            position,
            kind,
            health,
        }
    })
}

fn arb_pickup() -> impl Strategy<Value = PickupState> {
    (arb_vec2(), any::<u8>()).prop_map(|(position, kind)| PickupState { position, kind })
}

fn arb_temporal() -> impl Strategy<Value = TemporalState> {
    (
        0.0f32..1200.0,
        0.0f32..30.0,
        0.0f32..30.0,
        0u32..40,
        -0.5f32..1.5,
    )
        .prop_map(|(episode_time_s, taken, dealt, wave, ability_cooldown)| TemporalState {
            episode_time_s,
            since_damage_taken_s: taken,
            since_damage_dealt_s: dealt,
            wave,
            ability_cooldown,
        })
}

fn arb_snapshot() -> impl Strategy<Value = WorldStateSnapshot> {
    (
        0u8..8,
        (arb_vec2(), arb_vec2(), -10.0f32..400.0),
        prop::collection::vec(arb_teammate(), 0..5),
        prop::option::of((arb_vec2(), 0.0f32..400.0)),
        prop::collection::vec(arb_hostile(), 0..8),
        prop::collection::vec(arb_pickup(), 0..14),
        arb_temporal(),
    )
        .prop_map(
            |(agent_id, (pos, vel, health), teammates, target, hostiles, pickups, temporal)| {
                WorldStateSnapshot {
                    agent_id,
                    owner: SelfState {
                        position: pos,
                        velocity: vel,
                        health,
                    },
                    teammates: teammates.into_iter().collect(),
                    target: target.map(|(position, health)| TargetState { position, health }),
                    hostiles: hostiles.into_iter().collect(),
                    pickups: pickups.into_iter().collect(),
                    temporal,
                }
            },
        )
}

proptest! {
    #[test]
    fn every_element_is_finite_and_in_range(snap in arb_snapshot()) {
        let v = encoder().encode(&snap);
        prop_assert_eq!(v.len(), OBS_SIZE);
        for (i, (&x, norm)) in v.iter().zip(NORM_TABLE.iter()).enumerate() {
            prop_assert!(x.is_finite(), "element {} is {}", i, x);
            let lo = if norm.is_signed() { -1.0 } else { 0.0 };
            prop_assert!((lo..=1.0).contains(&x), "element {} = {} outside [{}, 1]", i, x, lo);
        }
    }

    #[test]
    fn inactive_teammate_slots_are_exactly_zero(snap in arb_snapshot()) {
        let v = encoder().encode(&snap);
        let slots = snap.teammate_slots();
        for slot in 0..MAX_TEAMMATES {
            let active = slots.get(slot).is_some_and(|t| t.active);
            let mask_bit = v[TEAMMATE_MASK_OFFSET + slot];
            prop_assert_eq!(mask_bit, if active { 1.0 } else { 0.0 });
            if !active {
                let o = teammate_offset(slot);
                prop_assert!(v[o..o + TEAMMATE_STRIDE].iter().all(|&x| x.to_bits() == 0));
            }
        }
        if snap.active_teammate_count() == 0 {
            prop_assert!(v[ObsBlock::TeamAggregate.range()].iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn absent_hostiles_and_pickups_are_zero(snap in arb_snapshot()) {
        let v = encoder().encode(&snap);
        let h = snap.hostile_slots().len();
        prop_assert!(v[hostile_offset(h)..hostile_offset(MAX_HOSTILES)].iter().all(|&x| x == 0.0));
        let p = snap.pickup_slots().len();
        prop_assert!(v[pickup_offset(p)..pickup_offset(MAX_PICKUPS)].iter().all(|&x| x == 0.0));
        if snap.target.is_none() {
            prop_assert!(v[ObsBlock::Target.range()].iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn encoding_is_bit_deterministic(snap in arb_snapshot()) {
        let enc = encoder();
        let a = enc.encode(&snap);
        let b = enc.encode(&snap.clone());
        prop_assert!(a.bit_eq(&b));
    }

    #[test]
    fn pooled_encoding_matches_direct(snap in arb_snapshot()) {
        let enc = encoder();
        let mut pool = ObsPool::new(1);
        let slot = pool.acquire().unwrap();
        *pool.prepare(slot).unwrap() = snap.clone();
        let pooled = *pool.encode_slot(&enc, slot).unwrap();
        prop_assert!(pooled.bit_eq(&enc.encode(&snap)));
    }
}

#[test]
fn teammate_count_only_changes_active_slots() {
    let enc = encoder();
    for k in 0..=MAX_TEAMMATES {
        let v = enc.encode(&snapshot_with_teammates(k));
        assert_eq!(v.len(), OBS_SIZE);
        for slot in 0..MAX_TEAMMATES {
            let expected = if slot < k { 1.0 } else { 0.0 };
            assert_eq!(v[TEAMMATE_MASK_OFFSET + slot], expected, "k = {k}, slot = {slot}");
        }
    }
}

#[test]
fn seeded_random_snapshots_encode_identically() {
    let enc = encoder();
    for seed in 0..32 {
        let a = enc.encode(&random_snapshot(seed));
        let b = enc.encode(&random_snapshot(seed));
        assert!(a.bit_eq(&b), "seed {seed} diverged");
    }
}
