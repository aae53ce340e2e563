//! Reusable world-state snapshots.
//!
//! - [`snapshot_with_teammates`]: a fixed scene with `k` active teammates.
//! - [`random_snapshot`]: a seeded random scene, reproducible per seed.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use warden_core::{
    HostileState, PickupState, SelfState, TargetState, TeammateState, TemporalState, Vec2,
    WorldStateSnapshot, MAX_AGENT_ID, MAX_HOSTILES, MAX_PICKUPS, MAX_TEAMMATES,
};

/// A fixed scene with `k` active teammates (capped at [`MAX_TEAMMATES`]),
/// a target at the origin, one hostile, and one pickup.
pub fn snapshot_with_teammates(k: usize) -> WorldStateSnapshot {
    let mut s = WorldStateSnapshot {
        agent_id: 1,
        owner: SelfState {
            position: Vec2::new(-10.0, 5.0),
            velocity: Vec2::new(1.0, 0.0),
            health: 150.0,
        },
        target: Some(TargetState {
            position: Vec2::ZERO,
            health: 120.0,
        }),
        temporal: TemporalState {
            episode_time_s: 42.0,
            since_damage_taken_s: 3.0,
            since_damage_dealt_s: 1.0,
            wave: 2,
            ability_cooldown: 0.5,
        },
        ..WorldStateSnapshot::default()
    };
    for i in 0..k.min(MAX_TEAMMATES) {
        let f = i as f32 + 1.0;
        s.teammates.push(TeammateState {
            active: true,
            position: Vec2::new(3.0 * f, 4.0 * f),
            velocity: Vec2::new(0.5, -0.5),
            health: 100.0,
            incapacitated: false,
            damage_dealt: 10.0 * f,
            damage_taken: 5.0,
        });
    }
    s.hostiles.push(HostileState {
        position: Vec2::new(12.0, -8.0),
        kind: 2,
        health: 80.0,
    });
    s.pickups.push(PickupState {
        position: Vec2::new(-4.0, -4.0),
        kind: 1,
    });
    s
}

fn vec2(rng: &mut ChaCha8Rng, extent: f32) -> Vec2 {
    Vec2::new(
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
    )
}

/// A random scene drawn from a ChaCha8 stream seeded with `seed`.
///
/// Values deliberately overshoot the default encoder ranges so the
/// clamping paths get exercised.
pub fn random_snapshot(seed: u64) -> WorldStateSnapshot {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut s = WorldStateSnapshot {
        agent_id: rng.random_range(0..=MAX_AGENT_ID),
        owner: SelfState {
            position: vec2(&mut rng, 60.0),
            velocity: vec2(&mut rng, 12.0),
            health: rng.random_range(0.0..220.0),
        },
        ..WorldStateSnapshot::default()
    };

    for _ in 0..rng.random_range(0..=MAX_TEAMMATES) {
        s.teammates.push(TeammateState {
            active: rng.random_bool(0.8),
            position: vec2(&mut rng, 60.0),
            velocity: vec2(&mut rng, 12.0),
            health: rng.random_range(0.0..220.0),
            incapacitated: rng.random_bool(0.1),
            damage_dealt: rng.random_range(0.0..300.0),
            damage_taken: rng.random_range(0.0..300.0),
        });
    }

    if rng.random_bool(0.7) {
        s.target = Some(TargetState {
            position: vec2(&mut rng, 60.0),
            health: rng.random_range(0.0..220.0),
        });
    }

    for _ in 0..rng.random_range(0..=MAX_HOSTILES) {
        s.hostiles.push(HostileState {
            position: vec2(&mut rng, 60.0),
            kind: rng.random_range(0..8),
            health: rng.random_range(0.0..220.0),
        });
    }

    for _ in 0..rng.random_range(0..=MAX_PICKUPS) {
        s.pickups.push(PickupState {
            position: vec2(&mut rng, 60.0),
            kind: rng.random_range(0..4),
        });
    }

    s.temporal = TemporalState {
        episode_time_s: rng.random_range(0.0..700.0),
        since_damage_taken_s: rng.random_range(0.0..15.0),
        since_damage_dealt_s: rng.random_range(0.0..15.0),
        wave: rng.random_range(0..25),
        ability_cooldown: rng.random(),
    };
    s
}
