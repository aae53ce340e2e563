//! Observation encoding for Warden agents.
//!
//! Turns a [`WorldStateSnapshot`](warden_core::WorldStateSnapshot) into a
//! fixed-length [`EncodedVector`] whose layout never changes with the
//! number of teammates, hostiles, or pickups present. Absent slots are
//! exact zeros and teammate presence is carried by an explicit mask
//! block, so a real teammate standing at the origin with zero health is
//! never confused with an empty slot.
//!
//! # Pipeline
//!
//! 1. [`ObservationEncoder::flatten`]: snapshot to [`RawVector`] plus
//!    [`MaskInfo`], in raw world units.
//! 2. [`ObservationEncoder::normalize`]: per-element rule from
//!    [`layout::NORM_TABLE`], clamping, then masking of absent slots.
//!
//! [`ObsPool`] keeps per-agent buffers for both phases so a decision
//! cycle encodes without allocating.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod encoder;
pub mod layout;
pub mod pool;
pub mod vector;

pub use config::{EncoderConfig, EncoderConfigError};
pub use encoder::ObservationEncoder;
pub use layout::{ObsBlock, OBS_SIZE};
pub use pool::{ObsPool, SlotIndex};
pub use vector::{EncodedVector, MaskInfo, RawVector};
