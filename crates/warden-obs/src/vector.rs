//! Fixed-length observation buffers and the presence mask.

use std::ops::Deref;

use warden_core::MAX_TEAMMATES;

use crate::layout::OBS_SIZE;

/// A normalized observation, ready for the inference backend.
///
/// Always exactly [`OBS_SIZE`] elements. Produced only by
/// [`ObservationEncoder`](crate::ObservationEncoder), so every element is
/// finite and inside its block's documented range, and absent slots are
/// exactly zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodedVector([f32; OBS_SIZE]);

impl EncodedVector {
    /// The all-zero vector (every slot absent).
    pub const fn zeroed() -> Self {
        Self([0.0; OBS_SIZE])
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// The elements as an array.
    pub fn as_array(&self) -> &[f32; OBS_SIZE] {
        &self.0
    }

    /// Whether two vectors are bit-identical (distinguishes `0.0` from `-0.0`).
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    pub(crate) fn as_mut_array(&mut self) -> &mut [f32; OBS_SIZE] {
        &mut self.0
    }
}

impl Default for EncodedVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Deref for EncodedVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// Un-normalized observation values in raw world units.
///
/// Output of the flatten phase and input of the normalize phase. Unlike
/// [`EncodedVector`] this is freely writable, so callers can build raw
/// vectors by hand and still get the masking guarantees of
/// [`normalize`](crate::ObservationEncoder::normalize).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawVector([f32; OBS_SIZE]);

impl RawVector {
    /// The all-zero raw vector.
    pub const fn zeroed() -> Self {
        Self([0.0; OBS_SIZE])
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.0
    }

    /// Reset every element to zero.
    pub fn clear(&mut self) {
        self.0.fill(0.0);
    }
}

impl Default for RawVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Deref for RawVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// Which fixed-capacity slots hold real data.
///
/// Produced by the flatten phase and consumed by normalize, which forces
/// every element of an absent slot to exactly zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaskInfo {
    /// Presence bit per teammate slot.
    pub teammate_active: [bool; MAX_TEAMMATES],
    /// Number of leading hostile slots that are present.
    pub hostile_count: u8,
    /// Number of leading pickup slots that are present.
    pub pickup_count: u8,
    /// Whether the primary target is present.
    pub target_present: bool,
}

impl MaskInfo {
    /// Number of active teammate slots.
    pub fn active_teammates(&self) -> usize {
        self.teammate_active.iter().filter(|&&a| a).count()
    }
}
