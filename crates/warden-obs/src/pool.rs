//! Per-agent scratch buffers reused across decision cycles.
//!
//! [`ObsPool`] owns one [`WorldStateSnapshot`], one [`RawVector`], and one
//! [`EncodedVector`] per slot. All buffers are allocated in
//! [`ObsPool::new`]; acquiring, preparing, and encoding a slot never
//! touch the heap. Slots are handed out from a free list, so the same
//! slot indices are reused as agents come and go.

use std::fmt;

use warden_core::WorldStateSnapshot;

use crate::encoder::ObservationEncoder;
use crate::vector::{EncodedVector, MaskInfo, RawVector};

/// Index of one slot in an [`ObsPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub u32);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    snapshot: WorldStateSnapshot,
    raw: RawVector,
    encoded: EncodedVector,
    mask: MaskInfo,
    in_use: bool,
}

/// Fixed-capacity arena of per-agent observation buffers.
#[derive(Clone, Debug)]
pub struct ObsPool {
    slots: Vec<Slot>,
    /// Free slot indices; popped from the back, so lower indices go first.
    free: Vec<u32>,
}

impl ObsPool {
    /// Create a pool with `capacity` slots, all free.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        Self {
            slots: vec![Slot::default(); capacity],
            free: (0..capacity as u32).rev().collect(),
        }
    }

    /// Take a free slot, or `None` if every slot is in use.
    pub fn acquire(&mut self) -> Option<SlotIndex> {
        let idx = self.free.pop()?;
        let slot = &mut self.slots[idx as usize];
        slot.in_use = true;
        slot.snapshot.clear();
        Some(SlotIndex(idx))
    }

    /// Return a slot to the free list.
    ///
    /// Returns `false` if the index is out of range or already free.
    pub fn release(&mut self, slot: SlotIndex) -> bool {
        match self.slots.get_mut(slot.0 as usize) {
            Some(s) if s.in_use => {
                s.in_use = false;
                self.free.push(slot.0);
                true
            }
            _ => false,
        }
    }

    /// Clear the slot's snapshot and return it for filling.
    pub fn prepare(&mut self, slot: SlotIndex) -> Option<&mut WorldStateSnapshot> {
        let snapshot = self.snapshot_mut(slot)?;
        snapshot.clear();
        Some(snapshot)
    }

    /// The slot's snapshot as last written.
    pub fn snapshot_mut(&mut self, slot: SlotIndex) -> Option<&mut WorldStateSnapshot> {
        self.live_mut(slot).map(|s| &mut s.snapshot)
    }

    /// Encode the slot's snapshot into the slot's own output buffer.
    ///
    /// Returns `None` if the slot is not in use.
    pub fn encode_slot(
        &mut self,
        encoder: &ObservationEncoder,
        slot: SlotIndex,
    ) -> Option<&EncodedVector> {
        let Slot {
            snapshot,
            raw,
            encoded,
            mask,
            ..
        } = self.live_mut(slot)?;
        *mask = encoder.flatten(snapshot, raw);
        encoder.normalize_into(raw, mask, encoded);
        Some(&*encoded)
    }

    /// The slot's most recent encoding.
    pub fn encoded(&self, slot: SlotIndex) -> Option<&EncodedVector> {
        self.slots
            .get(slot.0 as usize)
            .filter(|s| s.in_use)
            .map(|s| &s.encoded)
    }

    /// Number of slots currently acquired.
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Release every slot.
    pub fn clear(&mut self) {
        for s in &mut self.slots {
            s.in_use = false;
            s.snapshot.clear();
        }
        self.free.clear();
        self.free.extend((0..self.slots.len() as u32).rev());
    }

    /// Approximate memory held by the pool's buffers, in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Slot>()
            + self.free.capacity() * std::mem::size_of::<u32>()
    }

    fn live_mut(&mut self, slot: SlotIndex) -> Option<&mut Slot> {
        self.slots.get_mut(slot.0 as usize).filter(|s| s.in_use)
    }
}
