use crate::BUCKET_SIZE;
use crate::fingerprint::Fingerprint;

/// A fixed group of fingerprint slots stored inline.
///
/// An empty slot holds [`Fingerprint::EMPTY`]. Slot order carries no meaning
/// for membership but is preserved by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bucket<F> {
    slots: [F; BUCKET_SIZE],
}

impl<F: Fingerprint> Default for Bucket<F> {
    fn default() -> Self {
        Self {
            slots: [F::EMPTY; BUCKET_SIZE],
        }
    }
}

impl<F: Fingerprint> Bucket<F> {
    pub(crate) fn from_slots(slots: [F; BUCKET_SIZE]) -> Self {
        Self { slots }
    }

    #[inline]
    pub(crate) fn contains(&self, fingerprint: F) -> bool {
        self.slots.contains(&fingerprint)
    }

    /// Number of slots holding `fingerprint`
    #[inline]
    pub(crate) fn occurrences(&self, fingerprint: F) -> usize {
        self.slots.iter().filter(|&&fp| fp == fingerprint).count()
    }

    /// Write into the first empty slot. Returns `false` if the bucket is full.
    #[inline]
    pub(crate) fn insert(&mut self, fingerprint: F) -> bool {
        match self.slots.iter_mut().find(|fp| fp.is_empty()) {
            Some(slot) => {
                *slot = fingerprint;
                true
            }
            None => false,
        }
    }

    /// Clear the first slot holding `fingerprint`. Returns `false` if none does.
    #[inline]
    pub(crate) fn delete(&mut self, fingerprint: F) -> bool {
        match self.slots.iter_mut().find(|fp| **fp == fingerprint) {
            Some(slot) => {
                *slot = F::EMPTY;
                true
            }
            None => false,
        }
    }

    /// Put `fingerprint` into `slot` and hand back the previous occupant.
    #[inline]
    pub(crate) fn swap(&mut self, slot: usize, fingerprint: F) -> F {
        std::mem::replace(&mut self.slots[slot], fingerprint)
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.slots = [F::EMPTY; BUCKET_SIZE];
    }

    /// Number of occupied slots
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|fp| !fp.is_empty()).count()
    }

    pub(crate) fn slots(&self) -> &[F; BUCKET_SIZE] {
        &self.slots
    }
}
