use crate::filter::{Filter, Precision};
use crate::{DEFAULT_CAPACITY, DEFAULT_MAX_KICKS};
use derive_builder::Builder;
use log::debug;
use parking_lot::RwLock;
use std::fmt;
use std::hash::Hasher;
use std::marker::PhantomData;
use xxhash_rust::xxh3::Xxh3;

/// A rotating window of cuckoo filters approximating "seen recently".
///
/// The ring owns `slots` independent filters, each sized for
/// `capacity / slots` elements. New keys always go into the slot under the
/// cursor. Once that slot has taken more than its share of keys the cursor
/// advances and the next slot is wiped before reuse, whatever it held. This
/// is a hard, lossy eviction: a key is guaranteed to be reported until its
/// slot is reused, and may be forgotten after that.
///
/// ## Concurrency
///
/// A single reader-writer lock guards every slot. [`test`](Self::test) takes
/// it shared; [`add`](Self::add), [`check`](Self::check) and
/// [`reset`](Self::reset) take it exclusively, so readers never observe a
/// slot halfway through being wiped and two `check` calls for the same key
/// cannot both see it as absent.
#[derive(Builder)]
#[builder(
    pattern = "owned",
    build_fn(private, name = "base_build", validate = "Self::validate")
)]
pub struct CuckooRing<H = Xxh3>
where
    H: Hasher + Default + 'static,
{
    /// Number of filters in the ring
    #[builder(default = "2")]
    slots: usize,

    /// Total number of elements across all slots
    #[builder(default = "DEFAULT_CAPACITY")]
    capacity: usize,

    /// Fingerprint width of every slot
    #[builder(default)]
    precision: Precision,

    /// Kick bound of every slot
    #[builder(default = "DEFAULT_MAX_KICKS")]
    max_kicks: usize,

    /// Base seed for the slots' generators; slot `i` uses `seed + i`
    #[builder(default, setter(strip_option))]
    seed: Option<u64>,

    #[builder(setter(skip))]
    slot_capacity: usize,

    #[builder(setter(skip))]
    state: RwLock<RingState>,

    #[builder(setter(skip))]
    _hasher: PhantomData<fn() -> H>,
}

struct RingSlot {
    filter: Box<dyn Filter>,
    /// Keys added since this slot was last wiped
    inserted: usize,
}

#[derive(Default)]
struct RingState {
    slots: Vec<RingSlot>,
    cursor: usize,
}

impl RingState {
    fn new<H: Hasher + Default + 'static>(
        slots: usize,
        slot_capacity: usize,
        precision: Precision,
        max_kicks: usize,
        seed: Option<u64>,
    ) -> Self {
        let slots = (0..slots)
            .map(|i| RingSlot {
                filter: precision.build_filter::<H>(
                    slot_capacity,
                    max_kicks,
                    seed.map(|seed| seed.wrapping_add(i as u64)),
                ),
                inserted: 0,
            })
            .collect();
        Self { slots, cursor: 0 }
    }

    fn test(&self, key: &[u8]) -> bool {
        self.slots.iter().any(|slot| slot.filter.lookup(key))
    }

    fn add(&mut self, key: &[u8], slot_capacity: usize) -> bool {
        if self.slots[self.cursor].inserted > slot_capacity {
            self.rotate();
        }
        let slot = &mut self.slots[self.cursor];
        slot.inserted += 1;
        slot.filter.insert(key)
    }

    /// Advance the cursor and wipe the slot it lands on
    fn rotate(&mut self) {
        self.cursor = (self.cursor + 1) % self.slots.len();
        let slot = &mut self.slots[self.cursor];
        debug!(
            "cuckoo ring rotated to slot {}, evicting {} fingerprints",
            self.cursor,
            slot.filter.count()
        );
        slot.filter.reset();
        slot.inserted = 0;
    }
}

impl<H: Hasher + Default + 'static> CuckooRing<H> {
    /// Add a key to the current slot, rotating first if the slot is over its
    /// share.
    ///
    /// Returns the result of the underlying filter insert; `false` means the
    /// slot ran out of kicks for this key.
    pub fn add<K: ?Sized + AsRef<[u8]>>(&self, key: &K) -> bool {
        self.state.write().add(key.as_ref(), self.slot_capacity)
    }

    /// Check whether any slot reports the key as present
    pub fn test<K: ?Sized + AsRef<[u8]>>(&self, key: &K) -> bool {
        self.state.read().test(key.as_ref())
    }

    /// Test-and-set under one exclusive lock.
    ///
    /// Returns `true` if the key was already present (nothing is changed),
    /// otherwise adds it and returns `false`.
    pub fn check<K: ?Sized + AsRef<[u8]>>(&self, key: &K) -> bool {
        let key = key.as_ref();
        let mut state = self.state.write();
        if state.test(key) {
            return true;
        }
        state.add(key, self.slot_capacity);
        false
    }

    /// Wipe every slot and move the cursor back to the first one
    pub fn reset(&self) {
        let mut state = self.state.write();
        for slot in &mut state.slots {
            slot.filter.reset();
            slot.inserted = 0;
        }
        state.cursor = 0;
    }

    /// Number of fingerprints held across all slots
    pub fn len(&self) -> usize {
        self.state.read().slots.iter().map(|slot| slot.filter.count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load factor of the slot currently receiving keys
    pub fn load_factor(&self) -> f64 {
        let state = self.state.read();
        state.slots[state.cursor].filter.load_factor()
    }

    /// Index of the slot currently receiving keys
    pub fn cursor(&self) -> usize {
        self.state.read().cursor
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Number of keys a slot takes before the ring moves on
    pub fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }
}

impl CuckooRing<Xxh3> {
    /// Create a new CuckooRingBuilder hashing with xxh3.
    ///
    /// Use `CuckooRingBuilder::<H>::default()` for another hasher.
    pub fn builder() -> CuckooRingBuilder<Xxh3> {
        CuckooRingBuilder::default()
    }

    /// Create a ring of `slots` 16-bit filters sharing `capacity` elements.
    ///
    /// A slot count of zero is raised to one.
    pub fn new(slots: usize, capacity: usize) -> Self {
        let slots = slots.max(1);
        let slot_capacity = capacity / slots;
        Self {
            slots,
            capacity,
            precision: Precision::default(),
            max_kicks: DEFAULT_MAX_KICKS,
            seed: None,
            slot_capacity,
            state: RwLock::new(RingState::new::<Xxh3>(
                slots,
                slot_capacity,
                Precision::default(),
                DEFAULT_MAX_KICKS,
                None,
            )),
            _hasher: PhantomData,
        }
    }
}

impl<H: Hasher + Default + 'static> fmt::Debug for CuckooRing<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("CuckooRing")
            .field("slots", &self.slots)
            .field("slot_capacity", &self.slot_capacity)
            .field("precision", &self.precision)
            .field("cursor", &state.cursor)
            .field(
                "inserted",
                &state.slots.iter().map(|slot| slot.inserted).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<H: Hasher + Default + 'static> CuckooRingBuilder<H> {
    /// Validate the builder configuration
    fn validate(&self) -> Result<(), String> {
        if self.slots == Some(0) {
            return Err("slots must be greater than zero".into());
        }
        Ok(())
    }

    /// Build a CuckooRing with the specified configuration
    pub fn build(self) -> Result<CuckooRing<H>, CuckooRingBuilderError> {
        let mut ring = self.base_build()?;
        ring.slot_capacity = ring.capacity / ring.slots;
        ring.state = RwLock::new(RingState::new::<H>(
            ring.slots,
            ring.slot_capacity,
            ring.precision,
            ring.max_kicks,
            ring.seed,
        ));
        Ok(ring)
    }
}
