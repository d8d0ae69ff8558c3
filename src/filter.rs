use crate::bucket::Bucket;
use crate::fingerprint::{self, Fingerprint};
use crate::{BUCKET_SIZE, DEFAULT_CAPACITY, DEFAULT_MAX_KICKS, MAX_LOAD_FACTOR};
use derive_builder::Builder;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;
use std::marker::PhantomData;
use xxhash_rust::xxh3::Xxh3;

/// A cuckoo filter over fingerprints of type `F`, hashing keys with `H`.
///
/// ## Layout
///
/// The table is a power-of-two number of buckets, each holding
/// [`BUCKET_SIZE`] fingerprints inline. A key maps to a primary bucket (low
/// bits of its digest) and a fingerprint (high bits). Its alternate bucket is
/// derived from the fingerprint alone, so a resident fingerprint can be moved
/// without knowing the key it came from.
///
/// ## Insertion
///
/// Insert first tries the primary bucket directly. When it is full it runs a
/// bounded displacement chain starting there: a random slot of the full
/// bucket is swapped with the fingerprint in flight, and the evicted
/// fingerprint is carried to its own alternate bucket. Exactly one fingerprint is in flight
/// at any time. If the chain runs out of kicks the insert reports `false`;
/// the table stays consistent and `count()` is unchanged, but the fingerprint
/// left in flight is dropped, which can cause a false negative for whichever
/// key it belonged to.
///
/// ## Concurrency
///
/// Mutating methods take `&mut self`. Share a filter across threads behind a
/// lock, or use [`CuckooRing`](crate::CuckooRing) which does this for a
/// rotating set of filters.
#[derive(Builder)]
#[builder(pattern = "owned", build_fn(private, name = "base_build"))]
pub struct CuckooFilter<F = u16, H = Xxh3>
where
    F: Fingerprint,
    H: Hasher + Default,
{
    /// Number of elements the filter is sized for
    #[builder(default = "DEFAULT_CAPACITY")]
    capacity: usize,

    /// Maximum number of displacements before an insert gives up
    #[builder(default = "DEFAULT_MAX_KICKS")]
    max_kicks: usize,

    /// Seed for the slot-choice generator; seeded from the OS when unset
    #[builder(default, setter(strip_option))]
    seed: Option<u64>,

    #[builder(setter(skip))]
    buckets: Vec<Bucket<F>>,

    /// `buckets.len() - 1`, used in place of a modulo
    #[builder(setter(skip))]
    mask: usize,

    /// Number of occupied slots across the whole table
    #[builder(setter(skip))]
    count: usize,

    #[builder(setter(skip), default = "StdRng::seed_from_u64(0)")]
    rng: StdRng,

    #[builder(setter(skip))]
    _hasher: PhantomData<fn() -> H>,
}

/// Number of buckets needed for `capacity` elements.
///
/// Rounds up to a power of two and doubles once more if the table would start
/// out above [`MAX_LOAD_FACTOR`]. A zero capacity still gets one bucket.
pub(crate) fn num_buckets(capacity: usize) -> usize {
    let mut num_buckets = (capacity / BUCKET_SIZE).next_power_of_two();
    if capacity as f64 / (num_buckets * BUCKET_SIZE) as f64 > MAX_LOAD_FACTOR {
        num_buckets <<= 1;
    }
    num_buckets.max(1)
}

fn slot_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

impl<F: Fingerprint, H: Hasher + Default> CuckooFilter<F, H> {
    /// Create a builder for this fingerprint width and hasher
    pub fn builder() -> CuckooFilterBuilder<F, H> {
        CuckooFilterBuilder::default()
    }

    /// Assemble a filter around an existing table.
    ///
    /// `count` must equal the number of occupied slots in `buckets`.
    pub(crate) fn from_buckets(
        buckets: Vec<Bucket<F>>,
        count: usize,
        capacity: usize,
        max_kicks: usize,
        seed: Option<u64>,
    ) -> Self {
        debug_assert!(buckets.len().is_power_of_two());
        Self {
            capacity,
            max_kicks,
            seed,
            mask: buckets.len() - 1,
            count,
            buckets,
            rng: slot_rng(seed),
            _hasher: PhantomData,
        }
    }

    /// Insert a key.
    ///
    /// Returns `false` when the displacement chain ran out of kicks. This is
    /// expected near full load: retry with a larger filter, or accept that the
    /// key (or a displaced neighbour) may not be found later.
    pub fn insert<K: ?Sized + AsRef<[u8]>>(&mut self, key: &K) -> bool {
        let (index, fingerprint) = self.index_and_fingerprint(key.as_ref());
        self.insert_at(index, fingerprint) || self.insert_with_kicks(index, fingerprint)
    }

    /// Insert a key only if it is not already reported present.
    ///
    /// Returns `true` if the key was inserted, `false` if it was already
    /// present (possibly a false positive) or the insert failed.
    pub fn insert_unique<K: ?Sized + AsRef<[u8]>>(&mut self, key: &K) -> bool {
        !self.lookup(key) && self.insert(key)
    }

    /// Check if a key is in the filter
    ///
    /// Returns `true` if the key is possibly in the filter (may have false positives),
    /// `false` if it is definitely not in the filter
    pub fn lookup<K: ?Sized + AsRef<[u8]>>(&self, key: &K) -> bool {
        let (index, fingerprint) = self.index_and_fingerprint(key.as_ref());
        self.buckets[index].contains(fingerprint)
            || self.buckets[self.alt_index(fingerprint, index)].contains(fingerprint)
    }

    /// Remove one occurrence of a key.
    ///
    /// Returns `false` if the key was not found. Only delete keys that were
    /// inserted: deleting an absent key that collides with a resident one
    /// removes the resident's fingerprint.
    pub fn delete<K: ?Sized + AsRef<[u8]>>(&mut self, key: &K) -> bool {
        let (index, fingerprint) = self.index_and_fingerprint(key.as_ref());
        let alt_index = self.alt_index(fingerprint, index);
        self.delete_at(index, fingerprint) || self.delete_at(alt_index, fingerprint)
    }

    /// Counts the fingerprints matching a key in its two candidate buckets.
    ///
    /// This is not a counting filter: the result can include false positives
    /// and is at most `2 * BUCKET_SIZE`.
    pub fn occurrences<K: ?Sized + AsRef<[u8]>>(&self, key: &K) -> usize {
        let (index, fingerprint) = self.index_and_fingerprint(key.as_ref());
        let alt_index = self.alt_index(fingerprint, index);
        let primary = self.buckets[index].occurrences(fingerprint);
        if alt_index == index {
            primary
        } else {
            primary + self.buckets[alt_index].occurrences(fingerprint)
        }
    }

    /// Number of fingerprints stored
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fraction of slots currently occupied, in `[0, 1]`
    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.slots() as f64
    }

    /// Remove every fingerprint
    pub fn reset(&mut self) {
        self.buckets.iter_mut().for_each(Bucket::reset);
        self.count = 0;
    }

    /// Number of elements the filter was sized for
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of fingerprint slots
    pub fn slots(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    pub(crate) fn buckets(&self) -> &[Bucket<F>] {
        &self.buckets
    }

    fn index_and_fingerprint(&self, key: &[u8]) -> (usize, F) {
        fingerprint::index_and_fingerprint::<F, H>(key, self.mask)
    }

    fn alt_index(&self, fingerprint: F, index: usize) -> usize {
        fingerprint::alt_index::<F, H>(fingerprint, index, self.mask)
    }

    fn insert_at(&mut self, index: usize, fingerprint: F) -> bool {
        if self.buckets[index].insert(fingerprint) {
            self.count += 1;
            true
        } else {
            false
        }
    }

    fn delete_at(&mut self, index: usize, fingerprint: F) -> bool {
        if self.buckets[index].delete(fingerprint) {
            self.count -= 1;
            true
        } else {
            false
        }
    }

    /// Displacement chain for when the primary bucket is full.
    ///
    /// Each step swaps the fingerprint in flight with a random slot of the
    /// full bucket and moves the evicted one to its alternate bucket. Swaps
    /// only permute counted fingerprints, so `count` changes only on the final
    /// successful `insert_at`.
    fn insert_with_kicks(&mut self, mut index: usize, mut fingerprint: F) -> bool {
        for _ in 0..self.max_kicks {
            let slot = self.rng.random_range(0..BUCKET_SIZE);
            fingerprint = self.buckets[index].swap(slot, fingerprint);
            index = self.alt_index(fingerprint, index);
            if self.insert_at(index, fingerprint) {
                return true;
            }
        }
        debug!(
            "cuckoo insert gave up after {} kicks at load factor {:.4}",
            self.max_kicks,
            self.load_factor()
        );
        false
    }
}

impl CuckooFilter<u16, Xxh3> {
    /// Create a filter with the default capacity and 16-bit fingerprints
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a filter with 16-bit fingerprints sized for `capacity` elements
    pub fn with_capacity(capacity: usize) -> Self {
        let buckets = vec![Bucket::default(); num_buckets(capacity)];
        Self::from_buckets(buckets, 0, capacity, DEFAULT_MAX_KICKS, None)
    }
}

impl Default for CuckooFilter<u16, Xxh3> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Fingerprint, H: Hasher + Default> fmt::Debug for CuckooFilter<F, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuckooFilter")
            .field("fingerprint_bits", &F::BITS)
            .field("capacity", &self.capacity)
            .field("num_buckets", &self.buckets.len())
            .field("count", &self.count)
            .field("max_kicks", &self.max_kicks)
            .finish()
    }
}

impl<F: Fingerprint, H: Hasher + Default> CuckooFilterBuilder<F, H> {
    /// Build a CuckooFilter with the specified configuration
    pub fn build(self) -> Result<CuckooFilter<F, H>, CuckooFilterBuilderError> {
        let filter = self.base_build()?;
        let buckets = vec![Bucket::default(); num_buckets(filter.capacity)];
        Ok(CuckooFilter::from_buckets(
            buckets,
            0,
            filter.capacity,
            filter.max_kicks,
            filter.seed,
        ))
    }
}

/// Width-erased view of a [`CuckooFilter`].
///
/// Lets the fingerprint width be picked once at runtime from a [`Precision`]
/// while every operation stays monomorphized behind the vtable.
pub trait Filter: Send + Sync {
    /// See [`CuckooFilter::insert`]
    fn insert(&mut self, key: &[u8]) -> bool;
    fn lookup(&self, key: &[u8]) -> bool;
    fn delete(&mut self, key: &[u8]) -> bool;
    fn count(&self) -> usize;
    fn load_factor(&self) -> f64;
    fn reset(&mut self);
    /// See [`CuckooFilter::encode`]
    fn encode(&self) -> Vec<u8>;
    /// Width of the stored fingerprints in bits
    fn fingerprint_bits(&self) -> u32;
}

impl<F, H> Filter for CuckooFilter<F, H>
where
    F: Fingerprint,
    H: Hasher + Default + 'static,
{
    fn insert(&mut self, key: &[u8]) -> bool {
        CuckooFilter::insert(self, key)
    }

    fn lookup(&self, key: &[u8]) -> bool {
        CuckooFilter::lookup(self, key)
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        CuckooFilter::delete(self, key)
    }

    fn count(&self) -> usize {
        CuckooFilter::count(self)
    }

    fn load_factor(&self) -> f64 {
        CuckooFilter::load_factor(self)
    }

    fn reset(&mut self) {
        CuckooFilter::reset(self)
    }

    fn encode(&self) -> Vec<u8> {
        CuckooFilter::encode(self)
    }

    fn fingerprint_bits(&self) -> u32 {
        F::BITS
    }
}

/// Fingerprint width selector.
///
/// Wider fingerprints cost more memory but lower the false-positive rate and
/// keep kickout failures rare at higher load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 8-bit fingerprints
    Low,
    /// 16-bit fingerprints
    #[default]
    Medium,
    /// 32-bit fingerprints
    High,
}

impl Precision {
    pub fn fingerprint_bits(self) -> u32 {
        match self {
            Precision::Low => u8::BITS,
            Precision::Medium => u16::BITS,
            Precision::High => u32::BITS,
        }
    }

    /// Build an empty filter of this precision hashing with `H`.
    pub fn build_filter<H>(
        self,
        capacity: usize,
        max_kicks: usize,
        seed: Option<u64>,
    ) -> Box<dyn Filter>
    where
        H: Hasher + Default + 'static,
    {
        match self {
            Precision::Low => Box::new(empty_filter::<u8, H>(capacity, max_kicks, seed)),
            Precision::Medium => Box::new(empty_filter::<u16, H>(capacity, max_kicks, seed)),
            Precision::High => Box::new(empty_filter::<u32, H>(capacity, max_kicks, seed)),
        }
    }
}

fn empty_filter<F, H>(capacity: usize, max_kicks: usize, seed: Option<u64>) -> CuckooFilter<F, H>
where
    F: Fingerprint,
    H: Hasher + Default,
{
    let buckets = vec![Bucket::default(); num_buckets(capacity)];
    CuckooFilter::from_buckets(buckets, 0, capacity, max_kicks, seed)
}

/// Create an xxh3-hashed filter for `capacity` elements at the given precision.
pub fn new_filter(capacity: usize, precision: Precision) -> Box<dyn Filter> {
    precision.build_filter::<Xxh3>(capacity, DEFAULT_MAX_KICKS, None)
}
