//! Binary layout of a filter table.
//!
//! A filter is written as a flat array of fixed-width little-endian
//! fingerprints, bucket-major then slot-minor, with nothing else around it:
//!
//! ```text
//! | bucket 0: slot 0 .. slot 3 | bucket 1: slot 0 .. slot 3 | ... |
//! ```
//!
//! The byte length is `num_buckets * BUCKET_SIZE * (bits / 8)`. The bucket
//! count is inferred from the length on the way back in and the occupancy
//! count is recomputed from the fingerprints, never read from the wire. The
//! width is not recorded, so the reader chooses it through the type (or a
//! [`Precision`]).

use crate::bucket::Bucket;
use crate::error::DecodeError;
use crate::filter::{CuckooFilter, Filter, Precision};
use crate::fingerprint::Fingerprint;
use crate::{BUCKET_SIZE, DEFAULT_MAX_KICKS};
use log::{debug, trace};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::Hasher;
use xxhash_rust::xxh3::Xxh3;

/// Encoded size of one bucket for fingerprint width `F`
pub const fn bucket_bytes<F: Fingerprint>() -> usize {
    BUCKET_SIZE * F::BYTES
}

impl<F: Fingerprint, H: Hasher + Default> CuckooFilter<F, H> {
    /// Serialize the table.
    ///
    /// The output depends only on the table contents: two filters holding the
    /// same fingerprints in the same slots encode identically.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.num_buckets() * bucket_bytes::<F>());
        for bucket in self.buckets() {
            for &fingerprint in bucket.slots() {
                fingerprint.write_le(&mut out);
            }
        }
        out
    }

    /// Rebuild a filter from bytes produced by [`encode`](Self::encode).
    ///
    /// The decoded filter answers every lookup, delete, count and load factor
    /// query exactly as the encoded one did. Its capacity is reported as the
    /// slot count, and it uses the default kick bound with an OS-seeded
    /// generator.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let buckets = decode_buckets::<F>(bytes)?;
        let count = buckets.iter().map(Bucket::len).sum();
        let slots = buckets.len() * BUCKET_SIZE;
        trace!(
            "decoded {}-bit filter: {} buckets, {} fingerprints",
            F::BITS,
            buckets.len(),
            count
        );
        Ok(Self::from_buckets(buckets, count, slots, DEFAULT_MAX_KICKS, None))
    }
}

/// Validate the length of `bytes` and read the buckets it describes.
fn decode_buckets<F: Fingerprint>(bytes: &[u8]) -> Result<Vec<Bucket<F>>, DecodeError> {
    let bucket_bytes = bucket_bytes::<F>();
    let num_buckets = bytes.len() / bucket_bytes;
    let error = if bytes.len() % bucket_bytes != 0 {
        Some(DecodeError::LengthMismatch {
            len: bytes.len(),
            bucket_bytes,
            bits: F::BITS,
        })
    } else if num_buckets == 0 {
        Some(DecodeError::Empty { bucket_bytes })
    } else if !num_buckets.is_power_of_two() {
        Some(DecodeError::NotPowerOfTwo {
            buckets: num_buckets,
        })
    } else {
        None
    };
    if let Some(error) = error {
        debug!("rejected encoded filter: {error}");
        return Err(error);
    }

    let mut buckets = Vec::with_capacity(num_buckets);
    for (bucket, chunk) in bytes.chunks_exact(bucket_bytes).enumerate() {
        let mut slots = [F::EMPTY; BUCKET_SIZE];
        for (slot, raw) in chunk.chunks_exact(F::BYTES).enumerate() {
            let fingerprint = F::read_le(raw);
            if fingerprint == F::MAX {
                let error = DecodeError::InvalidFingerprint { bucket, slot };
                debug!("rejected encoded filter: {error}");
                return Err(error);
            }
            slots[slot] = fingerprint;
        }
        buckets.push(Bucket::from_slots(slots));
    }
    Ok(buckets)
}

/// Decode an xxh3-hashed filter whose width is chosen at runtime.
pub fn decode_filter(bytes: &[u8], precision: Precision) -> Result<Box<dyn Filter>, DecodeError> {
    Ok(match precision {
        Precision::Low => Box::new(CuckooFilter::<u8, Xxh3>::decode(bytes)?),
        Precision::Medium => Box::new(CuckooFilter::<u16, Xxh3>::decode(bytes)?),
        Precision::High => Box::new(CuckooFilter::<u32, Xxh3>::decode(bytes)?),
    })
}

impl<F: Fingerprint, H: Hasher + Default> Serialize for CuckooFilter<F, H> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.encode())
    }
}

impl<'de, F: Fingerprint, H: Hasher + Default> Deserialize<'de> for CuckooFilter<F, H> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = deserializer.deserialize_byte_buf(BytesVisitor)?;
        Self::decode(&bytes).map_err(de::Error::custom)
    }
}

/// Accepts the table either as a byte string or as a sequence of numbers,
/// depending on how the format represents bytes.
struct BytesVisitor;

impl<'de> Visitor<'de> for BytesVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an encoded cuckoo filter table")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(v.to_vec())
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element()? {
            bytes.push(byte);
        }
        Ok(bytes)
    }
}
