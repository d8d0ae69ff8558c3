// Fingerprint derivation and the partial-key index scheme shared by every filter width.

use std::fmt::Debug;
use std::hash::Hasher;

mod private {
    pub trait Sealed {}
}

/// An unsigned integer usable as a stored fingerprint.
///
/// Implemented for `u8`, `u16` and `u32`. Zero is reserved for empty slots,
/// so an occupied slot always holds a value in `[1, 2^BITS - 2]`.
pub trait Fingerprint: private::Sealed + Copy + Eq + Default + Debug + Send + Sync + 'static {
    /// Width of the fingerprint in bits
    const BITS: u32;

    /// Width of the fingerprint in bytes, as written by the codec
    const BYTES: usize = (Self::BITS / 8) as usize;

    /// The empty-slot sentinel
    const EMPTY: Self;

    /// All bits set; never produced by [`from_digest`](Self::from_digest)
    const MAX: Self;

    /// Derive a nonzero fingerprint from the most significant `BITS` bits of a digest.
    fn from_digest(digest: u64) -> Self;

    /// Append the little-endian representation to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Read a fingerprint from the first `BYTES` bytes of `bytes` (little endian).
    fn read_le(bytes: &[u8]) -> Self;

    /// Feed the little-endian bytes of the fingerprint into a hasher.
    fn hash_into<H: Hasher>(self, hasher: &mut H);

    #[inline]
    fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

macro_rules! impl_fingerprint {
    ($($ty:ty),*) => {$(
        impl private::Sealed for $ty {}

        impl Fingerprint for $ty {
            const BITS: u32 = <$ty>::BITS;
            const EMPTY: Self = 0;
            const MAX: Self = <$ty>::MAX;

            #[inline]
            fn from_digest(digest: u64) -> Self {
                let high = digest >> (64 - Self::BITS);
                // MAX is never produced: the range is [1, MAX - 1]
                (high % (<$ty>::MAX as u64 - 1) + 1) as $ty
            }

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            fn hash_into<H: Hasher>(self, hasher: &mut H) {
                hasher.write(&self.to_le_bytes());
            }
        }
    )*};
}

impl_fingerprint!(u8, u16, u32);

/// Hash raw bytes with a fresh instance of the hash capability `H`.
#[inline]
pub(crate) fn digest<H: Hasher + Default>(bytes: &[u8]) -> u64 {
    let mut hasher = H::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Compute the primary bucket index and fingerprint for a key.
///
/// The index comes from the low bits of the digest and the fingerprint from
/// the high bits, so the two are not correlated for any table size the
/// index mask can express.
#[inline]
pub(crate) fn index_and_fingerprint<F, H>(key: &[u8], mask: usize) -> (usize, F)
where
    F: Fingerprint,
    H: Hasher + Default,
{
    let hash = digest::<H>(key);
    (hash as usize & mask, F::from_digest(hash))
}

/// Alternate bucket of a fingerprint currently associated with `index`.
///
/// Depends only on the fingerprint and the current index, which is what lets a
/// displaced fingerprint move without the original key. Applying it twice
/// returns the starting index.
#[inline]
pub(crate) fn alt_index<F, H>(fingerprint: F, index: usize, mask: usize) -> usize
where
    F: Fingerprint,
    H: Hasher + Default,
{
    let mut hasher = H::default();
    fingerprint.hash_into(&mut hasher);
    (index ^ hasher.finish() as usize) & mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use xxhash_rust::xxh3::{Xxh3, xxh3_64};

    #[test]
    fn fingerprint_is_never_empty_or_max() {
        let digests = [
            0,
            1,
            u64::MAX,
            u64::MAX - 1,
            0xff00_0000_0000_0000,
            0xfe00_0000_0000_0000,
        ];
        for digest in digests {
            let fp = u8::from_digest(digest);
            assert!((1..u8::MAX).contains(&fp), "u8 fingerprint {fp}");
            let fp = u16::from_digest(digest);
            assert!((1..u16::MAX).contains(&fp), "u16 fingerprint {fp}");
            let fp = u32::from_digest(digest);
            assert!((1..u32::MAX).contains(&fp), "u32 fingerprint {fp}");
        }
    }

    #[test]
    fn fingerprint_uses_high_bits() {
        // Differences confined to the low bits must not change the fingerprint
        assert_eq!(
            u16::from_digest(0x1234_0000_0000_0000),
            u16::from_digest(0x1234_0000_0000_ffff)
        );
        assert_eq!(u16::from_digest(0x1234_0000_0000_0000), 0x1234 + 1);
    }

    #[test]
    fn digest_matches_one_shot_xxh3() {
        assert_eq!(digest::<Xxh3>(b"some_item"), xxh3_64(b"some_item"));
    }

    #[test]
    fn alt_index_is_an_involution() {
        let mask = 1023;
        for key in 0u32..500 {
            let (index, fp) = index_and_fingerprint::<u16, Xxh3>(&key.to_le_bytes(), mask);
            let alt = alt_index::<u16, Xxh3>(fp, index, mask);
            assert!(alt <= mask);
            assert_eq!(alt_index::<u16, Xxh3>(fp, alt, mask), index);
        }
    }

    #[test]
    fn single_bucket_table_maps_everything_to_zero() {
        let (index, fp) = index_and_fingerprint::<u32, Xxh3>(b"anything", 0);
        assert_eq!(index, 0);
        assert_eq!(alt_index::<u32, Xxh3>(fp, index, 0), 0);
    }

    #[test]
    fn little_endian_round_trip() {
        let mut out = Vec::new();
        0x0102_0304u32.write_le(&mut out);
        assert_eq!(out, [4, 3, 2, 1]);
        assert_eq!(u32::read_le(&out), 0x0102_0304);
        assert_eq!(<u16 as Fingerprint>::BYTES, 2);
    }
}
