//! Cuckoo Filter with a Rotating Window
//!
//! An approximate membership structure that, unlike a Bloom filter, supports
//! deletion, plus a ring of filters that approximates "seen within the last N
//! windows" with hard eviction of the oldest window.
//!
//! ```
//! use cuckoo_ring::{CuckooFilter, CuckooRing};
//!
//! let mut filter = CuckooFilter::with_capacity(1000);
//! assert!(filter.insert("apple"));
//! assert!(filter.lookup("apple"));
//! assert!(filter.delete("apple"));
//! assert!(!filter.lookup("apple"));
//!
//! let ring = CuckooRing::new(2, 1000);
//! assert!(!ring.check("request-1"));
//! assert!(ring.check("request-1"));
//! ```

mod bucket;
pub mod codec;
mod error;
mod filter;
mod fingerprint;
mod ring;

pub use codec::decode_filter;
pub use error::DecodeError;
pub use filter::{
    CuckooFilter, CuckooFilterBuilder, CuckooFilterBuilderError, Filter, Precision, new_filter,
};
pub use fingerprint::Fingerprint;
pub use ring::{CuckooRing, CuckooRingBuilder, CuckooRingBuilderError};

/// Number of fingerprint slots per bucket
pub const BUCKET_SIZE: usize = 4;

/// Default bound on the displacement chain of a single insert
pub const DEFAULT_MAX_KICKS: usize = 500;

/// Default number of elements a filter or ring is sized for
pub const DEFAULT_CAPACITY: usize = 1_000_000;

/// Highest load factor a freshly sized table may start out at when filled to
/// its requested capacity; above it the bucket count is doubled.
pub const MAX_LOAD_FACTOR: f64 = 0.96;
