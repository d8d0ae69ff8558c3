/// Error type for decoding a filter from its binary layout
///
/// Decoding never builds a partial filter: any of these conditions is detected
/// before a single bucket is allocated.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The input length is not a whole number of buckets for the requested
    /// fingerprint width.
    ///
    /// The layout has no header, so reading with the wrong width is only
    /// caught here when the length does not divide into buckets of the new
    /// width (e.g. a one-bucket 16-bit table read as 32-bit). A larger
    /// 16-bit table read as 32-bit has a valid length and decodes.
    #[error(
        "byte length {len} is not a multiple of the {bucket_bytes}-byte bucket size for {bits}-bit fingerprints"
    )]
    LengthMismatch {
        len: usize,
        bucket_bytes: usize,
        bits: u32,
    },

    /// The input holds fewer bytes than a single bucket
    #[error("encoded filter must hold at least one {bucket_bytes}-byte bucket, got 0 bytes")]
    Empty { bucket_bytes: usize },

    /// The implied bucket count cannot be addressed with an index mask
    #[error("bucket count must be a power of two, got {buckets}")]
    NotPowerOfTwo { buckets: usize },

    /// A slot holds the all-ones value, which fingerprint derivation never
    /// produces; the bytes were written with a different width or are corrupt
    #[error("slot {slot} of bucket {bucket} holds a value no fingerprint can take")]
    InvalidFingerprint { bucket: usize, slot: usize },
}
