use thiserror::Error;

/// Error returned when decoding the protobuf wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A length prefix is negative or points past the addressable range.
    #[error("proto: negative length found during unmarshaling")]
    InvalidLength,
    /// A varint does not fit in 64 bits.
    #[error("proto: integer overflow")]
    IntOverflow,
    /// An end-group key appeared without a matching start-group key.
    #[error("proto: unexpected end of group")]
    UnexpectedEndOfGroup,
    /// The buffer ended in the middle of a value.
    #[error("unexpected EOF")]
    UnexpectedEof,
    /// The key carries a wire type outside of `0..=5`.
    #[error("proto: illegal wireType {0}")]
    IllegalWireType(u64),
    /// The key carries field number zero or a number larger than 2^29-1.
    #[error("proto: illegal tag {tag} (wire type {wire_type})")]
    IllegalTag {
        /// Field number read from the key.
        tag: u64,
        /// Wire type read from the key.
        wire_type: u8,
    },
    /// A known field arrived with a wire type that does not match its declaration.
    #[error("proto: wrong wireType = {actual} for field {tag}, expected {expected}")]
    WrongWireType {
        /// Field number.
        tag: u32,
        /// Declared wire type.
        expected: u8,
        /// Wire type found in the input.
        actual: u8,
    },
    /// A string field is not valid UTF-8.
    #[error("proto: invalid UTF-8 in string field")]
    InvalidUtf8,
    /// Embedded messages nest deeper than [`RECURSION_LIMIT`](crate::encoding::RECURSION_LIMIT).
    #[error("proto: max recursion depth exceeded")]
    RecursionLimitExceeded,
    /// A fixed-capacity container cannot hold the decoded value.
    #[error("proto: value exceeds container capacity")]
    CapacityExceeded,
}

/// Error returned when encoding the protobuf wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The output buffer is smaller than the encoded message.
    #[error("buffer too small: {needed} bytes needed, {available} available")]
    InsufficientSpace {
        /// Bytes required by the write that failed.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
    /// The message wrote a different number of bytes than `size_vt` reported.
    #[error("encoded size {written} does not match computed size {expected}")]
    SizeMismatch {
        /// Size reported by `size_vt`.
        expected: usize,
        /// Bytes actually written.
        written: usize,
    },
}
