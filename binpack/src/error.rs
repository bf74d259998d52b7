//! Error types and helpers.
use {core::str::Utf8Error, std::io, thiserror::Error};

/// Error produced by a [`BinaryMarshal`](crate::BinaryMarshal) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot scan or encode a nil type")]
    NilType,
    #[error("Unsupported type: {ty}")]
    UnsupportedType { ty: &'static str },
    #[error("Destination of type {ty} is not addressable")]
    NotAddressable { ty: &'static str },
    #[error("Unexpected end of data")]
    EndOfData,
    #[error("Varint overflows a 64-bit integer")]
    VarintOverflow,
    #[error("Custom marshaler failed: {0}")]
    Marshal(#[source] BoxError),
    #[error("Custom unmarshaler failed: {0}")]
    Unmarshal(#[source] BoxError),
    #[error("Write failed: {0}")]
    Write(#[source] io::Error),
    #[error("Read failed: {0}")]
    Read(#[source] io::Error),
    #[error(transparent)]
    InvalidUtf8Encoding(#[from] Utf8Error),
    #[error("Decoded integer {value} does not fit in {target}")]
    IntegerOverflow { value: i128, target: &'static str },
    #[error(
        "Encoded sequence length exceeded preallocation limit of {limit} bytes (needed {needed} \
         bytes)"
    )]
    PreallocationSizeLimit { needed: usize, limit: usize },
    #[error("Value does not match the {expected} codec")]
    ShapeMismatch { expected: &'static str },
}

pub type Result<T> = core::result::Result<T, Error>;

#[cold]
pub const fn unsupported_type(ty: &'static str) -> Error {
    Error::UnsupportedType { ty }
}

#[cold]
pub const fn not_addressable(ty: &'static str) -> Error {
    Error::NotAddressable { ty }
}

#[cold]
pub const fn end_of_data() -> Error {
    Error::EndOfData
}

#[cold]
pub const fn varint_overflow() -> Error {
    Error::VarintOverflow
}

#[cold]
pub const fn integer_overflow(value: i128, target: &'static str) -> Error {
    Error::IntegerOverflow { value, target }
}

#[cold]
pub const fn preallocation_size_limit(needed: usize, limit: usize) -> Error {
    Error::PreallocationSizeLimit { needed, limit }
}

#[cold]
pub const fn shape_mismatch(expected: &'static str) -> Error {
    Error::ShapeMismatch { expected }
}

/// Map a failed read from an [`io::Read`] into an [`Error`].
///
/// A short read is reported as [`Error::EndOfData`] so that stream and slice sources fail the
/// same way on truncated input.
#[cold]
pub fn read_error(error: io::Error) -> Error {
    match error.kind() {
        io::ErrorKind::UnexpectedEof => Error::EndOfData,
        _ => Error::Read(error),
    }
}
