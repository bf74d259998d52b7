//! Byte sources the [`Decoder`](crate::Decoder) reads from.
//!
//! Two sources are provided:
//! - [`SliceSource`] over an in-memory buffer. Sub-slices are views into the input, no
//!   allocation and no copy.
//! - [`StreamSource`] over any [`std::io::Read`]. Sub-slices are copied into an internal buffer.
//!
//! Sinks need no abstraction of their own; the [`Encoder`](crate::Encoder) writes to any
//! [`std::io::Write`].
use {crate::error::Result, bytes::Bytes};

mod slice;
mod stream;

pub use {slice::SliceSource, stream::StreamSource};

/// Sequential access to the bytes being decoded.
///
/// # Advancement semantics
/// Every method that succeeds advances the source by exactly the number of bytes it returns.
/// A method that fails with [`Error::EndOfData`](crate::Error::EndOfData) may have consumed an
/// unspecified number of bytes.
pub trait Source {
    /// Fill `dst` completely.
    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()>;

    /// Read a single byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Return the next `len` bytes.
    ///
    /// The returned slice is only valid until the next call on the source. In-memory sources
    /// return a view of the input; streaming sources copy.
    fn slice(&mut self, len: usize) -> Result<&[u8]>;

    /// Return the next `len` bytes as an owned, reference-counted buffer.
    ///
    /// Sources backed by a [`Bytes`] hand out a view of the same allocation.
    fn slice_shared(&mut self, len: usize) -> Result<Bytes> {
        self.slice(len).map(Bytes::copy_from_slice)
    }

    /// Number of bytes left, when the source knows it.
    fn remaining(&self) -> Option<usize>;
}

impl<S: Source + ?Sized> Source for &mut S {
    #[inline]
    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        (**self).read_exact(dst)
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    #[inline]
    fn slice(&mut self, len: usize) -> Result<&[u8]> {
        (**self).slice(len)
    }

    #[inline]
    fn slice_shared(&mut self, len: usize) -> Result<Bytes> {
        (**self).slice_shared(len)
    }

    #[inline]
    fn remaining(&self) -> Option<usize> {
        (**self).remaining()
    }
}

/// Placeholder sink or source held by pooled encoders and decoders between operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Detached;
