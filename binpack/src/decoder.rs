//! The decoding side: primitive readers and the driver that runs a codec into a destination.
use {
    crate::{
        cache::SchemaCache,
        codec::Codec,
        config::DEFAULT_PREALLOCATION_SIZE_LIMIT,
        error::{Result, end_of_data, not_addressable, preallocation_size_limit},
        io::{Detached, SliceSource, Source, StreamSource},
        schema::{Pack, ValueMut},
        varint::{MAX_VARINT_LEN, read_uvarint, unzigzag},
    },
    bytes::Bytes,
    core::any::type_name,
    pastey::paste,
    std::io::Read,
};

/// Reads the wire format from a [`Source`].
///
/// ```
/// use binpack::Decoder;
///
/// let mut decoder = Decoder::from_slice(&[0x01, 0x02, b'h', b'i']);
/// assert_eq!(decoder.read_varint().unwrap(), -1);
/// assert_eq!(decoder.read_string().unwrap(), "hi");
/// ```
#[derive(Debug)]
pub struct Decoder<S> {
    scratch: [u8; MAX_VARINT_LEN],
    source: S,
    preallocation_limit: usize,
}

impl<S> Decoder<S> {
    pub const fn new(source: S) -> Self {
        Self {
            scratch: [0; MAX_VARINT_LEN],
            source,
            preallocation_limit: DEFAULT_PREALLOCATION_SIZE_LIMIT,
        }
    }

    /// Set the largest allocation, in bytes, a decoded length may request up front.
    pub fn with_preallocation_limit(mut self, limit: usize) -> Self {
        self.preallocation_limit = limit;
        self
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Swap in a new source, returning the previous one.
    pub fn attach<S2>(self, source: S2) -> (Decoder<S2>, S) {
        let decoder = Decoder {
            scratch: self.scratch,
            source,
            preallocation_limit: self.preallocation_limit,
        };
        (decoder, self.source)
    }

    /// Detach from the source, leaving the decoder ready for pooling.
    pub fn detach(self) -> (Decoder<Detached>, S) {
        self.attach(Detached)
    }
}

impl<'a> Decoder<SliceSource<'a>> {
    pub const fn from_slice(data: &'a [u8]) -> Self {
        Self::new(SliceSource::new(data))
    }
}

impl<R: Read> Decoder<StreamSource<R>> {
    pub const fn from_reader(reader: R) -> Self {
        Self::new(StreamSource::new(reader))
    }
}

macro_rules! read_fixed {
    ($($ty:ty),+) => {
        paste! {
            $(
                #[doc = concat!("Read a little-endian `", stringify!($ty), "`.")]
                #[inline]
                pub fn [<read_ $ty>](&mut self) -> Result<$ty> {
                    let mut buf = [0u8; size_of::<$ty>()];
                    self.source.read_exact(&mut buf)?;
                    Ok(<$ty>::from_le_bytes(buf))
                }
            )+
        }
    };
}

impl<S: Source> Decoder<S> {
    #[inline]
    pub fn read_uvarint(&mut self) -> Result<u64> {
        read_uvarint(&mut self.source)
    }

    #[inline]
    pub fn read_varint(&mut self) -> Result<i64> {
        self.read_uvarint().map(unzigzag)
    }

    read_fixed!(u16, u32, u64);

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_u32().map(f32::from_bits)
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_u64().map(f64::from_bits)
    }

    /// Read a bool. Only `1` is `true`.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.source.read_byte()? == 1)
    }

    /// Read a raw byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.source.read_byte()
    }

    fn read_raw_len(&mut self) -> Result<usize> {
        let len = self.read_uvarint()?;
        let limit = self.preallocation_limit;
        usize::try_from(len).map_err(|_| preallocation_size_limit(usize::MAX, limit))
    }

    fn check_preallocation(&self, len: usize, elem_size: usize) -> Result<usize> {
        let limit = self.preallocation_limit;
        let needed = len
            .checked_mul(elem_size.max(1))
            .ok_or_else(|| preallocation_size_limit(usize::MAX, limit))?;
        if needed > limit {
            return Err(preallocation_size_limit(needed, limit));
        }
        Ok(len)
    }

    /// Read the element count of a sequence or map whose elements occupy `elem_size` bytes in
    /// memory.
    ///
    /// A count no larger than the input left in a slice source is accepted as is. Any other
    /// count, including every count read from a stream, must fit the preallocation limit, with
    /// zero-sized elements counted as one byte.
    pub fn read_len(&mut self, elem_size: usize) -> Result<usize> {
        let len = self.read_raw_len()?;
        if self.remaining().is_some_and(|remaining| len <= remaining) {
            return Ok(len);
        }
        self.check_preallocation(len, elem_size)
    }

    /// Read the length prefix of a byte run.
    ///
    /// Slice sources check it against the input left; stream sources against the
    /// preallocation limit.
    pub fn read_byte_len(&mut self) -> Result<usize> {
        let len = self.read_raw_len()?;
        match self.remaining() {
            Some(remaining) if len > remaining => Err(end_of_data()),
            Some(_) => Ok(len),
            None => self.check_preallocation(len, 1),
        }
    }

    /// How many of `len` decoded elements of `elem_size` bytes to allocate up front.
    #[inline]
    pub fn reserve_hint(&self, len: usize, elem_size: usize) -> usize {
        len.min(self.preallocation_limit / elem_size.max(1))
    }

    /// Read `len` raw bytes. Slice sources return a view of the input.
    #[inline]
    pub fn read_slice(&mut self, len: usize) -> Result<&[u8]> {
        self.source.slice(len)
    }

    /// Read `len` raw bytes as a [`Bytes`], sharing the input allocation where possible.
    #[inline]
    pub fn read_shared(&mut self, len: usize) -> Result<Bytes> {
        self.source.slice_shared(len)
    }

    /// Read a length-prefixed byte run.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_byte_len()?;
        self.read_slice(len).map(<[u8]>::to_vec)
    }

    /// Read a length-prefixed string.
    pub fn read_string(&mut self) -> Result<String> {
        let mut s = String::new();
        self.read_string_into(&mut s)?;
        Ok(s)
    }

    /// Read a length-prefixed string into `dst`, reusing its allocation.
    pub fn read_string_into(&mut self, dst: &mut String) -> Result<()> {
        let len = self.read_byte_len()?;
        dst.clear();
        // Short strings are staged on the stack so stream sources skip their copy buffer.
        if len <= MAX_VARINT_LEN {
            let buf = &mut self.scratch[..len];
            self.source.read_exact(buf)?;
            dst.push_str(core::str::from_utf8(buf)?);
        } else {
            let bytes = self.source.slice(len)?;
            dst.push_str(core::str::from_utf8(bytes)?);
        }
        Ok(())
    }

    /// Bytes left in the source, when known.
    pub fn remaining(&self) -> Option<usize> {
        self.source.remaining()
    }

    /// Decode into `dst` with the codec `schemas` resolves for `T`.
    ///
    /// A destination that cannot be written through (e.g. a shared `Arc`) is rejected before
    /// any bytes are consumed.
    pub fn decode<T: Pack>(&mut self, schemas: &SchemaCache, dst: &mut T) -> Result<()> {
        if matches!(dst.view_mut(), ValueMut::Shared) {
            return Err(not_addressable(type_name::<T>()));
        }
        let codec = schemas.resolve::<T>()?;
        self.decode_with(&codec, dst)
    }

    /// Decode into `dst` with an explicit codec.
    #[inline]
    pub fn decode_with(&mut self, codec: &Codec, dst: &mut dyn Pack) -> Result<()> {
        codec.decode(self, dst)
    }
}
