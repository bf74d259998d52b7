//! The encoding side: primitive writers and the driver that runs a codec over a value.
use {
    crate::{
        cache::SchemaCache,
        codec::Codec,
        error::{Error, Result},
        io::Detached,
        schema::{Pack, ValueRef},
        varint::{MAX_VARINT_LEN, encode_uvarint, zigzag},
    },
    pastey::paste,
    std::io::{self, Write},
};

/// Writes the wire format to a sink.
///
/// Writes never fail individually. The first failed write is recorded and every later write
/// becomes a no-op; [`Encoder::finish`] reports it.
///
/// ```
/// use binpack::Encoder;
///
/// let mut encoder = Encoder::new(Vec::new());
/// encoder.write_varint(-1);
/// encoder.write_string("hi");
/// encoder.finish().unwrap();
/// assert_eq!(encoder.into_inner(), [0x01, 0x02, b'h', b'i']);
/// ```
#[derive(Debug)]
pub struct Encoder<W> {
    scratch: [u8; MAX_VARINT_LEN],
    out: W,
    err: Option<io::Error>,
}

impl<W> Encoder<W> {
    pub const fn new(out: W) -> Self {
        Self {
            scratch: [0; MAX_VARINT_LEN],
            out,
            err: None,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Swap in a new sink, returning the previous one. Any recorded error is discarded.
    pub fn attach<W2>(self, out: W2) -> (Encoder<W2>, W) {
        let encoder = Encoder {
            scratch: self.scratch,
            out,
            err: None,
        };
        (encoder, self.out)
    }

    /// Detach from the sink, leaving the encoder ready for pooling.
    pub fn detach(self) -> (Encoder<Detached>, W) {
        self.attach(Detached)
    }

    /// The first write error, if any.
    pub fn error(&self) -> Option<&io::Error> {
        self.err.as_ref()
    }

    /// Report and clear the first write error.
    pub fn finish(&mut self) -> Result<()> {
        match self.err.take() {
            Some(err) => Err(Error::Write(err)),
            None => Ok(()),
        }
    }
}

macro_rules! write_fixed {
    ($($ty:ty),+) => {
        paste! {
            $(
                #[doc = concat!("Write a little-endian `", stringify!($ty), "`.")]
                #[inline]
                pub fn [<write_ $ty>](&mut self, v: $ty) {
                    self.write(&v.to_le_bytes());
                }
            )+
        }
    };
}

impl<W: Write> Encoder<W> {
    /// Write raw bytes.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) {
        if self.err.is_some() {
            return;
        }
        if let Err(err) = self.out.write_all(bytes) {
            self.err = Some(err);
        }
    }

    #[inline]
    pub fn write_uvarint(&mut self, v: u64) {
        let len = encode_uvarint(&mut self.scratch, v);
        if self.err.is_some() {
            return;
        }
        if let Err(err) = self.out.write_all(&self.scratch[..len]) {
            self.err = Some(err);
        }
    }

    #[inline]
    pub fn write_varint(&mut self, v: i64) {
        self.write_uvarint(zigzag(v));
    }

    write_fixed!(u16, u32, u64);

    #[inline]
    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    #[inline]
    pub fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    #[inline]
    pub fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    /// Write a length-prefixed byte run.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_uvarint(bytes.len() as u64);
        self.write(bytes);
    }

    /// Write a length-prefixed string.
    #[inline]
    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Encode `value` with the codec `schemas` resolves for `T`.
    ///
    /// A nil top-level pointer is rejected with [`Error::NilType`].
    pub fn encode<T: Pack>(&mut self, schemas: &SchemaCache, value: &T) -> Result<()> {
        if matches!(value.view(), ValueRef::Pointer(None)) {
            return Err(Error::NilType);
        }
        let codec = schemas.resolve::<T>()?;
        self.encode_with(&codec, value)
    }

    /// Encode `value` with an explicit codec.
    ///
    /// A write failure takes precedence over any error the codec itself reports, since it
    /// necessarily happened first.
    pub fn encode_with(&mut self, codec: &Codec, value: &dyn Pack) -> Result<()> {
        let result = codec.encode(self, value);
        self.finish()?;
        result
    }
}
