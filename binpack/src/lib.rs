//! binpack is a compact binary encoding for Rust values, driven by per-type codec plans that are
//! built once and cached.
//!
//! A type takes part by implementing [`Pack`], usually through `#[derive(Pack)]`. The first time
//! an [`Engine`] sees a type it scans the type's description into a [`Codec`] and caches it;
//! every later encode or decode of that type walks the cached plan.
//!
//! # Quickstart
//!
//! ```
//! # #[cfg(feature = "derive")] {
//! use binpack::Pack;
//!
//! #[derive(Pack, Default, Debug, PartialEq)]
//! struct Order {
//!     id: u64,
//!     symbol: String,
//!     fills: Vec<i32>,
//!     note: Option<String>,
//! }
//!
//! let order = Order {
//!     id: 7,
//!     symbol: "ABC".into(),
//!     fills: vec![-1, 1],
//!     note: None,
//! };
//! let bytes = binpack::encode(&order).unwrap();
//! assert_eq!(bytes, [7, 3, b'A', b'B', b'C', 2, 1, 2, 1]);
//!
//! let mut decoded = Order::default();
//! binpack::decode(&bytes, &mut decoded).unwrap();
//! assert_eq!(decoded, order);
//! # }
//! ```
//!
//! The top-level functions share one process-wide engine. Create your own [`Engine`] to control
//! the cache size, the preallocation limit, or to keep unrelated workloads apart.
//!
//! # Wire format
//!
//! There is no framing and no type information on the wire: both sides must agree on the type.
//!
//! |Shape|Encoding|
//! |---|---|
//! |`bool`|one byte, `1` or `0`; any byte other than `1` decodes as `false`|
//! |signed integers|zigzag, then unsigned varint|
//! |unsigned integers|base-128 varint, low group first, at most 10 bytes|
//! |`f32`, `f64`|IEEE-754 bits, little-endian|
//! |`String`|varint byte length, then UTF-8|
//! |`Vec<u8>`, [`Bytes`](bytes::Bytes)|varint length, then the bytes|
//! |`Vec<T>`|varint count, then each element|
//! |`[T; N]`|each element, no count|
//! |`Option<T>`|one byte, `1` for `None`, otherwise `0` followed by the value|
//! |structs|fields in declaration order, no tags|
//! |maps|varint count, then key/value pairs in iteration order|
//! |custom|varint length, then the [`BinaryMarshal`] payload|
//!
//! # Derive attributes
//!
//! ## Container
//! |Attribute|Description
//! |---|---|
//! |`marshal`|Encode the type through its [`BinaryMarshal`] impl instead of field by field.|
//!
//! ## Field
//! |Attribute|Description
//! |---|---|
//! |`skip`|Leave the field out of the encoding. It keeps its value on decode.|
//!
//! Fields whose name starts with `_` are skipped as well.
//!
//! # Unsupported types
//!
//! Channels, function pointers and `()` have no encoding. Scanning a type that contains one
//! fails with [`Error::UnsupportedType`] or [`Error::NilType`], as does a struct that contains
//! itself.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events: `debug` when an engine is built or a cached codec is
//! evicted, `trace` when a codec is scanned. Install a subscriber to see them.
use std::{
    io::{Read, Write},
    sync::LazyLock,
};

mod cache;
mod codec;
mod config;
mod decoder;
mod encoder;
mod engine;
pub mod error;
pub mod io;
mod pool;
#[cfg(test)]
mod proptest_config;
mod scanner;
mod schema;
pub mod varint;

pub use {
    cache::SchemaCache,
    codec::{Codec, FieldCodec, ScalarKind},
    config::{
        Config, DEFAULT_CACHE_CAPACITY, DEFAULT_POOL_CAPACITY, DEFAULT_PREALLOCATION_SIZE_LIMIT,
        PREALLOCATION_SIZE_LIMIT_DISABLED,
    },
    decoder::Decoder,
    encoder::Encoder,
    engine::{Engine, EngineBuilder},
    error::{BoxError, Error, Result},
    scanner::scan,
    schema::*,
};
#[cfg(feature = "derive")]
pub use binpack_derive::Pack;

static DEFAULT_ENGINE: LazyLock<Engine> = LazyLock::new(Engine::new);

/// The process-wide engine behind the top-level functions.
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

/// Encode `value` with the default engine.
pub fn encode<T: Pack>(value: &T) -> Result<Vec<u8>> {
    DEFAULT_ENGINE.encode(value)
}

/// Encode `value` into `out` with the default engine.
pub fn encode_to<T: Pack, W: Write>(value: &T, out: W) -> Result<()> {
    DEFAULT_ENGINE.encode_to(value, out)
}

/// Decode `data` into `dst` with the default engine.
pub fn decode<T: Pack>(data: &[u8], dst: &mut T) -> Result<()> {
    DEFAULT_ENGINE.decode(data, dst)
}

/// Decode one value from `reader` into `dst` with the default engine.
pub fn decode_from<T: Pack, R: Read>(reader: R, dst: &mut T) -> Result<()> {
    DEFAULT_ENGINE.decode_from(reader, dst)
}
