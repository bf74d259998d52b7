//! Type descriptions and value views.
//!
//! [`Pack`] is the single trait a type implements to take part in encoding. It answers two
//! questions:
//! - *What shape does this type have?* [`Pack::type_desc`] returns a [`TypeDesc`] the
//!   [`scan`](crate::scan) step turns into a [`Codec`](crate::Codec). It is only consulted the
//!   first time an engine sees the type.
//! - *How do I reach the data?* [`Pack::view`] and [`Pack::view_mut`] expose a value through one
//!   of a handful of access traits ([`SeqRef`], [`StructMut`], [`MapRef`], ...), which the codec
//!   walks on every encode and decode.
//!
//! Implementations exist for the primitive types, strings, the standard collections, `Option`,
//! the smart pointers and [`bytes::Bytes`]. Structs get theirs from `#[derive(Pack)]`:
//!
//! ```
//! # #[cfg(feature = "derive")] {
//! use binpack::Pack;
//!
//! #[derive(Pack, Default, Debug, PartialEq)]
//! struct Reading {
//!     sensor: String,
//!     samples: Vec<i32>,
//!     #[pack(skip)]
//!     cached_mean: f64,
//! }
//!
//! let reading = Reading { sensor: "t0".into(), samples: vec![-1, 2], cached_mean: 0.5 };
//! let bytes = binpack::encode(&reading).unwrap();
//! assert_eq!(bytes, [2, b't', b'0', 2, 1, 4]);
//!
//! let mut decoded = Reading::default();
//! binpack::decode(&bytes, &mut decoded).unwrap();
//! assert_eq!(decoded.samples, reading.samples);
//! assert_eq!(decoded.cached_mean, 0.0);
//! # }
//! ```
use {
    crate::error::{BoxError, Result, integer_overflow},
    bytes::Bytes,
    core::{
        any::{Any, TypeId, type_name},
        fmt,
        hash::{Hash, Hasher},
    },
    pastey::paste,
};

mod external;
mod impls;

/// Lazily produces the description of a child type.
pub type DescFn = fn() -> TypeDesc;

/// Types that can be encoded and decoded.
///
/// See the [module documentation](self) for an overview.
pub trait Pack: Any {
    /// Describe the shape of `Self`.
    fn type_desc() -> TypeDesc
    where
        Self: Sized;

    /// Read access to the value.
    fn view(&self) -> ValueRef<'_>;

    /// Write access to the value.
    ///
    /// Returns [`ValueMut::Shared`] when the value cannot be borrowed mutably (e.g. an `Arc` with
    /// other live references).
    fn view_mut(&mut self) -> ValueMut<'_>;
}

/// Description of a type, as consumed by the scanner.
///
/// Two descriptions are equal exactly when they describe the same type.
#[derive(Clone)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
    kind: Kind,
}

impl TypeDesc {
    /// Describe `T` as having the given kind.
    pub fn of<T: ?Sized + 'static>(kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDesc")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The shape of a type.
///
/// Child types are referenced through [`DescFn`] thunks so that describing a type never recurses.
#[derive(Debug, Clone)]
pub enum Kind {
    /// The absence of a type. Never encodable.
    Nil,
    Bool,
    /// Signed integer of the given bit width.
    Int(u32),
    /// Unsigned integer of the given bit width.
    Uint(u32),
    F32,
    F64,
    String,
    /// Fixed-length sequence; no length on the wire.
    Array { len: usize, elem: DescFn },
    /// Variable-length sequence.
    Slice { elem: DescFn },
    /// Optional, indirect value.
    Pointer { elem: DescFn },
    Struct { fields: Vec<FieldDesc> },
    Map { key: DescFn, value: DescFn },
    /// Type that encodes itself through [`BinaryMarshal`].
    Custom,
    Channel,
    Func,
}

/// A struct field as seen by the scanner.
#[derive(Debug, Clone, Copy)]
pub struct FieldDesc {
    name: &'static str,
    slot: usize,
    desc: Option<DescFn>,
}

impl FieldDesc {
    /// A field that takes part in encoding.
    ///
    /// `slot` is the index handed back to [`StructRef::field`] and [`StructMut::field_mut`].
    pub const fn new(name: &'static str, slot: usize, desc: DescFn) -> Self {
        Self {
            name,
            slot,
            desc: Some(desc),
        }
    }

    /// A field excluded from encoding.
    pub const fn skipped(name: &'static str, slot: usize) -> Self {
        Self {
            name,
            slot,
            desc: None,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Description of the field's type, or `None` if the field is skipped.
    pub const fn desc(&self) -> Option<DescFn> {
        self.desc
    }
}

/// Read access to a value.
pub enum ValueRef<'a> {
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Seq(&'a dyn SeqRef),
    /// `None` is the nil pointer.
    Pointer(Option<&'a dyn Pack>),
    Struct(&'a dyn StructRef),
    Map(&'a dyn MapRef),
    Custom(&'a dyn BinaryMarshal),
    /// A value with no readable representation (channels, functions, unit).
    Opaque,
}

/// Write access to a value.
pub enum ValueMut<'a> {
    Bool(&'a mut bool),
    Int(IntMut<'a>),
    Uint(UintMut<'a>),
    F32(&'a mut f32),
    F64(&'a mut f64),
    Str(&'a mut String),
    Seq(&'a mut dyn SeqMut),
    Pointer(&'a mut dyn PointerMut),
    Struct(&'a mut dyn StructMut),
    Map(&'a mut dyn MapMut),
    Custom(&'a mut dyn BinaryMarshal),
    /// The value is shared and cannot be written through.
    Shared,
    Opaque,
}

macro_rules! int_slot {
    ($(#[$meta:meta])* $name:ident, $wide:ty => $($ty:ident),+) => {
        paste! {
            $(#[$meta])*
            #[derive(Debug)]
            pub enum $name<'a> {
                $([<$ty:camel>](&'a mut $ty)),+
            }

            impl $name<'_> {
                /// The current value, widened.
                pub fn get(&self) -> $wide {
                    match self {
                        $(Self::[<$ty:camel>](slot) => **slot as $wide),+
                    }
                }

                /// Store `value`, failing if it does not fit the destination width.
                pub fn set(self, value: $wide) -> Result<()> {
                    match self {
                        $(Self::[<$ty:camel>](slot) => {
                            *slot = <$ty>::try_from(value)
                                .map_err(|_| integer_overflow(value as i128, stringify!($ty)))?;
                        })+
                    }
                    Ok(())
                }
            }

            $(
                impl<'a> From<&'a mut $ty> for $name<'a> {
                    fn from(slot: &'a mut $ty) -> Self {
                        Self::[<$ty:camel>](slot)
                    }
                }
            )+
        }
    };
}

int_slot!(
    /// Mutable reference to a signed integer of any width.
    IntMut, i64 => i8, i16, i32, i64, isize
);
int_slot!(
    /// Mutable reference to an unsigned integer of any width.
    UintMut, u64 => u8, u16, u32, u64, usize
);

/// Read access to a sequence (slice, array or byte buffer).
pub trait SeqRef {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&dyn Pack>;

    /// The elements as a contiguous byte slice, for sequences of `u8`.
    fn as_bytes(&self) -> Option<&[u8]> {
        None
    }
}

/// Destination for a decoded byte run.
pub enum ByteSink<'a> {
    Vec(&'a mut Vec<u8>),
    /// Receives a view of the decoder's input when the input is itself a [`Bytes`].
    Shared(&'a mut Bytes),
}

/// Write access to a sequence.
pub trait SeqMut {
    fn len(&self) -> usize;

    /// In-memory size of one element, used to bound allocations driven by decoded lengths.
    fn elem_size(&self) -> usize;

    /// Prepare to receive `len` decoded elements through [`SeqMut::slot_mut`], with room for
    /// `reserve` of them allocated up front.
    ///
    /// Growable sequences are emptied. Fixed-length sequences leave their contents in place and
    /// return `false` if `len` differs from their length.
    fn reset(&mut self, len: usize, reserve: usize) -> bool;

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Pack>;

    /// The destination of the `index`th decoded element after a [`SeqMut::reset`]. Growable
    /// sequences append a default element for it.
    fn slot_mut(&mut self, index: usize) -> Option<&mut dyn Pack> {
        self.get_mut(index)
    }

    /// Direct access for sequences of `u8`.
    fn byte_sink(&mut self) -> Option<ByteSink<'_>> {
        None
    }
}

/// Write access to an optional, indirect value.
pub trait PointerMut {
    fn is_set(&self) -> bool;

    /// Make the pointer nil.
    fn clear(&mut self);

    /// The pointee, allocating a default value first if the pointer is nil.
    fn get_or_alloc(&mut self) -> &mut dyn Pack;
}

/// Read access to struct fields, by [`FieldDesc::slot`].
pub trait StructRef {
    fn field(&self, slot: usize) -> Option<&dyn Pack>;
}

/// Write access to struct fields, by [`FieldDesc::slot`].
pub trait StructMut {
    fn field_mut(&mut self, slot: usize) -> Option<&mut dyn Pack>;
}

/// Read access to a map.
pub trait MapRef {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every entry in iteration order, stopping at the first error.
    fn for_each_entry(&self, f: &mut dyn FnMut(&dyn Pack, &dyn Pack) -> Result<()>) -> Result<()>;
}

/// Write access to a map.
pub trait MapMut {
    /// In-memory size of one key/value pair, used to bound allocations driven by decoded lengths.
    fn entry_size(&self) -> usize;

    /// Build a fresh map of `len` entries, each filled in by `f` from default key and value
    /// slots, and replace the current contents with it once every entry succeeded. At most
    /// `reserve` entries are allocated up front.
    fn rebuild(
        &mut self,
        len: usize,
        reserve: usize,
        f: &mut dyn FnMut(&mut dyn Pack, &mut dyn Pack) -> Result<()>,
    ) -> Result<()>;
}

/// Types that produce their own binary representation.
///
/// The payload is written with a length prefix, so implementations need not be
/// self-delimiting. Attach an implementation to a type with `#[derive(Pack)]` and
/// `#[pack(marshal)]`.
pub trait BinaryMarshal {
    fn marshal_binary(&self) -> core::result::Result<Vec<u8>, BoxError>;

    fn unmarshal_binary(&mut self, data: &[u8]) -> core::result::Result<(), BoxError>;
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::Error};

    #[test]
    fn int_slots_reject_values_out_of_range() {
        let mut narrow = 0i8;
        assert!(matches!(
            IntMut::from(&mut narrow).set(128),
            Err(Error::IntegerOverflow { value: 128, target: "i8" })
        ));
        IntMut::from(&mut narrow).set(-128).unwrap();
        assert_eq!(narrow, -128);

        let mut byte = 0u8;
        assert!(UintMut::from(&mut byte).set(256).is_err());
        UintMut::from(&mut byte).set(255).unwrap();
        assert_eq!(UintMut::from(&mut byte).get(), 255);
    }

    #[test]
    fn descriptions_compare_by_type() {
        let a = TypeDesc::of::<u32>(Kind::Uint(32));
        let b = TypeDesc::of::<u32>(Kind::Nil);
        let c = TypeDesc::of::<i32>(Kind::Uint(32));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.name(), "u32");
    }
}
