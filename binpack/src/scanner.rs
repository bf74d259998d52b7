//! Builds a [`Codec`] from a [`TypeDesc`].
use {
    crate::{
        codec::{Codec, FieldCodec, ScalarKind},
        error::{Error, Result, unsupported_type},
        schema::{FieldDesc, Kind, TypeDesc},
    },
    core::any::TypeId,
};

/// Build the codec for the described type.
///
/// The result depends only on the description. Any part of the type that cannot be encoded
/// (channels, functions, nil, self-referential structs) fails the whole scan.
///
/// ```
/// use binpack::{Codec, Pack, ScalarKind, scan};
///
/// let codec = scan(&<Vec<Option<u32>>>::type_desc()).unwrap();
/// assert_eq!(
///     codec,
///     Codec::SlicePtr {
///         elem: Box::new(Codec::Scalar(ScalarKind::Varuint)),
///         elem_type: "u32",
///     }
/// );
/// ```
pub fn scan(desc: &TypeDesc) -> Result<Codec> {
    Scanner::default().scan(desc)
}

#[derive(Default)]
struct Scanner {
    /// Structs currently being scanned, outermost first.
    in_progress: Vec<TypeId>,
}

impl Scanner {
    fn scan(&mut self, desc: &TypeDesc) -> Result<Codec> {
        if is_custom(desc) {
            return Ok(Codec::Custom);
        }
        match desc.kind() {
            Kind::Pointer { elem } => Ok(Codec::Pointer {
                elem: Box::new(self.scan(&elem())?),
            }),
            Kind::Array { len, elem } => Ok(Codec::Array {
                len: *len,
                elem: Box::new(self.scan(&elem())?),
            }),
            Kind::Slice { elem } => self.scan_slice(&elem()),
            Kind::Struct { fields } => self.scan_struct(desc, fields),
            Kind::Map { key, value } => Ok(Codec::Map {
                key: Box::new(self.scan(&key())?),
                value: Box::new(self.scan(&value())?),
            }),
            Kind::String => Ok(Codec::String),
            Kind::Bool => Ok(Codec::Scalar(ScalarKind::Bool)),
            Kind::Int(_) => Ok(Codec::Scalar(ScalarKind::Varint)),
            Kind::Uint(_) => Ok(Codec::Scalar(ScalarKind::Varuint)),
            Kind::F32 => Ok(Codec::Scalar(ScalarKind::Float32)),
            Kind::F64 => Ok(Codec::Scalar(ScalarKind::Float64)),
            Kind::Custom => Ok(Codec::Custom),
            Kind::Nil => Err(Error::NilType),
            Kind::Channel | Kind::Func => Err(unsupported_type(desc.name())),
        }
    }

    fn scan_slice(&mut self, elem: &TypeDesc) -> Result<Codec> {
        Ok(match elem.kind() {
            Kind::Uint(8) => Codec::ByteBlob,
            Kind::Bool => Codec::BoolSlice,
            Kind::Uint(_) => Codec::NumericSlice { signed: false },
            Kind::Int(_) => Codec::NumericSlice { signed: true },
            Kind::Pointer { elem: pointee } => {
                let pointee = pointee();
                Codec::SlicePtr {
                    elem: Box::new(self.scan(&pointee)?),
                    elem_type: pointee.name(),
                }
            }
            _ => Codec::Slice {
                elem: Box::new(self.scan(elem)?),
            },
        })
    }

    fn scan_struct(&mut self, desc: &TypeDesc, fields: &[FieldDesc]) -> Result<Codec> {
        if self.in_progress.contains(&desc.id()) {
            return Err(unsupported_type(desc.name()));
        }
        self.in_progress.push(desc.id());
        let fields = fields
            .iter()
            .filter_map(|field| Some((field.slot(), field.desc()?)))
            .map(|(slot, field)| {
                Ok(FieldCodec {
                    slot,
                    codec: self.scan(&field())?,
                })
            })
            .collect::<Result<Vec<_>>>();
        self.in_progress.pop();
        Ok(Codec::Struct { fields: fields? })
    }
}

/// Custom marshaling wins over every structural rule, for the type itself or a pointer to it.
fn is_custom(desc: &TypeDesc) -> bool {
    match desc.kind() {
        Kind::Custom => true,
        Kind::Pointer { elem } => matches!(elem().kind(), Kind::Custom),
        _ => false,
    }
}
