//! Codec plans and their traversal.
//!
//! A [`Codec`] is built once per type by [`scan`](crate::scan) and then drives every encode and
//! decode of that type. It holds no value data; values are reached through the views
//! [`Pack`] exposes.
use {
    crate::{
        decoder::Decoder,
        encoder::Encoder,
        error::{Error, Result, not_addressable, shape_mismatch},
        io::Source,
        schema::{ByteSink, Pack, SeqMut, SeqRef, ValueMut, ValueRef},
    },
    std::io::Write,
};

/// Scalar encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// One byte, `1` or `0`.
    Bool,
    /// Zigzag then unsigned varint.
    Varint,
    /// Unsigned varint.
    Varuint,
    /// IEEE-754 bits, 4 bytes little-endian.
    Float32,
    /// IEEE-754 bits, 8 bytes little-endian.
    Float64,
}

impl ScalarKind {
    const fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Varint => "varint",
            ScalarKind::Varuint => "varuint",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
        }
    }
}

/// A struct field and the codec of its type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCodec {
    pub slot: usize,
    pub codec: Codec,
}

/// Encoding plan for one type.
#[derive(Debug, Clone, PartialEq)]
pub enum Codec {
    Scalar(ScalarKind),
    /// Length-prefixed UTF-8.
    String,
    /// Length-prefixed raw bytes.
    ByteBlob,
    /// Count, then one byte per element.
    BoolSlice,
    /// Count, then one varint per element.
    NumericSlice { signed: bool },
    /// Elements only; the length is part of the type.
    Array { len: usize, elem: Box<Codec> },
    /// Count, then elements.
    Slice { elem: Box<Codec> },
    /// Count, then a nil flag per element followed by the element when present.
    SlicePtr {
        elem: Box<Codec>,
        elem_type: &'static str,
    },
    /// Nil flag, then the pointee when present.
    Pointer { elem: Box<Codec> },
    /// Fields in declaration order, skipped fields omitted.
    Struct { fields: Vec<FieldCodec> },
    /// Count, then key/value pairs in iteration order.
    Map { key: Box<Codec>, value: Box<Codec> },
    /// Length-prefixed payload produced by [`BinaryMarshal`](crate::BinaryMarshal).
    Custom,
}

impl Codec {
    /// Write `value` to `e` according to this plan.
    ///
    /// Write failures are recorded in the encoder; the error returned here only covers values
    /// the plan cannot represent and failing marshalers.
    pub fn encode<W: Write>(&self, e: &mut Encoder<W>, value: &dyn Pack) -> Result<()> {
        match self {
            Codec::Scalar(kind) => encode_scalar(*kind, e, value.view()),
            Codec::String => {
                let ValueRef::Str(s) = value.view() else {
                    return Err(shape_mismatch("string"));
                };
                e.write_string(s);
                Ok(())
            }
            Codec::ByteBlob => {
                let seq = seq_ref(value, "byte blob")?;
                match seq.as_bytes() {
                    Some(bytes) => {
                        e.write_bytes(bytes);
                        Ok(())
                    }
                    None => encode_elems(e, seq, true, |e, elem| match elem.view() {
                        ValueRef::Uint(v) => {
                            let byte = u8::try_from(v).map_err(|_| shape_mismatch("byte"))?;
                            e.write(&[byte]);
                            Ok(())
                        }
                        _ => Err(shape_mismatch("byte")),
                    }),
                }
            }
            Codec::BoolSlice => encode_elems(e, seq_ref(value, "bool slice")?, true, |e, elem| {
                encode_scalar(ScalarKind::Bool, e, elem.view())
            }),
            Codec::NumericSlice { signed } => {
                let kind = if *signed {
                    ScalarKind::Varint
                } else {
                    ScalarKind::Varuint
                };
                encode_elems(e, seq_ref(value, "numeric slice")?, true, |e, elem| {
                    encode_scalar(kind, e, elem.view())
                })
            }
            Codec::Array { elem, .. } => {
                encode_elems(e, seq_ref(value, "array")?, false, |e, v| elem.encode(e, v))
            }
            Codec::Slice { elem } => {
                encode_elems(e, seq_ref(value, "slice")?, true, |e, v| elem.encode(e, v))
            }
            Codec::SlicePtr { elem, .. } => {
                encode_elems(e, seq_ref(value, "pointer slice")?, true, |e, v| {
                    encode_pointer(elem, e, v.view())
                })
            }
            Codec::Pointer { elem } => encode_pointer(elem, e, value.view()),
            Codec::Struct { fields } => {
                let ValueRef::Struct(s) = value.view() else {
                    return Err(shape_mismatch("struct"));
                };
                for field in fields {
                    let v = s.field(field.slot).ok_or_else(|| shape_mismatch("struct"))?;
                    field.codec.encode(e, v)?;
                }
                Ok(())
            }
            Codec::Map { key, value: val } => {
                let ValueRef::Map(map) = value.view() else {
                    return Err(shape_mismatch("map"));
                };
                e.write_uvarint(map.len() as u64);
                map.for_each_entry(&mut |k, v| {
                    key.encode(e, k)?;
                    val.encode(e, v)
                })
            }
            Codec::Custom => encode_custom(e, value),
        }
    }

    /// Read a value from `d` into `dst` according to this plan.
    pub fn decode<S: Source>(&self, d: &mut Decoder<S>, dst: &mut dyn Pack) -> Result<()> {
        match self {
            Codec::Scalar(kind) => decode_scalar(*kind, d, dst),
            Codec::String => match dst.view_mut() {
                ValueMut::Str(s) => d.read_string_into(s),
                ValueMut::Shared => Err(not_addressable("String")),
                _ => Err(shape_mismatch("string")),
            },
            Codec::ByteBlob => {
                let seq = seq_mut(dst, "byte blob")?;
                let len = d.read_byte_len()?;
                match seq.byte_sink() {
                    Some(ByteSink::Vec(v)) => {
                        v.clear();
                        v.extend_from_slice(d.read_slice(len)?);
                        Ok(())
                    }
                    Some(ByteSink::Shared(b)) => {
                        *b = d.read_shared(len)?;
                        Ok(())
                    }
                    None => decode_elems(d, seq, len, |d, elem| match elem.view_mut() {
                        ValueMut::Uint(v) => v.set(u64::from(d.read_u8()?)),
                        ValueMut::Shared => Err(not_addressable("byte")),
                        _ => Err(shape_mismatch("byte")),
                    }),
                }
            }
            Codec::BoolSlice => {
                let seq = seq_mut(dst, "bool slice")?;
                let len = d.read_len(seq.elem_size())?;
                decode_elems(d, seq, len, |d, elem| decode_scalar(ScalarKind::Bool, d, elem))
            }
            Codec::NumericSlice { signed } => {
                let kind = if *signed {
                    ScalarKind::Varint
                } else {
                    ScalarKind::Varuint
                };
                let seq = seq_mut(dst, "numeric slice")?;
                let len = d.read_len(seq.elem_size())?;
                decode_elems(d, seq, len, |d, elem| decode_scalar(kind, d, elem))
            }
            Codec::Array { len, elem } => {
                let seq = seq_mut(dst, "array")?;
                decode_elems(d, seq, *len, |d, v| elem.decode(d, v))
            }
            Codec::Slice { elem } => {
                let seq = seq_mut(dst, "slice")?;
                let len = d.read_len(seq.elem_size())?;
                decode_elems(d, seq, len, |d, v| elem.decode(d, v))
            }
            Codec::SlicePtr { elem, .. } => {
                let seq = seq_mut(dst, "pointer slice")?;
                let len = d.read_len(seq.elem_size())?;
                decode_elems(d, seq, len, |d, v| decode_pointer(elem, d, v))
            }
            Codec::Pointer { elem } => decode_pointer(elem, d, dst),
            Codec::Struct { fields } => {
                let s = match dst.view_mut() {
                    ValueMut::Struct(s) => s,
                    ValueMut::Shared => return Err(not_addressable("struct")),
                    _ => return Err(shape_mismatch("struct")),
                };
                for field in fields {
                    let v = s
                        .field_mut(field.slot)
                        .ok_or_else(|| shape_mismatch("struct"))?;
                    field.codec.decode(d, v)?;
                }
                Ok(())
            }
            Codec::Map { key, value } => {
                let map = match dst.view_mut() {
                    ValueMut::Map(map) => map,
                    ValueMut::Shared => return Err(not_addressable("map")),
                    _ => return Err(shape_mismatch("map")),
                };
                let len = d.read_len(map.entry_size())?;
                let reserve = d.reserve_hint(len, map.entry_size());
                map.rebuild(len, reserve, &mut |k, v| {
                    key.decode(d, k)?;
                    value.decode(d, v)
                })
            }
            Codec::Custom => decode_custom(d, dst),
        }
    }
}

fn seq_ref<'a>(value: &'a dyn Pack, expected: &'static str) -> Result<&'a dyn SeqRef> {
    match value.view() {
        ValueRef::Seq(seq) => Ok(seq),
        _ => Err(shape_mismatch(expected)),
    }
}

fn seq_mut<'a>(dst: &'a mut dyn Pack, expected: &'static str) -> Result<&'a mut dyn SeqMut> {
    match dst.view_mut() {
        ValueMut::Seq(seq) => Ok(seq),
        ValueMut::Shared => Err(not_addressable(expected)),
        _ => Err(shape_mismatch(expected)),
    }
}

fn encode_elems<W: Write>(
    e: &mut Encoder<W>,
    seq: &dyn SeqRef,
    with_len: bool,
    mut f: impl FnMut(&mut Encoder<W>, &dyn Pack) -> Result<()>,
) -> Result<()> {
    let len = seq.len();
    if with_len {
        e.write_uvarint(len as u64);
    }
    for i in 0..len {
        let elem = seq.get(i).ok_or_else(|| shape_mismatch("sequence"))?;
        f(e, elem)?;
    }
    Ok(())
}

/// Refill `seq` with `len` elements decoded in order. Growable sequences start from a capped
/// reservation and grow as elements arrive.
fn decode_elems<S: Source>(
    d: &mut Decoder<S>,
    seq: &mut dyn SeqMut,
    len: usize,
    mut f: impl FnMut(&mut Decoder<S>, &mut dyn Pack) -> Result<()>,
) -> Result<()> {
    let reserve = d.reserve_hint(len, seq.elem_size());
    if !seq.reset(len, reserve) {
        return Err(shape_mismatch("sequence"));
    }
    for i in 0..len {
        let elem = seq.slot_mut(i).ok_or_else(|| shape_mismatch("sequence"))?;
        f(d, elem)?;
    }
    Ok(())
}

fn encode_scalar<W: Write>(kind: ScalarKind, e: &mut Encoder<W>, value: ValueRef<'_>) -> Result<()> {
    match (kind, value) {
        (ScalarKind::Bool, ValueRef::Bool(v)) => e.write_bool(v),
        (ScalarKind::Varint, ValueRef::Int(v)) => e.write_varint(v),
        (ScalarKind::Varuint, ValueRef::Uint(v)) => e.write_uvarint(v),
        (ScalarKind::Float32, ValueRef::F32(v)) => e.write_f32(v),
        (ScalarKind::Float64, ValueRef::F64(v)) => e.write_f64(v),
        _ => return Err(shape_mismatch(kind.name())),
    }
    Ok(())
}

fn decode_scalar<S: Source>(kind: ScalarKind, d: &mut Decoder<S>, dst: &mut dyn Pack) -> Result<()> {
    match (kind, dst.view_mut()) {
        (ScalarKind::Bool, ValueMut::Bool(v)) => *v = d.read_bool()?,
        (ScalarKind::Varint, ValueMut::Int(v)) => v.set(d.read_varint()?)?,
        (ScalarKind::Varuint, ValueMut::Uint(v)) => v.set(d.read_uvarint()?)?,
        (ScalarKind::Float32, ValueMut::F32(v)) => *v = d.read_f32()?,
        (ScalarKind::Float64, ValueMut::F64(v)) => *v = d.read_f64()?,
        (_, ValueMut::Shared) => return Err(not_addressable(kind.name())),
        _ => return Err(shape_mismatch(kind.name())),
    }
    Ok(())
}

fn encode_pointer<W: Write>(elem: &Codec, e: &mut Encoder<W>, value: ValueRef<'_>) -> Result<()> {
    match value {
        ValueRef::Pointer(None) => {
            e.write_bool(true);
            Ok(())
        }
        ValueRef::Pointer(Some(v)) => {
            e.write_bool(false);
            elem.encode(e, v)
        }
        _ => Err(shape_mismatch("pointer")),
    }
}

fn decode_pointer<S: Source>(elem: &Codec, d: &mut Decoder<S>, dst: &mut dyn Pack) -> Result<()> {
    let ptr = match dst.view_mut() {
        ValueMut::Pointer(ptr) => ptr,
        ValueMut::Shared => return Err(not_addressable("pointer")),
        _ => return Err(shape_mismatch("pointer")),
    };
    if d.read_bool()? {
        ptr.clear();
        return Ok(());
    }
    elem.decode(d, ptr.get_or_alloc())
}

fn encode_custom<W: Write>(e: &mut Encoder<W>, value: &dyn Pack) -> Result<()> {
    let marshaler = match value.view() {
        ValueRef::Custom(m) => m,
        // A nil pointer carries an empty payload and the marshaler is never invoked.
        ValueRef::Pointer(None) => {
            e.write_uvarint(0);
            return Ok(());
        }
        ValueRef::Pointer(Some(inner)) => match inner.view() {
            ValueRef::Custom(m) => m,
            _ => return Err(shape_mismatch("custom")),
        },
        _ => return Err(shape_mismatch("custom")),
    };
    let payload = marshaler
        .marshal_binary()
        .map_err(Error::Marshal)?;
    e.write_bytes(&payload);
    Ok(())
}

fn decode_custom<S: Source>(d: &mut Decoder<S>, dst: &mut dyn Pack) -> Result<()> {
    let len = d.read_byte_len()?;
    let payload = d.read_slice(len)?;
    let unmarshaler = match dst.view_mut() {
        ValueMut::Custom(m) => m,
        ValueMut::Pointer(ptr) => match ptr.get_or_alloc().view_mut() {
            ValueMut::Custom(m) => m,
            ValueMut::Shared => return Err(not_addressable("custom")),
            _ => return Err(shape_mismatch("custom")),
        },
        ValueMut::Shared => return Err(not_addressable("custom")),
        _ => return Err(shape_mismatch("custom")),
    };
    unmarshaler
        .unmarshal_binary(payload)
        .map_err(Error::Unmarshal)
}
