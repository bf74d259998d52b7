use crate::schema::*;

/// Encodes as a byte blob. Decoding from a [`Bytes`] input yields a view of the input buffer.
impl Pack for Bytes {
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Slice {
            elem: <u8 as Pack>::type_desc,
        })
    }

    #[inline]
    fn view(&self) -> ValueRef<'_> {
        ValueRef::Seq(self)
    }

    #[inline]
    fn view_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Seq(self)
    }
}

impl SeqRef for Bytes {
    #[inline]
    fn len(&self) -> usize {
        Bytes::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Pack> {
        self.as_ref().get(index).map(|byte| byte as &dyn Pack)
    }

    #[inline]
    fn as_bytes(&self) -> Option<&[u8]> {
        Some(self.as_ref())
    }
}

impl SeqMut for Bytes {
    #[inline]
    fn len(&self) -> usize {
        Bytes::len(self)
    }

    #[inline]
    fn elem_size(&self) -> usize {
        1
    }

    fn reset(&mut self, _len: usize, _reserve: usize) -> bool {
        *self = Bytes::new();
        true
    }

    /// Always `None`; the contents are immutable. Writes go through [`SeqMut::byte_sink`].
    #[inline]
    fn get_mut(&mut self, _index: usize) -> Option<&mut dyn Pack> {
        None
    }

    #[inline]
    fn byte_sink(&mut self) -> Option<ByteSink<'_>> {
        Some(ByteSink::Shared(self))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{Engine, decode, encode, proptest_config::proptest_cfg},
        proptest::prelude::*,
    };

    #[test]
    fn test_static() {
        let bytes = Bytes::from_static(b"hello");
        let serialized = encode(&bytes).unwrap();
        assert_eq!(serialized, b"\x05hello");
        let mut deserialized = Bytes::new();
        decode(&serialized, &mut deserialized).unwrap();
        assert_eq!(deserialized, bytes);
    }

    #[test]
    fn test_zero_copy_from_shared_input() {
        let engine = Engine::new();
        let input = Bytes::from(engine.encode(&Bytes::from_static(&[7u8; 32])).unwrap());
        let mut decoded = Bytes::new();
        engine.decode_shared(&input, &mut decoded).unwrap();
        assert_eq!(decoded.as_ptr(), input[1..].as_ptr());
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn test_dynamic() {
        proptest!(proptest_cfg(), |(data: Vec<u8>)| {
            let bytes = Bytes::from_owner(data.clone());

            let serialized_bytes = encode(&bytes).unwrap();
            let serialized_vec = encode(&data).unwrap();
            prop_assert_eq!(&serialized_bytes, &serialized_vec);

            let mut deserialized = Bytes::new();
            decode(&serialized_bytes, &mut deserialized).unwrap();
            prop_assert_eq!(deserialized, bytes);
        })
    }
}
