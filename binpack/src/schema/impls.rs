//! Blanket implementations for std types.
use {
    super::*,
    core::{hash::BuildHasher, mem::size_of, time::Duration},
    std::{
        collections::{BTreeMap, HashMap},
        rc::Rc,
        sync::{
            Arc,
            mpsc::{Receiver, Sender, SyncSender},
        },
    },
};

macro_rules! impl_int {
    ($($ty:ty => $kind:ident as $wide:ty),+ $(,)?) => {
        $(
            impl Pack for $ty {
                #[inline]
                fn type_desc() -> TypeDesc {
                    TypeDesc::of::<Self>(Kind::$kind(<$ty>::BITS))
                }

                #[inline]
                fn view(&self) -> ValueRef<'_> {
                    ValueRef::$kind(*self as $wide)
                }

                #[inline]
                fn view_mut(&mut self) -> ValueMut<'_> {
                    ValueMut::$kind(self.into())
                }
            }
        )+
    };
}

impl_int! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    isize => Int as i64,
    u8 => Uint as u64,
    u16 => Uint as u64,
    u32 => Uint as u64,
    u64 => Uint as u64,
    usize => Uint as u64,
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Pack for $ty {
                #[inline]
                fn type_desc() -> TypeDesc {
                    TypeDesc::of::<Self>(Kind::$variant)
                }

                #[inline]
                fn view(&self) -> ValueRef<'_> {
                    ValueRef::$variant(*self)
                }

                #[inline]
                fn view_mut(&mut self) -> ValueMut<'_> {
                    ValueMut::$variant(self)
                }
            }
        )+
    };
}

impl_scalar! {
    bool => Bool,
    f32 => F32,
    f64 => F64,
}

impl Pack for String {
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::String)
    }

    #[inline]
    fn view(&self) -> ValueRef<'_> {
        ValueRef::Str(self)
    }

    #[inline]
    fn view_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Str(self)
    }
}

impl Pack for () {
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Nil)
    }

    fn view(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn view_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }
}

impl<T: Pack + Default> Pack for Vec<T> {
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Slice { elem: T::type_desc })
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

impl<T: Pack + Default> SeqRef for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Pack> {
        self.as_slice().get(index).map(|elem| elem as &dyn Pack)
    }

    #[inline]
    fn as_bytes(&self) -> Option<&[u8]> {
        (self as &dyn Any)
            .downcast_ref::<Vec<u8>>()
            .map(Vec::as_slice)
    }
}

impl<T: Pack + Default> SeqMut for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn elem_size(&self) -> usize {
        size_of::<T>()
    }

    fn reset(&mut self, _len: usize, reserve: usize) -> bool {
        self.clear();
        self.reserve_exact(reserve);
        true
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Pack> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|elem| elem as &mut dyn Pack)
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut dyn Pack> {
        if index == Vec::len(self) {
            self.push(T::default());
        }
        SeqMut::get_mut(self, index)
    }

    #[inline]
    fn byte_sink(&mut self) -> Option<ByteSink<'_>> {
        (self as &mut dyn Any)
            .downcast_mut::<Vec<u8>>()
            .map(ByteSink::Vec)
    }
}

impl<T: Pack, const N: usize> Pack for [T; N] {
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Array {
            len: N,
            elem: T::type_desc,
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

impl<T: Pack, const N: usize> SeqRef for [T; N] {
    #[inline]
    fn len(&self) -> usize {
        N
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Pack> {
        self.as_slice().get(index).map(|elem| elem as &dyn Pack)
    }
}

impl<T: Pack, const N: usize> SeqMut for [T; N] {
    #[inline]
    fn len(&self) -> usize {
        N
    }

    #[inline]
    fn elem_size(&self) -> usize {
        size_of::<T>()
    }

    #[inline]
    fn reset(&mut self, len: usize, _reserve: usize) -> bool {
        len == N
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Pack> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|elem| elem as &mut dyn Pack)
    }
}

impl<T: Pack + Default> Pack for Option<T> {
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Pointer { elem: T::type_desc })
    }

    #[inline]
    fn view(&self) -> ValueRef<'_> {
        ValueRef::Pointer(self.as_ref().map(|value| value as &dyn Pack))
    }

    #[inline]
    fn view_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Pointer(self)
    }
}

impl<T: Pack + Default> PointerMut for Option<T> {
    #[inline]
    fn is_set(&self) -> bool {
        self.is_some()
    }

    #[inline]
    fn clear(&mut self) {
        *self = None;
    }

    #[inline]
    fn get_or_alloc(&mut self) -> &mut dyn Pack {
        self.get_or_insert_with(T::default)
    }
}

// Owning pointers are transparent: they encode exactly like their pointee but keep their own
// identity in the schema cache.

impl<T: Pack> Pack for Box<T> {
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(T::type_desc().kind)
    }

    #[inline]
    fn view(&self) -> ValueRef<'_> {
        (**self).view()
    }

    #[inline]
    fn view_mut(&mut self) -> ValueMut<'_> {
        (**self).view_mut()
    }
}

macro_rules! impl_shared {
    ($($ptr:ident),+) => {
        $(
            impl<T: Pack> Pack for $ptr<T> {
                #[inline]
                fn type_desc() -> TypeDesc {
                    TypeDesc::of::<Self>(T::type_desc().kind)
                }

                #[inline]
                fn view(&self) -> ValueRef<'_> {
                    (**self).view()
                }

                fn view_mut(&mut self) -> ValueMut<'_> {
                    match $ptr::get_mut(self) {
                        Some(value) => value.view_mut(),
                        None => ValueMut::Shared,
                    }
                }
            }
        )+
    };
}

impl_shared!(Arc, Rc);

impl<K, V, S> Pack for HashMap<K, V, S>
where
    K: Pack + Default + Eq + Hash,
    V: Pack + Default,
    S: BuildHasher + Default + 'static,
{
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Map {
            key: K::type_desc,
            value: V::type_desc,
        })
    }

    #[inline]
    fn view(&self) -> ValueRef<'_> {
        ValueRef::Map(self)
    }

    #[inline]
    fn view_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Map(self)
    }
}

impl<K, V, S> MapRef for HashMap<K, V, S>
where
    K: Pack + Default + Eq + Hash,
    V: Pack + Default,
    S: BuildHasher + Default + 'static,
{
    #[inline]
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(&dyn Pack, &dyn Pack) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|(key, value)| f(key, value))
    }
}

impl<K, V, S> MapMut for HashMap<K, V, S>
where
    K: Pack + Default + Eq + Hash,
    V: Pack + Default,
    S: BuildHasher + Default + 'static,
{
    #[inline]
    fn entry_size(&self) -> usize {
        size_of::<(K, V)>()
    }

    fn rebuild(
        &mut self,
        len: usize,
        reserve: usize,
        f: &mut dyn FnMut(&mut dyn Pack, &mut dyn Pack) -> Result<()>,
    ) -> Result<()> {
        let mut map = HashMap::with_capacity_and_hasher(reserve, S::default());
        for _ in 0..len {
            let mut key = K::default();
            let mut value = V::default();
            f(&mut key, &mut value)?;
            map.insert(key, value);
        }
        *self = map;
        Ok(())
    }
}

impl<K, V> Pack for BTreeMap<K, V>
where
    K: Pack + Default + Ord,
    V: Pack + Default,
{
    #[inline]
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Map {
            key: K::type_desc,
            value: V::type_desc,
        })
    }

    #[inline]
    fn view(&self) -> ValueRef<'_> {
        ValueRef::Map(self)
    }

    #[inline]
    fn view_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Map(self)
    }
}

impl<K, V> MapRef for BTreeMap<K, V>
where
    K: Pack + Default + Ord,
    V: Pack + Default,
{
    #[inline]
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(&dyn Pack, &dyn Pack) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|(key, value)| f(key, value))
    }
}

impl<K, V> MapMut for BTreeMap<K, V>
where
    K: Pack + Default + Ord,
    V: Pack + Default,
{
    #[inline]
    fn entry_size(&self) -> usize {
        size_of::<(K, V)>()
    }

    fn rebuild(
        &mut self,
        len: usize,
        _reserve: usize,
        f: &mut dyn FnMut(&mut dyn Pack, &mut dyn Pack) -> Result<()>,
    ) -> Result<()> {
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let mut key = K::default();
            let mut value = V::default();
            f(&mut key, &mut value)?;
            map.insert(key, value);
        }
        *self = map;
        Ok(())
    }
}

/// Seconds as a little-endian `u64` followed by nanoseconds as a little-endian `u32`.
impl BinaryMarshal for Duration {
    fn marshal_binary(&self) -> core::result::Result<Vec<u8>, BoxError> {
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&self.as_secs().to_le_bytes());
        out.extend_from_slice(&self.subsec_nanos().to_le_bytes());
        Ok(out)
    }

    fn unmarshal_binary(&mut self, data: &[u8]) -> core::result::Result<(), BoxError> {
        let (secs, nanos) = data
            .split_first_chunk::<8>()
            .and_then(|(secs, rest)| Some((secs, <&[u8; 4]>::try_from(rest).ok()?)))
            .ok_or("duration payload must be 12 bytes")?;
        let nanos = u32::from_le_bytes(*nanos);
        if nanos >= 1_000_000_000 {
            return Err("duration nanoseconds out of range".into());
        }
        *self = Duration::new(u64::from_le_bytes(*secs), nanos);
        Ok(())
    }
}

impl Pack for Duration {
    fn type_desc() -> TypeDesc {
        TypeDesc::of::<Self>(Kind::Custom)
    }

    fn view(&self) -> ValueRef<'_> {
        ValueRef::Custom(self)
    }

    fn view_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Custom(self)
    }
}

macro_rules! impl_opaque {
    ($kind:ident => $($ty:ty $(, $param:ident)*);+ $(;)?) => {
        $(
            impl<$($param: 'static),*> Pack for $ty {
                fn type_desc() -> TypeDesc {
                    TypeDesc::of::<Self>(Kind::$kind)
                }

                fn view(&self) -> ValueRef<'_> {
                    ValueRef::Opaque
                }

                fn view_mut(&mut self) -> ValueMut<'_> {
                    ValueMut::Opaque
                }
            }
        )+
    };
}

impl_opaque! {
    Channel =>
    Sender<T>, T;
    SyncSender<T>, T;
    Receiver<T>, T;
}

impl_opaque! {
    Func =>
    fn() -> R, R;
    fn(A) -> R, A, R;
    fn(A, B) -> R, A, B, R;
    fn(A, B, C) -> R, A, B, C, R;
}
