//! Per-engine schema cache.
use {
    crate::{
        codec::Codec,
        error::Result,
        scanner::scan,
        schema::{Pack, TypeDesc},
    },
    core::any::TypeId,
    parking_lot::RwLock,
    std::{
        collections::{HashMap, VecDeque},
        sync::Arc,
    },
    tracing::{debug, trace},
};

/// Bounded map from type to codec.
///
/// Lookups share a read lock. On overflow the oldest insertion is evicted, regardless of how
/// recently it was used.
#[derive(Debug)]
pub struct SchemaCache {
    capacity: usize,
    entries: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    codecs: HashMap<TypeId, Arc<Codec>>,
    /// Insertion order, oldest first.
    order: VecDeque<(TypeId, &'static str)>,
}

impl SchemaCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.entries.read().codecs.contains_key(&id)
    }

    pub fn get(&self, id: TypeId) -> Option<Arc<Codec>> {
        self.entries.read().codecs.get(&id).cloned()
    }

    /// Store the codec for `desc`.
    ///
    /// A type already present has its codec replaced and keeps its place in the eviction order.
    pub fn insert(&self, desc: &TypeDesc, codec: Arc<Codec>) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write();
        let Entries { codecs, order } = &mut *entries;
        if let Some(slot) = codecs.get_mut(&desc.id()) {
            *slot = codec;
            return;
        }
        while order.len() >= self.capacity {
            let Some((evicted, name)) = order.pop_front() else {
                break;
            };
            codecs.remove(&evicted);
            debug!(evicted = name, capacity = self.capacity, "schema cache full, evicted oldest codec");
        }
        order.push_back((desc.id(), desc.name()));
        codecs.insert(desc.id(), codec);
    }

    /// The codec for `T`, scanning and caching it on first use.
    pub fn resolve<T: Pack>(&self) -> Result<Arc<Codec>> {
        match self.get(TypeId::of::<T>()) {
            Some(codec) => Ok(codec),
            None => self.resolve_desc(&T::type_desc()),
        }
    }

    /// The codec for `desc`, scanning and caching it on first use.
    ///
    /// Concurrent misses for the same type may each scan; the results are identical and the
    /// cache ends up holding one of them.
    pub fn resolve_desc(&self, desc: &TypeDesc) -> Result<Arc<Codec>> {
        if let Some(codec) = self.get(desc.id()) {
            return Ok(codec);
        }
        let codec = Arc::new(scan(desc)?);
        trace!(ty = desc.name(), "scanned codec");
        self.insert(desc, Arc::clone(&codec));
        Ok(codec)
    }

    /// Drop every cached codec.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.codecs.clear();
        entries.order.clear();
    }
}
