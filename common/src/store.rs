//! Key-value store abstraction and the cached branch used for atomicity.
//!
//! Every keeper reads and writes through a `&mut dyn KvStore`. The host
//! hands the ante pipeline (and message execution) a [`CacheStore`]
//! branch; writes land in the branch and reach the parent only when
//! [`CacheStore::write`] is called, which happens on success only.

use std::collections::BTreeMap;

use crate::error::Result;

/// Minimal ordered key-value store.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// Returns every entry whose key starts with `prefix`, in key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory store backed by a `BTreeMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// A write-buffering branch over a parent store.
///
/// Reads see the branch's own writes first. Dropping the branch without
/// calling [`write`](CacheStore::write) discards every buffered change.
pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    // `None` marks a deletion.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of keys touched in this branch.
    pub fn dirty_len(&self) -> usize {
        self.writes.len()
    }

    /// Flushes buffered writes into the parent.
    pub fn write(self) {
        let CacheStore { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(v) => parent.set(&key, v),
                None => parent.delete(&key),
            }
        }
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(v) => v.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.iter_prefix(prefix).into_iter().collect();
        for (k, v) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match v {
                Some(v) => {
                    merged.insert(k.clone(), v.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        merged.into_iter().collect()
    }
}

/// Runs `f` against a fresh branch of `store` and commits the branch only
/// if `f` succeeds. On error nothing `f` wrote is visible in `store`.
pub fn with_cache_context<T, F>(store: &mut dyn KvStore, f: F) -> Result<T>
where
    F: FnOnce(&mut dyn KvStore) -> Result<T>,
{
    let mut branch = CacheStore::new(store);
    let out = f(&mut branch)?;
    log::trace!("committing cache branch with {} dirty keys", branch.dirty_len());
    branch.write();
    Ok(out)
}
