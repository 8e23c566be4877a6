// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Provides a simple in-memory implementation of [`ContentStore`].
//!
//! The [`MemStore`] keeps every value once per content digest, and an index from key to digest.
//! It's primarily intended for testing and demonstration purposes.

use std::collections::BTreeMap;
use std::io;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use futures_util::StreamExt;
use log::debug;
use log::warn;

use crate::content_store::ContentRef;
use crate::content_store::ContentStore;
use crate::content_store::IndexEntry;
use crate::content_store::Metadata;
use crate::content_store::VerifyOptions;
use crate::content_store::VerifyStats;
use crate::key::StoreKey;
use crate::key::StoreValue;
use crate::IOResultStream;

/// Compute the content reference of a value: the hex blake3 digest of its bytes.
pub fn content_ref_of(value: &[u8]) -> ContentRef {
    ContentRef(blake3::hash(value).to_hex().to_string())
}

#[derive(Debug, Clone)]
struct Content<V> {
    value: V,

    /// Number of index entries pointing to this content.
    refs: usize,
}

#[derive(Debug)]
struct Inner<K, V> {
    index: BTreeMap<K, IndexEntry<K>>,
    content: BTreeMap<ContentRef, Content<V>>,
}

impl<K, V> Default for Inner<K, V> {
    fn default() -> Self {
        Self {
            index: BTreeMap::new(),
            content: BTreeMap::new(),
        }
    }
}

impl<K: StoreKey, V> Inner<K, V> {
    /// Drop one reference to a content, removing it when it is no longer referenced.
    fn unref(&mut self, content_ref: &ContentRef) {
        let Some(c) = self.content.get_mut(content_ref) else {
            warn!("MemStore: unref missing content {}", content_ref);
            return;
        };

        c.refs = c.refs.saturating_sub(1);
        if c.refs == 0 {
            self.content.remove(content_ref);
        }
    }
}

/// An in-memory content-addressed store.
///
/// `list()` yields entries in content digest order, which is unrelated to key order.
///
/// # Examples
///
/// ```
/// use std::io;
///
/// use cas_cursor::impls::mem_store::MemStore;
/// use cas_cursor::ContentStore;
///
/// #[tokio::main]
/// async fn main() -> io::Result<()> {
///     let store = MemStore::<String, Vec<u8>>::default();
///
///     store
///         .put("key1".to_string(), b"value1".to_vec(), Default::default())
///         .await?;
///
///     let value = store.get(&"key1".to_string()).await?;
///     assert_eq!(value, Some(b"value1".to_vec()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MemStore<K, V = Vec<u8>> {
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> Default for MemStore<K, V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl<K, V> MemStore<K, V>
where
    K: StoreKey,
    V: StoreValue + AsRef<[u8]>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from key-value pairs, with empty metadata.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let s = Self::default();
        {
            let mut inner = s.lock();
            for (k, v) in pairs {
                Self::insert(&mut inner, k, v, Metadata::new());
            }
        }
        s
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct content blobs.
    pub fn content_count(&self) -> usize {
        self.lock().content.len()
    }

    /// Replace the stored bytes of a content without updating its digest.
    #[cfg(test)]
    pub(crate) fn corrupt(&self, content_ref: &ContentRef, value: V) {
        let mut inner = self.lock();
        if let Some(c) = inner.content.get_mut(content_ref) {
            c.value = value;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(inner: &mut Inner<K, V>, key: K, value: V, metadata: Metadata) -> IndexEntry<K> {
        let content_ref = content_ref_of(value.as_ref());

        let entry = IndexEntry {
            key: key.clone(),
            content_ref: content_ref.clone(),
            size: value.as_ref().len() as u64,
            created_at: now_millis(),
            metadata,
        };

        inner
            .content
            .entry(content_ref)
            .or_insert(Content { value, refs: 0 })
            .refs += 1;

        if let Some(prev) = inner.index.insert(key, entry.clone()) {
            inner.unref(&prev.content_ref);
        }

        entry
    }
}

#[async_trait::async_trait]
impl<K, V> ContentStore for MemStore<K, V>
where
    K: StoreKey,
    V: StoreValue + AsRef<[u8]>,
{
    type Key = K;
    type Value = V;

    async fn list(&self) -> Result<IOResultStream<IndexEntry<K>>, io::Error> {
        // MemStore is borrowed. It has to copy the entries to make the returning stream static.
        let entries = {
            let inner = self.lock();

            let mut entries = inner.index.values().cloned().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.content_ref.cmp(&b.content_ref));
            entries
        };

        let strm = futures::stream::iter(entries).map(Ok).boxed();
        Ok(strm)
    }

    async fn get(&self, key: &K) -> Result<Option<V>, io::Error> {
        let inner = self.lock();

        let Some(entry) = inner.index.get(key) else {
            return Ok(None);
        };

        let got = inner.content.get(&entry.content_ref).map(|c| c.value.clone());
        if got.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "MemStore: key {:?} refers to missing content {}",
                    key, entry.content_ref
                ),
            ));
        }
        Ok(got)
    }

    async fn put(
        &self,
        key: K,
        value: V,
        metadata: Metadata,
    ) -> Result<IndexEntry<K>, io::Error> {
        let mut inner = self.lock();
        Ok(Self::insert(&mut inner, key, value, metadata))
    }

    async fn delete(&self, key: &K) -> Result<(), io::Error> {
        let mut inner = self.lock();
        if let Some(prev) = inner.index.remove(key) {
            inner.unref(&prev.content_ref);
        }
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), io::Error> {
        let mut inner = self.lock();
        *inner = Inner::default();
        Ok(())
    }

    async fn verify(&self, options: VerifyOptions) -> Result<VerifyStats, io::Error> {
        let mut inner = self.lock();

        let mut stats = VerifyStats {
            total_entries: inner.index.len() as u64,
            ..Default::default()
        };

        let mut bad = vec![];
        for (content_ref, c) in inner.content.iter() {
            if c.refs == 0 {
                stats.reclaimed_content += 1;
                bad.push(content_ref.clone());
            } else if &content_ref_of(c.value.as_ref()) != content_ref {
                stats.bad_content += 1;
                stats.reclaimed_content += 1;
                bad.push(content_ref.clone());
            } else {
                stats.verified_content += 1;
                stats.kept_size += c.value.as_ref().len() as u64;
            }
        }

        debug!("MemStore::verify: {:?}, dry_run: {}", stats, options.dry_run);

        if options.dry_run {
            return Ok(stats);
        }

        for content_ref in bad {
            inner.content.remove(&content_ref);
        }

        // Entries pointing to removed content are no longer readable.
        let Inner { index, content } = &mut *inner;
        index.retain(|_k, entry| content.contains_key(&entry.content_ref));

        Ok(stats)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
