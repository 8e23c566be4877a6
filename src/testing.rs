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

//! Store wrappers for tests: call counting, latency and fault injection.

use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::content_store::ContentStore;
use crate::content_store::IndexEntry;
use crate::content_store::Metadata;
use crate::content_store::VerifyOptions;
use crate::content_store::VerifyStats;
use crate::impls::mem_store::MemStore;
use crate::IOResultStream;

/// Build a [`MemStore`] whose value of each key is the key bytes.
pub(crate) fn mem_store(keys: &[&str]) -> MemStore<String> {
    MemStore::from_pairs(keys.iter().map(|k| (k.to_string(), k.as_bytes().to_vec())))
}

/// A deterministic pseudo-random delay of 1-10 ms derived from the key.
///
/// It is never zero so that every delayed call is pending when first polled.
fn delay_of(key: &impl std::fmt::Debug) -> Duration {
    let digest = blake3::hash(format!("{:?}", key).as_bytes());
    Duration::from_millis((digest.as_bytes()[0] % 10) as u64 + 1)
}

/// Counts calls to the inner store and tracks the number of `get()` in flight.
#[derive(Debug, Default)]
pub(crate) struct CountingStore<S> {
    inner: S,
    latency: bool,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            latency: false,
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Delay every `get()`, `put()` and `delete()` by a per-key pseudo-random duration.
    pub(crate) fn with_latency(inner: S) -> Self {
        Self {
            latency: true,
            ..Self::new(inner)
        }
    }

    pub(crate) fn store(&self) -> &S {
        &self.inner
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(n, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    async fn maybe_sleep(&self, key: &impl std::fmt::Debug) {
        if self.latency {
            tokio::time::sleep(delay_of(key)).await;
        }
    }
}

#[async_trait::async_trait]
impl<S> ContentStore for CountingStore<S>
where S: ContentStore
{
    type Key = S::Key;
    type Value = S::Value;

    async fn list(&self) -> Result<IOResultStream<IndexEntry<S::Key>>, io::Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list().await
    }

    async fn get(&self, key: &S::Key) -> Result<Option<S::Value>, io::Error> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.enter();
        self.maybe_sleep(key).await;
        let got = self.inner.get(key).await;
        self.leave();
        got
    }

    async fn put(
        &self,
        key: S::Key,
        value: S::Value,
        metadata: Metadata,
    ) -> Result<IndexEntry<S::Key>, io::Error> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.enter();
        self.maybe_sleep(&key).await;
        let res = self.inner.put(key, value, metadata).await;
        self.leave();
        res
    }

    async fn delete(&self, key: &S::Key) -> Result<(), io::Error> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.enter();
        self.maybe_sleep(key).await;
        let res = self.inner.delete(key).await;
        self.leave();
        res
    }

    async fn remove_all(&self) -> Result<(), io::Error> {
        self.inner.remove_all().await
    }

    async fn verify(&self, options: VerifyOptions) -> Result<VerifyStats, io::Error> {
        self.inner.verify(options).await
    }
}

/// Injects failures into a [`CountingStore`] over a [`MemStore`].
#[derive(Debug)]
pub(crate) struct FailingStore {
    inner: CountingStore<MemStore<String>>,
    fail_list: bool,

    /// `get()` of these keys returns an I/O error.
    fail_get: BTreeSet<String>,

    /// `get()` of these keys returns `None`, as if deleted after listing.
    vanished: BTreeSet<String>,

    /// `put()` or `delete()` of these keys returns an I/O error.
    fail_write: BTreeSet<String>,
}

impl FailingStore {
    pub(crate) fn new(inner: MemStore<String>) -> Self {
        Self {
            inner: CountingStore::new(inner),
            fail_list: false,
            fail_get: BTreeSet::new(),
            vanished: BTreeSet::new(),
            fail_write: BTreeSet::new(),
        }
    }

    pub(crate) fn fail_list(inner: MemStore<String>) -> Self {
        Self {
            fail_list: true,
            ..Self::new(inner)
        }
    }

    pub(crate) fn fail_get(mut self, key: &str) -> Self {
        self.fail_get.insert(key.to_string());
        self
    }

    pub(crate) fn vanish(mut self, key: &str) -> Self {
        self.vanished.insert(key.to_string());
        self
    }

    pub(crate) fn fail_write(mut self, key: &str) -> Self {
        self.fail_write.insert(key.to_string());
        self
    }

    pub(crate) fn inner(&self) -> &CountingStore<MemStore<String>> {
        &self.inner
    }
}

#[async_trait::async_trait]
impl ContentStore for FailingStore {
    type Key = String;
    type Value = Vec<u8>;

    async fn list(&self) -> Result<IOResultStream<IndexEntry<String>>, io::Error> {
        let strm = self.inner.list().await?;
        if self.fail_list {
            return Err(io::Error::other("injected list failure"));
        }
        Ok(strm)
    }

    async fn get(&self, key: &String) -> Result<Option<Vec<u8>>, io::Error> {
        let got = self.inner.get(key).await?;
        if self.fail_get.contains(key) {
            return Err(io::Error::other("injected get failure"));
        }
        if self.vanished.contains(key) {
            return Ok(None);
        }
        Ok(got)
    }

    async fn put(
        &self,
        key: String,
        value: Vec<u8>,
        metadata: Metadata,
    ) -> Result<IndexEntry<String>, io::Error> {
        if self.fail_write.contains(&key) {
            return Err(io::Error::other("injected write failure"));
        }
        self.inner.put(key, value, metadata).await
    }

    async fn delete(&self, key: &String) -> Result<(), io::Error> {
        if self.fail_write.contains(key) {
            return Err(io::Error::other("injected write failure"));
        }
        self.inner.delete(key).await
    }

    async fn remove_all(&self) -> Result<(), io::Error> {
        self.inner.remove_all().await
    }

    async fn verify(&self, options: VerifyOptions) -> Result<VerifyStats, io::Error> {
        self.inner.verify(options).await
    }
}
