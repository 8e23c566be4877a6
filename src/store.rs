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

//! An ordered record store over a [`ContentStore`].

use std::io;
use std::sync::Arc;

use log::debug;

use crate::batch_ops;
use crate::batch_ops::BatchOp;
use crate::batch_ops::OpRun;
use crate::batch_resolver;
use crate::bounds::RangeOptions;
use crate::content_store::ContentStore;
use crate::content_store::IndexEntry;
use crate::content_store::Metadata;
use crate::content_store::VerifyOptions;
use crate::content_store::VerifyStats;
use crate::cursor::EntryCursor;
use crate::cursor::KeyCursor;
use crate::cursor::ValueCursor;
use crate::errors::CursorError;
use crate::options::CursorOptions;
use crate::options::StoreOptions;

/// A key-ordered record store.
///
/// Point operations go straight to the underlying [`ContentStore`].
/// Range reads are served by cursors over a snapshot of its keys.
#[derive(Debug)]
pub struct OrderedStore<S> {
    store: Arc<S>,
    options: StoreOptions,
}

impl<S> Clone for OrderedStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            options: self.options,
        }
    }
}

impl<S> OrderedStore<S>
where S: ContentStore
{
    pub fn new(store: S) -> Self {
        Self::with_options(Arc::new(store), StoreOptions::default())
    }

    pub fn with_options(store: Arc<S>, options: StoreOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Cursor options with `batch_size` and `concurrency` taken from this store.
    pub fn cursor_options(&self) -> CursorOptions<S::Key> {
        CursorOptions::new()
            .batch_size(self.options.batch_size)
            .concurrency(self.options.concurrency)
    }

    pub async fn get(&self, key: &S::Key) -> Result<Option<S::Value>, io::Error> {
        self.store.get(key).await
    }

    pub async fn put(
        &self,
        key: S::Key,
        value: S::Value,
        metadata: Metadata,
    ) -> Result<IndexEntry<S::Key>, io::Error> {
        self.store.put(key, value, metadata).await
    }

    pub async fn delete(&self, key: &S::Key) -> Result<(), io::Error> {
        self.store.delete(key).await
    }

    /// Get the values of `keys` in their order, `None` for an absent key.
    pub async fn get_many(&self, keys: &[S::Key]) -> Result<Vec<Option<S::Value>>, CursorError> {
        let concurrency = self.options.effective_concurrency();
        batch_resolver::resolve_optional(self.store.as_ref(), keys, concurrency).await
    }

    /// Apply mixed puts and deletes.
    ///
    /// See [`batch_ops`] for the ordering guarantee.
    pub async fn batch(
        &self,
        ops: impl IntoIterator<Item = BatchOp<S::Key, S::Value>>,
    ) -> Result<(), CursorError> {
        let concurrency = self.options.effective_concurrency();
        batch_ops::apply(self.store.as_ref(), ops, concurrency).await
    }

    /// Delete every key in `range`, `batch_size` keys at a time.
    ///
    /// Keys are taken from a snapshot listed when clearing starts:
    /// a key added to the range meanwhile is not deleted.
    /// Returns the number of keys deleted.
    pub async fn clear(&self, range: RangeOptions<S::Key>) -> Result<usize, CursorError> {
        let batch_size = self.options.effective_batch_size();
        let concurrency = self.options.effective_concurrency();

        let mut cursor = self.keys(CursorOptions {
            range,
            ..self.cursor_options()
        });

        let mut deleted = 0;
        loop {
            let keys = cursor.next_batch(batch_size).await?;
            if keys.is_empty() {
                break;
            }

            deleted += keys.len();
            batch_ops::apply_run(self.store.as_ref(), OpRun::Del(keys), concurrency).await?;
        }

        debug!(
            "OrderedStore::clear: deleted {} keys in range {}",
            deleted,
            cursor.options().range
        );
        Ok(deleted)
    }

    pub async fn remove_all(&self) -> Result<(), io::Error> {
        self.store.remove_all().await
    }

    pub async fn verify(&self, options: VerifyOptions) -> Result<VerifyStats, io::Error> {
        self.store.verify(options).await
    }

    /// Create a cursor yielding `(key, value)` pairs.
    pub fn iterator(&self, options: CursorOptions<S::Key>) -> EntryCursor<S> {
        EntryCursor::new(self.store.clone(), options)
    }

    /// Create a cursor yielding keys.
    pub fn keys(&self, options: CursorOptions<S::Key>) -> KeyCursor<S> {
        KeyCursor::new(self.store.clone(), options)
    }

    /// Create a cursor yielding values.
    pub fn values(&self, options: CursorOptions<S::Key>) -> ValueCursor<S> {
        ValueCursor::new(self.store.clone(), options)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cursor::seek::SeekOptions;
    use crate::impls::mem_store::content_ref_of;
    use crate::impls::mem_store::MemStore;
    use crate::testing::mem_store;
    use crate::testing::CountingStore;
    use crate::testing::FailingStore;

    fn s(x: impl ToString) -> String {
        x.to_string()
    }

    fn b(x: impl ToString) -> Vec<u8> {
        x.to_string().as_bytes().to_vec()
    }

    fn ss(xs: &[&str]) -> Vec<String> {
        xs.iter().map(s).collect()
    }

    fn abcdef() -> OrderedStore<MemStore<String>> {
        OrderedStore::new(mem_store(&["a", "b", "c", "d", "e", "f"]))
    }

    #[tokio::test]
    async fn test_point_operations() -> anyhow::Result<()> {
        let st = OrderedStore::new(MemStore::<String>::new());

        let meta: Metadata = [(s("mime"), s("text/plain"))].into_iter().collect();
        let entry = st.put(s("a"), b("hello"), meta.clone()).await?;
        assert_eq!(entry.key, s("a"));
        assert_eq!(entry.content_ref, content_ref_of(b"hello"));
        assert_eq!(entry.size, 5);
        assert_eq!(entry.metadata, meta);

        assert_eq!(st.get(&s("a")).await?, Some(b("hello")));
        assert_eq!(st.get(&s("b")).await?, None);

        st.delete(&s("a")).await?;
        assert_eq!(st.get(&s("a")).await?, None);

        // Deleting an absent key is not an error
        st.delete(&s("a")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_get_many() -> anyhow::Result<()> {
        let options = StoreOptions {
            concurrency: 2,
            ..Default::default()
        };
        let st = OrderedStore::with_options(
            Arc::new(CountingStore::with_latency(mem_store(&["a", "b", "c", "d"]))),
            options,
        );

        let got = st.get_many(&ss(&["d", "x", "a", "c", "b"])).await?;
        assert_eq!(got, vec![
            Some(b("d")),
            None,
            Some(b("a")),
            Some(b("c")),
            Some(b("b")),
        ]);
        assert_eq!(st.store().max_in_flight(), 2);

        assert!(st.get_many(&[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_batch() -> anyhow::Result<()> {
        let st = abcdef();

        st.batch(vec![
            BatchOp::put(s("g"), b("g")),
            BatchOp::put(s("a"), b("A")),
            BatchOp::del(s("b")),
            BatchOp::del(s("c")),
            BatchOp::put(s("c"), b("C")),
        ])
        .await?;

        let got = st.iterator(st.cursor_options()).all().await?;
        assert_eq!(got, vec![
            (s("a"), b("A")),
            (s("c"), b("C")),
            (s("d"), b("d")),
            (s("e"), b("e")),
            (s("f"), b("f")),
            (s("g"), b("g")),
        ]);

        let err = st.batch(vec![BatchOp::del(s("a")), BatchOp::Unknown]).await.unwrap_err();
        assert!(matches!(err, CursorError::UnknownOperationKind { index: 1 }));
        assert_eq!(st.get(&s("a")).await?, Some(b("A")));
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_range() -> anyhow::Result<()> {
        let options = StoreOptions {
            batch_size: 2,
            concurrency: 2,
        };
        let st = OrderedStore::with_options(
            Arc::new(CountingStore::with_latency(mem_store(&["a", "b", "c", "d", "e", "f"]))),
            options,
        );

        let n = st
            .clear(RangeOptions {
                gt: Some(s("a")),
                lte: Some(s("e")),
                ..Default::default()
            })
            .await?;
        assert_eq!(n, 4);
        assert_eq!(st.store().delete_calls(), 4);
        assert_eq!(st.store().max_in_flight(), 2);

        let keys = st.keys(CursorOptions::new()).all().await?;
        assert_eq!(keys, ss(&["a", "f"]));

        // Nothing left in range
        let n = st
            .clear(RangeOptions {
                gt: Some(s("a")),
                lte: Some(s("e")),
                ..Default::default()
            })
            .await?;
        assert_eq!(n, 0);

        // Unbounded range clears everything
        assert_eq!(st.clear(RangeOptions::default()).await?, 2);
        assert_eq!(st.store().store().len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_failure() -> anyhow::Result<()> {
        let st = OrderedStore::new(FailingStore::new(mem_store(&["a", "b", "c"])).fail_write("b"));

        let err = st.clear(RangeOptions::default()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Write: failed to delete key "b": injected write failure"#
        );

        let err: io::Error = err.into();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        Ok(())
    }

    #[tokio::test]
    async fn test_cursor_factories() -> anyhow::Result<()> {
        let st = abcdef();
        let o = st.cursor_options().gt(s("b")).lte(s("d"));

        assert_eq!(st.iterator(o.clone()).all().await?, vec![
            (s("c"), b("c")),
            (s("d"), b("d"))
        ]);
        assert_eq!(st.keys(o.clone().reverse(true)).all().await?, ss(&["d", "c"]));
        assert_eq!(st.values(o.clone()).all().await?, vec![b("c"), b("d")]);

        let mut c = st.keys(st.cursor_options());
        c.seek(s("c"), SeekOptions::default());
        assert_eq!(c.next_batch(2).await?, ss(&["c", "d"]));

        assert_eq!(c.options().batch_size, 100);
        assert_eq!(c.options().concurrency, 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_all_and_verify() -> anyhow::Result<()> {
        let st = abcdef();
        st.put(s("g"), b("a"), Metadata::new()).await?;

        let stats = st.verify(VerifyOptions::default()).await?;
        assert_eq!(stats.total_entries, 7);
        assert_eq!(stats.verified_content, 6);
        assert_eq!(stats.bad_content, 0);

        st.store().corrupt(&content_ref_of(b"a"), b("x"));
        let stats = st.verify(VerifyOptions::default()).await?;
        assert_eq!(stats.bad_content, 1);

        // Both entries sharing the corrupt content are dropped
        assert_eq!(st.keys(CursorOptions::new()).all().await?, ss(&[
            "b", "c", "d", "e", "f"
        ]));

        st.remove_all().await?;
        assert_eq!(st.keys(CursorOptions::new()).all().await?, Vec::<String>::new());
        Ok(())
    }
}
