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

//! Fetch the values of many keys with bounded concurrency.
//!
//! Up to `concurrency` fetches are in flight at a time.
//! Results are returned in the order of the input keys, regardless of the order fetches complete.

use futures_util::StreamExt;
use futures_util::TryStreamExt;
use log::debug;

use crate::content_store::ContentStore;
use crate::errors::CursorError;

/// Fetch the value of every key in `keys`.
///
/// A key without value fails the whole batch with [`CursorError::NotFound`].
/// An empty `keys` returns at once without accessing the store.
/// A `concurrency` of `0` is treated as `1`.
pub async fn resolve<S>(
    store: &S,
    keys: &[S::Key],
    concurrency: usize,
) -> Result<Vec<S::Value>, CursorError>
where
    S: ContentStore,
{
    if keys.is_empty() {
        return Ok(vec![]);
    }

    let concurrency = concurrency.max(1);
    debug!(
        "batch_resolver::resolve: {} keys, concurrency: {}",
        keys.len(),
        concurrency
    );

    // Futures are lazy: collecting them starts no fetch, `buffered` still bounds concurrency.
    // Collecting keeps the closure type out of the future, so it is provably `Send`.
    let fetches = keys
        .iter()
        .map(|key| async move {
            match store.get(key).await {
                Ok(Some(v)) => Ok(v),
                Ok(None) => Err(CursorError::not_found(key)),
                Err(e) => Err(CursorError::fetch(key, e)),
            }
        })
        .collect::<Vec<_>>();

    futures::stream::iter(fetches)
        .buffered(concurrency)
        .try_collect()
        .await
}

/// Fetch the value of every key in `keys`, `None` for a key without value.
///
/// Like [`resolve`], but absence is not an error.
pub async fn resolve_optional<S>(
    store: &S,
    keys: &[S::Key],
    concurrency: usize,
) -> Result<Vec<Option<S::Value>>, CursorError>
where
    S: ContentStore,
{
    if keys.is_empty() {
        return Ok(vec![]);
    }

    let fetches = keys
        .iter()
        .map(|key| async move { store.get(key).await.map_err(|e| CursorError::fetch(key, e)) })
        .collect::<Vec<_>>();

    futures::stream::iter(fetches)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::mem_store;
    use crate::testing::CountingStore;
    use crate::testing::FailingStore;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("k{:03}", i)).collect()
    }

    #[tokio::test]
    async fn test_resolve_empty_without_io() -> anyhow::Result<()> {
        let store = CountingStore::new(mem_store(&["a"]));

        let got = resolve(&store, &[], 4).await?;
        assert!(got.is_empty());

        let got = resolve_optional(&store, &[], 4).await?;
        assert!(got.is_empty());

        assert_eq!(store.get_calls(), 0);
        assert_eq!(store.list_calls(), 0);
        Ok(())
    }

    /// Fetches complete out of order because of per-key latency, the output keeps the input order.
    #[tokio::test]
    async fn test_resolve_keeps_order() -> anyhow::Result<()> {
        let ks = keys(40);
        let refs = ks.iter().map(|k| k.as_str()).collect::<Vec<_>>();

        for concurrency in [1, 2, 3, 8, 64] {
            let store = CountingStore::with_latency(mem_store(&refs));

            let got = resolve(&store, &ks, concurrency).await?;
            let want = ks.iter().map(|k| k.as_bytes().to_vec()).collect::<Vec<_>>();
            assert_eq!(got, want, "concurrency: {}", concurrency);

            assert_eq!(store.get_calls(), ks.len());
            assert_eq!(
                store.max_in_flight(),
                concurrency.min(ks.len()),
                "concurrency: {}",
                concurrency
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_reversed_input_order() -> anyhow::Result<()> {
        let store = CountingStore::with_latency(mem_store(&["a", "b", "c", "d"]));
        let ks = vec!["d", "b", "c", "a"].into_iter().map(String::from).collect::<Vec<_>>();

        let got = resolve(&store, &ks, 4).await?;
        assert_eq!(got, vec![
            b"d".to_vec(),
            b"b".to_vec(),
            b"c".to_vec(),
            b"a".to_vec()
        ]);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_zero_concurrency() -> anyhow::Result<()> {
        let store = CountingStore::new(mem_store(&["a", "b"]));
        let got = resolve(&store, &["a".to_string(), "b".to_string()], 0).await?;
        assert_eq!(got, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(store.max_in_flight(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_vanished_key_fails_batch() -> anyhow::Result<()> {
        let store = FailingStore::new(mem_store(&["a", "b", "c"])).vanish("b");
        let ks = ["a", "b", "c"].map(String::from);

        let err = resolve(&store, &ks, 2).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), r#"NotFound: key "b" is listed but has no value"#);

        // Absence is not an error for optional resolve
        let got = resolve_optional(&store, &ks, 2).await?;
        assert_eq!(got, vec![Some(b"a".to_vec()), None, Some(b"c".to_vec())]);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_fetch_error() -> anyhow::Result<()> {
        let store = FailingStore::new(mem_store(&["a", "b"])).fail_get("a");
        let ks = ["a", "b"].map(String::from);

        let err = resolve(&store, &ks, 2).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Fetch: failed to get key "a": injected get failure"#
        );

        let err = resolve_optional(&store, &ks, 2).await.unwrap_err();
        assert!(matches!(err, CursorError::Fetch { .. }));
        Ok(())
    }
}
