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

//! Mixed write operations, grouped into runs of the same kind.
//!
//! Runs are applied strictly in input order.
//! Operations within one run are applied concurrently and may complete in any order.

use futures_util::StreamExt;
use futures_util::TryStreamExt;
use log::debug;
use serde::Deserialize;
use serde::Serialize;

use crate::content_store::ContentStore;
use crate::content_store::Metadata;
use crate::errors::CursorError;

/// A write operation in a batch.
///
/// Serialized with a `type` tag: `{"type": "put", "key": .., "value": ..}` or
/// `{"type": "del", "key": ..}`. Any other `type` deserializes to [`BatchOp::Unknown`],
/// which fails the batch that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchOp<K, V> {
    Put {
        key: K,
        value: V,
        #[serde(default)]
        metadata: Metadata,
    },
    Del {
        key: K,
    },
    #[serde(other)]
    Unknown,
}

impl<K, V> BatchOp<K, V> {
    pub fn put(key: K, value: V) -> Self {
        Self::Put {
            key,
            value,
            metadata: Metadata::new(),
        }
    }

    pub fn del(key: K) -> Self {
        Self::Del { key }
    }
}

/// A maximal contiguous run of operations of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpRun<K, V> {
    Put(Vec<(K, V, Metadata)>),
    Del(Vec<K>),
}

impl<K, V> OpRun<K, V> {
    pub fn kind(&self) -> &'static str {
        match self {
            OpRun::Put(_) => "put",
            OpRun::Del(_) => "delete",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OpRun::Put(x) => x.len(),
            OpRun::Del(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `ops` into maximal contiguous runs of the same kind, keeping their order.
///
/// Fails with [`CursorError::UnknownOperationKind`] at the first unrecognized operation.
pub fn group_ops<K, V>(
    ops: impl IntoIterator<Item = BatchOp<K, V>>,
) -> Result<Vec<OpRun<K, V>>, CursorError> {
    let mut runs: Vec<OpRun<K, V>> = vec![];

    for (index, op) in ops.into_iter().enumerate() {
        match op {
            BatchOp::Put {
                key,
                value,
                metadata,
            } => {
                if let Some(OpRun::Put(run)) = runs.last_mut() {
                    run.push((key, value, metadata));
                } else {
                    runs.push(OpRun::Put(vec![(key, value, metadata)]));
                }
            }
            BatchOp::Del { key } => {
                if let Some(OpRun::Del(run)) = runs.last_mut() {
                    run.push(key);
                } else {
                    runs.push(OpRun::Del(vec![key]));
                }
            }
            BatchOp::Unknown => {
                return Err(CursorError::UnknownOperationKind { index });
            }
        }
    }

    Ok(runs)
}

/// Apply one run with at most `concurrency` writes in flight.
///
/// An empty run does not access the store.
///
/// The first failed write fails the run; writes already issued are not rolled back.
pub async fn apply_run<S>(
    store: &S,
    run: OpRun<S::Key, S::Value>,
    concurrency: usize,
) -> Result<(), CursorError>
where
    S: ContentStore,
{
    if run.is_empty() {
        return Ok(());
    }

    let concurrency = concurrency.max(1);
    debug!(
        "batch_ops::apply_run: {} run of {} ops, concurrency: {}",
        run.kind(),
        run.len(),
        concurrency
    );

    match run {
        OpRun::Put(puts) => {
            futures::stream::iter(puts)
                .map(|(key, value, metadata)| async move {
                    match store.put(key.clone(), value, metadata).await {
                        Ok(_entry) => Ok(()),
                        Err(e) => Err(CursorError::write("put", &key, e)),
                    }
                })
                .buffer_unordered(concurrency)
                .try_collect::<Vec<_>>()
                .await?;
        }
        OpRun::Del(keys) => {
            futures::stream::iter(keys)
                .map(|key| async move {
                    store
                        .delete(&key)
                        .await
                        .map_err(|e| CursorError::write("delete", &key, e))
                })
                .buffer_unordered(concurrency)
                .try_collect::<Vec<_>>()
                .await?;
        }
    }

    Ok(())
}

/// Group `ops` and apply the runs one after another.
///
/// Nothing is written if grouping fails.
pub async fn apply<S>(
    store: &S,
    ops: impl IntoIterator<Item = BatchOp<S::Key, S::Value>>,
    concurrency: usize,
) -> Result<(), CursorError>
where
    S: ContentStore,
{
    let runs = group_ops(ops)?;

    for run in runs {
        apply_run(store, run, concurrency).await?;
    }

    Ok(())
}
