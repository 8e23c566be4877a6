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

//! Key-ordered cursor over a point-in-time snapshot of a [`ContentStore`].
//!
//! A cursor moves through these states:
//!
//! ```text
//! Created --> IndexPending --> Ready --+--> Exhausted
//!                               ^      |
//!                               |      v
//!                               +-- SeekPending
//!
//! any state --> Errored
//! ```
//!
//! The snapshot is listed on the first operation that needs a position,
//! the window is resolved once right after, and a seek is only recorded until the next such
//! operation applies it. Operations on one cursor must not overlap: every method takes `&mut self`.

pub mod flavor;
pub mod seek;

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures_util::StreamExt;
use futures_util::TryStreamExt;
use log::debug;

use self::flavor::Entries;
use self::flavor::Flavor;
use self::flavor::Keys;
use self::flavor::Values;
use self::seek::seek_position;
use self::seek::SeekOptions;
use self::seek::SeekRequest;
use crate::batch_resolver;
use crate::bounds;
use crate::bounds::Window;
use crate::content_store::ContentStore;
use crate::errors::CursorError;
use crate::key::StoreKey;
use crate::options::CursorOptions;
use crate::snapshot::SnapshotIndex;

/// A cursor yielding `(key, value)` pairs.
pub type EntryCursor<S> = Cursor<S, Entries>;

/// A cursor yielding keys, without fetching values.
pub type KeyCursor<S> = Cursor<S, Keys>;

/// A cursor yielding values.
pub type ValueCursor<S> = Cursor<S, Values>;

/// Observable state of a [`Cursor`].
///
/// `IndexPending` only exists while an operation is awaiting the listing,
/// thus it is never observed between operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No operation has needed the snapshot yet.
    Created,

    /// Positioned inside the window.
    Ready,

    /// A seek is recorded and will be applied by the next operation.
    SeekPending,

    /// No more items, until a seek. A cursor that reached its `limit` stays here.
    Exhausted,

    /// Listing or fetching failed. Every operation returns the same error.
    Errored,
}

/// Position of a cursor inside the window of its snapshot.
#[derive(Debug)]
struct Position<K> {
    keys: Arc<Vec<K>>,
    window: Window,

    /// Index into `keys` of the next key to yield. Valid only if not `done`.
    position: isize,

    done: bool,
}

impl<K: StoreKey> Position<K> {
    fn new(keys: Arc<Vec<K>>, window: Window, reverse: bool) -> Self {
        let position = if reverse {
            window.end()
        } else {
            window.start()
        };

        Self {
            keys,
            window,
            position,
            done: window.is_empty(),
        }
    }

    /// Consume up to `n` positions.
    fn take(&mut self, n: usize, reverse: bool) -> Vec<K> {
        let mut got = Vec::with_capacity(n.min(self.window.len()));

        while got.len() < n && !self.done {
            got.push(self.keys[self.position as usize].clone());

            if reverse {
                self.position -= 1;
                self.done = self.position < self.window.start();
            } else {
                self.position += 1;
                self.done = self.position > self.window.end();
            }
        }

        got
    }

    fn seek(&mut self, seek: &SeekRequest<K>, reverse: bool) {
        let r = seek_position(&self.keys, self.window, seek, reverse);

        debug!(
            "Cursor: seek to {:?}(exclusive: {}) in window {}, reverse: {}: position: {}, done: {}",
            seek.target, seek.exclusive, self.window, reverse, r.position, r.done
        );

        self.position = r.position;
        self.done = r.done;
    }
}

#[derive(Debug)]
enum Stage<K> {
    Created,
    Ready(Position<K>),
    Errored(CursorError),
}

/// A key-ordered cursor over a [`ContentStore`].
///
/// `F` defines what it yields: [`Entries`], [`Keys`] or [`Values`].
///
/// # Examples
///
/// ```
/// use std::io;
/// use std::sync::Arc;
///
/// use cas_cursor::cursor::EntryCursor;
/// use cas_cursor::impls::mem_store::MemStore;
/// use cas_cursor::CursorOptions;
///
/// #[tokio::main]
/// async fn main() -> io::Result<()> {
///     let store = Arc::new(MemStore::from_pairs(
///         ["a", "b", "c", "d", "e"].map(|k| (k.to_string(), k.as_bytes().to_vec())),
///     ));
///
///     let opts = CursorOptions::new().gt("b".to_string()).lte("d".to_string());
///     let mut cursor = EntryCursor::new(store, opts.reverse(true));
///
///     let got = cursor.all().await?;
///     assert_eq!(got, vec![
///         ("d".to_string(), b"d".to_vec()),
///         ("c".to_string(), b"c".to_vec()),
///     ]);
///
///     Ok(())
/// }
/// ```
pub struct Cursor<S, F>
where S: ContentStore
{
    store: Arc<S>,
    options: CursorOptions<S::Key>,
    index: SnapshotIndex<S>,
    stage: Stage<S::Key>,
    pending_seek: Option<SeekRequest<S::Key>>,

    /// Number of items yielded.
    count: usize,

    _flavor: PhantomData<fn() -> F>,
}

impl<S, F> Cursor<S, F>
where
    S: ContentStore,
    F: Flavor<S::Key, S::Value>,
{
    /// Create a cursor. The store is not accessed until the first operation.
    pub fn new(store: Arc<S>, options: CursorOptions<S::Key>) -> Self {
        let index = SnapshotIndex::new(store.clone(), &options.range);

        Self {
            store,
            options,
            index,
            stage: Stage::Created,
            pending_seek: None,
            count: 0,
            _flavor: PhantomData,
        }
    }

    pub fn options(&self) -> &CursorOptions<S::Key> {
        &self.options
    }

    /// Number of items yielded so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn state(&self) -> CursorState {
        match &self.stage {
            Stage::Errored(_) => CursorState::Errored,
            _ if self.remaining() == 0 => CursorState::Exhausted,
            Stage::Created => CursorState::Created,
            Stage::Ready(_) if self.pending_seek.is_some() => CursorState::SeekPending,
            Stage::Ready(p) if p.done => CursorState::Exhausted,
            Stage::Ready(_) => CursorState::Ready,
        }
    }

    /// Returns `true` if the cursor will not yield anything unless it seeks.
    ///
    /// A cursor that has reached its `limit` is done for good: seeking does not revive it.
    pub fn is_done(&self) -> bool {
        self.state() == CursorState::Exhausted
    }

    /// Move the cursor so that the next item is at or after `target` in the traversal direction.
    ///
    /// The seek is recorded and applied by the next operation; a later seek replaces it.
    /// It does not reset the `limit` count. It has no effect on an errored cursor.
    pub fn seek(&mut self, target: S::Key, options: SeekOptions) {
        if let Stage::Errored(_) = self.stage {
            return;
        }

        let exclusive = options.exclusive.unwrap_or(if self.options.reverse {
            self.options.range.lt.is_some()
        } else {
            self.options.range.gt.is_some()
        });

        self.pending_seek = Some(SeekRequest { target, exclusive });
    }

    /// Yield the next item, or `None` if exhausted.
    pub async fn next(&mut self) -> Result<Option<F::Item>, CursorError> {
        let mut got = self.next_batch(1).await?;
        Ok(got.pop())
    }

    /// Yield up to `n` items. Fewer than `n` are returned only if the cursor is exhausted.
    ///
    /// Values are fetched with at most `concurrency` fetches in flight.
    pub async fn next_batch(&mut self, n: usize) -> Result<Vec<F::Item>, CursorError> {
        let keys = self.take_keys(n).await?;
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let values = if F::FETCH_VALUES {
            let concurrency = self.options.effective_concurrency();
            match batch_resolver::resolve(self.store.as_ref(), &keys, concurrency).await {
                Ok(values) => values,
                Err(e) => {
                    self.stage = Stage::Errored(e.clone());
                    return Err(e);
                }
            }
        } else {
            vec![]
        };

        self.count += keys.len();
        Ok(F::project(keys, values))
    }

    /// Drain the cursor, `batch_size` positions at a time.
    ///
    /// Returns an empty `Vec` if the cursor is already exhausted.
    pub async fn all(&mut self) -> Result<Vec<F::Item>, CursorError> {
        let batch_size = self.options.effective_batch_size();
        self.all_in_batches(batch_size).await
    }

    /// Drain the cursor, `batch_size` positions at a time, overriding the cursor option.
    pub async fn all_in_batches(&mut self, batch_size: usize) -> Result<Vec<F::Item>, CursorError> {
        let batch_size = batch_size.max(1);

        let mut items = vec![];
        loop {
            let batch = self.next_batch(batch_size).await?;
            if batch.is_empty() {
                return Ok(items);
            }
            items.extend(batch);
        }
    }

    /// Convert into a stream that fetches `batch_size` items at a time.
    pub fn into_stream(self) -> BoxStream<'static, Result<F::Item, CursorError>> {
        let batch_size = self.options.effective_batch_size();

        futures::stream::try_unfold(self, move |mut cursor| async move {
            let batch = cursor.next_batch(batch_size).await?;
            if batch.is_empty() {
                return Ok(None);
            }
            Ok::<_, CursorError>(Some((batch, cursor)))
        })
        .map_ok(|batch| futures::stream::iter(batch.into_iter().map(Ok::<_, CursorError>)))
        .try_flatten()
        .boxed()
    }

    fn remaining(&self) -> usize {
        match self.options.limit {
            Some(limit) => limit.saturating_sub(self.count),
            None => usize::MAX,
        }
    }

    /// Consume up to `n` positions, listing the store and applying a pending seek if needed.
    async fn take_keys(&mut self, n: usize) -> Result<Vec<S::Key>, CursorError> {
        if self.remaining() == 0 {
            // A seek can not revive a cursor that reached its limit.
            self.pending_seek = None;
        }

        if let Stage::Errored(e) = &self.stage {
            return Err(e.clone());
        }

        let n = n.min(self.remaining());
        if n == 0 {
            return Ok(vec![]);
        }

        let mut position = match std::mem::replace(&mut self.stage, Stage::Created) {
            Stage::Errored(e) => {
                self.stage = Stage::Errored(e.clone());
                return Err(e);
            }
            Stage::Ready(position) => position,
            Stage::Created => match self.load_position().await {
                Ok(position) => position,
                Err(e) => {
                    self.stage = Stage::Errored(e.clone());
                    return Err(e);
                }
            },
        };

        let reverse = self.options.reverse;
        if let Some(seek) = self.pending_seek.take() {
            position.seek(&seek, reverse);
        }

        let keys = position.take(n, reverse);
        self.stage = Stage::Ready(position);
        Ok(keys)
    }

    /// List the snapshot and place a position at the start of the resolved window.
    async fn load_position(&self) -> Result<Position<S::Key>, CursorError> {
        let keys = self.index.acquire().await?;
        let window = bounds::resolve(&keys, &self.options.range);

        debug!(
            "Cursor: window {} of {} keys for range {}, reverse: {}",
            window,
            keys.len(),
            self.options.range,
            self.options.reverse
        );

        Ok(Position::new(keys, window, self.options.reverse))
    }
}
