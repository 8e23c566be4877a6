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

//! Configuration of cursors and of the [`OrderedStore`](crate::store::OrderedStore) facade.

use serde::Deserialize;
use serde::Serialize;

use crate::bounds::RangeOptions;

/// Default number of keys consumed per batch by `all()`, `clear()` and streams.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default number of concurrent value fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Options of a single cursor.
///
/// `batch_size` and `concurrency` of `0` are treated as `1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorOptions<K> {
    /// Iterate in descending key order.
    pub reverse: bool,

    /// Key bounds.
    #[serde(flatten)]
    pub range: RangeOptions<K>,

    /// Max number of items yielded over the lifetime of the cursor, `None` for unlimited.
    pub limit: Option<usize>,

    /// Number of positions consumed at a time when draining the cursor.
    pub batch_size: usize,

    /// Max number of value fetches in flight.
    pub concurrency: usize,
}

impl<K> Default for CursorOptions<K> {
    fn default() -> Self {
        Self {
            reverse: false,
            range: RangeOptions::default(),
            limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl<K> CursorOptions<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn gt(mut self, key: K) -> Self {
        self.range.gt = Some(key);
        self
    }

    pub fn gte(mut self, key: K) -> Self {
        self.range.gte = Some(key);
        self
    }

    pub fn lt(mut self, key: K) -> Self {
        self.range.lt = Some(key);
        self
    }

    pub fn lte(mut self, key: K) -> Self {
        self.range.lte = Some(key);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The effective batch size, at least 1.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// The effective concurrency, at least 1.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Options of the [`OrderedStore`](crate::store::OrderedStore) facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Chunk size of `clear()`.
    pub batch_size: usize,

    /// Max number of store operations in flight for `get_many()`, `batch()` and `clear()`.
    pub concurrency: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl StoreOptions {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
