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

//! Defines the capability interface of the backing content-addressed store.
//!
//! The [`ContentStore`] trait is all that the cursors know about storage:
//! it can enumerate its keys in no particular order and fetch, insert or delete single keys.
//! Ordering, range bounds and batching are built on top of it by this crate.

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use serde::Deserialize;
use serde::Serialize;

use crate::key::StoreKey;
use crate::key::StoreValue;
use crate::IOResultStream;

/// User supplied metadata stored along with an index entry.
pub type Metadata = BTreeMap<String, String>;

/// The integrity reference that addresses a piece of content, e.g., a hex digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentRef(pub String);

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One record of a store listing: a key and the content it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry<K> {
    pub key: K,
    pub content_ref: ContentRef,

    /// Size of the content in bytes.
    pub size: u64,

    /// Milliseconds since the unix epoch when the entry is inserted.
    pub created_at: u64,

    pub metadata: Metadata,
}

/// Options of a maintenance sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyOptions {
    /// Only report problems, do not remove anything.
    pub dry_run: bool,
}

/// Result of a maintenance sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerifyStats {
    /// Number of index entries examined.
    pub total_entries: u64,

    /// Number of content blobs whose digest matches.
    pub verified_content: u64,

    /// Number of content blobs whose digest does not match.
    pub bad_content: u64,

    /// Number of content blobs removed because nothing refers to them or they are corrupt.
    pub reclaimed_content: u64,

    /// Total size in bytes of the content kept.
    pub kept_size: u64,
}

/// A content-addressed key-value store that can only enumerate its keys unordered.
///
/// The trait is designed to be shared by concurrent cursors (`Send + Sync`).
/// Serializing conflicting physical operations is the responsibility of the implementation.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// The key type, ordered by [`compare_keys`](crate::key::compare_keys).
    type Key: StoreKey;

    type Value: StoreValue;

    /// Enumerate every live entry, in no specific order.
    async fn list(&self) -> Result<IOResultStream<IndexEntry<Self::Key>>, io::Error>;

    /// Get the value of a key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, io::Error>;

    /// Insert or replace a key and returns the entry pointing to the new content.
    async fn put(
        &self,
        key: Self::Key,
        value: Self::Value,
        metadata: Metadata,
    ) -> Result<IndexEntry<Self::Key>, io::Error>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &Self::Key) -> Result<(), io::Error>;

    /// Remove every key and all content.
    async fn remove_all(&self) -> Result<(), io::Error>;

    /// Check content integrity and reclaim unreferenced content.
    async fn verify(&self, options: VerifyOptions) -> Result<VerifyStats, io::Error>;
}
