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

//! Key and value bounds, and the key ordering used by every cursor.

use std::cmp::Ordering;
use std::fmt;

/// Trait for types that can be used as keys of a [`ContentStore`](crate::ContentStore).
///
/// # Requirements
///
/// - **Ordering**: `Ord` defines the traversal order of cursors
/// - **Cloning**: `Clone` lets a snapshot hand out keys while keeping its own copy
/// - **Threading**: `Send + Sync` allows fetches to run concurrently
/// - **Debugging**: `Debug` is used to name the key in errors
///
/// This trait is automatically implemented for any type that meets the trait bounds,
/// e.g., `String` and `Vec<u8>`, both of which order lexicographically by bytes.
pub trait StoreKey
where Self: Clone + Ord + fmt::Debug + Send + Sync + Unpin + 'static
{
}

impl<K> StoreKey for K where K: Clone + Ord + fmt::Debug + Send + Sync + Unpin + 'static {}

/// Trait for types that can be stored as values.
pub trait StoreValue
where Self: Clone + fmt::Debug + Send + Sync + Unpin + 'static
{
}

impl<V> StoreValue for V where V: Clone + fmt::Debug + Send + Sync + Unpin + 'static {}

/// The key comparer: a deterministic total order over keys.
///
/// For byte strings and `String` this is plain lexicographic byte order.
pub fn compare_keys<K: StoreKey>(a: &K, b: &K) -> Ordering {
    a.cmp(b)
}

/// Sort keys with [`compare_keys`] and drop duplicates,
/// so that the result is strictly increasing.
pub fn sort_keys<K: StoreKey>(keys: &mut Vec<K>) {
    keys.sort_unstable_by(compare_keys);
    keys.dedup_by(|a, b| compare_keys(a, b) == Ordering::Equal);
}
