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

//! What a cursor yields: entries, keys or values.

/// Defines the item a cursor yields for each position it consumes.
pub trait Flavor<K, V>: Send + Sync + 'static {
    type Item: Send + 'static;

    /// Whether values have to be fetched from the store.
    const FETCH_VALUES: bool;

    /// Build items from keys and, if [`Self::FETCH_VALUES`], their values in the same order.
    fn project(keys: Vec<K>, values: Vec<V>) -> Vec<Self::Item>;
}

/// Yields `(key, value)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct Entries;

/// Yields keys only, no value is fetched.
#[derive(Debug, Clone, Copy)]
pub struct Keys;

/// Yields values only.
#[derive(Debug, Clone, Copy)]
pub struct Values;

impl<K, V> Flavor<K, V> for Entries
where
    K: Send + 'static,
    V: Send + 'static,
{
    type Item = (K, V);

    const FETCH_VALUES: bool = true;

    fn project(keys: Vec<K>, values: Vec<V>) -> Vec<Self::Item> {
        debug_assert_eq!(keys.len(), values.len());
        keys.into_iter().zip(values).collect()
    }
}

impl<K, V> Flavor<K, V> for Keys
where K: Send + 'static
{
    type Item = K;

    const FETCH_VALUES: bool = false;

    fn project(keys: Vec<K>, _values: Vec<V>) -> Vec<Self::Item> {
        keys
    }
}

impl<K, V> Flavor<K, V> for Values
where V: Send + 'static
{
    type Item = V;

    const FETCH_VALUES: bool = true;

    fn project(_keys: Vec<K>, values: Vec<V>) -> Vec<Self::Item> {
        values
    }
}
