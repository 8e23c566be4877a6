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

//! Resolve key bounds into a window of positions of a sorted snapshot.
//!
//! A [`Window`] is a closed interval `[start, end]` of positions.
//! An empty window is represented by `end == start - 1`.
//! It always holds that `0 <= start <= end + 1 <= len`.

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::key::compare_keys;
use crate::key::StoreKey;
use crate::search::insertion_point;
use crate::search::search;

/// Key bounds of a cursor. An unset bound means unbounded on that side.
///
/// `gt`/`gte` always bound the low end of the key space and `lt`/`lte` the high end,
/// regardless of the traversal direction.
/// If both the exclusive and the inclusive bound are set on one side, the exclusive one is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeOptions<K> {
    pub gt: Option<K>,
    pub gte: Option<K>,
    pub lt: Option<K>,
    pub lte: Option<K>,
}

impl<K> Default for RangeOptions<K> {
    fn default() -> Self {
        Self {
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }
}

impl<K> RangeOptions<K> {
    /// The effective lower bound: `(key, exclusive)`.
    pub fn lower(&self) -> Option<(&K, bool)> {
        match (&self.gt, &self.gte) {
            (Some(k), _) => Some((k, true)),
            (None, Some(k)) => Some((k, false)),
            (None, None) => None,
        }
    }

    /// The effective upper bound: `(key, exclusive)`.
    pub fn upper(&self) -> Option<(&K, bool)> {
        match (&self.lt, &self.lte) {
            (Some(k), _) => Some((k, true)),
            (None, Some(k)) => Some((k, false)),
            (None, None) => None,
        }
    }
}

impl<K: StoreKey> RangeOptions<K> {
    /// Returns `true` if `key` satisfies every bound predicate.
    pub fn contains(&self, key: &K) -> bool {
        let above_lower = match self.lower() {
            None => true,
            Some((b, true)) => compare_keys(key, b) == Ordering::Greater,
            Some((b, false)) => compare_keys(key, b) != Ordering::Less,
        };

        let below_upper = match self.upper() {
            None => true,
            Some((b, true)) => compare_keys(key, b) == Ordering::Less,
            Some((b, false)) => compare_keys(key, b) != Ordering::Greater,
        };

        above_lower && below_upper
    }
}

impl<K: fmt::Debug> fmt::Display for RangeOptions<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bounds = [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ];

        write!(f, "{{")?;
        let mut first = true;
        for (name, bound) in bounds {
            if let Some(k) = bound {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {:?}", name, k)?;
                first = false;
            }
        }
        write!(f, "}}")
    }
}

/// A closed interval of positions `[start, end]` in a sorted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: isize,
    end: isize,
}

impl Window {
    /// Build a window, normalizing an inverted interval to an empty one at `start`.
    pub fn new(start: isize, end: isize) -> Self {
        if start > end {
            Self {
                start,
                end: start - 1,
            }
        } else {
            Self { start, end }
        }
    }

    /// A window covering all of `len` positions.
    pub fn full(len: usize) -> Self {
        Self::new(0, len as isize - 1)
    }

    pub fn start(&self) -> isize {
        self.start
    }

    pub fn end(&self) -> isize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }

    pub fn contains(&self, pos: isize) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Resolve `range` into the window of `sorted_keys` whose keys satisfy all bounds.
///
/// `sorted_keys` must be strictly increasing.
pub fn resolve<K: StoreKey>(sorted_keys: &[K], range: &RangeOptions<K>) -> Window {
    let len = sorted_keys.len() as isize;

    let start = match range.lower() {
        None => 0,
        Some((key, exclusive)) => lower_position(sorted_keys, key, exclusive),
    };

    let end = match range.upper() {
        None => len - 1,
        Some((key, exclusive)) => upper_position(sorted_keys, key, exclusive),
    };

    let start = start.clamp(0, len);
    let end = end.clamp(-1, len - 1);

    Window::new(start, end)
}

/// Position of the first key above a lower bound, or `len` if there is none.
pub(crate) fn lower_position<K: StoreKey>(sorted_keys: &[K], key: &K, exclusive: bool) -> isize {
    let len = sorted_keys.len() as isize;

    let (Some(first), Some(last)) = (sorted_keys.first(), sorted_keys.last()) else {
        return 0;
    };

    // Below the first key: every key is above the bound
    if compare_keys(key, first) == Ordering::Less {
        return 0;
    }

    // Above the last key: no key is above the bound
    if compare_keys(key, last) == Ordering::Greater {
        return len;
    }

    let found = search(sorted_keys, key, compare_keys);
    match insertion_point(found) {
        None if exclusive => found + 1,
        None => found,
        Some(ip) => ip,
    }
}

/// Position of the last key below an upper bound, or `-1` if there is none.
pub(crate) fn upper_position<K: StoreKey>(sorted_keys: &[K], key: &K, exclusive: bool) -> isize {
    let len = sorted_keys.len() as isize;

    let (Some(first), Some(last)) = (sorted_keys.first(), sorted_keys.last()) else {
        return -1;
    };

    // Above the last key: every key is below the bound
    if compare_keys(key, last) == Ordering::Greater {
        return len - 1;
    }

    // Below the first key: no key is below the bound
    if compare_keys(key, first) == Ordering::Less {
        return -1;
    }

    let found = search(sorted_keys, key, compare_keys);
    match insertion_point(found) {
        None if exclusive => found - 1,
        None => found,
        Some(ip) => ip - 1,
    }
}
