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

//! Binary search with a signed insertion point.
//!
//! All window and seek arithmetic is derived from [`search`].

use std::cmp::Ordering;

/// Binary search `target` in an ascending `seq`.
///
/// Returns the index of the matching element if found,
/// otherwise `-(insertion_point + 1)`, where `insertion_point` is the index of the first
/// element greater than `target` (or `seq.len()` if there is none).
///
/// A non-negative result always means found.
pub fn search<T, Q, F>(seq: &[T], target: &Q, compare: F) -> isize
where
    Q: ?Sized,
    F: Fn(&T, &Q) -> Ordering,
{
    match seq.binary_search_by(|x| compare(x, target)) {
        Ok(i) => i as isize,
        Err(insertion_point) => -(insertion_point as isize) - 1,
    }
}

/// Decode a [`search`] result into the insertion point of a missing target.
///
/// Returns `None` if the result denotes a found element.
pub fn insertion_point(found: isize) -> Option<isize> {
    if found >= 0 {
        None
    } else {
        Some(-(found + 1))
    }
}
