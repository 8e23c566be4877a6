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

//! Resolve a seek target to a position within a window.

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::bounds::lower_position;
use crate::bounds::upper_position;
use crate::bounds::Window;
use crate::key::compare_keys;
use crate::key::StoreKey;

/// Options of [`Cursor::seek()`](crate::cursor::Cursor::seek).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekOptions {
    /// Skip the target itself if it exists.
    ///
    /// If `None`, inherit the exclusiveness of the range bound the traversal starts from:
    /// `gt` for a forward cursor, `lt` for a reverse one.
    pub exclusive: Option<bool>,
}

impl SeekOptions {
    pub fn inclusive() -> Self {
        Self {
            exclusive: Some(false),
        }
    }

    pub fn exclusive() -> Self {
        Self {
            exclusive: Some(true),
        }
    }
}

/// A seek that is recorded but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekRequest<K> {
    pub target: K,
    pub exclusive: bool,
}

/// Where a cursor is after a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Seeked {
    pub(crate) position: isize,
    pub(crate) done: bool,
}

impl Seeked {
    fn at(position: isize) -> Self {
        Self {
            position,
            done: false,
        }
    }

    fn done(position: isize) -> Self {
        Self {
            position,
            done: true,
        }
    }
}

/// Resolve `seek` against the resolved `window` of `sorted_keys`.
///
/// Forward, the result is the first key `>= target` (`> target` if exclusive) within the window;
/// reverse, the last key `<= target` (`< target` if exclusive).
///
/// A target outside of the window is resolved without searching:
/// - On the side the traversal moves towards, the cursor is exhausted.
/// - On the side the traversal starts from, the cursor rewinds to the start of the window,
///   unless the seek is exclusive and the target is also outside all keys of the snapshot,
///   in which case the cursor is exhausted.
pub(crate) fn seek_position<K: StoreKey>(
    sorted_keys: &[K],
    window: Window,
    seek: &SeekRequest<K>,
    reverse: bool,
) -> Seeked {
    if window.is_empty() {
        let p = if reverse { window.start() - 1 } else { window.end() + 1 };
        return Seeked::done(p);
    }

    let first = &sorted_keys[window.start() as usize];
    let last = &sorted_keys[window.end() as usize];
    let target = &seek.target;

    if reverse {
        if compare_keys(target, last) == Ordering::Greater {
            let beyond_all = sorted_keys
                .last()
                .map(|k| compare_keys(target, k) == Ordering::Greater)
                .unwrap_or(true);

            if seek.exclusive && beyond_all {
                return Seeked::done(window.start() - 1);
            }
            return Seeked::at(window.end());
        }

        if compare_keys(target, first) == Ordering::Less {
            return Seeked::done(window.start() - 1);
        }

        let p = upper_position(sorted_keys, target, seek.exclusive);
        if p < window.start() {
            Seeked::done(window.start() - 1)
        } else {
            Seeked::at(p.min(window.end()))
        }
    } else {
        if compare_keys(target, first) == Ordering::Less {
            let before_all = sorted_keys
                .first()
                .map(|k| compare_keys(target, k) == Ordering::Less)
                .unwrap_or(true);

            if seek.exclusive && before_all {
                return Seeked::done(window.end() + 1);
            }
            return Seeked::at(window.start());
        }

        if compare_keys(target, last) == Ordering::Greater {
            return Seeked::done(window.end() + 1);
        }

        let p = lower_position(sorted_keys, target, seek.exclusive);
        if p > window.end() {
            Seeked::done(window.end() + 1)
        } else {
            Seeked::at(p.max(window.start()))
        }
    }
}
