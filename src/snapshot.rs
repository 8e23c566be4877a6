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

//! A point-in-time sorted listing of the keys of a [`ContentStore`].

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use futures::future::BoxFuture;
use futures::future::Shared;
use futures_util::FutureExt;
use futures_util::TryStreamExt;
use log::debug;
use log::warn;

use crate::content_store::ContentStore;
use crate::errors::CursorError;
use crate::key::sort_keys;

/// A snapshot with more keys than this is reported with a warning.
const LARGE_SNAPSHOT: usize = 100_000;

type Listing<K> = Shared<BoxFuture<'static, Result<Arc<Vec<K>>, CursorError>>>;

/// Sorted, deduplicated keys of a store, listed at most once.
///
/// The listing is deferred until the first [`acquire()`](Self::acquire).
/// The in-flight listing is shared: every caller, including concurrent ones,
/// awaits the same future and gets the same keys, or the same error.
/// It is never refreshed.
pub struct SnapshotIndex<S>
where S: ContentStore
{
    store: Arc<S>,

    /// Rendering of the cursor range, to name it in errors.
    range: String,

    listing: Mutex<Option<Listing<S::Key>>>,
}

impl<S> SnapshotIndex<S>
where S: ContentStore
{
    pub fn new(store: Arc<S>, range: impl ToString) -> Self {
        Self {
            store,
            range: range.to_string(),
            listing: Mutex::new(None),
        }
    }

    /// Returns `true` if the listing has been requested.
    pub fn is_started(&self) -> bool {
        self.listing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Get the sorted keys, listing the store on the first call.
    pub async fn acquire(&self) -> Result<Arc<Vec<S::Key>>, CursorError> {
        let listing = {
            let mut l = self.listing.lock().unwrap_or_else(PoisonError::into_inner);
            l.get_or_insert_with(|| self.start_listing()).clone()
        };

        listing.await
    }

    fn start_listing(&self) -> Listing<S::Key> {
        let store = self.store.clone();
        let range = self.range.clone();

        let fu = async move {
            debug!("SnapshotIndex: start listing for range {}", range);

            let strm = store
                .list()
                .await
                .map_err(|e| CursorError::index_build(&range, e))?;

            let mut keys = strm
                .map_ok(|entry| entry.key)
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| CursorError::index_build(&range, e))?;

            sort_keys(&mut keys);

            if keys.len() > LARGE_SNAPSHOT {
                warn!(
                    "SnapshotIndex: big snapshot of len={} for range {}",
                    keys.len(),
                    range
                );
            }

            debug!("SnapshotIndex: listed {} keys", keys.len());
            Ok::<_, CursorError>(Arc::new(keys))
        };

        fu.boxed().shared()
    }
}
