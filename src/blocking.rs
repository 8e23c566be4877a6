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

//! Drive a cursor from synchronous code.

use futures::executor::block_on;

use crate::content_store::ContentStore;
use crate::cursor::flavor::Flavor;
use crate::cursor::seek::SeekOptions;
use crate::cursor::Cursor;
use crate::errors::CursorError;

/// A cursor whose operations block the calling thread.
///
/// It must not be used from within an async runtime:
/// a store that relies on the runtime to make progress would never complete.
///
/// As an [`Iterator`] it yields one item at a time and stops after the first error.
pub struct BlockingCursor<S, F>
where S: ContentStore
{
    inner: Cursor<S, F>,
    failed: bool,
}

impl<S, F> BlockingCursor<S, F>
where
    S: ContentStore,
    F: Flavor<S::Key, S::Value>,
{
    pub fn new(inner: Cursor<S, F>) -> Self {
        Self {
            inner,
            failed: false,
        }
    }

    pub fn into_inner(self) -> Cursor<S, F> {
        self.inner
    }

    pub fn cursor(&self) -> &Cursor<S, F> {
        &self.inner
    }

    pub fn seek(&mut self, target: S::Key, options: SeekOptions) {
        self.inner.seek(target, options)
    }

    pub fn next_batch(&mut self, n: usize) -> Result<Vec<F::Item>, CursorError> {
        block_on(self.inner.next_batch(n))
    }

    pub fn all(&mut self) -> Result<Vec<F::Item>, CursorError> {
        block_on(self.inner.all())
    }
}

impl<S, F> From<Cursor<S, F>> for BlockingCursor<S, F>
where
    S: ContentStore,
    F: Flavor<S::Key, S::Value>,
{
    fn from(inner: Cursor<S, F>) -> Self {
        Self::new(inner)
    }
}

impl<S, F> Iterator for BlockingCursor<S, F>
where
    S: ContentStore,
    F: Flavor<S::Key, S::Value>,
{
    type Item = Result<F::Item, CursorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match block_on(self.inner.next()) {
            Ok(x) => x.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
