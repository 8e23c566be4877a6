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

use std::fmt;
use std::io;
use std::sync::Arc;

/// Errors reported by cursors and by the batch helpers.
///
/// It is `Clone` because a failed cursor keeps reporting the same error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CursorError {
    /// Listing the store failed while building the snapshot index.
    ///
    /// It is terminal for the cursor.
    #[error("IndexBuild: failed to list store for range {range}: {source}")]
    IndexBuild {
        range: String,
        #[source]
        source: Arc<io::Error>,
    },

    /// A key present in the snapshot index no longer has a value.
    ///
    /// It may be caused by a concurrent delete after the snapshot is taken.
    #[error("NotFound: key {key} is listed but has no value")]
    NotFound { key: String },

    /// Fetching the value of a key failed.
    #[error("Fetch: failed to get key {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: Arc<io::Error>,
    },

    /// A write in a batch run or in a clear failed.
    #[error("Write: failed to {op} key {key}: {source}")]
    Write {
        op: &'static str,
        key: String,
        #[source]
        source: Arc<io::Error>,
    },

    /// A batch operation list contains an operation the grouping does not recognize.
    #[error("UnknownOperationKind: operation at index {index} has an unknown type")]
    UnknownOperationKind { index: usize },
}

impl CursorError {
    pub fn index_build(range: impl fmt::Display, source: io::Error) -> Self {
        Self::IndexBuild {
            range: range.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn not_found(key: &impl fmt::Debug) -> Self {
        Self::NotFound {
            key: format!("{:?}", key),
        }
    }

    pub fn fetch(key: &impl fmt::Debug, source: io::Error) -> Self {
        Self::Fetch {
            key: format!("{:?}", key),
            source: Arc::new(source),
        }
    }

    pub fn write(op: &'static str, key: &impl fmt::Debug, source: io::Error) -> Self {
        Self::Write {
            op,
            key: format!("{:?}", key),
            source: Arc::new(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<CursorError> for io::Error {
    fn from(e: CursorError) -> Self {
        let kind = match &e {
            CursorError::NotFound { .. } => io::ErrorKind::NotFound,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}
