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

//! # CAS Cursor
//!
//! Key-ordered iteration over a content-addressed store.
//!
//! A content-addressed store can only enumerate its keys in no particular order.
//! This library lists them once per cursor, sorts them into an immutable snapshot,
//! and serves ascending or descending range reads over that snapshot,
//! with repositioning by seek and batched value fetch of bounded concurrency.
//!
//! ## Core Components
//!
//! - [`ContentStore`]: The storage capability this library is built on
//! - [`Cursor`]: A stateful position over a snapshot of the keys, yielding entries, keys or values
//! - [`OrderedStore`]: A record store facade creating cursors and applying batched writes
//! - [`BlockingCursor`]: Drives a cursor from synchronous code
//!
//! ## Usage Example
//!
//! ```rust
//! use std::io;
//!
//! use cas_cursor::impls::mem_store::MemStore;
//! use cas_cursor::BatchOp;
//! use cas_cursor::CursorOptions;
//! use cas_cursor::OrderedStore;
//! use cas_cursor::SeekOptions;
//!
//! #[tokio::main]
//! async fn main() -> io::Result<()> {
//!     let store = OrderedStore::new(MemStore::<String>::new());
//!
//!     store
//!         .batch(vec![
//!             BatchOp::put("a".to_string(), b"1".to_vec()),
//!             BatchOp::put("b".to_string(), b"2".to_vec()),
//!             BatchOp::put("c".to_string(), b"3".to_vec()),
//!         ])
//!         .await?;
//!
//!     // Descending, from "b" down
//!     let mut cursor = store.iterator(CursorOptions::new().reverse(true));
//!     cursor.seek("b".to_string(), SeekOptions::default());
//!
//!     while let Some((key, value)) = cursor.next().await? {
//!         println!("{}: {:?}", key, value);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::io;

use futures_util::stream::BoxStream;

pub mod batch_ops;
pub mod batch_resolver;
pub mod blocking;
pub mod bounds;
pub mod content_store;
pub mod cursor;
pub mod errors;
pub mod impls;
pub mod key;
pub mod options;
pub mod search;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod testing;

pub use crate::batch_ops::BatchOp;
pub use crate::blocking::BlockingCursor;
pub use crate::bounds::RangeOptions;
pub use crate::content_store::ContentStore;
pub use crate::content_store::IndexEntry;
pub use crate::content_store::Metadata;
pub use crate::cursor::seek::SeekOptions;
pub use crate::cursor::Cursor;
pub use crate::cursor::CursorState;
pub use crate::cursor::EntryCursor;
pub use crate::cursor::KeyCursor;
pub use crate::cursor::ValueCursor;
pub use crate::errors::CursorError;
pub use crate::key::StoreKey;
pub use crate::key::StoreValue;
pub use crate::options::CursorOptions;
pub use crate::options::StoreOptions;
pub use crate::store::OrderedStore;

/// A boxed stream that yields `Result` of items or an `io::Error`.
/// The stream is 'static so that it does not borrow the store it is listed from.
pub type IOResultStream<T> = BoxStream<'static, Result<T, io::Error>>;
