use std::io;

use cas_cursor::impls::mem_store::MemStore;
use cas_cursor::BatchOp;
use cas_cursor::BlockingCursor;
use cas_cursor::CursorOptions;
use cas_cursor::OrderedStore;
use cas_cursor::RangeOptions;
use cas_cursor::SeekOptions;
use futures_util::StreamExt;

#[tokio::main]
async fn main() -> io::Result<()> {
    // Create a store over an in-memory content-addressed backend
    let store = OrderedStore::new(MemStore::<String>::new());

    // Write a few records; identical values share one content blob
    for (key, value) in [("apple", "red"), ("banana", "yellow"), ("cherry", "red")] {
        store
            .put(key.to_string(), value.as_bytes().to_vec(), Default::default())
            .await?;
    }

    // Mixed writes are applied as runs of the same kind, in order
    store
        .batch(vec![
            BatchOp::put("date".to_string(), b"brown".to_vec()),
            BatchOp::del("banana".to_string()),
        ])
        .await?;

    // Ascending range scan
    let mut cursor = store.iterator(CursorOptions::new().gt("apple".to_string()));
    while let Some((key, value)) = cursor.next().await? {
        println!("Key: {}, Value: {}", key, String::from_utf8_lossy(&value));
    }

    // Descending keys, as a stream
    let mut keys = store
        .keys(CursorOptions::new().reverse(true))
        .into_stream();
    while let Some(key) = keys.next().await {
        println!("Key: {}", key?);
    }

    // Seek, then drain the rest
    let mut cursor = store.values(CursorOptions::new());
    cursor.seek("cherry".to_string(), SeekOptions::exclusive());
    println!("After cherry: {:?}", cursor.all().await?);

    // Synchronous iteration
    let blocking = BlockingCursor::from(store.keys(store.cursor_options()));
    let all = tokio::task::spawn_blocking(move || blocking.collect::<Result<Vec<_>, _>>())
        .await
        .map_err(io::Error::other)??;
    println!("All keys: {:?}", all);

    // Bulk delete a range
    let deleted = store.clear(RangeOptions::default()).await?;
    println!("Deleted {} keys", deleted);

    Ok(())
}
