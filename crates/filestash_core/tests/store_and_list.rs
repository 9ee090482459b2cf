//! Batch writes and full scans through the storage handle.

use chrono::Utc;
use filestash_core::{
    Config, Factory, NewFile, OpenState, StashError, StorageHandle, DEFAULT_DB_NAME,
};
use std::sync::Arc;

async fn open_handle(factory: Factory) -> StorageHandle {
    let handle = StorageHandle::new(Arc::new(factory), Config::default());
    handle.open().await.unwrap();
    handle
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let handle = open_handle(Factory::in_memory()).await;
    let db = handle.database().unwrap();

    assert!(matches!(
        db.store(Vec::new()).await,
        Err(StashError::Validation(_))
    ));
    assert!(db.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn stored_file_lists_back() {
    let handle = open_handle(Factory::in_memory()).await;

    let before = Utc::now().timestamp_millis();
    handle
        .store(vec![
            NewFile::new("movie.mp4", vec![7; 64]).media_type("video/mp4")
        ])
        .await
        .unwrap();
    let after = Utc::now().timestamp_millis();

    let records = handle.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, 1);
    assert_eq!(record.name, "movie.mp4");
    assert_eq!(record.size, 64);
    assert_eq!(record.media_type.as_deref(), Some("video/mp4"));
    assert_eq!(record.content, vec![7; 64]);
    assert!(before <= record.last_modified && record.last_modified <= after);
}

#[tokio::test]
async fn batch_shares_one_timestamp() {
    let handle = open_handle(Factory::in_memory()).await;
    let files = (0..5)
        .map(|i| NewFile::new(format!("f{i}"), vec![i; 3]))
        .collect();
    handle.store(files).await.unwrap();

    let records = handle.list_all().await.unwrap();
    assert_eq!(records.len(), 5);
    assert!(records
        .iter()
        .all(|r| r.last_modified == records[0].last_modified));
}

#[tokio::test]
async fn names_need_not_be_unique() {
    let handle = open_handle(Factory::in_memory()).await;
    handle
        .store(vec![
            NewFile::new("same", b"one".to_vec()),
            NewFile::new("same", b"two".to_vec()),
        ])
        .await
        .unwrap();

    let contents: Vec<Vec<u8>> = handle
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(contents, vec![b"one".to_vec(), b"two".to_vec()]);
}

#[tokio::test]
async fn sequential_batches_get_ascending_ids() {
    let handle = open_handle(Factory::in_memory()).await;
    handle
        .store(vec![NewFile::new("a", b"a".to_vec())])
        .await
        .unwrap();
    handle
        .store(vec![NewFile::new("b", b"b".to_vec())])
        .await
        .unwrap();

    let records = handle.list_all().await.unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(records[0].id < records[1].id);
}

#[tokio::test]
async fn failing_put_rejects_whole_batch() {
    let config = Config::new().max_value_size(256);
    let factory = Factory::in_memory().with_options(config.engine_options());
    let handle = StorageHandle::new(Arc::new(factory), config);
    let db = handle.open().await.unwrap();

    let files = vec![
        NewFile::new("small-1", vec![1; 8]),
        NewFile::new("huge", vec![2; 4096]),
        NewFile::new("small-2", vec![3; 8]),
    ];
    match db.store(files).await {
        Err(StashError::WriteFailure { failed, total, .. }) => {
            assert_eq!(total, 3);
            assert!((1..=3).contains(&failed));
        }
        other => panic!("expected write failure, got {other:?}"),
    }
    assert!(db.is_empty().await.unwrap());

    // The store stays usable, and ids burned by the failed batch are not reissued.
    db.store(vec![NewFile::new("after", vec![4; 8])])
        .await
        .unwrap();
    let records = db.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].id > 1);
}

#[tokio::test]
async fn fresh_database_lists_empty() {
    let handle = open_handle(Factory::in_memory()).await;
    let db = handle.database().unwrap();
    assert!(db.list_all().await.unwrap().is_empty());
    assert!(db.is_empty().await.unwrap());
}

#[tokio::test]
async fn consecutive_lists_are_equal() {
    let handle = open_handle(Factory::in_memory()).await;
    handle
        .store(vec![
            NewFile::new("x", b"1".to_vec()),
            NewFile::new("y", b"2".to_vec()).media_type("text/plain"),
        ])
        .await
        .unwrap();

    let first = handle.list_all().await.unwrap();
    let second = handle.list_all().await.unwrap();
    assert_eq!(first, second);
    assert!(!handle.database().unwrap().is_empty().await.unwrap());
}

#[tokio::test]
async fn repeated_open_returns_a_usable_database() {
    let handle = open_handle(Factory::in_memory()).await;
    for name in ["a", "b", "c"] {
        let db = handle.open().await.unwrap();
        db.store(vec![NewFile::new(name, Vec::new())]).await.unwrap();
    }
    assert_eq!(handle.state(), OpenState::Open);
    assert_eq!(handle.list_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn handles_share_the_factory() {
    let factory = Arc::new(Factory::in_memory());
    let writer = StorageHandle::new(Arc::clone(&factory), Config::default());
    let reader = StorageHandle::new(Arc::clone(&factory), Config::default());
    writer.open().await.unwrap();
    reader.open().await.unwrap();

    writer
        .store(vec![NewFile::new("shared", b"!".to_vec())])
        .await
        .unwrap();
    let records = reader.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(reader.database().unwrap().name(), DEFAULT_DB_NAME);
}
