//! On-disk persistence and recovery of the record log.

use filestash_core::{Config, EngineError, Factory, NewFile, StashError, StorageHandle};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn on_disk(root: &Path) -> StorageHandle {
    let config = Config::default();
    let factory = Factory::on_disk(root).with_options(config.engine_options());
    StorageHandle::new(Arc::new(factory), config)
}

fn log_path(root: &Path) -> std::path::PathBuf {
    root.join("localFileStorage").join("records.log")
}

#[tokio::test]
async fn records_survive_restart() {
    let dir = tempdir().unwrap();
    {
        let handle = on_disk(dir.path());
        handle.open().await.unwrap();
        handle
            .store(vec![
                NewFile::new("a.bin", vec![1, 2, 3]).media_type("application/octet-stream"),
                NewFile::new("b.txt", b"text".to_vec()).media_type("text/plain"),
            ])
            .await
            .unwrap();
    }

    let handle = on_disk(dir.path());
    handle.open().await.unwrap();
    let records = handle.list_all().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "a.bin");
    assert_eq!(records[1].content, b"text");

    handle
        .store(vec![NewFile::new("c", Vec::new())])
        .await
        .unwrap();
    let ids: Vec<u64> = handle
        .list_all()
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn torn_tail_is_dropped() {
    let dir = tempdir().unwrap();
    {
        let handle = on_disk(dir.path());
        handle.open().await.unwrap();
        handle
            .store(vec![NewFile::new("whole", b"ok".to_vec())])
            .await
            .unwrap();
    }

    let path = log_path(dir.path());
    let intact = std::fs::metadata(&path).unwrap().len();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"FSLG\x01\x00").unwrap();
    drop(file);

    let handle = on_disk(dir.path());
    handle.open().await.unwrap();
    let records = handle.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "whole");
    assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);
}

#[tokio::test]
async fn checksum_mismatch_fails_open() {
    let dir = tempdir().unwrap();
    {
        let handle = on_disk(dir.path());
        handle.open().await.unwrap();
        handle
            .store(vec![NewFile::new("victim", vec![0xAA; 32])])
            .await
            .unwrap();
    }

    let path = log_path(dir.path());
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[20] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    let handle = on_disk(dir.path());
    assert!(matches!(
        handle.open().await,
        Err(StashError::OpenFailed(EngineError::Corrupted(_)))
    ));
}

#[tokio::test]
async fn damaged_first_length_fails_open_without_truncating() {
    let dir = tempdir().unwrap();
    {
        let handle = on_disk(dir.path());
        handle.open().await.unwrap();
        for name in ["one", "two", "three"] {
            handle
                .store(vec![NewFile::new(name, name.as_bytes().to_vec())])
                .await
                .unwrap();
        }
    }

    let path = log_path(dir.path());
    let mut bytes = std::fs::read(&path).unwrap();
    let size = bytes.len() as u64;
    // High byte of the first frame's length field.
    bytes[10] ^= 0x01;
    std::fs::write(&path, bytes).unwrap();

    let handle = on_disk(dir.path());
    assert!(matches!(
        handle.open().await,
        Err(StashError::OpenFailed(EngineError::Corrupted(_)))
    ));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), size);
}

#[tokio::test]
async fn second_process_is_locked_out() {
    let dir = tempdir().unwrap();
    let first = on_disk(dir.path());
    first.open().await.unwrap();

    let second = on_disk(dir.path());
    assert!(matches!(
        second.open().await,
        Err(StashError::OpenFailed(EngineError::Locked))
    ));
}

#[tokio::test]
async fn delete_database_resets_storage() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(Factory::on_disk(dir.path()));
    {
        let handle = StorageHandle::new(Arc::clone(&factory), Config::default());
        handle.open().await.unwrap();
        handle
            .store(vec![NewFile::new("gone", b"soon".to_vec())])
            .await
            .unwrap();
    }

    factory.delete_database("localFileStorage").await.unwrap();
    assert!(!dir.path().join("localFileStorage").exists());

    let handle = StorageHandle::new(factory, Config::default());
    handle.open().await.unwrap();
    assert!(handle.list_all().await.unwrap().is_empty());
}
