#![allow(missing_docs)]

use std::sync::Arc;

use tempfile::tempdir;
use vagar::{
    BlockPartitioning, FileDriver, StorageDriver, Walker, WalkManager, WALKER_RECORD_LEN,
};

fn manager(dir: &std::path::Path) -> WalkManager {
    let partition = Arc::new(
        BlockPartitioning::from_block_sizes(vec![0, 100, 200, 300], vec![1024; 3]).unwrap(),
    );
    let driver = Arc::new(FileDriver::new(dir).unwrap());
    WalkManager::new(partition, driver)
}

fn ids(walkers: &[Walker]) -> Vec<u64> {
    let mut ids: Vec<u64> = walkers.iter().map(|w| w.id).collect();
    ids.sort_unstable();
    ids
}

/// Dumping a queue and loading it back yields the same multiset of walkers.
#[test]
fn dump_then_load_preserves_walker_multiset() {
    let dir = tempdir().unwrap();
    let walks = manager(dir.path());

    let mut seeded = Vec::new();
    for i in 0..37u64 {
        let w = Walker::seeded(i, 100 + (i as u32 % 100), 1);
        seeded.push(w);
        walks.add_walk(w);
    }
    walks.dump_walks(1).unwrap();
    assert_eq!(walks.disk_file_pending(1), 37);

    let mut loaded = Vec::new();
    // Chunked loads, deliberately smaller than the queue.
    let mut offset = 0;
    loop {
        let n = walks.load_disk_walks(1, 10, offset, &mut loaded).unwrap();
        if n == 0 {
            break;
        }
        offset += 10;
    }
    walks.finish_disk_drain(1, 37).unwrap();

    assert_eq!(ids(&loaded), ids(&seeded));
    // Order within the queue is not part of the contract, field contents are.
    let first = loaded.iter().find(|w| w.id == 0).unwrap();
    assert_eq!(first.source, 100);
    assert_eq!(first.cur_block, 1);
    assert_eq!(first.step, 0);
}

/// A fully drained queue file is truncated and reusable.
#[test]
fn drained_queue_truncates_and_accepts_new_walks() {
    let dir = tempdir().unwrap();
    let walks = manager(dir.path());
    for i in 0..5u64 {
        walks.add_walk(Walker::seeded(i, 10, 0));
    }
    walks.flush_pending().unwrap();

    let mut batch = Vec::new();
    walks.load_disk_walks(0, 100, 0, &mut batch).unwrap();
    walks.finish_disk_drain(0, 5).unwrap();
    assert_eq!(walks.disk_pending(0), 0);
    assert_eq!(
        std::fs::metadata(dir.path().join("walk_0.q")).unwrap().len(),
        0
    );

    walks.add_walk(Walker::seeded(9, 20, 0));
    walks.flush_pending().unwrap();
    assert_eq!(walks.disk_file_pending(0), 1);
}

/// A corrupt record on disk is dropped and counted; valid neighbors load.
#[test]
fn corrupt_record_drops_without_failing_the_load() {
    let dir = tempdir().unwrap();
    let walks = manager(dir.path());
    for i in 0..4u64 {
        walks.add_walk(Walker::seeded(i, 210, 2));
    }
    walks.flush_pending().unwrap();

    let path = dir.path().join("walk_2.q");
    let mut raw = std::fs::read(&path).unwrap();
    raw[2 * WALKER_RECORD_LEN + 16] ^= 0x55;
    std::fs::write(&path, raw).unwrap();

    let mut batch = Vec::new();
    let loaded = walks.load_disk_walks(2, 100, 0, &mut batch).unwrap();
    walks.finish_disk_drain(2, 4).unwrap();
    assert_eq!(loaded, 3);
    assert_eq!(walks.lost(), 1);
    assert_eq!(ids(&batch), vec![0, 1, 3]);
    assert_eq!(
        walks.created(),
        walks.completed() + walks.lost() + walks.nwalks() + batch.len() as u64
    );
}

/// Appends interleave with reads through the record-stream format.
#[test]
fn driver_append_is_an_append_only_record_stream() {
    let dir = tempdir().unwrap();
    let driver = FileDriver::new(dir.path()).unwrap();
    let first: Vec<Walker> = (0..3).map(|i| Walker::seeded(i, 1, 0)).collect();
    let second: Vec<Walker> = (3..5).map(|i| Walker::seeded(i, 2, 0)).collect();
    driver.append_walk_queue(0, &first).unwrap();
    driver.append_walk_queue(0, &second).unwrap();

    let chunk = driver.read_walk_queue(0, 0, 100).unwrap();
    assert_eq!(chunk.walkers.len(), 5);
    assert_eq!(chunk.dropped, 0);
    assert_eq!(ids(&chunk.walkers), vec![0, 1, 2, 3, 4]);
    assert_eq!(chunk.walkers[3].cur, 2);
}
