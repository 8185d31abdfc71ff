//! Concurrent put/get stress tests

mod common;

use common::MemoryBucket;
use s3_binstore::{BinaryManager, BlobStore, Fingerprint};
use std::sync::Arc;

#[test]
fn test_concurrent_puts_of_same_content_converge() {
    let bucket = Arc::new(MemoryBucket::new("stress"));
    let manager = Arc::new(BinaryManager::with_remote("default", 1024 * 1024, bucket.clone()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                (0..25)
                    .map(|_| manager.put(&b"abcdef"[..]).unwrap().fingerprint().clone())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for h in handles {
        for fingerprint in h.join().unwrap() {
            assert_eq!(fingerprint.as_str(), "e80b5017098950fc58aad83c8c14978e");
        }
    }

    assert_eq!(bucket.len(), 1);
    assert!(MemoryBucket::count(&bucket.puts) >= 1);
    assert_eq!(manager.cache().len(), 1);
    assert_eq!(manager.cache().total_size(), 6);
}

#[test]
fn test_readers_and_writers_under_small_cache() {
    let bucket = Arc::new(MemoryBucket::new("stress"));
    let seeded: Vec<Fingerprint> = (0..20)
        .map(|i| bucket.insert(format!("seed-{:04}", i).as_bytes()))
        .collect();
    let seeded = Arc::new(seeded);

    // Room for about four entries
    let manager = Arc::new(BinaryManager::with_remote("default", 40, bucket.clone()).unwrap());

    let handles: Vec<_> = (0..10)
        .map(|thread_id| {
            let manager = manager.clone();
            let seeded = seeded.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    if thread_id < 2 {
                        let content = format!("writer-{}-{:03}", thread_id, i);
                        let binary = manager.put(content.as_bytes()).unwrap();
                        assert_eq!(binary.read_to_vec().unwrap(), content.as_bytes());
                    } else {
                        let idx = rand::random::<usize>() % seeded.len();
                        let binary = manager.get(&seeded[idx]).unwrap();
                        // Pinned while held: the file cannot be evicted under us
                        let bytes = binary.read_to_vec().unwrap();
                        assert_eq!(bytes, format!("seed-{:04}", idx).as_bytes());
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(bucket.len(), 20 + 200);

    // Nothing is pinned any more, so the next insertion trims to budget
    manager.put(&b"final"[..]).unwrap();
    assert!(manager.cache().total_size() <= 40);
}
