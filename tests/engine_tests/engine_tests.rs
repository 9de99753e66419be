//! Tests for Engine
//!
//! These tests verify:
//! - Round-trips around block boundaries
//! - Existence, delete and overwrite laws
//! - Namespace isolation between textually related keys
//! - Consistency failures on corrupted layouts
//! - Error propagation from the block store
//! - Command execution and construction checks

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chunkkv::block::{BlockStore, MemoryBlockStore, MemoryStoreFactory};
use chunkkv::keys::{block_key, size_key};
use chunkkv::{ChunkError, Command, Config, Engine, Reply, Result, Storage};

const BLOCK: usize = 100;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config() -> Config {
    Config::builder().block_size(BLOCK).value_cap(BLOCK).build()
}

fn setup_engine() -> (Arc<MemoryBlockStore>, Engine) {
    let store = Arc::new(MemoryBlockStore::new(BLOCK));
    let engine = Engine::with_store(store.clone(), test_config()).unwrap();
    (store, engine)
}

fn text(len: usize) -> String {
    (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
}

async fn assert_write_read_exists(engine: &Engine, key: &str, value: &str) {
    engine.write(key, value).await.unwrap();
    assert_eq!(engine.read(key).await.unwrap().as_deref(), Some(value));
    assert!(engine.key_exists(key).await.unwrap());
}

async fn assert_delete_absent(engine: &Engine, key: &str) {
    engine.delete(key).await.unwrap();
    assert!(!engine.key_exists(key).await.unwrap());
    assert_eq!(engine.read(key).await.unwrap(), None);
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[tokio::test]
async fn test_small_value() {
    let (_store, engine) = setup_engine();

    engine.write("x", "hello").await.unwrap();

    assert_eq!(engine.read("x").await.unwrap(), Some("hello".to_string()));
    assert!(engine.key_exists("x").await.unwrap());
}

#[tokio::test]
async fn test_large_value_spans_blocks() {
    let (store, engine) = setup_engine();
    let value = text(500);

    engine.write("x", &value).await.unwrap();

    assert_eq!(engine.block_count("x").await.unwrap(), 5);
    for index in 0..5 {
        let block = store.read(&block_key("x", index)).await.unwrap().unwrap();
        assert_eq!(block.len(), BLOCK);
    }
    assert_eq!(engine.read("x").await.unwrap(), Some(value));
}

#[tokio::test]
async fn test_delete_after_write() {
    let (_store, engine) = setup_engine();

    engine.write("x", "hello").await.unwrap();
    engine.delete("x").await.unwrap();

    assert!(!engine.key_exists("x").await.unwrap());
    assert_eq!(engine.read("x").await.unwrap(), None);
}

#[tokio::test]
async fn test_shrinking_overwrite() {
    let (_store, engine) = setup_engine();

    engine.write("x", &text(500)).await.unwrap();
    engine.write("x", "short").await.unwrap();

    assert_eq!(engine.read("x").await.unwrap(), Some("short".to_string()));
    assert_eq!(engine.block_count("x").await.unwrap(), 1);
}

#[tokio::test]
async fn test_related_keys_do_not_cross_talk() {
    let (_store, engine) = setup_engine();

    engine.write("a", "v1").await.unwrap();
    engine.write("a_0", "v2").await.unwrap();

    assert_eq!(engine.read("a").await.unwrap(), Some("v1".to_string()));
    assert_eq!(engine.read("a_0").await.unwrap(), Some("v2".to_string()));
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[tokio::test]
async fn test_round_trip_around_block_boundaries() {
    let (_store, engine) = setup_engine();

    for len in [1, BLOCK - 1, BLOCK, BLOCK + 1, 2 * BLOCK, 3 * BLOCK, 10 * BLOCK, 10 * BLOCK + 9] {
        let key = format!("len{}", len);
        let value = text(len);

        engine.write(&key, &value).await.unwrap();

        assert_eq!(engine.read(&key).await.unwrap(), Some(value), "len {}", len);
        assert_eq!(
            engine.block_count(&key).await.unwrap(),
            len.div_ceil(BLOCK) as u64,
            "len {}",
            len
        );
    }
}

#[tokio::test]
async fn test_round_trip_empty_value_reads_absent() {
    let (_store, engine) = setup_engine();

    engine.write("empty", "").await.unwrap();

    assert_eq!(engine.block_count("empty").await.unwrap(), 0);
    assert!(!engine.key_exists("empty").await.unwrap());
    assert_eq!(engine.read("empty").await.unwrap(), None);
}

#[tokio::test]
async fn test_round_trip_multibyte_text() {
    let (_store, engine) = setup_engine();
    // Characters straddle block boundaries
    let value = "añ€😀".repeat(60);

    assert_write_read_exists(&engine, "unicode", &value).await;
}

// =============================================================================
// Existence and Delete Tests
// =============================================================================

#[tokio::test]
async fn test_key_absent_before_write() {
    let (_store, engine) = setup_engine();

    assert!(!engine.key_exists("never").await.unwrap());
    assert_eq!(engine.read("never").await.unwrap(), None);
    assert_eq!(engine.block_count("never").await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_absent_key_is_noop() {
    let (_store, engine) = setup_engine();

    assert_delete_absent(&engine, "ghost").await;
}

#[tokio::test]
async fn test_delete_twice() {
    let (_store, engine) = setup_engine();

    assert_write_read_exists(&engine, "k", &text(250)).await;
    assert_delete_absent(&engine, "k").await;
    assert_delete_absent(&engine, "k").await;
}

#[tokio::test]
async fn test_rewrite_after_delete() {
    let (_store, engine) = setup_engine();

    assert_write_read_exists(&engine, "k", &text(300)).await;
    assert_delete_absent(&engine, "k").await;
    assert_write_read_exists(&engine, "k", "back").await;
}

// =============================================================================
// Overwrite Tests
// =============================================================================

#[tokio::test]
async fn test_overwrite_combinations() {
    let (_store, engine) = setup_engine();
    let sizes = [0, 5, BLOCK, 5 * BLOCK, 80 * BLOCK];

    for (i, &first) in sizes.iter().enumerate() {
        for &second in &sizes {
            let key = format!("k{}-{}", i, second);
            let v1 = text(first);
            let v2: String = text(second).to_uppercase();

            engine.write(&key, &v1).await.unwrap();
            engine.write(&key, &v2).await.unwrap();

            let expected = if v2.is_empty() { None } else { Some(v2.clone()) };
            assert_eq!(engine.read(&key).await.unwrap(), expected, "{} -> {}", first, second);
            assert_eq!(engine.key_exists(&key).await.unwrap(), !v2.is_empty());
        }
    }
}

#[tokio::test]
async fn test_shrink_leaves_orphan_blocks_unreachable() {
    let (store, engine) = setup_engine();

    engine.write("x", &text(500)).await.unwrap();
    engine.write("x", "short").await.unwrap();

    // Old trailing blocks are still in the store...
    assert!(store.read(&block_key("x", 4)).await.unwrap().is_some());
    // ...but only the first block is reachable
    assert_eq!(engine.read("x").await.unwrap(), Some("short".to_string()));
}

#[tokio::test]
async fn test_grow_after_shrink_overwrites_orphans() {
    let (_store, engine) = setup_engine();

    engine.write("x", &text(500)).await.unwrap();
    engine.write("x", "short").await.unwrap();
    let grown = text(350).to_uppercase();
    engine.write("x", &grown).await.unwrap();

    assert_eq!(engine.read("x").await.unwrap(), Some(grown));
}

// =============================================================================
// Namespace Isolation Tests
// =============================================================================

#[tokio::test]
async fn test_namespace_isolation_with_large_values() {
    let (_store, engine) = setup_engine();
    let keys = ["a", "a_0", "a_1", "a_-1", "a_", "_", "a\\", "a\\_0"];

    for (i, key) in keys.iter().enumerate() {
        engine.write(key, &format!("{}:{}", i, text(120 * (i + 1)))).await.unwrap();
    }

    for (i, key) in keys.iter().enumerate() {
        let expected = format!("{}:{}", i, text(120 * (i + 1)));
        assert_eq!(engine.read(key).await.unwrap(), Some(expected), "key {:?}", key);
    }
}

#[tokio::test]
async fn test_raw_block_key_write_does_not_leak() {
    let (_store, engine) = setup_engine();

    engine.write("a", "value of a").await.unwrap();
    // Logical key spelled like a's first block key
    engine.write("a_0", "other").await.unwrap();
    engine.delete("a_0").await.unwrap();

    assert_eq!(engine.read("a").await.unwrap(), Some("value of a".to_string()));
}

// =============================================================================
// Consistency Failure Tests
// =============================================================================

#[tokio::test]
async fn test_non_numeric_size_record() {
    let (store, engine) = setup_engine();
    store.write(&size_key("k"), Bytes::from_static(b"abc")).await.unwrap();

    let err = engine.read("k").await.unwrap_err();
    assert!(matches!(err, ChunkError::CorruptSizeRecord { ref raw, .. } if raw == "abc"));
    assert!(err.is_consistency_failure());

    let err = engine.key_exists("k").await.unwrap_err();
    assert!(err.is_consistency_failure());
}

#[tokio::test]
async fn test_negative_size_record() {
    let (store, engine) = setup_engine();
    store.write(&size_key("k"), Bytes::from_static(b"-3")).await.unwrap();

    let err = engine.key_exists("k").await.unwrap_err();

    assert!(matches!(err, ChunkError::CorruptSizeRecord { .. }));
}

#[tokio::test]
async fn test_missing_block() {
    let (store, engine) = setup_engine();
    store.write(&size_key("k"), Bytes::from_static(b"3")).await.unwrap();
    store.write(&block_key("k", 0), Bytes::from(text(BLOCK))).await.unwrap();

    let err = engine.read("k").await.unwrap_err();

    assert!(matches!(
        err,
        ChunkError::MissingBlock { index: 1, expected: 3, .. }
    ));
    assert!(err.is_consistency_failure());
    // Existence only consults the size record
    assert!(engine.key_exists("k").await.unwrap());
}

#[tokio::test]
async fn test_huge_size_record_reports_missing_block() {
    let (store, engine) = setup_engine();

    for raw in [u64::MAX.to_string(), "1000000000000".to_string()] {
        store.write(&size_key("k"), Bytes::from(raw.clone())).await.unwrap();

        let err = engine.read("k").await.unwrap_err();

        assert!(err.is_consistency_failure(), "size record {}", raw);
        assert!(matches!(err, ChunkError::MissingBlock { index: 0, .. }));
    }

    // Existence and block count only look at the record
    assert!(engine.key_exists("k").await.unwrap());
    assert_eq!(engine.block_count("k").await.unwrap(), 1_000_000_000_000);
}

#[tokio::test]
async fn test_short_inner_block() {
    let (store, engine) = setup_engine();
    store.write(&size_key("k"), Bytes::from_static(b"2")).await.unwrap();
    store.write(&block_key("k", 0), Bytes::from_static(b"short")).await.unwrap();
    store.write(&block_key("k", 1), Bytes::from_static(b"tail")).await.unwrap();

    let err = engine.read("k").await.unwrap_err();

    assert!(matches!(err, ChunkError::CorruptValue { .. }));
}

#[tokio::test]
async fn test_empty_last_block() {
    let (store, engine) = setup_engine();
    store.write(&size_key("k"), Bytes::from_static(b"1")).await.unwrap();
    store.write(&block_key("k", 0), Bytes::new()).await.unwrap();

    let err = engine.read("k").await.unwrap_err();

    assert!(err.is_consistency_failure());
}

#[tokio::test]
async fn test_invalid_utf8_blocks() {
    let (store, engine) = setup_engine();
    store.write(&size_key("k"), Bytes::from_static(b"1")).await.unwrap();
    store.write(&block_key("k", 0), Bytes::from_static(&[0xff, 0xfe])).await.unwrap();

    let err = engine.read("k").await.unwrap_err();

    assert!(matches!(err, ChunkError::CorruptValue { .. }));
}

#[tokio::test]
async fn test_write_repairs_corrupt_size_record() {
    let (store, engine) = setup_engine();
    store.write(&size_key("k"), Bytes::from_static(b"garbage")).await.unwrap();

    engine.write("k", "fresh").await.unwrap();

    assert_eq!(engine.read("k").await.unwrap(), Some("fresh".to_string()));
}

// =============================================================================
// Block Store Failure Tests
// =============================================================================

/// Block store whose writes always fail
struct BrokenStore;

#[async_trait]
impl BlockStore for BrokenStore {
    async fn write(&self, _key: &[u8], _value: Bytes) -> Result<()> {
        Err(ChunkError::Io(std::io::Error::other("disk on fire")))
    }

    async fn read(&self, _key: &[u8]) -> Result<Option<Bytes>> {
        Ok(None)
    }

    fn value_cap(&self) -> usize {
        BLOCK
    }
}

/// Block store that accepts writes but only keeps size records
struct ForgetfulStore {
    inner: MemoryBlockStore,
}

#[async_trait]
impl BlockStore for ForgetfulStore {
    async fn write(&self, key: &[u8], value: Bytes) -> Result<()> {
        if key.ends_with(b"_-1") {
            self.inner.write(key, value).await
        } else {
            Ok(())
        }
    }

    async fn read(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.inner.read(key).await
    }

    fn value_cap(&self) -> usize {
        BLOCK
    }
}

#[tokio::test]
async fn test_store_errors_propagate_unmodified() {
    let engine = Engine::with_store(Arc::new(BrokenStore), test_config()).unwrap();

    let err = engine.write("k", "v").await.unwrap_err();

    assert!(matches!(err, ChunkError::Io(ref e) if e.to_string() == "disk on fire"));
    assert!(!err.is_consistency_failure());
    // Reads still work and report absence
    assert_eq!(engine.read("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_lost_block_writes_fail_verification() {
    let store = ForgetfulStore {
        inner: MemoryBlockStore::new(BLOCK),
    };
    let engine = Engine::with_store(Arc::new(store), test_config()).unwrap();

    let err = engine.write("k", &text(250)).await.unwrap_err();

    assert!(err.is_consistency_failure());
    // Empty values have no blocks to lose
    engine.write("k", "").await.unwrap();
}

// =============================================================================
// Construction Tests
// =============================================================================

#[tokio::test]
async fn test_block_size_above_store_cap_rejected() {
    let store = Arc::new(MemoryBlockStore::new(50));
    let config = Config::builder().block_size(BLOCK).value_cap(4096).build();

    let result = Engine::with_store(store, config);

    assert!(matches!(result, Err(ChunkError::Config(_))));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let factory = MemoryStoreFactory::new(BLOCK);

    let zero = Config::builder().block_size(0).build();
    assert!(matches!(Engine::open(&factory, zero).await, Err(ChunkError::Config(_))));

    let over_cap = Config::builder().block_size(200).value_cap(100).build();
    assert!(matches!(Engine::open(&factory, over_cap).await, Err(ChunkError::Config(_))));
}

#[tokio::test]
async fn test_engines_on_same_store_name_share_data() {
    let factory = MemoryStoreFactory::new(BLOCK);
    let config = Config::builder().block_size(BLOCK).store_name("shared").build();

    let first = Engine::open(&factory, config.clone()).await.unwrap();
    let second = Engine::open(&factory, config).await.unwrap();
    first.write("k", &text(333)).await.unwrap();

    assert_eq!(second.read("k").await.unwrap(), Some(text(333)));
    assert_eq!(second.block_size(), BLOCK);
    assert_eq!(second.config().store_name, "shared");
}

#[tokio::test]
async fn test_engines_on_different_store_names_are_isolated() {
    let factory = MemoryStoreFactory::new(BLOCK);

    let a = Engine::open(&factory, Config::builder().store_name("a").build()).await.unwrap();
    let b = Engine::open(&factory, Config::builder().store_name("b").build()).await.unwrap();
    a.write("k", "in a").await.unwrap();

    assert_eq!(b.read("k").await.unwrap(), None);
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[tokio::test]
async fn test_execute_commands() {
    let (_store, engine) = setup_engine();

    let reply = engine
        .execute(Command::Write {
            key: "k".to_string(),
            value: text(150),
        })
        .await
        .unwrap();
    assert_eq!(reply, Reply::Done);

    let reply = engine.execute(Command::Blocks { key: "k".to_string() }).await.unwrap();
    assert_eq!(reply, Reply::Blocks(2));

    let reply = engine.execute(Command::Read { key: "k".to_string() }).await.unwrap();
    assert_eq!(reply, Reply::Value(Some(text(150))));

    let reply = engine.execute(Command::Delete { key: "k".to_string() }).await.unwrap();
    assert_eq!(reply, Reply::Done);

    let reply = engine.execute(Command::Exists { key: "k".to_string() }).await.unwrap();
    assert_eq!(reply, Reply::Exists(false));

    let reply = engine.execute(Command::Read { key: "k".to_string() }).await.unwrap();
    assert_eq!(reply.to_string(), "(absent)");
}

#[test]
fn test_command_key_and_reply_display() {
    let command = Command::Write {
        key: "k".to_string(),
        value: "v".to_string(),
    };
    assert_eq!(command.key(), "k");

    assert_eq!(Reply::Done.to_string(), "OK");
    assert_eq!(Reply::Value(Some("v".to_string())).to_string(), "v");
    assert_eq!(Reply::Exists(true).to_string(), "true");
    assert_eq!(Reply::Blocks(7).to_string(), "7");
}

// =============================================================================
// Trait Object and Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_engine_as_storage_trait_object() {
    let (_store, engine) = setup_engine();
    let storage: Arc<dyn Storage> = Arc::new(engine);

    storage.write("k", "via trait").await.unwrap();
    assert!(storage.key_exists("k").await.unwrap());
    assert_eq!(storage.read("k").await.unwrap(), Some("via trait".to_string()));

    storage.delete("k").await.unwrap();
    assert_eq!(storage.read("k").await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_distinct_keys() {
    let (_store, engine) = setup_engine();
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for t in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            for i in 0..20 {
                let key = format!("t{}_{}", t, i);
                let value = format!("{}{}", key, text(37 * (i + 1)));
                engine.write(&key, &value).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for t in 0..8 {
        for i in 0..20 {
            let key = format!("t{}_{}", t, i);
            let expected = format!("{}{}", key, text(37 * (i + 1)));
            assert_eq!(engine.read(&key).await.unwrap(), Some(expected));
        }
    }
}
