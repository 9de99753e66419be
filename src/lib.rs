//! # ChunkKV
//!
//! Arbitrary-length string storage over a fixed-block-size key-value
//! primitive:
//! - Values are split into blocks no larger than the store's write cap
//! - A per-key size record tracks how many blocks a key owns
//! - Derived block keys are escaped so distinct keys never collide
//! - Every write is read back and checked before it completes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Callers (CLI, Mailbox, embedders)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  write / read / delete / key_exists
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Engine                               │
//! └──────┬──────────────────────────────────────────┬───────────┘
//!        │                                          │
//!        ▼                                          ▼
//! ┌─────────────┐                           ┌─────────────┐
//! │    keys     │                           │    chunk    │
//! │ (namespace) │                           │ (split/join)│
//! └─────────────┘                           └─────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  BlockStore (capped writes)                  │
//! │           MemoryBlockStore │ FileBlockStore ─▶ wal           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keys;
pub mod chunk;
pub mod wal;
pub mod block;
pub mod storage;
pub mod command;
pub mod engine;
pub mod mailbox;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use block::{BlockStore, BlockStoreFactory, FileStoreFactory, MemoryStoreFactory};
pub use command::{Command, Reply};
pub use config::Config;
pub use engine::Engine;
pub use error::{ChunkError, Result};
pub use storage::Storage;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ChunkKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
