//! # Storage Module
//!
//! Disk-backed snapshot history using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)

mod redb_store;

pub use redb_store::{HistoryStore, StoreError};
