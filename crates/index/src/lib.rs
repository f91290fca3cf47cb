//! Persistent priority index for a size-bounded content cache.
//!
//! This crate keeps the durable bookkeeping beneath a content cache: which
//! objects are cached (by fingerprint), how large they are, how valuable they
//! are (priority), and which storage tier holds them. It does not store the
//! objects themselves.
//!
//! # Architecture
//! A single SQLite table, `prism_data`, holds one row per [`Entry`]. The
//! [`Index`] handle enforces a fixed byte budget: every insert runs in one
//! transaction that writes the row and then evicts the lowest-priority entries
//! (oldest first among equal priorities) until the retained total fits again.
//! Ids come from SQLite's `AUTOINCREMENT` sequence, so they keep increasing
//! across evictions and reopens.

mod db;
pub mod error;
mod evict;
mod index;
mod models;

pub use crate::db::TABLE_NAME;
pub use crate::index::Index;
pub use crate::models::{Entry, Insertion};
pub use prism_config::IndexConfig;
