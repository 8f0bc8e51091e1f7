//! SQLite storage layer.
//!
//! The fragment store runs on WAL mode with split read/write connection pools.

pub mod fragment;
pub mod pool;
