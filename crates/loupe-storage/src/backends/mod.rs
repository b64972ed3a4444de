//! Concrete storage backends.
//!
//! Redb is the only backend: pure Rust, embedded, durable on commit, with an
//! in-memory mode for tests.

pub mod redb;

pub use self::redb::{RedbConfig, RedbEngine};
