//! Database access layer.
//!
//! This module provides:
//! - Pool creation for MySQL, PostgreSQL and SQLite
//! - The registry of named connection profiles
//! - Model-scoped connection handles

pub mod handle;
pub mod pool;
pub mod registry;

pub use handle::{ConnectionApi, ModelConnection};
pub use pool::{DbPool, create_pool};
pub use registry::ConnectionRegistry;
