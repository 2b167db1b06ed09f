//! Data models for uses-connection.
//!
//! This module contains the types shared across the crate:
//! - Environment identifiers and environment sets
//! - Connection profiles
//! - Per-model connection declarations

pub mod binding;
pub mod connection;
pub mod environment;

pub use binding::{Bindings, ModelDeclaration, UsesConnection, UsesConnectionModel};
pub use connection::{ConnectionConfig, ConnectionConfigError, DatabaseType};
pub use environment::{ALL_ENVIRONMENTS, DEFAULT_ENVIRONMENT, Environment, EnvironmentSet};
