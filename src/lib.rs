//! uses-connection library
//!
//! Lets each model choose, once at load time, which named database connection
//! it uses, depending on the deployment environment. A connection dropped by a
//! MySQL server during that first bind is reconnected and retried once.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod selector;

pub use config::Config;
pub use db::{ConnectionApi, ConnectionRegistry, ModelConnection};
pub use error::{DbError, DbResult};
pub use models::{Environment, EnvironmentSet, UsesConnection, UsesConnectionModel};
pub use selector::{BindingDecision, Outcome, SelectorContext, uses_connection};
