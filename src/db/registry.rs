//! Named connection profiles.
//!
//! The registry maps a connection name to its profile and opens pools on
//! request. It is read-only once model loading starts.

use crate::config::DatabaseConfig;
use crate::db::pool::{DbPool, create_pool};
use crate::error::{DbError, DbResult};
use crate::models::ConnectionConfig;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    profiles: HashMap<String, ConnectionConfig>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from parsed CLI profiles.
    pub fn from_database_configs(configs: Vec<DatabaseConfig>) -> DbResult<Self> {
        let mut registry = Self::new();
        for config in configs {
            let profile = ConnectionConfig::try_from(config)
                .map_err(|e| DbError::configuration(e.to_string()))?;
            registry.register(profile)?;
        }
        Ok(registry)
    }

    /// Register a profile. Names must be unique.
    pub fn register(&mut self, config: ConnectionConfig) -> DbResult<()> {
        if self.profiles.contains_key(&config.name) {
            return Err(DbError::configuration(format!(
                "Connection '{}' is registered more than once",
                config.name
            )));
        }
        debug!(
            connection = %config.name,
            db_type = %config.db_type,
            url = %config.masked_connection_string(),
            "Registered connection profile"
        );
        self.profiles.insert(config.name.clone(), config);
        Ok(())
    }

    pub fn get(&self, name: &str) -> DbResult<&ConnectionConfig> {
        self.profiles
            .get(name)
            .ok_or_else(|| DbError::connection_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Open a pool for the named profile.
    pub async fn establish(&self, name: &str) -> DbResult<DbPool> {
        let config = self.get(name)?;
        info!(
            connection = %name,
            db_type = %config.db_type,
            url = %config.masked_connection_string(),
            "Establishing connection"
        );
        create_pool(config).await
    }
}
