//! Connection-related data models.
//!
//! This module defines the connection profile a registry stores under a name.

use crate::config::{DatabaseConfig, PoolOptions};
use serde::{Deserialize, Serialize};

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A named connection profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub db_type: DatabaseType,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub connection_string: String,
    pub database: Option<String>,
    #[serde(default)]
    pub pool_options: PoolOptions,
}

impl ConnectionConfig {
    /// Create a new connection profile.
    pub fn new(
        name: impl Into<String>,
        connection_string: impl Into<String>,
        database: Option<String>,
        pool_options: PoolOptions,
    ) -> Result<Self, ConnectionConfigError> {
        let name = name.into();
        let connection_string = connection_string.into();

        validate_connection_name(&name)?;

        let db_type = DatabaseType::from_connection_string(&connection_string)
            .ok_or_else(|| ConnectionConfigError::UnknownDatabaseType(connection_string.clone()))?;

        Ok(Self {
            name,
            db_type,
            connection_string,
            database,
            pool_options,
        })
    }

    /// Get a display-safe version of the connection string (credentials masked).
    pub fn masked_connection_string(&self) -> String {
        let s = &self.connection_string;
        let Some(authority) = s.find("://").map(|pos| pos + 3) else {
            return s.clone();
        };
        if let Some(at_pos) = s[authority..].find('@').map(|pos| authority + pos) {
            // Password is whatever follows the first ':' in the userinfo
            if let Some(colon_pos) = s[authority..at_pos].find(':').map(|pos| authority + pos) {
                return format!("{}****{}", &s[..colon_pos + 1], &s[at_pos..]);
            }
        }
        s.clone()
    }
}

impl TryFrom<DatabaseConfig> for ConnectionConfig {
    type Error = ConnectionConfigError;

    fn try_from(config: DatabaseConfig) -> Result<Self, Self::Error> {
        Self::new(
            config.name,
            config.connection_string,
            config.database,
            config.pool_options,
        )
    }
}

/// Check that a connection name is non-empty and uses only `[A-Za-z0-9_-]`.
pub fn validate_connection_name(name: &str) -> Result<(), ConnectionConfigError> {
    if name.is_empty() {
        return Err(ConnectionConfigError::EmptyName);
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConnectionConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Errors that can occur when creating a connection profile.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Connection name cannot be empty")]
    EmptyName,

    #[error("Connection name contains invalid characters: {0}")]
    InvalidName(String),

    #[error("Unknown database type in connection string: {0}")]
    UnknownDatabaseType(String),
}
