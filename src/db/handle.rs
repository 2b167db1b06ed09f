//! Model-scoped connection handles.
//!
//! Each model owns one [`ModelConnection`]: the connection name it currently
//! uses and the pool opened for it. The selector only talks to handles through
//! [`ConnectionApi`], so tests can substitute their own.

use crate::db::pool::DbPool;
use crate::db::registry::ConnectionRegistry;
use crate::error::DbResult;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Connection operations a model exposes to the selector.
pub trait ConnectionApi {
    /// Model name, for logging.
    fn model(&self) -> &str;

    /// Point the model at the named connection. On error the previous
    /// connection stays in place.
    fn establish_connection(&mut self, name: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Drop and reopen the model's current connection.
    fn reconnect(&mut self) -> impl Future<Output = DbResult<()>> + Send;
}

#[derive(Debug)]
pub struct ModelConnection {
    model: String,
    registry: Arc<ConnectionRegistry>,
    connection_name: String,
    pool: Option<DbPool>,
}

impl ModelConnection {
    /// Handle starting on `default_connection`. Nothing is opened yet.
    pub fn new(
        model: impl Into<String>,
        registry: Arc<ConnectionRegistry>,
        default_connection: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            registry,
            connection_name: default_connection.into(),
            pool: None,
        }
    }

    /// Name of the connection the model currently uses.
    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    /// Pool for the current connection, once one has been opened.
    pub fn pool(&self) -> Option<&DbPool> {
        self.pool.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.pool.as_ref().is_some_and(|pool| !pool.is_closed())
    }

    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }
}

impl ConnectionApi for ModelConnection {
    fn model(&self) -> &str {
        &self.model
    }

    async fn establish_connection(&mut self, name: &str) -> DbResult<()> {
        let pool = self.registry.establish(name).await?;
        if let Some(previous) = self.pool.replace(pool) {
            previous.close().await;
        }
        debug!(
            model = %self.model,
            from = %self.connection_name,
            to = %name,
            "Model connection rebound"
        );
        self.connection_name = name.to_string();
        Ok(())
    }

    async fn reconnect(&mut self) -> DbResult<()> {
        if self.pool.is_none() {
            debug!(
                model = %self.model,
                connection = %self.connection_name,
                "No open connection to reconnect"
            );
            return Ok(());
        }
        info!(
            model = %self.model,
            connection = %self.connection_name,
            "Reconnecting"
        );
        // Old pool stays in place until the new one is open.
        let pool = self.registry.establish(&self.connection_name).await?;
        if let Some(previous) = self.pool.replace(pool) {
            previous.close().await;
        }
        Ok(())
    }
}
