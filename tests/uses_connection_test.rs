//! Integration tests for binding models against real SQLite pools.

use std::sync::Arc;
use uses_connection::config::{DatabaseConfig, PoolOptions};
use uses_connection::db::{ConnectionApi, ConnectionRegistry, ModelConnection};
use uses_connection::error::{DbError, DbResult};
use uses_connection::models::{ConnectionConfig, UsesConnection, UsesConnectionModel};
use uses_connection::selector::{self, BindingDecision, Outcome, SelectorContext};
use uses_connection::{Environment, EnvironmentSet};

fn registry() -> Arc<ConnectionRegistry> {
    let configs = vec![
        DatabaseConfig::parse("primary=sqlite::memory:").unwrap(),
        DatabaseConfig::parse("shared=sqlite::memory:").unwrap(),
    ];
    Arc::new(ConnectionRegistry::from_database_configs(configs).unwrap())
}

fn ctx(environment: &str) -> SelectorContext {
    SelectorContext::new(Environment::new(environment).unwrap())
}

struct Book;

impl UsesConnectionModel for Book {
    const MODEL: &'static str = "Book";

    fn uses_connection() -> UsesConnection {
        let test = EnvironmentSet::of(["test"]).expect("valid environment name");
        UsesConnection::new("shared").in_all().except(test)
    }
}

#[tokio::test]
async fn test_model_rebound_outside_excluded_environment() {
    let mut handle = ModelConnection::new(Book::MODEL, registry(), "primary");

    let outcome = selector::select_for_model::<Book, _>(&ctx("production"), &mut handle)
        .await
        .unwrap();

    assert!(outcome.is_bound());
    assert_eq!(handle.connection_name(), "shared");
    assert!(handle.is_connected());

    // The rebound pool is usable.
    if let Some(uses_connection::db::DbPool::SQLite(pool)) = handle.pool() {
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await.unwrap();
        assert_eq!(one, 1);
    } else {
        panic!("expected a SQLite pool");
    }
    handle.close().await;
}

#[tokio::test]
async fn test_model_untouched_in_excluded_environment() {
    let mut handle = ModelConnection::new(Book::MODEL, registry(), "primary");

    let outcome = selector::select_for_model::<Book, _>(&ctx("test"), &mut handle)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Skipped {
            decision: BindingDecision::Excluded
        }
    );
    assert_eq!(handle.connection_name(), "primary");
    assert!(handle.pool().is_none());
}

#[tokio::test]
async fn test_unregistered_connection_propagates_without_rebind() {
    let mut handle = ModelConnection::new("Book", registry(), "primary");

    let err = selector::uses_connection(
        &ctx("production"),
        &mut handle,
        Some("missing"),
        &EnvironmentSet::All,
        &EnvironmentSet::empty(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DbError::ConnectionNotFound { .. }));
    assert_eq!(handle.connection_name(), "primary");
}

#[tokio::test]
async fn test_missing_connection_name_fails_before_connecting() {
    let mut handle = ModelConnection::new("Book", registry(), "primary");
    let decl = UsesConnection::unnamed().in_all();

    let err = selector::apply(&ctx("production"), &mut handle, &decl)
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(handle.pool().is_none());
}

/// Real handle that reports a dropped server connection on its first
/// `fail_times` establish calls.
struct FlakyConnection {
    inner: ModelConnection,
    fail_times: u32,
    reconnects: u32,
}

impl ConnectionApi for FlakyConnection {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn establish_connection(&mut self, name: &str) -> DbResult<()> {
        if self.fail_times > 0 {
            self.fail_times -= 1;
            return Err(DbError::database(
                "MySQL server has gone away",
                Some("2006".to_string()),
                "Reconnect",
            ));
        }
        self.inner.establish_connection(name).await
    }

    async fn reconnect(&mut self) -> DbResult<()> {
        self.reconnects += 1;
        self.inner.reconnect().await
    }
}

#[tokio::test]
async fn test_gone_away_once_then_bound() {
    let mut handle = FlakyConnection {
        inner: ModelConnection::new("Book", registry(), "primary"),
        fail_times: 1,
        reconnects: 0,
    };
    // Model already holds an open default connection.
    handle.inner.establish_connection("primary").await.unwrap();

    let outcome = selector::uses_connection(
        &ctx("production"),
        &mut handle,
        Some("shared"),
        &EnvironmentSet::All,
        &EnvironmentSet::empty(),
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        Outcome::Bound {
            connection: "shared".to_string(),
            attempts: 2
        }
    );
    assert_eq!(handle.reconnects, 1);
    assert_eq!(handle.inner.connection_name(), "shared");
    assert!(handle.inner.is_connected());
}

#[tokio::test]
async fn test_gone_away_twice_fails() {
    let mut handle = FlakyConnection {
        inner: ModelConnection::new("Book", registry(), "primary"),
        fail_times: 2,
        reconnects: 0,
    };

    let err = selector::uses_connection(
        &ctx("production"),
        &mut handle,
        Some("shared"),
        &EnvironmentSet::All,
        &EnvironmentSet::empty(),
    )
    .await
    .unwrap_err();

    assert!(err.is_transient_disconnect());
    assert_eq!(handle.reconnects, 1);
    assert_eq!(handle.inner.connection_name(), "primary");
}

#[tokio::test]
async fn test_staging_in_listed_environments() {
    let mut registry = ConnectionRegistry::new();
    registry
        .register(
            ConnectionConfig::new("shared", "sqlite::memory:", None, PoolOptions::default())
                .unwrap(),
        )
        .unwrap();
    let mut handle = ModelConnection::new("Book", Arc::new(registry), "primary");

    let include = EnvironmentSet::of(["production", "staging"]).unwrap();
    let outcome = selector::uses_connection(
        &ctx("staging"),
        &mut handle,
        Some("shared"),
        &include,
        &EnvironmentSet::empty(),
    )
    .await
    .unwrap();

    assert!(outcome.is_bound());
    assert_eq!(handle.connection_name(), "shared");

    let mut other = ModelConnection::new("Other", Arc::new(ConnectionRegistry::new()), "primary");
    let outcome = selector::uses_connection(
        &ctx("development"),
        &mut other,
        Some("shared"),
        &include,
        &EnvironmentSet::empty(),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome,
        Outcome::Skipped {
            decision: BindingDecision::NotIncluded
        }
    );
}
