//! Environment-conditioned connection selection.
//!
//! [`uses_connection`] runs once per model at load time. It decides from the
//! declaration and the current environment whether the model should be rebound,
//! and rebinds it, reconnecting and retrying once if the server dropped the
//! connection.

use crate::db::ConnectionApi;
use crate::error::{DbError, DbResult};
use crate::models::{Environment, EnvironmentSet, UsesConnection, UsesConnectionModel};
use serde::Serialize;
use tracing::{debug, error, info};

/// Establish attempts per call: the first try plus one retry after reconnecting.
pub const MAX_ESTABLISH_ATTEMPTS: u32 = 2;

/// Inputs the selector reads instead of process-wide state.
#[derive(Debug, Clone, Default)]
pub struct SelectorContext {
    environment: Environment,
}

impl SelectorContext {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

/// What the declaration means for the current environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingDecision {
    /// Current environment is listed in `except`.
    Excluded,
    /// Current environment is not covered by `in`.
    NotIncluded,
    Apply,
}

impl BindingDecision {
    /// Compute the decision. `except` wins over `include`.
    pub fn resolve(
        environment: &Environment,
        include: &EnvironmentSet,
        except: &EnvironmentSet,
    ) -> Self {
        if except.contains(environment) {
            Self::Excluded
        } else if include.contains(environment) {
            Self::Apply
        } else {
            Self::NotIncluded
        }
    }
}

/// Result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing changed; the model keeps its existing connection.
    Skipped { decision: BindingDecision },
    /// The model now uses `connection`.
    Bound { connection: String, attempts: u32 },
}

impl Outcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound { .. })
    }
}

/// Rebind `handle` to `connection_name` if the environment calls for it.
///
/// Fails with a configuration error when `include` is empty (in any
/// environment) or when the binding applies but no connection name is given.
/// A dropped server connection on the first attempt triggers one
/// `reconnect()` and one retry; any other error propagates immediately.
pub async fn uses_connection<C>(
    ctx: &SelectorContext,
    handle: &mut C,
    connection_name: Option<&str>,
    include: &EnvironmentSet,
    except: &EnvironmentSet,
) -> DbResult<Outcome>
where
    C: ConnectionApi + Send,
{
    if include.is_empty() {
        return Err(DbError::configuration(
            "environment for inclusion must be specified: set `in` to an environment, a list of environments, or \"all\"",
        ));
    }

    let environment = ctx.environment();
    let decision = BindingDecision::resolve(environment, include, except);
    if decision != BindingDecision::Apply {
        debug!(
            model = %handle.model(),
            environment = %environment,
            decision = ?decision,
            "uses_connection skipped"
        );
        return Ok(Outcome::Skipped { decision });
    }

    let Some(name) = connection_name else {
        return Err(DbError::configuration(
            "connection name required: it must name a registered connection profile",
        ));
    };

    let attempts = establish_with_retry(handle, name).await?;
    debug!(
        model = %handle.model(),
        environment = %environment,
        connection = %name,
        attempts,
        "uses_connection bound model"
    );
    Ok(Outcome::Bound {
        connection: name.to_string(),
        attempts,
    })
}

/// Apply a [`UsesConnection`] declaration.
pub async fn apply<C>(
    ctx: &SelectorContext,
    handle: &mut C,
    declaration: &UsesConnection,
) -> DbResult<Outcome>
where
    C: ConnectionApi + Send,
{
    uses_connection(
        ctx,
        handle,
        declaration.connection_name(),
        &declaration.include,
        &declaration.except,
    )
    .await
}

/// Apply the declaration carried by model type `M`.
pub async fn select_for_model<M, C>(ctx: &SelectorContext, handle: &mut C) -> DbResult<Outcome>
where
    M: UsesConnectionModel,
    C: ConnectionApi + Send,
{
    apply(ctx, handle, &M::uses_connection()).await
}

/// Returns the number of establish attempts made.
async fn establish_with_retry<C>(handle: &mut C, name: &str) -> DbResult<u32>
where
    C: ConnectionApi + Send,
{
    let mut attempt = 1;
    loop {
        match handle.establish_connection(name).await {
            Ok(()) => return Ok(attempt),
            Err(e) if e.is_transient_disconnect() && attempt < MAX_ESTABLISH_ATTEMPTS => {
                info!(
                    model = %handle.model(),
                    connection = %name,
                    error = %e,
                    "uses_connection: server has gone away, trying to reconnect"
                );
                if let Err(reconnect_err) = handle.reconnect().await {
                    error!(
                        model = %handle.model(),
                        connection = %name,
                        error = %reconnect_err,
                        "uses_connection: reconnect failed"
                    );
                    return Err(reconnect_err);
                }
                attempt += 1;
            }
            Err(e) if e.is_transient_disconnect() => return Err(e),
            Err(e) => {
                error!(
                    model = %handle.model(),
                    connection = %name,
                    error = %e,
                    "uses_connection: unexpected error while establishing connection"
                );
                return Err(e);
            }
        }
    }
}
