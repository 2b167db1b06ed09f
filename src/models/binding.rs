//! Per-model connection declarations.
//!
//! A [`UsesConnection`] is the declarative call a model makes at load time:
//! which connection to use, in which environments, and where not to.
//! [`Bindings`] is the JSON file the CLI reads to run many declarations at once.

use crate::error::{DbError, DbResult};
use crate::models::environment::EnvironmentSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A model's connection declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsesConnection {
    /// Connection profile to bind to. Required whenever the declaration applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Environments the binding applies in. Must not be empty.
    #[serde(default, rename = "in")]
    pub include: EnvironmentSet,
    /// Environments that skip the binding, checked before `include`.
    #[serde(default)]
    pub except: EnvironmentSet,
}

impl UsesConnection {
    /// Declare a binding to `connection`. Add environments with [`Self::include`].
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: Some(connection.into()),
            ..Self::default()
        }
    }

    /// Declaration without a connection name.
    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn include(mut self, environments: impl Into<EnvironmentSet>) -> Self {
        self.include = environments.into();
        self
    }

    pub fn except(mut self, environments: impl Into<EnvironmentSet>) -> Self {
        self.except = environments.into();
        self
    }

    pub fn in_all(self) -> Self {
        self.include(EnvironmentSet::All)
    }

    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }
}

/// A model type that carries its own connection declaration.
///
/// ```ignore
/// struct Book;
///
/// impl UsesConnectionModel for Book {
///     const MODEL: &'static str = "Book";
///
///     fn uses_connection() -> UsesConnection {
///         let test = EnvironmentSet::of(["test"]).expect("valid environment name");
///         UsesConnection::new("shared").in_all().except(test)
///     }
/// }
/// ```
pub trait UsesConnectionModel {
    /// Name used for the model in logs and reports.
    const MODEL: &'static str;

    fn uses_connection() -> UsesConnection;
}

/// One model's entry in a bindings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDeclaration {
    pub model: String,
    #[serde(flatten)]
    pub uses: UsesConnection,
}

/// Declarations for a set of models, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    #[serde(default)]
    pub models: Vec<ModelDeclaration>,
}

impl Bindings {
    /// Parse a bindings document.
    ///
    /// ```text
    /// {
    ///   "models": [
    ///     { "model": "Book", "connection": "shared", "in": "all", "except": ["test"] },
    ///     { "model": "Report", "connection": "warehouse", "in": "production" }
    ///   ]
    /// }
    /// ```
    pub fn from_json(json: &str) -> DbResult<Self> {
        let bindings: Self = serde_json::from_str(json)
            .map_err(|e| DbError::configuration(format!("Invalid bindings file: {e}")))?;
        bindings.validate()?;
        Ok(bindings)
    }

    /// Read and parse a bindings file.
    pub async fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            DbError::configuration(format!(
                "Cannot read bindings file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> DbResult<()> {
        let mut seen = HashSet::new();
        for decl in &self.models {
            if decl.model.trim().is_empty() {
                return Err(DbError::configuration("Model name cannot be empty"));
            }
            if !seen.insert(decl.model.as_str()) {
                return Err(DbError::configuration(format!(
                    "Model '{}' is declared more than once",
                    decl.model
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::environment::Environment;

    #[test]
    fn test_builder() {
        let decl = UsesConnection::new("shared")
            .in_all()
            .except(EnvironmentSet::of(["test"]).unwrap());
        assert_eq!(decl.connection_name(), Some("shared"));
        assert!(decl.include.is_all());
        assert!(decl.except.contains(&Environment::new("test").unwrap()));
    }

    #[test]
    fn test_default_declaration_has_empty_sets() {
        let decl = UsesConnection::unnamed();
        assert!(decl.connection.is_none());
        assert!(decl.include.is_empty());
        assert!(decl.except.is_empty());
    }

    #[test]
    fn test_blank_except_name_is_rejected() {
        assert!(EnvironmentSet::of([" "]).is_err());
        let decl: Result<UsesConnection, _> =
            serde_json::from_str(r#"{"connection": "shared", "in": "all", "except": " "}"#);
        assert!(decl.is_err());
    }

    #[test]
    fn test_deserialize_declaration() {
        let decl: UsesConnection =
            serde_json::from_str(r#"{"connection": "shared", "in": ["production", "staging"]}"#)
                .unwrap();
        assert_eq!(decl.connection_name(), Some("shared"));
        assert_eq!(
            decl.include,
            EnvironmentSet::of(["production", "staging"]).unwrap()
        );
        assert!(decl.except.is_empty());
    }

    #[test]
    fn test_bindings_from_json() {
        let bindings = Bindings::from_json(
            r#"{
                "models": [
                    {"model": "Book", "connection": "shared", "in": "all", "except": "test"},
                    {"model": "Report", "in": "production"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.models[0].model, "Book");
        assert!(bindings.models[0].uses.include.is_all());
        assert!(bindings.models[1].uses.connection.is_none());
    }

    #[test]
    fn test_bindings_duplicate_model_rejected() {
        let err = Bindings::from_json(
            r#"{"models": [{"model": "Book", "in": "all"}, {"model": "Book", "in": "test"}]}"#,
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_bindings_invalid_json_rejected() {
        let err = Bindings::from_json("{not json").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_bindings_empty_document() {
        let bindings = Bindings::from_json("{}").unwrap();
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_declaration_round_trips_wire_names() {
        let decl = ModelDeclaration {
            model: "Book".to_string(),
            uses: UsesConnection::new("shared").in_all(),
        };
        let json = serde_json::to_value(&decl).unwrap();
        assert_eq!(json["in"], "all");
        assert_eq!(json["connection"], "shared");
    }
}
