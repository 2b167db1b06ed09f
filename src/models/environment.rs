//! Deployment environment types.
//!
//! An [`Environment`] names the context the process runs under ("production",
//! "test", ...). An [`EnvironmentSet`] is what a declaration's `in` and `except`
//! options hold: either every environment or an explicit set of names.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Scalar keyword for "every environment".
pub const ALL_ENVIRONMENTS: &str = "all";

/// Environment used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// A deployment environment identifier. Compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Environment(String);

impl Environment {
    /// Create an environment from a name with surrounding whitespace trimmed.
    /// Empty names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Environment name cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self(DEFAULT_ENVIRONMENT.to_string())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::new(name).map_err(de::Error::custom)
    }
}

/// Either every environment, or an explicit (possibly empty) set of them.
///
/// A single environment is a one-element set. Only the scalar form `"all"` is
/// the sentinel; inside a list, `"all"` is an ordinary name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentSet {
    All,
    Only(BTreeSet<Environment>),
}

impl EnvironmentSet {
    pub fn all() -> Self {
        Self::All
    }

    pub fn empty() -> Self {
        Self::Only(BTreeSet::new())
    }

    pub fn one(environment: Environment) -> Self {
        Self::Only(BTreeSet::from([environment]))
    }

    /// Build a set from names, failing on the first invalid one.
    pub fn of<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(Environment::new)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self::Only)
    }

    /// Check whether `environment` belongs to this set.
    pub fn contains(&self, environment: &Environment) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(environment),
        }
    }

    /// True for an explicit set with no members. `All` is never empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(set) if set.is_empty())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Default for EnvironmentSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Environment> for EnvironmentSet {
    fn from(environment: Environment) -> Self {
        Self::one(environment)
    }
}

impl FromIterator<Environment> for EnvironmentSet {
    fn from_iter<I: IntoIterator<Item = Environment>>(iter: I) -> Self {
        Self::Only(iter.into_iter().collect())
    }
}

/// Parse `"all"` or a comma-separated list of names. Blank items are skipped.
impl FromStr for EnvironmentSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == ALL_ENVIRONMENTS {
            return Ok(Self::All);
        }
        Self::of(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }
}

impl fmt::Display for EnvironmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_ENVIRONMENTS),
            Self::Only(set) => {
                let names: Vec<&str> = set.iter().map(Environment::as_str).collect();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}

impl Serialize for EnvironmentSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str(ALL_ENVIRONMENTS),
            Self::Only(set) => match set.iter().next() {
                Some(env) if set.len() == 1 && env.as_str() != ALL_ENVIRONMENTS => {
                    serializer.serialize_str(env.as_str())
                }
                _ => {
                    let mut seq = serializer.serialize_seq(Some(set.len()))?;
                    for env in set {
                        seq.serialize_element(env)?;
                    }
                    seq.end()
                }
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvironmentSetRepr {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for EnvironmentSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match EnvironmentSetRepr::deserialize(deserializer)? {
            EnvironmentSetRepr::One(name) if name == ALL_ENVIRONMENTS => Ok(Self::All),
            EnvironmentSetRepr::One(name) => Environment::new(name)
                .map(Self::one)
                .map_err(de::Error::custom),
            EnvironmentSetRepr::Many(names) => Self::of(names).map_err(de::Error::custom),
        }
    }
}
