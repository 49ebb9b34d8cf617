//! Declarative repository configuration.
//!
//! # Responsibility
//! - Define the nested mapping that describes one repository and its
//!   parent/peer relations.
//! - Keep the declarative form stringly so validation happens at
//!   materialization, not at parse time.
//!
//! # Invariants
//! - `parent_join` must normalize to `left` or `outer` before a node is
//!   constructed.
//! - `parents`/`peers` accept a single config or an ordered list; order is
//!   preserved verbatim.

pub mod binder;

use crate::error::{RepoError, RepoResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const PARENT_JOIN_LEFT: &str = "left";
pub const PARENT_JOIN_OUTER: &str = "outer";

/// Join policy for parent search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentJoin {
    /// Return the first non-null result and stop.
    Left,
    /// Collect every non-null top-level parent result, in declared order.
    Outer,
}

impl ParentJoin {
    pub fn parse(value: &str) -> RepoResult<Self> {
        match value.trim() {
            PARENT_JOIN_LEFT => Ok(Self::Left),
            PARENT_JOIN_OUTER => Ok(Self::Outer),
            other => Err(RepoError::Configuration(format!(
                "parentJoin `{other}` is not supported, expected `left` or `outer`"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => PARENT_JOIN_LEFT,
            Self::Outer => PARENT_JOIN_OUTER,
        }
    }
}

impl Display for ParentJoin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_parent_join() -> String {
    PARENT_JOIN_LEFT.to_string()
}

/// Declarative description of one repository.
///
/// `extra` captures any additional keys; the binder hands them to component
/// constructors by parameter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub parents: Vec<RepoConfig>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub peers: Vec<RepoConfig>,
    #[serde(default = "default_parent_join", rename = "parentJoin")]
    pub parent_join: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            repository: None,
            storage: None,
            mapper: None,
            access: None,
            parents: Vec::new(),
            peers: Vec::new(),
            parent_join: default_parent_join(),
            id: None,
            root: None,
            extra: BTreeMap::new(),
        }
    }
}

impl RepoConfig {
    /// Flat key/value view handed to the configuration binder.
    ///
    /// Structural keys (`parents`, `peers`, component names) are not
    /// constructor arguments and stay out of the view.
    pub fn properties(&self) -> BTreeMap<String, serde_json::Value> {
        let mut properties = self.extra.clone();
        if let Some(root) = &self.root {
            properties.insert(
                "root".to_string(),
                serde_json::Value::String(root.to_string_lossy().into_owned()),
            );
        }
        if let Some(id) = &self.id {
            properties.insert("id".to_string(), serde_json::Value::String(id.clone()));
        }
        properties
    }

    pub fn parent_join(&self) -> RepoResult<ParentJoin> {
        ParentJoin::parse(&self.parent_join)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<RepoConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<RepoConfig>),
        One(Box<RepoConfig>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(configs) => configs,
        OneOrMany::One(config) => vec![*config],
    })
}
