//! Dataset-key registries for partial-key lookup.
//!
//! # Responsibility
//! - Provide the append-only index a storage backend queries by partial key.
//! - Pick a registry implementation from what exists under a storage root.
//!
//! # Invariants
//! - Lifecycle is tied to the storage root; every repository pointing at the
//!   same root shares its registry.
//! - Registries never mutate repository data; lookup is read-only.

pub mod fs;
pub mod scanner;
pub mod sqlite;

use crate::error::{RepoError, RepoResult};
use crate::model::DataValue;
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the SQLite registry under a storage root.
pub const SQLITE_REGISTRY_NAME: &str = "registry.sqlite3";

/// One lookup constraint on a dataset key.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Equals(DataValue),
    /// Inclusive range on the key's value.
    Range(DataValue, DataValue),
}

/// Partial-key lookup request.
#[derive(Debug, Clone, Default)]
pub struct LookupQuery {
    /// Keys whose values are returned, in output-column order.
    pub properties: Vec<String>,
    /// Reference tables joined for the lookup (SQLite registries only).
    pub references: Vec<String>,
    /// Constraints refining the match.
    pub data_id: BTreeMap<String, Constraint>,
    /// Path template driving filesystem-scan registries.
    pub template: Option<String>,
}

/// Backend-owned index over previously stored dataset keys.
pub trait Registry: Send + Sync {
    /// Rows of property values, one tuple per matching entry, ordered by the
    /// query's property list.
    fn lookup(&self, query: &LookupQuery) -> RepoResult<Vec<Vec<DataValue>>>;
}

/// Creates a registry appropriate for `root`.
///
/// `None` root means no registry is available. A `registry.sqlite3` file
/// under the root wins; otherwise the root directory itself is scanned.
pub fn create(root: Option<&Path>) -> RepoResult<Option<Box<dyn Registry>>> {
    let Some(root) = root else {
        return Ok(None);
    };

    let sqlite_path = root.join(SQLITE_REGISTRY_NAME);
    if sqlite_path.is_file() {
        return Ok(Some(Box::new(sqlite::SqliteRegistry::open(&sqlite_path)?)));
    }
    if root.is_dir() {
        return Ok(Some(Box::new(fs::FsRegistry::new(root))));
    }

    Err(RepoError::Configuration(format!(
        "unable to create registry for root `{}`",
        root.display()
    )))
}
