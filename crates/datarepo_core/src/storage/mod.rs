//! Storage capability contract exposed by the core to mappers and backends.
//!
//! # Responsibility
//! - Define the backend seam (`Storage`) and the access handle a repository
//!   node owns.
//! - Define the persistence-engine seam for storage kinds the reference
//!   backend does not decode itself.
//!
//! # Invariants
//! - A file-backed write either lands atomically at the final path or leaves
//!   no trace there.

pub mod posix;
pub mod safe_io;

use crate::config::RepoConfig;
use crate::error::RepoResult;
use crate::model::{DataId, DataValue, Dataset, DatasetLocation};
use crate::registry::LookupQuery;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opaque byte payloads.
pub const STORAGE_BLOB: &str = "BlobStorage";
/// Structured JSON documents, including persisted repository descriptors.
pub const STORAGE_JSON: &str = "JsonStorage";
/// Tabular rows.
pub const STORAGE_CATALOG: &str = "CatalogStorage";

/// Value-type marker for a persisted repository descriptor document.
pub const VALUE_TYPE_REPO_CONFIG: &str = "RepoConfig";

/// Byte-level persist/retrieve against a location descriptor.
pub trait Storage: Send + Sync {
    fn root(&self) -> Option<&Path>;

    fn write(&self, location: &DatasetLocation, obj: &Dataset) -> RepoResult<()>;

    /// One dataset per address string in the location, in order.
    fn read(&self, location: &DatasetLocation) -> RepoResult<Vec<Dataset>>;

    /// Whether `relative` exists under the configured root.
    fn exists(&self, relative: &str) -> RepoResult<bool>;

    /// Full path of `relative` under the configured root.
    fn location_with_root(&self, relative: &str) -> RepoResult<PathBuf>;

    /// Partial-key match against the backend-owned registry.
    fn lookup(&self, query: &LookupQuery) -> RepoResult<Vec<Vec<DataValue>>>;

    /// Mapper name recorded by the legacy on-disk marker chain, or `None`
    /// when no marker exists. A marker holding a malformed name is a
    /// configuration error, never `None`.
    fn mapper_name(&self) -> RepoResult<Option<String>>;

    fn write_descriptor(&self, config: &RepoConfig) -> RepoResult<()>;

    fn load_descriptor(&self) -> RepoResult<RepoConfig>;
}

/// Codec seam for storage kinds the reference backend hands off.
///
/// Decoding is owned by the injected engine, not reimplemented by the
/// backend. The engine is an explicit constructor dependency, never ambient
/// state.
pub trait PersistenceEngine: Send + Sync {
    fn persist(
        &self,
        storage_name: &str,
        path: &Path,
        obj: &Dataset,
        additional_data: &DataId,
    ) -> RepoResult<()>;

    fn retrieve(
        &self,
        storage_name: &str,
        value_type: Option<&str>,
        path: &Path,
        additional_data: &DataId,
    ) -> RepoResult<Dataset>;
}

/// Storage-access handle owned by a repository node.
#[derive(Clone)]
pub struct Access {
    storage: Arc<dyn Storage>,
}

impl Access {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn write(&self, location: &DatasetLocation, obj: &Dataset) -> RepoResult<()> {
        self.storage.write(location, obj)
    }

    pub fn read(&self, location: &DatasetLocation) -> RepoResult<Vec<Dataset>> {
        self.storage.read(location)
    }

    pub fn mapper_name(&self) -> RepoResult<Option<String>> {
        self.storage.mapper_name()
    }

    pub fn write_descriptor(&self, config: &RepoConfig) -> RepoResult<()> {
        self.storage.write_descriptor(config)
    }

    pub fn load_descriptor(&self) -> RepoResult<RepoConfig> {
        self.storage.load_descriptor()
    }
}

impl std::fmt::Debug for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Access")
            .field("root", &self.storage.root())
            .finish()
    }
}
