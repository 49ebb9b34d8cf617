//! Named component factories used during materialization.
//!
//! # Responsibility
//! - Resolve declarative component names to constructible factories.
//! - Keep pluggability without resolving arbitrary type paths at runtime.
//!
//! # Invariants
//! - Factory keys are validated and unique per component kind.
//! - Lookup failure is a configuration error, reported before any I/O.

use crate::config::binder::{BoundArgs, ParamSpec};
use crate::error::{RepoError, RepoResult};
use crate::mapper::Mapper;
use crate::storage::posix::PosixStorageFactory;
use crate::storage::{Access, Storage};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Component key of the built-in filesystem storage backend.
pub const STORAGE_POSIX: &str = "posix";

/// Builds a storage backend from bound configuration arguments.
pub trait StorageFactory: Send + Sync {
    fn params(&self) -> &'static [ParamSpec];
    fn create(&self, args: &BoundArgs) -> RepoResult<Arc<dyn Storage>>;
}

/// Builds a mapper from bound configuration arguments and the repository's
/// access handle, when one exists.
pub trait MapperFactory: Send + Sync {
    fn params(&self) -> &'static [ParamSpec];
    fn create(&self, args: &BoundArgs, access: Option<&Access>) -> RepoResult<Arc<dyn Mapper>>;
}

/// Registry of named factories, one namespace per component kind.
#[derive(Default)]
pub struct ComponentRegistry {
    storages: BTreeMap<String, Arc<dyn StorageFactory>>,
    mappers: BTreeMap<String, Arc<dyn MapperFactory>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in `posix` storage backend.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.storages.insert(
            STORAGE_POSIX.to_string(),
            Arc::new(PosixStorageFactory::default()),
        );
        registry
    }

    pub fn register_storage(
        &mut self,
        key: &str,
        factory: Arc<dyn StorageFactory>,
    ) -> RepoResult<()> {
        let key = validated_key(key)?;
        if self.storages.contains_key(&key) {
            return Err(RepoError::Configuration(format!(
                "storage factory `{key}` is already registered"
            )));
        }
        self.storages.insert(key, factory);
        Ok(())
    }

    pub fn register_mapper(
        &mut self,
        key: &str,
        factory: Arc<dyn MapperFactory>,
    ) -> RepoResult<()> {
        let key = validated_key(key)?;
        if self.mappers.contains_key(&key) {
            return Err(RepoError::Configuration(format!(
                "mapper factory `{key}` is already registered"
            )));
        }
        self.mappers.insert(key, factory);
        Ok(())
    }

    pub fn storage_factory(&self, key: &str) -> RepoResult<&Arc<dyn StorageFactory>> {
        self.storages.get(key.trim()).ok_or_else(|| {
            RepoError::Configuration(format!("no storage factory registered for `{key}`"))
        })
    }

    pub fn mapper_factory(&self, key: &str) -> RepoResult<&Arc<dyn MapperFactory>> {
        self.mappers.get(key.trim()).ok_or_else(|| {
            RepoError::Configuration(format!("no mapper factory registered for `{key}`"))
        })
    }

    pub fn storage_keys(&self) -> Vec<&str> {
        self.storages.keys().map(String::as_str).collect()
    }

    pub fn mapper_keys(&self) -> Vec<&str> {
        self.mappers.keys().map(String::as_str).collect()
    }
}

/// Keys follow legacy qualified names: alphanumerics plus `.`, `_`, `-`.
fn validated_key(key: &str) -> RepoResult<String> {
    let key = key.trim();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');
    if valid {
        Ok(key.to_string())
    } else {
        Err(RepoError::Configuration(format!(
            "invalid component key `{key}`"
        )))
    }
}
