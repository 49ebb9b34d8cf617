//! Shared fixtures for the repository-graph integration tests.
#![allow(dead_code)]

use datarepo_core::component::MapperFactory;
use datarepo_core::config::binder::{BoundArgs, ParamSpec};
use datarepo_core::error::{RepoError, RepoResult};
use datarepo_core::mapper::{KeyMap, Mapper, MetadataSet};
use datarepo_core::model::{DataId, DataValue, DatasetLocation, KeyKind};
use datarepo_core::registry::{Constraint, LookupQuery};
use datarepo_core::storage::{Access, STORAGE_BLOB};
use datarepo_core::{ComponentRegistry, RepoConfig};
use std::path::Path;
use std::sync::Arc;

pub const FILE_MAPPER: &str = "file";

/// Deterministic relative address for one dataset request. Key order is
/// stable because data ids are ordered maps.
pub fn dataset_file_name(dataset_type: &str, data_id: &DataId) -> String {
    let mut name = dataset_type.to_string();
    for (key, value) in data_id {
        name.push('_');
        name.push_str(key);
        name.push_str(&value.render());
    }
    name.push_str(".bin");
    name
}

/// Test mapper: one blob file per dataset request, directly under the root.
///
/// Read-side mapping answers null when the file is absent, which is what
/// lets parent searches fall through to the next repository.
struct FileMapper {
    access: Access,
}

impl Mapper for FileMapper {
    fn map(
        &self,
        dataset_type: &str,
        data_id: &DataId,
        write: bool,
    ) -> RepoResult<Option<DatasetLocation>> {
        let relative = dataset_file_name(dataset_type, data_id);
        if !write && !self.access.storage().exists(&relative)? {
            return Ok(None);
        }
        Ok(Some(DatasetLocation::new(
            None,
            STORAGE_BLOB,
            vec![relative],
            data_id.clone(),
        )))
    }

    fn query_metadata(
        &self,
        dataset_type: &str,
        format: &[String],
        data_id: &DataId,
    ) -> RepoResult<Option<MetadataSet>> {
        let mut query = LookupQuery {
            properties: format.to_vec(),
            template: Some(format!("{dataset_type}_visit%(visit)d.bin")),
            ..LookupQuery::default()
        };
        for (key, value) in data_id {
            query
                .data_id
                .insert(key.clone(), Constraint::Equals(value.clone()));
        }
        let rows = self.access.storage().lookup(&query)?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.into_iter().collect()))
    }

    fn get_keys(&self, _dataset_type: &str, _level: Option<&str>) -> RepoResult<Option<KeyMap>> {
        let mut keys = KeyMap::new();
        keys.insert("visit".to_string(), KeyKind::Int);
        Ok(Some(keys))
    }

    fn backup(&self, dataset_type: &str, data_id: &DataId) -> RepoResult<()> {
        let relative = dataset_file_name(dataset_type, data_id);
        if !self.access.storage().exists(&relative)? {
            return Ok(());
        }
        let source = DatasetLocation::new(
            None,
            STORAGE_BLOB,
            vec![relative.clone()],
            data_id.clone(),
        );
        let mut datasets = self.access.read(&source)?;
        let target = DatasetLocation::new(
            None,
            STORAGE_BLOB,
            vec![format!("{relative}~1")],
            data_id.clone(),
        );
        if let Some(dataset) = datasets.pop() {
            self.access.write(&target, &dataset)?;
        }
        Ok(())
    }

    fn default_level(&self) -> Option<String> {
        Some("visit".to_string())
    }
}

struct FileMapperFactory;

impl MapperFactory for FileMapperFactory {
    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[];
        PARAMS
    }

    fn create(&self, _args: &BoundArgs, access: Option<&Access>) -> RepoResult<Arc<dyn Mapper>> {
        let access = access.cloned().ok_or_else(|| {
            RepoError::Configuration("file mapper requires storage access".to_string())
        })?;
        Ok(Arc::new(FileMapper { access }))
    }
}

pub fn components() -> ComponentRegistry {
    let mut registry = ComponentRegistry::with_builtins();
    registry
        .register_mapper(FILE_MAPPER, Arc::new(FileMapperFactory))
        .expect("file mapper registration");
    registry
}

/// A posix-backed repository config with the test mapper.
pub fn repo_config(root: &Path) -> RepoConfig {
    RepoConfig {
        storage: Some("posix".to_string()),
        mapper: Some(FILE_MAPPER.to_string()),
        root: Some(root.to_path_buf()),
        ..RepoConfig::default()
    }
}

pub fn visit_id(visit: i64) -> DataId {
    let mut data_id = DataId::new();
    data_id.insert("visit".to_string(), DataValue::Int(visit));
    data_id
}
