//! Mapper capability contract consumed by the repository graph.
//!
//! Mapper implementations live outside the core: they translate dataset
//! requests into location descriptors however they see fit. The defaults
//! here encode what an implementation that lacks a capability looks like to
//! the resolution engine: a null result keeps a traversal moving, an
//! unsupported-operation error aborts it.

use crate::error::{RepoError, RepoResult};
use crate::model::{DataId, DataValue, DatasetLocation, KeyKind};
use std::collections::{BTreeMap, BTreeSet};

/// Key name -> value type, as returned by `get_keys`.
pub type KeyMap = BTreeMap<String, KeyKind>;

/// Distinct value tuples for a metadata query, one entry per combination.
pub type MetadataSet = BTreeSet<Vec<DataValue>>;

pub trait Mapper: Send + Sync {
    /// Resolves one dataset request to a location, or null when this mapper
    /// has no answer for it.
    fn map(
        &self,
        dataset_type: &str,
        data_id: &DataId,
        write: bool,
    ) -> RepoResult<Option<DatasetLocation>>;

    /// Possible key-value combinations for `format` given a partial data id.
    fn query_metadata(
        &self,
        _dataset_type: &str,
        _format: &[String],
        _data_id: &DataId,
    ) -> RepoResult<Option<MetadataSet>> {
        Ok(None)
    }

    /// Keys this mapper understands at `level`.
    fn get_keys(&self, _dataset_type: &str, _level: Option<&str>) -> RepoResult<Option<KeyMap>> {
        Ok(None)
    }

    /// Preserves the current version of a dataset before it is overwritten.
    fn backup(&self, dataset_type: &str, _data_id: &DataId) -> RepoResult<()> {
        Err(RepoError::Unsupported(format!(
            "mapper does not support backup of `{dataset_type}`"
        )))
    }

    /// Level assumed when callers do not specify one.
    fn default_level(&self) -> Option<String> {
        None
    }
}
