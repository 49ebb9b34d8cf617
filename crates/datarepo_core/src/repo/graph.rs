//! Repository nodes and the two generic traversal primitives.

use crate::config::ParentJoin;
use crate::error::{RepoError, RepoResult};
use crate::mapper::{KeyMap, Mapper, MetadataSet};
use crate::model::{DataId, Dataset, DatasetLocation};
use crate::storage::Access;
use std::sync::Arc;

/// Arena handle of one repository node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoHandle(usize);

impl RepoHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One graph node: a mapper, a storage-access handle, and ordered relations.
///
/// Topology is fixed at materialization; nodes relate to each other only
/// through arena handles and never own each other.
pub struct Repository {
    id: Option<String>,
    mapper: Option<Arc<dyn Mapper>>,
    access: Option<Access>,
    parents: Vec<RepoHandle>,
    peers: Vec<RepoHandle>,
    parent_join: ParentJoin,
}

impl Repository {
    pub fn new(
        id: Option<String>,
        mapper: Option<Arc<dyn Mapper>>,
        access: Option<Access>,
        parents: Vec<RepoHandle>,
        peers: Vec<RepoHandle>,
        parent_join: ParentJoin,
    ) -> Self {
        Self {
            id,
            mapper,
            access,
            parents,
            peers,
            parent_join,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn access(&self) -> Option<&Access> {
        self.access.as_ref()
    }

    pub fn mapper(&self) -> Option<&Arc<dyn Mapper>> {
        self.mapper.as_ref()
    }

    pub fn parents(&self) -> &[RepoHandle] {
        &self.parents
    }

    pub fn peers(&self) -> &[RepoHandle] {
        &self.peers
    }

    pub fn parent_join(&self) -> ParentJoin {
        self.parent_join
    }
}

/// Result of one per-node operation: a scalar or a sequence.
///
/// The distinction matters to accumulation: sequences flatten into the
/// caller's accumulator, scalars append as single elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Hits<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Hits<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    /// Unwraps a result that is structurally expected to be single.
    ///
    /// `Err` carries every element when the expectation does not hold.
    pub fn into_single(self) -> Result<T, Vec<T>> {
        let mut items = self.into_vec();
        if items.len() == 1 {
            Ok(items.swap_remove(0))
        } else {
            Err(items)
        }
    }

    fn collect_into(self, accumulator: &mut Vec<T>) {
        match self {
            Self::One(item) => accumulator.push(item),
            Self::Many(items) => accumulator.extend(items),
        }
    }
}

/// Arena owning every repository node of one composed graph.
///
/// Callers must keep the parent relation acyclic; the engine recurses on the
/// ordinary call stack and does not detect cycles.
#[derive(Default)]
pub struct RepoGraph {
    nodes: Vec<Repository>,
}

impl RepoGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node whose relations must already live in this arena.
    pub fn add_node(&mut self, node: Repository) -> RepoResult<RepoHandle> {
        for relation in node.parents.iter().chain(&node.peers) {
            if relation.0 >= self.nodes.len() {
                return Err(RepoError::Configuration(format!(
                    "repository relation refers to unknown node {}",
                    relation.0
                )));
            }
        }
        self.nodes.push(node);
        Ok(RepoHandle(self.nodes.len() - 1))
    }

    /// Whether `handle` was minted by this graph.
    pub fn contains(&self, handle: RepoHandle) -> bool {
        handle.0 < self.nodes.len()
    }

    pub fn node(&self, handle: RepoHandle) -> &Repository {
        &self.nodes[handle.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Runs `op` on `node`, then on each of its peers in declared order.
    ///
    /// Non-null results are flattened into one accumulator. An empty
    /// accumulator yields `None`, never an empty collection, so callers can
    /// tell "no results" from "empty collection result".
    pub fn self_and_peers<T, F>(&self, node: RepoHandle, op: &F) -> RepoResult<Option<Vec<T>>>
    where
        F: Fn(&Self, RepoHandle) -> RepoResult<Option<Hits<T>>>,
    {
        let mut collected = Vec::new();
        if let Some(hits) = op(self, node)? {
            hits.collect_into(&mut collected);
        }
        for &peer in self.node(node).peers() {
            if let Some(hits) = op(self, peer)? {
                hits.collect_into(&mut collected);
            }
        }
        Ok(if collected.is_empty() {
            None
        } else {
            Some(collected)
        })
    }

    /// Depth-first, priority-ordered ancestor search.
    ///
    /// For each parent in declared order: run `op`; on null, search that
    /// parent's own parents (under the parent's own join mode) before moving
    /// to the next sibling. Left join returns the first non-null result and
    /// visits nothing further. Outer join collects one result per yielding
    /// top-level parent, in declared order, without descending past a parent
    /// that yielded.
    pub fn search_parents<T, F>(&self, node: RepoHandle, op: &F) -> RepoResult<Option<Hits<T>>>
    where
        F: Fn(&Self, RepoHandle) -> RepoResult<Option<Hits<T>>>,
    {
        let mut collected = Vec::new();
        for &parent in self.node(node).parents() {
            let mut result = op(self, parent)?;
            if result.is_none() {
                result = self.search_parents(parent, op)?;
            }
            if let Some(hits) = result {
                match self.node(node).parent_join() {
                    ParentJoin::Left => return Ok(Some(hits)),
                    ParentJoin::Outer => hits.collect_into(&mut collected),
                }
            }
        }
        Ok(if collected.is_empty() {
            None
        } else {
            Some(Hits::Many(collected))
        })
    }

    /// `map` against one node only: its own mapper, no traversal. Resolved
    /// locations are stamped with the producing node.
    fn map_only(
        &self,
        node: RepoHandle,
        dataset_type: &str,
        data_id: &DataId,
        write: bool,
    ) -> RepoResult<Option<Hits<DatasetLocation>>> {
        let Some(mapper) = self.node(node).mapper() else {
            return Ok(None);
        };
        match mapper.map(dataset_type, data_id, write)? {
            Some(mut location) => {
                location.stamp_repository(node);
                Ok(Some(Hits::One(location)))
            }
            None => Ok(None),
        }
    }

    /// Resolves locations for one dataset request.
    ///
    /// Writing fans out over self and peers; reading searches ancestors.
    pub fn map(
        &self,
        node: RepoHandle,
        dataset_type: &str,
        data_id: &DataId,
        for_write: bool,
    ) -> RepoResult<Option<Hits<DatasetLocation>>> {
        let op = |graph: &Self, target: RepoHandle| {
            graph.map_only(target, dataset_type, data_id, for_write)
        };
        if for_write {
            Ok(self.self_and_peers(node, &op)?.map(Hits::Many))
        } else {
            self.search_parents(node, &op)
        }
    }

    /// Read-side `map` that structurally expects a single location.
    pub fn map_single(
        &self,
        node: RepoHandle,
        dataset_type: &str,
        data_id: &DataId,
    ) -> RepoResult<DatasetLocation> {
        match self.map(node, dataset_type, data_id, false)? {
            None => Err(RepoError::NotFound(format!(
                "no location found for dataset type `{dataset_type}`"
            ))),
            Some(hits) => hits
                .into_single()
                .map_err(RepoError::MultipleResults),
        }
    }

    pub fn query_metadata(
        &self,
        node: RepoHandle,
        dataset_type: &str,
        format: &[String],
        data_id: &DataId,
    ) -> RepoResult<Option<Hits<MetadataSet>>> {
        self.search_parents(node, &|graph: &Self, target: RepoHandle| {
            let Some(mapper) = graph.node(target).mapper() else {
                return Ok(None);
            };
            Ok(mapper
                .query_metadata(dataset_type, format, data_id)?
                .map(Hits::One))
        })
    }

    pub fn get_keys(
        &self,
        node: RepoHandle,
        dataset_type: &str,
        level: Option<&str>,
    ) -> RepoResult<Option<Hits<KeyMap>>> {
        self.search_parents(node, &|graph: &Self, target: RepoHandle| {
            let Some(mapper) = graph.node(target).mapper() else {
                return Ok(None);
            };
            Ok(mapper.get_keys(dataset_type, level)?.map(Hits::One))
        })
    }

    pub fn default_level(&self, node: RepoHandle) -> RepoResult<Option<Hits<String>>> {
        self.search_parents(node, &|graph: &Self, target: RepoHandle| {
            let Some(mapper) = graph.node(target).mapper() else {
                return Ok(None);
            };
            Ok(mapper.default_level().map(Hits::One))
        })
    }

    /// Preserves the current version of a dataset on self and every peer.
    pub fn backup(
        &self,
        node: RepoHandle,
        dataset_type: &str,
        data_id: &DataId,
    ) -> RepoResult<()> {
        self.self_and_peers::<(), _>(node, &|graph: &Self, target: RepoHandle| {
            let Some(mapper) = graph.node(target).mapper() else {
                return Ok(None);
            };
            mapper.backup(dataset_type, data_id)?;
            Ok(None)
        })?;
        Ok(())
    }

    /// Writes through the access handle of the node that produced the
    /// location. Never fans out by itself.
    pub fn write(&self, location: &DatasetLocation, obj: &Dataset) -> RepoResult<()> {
        self.access_for(location)?.write(location, obj)
    }

    /// Reads through the access handle of the node that produced the
    /// location.
    pub fn read(&self, location: &DatasetLocation) -> RepoResult<Vec<Dataset>> {
        self.access_for(location)?.read(location)
    }

    fn access_for(&self, location: &DatasetLocation) -> RepoResult<&Access> {
        let handle = location.repository().ok_or_else(|| {
            RepoError::Configuration(
                "location carries no repository stamp; it was not produced by map".to_string(),
            )
        })?;
        self.node(handle).access().ok_or_else(|| {
            RepoError::Unsupported("repository has no storage access".to_string())
        })
    }
}
