//! Declarative-configuration-to-live-graph materialization.

use super::graph::{RepoGraph, RepoHandle, Repository};
use crate::component::ComponentRegistry;
use crate::config::binder::bind_args;
use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::mapper::Mapper;
use crate::storage::Access;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

/// Access kind a repository holds its storage through. Only direct handles
/// exist today.
pub const ACCESS_DIRECT: &str = "direct";

/// Input to materialization: a declarative config, or a node that has
/// already been materialized into the target graph.
pub enum RepoInput {
    Config(RepoConfig),
    Node(RepoHandle),
}

impl From<RepoConfig> for RepoInput {
    fn from(value: RepoConfig) -> Self {
        Self::Config(value)
    }
}

impl From<RepoHandle> for RepoInput {
    fn from(value: RepoHandle) -> Self {
        Self::Node(value)
    }
}

/// Turns repository configurations into graph nodes, resolving components
/// through a factory registry.
pub struct Materializer<'a> {
    components: &'a ComponentRegistry,
}

impl<'a> Materializer<'a> {
    pub fn new(components: &'a ComponentRegistry) -> Self {
        Self { components }
    }

    /// Materializes `input` into `graph`, returning the node handle.
    ///
    /// Already-materialized inputs pass through unchanged. Configuration
    /// problems are reported here, before any dataset I/O happens.
    pub fn materialize(
        &self,
        graph: &mut RepoGraph,
        input: impl Into<RepoInput>,
    ) -> RepoResult<RepoHandle> {
        match input.into() {
            RepoInput::Node(handle) => {
                if !graph.contains(handle) {
                    return Err(RepoError::Configuration(format!(
                        "repository handle {} does not belong to this graph",
                        handle.index()
                    )));
                }
                Ok(handle)
            }
            RepoInput::Config(config) => self.materialize_config(graph, &config),
        }
    }

    fn materialize_config(
        &self,
        graph: &mut RepoGraph,
        config: &RepoConfig,
    ) -> RepoResult<RepoHandle> {
        // Validate the join mode before doing any recursive work.
        let parent_join = config.parent_join()?;

        // Depth-first, order-preserving: parents first, then peers.
        let mut parents = Vec::with_capacity(config.parents.len());
        for parent in &config.parents {
            parents.push(self.materialize_config(graph, parent)?);
        }
        let mut peers = Vec::with_capacity(config.peers.len());
        for peer in &config.peers {
            peers.push(self.materialize_config(graph, peer)?);
        }

        let access = self.materialize_access(config)?;
        let mapper = self.materialize_mapper(config, access.as_ref())?;

        let id = config
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let handle = graph.add_node(Repository::new(
            Some(id.clone()),
            mapper,
            access,
            parents,
            peers,
            parent_join,
        ))?;
        info!(
            "event=repo_materialize module=repo status=ok id={} parents={} peers={} join={}",
            id,
            config.parents.len(),
            config.peers.len(),
            parent_join
        );
        Ok(handle)
    }

    fn materialize_access(&self, config: &RepoConfig) -> RepoResult<Option<Access>> {
        let Some(storage_key) = &config.storage else {
            return Ok(None);
        };
        if let Some(kind) = &config.access {
            if kind != ACCESS_DIRECT {
                return Err(RepoError::Configuration(format!(
                    "access kind `{kind}` is not supported, expected `{ACCESS_DIRECT}`"
                )));
            }
        }

        let factory = self.components.storage_factory(storage_key)?;
        let args = bind_args(factory.params(), &config.properties(), &[])?;
        let storage = factory.create(&args)?;
        Ok(Some(Access::new(storage)))
    }

    fn materialize_mapper(
        &self,
        config: &RepoConfig,
        access: Option<&Access>,
    ) -> RepoResult<Option<Arc<dyn Mapper>>> {
        let key = match &config.mapper {
            Some(key) => Some(key.clone()),
            // No mapper requested: a rooted legacy repository may still name
            // one through its on-disk marker. A missing marker is fine here;
            // a malformed one fails materialization.
            None => match access {
                Some(access) => {
                    let recovered = access.mapper_name()?;
                    if let Some(name) = &recovered {
                        debug!("event=mapper_recover module=repo status=ok name={name}");
                    }
                    recovered
                }
                None => None,
            },
        };
        let Some(key) = key else {
            return Ok(None);
        };

        let factory = self.components.mapper_factory(&key)?;
        let args = bind_args(factory.params(), &config.properties(), &[])?;
        Ok(Some(factory.create(&args, access)?))
    }
}
