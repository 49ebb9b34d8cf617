//! Core library for `datarepo`, a layered dataset repository.
//!
//! # Responsibility
//! - Materialize graphs of repositories from declarative configuration.
//! - Route dataset reads through parent chains and writes across peers.
//! - Persist datasets and repository descriptors on a filesystem backend.
//!
//! # See also
//! - `repo` for the repository graph and its traversal engine.
//! - `storage` for the persistence seam and the posix backend.
//! - `registry` for partial-key dataset lookup.

pub mod component;
pub mod config;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod registry;
pub mod repo;
pub mod storage;

pub use component::ComponentRegistry;
pub use config::{ParentJoin, RepoConfig};
pub use error::{RepoError, RepoResult};
pub use mapper::Mapper;
pub use model::{DataId, DataValue, Dataset, DatasetLocation};
pub use repo::{Hits, Materializer, RepoGraph, RepoHandle, RepoInput, Repository};
pub use storage::{Access, Storage};

/// Returns the core library version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
