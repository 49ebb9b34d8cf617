//! Repository graph: nodes, resolution engine, and materialization.
//!
//! # Responsibility
//! - Turn declarative configuration into a live graph of repository nodes.
//! - Resolve dataset requests across the graph with two traversal policies:
//!   ordered parent search for reads, self-plus-peer fan-out for writes.
//!
//! # Invariants
//! - Writes address self and peers; reads address ancestors. The two
//!   traversal kinds are never mixed in one call.
//! - Traversal follows declared order exactly; a raised error aborts the
//!   whole traversal.

pub mod graph;
pub mod materializer;

pub use graph::{Hits, RepoGraph, RepoHandle, Repository};
pub use materializer::{Materializer, RepoInput};
