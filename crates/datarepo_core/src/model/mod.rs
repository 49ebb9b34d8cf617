//! Value objects exchanged between the repository graph, mappers, and
//! storage backends.
//!
//! # Responsibility
//! - Define the location descriptor produced by mappers and consumed by
//!   storage backends.
//! - Define the dataset-key value types used by data ids and registries.
//!
//! # Invariants
//! - A location is produced fresh per request and never mutated after the
//!   resolution engine returns it.

pub mod location;

pub use location::{DataId, DataValue, Dataset, DatasetLocation, KeyKind};
