//! Error taxonomy shared across materialization, traversal, and storage.
//!
//! # Responsibility
//! - Distinguish configuration faults from access faults.
//! - Carry enough context for callers to diagnose multi-match searches.
//!
//! # Invariants
//! - Configuration errors surface at materialization time, before any I/O.
//! - Not-found errors surface only at the point of actual access.

use crate::model::location::DatasetLocation;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors raised by the repository graph and its storage backends.
#[derive(Debug)]
pub enum RepoError {
    /// Invalid or incomplete declarative configuration (missing root,
    /// unrecognized join mode, missing required constructor argument,
    /// unresolvable component reference).
    Configuration(String),
    /// A location that is required to exist does not.
    NotFound(String),
    /// A search that structurally expects a single result matched more than
    /// one top-level location. Carries every match for diagnostics.
    MultipleResults(Vec<DatasetLocation>),
    /// The backend or mapper lacks a requested capability.
    Unsupported(String),
    Registry(rusqlite::Error),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(message) => write!(f, "configuration error: {message}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::MultipleResults(locations) => {
                write!(
                    f,
                    "expected a single result, found {} matches: ",
                    locations.len()
                )?;
                let mut first = true;
                for location in locations {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", location.locations().join("|"))?;
                }
                Ok(())
            }
            Self::Unsupported(message) => write!(f, "unsupported operation: {message}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Registry(value)
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
