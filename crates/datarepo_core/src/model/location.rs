//! Dataset location descriptor and key value types.

use crate::repo::graph::RepoHandle;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// One dataset-key value: the three value types registries can match on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl DataValue {
    /// Rendering used when a value is substituted into a path template.
    pub fn render(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }
}

impl Display for DataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DataValue {}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        // Total order across variants so tuples of values can live in
        // ordered sets. Floats compare via total_cmp.
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Text(_), _) => Ordering::Greater,
            (_, Self::Text(_)) => Ordering::Less,
        }
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Partial dataset identifier: key name to value, in stable key order.
pub type DataId = BTreeMap<String, DataValue>;

/// Value type of one dataset key, as reported by `get_keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    Int,
    Float,
    Text,
}

impl KeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

/// Payload moved through storage backends.
///
/// Concrete byte-level codecs beyond these shapes are delegated to an
/// injected persistence engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// Opaque bytes, persisted verbatim.
    Blob(Vec<u8>),
    /// Structured document, persisted as JSON.
    Document(serde_json::Value),
    /// Tabular rows, persisted as a JSON array of objects.
    Catalog(Vec<DataId>),
}

/// Where and how a dataset is stored.
///
/// Produced by a mapper, stamped by the resolution engine with the node that
/// produced it, consumed by a storage backend. Immutable once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLocation {
    /// Codec key for the target value shape, when the storage kind needs one.
    pub value_type: Option<String>,
    /// Storage-kind discriminator, e.g. `BlobStorage`.
    pub storage_name: String,
    /// Backend-specific address strings, usually length 1.
    pub locations: Vec<String>,
    /// The data id that produced this location.
    pub data_id: DataId,
    /// Auxiliary parameters for the backend.
    pub additional_data: DataId,
    repository: Option<RepoHandle>,
}

impl DatasetLocation {
    pub fn new(
        value_type: Option<&str>,
        storage_name: &str,
        locations: Vec<String>,
        data_id: DataId,
    ) -> Self {
        Self {
            value_type: value_type.map(|value| value.to_string()),
            storage_name: storage_name.to_string(),
            locations,
            data_id,
            additional_data: DataId::new(),
            repository: None,
        }
    }

    pub fn with_additional_data(mut self, additional_data: DataId) -> Self {
        self.additional_data = additional_data;
        self
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// The node that produced this location. Lookup-only relation: later
    /// read/write calls use it to pick the backend.
    pub fn repository(&self) -> Option<RepoHandle> {
        self.repository
    }

    pub(crate) fn stamp_repository(&mut self, handle: RepoHandle) {
        self.repository = Some(handle);
    }
}
