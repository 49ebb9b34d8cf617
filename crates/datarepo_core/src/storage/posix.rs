//! Reference filesystem storage backend.
//!
//! # Responsibility
//! - Persist and retrieve datasets under a filesystem root, dispatching on
//!   the location's storage-kind discriminator.
//! - Own the root-scoped registry and the persisted repository descriptor.
//!
//! # Invariants
//! - Every file-backed write goes through the atomic temp-and-rename path.
//! - Operations that need a root fail with a configuration error when none
//!   is configured.

use super::safe_io::safe_write;
use super::{
    Access, PersistenceEngine, Storage, STORAGE_BLOB, STORAGE_CATALOG, STORAGE_JSON,
    VALUE_TYPE_REPO_CONFIG,
};
use crate::config::binder::{string_arg, BoundArgs, ParamSpec};
use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::model::{DataId, DataValue, Dataset, DatasetLocation};
use crate::registry::{self, LookupQuery, Registry};
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the persisted repository descriptor under a root.
pub const DESCRIPTOR_NAME: &str = "repoCfg.json";

/// Marker file naming the mapper for a legacy repository root.
pub const MAPPER_MARKER: &str = "_mapper";
/// Alias link to a legacy repository's parent root.
pub const PARENT_LINK: &str = "_parent";

pub struct FsStorage {
    root: Option<PathBuf>,
    registry: Option<Box<dyn Registry>>,
    engine: Option<Arc<dyn PersistenceEngine>>,
}

impl FsStorage {
    /// Opens a backend over `root`, creating the root directory if needed.
    ///
    /// Storage kinds beyond the built-in discriminators are handed to
    /// `engine`; without one they fail as unsupported.
    pub fn new(
        root: Option<PathBuf>,
        engine: Option<Arc<dyn PersistenceEngine>>,
    ) -> RepoResult<Self> {
        if let Some(root) = &root {
            fs::create_dir_all(root)?;
        }
        let registry = registry::create(root.as_deref())?;
        info!(
            "event=storage_open module=storage status=ok root={}",
            root.as_deref().map(Path::display).map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        );
        Ok(Self {
            root,
            registry,
            engine,
        })
    }

    fn require_root(&self) -> RepoResult<&Path> {
        self.root.as_deref().ok_or_else(|| {
            RepoError::Configuration("storage has no root configured".to_string())
        })
    }

    /// Address strings may be absolute (mapper already anchored them) or
    /// relative to the root.
    fn resolve(&self, address: &str) -> RepoResult<PathBuf> {
        let path = Path::new(address);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        Ok(self.require_root()?.join(path))
    }

    fn descriptor_path(&self) -> RepoResult<PathBuf> {
        Ok(self.require_root()?.join(DESCRIPTOR_NAME))
    }

    fn write_one(&self, location: &DatasetLocation, path: &Path, obj: &Dataset) -> RepoResult<()> {
        match location.storage_name.as_str() {
            STORAGE_BLOB => {
                let Dataset::Blob(bytes) = obj else {
                    return Err(RepoError::Unsupported(
                        "BlobStorage expects an opaque byte payload".to_string(),
                    ));
                };
                safe_write(path, |file| Ok(file.write_all(bytes)?))
            }
            STORAGE_JSON => {
                let Dataset::Document(document) = obj else {
                    return Err(RepoError::Unsupported(
                        "JsonStorage expects a structured document payload".to_string(),
                    ));
                };
                let mut document = document.clone();
                if location.value_type.as_deref() == Some(VALUE_TYPE_REPO_CONFIG) {
                    inject_root(&mut document, path)?;
                }
                safe_write(path, |file| {
                    serde_json::to_writer_pretty(&mut *file, &document)?;
                    Ok(file.write_all(b"\n")?)
                })
            }
            STORAGE_CATALOG => {
                let Dataset::Catalog(rows) = obj else {
                    return Err(RepoError::Unsupported(
                        "CatalogStorage expects tabular rows".to_string(),
                    ));
                };
                safe_write(path, |file| {
                    serde_json::to_writer_pretty(&mut *file, rows)?;
                    Ok(file.write_all(b"\n")?)
                })
            }
            other => match &self.engine {
                Some(engine) => engine.persist(other, path, obj, &location.additional_data),
                None => Err(RepoError::Unsupported(format!(
                    "no persistence engine for storage kind `{other}`"
                ))),
            },
        }
    }

    fn read_one(&self, location: &DatasetLocation, path: &Path) -> RepoResult<Dataset> {
        match location.storage_name.as_str() {
            STORAGE_BLOB => {
                require_exists(path, "blob")?;
                Ok(Dataset::Blob(fs::read(path)?))
            }
            STORAGE_JSON => {
                require_exists(path, "document")?;
                let mut document: serde_json::Value =
                    serde_json::from_slice(&fs::read(path)?)?;
                // Legacy descriptors predate write-time root injection.
                if location.value_type.as_deref() == Some(VALUE_TYPE_REPO_CONFIG)
                    && document.get("root").is_none()
                {
                    inject_root(&mut document, path)?;
                }
                Ok(Dataset::Document(document))
            }
            STORAGE_CATALOG => {
                require_exists(path, "catalog")?;
                let rows: Vec<DataId> = serde_json::from_slice(&fs::read(path)?)?;
                Ok(Dataset::Catalog(rows))
            }
            other => match &self.engine {
                Some(engine) => engine.retrieve(
                    other,
                    location.value_type.as_deref(),
                    path,
                    &location.additional_data,
                ),
                None => Err(RepoError::Unsupported(format!(
                    "no persistence engine for storage kind `{other}`"
                ))),
            },
        }
    }
}

impl Storage for FsStorage {
    fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn write(&self, location: &DatasetLocation, obj: &Dataset) -> RepoResult<()> {
        debug!(
            "event=dataset_write module=storage status=start kind={} addresses={}",
            location.storage_name,
            location.locations().len()
        );
        for address in location.locations() {
            let path = self.resolve(address)?;
            self.write_one(location, &path, obj)?;
        }
        debug!(
            "event=dataset_write module=storage status=ok kind={}",
            location.storage_name
        );
        Ok(())
    }

    fn read(&self, location: &DatasetLocation) -> RepoResult<Vec<Dataset>> {
        let mut datasets = Vec::with_capacity(location.locations().len());
        for address in location.locations() {
            let path = self.resolve(address)?;
            datasets.push(self.read_one(location, &path)?);
        }
        Ok(datasets)
    }

    fn exists(&self, relative: &str) -> RepoResult<bool> {
        Ok(self.require_root()?.join(relative).exists())
    }

    fn location_with_root(&self, relative: &str) -> RepoResult<PathBuf> {
        Ok(self.require_root()?.join(relative))
    }

    fn lookup(&self, query: &LookupQuery) -> RepoResult<Vec<Vec<DataValue>>> {
        match &self.registry {
            Some(registry) => registry.lookup(query),
            None => Err(RepoError::Configuration(
                "storage has no registry to look up in".to_string(),
            )),
        }
    }

    fn mapper_name(&self) -> RepoResult<Option<String>> {
        // No root means no marker chain to walk.
        let Some(root) = self.root.as_deref() else {
            return Ok(None);
        };
        let mut base = root.to_path_buf();
        loop {
            let marker = base.join(MAPPER_MARKER);
            if marker.is_file() {
                let raw = fs::read_to_string(&marker)?;
                let name = raw.lines().next().unwrap_or("").trim().to_string();
                if !name.contains('.') {
                    return Err(RepoError::Configuration(format!(
                        "unqualified mapper name `{name}` in {}",
                        marker.display()
                    )));
                }
                return Ok(Some(name));
            }
            let parent = base.join(PARENT_LINK);
            if parent.exists() {
                base = parent;
            } else {
                return Ok(None);
            }
        }
    }

    fn write_descriptor(&self, config: &RepoConfig) -> RepoResult<()> {
        let path = self.descriptor_path()?;
        let location = DatasetLocation::new(
            Some(VALUE_TYPE_REPO_CONFIG),
            STORAGE_JSON,
            vec![path.to_string_lossy().into_owned()],
            DataId::new(),
        );
        let document = serde_json::to_value(config)?;
        self.write(&location, &Dataset::Document(document))?;
        info!(
            "event=descriptor_write module=storage status=ok path={}",
            path.display()
        );
        Ok(())
    }

    fn load_descriptor(&self) -> RepoResult<RepoConfig> {
        let path = self.descriptor_path()?;
        let location = DatasetLocation::new(
            Some(VALUE_TYPE_REPO_CONFIG),
            STORAGE_JSON,
            vec![path.to_string_lossy().into_owned()],
            DataId::new(),
        );
        let mut datasets = self.read(&location)?;
        let Some(Dataset::Document(document)) = datasets.pop() else {
            return Err(RepoError::NotFound(format!(
                "no descriptor at {}",
                path.display()
            )));
        };
        Ok(serde_json::from_value(document)?)
    }
}

fn require_exists(path: &Path, kind: &str) -> RepoResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(RepoError::NotFound(format!(
            "no such {kind} file: {}",
            path.display()
        )))
    }
}

/// Stamps the document with the directory portion of its write location.
/// This is how a persisted descriptor remembers where it lives.
fn inject_root(document: &mut serde_json::Value, path: &Path) -> RepoResult<()> {
    let Some(object) = document.as_object_mut() else {
        return Err(RepoError::Configuration(
            "descriptor document must be a JSON object".to_string(),
        ));
    };
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    object.insert(
        "root".to_string(),
        serde_json::Value::String(dir.to_string_lossy().into_owned()),
    );
    Ok(())
}

/// Factory registered under the `posix` component key.
#[derive(Default)]
pub struct PosixStorageFactory {
    engine: Option<Arc<dyn PersistenceEngine>>,
}

impl PosixStorageFactory {
    pub fn new(engine: Option<Arc<dyn PersistenceEngine>>) -> Self {
        Self { engine }
    }
}

impl crate::component::StorageFactory for PosixStorageFactory {
    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[ParamSpec::optional("root")];
        PARAMS
    }

    fn create(&self, args: &BoundArgs) -> RepoResult<Arc<dyn Storage>> {
        let root = string_arg(args, "root")?.map(PathBuf::from);
        Ok(Arc::new(FsStorage::new(root, self.engine.clone())?))
    }
}

/// Convenience for tests and callers that just need a rooted access handle.
pub fn open_access(root: &Path) -> RepoResult<Access> {
    Ok(Access::new(Arc::new(FsStorage::new(
        Some(root.to_path_buf()),
        None,
    )?)))
}
