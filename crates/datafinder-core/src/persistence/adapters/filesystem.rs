//! Local directory tree adapter (`file:///path/to/root`).
//!
//! Item content lives in ordinary files and directories below the root.
//! Properties of all items are kept in a single JSON document,
//! [`METADATA_FILE_NAME`], at the root, keyed by item identifier.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::PersistenceError;
use crate::metadata::MetadataValue;
use crate::persistence::{
    BaseConfiguration, Capabilities, DataStorer, FileSystemFactory, MetadataStorer,
};

pub const METADATA_FILE_NAME: &str = ".datafinder-metadata.json";

type MetadataDocument = BTreeMap<String, BTreeMap<String, String>>;

/// Adapter for a directory on the local disk.
pub struct LocalFileSystem {
    root: PathBuf,
    // serialises read-modify-write cycles of the metadata document
    lock: Arc<Mutex<()>>,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn create(
        configuration: &BaseConfiguration,
    ) -> Result<Box<dyn FileSystemFactory>, PersistenceError> {
        let root = if configuration.uri_path.is_empty() {
            PathBuf::from("/")
        } else {
            PathBuf::from(&configuration.uri_path)
        };
        Ok(Box::new(Self::new(root)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn storer(&self, identifier: &str) -> LocalStorer {
        LocalStorer {
            identifier: identifier.to_string(),
            root: self.root.clone(),
            lock: self.lock.clone(),
        }
    }
}

impl FileSystemFactory for LocalFileSystem {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            custom_metadata: true,
            metadata_search: false,
            privileges: false,
        }
    }

    fn prepare_usage(&self) -> Result<(), PersistenceError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(PersistenceError::NotFound(self.root.display().to_string()))
        }
    }

    fn create_data_storer(&self, identifier: &str) -> Box<dyn DataStorer> {
        Box::new(self.storer(identifier))
    }

    fn create_metadata_storer(&self, identifier: &str) -> Box<dyn MetadataStorer> {
        Box::new(self.storer(identifier))
    }
}

struct LocalStorer {
    identifier: String,
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl LocalStorer {
    fn path(&self) -> PathBuf {
        let relative = self.identifier.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE_NAME)
    }

    fn ensure_exists(&self) -> Result<(), PersistenceError> {
        if self.path().exists() {
            Ok(())
        } else {
            Err(PersistenceError::NotFound(self.identifier.clone()))
        }
    }

    fn read_document(&self) -> Result<MetadataDocument, PersistenceError> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(MetadataDocument::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_document(&self, document: &MetadataDocument) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(document)?;
        fs::write(self.metadata_path(), content)?;
        Ok(())
    }

    fn modify_document(
        &self,
        modify: impl FnOnce(&mut MetadataDocument),
    ) -> Result<(), PersistenceError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| PersistenceError::Storage(format!("metadata lock poisoned: {}", e)))?;
        let mut document = self.read_document()?;
        modify(&mut document);
        self.write_document(&document)
    }
}

impl DataStorer for LocalStorer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn exists(&self) -> Result<bool, PersistenceError> {
        Ok(self.path().exists())
    }

    fn is_collection(&self) -> Result<bool, PersistenceError> {
        Ok(self.path().is_dir())
    }

    fn create_collection(&self) -> Result<(), PersistenceError> {
        fs::create_dir(self.path())?;
        Ok(())
    }

    fn create_resource(&self) -> Result<(), PersistenceError> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path())?;
        Ok(())
    }

    fn read_data(&self) -> Result<Vec<u8>, PersistenceError> {
        self.ensure_exists()?;
        Ok(fs::read(self.path())?)
    }

    fn write_data(&self, data: &[u8]) -> Result<(), PersistenceError> {
        self.ensure_exists()?;
        fs::write(self.path(), data)?;
        Ok(())
    }

    fn delete(&self) -> Result<(), PersistenceError> {
        let path = self.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else if path.exists() {
            fs::remove_file(&path)?;
        } else {
            return Err(PersistenceError::NotFound(self.identifier.clone()));
        }
        let prefix = format!("{}/", self.identifier);
        let identifier = self.identifier.clone();
        self.modify_document(|document| {
            document.retain(|id, _| *id != identifier && !id.starts_with(&prefix));
        })
    }
}

impl MetadataStorer for LocalStorer {
    fn retrieve(
        &self,
        ids: Option<&[String]>,
    ) -> Result<BTreeMap<String, MetadataValue>, PersistenceError> {
        self.ensure_exists()?;
        let mut document = self.read_document()?;
        let properties = document.remove(&self.identifier).unwrap_or_default();
        Ok(properties
            .into_iter()
            .filter(|(id, _)| ids.map_or(true, |ids| ids.contains(id)))
            .map(|(id, value)| (id, MetadataValue::new(value)))
            .collect())
    }

    fn update(&self, properties: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        self.ensure_exists()?;
        self.modify_document(|document| {
            document
                .entry(self.identifier.clone())
                .or_default()
                .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        })?;
        tracing::debug!(
            "Stored {} properties of {} in {}",
            properties.len(),
            self.identifier,
            self.metadata_path().display()
        );
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> Result<(), PersistenceError> {
        self.ensure_exists()?;
        self.modify_document(|document| {
            if let Some(properties) = document.get_mut(&self.identifier) {
                for id in ids {
                    properties.remove(id);
                }
                if properties.is_empty() {
                    document.remove(&self.identifier);
                }
            }
        })
    }
}
