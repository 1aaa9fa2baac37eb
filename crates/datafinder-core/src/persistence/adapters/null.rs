//! Null-pattern adapter: nothing exists, nothing can be stored.

use std::collections::BTreeMap;

use crate::error::PersistenceError;
use crate::metadata::MetadataValue;
use crate::persistence::{
    Capabilities, DataStorer, FileSystemFactory, MetadataStorer, PrivilegeStorer,
};

pub struct NullFileSystem;

impl FileSystemFactory for NullFileSystem {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn create_data_storer(&self, identifier: &str) -> Box<dyn DataStorer> {
        Box::new(NullStorer::new(identifier))
    }

    fn create_metadata_storer(&self, identifier: &str) -> Box<dyn MetadataStorer> {
        Box::new(NullStorer::new(identifier))
    }
}

/// Storer handle rejecting every operation.
pub struct NullStorer {
    identifier: String,
}

impl NullStorer {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
        }
    }

    fn unsupported<T>(&self, operation: &str) -> Result<T, PersistenceError> {
        Err(PersistenceError::Unsupported(format!(
            "{} of '{}'",
            operation, self.identifier
        )))
    }
}

impl DataStorer for NullStorer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn exists(&self) -> Result<bool, PersistenceError> {
        Ok(false)
    }

    fn is_collection(&self) -> Result<bool, PersistenceError> {
        Ok(false)
    }

    fn create_collection(&self) -> Result<(), PersistenceError> {
        self.unsupported("collection creation")
    }

    fn create_resource(&self) -> Result<(), PersistenceError> {
        self.unsupported("resource creation")
    }

    fn read_data(&self) -> Result<Vec<u8>, PersistenceError> {
        self.unsupported("data retrieval")
    }

    fn write_data(&self, _data: &[u8]) -> Result<(), PersistenceError> {
        self.unsupported("data storage")
    }

    fn delete(&self) -> Result<(), PersistenceError> {
        self.unsupported("deletion")
    }
}

impl MetadataStorer for NullStorer {
    fn retrieve(
        &self,
        _ids: Option<&[String]>,
    ) -> Result<BTreeMap<String, MetadataValue>, PersistenceError> {
        self.unsupported("metadata retrieval")
    }

    fn update(&self, _properties: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        self.unsupported("metadata update")
    }

    fn delete(&self, _ids: &[String]) -> Result<(), PersistenceError> {
        self.unsupported("metadata deletion")
    }
}

impl PrivilegeStorer for NullStorer {
    fn retrieve_privileges(&self) -> Result<Vec<String>, PersistenceError> {
        self.unsupported("privilege retrieval")
    }
}
