//! # Storage Gateway
//!
//! A generic file-storer interface over pluggable backends. Every backend
//! adapter implements [`FileSystemFactory`], which hands out three handles per
//! item identifier:
//!
//! - [`DataStorer`]: existence checks and content access
//! - [`MetadataStorer`]: property values in persistence format
//! - [`PrivilegeStorer`]: access rights, where the backend has them
//!
//! Adapters are selected by URI scheme through an [`AdapterRegistry`]. The
//! built-in ones are `memory` (in-process), `file` (local directory tree) and,
//! with the `sqlite` feature, `sqlite`.
//!
//! Identifiers are always absolute, slash-separated and carry no trailing
//! slash (except the root `/`) and no `.` or `..` segments; see
//! [`normalize_identifier`].

use std::collections::BTreeMap;

use crate::error::PersistenceError;
use crate::metadata::MetadataValue;

pub mod adapters;
mod factory;

pub use factory::{normalize_identifier, AdapterRegistry, BaseConfiguration, FactoryConstructor, FileSystem};

/// Feature set of a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Arbitrary user-defined properties can be stored.
    pub custom_metadata: bool,
    /// Items can be searched by property values.
    pub metadata_search: bool,
    /// Access control lists are supported.
    pub privileges: bool,
}

/// Content access for one item.
pub trait DataStorer {
    fn identifier(&self) -> &str;

    fn exists(&self) -> Result<bool, PersistenceError>;

    fn is_collection(&self) -> Result<bool, PersistenceError>;

    fn create_collection(&self) -> Result<(), PersistenceError>;

    fn create_resource(&self) -> Result<(), PersistenceError>;

    fn read_data(&self) -> Result<Vec<u8>, PersistenceError>;

    fn write_data(&self, data: &[u8]) -> Result<(), PersistenceError>;

    /// Removes the item together with its metadata.
    fn delete(&self) -> Result<(), PersistenceError>;
}

/// Property values of one item, in persistence format.
pub trait MetadataStorer {
    /// Retrieve the given properties, or all of them when `ids` is `None`.
    /// Unknown identifiers are left out of the result.
    fn retrieve(
        &self,
        ids: Option<&[String]>,
    ) -> Result<BTreeMap<String, MetadataValue>, PersistenceError>;

    /// Create or overwrite properties.
    fn update(&self, properties: &BTreeMap<String, String>) -> Result<(), PersistenceError>;

    /// Remove properties. Unknown identifiers are ignored.
    fn delete(&self, ids: &[String]) -> Result<(), PersistenceError>;
}

/// Access rights of one item.
pub trait PrivilegeStorer {
    fn retrieve_privileges(&self) -> Result<Vec<String>, PersistenceError>;
}

/// One backend adapter.
pub trait FileSystemFactory: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Called before handles are created, e.g. to open connections.
    fn prepare_usage(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn create_data_storer(&self, identifier: &str) -> Box<dyn DataStorer>;

    fn create_metadata_storer(&self, identifier: &str) -> Box<dyn MetadataStorer>;

    fn create_privilege_storer(&self, identifier: &str) -> Box<dyn PrivilegeStorer> {
        Box::new(adapters::null::NullStorer::new(identifier))
    }

    fn release(&self) {}
}

/// The handles of a single item.
pub struct FileStorer {
    identifier: String,
    data: Box<dyn DataStorer>,
    metadata: Box<dyn MetadataStorer>,
    privileges: Box<dyn PrivilegeStorer>,
}

impl FileStorer {
    pub fn new(
        identifier: String,
        data: Box<dyn DataStorer>,
        metadata: Box<dyn MetadataStorer>,
        privileges: Box<dyn PrivilegeStorer>,
    ) -> Self {
        Self {
            identifier,
            data,
            metadata,
            privileges,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.identifier.rsplit('/').next().unwrap_or_default()
    }

    pub fn data(&self) -> &dyn DataStorer {
        self.data.as_ref()
    }

    pub fn metadata(&self) -> &dyn MetadataStorer {
        self.metadata.as_ref()
    }

    pub fn privileges(&self) -> &dyn PrivilegeStorer {
        self.privileges.as_ref()
    }

    pub fn exists(&self) -> Result<bool, PersistenceError> {
        self.data.exists()
    }

    pub fn retrieve_metadata(
        &self,
        ids: Option<&[String]>,
    ) -> Result<BTreeMap<String, MetadataValue>, PersistenceError> {
        self.metadata.retrieve(ids)
    }

    pub fn update_metadata(
        &self,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), PersistenceError> {
        self.metadata.update(properties)
    }

    pub fn delete_metadata(&self, ids: &[String]) -> Result<(), PersistenceError> {
        self.metadata.delete(ids)
    }
}

impl std::fmt::Debug for FileStorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorer")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}
