use std::collections::HashMap;

use url::Url;

use super::adapters;
use super::{Capabilities, FileStorer, FileSystemFactory};
use crate::error::PersistenceError;

/// Builds the adapter for a parsed base configuration.
pub type FactoryConstructor =
    fn(&BaseConfiguration) -> Result<Box<dyn FileSystemFactory>, PersistenceError>;

/// Location of a backend, derived from its base URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseConfiguration {
    /// `scheme://netloc/`
    pub base_uri: String,
    pub uri_scheme: String,
    pub uri_netloc: String,
    /// Decoded path below which items live, without trailing slash.
    pub uri_path: String,
}

impl BaseConfiguration {
    pub fn from_uri(uri: &str) -> Result<Self, PersistenceError> {
        let (url, path) = parse_uri(uri)?;
        let netloc = netloc(&url);
        Ok(Self {
            base_uri: format!("{}://{}/", url.scheme(), netloc),
            uri_scheme: url.scheme().to_string(),
            uri_netloc: netloc,
            uri_path: path.trim_end_matches('/').to_string(),
        })
    }

    /// Maps an item URI onto an identifier below this configuration.
    pub fn identifier_for(&self, item_uri: &str) -> Result<String, PersistenceError> {
        let (url, path) = parse_uri(item_uri)?;
        if url.scheme() != self.uri_scheme || netloc(&url) != self.uri_netloc {
            return Err(PersistenceError::BaseUriMismatch {
                item: item_uri.to_string(),
                base: self.base_uri.clone(),
            });
        }
        let Some(rest) = path.strip_prefix(&self.uri_path) else {
            return Err(PersistenceError::BaseUriMismatch {
                item: path.clone(),
                base: self.uri_path.clone(),
            });
        };
        // "/data2" is not below "/data"
        if !rest.is_empty() && !rest.starts_with('/') {
            return Err(PersistenceError::BaseUriMismatch {
                item: path.clone(),
                base: self.uri_path.clone(),
            });
        }
        normalize_identifier(rest).map_err(|e| match e {
            PersistenceError::InvalidUri { reason, .. } => PersistenceError::InvalidUri {
                uri: item_uri.to_string(),
                reason,
            },
            other => other,
        })
    }
}

fn parse_uri(uri: &str) -> Result<(Url, String), PersistenceError> {
    let url = Url::parse(uri).map_err(|e| PersistenceError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    let path = urlencoding::decode(url.path())
        .map_err(|e| PersistenceError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?
        .into_owned();
    Ok((url, path))
}

fn netloc(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Ensures an identifier is absolute, slash-separated and has no trailing slash.
///
/// `.` and `..` segments are rejected so that no identifier leaves the base path.
pub fn normalize_identifier(identifier: &str) -> Result<String, PersistenceError> {
    let mut normalized = identifier.replace('\\', "/");
    if normalized.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(PersistenceError::InvalidUri {
            uri: identifier.to_string(),
            reason: "relative path segments are not allowed".into(),
        });
    }
    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    Ok(normalized)
}

/// Maps URI schemes to adapter constructors.
pub struct AdapterRegistry {
    constructors: HashMap<String, FactoryConstructor>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// The built-in adapters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("memory", adapters::memory::MemoryFileSystem::create);
        registry.register("file", adapters::filesystem::LocalFileSystem::create);
        #[cfg(feature = "sqlite")]
        registry.register("sqlite", adapters::sqlite::SqliteFileSystem::create);
        registry
    }

    /// Registers (or replaces) the adapter of a scheme.
    pub fn register(&mut self, scheme: &str, constructor: FactoryConstructor) {
        self.constructors
            .insert(scheme.to_ascii_lowercase(), constructor);
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.constructors.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    pub fn create(
        &self,
        configuration: &BaseConfiguration,
    ) -> Result<Box<dyn FileSystemFactory>, PersistenceError> {
        let constructor = self
            .constructors
            .get(&configuration.uri_scheme)
            .ok_or_else(|| PersistenceError::UnsupportedScheme(configuration.uri_scheme.clone()))?;
        constructor(configuration)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Generic file system over one backend adapter.
pub struct FileSystem {
    configuration: Option<BaseConfiguration>,
    factory: Box<dyn FileSystemFactory>,
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

impl FileSystem {
    pub fn new(
        configuration: BaseConfiguration,
        registry: &AdapterRegistry,
    ) -> Result<Self, PersistenceError> {
        let factory = registry.create(&configuration)?;
        tracing::debug!("Created file system for {}", configuration.base_uri);
        Ok(Self {
            configuration: Some(configuration),
            factory,
        })
    }

    pub fn from_uri(uri: &str, registry: &AdapterRegistry) -> Result<Self, PersistenceError> {
        Self::new(BaseConfiguration::from_uri(uri)?, registry)
    }

    /// A file system without backend. Nothing exists and nothing can be stored.
    pub fn null() -> Self {
        Self {
            configuration: None,
            factory: Box::new(adapters::null::NullFileSystem),
        }
    }

    pub fn configuration(&self) -> Option<&BaseConfiguration> {
        self.configuration.as_ref()
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.configuration.as_ref().map(|c| c.base_uri.as_str())
    }

    pub fn capabilities(&self) -> Capabilities {
        self.factory.capabilities()
    }

    /// Handles for the item at `identifier`, a path below the base URI.
    pub fn create_file_storer(&self, identifier: &str) -> Result<FileStorer, PersistenceError> {
        self.factory.prepare_usage()?;
        let identifier = normalize_identifier(identifier)?;
        Ok(FileStorer::new(
            identifier.clone(),
            self.factory.create_data_storer(&identifier),
            self.factory.create_metadata_storer(&identifier),
            self.factory.create_privilege_storer(&identifier),
        ))
    }

    /// Handles for an item given by its full URI.
    pub fn file_storer_for_uri(&self, item_uri: &str) -> Result<FileStorer, PersistenceError> {
        let configuration = self.configuration.as_ref().ok_or_else(|| {
            PersistenceError::Unsupported("the null file system has no URIs".into())
        })?;
        let identifier = configuration.identifier_for(item_uri)?;
        self.create_file_storer(&identifier)
    }

    /// Whether the backend can be reached and its root exists.
    pub fn is_accessible(&self) -> bool {
        if let Err(e) = self.factory.prepare_usage() {
            tracing::warn!("File system is not accessible: {}", e);
            return false;
        }
        self.create_file_storer("/")
            .and_then(|storer| storer.exists())
            .unwrap_or(false)
    }

    pub fn release(&self) {
        self.factory.release();
    }
}
