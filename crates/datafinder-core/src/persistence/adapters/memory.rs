//! In-process adapter (`memory://<name>/`).
//!
//! Trees are shared by name for the lifetime of the process, so every file
//! system opened on the same `memory://` authority sees the same items.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use lazy_static::lazy_static;

use crate::error::PersistenceError;
use crate::metadata::MetadataValue;
use crate::persistence::{
    BaseConfiguration, Capabilities, DataStorer, FileSystemFactory, MetadataStorer,
};

type Tree = Arc<Mutex<BTreeMap<String, Node>>>;

lazy_static! {
    static ref TREES: Mutex<HashMap<String, Tree>> = Mutex::new(HashMap::new());
}

#[derive(Debug, Default)]
struct Node {
    is_collection: bool,
    data: Vec<u8>,
    metadata: BTreeMap<String, String>,
}

fn new_tree() -> Tree {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        "/".to_string(),
        Node {
            is_collection: true,
            ..Default::default()
        },
    );
    Arc::new(Mutex::new(nodes))
}

fn lock(tree: &Tree) -> Result<MutexGuard<'_, BTreeMap<String, Node>>, PersistenceError> {
    tree.lock()
        .map_err(|e| PersistenceError::Storage(format!("memory tree poisoned: {}", e)))
}

fn parent_of(identifier: &str) -> &str {
    match identifier.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &identifier[..pos],
    }
}

/// Adapter keeping items and metadata in memory.
pub struct MemoryFileSystem {
    tree: Tree,
}

impl MemoryFileSystem {
    /// A private tree, not shared with other file systems.
    pub fn new() -> Self {
        Self { tree: new_tree() }
    }

    pub fn create(
        configuration: &BaseConfiguration,
    ) -> Result<Box<dyn FileSystemFactory>, PersistenceError> {
        let mut trees = TREES
            .lock()
            .map_err(|e| PersistenceError::Storage(format!("memory registry poisoned: {}", e)))?;
        let tree = trees
            .entry(configuration.uri_netloc.clone())
            .or_insert_with(new_tree)
            .clone();
        Ok(Box::new(Self { tree }))
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemFactory for MemoryFileSystem {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            custom_metadata: true,
            metadata_search: true,
            privileges: false,
        }
    }

    fn create_data_storer(&self, identifier: &str) -> Box<dyn DataStorer> {
        Box::new(MemoryStorer {
            identifier: identifier.to_string(),
            tree: self.tree.clone(),
        })
    }

    fn create_metadata_storer(&self, identifier: &str) -> Box<dyn MetadataStorer> {
        Box::new(MemoryStorer {
            identifier: identifier.to_string(),
            tree: self.tree.clone(),
        })
    }
}

struct MemoryStorer {
    identifier: String,
    tree: Tree,
}

impl MemoryStorer {
    fn create_node(&self, is_collection: bool) -> Result<(), PersistenceError> {
        let mut nodes = lock(&self.tree)?;
        let parent = parent_of(&self.identifier);
        match nodes.get(parent) {
            Some(node) if node.is_collection => {}
            _ => return Err(PersistenceError::NotFound(parent.to_string())),
        }
        if nodes.contains_key(&self.identifier) {
            return Err(PersistenceError::Storage(format!(
                "'{}' already exists",
                self.identifier
            )));
        }
        nodes.insert(
            self.identifier.clone(),
            Node {
                is_collection,
                ..Default::default()
            },
        );
        Ok(())
    }

    fn not_found(&self) -> PersistenceError {
        PersistenceError::NotFound(self.identifier.clone())
    }
}

impl DataStorer for MemoryStorer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn exists(&self) -> Result<bool, PersistenceError> {
        Ok(lock(&self.tree)?.contains_key(&self.identifier))
    }

    fn is_collection(&self) -> Result<bool, PersistenceError> {
        Ok(lock(&self.tree)?
            .get(&self.identifier)
            .is_some_and(|node| node.is_collection))
    }

    fn create_collection(&self) -> Result<(), PersistenceError> {
        self.create_node(true)
    }

    fn create_resource(&self) -> Result<(), PersistenceError> {
        self.create_node(false)
    }

    fn read_data(&self) -> Result<Vec<u8>, PersistenceError> {
        lock(&self.tree)?
            .get(&self.identifier)
            .map(|node| node.data.clone())
            .ok_or_else(|| self.not_found())
    }

    fn write_data(&self, data: &[u8]) -> Result<(), PersistenceError> {
        let mut nodes = lock(&self.tree)?;
        let node = nodes
            .get_mut(&self.identifier)
            .ok_or_else(|| self.not_found())?;
        node.data = data.to_vec();
        Ok(())
    }

    fn delete(&self) -> Result<(), PersistenceError> {
        let mut nodes = lock(&self.tree)?;
        if nodes.remove(&self.identifier).is_none() {
            return Err(self.not_found());
        }
        let prefix = format!("{}/", self.identifier);
        nodes.retain(|id, _| !id.starts_with(&prefix));
        Ok(())
    }
}

impl MetadataStorer for MemoryStorer {
    fn retrieve(
        &self,
        ids: Option<&[String]>,
    ) -> Result<BTreeMap<String, MetadataValue>, PersistenceError> {
        let nodes = lock(&self.tree)?;
        let node = nodes.get(&self.identifier).ok_or_else(|| self.not_found())?;
        Ok(node
            .metadata
            .iter()
            .filter(|(id, _)| ids.map_or(true, |ids| ids.contains(id)))
            .map(|(id, value)| (id.clone(), MetadataValue::new(value.as_str())))
            .collect())
    }

    fn update(&self, properties: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        let mut nodes = lock(&self.tree)?;
        let node = nodes
            .get_mut(&self.identifier)
            .ok_or_else(|| self.not_found())?;
        node.metadata
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        tracing::debug!("Updated {} properties of {}", properties.len(), self.identifier);
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> Result<(), PersistenceError> {
        let mut nodes = lock(&self.tree)?;
        let node = nodes
            .get_mut(&self.identifier)
            .ok_or_else(|| self.not_found())?;
        for id in ids {
            node.metadata.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{AdapterRegistry, FileSystem};

    fn storer(fs: &MemoryFileSystem, id: &str) -> MemoryStorer {
        MemoryStorer {
            identifier: id.to_string(),
            tree: fs.tree.clone(),
        }
    }

    #[test]
    fn root_exists() {
        let fs = MemoryFileSystem::new();
        let root = storer(&fs, "/");
        assert!(root.exists().unwrap());
        assert!(root.is_collection().unwrap());
    }

    #[test]
    fn create_requires_parent_collection() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(
            storer(&fs, "/a/b").create_resource(),
            Err(PersistenceError::NotFound(p)) if p == "/a"
        ));
        storer(&fs, "/a").create_collection().unwrap();
        storer(&fs, "/a/b").create_resource().unwrap();
        assert!(storer(&fs, "/a/b").create_resource().is_err());
        assert!(storer(&fs, "/a/b/c").create_resource().is_err());
    }

    #[test]
    fn data_round_trip() {
        let fs = MemoryFileSystem::new();
        let item = storer(&fs, "/file");
        item.create_resource().unwrap();
        item.write_data(b"content").unwrap();
        assert_eq!(item.read_data().unwrap(), b"content");
    }

    #[test]
    fn delete_removes_descendants() {
        let fs = MemoryFileSystem::new();
        storer(&fs, "/dir").create_collection().unwrap();
        storer(&fs, "/dir/file").create_resource().unwrap();
        storer(&fs, "/dirty").create_resource().unwrap();
        DataStorer::delete(&storer(&fs, "/dir")).unwrap();
        assert!(!storer(&fs, "/dir/file").exists().unwrap());
        assert!(storer(&fs, "/dirty").exists().unwrap());
    }

    #[test]
    fn metadata_update_retrieve_delete() {
        let fs = MemoryFileSystem::new();
        let item = storer(&fs, "/file");
        item.create_resource().unwrap();

        let mut props = BTreeMap::new();
        props.insert("a".to_string(), "1".to_string());
        props.insert("b".to_string(), "x;y;".to_string());
        item.update(&props).unwrap();

        let all = item.retrieve(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["b"], MetadataValue::new("x;y;"));

        let some = item.retrieve(Some(&["a".to_string()])).unwrap();
        assert_eq!(some.keys().collect::<Vec<_>>(), vec!["a"]);

        MetadataStorer::delete(&item, &["a".to_string(), "missing".to_string()]).unwrap();
        assert_eq!(item.retrieve(None).unwrap().len(), 1);
    }

    #[test]
    fn metadata_of_missing_item() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(
            storer(&fs, "/ghost").retrieve(None),
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[test]
    fn trees_are_shared_by_authority() {
        let registry = AdapterRegistry::with_defaults();
        let first = FileSystem::from_uri("memory://shared-tree-test/", &registry).unwrap();
        first
            .create_file_storer("/item")
            .unwrap()
            .data()
            .create_resource()
            .unwrap();
        let second = FileSystem::from_uri("memory://shared-tree-test/", &registry).unwrap();
        assert!(second.create_file_storer("/item").unwrap().exists().unwrap());

        let other = FileSystem::from_uri("memory://other-tree-test/", &registry).unwrap();
        assert!(!other.create_file_storer("/item").unwrap().exists().unwrap());
        assert!(other.is_accessible());
    }
}
