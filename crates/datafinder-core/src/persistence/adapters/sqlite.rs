//! SQLite adapter (`sqlite:///path/to/repository.db`).
//!
//! Items and their properties live in two tables of a single database file.
//! Properties can be searched by value with [`SqliteFileSystem::search`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::PersistenceError;
use crate::metadata::MetadataValue;
use crate::persistence::{
    BaseConfiguration, Capabilities, DataStorer, FileSystemFactory, MetadataStorer,
};

type SharedConnection = Arc<Mutex<Connection>>;

fn storage_error(context: &str, e: rusqlite::Error) -> PersistenceError {
    PersistenceError::Storage(format!("{}: {}", context, e))
}

fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
    conn.lock()
        .map_err(|e| PersistenceError::Storage(format!("connection poisoned: {}", e)))
}

fn parent_of(identifier: &str) -> &str {
    match identifier.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &identifier[..pos],
    }
}

/// Adapter storing items and properties in a SQLite database.
pub struct SqliteFileSystem {
    conn: SharedConnection,
}

impl SqliteFileSystem {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path).map_err(|e| storage_error("open", e))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(|e| storage_error("open_in_memory", e))?;
        Self::init_with_connection(conn)
    }

    pub fn create(
        configuration: &BaseConfiguration,
    ) -> Result<Box<dyn FileSystemFactory>, PersistenceError> {
        Ok(Box::new(Self::open(Path::new(&configuration.uri_path))?))
    }

    fn init_with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS items (
                identifier TEXT PRIMARY KEY,
                is_collection INTEGER NOT NULL,
                data BLOB NOT NULL DEFAULT x''
            );

            CREATE TABLE IF NOT EXISTS item_metadata (
                identifier TEXT NOT NULL REFERENCES items(identifier) ON DELETE CASCADE,
                property_id TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (identifier, property_id)
            );

            CREATE INDEX IF NOT EXISTS idx_item_metadata_property ON item_metadata(property_id, value);

            INSERT OR IGNORE INTO items (identifier, is_collection) VALUES ('/', 1);
            ",
        )
        .map_err(|e| storage_error("init_schema", e))
    }

    /// Identifiers of all items whose property `property_id` is stored as `persisted`.
    pub fn search(
        &self,
        property_id: &str,
        persisted: &str,
    ) -> Result<Vec<String>, PersistenceError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT identifier FROM item_metadata
                 WHERE property_id = ?1 AND value = ?2 ORDER BY identifier",
            )
            .map_err(|e| storage_error("search", e))?;
        let rows = stmt
            .query_map(params![property_id, persisted], |row| row.get(0))
            .map_err(|e| storage_error("search", e))?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(|e| storage_error("search", e))
    }

    fn storer(&self, identifier: &str) -> SqliteStorer {
        SqliteStorer {
            identifier: identifier.to_string(),
            conn: self.conn.clone(),
        }
    }
}

impl FileSystemFactory for SqliteFileSystem {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            custom_metadata: true,
            metadata_search: true,
            privileges: false,
        }
    }

    fn create_data_storer(&self, identifier: &str) -> Box<dyn DataStorer> {
        Box::new(self.storer(identifier))
    }

    fn create_metadata_storer(&self, identifier: &str) -> Box<dyn MetadataStorer> {
        Box::new(self.storer(identifier))
    }
}

struct SqliteStorer {
    identifier: String,
    conn: SharedConnection,
}

impl SqliteStorer {
    fn is_collection_in(conn: &Connection, identifier: &str) -> Result<Option<bool>, PersistenceError> {
        conn.query_row(
            "SELECT is_collection FROM items WHERE identifier = ?1",
            params![identifier],
            |row| row.get::<_, bool>(0),
        )
        .optional()
        .map_err(|e| storage_error("lookup", e))
    }

    fn ensure_exists(&self, conn: &Connection) -> Result<(), PersistenceError> {
        match Self::is_collection_in(conn, &self.identifier)? {
            Some(_) => Ok(()),
            None => Err(PersistenceError::NotFound(self.identifier.clone())),
        }
    }

    fn insert(&self, is_collection: bool) -> Result<(), PersistenceError> {
        let conn = lock(&self.conn)?;
        let parent = parent_of(&self.identifier);
        if Self::is_collection_in(&conn, parent)? != Some(true) {
            return Err(PersistenceError::NotFound(parent.to_string()));
        }
        if Self::is_collection_in(&conn, &self.identifier)?.is_some() {
            return Err(PersistenceError::Storage(format!(
                "'{}' already exists",
                self.identifier
            )));
        }
        conn.execute(
            "INSERT INTO items (identifier, is_collection) VALUES (?1, ?2)",
            params![self.identifier, is_collection],
        )
        .map_err(|e| storage_error("insert", e))?;
        Ok(())
    }
}

impl DataStorer for SqliteStorer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn exists(&self) -> Result<bool, PersistenceError> {
        let conn = lock(&self.conn)?;
        Ok(Self::is_collection_in(&conn, &self.identifier)?.is_some())
    }

    fn is_collection(&self) -> Result<bool, PersistenceError> {
        let conn = lock(&self.conn)?;
        Ok(Self::is_collection_in(&conn, &self.identifier)?.unwrap_or(false))
    }

    fn create_collection(&self) -> Result<(), PersistenceError> {
        self.insert(true)
    }

    fn create_resource(&self) -> Result<(), PersistenceError> {
        self.insert(false)
    }

    fn read_data(&self) -> Result<Vec<u8>, PersistenceError> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            "SELECT data FROM items WHERE identifier = ?1",
            params![self.identifier],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| storage_error("read_data", e))?
        .ok_or_else(|| PersistenceError::NotFound(self.identifier.clone()))
    }

    fn write_data(&self, data: &[u8]) -> Result<(), PersistenceError> {
        let conn = lock(&self.conn)?;
        let changed = conn
            .execute(
                "UPDATE items SET data = ?1 WHERE identifier = ?2",
                params![data, self.identifier],
            )
            .map_err(|e| storage_error("write_data", e))?;
        if changed == 0 {
            return Err(PersistenceError::NotFound(self.identifier.clone()));
        }
        Ok(())
    }

    fn delete(&self) -> Result<(), PersistenceError> {
        let conn = lock(&self.conn)?;
        let prefix = format!("{}/%", self.identifier.replace('%', "\\%").replace('_', "\\_"));
        let changed = conn
            .execute(
                "DELETE FROM items WHERE identifier = ?1 OR identifier LIKE ?2 ESCAPE '\\'",
                params![self.identifier, prefix],
            )
            .map_err(|e| storage_error("delete", e))?;
        if changed == 0 {
            return Err(PersistenceError::NotFound(self.identifier.clone()));
        }
        Ok(())
    }
}

impl MetadataStorer for SqliteStorer {
    fn retrieve(
        &self,
        ids: Option<&[String]>,
    ) -> Result<BTreeMap<String, MetadataValue>, PersistenceError> {
        let conn = lock(&self.conn)?;
        self.ensure_exists(&conn)?;
        let mut stmt = conn
            .prepare("SELECT property_id, value FROM item_metadata WHERE identifier = ?1")
            .map_err(|e| storage_error("retrieve", e))?;
        let rows = stmt
            .query_map(params![self.identifier], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| storage_error("retrieve", e))?;

        let mut result = BTreeMap::new();
        for row in rows {
            let (id, value) = row.map_err(|e| storage_error("retrieve", e))?;
            if ids.map_or(true, |ids| ids.contains(&id)) {
                result.insert(id, MetadataValue::new(value));
            }
        }
        Ok(result)
    }

    fn update(&self, properties: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        let mut conn = lock(&self.conn)?;
        self.ensure_exists(&conn)?;
        let tx = conn
            .transaction()
            .map_err(|e| storage_error("update", e))?;
        for (id, value) in properties {
            tx.execute(
                "INSERT INTO item_metadata (identifier, property_id, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(identifier, property_id) DO UPDATE SET value = excluded.value",
                params![self.identifier, id, value],
            )
            .map_err(|e| storage_error("update", e))?;
        }
        tx.commit().map_err(|e| storage_error("update", e))?;
        tracing::debug!("Updated {} properties of {}", properties.len(), self.identifier);
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> Result<(), PersistenceError> {
        let mut conn = lock(&self.conn)?;
        self.ensure_exists(&conn)?;
        let tx = conn
            .transaction()
            .map_err(|e| storage_error("delete_metadata", e))?;
        for id in ids {
            tx.execute(
                "DELETE FROM item_metadata WHERE identifier = ?1 AND property_id = ?2",
                params![self.identifier, id],
            )
            .map_err(|e| storage_error("delete_metadata", e))?;
        }
        tx.commit().map_err(|e| storage_error("delete_metadata", e))
    }
}
