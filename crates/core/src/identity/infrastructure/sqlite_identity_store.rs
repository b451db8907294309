use std::path::Path;

use rusqlite::{params, Connection};

use crate::identity::domain::display_name_cache::DisplayNameCache;
use crate::identity::domain::identity::{Gender, Identity, IdentityId, IdentityProfile};
use crate::identity::domain::identity_store::{IdentityStore, StoreError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        gender TEXT NOT NULL,
        age INTEGER NOT NULL,
        face_data BLOB NOT NULL
    );
";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(Box::new(e))
    }
}

/// SQLite-backed identity store.
///
/// `AUTOINCREMENT` keeps ids strictly increasing even if rows are removed
/// by hand. Display names are cached in memory at open and mirrored on
/// every successful `create`; edits made by other processes during a run
/// are not picked up.
pub struct SqliteIdentityStore {
    conn: Connection,
    cache: DisplayNameCache,
}

impl SqliteIdentityStore {
    /// Opens (or creates) the database at `path` and loads the name cache.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(Box::new(e)))?;
        }
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn)?;
        log::info!(
            "Opened identity store {} ({} identities)",
            path.display(),
            store.cache.len()
        );
        Ok(store)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        let mut store = Self {
            conn,
            cache: DisplayNameCache::new(),
        };
        store.load_cache()?;
        Ok(store)
    }

    fn load_cache(&mut self) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, gender, age FROM users ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, IdentityId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        for row in rows {
            let (id, name, gender, age) = row?;
            let profile = IdentityProfile::new(name, Gender::parse(&gender), to_age(id, age)?);
            self.cache.insert(id, &profile);
        }
        Ok(())
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn create(&mut self, profile: &IdentityProfile, sample: &[u8]) -> Result<IdentityId, StoreError> {
        if profile.name.trim().is_empty() {
            return Err(StoreError::InvalidProfile("name is empty".to_string()));
        }
        if sample.is_empty() {
            return Err(StoreError::EmptySample);
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO users (name, gender, age, face_data) VALUES (?1, ?2, ?3, ?4)",
            params![
                profile.name,
                profile.gender.as_str(),
                profile.age as i64,
                sample
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.cache.insert(id, profile);
        log::debug!("Stored identity {id}: {}", profile.display_name());
        Ok(id)
    }

    fn display_name(&self, id: IdentityId) -> String {
        self.cache.get(id)
    }

    fn identities(&self) -> Result<Vec<Identity>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, gender, age, face_data FROM users ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, IdentityId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })?;

        let mut identities = Vec::new();
        for row in rows {
            let (id, name, gender, age, face_data) = row?;
            identities.push(Identity {
                id,
                profile: IdentityProfile::new(name, Gender::parse(&gender), to_age(id, age)?),
                reference_sample: face_data,
            });
        }
        Ok(identities)
    }
}

fn to_age(id: IdentityId, age: i64) -> Result<u32, StoreError> {
    u32::try_from(age).map_err(|_| StoreError::CorruptRecord {
        id,
        reason: format!("age {age} out of range"),
    })
}
