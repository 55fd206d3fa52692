//! Database connection management.

use std::{fs, path::Path};

use diesel::{sql_query, Connection, RunQueryDsl, SqliteConnection};

use crate::{
    error::{DbError, Result},
    migration::apply_migrations,
};

/// SQLite connection with the gavel schema applied.
pub struct DbConnection {
    conn: SqliteConnection,
}

impl DbConnection {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut conn = SqliteConnection::establish(&path.to_string_lossy())?;

        // WAL mode for better concurrent access
        sql_query("PRAGMA journal_mode = WAL;").execute(&mut conn)?;

        Self::migrate(conn)
    }

    /// Opens a private in-memory database. Nothing is persisted.
    pub fn open_in_memory() -> Result<Self> {
        let conn = SqliteConnection::establish(":memory:")?;
        Self::migrate(conn)
    }

    fn migrate(mut conn: SqliteConnection) -> Result<Self> {
        apply_migrations(&mut conn).map_err(|e| DbError::MigrationError(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl std::ops::Deref for DbConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::ops::DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
