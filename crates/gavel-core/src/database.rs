//! SQLite-backed stores.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, SecondsFormat, Utc};
use gavel_db::{
    models::{Artefact, NewArtefact, NewProductVersion},
    repository::{ArtefactRepository, ProductVersionRepository},
    DbConnection,
};
use gavel_index::ArtifactKey;

use crate::{
    error::{GavelError, Result},
    store::{ChecksumRecord, ChecksumStore, VersionStore},
};

/// Checksum and version store over a single SQLite connection.
#[derive(Clone)]
pub struct DieselStore {
    conn: Arc<Mutex<DbConnection>>,
}

impl DieselStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = DbConnection::open(path)
            .map_err(|e| GavelError::Store(format!("opening database: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = DbConnection::open_in_memory()
            .map_err(|e| GavelError::Store(format!("opening in-memory database: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> diesel::QueryResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| GavelError::PoisonError)?;
        f(conn.conn()).map_err(|e| GavelError::Store(format!("database error: {}", e)))
    }

    /// Adds a version to the product catalog.
    pub fn add_product_version(&self, key: &ArtifactKey) -> Result<bool> {
        let now = timestamp(&Utc::now());
        self.with_conn(|conn| {
            ProductVersionRepository::insert(
                conn,
                &NewProductVersion {
                    group_id: &key.group_id,
                    artifact_id: &key.artifact_id,
                    version: &key.version,
                    created_at: &now,
                },
            )
        })
    }

    pub fn checksum_count(&self) -> Result<i64> {
        self.with_conn(ArtefactRepository::count)
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GavelError::Store(format!("invalid timestamp `{value}`: {e}")))
}

fn into_record(artefact: Artefact) -> Result<ChecksumRecord> {
    Ok(ChecksumRecord {
        algorithm: artefact
            .algorithm
            .parse()
            .map_err(GavelError::Store)?,
        created_at: parse_timestamp(&artefact.created_at)?,
        updated_at: parse_timestamp(&artefact.updated_at)?,
        checksum: artefact.checksum,
        group_id: artefact.group_id,
        artifact_id: artefact.artifact_id,
        version: artefact.version,
        classifier: artefact.classifier,
        packaging: artefact.packaging,
        prod_key: artefact.prod_key,
        language: artefact.language,
        prod_type: artefact.prod_type,
    })
}

impl ChecksumStore for DieselStore {
    fn find_by_checksum(&self, checksum: &str) -> Result<Option<ChecksumRecord>> {
        self.with_conn(|conn| ArtefactRepository::find_by_checksum(conn, checksum))?
            .map(into_record)
            .transpose()
    }

    fn create(&self, record: &ChecksumRecord) -> Result<bool> {
        let created_at = timestamp(&record.created_at);
        let updated_at = timestamp(&record.updated_at);

        self.with_conn(|conn| {
            ArtefactRepository::insert(
                conn,
                &NewArtefact {
                    checksum: &record.checksum,
                    algorithm: record.algorithm.as_str(),
                    group_id: &record.group_id,
                    artifact_id: &record.artifact_id,
                    version: &record.version,
                    classifier: record.classifier.as_deref(),
                    packaging: record.packaging.as_deref(),
                    prod_key: &record.prod_key,
                    language: &record.language,
                    prod_type: &record.prod_type,
                    created_at: &created_at,
                    updated_at: &updated_at,
                },
            )
        })
    }
}

impl VersionStore for DieselStore {
    fn exists(&self, key: &ArtifactKey) -> Result<bool> {
        self.with_conn(|conn| {
            ProductVersionRepository::exists(conn, &key.group_id, &key.artifact_id, &key.version)
        })
    }
}
