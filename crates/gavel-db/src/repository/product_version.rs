//! Product catalog versions.
//!
//! Rows are keyed by normalized coordinates: callers pass group and artifact
//! ids already lower-cased. Every column is compared verbatim.

use diesel::{dsl::exists, prelude::*};

use crate::{models::NewProductVersion, schema::product_versions};

pub struct ProductVersionRepository;

impl ProductVersionRepository {
    pub fn exists(
        conn: &mut SqliteConnection,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> QueryResult<bool> {
        diesel::select(exists(
            product_versions::table
                .filter(product_versions::group_id.eq(group_id))
                .filter(product_versions::artifact_id.eq(artifact_id))
                .filter(product_versions::version.eq(version)),
        ))
        .get_result(conn)
    }

    /// Returns `true` when the triple was not yet present.
    pub fn insert(conn: &mut SqliteConnection, product: &NewProductVersion) -> QueryResult<bool> {
        let inserted = diesel::insert_into(product_versions::table)
            .values(product)
            .on_conflict((
                product_versions::group_id,
                product_versions::artifact_id,
                product_versions::version,
            ))
            .do_nothing()
            .execute(conn)?;
        Ok(inserted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConnection;

    fn product<'a>(group_id: &'a str, artifact_id: &'a str, version: &'a str) -> NewProductVersion<'a> {
        NewProductVersion {
            group_id,
            artifact_id,
            version,
            created_at: "2025-06-01T00:00:00Z",
        }
    }

    #[test]
    fn test_exists_after_insert() {
        let mut db = DbConnection::open_in_memory().unwrap();
        assert!(!ProductVersionRepository::exists(db.conn(), "org.example", "lib", "1.2.0").unwrap());

        ProductVersionRepository::insert(db.conn(), &product("org.example", "lib", "1.2.0")).unwrap();
        assert!(ProductVersionRepository::exists(db.conn(), "org.example", "lib", "1.2.0").unwrap());
        assert!(!ProductVersionRepository::exists(db.conn(), "org.example", "core", "1.2.0").unwrap());
    }

    #[test]
    fn test_version_is_exact() {
        let mut db = DbConnection::open_in_memory().unwrap();
        ProductVersionRepository::insert(db.conn(), &product("org.example", "lib", "1.2.0-RC1")).unwrap();

        assert!(!ProductVersionRepository::exists(db.conn(), "org.example", "lib", "1.2.0-rc1").unwrap());
        assert!(!ProductVersionRepository::exists(db.conn(), "org.example", "lib", "1.2.0").unwrap());
    }

    #[test]
    fn test_insert_duplicate() {
        let mut db = DbConnection::open_in_memory().unwrap();
        assert!(ProductVersionRepository::insert(db.conn(), &product("org.example", "lib", "1.0")).unwrap());
        assert!(!ProductVersionRepository::insert(db.conn(), &product("org.example", "lib", "1.0")).unwrap());
    }
}
