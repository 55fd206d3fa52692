//! Checksum records.

use diesel::prelude::*;

use crate::{
    models::{Artefact, NewArtefact},
    schema::artefacts,
};

pub struct ArtefactRepository;

impl ArtefactRepository {
    pub fn find_by_checksum(
        conn: &mut SqliteConnection,
        checksum: &str,
    ) -> QueryResult<Option<Artefact>> {
        artefacts::table
            .filter(artefacts::checksum.eq(checksum))
            .select(Artefact::as_select())
            .first(conn)
            .optional()
    }

    /// Inserts a checksum record unless one already exists for the same
    /// checksum. Returns `true` when a row was written.
    pub fn insert(conn: &mut SqliteConnection, artefact: &NewArtefact) -> QueryResult<bool> {
        let inserted = diesel::insert_into(artefacts::table)
            .values(artefact)
            .on_conflict(artefacts::checksum)
            .do_nothing()
            .execute(conn)?;
        Ok(inserted > 0)
    }

    pub fn count(conn: &mut SqliteConnection) -> QueryResult<i64> {
        artefacts::table.count().get_result(conn)
    }

}
