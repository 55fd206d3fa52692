use diesel::prelude::*;

use crate::schema::{artefacts, product_versions};

/// A persisted checksum record.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = artefacts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Artefact {
    pub id: i32,
    pub checksum: String,
    pub algorithm: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: Option<String>,
    pub prod_key: String,
    pub language: String,
    pub prod_type: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Insertable)]
#[diesel(table_name = artefacts)]
pub struct NewArtefact<'a> {
    pub checksum: &'a str,
    pub algorithm: &'a str,
    pub group_id: &'a str,
    pub artifact_id: &'a str,
    pub version: &'a str,
    pub classifier: Option<&'a str>,
    pub packaging: Option<&'a str>,
    pub prod_key: &'a str,
    pub language: &'a str,
    pub prod_type: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// A known (group, artifact, version) triple of the product catalog.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = product_versions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductVersion {
    pub id: i32,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = product_versions)]
pub struct NewProductVersion<'a> {
    pub group_id: &'a str,
    pub artifact_id: &'a str,
    pub version: &'a str,
    pub created_at: &'a str,
}
