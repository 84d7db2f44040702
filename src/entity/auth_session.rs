//! Persisted auth session entity.
//!
//! Maps the `auth_session` table in which a signed-in session is kept between
//! process runs, so startup can restore it instead of forcing a new login.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing a persisted session.
///
/// # Database Schema
///
/// | Column      | Type                    | Description                          |
/// |-------------|-------------------------|--------------------------------------|
/// | key         | TEXT (Primary Key)      | Storage key of the session slot      |
/// | data        | BYTEA                   | MessagePack serialized session       |
/// | expiry_date | TIMESTAMPTZ             | When the refresh window closes       |
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_session")]
pub struct Model {
    /// The storage slot, e.g. `sb-<project>-auth-token`.
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub key: String,

    /// The MessagePack-serialized [`crate::Session`].
    pub data: Vec<u8>,

    /// Rows past this instant are ignored on load and removed by
    /// `delete_expired`.
    pub expiry_date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
