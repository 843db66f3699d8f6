//! Project row model (the slice of it this pipeline needs).

use serde::Serialize;
use sqlx::FromRow;

use pictura_core::types::{DbId, Timestamp};

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub domaincode: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
