//! Repository for the slice of `projects` the import pipeline reads.

use sqlx::PgPool;

use crate::models::project::Project;

pub struct ProjectRepo;

impl ProjectRepo {
    /// Resolve a project by its domain code.
    pub async fn find_by_domaincode(
        pool: &PgPool,
        domaincode: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            "SELECT id, name, domaincode, created_at, updated_at
             FROM projects WHERE domaincode = $1",
        )
        .bind(domaincode)
        .fetch_optional(pool)
        .await
    }
}
