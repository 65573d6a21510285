use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreateLocationParams, LocationsRepo, RepoError};
use crate::domain::entities::{LocationId, LocationRecord};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: i64,
    name: String,
    is_published: bool,
    created_at: OffsetDateTime,
}

impl From<LocationRow> for LocationRecord {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            is_published: row.is_published,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl LocationsRepo for PostgresRepositories {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        let rows = sqlx::query_as::<_, LocationRow>(
            "SELECT id, name, is_published, created_at FROM locations ORDER BY name ASC, id ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LocationRecord::from).collect())
    }

    async fn find_location(&self, id: LocationId) -> Result<Option<LocationRecord>, RepoError> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LocationRecord::from))
    }

    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        let row = sqlx::query_as::<_, LocationRow>(
            "INSERT INTO locations (name, is_published) VALUES ($1, $2) \
             RETURNING id, name, is_published, created_at",
        )
        .bind(params.name)
        .bind(params.is_published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
