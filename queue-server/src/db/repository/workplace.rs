//! Workplace Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Workplace, WorkplaceCreate};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct WorkplaceRepository {
    base: BaseRepository,
}

impl WorkplaceRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find workplace by record id
    pub async fn find_by_record_id(&self, id: &RecordId) -> RepoResult<Option<Workplace>> {
        let workplace: Option<Workplace> = self.base.db().select(id.clone()).await?;
        Ok(workplace)
    }

    /// Find workplace by name
    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<Workplace>> {
        let name_owned = name.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM workplace WHERE name = $name LIMIT 1")
            .bind(("name", name_owned))
            .await?;
        let workplaces: Vec<Workplace> = result.take(0)?;
        Ok(workplaces.into_iter().next())
    }

    /// Create a new workplace
    pub async fn create(&self, data: WorkplaceCreate) -> RepoResult<Workplace> {
        if self.find_by_name(&data.name).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Workplace '{}' already exists",
                data.name
            )));
        }

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE workplace SET
                    name = $name,
                    location = $location,
                    allowed_categories = $allowed_categories,
                    is_active = true
                RETURN AFTER"#,
            )
            .bind(("name", data.name))
            .bind(("location", data.location))
            .bind(("allowed_categories", data.allowed_categories))
            .await?;

        let created: Option<Workplace> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create workplace".to_string()))
    }
}
