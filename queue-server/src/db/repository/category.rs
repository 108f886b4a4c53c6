//! Category Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Category, CategoryCreate};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct CategoryRepository {
    base: BaseRepository,
}

impl CategoryRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active categories, ordered by their number range
    pub async fn find_all(&self) -> RepoResult<Vec<Category>> {
        let categories: Vec<Category> = self
            .base
            .db()
            .query("SELECT * FROM category WHERE is_active = true ORDER BY min_number")
            .await?
            .take(0)?;
        Ok(categories)
    }

    /// Find category by name (active or not)
    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let name_owned = name.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM category WHERE name = $name LIMIT 1")
            .bind(("name", name_owned))
            .await?;
        let categories: Vec<Category> = result.take(0)?;
        Ok(categories.into_iter().next())
    }

    /// Find categories by record ids
    ///
    /// 用于把授权里的 category 链接解析成名字（如 Forbidden 响应里的
    /// allowed_categories 列表）。
    pub async fn find_by_ids(&self, ids: &[RecordId]) -> RepoResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let ids_owned = ids.to_vec();
        let categories: Vec<Category> = self
            .base
            .db()
            .query("SELECT * FROM category WHERE id IN $ids ORDER BY min_number")
            .bind(("ids", ids_owned))
            .await?
            .take(0)?;
        Ok(categories)
    }

    /// Create a new category
    pub async fn create(&self, data: CategoryCreate) -> RepoResult<Category> {
        if data.min_number > data.max_number {
            return Err(RepoError::Validation(format!(
                "Invalid number range [{}, {}]",
                data.min_number, data.max_number
            )));
        }

        // Check duplicate name
        if self.find_by_name(&data.name).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Category '{}' already exists",
                data.name
            )));
        }

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE category SET
                    name = $name,
                    label = $label,
                    min_number = $min_number,
                    max_number = $max_number,
                    is_active = true
                RETURN AFTER"#,
            )
            .bind(("name", data.name))
            .bind(("label", data.label))
            .bind(("min_number", data.min_number))
            .bind(("max_number", data.max_number))
            .await?;

        let created: Option<Category> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create category".to_string()))
    }
}
