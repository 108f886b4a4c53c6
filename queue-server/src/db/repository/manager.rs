//! Manager Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Manager, ManagerCreate};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct ManagerRepository {
    base: BaseRepository,
}

impl ManagerRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find manager by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Manager>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let manager: Option<Manager> = self.base.db().select(thing).await?;
        Ok(manager)
    }

    /// Find manager by username
    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<Manager>> {
        let username_owned = username.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM manager WHERE username = $username LIMIT 1")
            .bind(("username", username_owned))
            .await?;
        let managers: Vec<Manager> = result.take(0)?;
        Ok(managers.into_iter().next())
    }

    /// Create a new manager
    pub async fn create(&self, data: ManagerCreate) -> RepoResult<Manager> {
        // Check duplicate username
        if self.find_by_username(&data.username).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Username '{}' already exists",
                data.username
            )));
        }

        // Hash password
        let hash_pass = Manager::hash_password(&data.password)
            .map_err(|e| RepoError::Database(format!("Failed to hash password: {}", e)))?;

        let display_name = data.display_name.unwrap_or_else(|| data.username.clone());

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE manager SET
                    username = $username,
                    display_name = $display_name,
                    hash_pass = $hash_pass,
                    workplace = $workplace,
                    category_grants = $category_grants,
                    is_active = true
                RETURN AFTER"#,
            )
            .bind(("username", data.username))
            .bind(("display_name", display_name))
            .bind(("hash_pass", hash_pass))
            .bind(("workplace", data.workplace))
            .bind(("category_grants", data.category_grants))
            .await?;

        let created: Option<Manager> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create manager".to_string()))
    }
}
