//! Database Module
//!
//! Handles the embedded SurrealDB instance and schema definitions

pub mod models;
pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "talon";
const DATABASE: &str = "queue";

/// Database service - owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Create a new database service backed by RocksDB
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        let service = Self::prepare(db).await?;
        tracing::info!("Database connection established (SurrealDB RocksDB)");
        Ok(service)
    }

    /// Create an in-memory database service
    ///
    /// 用于测试场景，不落盘。
    pub async fn memory() -> Result<Self, AppError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;
        Self::prepare(db).await
    }

    async fn prepare(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        let service = Self { db };
        service.define_schema().await?;
        Ok(service)
    }

    /// Define indexes (idempotent)
    ///
    /// 表本身是 schemaless 的；这里只定义查询热路径
    /// 需要的索引和唯一约束。
    async fn define_schema(&self) -> Result<(), AppError> {
        self.db
            .query(
                r#"
                DEFINE INDEX IF NOT EXISTS idx_category_name ON TABLE category COLUMNS name UNIQUE;
                DEFINE INDEX IF NOT EXISTS idx_manager_username ON TABLE manager COLUMNS username UNIQUE;
                DEFINE INDEX IF NOT EXISTS idx_ticket_queue ON TABLE ticket COLUMNS category, served;
                DEFINE INDEX IF NOT EXISTS idx_ticket_token ON TABLE ticket COLUMNS token UNIQUE;
                "#,
            )
            .await
            .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;
        Ok(())
    }
}
