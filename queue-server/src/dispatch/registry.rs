//! 类别注册表
//!
//! 调度引擎看到的类别视图：只暴露启用中的类别，
//! 未知和停用统一归为 `CategoryNotFound`。

use surrealdb::RecordId;

use crate::db::models::Category;
use crate::db::repository::CategoryRepository;
use crate::dispatch::error::{DispatchError, DispatchResult};

#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: CategoryRepository,
}

impl CategoryRegistry {
    pub fn new(categories: CategoryRepository) -> Self {
        Self { categories }
    }

    /// 按名字解析一个启用中的类别
    pub async fn resolve(&self, name: &str) -> DispatchResult<Category> {
        self.categories
            .find_by_name(name)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| DispatchError::CategoryNotFound(format!("Category '{name}' not found")))
    }

    /// 所有启用中的类别，按号码区间排序
    pub async fn active(&self) -> DispatchResult<Vec<Category>> {
        Ok(self.categories.find_all().await?)
    }

    /// 把类别记录 id 批量换成类别名（只留启用中的）
    pub async fn names_of(&self, ids: &[RecordId]) -> DispatchResult<Vec<String>> {
        let mut names: Vec<String> = self
            .categories
            .find_by_ids(ids)
            .await?
            .into_iter()
            .filter(|c| c.is_active)
            .map(|c| c.name)
            .collect();
        names.sort();
        Ok(names)
    }
}
