//! 经理服务授权
//!
//! 经理能服务哪些类别由两部分合并决定：
//! 所在工位的 `allowed_categories`，加上经理个人的 `category_grants`。
//! 工位停用时其授权整体失效，个人授权不受影响。

use surrealdb::RecordId;

use crate::db::models::{Manager, Workplace};
use crate::db::repository::WorkplaceRepository;
use crate::dispatch::error::DispatchResult;

#[derive(Debug, Clone)]
pub struct AuthorizationResolver {
    workplaces: WorkplaceRepository,
}

impl AuthorizationResolver {
    pub fn new(workplaces: WorkplaceRepository) -> Self {
        Self { workplaces }
    }

    /// 经理可服务的类别 id 集合（工位授权 ∪ 个人授权，去重）
    pub async fn allowed_ids(&self, manager: &Manager) -> DispatchResult<Vec<RecordId>> {
        let mut allowed: Vec<RecordId> = Vec::new();

        if let Some(workplace) = self.workplace_of(manager).await? {
            allowed.extend(workplace.allowed_categories.iter().cloned());
        }

        for grant in &manager.category_grants {
            if !allowed.contains(grant) {
                allowed.push(grant.clone());
            }
        }

        Ok(allowed)
    }

    /// 经理所在的启用中工位（用于播报里的位置标签）
    pub async fn workplace_of(&self, manager: &Manager) -> DispatchResult<Option<Workplace>> {
        let Some(workplace_id) = &manager.workplace else {
            return Ok(None);
        };
        Ok(self
            .workplaces
            .find_by_record_id(workplace_id)
            .await?
            .filter(|w| w.is_active))
    }
}
