//! Workplace Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Workplace ID type
pub type WorkplaceId = RecordId;

/// 工位（经理的物理位置）
///
/// 如 "Стол 11"（大厅桌台）或 "Кабинет 305"（办公室），
/// 叫号播报里告诉访客该去哪儿。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workplace {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<WorkplaceId>,
    /// 工位名 (如 "Стол 11")
    pub name: String,
    /// 位置补充说明 (如 "Третий этаж")
    #[serde(default)]
    pub location: Option<String>,
    /// 该工位可服务的类别
    #[serde(default, with = "serde_helpers::vec_record_id")]
    pub allowed_categories: Vec<RecordId>,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Create workplace payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkplaceCreate {
    pub name: String,
    pub location: Option<String>,
    #[serde(default, with = "serde_helpers::vec_record_id")]
    pub allowed_categories: Vec<RecordId>,
}

impl Workplace {
    /// 播报用的位置标签
    ///
    /// 有位置补充说明时拼成 "Кабинет 305 (Третий этаж)"。
    pub fn location_label(&self) -> String {
        match &self.location {
            Some(location) if !location.trim().is_empty() => {
                format!("{} ({})", self.name, location)
            }
            _ => self.name.clone(),
        }
    }
}
