//! Category Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Category ID type
pub type CategoryId = RecordId;

/// 队列类别，携带自己的展示号码区间
///
/// 票号在 `[min_number, max_number]` 闭区间内分配，到顶后回绕到区间
/// 起点。不同类别的区间互不相交（如 MASTER 600-699, PHD 700-799），
/// 叫号大厅一眼就能看出票属于哪个窗口。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<CategoryId>,
    /// 稳定键名 (如 "MASTER")
    pub name: String,
    /// 展示用标签 (如 "Магистратура")
    pub label: String,
    /// 区间下界 (含)
    pub min_number: i64,
    /// 区间上界 (含)
    pub max_number: i64,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub label: String,
    pub min_number: i64,
    pub max_number: i64,
}

impl Category {
    /// 区间容量 = 可同时在场的最大未服务票数
    pub fn capacity(&self) -> i64 {
        self.max_number - self.min_number + 1
    }

    /// 紧跟 `number` 的下一个展示号，越过上界时回绕到下界
    pub fn next_number(&self, number: i64) -> i64 {
        if number >= self.max_number {
            self.min_number
        } else {
            number + 1
        }
    }

    /// 判断号码是否落在本类别区间内
    pub fn contains(&self, number: i64) -> bool {
        number >= self.min_number && number <= self.max_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master() -> Category {
        Category {
            id: None,
            name: "MASTER".to_string(),
            label: "Магистратура".to_string(),
            min_number: 600,
            max_number: 699,
            is_active: true,
        }
    }

    #[test]
    fn test_next_number_wraps() {
        let cat = master();
        assert_eq!(cat.next_number(600), 601);
        assert_eq!(cat.next_number(698), 699);
        assert_eq!(cat.next_number(699), 600);
        // 异常输入也收敛回区间内
        assert_eq!(cat.next_number(1000), 600);
    }

    #[test]
    fn test_capacity_and_contains() {
        let cat = master();
        assert_eq!(cat.capacity(), 100);
        assert!(cat.contains(600));
        assert!(cat.contains(699));
        assert!(!cat.contains(599));
        assert!(!cat.contains(700));
    }
}
