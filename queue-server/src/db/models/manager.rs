//! Manager Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Manager ID type
pub type ManagerId = RecordId;

/// 叫号经理
///
/// 可服务的类别来自两处的并集：
/// 1. 所分配工位 (`workplace`) 的 allowed_categories
/// 2. 个人级别的临时授权 (`category_grants`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manager {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<ManagerId>,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub hash_pass: String,
    /// 所分配的工位
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub workplace: Option<RecordId>,
    /// 个人级别的类别授权
    #[serde(default, with = "serde_helpers::vec_record_id")]
    pub category_grants: Vec<RecordId>,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Create manager payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerCreate {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub workplace: Option<RecordId>,
    #[serde(default, with = "serde_helpers::vec_record_id")]
    pub category_grants: Vec<RecordId>,
}

impl Manager {
    /// Verify password using argon2
    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let parsed_hash = PasswordHash::new(&self.hash_pass)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash password using argon2
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }
}
