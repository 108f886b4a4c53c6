//! 调度错误
//!
//! 调度引擎自己的错误族，和通用的 `AppError` 共用同一套
//! 响应信封与错误码；区别在于 `Forbidden` 要携带
//! 可服务类别列表作为 data 载荷。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::db::repository::RepoError;
use crate::utils::{AppError, AppResponse};

pub type DispatchResult<T> = Result<T, DispatchError>;

/// 队列调度错误
///
/// | 变体 | 状态码 | 错误码 |
/// |------|--------|--------|
/// | CategoryNotFound | 404 | E0003 |
/// | Validation | 400 | E0002 |
/// | Forbidden | 403 | E2001 |
/// | RangeExhausted | 422 | E0005 |
/// | Storage | 500 | E9002 |
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// 类别不存在或已停用
    #[error("{0}")]
    CategoryNotFound(String),

    /// 请求参数验证失败
    #[error("{0}")]
    Validation(String),

    /// 经理无权服务该类别，data 里带上他能服务的类别名
    #[error("{message}")]
    Forbidden { message: String, allowed: Vec<String> },

    /// 号码区间被未服务票占满
    #[error("{0}")]
    RangeExhausted(String),

    /// 存储层故障
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepoError> for DispatchError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => DispatchError::CategoryNotFound(msg),
            RepoError::Validation(msg) => DispatchError::Validation(msg),
            RepoError::Duplicate(msg) | RepoError::Database(msg) => DispatchError::Storage(msg),
        }
    }
}

/// 给只说 `AppError` 的处理器用；`Forbidden` 的类别列表在这条路径上丢弃
impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::CategoryNotFound(msg) => AppError::NotFound(msg),
            DispatchError::Validation(msg) => AppError::Validation(msg),
            DispatchError::Forbidden { message, .. } => AppError::Forbidden(message),
            DispatchError::RangeExhausted(msg) => AppError::BusinessRule(msg),
            DispatchError::Storage(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, code, message, data) = match self {
            DispatchError::CategoryNotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg, None),
            DispatchError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg, None),
            DispatchError::Forbidden { message, allowed } => (
                StatusCode::FORBIDDEN,
                "E2001",
                message,
                Some(json!({ "allowed_categories": allowed })),
            ),
            DispatchError::RangeExhausted(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E0005", msg, None)
            }
            DispatchError::Storage(msg) => {
                tracing::error!("Dispatch storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                    None,
                )
            }
        };

        let body: AppResponse<serde_json::Value> = AppResponse {
            code: code.to_string(),
            message,
            data,
            trace_id: None,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_carries_allowed_categories() {
        let err = DispatchError::Forbidden {
            message: "not authorized".to_string(),
            allowed: vec!["MASTER".to_string(), "PHD".to_string()],
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_repo_not_found_maps_to_category_not_found() {
        let err: DispatchError = RepoError::NotFound("no such category".to_string()).into();
        assert!(matches!(err, DispatchError::CategoryNotFound(_)));
    }

    #[test]
    fn test_range_exhausted_is_unprocessable() {
        let err = DispatchError::RangeExhausted("full".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
