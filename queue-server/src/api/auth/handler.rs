//! 认证处理器
//!
//! 登录发令牌；授权每次叫号时由调度层现查，
//! 所以令牌里只带身份，不带类别列表。

use std::time::Duration;

use axum::{Extension, Json, extract::State};

use crate::auth::CurrentManager;
use crate::core::ServerState;
use crate::db::models::Manager;
use crate::db::repository::ManagerRepository;
use crate::security_log;
use crate::utils::validation::{MAX_PASSWORD_LEN, MAX_USERNAME_LEN, validate_required_text};
use crate::utils::{AppError, AppResponse, AppResult, ok};

use shared::client::{LoginRequest, LoginResponse, ManagerInfo};

/// 认证固定延迟 (毫秒)，抹平用户存在与否的时间差
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// POST /api/auth/login - 经理登录
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AppResponse<LoginResponse>>> {
    validate_required_text(&req.username, "username", MAX_USERNAME_LEN)?;
    validate_required_text(&req.password, "password", MAX_PASSWORD_LEN)?;

    let repo = ManagerRepository::new(state.get_db());
    let manager = repo.find_by_username(&req.username).await?;

    // 固定延迟在检查结果之前，防时序探测
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // 统一错误文案，防用户名枚举
    let manager = match manager {
        Some(m) => {
            if !m.is_active {
                return Err(AppError::forbidden("Account has been disabled"));
            }

            let password_valid = m
                .verify_password(&req.password)
                .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;

            if !password_valid {
                security_log!(
                    "WARN",
                    "login_failed",
                    username = req.username.clone(),
                    reason = "invalid_credentials"
                );
                tracing::warn!(username = %req.username, "Login failed - invalid credentials");
                return Err(AppError::invalid_credentials());
            }

            m
        }
        None => {
            security_log!(
                "WARN",
                "login_failed",
                username = req.username.clone(),
                reason = "user_not_found"
            );
            tracing::warn!(username = %req.username, "Login failed - user not found");
            return Err(AppError::invalid_credentials());
        }
    };

    let manager_id = manager
        .id
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_default();

    let token = state
        .get_jwt_service()
        .generate_token(&manager_id, &manager.username, &manager.display_name)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    let info = manager_info(&state, &manager).await?;

    security_log!(
        "INFO",
        "login_success",
        username = manager.username.clone()
    );
    tracing::info!(
        manager_id = %manager_id,
        username = %manager.username,
        "🔐 Manager logged in"
    );

    Ok(ok(LoginResponse {
        token,
        manager: info,
    }))
}

/// GET /api/auth/me - 当前经理信息
///
/// 每次都查库拿最新的工位和授权，改授权后无需重新登录。
pub async fn me(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentManager>,
) -> AppResult<Json<AppResponse<ManagerInfo>>> {
    let repo = ManagerRepository::new(state.get_db());
    let manager = repo
        .find_by_id(&current.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !manager.is_active {
        return Err(AppError::forbidden("Account has been disabled"));
    }

    let info = manager_info(&state, &manager).await?;
    Ok(ok(info))
}

/// 组装经理信息 DTO（工位标签 + 可服务类别现查）
async fn manager_info(state: &ServerState, manager: &Manager) -> AppResult<ManagerInfo> {
    let (workplace, allowed_categories) = state.engine().manager_profile(manager).await?;

    Ok(ManagerInfo {
        id: manager
            .id
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_default(),
        username: manager.username.clone(),
        display_name: manager.display_name.clone(),
        location: workplace.as_ref().map(|w| w.location_label()),
        allowed_categories,
    })
}
