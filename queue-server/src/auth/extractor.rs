//! JWT Extractor
//!
//! 处理函数参数里的 [`CurrentManager`] 自动完成令牌验证。

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{CurrentManager, JwtService};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::AppError;

/// JWT Auth Extractor
///
/// 受保护的处理函数直接声明 `manager: CurrentManager` 参数即可；
/// 中间件已验证过时直接复用扩展里的身份，否则在这里验证。
impl FromRequestParts<ServerState> for CurrentManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted (from middleware)
        if let Some(manager) = parts.extensions.get::<CurrentManager>() {
            return Ok(manager.clone());
        }

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                security_log!("WARN", "auth_missing", uri = format!("{:?}", parts.uri));
                return Err(AppError::unauthorized());
            }
        };

        // Validate token
        let jwt_service = state.get_jwt_service();
        match jwt_service.validate_token(token) {
            Ok(claims) => {
                let manager = CurrentManager::from(claims);

                // Store in extensions for potential reuse
                parts.extensions.insert(manager.clone());

                Ok(manager)
            }
            Err(e) => {
                security_log!(
                    "WARN",
                    "auth_failed",
                    error = format!("{}", e),
                    uri = format!("{:?}", parts.uri)
                );

                match e {
                    crate::auth::JwtError::ExpiredToken => Err(AppError::token_expired()),
                    _ => Err(AppError::invalid_token("Invalid token")),
                }
            }
        }
    }
}
