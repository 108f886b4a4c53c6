//! 统一 Result 别名

use crate::AppError;

/// 业务处理器的 Result 类型
///
/// `/api` 下的处理器大多返回 `AppResult<Json<AppResponse<T>>>`；
/// 需要在错误里携带数据的路径（叫号授权失败）改用 `DispatchError`。
pub type AppResult<T> = Result<T, AppError>;
