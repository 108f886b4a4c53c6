use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;
use crate::dispatch::RestrictedHours;

/// 默认业务时区（招生大厅在阿拉木图时间）
const DEFAULT_TIMEZONE: &str = "Asia/Almaty";

/// 服务器配置 - 叫号服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/talon/queue | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | MESSAGE_TCP_PORT | 9200 | TCP 消息总线端口 |
/// | TIMEZONE | Asia/Almaty | 业务时区（日统计、限时窗口按此计算）|
/// | RESTRICTED_HOURS_START | 未设置 | 发号暂停开始时刻 (HH:MM) |
/// | RESTRICTED_HOURS_END | 未设置 | 发号暂停结束时刻 (HH:MM) |
/// | RESTRICTED_HOURS_WRAP | 按 start>end 推断 | 窗口跨午夜 |
/// | ANNOUNCE_AUDIO_BASE_URL | 未设置 | 叫号语音文件基地址 |
/// | ENVIRONMENT | development | 运行环境 |
/// | JWT_SECRET | (生产必须设置) | JWT 签名密钥，至少 32 字符 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/talon HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// TCP 消息总线端口 (用于看板/工作台直连)
    pub message_tcp_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 业务配置 ===
    /// 业务时区
    pub timezone: Tz,
    /// 发号暂停窗口；None 表示全天开放
    pub restricted_hours: Option<RestrictedHours>,
    /// 叫号语音文件基地址；None 表示不下发语音链接
    pub announce_audio_base_url: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/talon/queue".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            message_tcp_port: std::env::var("MESSAGE_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(9200),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            timezone: load_timezone(),
            restricted_hours: RestrictedHours::from_env(),
            announce_audio_base_url: std::env::var("ANNOUNCE_AUDIO_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        message_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.message_tcp_port = message_tcp_port;
        config
    }

    /// 确保工作目录结构存在
    ///
    /// ```text
    /// work_dir/
    /// ├── database/   嵌入式数据库
    /// └── logs/       滚动日志
    /// ```
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 日志目录 (work_dir/logs)
    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 解析 TIMEZONE；无法识别时退回默认时区并告警
fn load_timezone() -> Tz {
    let name = std::env::var("TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.into());
    match name.parse() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(
                timezone = %name,
                fallback = DEFAULT_TIMEZONE,
                "Unknown TIMEZONE, using fallback"
            );
            DEFAULT_TIMEZONE.parse().unwrap_or(chrono_tz::UTC)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_dir_structure() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_overrides(dir.path().to_string_lossy(), 0, 0);

        config.ensure_work_dir_structure().unwrap();

        assert!(config.database_dir().is_dir());
        assert!(config.logs_dir().is_dir());
        // 重复调用不报错
        config.ensure_work_dir_structure().unwrap();
    }
}
