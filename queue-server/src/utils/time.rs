//! 时间工具函数 (业务时区转换)
//!
//! 票据时间戳统一存 `i64` Unix millis (UTC)；
//! 日统计的"日期"和营业时间窗口判定都按业务时区计算。

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 日期字符串格式 (YYYY-MM-DD)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 日期 → 字符串 (YYYY-MM-DD)
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 验证日期不在未来 (业务时区)
pub fn validate_not_future(date: NaiveDate, tz: Tz) -> AppResult<()> {
    let today = today_in_tz(tz);
    if date > today {
        return Err(AppError::validation(format!(
            "Date {} is in the future (today is {})",
            date, today
        )));
    }
    Ok(())
}

/// 业务时区下的今天
pub fn today_in_tz(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

/// 业务时区下的当前时刻 (时分秒)
pub fn now_local_time(tz: Tz) -> NaiveTime {
    chrono::Utc::now().with_timezone(&tz).time()
}

/// 解析时刻字符串 (HH:MM)
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}
