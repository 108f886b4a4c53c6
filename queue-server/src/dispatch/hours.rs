//! 限时窗口
//!
//! 配置的时段内暂停发号；窗口外不设限。命中窗口返回软结果
//! 而不是错误，叫号（经理侧）任何时候都不受限。

use chrono::NaiveTime;

use crate::utils::time::parse_hhmm;

/// 发号暂停窗口（闭区间，按业务时区判定）
///
/// 三个参数全部显式，不靠比较方向隐含语义。`wraps_midnight`
/// 时窗口跨午夜（如 18:00-09:00），判定变成 `t >= start || t <= end`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictedHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub wraps_midnight: bool,
}

impl RestrictedHours {
    pub fn new(start: NaiveTime, end: NaiveTime, wraps_midnight: bool) -> Self {
        Self {
            start,
            end,
            wraps_midnight,
        }
    }

    /// 从环境变量读取窗口
    ///
    /// | 环境变量 | 格式 | 说明 |
    /// |----------|------|------|
    /// | RESTRICTED_HOURS_START | HH:MM | 暂停开始时刻 |
    /// | RESTRICTED_HOURS_END | HH:MM | 暂停结束时刻 |
    /// | RESTRICTED_HOURS_WRAP | bool | 跨午夜；缺省按 start > end 推断 |
    ///
    /// 任一时刻缺失或格式非法则视为不限时段。
    pub fn from_env() -> Option<Self> {
        let start = parse_hhmm(&std::env::var("RESTRICTED_HOURS_START").ok()?)?;
        let end = parse_hhmm(&std::env::var("RESTRICTED_HOURS_END").ok()?)?;
        let wraps_midnight = std::env::var("RESTRICTED_HOURS_WRAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(start > end);
        Some(Self::new(start, end, wraps_midnight))
    }

    /// 时刻是否落在暂停窗口内（两端都含）
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.wraps_midnight {
            t >= self.start || t <= self.end
        } else {
            t >= self.start && t <= self.end
        }
    }

    /// 暂停期间给访客看的提示
    ///
    /// 暂停窗口的补集就是发号时段：从 end 开到 start。
    pub fn closed_message(&self) -> String {
        format!(
            "Выдача талонов доступна с {} до {}",
            self.end.format("%H:%M"),
            self.start.format("%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_overnight_pause() {
        // 晚 18:00 到次日早 09:00 暂停发号
        let window = RestrictedHours::new(t(18, 0), t(9, 0), true);

        assert!(window.contains(t(18, 0)));
        assert!(window.contains(t(23, 59)));
        assert!(window.contains(t(0, 0)));
        // 闭区间：边界本身算在内
        assert!(window.contains(t(9, 0)));

        assert!(!window.contains(t(9, 1)));
        assert!(!window.contains(t(12, 30)));
        assert!(!window.contains(t(17, 59)));
    }

    #[test]
    fn test_midday_pause() {
        // 午休 13:00-14:00 暂停
        let window = RestrictedHours::new(t(13, 0), t(14, 0), false);

        assert!(window.contains(t(13, 0)));
        assert!(window.contains(t(13, 30)));
        assert!(window.contains(t(14, 0)));

        assert!(!window.contains(t(12, 59)));
        assert!(!window.contains(t(14, 1)));
        assert!(!window.contains(t(20, 0)));
    }

    #[test]
    fn test_closed_message_mentions_open_hours() {
        let window = RestrictedHours::new(t(18, 0), t(9, 0), true);
        let message = window.closed_message();
        // 提示里给的是发号时段，不是暂停时段
        assert!(message.contains("09:00"));
        assert!(message.contains("18:00"));
        assert!(message.starts_with("Выдача талонов доступна с 09:00"));
    }
}
