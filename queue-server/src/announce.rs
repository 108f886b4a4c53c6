//! 叫号播报
//!
//! 认领成功后要在大厅播报：一段给显示屏念的文本，以及可选的
//! 语音资源地址。语音文件的生成由外部服务负责（按 `ticket_{号码}.mp3`
//! 约定命名），核心只负责拼出地址；没配基地址时播报里就不带语音。

use std::fmt;

/// 播报内容提供者
///
/// 实现必须是非阻塞的：认领流程在事件发出前同步调用这里，
/// 真正的语音合成要在进程外完成。
pub trait AnnouncementProvider: Send + Sync {
    /// 显示屏播报文本
    fn announcement_text(&self, number: i64, location: Option<&str>) -> String;

    /// 该号码对应的语音资源地址
    fn audio_url(&self, number: i64) -> Option<String>;
}

/// 按固定 URL 约定拼地址的播报提供者
pub struct UrlAnnouncer {
    /// 语音文件基地址，如 "http://host/media"；None 表示不提供语音
    audio_base_url: Option<String>,
}

impl UrlAnnouncer {
    /// 基地址来自配置 (ANNOUNCE_AUDIO_BASE_URL)
    pub fn new(audio_base_url: Option<String>) -> Self {
        Self {
            audio_base_url: audio_base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        }
    }
}

impl AnnouncementProvider for UrlAnnouncer {
    fn announcement_text(&self, number: i64, location: Option<&str>) -> String {
        match location {
            Some(location) => format!("Талон {number}, подойдите: {location}"),
            None => format!("Талон {number}, подойдите к свободному менеджеру"),
        }
    }

    fn audio_url(&self, number: i64) -> Option<String> {
        self.audio_base_url
            .as_ref()
            .map(|base| format!("{base}/ticket_{number}.mp3"))
    }
}

impl fmt::Debug for UrlAnnouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlAnnouncer")
            .field("audio_base_url", &self.audio_base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_includes_number_and_location() {
        let announcer = UrlAnnouncer::new(None);
        let text = announcer.announcement_text(605, Some("Стол 3"));
        assert!(text.contains("605"));
        assert!(text.contains("Стол 3"));
    }

    #[test]
    fn test_text_without_location_still_names_ticket() {
        let announcer = UrlAnnouncer::new(None);
        let text = announcer.announcement_text(605, None);
        assert!(text.contains("605"));
    }

    #[test]
    fn test_audio_url_follows_naming_convention() {
        let announcer = UrlAnnouncer::new(Some("http://host/media/".to_string()));
        assert_eq!(
            announcer.audio_url(605),
            Some("http://host/media/ticket_605.mp3".to_string())
        );
    }

    #[test]
    fn test_no_base_url_means_no_audio() {
        let announcer = UrlAnnouncer::new(None);
        assert_eq!(announcer.audio_url(605), None);

        let blank = UrlAnnouncer::new(Some("".to_string()));
        assert_eq!(blank.audio_url(605), None);
    }
}
