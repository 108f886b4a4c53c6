/// 当前 UTC 时间戳（毫秒）
///
/// 票、统计和总线消息落库的时间戳统一从这里取。
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
