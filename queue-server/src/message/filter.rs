//! 转发过滤
//!
//! 每个客户端的 forwarder 在写消息前用这里的规则判定：
//!
//! 1. `exclude` 命中客户端身份时跳过（经理端不收自己动作的回声）
//! 2. 无主题的消息属于系统消息，所有客户端可见
//! 3. 有主题的消息只发给握手时订阅了该主题的客户端

use shared::message::{BusMessage, Topic};

/// 判定一条广播是否该发给某个客户端
pub fn should_deliver(msg: &BusMessage, subscribed: &[Topic], identity: Option<&str>) -> bool {
    if let (Some(exclude), Some(identity)) = (msg.exclude.as_deref(), identity)
        && exclude == identity
    {
        return false;
    }

    match &msg.topic {
        None => true,
        Some(topic) => subscribed.contains(topic),
    }
}
