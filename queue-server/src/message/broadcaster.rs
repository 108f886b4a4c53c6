//! 队列事件广播器
//!
//! 订阅调度引擎的领域事件，整形成各订阅面的总线消息后发布。
//! 同一事件对不同主题的投递形状不同：
//!
//! | 事件 | all_queues / category | managers | displays |
//! |------|----------------------|----------|----------|
//! | TicketIssued | new_ticket | - | ticket_count_update |
//! | TicketClaimed | ticket_called (号码+人数) | ticket_called (+位置, 排除发起者) | ticket_called (+姓名/播报/语音), ticket_count_update |
//! | QueueEmptied | queue_status empty | - | queue_status empty |

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use shared::message::{BusMessage, QueueState, QueueUpdate, Topic};

use super::bus::MessageBus;
use crate::dispatch::QueueEvent;

/// 队列事件广播器（后台任务）
pub struct QueueBroadcaster {
    events: broadcast::Receiver<QueueEvent>,
    bus: Arc<MessageBus>,
    shutdown_token: CancellationToken,
}

impl QueueBroadcaster {
    pub fn new(
        events: broadcast::Receiver<QueueEvent>,
        bus: Arc<MessageBus>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            events,
            bus,
            shutdown_token,
        }
    }

    /// 消费引擎事件直到关闭
    pub async fn run(mut self) {
        tracing::debug!("Queue broadcaster started");
        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::debug!("Queue broadcaster shutting down");
                    break;
                }
                event = self.events.recv() => {
                    match event {
                        Ok(event) => {
                            for msg in shape_event(&event) {
                                self.bus.publish(msg);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(dropped = n, "Broadcaster lagged behind engine events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!("Engine event channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// 把一个领域事件整形成各订阅面的总线消息
pub(crate) fn shape_event(event: &QueueEvent) -> Vec<BusMessage> {
    match event {
        QueueEvent::TicketIssued {
            category,
            ticket,
            waiting,
        } => {
            let update = QueueUpdate::NewTicket {
                category: category.name.clone(),
                number: ticket.number,
                waiting: *waiting,
            };
            let count = QueueUpdate::TicketCountUpdate {
                category: category.name.clone(),
                waiting: *waiting,
            };
            vec![
                BusMessage::queue_update(Topic::AllQueues, &update),
                BusMessage::queue_update(Topic::category(&category.name), &update),
                BusMessage::queue_update(Topic::Displays, &count),
            ]
        }

        QueueEvent::TicketClaimed {
            category,
            ticket,
            manager,
            announcement,
            audio_url,
            waiting,
        } => {
            // 看板类订阅面只要号码和人数
            let generic = QueueUpdate::TicketCalled {
                category: category.name.clone(),
                number: ticket.number,
                holder_name: None,
                location: None,
                announcement: None,
                audio_url: None,
                waiting: *waiting,
            };
            // 经理端关心叫到哪个工位了
            let for_managers = QueueUpdate::TicketCalled {
                category: category.name.clone(),
                number: ticket.number,
                holder_name: None,
                location: manager.location.clone(),
                announcement: None,
                audio_url: None,
                waiting: *waiting,
            };
            // 大厅显示屏拿全量：姓名、位置、播报文本、语音
            let for_displays = QueueUpdate::TicketCalled {
                category: category.name.clone(),
                number: ticket.number,
                holder_name: Some(ticket.holder_name.clone()),
                location: manager.location.clone(),
                announcement: Some(announcement.clone()),
                audio_url: audio_url.clone(),
                waiting: *waiting,
            };

            // 发起叫号的经理不收自己的回声
            let mut managers_msg = BusMessage::queue_update(Topic::Managers, &for_managers);
            if !manager.id.is_empty() {
                managers_msg = managers_msg.with_exclude(&manager.id);
            }

            let count = QueueUpdate::TicketCountUpdate {
                category: category.name.clone(),
                waiting: *waiting,
            };

            vec![
                BusMessage::queue_update(Topic::AllQueues, &generic),
                BusMessage::queue_update(Topic::category(&category.name), &generic),
                managers_msg,
                BusMessage::queue_update(Topic::Displays, &for_displays),
                BusMessage::queue_update(Topic::Displays, &count),
            ]
        }

        QueueEvent::QueueEmptied { category } => {
            let status = QueueUpdate::QueueStatus {
                category: category.name.clone(),
                status: QueueState::Empty,
            };
            vec![
                BusMessage::queue_update(Topic::AllQueues, &status),
                BusMessage::queue_update(Topic::category(&category.name), &status),
                BusMessage::queue_update(Topic::Displays, &status),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{CategorySnapshot, ManagerSnapshot, TicketSnapshot};

    fn master() -> CategorySnapshot {
        CategorySnapshot {
            name: "MASTER".to_string(),
            label: "Магистратура".to_string(),
        }
    }

    fn ticket(number: i64) -> TicketSnapshot {
        TicketSnapshot {
            number,
            holder_name: "Айгерим".to_string(),
        }
    }

    #[test]
    fn test_issue_shapes() {
        let event = QueueEvent::TicketIssued {
            category: master(),
            ticket: ticket(600),
            waiting: 4,
        };

        let msgs = shape_event(&event);
        assert_eq!(msgs.len(), 3);

        let topics: Vec<_> = msgs.iter().map(|m| m.topic.clone().unwrap()).collect();
        assert_eq!(
            topics,
            vec![
                Topic::AllQueues,
                Topic::category("MASTER"),
                Topic::Displays
            ]
        );

        let broad: QueueUpdate = msgs[0].parse_payload().unwrap();
        assert_eq!(broad.kind(), "new_ticket");
        let display: QueueUpdate = msgs[2].parse_payload().unwrap();
        assert_eq!(display.kind(), "ticket_count_update");
    }

    #[test]
    fn test_claim_shapes_differ_per_audience() {
        let event = QueueEvent::TicketClaimed {
            category: master(),
            ticket: ticket(605),
            manager: ManagerSnapshot {
                id: "manager:aizhan".to_string(),
                display_name: "Айжан".to_string(),
                location: Some("Стол 3".to_string()),
            },
            announcement: "Талон 605, подойдите: Стол 3".to_string(),
            audio_url: Some("http://host/media/ticket_605.mp3".to_string()),
            waiting: 2,
        };

        let msgs = shape_event(&event);
        assert_eq!(msgs.len(), 5);

        // all_queues: 只有号码和人数
        let generic: QueueUpdate = msgs[0].parse_payload().unwrap();
        match generic {
            QueueUpdate::TicketCalled {
                holder_name,
                location,
                announcement,
                audio_url,
                number,
                ..
            } => {
                assert_eq!(number, 605);
                assert!(holder_name.is_none());
                assert!(location.is_none());
                assert!(announcement.is_none());
                assert!(audio_url.is_none());
            }
            other => panic!("unexpected update: {:?}", other),
        }

        // managers: 多一个位置标签，并排除发起者
        assert_eq!(msgs[2].topic, Some(Topic::Managers));
        assert_eq!(msgs[2].exclude.as_deref(), Some("manager:aizhan"));
        let for_managers: QueueUpdate = msgs[2].parse_payload().unwrap();
        match for_managers {
            QueueUpdate::TicketCalled {
                location,
                holder_name,
                ..
            } => {
                assert_eq!(location.as_deref(), Some("Стол 3"));
                assert!(holder_name.is_none());
            }
            other => panic!("unexpected update: {:?}", other),
        }

        // displays: 全量
        assert_eq!(msgs[3].topic, Some(Topic::Displays));
        let for_displays: QueueUpdate = msgs[3].parse_payload().unwrap();
        match for_displays {
            QueueUpdate::TicketCalled {
                holder_name,
                announcement,
                audio_url,
                ..
            } => {
                assert_eq!(holder_name.as_deref(), Some("Айгерим"));
                assert!(announcement.unwrap().contains("605"));
                assert!(audio_url.unwrap().ends_with("ticket_605.mp3"));
            }
            other => panic!("unexpected update: {:?}", other),
        }

        // 叫号后显示屏还要刷新等待人数
        assert_eq!(msgs[4].topic, Some(Topic::Displays));
        let count: QueueUpdate = msgs[4].parse_payload().unwrap();
        assert_eq!(count.kind(), "ticket_count_update");
    }

    #[test]
    fn test_emptied_shape() {
        let event = QueueEvent::QueueEmptied { category: master() };
        let msgs = shape_event(&event);
        assert_eq!(msgs.len(), 3);
        for msg in &msgs {
            let update: QueueUpdate = msg.parse_payload().unwrap();
            assert_eq!(update.kind(), "queue_status");
            assert_eq!(update.category(), "MASTER");
        }
    }
}
