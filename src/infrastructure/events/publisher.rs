//! Event Publisher Implementation
//!
//! 实时通知：按 task_id 分频道的 broadcast，加一个全局频道。
//! 尽力投递，至多一次；未连接的客户端错过事件后应轮询任务记录。

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::task::TaskStatus;

pub const DEFAULT_EVENT_BUFFER: usize = 1024;

/// WebSocket 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 任务状态 / 进度
    #[serde(rename = "task:progress", rename_all = "camelCase")]
    TaskProgress {
        task_id: Uuid,
        status: TaskStatus,
        progress: u8,
    },
    /// 流式正文片段
    #[serde(rename = "task:chunk", rename_all = "camelCase")]
    TaskChunk { task_id: Uuid, chunk: String },
    /// 任务完成
    #[serde(rename = "task:completed", rename_all = "camelCase")]
    TaskCompleted { task_id: Uuid, result: Value },
    /// 任务失败
    #[serde(rename = "task:failed", rename_all = "camelCase")]
    TaskFailed { task_id: Uuid, error: String },
    /// 小说数据变更（全局广播）
    #[serde(rename = "novel:updated", rename_all = "camelCase")]
    NovelUpdated { novel_id: Uuid },
}

/// 事件发布器
pub struct EventPublisher {
    /// task_id -> broadcast sender
    task_channels: DashMap<Uuid, broadcast::Sender<WsEvent>>,
    /// 全局频道（novel:updated）
    global_channel: broadcast::Sender<WsEvent>,
    buffer: usize,
}

impl EventPublisher {
    pub fn new(buffer: usize) -> Self {
        let buffer = buffer.max(1);
        let (global_tx, _) = broadcast::channel(buffer);
        Self {
            task_channels: DashMap::new(),
            global_channel: global_tx,
            buffer,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<WsEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅任务频道（频道不存在时创建）
    pub fn subscribe_task(&self, task_id: Uuid) -> broadcast::Receiver<WsEvent> {
        self.task_channels
            .entry(task_id)
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .subscribe()
    }

    /// 任务结束后关闭频道，订阅者收完缓冲事件后得到 Closed
    pub fn close_task(&self, task_id: Uuid) {
        self.task_channels.remove(&task_id);
    }

    /// 取消订阅后回收空闲频道；调用前需先丢弃 Receiver
    pub fn release_task(&self, task_id: Uuid) {
        self.task_channels
            .remove_if(&task_id, |_, sender| sender.receiver_count() == 0);
    }

    pub fn task_channel_count(&self) -> usize {
        self.task_channels.len()
    }

    pub fn publish_progress(&self, task_id: Uuid, status: TaskStatus, progress: u8) {
        self.publish_to_task(
            task_id,
            WsEvent::TaskProgress {
                task_id,
                status,
                progress,
            },
        );
    }

    pub fn publish_chunk(&self, task_id: Uuid, chunk: &str) {
        self.publish_to_task(
            task_id,
            WsEvent::TaskChunk {
                task_id,
                chunk: chunk.to_string(),
            },
        );
    }

    pub fn publish_completed(&self, task_id: Uuid, result: Value) {
        self.publish_to_task(task_id, WsEvent::TaskCompleted { task_id, result });
    }

    pub fn publish_failed(&self, task_id: Uuid, error: &str) {
        self.publish_to_task(
            task_id,
            WsEvent::TaskFailed {
                task_id,
                error: error.to_string(),
            },
        );
    }

    /// 发布小说变更事件（全局广播，不限订阅）
    pub fn publish_novel_updated(&self, novel_id: Uuid) {
        let event = WsEvent::NovelUpdated { novel_id };
        if let Err(e) = self.global_channel.send(event) {
            tracing::debug!(
                novel_id = %novel_id,
                error = %e,
                "Failed to publish NovelUpdated event (no receivers)"
            );
        }
    }

    /// 发布事件到任务频道；无人订阅时直接丢弃
    fn publish_to_task(&self, task_id: Uuid, event: WsEvent) {
        if let Some(sender) = self.task_channels.get(&task_id) {
            if let Err(e) = sender.send(event) {
                tracing::debug!(
                    task_id = %task_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::broadcast::error::RecvError;

    #[test]
    fn test_wire_format() {
        let task_id = Uuid::nil();
        let event = WsEvent::TaskProgress {
            task_id,
            status: TaskStatus::Running,
            progress: 10,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "task:progress",
                "data": {"taskId": task_id, "status": "running", "progress": 10}
            })
        );

        let event = WsEvent::NovelUpdated { novel_id: task_id };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "novel:updated", "data": {"novelId": task_id}})
        );
    }

    #[tokio::test]
    async fn test_task_events_are_scoped() {
        let publisher = EventPublisher::new(16);
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut first = publisher.subscribe_task(watched);
        let mut second = publisher.subscribe_task(watched);
        let mut unrelated = publisher.subscribe_task(other);

        publisher.publish_chunk(watched, "天地");
        publisher.publish_failed(watched, "boom");

        for rx in [&mut first, &mut second] {
            assert_eq!(
                rx.recv().await.unwrap(),
                WsEvent::TaskChunk {
                    task_id: watched,
                    chunk: "天地".into()
                }
            );
            assert!(matches!(rx.recv().await.unwrap(), WsEvent::TaskFailed { .. }));
        }
        assert!(unrelated.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_task_ends_subscription_after_buffered_events() {
        let publisher = EventPublisher::new(16);
        let task_id = Uuid::new_v4();
        let mut rx = publisher.subscribe_task(task_id);

        publisher.publish_completed(task_id, json!({"type": "titles"}));
        publisher.close_task(task_id);

        assert!(matches!(rx.recv().await.unwrap(), WsEvent::TaskCompleted { .. }));
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
        assert_eq!(publisher.task_channel_count(), 0);
    }

    #[test]
    fn test_release_task_keeps_channel_with_live_receivers() {
        let publisher = EventPublisher::new(4);
        let task_id = Uuid::new_v4();
        let first = publisher.subscribe_task(task_id);
        let second = publisher.subscribe_task(task_id);

        drop(first);
        publisher.release_task(task_id);
        assert_eq!(publisher.task_channel_count(), 1);

        drop(second);
        publisher.release_task(task_id);
        assert_eq!(publisher.task_channel_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribed_events_are_dropped() {
        let publisher = EventPublisher::default();
        let task_id = Uuid::new_v4();
        publisher.publish_progress(task_id, TaskStatus::Running, 0);

        // 晚到的订阅者看不到之前的事件
        let mut rx = publisher.subscribe_task(task_id);
        assert!(rx.try_recv().is_err());

        let mut global = publisher.subscribe_global();
        publisher.publish_novel_updated(task_id);
        assert_eq!(
            global.recv().await.unwrap(),
            WsEvent::NovelUpdated { novel_id: task_id }
        );
    }
}
