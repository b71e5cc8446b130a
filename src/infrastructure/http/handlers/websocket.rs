//! WebSocket Handler - 任务进度与小说变更通知
//!
//! 每个连接自动接收全局事件（novel:updated）；
//! 任务事件需要客户端发送 `{"event":"subscribe:task","data":"<taskId>"}` 显式订阅。

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::infrastructure::events::{EventPublisher, WsEvent};
use crate::infrastructure::http::state::AppState;

/// 单连接出站缓冲
const OUTBOUND_BUFFER: usize = 256;

/// 客户端消息
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "subscribe:task")]
    SubscribeTask(Uuid),
    #[serde(rename = "unsubscribe:task")]
    UnsubscribeTask(Uuid),
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let publisher = state.event_publisher.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, publisher))
}

/// 单个任务频道的订阅
///
/// 转发任务把事件写入连接的出站队列；频道关闭（任务结束）时自行退出
struct TaskSubscriptions {
    publisher: Arc<EventPublisher>,
    outbound: mpsc::Sender<WsEvent>,
    forwarders: HashMap<Uuid, JoinHandle<()>>,
}

impl TaskSubscriptions {
    fn new(publisher: Arc<EventPublisher>, outbound: mpsc::Sender<WsEvent>) -> Self {
        Self {
            publisher,
            outbound,
            forwarders: HashMap::new(),
        }
    }

    fn subscribe(&mut self, task_id: Uuid) {
        if self
            .forwarders
            .get(&task_id)
            .is_some_and(|handle| !handle.is_finished())
        {
            return;
        }

        let mut rx = self.publisher.subscribe_task(task_id);
        let outbound = self.outbound.clone();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if outbound.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(task_id = %task_id, skipped, "Task subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        self.forwarders.insert(task_id, handle);
        tracing::debug!(task_id = %task_id, "Task subscribed");
    }

    async fn unsubscribe(&mut self, task_id: Uuid) {
        if let Some(handle) = self.forwarders.remove(&task_id) {
            handle.abort();
            let _ = handle.await;
        }
        self.publisher.release_task(task_id);
        tracing::debug!(task_id = %task_id, "Task unsubscribed");
    }

    async fn clear(&mut self) {
        let task_ids: Vec<Uuid> = self.forwarders.keys().copied().collect();
        for task_id in task_ids {
            self.unsubscribe(task_id).await;
        }
    }
}

async fn handle_socket(socket: WebSocket, publisher: Arc<EventPublisher>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsEvent>(OUTBOUND_BUFFER);
    let mut global_rx = publisher.subscribe_global();

    tracing::info!("WebSocket connected");

    // 事件转发任务：全局事件 + 已订阅任务事件
    let forward_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                global = global_rx.recv() => match global {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Global subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                scoped = outbound_rx.recv() => match scoped {
                    Some(event) => event,
                    None => break,
                },
            };

            let msg = match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event");
                    continue;
                }
            };

            if let Err(e) = sender.send(msg).await {
                tracing::debug!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    let mut subscriptions = TaskSubscriptions::new(publisher, outbound_tx);

    // 接收客户端消息（订阅 / 心跳）
    let receive_loop = async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::SubscribeTask(task_id)) => subscriptions.subscribe(task_id),
                    Ok(ClientMessage::UnsubscribeTask(task_id)) => {
                        subscriptions.unsubscribe(task_id).await
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring unrecognized WebSocket message");
                    }
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "WebSocket error");
                    break;
                }
                // Ping 由 axum 自动响应
                _ => {}
            }
        }
    };

    let mut forward_task = forward_task;
    tokio::select! {
        _ = &mut forward_task => {}
        _ = receive_loop => {}
    }

    // 清理
    subscriptions.clear().await;
    forward_task.abort();
    tracing::info!("WebSocket disconnected");
}
