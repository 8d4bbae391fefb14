//! 进程内连接传输
//!
//! 每个 WebSocket 连接对应一个无界 mpsc 发送端；`send` 把事件帧
//! 投递到该连接的发送任务，`close` 投递关闭命令。这里只做投递，
//! 真正的 socket 写发生在 web-api 的发送任务里。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::ConnectionId;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use application::{ConnectionTransport, TransportError};

/// 投递给连接发送任务的命令
#[derive(Debug)]
pub enum SocketCommand {
    Event {
        event: String,
        payload: serde_json::Value,
    },
    Close,
}

#[derive(Default)]
pub struct ChannelTransport {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<SocketCommand>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册连接的发送端。必须在连接认证之前完成，拒绝帧才有去处。
    pub async fn register(&self, conn_id: ConnectionId, sender: mpsc::UnboundedSender<SocketCommand>) {
        self.senders.write().await.insert(conn_id, sender);
    }

    /// 注销发送端，连接的发送任务随之结束。幂等。
    pub async fn unregister(&self, conn_id: &ConnectionId) {
        if self.senders.write().await.remove(conn_id).is_some() {
            debug!(conn_id = %conn_id, "transport sender unregistered");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.senders.read().await.len()
    }
}

#[async_trait]
impl ConnectionTransport for ChannelTransport {
    async fn send(
        &self,
        conn_id: &ConnectionId,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), TransportError> {
        let senders = self.senders.read().await;
        let sender = senders
            .get(conn_id)
            .ok_or_else(|| TransportError::UnknownConnection(conn_id.to_string()))?;
        sender
            .send(SocketCommand::Event {
                event: event.to_owned(),
                payload,
            })
            .map_err(|err| TransportError::SendFailed(err.to_string()))
    }

    async fn close(&self, conn_id: &ConnectionId) {
        let senders = self.senders.read().await;
        if let Some(sender) = senders.get(conn_id) {
            // 发送任务可能已经退出，此时关闭本来就已经发生
            let _ = sender.send(SocketCommand::Close);
        }
    }
}
