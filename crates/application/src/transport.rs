//! 连接传输协作方契约
//!
//! 核心只通过这三个原语与具体传输打交道：单播、关闭、以及可选的
//! 传输层分组（支持原生按组广播的传输可借此做优化）。

use async_trait::async_trait;
use domain::{ConnectionId, RoomId};
use serde::Serialize;
use thiserror::Error;

use crate::error::ApplicationError;

/// 出站事件名
pub mod events {
    pub const RECEIVED_MESSAGE: &str = "received-message";
    pub const EXCEPTION: &str = "exception";
}

/// 统一的错误信封，所有回报给连接的错误都用这个形状。
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub status: &'static str,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn from_error(err: &ApplicationError) -> Self {
        Self {
            status: "error",
            message: err.client_message(),
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "status": self.status, "message": self.message })
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection not registered: {0}")]
    UnknownConnection(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait ConnectionTransport: Send + Sync {
    /// 向单个连接发送一个命名事件。
    async fn send(
        &self,
        conn_id: &ConnectionId,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), TransportError>;

    /// 强制关闭连接。对已关闭的连接是空操作。
    async fn close(&self, conn_id: &ConnectionId);

    /// 把连接加入传输层分组。不支持分组的传输实现为空操作，
    /// 成员表仍然是广播目标的唯一事实来源。
    async fn join_group(&self, _conn_id: &ConnectionId, _room_id: RoomId) {}
}
