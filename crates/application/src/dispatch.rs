//! 消息扇出分发
//!
//! 新消息先落库，再按成员表在持久化完成后的快照做尽力而为的
//! 广播。单个接收方写失败只记日志，不回报给发布者。

use std::sync::Arc;

use domain::{
    ConnectionId, DomainError, Message, MessageId, MessageRepository, MessageText, RoomId,
    RoomRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::membership::MembershipTable;
use crate::transport::{events, ConnectionTransport};

/// `new-message` 事件载荷
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub room_id: RoomId,
    pub message: String,
}

/// `received-message` 事件载荷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage<'a> {
    pub room_id: RoomId,
    pub message: &'a str,
}

pub struct MessageFanoutDispatcher {
    rooms: Arc<dyn RoomRepository>,
    messages: Arc<dyn MessageRepository>,
    table: Arc<MembershipTable>,
    transport: Arc<dyn ConnectionTransport>,
    clock: Arc<dyn Clock>,
}

impl MessageFanoutDispatcher {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        messages: Arc<dyn MessageRepository>,
        table: Arc<MembershipTable>,
        transport: Arc<dyn ConnectionTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            messages,
            table,
            transport,
            clock,
        }
    }

    /// 持久化一条新消息并广播给目标房间当前在线的全部连接
    /// （含发送方自身的连接）。
    ///
    /// 广播目标是持久化完成那一刻的成员快照；之后才加入的连接
    /// 不会追补收到这条消息。持久化失败时不发生任何广播。
    pub async fn publish(
        &self,
        conn_id: &ConnectionId,
        request: PublishRequest,
    ) -> Result<Message, ApplicationError> {
        let text = MessageText::new(request.message)?;

        let identity = self
            .table
            .identity_of(conn_id)
            .await
            .ok_or_else(|| ApplicationError::authentication("connection is not authenticated"))?;

        let room = self
            .rooms
            .find_by_id(request.room_id)
            .await?
            .ok_or_else(|| DomainError::not_found("room", request.room_id))?;

        let message = Message::new(
            MessageId::new(Uuid::new_v4()),
            room.id,
            text,
            identity.id,
            self.clock.now(),
        );
        let stored = self.messages.create(message).await?;

        let recipients = self.table.members_of(room.id).await;
        let payload = serde_json::to_value(ReceivedMessage {
            room_id: room.id,
            message: stored.text.as_str(),
        })
        .map_err(|err| DomainError::invalid_argument("message", err.to_string()))?;

        let mut delivered = 0usize;
        for recipient in &recipients {
            match self
                .transport
                .send(recipient, events::RECEIVED_MESSAGE, payload.clone())
                .await
            {
                Ok(()) => delivered += 1,
                Err(err) => {
                    // 尽力而为：接收方掉线或写失败都静默丢弃
                    warn!(
                        conn_id = %recipient,
                        room_id = %room.id,
                        error = %err,
                        "dropping undeliverable broadcast"
                    );
                }
            }
        }

        debug!(
            room_id = %room.id,
            message_id = %stored.id,
            recipients = recipients.len(),
            delivered,
            "message published"
        );
        Ok(stored)
    }
}
