//! 房间订阅管理
//!
//! 负责房间创建策略校验、按持久化参与关系重建连接的房间订阅，
//! 以及定向的单房间加入。

use std::sync::Arc;

use domain::{
    ConnectionId, DomainError, FriendshipRepository, Room, RoomId, RoomKind, RoomRepository,
    UserId,
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApplicationError;
use crate::membership::MembershipTable;
use crate::transport::ConnectionTransport;

/// `create-room` 事件载荷
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub participants: Vec<UserId>,
}

/// `join-single-room` 事件载荷
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSingleRoomRequest {
    pub room_id: RoomId,
}

pub struct RoomSubscriptionManager {
    rooms: Arc<dyn RoomRepository>,
    friendships: Arc<dyn FriendshipRepository>,
    table: Arc<MembershipTable>,
    transport: Arc<dyn ConnectionTransport>,
}

impl RoomSubscriptionManager {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        friendships: Arc<dyn FriendshipRepository>,
        table: Arc<MembershipTable>,
        transport: Arc<dyn ConnectionTransport>,
    ) -> Self {
        Self {
            rooms,
            friendships,
            table,
            transport,
        }
    }

    /// 创建房间并把发起连接加入其在线集合，返回新房间的标识。
    ///
    /// 私聊房间要求 participants 恰好一个条目，并在创建者与对方之间
    /// 建立好友关系（重复建立是幂等空操作）。校验或持久化失败时不留
    /// 任何部分状态，连接保持打开。
    pub async fn create_room(
        &self,
        conn_id: &ConnectionId,
        request: CreateRoomRequest,
    ) -> Result<RoomId, ApplicationError> {
        let identity = self
            .table
            .identity_of(conn_id)
            .await
            .ok_or_else(|| ApplicationError::authentication("connection is not authenticated"))?;

        let room_id = RoomId::new(Uuid::new_v4());
        let (room, friend) = match request.kind {
            RoomKind::Direct => {
                let [other] = request.participants.as_slice() else {
                    return Err(DomainError::invalid_argument(
                        "participants",
                        "direct room requires exactly one participant",
                    )
                    .into());
                };
                let room = Room::direct(room_id, request.name, identity.id, *other)?;
                (room, Some(*other))
            }
            RoomKind::Group => {
                let room = Room::group(room_id, request.name, identity.id, request.participants)?;
                (room, None)
            }
        };

        // 好友关系先于房间落库：AddFriendship 幂等，失败时房间尚未
        // 存在，不会留下半个房间。
        if let Some(other) = friend {
            self.friendships.add(identity.id, other).await?;
        }

        let stored = self.rooms.create(room).await?;

        if self.table.join(conn_id, stored.id).await {
            self.transport.join_group(conn_id, stored.id).await;
        }

        info!(
            room_id = %stored.id,
            kind = ?stored.kind,
            created_by = %identity.id,
            "room created"
        );
        Ok(stored.id)
    }

    /// 按持久化参与关系把连接加入其用户的所有房间。
    ///
    /// 纯重建：不移除此前已加入的房间，可以安全地重复调用，
    /// 结果是此前集合的超集。返回本次涉及的房间数。
    pub async fn rejoin_all_rooms(&self, conn_id: &ConnectionId) -> Result<usize, ApplicationError> {
        let identity = self
            .table
            .identity_of(conn_id)
            .await
            .ok_or_else(|| ApplicationError::authentication("connection is not authenticated"))?;

        let rooms = self.rooms.list_by_participant(identity.id).await?;
        let count = rooms.len();
        for room in rooms {
            if self.table.join(conn_id, room.id).await {
                self.transport.join_group(conn_id, room.id).await;
            }
        }

        debug!(conn_id = %conn_id, user_id = %identity.id, rooms = count, "rooms rejoined");
        Ok(count)
    }

    /// 把连接加入单个房间的在线集合。
    ///
    /// 只确认房间存在，不复核调用方是否是持久化参与者：调用路径
    /// 都已通过连接认证，属于受信调用方。
    pub async fn join_single_room(
        &self,
        conn_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<(), ApplicationError> {
        self.rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| DomainError::not_found("room", room_id))?;

        if self.table.join(conn_id, room_id).await {
            self.transport.join_group(conn_id, room_id).await;
        }
        Ok(())
    }
}
