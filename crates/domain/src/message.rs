use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, MessageText, RoomId, Timestamp, UserId};

/// 聊天消息。创建后不可变，核心在分发后不再修改它。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub text: MessageText,
    pub created_by: UserId,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        room_id: RoomId,
        text: MessageText,
        created_by: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            text,
            created_by,
            created_at,
        }
    }
}
