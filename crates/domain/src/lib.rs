//! 聊天服务核心领域模型
//!
//! 包含连接、用户身份、房间、消息等实体，以及存储协作方契约。

pub mod errors;
pub mod identity;
pub mod message;
pub mod repository;
pub mod room;
pub mod value_objects;

// 重新导出常用类型
pub use errors::{DomainError, RepositoryError};
pub use identity::UserIdentity;
pub use message::Message;
pub use repository::{
    FriendshipRepository, MessageRepository, RepositoryResult, RoomRepository,
};
pub use room::{Room, RoomKind};
pub use value_objects::{ConnectionId, MessageId, MessageText, RoomId, Timestamp, UserId};
