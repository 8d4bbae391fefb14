//! 存储协作方契约
//!
//! 核心只依赖这些窄接口；Postgres 与内存实现都在 infrastructure。

use async_trait::async_trait;

use crate::errors::RepositoryError;
use crate::message::Message;
use crate::room::Room;
use crate::value_objects::{RoomId, UserId};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 持久化房间及其参与者集合。
    async fn create(&self, room: Room) -> RepositoryResult<Room>;
    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<Room>>;
    /// 列出某个用户作为参与者的所有房间。
    async fn list_by_participant(&self, user_id: UserId) -> RepositoryResult<Vec<Room>>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> RepositoryResult<Message>;
}

#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// 建立好友关系。重复建立是幂等的空操作。
    async fn add(&self, user_a: UserId, user_b: UserId) -> RepositoryResult<()>;
}
