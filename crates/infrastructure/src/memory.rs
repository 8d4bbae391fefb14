//! 内存存储实现（用于测试与无数据库的本地开发）

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use domain::{
    FriendshipRepository, Message, MessageRepository, RepositoryResult, Room, RoomId,
    RoomRepository, UserId,
};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryRoomRepository {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl MemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for MemoryRoomRepository {
    async fn create(&self, room: Room) -> RepositoryResult<Room> {
        self.rooms.write().await.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<Room>> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn list_by_participant(&self, user_id: UserId) -> RepositoryResult<Vec<Room>> {
        Ok(self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| room.is_participant(user_id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: Message) -> RepositoryResult<Message> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }
}

#[derive(Default)]
pub struct MemoryFriendshipRepository {
    pairs: RwLock<HashSet<(UserId, UserId)>>,
}

impl MemoryFriendshipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn are_friends(&self, user_a: UserId, user_b: UserId) -> bool {
        self.pairs.read().await.contains(&ordered(user_a, user_b))
    }
}

#[async_trait]
impl FriendshipRepository for MemoryFriendshipRepository {
    async fn add(&self, user_a: UserId, user_b: UserId) -> RepositoryResult<()> {
        self.pairs.write().await.insert(ordered(user_a, user_b));
        Ok(())
    }
}

fn ordered(user_a: UserId, user_b: UserId) -> (UserId, UserId) {
    if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    }
}
