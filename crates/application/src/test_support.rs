//! 单元测试用的内存协作方实现

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use domain::{
    ConnectionId, FriendshipRepository, Message, MessageRepository, RepositoryError,
    RepositoryResult, Room, RoomId, RoomRepository, UserId, UserIdentity,
};
use tokio::sync::RwLock;

use crate::auth::TokenVerifier;
use crate::error::ApplicationError;
use crate::transport::{ConnectionTransport, TransportError};

pub struct StaticTokenVerifier {
    tokens: Mutex<HashMap<String, UserIdentity>>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, token: impl Into<String>, identity: UserIdentity) {
        self.tokens.lock().unwrap().insert(token.into(), identity);
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserIdentity, ApplicationError> {
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| ApplicationError::authentication("invalid or expired token"))
    }
}

#[derive(Debug, Clone)]
pub struct SentFrame {
    pub conn_id: ConnectionId,
    pub event: String,
    pub payload: serde_json::Value,
}

/// 记录所有出站帧与关闭调用的传输桩
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentFrame>>,
    closed: Mutex<Vec<ConnectionId>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<SentFrame> {
        self.sent.lock().unwrap().clone()
    }

    pub fn frames_for(&self, conn_id: &ConnectionId, event: &str) -> Vec<SentFrame> {
        self.frames()
            .into_iter()
            .filter(|frame| frame.conn_id == *conn_id && frame.event == event)
            .collect()
    }

    pub fn event_count(&self, event: &str) -> usize {
        self.frames()
            .iter()
            .filter(|frame| frame.event == event)
            .count()
    }

    pub fn was_closed(&self, conn_id: &ConnectionId) -> bool {
        self.closed.lock().unwrap().contains(conn_id)
    }
}

#[async_trait]
impl ConnectionTransport for RecordingTransport {
    async fn send(
        &self,
        conn_id: &ConnectionId,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(SentFrame {
            conn_id: conn_id.clone(),
            event: event.to_owned(),
            payload,
        });
        Ok(())
    }

    async fn close(&self, conn_id: &ConnectionId) {
        self.closed.lock().unwrap().push(conn_id.clone());
    }
}

#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
    pub fail_create: AtomicBool,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, room: Room) {
        self.rooms.write().await.insert(room.id, room);
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomStore {
    async fn create(&self, room: Room) -> RepositoryResult<Room> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("injected room failure"));
        }
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
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<Message>>,
    pub fail_create: AtomicBool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageStore {
    async fn create(&self, message: Message) -> RepositoryResult<Message> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("injected message failure"));
        }
        self.messages.write().await.push(message.clone());
        Ok(message)
    }
}

#[derive(Default)]
pub struct InMemoryFriendshipStore {
    pairs: RwLock<HashSet<(UserId, UserId)>>,
    pub add_calls: AtomicUsize,
}

impl InMemoryFriendshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pair_count(&self) -> usize {
        self.pairs.read().await.len()
    }
}

#[async_trait]
impl FriendshipRepository for InMemoryFriendshipStore {
    async fn add(&self, user_a: UserId, user_b: UserId) -> RepositoryResult<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let pair = if user_a <= user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };
        self.pairs.write().await.insert(pair);
        Ok(())
    }
}
