//! 存储协作方的 PostgreSQL 实现
//!
//! 房间与参与者分两张表，在同一事务里写入；好友关系用
//! `ON CONFLICT DO NOTHING` 保证重复建立是幂等空操作。

use std::collections::BTreeSet;

use async_trait::async_trait;
use domain::{
    FriendshipRepository, Message, MessageRepository, RepositoryError, RepositoryResult, Room,
    RoomId, RoomKind, RoomRepository, UserId,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        other => RepositoryError::storage(other.to_string()),
    }
}

fn kind_to_str(kind: RoomKind) -> &'static str {
    match kind {
        RoomKind::Direct => "direct",
        RoomKind::Group => "group",
    }
}

fn kind_from_str(value: &str) -> RepositoryResult<RoomKind> {
    match value {
        "direct" => Ok(RoomKind::Direct),
        "group" => Ok(RoomKind::Group),
        other => Err(RepositoryError::storage(format!(
            "unknown room kind in storage: {other}"
        ))),
    }
}

/// 数据库房间行（参与者经 array_agg 聚合）
#[derive(Debug, FromRow)]
struct DbRoomRow {
    id: Uuid,
    name: Option<String>,
    kind: String,
    created_by: Uuid,
    updated_by: Uuid,
    participants: Vec<Uuid>,
}

impl DbRoomRow {
    fn into_room(self) -> RepositoryResult<Room> {
        let kind = kind_from_str(&self.kind)?;
        let participants: BTreeSet<UserId> =
            self.participants.into_iter().map(UserId::new).collect();
        Ok(Room {
            id: RoomId::new(self.id),
            name: self.name,
            kind,
            participants,
            created_by: UserId::new(self.created_by),
            updated_by: UserId::new(self.updated_by),
        })
    }
}

const SELECT_ROOM_BY_ID: &str = r#"
SELECT r.id, r.name, r.kind, r.created_by, r.updated_by,
       array_agg(p.user_id) AS participants
FROM rooms r
JOIN room_participants p ON p.room_id = r.id
WHERE r.id = $1
GROUP BY r.id, r.name, r.kind, r.created_by, r.updated_by
"#;

const SELECT_ROOMS_BY_PARTICIPANT: &str = r#"
SELECT r.id, r.name, r.kind, r.created_by, r.updated_by,
       array_agg(p.user_id) AS participants
FROM rooms r
JOIN room_participants p ON p.room_id = r.id
WHERE r.id IN (SELECT room_id FROM room_participants WHERE user_id = $1)
GROUP BY r.id, r.name, r.kind, r.created_by, r.updated_by
"#;

pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn create(&self, room: Room) -> RepositoryResult<Room> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            "INSERT INTO rooms (id, name, kind, created_by, updated_by) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(room.id))
        .bind(&room.name)
        .bind(kind_to_str(room.kind))
        .bind(Uuid::from(room.created_by))
        .bind(Uuid::from(room.updated_by))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for user_id in &room.participants {
            sqlx::query("INSERT INTO room_participants (room_id, user_id) VALUES ($1, $2)")
                .bind(Uuid::from(room.id))
                .bind(Uuid::from(*user_id))
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<Room>> {
        let row = sqlx::query_as::<_, DbRoomRow>(SELECT_ROOM_BY_ID)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.map(DbRoomRow::into_room).transpose()
    }

    async fn list_by_participant(&self, user_id: UserId) -> RepositoryResult<Vec<Room>> {
        let rows = sqlx::query_as::<_, DbRoomRow>(SELECT_ROOMS_BY_PARTICIPANT)
            .bind(Uuid::from(user_id))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.into_iter().map(DbRoomRow::into_room).collect()
    }
}

pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> RepositoryResult<Message> {
        sqlx::query(
            "INSERT INTO messages (id, room_id, text, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(message.text.as_str())
        .bind(Uuid::from(message.created_by))
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(message)
    }
}

pub struct PgFriendshipRepository {
    pool: PgPool,
}

impl PgFriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    async fn add(&self, user_a: UserId, user_b: UserId) -> RepositoryResult<()> {
        // 无序对归一化存储，(a,b) 与 (b,a) 是同一条关系
        let (first, second) = if Uuid::from(user_a) <= Uuid::from(user_b) {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };
        sqlx::query(
            "INSERT INTO friendships (user_a, user_b) VALUES ($1, $2) \
             ON CONFLICT (user_a, user_b) DO NOTHING",
        )
        .bind(Uuid::from(first))
        .bind(Uuid::from(second))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}
