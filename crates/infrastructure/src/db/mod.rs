use sqlx::postgres::{PgPool, PgPoolOptions};

pub mod repositories;

pub use repositories::{PgFriendshipRepository, PgMessageRepository, PgRoomRepository};

/// 创建 PostgreSQL 连接池
pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}
