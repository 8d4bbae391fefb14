//! 协作方的具体实现
//!
//! 核心只认 application / domain 里的窄接口；这里提供 JWT 校验、
//! PostgreSQL 存储、内存存储与进程内连接传输。

pub mod db;
pub mod jwt;
pub mod memory;
pub mod ws_transport;

pub use db::{create_pg_pool, PgFriendshipRepository, PgMessageRepository, PgRoomRepository};
pub use jwt::{Claims, JwtAuth, JwtError};
pub use memory::{MemoryFriendshipRepository, MemoryMessageRepository, MemoryRoomRepository};
pub use ws_transport::{ChannelTransport, SocketCommand};
