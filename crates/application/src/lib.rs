//! 协调核心
//!
//! 连接级的在线状态与房间成员协调：把已认证的实时连接绑定到用户
//! 身份、维护房间到在线连接的成员表、把新消息扇出给房间内的所有
//! 连接，并在连接与成员关系变化时保持订阅状态一致。
//!
//! 凭证校验、持久化与具体传输都是注入的窄接口，见 [`auth`]、
//! [`domain::repository`] 与 [`transport`]。

pub mod auth;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod membership;
pub mod presence;
pub mod rooms;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;


pub use auth::{Handshake, TokenVerifier};
pub use clock::{Clock, SystemClock};
pub use dispatch::{MessageFanoutDispatcher, PublishRequest, ReceivedMessage};
pub use error::ApplicationError;
pub use gateway::{inbound, ChatGateway, GatewayServices};
pub use membership::MembershipTable;
pub use presence::PresenceCoordinator;
pub use rooms::{CreateRoomRequest, JoinSingleRoomRequest, RoomSubscriptionManager};
pub use transport::{events, ConnectionTransport, ErrorEnvelope, TransportError};
