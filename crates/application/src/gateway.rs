//! 入站事件网关
//!
//! 显式的按事件名注册的处理器表，由传输层在收到帧时调用。
//! 处理器返回 Result；唯一的顶层应答器把错误转成统一的
//! `exception` 信封回给连接，只有认证错误会关闭连接。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use domain::{ConnectionId, DomainError, UserIdentity};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::Handshake;
use crate::dispatch::{MessageFanoutDispatcher, PublishRequest};
use crate::error::ApplicationError;
use crate::presence::PresenceCoordinator;
use crate::rooms::{CreateRoomRequest, JoinSingleRoomRequest, RoomSubscriptionManager};
use crate::transport::{events, ConnectionTransport, ErrorEnvelope};

/// 入站事件名
pub mod inbound {
    pub const JOIN_ROOMS: &str = "join-rooms";
    pub const CREATE_ROOM: &str = "create-room";
    pub const NEW_MESSAGE: &str = "new-message";
    pub const JOIN_SINGLE_ROOM: &str = "join-single-room";
}

/// 网关处理器可触达的服务集合
pub struct GatewayServices {
    pub presence: Arc<PresenceCoordinator>,
    pub rooms: Arc<RoomSubscriptionManager>,
    pub dispatcher: Arc<MessageFanoutDispatcher>,
    pub transport: Arc<dyn ConnectionTransport>,
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), ApplicationError>> + Send>>;
type EventHandler =
    Box<dyn Fn(Arc<GatewayServices>, ConnectionId, serde_json::Value) -> HandlerFuture + Send + Sync>;

pub struct ChatGateway {
    services: Arc<GatewayServices>,
    handlers: HashMap<&'static str, EventHandler>,
}

impl ChatGateway {
    pub fn new(services: GatewayServices) -> Self {
        let mut gateway = Self {
            services: Arc::new(services),
            handlers: HashMap::new(),
        };

        gateway.register(inbound::JOIN_ROOMS, |services, conn_id, _payload| async move {
            services.rooms.rejoin_all_rooms(&conn_id).await?;
            Ok(())
        });

        gateway.register(inbound::CREATE_ROOM, |services, conn_id, payload| async move {
            let request: CreateRoomRequest = parse_payload(payload)?;
            services.rooms.create_room(&conn_id, request).await?;
            Ok(())
        });

        gateway.register(inbound::NEW_MESSAGE, |services, conn_id, payload| async move {
            let request: PublishRequest = parse_payload(payload)?;
            services.dispatcher.publish(&conn_id, request).await?;
            Ok(())
        });

        gateway.register(
            inbound::JOIN_SINGLE_ROOM,
            |services, conn_id, payload| async move {
                let request: JoinSingleRoomRequest = parse_payload(payload)?;
                services
                    .rooms
                    .join_single_room(&conn_id, request.room_id)
                    .await
            },
        );

        gateway
    }

    fn register<F, Fut>(&mut self, event: &'static str, handler: F)
    where
        F: Fn(Arc<GatewayServices>, ConnectionId, serde_json::Value) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<(), ApplicationError>> + Send + 'static,
    {
        let handler: EventHandler = Box::new(move |services, conn_id, payload| {
            Box::pin(handler(services, conn_id, payload))
        });
        self.handlers.insert(event, handler);
    }

    /// 连接建立。失败时在线状态协调器已经完成回报与关闭。
    pub async fn on_connect(
        &self,
        conn_id: &ConnectionId,
        handshake: &Handshake,
    ) -> Result<UserIdentity, ApplicationError> {
        self.services.presence.on_connect(conn_id, handshake).await
    }

    pub async fn on_disconnect(&self, conn_id: &ConnectionId) {
        self.services.presence.on_disconnect(conn_id).await;
    }

    /// 顶层应答器：分发事件，把错误转成信封回报给连接。
    pub async fn handle(&self, conn_id: &ConnectionId, event: &str, payload: serde_json::Value) {
        if let Err(err) = self.dispatch(conn_id, event, payload).await {
            warn!(conn_id = %conn_id, event, error = %err, "event handling failed");

            let envelope = ErrorEnvelope::from_error(&err);
            if let Err(send_err) = self
                .services
                .transport
                .send(conn_id, events::EXCEPTION, envelope.to_payload())
                .await
            {
                debug!(conn_id = %conn_id, error = %send_err, "could not deliver exception");
            }
            if err.is_fatal() {
                self.services.transport.close(conn_id).await;
            }
        }
    }

    async fn dispatch(
        &self,
        conn_id: &ConnectionId,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), ApplicationError> {
        let handler = self.handlers.get(event).ok_or_else(|| {
            DomainError::invalid_argument("event", format!("unknown event \"{event}\""))
        })?;
        handler(self.services.clone(), conn_id.clone(), payload).await
    }
}

fn parse_payload<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T, ApplicationError> {
    serde_json::from_value(payload)
        .map_err(|err| DomainError::invalid_argument("payload", err.to_string()).into())
}
