//! 在线状态协调
//!
//! 负责连接生命周期：握手认证、注册身份映射、触发房间订阅重建，
//! 以及断开时的清理。连接与断开本身不产生任何广播副作用，
//! 唯一的例外是认证失败时对该连接的错误回报与强制关闭。

use std::sync::Arc;

use domain::{ConnectionId, UserIdentity};
use tracing::{debug, info, warn};

use crate::auth::{Handshake, TokenVerifier};
use crate::error::ApplicationError;
use crate::membership::MembershipTable;
use crate::rooms::RoomSubscriptionManager;
use crate::transport::{events, ConnectionTransport, ErrorEnvelope};

pub struct PresenceCoordinator {
    verifier: Arc<dyn TokenVerifier>,
    table: Arc<MembershipTable>,
    rooms: Arc<RoomSubscriptionManager>,
    transport: Arc<dyn ConnectionTransport>,
}

impl PresenceCoordinator {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        table: Arc<MembershipTable>,
        rooms: Arc<RoomSubscriptionManager>,
        transport: Arc<dyn ConnectionTransport>,
    ) -> Self {
        Self {
            verifier,
            table,
            rooms,
            transport,
        }
    }

    /// 处理新连接：认证、注册、重建房间订阅。
    ///
    /// 任何一步失败都会回滚注册、向连接发送一条 `exception`
    /// 信封并强制关闭，保证不残留部分注册。
    pub async fn on_connect(
        &self,
        conn_id: &ConnectionId,
        handshake: &Handshake,
    ) -> Result<UserIdentity, ApplicationError> {
        match self.try_connect(conn_id, handshake).await {
            Ok(identity) => {
                info!(conn_id = %conn_id, user_id = %identity.id, "connected");
                Ok(identity)
            }
            Err(err) => {
                self.table.deregister(conn_id).await;
                warn!(conn_id = %conn_id, error = %err, "connection rejected");

                let envelope = ErrorEnvelope::from_error(&err);
                if let Err(send_err) = self
                    .transport
                    .send(conn_id, events::EXCEPTION, envelope.to_payload())
                    .await
                {
                    debug!(conn_id = %conn_id, error = %send_err, "could not deliver rejection");
                }
                self.transport.close(conn_id).await;
                Err(err)
            }
        }
    }

    async fn try_connect(
        &self,
        conn_id: &ConnectionId,
        handshake: &Handshake,
    ) -> Result<UserIdentity, ApplicationError> {
        let token = handshake.bearer_token()?;
        let identity = self.verifier.verify(token).await?;

        self.table.register(conn_id.clone(), identity.clone()).await;
        self.rooms.rejoin_all_rooms(conn_id).await?;

        Ok(identity)
    }

    /// 清理断开的连接。幂等，永不失败。
    pub async fn on_disconnect(&self, conn_id: &ConnectionId) {
        if self.table.deregister(conn_id).await {
            info!(conn_id = %conn_id, "disconnected");
        } else {
            debug!(conn_id = %conn_id, "disconnect for unknown connection ignored");
        }
    }
}
