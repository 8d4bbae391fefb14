//! 连接成员表
//!
//! 进程内唯一的共享可变状态：连接到用户身份的映射，以及房间到
//! 在线连接集合的映射。两个方向的映射放在同一把锁后面，任何读者
//! 都不会观察到"连接在房间集合里却解析不出身份"的撕裂状态。
//!
//! 锁只为最终的内存变更而持有，绝不跨越 await 点；所有读操作
//! 返回快照拷贝而不是活视图。

use std::collections::{HashMap, HashSet};

use domain::{ConnectionId, RoomId, UserIdentity};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    identities: HashMap<ConnectionId, UserIdentity>,
    conn_rooms: HashMap<ConnectionId, HashSet<RoomId>>,
    room_conns: HashMap<RoomId, HashSet<ConnectionId>>,
}

#[derive(Default)]
pub struct MembershipTable {
    inner: RwLock<Inner>,
}

impl MembershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定连接与用户身份。同一连接重复注册会覆盖旧身份。
    pub async fn register(&self, conn_id: ConnectionId, identity: UserIdentity) {
        let mut inner = self.inner.write().await;
        debug!(conn_id = %conn_id, user_id = %identity.id, "connection registered");
        inner.conn_rooms.entry(conn_id.clone()).or_default();
        inner.identities.insert(conn_id, identity);
    }

    /// 把连接从身份映射和所有房间集合里原子地移除。
    ///
    /// 幂等：对未注册的连接返回 `false`，不产生任何副作用。
    pub async fn deregister(&self, conn_id: &ConnectionId) -> bool {
        let mut inner = self.inner.write().await;
        if inner.identities.remove(conn_id).is_none() {
            return false;
        }
        if let Some(rooms) = inner.conn_rooms.remove(conn_id) {
            for room_id in rooms {
                if let Some(conns) = inner.room_conns.get_mut(&room_id) {
                    conns.remove(conn_id);
                    if conns.is_empty() {
                        inner.room_conns.remove(&room_id);
                    }
                }
            }
        }
        debug!(conn_id = %conn_id, "connection deregistered");
        true
    }

    /// 把连接加入一个房间的在线集合。
    ///
    /// 只有已注册的连接才能加入；对已断开的连接返回 `false`，
    /// 调用方把它当作迟到的副作用静默放弃。重复加入是空操作。
    pub async fn join(&self, conn_id: &ConnectionId, room_id: RoomId) -> bool {
        let mut inner = self.inner.write().await;
        if !inner.identities.contains_key(conn_id) {
            return false;
        }
        inner
            .conn_rooms
            .entry(conn_id.clone())
            .or_default()
            .insert(room_id);
        inner
            .room_conns
            .entry(room_id)
            .or_default()
            .insert(conn_id.clone());
        true
    }

    /// 房间当前在线连接的快照。
    pub async fn members_of(&self, room_id: RoomId) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner
            .room_conns
            .get(&room_id)
            .map(|conns| conns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 连接当前已加入房间的快照。
    pub async fn rooms_of(&self, conn_id: &ConnectionId) -> Vec<RoomId> {
        let inner = self.inner.read().await;
        inner
            .conn_rooms
            .get(conn_id)
            .map(|rooms| rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn identity_of(&self, conn_id: &ConnectionId) -> Option<UserIdentity> {
        let inner = self.inner.read().await;
        inner.identities.get(conn_id).cloned()
    }

    pub async fn connection_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.identities.len()
    }
}
