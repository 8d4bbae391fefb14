//! 集成测试装配：内存存储 + 真实的 JWT 校验与 WebSocket 栈

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use application::{
    ChatGateway, GatewayServices, MembershipTable, MessageFanoutDispatcher, PresenceCoordinator,
    RoomSubscriptionManager, SystemClock, TokenVerifier,
};
use config::JwtConfig;
use domain::{UserId, UserIdentity};
use futures_util::{SinkExt, StreamExt};
use infrastructure::{
    ChannelTransport, JwtAuth, MemoryFriendshipRepository, MemoryMessageRepository,
    MemoryRoomRepository,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;
use web_api::{router, AppState};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestApp {
    pub addr: SocketAddr,
    pub jwt: Arc<JwtAuth>,
    pub room_store: Arc<MemoryRoomRepository>,
    pub message_store: Arc<MemoryMessageRepository>,
    pub friendship_store: Arc<MemoryFriendshipRepository>,
}

impl TestApp {
    pub fn token_for(&self, identity: &UserIdentity) -> String {
        self.jwt.issue_token(identity).expect("issue token")
    }
}

pub fn identity(email: &str) -> UserIdentity {
    UserIdentity::new(UserId::new(Uuid::new_v4()), email)
}

pub async fn spawn_app() -> TestApp {
    let jwt = Arc::new(JwtAuth::new(&JwtConfig {
        secret: "integration-test-secret-key-with-32-chars".to_string(),
        expiration_hours: 24,
    }));

    let room_store = Arc::new(MemoryRoomRepository::new());
    let message_store = Arc::new(MemoryMessageRepository::new());
    let friendship_store = Arc::new(MemoryFriendshipRepository::new());

    let transport = Arc::new(ChannelTransport::new());
    let table = Arc::new(MembershipTable::new());

    let rooms = Arc::new(RoomSubscriptionManager::new(
        room_store.clone(),
        friendship_store.clone(),
        table.clone(),
        transport.clone(),
    ));
    let verifier: Arc<dyn TokenVerifier> = jwt.clone();
    let presence = Arc::new(PresenceCoordinator::new(
        verifier,
        table.clone(),
        rooms.clone(),
        transport.clone(),
    ));
    let dispatcher = Arc::new(MessageFanoutDispatcher::new(
        room_store.clone(),
        message_store.clone(),
        table,
        transport.clone(),
        Arc::new(SystemClock),
    ));
    let gateway = Arc::new(ChatGateway::new(GatewayServices {
        presence,
        rooms,
        dispatcher,
        transport: transport.clone(),
    }));

    let state = AppState::new(gateway, transport);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        axum::serve(listener, router(state).into_make_service())
            .await
            .ok();
    });

    TestApp {
        addr,
        jwt,
        room_store,
        message_store,
        friendship_store,
    }
}

/// 建立一个 WebSocket 客户端连接；凭证放在头里或查询参数里
pub async fn connect_ws(
    addr: SocketAddr,
    authorization: Option<&str>,
    token_param: Option<&str>,
) -> WsClient {
    let url = match token_param {
        Some(token) => format!("ws://{addr}/ws?token={token}"),
        None => format!("ws://{addr}/ws"),
    };
    let mut request = url.into_client_request().expect("client request");
    if let Some(value) = authorization {
        request.headers_mut().insert(
            "authorization",
            HeaderValue::from_str(value).expect("header value"),
        );
    }
    let (socket, _) = connect_async(request).await.expect("websocket connect");
    socket
}

pub async fn send_event(socket: &mut WsClient, event: &str, data: serde_json::Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    socket
        .send(WsMessage::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// 读下一个事件帧；连接关闭或超时返回 None
pub async fn next_event(socket: &mut WsClient) -> Option<(String, serde_json::Value)> {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .ok()??
            .ok()?;
        match message {
            WsMessage::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).ok()?;
                let event = value["event"].as_str().unwrap_or_default().to_owned();
                return Some((event, value["data"].clone()));
            }
            WsMessage::Close(_) => return None,
            _ => continue,
        }
    }
}
