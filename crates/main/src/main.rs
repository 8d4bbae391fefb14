//! 主应用程序入口
//!
//! 装配协调核心与各协作方实现，启动 Axum 服务。

use std::sync::Arc;

use application::{
    ChatGateway, GatewayServices, MembershipTable, MessageFanoutDispatcher, PresenceCoordinator,
    RoomSubscriptionManager, SystemClock, TokenVerifier,
};
use domain::{FriendshipRepository, MessageRepository, RoomRepository};
use infrastructure::{
    create_pg_pool, ChannelTransport, JwtAuth, PgFriendshipRepository, PgMessageRepository,
    PgRoomRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::AppConfig::from_env_with_defaults();
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "运行在开发配置上，生产环境请通过环境变量显式配置");
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 存储协作方
    let room_repository: Arc<dyn RoomRepository> =
        Arc::new(PgRoomRepository::new(pg_pool.clone()));
    let message_repository: Arc<dyn MessageRepository> =
        Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let friendship_repository: Arc<dyn FriendshipRepository> =
        Arc::new(PgFriendshipRepository::new(pg_pool));

    // 令牌校验与传输
    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtAuth::new(&config.jwt));
    let transport = Arc::new(ChannelTransport::new());
    let table = Arc::new(MembershipTable::new());

    // 协调核心
    let rooms = Arc::new(RoomSubscriptionManager::new(
        room_repository.clone(),
        friendship_repository,
        table.clone(),
        transport.clone(),
    ));
    let presence = Arc::new(PresenceCoordinator::new(
        verifier,
        table.clone(),
        rooms.clone(),
        transport.clone(),
    ));
    let dispatcher = Arc::new(MessageFanoutDispatcher::new(
        room_repository,
        message_repository,
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
    let app = router(state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("聊天服务器启动在 http://{bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
