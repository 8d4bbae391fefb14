//! WebSocket 端点
//!
//! 升级请求携带 `Authorization: Bearer …`（浏览器客户端退回
//! `?token=`）。socket 任务先注册发送端再做连接认证，认证通过后
//! 把入站 `{event, data}` 帧交给事件网关，连接结束时做断开清理。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use application::{ConnectionTransport, Handshake};
use domain::ConnectionId;
use infrastructure::SocketCommand;

use crate::state::AppState;

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// 入站帧：`{"event": "...", "data": {...}}`
#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

pub async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Response {
    let handshake = Handshake {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned),
        token_param: query.token,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, handshake))
}

async fn handle_socket(socket: WebSocket, state: AppState, handshake: Handshake) {
    let conn_id = ConnectionId::generate();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SocketCommand>();

    // 先注册发送端：认证失败的 exception 帧也要有去处
    state.transport.register(conn_id.clone(), tx).await;

    let send_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                SocketCommand::Event { event, payload } => {
                    let frame = serde_json::json!({ "event": event, "data": payload });
                    if sink
                        .send(WsMessage::Text(frame.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                SocketCommand::Close => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                }
            }
        }
        debug!(conn_id = %send_conn_id, "send task finished");
    });

    // 认证与房间订阅重建必须在处理任何入站事件之前完成
    if state.gateway.on_connect(&conn_id, &handshake).await.is_err() {
        // 拒绝帧与关闭命令已入队，等发送任务把它们刷出去
        state.transport.unregister(&conn_id).await;
        let _ = send_task.await;
        return;
    }

    while let Some(message) = stream.next().await {
        match message {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<InboundFrame>(&text) {
                Ok(frame) => {
                    state
                        .gateway
                        .handle(&conn_id, &frame.event, frame.data)
                        .await;
                }
                Err(err) => {
                    warn!(conn_id = %conn_id, error = %err, "malformed inbound frame");
                    let payload = serde_json::json!({
                        "status": "error",
                        "message": format!("malformed frame: {err}"),
                    });
                    if state
                        .transport
                        .send(&conn_id, application::events::EXCEPTION, payload)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            },
            Ok(WsMessage::Close(_)) => {
                debug!(conn_id = %conn_id, "close frame received");
                break;
            }
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                // 底层 tungstenite 自动应答 ping
            }
            Ok(WsMessage::Binary(_)) => {
                debug!(conn_id = %conn_id, "binary frames are not supported");
            }
            Err(err) => {
                debug!(conn_id = %conn_id, error = %err, "socket read error");
                break;
            }
        }
    }

    state.gateway.on_disconnect(&conn_id).await;
    state.transport.unregister(&conn_id).await;
    let _ = send_task.await;
}
