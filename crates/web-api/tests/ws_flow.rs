mod support;

use std::time::Duration;

use domain::{RoomRepository, UserId};
use serde_json::json;
use tokio::time::sleep;
use uuid::Uuid;

use support::{connect_ws, identity, next_event, send_event, spawn_app};

/// 完整场景：u1 建群拉上 u2、u3，u2 的连接补订阅后收到 u1 的消息。
#[tokio::test]
async fn group_room_broadcast_flow() {
    let app = spawn_app().await;

    let u1 = identity("u1@example.com");
    let u2 = identity("u2@example.com");
    let u3 = UserId::new(Uuid::new_v4());

    // u1 通过 Authorization 头连接
    let token_a = app.token_for(&u1);
    let mut socket_a = connect_ws(app.addr, Some(&format!("Bearer {token_a}")), None).await;

    // u2 通过 ?token= 查询参数连接（浏览器客户端路径）
    let token_b = app.token_for(&u2);
    let mut socket_b = connect_ws(app.addr, None, Some(&token_b)).await;

    send_event(
        &mut socket_a,
        "create-room",
        json!({
            "name": "trio",
            "type": "group",
            "participants": [u2.id.0, u3.0],
        }),
    )
    .await;

    // 等房间在存储里可见
    let room = {
        let mut found = None;
        for _ in 0..50 {
            let rooms = app.room_store.list_by_participant(u2.id).await.unwrap();
            if let Some(room) = rooms.into_iter().next() {
                found = Some(room);
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }
        found.expect("room should be persisted")
    };
    assert_eq!(room.participants.len(), 3);
    assert_eq!(room.created_by, u1.id);

    // u2 的连接在房间创建之后补订阅
    send_event(&mut socket_b, "join-rooms", serde_json::Value::Null).await;
    // join-rooms 没有应答事件，用一次失败探测确认它已被处理
    send_event(&mut socket_b, "no-such-event", serde_json::Value::Null).await;
    let (event, _) = next_event(&mut socket_b).await.expect("probe frame");
    assert_eq!(event, "exception");

    send_event(
        &mut socket_a,
        "new-message",
        json!({ "roomId": room.id.0, "message": "hi" }),
    )
    .await;

    // 发布方自己的连接也在广播目标里
    let (event, data) = next_event(&mut socket_a).await.expect("sender frame");
    assert_eq!(event, "received-message");
    assert_eq!(data["message"], json!("hi"));

    let (event, data) = next_event(&mut socket_b).await.expect("member frame");
    assert_eq!(event, "received-message");
    assert_eq!(data["roomId"], json!(room.id.0));
    assert_eq!(data["message"], json!("hi"));

    let messages = app.message_store.all().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].created_by, u1.id);
    assert_eq!(messages[0].room_id, room.id);
}

/// 私聊房间的创建建立好友关系，重复创建不报错。
#[tokio::test]
async fn direct_room_establishes_friendship() {
    let app = spawn_app().await;

    let user = identity("direct@example.com");
    let friend = UserId::new(Uuid::new_v4());

    let token = app.token_for(&user);
    let mut socket = connect_ws(app.addr, Some(&format!("Bearer {token}")), None).await;

    for _ in 0..2 {
        send_event(
            &mut socket,
            "create-room",
            json!({ "type": "direct", "participants": [friend.0] }),
        )
        .await;
    }

    let mut friends = false;
    for _ in 0..50 {
        if app.friendship_store.are_friends(user.id, friend).await {
            friends = true;
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert!(friends, "friendship should be established");

    // 两次创建都成功：没有 exception 帧，存储里有两个房间
    send_event(&mut socket, "no-such-event", serde_json::Value::Null).await;
    let (event, data) = next_event(&mut socket).await.expect("probe frame");
    assert_eq!(event, "exception");
    assert!(data["message"].as_str().unwrap().contains("unknown event"));

    let rooms = app.room_store.list_by_participant(user.id).await.unwrap();
    assert_eq!(rooms.len(), 2);
    for room in rooms {
        assert_eq!(room.participants.len(), 2);
    }
}

/// 断开后的连接不再出现在任何房间的广播目标里。
#[tokio::test]
async fn disconnect_prunes_live_membership() {
    let app = spawn_app().await;

    let alice = identity("alice@example.com");
    let bob = identity("bob@example.com");

    let token_a = app.token_for(&alice);
    let mut socket_a = connect_ws(app.addr, Some(&format!("Bearer {token_a}")), None).await;

    send_event(
        &mut socket_a,
        "create-room",
        json!({ "name": "pair", "type": "group", "participants": [bob.id.0] }),
    )
    .await;

    let token_b = app.token_for(&bob);
    let mut socket_b = connect_ws(app.addr, Some(&format!("Bearer {token_b}")), None).await;
    send_event(&mut socket_b, "join-rooms", serde_json::Value::Null).await;

    let room = {
        let mut found = None;
        for _ in 0..50 {
            let rooms = app.room_store.list_by_participant(bob.id).await.unwrap();
            if let Some(room) = rooms.into_iter().next() {
                found = Some(room);
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }
        found.expect("room should be persisted")
    };

    // bob 主动断开
    drop(socket_b);
    sleep(Duration::from_millis(200)).await;

    send_event(
        &mut socket_a,
        "new-message",
        json!({ "roomId": room.id.0, "message": "still here?" }),
    )
    .await;

    // alice 自己收到广播，消息照常持久化
    let (event, data) = next_event(&mut socket_a).await.expect("sender frame");
    assert_eq!(event, "received-message");
    assert_eq!(data["message"], json!("still here?"));
    assert_eq!(app.message_store.all().await.len(), 1);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = spawn_app().await;
    let body = reqwest::get(format!("http://{}/health", app.addr))
        .await
        .expect("health request")
        .text()
        .await
        .expect("health body");
    assert_eq!(body, "ok");
}
