mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value as JsonValue};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use common::{ensure_config, lazy_pool};
use school_backend::{app, middleware::auth::issue_token, models::user::Role, AppState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> String {
    ensure_config(None);
    let router = app(AppState::new(lazy_pool()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("ws://{}/ws/virtual-class", addr)
}

async fn next_event(client: &mut Client) -> JsonValue {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn connect(base: &str, role: Role) -> (Client, String) {
    let token = issue_token(Uuid::new_v4(), role).unwrap();
    let (mut client, _) = connect_async(format!("{}?token={}", base, token))
        .await
        .expect("upgrade");
    let hello = next_event(&mut client).await;
    assert_eq!(hello["event"], "connected");
    let socket_id = hello["data"]["socketId"].as_str().unwrap().to_string();
    (client, socket_id)
}

async fn send(client: &mut Client, event: &str, data: JsonValue) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame)).await.unwrap();
}

#[tokio::test]
async fn upgrade_without_token_is_unauthorized() {
    let base = spawn_server().await;
    match connect_async(base).await {
        Err(WsError::Http(resp)) => assert_eq!(resp.status(), 401),
        other => panic!("expected 401, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn peers_negotiate_through_the_relay() {
    let base = spawn_server().await;
    let (mut teacher, teacher_id) = connect(&base, Role::Teacher).await;
    let (mut student, student_id) = connect(&base, Role::Student).await;

    send(
        &mut teacher,
        "join-virtual-class",
        json!({ "classId": "class-42", "userId": "t1", "userType": "teacher" }),
    )
    .await;
    // Give the teacher's join a moment so it lands in the room first.
    tokio::time::sleep(Duration::from_millis(50)).await;
    send(
        &mut student,
        "join-virtual-class",
        json!({ "classId": "class-42", "userId": "s1", "userType": "student" }),
    )
    .await;

    let joined = next_event(&mut teacher).await;
    assert_eq!(joined["event"], "participant-joined");
    assert_eq!(joined["data"]["socketId"], student_id.as_str());
    assert_eq!(joined["data"]["userType"], "student");

    send(
        &mut teacher,
        "video-offer",
        json!({ "offer": { "type": "offer", "sdp": "v=0" }, "targetSocketId": student_id }),
    )
    .await;
    let offer = next_event(&mut student).await;
    assert_eq!(offer["event"], "video-offer");
    assert_eq!(offer["data"]["fromSocketId"], teacher_id.as_str());
    assert_eq!(offer["data"]["offer"]["sdp"], "v=0");

    send(
        &mut student,
        "video-answer",
        json!({ "answer": { "type": "answer" }, "targetSocketId": teacher_id }),
    )
    .await;
    let answer = next_event(&mut teacher).await;
    assert_eq!(answer["event"], "video-answer");
    assert_eq!(answer["data"]["fromSocketId"], student_id.as_str());

    send(&mut student, "chat-message", json!({ "message": "hello" })).await;
    assert_eq!(next_event(&mut teacher).await["data"]["message"], "hello");
    assert_eq!(next_event(&mut student).await["data"]["message"], "hello");

    student.send(Message::Text("{oops".into())).await.unwrap();
    assert_eq!(next_event(&mut student).await["event"], "error");

    student.close(None).await.unwrap();
    let left = next_event(&mut teacher).await;
    assert_eq!(left["event"], "participant-left");
    assert_eq!(left["data"]["socketId"], student_id.as_str());
    assert_eq!(left["data"]["userId"], "s1");
}
