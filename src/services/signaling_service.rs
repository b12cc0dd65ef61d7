//! In-memory relay for WebRTC negotiation between the sockets of a class.
//!
//! The hub only knows which sockets are connected and which room each one
//! joined. Offers, answers, ICE candidates and chat payloads are forwarded
//! without being inspected.

use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_JOIN: &str = "join-virtual-class";
pub const EVENT_PARTICIPANT_JOINED: &str = "participant-joined";
pub const EVENT_PARTICIPANT_LEFT: &str = "participant-left";
pub const EVENT_OFFER: &str = "video-offer";
pub const EVENT_ANSWER: &str = "video-answer";
pub const EVENT_ICE: &str = "ice-candidate";
pub const EVENT_CHAT: &str = "chat-message";
pub const EVENT_ERROR: &str = "error";

pub type SocketId = String;

/// Outbound text frames for one socket.
pub type Outbox = mpsc::UnboundedSender<String>;

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: JsonValue,
}

struct Peer {
    tx: Outbox,
    /// Authenticated account behind the socket.
    account: Uuid,
    room: Option<String>,
    /// `userId` as announced in `join-virtual-class`.
    user_id: Option<JsonValue>,
}

pub fn frame(event: &str, data: JsonValue) -> String {
    json!({ "event": event, "data": data }).to_string()
}

#[derive(Clone, Default)]
pub struct SignalingHub {
    peers: Arc<RwLock<HashMap<SocketId, Peer>>>,
}

impl SignalingHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a socket and tells it its id.
    pub async fn connect(&self, account: Uuid) -> (SocketId, mpsc::UnboundedReceiver<String>) {
        let socket_id = Uuid::new_v4().simple().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(frame(EVENT_CONNECTED, json!({ "socketId": socket_id })));
        self.peers.write().await.insert(
            socket_id.clone(),
            Peer {
                tx,
                account,
                room: None,
                user_id: None,
            },
        );
        tracing::info!(socket_id = %socket_id, user_id = %account, "relay socket connected");
        (socket_id, rx)
    }

    pub async fn connected(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Handles one inbound text frame. Malformed frames are answered with an
    /// `error` event; the socket stays open.
    pub async fn handle_text(&self, socket_id: &str, raw: &str) {
        let frame = match serde_json::from_str::<Frame>(raw) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(socket_id, error = %e, "malformed relay frame");
                self.reply_error(socket_id, "Frames must be {\"event\": string, \"data\": object}")
                    .await;
                return;
            }
        };

        let result = match frame.event.as_str() {
            EVENT_JOIN => self.join(socket_id, &frame.data).await,
            EVENT_OFFER => self.forward(socket_id, EVENT_OFFER, "offer", &frame.data).await,
            EVENT_ANSWER => self.forward(socket_id, EVENT_ANSWER, "answer", &frame.data).await,
            EVENT_ICE => self.forward(socket_id, EVENT_ICE, "candidate", &frame.data).await,
            EVENT_CHAT => self.chat(socket_id, frame.data).await,
            other => Err(format!("Unknown event: {}", other)),
        };
        if let Err(message) = result {
            self.reply_error(socket_id, &message).await;
        }
    }

    /// Drops the socket and tells the rest of its room.
    pub async fn disconnect(&self, socket_id: &str) {
        let removed = self.peers.write().await.remove(socket_id);
        let Some(peer) = removed else {
            return;
        };
        if let Some(room) = &peer.room {
            self.announce_left(socket_id, room, &peer).await;
        }
        tracing::info!(socket_id, user_id = %peer.account, room = ?peer.room, "relay socket disconnected");
    }

    async fn reply_error(&self, socket_id: &str, message: &str) {
        if let Some(peer) = self.peers.read().await.get(socket_id) {
            let _ = peer.tx.send(frame(EVENT_ERROR, json!({ "message": message })));
        }
    }

    async fn announce_left(&self, socket_id: &str, room: &str, peer: &Peer) {
        let user_id = peer
            .user_id
            .clone()
            .unwrap_or_else(|| JsonValue::String(peer.account.to_string()));
        let msg = frame(
            EVENT_PARTICIPANT_LEFT,
            json!({ "socketId": socket_id, "userId": user_id }),
        );
        self.send_room(room, Some(socket_id), &msg).await;
    }

    async fn send_room(&self, room: &str, except: Option<&str>, msg: &str) -> usize {
        let peers = self.peers.read().await;
        let mut sent = 0;
        for (id, peer) in peers.iter() {
            if peer.room.as_deref() != Some(room) || Some(id.as_str()) == except {
                continue;
            }
            if peer.tx.send(msg.to_string()).is_ok() {
                sent += 1;
            }
        }
        sent
    }

    async fn join(&self, socket_id: &str, data: &JsonValue) -> Result<(), String> {
        let room = match data.get("classId") {
            Some(JsonValue::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => return Err("join-virtual-class requires classId".into()),
        };
        let user_id = data.get("userId").cloned().filter(|v| !v.is_null());
        let user_type = data.get("userType").cloned().unwrap_or(JsonValue::Null);

        let previous = {
            let mut peers = self.peers.write().await;
            let Some(peer) = peers.get_mut(socket_id) else {
                return Ok(());
            };
            let previous = peer.room.replace(room.clone());
            let old_user = std::mem::replace(&mut peer.user_id, user_id.clone());
            previous
                .filter(|r| *r != room)
                .map(|r| (r, old_user, peer.account, peer.tx.clone()))
        };

        if let Some((old_room, old_user, account, tx)) = previous {
            let ghost = Peer {
                tx,
                account,
                room: None,
                user_id: old_user,
            };
            self.announce_left(socket_id, &old_room, &ghost).await;
        }

        let announced = user_id.unwrap_or(JsonValue::Null);
        let msg = frame(
            EVENT_PARTICIPANT_JOINED,
            json!({ "socketId": socket_id, "userId": announced, "userType": user_type }),
        );
        let notified = self.send_room(&room, Some(socket_id), &msg).await;
        tracing::info!(socket_id, class_id = %room, notified, "socket joined class room");
        Ok(())
    }

    /// Point-to-point forwarding for offers, answers and ICE candidates.
    async fn forward(
        &self,
        socket_id: &str,
        event: &str,
        payload_key: &str,
        data: &JsonValue,
    ) -> Result<(), String> {
        let Some(target) = data.get("targetSocketId").and_then(JsonValue::as_str) else {
            return Err(format!("{} requires targetSocketId", event));
        };

        let mut out = Map::new();
        out.insert(
            payload_key.to_string(),
            data.get(payload_key).cloned().unwrap_or(JsonValue::Null),
        );
        out.insert("fromSocketId".into(), JsonValue::String(socket_id.to_string()));

        let peers = self.peers.read().await;
        match peers.get(target) {
            Some(peer) => {
                let _ = peer.tx.send(frame(event, JsonValue::Object(out)));
            }
            None => tracing::debug!(socket_id, target, event, "relay target not connected"),
        }
        Ok(())
    }

    async fn chat(&self, socket_id: &str, data: JsonValue) -> Result<(), String> {
        let room = {
            let peers = self.peers.read().await;
            peers.get(socket_id).and_then(|p| p.room.clone())
        };
        let Some(room) = room else {
            return Err("Join a class before sending chat messages".into());
        };
        self.send_room(&room, None, &frame(EVENT_CHAT, data)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<JsonValue> {
        rx.try_recv()
            .ok()
            .map(|s| serde_json::from_str(&s).unwrap())
    }

    async fn connect(hub: &SignalingHub) -> (SocketId, mpsc::UnboundedReceiver<String>) {
        let (id, mut rx) = hub.connect(Uuid::new_v4()).await;
        let hello = next(&mut rx).unwrap();
        assert_eq!(hello["event"], EVENT_CONNECTED);
        assert_eq!(hello["data"]["socketId"], id.as_str());
        (id, rx)
    }

    async fn join(hub: &SignalingHub, id: &str, class: &str, user: &str, kind: &str) {
        let raw = json!({
            "event": EVENT_JOIN,
            "data": { "classId": class, "userId": user, "userType": kind }
        })
        .to_string();
        hub.handle_text(id, &raw).await;
    }

    #[tokio::test]
    async fn join_notifies_only_other_room_members() {
        let hub = SignalingHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        let (c, mut rx_c) = connect(&hub).await;

        join(&hub, &a, "class-1", "u1", "teacher").await;
        join(&hub, &c, "class-2", "u3", "student").await;
        join(&hub, &b, "class-1", "u2", "student").await;

        let msg = next(&mut rx_a).unwrap();
        assert_eq!(msg["event"], EVENT_PARTICIPANT_JOINED);
        assert_eq!(msg["data"]["socketId"], b.as_str());
        assert_eq!(msg["data"]["userId"], "u2");
        assert_eq!(msg["data"]["userType"], "student");

        assert!(next(&mut rx_b).is_none());
        assert!(next(&mut rx_c).is_none());
        let _ = c;
    }

    #[tokio::test]
    async fn offers_reach_only_the_target() {
        let hub = SignalingHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        let (c, mut rx_c) = connect(&hub).await;
        for (id, user) in [(&a, "u1"), (&b, "u2"), (&c, "u3")] {
            join(&hub, id, "class-1", user, "student").await;
        }
        while next(&mut rx_a).is_some() {}
        while next(&mut rx_b).is_some() {}
        while next(&mut rx_c).is_some() {}

        let raw = json!({
            "event": EVENT_OFFER,
            "data": { "offer": { "type": "offer", "sdp": "v=0" }, "targetSocketId": b }
        })
        .to_string();
        hub.handle_text(&a, &raw).await;

        let got = next(&mut rx_b).unwrap();
        assert_eq!(got["event"], EVENT_OFFER);
        assert_eq!(got["data"]["offer"]["sdp"], "v=0");
        assert_eq!(got["data"]["fromSocketId"], a.as_str());
        assert!(got["data"].get("targetSocketId").is_none());
        assert!(next(&mut rx_a).is_none());
        assert!(next(&mut rx_c).is_none());
    }

    #[tokio::test]
    async fn unknown_target_is_dropped_silently() {
        let hub = SignalingHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let raw = json!({
            "event": EVENT_ICE,
            "data": { "candidate": {}, "targetSocketId": "nobody" }
        })
        .to_string();
        hub.handle_text(&a, &raw).await;
        assert!(next(&mut rx_a).is_none());
    }

    #[tokio::test]
    async fn chat_reaches_whole_room_including_sender() {
        let hub = SignalingHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        join(&hub, &a, "class-1", "u1", "teacher").await;
        join(&hub, &b, "class-1", "u2", "student").await;
        while next(&mut rx_a).is_some() {}

        let raw = json!({ "event": EVENT_CHAT, "data": { "message": "hi", "userName": "Ann" } })
            .to_string();
        hub.handle_text(&b, &raw).await;

        for rx in [&mut rx_a, &mut rx_b] {
            let got = next(rx).unwrap();
            assert_eq!(got["event"], EVENT_CHAT);
            assert_eq!(got["data"], json!({ "message": "hi", "userName": "Ann" }));
        }
    }

    #[tokio::test]
    async fn disconnect_announces_departure() {
        let hub = SignalingHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, _rx_b) = connect(&hub).await;
        join(&hub, &a, "class-1", "u1", "teacher").await;
        join(&hub, &b, "class-1", "u2", "student").await;
        while next(&mut rx_a).is_some() {}

        hub.disconnect(&b).await;
        let got = next(&mut rx_a).unwrap();
        assert_eq!(got["event"], EVENT_PARTICIPANT_LEFT);
        assert_eq!(got["data"]["socketId"], b.as_str());
        assert_eq!(got["data"]["userId"], "u2");
        assert_eq!(hub.connected().await, 1);

        hub.disconnect(&b).await;
        assert!(next(&mut rx_a).is_none());
    }

    #[tokio::test]
    async fn switching_rooms_leaves_the_old_one() {
        let hub = SignalingHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, _rx_b) = connect(&hub).await;
        join(&hub, &a, "class-1", "u1", "teacher").await;
        join(&hub, &b, "class-1", "u2", "student").await;
        while next(&mut rx_a).is_some() {}

        join(&hub, &b, "class-2", "u2", "student").await;
        let got = next(&mut rx_a).unwrap();
        assert_eq!(got["event"], EVENT_PARTICIPANT_LEFT);
        assert_eq!(got["data"]["socketId"], b.as_str());
    }

    #[tokio::test]
    async fn malformed_frames_get_an_error_reply() {
        let hub = SignalingHub::new();
        let (a, mut rx_a) = connect(&hub).await;

        for raw in [
            "not json".to_string(),
            json!({ "event": "dance", "data": {} }).to_string(),
            json!({ "event": EVENT_OFFER, "data": { "offer": {} } }).to_string(),
            json!({ "event": EVENT_JOIN, "data": {} }).to_string(),
            json!({ "event": EVENT_CHAT, "data": { "message": "early" } }).to_string(),
        ] {
            hub.handle_text(&a, &raw).await;
            let got = next(&mut rx_a).unwrap();
            assert_eq!(got["event"], EVENT_ERROR, "frame {}", raw);
            assert!(got["data"]["message"].is_string());
        }
        assert_eq!(hub.connected().await, 1);
    }
}
