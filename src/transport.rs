//! Transport adapter
//!
//! The relay is a dumb broadcast channel: whatever one peer sends to
//! a room, the other peer receives verbatim, with no ordering or
//! delivery guarantee beyond the underlying socket. This module pins
//! down the message contract and the thin send-side trait the engine
//! uses; receiving is a plain channel of decoded [`WireMessage`]s.

use crate::action::ActionRecord;
use crate::errors::TransportError;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Messages relayed verbatim room-wide by the broker
///
/// The `type` tag carries the relay's message name, so two peers of
/// this crate interoperate with the original wire vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// One live action from the peer, tagged with its sequence counter
    #[serde(rename = "pushAction", rename_all = "camelCase")]
    PushAction {
        room_id: String,
        counter: u64,
        #[serde(flatten)]
        record: ActionRecord,
    },

    /// Request for catch-up data; `counter` is how far the requester
    /// has already applied the peer's stream
    #[serde(rename = "resyncActions", rename_all = "camelCase")]
    ResyncActions { room_id: String, counter: u64 },

    /// Catch-up payload: the sender's complete own-side action log
    #[serde(rename = "catchUpActions", rename_all = "camelCase")]
    CatchUpActions {
        room_id: String,
        action_data: Vec<ActionRecord>,
    },

    /// Catch-up payload: a full snapshot instead of the action list
    #[serde(rename = "syncWithSnapshot", rename_all = "camelCase")]
    SyncWithSnapshot { room_id: String, snapshot: Box<Snapshot> },

    /// Periodic counter broadcast for divergence detection
    #[serde(rename = "syncCheck", rename_all = "camelCase")]
    SyncCheck { room_id: String, counter: u64 },

    /// Round-trip probe; `timestamp` is an opaque correlation stamp
    #[serde(rename = "heartbeat")]
    Heartbeat { timestamp: u64 },

    /// Echo of a received heartbeat
    #[serde(rename = "heartbeatResponse")]
    HeartbeatResponse { timestamp: u64 },

    /// Session lifecycle: join (fresh or reconnection)
    #[serde(rename = "joinGame", rename_all = "camelCase")]
    JoinGame {
        room_id: String,
        is_reconnection: bool,
    },

    /// Session lifecycle: leave the room
    #[serde(rename = "leaveRoom", rename_all = "camelCase")]
    LeaveRoom { room_id: String },

    /// Session lifecycle: the peer came back
    #[serde(rename = "userReconnected", rename_all = "camelCase")]
    UserReconnected { room_id: String },

    /// Session lifecycle: the peer dropped
    #[serde(rename = "userDisconnected", rename_all = "camelCase")]
    UserDisconnected { room_id: String },
}

/// Send side of the relay channel
///
/// The engine owns exactly one `Transport`; everything it emits goes
/// through here. Inbound messages arrive on a separate mpsc receiver
/// wired by the embedding client.
pub trait Transport: Send {
    fn send(&self, message: WireMessage) -> Result<(), TransportError>;
}

/// In-process loopback transport
///
/// Connects two engines directly: everything endpoint A sends lands
/// in endpoint B's inbox and vice versa. Used by tests and local
/// two-client demos; a production client implements [`Transport`]
/// over its socket instead.
#[derive(Clone)]
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<WireMessage>,
}

impl ChannelTransport {
    /// Build a connected pair: `(endpoint, inbox)` for each peer.
    pub fn pair() -> (
        (ChannelTransport, mpsc::UnboundedReceiver<WireMessage>),
        (ChannelTransport, mpsc::UnboundedReceiver<WireMessage>),
    ) {
        let (a_to_b, b_inbox) = mpsc::unbounded_channel();
        let (b_to_a, a_inbox) = mpsc::unbounded_channel();
        (
            (ChannelTransport { outbound: a_to_b }, a_inbox),
            (ChannelTransport { outbound: b_to_a }, b_inbox),
        )
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: WireMessage) -> Result<(), TransportError> {
        self.outbound
            .send(message)
            .map_err(|_| TransportError::ChannelClosed {
                context: "loopback peer inbox dropped",
            })
    }
}

/// Transport that drops everything; placeholder for a detached engine.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _message: WireMessage) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, ActionParam, ActionRecord, Side};

    #[test]
    fn push_action_wire_shape() {
        let message = WireMessage::PushAction {
            room_id: "room-1".into(),
            counter: 7,
            record: ActionRecord::new(
                Side::Own,
                ActionKind::Game("drawCard".into()),
                vec![ActionParam::Side(Side::Own), ActionParam::Number(1.0)],
            ),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "pushAction");
        assert_eq!(json["roomId"], "room-1");
        assert_eq!(json["counter"], 7);
        assert_eq!(json["action"], "drawCard");
        assert_eq!(json["user"], "self");
    }

    #[test]
    fn wire_round_trip() {
        let message = WireMessage::SyncCheck {
            room_id: "room-9".into(),
            counter: 42,
        };
        let encoded = serde_json::to_string(&message).unwrap();
        let decoded: WireMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn loopback_pair_crosses_over() {
        let ((a, _a_inbox), (_b, mut b_inbox)) = ChannelTransport::pair();
        a.send(WireMessage::Heartbeat { timestamp: 123 }).unwrap();
        assert_eq!(
            b_inbox.try_recv().unwrap(),
            WireMessage::Heartbeat { timestamp: 123 }
        );
    }
}
