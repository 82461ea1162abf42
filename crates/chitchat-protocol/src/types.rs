//! Wire types for the chat protocol.
//!
//! Everything here travels between browser and server. Inbound frames are
//! [`ClientFrame`]s; outbound frames are [`ServerEvent`]s. Both use
//! adjacently tagged JSON so the client can switch on a single `type`
//! field:
//!
//! ```text
//! → { "ack": 3, "event": { "type": "sendMessage", "data": "hi" } }
//! ← { "type": "message", "data": { "username": "Bob", "text": "hi", "createdAt": 1700000000000 } }
//! ← { "type": "ack", "data": { "id": 3 } }
//! ```

use serde::{Deserialize, Serialize};

/// Prefix of every shared-location URL.
pub const MAP_URL_BASE: &str = "https://www.google.com/maps?q=";

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One frame sent by a client.
///
/// `ack` is an optional correlation id. When present, the server answers
/// with exactly one [`ServerEvent::Ack`] carrying the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub event: ClientEvent,
}

/// The correlation part of a [`ClientFrame`].
///
/// Decodes from any frame whose `ack` is readable, even when its event
/// is not, so a malformed event can still be answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct FrameHeader {
    #[serde(default)]
    pub ack: Option<u64>,
}

/// The events a client may emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Enter a room under a display name.
    Join(JoinRequest),
    /// Post a text message to the sender's room.
    SendMessage(String),
    /// Share a position with the sender's room.
    SendLocation(Location),
}

/// Payload of [`ClientEvent::Join`].
///
/// Missing fields decode as empty strings so the router can reject them
/// with a validation error instead of the frame being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub room: String,
}

/// A geographic position as sent by the browser's geolocation API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Builds the map link for this position.
    ///
    /// Coordinates are printed the way a browser prints numbers: shortest
    /// round-trip digits, no fraction on whole numbers, `0` for negative
    /// zero, and exponent notation below `1e-6` or from `1e21` up.
    pub fn map_url(&self) -> String {
        format!(
            "{MAP_URL_BASE}{},{}",
            format_coordinate(self.lat),
            format_coordinate(self.lng)
        )
    }
}

fn format_coordinate(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e2".
    let scientific = format!("{:e}", value.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let len = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let point = exponent + 1;

    let body = if len <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - len) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", exponent.abs())
        } else {
            format!("{first}.{rest}e{sign}{}", exponent.abs())
        }
    };

    if value < 0.0 { format!("-{body}") } else { body }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Every frame the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A chat line, either from a user or a system notice.
    Message(ChatMessage),
    /// A shared location link.
    LocationMessage(LocationMessage),
    /// The current roster of a room.
    RoomData(RoomData),
    /// The reply to an inbound frame that carried an ack id.
    Ack(Ack),
}

/// Text envelope. `username` is absent for system notices
/// ("Welcome!", "Bob has left.").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl ChatMessage {
    /// A message authored by a user.
    pub fn from_user(
        username: impl Into<String>,
        text: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            username: Some(username.into()),
            text: text.into(),
            created_at,
        }
    }

    /// A notice generated by the server.
    pub fn system(text: impl Into<String>, created_at: u64) -> Self {
        Self {
            username: None,
            text: text.into(),
            created_at,
        }
    }

    /// Returns `true` for server-generated notices.
    pub fn is_system(&self) -> bool {
        self.username.is_none()
    }
}

/// Location envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMessage {
    pub username: String,
    pub url: String,
    pub created_at: u64,
}

/// Roster envelope: every member of `room`, in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomData {
    pub room: String,
    pub users: Vec<String>,
}

/// Acknowledgment of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AckError>,
}

impl Ack {
    pub fn ok(id: u64) -> Self {
        Self { id, error: None }
    }

    pub fn err(
        id: u64,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            error: Some(AckError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Why an inbound event was rejected.
///
/// `code` is stable and meant for programs; `message` is meant for people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckError {
    pub code: String,
    pub message: String,
}

// =========================================================================
// Tests
// =========================================================================
