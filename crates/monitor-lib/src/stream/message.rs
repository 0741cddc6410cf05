//! Push-channel wire messages

use serde::Serialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::models::RawMetricSample;

/// Sent once after connecting to join the user's room
#[derive(Debug, Serialize)]
pub struct JoinMessage {
    pub event: &'static str,
    pub room_id: i64,
}

impl JoinMessage {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            event: "join",
            room_id: user_id,
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// One decoded push frame
#[derive(Debug)]
pub enum PushEvent {
    /// Live samples for the subscribed fleet
    ServerData(Vec<RawMetricSample>),
    /// Frame types the engine does not consume (acks, heartbeats)
    Ignored,
}

/// Decode one text frame.
///
/// `server_data` events must carry a `data` array; a missing or non-array
/// slot drops the whole event, no partial merge is attempted.
pub fn decode_frame(text: &str) -> Result<PushEvent, ParseError> {
    let value: Value = serde_json::from_str(text)?;

    match value.get("event").and_then(Value::as_str) {
        Some("server_data") => {
            let Some(entries) = value.get("data").and_then(Value::as_array) else {
                return Err(ParseError::MissingDataArray);
            };
            let samples = entries
                .iter()
                .map(|entry| serde_json::from_value::<RawMetricSample>(entry.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(PushEvent::ServerData(samples))
        }
        _ => Ok(PushEvent::Ignored),
    }
}
