//! Push channel message types.
//!
//! The push channel is a WebSocket carrying JSON text frames. Frames are not
//! tagged; two shapes are in use:
//!
//! ```json
//! {"depositID":"3a1d...","status":"APPROVED"}
//! {"id":"6f1c...","collateral":"14.5","bets":[ ... ]}
//! ```
//!
//! A frame with a `depositID` key is a [`DepositNotification`]; anything else
//! is treated as an (optionally partial) event payload.

use serde::{Deserialize, Serialize};

use super::catalog::EventPatch;
use super::payment::{DepositId, DepositStatus};

/// Verdict on a deposit, keyed by the identifier issued with the payment
/// intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositNotification {
    #[serde(rename = "depositID")]
    pub deposit_id: DepositId,
    pub status: DepositStatus,
}

/// A decoded push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Event(EventPatch),
    Deposit(DepositNotification),
}

/// Errors produced while decoding a push frame.
#[derive(Debug, thiserror::Error)]
pub enum PushDecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a json object, got {0}")]
    NotAnObject(&'static str),
}

impl PushMessage {
    /// Decode a single text frame.
    pub fn decode(frame: &str) -> Result<Self, PushDecodeError> {
        let value: serde_json::Value = serde_json::from_str(frame)?;
        let kind = match &value {
            serde_json::Value::Object(map) => {
                if map.contains_key("depositID") {
                    return Ok(PushMessage::Deposit(serde_json::from_value(value)?));
                }
                return Ok(PushMessage::Event(serde_json::from_value(value)?));
            }
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "bool",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
        };
        Err(PushDecodeError::NotAnObject(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_deposit_notification() {
        let msg = PushMessage::decode(r#"{"depositID":"d-9","status":"APPROVED"}"#).unwrap();
        assert_eq!(
            msg,
            PushMessage::Deposit(DepositNotification {
                deposit_id: DepositId::from("d-9"),
                status: DepositStatus::Approved,
            })
        );
    }

    #[test]
    fn test_decode_partial_event() {
        let msg = PushMessage::decode(r#"{"id":"e-1","collateral":"4.2"}"#).unwrap();
        let PushMessage::Event(patch) = msg else {
            panic!("expected an event payload");
        };
        assert_eq!(patch.id.as_deref(), Some("e-1"));
        assert!(patch.title.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            PushMessage::decode("not json"),
            Err(PushDecodeError::Json(_))
        ));
        assert!(matches!(
            PushMessage::decode("[1,2]"),
            Err(PushDecodeError::NotAnObject("array"))
        ));
        // A deposit frame with an unknown verdict is malformed, not an event.
        assert!(PushMessage::decode(r#"{"depositID":"d","status":"??"}"#).is_err());
    }
}
