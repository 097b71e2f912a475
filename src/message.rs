// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The envelope every component exchanges through the pipeline queues.

use serde::{Deserialize, Serialize};

/// Immutable message carried between pipeline components.
///
/// The body is opaque to the runtime. The timestamp records when the message
/// entered the system, in milliseconds since the Unix epoch. Within a queue the
/// message is serialised as JSON with the body base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingDataMessage {
    #[serde(with = "body_encoding")]
    body: Vec<u8>,
    timestamp: i64,
}

impl StreamingDataMessage {
    pub fn new(body: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            body: body.into(),
            timestamp,
        }
    }

    /// Create a message stamped with the current wall-clock time
    pub fn now(body: impl Into<Vec<u8>>) -> Self {
        Self::new(body, chrono::Utc::now().timestamp_millis())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

mod body_encoding {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_is_base64_in_json() {
        let message = StreamingDataMessage::new(b"hello".to_vec(), 42);
        let json = serde_json::to_string(&message).unwrap();

        assert_eq!(json, r#"{"body":"aGVsbG8=","timestamp":42}"#);
    }

    #[test]
    fn test_rejects_invalid_base64_body() {
        let result: Result<StreamingDataMessage, _> =
            serde_json::from_str(r#"{"body":"not base64!","timestamp":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_now_uses_current_time() {
        let before = chrono::Utc::now().timestamp_millis();
        let message = StreamingDataMessage::now("payload");
        let after = chrono::Utc::now().timestamp_millis();

        assert!(message.timestamp() >= before && message.timestamp() <= after);
        assert_eq!(message.body(), b"payload");
        assert!(!message.is_empty());
    }
}
