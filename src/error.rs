use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of the `status` field that marks an error payload on the wire.
pub const ERROR_STATUS: &str = "error";

const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Normalized failure of a call to the FAQ backend.
///
/// The `Display` output is the diagnostic message shown to users; on the wire the error
/// is rendered as `{ "error": <message>, "status": "error" }`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (unreachable host, DNS, bad URL, timeout).
    #[error("{0}")]
    Transport(String),
    /// The backend answered outside the 2xx range.
    #[error("HTTP {status}: {status_text}")]
    Http { status: u16, status_text: String },
    /// A 2xx body that could not be decoded.
    #[error("{0}")]
    Decode(String),
    /// A 2xx body that flagged itself as an error payload.
    #[error("{0}")]
    Backend(String),
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Invalid(String),
}

/// Wire shape of an error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub error: String,
    pub status: String,
}

impl ApiError {
    /// Builds the error for a body that passed [`is_error_payload`].
    pub fn from_payload(body: &Value) -> Self {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(UNKNOWN_ERROR);
        ApiError::Backend(message.to_string())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.to_string(),
            status: ERROR_STATUS.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if message.is_empty() {
            ApiError::Transport(UNKNOWN_ERROR.to_string())
        } else {
            ApiError::Transport(message)
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_payload().serialize(serializer)
    }
}

/// Structural check on a raw JSON body: true when its `status` field is `"error"`.
///
/// Any success payload that sets `status` to `"error"` is classified as an error too.
pub fn is_error_payload(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some(ERROR_STATUS)
}
