//! Error types for the HTTP server.

use ddb_core::CoreError;
use serde::Serialize;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request method is not `POST`.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The request carries a content type other than JSON.
    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),

    /// The body is not valid JSON or exceeds the token capacity.
    #[error("malformed JSON")]
    MalformedJson,

    /// The body is valid JSON but its root is not an object.
    #[error("top level element must be an object")]
    NotAnObject,

    /// A find or delete body has no string `_id`.
    #[error("missing _id")]
    MissingId,

    /// The rendered document would exceed the configured size.
    #[error("document too large: needs up to {needed} bytes, limit is {limit}")]
    DocumentTooLarge {
        /// Upper bound of the rendered size.
        needed: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The request body is longer than the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The request body could not be read.
    #[error("request body unreadable: {0}")]
    BodyUnreadable(String),

    /// No active document carries the requested identifier.
    #[error("no document found")]
    DocumentNotFound,

    /// The path is not one of the known endpoints.
    #[error("non-existing path: {0}")]
    UnknownPath(String),

    /// The store failed.
    #[error("store error: {0}")]
    Store(CoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => Self::DocumentNotFound,
            CoreError::TooLarge { needed, limit } => Self::DocumentTooLarge { needed, limit },
            CoreError::MalformedInput { .. } => Self::NotAnObject,
            CoreError::Codec(_) => Self::MalformedJson,
            other => Self::Store(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::MethodNotAllowed(_)
            | ServerError::DocumentNotFound
            | ServerError::UnknownPath(_) => 404,
            ServerError::UnsupportedMediaType(_) => 415,
            ServerError::MalformedJson
            | ServerError::NotAnObject
            | ServerError::MissingId
            | ServerError::DocumentTooLarge { .. }
            | ServerError::BodyTooLarge { .. }
            | ServerError::BodyUnreadable(_) => 400,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }

    /// Returns the JSON body sent to the client.
    pub fn body(&self) -> Vec<u8> {
        let message = match self {
            ServerError::MethodNotAllowed(_) => None,
            ServerError::UnsupportedMediaType(content_type) => Some(format!(
                "Only accepts content type application/json, not {content_type}"
            )),
            ServerError::MalformedJson => Some("Malformed JSON".to_string()),
            ServerError::NotAnObject => {
                Some("Malformed JSON. Top level element must be object".to_string())
            }
            ServerError::MissingId => Some("Missing string _id".to_string()),
            ServerError::DocumentTooLarge { limit, .. } => {
                Some(format!("Document exceeds the maximum size of {limit} bytes"))
            }
            ServerError::BodyTooLarge { limit } => Some(format!(
                "Request body exceeds the maximum size of {limit} bytes"
            )),
            ServerError::BodyUnreadable(_) => Some("Malformed JSON".to_string()),
            ServerError::DocumentNotFound => Some("No document found".to_string()),
            ServerError::UnknownPath(path) => Some(format!("Non-existing path: {path}")),
            other => Some(other.to_string()),
        };

        serde_json::to_vec(&ErrorBody {
            status: self.status(),
            message: message.as_deref(),
        })
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::MalformedJson.is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::MalformedJson.is_server_error());
        assert!(ServerError::from(CoreError::storage_corruption(3, "bad")).is_server_error());
    }

    #[test]
    fn core_errors_map_to_client_errors() {
        assert!(matches!(
            ServerError::from(CoreError::not_found("x")),
            ServerError::DocumentNotFound
        ));
        assert!(matches!(
            ServerError::from(CoreError::TooLarge {
                needed: 20,
                limit: 10
            }),
            ServerError::DocumentTooLarge { needed: 20, limit: 10 }
        ));
        assert!(matches!(
            ServerError::from(CoreError::Codec(ddb_codec::CodecError::Empty)),
            ServerError::MalformedJson
        ));
    }

    #[test]
    fn bodies_match_wire_format() {
        assert_eq!(
            ServerError::MethodNotAllowed("GET".into()).body(),
            br#"{"status":404}"#
        );
        assert_eq!(
            ServerError::MalformedJson.body(),
            br#"{"status":400,"message":"Malformed JSON"}"#
        );
        assert_eq!(
            ServerError::UnsupportedMediaType("text/plain".into()).body(),
            br#"{"status":415,"message":"Only accepts content type application/json, not text/plain"}"#
        );
        assert_eq!(
            ServerError::BodyTooLarge { limit: 16 }.body(),
            br#"{"status":400,"message":"Request body exceeds the maximum size of 16 bytes"}"#
        );
        assert_eq!(
            ServerError::UnknownPath("/nope".into()).body(),
            br#"{"status":404,"message":"Non-existing path: /nope"}"#
        );
    }

    #[test]
    fn body_escapes_message() {
        let body = ServerError::UnknownPath("/a\"b".into()).body();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Non-existing path: /a\"b");
    }
}
