//! # DDB Server
//!
//! HTTP front end for the DDB document store.
//!
//! This crate provides:
//! - A transport-agnostic [`RequestHandler`] mapping a [`Request`] to a
//!   [`Response`]
//! - [`HttpServer`], which binds the handler with axum on a tokio runtime
//!
//! # Endpoints
//!
//! Every endpoint is `POST` with a JSON object body:
//!
//! | Path | Result |
//! |------|--------|
//! | `/documents/insertOne` | `{"_id":"<id>"}` |
//! | `/documents/findOne` | the stored document |
//! | `/documents/deleteOne` | `{"status":200,"message":"Document deleted"}` |
//! | `/test/reset` | wipes the store |
//! | `/test/restart` | recovers the identifier sequence from the file |
//! | `/maintenance/compact` | compaction statistics |
//!
//! # Example
//!
//! ```rust
//! use ddb_core::DocumentStore;
//! use ddb_server::{Request, RequestHandler, ServerConfig};
//! use std::sync::Arc;
//!
//! let store = Arc::new(DocumentStore::open_in_memory().unwrap());
//! let handler = RequestHandler::with_store(ServerConfig::default(), store);
//!
//! let response = handler.handle(&Request::post("/documents/insertOne", br#"{"a":1}"#));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, br#"{"_id":"000000000000000000000001"}"#);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, Request, RequestHandler, Response, JSON_CONTENT_TYPE};
pub use server::HttpServer;
