//! Request handling for the document endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use ddb_codec::TokenTree;
use ddb_core::{DocumentStore, ID_FIELD};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// The only media type accepted in request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A request as seen by the handler, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method, e.g. `POST`.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl Request {
    /// Creates a request.
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            content_type: None,
            body: body.into(),
        }
    }

    /// Creates a `POST` request with a JSON content type.
    pub fn post(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new("POST", path, body).with_content_type(JSON_CONTENT_TYPE)
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A response produced by the handler. The body is always JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a `200 OK` response.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    fn json<T: Serialize>(value: &T) -> ServerResult<Self> {
        serde_json::to_vec(value)
            .map(Self::ok)
            .map_err(|err| ServerError::Internal(err.to_string()))
    }
}

impl From<&ServerError> for Response {
    fn from(err: &ServerError) -> Self {
        Self {
            status: err.status(),
            body: err.body(),
        }
    }
}

#[derive(Serialize)]
struct InsertedBody<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: u16,
    message: &'a str,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct CompactBody {
    passes: usize,
    bytes_before: u64,
    bytes_after: u64,
    reclaimed: u64,
    relocations: usize,
}

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The document store (shared across all handlers).
    pub store: Arc<DocumentStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<DocumentStore>) -> Self {
        Self { config, store }
    }
}

/// Handler for document requests.
///
/// The handler is synchronous; callers on an async runtime should run it on
/// a blocking thread.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Creates a handler over an open store.
    pub fn with_store(config: ServerConfig, store: Arc<DocumentStore>) -> Self {
        Self::new(Arc::new(HandlerContext::new(config, store)))
    }

    /// Returns the shared context.
    pub fn context(&self) -> &Arc<HandlerContext> {
        &self.context
    }

    /// Handles a request. Failures are turned into JSON error responses.
    pub fn handle(&self, request: &Request) -> Response {
        match self.dispatch(request) {
            Ok(response) => {
                debug!(method = %request.method, path = %request.path, status = response.status, "request handled");
                response
            }
            Err(err) => {
                if err.is_server_error() {
                    error!(path = %request.path, error = %err, "request failed");
                } else {
                    debug!(path = %request.path, error = %err, "request rejected");
                }
                Response::from(&err)
            }
        }
    }

    fn dispatch(&self, request: &Request) -> ServerResult<Response> {
        if request.method != "POST" {
            return Err(ServerError::MethodNotAllowed(request.method.clone()));
        }
        if let Some(content_type) = &request.content_type {
            if !is_json_media_type(content_type) {
                return Err(ServerError::UnsupportedMediaType(content_type.clone()));
            }
        }

        let body = request.body.as_slice();
        let tree = TokenTree::parse(body, self.context.store.config().max_tokens)
            .map_err(|_| ServerError::MalformedJson)?;
        if !tree.is_object() {
            return Err(ServerError::NotAnObject);
        }

        match request.path.as_str() {
            "/documents/insertOne" => self.insert_one(body, &tree),
            "/documents/findOne" => self.find_one(body, &tree),
            "/documents/deleteOne" => self.delete_one(body, &tree),
            "/test/reset" => {
                self.context.store.reset()?;
                Response::json(&MessageBody {
                    message: "Database reset",
                })
            }
            "/test/restart" => {
                self.context.store.resync()?;
                Response::json(&MessageBody {
                    message: "Database restarted",
                })
            }
            "/maintenance/compact" => self.compact(),
            other => Err(ServerError::UnknownPath(other.to_string())),
        }
    }

    fn insert_one(&self, body: &[u8], tree: &TokenTree) -> ServerResult<Response> {
        let id = self.context.store.insert(body, tree)?;
        Response::json(&InsertedBody {
            id: &id.to_string(),
        })
    }

    fn find_one(&self, body: &[u8], tree: &TokenTree) -> ServerResult<Response> {
        let id = requested_id(body, tree)?;
        let document = self.context.store.find(id)?;
        Ok(Response::ok(document))
    }

    fn delete_one(&self, body: &[u8], tree: &TokenTree) -> ServerResult<Response> {
        let id = requested_id(body, tree)?;
        self.context.store.delete(id)?;
        Response::json(&StatusBody {
            status: 200,
            message: "Document deleted",
        })
    }

    fn compact(&self) -> ServerResult<Response> {
        let stats = self.context.store.compact()?;
        Response::json(&CompactBody {
            passes: stats.passes,
            bytes_before: stats.bytes_before,
            bytes_after: stats.bytes_after,
            reclaimed: stats.reclaimed(),
            relocations: stats.relocations,
        })
    }
}

/// Extracts the string `_id` of the request object. An identifier that is
/// not valid UTF-8 can never match and is passed through as empty.
fn requested_id<'a>(body: &'a [u8], tree: &TokenTree) -> ServerResult<&'a str> {
    let raw = tree
        .root_string(body, ID_FIELD)
        .ok_or(ServerError::MissingId)?;
    Ok(std::str::from_utf8(raw).unwrap_or_default())
}

/// Accepts `application/json`, ignoring case and media type parameters
/// such as `charset`.
fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|media| media.eq_ignore_ascii_case(JSON_CONTENT_TYPE))
}
