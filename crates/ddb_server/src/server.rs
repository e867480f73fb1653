//! HTTP binding of the request handler.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{Request, RequestHandler, Response, JSON_CONTENT_TYPE};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use ddb_core::DocumentStore;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The HTTP server.
///
/// Every path is routed to one fallback that forwards the request to a
/// [`RequestHandler`] on a blocking thread, so the synchronous store never
/// stalls the runtime.
///
/// # Example
///
/// ```no_run
/// use ddb_server::{HttpServer, ServerConfig};
///
/// # async fn run() -> ddb_server::ServerResult<()> {
/// let server = HttpServer::new(ServerConfig::default())?;
/// server.start().await
/// # }
/// ```
pub struct HttpServer {
    config: ServerConfig,
    handler: Arc<RequestHandler>,
}

impl HttpServer {
    /// Opens the store named in `config.store` and creates a server for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = DocumentStore::open_with_config(config.store.clone())?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Creates a server over an already open store.
    pub fn with_store(config: ServerConfig, store: Arc<DocumentStore>) -> Self {
        let handler = Arc::new(RequestHandler::with_store(config.clone(), store));
        Self { config, handler }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the store served by this server.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.handler.context().store
    }

    /// Builds the router (also used by tests).
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(&self.handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .layer(TraceLayer::new_for_http())
    }

    /// Binds `config.bind_addr` and serves until the process ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the listener fails.
    pub async fn start(self) -> ServerResult<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Binds `config.bind_addr` and serves until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the listener fails.
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(%addr, path = %self.config.store.path.display(), "serving document store");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!(%addr, "server stopped");
        Ok(())
    }
}

async fn dispatch(
    State(handler): State<Arc<RequestHandler>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> axum::response::Response {
    let response = match body {
        Ok(body) => {
            let request = Request {
                method: method.as_str().to_string(),
                path: uri.path().to_string(),
                content_type: headers
                    .get(header::CONTENT_TYPE)
                    .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned()),
                body: body.to_vec(),
            };
            tokio::task::spawn_blocking(move || handler.handle(&request))
                .await
                .unwrap_or_else(|err| Response::from(&ServerError::Internal(err.to_string())))
        }
        Err(rejection) => {
            let limit = handler.context().config.max_body_size;
            Response::from(&body_error(&rejection, limit))
        }
    };

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], response.body).into_response()
}

/// Maps a body extraction failure onto the 400 error envelope.
fn body_error(rejection: &BytesRejection, limit: usize) -> ServerError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::BodyTooLarge { limit }
    } else {
        ServerError::BodyUnreadable(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_creation() {
        let store = Arc::new(DocumentStore::open_in_memory().unwrap());
        let server = HttpServer::with_store(ServerConfig::default(), Arc::clone(&store));
        assert_eq!(server.config().bind_addr.port(), 8080);
        assert!(Arc::ptr_eq(server.store(), &store));
    }

    #[test]
    fn router_builds() {
        let store = Arc::new(DocumentStore::open_in_memory().unwrap());
        let server = HttpServer::with_store(ServerConfig::default(), store);
        let _router = server.router();
    }
}
