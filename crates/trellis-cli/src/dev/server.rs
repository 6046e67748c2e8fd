//! Development server with live reload via Server-Sent Events.
//!
//! Serves the in-memory build output and pushes reload events to
//! connected clients after each rebuild.

use crate::dev::SharedState;
use crate::error::{CliError, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response, Sse},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

/// Development server.
pub struct DevServer {
    addr: SocketAddr,
    state: SharedState,
}

impl DevServer {
    pub fn new(addr: SocketAddr, state: SharedState) -> Self {
        Self { addr, state }
    }

    /// Run the server until `shutdown` resolves.
    ///
    /// The returned future resolves only after the listener has been
    /// closed and in-flight connections drained, so awaiting it is the
    /// "server closed" signal: no request is served after it resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the configured
    /// address.
    pub async fn start(self, shutdown: tokio::sync::oneshot::Receiver<()>) -> Result<()> {
        let addr = self.addr;
        let app = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        crate::ui::success(&format!("Development server running at http://{}", addr));

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown.await;
            })
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Build the axum router with all routes.
    fn build_router(self) -> Router {
        Router::new()
            // SSE endpoint for reload events
            .route("/__trellis_sse__", get(handle_sse))
            // All other routes serve build output from memory
            .fallback(handle_request)
            .layer(
                // Allow all origins in dev
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state)
    }
}

/// Handle SSE connections for reload events.
async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<
    impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::Event;

    let (id, rx) = state.register_client();
    tracing::debug!(client = id, "SSE client connected");

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}

/// Serve build output from the in-memory cache.
///
/// `/` and unknown extension-less paths fall back to the index document
/// so client-side routes deep-link correctly.
async fn handle_request(State(state): State<SharedState>, uri: Uri) -> Response {
    let path = uri.path();

    if let Some(error) = state.get_status().error() {
        return plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Build failed:\n\n{}", error),
        );
    }

    if let Some((content, content_type)) = state.get_cached_file(path) {
        return file_response(content, &content_type);
    }

    // SPA fallback: routes without a file extension resolve to index.
    let has_extension = path.rsplit('/').next().is_some_and(|seg| seg.contains('.'));
    if !has_extension {
        let index = state.index_path();
        if let Some((content, content_type)) = state.get_cached_file(&index) {
            return file_response(content, &content_type);
        }
    }

    plain_response(StatusCode::NOT_FOUND, format!("File not found: {}", path))
}

fn file_response(content: Vec<u8>, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(content))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn plain_response(status: StatusCode, message: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(message))
        .unwrap_or_else(|_| status.into_response())
}

/// Infer a MIME type from a file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "html" => "text/html; charset=utf-8",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_cover_build_artifacts() {
        assert_eq!(content_type_for("/main.js"), "application/javascript");
        assert_eq!(content_type_for("/styles.css"), "text/css");
        assert_eq!(content_type_for("/index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("/main.js.map"), "application/json");
        assert_eq!(content_type_for("/ngsw.json"), "application/json");
        assert_eq!(
            content_type_for("/3rdpartylicenses.txt"),
            "text/plain; charset=utf-8"
        );
        assert_eq!(content_type_for("/bin"), "application/octet-stream");
    }
}
