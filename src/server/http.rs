//! HTTP server implementation
//!
//! hyper http1 with TokioIo; one task per connection, one top-level
//! dispatch on (method, path prefix). All state lives in `AppState` and is
//! shared by reference with every handler.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::config::Args;
use crate::enrollment::Enrollment;
use crate::ledger::{Ledger, Resolution};
use crate::registry::Registry;
use crate::routes;
use crate::types::CathedraError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub registry: Arc<Registry>,
    pub enrollment: Enrollment,
    pub catalog: Catalog,
    pub ledger: Ledger,
    pub resolution: Resolution,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, registry: Arc<Registry>) -> Self {
        Self {
            args,
            enrollment: Enrollment::new(Arc::clone(&registry)),
            catalog: Catalog::new(Arc::clone(&registry)),
            ledger: Ledger::new(Arc::clone(&registry)),
            resolution: Resolution::new(Arc::clone(&registry)),
            registry,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server until the process is stopped.
pub async fn run(state: Arc<AppState>) -> Result<(), CathedraError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Cathedra listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - demo records seeded");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!(%method, %path, "Request received");

    let response = match (&method, path.as_str()) {
        // Health and build info
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            routes::health_check(state).await
        }
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            routes::readiness_check(state).await
        }
        (&Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (&Method::OPTIONS, _) => preflight_response(),

        // Route families
        _ if path == "/streams" || path.starts_with("/streams/") => {
            routes::handle_streams_request(req, state, &path).await
        }
        _ if path == "/topics" || path.starts_with("/topics/") => {
            routes::handle_topics_request(req, state, &path).await
        }
        _ if path == "/submissions" || path.starts_with("/submissions/") => {
            routes::handle_submissions_request(req, state, &path).await
        }
        _ if path.starts_with("/admin/") => {
            routes::handle_admin_request(req, state, &path).await
        }

        _ => routes::not_found_response(),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type, x-identity-id, x-identity-role",
        )
        .body(Full::new(Bytes::new()))
        .unwrap()
}
