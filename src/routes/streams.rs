//! Stream-facing endpoints
//!
//! - `GET /streams/my?is_active=` - streams the caller is enrolled in
//! - `GET /streams/{id}/topics` - available topics of a stream (students)

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{extract_identity, require, Capability};
use crate::routes::{
    error_response, is_active_param, json_response, method_not_allowed, not_found_response,
    FullBody, StreamView, TopicView,
};
use crate::server::AppState;

pub async fn handle_streams_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/streams").unwrap_or("").to_string();

    match (&method, subpath.as_str()) {
        (&Method::GET, "/my") => my_streams(req, state).await,

        (&Method::GET, p) if p.ends_with("/topics") => {
            let id = p
                .strip_prefix('/')
                .and_then(|s| s.strip_suffix("/topics"))
                .unwrap_or("");
            match id.parse::<Uuid>() {
                Ok(stream_id) => stream_topics(req, state, stream_id).await,
                Err(_) => not_found_response(),
            }
        }

        (_, "/my") => method_not_allowed(&method),
        (_, p) if p.ends_with("/topics") => method_not_allowed(&method),

        _ => not_found_response(),
    }
}

/// GET /streams/my - the caller's enrolled streams, filtered by activity
async fn my_streams(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::ListMyStreams) {
        return error_response(&e);
    }

    let active = is_active_param(req.uri().query());
    match state.enrollment.streams_for(identity.id, active).await {
        Ok(streams) => {
            let views: Vec<StreamView> = streams.iter().map(StreamView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

/// GET /streams/{id}/topics - available topics for an enrolled student
async fn stream_topics(
    req: Request<Incoming>,
    state: Arc<AppState>,
    stream_id: Uuid,
) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::ListStreamTopics) {
        return error_response(&e);
    }

    match state.catalog.list_available(stream_id, identity.id).await {
        Ok(topics) => {
            let views: Vec<TopicView> = topics.iter().map(TopicView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}
