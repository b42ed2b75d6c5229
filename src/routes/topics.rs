//! Teacher-facing topic endpoints
//!
//! - `GET /topics/my?is_active=` - the teacher's own topics
//! - `POST /topics` - create a topic in a stream
//! - `PUT /topics/{id}` - partial update of title/description
//! - `DELETE /topics/{id}` - delete a topic without submission history

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{extract_identity, require, Capability};
use crate::catalog::TopicPatch;
use crate::routes::{
    empty_response, error_response, is_active_param, json_response, method_not_allowed,
    not_found_response, parse_json_body, FullBody, TopicView,
};
use crate::server::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTopicRequest {
    title: String,
    description: String,
    stream_id: Uuid,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateTopicRequest {
    title: Option<String>,
    description: Option<String>,
}

fn topic_id(subpath: &str) -> Option<Uuid> {
    subpath.strip_prefix('/')?.parse().ok()
}

pub async fn handle_topics_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/topics").unwrap_or("").to_string();

    match (&method, subpath.as_str()) {
        (&Method::GET, "/my") => my_topics(req, state).await,
        (&Method::POST, "") | (&Method::POST, "/") => create_topic(req, state).await,

        (&Method::PUT, p) if topic_id(p).is_some() => match topic_id(p) {
            Some(id) => update_topic(req, state, id).await,
            None => not_found_response(),
        },
        (&Method::DELETE, p) if topic_id(p).is_some() => match topic_id(p) {
            Some(id) => delete_topic(req, state, id).await,
            None => not_found_response(),
        },

        (_, "/my") => method_not_allowed(&method),
        (_, "") | (_, "/") => method_not_allowed(&method),
        (_, p) if topic_id(p).is_some() => method_not_allowed(&method),

        _ => not_found_response(),
    }
}

/// GET /topics/my - the teacher's topics, filtered by stream activity
async fn my_topics(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::ListMyTopics) {
        return error_response(&e);
    }

    let active = is_active_param(req.uri().query());
    match state.catalog.list_mine(identity.id, active).await {
        Ok(topics) => {
            let views: Vec<TopicView> = topics.iter().map(TopicView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

/// POST /topics - create an AVAILABLE topic
async fn create_topic(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::CreateTopic) {
        return error_response(&e);
    }

    let body: CreateTopicRequest =
        match parse_json_body(req, state.args.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => return error_response(&e),
        };

    match state
        .catalog
        .create_topic(identity.id, body.stream_id, &body.title, &body.description)
        .await
    {
        Ok(detail) => json_response(StatusCode::CREATED, &TopicView::from(&detail)),
        Err(e) => error_response(&e),
    }
}

/// PUT /topics/{id} - partial update of an owned topic
async fn update_topic(
    req: Request<Incoming>,
    state: Arc<AppState>,
    topic_id: Uuid,
) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::UpdateTopic) {
        return error_response(&e);
    }

    let body: UpdateTopicRequest =
        match parse_json_body(req, state.args.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => return error_response(&e),
        };
    let patch = TopicPatch {
        title: body.title,
        description: body.description,
    };

    match state.catalog.update_topic(topic_id, identity.id, patch).await {
        Ok(detail) => json_response(StatusCode::OK, &TopicView::from(&detail)),
        Err(e) => error_response(&e),
    }
}

/// DELETE /topics/{id} - delete an owned topic with no submission history
async fn delete_topic(
    req: Request<Incoming>,
    state: Arc<AppState>,
    topic_id: Uuid,
) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::DeleteTopic) {
        return error_response(&e);
    }

    match state.catalog.delete_topic(topic_id, identity.id).await {
        Ok(()) => empty_response(StatusCode::NO_CONTENT),
        Err(e) => error_response(&e),
    }
}
