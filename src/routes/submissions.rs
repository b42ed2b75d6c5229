//! Submission endpoints
//!
//! Student side:
//! - `GET /submissions/my` - own submissions, newest first
//! - `POST /submissions` - apply for a topic
//! - `DELETE /submissions/{id}` - withdraw a PENDING submission
//!
//! Teacher side:
//! - `GET /submissions/received` - inbox grouped by topic
//! - `POST /submissions/{id}/approve` - claim the topic, reject siblings
//! - `POST /submissions/{id}/reject` - reject without touching the topic

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{extract_identity, require, Capability};
use crate::routes::{
    empty_response, error_response, json_response, method_not_allowed, not_found_response,
    parse_json_body, FullBody, SubmissionView, TopicWithSubmissionsView,
};
use crate::server::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubmissionRequest {
    topic_id: Uuid,
    vision: String,
}

fn submission_id(subpath: &str) -> Option<Uuid> {
    subpath.strip_prefix('/')?.parse().ok()
}

fn submission_action(subpath: &str) -> Option<(Uuid, &str)> {
    let rest = subpath.strip_prefix('/')?;
    let (id, action) = rest.split_once('/')?;
    Some((id.parse().ok()?, action))
}

pub async fn handle_submissions_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/submissions").unwrap_or("").to_string();

    match (&method, subpath.as_str()) {
        (&Method::GET, "/my") => my_submissions(req, state).await,
        (&Method::GET, "/received") => received_submissions(req, state).await,
        (&Method::POST, "") | (&Method::POST, "/") => create_submission(req, state).await,

        (&Method::POST, p) if submission_action(p).is_some() => {
            match submission_action(p) {
                Some((id, "approve")) => approve_submission(req, state, id).await,
                Some((id, "reject")) => reject_submission(req, state, id).await,
                _ => not_found_response(),
            }
        }
        (&Method::DELETE, p) if submission_id(p).is_some() => match submission_id(p) {
            Some(id) => withdraw_submission(req, state, id).await,
            None => not_found_response(),
        },

        (_, "/my") | (_, "/received") => method_not_allowed(&method),
        (_, "") | (_, "/") => method_not_allowed(&method),
        (_, p) if submission_id(p).is_some() => method_not_allowed(&method),

        _ => not_found_response(),
    }
}

/// GET /submissions/my - the student's submissions, all statuses
async fn my_submissions(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::ListMySubmissions) {
        return error_response(&e);
    }

    match state.ledger.list_mine(identity.id).await {
        Ok(submissions) => {
            let views: Vec<SubmissionView> =
                submissions.iter().map(SubmissionView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

/// GET /submissions/received - the teacher's inbox, grouped by topic
async fn received_submissions(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::ListReceivedSubmissions) {
        return error_response(&e);
    }

    match state.ledger.list_received(identity.id).await {
        Ok(groups) => {
            let views: Vec<TopicWithSubmissionsView> =
                groups.iter().map(TopicWithSubmissionsView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

/// POST /submissions - create a PENDING submission
async fn create_submission(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::CreateSubmission) {
        return error_response(&e);
    }

    let body: CreateSubmissionRequest =
        match parse_json_body(req, state.args.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => return error_response(&e),
        };

    match state
        .ledger
        .create_submission(identity.id, body.topic_id, &body.vision)
        .await
    {
        Ok(detail) => json_response(StatusCode::CREATED, &SubmissionView::from(&detail)),
        Err(e) => error_response(&e),
    }
}

/// DELETE /submissions/{id} - withdraw an own PENDING submission
async fn withdraw_submission(
    req: Request<Incoming>,
    state: Arc<AppState>,
    submission_id: Uuid,
) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::WithdrawSubmission) {
        return error_response(&e);
    }

    match state.ledger.withdraw(submission_id, identity.id).await {
        Ok(()) => empty_response(StatusCode::NO_CONTENT),
        Err(e) => error_response(&e),
    }
}

/// POST /submissions/{id}/approve - the atomic cutover
async fn approve_submission(
    req: Request<Incoming>,
    state: Arc<AppState>,
    submission_id: Uuid,
) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::ApproveSubmission) {
        return error_response(&e);
    }

    match state.resolution.approve(submission_id, identity.id).await {
        Ok(detail) => json_response(StatusCode::OK, &SubmissionView::from(&detail)),
        Err(e) => error_response(&e),
    }
}

/// POST /submissions/{id}/reject - explicit rejection, topic untouched
async fn reject_submission(
    req: Request<Incoming>,
    state: Arc<AppState>,
    submission_id: Uuid,
) -> Response<FullBody> {
    let identity = match extract_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require(&identity, Capability::RejectSubmission) {
        return error_response(&e);
    }

    match state.ledger.reject(submission_id, identity.id).await {
        Ok(detail) => json_response(StatusCode::OK, &SubmissionView::from(&detail)),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_action_parsing() {
        let id = Uuid::new_v4();
        let path = format!("/{}/approve", id);
        assert_eq!(submission_action(&path), Some((id, "approve")));

        let path = format!("/{}/reject", id);
        assert_eq!(submission_action(&path), Some((id, "reject")));

        assert_eq!(submission_action("/not-a-uuid/approve"), None);
        assert_eq!(submission_action("/approve"), None);
    }

    #[test]
    fn test_submission_id_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(submission_id(&format!("/{}", id)), Some(id));
        assert_eq!(submission_id("/nope"), None);
        assert_eq!(submission_id(""), None);
    }
}
