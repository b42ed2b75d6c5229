//! HTTP route handlers
//!
//! One module per route family, plus the shared response/view plumbing.
//! Every error response carries a `detail` message; entity views are
//! camelCase JSON shaped by the `*View` structs here.

pub mod admin;
pub mod health;
pub mod streams;
pub mod submissions;
pub mod topics;

pub use admin::handle_admin_request;
pub use health::{health_check, readiness_check, version_info};
pub use streams::handle_streams_request;
pub use submissions::handle_submissions_request;
pub use topics::handle_topics_request;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::auth::Role;
use crate::catalog::TopicDetail;
use crate::enrollment::StreamDetail;
use crate::ledger::{ReceivedTopic, SubmissionDetail};
use crate::registry::{SubmissionStatus, TopicStatus};
use crate::types::{CathedraError, Result};

pub(crate) type FullBody = Full<Bytes>;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Serialize a body as a JSON response with the given status.
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Empty-body response (204 and friends).
pub(crate) fn empty_response(status: StatusCode) -> Response<FullBody> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Map an operation error to its HTTP response. Storage faults are logged
/// and masked; everything else surfaces its detail message verbatim.
pub(crate) fn error_response(err: &CathedraError) -> Response<FullBody> {
    let status = err.status_code();
    let detail = match err {
        CathedraError::Storage(_) => {
            error!(%err, "Internal error while handling request");
            "Internal server error.".to_string()
        }
        _ => {
            debug!(%err, status = %status, "Request rejected");
            err.to_string()
        }
    };
    json_response(status, &ErrorBody { detail })
}

/// 404 for a path no route matches.
pub(crate) fn not_found_response() -> Response<FullBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorBody {
            detail: "Not found.".to_string(),
        },
    )
}

/// 405 for a known path hit with the wrong method.
pub(crate) fn method_not_allowed(method: &Method) -> Response<FullBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorBody {
            detail: format!("Method \"{}\" not allowed.", method),
        },
    )
}

/// Read and deserialize a JSON request body, bounded by the configured
/// body size limit.
pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
    max_bytes: usize,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| CathedraError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > max_bytes {
        return Err(CathedraError::Http("Request body too large.".to_string()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| CathedraError::Http(format!("Invalid JSON: {}", e)))
}

/// `is_active` query flag, defaulting to true; anything but "true"
/// (case-insensitive) selects inactive.
pub(crate) fn is_active_param(query: Option<&str>) -> bool {
    let mut is_active = true;
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                if key == "is_active" {
                    let value = urlencoding::decode(value).unwrap_or_default();
                    is_active = value.to_lowercase() == "true";
                }
            }
        }
    }
    is_active
}

// =============================================================================
// Wire views
// =============================================================================

/// Identity reference on the wire: the opaque id plus the role implied by
/// its position (a topic's teacher, a submission's student).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyView {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub specialty: SpecialtyView,
    pub academic_year: String,
    pub semester: u8,
    pub course_number: u8,
}

impl From<&StreamDetail> for StreamView {
    fn from(detail: &StreamDetail) -> Self {
        Self {
            id: detail.stream.id,
            name: detail.stream.name.clone(),
            is_active: detail.stream.is_active,
            specialty: SpecialtyView {
                code: detail.specialty.code.clone(),
                name: detail.specialty.name.clone(),
            },
            academic_year: detail.stream.academic_year.clone(),
            semester: detail.stream.semester,
            course_number: detail.stream.course_number,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TopicStatus,
    pub teacher: IdentityRef,
    pub stream: StreamView,
}

impl From<&TopicDetail> for TopicView {
    fn from(detail: &TopicDetail) -> Self {
        Self {
            id: detail.topic.id,
            title: detail.topic.title.clone(),
            description: detail.topic.description.clone(),
            status: detail.topic.status,
            teacher: IdentityRef {
                id: detail.topic.teacher,
                role: Role::Teacher,
            },
            stream: StreamView::from(&detail.stream),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: Uuid,
    pub status: SubmissionStatus,
    pub topic: TopicView,
    pub student: IdentityRef,
    pub vision: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&SubmissionDetail> for SubmissionView {
    fn from(detail: &SubmissionDetail) -> Self {
        Self {
            id: detail.submission.id,
            status: detail.submission.status,
            topic: TopicView::from(&detail.topic),
            student: IdentityRef {
                id: detail.submission.student,
                role: Role::Student,
            },
            vision: detail.submission.vision.clone(),
            created_at: detail.submission.created_at,
        }
    }
}

/// A topic of the teacher's inbox with its submissions attached.
#[derive(Debug, Serialize)]
pub struct TopicWithSubmissionsView {
    #[serde(flatten)]
    pub topic: TopicView,
    pub submissions: Vec<SubmissionView>,
}

impl From<&ReceivedTopic> for TopicWithSubmissionsView {
    fn from(group: &ReceivedTopic) -> Self {
        Self {
            topic: TopicView::from(&group.topic),
            submissions: group.submissions.iter().map(SubmissionView::from).collect(),
        }
    }
}
