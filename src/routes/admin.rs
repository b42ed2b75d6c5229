//! Administrative endpoints
//!
//! Stream and specialty lifecycle plus enrollment management, all gated on
//! the admin role:
//! - `GET /admin/streams` - every stream with its member roster
//! - `POST /admin/streams` - create a stream
//! - `PUT /admin/streams/{id}/status` - toggle the active flag
//! - `DELETE /admin/streams/{id}` - delete a stream (cascades)
//! - `POST /admin/streams/{id}/members` - enroll an identity
//! - `DELETE /admin/streams/{id}/members/{identity}` - unenroll
//! - `POST /admin/specialties` - create a specialty
//! - `DELETE /admin/specialties/{code}` - delete an unreferenced specialty

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{extract_identity, require, Capability, Identity};
use crate::enrollment::StreamDetail;
use crate::registry::{MemberRole, Stream};
use crate::routes::{
    empty_response, error_response, json_response, method_not_allowed, not_found_response,
    parse_json_body, FullBody, SpecialtyView, StreamView,
};
use crate::server::AppState;
use crate::types::Result;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStreamRequest {
    name: String,
    specialty_code: String,
    academic_year: String,
    semester: u8,
    course_number: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetStreamStatusRequest {
    is_active: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    identity_id: Uuid,
    role: MemberRole,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSpecialtyRequest {
    code: String,
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberView {
    id: Uuid,
    role: MemberRole,
}

/// Administrative stream view: the public view plus the member roster.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminStreamView {
    #[serde(flatten)]
    stream: StreamView,
    members: Vec<MemberView>,
}

impl AdminStreamView {
    fn build(detail: &StreamDetail) -> Self {
        let mut members: Vec<MemberView> = detail
            .stream
            .members
            .iter()
            .map(|(id, role)| MemberView {
                id: *id,
                role: *role,
            })
            .collect();
        members.sort_by_key(|m| m.id);
        Self {
            stream: StreamView::from(detail),
            members,
        }
    }
}

/// Join a bare stream record with its specialty for the admin view.
async fn admin_view(state: &AppState, stream: Stream) -> Result<AdminStreamView> {
    let detail = state
        .registry
        .query(move |world| StreamDetail::load(world, &stream))
        .await?;
    Ok(AdminStreamView::build(&detail))
}

/// Every stream joined with its specialty, oldest first, from one
/// consistent read of the world.
fn list_admin_views(world: &crate::registry::World) -> Result<Vec<AdminStreamView>> {
    let mut streams: Vec<&Stream> = world.streams.values().collect();
    streams.sort_by_key(|s| (s.created_at, s.id));
    streams
        .into_iter()
        .map(|s| StreamDetail::load(world, s).map(|d| AdminStreamView::build(&d)))
        .collect()
}

fn check_admin(
    req: &Request<Incoming>,
    capability: Capability,
) -> std::result::Result<Identity, Response<FullBody>> {
    let identity = extract_identity(req).map_err(|e| error_response(&e))?;
    require(&identity, capability).map_err(|e| error_response(&e))?;
    Ok(identity)
}

pub async fn handle_admin_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/admin").unwrap_or("").to_string();

    // /admin/streams...
    if let Some(rest) = subpath.strip_prefix("/streams") {
        return handle_streams(req, state, &method, rest).await;
    }

    // /admin/specialties...
    if let Some(rest) = subpath.strip_prefix("/specialties") {
        return handle_specialties(req, state, &method, rest).await;
    }

    not_found_response()
}

async fn handle_streams(
    req: Request<Incoming>,
    state: Arc<AppState>,
    method: &Method,
    rest: &str,
) -> Response<FullBody> {
    match (method, rest) {
        (&Method::GET, "") | (&Method::GET, "/") => list_streams(req, state).await,
        (&Method::POST, "") | (&Method::POST, "/") => create_stream(req, state).await,
        _ => {
            // /{id}, /{id}/status, /{id}/members, /{id}/members/{identity}
            let rest = match rest.strip_prefix('/') {
                Some(r) => r,
                None => return not_found_response(),
            };
            let (id, tail) = match rest.split_once('/') {
                Some((id, tail)) => (id, Some(tail)),
                None => (rest, None),
            };
            let stream_id = match id.parse::<Uuid>() {
                Ok(id) => id,
                Err(_) => return not_found_response(),
            };

            match (method, tail) {
                (&Method::DELETE, None) => delete_stream(req, state, stream_id).await,
                (&Method::PUT, Some("status")) => {
                    set_stream_status(req, state, stream_id).await
                }
                (&Method::POST, Some("members")) => enroll(req, state, stream_id).await,
                (&Method::DELETE, Some(tail)) if tail.starts_with("members/") => {
                    match tail["members/".len()..].parse::<Uuid>() {
                        Ok(identity_id) => unenroll(req, state, stream_id, identity_id).await,
                        Err(_) => not_found_response(),
                    }
                }
                (_, None) | (_, Some("status")) | (_, Some("members")) => {
                    method_not_allowed(method)
                }
                _ => not_found_response(),
            }
        }
    }
}

async fn handle_specialties(
    req: Request<Incoming>,
    state: Arc<AppState>,
    method: &Method,
    rest: &str,
) -> Response<FullBody> {
    match (method, rest) {
        (&Method::POST, "") | (&Method::POST, "/") => create_specialty(req, state).await,
        (&Method::DELETE, code) if code.len() > 1 => {
            let code = code.trim_start_matches('/').to_string();
            delete_specialty(req, state, &code).await
        }
        (_, "") | (_, "/") => method_not_allowed(method),
        _ => not_found_response(),
    }
}

/// GET /admin/streams - all streams with member rosters, oldest first
async fn list_streams(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageStreams) {
        return resp;
    }

    match state.registry.query(|world| list_admin_views(world)).await {
        Ok(views) => json_response(StatusCode::OK, &views),
        Err(e) => error_response(&e),
    }
}

/// POST /admin/streams - create an active, empty stream
async fn create_stream(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageStreams) {
        return resp;
    }

    let body: CreateStreamRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    let created = state
        .registry
        .create_stream(
            &body.name,
            &body.specialty_code,
            &body.academic_year,
            body.semester,
            body.course_number,
        )
        .await;

    match created {
        Ok(stream) => match admin_view(&state, stream).await {
            Ok(view) => json_response(StatusCode::CREATED, &view),
            Err(e) => error_response(&e),
        },
        Err(e) => error_response(&e),
    }
}

/// PUT /admin/streams/{id}/status - toggle the active flag
async fn set_stream_status(
    req: Request<Incoming>,
    state: Arc<AppState>,
    stream_id: Uuid,
) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageStreams) {
        return resp;
    }

    let body: SetStreamStatusRequest = match parse_json_body(req, state.args.max_body_bytes).await
    {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    match state.registry.set_stream_active(stream_id, body.is_active).await {
        Ok(stream) => match admin_view(&state, stream).await {
            Ok(view) => json_response(StatusCode::OK, &view),
            Err(e) => error_response(&e),
        },
        Err(e) => error_response(&e),
    }
}

/// DELETE /admin/streams/{id} - delete with cascade to topics/submissions
async fn delete_stream(
    req: Request<Incoming>,
    state: Arc<AppState>,
    stream_id: Uuid,
) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageStreams) {
        return resp;
    }

    match state.registry.delete_stream(stream_id).await {
        Ok(()) => empty_response(StatusCode::NO_CONTENT),
        Err(e) => error_response(&e),
    }
}

/// POST /admin/streams/{id}/members - enroll (or re-tag) an identity
async fn enroll(
    req: Request<Incoming>,
    state: Arc<AppState>,
    stream_id: Uuid,
) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageEnrollment) {
        return resp;
    }

    let body: EnrollRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    match state
        .registry
        .enroll(stream_id, body.identity_id, body.role)
        .await
    {
        Ok(stream) => match admin_view(&state, stream).await {
            Ok(view) => json_response(StatusCode::OK, &view),
            Err(e) => error_response(&e),
        },
        Err(e) => error_response(&e),
    }
}

/// DELETE /admin/streams/{id}/members/{identity} - unenroll an identity
async fn unenroll(
    req: Request<Incoming>,
    state: Arc<AppState>,
    stream_id: Uuid,
    identity_id: Uuid,
) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageEnrollment) {
        return resp;
    }

    match state.registry.unenroll(stream_id, identity_id).await {
        Ok(_) => empty_response(StatusCode::NO_CONTENT),
        Err(e) => error_response(&e),
    }
}

/// POST /admin/specialties - create a specialty
async fn create_specialty(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageSpecialties) {
        return resp;
    }

    let body: CreateSpecialtyRequest = match parse_json_body(req, state.args.max_body_bytes).await
    {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    match state.registry.create_specialty(&body.code, &body.name).await {
        Ok(specialty) => json_response(
            StatusCode::CREATED,
            &SpecialtyView {
                code: specialty.code,
                name: specialty.name,
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// DELETE /admin/specialties/{code} - delete an unreferenced specialty
async fn delete_specialty(
    req: Request<Incoming>,
    state: Arc<AppState>,
    code: &str,
) -> Response<FullBody> {
    if let Err(resp) = check_admin(&req, Capability::ManageSpecialties) {
        return resp;
    }

    match state.registry.delete_specialty(code).await {
        Ok(()) => empty_response(StatusCode::NO_CONTENT),
        Err(e) => error_response(&e),
    }
}
