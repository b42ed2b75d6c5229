//! Caller identity
//!
//! Authentication is handled by a fronting gateway; cathedra trusts the
//! `x-identity-id` and `x-identity-role` headers it injects. Identity is
//! opaque here: an id plus a role, nothing else.

use hyper::body::Incoming;
use hyper::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::{CathedraError, Result};

pub const IDENTITY_ID_HEADER: &str = "x-identity-id";
pub const IDENTITY_ROLE_HEADER: &str = "x-identity-role";

/// Caller role as asserted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "STUDENT"),
            Role::Teacher => write!(f, "TEACHER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// An authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Extract the caller identity from gateway headers.
///
/// Both headers must be present and well-formed; anything else is a 401 at
/// the boundary, before any core operation runs.
pub fn extract_identity(req: &Request<Incoming>) -> Result<Identity> {
    let id = req
        .headers()
        .get(IDENTITY_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CathedraError::Unauthorized("missing identity header".into()))?;

    let id = Uuid::parse_str(id)
        .map_err(|_| CathedraError::Unauthorized("malformed identity id".into()))?;

    let role = req
        .headers()
        .get(IDENTITY_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CathedraError::Unauthorized("missing identity role header".into()))?;

    let role = role
        .parse::<Role>()
        .map_err(|_| CathedraError::Unauthorized("malformed identity role".into()))?;

    Ok(Identity::new(id, role))
}
