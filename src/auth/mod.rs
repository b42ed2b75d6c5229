//! Identity and authorization for cathedra
//!
//! Provides:
//! - Identity extraction from trusted gateway headers
//! - Role predicates for students, teachers, and administrators
//! - Capability checks consulted uniformly by every route handler

pub mod identity;
pub mod permissions;

pub use identity::{extract_identity, Identity, Role};
pub use permissions::{is_capability_allowed, require, Capability};
