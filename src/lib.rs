//! Cathedra - topic assignment service for academic course streams
//!
//! "Ex cathedra" - from the chair
//!
//! Cathedra coordinates the assignment of project topics to students within
//! course streams, mediated by teachers. The center of the system is the
//! topic/submission lifecycle: who may apply, how competing applications
//! interact, and how an approval atomically claims a topic and rejects the
//! other applicants.
//!
//! ## Components
//!
//! - **Enrollment**: membership queries over stream member sets
//! - **Catalog**: topic records, teacher-scoped CRUD, availability listings
//! - **Ledger**: submission records and the per-stream uniqueness invariant
//! - **Resolution**: the atomic approval cutover
//! - **Registry**: the transactional store all of the above run against

pub mod auth;
pub mod catalog;
pub mod config;
pub mod enrollment;
pub mod ledger;
pub mod registry;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CathedraError, Result};
