//! Capability checks for workflow operations
//!
//! Every route handler consults `require` before touching the core, so the
//! role rules live in one table instead of being restated per endpoint.
//! Ownership and membership relations are checked inside the core
//! operations themselves; this layer only gates by role.

use std::fmt;

use crate::auth::identity::{Identity, Role};
use crate::types::{CathedraError, Result};

/// Operation classes exposed by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// List streams the caller is enrolled in
    ListMyStreams,
    /// List available topics of a stream
    ListStreamTopics,
    /// List the caller's own submissions
    ListMySubmissions,
    /// Apply for a topic
    CreateSubmission,
    /// Withdraw an own pending submission
    WithdrawSubmission,
    /// List the caller's own topics
    ListMyTopics,
    /// Offer a new topic
    CreateTopic,
    /// Edit an own topic
    UpdateTopic,
    /// Delete an own topic
    DeleteTopic,
    /// List submissions received on own topics
    ListReceivedSubmissions,
    /// Approve a submission (claims the topic)
    ApproveSubmission,
    /// Reject a submission
    RejectSubmission,
    /// Create, toggle, delete, and list streams
    ManageStreams,
    /// Enroll and unenroll stream members
    ManageEnrollment,
    /// Create specialties
    ManageSpecialties,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ListMyStreams => "list_my_streams",
            Capability::ListStreamTopics => "list_stream_topics",
            Capability::ListMySubmissions => "list_my_submissions",
            Capability::CreateSubmission => "create_submission",
            Capability::WithdrawSubmission => "withdraw_submission",
            Capability::ListMyTopics => "list_my_topics",
            Capability::CreateTopic => "create_topic",
            Capability::UpdateTopic => "update_topic",
            Capability::DeleteTopic => "delete_topic",
            Capability::ListReceivedSubmissions => "list_received_submissions",
            Capability::ApproveSubmission => "approve_submission",
            Capability::RejectSubmission => "reject_submission",
            Capability::ManageStreams => "manage_streams",
            Capability::ManageEnrollment => "manage_enrollment",
            Capability::ManageSpecialties => "manage_specialties",
        };
        write!(f, "{}", name)
    }
}

impl Capability {
    /// The role this capability is restricted to.
    /// `None` means any authenticated caller.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Capability::ListMyStreams => None,

            Capability::ListStreamTopics
            | Capability::ListMySubmissions
            | Capability::CreateSubmission
            | Capability::WithdrawSubmission => Some(Role::Student),

            Capability::ListMyTopics
            | Capability::CreateTopic
            | Capability::UpdateTopic
            | Capability::DeleteTopic
            | Capability::ListReceivedSubmissions
            | Capability::ApproveSubmission
            | Capability::RejectSubmission => Some(Role::Teacher),

            Capability::ManageStreams
            | Capability::ManageEnrollment
            | Capability::ManageSpecialties => Some(Role::Admin),
        }
    }
}

/// Check whether a role may exercise a capability
pub fn is_capability_allowed(capability: Capability, role: Role) -> bool {
    match capability.required_role() {
        Some(required) => role == required,
        None => true,
    }
}

/// Gate an operation on the caller's role.
/// Returns `Forbidden` with a uniform message when the role does not match.
pub fn require(identity: &Identity, capability: Capability) -> Result<()> {
    if is_capability_allowed(capability, identity.role) {
        Ok(())
    } else {
        Err(CathedraError::Forbidden(
            "You do not have permission to perform this action.".into(),
        ))
    }
}
