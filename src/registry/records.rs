//! Workflow records
//!
//! Status fields are not freely assignable: each entity exposes a
//! transition method that accepts only whitelisted (from -> to) pairs and
//! fails `Conflict` for everything else. APPROVED, REJECTED, and TAKEN are
//! terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::types::{CathedraError, Result};

/// Maximum accepted topic title length
pub const MAX_TITLE_LEN: usize = 255;

/// A degree program referenced by streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub code: String,
    pub name: String,
}

/// Role tag of an identity within a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Student,
    Teacher,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Student => write!(f, "STUDENT"),
            MemberRole::Teacher => write!(f, "TEACHER"),
        }
    }
}

/// A course stream: one cohort for one academic period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub id: Uuid,
    pub name: String,
    pub academic_year: String,
    pub semester: u8,
    pub course_number: u8,
    pub specialty_code: String,
    pub is_active: bool,
    /// Enrolled identities, each tagged with its role in this stream
    pub members: HashMap<Uuid, MemberRole>,
    pub created_at: DateTime<Utc>,
}

impl Stream {
    pub fn has_member(&self, identity_id: Uuid) -> bool {
        self.members.contains_key(&identity_id)
    }

    pub fn member_role(&self, identity_id: Uuid) -> Option<MemberRole> {
        self.members.get(&identity_id).copied()
    }

    /// Whether the identity is enrolled as a teacher
    pub fn has_teacher(&self, identity_id: Uuid) -> bool {
        self.member_role(identity_id) == Some(MemberRole::Teacher)
    }
}

/// Availability state of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TopicStatus {
    Available,
    Taken,
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicStatus::Available => write!(f, "AVAILABLE"),
            TopicStatus::Taken => write!(f, "TAKEN"),
        }
    }
}

impl TopicStatus {
    /// Whitelisted transitions. TAKEN is terminal: there is no reopening
    /// path, even if the approved submission is later invalidated.
    pub fn can_transition(self, next: TopicStatus) -> bool {
        matches!((self, next), (TopicStatus::Available, TopicStatus::Taken))
    }
}

/// A project subject offered by a teacher within a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TopicStatus,
    /// Owning teacher identity (foreign reference, not owned)
    pub teacher: Uuid,
    /// Owning stream
    pub stream: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Topic {
    /// Apply a status transition, rejecting non-whitelisted pairs.
    /// Only the approval path calls this.
    pub fn transition(&mut self, next: TopicStatus) -> Result<()> {
        if self.status.can_transition(next) {
            self.status = next;
            Ok(())
        } else {
            Err(CathedraError::Conflict(format!(
                "Invalid topic status transition: {} -> {}.",
                self.status, next
            )))
        }
    }
}

/// Resolution state of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "PENDING"),
            SubmissionStatus::Approved => write!(f, "APPROVED"),
            SubmissionStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl SubmissionStatus {
    /// Whitelisted transitions. APPROVED and REJECTED are terminal.
    pub fn can_transition(self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (SubmissionStatus::Pending, SubmissionStatus::Approved)
                | (SubmissionStatus::Pending, SubmissionStatus::Rejected)
        )
    }

    /// Counts toward the one-active-submission-per-student-per-stream rule
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SubmissionStatus::Pending | SubmissionStatus::Approved
        )
    }
}

/// A student's application to claim a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub status: SubmissionStatus,
    /// Applying student identity (foreign reference, not owned)
    pub student: Uuid,
    /// Target topic
    pub topic: Uuid,
    /// Free-text rationale
    pub vision: String,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// Apply a status transition, rejecting non-whitelisted pairs.
    pub fn transition(&mut self, next: SubmissionStatus) -> Result<()> {
        if self.status.can_transition(next) {
            self.status = next;
            Ok(())
        } else {
            Err(CathedraError::Conflict(format!(
                "Invalid submission status transition: {} -> {}.",
                self.status, next
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_with_members(members: &[(Uuid, MemberRole)]) -> Stream {
        Stream {
            id: Uuid::new_v4(),
            name: "KN-41".to_string(),
            academic_year: "2024-2025".to_string(),
            semester: 1,
            course_number: 4,
            specialty_code: "121".to_string(),
            is_active: true,
            members: members.iter().cloned().collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_topic_transitions() {
        assert!(TopicStatus::Available.can_transition(TopicStatus::Taken));
        assert!(!TopicStatus::Taken.can_transition(TopicStatus::Available));
        assert!(!TopicStatus::Available.can_transition(TopicStatus::Available));
        assert!(!TopicStatus::Taken.can_transition(TopicStatus::Taken));
    }

    #[test]
    fn test_submission_transitions() {
        assert!(SubmissionStatus::Pending.can_transition(SubmissionStatus::Approved));
        assert!(SubmissionStatus::Pending.can_transition(SubmissionStatus::Rejected));
        assert!(!SubmissionStatus::Approved.can_transition(SubmissionStatus::Rejected));
        assert!(!SubmissionStatus::Approved.can_transition(SubmissionStatus::Pending));
        assert!(!SubmissionStatus::Rejected.can_transition(SubmissionStatus::Approved));
        assert!(!SubmissionStatus::Rejected.can_transition(SubmissionStatus::Pending));
    }

    #[test]
    fn test_terminal_transition_is_conflict() {
        let mut submission = Submission {
            id: Uuid::new_v4(),
            status: SubmissionStatus::Approved,
            student: Uuid::new_v4(),
            topic: Uuid::new_v4(),
            vision: "already decided".to_string(),
            created_at: Utc::now(),
        };
        let err = submission
            .transition(SubmissionStatus::Rejected)
            .expect_err("terminal status must not transition");
        assert!(err.is_conflict());
        assert_eq!(submission.status, SubmissionStatus::Approved);
    }

    #[test]
    fn test_active_statuses() {
        assert!(SubmissionStatus::Pending.is_active());
        assert!(SubmissionStatus::Approved.is_active());
        assert!(!SubmissionStatus::Rejected.is_active());
    }

    #[test]
    fn test_stream_membership() {
        let student = Uuid::new_v4();
        let teacher = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        let stream = stream_with_members(&[
            (student, MemberRole::Student),
            (teacher, MemberRole::Teacher),
        ]);

        assert!(stream.has_member(student));
        assert!(stream.has_member(teacher));
        assert!(!stream.has_member(outsider));
        assert_eq!(stream.member_role(student), Some(MemberRole::Student));
        assert!(stream.has_teacher(teacher));
        assert!(!stream.has_teacher(student));
    }

    #[test]
    fn test_status_serde_uppercase() {
        let json = serde_json::to_string(&SubmissionStatus::Pending).expect("serialize");
        assert_eq!(json, "\"PENDING\"");
        let json = serde_json::to_string(&TopicStatus::Available).expect("serialize");
        assert_eq!(json, "\"AVAILABLE\"");
    }
}
