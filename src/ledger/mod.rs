//! Submission ledger
//!
//! Owns submission records and their status transitions, and enforces the
//! one-active-submission-per-student-per-stream invariant. Approval (the
//! multi-record cutover) lives in the [`resolution`] submodule; everything
//! else about a submission's life is here.

pub mod resolution;

pub use resolution::Resolution;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::catalog::TopicDetail;
use crate::registry::{Registry, Submission, SubmissionStatus, Topic, World};
use crate::types::{CathedraError, Result};

/// A submission joined with its topic (and the topic's stream).
#[derive(Debug, Clone)]
pub struct SubmissionDetail {
    pub submission: Submission,
    pub topic: TopicDetail,
}

impl SubmissionDetail {
    pub fn load(world: &World, submission: &Submission) -> Result<Self> {
        let topic = world.topics.get(&submission.topic).ok_or_else(|| {
            CathedraError::Storage(format!(
                "submission {} references missing topic {}",
                submission.id, submission.topic
            ))
        })?;
        Ok(Self {
            submission: submission.clone(),
            topic: TopicDetail::load(world, topic)?,
        })
    }
}

/// One topic of a teacher's inbox: the topic plus all its submissions,
/// newest first.
#[derive(Debug, Clone)]
pub struct ReceivedTopic {
    pub topic: TopicDetail,
    pub submissions: Vec<SubmissionDetail>,
}

/// Submission operations over the registry
pub struct Ledger {
    registry: Arc<Registry>,
}

impl Ledger {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Create a PENDING submission for a topic.
    ///
    /// The topic's own AVAILABLE/TAKEN status is deliberately not a
    /// precondition here; the stream-level uniqueness check is what blocks
    /// duplicate claims, and contention is resolved at approval time.
    pub async fn create_submission(
        &self,
        student: Uuid,
        topic_id: Uuid,
        vision: &str,
    ) -> Result<SubmissionDetail> {
        let vision = vision.trim().to_string();
        if vision.is_empty() {
            return Err(CathedraError::Validation(
                "The 'vision' field cannot be empty".to_string(),
            ));
        }

        let detail = self
            .registry
            .transact(move |world| {
                let topic = world.topic(topic_id)?.clone();
                let stream = world.streams.get(&topic.stream).ok_or_else(|| {
                    CathedraError::Storage(format!(
                        "topic {} references missing stream {}",
                        topic.id, topic.stream
                    ))
                })?;
                if !stream.has_member(student) {
                    return Err(CathedraError::Forbidden(
                        "You are not enrolled in the stream for this topic.".to_string(),
                    ));
                }

                let stream_topic_ids: HashSet<Uuid> = world
                    .topics
                    .values()
                    .filter(|t| t.stream == topic.stream)
                    .map(|t| t.id)
                    .collect();
                let has_active = world.submissions.values().any(|s| {
                    s.student == student
                        && s.status.is_active()
                        && stream_topic_ids.contains(&s.topic)
                });
                if has_active {
                    return Err(CathedraError::Conflict(
                        "You already have a pending or approved submission in this stream."
                            .to_string(),
                    ));
                }

                let submission = Submission {
                    id: Uuid::new_v4(),
                    status: SubmissionStatus::Pending,
                    student,
                    topic: topic_id,
                    vision,
                    created_at: chrono::Utc::now(),
                };
                world.submissions.insert(submission.id, submission.clone());
                SubmissionDetail::load(world, &submission)
            })
            .await?;

        debug!(
            submission = %detail.submission.id,
            topic = %topic_id,
            "Submission created"
        );
        Ok(detail)
    }

    /// Withdraw (delete) an own PENDING submission. Resolved submissions
    /// stay on record.
    pub async fn withdraw(&self, submission_id: Uuid, student: Uuid) -> Result<()> {
        self.registry
            .transact(move |world| {
                let submission = match world.submissions.get(&submission_id) {
                    Some(s) if s.student == student => s,
                    _ => {
                        return Err(CathedraError::NotFound(
                            "Submission not found.".to_string(),
                        ));
                    }
                };
                if submission.status != SubmissionStatus::Pending {
                    return Err(CathedraError::Conflict(
                        "Only PENDING submissions can be canceled.".to_string(),
                    ));
                }
                world.submissions.remove(&submission_id);
                Ok(())
            })
            .await?;

        debug!(submission = %submission_id, "Submission withdrawn");
        Ok(())
    }

    /// Reject a PENDING submission on one of the teacher's own topics. The
    /// topic itself is untouched.
    pub async fn reject(&self, submission_id: Uuid, teacher: Uuid) -> Result<SubmissionDetail> {
        let detail = self
            .registry
            .transact(move |world| {
                let submission = world
                    .submissions
                    .get(&submission_id)
                    .ok_or_else(|| {
                        CathedraError::NotFound("Submission not found.".to_string())
                    })?
                    .clone();
                let topic = world.topics.get(&submission.topic).ok_or_else(|| {
                    CathedraError::Storage(format!(
                        "submission {} references missing topic {}",
                        submission.id, submission.topic
                    ))
                })?;
                if topic.teacher != teacher {
                    return Err(CathedraError::NotFound(
                        "Submission not found.".to_string(),
                    ));
                }
                if submission.status != SubmissionStatus::Pending {
                    return Err(CathedraError::Conflict(
                        "This submission is not pending rejection.".to_string(),
                    ));
                }

                world
                    .submission_mut(submission_id)?
                    .transition(SubmissionStatus::Rejected)?;
                let submission = world.submission(submission_id)?.clone();
                SubmissionDetail::load(world, &submission)
            })
            .await?;

        debug!(submission = %submission_id, "Submission rejected");
        Ok(detail)
    }

    /// The student's own submissions, all statuses, newest first.
    pub async fn list_mine(&self, student: Uuid) -> Result<Vec<SubmissionDetail>> {
        self.registry
            .query(|world| {
                let mut submissions: Vec<&Submission> = world
                    .submissions
                    .values()
                    .filter(|s| s.student == student)
                    .collect();
                submissions
                    .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
                submissions
                    .into_iter()
                    .map(|s| SubmissionDetail::load(world, s))
                    .collect()
            })
            .await
    }

    /// The teacher's topics that have received submissions, grouped by
    /// topic. Groups are ordered by their latest submission, most recently
    /// active first; submissions within a group are newest first.
    pub async fn list_received(&self, teacher: Uuid) -> Result<Vec<ReceivedTopic>> {
        self.registry
            .query(|world| {
                let mut topics: Vec<&Topic> = world
                    .topics
                    .values()
                    .filter(|t| t.teacher == teacher)
                    .collect();
                topics.sort_by_key(|t| (t.created_at, t.id));

                let mut groups = Vec::new();
                for topic in topics {
                    let mut submissions: Vec<&Submission> = world
                        .submissions
                        .values()
                        .filter(|s| s.topic == topic.id)
                        .collect();
                    if submissions.is_empty() {
                        continue;
                    }
                    submissions
                        .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

                    let detail = TopicDetail::load(world, topic)?;
                    let submissions: Vec<SubmissionDetail> = submissions
                        .into_iter()
                        .map(|s| SubmissionDetail {
                            submission: s.clone(),
                            topic: detail.clone(),
                        })
                        .collect();
                    groups.push(ReceivedTopic {
                        topic: detail,
                        submissions,
                    });
                }

                // Newest-first submissions make index 0 the group's latest.
                groups.sort_by(|a, b| {
                    b.submissions[0]
                        .submission
                        .created_at
                        .cmp(&a.submissions[0].submission.created_at)
                });
                Ok(groups)
            })
            .await
    }
}
