//! Resolution engine
//!
//! The approval protocol. Approving one PENDING submission claims its topic
//! and rejects every sibling PENDING submission for that topic, all inside
//! a single registry transaction: no observer ever sees the topic TAKEN
//! while a sibling is still PENDING, or the winner APPROVED while the topic
//! is still AVAILABLE. Concurrent approvals for the same topic serialize on
//! the write guard; the loser finds the topic already claimed and gets a
//! conflict instead of a second claim.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::ledger::SubmissionDetail;
use crate::registry::{Registry, SubmissionStatus, TopicStatus};
use crate::types::{CathedraError, Result};

/// The approval side of the submission ledger
pub struct Resolution {
    registry: Arc<Registry>,
}

impl Resolution {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Approve a PENDING submission on one of the teacher's own topics:
    /// the submission becomes APPROVED, the topic TAKEN, and every other
    /// PENDING submission for the topic REJECTED, atomically.
    pub async fn approve(&self, submission_id: Uuid, teacher: Uuid) -> Result<SubmissionDetail> {
        let (detail, rejected_siblings) = self
            .registry
            .transact(move |world| {
                let submission = world
                    .submissions
                    .get(&submission_id)
                    .ok_or_else(|| {
                        CathedraError::NotFound("Submission not found.".to_string())
                    })?
                    .clone();
                let topic = world
                    .topics
                    .get(&submission.topic)
                    .ok_or_else(|| {
                        CathedraError::Storage(format!(
                            "submission {} references missing topic {}",
                            submission.id, submission.topic
                        ))
                    })?
                    .clone();
                if topic.teacher != teacher {
                    return Err(CathedraError::NotFound(
                        "Submission not found.".to_string(),
                    ));
                }
                if submission.status != SubmissionStatus::Pending {
                    return Err(CathedraError::Conflict(
                        "This submission is not pending approval.".to_string(),
                    ));
                }
                // Double-claim guard: a PENDING submission can outlive its
                // topic's availability (a sibling's approval, or creation
                // against an already-claimed topic).
                if topic.status != TopicStatus::Available {
                    return Err(CathedraError::Conflict(
                        "This topic is no longer available.".to_string(),
                    ));
                }

                let sibling_ids: Vec<Uuid> = world
                    .submissions
                    .values()
                    .filter(|s| {
                        s.topic == topic.id
                            && s.id != submission_id
                            && s.status == SubmissionStatus::Pending
                    })
                    .map(|s| s.id)
                    .collect();

                world
                    .submission_mut(submission_id)?
                    .transition(SubmissionStatus::Approved)?;
                world.topic_mut(topic.id)?.transition(TopicStatus::Taken)?;
                for id in &sibling_ids {
                    world
                        .submission_mut(*id)?
                        .transition(SubmissionStatus::Rejected)?;
                }

                let submission = world.submission(submission_id)?.clone();
                let detail = SubmissionDetail::load(world, &submission)?;
                Ok((detail, sibling_ids.len()))
            })
            .await?;

        info!(
            submission = %submission_id,
            topic = %detail.topic.topic.id,
            rejected_siblings,
            "Submission approved, topic claimed"
        );
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::ledger::Ledger;
    use crate::registry::MemberRole;

    struct Fixture {
        catalog: Catalog,
        ledger: Ledger,
        resolution: Resolution,
        stream_id: Uuid,
        teacher: Uuid,
        student_a: Uuid,
        student_b: Uuid,
    }

    async fn fixture() -> Fixture {
        let registry = Arc::new(Registry::new());
        registry
            .create_specialty("121", "Software Engineering")
            .await
            .expect("specialty");
        let stream = registry
            .create_stream("SE-2024", "121", "2024-2025", 1, 4)
            .await
            .expect("stream");
        let teacher = Uuid::new_v4();
        let student_a = Uuid::new_v4();
        let student_b = Uuid::new_v4();
        registry
            .enroll(stream.id, teacher, MemberRole::Teacher)
            .await
            .expect("enroll teacher");
        registry
            .enroll(stream.id, student_a, MemberRole::Student)
            .await
            .expect("enroll a");
        registry
            .enroll(stream.id, student_b, MemberRole::Student)
            .await
            .expect("enroll b");
        Fixture {
            catalog: Catalog::new(registry.clone()),
            ledger: Ledger::new(registry.clone()),
            resolution: Resolution::new(registry),
            stream_id: stream.id,
            teacher,
            student_a,
            student_b,
        }
    }

    impl Fixture {
        async fn topic(&self, title: &str) -> Uuid {
            self.catalog
                .create_topic(self.teacher, self.stream_id, title, "Some project.")
                .await
                .expect("topic")
                .topic
                .id
        }
    }

    #[tokio::test]
    async fn test_approve_claims_topic_and_rejects_siblings() {
        let fx = fixture().await;
        let topic = fx.topic("Compilers").await;

        let winner = fx
            .ledger
            .create_submission(fx.student_a, topic, "My plan.")
            .await
            .expect("create");
        let loser = fx
            .ledger
            .create_submission(fx.student_b, topic, "My other plan.")
            .await
            .expect("create");

        let approved = fx
            .resolution
            .approve(winner.submission.id, fx.teacher)
            .await
            .expect("approve");
        assert_eq!(approved.submission.status, SubmissionStatus::Approved);
        assert_eq!(approved.topic.topic.status, TopicStatus::Taken);

        // The sibling was rejected in the same cutover.
        let theirs = fx.ledger.list_mine(fx.student_b).await.expect("list");
        assert_eq!(theirs[0].submission.id, loser.submission.id);
        assert_eq!(theirs[0].submission.status, SubmissionStatus::Rejected);

        // The topic no longer shows as available.
        let open = fx
            .catalog
            .list_available(fx.stream_id, fx.student_a)
            .await
            .expect("list");
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn test_approval_cascade_is_per_topic_not_per_stream() {
        let fx = fixture().await;
        let topic_x = fx.topic("Compilers").await;
        let topic_y = fx.topic("Databases").await;

        let on_x = fx
            .ledger
            .create_submission(fx.student_a, topic_x, "Claim X.")
            .await
            .expect("create");
        fx.ledger
            .create_submission(fx.student_b, topic_y, "Claim Y.")
            .await
            .expect("create");

        fx.resolution
            .approve(on_x.submission.id, fx.teacher)
            .await
            .expect("approve");

        // The other topic's applicant is untouched.
        let theirs = fx.ledger.list_mine(fx.student_b).await.expect("list");
        assert_eq!(theirs[0].submission.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_approve_is_owner_scoped() {
        let fx = fixture().await;
        let topic = fx.topic("Compilers").await;
        let created = fx
            .ledger
            .create_submission(fx.student_a, topic, "My plan.")
            .await
            .expect("create");

        let err = fx
            .resolution
            .approve(created.submission.id, Uuid::new_v4())
            .await
            .expect_err("foreign teacher");
        assert!(matches!(err, CathedraError::NotFound(_)));

        let err = fx
            .resolution
            .approve(Uuid::new_v4(), fx.teacher)
            .await
            .expect_err("absent submission");
        assert!(matches!(err, CathedraError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_approve_requires_pending() {
        let fx = fixture().await;
        let topic = fx.topic("Compilers").await;
        let created = fx
            .ledger
            .create_submission(fx.student_a, topic, "My plan.")
            .await
            .expect("create");

        fx.resolution
            .approve(created.submission.id, fx.teacher)
            .await
            .expect("first approve");

        let err = fx
            .resolution
            .approve(created.submission.id, fx.teacher)
            .await
            .expect_err("already terminal");
        assert!(matches!(err, CathedraError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_approve_refuses_claimed_topic() {
        let fx = fixture().await;
        let topic = fx.topic("Compilers").await;

        let winner = fx
            .ledger
            .create_submission(fx.student_a, topic, "My plan.")
            .await
            .expect("create");
        fx.resolution
            .approve(winner.submission.id, fx.teacher)
            .await
            .expect("approve");

        // Creation against a claimed topic is allowed, but the late claim
        // can never be approved.
        let late = fx
            .ledger
            .create_submission(fx.student_b, topic, "Too late.")
            .await
            .expect("late claim");
        let err = fx
            .resolution
            .approve(late.submission.id, fx.teacher)
            .await
            .expect_err("topic claimed");
        assert!(matches!(err, CathedraError::Conflict(_)));

        // Exactly one approved submission exists for the topic.
        let received = fx.ledger.list_received(fx.teacher).await.expect("list");
        let approved: Vec<_> = received[0]
            .submissions
            .iter()
            .filter(|s| s.submission.status == SubmissionStatus::Approved)
            .collect();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].submission.id, winner.submission.id);
    }
}
