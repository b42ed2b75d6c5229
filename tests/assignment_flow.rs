//! End-to-end workflow tests for the assignment lifecycle
//!
//! These drive the components the way the route handlers do: enrollment,
//! catalog, ledger, and resolution sharing one registry.

use std::sync::Arc;

use uuid::Uuid;

use cathedra::catalog::Catalog;
use cathedra::enrollment::Enrollment;
use cathedra::ledger::{Ledger, Resolution};
use cathedra::registry::{MemberRole, Registry, SubmissionStatus, TopicStatus};
use cathedra::types::CathedraError;

struct World {
    registry: Arc<Registry>,
    enrollment: Enrollment,
    catalog: Catalog,
    ledger: Ledger,
    resolution: Resolution,
    stream_id: Uuid,
    teacher: Uuid,
    student_a: Uuid,
    student_b: Uuid,
}

async fn world() -> World {
    let registry = Arc::new(Registry::new());
    registry
        .create_specialty("121", "Software Engineering")
        .await
        .expect("specialty");
    let stream = registry
        .create_stream("SE-2025", "121", "2025-2026", 1, 4)
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

    World {
        enrollment: Enrollment::new(Arc::clone(&registry)),
        catalog: Catalog::new(Arc::clone(&registry)),
        ledger: Ledger::new(Arc::clone(&registry)),
        resolution: Resolution::new(Arc::clone(&registry)),
        registry,
        stream_id: stream.id,
        teacher,
        student_a,
        student_b,
    }
}

impl World {
    async fn topic(&self, title: &str) -> Uuid {
        self.catalog
            .create_topic(self.teacher, self.stream_id, title, "A project.")
            .await
            .expect("topic")
            .topic
            .id
    }
}

#[tokio::test]
async fn full_assignment_lifecycle() {
    let w = world().await;

    // The teacher offers two topics; students see both as available.
    let topic_x = w.topic("Compilers").await;
    let topic_y = w.topic("Databases").await;

    assert!(w
        .enrollment
        .is_member(w.stream_id, w.student_a)
        .await
        .expect("membership"));

    let open = w
        .catalog
        .list_available(w.stream_id, w.student_a)
        .await
        .expect("list");
    assert_eq!(open.len(), 2);

    // A applies to X, B applies to Y (different topic, same stream).
    let a_sub = w
        .ledger
        .create_submission(w.student_a, topic_x, "I will build a compiler.")
        .await
        .expect("a submits");
    let b_sub = w
        .ledger
        .create_submission(w.student_b, topic_y, "I will build a database.")
        .await
        .expect("b submits");

    // Approving A claims X and leaves B untouched: the cascade is scoped
    // to the topic, not the stream.
    let approved = w
        .resolution
        .approve(a_sub.submission.id, w.teacher)
        .await
        .expect("approve");
    assert_eq!(approved.submission.status, SubmissionStatus::Approved);
    assert_eq!(approved.topic.topic.status, TopicStatus::Taken);

    let b_mine = w.ledger.list_mine(w.student_b).await.expect("list");
    assert_eq!(b_mine[0].submission.id, b_sub.submission.id);
    assert_eq!(b_mine[0].submission.status, SubmissionStatus::Pending);

    // X has left the available listing; Y remains.
    let open = w
        .catalog
        .list_available(w.stream_id, w.student_b)
        .await
        .expect("list");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].topic.id, topic_y);
}

#[tokio::test]
async fn uniqueness_holds_across_topics_in_a_stream() {
    let w = world().await;
    let topic_x = w.topic("Compilers").await;
    let topic_y = w.topic("Databases").await;

    w.ledger
        .create_submission(w.student_a, topic_x, "First claim.")
        .await
        .expect("first");

    let err = w
        .ledger
        .create_submission(w.student_a, topic_y, "Second claim.")
        .await
        .expect_err("blocked while pending");
    assert!(err.is_conflict());

    // Withdrawing the pending claim reopens the door.
    let mine = w.ledger.list_mine(w.student_a).await.expect("list");
    w.ledger
        .withdraw(mine[0].submission.id, w.student_a)
        .await
        .expect("withdraw");

    w.ledger
        .create_submission(w.student_a, topic_y, "Second claim.")
        .await
        .expect("allowed after withdrawal");
}

#[tokio::test]
async fn approval_rejects_siblings_and_is_terminal() {
    let w = world().await;
    let topic = w.topic("Compilers").await;

    let a_sub = w
        .ledger
        .create_submission(w.student_a, topic, "Plan A.")
        .await
        .expect("a submits");
    let b_sub = w
        .ledger
        .create_submission(w.student_b, topic, "Plan B.")
        .await
        .expect("b submits");

    w.resolution
        .approve(a_sub.submission.id, w.teacher)
        .await
        .expect("approve");

    // The sibling was auto-rejected by the same cutover.
    let b_mine = w.ledger.list_mine(w.student_b).await.expect("list");
    assert_eq!(b_mine[0].submission.status, SubmissionStatus::Rejected);

    // Terminal states refuse every further transition.
    let err = w
        .resolution
        .approve(b_sub.submission.id, w.teacher)
        .await
        .expect_err("rejected is terminal");
    assert!(err.is_conflict());

    let err = w
        .ledger
        .reject(a_sub.submission.id, w.teacher)
        .await
        .expect_err("approved is terminal");
    assert!(err.is_conflict());

    let err = w
        .ledger
        .withdraw(b_sub.submission.id, w.student_b)
        .await
        .expect_err("rejected submissions stay on record");
    assert!(err.is_conflict());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_admit_exactly_one_winner() {
    let w = world().await;
    let topic = w.topic("Compilers").await;

    let c = w
        .ledger
        .create_submission(w.student_a, topic, "Plan C.")
        .await
        .expect("c submits");
    let d = w
        .ledger
        .create_submission(w.student_b, topic, "Plan D.")
        .await
        .expect("d submits");

    let resolution = Arc::new(Resolution::new(Arc::clone(&w.registry)));

    let r1 = Arc::clone(&resolution);
    let teacher = w.teacher;
    let c_id = c.submission.id;
    let first = tokio::spawn(async move { r1.approve(c_id, teacher).await });

    let r2 = Arc::clone(&resolution);
    let d_id = d.submission.id;
    let second = tokio::spawn(async move { r2.approve(d_id, teacher).await });

    let outcomes = [first.await.expect("join"), second.await.expect("join")];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(CathedraError::Conflict(_))))
        .count();
    assert_eq!(wins, 1, "exactly one approval must commit");
    assert_eq!(conflicts, 1, "the loser must surface a conflict");

    // Final state: topic TAKEN, exactly one APPROVED submission.
    let received = w.ledger.list_received(w.teacher).await.expect("list");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].topic.topic.status, TopicStatus::Taken);
    let approved = received[0]
        .submissions
        .iter()
        .filter(|s| s.submission.status == SubmissionStatus::Approved)
        .count();
    assert_eq!(approved, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creations_by_one_student_admit_one_submission() {
    let w = world().await;
    let topic_x = w.topic("Compilers").await;
    let topic_y = w.topic("Databases").await;

    // One student races two applications into the same stream; the
    // uniqueness check and the insert share a transaction, so exactly one
    // may commit.
    let ledger = Arc::new(Ledger::new(Arc::clone(&w.registry)));
    let student = w.student_a;

    let l1 = Arc::clone(&ledger);
    let first =
        tokio::spawn(async move { l1.create_submission(student, topic_x, "Claim X.").await });

    let l2 = Arc::clone(&ledger);
    let second =
        tokio::spawn(async move { l2.create_submission(student, topic_y, "Claim Y.").await });

    let outcomes = [first.await.expect("join"), second.await.expect("join")];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(CathedraError::Conflict(_))))
        .count();
    assert_eq!(wins, 1, "exactly one creation must commit");
    assert_eq!(conflicts, 1, "the loser must surface a conflict");
    assert_eq!(w.registry.stats().await.submissions, 1);

    // The committed submission is the student's single active claim.
    let mine = ledger.list_mine(student).await.expect("list");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].submission.status, SubmissionStatus::Pending);
}

#[tokio::test]
async fn topic_with_history_is_frozen_and_stream_delete_cascades() {
    let w = world().await;
    let topic = w.topic("Compilers").await;

    let sub = w
        .ledger
        .create_submission(w.student_a, topic, "A plan.")
        .await
        .expect("submit");

    // Even a rejected submission freezes the topic.
    w.ledger
        .reject(sub.submission.id, w.teacher)
        .await
        .expect("reject");
    let err = w
        .catalog
        .delete_topic(topic, w.teacher)
        .await
        .expect_err("history freeze");
    assert!(err.is_conflict());
    assert_eq!(w.registry.stats().await.topics, 1);

    // Deleting the stream removes everything beneath it.
    w.registry.delete_stream(w.stream_id).await.expect("delete");
    let stats = w.registry.stats().await;
    assert_eq!(stats.streams, 0);
    assert_eq!(stats.topics, 0);
    assert_eq!(stats.submissions, 0);
}

#[tokio::test]
async fn snapshot_survives_restart_mid_workflow() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("registry.json");

    let teacher = Uuid::new_v4();
    let student = Uuid::new_v4();
    let (stream_id, submission_id);

    {
        let registry = Arc::new(Registry::with_snapshot(&path).expect("open"));
        registry
            .create_specialty("121", "Software Engineering")
            .await
            .expect("specialty");
        let stream = registry
            .create_stream("SE-2025", "121", "2025-2026", 1, 4)
            .await
            .expect("stream");
        stream_id = stream.id;
        registry
            .enroll(stream_id, teacher, MemberRole::Teacher)
            .await
            .expect("enroll teacher");
        registry
            .enroll(stream_id, student, MemberRole::Student)
            .await
            .expect("enroll student");

        let catalog = Catalog::new(Arc::clone(&registry));
        let ledger = Ledger::new(Arc::clone(&registry));
        let topic = catalog
            .create_topic(teacher, stream_id, "Compilers", "A project.")
            .await
            .expect("topic");
        submission_id = ledger
            .create_submission(student, topic.topic.id, "A plan.")
            .await
            .expect("submit")
            .submission
            .id;
    }

    // A new process picks up the pending submission and resolves it.
    let registry = Arc::new(Registry::with_snapshot(&path).expect("reopen"));
    let resolution = Resolution::new(Arc::clone(&registry));
    let approved = resolution
        .approve(submission_id, teacher)
        .await
        .expect("approve after restart");
    assert_eq!(approved.submission.status, SubmissionStatus::Approved);
    assert_eq!(approved.topic.topic.status, TopicStatus::Taken);
    assert_eq!(approved.topic.stream.stream.id, stream_id);
}
