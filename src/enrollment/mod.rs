//! Enrollment registry
//!
//! Read-side membership queries over stream member sets. Enrollment
//! mutations are administrative operations on the registry itself; this
//! component only answers "who belongs where."

use std::sync::Arc;

use uuid::Uuid;

use crate::registry::{MemberRole, Registry, Specialty, Stream, World};
use crate::types::{CathedraError, Result};

/// A stream joined with its specialty record, ready for serialization.
#[derive(Debug, Clone)]
pub struct StreamDetail {
    pub stream: Stream,
    pub specialty: Specialty,
}

impl StreamDetail {
    /// Join a stream with its specialty. A dangling specialty reference can
    /// only come from a hand-edited or corrupted snapshot, so it surfaces
    /// as a storage fault rather than a not-found.
    pub fn load(world: &World, stream: &Stream) -> Result<Self> {
        let specialty = world
            .specialties
            .get(&stream.specialty_code)
            .cloned()
            .ok_or_else(|| {
                CathedraError::Storage(format!(
                    "stream {} references missing specialty {}",
                    stream.id, stream.specialty_code
                ))
            })?;
        Ok(Self {
            stream: stream.clone(),
            specialty,
        })
    }
}

/// Membership queries over the registry
pub struct Enrollment {
    registry: Arc<Registry>,
}

impl Enrollment {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Whether the identity is enrolled in the stream under any role.
    pub async fn is_member(&self, stream_id: Uuid, identity_id: Uuid) -> Result<bool> {
        self.registry
            .query(|world| Ok(world.stream(stream_id)?.has_member(identity_id)))
            .await
    }

    /// The identity's role tag in the stream, if enrolled.
    pub async fn member_role(
        &self,
        stream_id: Uuid,
        identity_id: Uuid,
    ) -> Result<Option<MemberRole>> {
        self.registry
            .query(|world| Ok(world.stream(stream_id)?.member_role(identity_id)))
            .await
    }

    /// The streams an identity is enrolled in, filtered by active flag,
    /// oldest first.
    pub async fn streams_for(&self, identity_id: Uuid, active: bool) -> Result<Vec<StreamDetail>> {
        self.registry
            .query(|world| {
                let mut streams: Vec<&Stream> = world
                    .streams
                    .values()
                    .filter(|s| s.is_active == active && s.has_member(identity_id))
                    .collect();
                streams.sort_by_key(|s| (s.created_at, s.id));
                streams
                    .into_iter()
                    .map(|s| StreamDetail::load(world, s))
                    .collect()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (Arc<Registry>, Uuid, Uuid) {
        let registry = Arc::new(Registry::new());
        registry
            .create_specialty("121", "Software Engineering")
            .await
            .expect("specialty");
        let stream = registry
            .create_stream("SE-2024", "121", "2024-2025", 1, 4)
            .await
            .expect("stream");
        let student = Uuid::new_v4();
        registry
            .enroll(stream.id, student, MemberRole::Student)
            .await
            .expect("enroll");
        (registry, stream.id, student)
    }

    #[tokio::test]
    async fn test_is_member_and_role() {
        let (registry, stream_id, student) = seeded().await;
        let enrollment = Enrollment::new(registry);

        assert!(enrollment.is_member(stream_id, student).await.expect("query"));
        assert!(!enrollment
            .is_member(stream_id, Uuid::new_v4())
            .await
            .expect("query"));
        assert_eq!(
            enrollment.member_role(stream_id, student).await.expect("query"),
            Some(MemberRole::Student)
        );
    }

    #[tokio::test]
    async fn test_unknown_stream_is_not_found() {
        let (registry, _, student) = seeded().await;
        let enrollment = Enrollment::new(registry);

        let err = enrollment
            .is_member(Uuid::new_v4(), student)
            .await
            .expect_err("absent stream");
        assert!(matches!(err, CathedraError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_streams_for_filters_by_active_flag() {
        let (registry, stream_id, student) = seeded().await;
        let inactive = registry
            .create_stream("SE-2023", "121", "2023-2024", 2, 3)
            .await
            .expect("stream");
        registry
            .enroll(inactive.id, student, MemberRole::Student)
            .await
            .expect("enroll");
        registry
            .set_stream_active(inactive.id, false)
            .await
            .expect("deactivate");

        let enrollment = Enrollment::new(registry);

        let active = enrollment.streams_for(student, true).await.expect("query");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].stream.id, stream_id);
        assert_eq!(active[0].specialty.code, "121");

        let dormant = enrollment.streams_for(student, false).await.expect("query");
        assert_eq!(dormant.len(), 1);
        assert_eq!(dormant[0].stream.id, inactive.id);
    }

    #[tokio::test]
    async fn test_streams_for_excludes_non_member_streams() {
        let (registry, _, _) = seeded().await;
        let enrollment = Enrollment::new(registry);

        let outsider = Uuid::new_v4();
        let streams = enrollment.streams_for(outsider, true).await.expect("query");
        assert!(streams.is_empty());
    }
}
