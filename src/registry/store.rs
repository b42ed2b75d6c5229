//! Registry store
//!
//! Authoritative in-memory state behind an async `RwLock`. Mutations run as
//! copy-on-write transactions: the closure operates on a clone of the world
//! under the write guard, the clone is persisted to the snapshot (when one
//! is configured), and only then swapped in. A failed operation or a failed
//! snapshot write leaves the committed state untouched.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::registry::records::{MemberRole, Specialty, Stream, Submission, Topic};
use crate::registry::snapshot::Snapshot;
use crate::types::{CathedraError, Result};

/// Complete registry state. Cloned wholesale for each transaction and
/// serialized as-is into the snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    pub specialties: HashMap<String, Specialty>,
    pub streams: HashMap<Uuid, Stream>,
    pub topics: HashMap<Uuid, Topic>,
    pub submissions: HashMap<Uuid, Submission>,
}

impl World {
    pub fn specialty(&self, code: &str) -> Result<&Specialty> {
        self.specialties
            .get(code)
            .ok_or_else(|| CathedraError::NotFound("Specialty not found.".to_string()))
    }

    pub fn stream(&self, id: Uuid) -> Result<&Stream> {
        self.streams
            .get(&id)
            .ok_or_else(|| CathedraError::NotFound("Stream not found.".to_string()))
    }

    pub fn stream_mut(&mut self, id: Uuid) -> Result<&mut Stream> {
        self.streams
            .get_mut(&id)
            .ok_or_else(|| CathedraError::NotFound("Stream not found.".to_string()))
    }

    pub fn topic(&self, id: Uuid) -> Result<&Topic> {
        self.topics
            .get(&id)
            .ok_or_else(|| CathedraError::NotFound("Topic not found.".to_string()))
    }

    pub fn topic_mut(&mut self, id: Uuid) -> Result<&mut Topic> {
        self.topics
            .get_mut(&id)
            .ok_or_else(|| CathedraError::NotFound("Topic not found.".to_string()))
    }

    pub fn submission(&self, id: Uuid) -> Result<&Submission> {
        self.submissions
            .get(&id)
            .ok_or_else(|| CathedraError::NotFound("Submission not found.".to_string()))
    }

    pub fn submission_mut(&mut self, id: Uuid) -> Result<&mut Submission> {
        self.submissions
            .get_mut(&id)
            .ok_or_else(|| CathedraError::NotFound("Submission not found.".to_string()))
    }
}

/// Record counts for readiness reporting
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegistryStats {
    pub specialties: usize,
    pub streams: usize,
    pub topics: usize,
    pub submissions: usize,
}

/// Transactional store for all specialty/stream/topic/submission records
pub struct Registry {
    world: RwLock<World>,
    snapshot: Option<Snapshot>,
}

impl Registry {
    /// Create an empty in-memory registry with no durable snapshot.
    pub fn new() -> Self {
        Self {
            world: RwLock::new(World::default()),
            snapshot: None,
        }
    }

    /// Create a registry backed by a snapshot file, restoring any state the
    /// file already holds.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self> {
        let snapshot = Snapshot::new(path);
        let world = snapshot.load()?.unwrap_or_default();

        info!(
            path = %snapshot.path().display(),
            streams = world.streams.len(),
            topics = world.topics.len(),
            submissions = world.submissions.len(),
            "Registry opened with snapshot"
        );

        Ok(Self {
            world: RwLock::new(world),
            snapshot: Some(snapshot),
        })
    }

    /// Run a mutating operation as one serializable transaction.
    ///
    /// The closure receives a clone of the world; the clone replaces the
    /// committed state only if the closure and the snapshot write both
    /// succeed. Holding the write guard for the whole read-check-write
    /// sequence is what serializes concurrent mutations. The file write
    /// runs on the blocking pool so it does not stall an executor thread;
    /// the guard stays held across it, preserving atomicity.
    pub async fn transact<T>(&self, f: impl FnOnce(&mut World) -> Result<T>) -> Result<T> {
        let mut guard = self.world.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Some(snapshot) = &self.snapshot {
            let snapshot = snapshot.clone();
            let (returned, persisted) = tokio::task::spawn_blocking(move || {
                let persisted = snapshot.persist(&next);
                (next, persisted)
            })
            .await
            .map_err(|e| CathedraError::Storage(format!("snapshot write task failed: {}", e)))?;
            persisted?;
            next = returned;
        }
        *guard = next;
        Ok(out)
    }

    /// Run a read query under the shared read guard.
    pub async fn query<T>(&self, f: impl FnOnce(&World) -> Result<T>) -> Result<T> {
        let guard = self.world.read().await;
        f(&guard)
    }

    pub async fn stats(&self) -> RegistryStats {
        let world = self.world.read().await;
        RegistryStats {
            specialties: world.specialties.len(),
            streams: world.streams.len(),
            topics: world.topics.len(),
            submissions: world.submissions.len(),
        }
    }

    // --- administrative lifecycle ---

    pub async fn create_specialty(&self, code: &str, name: &str) -> Result<Specialty> {
        let code = code.trim().to_string();
        let name = name.trim().to_string();
        if code.is_empty() {
            return Err(CathedraError::Validation(
                "The 'code' field cannot be empty.".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(CathedraError::Validation(
                "The 'name' field cannot be empty.".to_string(),
            ));
        }

        let specialty = self
            .transact(move |world| {
                if world.specialties.contains_key(&code) {
                    return Err(CathedraError::Conflict(
                        "A specialty with this code already exists.".to_string(),
                    ));
                }
                let specialty = Specialty {
                    code: code.clone(),
                    name,
                };
                world.specialties.insert(code, specialty.clone());
                Ok(specialty)
            })
            .await?;

        debug!(code = %specialty.code, "Specialty created");
        Ok(specialty)
    }

    pub async fn delete_specialty(&self, code: &str) -> Result<()> {
        let code = code.to_string();
        self.transact(move |world| {
            world.specialty(&code)?;
            if world.streams.values().any(|s| s.specialty_code == code) {
                return Err(CathedraError::Conflict(
                    "Cannot delete a specialty that is referenced by streams.".to_string(),
                ));
            }
            world.specialties.remove(&code);
            Ok(())
        })
        .await?;

        debug!("Specialty deleted");
        Ok(())
    }

    pub async fn create_stream(
        &self,
        name: &str,
        specialty_code: &str,
        academic_year: &str,
        semester: u8,
        course_number: u8,
    ) -> Result<Stream> {
        let name = name.trim().to_string();
        let academic_year = academic_year.trim().to_string();
        if name.is_empty() {
            return Err(CathedraError::Validation(
                "The 'name' field cannot be empty.".to_string(),
            ));
        }
        if academic_year.is_empty() {
            return Err(CathedraError::Validation(
                "The 'academicYear' field cannot be empty.".to_string(),
            ));
        }
        let specialty_code = specialty_code.to_string();

        let stream = self
            .transact(move |world| {
                world.specialty(&specialty_code)?;
                let stream = Stream {
                    id: Uuid::new_v4(),
                    name,
                    academic_year,
                    semester,
                    course_number,
                    specialty_code,
                    is_active: true,
                    members: HashMap::new(),
                    created_at: chrono::Utc::now(),
                };
                world.streams.insert(stream.id, stream.clone());
                Ok(stream)
            })
            .await?;

        debug!(stream = %stream.id, name = %stream.name, "Stream created");
        Ok(stream)
    }

    pub async fn set_stream_active(&self, stream_id: Uuid, active: bool) -> Result<Stream> {
        let stream = self
            .transact(move |world| {
                let stream = world.stream_mut(stream_id)?;
                stream.is_active = active;
                Ok(stream.clone())
            })
            .await?;

        debug!(stream = %stream_id, active, "Stream active flag updated");
        Ok(stream)
    }

    /// Delete a stream together with its topics and their submissions.
    pub async fn delete_stream(&self, stream_id: Uuid) -> Result<()> {
        let (topics_removed, submissions_removed) = self
            .transact(move |world| {
                if world.streams.remove(&stream_id).is_none() {
                    return Err(CathedraError::NotFound("Stream not found.".to_string()));
                }
                let topic_ids: Vec<Uuid> = world
                    .topics
                    .values()
                    .filter(|t| t.stream == stream_id)
                    .map(|t| t.id)
                    .collect();
                for id in &topic_ids {
                    world.topics.remove(id);
                }
                let before = world.submissions.len();
                world.submissions.retain(|_, s| !topic_ids.contains(&s.topic));
                Ok((topic_ids.len(), before - world.submissions.len()))
            })
            .await?;

        info!(
            stream = %stream_id,
            topics_removed,
            submissions_removed,
            "Stream deleted"
        );
        Ok(())
    }

    /// Enroll an identity in a stream. Re-enrolling updates the role tag.
    pub async fn enroll(
        &self,
        stream_id: Uuid,
        identity_id: Uuid,
        role: MemberRole,
    ) -> Result<Stream> {
        let stream = self
            .transact(move |world| {
                let stream = world.stream_mut(stream_id)?;
                stream.members.insert(identity_id, role);
                Ok(stream.clone())
            })
            .await?;

        debug!(stream = %stream_id, member = %identity_id, %role, "Member enrolled");
        Ok(stream)
    }

    pub async fn unenroll(&self, stream_id: Uuid, identity_id: Uuid) -> Result<Stream> {
        let stream = self
            .transact(move |world| {
                let stream = world.stream_mut(stream_id)?;
                if stream.members.remove(&identity_id).is_none() {
                    return Err(CathedraError::NotFound(
                        "Member not found in this stream.".to_string(),
                    ));
                }
                Ok(stream.clone())
            })
            .await?;

        debug!(stream = %stream_id, member = %identity_id, "Member unenrolled");
        Ok(stream)
    }

    /// All streams, oldest first, for administrative inspection.
    pub async fn list_streams(&self) -> Vec<Stream> {
        let world = self.world.read().await;
        let mut streams: Vec<Stream> = world.streams.values().cloned().collect();
        streams.sort_by_key(|s| (s.created_at, s.id));
        streams
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
