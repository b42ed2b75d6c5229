//! Topic catalog
//!
//! Owns topic records: teacher-scoped CRUD, availability listings, and the
//! deletion freeze for topics that have accumulated submission history.
//! Status changes never go through this component; only the resolution
//! engine moves a topic to TAKEN.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::enrollment::StreamDetail;
use crate::registry::records::MAX_TITLE_LEN;
use crate::registry::{Registry, Topic, TopicStatus, World};
use crate::types::{CathedraError, Result};

/// A topic joined with its stream (and the stream's specialty).
#[derive(Debug, Clone)]
pub struct TopicDetail {
    pub topic: Topic,
    pub stream: StreamDetail,
}

impl TopicDetail {
    pub fn load(world: &World, topic: &Topic) -> Result<Self> {
        let stream = world.streams.get(&topic.stream).ok_or_else(|| {
            CathedraError::Storage(format!(
                "topic {} references missing stream {}",
                topic.id, topic.stream
            ))
        })?;
        Ok(Self {
            topic: topic.clone(),
            stream: StreamDetail::load(world, stream)?,
        })
    }
}

/// Partial update for a topic. Absent fields are left untouched; present
/// fields are validated like their create-time counterparts.
#[derive(Debug, Clone, Default)]
pub struct TopicPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CathedraError::Validation(
            "The 'title' field cannot be empty.".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CathedraError::Validation(format!(
            "The 'title' field must be at most {} characters.",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<String> {
    let description = description.trim();
    if description.is_empty() {
        return Err(CathedraError::Validation(
            "The 'description' field cannot be empty.".to_string(),
        ));
    }
    Ok(description.to_string())
}

/// Topic operations over the registry
pub struct Catalog {
    registry: Arc<Registry>,
}

impl Catalog {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Create an AVAILABLE topic owned by the calling teacher. The teacher
    /// must be enrolled in the stream under the teacher role tag.
    pub async fn create_topic(
        &self,
        teacher: Uuid,
        stream_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<TopicDetail> {
        let title = validate_title(title)?;
        let description = validate_description(description)?;

        let detail = self
            .registry
            .transact(move |world| {
                let stream = world.stream(stream_id)?;
                if !stream.has_teacher(teacher) {
                    return Err(CathedraError::Forbidden(
                        "You are not assigned to this stream.".to_string(),
                    ));
                }
                let topic = Topic {
                    id: Uuid::new_v4(),
                    title,
                    description,
                    status: TopicStatus::Available,
                    teacher,
                    stream: stream_id,
                    created_at: chrono::Utc::now(),
                };
                world.topics.insert(topic.id, topic.clone());
                TopicDetail::load(world, &topic)
            })
            .await?;

        debug!(topic = %detail.topic.id, stream = %stream_id, "Topic created");
        Ok(detail)
    }

    /// Update title/description of an owned topic. Topics owned by other
    /// teachers are reported as absent, not forbidden.
    pub async fn update_topic(
        &self,
        topic_id: Uuid,
        teacher: Uuid,
        patch: TopicPatch,
    ) -> Result<TopicDetail> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let description = patch
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;

        let detail = self
            .registry
            .transact(move |world| {
                let topic = match world.topics.get_mut(&topic_id) {
                    Some(t) if t.teacher == teacher => t,
                    _ => {
                        return Err(CathedraError::NotFound("Topic not found.".to_string()));
                    }
                };
                if let Some(title) = title {
                    topic.title = title;
                }
                if let Some(description) = description {
                    topic.description = description;
                }
                let topic = topic.clone();
                TopicDetail::load(world, &topic)
            })
            .await?;

        debug!(topic = %topic_id, "Topic updated");
        Ok(detail)
    }

    /// Delete an owned topic. Refused once any submission references it,
    /// regardless of submission status.
    pub async fn delete_topic(&self, topic_id: Uuid, teacher: Uuid) -> Result<()> {
        self.registry
            .transact(move |world| {
                match world.topics.get(&topic_id) {
                    Some(t) if t.teacher == teacher => {}
                    _ => {
                        return Err(CathedraError::NotFound("Topic not found.".to_string()));
                    }
                }
                if world.submissions.values().any(|s| s.topic == topic_id) {
                    return Err(CathedraError::Conflict(
                        "Cannot delete a topic that has submissions.".to_string(),
                    ));
                }
                world.topics.remove(&topic_id);
                Ok(())
            })
            .await?;

        debug!(topic = %topic_id, "Topic deleted");
        Ok(())
    }

    /// AVAILABLE topics of a stream, for an enrolled caller, oldest first.
    pub async fn list_available(&self, stream_id: Uuid, caller: Uuid) -> Result<Vec<TopicDetail>> {
        self.registry
            .query(|world| {
                let stream = world.stream(stream_id)?;
                if !stream.has_member(caller) {
                    return Err(CathedraError::Forbidden(
                        "Not authorized to view topics for this stream.".to_string(),
                    ));
                }
                let mut topics: Vec<&Topic> = world
                    .topics
                    .values()
                    .filter(|t| t.stream == stream_id && t.status == TopicStatus::Available)
                    .collect();
                topics.sort_by_key(|t| (t.created_at, t.id));
                topics
                    .into_iter()
                    .map(|t| TopicDetail::load(world, t))
                    .collect()
            })
            .await
    }

    /// The teacher's own topics across streams, filtered by the owning
    /// stream's active flag, oldest first.
    pub async fn list_mine(&self, teacher: Uuid, active: bool) -> Result<Vec<TopicDetail>> {
        self.registry
            .query(|world| {
                let mut topics: Vec<&Topic> = world
                    .topics
                    .values()
                    .filter(|t| t.teacher == teacher)
                    .collect();
                topics.sort_by_key(|t| (t.created_at, t.id));

                let mut out = Vec::new();
                for topic in topics {
                    let detail = TopicDetail::load(world, topic)?;
                    if detail.stream.stream.is_active == active {
                        out.push(detail);
                    }
                }
                Ok(out)
            })
            .await
    }
}
