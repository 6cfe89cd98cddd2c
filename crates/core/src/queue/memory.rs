//! In-process collaborator implementations.
//!
//! [`InMemoryQueue`] implements both [`AssignmentStore`] and
//! [`CatalogRegistry`] behind a single mutex, so queue positions and slot
//! checks are atomic exactly like the PostgreSQL adapter.
//! [`InMemoryContentStore`] and [`RecordingNotifier`] complete the set.
//! Used by the test suites and for running the API without a database.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::access_window::AccessWindowPolicy;
use crate::assignment::state_machine::can_transition;
use crate::assignment::{AccessKind, Assignment, AssignmentStatus, NewAssignment};
use crate::catalog::{Campaign, ReaderProfile};
use crate::error::CoreError;
use crate::range::ByteRange;
use crate::types::{DbId, Timestamp};

use super::ports::{
    AdmissionNotice, ArtifactMeta, ArtifactReader, AssignmentFilter, AssignmentStore,
    CampaignFilter, CatalogRegistry, ContentStore, Notifier,
};

// ---------------------------------------------------------------------------
// Assignment store + registry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct QueueState {
    next_id: DbId,
    assignments: Vec<Assignment>,
    campaigns: Vec<Campaign>,
    readers: Vec<ReaderProfile>,
    completed_reviews: HashMap<(DbId, DbId), i64>,
    last_issued_position: HashMap<DbId, i32>,
}

impl QueueState {
    fn queued_count(&self, campaign_id: DbId) -> i64 {
        self.assignments
            .iter()
            .filter(|a| a.campaign_id == campaign_id && a.status.is_queued())
            .count() as i64
    }

    fn owned_mut(&mut self, assignment_id: DbId, reader_profile_id: DbId) -> Option<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|a| a.id == assignment_id && a.reader_profile_id == reader_profile_id)
    }
}

/// Mutex-guarded assignment store and campaign/reader registry.
#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>, CoreError> {
        self.state
            .lock()
            .map_err(|_| CoreError::Internal("in-memory queue lock poisoned".into()))
    }

    pub fn add_campaign(&self, campaign: Campaign) -> Result<(), CoreError> {
        self.lock()?.campaigns.push(campaign);
        Ok(())
    }

    pub fn add_reader(&self, reader: ReaderProfile) -> Result<(), CoreError> {
        self.lock()?.readers.push(reader);
        Ok(())
    }

    pub fn set_completed_reviews(
        &self,
        reader_profile_id: DbId,
        campaign_id: DbId,
        count: i64,
    ) -> Result<(), CoreError> {
        self.lock()?
            .completed_reviews
            .insert((reader_profile_id, campaign_id), count);
        Ok(())
    }

    /// Fetch any assignment regardless of owner.
    pub fn get(&self, assignment_id: DbId) -> Result<Option<Assignment>, CoreError> {
        Ok(self
            .lock()?
            .assignments
            .iter()
            .find(|a| a.id == assignment_id)
            .cloned())
    }

    /// Delete an assignment outright, as an administrative purge would.
    /// Returns whether it existed.
    pub fn remove(&self, assignment_id: DbId) -> Result<bool, CoreError> {
        let mut state = self.lock()?;
        let before = state.assignments.len();
        state.assignments.retain(|a| a.id != assignment_id);
        Ok(state.assignments.len() != before)
    }

    /// Apply an arbitrary edit to a stored assignment, standing in for the
    /// external scheduler and review pipeline.
    pub fn update<F>(&self, assignment_id: DbId, edit: F) -> Result<Assignment, CoreError>
    where
        F: FnOnce(&mut Assignment),
    {
        let mut state = self.lock()?;
        let assignment = state
            .assignments
            .iter_mut()
            .find(|a| a.id == assignment_id)
            .ok_or(CoreError::NotFound {
                entity: "Assignment",
                id: assignment_id,
            })?;
        edit(assignment);
        Ok(assignment.clone())
    }

    /// Release materials the way the distribution scheduler does:
    /// `Approved`, released at `at`, windows from `policy`.
    pub fn release_materials(
        &self,
        assignment_id: DbId,
        at: Timestamp,
        policy: &AccessWindowPolicy,
    ) -> Result<Assignment, CoreError> {
        self.update(assignment_id, |a| {
            let windows = policy.release_windows(a.format, at);
            a.status = AssignmentStatus::Approved;
            a.materials_released_at = Some(at);
            a.deadline_at = windows.deadline_at;
            a.materials_expires_at = windows.materials_expires_at;
            a.updated_at = at;
        })
    }
}

#[async_trait]
impl AssignmentStore for InMemoryQueue {
    async fn find_for_reader(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
    ) -> Result<Option<Assignment>, CoreError> {
        Ok(self
            .lock()?
            .owned_mut(assignment_id, reader_profile_id)
            .cloned())
    }

    async fn find_slot_holder(
        &self,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<Option<Assignment>, CoreError> {
        Ok(self
            .lock()?
            .assignments
            .iter()
            .find(|a| {
                a.reader_profile_id == reader_profile_id
                    && a.campaign_id == campaign_id
                    && a.status.holds_slot()
            })
            .cloned())
    }

    async fn create_waiting(&self, input: &NewAssignment) -> Result<Assignment, CoreError> {
        let mut state = self.lock()?;

        let duplicate = state.assignments.iter().any(|a| {
            a.reader_profile_id == input.reader_profile_id
                && a.campaign_id == input.campaign_id
                && a.status.holds_slot()
        });
        if duplicate {
            return Err(CoreError::Conflict(
                "Reader already holds an active assignment for this campaign".into(),
            ));
        }

        let counted = state.queued_count(input.campaign_id) as i32 + 1;
        let last = state
            .last_issued_position
            .get(&input.campaign_id)
            .copied()
            .unwrap_or(0);
        let queue_position = counted.max(last + 1);
        state
            .last_issued_position
            .insert(input.campaign_id, queue_position);

        state.next_id += 1;
        let now = Utc::now();
        let assignment = Assignment {
            id: state.next_id,
            campaign_id: input.campaign_id,
            reader_profile_id: input.reader_profile_id,
            status: AssignmentStatus::Waiting,
            format: input.format,
            source_profile_id: input.source_profile_id,
            queue_position,
            scheduled_week: None,
            scheduled_date: None,
            materials_released_at: None,
            materials_expires_at: None,
            deadline_at: None,
            ebook_downloaded_at: None,
            last_audio_access_at: None,
            is_buffer_assignment: input.is_buffer_assignment,
            created_at: now,
            updated_at: now,
        };
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn list_for_reader(
        &self,
        reader_profile_id: DbId,
        filter: &AssignmentFilter,
    ) -> Result<Vec<Assignment>, CoreError> {
        Ok(self
            .lock()?
            .assignments
            .iter()
            .filter(|a| a.reader_profile_id == reader_profile_id && filter.matches(a))
            .cloned()
            .collect())
    }

    async fn count_queued(&self, campaign_id: DbId) -> Result<i64, CoreError> {
        Ok(self.lock()?.queued_count(campaign_id))
    }

    async fn record_access(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
        access: AccessKind,
        at: Timestamp,
    ) -> Result<Option<Assignment>, CoreError> {
        let mut state = self.lock()?;
        let Some(assignment) = state.owned_mut(assignment_id, reader_profile_id) else {
            return Ok(None);
        };
        if can_transition(assignment.status, AssignmentStatus::InProgress) {
            assignment.status = AssignmentStatus::InProgress;
        }
        match access {
            AccessKind::EbookDownload => assignment.ebook_downloaded_at = Some(at),
            AccessKind::AudioAccess => assignment.last_audio_access_at = Some(at),
        }
        assignment.updated_at = at;
        Ok(Some(assignment.clone()))
    }

    async fn withdraw(
        &self,
        assignment_id: DbId,
        reader_profile_id: DbId,
        at: Timestamp,
    ) -> Result<Option<Assignment>, CoreError> {
        let mut state = self.lock()?;
        match state.owned_mut(assignment_id, reader_profile_id) {
            Some(assignment) if can_transition(assignment.status, AssignmentStatus::Cancelled) => {
                assignment.status = AssignmentStatus::Cancelled;
                assignment.updated_at = at;
                Ok(Some(assignment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), CoreError> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl CatalogRegistry for InMemoryQueue {
    async fn find_reader_by_user(&self, user_id: DbId) -> Result<Option<ReaderProfile>, CoreError> {
        Ok(self
            .lock()?
            .readers
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned())
    }

    async fn find_campaign(&self, campaign_id: DbId) -> Result<Option<Campaign>, CoreError> {
        Ok(self
            .lock()?
            .campaigns
            .iter()
            .find(|c| c.id == campaign_id)
            .cloned())
    }

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, CoreError> {
        let mut campaigns: Vec<Campaign> = self
            .lock()?
            .campaigns
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn completed_review_count(
        &self,
        reader_profile_id: DbId,
        campaign_id: DbId,
    ) -> Result<i64, CoreError> {
        Ok(self
            .lock()?
            .completed_reviews
            .get(&(reader_profile_id, campaign_id))
            .copied()
            .unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Content store
// ---------------------------------------------------------------------------

struct StoredArtifact {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// Artifacts held in memory, keyed like the real backends.
#[derive(Default)]
pub struct InMemoryContentStore {
    artifacts: Mutex<HashMap<String, StoredArtifact>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        key: impl Into<String>,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), CoreError> {
        self.artifacts
            .lock()
            .map_err(|_| CoreError::Internal("in-memory content lock poisoned".into()))?
            .insert(
                key.into(),
                StoredArtifact {
                    bytes,
                    content_type: content_type.map(str::to_string),
                },
            );
        Ok(())
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn metadata(&self, key: &str) -> Result<Option<ArtifactMeta>, CoreError> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|_| CoreError::Internal("in-memory content lock poisoned".into()))?;
        Ok(artifacts.get(key).map(|a| ArtifactMeta {
            size: a.bytes.len() as u64,
            content_type: a.content_type.clone(),
        }))
    }

    async fn open(&self, key: &str, range: Option<ByteRange>) -> Result<ArtifactReader, CoreError> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|_| CoreError::Internal("in-memory content lock poisoned".into()))?;
        let artifact = artifacts.get(key).ok_or_else(|| {
            CoreError::Internal(format!("artifact '{key}' disappeared while opening"))
        })?;
        let bytes = match range {
            Some(r) => artifact
                .bytes
                .get(r.start as usize..=r.end as usize)
                .ok_or_else(|| CoreError::Internal(format!("range out of bounds for '{key}'")))?
                .to_vec(),
            None => artifact.bytes.clone(),
        };
        Ok(Box::pin(Cursor::new(bytes)))
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Records every notice; optionally fails each delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<AdmissionNotice>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails after being recorded.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<AdmissionNotice> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn admission_confirmed(&self, notice: &AdmissionNotice) -> Result<(), CoreError> {
        self.sent
            .lock()
            .map_err(|_| CoreError::Internal("notifier lock poisoned".into()))?
            .push(notice.clone());
        if self.fail {
            return Err(CoreError::Internal("SMTP relay unavailable".into()));
        }
        Ok(())
    }
}
