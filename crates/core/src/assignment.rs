//! Assignment lifecycle types and state machine.
//!
//! An assignment is one reader's claim on reviewing one campaign in one
//! content format. Status IDs match the `assignment_statuses` seed data
//! (1-based SMALLSERIAL) so the database adapter can store them as SMALLINT.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Formats and credits
// ---------------------------------------------------------------------------

/// Credits charged for an ebook assignment.
pub const EBOOK_CREDITS: i32 = 1;

/// Credits charged for an audiobook assignment.
pub const AUDIOBOOK_CREDITS: i32 = 2;

/// Content format a reader is assigned to review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookFormat {
    Ebook,
    Audiobook,
}

impl BookFormat {
    /// Credit cost of reviewing this format. The only source of `credits_value`.
    pub fn credits(self) -> i32 {
        match self {
            Self::Ebook => EBOOK_CREDITS,
            Self::Audiobook => AUDIOBOOK_CREDITS,
        }
    }

    /// Database / wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ebook => "EBOOK",
            Self::Audiobook => "AUDIOBOOK",
        }
    }

    /// Parse from the database / wire name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "EBOOK" => Ok(Self::Ebook),
            "AUDIOBOOK" => Ok(Self::Audiobook),
            other => Err(CoreError::Validation(format!(
                "Unknown book format '{other}'. Must be one of: EBOOK, AUDIOBOOK"
            ))),
        }
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Assignment lifecycle status.
///
/// Initial state is `Waiting`. `Validated`, `Rejected`, `Expired`,
/// `Cancelled` and `Reassigned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Waiting,
    Scheduled,
    Approved,
    InProgress,
    Submitted,
    Validated,
    Rejected,
    Expired,
    Cancelled,
    Reassigned,
}

/// Statuses that release a reader's slot on a campaign.
pub const SLOT_RELEASING_STATUSES: [AssignmentStatus; 3] = [
    AssignmentStatus::Expired,
    AssignmentStatus::Cancelled,
    AssignmentStatus::Reassigned,
];

/// Statuses counted when computing a campaign's queue length.
pub const QUEUED_STATUSES: [AssignmentStatus; 2] =
    [AssignmentStatus::Waiting, AssignmentStatus::Scheduled];

/// Statuses under which released materials may be streamed.
pub const STREAMABLE_STATUSES: [AssignmentStatus; 3] = [
    AssignmentStatus::Approved,
    AssignmentStatus::InProgress,
    AssignmentStatus::Submitted,
];

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 10] = [
        Self::Waiting,
        Self::Scheduled,
        Self::Approved,
        Self::InProgress,
        Self::Submitted,
        Self::Validated,
        Self::Rejected,
        Self::Expired,
        Self::Cancelled,
        Self::Reassigned,
    ];

    /// Database status ID (matches `assignment_statuses` seed order).
    pub fn id(self) -> i16 {
        match self {
            Self::Waiting => 1,
            Self::Scheduled => 2,
            Self::Approved => 3,
            Self::InProgress => 4,
            Self::Submitted => 5,
            Self::Validated => 6,
            Self::Rejected => 7,
            Self::Expired => 8,
            Self::Cancelled => 9,
            Self::Reassigned => 10,
        }
    }

    /// Resolve a database status ID.
    pub fn from_id(id: i16) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| CoreError::Internal(format!("Unknown assignment status id {id}")))
    }

    /// Wire name, e.g. `IN_PROGRESS`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Scheduled => "SCHEDULED",
            Self::Approved => "APPROVED",
            Self::InProgress => "IN_PROGRESS",
            Self::Submitted => "SUBMITTED",
            Self::Validated => "VALIDATED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
            Self::Reassigned => "REASSIGNED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Validated | Self::Rejected | Self::Expired | Self::Cancelled | Self::Reassigned
        )
    }

    /// Whether an assignment in this status still holds the reader's one
    /// slot on its campaign.
    pub fn holds_slot(self) -> bool {
        !SLOT_RELEASING_STATUSES.contains(&self)
    }

    pub fn is_queued(self) -> bool {
        QUEUED_STATUSES.contains(&self)
    }

    pub fn is_streamable(self) -> bool {
        STREAMABLE_STATUSES.contains(&self)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use super::AssignmentStatus::{self, *};

    /// Returns the statuses reachable from `from`.
    ///
    /// `Waiting -> Scheduled -> Approved` is driven by the external
    /// distribution scheduler; this crate performs `Approved -> InProgress`
    /// and `Waiting | Scheduled -> Cancelled`.
    pub fn valid_transitions(from: AssignmentStatus) -> &'static [AssignmentStatus] {
        match from {
            Waiting => &[Scheduled, Cancelled, Expired, Reassigned],
            Scheduled => &[Approved, Cancelled, Expired, Reassigned],
            Approved => &[InProgress, Expired, Reassigned],
            InProgress => &[Submitted, Expired, Reassigned],
            Submitted => &[Validated, Rejected],
            Validated | Rejected | Expired | Cancelled | Reassigned => &[],
        }
    }

    pub fn can_transition(from: AssignmentStatus, to: AssignmentStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a transition, returning an error message for invalid ones.
    pub fn validate_transition(from: AssignmentStatus, to: AssignmentStatus) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!("Invalid transition: {from} -> {to}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Content kinds
// ---------------------------------------------------------------------------

/// Artifact a reader may stream for an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Ebook,
    Audiobook,
    Synopsis,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ebook => "ebook",
            Self::Audiobook => "audiobook",
            Self::Synopsis => "synopsis",
        }
    }

    /// The format an assignment must have to stream this kind.
    /// `None` for the synopsis, which every format may read.
    pub fn required_format(self) -> Option<BookFormat> {
        match self {
            Self::Ebook => Some(BookFormat::Ebook),
            Self::Audiobook => Some(BookFormat::Audiobook),
            Self::Synopsis => None,
        }
    }

    /// Last path segment of the same-origin streaming route.
    pub fn stream_segment(self) -> &'static str {
        match self {
            Self::Ebook => "stream-ebook",
            Self::Audiobook => "stream-audio",
            Self::Synopsis => "stream-synopsis",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which access timestamp a content access refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Sets `ebook_downloaded_at`.
    EbookDownload,
    /// Sets `last_audio_access_at`.
    AudioAccess,
}

impl AccessKind {
    pub fn for_format(format: BookFormat) -> Self {
        match format {
            BookFormat::Ebook => Self::EbookDownload,
            BookFormat::Audiobook => Self::AudioAccess,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A persisted assignment.
///
/// Deliberately not `Serialize`: outward representations go through
/// [`crate::queue::view::AssignmentView`], which has no buffer flag and no
/// storage locators.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: DbId,
    pub campaign_id: DbId,
    pub reader_profile_id: DbId,
    pub status: AssignmentStatus,
    pub format: BookFormat,
    /// The content-source profile the review will be attributed to.
    pub source_profile_id: DbId,
    pub queue_position: i32,
    pub scheduled_week: Option<i32>,
    pub scheduled_date: Option<chrono::NaiveDate>,
    pub materials_released_at: Option<Timestamp>,
    pub materials_expires_at: Option<Timestamp>,
    pub deadline_at: Option<Timestamp>,
    pub ebook_downloaded_at: Option<Timestamp>,
    pub last_audio_access_at: Option<Timestamp>,
    pub is_buffer_assignment: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Assignment {
    pub fn credits_value(&self) -> i32 {
        self.format.credits()
    }
}

/// Input for creating a `Waiting` assignment. The store assigns the id and
/// the queue position.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub campaign_id: DbId,
    pub reader_profile_id: DbId,
    pub format: BookFormat,
    pub source_profile_id: DbId,
    pub is_buffer_assignment: bool,
}

impl NewAssignment {
    pub fn credits_value(&self) -> i32 {
        self.format.credits()
    }
}
