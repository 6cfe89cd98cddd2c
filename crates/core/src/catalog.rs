//! Read-only campaign and reader records owned by the wider platform.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assignment::BookFormat;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

/// Formats a campaign offers to reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignFormat {
    Ebook,
    Audiobook,
    Both,
}

impl CampaignFormat {
    pub fn supports(self, format: BookFormat) -> bool {
        match self {
            Self::Both => true,
            Self::Ebook => format == BookFormat::Ebook,
            Self::Audiobook => format == BookFormat::Audiobook,
        }
    }

    /// The single format offered, or `None` for `Both`.
    pub fn sole_format(self) -> Option<BookFormat> {
        match self {
            Self::Ebook => Some(BookFormat::Ebook),
            Self::Audiobook => Some(BookFormat::Audiobook),
            Self::Both => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ebook => "EBOOK",
            Self::Audiobook => "AUDIOBOOK",
            Self::Both => "BOTH",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "EBOOK" => Ok(Self::Ebook),
            "AUDIOBOOK" => Ok(Self::Audiobook),
            "BOTH" => Ok(Self::Both),
            other => Err(CoreError::Validation(format!(
                "Unknown campaign format '{other}'. Must be one of: EBOOK, AUDIOBOOK, BOTH"
            ))),
        }
    }
}

impl fmt::Display for CampaignFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign lifecycle status. Only `Active` campaigns admit readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub fn is_admitting(self) -> bool {
        self == Self::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "PAUSED" => Ok(Self::Paused),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(CoreError::Internal(format!("Unknown campaign status '{other}'"))),
        }
    }
}

/// A book campaign as seen by the queue.
///
/// The `*_key` fields are opaque content-store keys. They never leave the
/// server.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: DbId,
    pub title: String,
    pub author_display_name: String,
    pub format: CampaignFormat,
    pub status: CampaignStatus,
    /// Target reviews per week; used only for wait estimates.
    pub weekly_review_rate: i32,
    pub ebook_key: Option<String>,
    pub audiobook_key: Option<String>,
    pub synopsis_key: Option<String>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// A reader's stored format preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatPreference {
    Ebook,
    Audiobook,
    /// Flexible: either format is fine.
    Both,
}

impl FormatPreference {
    /// The specific format the reader asked for, if any.
    pub fn specific(self) -> Option<BookFormat> {
        match self {
            Self::Ebook => Some(BookFormat::Ebook),
            Self::Audiobook => Some(BookFormat::Audiobook),
            Self::Both => None,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "EBOOK" => Ok(Self::Ebook),
            "AUDIOBOOK" => Ok(Self::Audiobook),
            "BOTH" => Ok(Self::Both),
            other => Err(CoreError::Internal(format!(
                "Unknown format preference '{other}'"
            ))),
        }
    }
}

/// An external identity a review is attributed to (e.g. a marketplace
/// profile link).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProfile {
    pub id: DbId,
    pub label: String,
    pub created_at: Timestamp,
}

/// A reader profile. `source_profiles` is ordered by registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderProfile {
    pub id: DbId,
    pub user_id: DbId,
    pub display_name: String,
    pub email: String,
    pub preferred_format: Option<FormatPreference>,
    pub source_profiles: Vec<SourceProfile>,
}

impl ReaderProfile {
    pub fn owns_source_profile(&self, source_profile_id: DbId) -> bool {
        self.source_profiles.iter().any(|p| p.id == source_profile_id)
    }
}
