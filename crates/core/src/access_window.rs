//! Per-format access windows for released materials.
//!
//! Every rule about how long released content stays readable lives in
//! [`AccessWindowPolicy`]: the content gateway, the assignment view, and the
//! release hook used by the scheduler all go through it.

use chrono::Duration;

use crate::assignment::{Assignment, BookFormat, ContentKind};
use crate::error::CoreError;
use crate::types::Timestamp;

/// Default ebook submission deadline after release (hours).
pub const DEFAULT_EBOOK_DEADLINE_HOURS: i64 = 72;

/// Default audiobook access window after release (days).
pub const DEFAULT_AUDIOBOOK_WINDOW_DAYS: i64 = 7;

/// Deadline fields computed at materials release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseWindows {
    pub deadline_at: Option<Timestamp>,
    pub materials_expires_at: Option<Timestamp>,
}

/// How long each format's materials stay accessible after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessWindowPolicy {
    pub ebook_deadline: Duration,
    pub audiobook_window: Duration,
}

impl Default for AccessWindowPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EBOOK_DEADLINE_HOURS, DEFAULT_AUDIOBOOK_WINDOW_DAYS)
    }
}

impl AccessWindowPolicy {
    pub fn new(ebook_deadline_hours: i64, audiobook_window_days: i64) -> Self {
        Self {
            ebook_deadline: Duration::hours(ebook_deadline_hours),
            audiobook_window: Duration::days(audiobook_window_days),
        }
    }

    /// The format whose window governs `kind`. A synopsis follows the
    /// assignment's own format.
    fn governing_format(kind: ContentKind, assignment: &Assignment) -> BookFormat {
        kind.required_format().unwrap_or(assignment.format)
    }

    /// The instant access to `kind` closes, or `None` when no limit applies.
    ///
    /// - ebook: `deadline_at`; unset means the scheduler has not computed it
    ///   yet and access stays open.
    /// - audiobook: `materials_expires_at`, falling back to release time plus
    ///   the audiobook window.
    pub fn window_end(&self, kind: ContentKind, assignment: &Assignment) -> Option<Timestamp> {
        match Self::governing_format(kind, assignment) {
            BookFormat::Ebook => assignment.deadline_at,
            BookFormat::Audiobook => assignment.materials_expires_at.or_else(|| {
                assignment
                    .materials_released_at
                    .map(|released| released + self.audiobook_window)
            }),
        }
    }

    /// Reject access once the window for `kind` has elapsed.
    pub fn check(
        &self,
        kind: ContentKind,
        assignment: &Assignment,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        let Some(end) = self.window_end(kind, assignment) else {
            return Ok(());
        };
        if now <= end {
            return Ok(());
        }
        let message = match Self::governing_format(kind, assignment) {
            BookFormat::Ebook => format!(
                "The {}-hour ebook access window has passed",
                self.ebook_deadline.num_hours()
            ),
            BookFormat::Audiobook => format!(
                "The {}-day access window has passed",
                self.audiobook_window.num_days()
            ),
        };
        Err(CoreError::Forbidden(message))
    }

    /// Deadline fields to persist when materials are released.
    pub fn release_windows(&self, format: BookFormat, released_at: Timestamp) -> ReleaseWindows {
        match format {
            BookFormat::Ebook => ReleaseWindows {
                deadline_at: Some(released_at + self.ebook_deadline),
                materials_expires_at: None,
            },
            BookFormat::Audiobook => ReleaseWindows {
                deadline_at: None,
                materials_expires_at: Some(released_at + self.audiobook_window),
            },
        }
    }
}
