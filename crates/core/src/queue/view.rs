//! Reader-facing representations.
//!
//! These are the only shapes that leave the server. They carry no buffer
//! flag and no storage keys; content is reachable only through same-origin
//! stream paths, which are listed only while the gateway would serve them.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::access_window::AccessWindowPolicy;
use crate::assignment::{Assignment, AssignmentStatus, BookFormat, ContentKind};
use crate::catalog::{Campaign, CampaignFormat};
use crate::types::{DbId, Timestamp};

use super::gateway::{artifact_key, authorize};

/// Mount point of the assignment routes.
pub const STREAM_PATH_PREFIX: &str = "/api/v1/queue/assignments";

/// Same-origin stream path for one assignment and content kind.
pub fn stream_path(assignment_id: DbId, kind: ContentKind) -> String {
    format!(
        "{STREAM_PATH_PREFIX}/{assignment_id}/{}",
        kind.stream_segment()
    )
}

/// An assignment as returned to its reader.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    pub id: DbId,
    pub campaign_id: DbId,
    pub campaign_title: String,
    pub author_display_name: String,
    pub status: AssignmentStatus,
    pub format: BookFormat,
    pub credits_value: i32,
    pub source_profile_id: DbId,
    pub queue_position: i32,
    pub scheduled_week: Option<i32>,
    pub scheduled_date: Option<NaiveDate>,
    pub materials_released_at: Option<Timestamp>,
    pub deadline_at: Option<Timestamp>,
    pub materials_expires_at: Option<Timestamp>,
    /// When content for the assigned format stops being served.
    pub access_expires_at: Option<Timestamp>,
    pub ebook_downloaded_at: Option<Timestamp>,
    pub last_audio_access_at: Option<Timestamp>,
    pub ebook_stream_url: Option<String>,
    pub audiobook_stream_url: Option<String>,
    pub synopsis_stream_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AssignmentView {
    pub fn build(
        assignment: &Assignment,
        campaign: &Campaign,
        policy: &AccessWindowPolicy,
        now: Timestamp,
    ) -> Self {
        let url = |kind: ContentKind| {
            let servable = artifact_key(campaign, kind).is_some()
                && authorize(policy, kind, assignment, now).is_ok();
            servable.then(|| stream_path(assignment.id, kind))
        };
        let access_expires_at = assignment
            .materials_released_at
            .and_then(|_| policy.window_end(ContentKind::Synopsis, assignment));

        Self {
            id: assignment.id,
            campaign_id: assignment.campaign_id,
            campaign_title: campaign.title.clone(),
            author_display_name: campaign.author_display_name.clone(),
            status: assignment.status,
            format: assignment.format,
            credits_value: assignment.credits_value(),
            source_profile_id: assignment.source_profile_id,
            queue_position: assignment.queue_position,
            scheduled_week: assignment.scheduled_week,
            scheduled_date: assignment.scheduled_date,
            materials_released_at: assignment.materials_released_at,
            deadline_at: assignment.deadline_at,
            materials_expires_at: assignment.materials_expires_at,
            access_expires_at,
            ebook_downloaded_at: assignment.ebook_downloaded_at,
            last_audio_access_at: assignment.last_audio_access_at,
            ebook_stream_url: url(ContentKind::Ebook),
            audiobook_stream_url: url(ContentKind::Audiobook),
            synopsis_stream_url: url(ContentKind::Synopsis),
            created_at: assignment.created_at,
            updated_at: assignment.updated_at,
        }
    }
}

/// A campaign the reader may apply to, with wait estimates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignListing {
    pub id: DbId,
    pub title: String,
    pub author_display_name: String,
    pub format: CampaignFormat,
    pub has_applied: bool,
    /// Position the reader would get if they applied now.
    pub estimated_queue_position: i64,
    pub estimated_review_week: i64,
}

/// "Active" for ordering purposes: anything not yet terminal.
fn sort_rank(status: AssignmentStatus) -> u8 {
    if status.is_terminal() {
        1
    } else {
        0
    }
}

/// Order for "my assignments": active first, then by scheduled date
/// (unscheduled last), then newest first.
pub fn sort_for_reader(assignments: &mut [Assignment]) {
    assignments.sort_by(|a, b| {
        sort_rank(a.status)
            .cmp(&sort_rank(b.status))
            .then_with(|| match (a.scheduled_date, b.scheduled_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::catalog::CampaignStatus;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    fn campaign() -> Campaign {
        Campaign {
            id: 1,
            title: "The Long Tide".into(),
            author_display_name: "M. Shore".into(),
            format: CampaignFormat::Both,
            status: CampaignStatus::Active,
            weekly_review_rate: 5,
            ebook_key: Some("s3://private-bucket/book.epub".into()),
            audiobook_key: Some("s3://private-bucket/book.m4b".into()),
            synopsis_key: Some("s3://private-bucket/synopsis.pdf".into()),
            created_at: t0(),
        }
    }

    fn assignment(id: DbId, status: AssignmentStatus, format: BookFormat) -> Assignment {
        Assignment {
            id,
            campaign_id: 1,
            reader_profile_id: 10,
            status,
            format,
            source_profile_id: 501,
            queue_position: 1,
            scheduled_week: None,
            scheduled_date: None,
            materials_released_at: None,
            materials_expires_at: None,
            deadline_at: None,
            ebook_downloaded_at: None,
            last_audio_access_at: None,
            is_buffer_assignment: true,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    #[test]
    fn serialized_view_hides_buffer_flag_and_storage_keys() {
        let mut a = assignment(7, AssignmentStatus::Approved, BookFormat::Audiobook);
        a.materials_released_at = Some(t0());
        let view = AssignmentView::build(&a, &campaign(), &AccessWindowPolicy::default(), t0());

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("buffer"));
        assert!(!json.contains("s3://"));
        assert!(!json.contains("private-bucket"));
        assert!(json.contains("/api/v1/queue/assignments/7/stream-audio"));
    }

    #[test]
    fn stream_urls_follow_gateway_rules() {
        let mut a = assignment(7, AssignmentStatus::InProgress, BookFormat::Audiobook);
        a.materials_released_at = Some(t0());
        let policy = AccessWindowPolicy::default();

        let open = AssignmentView::build(&a, &campaign(), &policy, t0() + Duration::days(1));
        assert_eq!(open.ebook_stream_url, None);
        assert!(open.audiobook_stream_url.is_some());
        assert!(open.synopsis_stream_url.is_some());
        assert_eq!(open.access_expires_at, Some(t0() + Duration::days(7)));

        let expired = AssignmentView::build(&a, &campaign(), &policy, t0() + Duration::days(8));
        assert_eq!(expired.audiobook_stream_url, None);
        assert_eq!(expired.synopsis_stream_url, None);
    }

    #[test]
    fn queued_assignment_has_no_stream_urls() {
        let a = assignment(7, AssignmentStatus::Waiting, BookFormat::Ebook);
        let view = AssignmentView::build(&a, &campaign(), &AccessWindowPolicy::default(), t0());
        assert_eq!(view.ebook_stream_url, None);
        assert_eq!(view.synopsis_stream_url, None);
        assert_eq!(view.access_expires_at, None);
        assert_eq!(view.credits_value, 1);
    }

    #[test]
    fn missing_artifact_has_no_stream_url() {
        let mut a = assignment(7, AssignmentStatus::Approved, BookFormat::Ebook);
        a.materials_released_at = Some(t0());
        let mut c = campaign();
        c.synopsis_key = None;

        let view = AssignmentView::build(&a, &c, &AccessWindowPolicy::default(), t0());
        assert!(view.ebook_stream_url.is_some());
        assert_eq!(view.synopsis_stream_url, None);
    }

    #[test]
    fn reader_order_is_active_then_scheduled_then_newest() {
        let date = |d| NaiveDate::from_ymd_opt(2026, 6, d).unwrap();

        let mut done = assignment(1, AssignmentStatus::Validated, BookFormat::Ebook);
        done.scheduled_date = Some(date(1));
        let mut late = assignment(2, AssignmentStatus::Scheduled, BookFormat::Ebook);
        late.scheduled_date = Some(date(20));
        let mut soon = assignment(3, AssignmentStatus::Scheduled, BookFormat::Ebook);
        soon.scheduled_date = Some(date(5));
        let mut old = assignment(4, AssignmentStatus::Waiting, BookFormat::Ebook);
        old.created_at = t0() - Duration::days(3);
        let new = assignment(5, AssignmentStatus::Waiting, BookFormat::Ebook);

        let mut list = vec![done, late, old, new, soon];
        sort_for_reader(&mut list);

        let ids: Vec<DbId> = list.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2, 5, 4, 1]);
    }
}
