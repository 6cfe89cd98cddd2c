//! Secure content gateway.
//!
//! Every stream request re-validates the assignment against the store:
//! ownership, format, release, status, and the access window. Only then is
//! the artifact opened, and the caller never learns its storage key.

use crate::access_window::AccessWindowPolicy;
use crate::assignment::{AccessKind, Assignment, ContentKind};
use crate::catalog::Campaign;
use crate::error::CoreError;
use crate::range::{self, ByteRange};
use crate::types::{DbId, Timestamp};

use super::ports::ArtifactReader;
use super::{fetch_owned, QueueContext};

/// How the browser should treat the streamed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Downloadable file (ebooks).
    Attachment,
    /// Played or rendered in place (audio, synopsis).
    Inline,
}

impl Disposition {
    pub fn for_kind(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Ebook => Self::Attachment,
            ContentKind::Audiobook | ContentKind::Synopsis => Self::Inline,
        }
    }
}

/// A validated artifact stream ready to be written to a response.
pub struct ContentStream {
    pub kind: ContentKind,
    pub total_size: u64,
    /// `Some` for a partial (206) response.
    pub range: Option<ByteRange>,
    pub content_type: String,
    pub disposition: Disposition,
    pub filename: String,
    pub body: ArtifactReader,
}

impl ContentStream {
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |r| r.length())
    }

    /// `Content-Range` value for partial responses.
    pub fn content_range(&self) -> Option<String> {
        self.range
            .map(|r| format!("bytes {}-{}/{}", r.start, r.end, self.total_size))
    }

    pub fn content_disposition(&self) -> String {
        let kind = match self.disposition {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        };
        format!("{kind}; filename=\"{}\"", self.filename)
    }
}

/// Gate checks 2-5: format, release, status, window. Ownership (1) is
/// enforced by fetching through [`fetch_owned`].
pub fn authorize(
    policy: &AccessWindowPolicy,
    kind: ContentKind,
    assignment: &Assignment,
    now: Timestamp,
) -> Result<(), CoreError> {
    if let Some(required) = kind.required_format() {
        if required != assignment.format {
            return Err(CoreError::Forbidden(format!(
                "This assignment is for the {} format; {kind} content is not available",
                assignment.format
            )));
        }
    }

    if assignment.materials_released_at.is_none() {
        return Err(CoreError::Forbidden(
            "Materials have not been released for this assignment yet".into(),
        ));
    }

    if !assignment.status.is_streamable() {
        return Err(CoreError::Forbidden(format!(
            "Content is not available while the assignment is {}",
            assignment.status
        )));
    }

    policy.check(kind, assignment, now)
}

/// Storage key of the artifact for `kind`, if the campaign has one.
pub fn artifact_key(campaign: &Campaign, kind: ContentKind) -> Option<&str> {
    match kind {
        ContentKind::Ebook => campaign.ebook_key.as_deref(),
        ContentKind::Audiobook => campaign.audiobook_key.as_deref(),
        ContentKind::Synopsis => campaign.synopsis_key.as_deref(),
    }
}

/// Guess a Content-Type from a key's file extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = extension(key).to_lowercase();
    match ext.as_str() {
        "epub" => "application/epub+zip",
        "pdf" => "application/pdf",
        "mobi" => "application/x-mobipocket-ebook",
        "mp3" => "audio/mpeg",
        "m4a" | "m4b" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn extension(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}

fn download_filename(assignment_id: DbId, kind: ContentKind, key: &str) -> String {
    match extension(key) {
        "" => format!("{kind}-{assignment_id}"),
        ext => format!("{kind}-{assignment_id}.{}", ext.to_lowercase()),
    }
}

/// Validate and open one content stream for the reader.
///
/// On success an ebook or audiobook access is recorded: `Approved` becomes
/// `InProgress` on the first access, later accesses refresh the timestamp.
/// Synopsis reads are not recorded.
pub async fn stream(
    ctx: &QueueContext<'_>,
    reader_profile_id: DbId,
    assignment_id: DbId,
    kind: ContentKind,
    range_header: Option<&str>,
    now: Timestamp,
) -> Result<ContentStream, CoreError> {
    let assignment = fetch_owned(ctx.store, assignment_id, reader_profile_id).await?;
    authorize(&ctx.policy, kind, &assignment, now)?;

    let campaign = ctx
        .registry
        .find_campaign(assignment.campaign_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Campaign",
            id: assignment.campaign_id,
        })?;
    let not_found = || CoreError::NotFound {
        entity: "ContentArtifact",
        id: assignment.id,
    };
    let key = artifact_key(&campaign, kind).ok_or_else(not_found)?;
    let meta = ctx.content.metadata(key).await?.ok_or_else(not_found)?;

    let range = range::resolve(range_header, meta.size);
    let body = ctx.content.open(key, range).await.inspect_err(|e| {
        tracing::error!(assignment_id, kind = %kind, error = %e, "Failed to open content artifact");
    })?;

    if let Some(required) = kind.required_format() {
        ctx.store
            .record_access(
                assignment.id,
                reader_profile_id,
                AccessKind::for_format(required),
                now,
            )
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Assignment",
                id: assignment.id,
            })?;
    }

    tracing::debug!(
        assignment_id,
        reader_id = reader_profile_id,
        kind = %kind,
        partial = range.is_some(),
        size = meta.size,
        "Streaming content",
    );

    Ok(ContentStream {
        kind,
        total_size: meta.size,
        range,
        content_type: meta
            .content_type
            .unwrap_or_else(|| content_type_for_key(key).to_string()),
        disposition: Disposition::for_kind(kind),
        filename: download_filename(assignment.id, kind, key),
        body,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::assignment::{AssignmentStatus, BookFormat, NewAssignment};
    use crate::catalog::{CampaignFormat, CampaignStatus};
    use crate::queue::memory::{InMemoryContentStore, InMemoryQueue, RecordingNotifier};
    use crate::queue::ports::{ArtifactMeta, AssignmentStore, ContentStore};

    const READER: DbId = 10;
    const OTHER_READER: DbId = 20;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    struct Fixture {
        queue: InMemoryQueue,
        content: InMemoryContentStore,
        notifier: RecordingNotifier,
    }

    impl Fixture {
        fn new() -> Self {
            let queue = InMemoryQueue::new();
            queue
                .add_campaign(Campaign {
                    id: 1,
                    title: "The Long Tide".into(),
                    author_display_name: "M. Shore".into(),
                    format: CampaignFormat::Both,
                    status: CampaignStatus::Active,
                    weekly_review_rate: 5,
                    ebook_key: Some("campaigns/1/book.epub".into()),
                    audiobook_key: Some("campaigns/1/book.m4b".into()),
                    synopsis_key: Some("campaigns/1/synopsis.pdf".into()),
                    created_at: t0(),
                })
                .unwrap();
            let content = InMemoryContentStore::new();
            content
                .insert("campaigns/1/book.epub", vec![7u8; 1000], None)
                .unwrap();
            content
                .insert("campaigns/1/book.m4b", vec![1u8; 4096], Some("audio/mp4"))
                .unwrap();
            content
                .insert("campaigns/1/synopsis.pdf", b"synopsis".to_vec(), None)
                .unwrap();
            Self {
                queue,
                content,
                notifier: RecordingNotifier::new(),
            }
        }

        fn ctx(&self) -> QueueContext<'_> {
            QueueContext {
                store: &self.queue,
                registry: &self.queue,
                content: &self.content,
                notifier: &self.notifier,
                policy: AccessWindowPolicy::default(),
            }
        }

        async fn released(&self, format: BookFormat) -> Assignment {
            let a = self
                .queue
                .create_waiting(&NewAssignment {
                    campaign_id: 1,
                    reader_profile_id: READER,
                    format,
                    source_profile_id: 1,
                    is_buffer_assignment: false,
                })
                .await
                .unwrap();
            self.queue
                .release_materials(a.id, t0(), &AccessWindowPolicy::default())
                .unwrap()
        }
    }

    async fn read_all(mut s: ContentStream) -> Vec<u8> {
        let mut buf = Vec::new();
        s.body.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn range_request_yields_partial_stream() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Ebook).await;

        let s = stream(&fx.ctx(), READER, a.id, ContentKind::Ebook, Some("bytes=0-99"), t0())
            .await
            .unwrap();

        assert_eq!(s.content_length(), 100);
        assert_eq!(s.content_range().as_deref(), Some("bytes 0-99/1000"));
        assert_eq!(s.content_type, "application/epub+zip");
        assert_eq!(s.disposition, Disposition::Attachment);
        assert_eq!(read_all(s).await.len(), 100);
    }

    #[tokio::test]
    async fn malformed_range_streams_everything() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Audiobook).await;

        let s = stream(&fx.ctx(), READER, a.id, ContentKind::Audiobook, Some("bytes=x-"), t0())
            .await
            .unwrap();

        assert_eq!(s.range, None);
        assert_eq!(s.content_length(), 4096);
        assert_eq!(s.content_type, "audio/mp4");
        assert_eq!(s.disposition, Disposition::Inline);
        assert_eq!(read_all(s).await.len(), 4096);
    }

    #[tokio::test]
    async fn first_access_moves_approved_to_in_progress() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Audiobook).await;
        assert_eq!(a.status, AssignmentStatus::Approved);

        let first = t0() + Duration::hours(1);
        stream(&fx.ctx(), READER, a.id, ContentKind::Audiobook, None, first)
            .await
            .unwrap();
        let after_first = fx.queue.get(a.id).unwrap().unwrap();
        assert_eq!(after_first.status, AssignmentStatus::InProgress);
        assert_eq!(after_first.last_audio_access_at, Some(first));

        let second = t0() + Duration::hours(2);
        stream(&fx.ctx(), READER, a.id, ContentKind::Audiobook, None, second)
            .await
            .unwrap();
        let after_second = fx.queue.get(a.id).unwrap().unwrap();
        assert_eq!(after_second.status, AssignmentStatus::InProgress);
        assert_eq!(after_second.last_audio_access_at, Some(second));
    }

    #[tokio::test]
    async fn synopsis_is_readable_for_any_format_and_not_recorded() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Audiobook).await;

        let s = stream(&fx.ctx(), READER, a.id, ContentKind::Synopsis, None, t0())
            .await
            .unwrap();
        assert_eq!(s.content_type, "application/pdf");
        assert_eq!(s.disposition, Disposition::Inline);
        assert_eq!(
            fx.queue.get(a.id).unwrap().unwrap().status,
            AssignmentStatus::Approved
        );
    }

    #[tokio::test]
    async fn foreign_assignment_is_not_found() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Ebook).await;

        let err = stream(&fx.ctx(), OTHER_READER, a.id, ContentKind::Ebook, None, t0())
            .await
            .err()
            .unwrap();
        assert_matches!(err, CoreError::NotFound { entity: "Assignment", .. });
    }

    /// Serves from `inner` but purges `victim` from `queue` on open, so the
    /// row is gone by the time access is recorded.
    struct PurgingContent<'a> {
        inner: &'a InMemoryContentStore,
        queue: &'a InMemoryQueue,
        victim: DbId,
    }

    #[async_trait::async_trait]
    impl ContentStore for PurgingContent<'_> {
        async fn metadata(&self, key: &str) -> Result<Option<ArtifactMeta>, CoreError> {
            self.inner.metadata(key).await
        }

        async fn open(
            &self,
            key: &str,
            range: Option<ByteRange>,
        ) -> Result<ArtifactReader, CoreError> {
            self.queue.remove(self.victim)?;
            self.inner.open(key, range).await
        }
    }

    #[tokio::test]
    async fn assignment_purged_mid_stream_is_not_found() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Ebook).await;
        let content = PurgingContent {
            inner: &fx.content,
            queue: &fx.queue,
            victim: a.id,
        };
        let ctx = QueueContext {
            content: &content,
            ..fx.ctx()
        };

        let err = stream(&ctx, READER, a.id, ContentKind::Ebook, None, t0())
            .await
            .err()
            .unwrap();
        assert_matches!(err, CoreError::NotFound { entity: "Assignment", id } if id == a.id);
    }

    #[tokio::test]
    async fn wrong_format_is_forbidden() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Ebook).await;

        let err = stream(&fx.ctx(), READER, a.id, ContentKind::Audiobook, None, t0())
            .await
            .err()
            .unwrap();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[tokio::test]
    async fn unreleased_materials_are_forbidden() {
        let fx = Fixture::new();
        let a = fx
            .queue
            .create_waiting(&NewAssignment {
                campaign_id: 1,
                reader_profile_id: READER,
                format: BookFormat::Ebook,
                source_profile_id: 1,
                is_buffer_assignment: false,
            })
            .await
            .unwrap();

        let err = stream(&fx.ctx(), READER, a.id, ContentKind::Ebook, None, t0())
            .await
            .err()
            .unwrap();
        assert_matches!(err, CoreError::Forbidden(msg) if msg.contains("not been released"));
    }

    #[tokio::test]
    async fn audiobook_after_window_is_forbidden_for_every_status() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Audiobook).await;
        fx.queue
            .update(a.id, |a| a.materials_expires_at = None)
            .unwrap();

        for status in AssignmentStatus::ALL {
            fx.queue.update(a.id, |a| a.status = status).unwrap();
            let err = stream(
                &fx.ctx(),
                READER,
                a.id,
                ContentKind::Audiobook,
                None,
                t0() + Duration::days(8),
            )
            .await
            .err()
            .unwrap();
            assert_matches!(err, CoreError::Forbidden(_), "{status}");
        }
    }

    #[tokio::test]
    async fn ebook_synopsis_follows_ebook_deadline() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Ebook).await;

        let late = t0() + Duration::hours(73);
        let err = stream(&fx.ctx(), READER, a.id, ContentKind::Synopsis, None, late)
            .await
            .err()
            .unwrap();
        assert_matches!(err, CoreError::Forbidden(msg) if msg.contains("72-hour"));
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let fx = Fixture::new();
        let a = fx.released(BookFormat::Ebook).await;
        let empty = InMemoryContentStore::new();
        let ctx = QueueContext {
            content: &empty,
            ..fx.ctx()
        };

        let err = stream(&ctx, READER, a.id, ContentKind::Ebook, None, t0())
            .await
            .err()
            .unwrap();
        assert_matches!(err, CoreError::NotFound { entity: "ContentArtifact", .. });
    }

    #[test]
    fn content_types_and_filenames() {
        assert_eq!(content_type_for_key("a/b/book.EPUB"), "application/epub+zip");
        assert_eq!(content_type_for_key("a/b/audio.mp3"), "audio/mpeg");
        assert_eq!(content_type_for_key("a/.hidden"), "application/octet-stream");
        assert_eq!(
            download_filename(5, ContentKind::Ebook, "x/y.EPUB"),
            "ebook-5.epub"
        );
        assert_eq!(download_filename(5, ContentKind::Synopsis, "x/y"), "synopsis-5");
    }
}
