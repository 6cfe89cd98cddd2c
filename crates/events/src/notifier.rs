//! [`Notifier`] implementations.

use async_trait::async_trait;
use shelfmark_core::error::CoreError;
use shelfmark_core::queue::ports::{AdmissionNotice, Notifier};

use crate::email::{EmailConfig, EmailDelivery};

/// Sends queue confirmations by email.
pub struct EmailNotifier {
    delivery: EmailDelivery,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            delivery: EmailDelivery::new(config),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn admission_confirmed(&self, notice: &AdmissionNotice) -> Result<(), CoreError> {
        self.delivery
            .send_admission(notice)
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))
    }
}

/// Logs confirmations instead of sending them. Used when SMTP is not
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn admission_confirmed(&self, notice: &AdmissionNotice) -> Result<(), CoreError> {
        tracing::info!(
            assignment_id = notice.assignment_id,
            queue_position = notice.queue_position,
            estimated_review_week = notice.estimated_review_week,
            "Queue confirmation (email delivery not configured)",
        );
        Ok(())
    }
}
