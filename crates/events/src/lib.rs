//! Reader notification dispatch.
//!
//! - [`email`] renders and sends queue confirmation emails over SMTP.
//! - [`notifier`] adapts delivery to the core `Notifier` port, with a
//!   log-only fallback when SMTP is not configured.

pub mod email;
pub mod notifier;

pub use email::{EmailConfig, EmailDelivery, EmailError};
pub use notifier::{EmailNotifier, LogNotifier};
