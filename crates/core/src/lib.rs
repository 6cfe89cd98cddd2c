//! Domain layer for the reader assignment queue.
//!
//! Holds the assignment lifecycle rules, the access-window policy, byte
//! range parsing, the collaborator traits the adapters implement, and the
//! admission / lifecycle / content-gateway operations built on top of them.
//! This crate has no internal dependencies so it can be shared by the API
//! server, the database adapter, and any scheduler tooling.

pub mod access_window;
pub mod assignment;
pub mod catalog;
pub mod error;
pub mod queue;
pub mod range;
pub mod roles;
pub mod types;
