//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument and return raw rows.

pub mod assignment_repo;
pub mod campaign_repo;
pub mod reader_profile_repo;
pub mod review_repo;

pub use assignment_repo::AssignmentRepo;
pub use campaign_repo::CampaignRepo;
pub use reader_profile_repo::ReaderProfileRepo;
pub use review_repo::ReviewRepo;
