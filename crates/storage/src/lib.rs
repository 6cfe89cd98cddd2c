//! Content store adapters.
//!
//! Both backends address artifacts by opaque key and serve byte ranges
//! without buffering the whole object. Keys never leave the server.

pub mod local;
pub mod s3;

pub use local::LocalContentStore;
pub use s3::S3ContentStore;
