//! Bearer token handling. Issuing tokens to end users is the job of the
//! account service; this server only validates them.

pub mod jwt;
