//! HTTP middleware stack: CORS, per-request trace ids, authentication.

pub mod auth;
pub mod cors;
pub mod trace;

pub use auth::AuthUser;
