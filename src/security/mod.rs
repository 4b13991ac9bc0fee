//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Authenticated route:
//!     → auth wrapper (bearer token → CurrentUser, privilege check)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: missing or bad token is 401, low privilege is 403
//! - Every configured secret verifies, only the first signs

pub mod auth;

pub use auth::{
    bearer_token, sign_token, verify_token, Authenticator, CurrentUser, PrivLevel,
    SignedTokenAuth, PRIV_LEVEL_ADMIN, PRIV_LEVEL_OPERATIONS, PRIV_LEVEL_READ_ONLY,
};
