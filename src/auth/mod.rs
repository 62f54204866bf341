//! Client-side authentication: tokens, session state and permissions.
//!
//! This module provides:
//! - Token persistence and claim decoding (`tokens`)
//! - The session manager with login/logout/refresh and auth listeners (`session`)
//! - Role to capability resolution (`permissions`)

pub mod listeners;
pub mod permissions;
pub mod session;
pub mod tokens;

pub use listeners::Subscription;
pub use permissions::{resolve, Capabilities, Capability, PermissionOverrides};
pub use session::{AuthSnapshot, SessionError, SessionManager};
pub use tokens::{is_token_expired, TokenClaims, TokenStore};
