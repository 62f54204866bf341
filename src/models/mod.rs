//! Data models shared by the session layer, listings and use cases.

pub mod article;
pub mod common;
pub mod user;

pub use article::*;
pub use common::*;
pub use user::*;
