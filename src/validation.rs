//! Input validation for use-case requests.
//!
//! Each validator returns `Err(message)` describing the first problem found.
//! To collect several problems into one [`AppError`](crate::error::AppError),
//! feed the results to [`ValidationErrorBuilder::check`](crate::error::ValidationErrorBuilder::check).

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Id;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_EXCERPT_LEN: usize = 500;
pub const MAX_CONTENT_LEN: usize = 100_000;
pub const MAX_REASON_LEN: usize = 1000;

lazy_static! {
    /// Numeric ids, UUIDs and base64 relay ids
    static ref ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_+/=:-]{1,128}$").unwrap();

    /// HTTP(S) endpoint with host and optional port and path
    static ref ENDPOINT_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9]([-a-zA-Z0-9.]*[a-zA-Z0-9])?(:\d+)?(/[-a-zA-Z0-9_%&=+@~./]*)?$"
    ).unwrap();
}

/// Validate an article title
pub fn validate_title(title: &str) -> Result<(), String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title is required".to_string());
    }

    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(format!("Title is too long (max {} characters)", MAX_TITLE_LEN));
    }

    if trimmed.chars().any(char::is_control) {
        return Err("Title must not contain control characters".to_string());
    }

    Ok(())
}

/// Validate article body text
pub fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Content is required".to_string());
    }

    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(format!("Content is too long (max {} characters)", MAX_CONTENT_LEN));
    }

    Ok(())
}

/// Validate an optional excerpt
pub fn validate_excerpt(excerpt: &Option<String>) -> Result<(), String> {
    if let Some(e) = excerpt {
        if e.chars().count() > MAX_EXCERPT_LEN {
            return Err(format!("Excerpt is too long (max {} characters)", MAX_EXCERPT_LEN));
        }
    }
    Ok(())
}

/// Validate a rejection reason
pub fn validate_reason(reason: &str) -> Result<(), String> {
    if reason.trim().is_empty() {
        return Err("A reason is required".to_string());
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(format!("Reason is too long (max {} characters)", MAX_REASON_LEN));
    }

    Ok(())
}

/// Validate an entity id
pub fn validate_id(id: &Id) -> Result<(), String> {
    let key = id.as_key();
    if key.is_empty() {
        return Err("ID is required".to_string());
    }

    if !ID_REGEX.is_match(&key) {
        return Err("Invalid ID format".to_string());
    }

    Ok(())
}

/// Validate the GraphQL endpoint URL
pub fn validate_endpoint(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("API endpoint is required".to_string());
    }

    if url.len() > 2048 {
        return Err("API endpoint is too long (max 2048 characters)".to_string());
    }

    if !ENDPOINT_REGEX.is_match(url) {
        return Err("API endpoint must be an http(s) URL".to_string());
    }

    Ok(())
}
