//! Access/refresh token persistence and claim decoding.
//!
//! Tokens are stored verbatim; nothing here verifies signatures. Claims are
//! read only to decide expiry and to show who is signed in without a round
//! trip to the backend.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::models::{Id, User};
use crate::storage::{KeyValueStore, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "auth_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_SNAPSHOT_KEY: &str = "user_data";

/// Decoded token payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Expiry, seconds since epoch
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(default)]
    pub iat: Option<f64>,
    #[serde(default, alias = "origIat")]
    pub orig_iat: Option<f64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<Id>,
    #[serde(default)]
    pub username: Option<String>,
}

impl TokenClaims {
    /// Pick out the known claims. A claim of an unexpected type reads as
    /// absent instead of spoiling the rest of the payload.
    fn from_claims(claims: &Map<String, Value>) -> Self {
        let number = |key: &str| claims.get(key).and_then(Value::as_f64);
        let text = |key: &str| match claims.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let user_id = ["user_id", "userId"]
            .iter()
            .find_map(|key| match claims.get(*key) {
                Some(Value::Number(n)) => n.as_i64().map(Id::Number),
                Some(Value::String(s)) => Some(Id::Text(s.clone())),
                _ => None,
            });

        Self {
            exp: number("exp"),
            iat: number("iat"),
            orig_iat: number("orig_iat").or_else(|| number("origIat")),
            sub: text("sub"),
            user_id,
            username: match claims.get("username") {
                Some(Value::String(s)) => Some(s.clone()),
                _ => None,
            },
        }
    }

    /// Username claim, falling back to the subject
    pub fn display_subject(&self) -> Option<&str> {
        self.username.as_deref().or(self.sub.as_deref())
    }
}

/// Decode the payload segment of a `header.payload.signature` token
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let payload: Value = serde_json::from_slice(&bytes).ok()?;
    let claims = payload.as_object()?;
    Some(TokenClaims::from_claims(claims))
}

/// True when the token is malformed, has no `exp`, or `exp` is in the past
pub fn is_token_expired(token: &str) -> bool {
    is_expired_at(token, chrono::Utc::now().timestamp())
}

pub(crate) fn is_expired_at(token: &str, now_secs: i64) -> bool {
    match decode_claims(token).and_then(|c| c.exp) {
        Some(exp) => exp < now_secs as f64,
        None => true,
    }
}

/// Token and user-snapshot persistence on top of a [`KeyValueStore`]
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn set_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(ACCESS_TOKEN_KEY, token)
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(REFRESH_TOKEN_KEY, token)
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Persist a freshly issued pair. Either both are written or neither.
    pub fn store_pair(&self, access: &str, refresh: Option<&str>) -> Result<(), StorageError> {
        self.set_access_token(access)?;
        if let Some(refresh) = refresh {
            if let Err(e) = self.set_refresh_token(refresh) {
                self.clear_tokens();
                return Err(e);
            }
        } else {
            // A refresh token from an earlier session must not outlive it
            self.remove_logged(REFRESH_TOKEN_KEY);
        }
        Ok(())
    }

    pub fn clear_tokens(&self) {
        self.remove_logged(ACCESS_TOKEN_KEY);
        self.remove_logged(REFRESH_TOKEN_KEY);
    }

    pub fn is_token_expired(&self, token: &str) -> bool {
        is_token_expired(token)
    }

    /// Claims of `token`, or of the stored access token when `None`
    pub fn get_claims(&self, token: Option<&str>) -> Option<TokenClaims> {
        match token {
            Some(t) => decode_claims(t),
            None => self.get_access_token().as_deref().and_then(decode_claims),
        }
    }

    /// Access token present and unexpired; checked on every call
    pub fn is_authenticated(&self) -> bool {
        match self.get_access_token() {
            Some(token) if !token.is_empty() => !is_token_expired(&token),
            _ => false,
        }
    }

    pub fn load_user_snapshot(&self) -> Option<User> {
        match self.store.get_json::<User>(USER_SNAPSHOT_KEY) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored user");
                None
            }
        }
    }

    pub fn save_user_snapshot(&self, user: &User) -> Result<(), StorageError> {
        self.store.set_json(USER_SNAPSHOT_KEY, user)
    }

    pub fn clear_user_snapshot(&self) {
        self.remove_logged(USER_SNAPSHOT_KEY);
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = key, error = %e, "Failed to read token");
                None
            }
        }
    }

    fn remove_logged(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key = key, error = %e, "Failed to remove stored value");
        }
    }
}
