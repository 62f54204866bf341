//! Session manager: the single owner of "who is signed in".
//!
//! Two logical states, Unauthenticated and Authenticated(user). Login and
//! logout transitions notify registered listeners after every piece of state
//! (tokens, persisted snapshot, cached user) has been written, and publish an
//! [`AuthSnapshot`] on a watch channel for async consumers.
//!
//! Mutating operations share a single in-flight slot. A second `login` while
//! one is running is rejected with [`SessionError::OperationInProgress`];
//! `logout`, `refresh_token` and current-user hydration wait their turn.

use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use super::listeners::{ListenerRegistry, Subscription};
use super::tokens::TokenStore;
use crate::client::operations::{self, collect_messages, extract, LoginPayload, RefreshPayload};
use crate::client::{ExecutionError, GraphqlExecutor};
use crate::error::{FieldErrors, ValidationErrorBuilder};
use crate::models::{Credentials, Id, User};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid login input")]
    InvalidCredentials(FieldErrors),

    #[error("Login failed: {}", .0.join("; "))]
    LoginRejected(Vec<String>),

    #[error("Another session operation is already in progress")]
    OperationInProgress,

    #[error(transparent)]
    Transport(#[from] ExecutionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Latest auth state, for consumers that poll or await changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub authenticated: bool,
    pub user_id: Option<Id>,
    pub username: Option<String>,
}

pub struct SessionManager {
    executor: Arc<dyn GraphqlExecutor>,
    tokens: TokenStore,
    current_user: RwLock<Option<User>>,
    listeners: Arc<ListenerRegistry>,
    state_tx: watch::Sender<AuthSnapshot>,
    in_flight: Mutex<()>,
}

impl SessionManager {
    pub fn new(executor: Arc<dyn GraphqlExecutor>, tokens: TokenStore) -> Self {
        let (state_tx, _) = watch::channel(AuthSnapshot::default());
        let manager = Self {
            executor,
            tokens,
            current_user: RwLock::new(None),
            listeners: ListenerRegistry::new(),
            state_tx,
            in_flight: Mutex::new(()),
        };
        manager.publish_state();
        manager
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Sign in. On success tokens, snapshot and cached user are all set.
    /// A rejected login changes nothing; a login that cannot be persisted
    /// leaves the session signed out.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, SessionError> {
        let mut errors = ValidationErrorBuilder::new();
        if credentials.username.trim().is_empty() {
            errors.add("username", "Username is required");
        }
        if credentials.password.is_empty() {
            errors.add("password", "Password is required");
        }
        if !errors.is_empty() {
            return Err(SessionError::InvalidCredentials(errors.into_fields()));
        }

        let guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SessionError::OperationInProgress)?;

        let variables = json!({
            "username": credentials.username.trim(),
            "password": credentials.password,
        });
        let payload: LoginPayload = match self.executor.mutate(&operations::LOGIN, variables).await {
            Ok(data) => extract(data, "tokenAuth")?,
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Login request failed");
                return Err(e.into());
            }
        };

        let mut messages = payload
            .errors
            .as_ref()
            .map(collect_messages)
            .unwrap_or_default();

        let (token, user) = match (payload.success, payload.token, payload.user) {
            (Some(false), _, _) => (None, None),
            (_, Some(token), Some(user)) if !token.is_empty() => (Some(token), Some(user)),
            _ => (None, None),
        };
        let (Some(token), Some(user)) = (token, user) else {
            if messages.is_empty() {
                messages.push("Invalid username or password".to_string());
            }
            tracing::info!(username = %credentials.username, reasons = ?messages, "Login rejected");
            return Err(SessionError::LoginRejected(messages));
        };

        let persisted = self
            .tokens
            .store_pair(&token, payload.refresh_token.as_deref())
            .and_then(|()| self.tokens.save_user_snapshot(&user));
        if let Err(e) = persisted {
            // Earlier tokens may already be overwritten; nothing of either
            // session survives
            tracing::warn!(username = %credentials.username, error = %e, "Failed to persist session");
            let was_signed_in = self.cached_user().is_some();
            self.clear_session();
            drop(guard);
            self.publish_state();
            if was_signed_in {
                self.listeners.notify();
            }
            return Err(e.into());
        }
        *self.current_user.write() = Some(user.clone());
        drop(guard);

        tracing::info!(user_id = %user.id, username = %user.username, "Logged in");
        self.publish_state();
        self.listeners.notify();
        Ok(user)
    }

    /// Sign out. Storage failures are logged; from the caller's view this
    /// always succeeds.
    pub async fn logout(&self) {
        let guard = self.in_flight.lock().await;
        self.clear_session();
        drop(guard);

        tracing::info!("Logged out");
        self.publish_state();
        self.listeners.notify();
    }

    /// Resolve the signed-in user.
    ///
    /// Order: in-memory cache, persisted snapshot, then (only if an access
    /// token exists) a `me` query. Only a classified authentication failure
    /// clears stored tokens; a network failure leaves them for a later retry.
    pub async fn get_current_user(&self) -> Option<User> {
        if let Some(user) = self.cached_user() {
            return Some(user);
        }

        let _guard = self.in_flight.lock().await;
        if let Some(user) = self.cached_user() {
            return Some(user);
        }

        if let Some(user) = self.tokens.load_user_snapshot() {
            tracing::debug!(user_id = %user.id, "Restored user from stored snapshot");
            *self.current_user.write() = Some(user.clone());
            self.publish_state();
            return Some(user);
        }

        self.tokens.get_access_token()?;

        let result = self
            .executor
            .query(&operations::CURRENT_USER, json!({}))
            .await
            .and_then(|data| extract::<Option<User>>(data, "me"));

        match result {
            Ok(Some(user)) => {
                if let Err(e) = self.tokens.save_user_snapshot(&user) {
                    tracing::warn!(error = %e, "Failed to persist user snapshot");
                }
                *self.current_user.write() = Some(user.clone());
                self.publish_state();
                Some(user)
            }
            Ok(None) => {
                tracing::info!("Backend reports no active session, clearing tokens");
                self.discard_credentials();
                None
            }
            Err(e) if e.is_authentication() => {
                tracing::info!(error = %e, "Stored session rejected, clearing tokens");
                self.discard_credentials();
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch current user");
                None
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Any failure signs the session out completely before returning false.
    pub async fn refresh_token(&self) -> bool {
        let guard = self.in_flight.lock().await;

        match self.try_refresh().await {
            Ok(()) => {
                drop(guard);
                tracing::debug!("Access token refreshed");
                self.publish_state();
                true
            }
            Err(reason) => {
                tracing::warn!(reason = %reason, "Token refresh failed, logging out");
                self.clear_session();
                drop(guard);
                self.publish_state();
                self.listeners.notify();
                false
            }
        }
    }

    async fn try_refresh(&self) -> Result<(), String> {
        let refresh = self
            .tokens
            .get_refresh_token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "no refresh token stored".to_string())?;

        let data = self
            .executor
            .mutate(&operations::REFRESH_TOKEN, json!({ "refreshToken": refresh }))
            .await
            .map_err(|e| e.to_string())?;
        let payload: RefreshPayload =
            extract(data, "refreshToken").map_err(|e| e.to_string())?;

        let token = match (payload.success, payload.token) {
            (Some(false), _) | (_, None) => {
                let messages = payload
                    .errors
                    .as_ref()
                    .map(collect_messages)
                    .unwrap_or_default();
                return Err(if messages.is_empty() {
                    "refresh rejected".to_string()
                } else {
                    messages.join("; ")
                });
            }
            (_, Some(token)) if token.is_empty() => return Err("empty token issued".to_string()),
            (_, Some(token)) => token,
        };

        self.tokens
            .set_access_token(&token)
            .map_err(|e| e.to_string())?;
        if let Some(rotated) = payload.refresh_token.filter(|t| !t.is_empty()) {
            self.tokens
                .set_refresh_token(&rotated)
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Token present and unexpired. No network, no side effects.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }

    /// In-memory user without any fallback
    pub fn cached_user(&self) -> Option<User> {
        self.current_user.read().clone()
    }

    pub fn add_auth_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.add(callback)
    }

    /// Watch the latest auth state
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state_tx.subscribe()
    }

    /// Tear down at application exit: drops every listener
    pub fn shutdown(&self) {
        let count = self.listeners.len();
        self.listeners.clear();
        tracing::debug!(listeners = count, "Session manager shut down");
    }

    fn clear_session(&self) {
        self.tokens.clear_tokens();
        self.tokens.clear_user_snapshot();
        *self.current_user.write() = None;
    }

    fn discard_credentials(&self) {
        self.tokens.clear_tokens();
        self.tokens.clear_user_snapshot();
        self.publish_state();
    }

    fn publish_state(&self) {
        let snapshot = self.snapshot();
        self.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn snapshot(&self) -> AuthSnapshot {
        let authenticated = self.tokens.is_authenticated();
        let user = self.current_user.read().clone();
        match user {
            Some(user) => AuthSnapshot {
                authenticated,
                user_id: Some(user.id),
                username: Some(user.username),
            },
            None => {
                let claims = self.tokens.get_claims(None);
                AuthSnapshot {
                    authenticated,
                    user_id: claims.as_ref().and_then(|c| c.user_id.clone()),
                    username: claims
                        .as_ref()
                        .and_then(|c| c.display_subject().map(str::to_string)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::test_support::token_expiring_in;
    use crate::auth::tokens::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_SNAPSHOT_KEY};
    use crate::client::mock::MockExecutor;
    use crate::storage::{KeyValueStore, MemoryStore};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    struct Harness {
        executor: Arc<MockExecutor>,
        memory: Arc<MemoryStore>,
        session: Arc<SessionManager>,
    }

    fn harness_with(executor: MockExecutor) -> Harness {
        let executor = Arc::new(executor);
        let memory = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionManager::new(
            executor.clone(),
            TokenStore::new(memory.clone()),
        ));
        Harness {
            executor,
            memory,
            session,
        }
    }

    fn harness() -> Harness {
        harness_with(MockExecutor::new())
    }

    fn user_json(role: &str) -> Value {
        json!({
            "id": "42",
            "username": "jdoe",
            "email": "jdoe@example.com",
            "firstName": "Jane",
            "lastName": "Doe",
            "profile": {"role": role}
        })
    }

    fn login_ok(token: &str) -> Value {
        json!({"tokenAuth": {
            "success": true,
            "errors": null,
            "token": token,
            "refreshToken": "refresh-1",
            "user": user_json("writer")
        }})
    }

    fn counter(session: &SessionManager) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _ = session.add_auth_listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn creds() -> Credentials {
        Credentials::new("jdoe", "correct horse")
    }

    #[tokio::test]
    async fn test_login_success_sets_session_and_notifies_once() {
        let h = harness();
        h.executor.push_ok(login_ok(&token_expiring_in(3600)));
        let notified = counter(&h.session);

        let user = assert_ok!(h.session.login(&creds()).await);
        assert_eq!(user.username, "jdoe");
        assert!(h.session.is_authenticated());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(h.memory.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh-1"));
        assert!(h.memory.get(USER_SNAPSHOT_KEY).unwrap().is_some());
        assert_eq!(h.session.cached_user().map(|u| u.username), Some("jdoe".to_string()));
        assert_eq!(
            h.executor.last_variables().unwrap()["username"],
            Value::String("jdoe".to_string())
        );
    }

    #[tokio::test]
    async fn test_login_rejection_changes_nothing() {
        let h = harness();
        h.executor.push_ok(json!({"tokenAuth": {
            "success": false,
            "errors": {"nonFieldErrors": [{"message": "Please, enter valid credentials."}]},
            "token": null,
            "user": null
        }}));
        let notified = counter(&h.session);

        let err = assert_err!(h.session.login(&creds()).await);
        match err {
            SessionError::LoginRejected(messages) => {
                assert_eq!(messages, vec!["Please, enter valid credentials."])
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.memory.is_empty());
        assert!(h.session.cached_user().is_none());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    /// Memory store that refuses to write the user snapshot once armed
    struct SnapshotFailingStore {
        inner: MemoryStore,
        armed: std::sync::atomic::AtomicBool,
    }

    impl KeyValueStore for SnapshotFailingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == USER_SNAPSHOT_KEY && self.armed.load(Ordering::SeqCst) {
                return Err(StorageError::Corrupt("disk full".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn test_login_persist_failure_drops_previous_session() {
        let executor = Arc::new(MockExecutor::new());
        let store = Arc::new(SnapshotFailingStore {
            inner: MemoryStore::new(),
            armed: std::sync::atomic::AtomicBool::new(false),
        });
        let session = SessionManager::new(executor.clone(), TokenStore::new(store.clone()));

        executor.push_ok(login_ok(&token_expiring_in(3600)));
        assert_ok!(session.login(&Credentials::new("jdoe", "pw")).await);
        assert!(session.cached_user().is_some());

        store.armed.store(true, Ordering::SeqCst);
        executor.push_ok(login_ok(&token_expiring_in(7200)));
        let err = assert_err!(session.login(&Credentials::new("other", "pw")).await);
        assert!(matches!(err, SessionError::Storage(_)));

        assert!(session.cached_user().is_none());
        assert!(!session.is_authenticated());
        assert_eq!(store.inner.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.inner.get(REFRESH_TOKEN_KEY).unwrap(), None);
        assert!(!session.subscribe().borrow().authenticated);
    }

    #[tokio::test]
    async fn test_login_token_without_user_is_not_applied() {
        let h = harness();
        h.executor.push_ok(json!({"tokenAuth": {
            "success": true,
            "token": token_expiring_in(3600),
            "user": null
        }}));

        let err = assert_err!(h.session.login(&creds()).await);
        assert!(matches!(err, SessionError::LoginRejected(ref m) if m == &vec!["Invalid username or password".to_string()]));
        assert!(h.memory.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_transport_error_surfaces_message() {
        let h = harness();
        h.executor.push_err(ExecutionError::network("connection refused"));

        let err = assert_err!(h.session.login(&creds()).await);
        assert!(err.to_string().contains("connection refused"));
        assert!(!h.session.is_authenticated());
        assert!(h.memory.is_empty());
    }

    #[tokio::test]
    async fn test_login_validates_before_network() {
        let h = harness();
        let err = assert_err!(h.session.login(&Credentials::new("  ", "")).await);
        match err {
            SessionError::InvalidCredentials(fields) => {
                assert!(fields.contains_key("username"));
                assert!(fields.contains_key("password"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_login_is_rejected() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(MockExecutor::gated(gate.clone()));
        h.executor.push_ok(login_ok(&token_expiring_in(3600)));

        let session = h.session.clone();
        let first = tokio::spawn(async move { session.login(&creds()).await });
        while h.executor.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        let second = h.session.login(&creds()).await;
        assert!(matches!(second, Err(SessionError::OperationInProgress)));

        gate.notify_one();
        let first = first.await.unwrap();
        assert_ok!(first);
        assert_eq!(h.executor.call_count(), 1);
        assert!(h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_everything_without_network() {
        let h = harness();
        h.executor.push_ok(login_ok(&token_expiring_in(3600)));
        assert_ok!(h.session.login(&creds()).await);
        let notified = counter(&h.session);

        h.session.logout().await;
        assert!(!h.session.is_authenticated());
        assert!(h.memory.is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let calls = h.executor.call_count();
        assert!(h.session.get_current_user().await.is_none());
        assert_eq!(h.executor.call_count(), calls);
    }

    #[tokio::test]
    async fn test_current_user_is_cached_after_fetch() {
        let h = harness();
        h.session
            .tokens()
            .set_access_token(&token_expiring_in(3600))
            .unwrap();
        h.executor.push_ok(json!({"me": user_json("manager")}));

        let first = h.session.get_current_user().await.unwrap();
        assert!(first.capabilities().can_manage);
        assert_eq!(h.executor.call_count(), 1);

        let second = h.session.get_current_user().await.unwrap();
        assert_eq!(second, first);
        assert_eq!(h.executor.call_count(), 1);
        assert!(h.memory.get(USER_SNAPSHOT_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_current_user_adopts_persisted_snapshot() {
        let h = harness();
        h.memory
            .set(USER_SNAPSHOT_KEY, &user_json("admin").to_string())
            .unwrap();

        let user = h.session.get_current_user().await.unwrap();
        assert_eq!(user.username, "jdoe");
        assert_eq!(h.executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_current_user_without_token_skips_network() {
        let h = harness();
        assert!(h.session.get_current_user().await.is_none());
        assert_eq!(h.executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_current_user_auth_failure_clears_tokens() {
        let h = harness();
        h.session.tokens().store_pair(&token_expiring_in(3600), Some("r")).unwrap();
        h.executor
            .push_err(ExecutionError::authentication("Signature has expired"));

        assert!(h.session.get_current_user().await.is_none());
        assert!(h.memory.is_empty());
        assert!(!h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_current_user_network_failure_keeps_tokens() {
        let h = harness();
        let token = token_expiring_in(3600);
        h.session.tokens().store_pair(&token, Some("r")).unwrap();
        h.executor.push_err(ExecutionError::network("timed out"));

        assert!(h.session.get_current_user().await.is_none());
        assert_eq!(h.memory.get(ACCESS_TOKEN_KEY).unwrap(), Some(token));
        assert!(h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_success_stores_new_token() {
        let h = harness();
        h.session
            .tokens()
            .store_pair(&token_expiring_in(-10), Some("refresh-1"))
            .unwrap();
        let fresh = token_expiring_in(3600);
        h.executor.push_ok(json!({"refreshToken": {
            "success": true,
            "token": fresh,
            "refreshToken": "refresh-2"
        }}));

        assert!(!h.session.is_authenticated());
        assert!(h.session.refresh_token().await);
        assert!(h.session.is_authenticated());
        assert_eq!(h.session.tokens().get_access_token(), Some(fresh));
        assert_eq!(h.session.tokens().get_refresh_token().as_deref(), Some("refresh-2"));
        assert_eq!(
            h.executor.last_variables().unwrap()["refreshToken"],
            Value::String("refresh-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_out_fully() {
        let h = harness();
        h.executor.push_ok(login_ok(&token_expiring_in(3600)));
        assert_ok!(h.session.login(&creds()).await);
        let notified = counter(&h.session);

        h.executor.push_err(ExecutionError::authentication("Refresh token is expired"));
        assert!(!h.session.refresh_token().await);

        assert!(!h.session.is_authenticated());
        assert!(h.session.cached_user().is_none());
        assert!(h.memory.is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails() {
        let h = harness();
        h.session.tokens().set_access_token(&token_expiring_in(3600)).unwrap();
        assert!(!h.session.refresh_token().await);
        assert_eq!(h.executor.call_count(), 0);
        assert!(!h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_watch_channel_tracks_state() {
        let h = harness();
        let mut rx = h.session.subscribe();
        assert!(!rx.borrow().authenticated);

        h.executor.push_ok(login_ok(&token_expiring_in(3600)));
        assert_ok!(h.session.login(&creds()).await);
        assert!(rx.has_changed().unwrap());
        {
            let snap = rx.borrow_and_update();
            assert!(snap.authenticated);
            assert_eq!(snap.username.as_deref(), Some("jdoe"));
            assert_eq!(snap.user_id, Some(Id::Number(42)));
        }

        h.session.logout().await;
        assert_eq!(*rx.borrow_and_update(), AuthSnapshot::default());
    }

    #[tokio::test]
    async fn test_shutdown_drops_listeners() {
        let h = harness();
        let notified = counter(&h.session);
        h.session.shutdown();
        h.session.logout().await;
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_listener_sees_post_transition_state() {
        let h = harness();
        let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let session = Arc::downgrade(&h.session);
        let seen = observed.clone();
        let _ = h.session.add_auth_listener(move || {
            if let Some(session) = session.upgrade() {
                seen.lock()
                    .push((session.is_authenticated(), session.cached_user().is_some()));
            }
        });

        h.executor.push_ok(login_ok(&token_expiring_in(3600)));
        assert_ok!(h.session.login(&creds()).await);
        h.session.logout().await;

        assert_eq!(*observed.lock(), vec![(true, true), (false, false)]);
    }
}
