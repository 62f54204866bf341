//! Use cases: permission-checked, validated calls to the backend.
//!
//! Every use case follows the same order: resolve the session
//! (`Unauthorized`), check the capability (`Forbidden`), validate input
//! (`ValidationError`), and only then talk to the backend.

pub mod articles;
pub mod users;

pub use articles::ArticleService;
pub use users::UserAdminService;

use serde_json::Value;
use std::sync::Arc;

use crate::auth::{Capability, SessionManager};
use crate::client::operations::collect_messages;
use crate::client::{GraphqlExecutor, Operation};
use crate::error::AppError;
use crate::models::User;

/// Executor plus session, shared by every use case
#[derive(Clone)]
pub struct Backend {
    executor: Arc<dyn GraphqlExecutor>,
    session: Arc<SessionManager>,
}

impl Backend {
    pub fn new(executor: Arc<dyn GraphqlExecutor>, session: Arc<SessionManager>) -> Self {
        Self { executor, session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Current user holding `capability`.
    ///
    /// A stale access token is refreshed once; if that fails the session is
    /// already signed out and the call reports `Unauthorized`.
    pub async fn require(&self, capability: Capability) -> Result<User, AppError> {
        if !self.session.is_authenticated() {
            let tokens = self.session.tokens();
            let can_refresh =
                tokens.get_access_token().is_some() && tokens.get_refresh_token().is_some();
            if !can_refresh || !self.session.refresh_token().await {
                return Err(AppError::unauthorized("Not authenticated"));
            }
        }

        let user = self
            .session
            .get_current_user()
            .await
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;

        if !user.capabilities().allows(capability) {
            tracing::info!(
                user_id = %user.id,
                capability = %capability,
                "Permission denied"
            );
            return Err(AppError::forbidden(format!(
                "Your role does not grant {} permission",
                capability
            )));
        }
        Ok(user)
    }

    pub async fn query(&self, operation: &Operation, variables: Value) -> Result<Value, AppError> {
        let result = self.executor.query(operation, variables).await;
        self.settle(operation, result).await
    }

    pub async fn mutate(&self, operation: &Operation, variables: Value) -> Result<Value, AppError> {
        let result = self.executor.mutate(operation, variables).await;
        self.settle(operation, result).await
    }

    /// Authentication failures end the session before they are reported
    async fn settle(
        &self,
        operation: &Operation,
        result: Result<Value, crate::client::ExecutionError>,
    ) -> Result<Value, AppError> {
        match result {
            Ok(data) => Ok(data),
            Err(e) if e.is_authentication() => {
                tracing::info!(operation = operation.name, error = %e, "Session rejected by backend");
                self.session.logout().await;
                Err(AppError::from(e))
            }
            Err(e) => {
                tracing::warn!(operation = operation.name, error = %e, "Backend call failed");
                Err(AppError::from(e))
            }
        }
    }
}

/// Error for a mutation whose payload reported `success: false`
pub(crate) fn rejected(errors: Option<&Value>, fallback: &str) -> AppError {
    let messages = errors.map(collect_messages).unwrap_or_default();
    if messages.is_empty() {
        return AppError::validation_field("request", fallback);
    }
    let joined = messages.join("; ");
    if joined.to_lowercase().contains("permission") {
        AppError::forbidden(joined)
    } else {
        AppError::validation_field("request", joined)
    }
}
