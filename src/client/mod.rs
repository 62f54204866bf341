//! GraphQL execution capability.
//!
//! Everything above this module talks to the backend through the
//! [`GraphqlExecutor`] trait:
//! - `query`/`mutate` take a named document and JSON variables
//! - they return the `data` object or a classified [`ExecutionError`]
//!
//! [`HttpExecutor`] is the production transport; tests script responses
//! through a mock executor.

mod http;
pub mod operations;

#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpExecutor;
pub use operations::Operation;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Broad failure classes the session layer reacts to differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// Credentials missing, expired or insufficient
    Authentication,
    /// Request never produced a response (DNS, connect, timeout)
    Network,
    /// Response arrived but was not a usable GraphQL payload
    Response,
    /// Backend returned GraphQL errors unrelated to authentication
    GraphQl,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExecutionError {
    kind: ExecutionErrorKind,
    message: String,
}

impl ExecutionError {
    pub fn new(kind: ExecutionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Authentication, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Network, message)
    }

    pub fn response(message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Response, message)
    }

    pub fn graphql(message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::GraphQl, message)
    }

    pub fn kind(&self) -> ExecutionErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_authentication(&self) -> bool {
        self.kind == ExecutionErrorKind::Authentication
    }
}

#[async_trait]
pub trait GraphqlExecutor: Send + Sync {
    async fn query(&self, operation: &Operation, variables: Value) -> Result<Value, ExecutionError>;
    async fn mutate(&self, operation: &Operation, variables: Value)
        -> Result<Value, ExecutionError>;
}
