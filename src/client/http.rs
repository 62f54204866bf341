//! HTTP transport for GraphQL operations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{ExecutionError, ExecutionErrorKind, GraphqlExecutor, Operation};
use crate::auth::tokens::{self, TokenStore};
use crate::config::ApiConfig;

/// Error codes backends put in `extensions.code` for session problems
const AUTH_ERROR_CODES: &[&str] = &[
    "UNAUTHENTICATED",
    "UNAUTHORIZED",
    "FORBIDDEN",
    "PERMISSION_DENIED",
    "TOKEN_EXPIRED",
];

/// Message fragments used when the backend sends no error code
const AUTH_ERROR_FRAGMENTS: &[&str] = &[
    "signature has expired",
    "error decoding signature",
    "invalid token",
    "authentication credentials",
    "not authenticated",
    "login required",
    "you do not have permission",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
    operation_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphQlError {
    fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(Value::as_str)
    }

    fn is_authentication(&self) -> bool {
        if let Some(code) = self.code() {
            if AUTH_ERROR_CODES.iter().any(|c| c.eq_ignore_ascii_case(code)) {
                return true;
            }
        }
        let lower = self.message.to_lowercase();
        AUTH_ERROR_FRAGMENTS.iter().any(|f| lower.contains(f))
    }
}

/// Turn a GraphQL `errors` array into a single classified error
pub(crate) fn classify_errors(errors: &[GraphQlError]) -> ExecutionError {
    let kind = if errors.iter().any(GraphQlError::is_authentication) {
        ExecutionErrorKind::Authentication
    } else {
        ExecutionErrorKind::GraphQl
    };
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    ExecutionError::new(kind, message)
}

/// GraphQL-over-HTTP executor.
///
/// Sends the stored access token as a bearer credential when one is present
/// and not yet expired.
pub struct HttpExecutor {
    endpoint: String,
    client: reqwest::Client,
    tokens: TokenStore,
}

impl HttpExecutor {
    pub fn new(config: &ApiConfig, tokens: TokenStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
            tokens,
        })
    }

    async fn execute(&self, operation: &Operation, variables: Value) -> Result<Value, ExecutionError> {
        let body = GraphQlRequest {
            query: operation.document,
            variables: &variables,
            operation_name: operation.name,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = self.tokens.get_access_token() {
            if !tokens::is_token_expired(&token) {
                request = request.bearer_auth(token);
            }
        }

        tracing::debug!(operation = operation.name, endpoint = %self.endpoint, "Executing GraphQL operation");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(operation = operation.name, error = %e, "GraphQL request failed");
            ExecutionError::network(format!("Request to {} failed: {}", self.endpoint, e))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ExecutionError::authentication(format!(
                "Backend refused the request ({})",
                status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ExecutionError::network(format!("Failed to read response: {}", e)))?;

        let payload: GraphQlResponse = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                ExecutionError::response(format!("Invalid GraphQL response: {}", e))
            } else {
                ExecutionError::response(format!("Backend error: {} - {}", status, truncate(&text, 200)))
            }
        })?;

        if !payload.errors.is_empty() {
            let err = classify_errors(&payload.errors);
            tracing::debug!(operation = operation.name, kind = ?err.kind(), error = %err, "GraphQL errors");
            return Err(err);
        }

        payload
            .data
            .ok_or_else(|| ExecutionError::response("GraphQL response carried no data"))
    }
}

#[async_trait]
impl GraphqlExecutor for HttpExecutor {
    async fn query(&self, operation: &Operation, variables: Value) -> Result<Value, ExecutionError> {
        self.execute(operation, variables).await
    }

    async fn mutate(&self, operation: &Operation, variables: Value) -> Result<Value, ExecutionError> {
        self.execute(operation, variables).await
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}
