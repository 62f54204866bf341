//! Scripted executor for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

use super::{ExecutionError, GraphqlExecutor, Operation};

/// Replays queued responses in order and records every operation name.
#[derive(Default)]
pub(crate) struct MockExecutor {
    responses: Mutex<VecDeque<Result<Value, ExecutionError>>>,
    calls: Mutex<Vec<(String, Value)>>,
    gate: Option<Arc<Notify>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits for one `notify_one` on `gate` before answering
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_ok(&self, data: Value) -> &Self {
        self.responses.lock().push_back(Ok(data));
        self
    }

    pub fn push_err(&self, err: ExecutionError) -> &Self {
        self.responses.lock().push_back(Err(err));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn operations(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn last_variables(&self) -> Option<Value> {
        self.calls.lock().last().map(|(_, vars)| vars.clone())
    }

    async fn answer(&self, operation: &Operation, variables: Value) -> Result<Value, ExecutionError> {
        self.calls
            .lock()
            .push((operation.name.to_string(), variables));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ExecutionError::network("no scripted response")))
    }
}

#[async_trait]
impl GraphqlExecutor for MockExecutor {
    async fn query(&self, operation: &Operation, variables: Value) -> Result<Value, ExecutionError> {
        self.answer(operation, variables).await
    }

    async fn mutate(&self, operation: &Operation, variables: Value) -> Result<Value, ExecutionError> {
        self.answer(operation, variables).await
    }
}
