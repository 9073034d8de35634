use super::types::{QueryHandle, QueryPoll, QueryRequest};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryServiceError {
    #[error("failed to submit query: {0}")]
    Submit(String),

    #[error("failed to fetch query results: {0}")]
    Poll(String),

    #[error("query service returned no query id")]
    MissingQueryId,

    #[error("limit {0} is outside the range accepted by the query service")]
    InvalidLimit(usize),
}

/// Asynchronous log query backend: submit a query, then poll it until it
/// reaches a terminal status.
///
/// Implementations do not retry; transient failures surface as errors.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryHandle, QueryServiceError>;

    async fn poll_query(&self, handle: &QueryHandle) -> Result<QueryPoll, QueryServiceError>;
}
