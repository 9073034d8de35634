use super::service::{QueryService, QueryServiceError};
use super::types::{LogRecord, QueryHandle, QueryPoll, QueryRequest, QueryStatus};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use aws_sdk_cloudwatchlogs::config::Region;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use aws_sdk_cloudwatchlogs::types::ResultField;
use tracing::debug;

/// Largest result set a single Insights query can return.
pub const MAX_QUERY_LIMIT: usize = 10_000;

/// CloudWatch Logs Insights backend. `StartQuery` submits a query over up to
/// 20 log groups and `GetQueryResults` reports its status and matched rows.
#[derive(Clone)]
pub struct CloudWatchInsights {
    client: cloudwatchlogs::Client,
}

impl CloudWatchInsights {
    pub fn new(client: cloudwatchlogs::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain, optionally pinned to a
    /// region and a named profile.
    pub async fn from_env(region: Option<String>, profile: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let aws_config = loader.load().await;

        Self::new(cloudwatchlogs::Client::new(&aws_config))
    }
}

#[async_trait]
impl QueryService for CloudWatchInsights {
    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryHandle, QueryServiceError> {
        if request.limit == 0 || request.limit > MAX_QUERY_LIMIT {
            return Err(QueryServiceError::InvalidLimit(request.limit));
        }
        let limit =
            i32::try_from(request.limit).map_err(|_| QueryServiceError::InvalidLimit(request.limit))?;

        let response = self
            .client
            .start_query()
            .set_log_group_names(Some(request.log_group_names.clone()))
            .start_time(request.start_time)
            .end_time(request.end_time)
            .query_string(request.query_string.clone())
            .limit(limit)
            .send()
            .await
            .map_err(|e| QueryServiceError::Submit(DisplayErrorContext(&e).to_string()))?;

        let query_id = response
            .query_id()
            .ok_or(QueryServiceError::MissingQueryId)?;
        debug!(query_id = %query_id, "Query submitted");

        Ok(QueryHandle::new(query_id))
    }

    async fn poll_query(&self, handle: &QueryHandle) -> Result<QueryPoll, QueryServiceError> {
        let response = self
            .client
            .get_query_results()
            .query_id(handle.as_str())
            .send()
            .await
            .map_err(|e| QueryServiceError::Poll(DisplayErrorContext(&e).to_string()))?;

        let status = response
            .status()
            .map(|s| QueryStatus::parse(s.as_str()))
            .unwrap_or(QueryStatus::Unknown);

        if status != QueryStatus::Complete {
            return Ok(QueryPoll::pending(status));
        }

        let records = response
            .results()
            .iter()
            .map(|row| record_from_row(row))
            .collect();

        Ok(QueryPoll::complete(records))
    }
}

fn record_from_row(row: &[ResultField]) -> LogRecord {
    let mut record = LogRecord::new();
    for field in row {
        // Rows occasionally carry a value-less field; keep it so the row's
        // shape matches across queries.
        if let Some(name) = field.field() {
            record.insert(name, field.value().unwrap_or_default());
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_row_preserves_field_order() {
        let row = vec![
            ResultField::builder()
                .field("@timestamp")
                .value("2024-03-01 10:00:00.000")
                .build(),
            ResultField::builder().field("@message").value("hello").build(),
            ResultField::builder().field("@ptr").value("abc").build(),
        ];

        let record = record_from_row(&row);
        let names: Vec<&str> = record.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["@timestamp", "@message", "@ptr"]);
        assert_eq!(record.get("@message"), Some("hello"));
    }

    #[test]
    fn test_record_from_row_skips_nameless_fields() {
        let row = vec![
            ResultField::builder().value("orphan").build(),
            ResultField::builder().field("@message").build(),
        ];

        let record = record_from_row(&row);
        assert_eq!(record.fields().count(), 1);
        assert_eq!(record.get("@message"), Some(""));
    }
}
