use std::fmt;

/// Field holding the record's timestamp, as reported by the query service.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Opaque per-record pointer. Part of record identity, never rendered.
pub const POINTER_FIELD: &str = "@ptr";

/// One result row: an ordered mapping from field name to string value.
///
/// Equality is structural over the field list, so two rows returned by
/// different queries compare equal when they carry the same fields and values
/// (including `@ptr`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    fields: Vec<(String, String)>,
}

impl LogRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append a field. A repeated name replaces the earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get(TIMESTAMP_FIELD)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Lifecycle state of a submitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    /// Any status string the service reports that we do not recognise.
    Unknown,
}

impl QueryStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            QueryStatus::Complete
            | QueryStatus::Failed
            | QueryStatus::Cancelled
            | QueryStatus::Timeout => true,
            QueryStatus::Scheduled | QueryStatus::Running | QueryStatus::Unknown => false,
        }
    }

    /// Terminal statuses other than `Complete`.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            QueryStatus::Failed | QueryStatus::Cancelled | QueryStatus::Timeout
        )
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "Scheduled" => QueryStatus::Scheduled,
            "Running" => QueryStatus::Running,
            "Complete" => QueryStatus::Complete,
            "Failed" => QueryStatus::Failed,
            "Cancelled" => QueryStatus::Cancelled,
            "Timeout" => QueryStatus::Timeout,
            _ => QueryStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Scheduled => "Scheduled",
            QueryStatus::Running => "Running",
            QueryStatus::Complete => "Complete",
            QueryStatus::Failed => "Failed",
            QueryStatus::Cancelled => "Cancelled",
            QueryStatus::Timeout => "Timeout",
            QueryStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single query submission. Built fresh for every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub log_group_names: Vec<String>,
    /// Epoch seconds, inclusive.
    pub start_time: i64,
    /// Epoch seconds, inclusive.
    pub end_time: i64,
    pub query_string: String,
    pub limit: usize,
}

/// Identifier handed back by the service for a submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one status poll. `records` is only meaningful when `Complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPoll {
    pub status: QueryStatus,
    pub records: Vec<LogRecord>,
}

impl QueryPoll {
    pub fn pending(status: QueryStatus) -> Self {
        Self {
            status,
            records: Vec::new(),
        }
    }

    pub fn complete(records: Vec<LogRecord>) -> Self {
        Self {
            status: QueryStatus::Complete,
            records,
        }
    }
}
