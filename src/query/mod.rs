pub mod cloudwatch;
pub mod service;
pub mod types;
pub mod window;

pub use cloudwatch::CloudWatchInsights;
pub use service::{QueryService, QueryServiceError};
pub use types::{LogRecord, QueryHandle, QueryPoll, QueryRequest, QueryStatus};
pub use window::TimeWindow;
