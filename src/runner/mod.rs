pub mod cycle;
pub mod sink;

pub use cycle::{
    next_step, run_query, ConfigurationError, Continuation, EmissionState, QueryCycleRunner,
    QueryParams, RunError, RunSettings, RunSummary, StopReason, DEFAULT_LIMIT, MAX_LOG_GROUPS,
};
pub use sink::{FileSink, LogSink, MemorySink};
