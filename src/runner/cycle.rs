use crate::emitter::{dedupe, render_line};
use crate::query::window::parse_service_timestamp;
use crate::query::{LogRecord, QueryRequest, QueryService, QueryServiceError, QueryStatus, TimeWindow};
use crate::runner::sink::{FileSink, LogSink};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Most log groups a single query may name.
pub const MAX_LOG_GROUPS: usize = 20;

/// Records requested per query unless configured otherwise.
pub const DEFAULT_LIMIT: usize = 10_000;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("0 log groups configured")]
    NoLogGroups,

    #[error("{0} log groups configured, at most {MAX_LOG_GROUPS} can be queried together")]
    TooManyLogGroups(usize),

    #[error("query limit must be greater than zero")]
    ZeroLimit,

    #[error("start time {start} is after end time {end}")]
    InvertedWindow {
        start: DateTime<Local>,
        end: DateTime<Local>,
    },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("query service error: {0}")]
    Service(#[from] QueryServiceError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parameters that stay fixed for a whole run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub query_string: String,
    pub log_groups: Vec<String>,
    pub limit: usize,
    pub poll_interval: Duration,
    pub tail: bool,
}

impl RunSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.log_groups.is_empty() {
            return Err(ConfigurationError::NoLogGroups);
        }
        if self.log_groups.len() > MAX_LOG_GROUPS {
            return Err(ConfigurationError::TooManyLogGroups(self.log_groups.len()));
        }
        if self.limit == 0 {
            return Err(ConfigurationError::ZeroLimit);
        }
        Ok(())
    }
}

/// Everything `run_query` needs: the initial window, run settings and where
/// to write the output.
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub window: TimeWindow,
    pub settings: RunSettings,
    pub output_path: PathBuf,
    pub mirror_stdout: bool,
}

/// The last record handed to the sink. Carried across cycles; never reset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmissionState {
    pub last_emitted: Option<LogRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Bounded run whose latest query matched nothing.
    NoMatches,
    /// Bounded run whose latest batch was smaller than the limit.
    WindowExhausted,
    /// Shutdown was requested.
    Cancelled,
}

/// What to do after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Query again immediately.
    Continue,
    /// Tail mode with nothing new: wait one poll interval, then query again.
    Idle,
    Stop(StopReason),
}

/// Decide whether another cycle is needed after a batch of `batch_len` rows.
///
/// A full batch means the window may hold more data, tail mode always goes
/// on, and an empty batch ends a bounded run instead of re-querying forever.
pub fn next_step(batch_len: usize, limit: usize, tail: bool) -> Continuation {
    if batch_len == 0 {
        if tail {
            Continuation::Idle
        } else {
            Continuation::Stop(StopReason::NoMatches)
        }
    } else if tail || batch_len >= limit {
        Continuation::Continue
    } else {
        Continuation::Stop(StopReason::WindowExhausted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub records_emitted: u64,
    pub failed_queries: u64,
    pub stop: StopReason,
}

enum QueryOutcome {
    Complete(Vec<LogRecord>),
    Failed(QueryStatus),
    Interrupted,
}

/// Drives the submit, poll, dedupe and emit cycles of a single run.
pub struct QueryCycleRunner<'a, S: QueryService + ?Sized> {
    service: &'a S,
    settings: RunSettings,
    window: TimeWindow,
    state: EmissionState,
    shutdown: Option<watch::Receiver<bool>>,
    cycles: u64,
    records_emitted: u64,
    failed_queries: u64,
}

impl<'a, S: QueryService + ?Sized> QueryCycleRunner<'a, S> {
    pub fn new(
        service: &'a S,
        window: TimeWindow,
        settings: RunSettings,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        if !window.is_ordered() {
            return Err(ConfigurationError::InvertedWindow {
                start: window.start,
                end: window.end,
            });
        }

        Ok(Self {
            service,
            settings,
            window,
            state: EmissionState::default(),
            shutdown: None,
            cycles: 0,
            records_emitted: 0,
            failed_queries: 0,
        })
    }

    /// Stop between cycles (or while waiting) once `shutdown` reads `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn state(&self) -> &EmissionState {
        &self.state
    }

    pub async fn run(&mut self, sink: &mut dyn LogSink) -> Result<RunSummary, RunError> {
        let stop = loop {
            if self.is_cancelled() {
                break StopReason::Cancelled;
            }

            self.cycles += 1;
            if self.cycles > 1 {
                self.advance_window();
            }
            if self.settings.tail {
                self.window.extend_to(Local::now());
            }

            let batch = match self.execute_query().await? {
                QueryOutcome::Complete(records) => records,
                QueryOutcome::Failed(status) => {
                    self.failed_queries += 1;
                    error!(
                        cycle = self.cycles,
                        window = %self.window,
                        status = %status,
                        "Query did not complete, treating cycle as empty"
                    );
                    Vec::new()
                }
                QueryOutcome::Interrupted => break StopReason::Cancelled,
            };

            let emitted = self.emit(&batch, sink)?;
            debug!(
                cycle = self.cycles,
                records = batch.len(),
                emitted = emitted,
                "Cycle complete"
            );

            match next_step(batch.len(), self.settings.limit, self.settings.tail) {
                Continuation::Continue => {}
                Continuation::Idle => {
                    debug!(cycle = self.cycles, "No new records yet");
                    if self.pause(self.settings.poll_interval).await {
                        break StopReason::Cancelled;
                    }
                }
                Continuation::Stop(reason) => {
                    if reason == StopReason::NoMatches {
                        warn!(window = %self.window, "   => 0 logs found which match defined filter...");
                    }
                    break reason;
                }
            }
        };

        info!(
            cycles = self.cycles,
            records = self.records_emitted,
            failed_queries = self.failed_queries,
            reason = ?stop,
            "Run finished"
        );

        Ok(RunSummary {
            cycles: self.cycles,
            records_emitted: self.records_emitted,
            failed_queries: self.failed_queries,
            stop,
        })
    }

    /// Start the next query at the last emitted record's own timestamp.
    fn advance_window(&mut self) {
        let Some(last) = self.state.last_emitted.as_ref() else {
            return;
        };

        match last.timestamp().map(parse_service_timestamp) {
            Some(Ok(start)) => self.window.advance_start(start),
            Some(Err(e)) => {
                warn!(error = %e, window = %self.window, "Boundary record has an unreadable timestamp, keeping window start");
            }
            None => {
                warn!(window = %self.window, "Boundary record has no @timestamp, keeping window start");
            }
        }
    }

    async fn execute_query(&mut self) -> Result<QueryOutcome, QueryServiceError> {
        let service = self.service;
        let request = QueryRequest {
            log_group_names: self.settings.log_groups.clone(),
            start_time: self.window.start_epoch(),
            end_time: self.window.end_epoch(),
            query_string: self.settings.query_string.clone(),
            limit: self.settings.limit,
        };

        debug!(
            cycle = self.cycles,
            start = %self.window.start,
            end = %self.window.end,
            "Submitting query"
        );
        let handle = service.submit_query(&request).await.map_err(|e| {
            error!(error = %e, window = %self.window, "Query submission failed");
            e
        })?;

        let mut status = QueryStatus::Scheduled;
        loop {
            let wait_secs = self.settings.poll_interval.as_secs_f64();
            if self.settings.tail {
                debug!(query_id = %handle, status = %status, "waiting {} seconds for query results", wait_secs);
            } else {
                info!("waiting {} seconds for query results - status: {}", wait_secs, status);
            }

            if self.pause(self.settings.poll_interval).await {
                return Ok(QueryOutcome::Interrupted);
            }

            let poll = service.poll_query(&handle).await.map_err(|e| {
                error!(error = %e, query_id = %handle, window = %self.window, "Polling query failed");
                e
            })?;

            if poll.status.is_failure() {
                return Ok(QueryOutcome::Failed(poll.status));
            }
            if poll.status.is_terminal() {
                return Ok(QueryOutcome::Complete(poll.records));
            }
            status = poll.status;
        }
    }

    /// Write the new part of `batch` and move the boundary. Returns the number
    /// of lines written.
    fn emit(&mut self, batch: &[LogRecord], sink: &mut dyn LogSink) -> Result<usize, RunError> {
        let outcome = dedupe(self.state.last_emitted.as_ref(), batch);

        if outcome.skipped() > 0 {
            debug!(skipped = outcome.skipped(), "Dropped records already written last cycle");
        }
        for record in outcome.emitted {
            sink.write_line(&render_line(record))?;
        }
        sink.flush()?;

        if let Some(last) = outcome.new_last {
            if outcome.emitted.is_empty() && batch.len() >= self.settings.limit {
                warn!(
                    window = %self.window,
                    "Full batch contained no new records, window start did not advance"
                );
            }
            self.state.last_emitted = Some(last.clone());
        }

        let emitted = outcome.emitted.len();
        self.records_emitted += emitted as u64;
        Ok(emitted)
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().map_or(false, |rx| *rx.borrow())
    }

    /// Sleep for `duration`, waking early on shutdown. Returns `true` when the
    /// run should stop.
    async fn pause(&mut self, duration: Duration) -> bool {
        let Some(rx) = self.shutdown.as_mut() else {
            tokio::time::sleep(duration).await;
            return false;
        };
        if *rx.borrow() {
            return true;
        }

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return *rx.borrow(),
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Sender gone: no one can cancel us any more.
                        (&mut sleep).await;
                        return false;
                    }
                    if *rx.borrow() {
                        return true;
                    }
                }
            }
        }
    }
}

/// Run a complete retrieval: validate, truncate the output file, then cycle
/// until the window is exhausted (bounded) or shutdown is requested (tail).
pub async fn run_query<S: QueryService + ?Sized>(
    service: &S,
    params: &QueryParams,
    shutdown: Option<watch::Receiver<bool>>,
) -> Result<RunSummary, RunError> {
    let mut runner = match QueryCycleRunner::new(service, params.window, params.settings.clone()) {
        Ok(runner) => runner,
        Err(e) => {
            error!(error = %e, "Invalid query configuration");
            return Err(e.into());
        }
    };
    if let Some(rx) = shutdown {
        runner = runner.with_shutdown(rx);
    }

    let mut sink = FileSink::create(&params.output_path, params.mirror_stdout)?;
    info!(
        path = %sink.path().display(),
        log_groups = params.settings.log_groups.len(),
        window = %params.window,
        tail = params.settings.tail,
        "Retrieving logs"
    );

    let summary = runner.run(&mut sink).await?;
    info!(
        path = %sink.path().display(),
        lines = sink.lines_written(),
        "Output file complete"
    );
    Ok(summary)
}
