use crate::cli::time::{resolve_window, TimeArgError};
use crate::config::{default_config_locations, load_config, resolve_config_path, Config, ConfigError};
use crate::query::CloudWatchInsights;
use crate::runner::{run_query, QueryParams, RunError, RunSettings};
use chrono::Local;
use clap::{ArgGroup, Args};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("--appname requires a config file, searched:\n{0}")]
    ConfigNotFound(String),

    #[error("invalid time arguments: {0}")]
    Time(#[from] TimeArgError),

    #[error(transparent)]
    Run(#[from] RunError),
}

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["appname", "log_groups"])))]
pub struct RunArgs {
    /// How far back from now to fetch logs, e.g. 120m, 3h, 2d
    #[arg(long, default_value = "60m")]
    pub timedelta: String,

    /// Start time, format: YYYY-MM-DD HH:MM:SS (local time)
    #[arg(long)]
    pub start: Option<String>,

    /// End time, format: YYYY-MM-DD HH:MM:SS (local time)
    #[arg(long)]
    pub end: Option<String>,

    /// Regular expression matched against @message by the default query
    #[arg(long, default_value = "")]
    pub filter: String,

    /// Application whose log groups are listed in the config file
    #[arg(long)]
    pub appname: Option<String>,

    /// Log groups to query (up to 20)
    #[arg(long = "log-groups", alias = "log_groups", num_args = 1..)]
    pub log_groups: Vec<String>,

    /// Value substituted for $ENV in configured log group names
    #[arg(long)]
    pub env: Option<String>,

    /// Seconds to wait between query status polls
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub wait: Option<u64>,

    /// Full Insights query, replaces the default filter query
    #[arg(long)]
    pub query: Option<String>,

    /// Keep following new logs until interrupted
    #[arg(long)]
    pub tail: bool,

    /// Records requested per query
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output file (default: <output_dir>/<appname>.log)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub profile: Option<String>,

    /// Only write the output file, do not echo lines to stdout
    #[arg(long)]
    pub quiet: bool,
}

pub fn default_query(filter: &str) -> String {
    format!(
        "fields @timestamp, @message | filter @message like /{}/ | sort @timestamp",
        filter
    )
}

/// Output file for a run: explicit path, else `<output_dir>/<app>.log`, else
/// `<output_dir>/awsinsights.log`.
pub fn output_path(explicit: Option<&Path>, output_dir: &Path, appname: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let file_name = format!("{}.log", appname.unwrap_or("awsinsights"));
    output_dir.join(file_name)
}

pub async fn run(config_path: Option<PathBuf>, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    run_command(config_path.as_deref(), args).await.map_err(|e| {
        error!(error = %e, "Run failed");
        e.into()
    })
}

async fn run_command(config_path: Option<&Path>, args: RunArgs) -> Result<(), CommandError> {
    let loaded = load_optional_config(config_path)?;
    let defaults = loaded
        .as_ref()
        .map(|(config, _)| config.defaults.clone())
        .unwrap_or_default();
    let env = args.env.clone().unwrap_or_else(|| defaults.env.clone());

    let log_groups = match &args.appname {
        Some(app) => {
            let (config, path) = loaded.as_ref().ok_or_else(|| {
                CommandError::ConfigNotFound(
                    default_config_locations()
                        .iter()
                        .map(|p| format!("  {}", p.display()))
                        .collect::<Vec<_>>()
                        .join("\n"),
                )
            })?;
            info!(app = %app, config_path = %path.display(), "Checking whether app is configured");
            let groups = config.log_groups_for(app, &env, path)?;
            info!(app = %app, count = groups.len(), "App configured, found log groups");
            groups
        }
        None => args.log_groups.clone(),
    };
    info!(log_groups = ?log_groups, "Log groups");

    let window = resolve_window(
        args.start.as_deref(),
        args.end.as_deref(),
        &args.timedelta,
        Local::now(),
    )?;

    let settings = RunSettings {
        query_string: args.query.clone().unwrap_or_else(|| default_query(&args.filter)),
        log_groups,
        limit: args.limit.unwrap_or(defaults.limit),
        poll_interval: args
            .wait
            .map(std::time::Duration::from_secs)
            .unwrap_or(defaults.poll_interval),
        tail: args.tail,
    };

    let params = QueryParams {
        window,
        settings,
        output_path: output_path(
            args.output.as_deref(),
            &defaults.output_dir,
            args.appname.as_deref(),
        ),
        mirror_stdout: !args.quiet,
    };

    if params.settings.tail {
        info!("LISTENING IN TAIL MODE...");
    }

    let service = CloudWatchInsights::from_env(
        args.region.clone().or(defaults.region.clone()),
        args.profile.clone().or(defaults.profile.clone()),
    )
    .await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = run_query(&service, &params, Some(shutdown_rx)).await?;
    info!(
        records = summary.records_emitted,
        cycles = summary.cycles,
        path = %params.output_path.display(),
        "Logs written"
    );

    Ok(())
}

/// Load the config file if one is given or found. An explicit path must exist.
fn load_optional_config(explicit: Option<&Path>) -> Result<Option<(Config, PathBuf)>, ConfigError> {
    match resolve_config_path(explicit) {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            let config = load_config(&path)?;
            Ok(Some((config, path)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn test_wait_must_be_positive() {
        let parsed = TestCli::try_parse_from(["insights", "--log-groups", "/ecs/a", "--wait", "3"]).unwrap();
        assert_eq!(parsed.run.wait, Some(3));

        assert!(TestCli::try_parse_from(["insights", "--log-groups", "/ecs/a", "--wait", "0"]).is_err());
    }

    #[test]
    fn test_default_query_embeds_filter() {
        assert_eq!(
            default_query("ERROR|WARN"),
            "fields @timestamp, @message | filter @message like /ERROR|WARN/ | sort @timestamp"
        );
    }

    #[test]
    fn test_output_path_defaults() {
        let dir = Path::new("/tmp");
        assert_eq!(output_path(None, dir, Some("orders")), PathBuf::from("/tmp/orders.log"));
        assert_eq!(output_path(None, dir, None), PathBuf::from("/tmp/awsinsights.log"));
        assert_eq!(
            output_path(Some(Path::new("out.txt")), dir, Some("orders")),
            PathBuf::from("out.txt")
        );
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let result = load_optional_config(Some(Path::new("/nonexistent/insights/config.yml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
