use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars, expand_tilde};
use crate::query::cloudwatch::MAX_QUERY_LIMIT;
use crate::runner::MAX_LOG_GROUPS;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("app '{app}' is not configured in {path}")]
    UnknownApp { app: String, path: String },

    #[error("app '{0}' has no log groups configured")]
    EmptyApp(String),
}

/// Load a config file. `.json` files use the legacy flat
/// `{ "app": ["group", ...] }` layout; everything else is YAML.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let mut config = if is_json {
        parse_legacy_json(&text)?
    } else {
        parse_yaml(&text)?
    };

    config.defaults.output_dir = expand_tilde(&config.defaults.output_dir);
    validate_config(&config)?;

    Ok(config)
}

pub fn parse_yaml(text: &str) -> Result<Config, ConfigError> {
    let text = expand_env_vars(text);
    check_unexpanded_vars(&text)?;
    Ok(serde_yaml::from_str(&text)?)
}

pub fn parse_legacy_json(text: &str) -> Result<Config, ConfigError> {
    let apps: BTreeMap<String, Vec<String>> = serde_json::from_str(text)?;
    Ok(Config {
        defaults: Defaults::default(),
        apps,
    })
}

fn check_unexpanded_vars(text: &str) -> Result<(), ConfigError> {
    let mut unexpanded: Vec<String> = env_var_pattern()
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    unexpanded.sort();
    unexpanded.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded.join(", ")
    )))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.defaults.limit == 0 || config.defaults.limit > MAX_QUERY_LIMIT {
        errors.push(format!(
            "defaults.limit must be between 1 and {}, got {}",
            MAX_QUERY_LIMIT, config.defaults.limit
        ));
    }

    if config.defaults.poll_interval.is_zero() {
        errors.push("defaults.poll_interval must be greater than zero".to_string());
    }

    for (app, groups) in &config.apps {
        if groups.len() > MAX_LOG_GROUPS {
            errors.push(format!(
                "app '{}' lists {} log groups, at most {} are allowed",
                app,
                groups.len(),
                MAX_LOG_GROUPS
            ));
        }
        if groups.iter().any(|g| g.trim().is_empty()) {
            errors.push(format!("app '{}' contains an empty log group name", app));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

impl Config {
    /// Log groups configured for `app`, with `$ENV` replaced by `env`.
    pub fn log_groups_for(&self, app: &str, env: &str, source: &Path) -> Result<Vec<String>, ConfigError> {
        let groups = self.apps.get(app).ok_or_else(|| ConfigError::UnknownApp {
            app: app.to_string(),
            path: source.display().to_string(),
        })?;

        if groups.is_empty() {
            return Err(ConfigError::EmptyApp(app.to_string()));
        }

        Ok(groups
            .iter()
            .map(|group| group.replace(ENV_PLACEHOLDER, env))
            .collect())
    }
}
