pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_config, ConfigError};
pub use types::{Config, Defaults};

/// Matches `$env{VAR_NAME}` where VAR_NAME starts with a letter or underscore.
pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Locations searched when no config path is given, in order.
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home_dir) = dirs::home_dir() {
        locations.push(home_dir.join(".config/insights/config.yml"));
    }
    locations.push(PathBuf::from("/etc/insights/config.yml"));
    if let Some(home_dir) = dirs::home_dir() {
        locations.push(home_dir.join(".awsinsights.json"));
    }
    locations
}

/// Resolves the config file path based on explicit argument or default locations.
/// Returns the explicit path (tilde expanded) if given, otherwise the first
/// existing entry of [`default_config_locations`].
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    default_config_locations().into_iter().find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("INSIGHTS_TEST_VAR", "test_value");
        let result = expand_env_vars("path/$env{INSIGHTS_TEST_VAR}/file");
        assert_eq!(result, "path/test_value/file");
        std::env::remove_var("INSIGHTS_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_unset() {
        let result = expand_env_vars("path/$env{INSIGHTS_NONEXISTENT_VAR}/file");
        assert_eq!(result, "path/$env{INSIGHTS_NONEXISTENT_VAR}/file");
    }

    #[test]
    fn test_expand_env_vars_leaves_env_placeholder() {
        // $ENV in log group names is substituted later, per app lookup
        let result = expand_env_vars("/aws/lambda/orders-$ENV-api");
        assert_eq!(result, "/aws/lambda/orders-$ENV-api");
    }

    #[test]
    fn test_expand_tilde_with_path() {
        let expanded = expand_tilde(Path::new("~/logs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("logs"));
        }
    }

    #[test]
    fn test_expand_tilde_no_expansion() {
        let expanded = expand_tilde(Path::new("/absolute/path"));
        assert_eq!(expanded, Path::new("/absolute/path"));
    }

    #[test]
    fn test_resolve_explicit_path_wins() {
        let resolved = resolve_config_path(Some(Path::new("/nonexistent/insights.yml")));
        assert_eq!(resolved, Some(PathBuf::from("/nonexistent/insights.yml")));
    }
}
