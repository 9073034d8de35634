use std::fs;
use std::path::{Path, PathBuf};

pub const SAMPLE_CONFIG: &str = include_str!("../../samples/sample-config.yml");

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    if stdout {
        print!("{}", SAMPLE_CONFIG);
        return Ok(());
    }

    let config_path = dirs::home_dir()
        .map(|home| home.join(".config/insights/config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/insights/config.yml"));

    write_config(&config_path)?;
    println!("Config written to {}", config_path.display());
    Ok(())
}

/// Write the sample config to `path`, refusing to overwrite an existing file.
pub fn write_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!(
            "Config file already exists at {}. Remove it first or use --stdout.",
            path.display()
        )
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
    }

    fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;
    Ok(())
}
