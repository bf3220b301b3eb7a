//! td config: print the effective configuration.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{default_config_path, Config};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

use super::StoreLocation;

pub struct ConfigOptions {
    pub toml: bool,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct ConfigOutput {
    config_path: Option<PathBuf>,
    config_file_exists: bool,
    data_dir: PathBuf,
    config: Config,
}

pub fn run(options: ConfigOptions) -> Result<()> {
    let config = Config::discover(options.location.config.as_deref())?;
    if options.toml {
        if options.json {
            return Err(Error::InvalidArgument(
                "--toml cannot be combined with --json".to_string(),
            ));
        }
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    let config_path = options.location.config.clone().or_else(default_config_path);
    let config_file_exists = config_path.as_ref().is_some_and(|path| path.exists());
    let data_dir = match options.location.data_dir.clone() {
        Some(dir) => dir,
        None => config.storage.resolve_data_dir()?,
    };

    let mut human = HumanOutput::new("td config");
    match config_path.as_ref() {
        Some(path) if config_file_exists => {
            human.push_summary("Config file", path.display().to_string())
        }
        Some(path) => human.push_summary(
            "Config file",
            format!("{} (not present, using defaults)", path.display()),
        ),
        None => human.push_summary("Config file", "(none, using defaults)"),
    }
    human.push_summary("Data dir", data_dir.display().to_string());
    human.push_summary("Primary key", config.storage.primary_key.clone());
    human.push_summary("Legacy keys", config.storage.legacy_keys.join(", "));
    human.push_summary("Lock timeout", format!("{}ms", config.storage.lock_timeout_ms));
    human.push_summary("Default status", config.tasks.default_status.clone());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "config",
        &ConfigOutput {
            config_path,
            config_file_exists,
            data_dir,
            config,
        },
        Some(&human),
    )
}
