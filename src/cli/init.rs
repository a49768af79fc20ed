//! power6 init command implementation
//!
//! Creates the data directory and a default `config.toml`.

use std::path::{Path, PathBuf};

use crate::config::{self, Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    config: PathBuf,
    created_dir: bool,
    wrote_config: bool,
}

pub fn run(data_dir: Option<&Path>, force: bool, output: OutputOptions) -> Result<()> {
    let data_dir = config::resolve_data_dir(data_dir);
    let config_path = data_dir.join(CONFIG_FILE);

    let created_dir = !data_dir.exists();
    std::fs::create_dir_all(&data_dir)?;

    let wrote_config = force || !config_path.exists();
    if wrote_config {
        Config::default().save(&config_path)?;
        tracing::debug!(path = %config_path.display(), "wrote default config");
    }

    let header = if wrote_config {
        "power6 init: wrote default config"
    } else {
        "power6 init: nothing to do"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", data_dir.display().to_string());
    human.push_summary("config", config_path.display().to_string());
    if !wrote_config {
        human.push_warning("config.toml already exists; pass --force to overwrite");
    }
    human.push_next_step("set [remote] enabled = true in config.toml to sync");

    let report = InitReport {
        data_dir,
        config: config_path,
        created_dir,
        wrote_config,
    };
    emit_success(output, "init", &report, Some(&human))
}
