//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod output;
pub mod process;

use std::path::Path;

use factura_core::models::config::FacturaConfig;
use tracing::debug;

/// Load the configuration used by `process` and `batch`.
///
/// An explicit `--config` path wins; otherwise the user config file is read
/// when it exists. Environment overrides are applied last.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FacturaConfig> {
    let config = match config_path {
        Some(path) => FacturaConfig::from_file(Path::new(path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                debug!("Using config file {}", default_path.display());
                FacturaConfig::from_file(&default_path)?
            } else {
                FacturaConfig::default()
            }
        }
    };

    Ok(config.with_env_overrides()?)
}
