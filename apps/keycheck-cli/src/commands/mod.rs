pub mod call;
pub mod personas;
pub mod run;
pub mod selftest;

pub use call::cmd_call;
pub use personas::cmd_personas;
pub use run::cmd_run;
pub use selftest::cmd_selftest;

use keycheck_config::{ConfigError, HarnessConfig};
use std::path::Path;

/// Load the config from `path` (or the default location) and apply the
/// endpoint override.
pub(crate) fn load_config(
    path: Option<&Path>,
    endpoint: Option<&str>,
) -> Result<HarnessConfig, ConfigError> {
    let mut config = match path {
        Some(path) => HarnessConfig::load_from(path)?,
        None => HarnessConfig::load()?,
    };
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint.to_string();
    }
    Ok(config)
}
