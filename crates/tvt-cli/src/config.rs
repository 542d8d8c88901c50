use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use tvt_core::config::Config;

pub const API_URL_ENV: &str = "TVT_API_URL";

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tvt").join("config.toml"))
}

/// Loads `path` if given (it must exist), otherwise the per-user config file
/// when present, otherwise defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("invalid config in {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Flag wins over environment, environment wins over the file.
pub fn apply_api_url(config: &mut Config, env_url: Option<String>, flag_url: Option<String>) {
    let url = flag_url
        .or(env_url)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());
    if let Some(url) = url {
        config.api.base_url = url;
    }
}
