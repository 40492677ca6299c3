use crate::batch::{BatchLimits, DEFAULT_MAX_NODES, DEFAULT_MAX_PAYLOAD_CHARS};
use crate::split::DEFAULT_MAX_CHARS;
use crate::tana::DEFAULT_ENDPOINT;
use anyhow::{Context, Result, bail};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};

pub const APP_DIR_NAME: &str = "csv2tana";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;
pub const DEFAULT_SCHEMA_DELAY_MS: u64 = 1000;

/// On-disk settings. API tokens are never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: std::collections::BTreeMap<String, Profile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub endpoint: Option<String>,
    pub delimiter: Option<String>,
    pub max_nodes_per_batch: Option<usize>,
    pub max_payload_chars: Option<usize>,
    pub request_delay_ms: Option<u64>,
    pub schema_delay_ms: Option<u64>,
    pub max_paste_chars: Option<usize>,
}

pub fn default_config_path() -> Result<PathBuf> {
    let base = config_dir().context("unable to resolve OS config directory")?;
    Ok(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn ensure_config_parent_exists(path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating config dir: {}", parent.display()))?;
    }
    Ok(())
}

pub fn load_config_if_exists(path: &PathBuf) -> Result<Option<AppConfig>> {
    if path.exists() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&text).context("parsing config TOML")?;
        Ok(Some(cfg))
    } else {
        Ok(None)
    }
}

pub fn write_config(path: &PathBuf, cfg: &AppConfig) -> Result<()> {
    ensure_config_parent_exists(path)?;
    let text = toml::to_string_pretty(cfg).context("serializing config to TOML")?;
    fs::write(path, text).with_context(|| format!("writing config file: {}", path.display()))?;
    Ok(())
}

/// Command-line values that take precedence over the profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub profile: Option<&'a str>,
    pub endpoint: Option<&'a str>,
    pub delimiter: Option<&'a str>,
    pub max_paste_chars: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub endpoint: String,
    pub delimiter: Option<String>,
    pub limits: BatchLimits,
    pub request_delay: Duration,
    pub schema_delay: Duration,
    pub max_paste_chars: usize,
}

impl EffectiveSettings {
    pub fn from_profile(profile: &Profile, cli: &Overrides<'_>) -> Result<Self> {
        let limits = BatchLimits {
            max_nodes: profile.max_nodes_per_batch.unwrap_or(DEFAULT_MAX_NODES),
            max_chars: profile.max_payload_chars.unwrap_or(DEFAULT_MAX_PAYLOAD_CHARS),
        };
        if limits.max_nodes == 0 || limits.max_chars == 0 {
            bail!("invalid batch limits: max_nodes_per_batch and max_payload_chars must be positive");
        }
        let max_paste_chars = cli.max_paste_chars.or(profile.max_paste_chars).unwrap_or(DEFAULT_MAX_CHARS);
        if max_paste_chars == 0 {
            bail!("invalid --max-chars: must be positive");
        }
        let delimiter = cli
            .delimiter
            .map(str::to_string)
            .or_else(|| profile.delimiter.clone())
            .filter(|d| !d.is_empty());

        Ok(Self {
            endpoint: cli.endpoint.map(str::to_string).or_else(|| profile.endpoint.clone()).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            delimiter,
            limits,
            request_delay: Duration::from_millis(profile.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS)),
            schema_delay: Duration::from_millis(profile.schema_delay_ms.unwrap_or(DEFAULT_SCHEMA_DELAY_MS)),
            max_paste_chars,
        })
    }
}

pub fn resolve_effective_settings(cli: &Overrides<'_>) -> Result<EffectiveSettings> {
    let path = default_config_path()?;
    let cfg = load_config_if_exists(&path)?.unwrap_or_default();
    let profile_name = cli
        .profile
        .map(|s| s.to_string())
        .or(cfg.default_profile.clone())
        .unwrap_or_else(|| "default".to_string());
    let profile = cfg.profiles.get(&profile_name).cloned().unwrap_or_default();
    log::debug!("using profile '{}' from {}", profile_name, path.display());
    EffectiveSettings::from_profile(&profile, cli)
}
