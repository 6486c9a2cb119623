use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file when none is given explicitly.
pub const CONFIG_ENV: &str = "ITC_CONFIG";

/// Environment variable overriding `codec.max_depth`.
pub const MAX_DEPTH_ENV: &str = "ITC_MAX_DEPTH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItcConfig {
    #[serde(default)]
    pub codec: CodecConfig,
}

/// Limits applied when decoding untrusted stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Deepest tree nesting the decoder will follow.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    /// Accept zero bytes up to the next 32-bit word after the stamp.
    #[serde(default = "default_true")]
    pub allow_word_padding: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_input_bytes: default_max_input_bytes(),
            allow_word_padding: default_true(),
        }
    }
}

/// Load a TOML config file. A missing file yields the defaults.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ItcConfig> {
    if !path.exists() {
        return Ok(ItcConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ItcConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the effective config: `explicit` path, else `ITC_CONFIG`, else
/// defaults; then apply `ITC_MAX_DEPTH` on top.
///
/// # Errors
///
/// Fails on an unreadable or malformed config file, or an `ITC_MAX_DEPTH`
/// that is not a non-negative integer.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ItcConfig> {
    resolve_config_from(
        explicit,
        env::var(CONFIG_ENV).ok(),
        env::var(MAX_DEPTH_ENV).ok(),
    )
}

fn resolve_config_from(
    explicit: Option<&Path>,
    env_path: Option<String>,
    env_max_depth: Option<String>,
) -> Result<ItcConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env_path.filter(|raw| !raw.trim().is_empty()).map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config(&path)?
        }
        None => ItcConfig::default(),
    };

    if let Some(raw) = env_max_depth {
        config.codec.max_depth = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {MAX_DEPTH_ENV} value `{raw}`"))?;
    }

    Ok(config)
}

const fn default_true() -> bool {
    true
}

const fn default_max_depth() -> usize {
    256
}

const fn default_max_input_bytes() -> usize {
    64 * 1024
}
