//! Configuration Vault – reads/writes `~/.ecobot/config.toml`.

use ecobot_sim::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Supported completion backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Gemini,
    Ollama,
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiProvider::Gemini => write!(f, "gemini"),
            AiProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl AiProvider {
    /// Model used when switching to this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini-2.5-flash",
            AiProvider::Ollama => "llama3",
        }
    }
}

/// Persisted user configuration stored in `~/.ecobot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chosen completion backend.
    #[serde(default)]
    pub ai_provider: AiProvider,

    /// Active model name (e.g. "gemini-2.5-flash", "llama3").
    #[serde(default = "default_model")]
    pub active_model: String,

    /// Base URL of the hosted Gemini API.
    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,

    /// Base URL of the Ollama instance.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Gemini API key (stored as plain text – the file is created 0600).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gemini_api_key: String,

    /// Headless render loop rate in frames per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Pond, robot and battery parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("ai_provider", &self.ai_provider)
            .field("active_model", &self.active_model)
            .field("gemini_url", &self.gemini_url)
            .field("ollama_url", &self.ollama_url)
            .field(
                "gemini_api_key",
                if self.gemini_api_key.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("frame_rate", &self.frame_rate)
            .field("simulation", &self.simulation)
            .finish()
    }
}

fn default_model() -> String {
    AiProvider::Gemini.default_model().to_string()
}
fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_frame_rate() -> u32 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_provider: AiProvider::default(),
            active_model: default_model(),
            gemini_url: default_gemini_url(),
            ollama_url: default_ollama_url(),
            gemini_api_key: String::new(),
            frame_rate: default_frame_rate(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Return the path to `~/.ecobot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".ecobot").join("config.toml")
}

/// Load the config from disk with environment overrides applied.
/// Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Load the config, falling back to defaults (still env-overridden) when the
/// file is missing or unreadable.
pub fn load_or_default() -> Config {
    match load() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            tracing::warn!(error = %e, "config unreadable; using defaults");
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ECOBOT_MODEL` | `active_model` |
/// | `ECOBOT_GEMINI_URL` | `gemini_url` |
/// | `ECOBOT_OLLAMA_URL` | `ollama_url` |
/// | `ECOBOT_SEED` | `simulation.seed` |
/// | `GEMINI_API_KEY`, then `API_KEY` | `gemini_api_key` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ECOBOT_MODEL") {
        cfg.active_model = v;
    }
    if let Ok(v) = std::env::var("ECOBOT_GEMINI_URL") {
        cfg.gemini_url = v;
    }
    if let Ok(v) = std::env::var("ECOBOT_OLLAMA_URL") {
        cfg.ollama_url = v;
    }
    if let Ok(v) = std::env::var("ECOBOT_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.simulation.seed = Some(seed);
    }
    if let Some(key) = ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
    {
        cfg.gemini_api_key = key;
    }
}

/// Save the config to disk, creating `~/.ecobot/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
