//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.snare/config.json`) and environment.
//! Secrets normally come from the environment (`API_SECRET_KEY`, `GEMINI_API_KEY`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Judge reporting settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Persona the model plays.
    #[serde(default)]
    pub persona: PersonaConfig,
}

/// Server bind, port, and caller credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for HTTP (default 10000).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_server_bind")]
    pub bind: String,

    /// Expected `x-api-key` value. Overridden by API_SECRET_KEY env.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_server_port() -> u16 {
    10000
}

fn default_server_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
            api_key: None,
        }
    }
}

/// Which generation backend answers as the persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackendKind {
    /// Google Gemini `generateContent`.
    #[default]
    Gemini,

    /// Local Ollama `/api/generate`.
    Ollama,
}

impl LlmBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackendKind::Gemini => "gemini",
            LlmBackendKind::Ollama => "ollama",
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: LlmBackendKind,

    /// Model id passed as-is to the backend. Defaults per backend when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Override the backend base URL (e.g. for a proxy or a non-default Ollama host).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Gemini API key. Overridden by GEMINI_API_KEY env.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout for one generation call.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackendKind::default(),
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Judge reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// When false, no report is ever scheduled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Collector endpoint that receives the final-result payload.
    #[serde(default = "default_report_url")]
    pub url: String,

    #[serde(default = "default_report_timeout_secs")]
    pub timeout_secs: u64,

    /// A report is sent once the exchanged-message count exceeds this, even without intelligence.
    #[serde(default = "default_message_threshold")]
    pub message_threshold: usize,
}

fn default_true() -> bool {
    true
}

fn default_report_url() -> String {
    "https://hackathon.guvi.in/api/updateHoneyPotFinalResult".to_string()
}

fn default_report_timeout_secs() -> u64 {
    5
}

fn default_message_threshold() -> usize {
    6
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_report_url(),
            timeout_secs: default_report_timeout_secs(),
            message_threshold: default_message_threshold(),
        }
    }
}

/// Persona overrides. Unset fields fall back to the built-in persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaConfig {
    /// Name used as the trailing cue in the prompt and in report notes.
    #[serde(default)]
    pub name: Option<String>,

    /// Full instruction block, inline.
    #[serde(default)]
    pub instructions: Option<String>,

    /// Instruction block read from a file. Relative paths resolve against the config file's parent.
    #[serde(default)]
    pub instructions_file: Option<PathBuf>,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the caller credential: env API_SECRET_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    env_non_empty("API_SECRET_KEY").or_else(|| trimmed(config.server.api_key.as_ref()))
}

/// Resolve the Gemini key: env GEMINI_API_KEY overrides config.
pub fn resolve_gemini_key(config: &Config) -> Option<String> {
    env_non_empty("GEMINI_API_KEY").or_else(|| trimmed(config.llm.api_key.as_ref()))
}

/// Apply env overrides that are not secrets (SNARE_PORT).
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(port) = env_non_empty("SNARE_PORT") {
        match port.parse::<u16>() {
            Ok(p) => config.server.port = p,
            Err(_) => log::warn!("ignoring invalid SNARE_PORT: {}", port),
        }
    }
}

/// True if the bind address is loopback (any 127.x.y.z, ::1 or [::1], localhost).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    if b.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let b = b.strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(b);
    b.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

/// Load a `.env` file into the process environment; variables already set are kept.
/// With no path, searches the current directory and its parents. Returns the file used, or
/// None when there is no such file.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(p) => dotenvy::from_path(p).map(|_| p.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(p) => Ok(Some(p)),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("loading .env file"),
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SNARE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".snare").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or SNARE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_env_overrides(&mut config);
    Ok((config, path))
}

/// Write a default config file if none exists. Returns true when a file was written.
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&Config::default()).context("serializing default config")?;
    std::fs::write(path, json).with_context(|| format!("writing config to {}", path.display()))?;
    Ok(true)
}

/// Resolve the persona instructions file against the config file's parent.
pub fn resolve_instructions_file(config: &Config, config_path: &Path) -> Option<PathBuf> {
    let file = config.persona.instructions_file.as_ref()?;
    if file.as_os_str().is_empty() {
        return None;
    }
    if file.is_absolute() {
        return Some(file.clone());
    }
    let parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Some(parent.join(file))
}
