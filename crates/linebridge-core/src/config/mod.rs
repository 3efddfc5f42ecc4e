use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, ConfigError};
use crate::util::mask_secret;

/// Default wake phrase gating keyword routing for untagged requests.
pub const DEFAULT_WAKE_PHRASE: &str = "彩虹城市AI助理";

/// Default thumbnail shown on every carousel column.
pub const DEFAULT_THUMBNAIL_URL: &str = "https://placehold.co/1024x678/png?text=Rainbow+City";

/// Root configuration for linebridge.
///
/// Built once at startup and shared read-only with every request handler.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub channel: ChannelConfig,
    pub ai: AiConfig,
    pub routing: RoutingConfig,
    pub envelope: EnvelopeConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Whether a model key is configured, i.e. whether the AI responder may call out.
    pub fn ai_enabled(&self) -> bool {
        !self.ai.api_key.trim().is_empty()
    }

    /// Socket address the HTTP server binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reject configurations the router cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing.wake_phrase.trim().is_empty() {
            return Err(ConfigError::Invalid("routing.wakePhrase must not be empty".into()));
        }
        let keyword_lists = [
            ("analysisKeywords", &self.routing.analysis_keywords),
            ("paymentKeywords", &self.routing.payment_keywords),
            ("linkKeywords", &self.routing.link_keywords),
        ];
        for (name, keywords) in keyword_lists {
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "routing.{name} contains an empty keyword"
                )));
            }
        }
        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::Invalid("ai.timeoutSecs must be positive".into()));
        }
        Ok(())
    }

    /// A copy safe to print: every secret replaced by its masked prefix.
    pub fn redacted(&self) -> Config {
        let mut cfg = self.clone();
        cfg.channel.api_key = mask_secret(&cfg.channel.api_key);
        cfg.channel.assertion_key = mask_secret(&cfg.channel.assertion_key);
        cfg.ai.api_key = mask_secret(&cfg.ai.api_key);
        cfg
    }
}

/// Messaging channel credentials. Only ever logged masked; linebridge never
/// calls the channel itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelConfig {
    pub api_key: String,
    pub assertion_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_secs: 10,
        }
    }
}

/// What to do with an untagged utterance that lacks the wake phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    /// Stay silent (`NoMatch`).
    #[default]
    Ignore,
    /// Reply with a short hint on how to address the assistant.
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub title: String,
    pub url: String,
}

impl LinkEntry {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    pub wake_phrase: String,
    pub analysis_keywords: Vec<String>,
    pub payment_keywords: Vec<String>,
    pub link_keywords: Vec<String>,
    pub links: Vec<LinkEntry>,
    pub thumbnail_url: String,
    pub gate_policy: GatePolicy,
    /// Send unmatched wake-phrase utterances to the AI responder instead of
    /// answering with the fixed fallback text.
    pub ai_chat_fallback: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            wake_phrase: DEFAULT_WAKE_PHRASE.to_string(),
            analysis_keywords: vec!["mbti".to_string(), "分析".to_string()],
            payment_keywords: vec!["繳費".to_string(), "繳款".to_string(), "payment".to_string()],
            link_keywords: vec!["連結".to_string(), "links".to_string()],
            links: vec![
                LinkEntry::new("社區公告", "https://rainbow-city.example.com/notices"),
                LinkEntry::new("設施預約", "https://rainbow-city.example.com/booking"),
                LinkEntry::new("報修服務", "https://rainbow-city.example.com/repairs"),
            ],
            thumbnail_url: DEFAULT_THUMBNAIL_URL.to_string(),
            gate_policy: GatePolicy::default(),
            ai_chat_fallback: false,
        }
    }
}

/// Response shape expected by the orchestration platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// Dialogflow CX: `fulfillmentResponse.messages`.
    #[default]
    Cx,
    /// Dialogflow ES: `fulfillmentMessages`.
    Es,
}

/// How a `NoMatch` route is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoMatchPolicy {
    /// Well-formed envelope with no messages.
    #[default]
    Silent,
    /// Envelope carrying the fixed fallback text.
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvelopeConfig {
    pub format: EnvelopeFormat,
    pub no_match: NoMatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Load configuration from environment variables.
///
/// Priority:
/// 1. `LINEBRIDGE_CONFIG` env var: full JSON config (only `PORT` is still
///    overlaid, since hosting platforms inject it)
/// 2. Individual env vars, merged on top of the config file
///    (`LINEBRIDGE_CONFIG_FILE`, default `./linebridge.json`) or defaults
pub fn load_config_from_env() -> Config {
    load_config_with(|name| std::env::var(name).ok())
}

/// [`load_config_from_env`] with a caller-supplied variable lookup.
pub fn load_config_with<F>(get: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(json) = get("LINEBRIDGE_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(mut config) => {
                apply_port_override(&mut config, &get);
                return config;
            }
            Err(e) => {
                tracing::warn!("Failed to parse LINEBRIDGE_CONFIG: {}", e);
            }
        }
    }

    let mut cfg = load_config(None);
    apply_env_overrides(&mut cfg, get);
    cfg
}

/// Overlay individual variables on `cfg`. `get` looks a variable up by name.
pub fn apply_env_overrides<F>(cfg: &mut Config, get: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| get(name).filter(|v| !v.trim().is_empty());

    // Channel keys
    if let Some(v) = var("API_KEY") {
        cfg.channel.api_key = v;
    }
    if let Some(v) = var("ASSERTION_KEY") {
        cfg.channel.assertion_key = v;
    }

    // Model
    if let Some(v) = var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")) {
        cfg.ai.api_key = v;
    }
    if let Some(v) = var("AI_API_BASE") {
        cfg.ai.api_base = Some(v);
    }
    if let Some(v) = var("AI_MODEL") {
        cfg.ai.model = v;
    }

    // Routing
    if let Some(v) = var("WAKE_PHRASE") {
        cfg.routing.wake_phrase = v;
    }

    apply_port_override(cfg, &get);
}

fn apply_port_override<F>(cfg: &mut Config, get: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(v) = get("PORT").filter(|v| !v.trim().is_empty()) else {
        return;
    };
    match v.trim().parse::<u16>() {
        Ok(port) => cfg.server.port = port,
        Err(e) => tracing::warn!("Ignoring invalid PORT {:?}: {}", v, e),
    }
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    std::env::var("LINEBRIDGE_CONFIG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("linebridge.json"))
}

/// Load configuration from file or fall back to defaults.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match read_config(&path) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                tracing::warn!("Using default configuration.");
            }
        }
    }

    Config::default()
}

/// Read a configuration file, failing if it is missing or malformed.
pub fn read_config(path: &Path) -> crate::error::Result<Config> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str::<Config>(&content)
        .map_err(|e| BridgeError::Config(ConfigError::Parse(e)))
}

/// Save configuration to file.
pub fn save_config(config: &Config, config_path: Option<&Path>) -> std::result::Result<(), ConfigError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
}
