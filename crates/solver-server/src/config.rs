//! Server configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML
//! file, environment variables, then command-line flags (applied by
//! `main`). Credentials left at their `.env.example` placeholder count as
//! missing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use coordination::debate::{DebateConfig, RoleSettings};
use coordination::single::small_model_settings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_HUGGINGFACE_URL: &str = "https://router.huggingface.co/v1/chat/completions";

/// Values shipped in `.env.example`; treated as unset.
pub const PLACEHOLDER_KEYS: [&str; 2] = ["your_openai_api_key_here", "your_huggingface_api_key_here"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How `/api/solve/single` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleMode {
    /// One call to the small hosted model.
    #[default]
    SmallModel,
    /// Keyword arithmetic, no model.
    RuleBased,
}

impl std::fmt::Display for SingleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SmallModel => write!(f, "small_model"),
            Self::RuleBased => write!(f, "rule_based"),
        }
    }
}

impl FromStr for SingleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "small_model" => Ok(Self::SmallModel),
            "rule_based" => Ok(Self::RuleBased),
            other => Err(format!("unknown single mode '{}'", other)),
        }
    }
}

/// A chat-completions endpoint and its credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl EndpointConfig {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: None,
        }
    }

    /// The credential, unless missing or a placeholder.
    pub fn usable_key(&self) -> Option<&str> {
        usable_key(self.api_key.as_deref())
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Per-call model timeout.
    pub timeout_secs: u64,
    /// CORS origins. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Endpoint used by both debate roles.
    pub openai: EndpointConfig,
    /// Endpoint used by the small-model baseline.
    pub huggingface: EndpointConfig,
    pub debate: DebateConfig,
    pub single_mode: SingleMode,
    pub small_model: RoleSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            timeout_secs: 60,
            allowed_origins: Vec::new(),
            openai: EndpointConfig::new(DEFAULT_OPENAI_URL),
            huggingface: EndpointConfig::new(DEFAULT_HUGGINGFACE_URL),
            debate: DebateConfig::default(),
            single_mode: SingleMode::default(),
            small_model: small_model_settings(),
        }
    }
}

impl ServerConfig {
    /// Defaults, then `path` (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_API_URL") {
            self.openai.url = v;
        }
        if let Some(v) = lookup("HUGGINGFACE_API_KEY") {
            self.huggingface.api_key = Some(v);
        }
        if let Some(v) = lookup("HUGGINGFACE_API_URL") {
            self.huggingface.url = v;
        }
        if let Some(v) = lookup("SOLVER_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("SOLVER_PORT") {
            self.port = parse_var("SOLVER_PORT", &v)?;
        }
        if let Some(v) = lookup("SOLVER_MAX_ROUNDS") {
            self.debate.max_rounds = parse_var("SOLVER_MAX_ROUNDS", &v)?;
        }
        if let Some(v) = lookup("SOLVER_PROTOCOL") {
            self.debate.protocol = parse_var("SOLVER_PROTOCOL", &v)?;
        }
        if let Some(v) = lookup("SOLVER_FAULT_POLICY") {
            self.debate.fault_policy = parse_var("SOLVER_FAULT_POLICY", &v)?;
        }
        if let Some(v) = lookup("SOLVER_SINGLE_MODE") {
            self.single_mode = parse_var("SOLVER_SINGLE_MODE", &v)?;
        }
        if let Some(v) = lookup("SOLVER_TIMEOUT_SECS") {
            self.timeout_secs = parse_var("SOLVER_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("SOLVER_ALLOWED_ORIGINS") {
            self.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debate.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        for (name, settings) in [
            ("proposer", &self.debate.proposer),
            ("critic", &self.debate.critic),
            ("small_model", &self.small_model),
        ] {
            if !(0.0..=2.0).contains(&settings.temperature) {
                return Err(ConfigError::Invalid(format!(
                    "{} temperature {} is outside 0.0..=2.0",
                    name, settings.temperature
                )));
            }
            if settings.model_id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} model_id is empty", name)));
            }
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid(format!(
                "bad listen address {}:{}: {}",
                self.bind, self.port, e
            )))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `key` unless it is missing, blank or a known placeholder.
pub fn usable_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !is_placeholder(k))
}

pub fn is_placeholder(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || PLACEHOLDER_KEYS.contains(&key)
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::{FaultPolicy, ProtocolVariant};
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8000");
        assert_eq!(config.debate.max_rounds, 3);
        assert_eq!(config.small_model.model_id, "katanemo/Arch-Router-1.5B:hf-inference");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.single_mode, SingleMode::SmallModel);
        assert!(config.openai.usable_key().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_vars(vars(&[
                ("OPENAI_API_KEY", "sk-live"),
                ("SOLVER_PORT", "9100"),
                ("SOLVER_MAX_ROUNDS", "5"),
                ("SOLVER_PROTOCOL", "legacy"),
                ("SOLVER_FAULT_POLICY", "short_circuit"),
                ("SOLVER_SINGLE_MODE", "rule_based"),
                ("SOLVER_ALLOWED_ORIGINS", "http://localhost:5173, http://localhost:3000,"),
            ]))
            .unwrap();

        assert_eq!(config.openai.usable_key(), Some("sk-live"));
        assert_eq!(config.port, 9100);
        assert_eq!(config.debate.max_rounds, 5);
        assert_eq!(config.debate.protocol, ProtocolVariant::Legacy);
        assert_eq!(config.debate.fault_policy, FaultPolicy::ShortCircuit);
        assert_eq!(config.single_mode, SingleMode::RuleBased);
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:5173", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_vars(vars(&[("SOLVER_MAX_ROUNDS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { var: "SOLVER_MAX_ROUNDS", .. }));
    }

    #[test]
    fn test_placeholders_are_not_keys() {
        assert!(is_placeholder("your_openai_api_key_here"));
        assert!(is_placeholder("  "));
        assert!(!is_placeholder("sk-abc"));
        assert_eq!(usable_key(Some("your_huggingface_api_key_here")), None);
        assert_eq!(usable_key(Some(" hf_x ")), Some("hf_x"));
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        config.debate.max_rounds = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.debate.critic.temperature = 2.5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("critic temperature"));

        let mut config = ServerConfig::default();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.bind = "not an address".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.toml");
        std::fs::write(
            &path,
            r#"
port = 8080
single_mode = "rule_based"

[debate]
max_rounds = 2
protocol = "legacy"

[debate.critic]
model_id = "gpt-4o"

[openai]
url = "http://localhost:9999/v1/chat/completions"
"#,
        )
        .unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.single_mode, SingleMode::RuleBased);
        assert_eq!(config.debate.max_rounds, 2);
        assert_eq!(config.debate.critic.model_id, "gpt-4o");
        assert_eq!(config.debate.critic.max_tokens, 500);
        assert_eq!(config.debate.proposer.model_id, "gpt-4o-mini");
        assert_eq!(config.openai.url, "http://localhost:9999/v1/chat/completions");
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.huggingface.url, DEFAULT_HUGGINGFACE_URL);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/solver.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
