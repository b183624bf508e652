//! Layered application configuration.
//!
//! Lowest to highest priority: built-in defaults, an optional config file,
//! `KICKSIGHT_`-prefixed environment variables (`KICKSIGHT_SERVER__PORT=9000`),
//! then the plain environment keys and flags understood by [`Cli`].

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Prefix all API routes are mounted under
    #[arg(long, env = "API_PREFIX")]
    pub api_prefix: Option<String>,

    #[arg(long, env = "AWS_DEFAULT_REGION")]
    pub region: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Connect timeout for agent calls, in seconds
    #[arg(long, env = "AWS_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// Read timeout for agent calls, in seconds
    #[arg(long, env = "AWS_READ_TIMEOUT")]
    pub read_timeout: Option<u64>,

    #[arg(long, env = "BEDROCK_SUPERVISOR_AGENT_ID")]
    pub supervisor_agent_id: Option<String>,

    #[arg(long, env = "BEDROCK_SUPERVISOR_AGENT_ALIAS_ID")]
    pub supervisor_agent_alias_id: Option<String>,

    #[arg(long, env = "QUICKSIGHT_AGENT_ID")]
    pub quicksight_agent_id: Option<String>,

    #[arg(long, env = "QUICKSIGHT_AGENT_ALIAS_ID")]
    pub quicksight_agent_alias_id: Option<String>,

    /// JSON file listing agent ids and aliases
    #[arg(long, env = "AGENT_CONFIG_FILE")]
    pub agent_config_file: Option<String>,

    /// Comma-separated list of allowed CORS origins
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub aws: AwsConfig,
    pub agents: AgentsConfig,
    pub cors: CorsConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

/// Agent ids from configuration. Any of them may be missing.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AgentsConfig {
    #[serde(default)]
    pub supervisor_agent_id: Option<String>,
    #[serde(default)]
    pub supervisor_agent_alias_id: Option<String>,
    #[serde(default)]
    pub quicksight_agent_id: Option<String>,
    #[serde(default)]
    pub quicksight_agent_alias_id: Option<String>,
    #[serde(default)]
    pub config_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Pause between canned events on the mocking trace endpoint.
    pub mock_interval_ms: u64,
    /// Events buffered between the upstream task and the response body.
    pub channel_capacity: usize,
}

const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:5174",
];

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Defaults only; ignores files, environment and flags.
    pub fn from_defaults() -> Result<Self, config::ConfigError> {
        defaults(Config::builder())?.build()?.try_deserialize()
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = defaults(Config::builder())?;

        // Explicit file must exist; the implicit ./config.* is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("KICKSIGHT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins"),
        );

        let overrides: [(&str, Option<String>); 12] = [
            ("server.api_prefix", cli.api_prefix.clone()),
            ("aws.region", cli.region.clone()),
            ("aws.access_key_id", cli.access_key_id.clone()),
            ("aws.secret_access_key", cli.secret_access_key.clone()),
            ("agents.supervisor_agent_id", cli.supervisor_agent_id.clone()),
            ("agents.supervisor_agent_alias_id", cli.supervisor_agent_alias_id.clone()),
            ("agents.quicksight_agent_id", cli.quicksight_agent_id.clone()),
            ("agents.quicksight_agent_alias_id", cli.quicksight_agent_alias_id.clone()),
            ("agents.config_file", cli.agent_config_file.clone()),
            ("server.port", cli.port.map(|p| p.to_string())),
            ("aws.connect_timeout_secs", cli.connect_timeout.map(|s| s.to_string())),
            ("aws.read_timeout_secs", cli.read_timeout.map(|s| s.to_string())),
        ];
        for (key, value) in overrides {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                builder = builder.set_override(key, value)?;
            }
        }

        if let Some(origins) = &cli.allowed_origins {
            let origins: Vec<String> = origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if !origins.is_empty() {
                builder = builder.set_override("cors.allowed_origins", origins)?;
            }
        }

        builder.build()?.try_deserialize()
    }
}

fn defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("server.api_prefix", "/api")?
        .set_default("aws.region", "us-east-1")?
        .set_default("aws.connect_timeout_secs", 30)?
        .set_default("aws.read_timeout_secs", 120)?
        .set_default("agents.config_file", "quicksight_agent_config.json")?
        .set_default("cors.allowed_origins", DEFAULT_ALLOWED_ORIGINS.to_vec())?
        .set_default("stream.mock_interval_ms", 300)?
        .set_default("stream.channel_capacity", 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_defaults().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.aws.read_timeout_secs, 120);
        assert_eq!(config.agents.supervisor_agent_id, None);
        assert_eq!(
            config.agents.config_file.as_deref(),
            Some("quicksight_agent_config.json")
        );
        assert_eq!(config.cors.allowed_origins.len(), 3);
        assert_eq!(config.stream.mock_interval_ms, 300);
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = Cli {
            port: Some(9100),
            quicksight_agent_id: Some("QS".into()),
            supervisor_agent_alias_id: Some("  ".into()),
            allowed_origins: Some(vec!["https://a.example".into(), " ".into()]),
            ..Cli::default()
        };
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.agents.quicksight_agent_id.as_deref(), Some("QS"));
        assert_eq!(config.agents.supervisor_agent_alias_id, None);
        assert_eq!(config.cors.allowed_origins, vec!["https://a.example".to_string()]);
    }

    #[test]
    fn test_missing_explicit_config_file_fails() {
        let cli = Cli {
            config: Some("/nonexistent/kicksight.toml".into()),
            ..Cli::default()
        };
        assert!(AppConfig::from_cli(&cli).is_err());
    }
}
