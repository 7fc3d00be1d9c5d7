//! Configuration loading and validation.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `WARPDEPLOY__SECTION__KEY` environment variables. Credentials are read
//! from their conventional env names and never from the file.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Warpdeploy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub bot: BotConfig,
    pub intake: IntakeConfig,
    pub feed: FeedConfig,
    pub storage: StorageConfig,
    pub deployer: DeployerConfig,
    pub chain: ChainConfig,
    pub links: LinksConfig,
    pub dedup: DedupConfig,
    pub telemetry: TelemetryConfig,

    /// Credentials, loaded from the environment only.
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3001)),
        }
    }
}

/// Agent identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Handle without the leading `@`.
    pub handle: String,
    /// Wallet that signs deployments and becomes token admin.
    pub wallet_address: String,
    /// Display name of the deployment network.
    pub network: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            handle: "warpdeploy".into(),
            wallet_address: String::new(),
            network: "Base".into(),
        }
    }
}

/// Which intake adapters run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeMode {
    #[default]
    Webhook,
    Polling,
    Both,
}

impl IntakeMode {
    pub fn webhook_enabled(self) -> bool {
        matches!(self, IntakeMode::Webhook | IntakeMode::Both)
    }

    pub fn polling_enabled(self) -> bool {
        matches!(self, IntakeMode::Polling | IntakeMode::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntakeMode::Webhook => "webhook",
            IntakeMode::Polling => "polling",
            IntakeMode::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub mode: IntakeMode,
    pub poll_interval_secs: u64,
    /// Delay before the first poll after startup.
    pub first_poll_delay_secs: u64,
    /// How far back the first poll window reaches.
    pub initial_lookback_secs: u64,
    pub poll_limit: u32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            mode: IntakeMode::default(),
            poll_interval_secs: 60,
            first_poll_delay_secs: 5,
            initial_lookback_secs: 3600,
            poll_limit: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub api_base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.neynar.com".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub pin_api_url: String,
    pub fetch_timeout_secs: u64,
    /// Largest image body accepted from an attachment host.
    pub max_image_bytes: u64,
    /// Substrings that mark an attachment URL as an image regardless of extension.
    pub image_host_markers: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pin_api_url: "https://api.pinata.cloud/pinning/pinFileToIPFS".into(),
            fetch_timeout_secs: 30,
            max_image_bytes: 10 * 1024 * 1024,
            image_host_markers: vec!["imagedelivery.net".into()],
        }
    }
}

impl StorageConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeployerConfig {
    /// Base URL of the deploy relay that builds and submits transactions.
    pub relay_url: String,
    /// Caller-side deadline for confirmation. `None` waits as long as the relay does.
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:8787".into(),
            confirmation_timeout_secs: None,
        }
    }
}

impl DeployerConfig {
    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.base.org".into(),
        }
    }
}

/// URL templates used in replies. `{address}` and `{tx}` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub token_template: String,
    pub tx_template: String,
    pub address_template: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            token_template: "https://clanker.world/clanker/{address}".into(),
            tx_template: "https://basescan.org/tx/{tx}".into(),
            address_template: "https://basescan.org/address/{address}".into(),
        }
    }
}

impl LinksConfig {
    pub fn token_link(&self, address: &str) -> String {
        self.token_template.replace("{address}", address)
    }

    pub fn tx_link(&self, tx_hash: &str) -> String {
        self.tx_template.replace("{tx}", tx_hash)
    }

    pub fn address_link(&self, address: &str) -> String {
        self.address_template.replace("{address}", address)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub capacity: u64,
    pub ttl_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Directory for daily rolling log files. Stdout only when unset.
    pub log_dir: Option<PathBuf>,
    pub otlp_endpoint: Option<String>,
    pub otlp_headers: HashMap<String, String>,
    pub service_name: String,
    pub sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            otlp_headers: HashMap::new(),
            service_name: "warpdeploy".into(),
            sample_rate: 1.0,
        }
    }
}

/// Credentials for the external collaborators.
#[derive(Clone, Default)]
pub struct Secrets {
    pub neynar_api_key: Arc<str>,
    pub signer_uuid: Arc<str>,
    pub pinata_api_key: Arc<str>,
    pub pinata_api_secret: Arc<str>,
    pub deployer_api_key: Option<Arc<str>>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("signer_uuid", &self.signer_uuid)
            .finish_non_exhaustive()
    }
}

impl Secrets {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<Arc<str>> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(Arc::from)
                .ok_or_else(|| ConfigError::MissingKey(key.into()).into())
        };

        Ok(Self {
            neynar_api_key: required("NEYNAR_API_KEY")?,
            signer_uuid: required("SIGNER_UUID")?,
            pinata_api_key: required("PINATA_API_KEY")?,
            pinata_api_secret: required("PINATA_API_SECRET")?,
            deployer_api_key: lookup("DEPLOYER_API_KEY")
                .filter(|value| !value.trim().is_empty())
                .map(Arc::from),
        })
    }
}

impl Config {
    /// Load configuration from the default file location and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_config_path())
    }

    /// Load from a specific config file path. A missing file is not an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env_source());

        let mut config = Self::from_builder(builder, &path.display().to_string())?;
        config.secrets = Secrets::from_env()?;
        Ok(config)
    }

    /// Parse a TOML document layered over defaults. Secrets are left empty.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::from_builder(builder, "<inline>")
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        origin: &str,
    ) -> Result<Self> {
        let load_error = |source: config::ConfigError| ConfigError::Load {
            path: origin.to_string(),
            source: Arc::new(source),
        };

        let config: Config = builder
            .build()
            .map_err(load_error)?
            .try_deserialize()
            .map_err(load_error)?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let handle = self.bot.handle.trim_start_matches('@');
        if handle.is_empty() {
            return Err(ConfigError::Invalid("bot.handle must not be empty".into()).into());
        }

        let wallet = &self.bot.wallet_address;
        let well_formed = wallet.len() == 42
            && wallet.starts_with("0x")
            && wallet[2..].chars().all(|c| c.is_ascii_hexdigit());
        if !well_formed {
            return Err(ConfigError::Invalid(format!(
                "bot.wallet_address must be a 0x-prefixed 20-byte hex address, got '{wallet}'"
            ))
            .into());
        }

        if self.intake.poll_interval_secs == 0 {
            return Err(
                ConfigError::Invalid("intake.poll_interval_secs must be positive".into()).into(),
            );
        }

        if self.storage.max_image_bytes == 0 {
            return Err(
                ConfigError::Invalid("storage.max_image_bytes must be positive".into()).into(),
            );
        }

        if self.dedup.capacity == 0 {
            return Err(ConfigError::Invalid("dedup.capacity must be positive".into()).into());
        }

        if !(0.0..=1.0).contains(&self.telemetry.sample_rate) {
            return Err(ConfigError::Invalid(
                "telemetry.sample_rate must be within 0.0..=1.0".into(),
            )
            .into());
        }

        Ok(())
    }

    /// Handle normalized without a leading `@`.
    pub fn bot_handle(&self) -> &str {
        self.bot.handle.trim_start_matches('@')
    }

    /// Default config file: `<config_dir>/warpdeploy/config.toml`, falling back
    /// to `./warpdeploy.toml` when no platform config dir exists.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("warpdeploy").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./warpdeploy.toml"))
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("WARPDEPLOY")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[test]
    fn defaults_fill_missing_sections() {
        let config = Config::from_toml_str(&format!(
            r#"
            [bot]
            wallet_address = "{WALLET}"
            "#
        ))
        .expect("config should parse");

        assert_eq!(config.bot_handle(), "warpdeploy");
        assert_eq!(config.intake.mode, IntakeMode::Webhook);
        assert_eq!(config.intake.poll_interval_secs, 60);
        assert_eq!(config.storage.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.deployer.confirmation_timeout(), None);
        assert_eq!(config.server.bind.port(), 3001);
    }

    #[test]
    fn parses_polling_mode_and_strips_handle_prefix() {
        let config = Config::from_toml_str(&format!(
            r#"
            [bot]
            handle = "@deploybot"
            wallet_address = "{WALLET}"

            [intake]
            mode = "both"
            poll_interval_secs = 30

            [deployer]
            confirmation_timeout_secs = 300
            "#
        ))
        .expect("config should parse");

        assert_eq!(config.bot_handle(), "deploybot");
        assert!(config.intake.mode.webhook_enabled());
        assert!(config.intake.mode.polling_enabled());
        assert_eq!(
            config.deployer.confirmation_timeout(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn rejects_malformed_wallet() {
        let error = Config::from_toml_str(
            r#"
            [bot]
            wallet_address = "not-a-wallet"
            "#,
        )
        .expect_err("bad wallet must fail");

        assert!(error.to_string().contains("wallet_address"));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let error = Config::from_toml_str(&format!(
            r#"
            [bot]
            wallet_address = "{WALLET}"

            [intake]
            poll_interval_secs = 0
            "#
        ))
        .expect_err("zero interval must fail");

        assert!(error.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn link_templates_substitute_placeholders() {
        let links = LinksConfig::default();
        assert_eq!(
            links.token_link("0xABC"),
            "https://clanker.world/clanker/0xABC"
        );
        assert_eq!(links.tx_link("0x123"), "https://basescan.org/tx/0x123");
        assert_eq!(
            links.address_link("0xABC"),
            "https://basescan.org/address/0xABC"
        );
    }

    #[test]
    fn secrets_require_feed_and_pin_credentials() {
        let error = Secrets::from_lookup(|key| match key {
            "NEYNAR_API_KEY" => Some("key".into()),
            _ => None,
        })
        .expect_err("missing signer must fail");
        assert!(error.to_string().contains("SIGNER_UUID"));

        let secrets = Secrets::from_lookup(|key| match key {
            "DEPLOYER_API_KEY" => Some("  ".into()),
            other => Some(format!("{other}-value")),
        })
        .expect("all required keys present");
        assert_eq!(&*secrets.signer_uuid, "SIGNER_UUID-value");
        assert!(secrets.deployer_api_key.is_none());
    }
}
