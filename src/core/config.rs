use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::core::credential::CredentialPolicy;
use crate::providers::{ClientSettings, ProviderKind};

/// Config file looked up from the working directory upwards.
pub const CONFIG_FILE: &str = "prism.toml";

/// Gateway configuration snapshot, read once at startup.
///
/// Sources, lowest precedence first: built-in defaults, `prism.toml`,
/// a `.env` file, then the process environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub providers: ProvidersConfig,
    pub credentials: CredentialPolicy,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub anthropic: ProviderConfig,
}

/// Per-provider section. Unset fields fall back to the family's defaults.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub max_tokens: Option<u32>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("ProviderConfig")
            .field("api_key", &key)
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of generation records. Relative paths resolve against the
    /// directory holding `prism.toml` (or the working directory).
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".prism").join("generations"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Gemini => &mut self.gemini,
            ProviderKind::Anthropic => &mut self.anthropic,
        }
    }
}

impl GatewayConfig {
    /// Load the full configuration for the CLI.
    ///
    /// Uses `explicit` when given, otherwise searches for `prism.toml` from
    /// the working directory upwards and falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        check_env_file(dotenvy::dotenv())?;

        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        let (mut config, root) = match explicit {
            Some(path) => {
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| cwd.clone());
                (Self::from_file(path)?, root)
            }
            None => Self::find(&cwd)?.unwrap_or_else(|| (Self::default(), cwd.clone())),
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        if config.storage.dir.is_relative() {
            config.storage.dir = root.join(&config.storage.dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a prism.toml file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content).context("Failed to parse prism.toml")?;

        config.validate()?;
        Ok(config)
    }

    /// Walk up from `start_dir` looking for prism.toml.
    pub fn find(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::from_file(&config_path)?;
                return Ok(Some((config, current)));
            }
            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Overlay environment variables, e.g. `OPENAI_API_KEY`, `GEMINI_MAX_TOKENS`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        for kind in ProviderKind::ALL {
            let prefix = kind.as_str().to_uppercase();
            let entry = self.providers.get_mut(kind);

            if let Some(key) = var(&format!("{prefix}_API_KEY")) {
                entry.api_key = key;
            }
            if let Some(url) = var(&format!("{prefix}_BASE_URL")) {
                entry.base_url = Some(url);
            }
            if let Some(model) = var(&format!("{prefix}_DEFAULT_MODEL")) {
                entry.default_model = Some(model);
            }
            let name = format!("{prefix}_MAX_TOKENS");
            if let Some(raw) = var(&name) {
                let parsed = raw
                    .parse()
                    .with_context(|| format!("Invalid {name}: '{raw}' is not a number"))?;
                entry.max_tokens = Some(parsed);
            }
        }

        if let Some(dir) = var("PRISM_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(dir);
        }
        if let Some(raw) = var("PRISM_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = raw.parse().with_context(|| {
                format!("Invalid PRISM_HTTP_TIMEOUT_SECS: '{raw}' is not a number")
            })?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            bail!("Invalid http.timeout_secs 0. Must be at least 1 second");
        }

        for kind in ProviderKind::ALL {
            let entry = self.providers.get(kind);
            if entry.max_tokens == Some(0) {
                bail!("Invalid providers.{}.max_tokens 0. Must be positive", kind);
            }
            if entry.base_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
                bail!("Invalid providers.{}.base_url: must not be empty", kind);
            }
            if entry
                .default_model
                .as_deref()
                .is_some_and(|m| m.trim().is_empty())
            {
                bail!("Invalid providers.{}.default_model: must not be empty", kind);
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Client settings for `kind`, with family defaults filled in.
    pub fn client_settings(&self, kind: ProviderKind) -> ClientSettings {
        let entry = self.providers.get(kind);
        let mut settings = ClientSettings::defaults(kind, entry.api_key.trim());
        if let Some(url) = &entry.base_url {
            settings.base_url = url.clone();
        }
        if let Some(model) = &entry.default_model {
            settings.default_model = model.clone();
        }
        if let Some(max_tokens) = entry.max_tokens {
            settings.max_tokens = max_tokens;
        }
        settings.live = self.credentials.is_live(&settings.api_key);
        settings
    }
}

/// A missing `.env` is normal; a malformed one is an error.
fn check_env_file(loaded: dotenvy::Result<PathBuf>) -> Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("Failed to load .env file"),
    }
}
