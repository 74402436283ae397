use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::handoff::dispatch::Platform;
use crate::handoff::error::HandoffError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HandoffSettings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub identity_provider: IdentityProviderSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Runtime platform, fixed for the life of the process
    pub platform: Platform,
    /// Return target for the web branch (the app's own origin)
    pub web_origin: String,
    /// Deep link the system browser hands control back to on native
    pub native_redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderSettings {
    /// Provider name, used as the path segment of the exchange endpoint
    pub name: String,
    /// Entry point of the provider's hosted login page
    pub auth_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    /// Upper bound on a single exchange call, in seconds
    pub exchange_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            web_origin: "http://localhost:8081".to_string(),
            native_redirect_uri: "ridehail://auth/callback".to_string(),
        }
    }
}

impl Default for IdentityProviderSettings {
    fn default() -> Self {
        Self {
            name: "google".to_string(),
            auth_base_url: "https://auth.example.com".to_string(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            exchange_timeout_seconds: 10,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl HandoffSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    /// - The resulting settings do not validate
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::initialize_environment()?;

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.validate()?;

        Ok(settings)
    }

    /// Load `.env` and initialize the logger
    ///
    /// # Errors
    ///
    /// Returns an error if logger initialization fails
    fn initialize_environment() -> Result<(), Box<dyn std::error::Error>> {
        Self::load_env_file();
        env_logger::try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `HANDOFF_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            log::info!(
                "Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("HANDOFF_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                log::info!("Overriding settings from {}", secrets_path.display());
            } else {
                log::info!(
                    "HANDOFF_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_identity_provider_env_overrides(&mut settings.identity_provider);
        Self::apply_backend_env_overrides(&mut settings.backend);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(platform_str) = std::env::var("HANDOFF_PLATFORM") {
            match platform_str.parse::<Platform>() {
                Ok(platform) => app_settings.platform = platform,
                Err(e) => log::warn!("Ignoring HANDOFF_PLATFORM: {e}"),
            }
        }
        if let Ok(web_origin) = std::env::var("WEB_ORIGIN") {
            app_settings.web_origin = web_origin;
        }
        if let Ok(redirect_uri) = std::env::var("NATIVE_REDIRECT_URI") {
            app_settings.native_redirect_uri = redirect_uri;
        }
    }

    fn apply_identity_provider_env_overrides(idp_settings: &mut IdentityProviderSettings) {
        if let Ok(name) = std::env::var("IDP_NAME") {
            idp_settings.name = name;
        }
        if let Ok(auth_base_url) = std::env::var("IDP_AUTH_BASE_URL") {
            idp_settings.auth_base_url = auth_base_url;
        }
    }

    fn apply_backend_env_overrides(backend_settings: &mut BackendSettings) {
        if let Ok(base_url) = std::env::var("BACKEND_BASE_URL") {
            backend_settings.base_url = base_url;
        }
        if let Ok(timeout_str) = std::env::var("EXCHANGE_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                backend_settings.exchange_timeout_seconds = timeout;
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Check that the settings describe a usable handoff
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider name is empty
    /// - The provider or backend URL does not parse
    /// - The exchange timeout is zero
    pub fn validate(&self) -> Result<(), HandoffError> {
        if self.identity_provider.name.trim().is_empty() {
            return Err(HandoffError::Configuration(
                "identity_provider.name must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.identity_provider.auth_base_url).map_err(|e| {
            HandoffError::Configuration(format!("identity_provider.auth_base_url: {e}"))
        })?;
        url::Url::parse(&self.backend.base_url)
            .map_err(|e| HandoffError::Configuration(format!("backend.base_url: {e}")))?;
        if self.backend.exchange_timeout_seconds == 0 {
            return Err(HandoffError::Configuration(
                "backend.exchange_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.exchange_timeout_seconds)
    }
}
