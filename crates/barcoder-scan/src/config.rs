//! # Scanner Configuration
//!
//! Configuration management for the scan layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BARCODER_CATALOG_URL=https://...                                   │
//! │     BARCODER_VARIANT=raw                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/barcoder/scanner.toml (Linux)                            │
//! │     ~/Library/Application Support/com.barcoder.barcoder/scanner.toml   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     MercadoLibre Argentina search, 10s timeout, es-AR, catalog screen  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [catalog]
//! base_url = "https://api.mercadolibre.com/sites/MLA/search"
//! timeout_secs = 10
//! user_agent = "barcoder/0.1"
//!
//! [display]
//! locale = "es-AR"
//! currency = "ARS"
//!
//! [scanner]
//! variant = "catalog"  # catalog | raw
//! ```
//!
//! The page size is part of the catalog contract (10) and deliberately not
//! configurable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use barcoder_core::{NumberLocale, ScanPolicy, DEFAULT_CURRENCY};

use crate::error::{ScanError, ScanResult};

// =============================================================================
// Screen Variant
// =============================================================================

/// Which scanner screen the host is showing.
///
/// ```text
/// ┌──────────┬──────────────────────────────┬───────────────────────────┐
/// │ Variant  │ Accepted symbologies         │ On a valid scan           │
/// ├──────────┼──────────────────────────────┼───────────────────────────┤
/// │ catalog  │ EAN-13, EAN-8, UPC-A, UPC-E  │ search the catalog        │
/// │ raw      │ the same + QR                │ show the decoded payload  │
/// └──────────┴──────────────────────────────┴───────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenVariant {
    #[default]
    Catalog,
    #[serde(rename = "raw")]
    RawPayload,
}

impl ScreenVariant {
    /// The session policy for this screen.
    pub fn policy(&self) -> ScanPolicy {
        match self {
            ScreenVariant::Catalog => ScanPolicy::catalog_lookup(),
            ScreenVariant::RawPayload => ScanPolicy::present_raw(),
        }
    }
}

impl std::fmt::Display for ScreenVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenVariant::Catalog => write!(f, "catalog"),
            ScreenVariant::RawPayload => write!(f, "raw"),
        }
    }
}

impl std::str::FromStr for ScreenVariant {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "catalog" | "lookup" | "search" => Ok(ScreenVariant::Catalog),
            "raw" | "qr" | "payload" => Ok(ScreenVariant::RawPayload),
            other => Err(ScanError::InvalidConfig(format!(
                "Unknown screen variant: '{}'. Valid options: catalog, raw",
                other
            ))),
        }
    }
}

// =============================================================================
// Catalog Settings
// =============================================================================

/// Where and how to reach the catalog search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Search endpoint; `q` and `limit` are appended as query parameters.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for one lookup (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every search.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://api.mercadolibre.com/sites/MLA/search".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("barcoder/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

// =============================================================================
// Display Settings
// =============================================================================

/// How prices are rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default)]
    pub locale: NumberLocale,

    /// Currency used when a catalog record has no `currency_id`.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            locale: NumberLocale::default(),
            currency: default_currency(),
        }
    }
}

// =============================================================================
// Scanner Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerSettings {
    #[serde(default)]
    pub variant: ScreenVariant,
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub display: DisplaySettings,

    #[serde(default)]
    pub scanner: ScannerSettings,
}

impl ScannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        let url = Url::parse(&self.catalog.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ScanError::InvalidUrl(format!(
                "Catalog URL must be http:// or https://, got: {}",
                self.catalog.base_url
            )));
        }

        if self.catalog.timeout_secs == 0 {
            return Err(ScanError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.display.currency.trim().is_empty() {
            return Err(ScanError::InvalidConfig("currency must not be empty".into()));
        }

        Ok(())
    }

    /// Applies overrides looked up by variable name.
    ///
    /// `load` passes the process environment; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BARCODER_CATALOG_URL") {
            debug!(url = %url, "Overriding catalog URL from environment");
            self.catalog.base_url = url;
        }

        if let Some(secs) = lookup("BARCODER_LOOKUP_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.catalog.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric lookup timeout"),
            }
        }

        if let Some(tag) = lookup("BARCODER_LOCALE") {
            match tag.parse::<NumberLocale>() {
                Ok(locale) => self.display.locale = locale,
                Err(e) => warn!(error = %e, "Ignoring locale override"),
            }
        }

        if let Some(currency) = lookup("BARCODER_CURRENCY") {
            self.display.currency = currency.to_uppercase();
        }

        if let Some(variant) = lookup("BARCODER_VARIANT") {
            match variant.parse::<ScreenVariant>() {
                Ok(v) => {
                    debug!(variant = %v, "Overriding screen variant from environment");
                    self.scanner.variant = v;
                }
                Err(e) => warn!(error = %e, "Ignoring variant override"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "barcoder", "barcoder")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.timeout_secs)
    }

    pub fn variant(&self) -> ScreenVariant {
        self.scanner.variant
    }

    pub fn locale(&self) -> NumberLocale {
        self.display.locale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_variant_parsing() {
        assert_eq!("catalog".parse::<ScreenVariant>().unwrap(), ScreenVariant::Catalog);
        assert_eq!("RAW".parse::<ScreenVariant>().unwrap(), ScreenVariant::RawPayload);
        assert_eq!("qr".parse::<ScreenVariant>().unwrap(), ScreenVariant::RawPayload);
        assert!("camera".parse::<ScreenVariant>().is_err());
    }

    #[test]
    fn test_variant_policies() {
        use barcoder_core::{ScanMode, Symbology};

        let catalog = ScreenVariant::Catalog.policy();
        assert_eq!(catalog.mode, ScanMode::CatalogLookup);
        assert!(!catalog.accepted.contains(Symbology::Qr));

        let raw = ScreenVariant::RawPayload.policy();
        assert_eq!(raw.mode, ScanMode::PresentRaw);
        assert!(raw.accepted.contains(Symbology::Qr));
        assert!(raw.accepted.contains(Symbology::Ean13));
    }

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lookup_timeout(), Duration::from_secs(10));
        assert_eq!(config.locale(), NumberLocale::EsAr);
        assert_eq!(config.display.currency, "ARS");
        assert_eq!(config.variant(), ScreenVariant::Catalog);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();

        config.catalog.base_url = "ftp://catalog.example".into();
        assert!(config.validate().is_err());

        config.catalog.base_url = "not a url".into();
        assert!(config.validate().unwrap_err().is_config_error());

        config.catalog.base_url = "http://localhost:8080/search".into();
        assert!(config.validate().is_ok());

        config.catalog.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BARCODER_CATALOG_URL", "http://127.0.0.1:9000/search"),
            ("BARCODER_LOOKUP_TIMEOUT_SECS", "3"),
            ("BARCODER_LOCALE", "en-US"),
            ("BARCODER_CURRENCY", "usd"),
            ("BARCODER_VARIANT", "raw"),
        ]);
        let mut config = ScannerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.catalog.base_url, "http://127.0.0.1:9000/search");
        assert_eq!(config.catalog.timeout_secs, 3);
        assert_eq!(config.locale(), NumberLocale::EnUs);
        assert_eq!(config.display.currency, "USD");
        assert_eq!(config.variant(), ScreenVariant::RawPayload);
    }

    #[test]
    fn test_bad_overrides_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BARCODER_LOOKUP_TIMEOUT_SECS", "soon"),
            ("BARCODER_LOCALE", "tlh-KL"),
            ("BARCODER_VARIANT", "hologram"),
        ]);
        let mut config = ScannerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.catalog.timeout_secs, 10);
        assert_eq!(config.locale(), NumberLocale::EsAr);
        assert_eq!(config.variant(), ScreenVariant::Catalog);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [display]
            locale = "pt-BR"

            [scanner]
            variant = "raw"
            "#,
        )
        .unwrap();

        assert_eq!(config.locale(), NumberLocale::PtBr);
        assert_eq!(config.display.currency, "ARS");
        assert_eq!(config.variant(), ScreenVariant::RawPayload);
        assert_eq!(config.catalog.timeout_secs, 10);
    }

    #[test]
    fn test_unknown_locale_in_toml_is_rejected() {
        let parsed: Result<ScannerConfig, _> = toml::from_str(
            r#"
            [display]
            locale = "xx-XX"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let config = ScannerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[catalog]"));
        assert!(toml_str.contains("locale = \"es-AR\""));

        let back: ScannerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.catalog.base_url, config.catalog.base_url);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let path = std::env::temp_dir().join(format!(
            "barcoder-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        let mut config = ScannerConfig::default();
        config.catalog.timeout_secs = 4;
        config.save(Some(path.clone())).unwrap();

        let loaded = ScannerConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.catalog.timeout_secs, 4);

        std::fs::remove_file(path).ok();
    }
}
