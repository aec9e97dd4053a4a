//! Configuration management for the Leadflow system
//!
//! Every adapter receives its section explicitly at construction time.

use crate::constants::{APOLLO_MAX_PER_PAGE, ENV_PREFIX};
use crate::error::{LeadflowError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadflowConfig {
    #[serde(default)]
    pub apollo: ApolloConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub invoice: InvoiceConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApolloConfig {
    /// May be empty at load time; the client refuses to start without it
    #[serde(default, alias = "key")]
    pub api_key: String,

    #[serde(alias = "url", default = "default_apollo_base_url")]
    pub base_url: String,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Public origin serving `/api/track/open` and `/api/track/click`
    #[serde(alias = "app_url", default = "default_tracking_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceConfig {
    #[serde(default = "default_invoice_title")]
    pub title: String,

    #[serde(default = "default_invoice_footer")]
    pub footer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default)]
    pub dashboard_url: Option<String>,
}

// Default functions
fn default_apollo_base_url() -> String {
    "https://api.apollo.io".to_string()
}

fn default_per_page() -> u32 {
    25
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_tracking_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_invoice_title() -> String {
    "INVOICE".to_string()
}

fn default_invoice_footer() -> String {
    "Thank you for your business!".to_string()
}

fn default_app_name() -> String {
    "Leadflow".to_string()
}

impl Default for ApolloConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_apollo_base_url(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            base_url: default_tracking_base_url(),
        }
    }
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            title: default_invoice_title(),
            footer: default_invoice_footer(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            dashboard_url: None,
        }
    }
}

impl LeadflowConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LeadflowError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_json_str(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LeadflowError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load an optional JSON file and overlay `LEADFLOW__SECTION__KEY` environment variables
    pub fn load_layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Json)
                    .required(true),
            );
        }

        let config: Self = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match url::Url::parse(&self.tracking.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => {
                return Err(LeadflowError::Config(format!(
                    "Tracking base URL must be an absolute http(s) URL, got '{}'",
                    self.tracking.base_url
                )));
            }
        }

        if self.apollo.per_page == 0 || self.apollo.per_page > APOLLO_MAX_PER_PAGE {
            return Err(LeadflowError::Config(format!(
                "Apollo per_page must be between 1 and {}",
                APOLLO_MAX_PER_PAGE
            )));
        }

        if self.apollo.base_url.is_empty() {
            return Err(LeadflowError::Config("Apollo base URL is required".to_string()));
        }

        Ok(())
    }
}
