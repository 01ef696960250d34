use std::collections::HashMap;
use std::path::Path;

use congregate_core::backend::RestConnection;
use congregate_core::payment::QrOptions;
use congregate_core::settings::PLACEHOLDER_PIX_KEY;
use serde::Deserialize;

use crate::error::Result;
use crate::logging::LogFormat;

const ENV_PREFIX: &str = "CONGREGATE";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PaymentConfig {
    pub qr_margin: u32,
    pub qr_scale: u32,
    /// Payment key shown until one is stored.
    pub placeholder_key: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        let qr = QrOptions::default();
        Self {
            qr_margin: qr.margin,
            qr_scale: qr.scale,
            placeholder_key: PLACEHOLDER_PIX_KEY.to_string(),
        }
    }
}

impl PaymentConfig {
    pub fn qr_options(&self) -> QrOptions {
        QrOptions {
            margin: self.qr_margin,
            scale: self.qr_scale,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default level or filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Portal configuration.
///
/// Read from an optional TOML file, then from `CONGREGATE_*` environment
/// variables, with `__` between nested keys:
///
/// ```text
/// CONGREGATE_BACKEND__URL=https://xyz.supabase.co
/// CONGREGATE_BACKEND__API_KEY=...
/// CONGREGATE_ADMIN_EMAILS=pastor@igreja.org,secretaria@igreja.org
/// CONGREGATE_LOG__FORMAT=json
/// ```
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// No backend means offline: reads come back empty, writes fail.
    pub backend: Option<RestConnection>,
    /// Comma separated admin e-mails.
    pub admin_emails: String,
    pub payment: PaymentConfig,
    pub log: LogConfig,
}

impl PortalConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, None)
    }

    /// `env` replaces the process environment when given.
    pub fn from_sources(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let mut environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__");
        if let Some(env) = env {
            environment = environment.source(Some(env.into_iter().collect()));
        }
        let config = builder
            .add_source(environment)
            .build()?
            .try_deserialize::<PortalConfig>()?;
        Ok(config)
    }
}
