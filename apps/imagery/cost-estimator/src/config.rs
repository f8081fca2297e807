//! Configuration for the cost estimator

use core_config::{Environment, FromEnv, LogFormat, ServerConfig, env_optional};
use domain_imagery_pricing::PricingCatalog;
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub log_format: LogFormat,
    pub server: ServerConfig,
    /// Cost table JSON; the builtin table is used when unset
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_env();
        Ok(Self {
            log_format: LogFormat::from_env(&environment)?,
            server: ServerConfig::from_env()?,
            catalog_path: env_optional("PRICING_CATALOG_PATH").map(PathBuf::from),
            environment,
        })
    }

    /// Command-line `--catalog` wins over `PRICING_CATALOG_PATH`
    pub fn with_catalog_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.catalog_path = path;
        }
        self
    }

    pub fn load_catalog(&self) -> Result<PricingCatalog> {
        let catalog = match &self.catalog_path {
            Some(path) => PricingCatalog::from_path(path)
                .wrap_err_with(|| format!("Failed to load pricing catalog {}", path.display()))?,
            None => PricingCatalog::builtin().wrap_err("Builtin cost table is invalid")?,
        };

        info!(
            source = %self.catalog_source(),
            entries = catalog.len(),
            "Pricing catalog loaded"
        );
        Ok(catalog)
    }

    pub fn catalog_source(&self) -> String {
        self.catalog_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "builtin".to_string())
    }
}
