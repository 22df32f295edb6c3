//! Backend configuration
//!
//! Configuration is read from YAML or HCL, picked by file extension:
//!
//! ```yaml
//! hierarchy:
//!   - "cfstack/%{stack}/resources/WebServer"
//!   - "cfstack/%{stack}/outputs"
//! merge_behavior: deep
//! cloudformation:
//!   cache_ttl_seconds: 300
//!   parse_metadata: true
//!   region: eu-west-1
//! ```
//!
//! ```hcl
//! hierarchy = ["cfstack/%{stack}/outputs"]
//!
//! cloudformation {
//!   cache_backend_host = "redis.internal"
//! }
//! ```
//!
//! Every option has a default, an empty document is a valid configuration.
use crate::cache::{Cache, CacheError, Ttl};
use crate::host::{Hierarchy, MergeBehavior};
use crate::lookup::Backend;
use crate::query::QueryClient;
use crate::remote::{RemoteError, StackApi};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data source locators, highest priority first
    pub hierarchy: Vec<String>,
    #[serde(alias = "mergeBehavior")]
    pub merge_behavior: MergeBehavior,
    pub cloudformation: CloudFormationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CloudFormationConfig {
    /// Zero or less keeps cache entries forever
    #[serde(alias = "cacheTtlSeconds", alias = "cache_ttl")]
    pub cache_ttl_seconds: i64,
    #[serde(alias = "parseMetadata")]
    pub parse_metadata: bool,
    #[serde(alias = "accessKeyId")]
    pub access_key_id: Option<String>,
    #[serde(alias = "secretAccessKey")]
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    /// Redis host, the in-process cache is used without it
    #[serde(alias = "cacheBackendHost", alias = "redis_hostname")]
    pub cache_backend_host: Option<String>,
    pub port: u16,
    #[serde(alias = "dbIndex")]
    pub db_index: i64,
}

impl Default for CloudFormationConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            parse_metadata: false,
            access_key_id: None,
            secret_access_key: None,
            region: None,
            cache_backend_host: None,
            port: 6380,
            db_index: 0,
        }
    }
}

impl Config {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_hcl_str(source: &str) -> Result<Self, ConfigError> {
        Ok(hcl::from_str(source)?)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!(path=%path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|extension| extension.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            Some("hcl") => Self::from_hcl_str(&contents),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn cache_ttl(&self) -> Ttl {
        Ttl::from_secs(self.cloudformation.cache_ttl_seconds)
    }

    pub fn hierarchy(&self) -> Hierarchy {
        Hierarchy::new(self.hierarchy.clone()).with_merge_behavior(self.merge_behavior)
    }

    /// Cache selected by the presence of a backend host
    pub fn cache(&self) -> Result<Cache, ConfigError> {
        let ttl = self.cache_ttl();
        let settings = &self.cloudformation;

        match &settings.cache_backend_host {
            None => {
                tracing::debug!(?ttl, "using in-process cache");
                Ok(Cache::in_memory(ttl))
            }
            #[cfg(feature = "redis")]
            Some(host) => {
                let backend =
                    crate::cache::RedisBackend::connect(host, settings.port, settings.db_index)?;
                Ok(Cache::new(backend, ttl))
            }
            #[cfg(not(feature = "redis"))]
            Some(_) => Err(ConfigError::FeatureDisabled("redis")),
        }
    }

    #[cfg(feature = "aws")]
    pub fn aws_settings(&self) -> crate::remote::AwsSettings {
        crate::remote::AwsSettings {
            access_key_id: self.cloudformation.access_key_id.clone(),
            secret_access_key: self.cloudformation.secret_access_key.clone(),
            region: self.cloudformation.region.clone(),
        }
    }
}

impl Backend<Hierarchy> {
    /// Backend talking to CloudFormation with the configured credentials and region
    #[cfg(feature = "aws")]
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let api = crate::remote::CloudFormationApi::new(&config.aws_settings())?;
        Self::from_config_with_api(config, api)
    }

    pub fn from_config_with_api(
        config: &Config,
        api: impl StackApi + 'static,
    ) -> Result<Self, ConfigError> {
        let client = QueryClient::new(api, config.cache()?);
        let backend = Backend::new(config.hierarchy(), client)
            .with_parse_metadata(config.cloudformation.parse_metadata);

        tracing::info!("cloudformation backend loaded");
        Ok(backend)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse yaml configuration")]
    YamlParseFailed(#[from] serde_yaml::Error),
    #[error("Unable to parse hcl configuration")]
    HclParseFailed(#[from] hcl::Error),
    #[error("Unsupported configuration file {0}, expected .yaml, .yml or .hcl")]
    UnsupportedFormat(PathBuf),
    #[error("Unable to set up cache backend")]
    Cache(#[from] CacheError),
    #[error("Unable to set up remote client")]
    Remote(#[from] RemoteError),
    #[error("{0} support is not enabled in this build")]
    FeatureDisabled(&'static str),
}
