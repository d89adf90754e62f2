//! JSON configuration.

use crate::error::ConfigError;
#[cfg(feature = "http-client")]
use crate::error::TransportError;
#[cfg(feature = "http-client")]
use crate::http::HttpLdpClient;
use crate::target::StaticTargetResolver;
use oxiri::Iri;
use oxrdf::NamedNode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
#[cfg(feature = "http-client")]
use std::time::Duration;

/// Configuration of the targets and of the HTTP client.
///
/// ```
/// use oxrdf::NamedNodeRef;
/// use shapeql::{Config, TargetResolver};
///
/// let config = Config::from_json(r#"{
///     "targets": { "http://schema.org/Person": "http://example.org/cont/" },
///     "http": { "timeout_secs": 10 }
/// }"#)?;
/// let resolver = config.target_resolver()?;
/// assert_eq!(
///     resolver.resolve(NamedNodeRef::new_unchecked("http://schema.org/Person")).as_deref(),
///     Some("http://example.org/cont/")
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Resource URL of the instances of each class IRI.
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
    /// Resource URL used for classes missing from `targets`.
    #[serde(default)]
    pub default_target: Option<String>,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_redirection_limit")]
    pub redirection_limit: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            redirection_limit: default_redirection_limit(),
        }
    }
}

fn default_redirection_limit() -> usize {
    5
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a [`StaticTargetResolver`], validating all the IRIs.
    pub fn target_resolver(&self) -> Result<StaticTargetResolver, ConfigError> {
        let mut resolver = StaticTargetResolver::new();
        for (class, url) in &self.targets {
            let class = NamedNode::new(class.as_str()).map_err(|e| ConfigError::InvalidIri {
                iri: class.clone(),
                message: e.to_string(),
            })?;
            resolver = resolver.with_target(class, validate_url(url)?);
        }
        if let Some(url) = &self.default_target {
            resolver = resolver.with_default(validate_url(url)?);
        }
        Ok(resolver)
    }

    #[cfg(feature = "http-client")]
    pub fn http_client(&self) -> Result<HttpLdpClient, TransportError> {
        HttpLdpClient::new(
            self.http.timeout_secs.map(Duration::from_secs),
            self.http.redirection_limit,
        )
    }
}

fn validate_url(url: &str) -> Result<&str, ConfigError> {
    Iri::parse(url).map_err(|e| ConfigError::InvalidIri {
        iri: url.to_owned(),
        message: e.to_string(),
    })?;
    Ok(url)
}
