mod error;
mod log;
mod shipper;

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use logforge_base::consts;
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub use self::{
    error::Error,
    log::LogConfig,
    shipper::ShipperConfig,
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub shipper: ShipperConfig,

    #[serde(default = "LogConfig::default")]
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Socket address the admission server listens on.
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,

    /// URL path the mutating webhook configuration points at.
    #[serde(default = "default_webhook_path")]
    pub path: String,

    /// PEM certificate and key presented to the API server. When either is
    /// unset the server speaks plain HTTP, for TLS-terminating front ends
    /// and local testing.
    pub tls_cert_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,

    /// Namespace holding the shipper ConfigMap and the store certificate
    /// Secret.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_external_config_name")]
    pub external_config_name: String,

    #[serde(default = "default_transport_secret_name")]
    pub transport_secret_name: String,

    /// Upper bound, in seconds, for each control-plane read performed while
    /// handling one admission request.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            path: default_webhook_path(),
            tls_cert_file: None,
            tls_key_file: None,
            namespace: default_namespace(),
            external_config_name: default_external_config_name(),
            transport_secret_name: default_transport_secret_name(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }
}

impl Config {
    pub fn search_config_file_path() -> PathBuf {
        let paths = vec![Self::default_path()]
            .into_iter()
            .chain(logforge_base::fallback_project_config_directories().into_iter().map(
                |mut path| {
                    path.push(logforge_base::CLI_CONFIG_NAME);
                    path
                },
            ))
            .collect::<Vec<_>>();
        for path in paths {
            let Ok(exists) = path.try_exists() else {
                continue;
            };
            if exists {
                return path;
            }
        }
        Self::default_path()
    }

    #[inline]
    pub fn default_path() -> PathBuf {
        [
            logforge_base::PROJECT_CONFIG_DIR.to_path_buf(),
            PathBuf::from(logforge_base::CLI_CONFIG_NAME),
        ]
        .into_iter()
        .collect()
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut config: Self = {
            let path =
                path.as_ref().try_resolve().map(|path| path.to_path_buf()).with_context(|_| {
                    error::ResolveFilePathSnafu { file_path: path.as_ref().to_path_buf() }
                })?;
            let data =
                std::fs::read(&path).context(error::OpenConfigSnafu { filename: path.clone() })?;
            serde_yaml::from_slice(&data).context(error::ParseConfigSnafu { filename: path })?
        };

        config.log.file_path = resolve_optional(config.log.file_path)?;
        config.webhook.tls_cert_file = resolve_optional(config.webhook.tls_cert_file)?;
        config.webhook.tls_key_file = resolve_optional(config.webhook.tls_key_file)?;

        Ok(config)
    }

    /// The default configuration rendered as YAML, for `default-config`.
    #[must_use]
    pub fn template_basic() -> Vec<u8> {
        serde_yaml::to_string(&Self::default()).unwrap_or_default().into_bytes()
    }
}

fn resolve_optional(path: Option<PathBuf>) -> Result<Option<PathBuf>, Error> {
    match path.map(|path| {
        path.try_resolve()
            .map(|path| path.to_path_buf())
            .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
    }) {
        Some(Ok(path)) => Ok(Some(path)),
        Some(Err(err)) => Err(err),
        None => Ok(None),
    }
}

fn default_listen_address() -> SocketAddr {
    consts::DEFAULT_LISTEN_ADDRESS.parse().unwrap_or_else(|_| {
        SocketAddr::from(([0, 0, 0, 0], 9443))
    })
}

fn default_webhook_path() -> String { consts::DEFAULT_WEBHOOK_PATH.to_string() }

fn default_namespace() -> String { consts::DEFAULT_NAMESPACE.to_string() }

fn default_external_config_name() -> String {
    consts::k8s::objects::EXTERNAL_CONFIG_NAME.to_string()
}

fn default_transport_secret_name() -> String {
    consts::k8s::objects::TRANSPORT_SECRET_NAME.to_string()
}

const fn default_fetch_timeout_secs() -> u64 { 10 }

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_template_is_parseable() {
        let template = Config::template_basic();
        let parsed: Config = serde_yaml::from_slice(&template).unwrap();
        assert_eq!(parsed.webhook.namespace, "logforge-system");
        assert_eq!(parsed.webhook.path, "/mutate-v1-pod");
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.webhook.listen_address.port(), 9443);
        assert_eq!(config.webhook.external_config_name, "filebeat-sidecar");
        assert_eq!(config.webhook.fetch_timeout_secs, 10);
        assert!(config.webhook.tls_cert_file.is_none());
    }
}
