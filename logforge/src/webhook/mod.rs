//! The pod admission webhook: inspects incoming pod specifications and
//! attaches the log-shipping sidecar to enrolled workloads.
//!
//! Each admission request runs one linear pass: annotation filter → path
//! directory resolver → mount conflict resolver → sidecar assembler
//! (consulting the secure transport provisioner) → patch emitter. Every
//! stage is a pure function of its inputs; the only suspension points are
//! the two bounded control-plane reads, and nothing is shared between
//! requests.

mod annotations;
pub mod error;
mod external;
mod handler;
mod mounts;
mod paths;
mod sidecar;
mod transport;

use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use axum_server::tls_rustls::RustlsConfig;
use snafu::ResultExt;

pub use self::error::Error;
use crate::config::{Config, ShipperConfig};

/// Request-independent state shared by every admission invocation.
pub struct WebhookContext {
    pub client: kube::Client,
    pub namespace: String,
    pub external_config_name: String,
    pub transport_secret_name: String,
    pub fetch_timeout: Duration,
    pub shipper: ShipperConfig,
}

/// The admission webhook server.
pub struct WebhookServer {
    context: Arc<WebhookContext>,
    listen_address: SocketAddr,
    path: String,
    tls: Option<(PathBuf, PathBuf)>,
}

impl WebhookServer {
    #[must_use]
    pub fn new(client: kube::Client, config: &Config) -> Self {
        let webhook = &config.webhook;
        let context = Arc::new(WebhookContext {
            client,
            namespace: webhook.namespace.clone(),
            external_config_name: webhook.external_config_name.clone(),
            transport_secret_name: webhook.transport_secret_name.clone(),
            fetch_timeout: webhook.fetch_timeout(),
            shipper: config.shipper.clone(),
        });
        let tls = match (&webhook.tls_cert_file, &webhook.tls_key_file) {
            (Some(cert_file), Some(key_file)) => Some((cert_file.clone(), key_file.clone())),
            _ => None,
        };
        Self {
            context,
            listen_address: webhook.listen_address,
            path: webhook.path.clone(),
            tls,
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route(&self.path, post(handler::mutate_handler))
            .route("/healthz", get(healthz))
            .with_state(Arc::clone(&self.context))
    }

    /// Serves admission requests until the server fails or `shutdown_signal`
    /// fires.
    pub async fn serve(
        self,
        shutdown_signal: impl Future<Output = ()> + Send,
    ) -> Result<(), Error> {
        let router = self.router();
        let listen_address = self.listen_address;

        tokio::pin!(shutdown_signal);
        match self.tls {
            Some((cert_file, key_file)) => {
                // The process-wide crypto provider must be picked explicitly
                // once several rustls backends land in the dependency graph.
                if let Err(err) = rustls::crypto::aws_lc_rs::default_provider().install_default()
                {
                    tracing::debug!("rustls crypto provider already installed: {err:?}");
                }
                let cert = std::fs::read(&cert_file)
                    .context(error::ReadTlsMaterialSnafu { path: cert_file.clone() })?;
                let key = std::fs::read(&key_file)
                    .context(error::ReadTlsMaterialSnafu { path: key_file.clone() })?;
                let tls_config = RustlsConfig::from_pem(cert, key)
                    .await
                    .context(error::BuildTlsServerConfigSnafu)?;

                tracing::info!("Serving admission webhook with TLS on {listen_address}");
                let server = axum_server::bind_rustls(listen_address, tls_config)
                    .serve(router.into_make_service());
                tokio::select! {
                    result = server => result.context(error::ServeSnafu { listen_address }),
                    () = &mut shutdown_signal => Ok(()),
                }
            }
            None => {
                tracing::warn!(
                    "No TLS certificate configured; serving plain HTTP on {listen_address}"
                );
                let server =
                    axum_server::bind(listen_address).serve(router.into_make_service());
                tokio::select! {
                    result = server => result.context(error::ServeSnafu { listen_address }),
                    () = &mut shutdown_signal => Ok(()),
                }
            }
        }
    }
}

async fn healthz() -> &'static str { "ok" }
