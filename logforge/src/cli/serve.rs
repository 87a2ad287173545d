use std::{net::SocketAddr, path::PathBuf};

use clap::Args;
use sigfinn::{ExitStatus, LifecycleManager};

use crate::{cli::Error, config::Config, webhook::WebhookServer};

/// Command-line arguments for running the admission webhook server.
///
/// Every flag overrides the corresponding configuration file entry; the
/// configuration file supplies the rest.
#[derive(Args, Clone)]
pub struct ServeCommand {
    #[arg(
        short = 'l',
        long = "listen-address",
        help = "Socket address the admission server listens on. Overrides the configuration file."
    )]
    pub listen_address: Option<SocketAddr>,

    #[arg(
        long = "tls-cert-file",
        help = "Path to the PEM certificate presented to the Kubernetes API server."
    )]
    pub tls_cert_file: Option<PathBuf>,

    #[arg(
        long = "tls-key-file",
        help = "Path to the PEM private key matching the serving certificate."
    )]
    pub tls_key_file: Option<PathBuf>,

    #[arg(
        short = 'n',
        long = "namespace",
        help = "Namespace holding the shipper ConfigMap and the store certificate Secret. \
                Overrides the configuration file."
    )]
    pub namespace: Option<String>,
}

impl ServeCommand {
    /// Runs the webhook server until it fails or an interrupt signal asks it
    /// to stop.
    pub async fn run(self, kube_client: kube::Client, mut config: Config) -> Result<(), Error> {
        let Self { listen_address, tls_cert_file, tls_key_file, namespace } = self;

        if let Some(listen_address) = listen_address {
            config.webhook.listen_address = listen_address;
        }
        if let Some(tls_cert_file) = tls_cert_file {
            config.webhook.tls_cert_file = Some(tls_cert_file);
        }
        if let Some(tls_key_file) = tls_key_file {
            config.webhook.tls_key_file = Some(tls_key_file);
        }
        if let Some(namespace) = namespace.filter(|s| !s.is_empty()) {
            config.webhook.namespace = namespace;
        }

        let listen_address = config.webhook.listen_address;
        let server = WebhookServer::new(kube_client, &config);

        let lifecycle_manager = LifecycleManager::<Error>::new();
        let create_fn = move |shutdown_signal| async move {
            match server.serve(shutdown_signal).await {
                Ok(()) => ExitStatus::Success,
                Err(err) => ExitStatus::Error(Error::from(err)),
            }
        };
        let _handle = lifecycle_manager.spawn("webhook-server", create_fn);

        tracing::info!("Admission webhook starting on {listen_address}. Use Ctrl+C to stop.");

        if let Ok(Err(err)) = lifecycle_manager.serve().await {
            tracing::error!("{err}");
            Err(err)
        } else {
            Ok(())
        }
    }
}
