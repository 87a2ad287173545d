use std::{net::SocketAddr, path::PathBuf};

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to fetch external configuration {namespace}/{name}, error: {source}"))]
    FetchExternalConfig {
        namespace: String,
        name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Timed out fetching external configuration {namespace}/{name}"))]
    FetchExternalConfigTimeout { namespace: String, name: String },

    #[snafu(display("Failed to fetch transport secret {namespace}/{name}, error: {source}"))]
    FetchTransportSecret {
        namespace: String,
        name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("Timed out fetching transport secret {namespace}/{name}"))]
    FetchTransportSecretTimeout { namespace: String, name: String },

    #[snafu(display("Transport secret {namespace}/{name} is missing key {key}"))]
    TransportSecretKeyMissing { namespace: String, name: String, key: String },

    #[snafu(display("Failed to render the shipper configuration document, error: {source}"))]
    RenderShipperConfig { source: serde_yaml::Error },

    #[snafu(display("Failed to read TLS material from {}, error: {source}", path.display()))]
    ReadTlsMaterial { path: PathBuf, source: std::io::Error },

    #[snafu(display("Failed to build the TLS server configuration, error: {source}"))]
    BuildTlsServerConfig { source: std::io::Error },

    #[snafu(display("Failed to serve the admission webhook on {listen_address}, error: {source}"))]
    Serve { listen_address: SocketAddr, source: std::io::Error },
}
