//! Secure transport provisioning: materializes the log store certificate
//! bundle for topologies where the shipper talks TLS to the store directly.

use std::{borrow::Cow, collections::BTreeMap, time::Duration};

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
};
use k8s_openapi::{ByteString, api::core::v1::Secret};
use kube::Api;
use logforge_base::consts::k8s::objects;
use snafu::ResultExt;

use super::{error, error::Error};

/// PEM material for the store connection, ready to be embedded in a shell
/// command. Fetched lazily: topologies without TLS never touch the secret
/// store.
#[derive(Clone, Debug)]
pub struct TransportBundle {
    pub certificate: String,
    pub private_key: String,
    pub certificate_authority: String,
}

impl TransportBundle {
    pub fn from_secret(secret: &Secret, namespace: &str, name: &str) -> Result<Self, Error> {
        let empty = BTreeMap::new();
        let data = secret.data.as_ref().unwrap_or(&empty);
        Ok(Self {
            certificate: material(data, objects::TLS_CERT_KEY, namespace, name)?,
            private_key: material(data, objects::TLS_KEY_KEY, namespace, name)?,
            certificate_authority: material(data, objects::TLS_CA_KEY, namespace, name)?,
        })
    }

    /// Fetches the bundle, bounded by `timeout`. Unlike the external
    /// configuration snapshot, absence here is an error: this path only runs
    /// when the topology requires the material.
    pub async fn fetch(
        client: kube::Client,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let api = Api::<Secret>::namespaced(client, namespace);
        let secret = tokio::time::timeout(timeout, api.get(name))
            .await
            .map_err(|_| Error::FetchTransportSecretTimeout {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?
            .context(error::FetchTransportSecretSnafu {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        Self::from_secret(&secret, namespace, name)
    }
}

fn material(
    data: &BTreeMap<String, ByteString>,
    key: &str,
    namespace: &str,
    name: &str,
) -> Result<String, Error> {
    data.get(key).map(|bytes| normalize_material(&bytes.0)).ok_or_else(|| {
        Error::TransportSecretKeyMissing {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        }
    })
}

/// Pushes `data` through one more base64 encode/decode round trip.
///
/// Secrets written by some provisioning layers carry stray padding from
/// being re-encoded on their way into the store; the round trip with a
/// pad-stripped decode flattens that out before the text lands in a shell
/// command.
fn normalize_material(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let decoded =
        STANDARD_NO_PAD.decode(encoded.trim_end_matches('=')).unwrap_or_else(|_| data.to_vec());
    String::from_utf8_lossy(&decoded).into_owned()
}

/// The shell command executed by the certificate init container: writes the
/// bundle as `tls.crt`, `tls.key`, `ca.crt` under `directory`.
#[must_use]
pub fn write_command(bundle: &TransportBundle, directory: &str) -> String {
    let directory = directory.trim_end_matches('/');
    format!(
        "echo {} > {directory}/{} \\\n&& echo {} > {directory}/{} \\\n&& echo {} > {directory}/{}",
        quoted(&bundle.certificate),
        objects::TLS_CERT_KEY,
        quoted(&bundle.private_key),
        objects::TLS_KEY_KEY,
        quoted(&bundle.certificate_authority),
        objects::TLS_CA_KEY,
    )
}

fn quoted(text: &str) -> Cow<'_, str> { shell_escape::escape(Cow::Borrowed(text)) }
