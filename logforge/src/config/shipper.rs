use std::fmt;

use logforge_base::consts;
use serde::{Deserialize, Serialize};

/// Settings for the injected log-shipping sidecar and its init containers.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipperConfig {
    /// Image running both the configuration-generating init container and
    /// the shipping sidecar.
    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default)]
    pub image_pull_policy: ImagePullPolicy,

    /// Image for the init container that materializes store certificates.
    /// Anything with a POSIX shell will do.
    #[serde(default = "default_cert_writer_image")]
    pub cert_writer_image: String,

    /// Directory inside the sidecar holding the generated configuration
    /// file.
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    /// Directory inside the sidecar where the store certificate bundle is
    /// written for TLS topologies.
    #[serde(default = "default_certificate_dir")]
    pub certificate_dir: String,

    /// The shipper must read log files written by arbitrary workload uids
    /// across ownership boundaries; on most clusters that requires a
    /// privileged sidecar.
    #[serde(default = "default_privileged")]
    pub privileged: bool,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            image_pull_policy: ImagePullPolicy::default(),
            cert_writer_image: default_cert_writer_image(),
            config_dir: default_config_dir(),
            certificate_dir: default_certificate_dir(),
            privileged: default_privileged(),
        }
    }
}

impl ShipperConfig {
    /// Absolute path of the generated configuration file inside the sidecar.
    #[must_use]
    pub fn config_file_path(&self) -> String {
        format!("{}/{}", self.config_dir.trim_end_matches('/'), consts::SHIPPER_CONFIG_FILE)
    }
}

fn default_image() -> String { consts::DEFAULT_SHIPPER_IMAGE.to_string() }

fn default_cert_writer_image() -> String { consts::DEFAULT_CERT_WRITER_IMAGE.to_string() }

fn default_config_dir() -> String { consts::DEFAULT_SHIPPER_CONFIG_DIR.to_string() }

fn default_certificate_dir() -> String { consts::DEFAULT_TRANSPORT_CERT_DIR.to_string() }

const fn default_privileged() -> bool { true }

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ImagePullPolicy {
    #[default]
    IfNotPresent,
    Always,
    Never,
}

impl fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let val = match self {
            Self::IfNotPresent => "IfNotPresent",
            Self::Always => "Always",
            Self::Never => "Never",
        };
        f.write_str(val)
    }
}
