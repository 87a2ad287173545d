use std::sync::LazyLock;

use crate::PROJECT_NAME;

pub mod k8s {
    pub mod labels {
        pub const NAME: &str = "app.kubernetes.io/name";
        pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";

        /// Setting this label to `"false"` on a pod disables sidecar
        /// injection unconditionally, before any other processing.
        pub const INJECTION_TOGGLE: &str = "pod-admission-webhook-injection";
    }

    pub mod annotations {
        use std::sync::LazyLock;

        use crate::PROJECT_NAME;

        /// The leading `.`-separated qualifier a log file annotation domain
        /// must start with, e.g. `logfile.logforge.io/paths`.
        pub const LOG_FILE_QUALIFIER: &str = "logfile";

        /// The canonical annotation domain published in the documentation.
        /// The filter accepts any `logfile.<suffix>` domain, not just this
        /// one.
        pub static LOG_FILE_DOMAIN: LazyLock<String> =
            LazyLock::new(|| format!("logfile.{PROJECT_NAME}.io"));
    }

    pub mod objects {
        /// ConfigMap carrying the shipper base configuration and the active
        /// topology identifier.
        pub const EXTERNAL_CONFIG_NAME: &str = "filebeat-sidecar";
        pub const SHIPPER_CONFIG_KEY: &str = "filebeat.yml";
        pub const TOPOLOGY_KEY: &str = "topology";

        /// Secret carrying the log store certificate bundle.
        pub const TRANSPORT_SECRET_NAME: &str = "logstore-tls";
        pub const TLS_CERT_KEY: &str = "tls.crt";
        pub const TLS_KEY_KEY: &str = "tls.key";
        pub const TLS_CA_KEY: &str = "ca.crt";
    }
}

pub const DEFAULT_NAMESPACE: &str = "logforge-system";
pub const DEFAULT_WEBHOOK_PATH: &str = "/mutate-v1-pod";
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9443";

pub const DEFAULT_SHIPPER_IMAGE: &str = "docker.elastic.co/beats/filebeat:8.5.0";
pub const DEFAULT_CERT_WRITER_IMAGE: &str = "docker.io/library/debian:bookworm-slim";

pub const CONFIG_VOLUME_NAME: &str = "filebeat-conf";
pub const TRANSPORT_VOLUME_NAME: &str = "logstore-certs";

/// New per-directory volumes are named `<prefix>-<index>` where `index` is
/// the directory's position in the deduplicated sequence.
pub static LOG_VOLUME_PREFIX: LazyLock<String> =
    LazyLock::new(|| format!("{PROJECT_NAME}-logdir"));

pub const CONFIG_INIT_CONTAINER_NAME: &str = "gen-filebeat-config";
pub const TRANSPORT_INIT_CONTAINER_NAME: &str = "gen-logstore-certs";
pub const SIDECAR_CONTAINER_NAME: &str = "filebeat";

pub const SHIPPER_CONFIG_FILE: &str = "filebeat.yml";
pub const DEFAULT_SHIPPER_CONFIG_DIR: &str = "/etc/filebeat/";
pub const DEFAULT_TRANSPORT_CERT_DIR: &str = "/usr/share/filebeat/certs/";
