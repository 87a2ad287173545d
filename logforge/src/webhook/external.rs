//! External configuration snapshot: the shipper base configuration document
//! and the active topology identifier, read from a cluster-stored ConfigMap.

use std::time::Duration;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use logforge_base::consts::k8s::objects;
use snafu::ResultExt;

use super::{error, error::Error};
use crate::topology::Topology;

/// Read-only snapshot, fetched once per admission request. Nothing here
/// outlives the request that fetched it.
#[derive(Clone, Debug)]
pub struct ExternalConfig {
    /// Base shipper configuration document appended verbatim after the
    /// generated input list.
    pub base_document: String,
    pub topology: Topology,
}

impl ExternalConfig {
    /// Builds the snapshot from ConfigMap data. `None` when the map is
    /// incomplete or carries an unknown topology identifier: a cluster whose
    /// pipeline is not (yet) provisioned, not an error.
    pub fn from_config_map(config_map: &ConfigMap) -> Option<Self> {
        let data = config_map.data.as_ref()?;
        let base_document = data.get(objects::SHIPPER_CONFIG_KEY)?.clone();
        let topology = match data.get(objects::TOPOLOGY_KEY)?.parse::<Topology>() {
            Ok(topology) => topology,
            Err(err) => {
                tracing::warn!("Ignoring external configuration: {err}");
                return None;
            }
        };
        Some(Self { base_document, topology })
    }

    /// Fetches the snapshot, bounded by `timeout`.
    ///
    /// An absent ConfigMap is `Ok(None)`; only transport-level failures and
    /// the elapsed timeout surface as errors.
    pub async fn fetch(
        client: kube::Client,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<Self>, Error> {
        let api = Api::<ConfigMap>::namespaced(client, namespace);
        let result = tokio::time::timeout(timeout, api.get(name)).await.map_err(|_| {
            Error::FetchExternalConfigTimeout {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }
        })?;

        match result {
            Ok(config_map) => Ok(Self::from_config_map(&config_map)),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(None),
            Err(source) => Err(source).context(error::FetchExternalConfigSnafu {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::ConfigMap;

    use super::ExternalConfig;
    use crate::topology::Topology;

    fn config_map(data: Vec<(&str, &str)>) -> ConfigMap {
        ConfigMap {
            data: Some(
                data.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
            ),
            ..ConfigMap::default()
        }
    }

    #[test]
    fn test_complete_data_builds_snapshot() {
        let snapshot = ExternalConfig::from_config_map(&config_map(vec![
            ("filebeat.yml", "output.elasticsearch:\n  hosts: ['http://elasticsearch:9200']\n"),
            ("topology", "clustered-store"),
        ]))
        .unwrap();

        assert_eq!(snapshot.topology, Topology::ClusteredStore);
        assert!(snapshot.base_document.contains("output.elasticsearch"));
    }

    #[test]
    fn test_numeric_topology_identifier_is_accepted() {
        let snapshot = ExternalConfig::from_config_map(&config_map(vec![
            ("filebeat.yml", "output.logstash:\n  hosts: ['logstash:5044']\n"),
            ("topology", "3"),
        ]))
        .unwrap();
        assert_eq!(snapshot.topology, Topology::SingleStoreAggregated);
    }

    #[test]
    fn test_incomplete_data_yields_none() {
        assert!(ExternalConfig::from_config_map(&ConfigMap::default()).is_none());
        assert!(
            ExternalConfig::from_config_map(&config_map(vec![("topology", "1")])).is_none()
        );
        assert!(
            ExternalConfig::from_config_map(&config_map(vec![("filebeat.yml", "x")])).is_none()
        );
    }

    #[test]
    fn test_unknown_topology_yields_none() {
        assert!(
            ExternalConfig::from_config_map(&config_map(vec![
                ("filebeat.yml", "x"),
                ("topology", "nine"),
            ]))
            .is_none()
        );
    }
}
