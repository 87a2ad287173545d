use std::{fmt, str::FromStr};

use snafu::Snafu;

/// Deployment shape of the logging backend this cluster runs.
///
/// The provisioning side of the operator stands these shapes up; the webhook
/// only consults the matching [`TopologyProfile`] record. Numeric identifiers
/// are accepted when parsing because the storage layer historically recorded
/// the topology as a bare number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Topology {
    /// Single-node log store, shipper writes to it directly.
    SingleStore,
    /// Clustered log store, shipper writes to it directly over TLS.
    ClusteredStore,
    /// Single-node store fed through an aggregator.
    SingleStoreAggregated,
    /// Clustered store fed through an aggregator.
    ClusteredStoreAggregated,
    /// Single-node store fed through a broker and an aggregator.
    SingleStoreBrokered,
    /// Clustered store fed through a clustered broker and an aggregator.
    ClusteredStoreBrokered,
}

/// Static description of one topology: the services the pipeline consists of
/// and whether the shipper must present certificates to the store.
#[derive(Debug)]
pub struct TopologyProfile {
    pub name: &'static str,
    pub store_service: &'static str,
    pub aggregator_service: Option<&'static str>,
    pub broker_service: Option<&'static str>,
    pub requires_tls: bool,
}

const SINGLE_STORE: TopologyProfile = TopologyProfile {
    name: "single-store",
    store_service: "elasticsearch",
    aggregator_service: None,
    broker_service: None,
    requires_tls: false,
};

const CLUSTERED_STORE: TopologyProfile = TopologyProfile {
    name: "clustered-store",
    store_service: "elasticsearch-master",
    aggregator_service: None,
    broker_service: None,
    requires_tls: true,
};

const SINGLE_STORE_AGGREGATED: TopologyProfile = TopologyProfile {
    name: "single-store-aggregated",
    store_service: "elasticsearch",
    aggregator_service: Some("logstash"),
    broker_service: None,
    requires_tls: false,
};

const CLUSTERED_STORE_AGGREGATED: TopologyProfile = TopologyProfile {
    name: "clustered-store-aggregated",
    store_service: "elasticsearch-master",
    aggregator_service: Some("logstash"),
    broker_service: None,
    requires_tls: false,
};

const SINGLE_STORE_BROKERED: TopologyProfile = TopologyProfile {
    name: "single-store-brokered",
    store_service: "elasticsearch",
    aggregator_service: Some("logstash"),
    broker_service: Some("kafka"),
    requires_tls: false,
};

const CLUSTERED_STORE_BROKERED: TopologyProfile = TopologyProfile {
    name: "clustered-store-brokered",
    store_service: "elasticsearch-master",
    aggregator_service: Some("logstash"),
    broker_service: Some("kafka-cluster"),
    requires_tls: false,
};

impl Topology {
    #[must_use]
    pub const fn profile(self) -> &'static TopologyProfile {
        match self {
            Self::SingleStore => &SINGLE_STORE,
            Self::ClusteredStore => &CLUSTERED_STORE,
            Self::SingleStoreAggregated => &SINGLE_STORE_AGGREGATED,
            Self::ClusteredStoreAggregated => &CLUSTERED_STORE_AGGREGATED,
            Self::SingleStoreBrokered => &SINGLE_STORE_BROKERED,
            Self::ClusteredStoreBrokered => &CLUSTERED_STORE_BROKERED,
        }
    }

    /// Whether the shipper needs the store certificate bundle mounted.
    #[must_use]
    pub const fn requires_tls(self) -> bool { self.profile().requires_tls }
}

impl TopologyProfile {
    /// Human-readable ingestion route, shipper first, store last.
    #[must_use]
    pub fn route(&self) -> String {
        let mut hops = vec![logforge_base::consts::SIDECAR_CONTAINER_NAME];
        if let Some(broker) = self.broker_service {
            hops.push(broker);
        }
        if let Some(aggregator) = self.aggregator_service {
            hops.push(aggregator);
        }
        hops.push(self.store_service);
        hops.join(" -> ")
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

impl FromStr for Topology {
    type Err = ParseTopologyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1" | "single-store" => Ok(Self::SingleStore),
            "2" | "clustered-store" => Ok(Self::ClusteredStore),
            "3" | "single-store-aggregated" => Ok(Self::SingleStoreAggregated),
            "4" | "clustered-store-aggregated" => Ok(Self::ClusteredStoreAggregated),
            "5" | "single-store-brokered" => Ok(Self::SingleStoreBrokered),
            "6" | "clustered-store-brokered" => Ok(Self::ClusteredStoreBrokered),
            _ => Err(ParseTopologyError::Unknown { value: value.to_string() }),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ParseTopologyError {
    #[snafu(display("'{value}' is not a known topology identifier"))]
    Unknown { value: String },
}
