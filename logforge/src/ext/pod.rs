use std::collections::BTreeMap;

use k8s_openapi::{Metadata, api::core::v1::Pod};
use logforge_base::consts::k8s::labels;

pub trait PodExt {
    /// Whether the opt-out label disables sidecar injection for this pod.
    fn injection_disabled(&self) -> bool;

    /// The pod's annotation map, or an empty one.
    fn annotations(&self) -> BTreeMap<String, String>;

    /// Best-effort name for diagnostics. Pods created through generators may
    /// not carry a final name at admission time.
    fn display_name(&self) -> &str;
}

impl PodExt for Pod {
    fn injection_disabled(&self) -> bool {
        self.metadata()
            .labels
            .as_ref()
            .and_then(|label_map| label_map.get(labels::INJECTION_TOGGLE))
            .is_some_and(|value| value == "false")
    }

    fn annotations(&self) -> BTreeMap<String, String> {
        self.metadata().annotations.clone().unwrap_or_default()
    }

    fn display_name(&self) -> &str {
        let metadata = self.metadata();
        metadata
            .name
            .as_deref()
            .or(metadata.generate_name.as_deref())
            .unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::Pod;
    use kube::api::ObjectMeta;

    use super::PodExt;
    use logforge_base::consts::k8s::labels;

    fn pod_with_labels(label_map: BTreeMap<String, String>) -> Pod {
        Pod {
            metadata: ObjectMeta { labels: Some(label_map), ..ObjectMeta::default() },
            ..Pod::default()
        }
    }

    #[test]
    fn test_injection_disabled_by_label() {
        let pod = pod_with_labels(BTreeMap::from_iter([(
            labels::INJECTION_TOGGLE.to_string(),
            "false".to_string(),
        )]));
        assert!(pod.injection_disabled());
    }

    #[test]
    fn test_injection_enabled_without_label() {
        assert!(!Pod::default().injection_disabled());
        assert!(!pod_with_labels(BTreeMap::new()).injection_disabled());
    }

    #[test]
    fn test_injection_enabled_with_other_label_value() {
        let pod = pod_with_labels(BTreeMap::from_iter([(
            labels::INJECTION_TOGGLE.to_string(),
            "true".to_string(),
        )]));
        assert!(!pod.injection_disabled());
    }

    #[test]
    fn test_display_name_falls_back_to_generate_name() {
        let pod = Pod {
            metadata: ObjectMeta {
                generate_name: Some("web-".to_string()),
                ..ObjectMeta::default()
            },
            ..Pod::default()
        };
        assert_eq!(pod.display_name(), "web-");
        assert_eq!(Pod::default().display_name(), "<unnamed>");
    }
}
