//! Annotation filter: selects the workload annotations that declare log file
//! locations.

use std::collections::BTreeMap;

use logforge_base::consts::k8s::annotations;

pub const DOMAIN_SEPARATOR: char = '/';
pub const SUBDOMAIN_SEPARATOR: char = '.';

/// Returns the subset of `all` whose keys declare log file paths.
///
/// Produces a fresh map; the pod's own annotations are never touched.
/// Non-matching keys are dropped silently, they simply belong to someone
/// else.
pub fn filter_log_annotations(all: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    all.iter()
        .filter(|(key, _)| is_log_file_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// A key matches iff it reads `logfile.<suffix>/<field>`: the domain before
/// the `/` is `.`-separated with the literal `logfile` qualifier first and
/// at least one suffix segment, and the field after the `/` is non-empty
/// ASCII alphanumerics and dots.
pub fn is_log_file_key(key: &str) -> bool {
    let Some((domain, field)) = key.split_once(DOMAIN_SEPARATOR) else {
        return false;
    };
    let mut subdomains = domain.split(SUBDOMAIN_SEPARATOR);
    if subdomains.next() != Some(annotations::LOG_FILE_QUALIFIER) {
        return false;
    }
    if subdomains.next().is_none_or(str::is_empty) {
        return false;
    }
    !field.is_empty()
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == SUBDOMAIN_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use logforge_base::consts::k8s::annotations::LOG_FILE_DOMAIN;

    use super::{filter_log_annotations, is_log_file_key};

    #[test]
    fn test_canonical_key_matches() {
        assert!(is_log_file_key(&format!("{}/paths", *LOG_FILE_DOMAIN)));
        assert!(is_log_file_key("logfile.example.org/app.access"));
        assert!(is_log_file_key("logfile.io/x"));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        // No field separator at all.
        assert!(!is_log_file_key("logfile.example.org"));
        // Wrong qualifier.
        assert!(!is_log_file_key("metrics.example.org/paths"));
        // Qualifier without a domain suffix.
        assert!(!is_log_file_key("logfile/paths"));
        assert!(!is_log_file_key("logfile./paths"));
        // Empty or non-alphanumeric field.
        assert!(!is_log_file_key("logfile.example.org/"));
        assert!(!is_log_file_key("logfile.example.org/pa_ths"));
        assert!(!is_log_file_key("logfile.example.org/a/b"));
    }

    #[test]
    fn test_filter_keeps_only_matching_keys() {
        let all = BTreeMap::from_iter([
            ("logfile.example.org/app".to_string(), "/var/log/app/a.log".to_string()),
            ("prometheus.io/scrape".to_string(), "true".to_string()),
            ("logfile".to_string(), "/var/log/oops.log".to_string()),
        ]);

        let filtered = filter_log_annotations(&all);

        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("logfile.example.org/app"));
        // The input map is left as it was.
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_filter_of_unrelated_annotations_is_empty() {
        let all = BTreeMap::from_iter([
            ("prometheus.io/scrape".to_string(), "true".to_string()),
            ("sidecar.istio.io/inject".to_string(), "false".to_string()),
        ]);
        assert!(filter_log_annotations(&all).is_empty());
    }
}
