//! Path directory resolver: turns filtered annotations into the ordered set
//! of unique log directories the sidecar needs mounted.

use std::collections::BTreeMap;

use logforge_base::consts::k8s::annotations;

use super::annotations::{DOMAIN_SEPARATOR, SUBDOMAIN_SEPARATOR};

const VALUE_SEPARATOR: char = ',';
const PATH_SEPARATOR: char = '/';

/// Extracts every declared log file path from the filtered annotation map,
/// in map order.
///
/// Each annotation is validated on its own: a malformed key or entry is
/// logged and skipped without aborting the rest of the request. `pod_name`
/// is only used for diagnostics.
pub fn collect_log_paths(filtered: &BTreeMap<String, String>, pod_name: &str) -> Vec<String> {
    let mut log_paths = Vec::new();
    for (key, value) in filtered {
        let segments = key.split(DOMAIN_SEPARATOR).collect::<Vec<_>>();
        if segments.len() != 2 {
            tracing::warn!("Log file annotation for pod {pod_name} is invalid: {key}");
            continue;
        }
        let subdomains = segments[0].split(SUBDOMAIN_SEPARATOR).collect::<Vec<_>>();
        if subdomains.len() < 2 || subdomains[0] != annotations::LOG_FILE_QUALIFIER {
            tracing::warn!("Log file annotation for pod {pod_name} is invalid: {key}");
            continue;
        }
        for path in value.split(VALUE_SEPARATOR) {
            if path.is_empty() {
                tracing::warn!("Empty log path entry in annotation {key} for pod {pod_name}");
                continue;
            }
            if !path.starts_with(PATH_SEPARATOR) {
                tracing::warn!(
                    "Log path '{path}' in annotation {key} for pod {pod_name} is not absolute"
                );
                continue;
            }
            log_paths.push(path.to_string());
        }
    }
    log_paths
}

/// The unique parent directories of `log_paths`, first-seen order preserved.
/// Every returned directory ends in a path separator.
pub fn unique_parent_directories(log_paths: &[String]) -> Vec<String> {
    let mut directories: Vec<String> = Vec::new();
    for path in log_paths {
        let Some(directory) = parent_directory(path) else {
            continue;
        };
        if !directories.iter().any(|existing| existing == directory) {
            directories.push(directory.to_string());
        }
    }
    directories
}

/// Everything up to and including the final separator, like the directory
/// half of a split on the last `/`.
fn parent_directory(path: &str) -> Option<&str> {
    path.rfind(PATH_SEPARATOR).map(|index| &path[..=index])
}
