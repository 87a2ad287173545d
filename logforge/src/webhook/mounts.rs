//! Mount conflict resolver: decides whether an existing container mount
//! already covers a log directory.

use k8s_openapi::api::core::v1::{Container, VolumeMount};

/// Normalizes a directory path to its trailing-slash form.
#[must_use]
pub fn normalized(path: &str) -> String {
    if path.ends_with('/') { path.to_string() } else { format!("{path}/") }
}

/// Collects the existing mounts across `containers` that are equivalent to
/// `directory`, deduplicated by volume name and mount path.
///
/// Equivalence is exact equality after trailing-slash normalization. A mount
/// of a parent directory does not cover a nested one; mounting the same host
/// path under two volumes is what this check exists to prevent, and only
/// exact matches can be reused safely.
#[must_use]
pub fn equivalent_mounts(directory: &str, containers: &[Container]) -> Vec<VolumeMount> {
    let wanted = normalized(directory);
    let mut matches: Vec<VolumeMount> = Vec::new();
    for container in containers {
        for mount in container.volume_mounts.iter().flatten() {
            if normalized(&mount.mount_path) != wanted {
                continue;
            }
            if matches
                .iter()
                .any(|seen| seen.name == mount.name && seen.mount_path == mount.mount_path)
            {
                continue;
            }
            matches.push(mount.clone());
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{Container, VolumeMount};

    use super::{equivalent_mounts, normalized};

    fn container_with_mounts(mounts: Vec<(&str, &str)>) -> Container {
        Container {
            name: "app".to_string(),
            volume_mounts: Some(
                mounts
                    .into_iter()
                    .map(|(name, path)| VolumeMount {
                        name: name.to_string(),
                        mount_path: path.to_string(),
                        ..VolumeMount::default()
                    })
                    .collect(),
            ),
            ..Container::default()
        }
    }

    #[test]
    fn test_normalized_appends_separator_once() {
        assert_eq!(normalized("/var/log/app"), "/var/log/app/");
        assert_eq!(normalized("/var/log/app/"), "/var/log/app/");
    }

    #[test]
    fn test_trailing_slash_symmetry() {
        let containers = vec![container_with_mounts(vec![("data", "/var/log/app")])];
        assert_eq!(equivalent_mounts("/var/log/app/", &containers).len(), 1);

        let containers = vec![container_with_mounts(vec![("data", "/var/log/app/")])];
        assert_eq!(equivalent_mounts("/var/log/app", &containers).len(), 1);
    }

    #[test]
    fn test_parent_mount_does_not_cover_nested_directory() {
        // Known boundary: only exact directory matches count as a conflict;
        // containment is deliberately not considered.
        let containers = vec![container_with_mounts(vec![("data", "/var/log/")])];
        assert!(equivalent_mounts("/var/log/app/", &containers).is_empty());
    }

    #[test]
    fn test_same_mount_in_two_containers_is_reported_once() {
        let containers = vec![
            container_with_mounts(vec![("data", "/var/log/app")]),
            container_with_mounts(vec![("data", "/var/log/app")]),
        ];
        assert_eq!(equivalent_mounts("/var/log/app/", &containers).len(), 1);
    }

    #[test]
    fn test_distinct_volumes_on_same_path_are_both_reported() {
        let containers = vec![
            container_with_mounts(vec![("data", "/var/log/app")]),
            container_with_mounts(vec![("other", "/var/log/app/")]),
        ];
        assert_eq!(equivalent_mounts("/var/log/app/", &containers).len(), 2);
    }

    #[test]
    fn test_no_mounts_means_no_conflict() {
        let containers = vec![container_with_mounts(vec![])];
        assert!(equivalent_mounts("/var/log/app/", &containers).is_empty());
    }
}
