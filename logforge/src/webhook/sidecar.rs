//! Sidecar assembler: builds the init containers, the shipping sidecar, and
//! every volume and mount the declared log directories need.

use std::borrow::Cow;

use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, PodSpec, SecurityContext, Volume, VolumeMount,
};
use logforge_base::consts;
use serde::Serialize;
use snafu::ResultExt;

use super::{
    error, error::Error, external::ExternalConfig, mounts, paths, transport,
    transport::TransportBundle,
};
use crate::config::ShipperConfig;

/// Generator input-list structure templated into the shipper configuration.
#[derive(Serialize)]
struct GeneratedDocument {
    #[serde(rename = "filebeat.inputs")]
    inputs: Vec<GeneratedInput>,
}

#[derive(Serialize)]
struct GeneratedInput {
    #[serde(rename = "type")]
    kind: String,
    paths: Vec<String>,
}

/// Renders the merged configuration document: the discovered log paths as an
/// input list, followed by the base document from the external snapshot.
fn shipper_config_document(log_paths: &[String], base_document: &str) -> Result<String, Error> {
    let generated = GeneratedDocument {
        inputs: vec![GeneratedInput { kind: "log".to_string(), paths: log_paths.to_vec() }],
    };
    let generated =
        serde_yaml::to_string(&generated).context(error::RenderShipperConfigSnafu)?;
    Ok(format!("{generated}\n{base_document}\n"))
}

/// Appends the shipper sidecar, its init container(s), and the volumes and
/// mounts required for `log_paths` to `pod_spec`.
///
/// Deterministic by construction: identical inputs produce byte-identical
/// definitions. New volume names derive only from each directory's position
/// in the deduplicated sequence.
pub fn inject(
    pod_spec: &mut PodSpec,
    log_paths: &[String],
    external: &ExternalConfig,
    shipper: &ShipperConfig,
    transport_bundle: Option<&TransportBundle>,
) -> Result<(), Error> {
    let config_mount = VolumeMount {
        name: consts::CONFIG_VOLUME_NAME.to_string(),
        mount_path: mounts::normalized(&shipper.config_dir),
        ..VolumeMount::default()
    };
    pod_spec.volumes.get_or_insert_with(Vec::new).push(empty_dir(consts::CONFIG_VOLUME_NAME));

    let document = shipper_config_document(log_paths, &external.base_document)?;
    let config_init = Container {
        name: consts::CONFIG_INIT_CONTAINER_NAME.to_string(),
        image: Some(shipper.image.clone()),
        image_pull_policy: Some(shipper.image_pull_policy.to_string()),
        volume_mounts: Some(vec![config_mount.clone()]),
        command: Some(shell_command()),
        args: Some(vec![format!(
            "echo {} > {}",
            shell_escape::escape(Cow::Owned(document)),
            shipper.config_file_path(),
        )]),
        ..Container::default()
    };

    let mut sidecar = Container {
        name: consts::SIDECAR_CONTAINER_NAME.to_string(),
        image: Some(shipper.image.clone()),
        image_pull_policy: Some(shipper.image_pull_policy.to_string()),
        security_context: shipper.privileged.then(|| SecurityContext {
            privileged: Some(true),
            ..SecurityContext::default()
        }),
        volume_mounts: Some(vec![config_mount]),
        args: Some(vec!["-e".to_string(), "-c".to_string(), shipper.config_file_path()]),
        ..Container::default()
    };

    // One volume per directory nobody mounts yet; reuse for the rest.
    for (index, directory) in paths::unique_parent_directories(log_paths).iter().enumerate() {
        let existing = mounts::equivalent_mounts(directory, &pod_spec.containers);
        if existing.is_empty() {
            let volume_name = format!("{}-{index}", *consts::LOG_VOLUME_PREFIX);
            pod_spec.volumes.get_or_insert_with(Vec::new).push(empty_dir(&volume_name));

            let mount = VolumeMount {
                name: volume_name,
                mount_path: directory.clone(),
                ..VolumeMount::default()
            };
            // The application containers and the shipper must observe the
            // same directory.
            for container in &mut pod_spec.containers {
                container.volume_mounts.get_or_insert_with(Vec::new).push(mount.clone());
            }
            push_mount(&mut sidecar, mount);
        } else {
            for mount in existing {
                push_mount(&mut sidecar, mount);
            }
        }
    }

    if let Some(bundle) = transport_bundle {
        let cert_mount = VolumeMount {
            name: consts::TRANSPORT_VOLUME_NAME.to_string(),
            mount_path: mounts::normalized(&shipper.certificate_dir),
            ..VolumeMount::default()
        };
        pod_spec
            .volumes
            .get_or_insert_with(Vec::new)
            .push(empty_dir(consts::TRANSPORT_VOLUME_NAME));

        let transport_init = Container {
            name: consts::TRANSPORT_INIT_CONTAINER_NAME.to_string(),
            image: Some(shipper.cert_writer_image.clone()),
            image_pull_policy: Some(shipper.image_pull_policy.to_string()),
            volume_mounts: Some(vec![cert_mount.clone()]),
            command: Some(shell_command()),
            args: Some(vec![transport::write_command(bundle, &shipper.certificate_dir)]),
            ..Container::default()
        };
        pod_spec.init_containers.get_or_insert_with(Vec::new).push(transport_init);
        push_mount(&mut sidecar, cert_mount);
    }

    pod_spec.init_containers.get_or_insert_with(Vec::new).push(config_init);
    pod_spec.containers.push(sidecar);

    Ok(())
}

fn shell_command() -> Vec<String> { vec!["/bin/bash".to_string(), "-c".to_string()] }

fn empty_dir(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Volume::default()
    }
}

/// Attaches `mount` unless the container already carries an equivalent one.
fn push_mount(container: &mut Container, mount: VolumeMount) {
    let mounted = container.volume_mounts.get_or_insert_with(Vec::new);
    if !mounted
        .iter()
        .any(|existing| existing.name == mount.name && existing.mount_path == mount.mount_path)
    {
        mounted.push(mount);
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{Container, PodSpec, VolumeMount};

    use super::{inject, shipper_config_document};
    use crate::{
        config::ShipperConfig,
        topology::Topology,
        webhook::{external::ExternalConfig, transport::TransportBundle},
    };

    const BASE_DOCUMENT: &str = "output.elasticsearch:\n  hosts: ['http://elasticsearch:9200']\n";

    fn external(topology: Topology) -> ExternalConfig {
        ExternalConfig { base_document: BASE_DOCUMENT.to_string(), topology }
    }

    fn app_container(name: &str) -> Container {
        Container { name: name.to_string(), ..Container::default() }
    }

    fn two_paths() -> Vec<String> {
        vec!["/var/log/app/a.log".to_string(), "/var/log/app/b.log".to_string()]
    }

    #[test]
    fn test_document_lists_paths_and_base_settings() {
        let document = shipper_config_document(&two_paths(), BASE_DOCUMENT).unwrap();
        assert!(document.contains("filebeat.inputs"));
        assert!(document.contains("type: log"));
        assert!(document.contains("- /var/log/app/a.log"));
        assert!(document.contains("- /var/log/app/b.log"));
        assert!(document.contains("output.elasticsearch"));
    }

    #[test]
    fn test_two_paths_one_directory_one_new_volume_everywhere() {
        let mut pod_spec = PodSpec {
            containers: vec![app_container("app"), app_container("helper")],
            ..PodSpec::default()
        };

        inject(
            &mut pod_spec,
            &two_paths(),
            &external(Topology::SingleStore),
            &ShipperConfig::default(),
            None,
        )
        .unwrap();

        // Config scratch volume plus exactly one log directory volume.
        let volumes = pod_spec.volumes.as_ref().unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].name, "filebeat-conf");
        assert_eq!(volumes[1].name, "logforge-logdir-0");
        assert!(volumes[1].empty_dir.is_some());

        // Both app containers and the sidecar mount the directory.
        for container in &pod_spec.containers {
            let mounted = container
                .volume_mounts
                .iter()
                .flatten()
                .any(|mount| {
                    mount.name == "logforge-logdir-0" && mount.mount_path == "/var/log/app/"
                });
            assert!(mounted, "container {} misses the log mount", container.name);
        }

        // One init container, one appended sidecar.
        assert_eq!(pod_spec.init_containers.as_ref().unwrap().len(), 1);
        assert_eq!(pod_spec.containers.len(), 3);
        let sidecar = pod_spec.containers.last().unwrap();
        assert_eq!(sidecar.name, "filebeat");
        assert_eq!(sidecar.security_context.as_ref().unwrap().privileged, Some(true));
    }

    #[test]
    fn test_existing_mount_is_reused_instead_of_a_new_volume() {
        let mut pod_spec = PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                volume_mounts: Some(vec![VolumeMount {
                    name: "applogs".to_string(),
                    mount_path: "/var/log/app".to_string(),
                    ..VolumeMount::default()
                }]),
                ..Container::default()
            }],
            ..PodSpec::default()
        };

        inject(
            &mut pod_spec,
            &two_paths(),
            &external(Topology::SingleStore),
            &ShipperConfig::default(),
            None,
        )
        .unwrap();

        // Only the config scratch volume was added.
        let volumes = pod_spec.volumes.as_ref().unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "filebeat-conf");

        // The sidecar reuses the existing volume name.
        let sidecar = pod_spec.containers.last().unwrap();
        assert!(
            sidecar
                .volume_mounts
                .iter()
                .flatten()
                .any(|mount| mount.name == "applogs" && mount.mount_path == "/var/log/app")
        );
    }

    #[test]
    fn test_injection_is_deterministic() {
        let build = || {
            let mut pod_spec = PodSpec {
                containers: vec![app_container("app")],
                ..PodSpec::default()
            };
            inject(
                &mut pod_spec,
                &two_paths(),
                &external(Topology::SingleStore),
                &ShipperConfig::default(),
                None,
            )
            .unwrap();
            serde_json::to_string(&pod_spec).unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_tls_topology_adds_certificate_init_container_first() {
        let bundle = TransportBundle {
            certificate: "CERT".to_string(),
            private_key: "KEY".to_string(),
            certificate_authority: "CA".to_string(),
        };
        let mut pod_spec =
            PodSpec { containers: vec![app_container("app")], ..PodSpec::default() };

        inject(
            &mut pod_spec,
            &two_paths(),
            &external(Topology::ClusteredStore),
            &ShipperConfig::default(),
            Some(&bundle),
        )
        .unwrap();

        let init_containers = pod_spec.init_containers.as_ref().unwrap();
        assert_eq!(init_containers.len(), 2);
        assert_eq!(init_containers[0].name, "gen-logstore-certs");
        assert_eq!(init_containers[1].name, "gen-filebeat-config");

        let sidecar = pod_spec.containers.last().unwrap();
        assert!(
            sidecar
                .volume_mounts
                .iter()
                .flatten()
                .any(|mount| mount.name == "logstore-certs"
                    && mount.mount_path == "/usr/share/filebeat/certs/")
        );
    }

    #[test]
    fn test_non_tls_topology_has_no_certificate_plumbing() {
        let mut pod_spec =
            PodSpec { containers: vec![app_container("app")], ..PodSpec::default() };

        inject(
            &mut pod_spec,
            &two_paths(),
            &external(Topology::SingleStoreAggregated),
            &ShipperConfig::default(),
            None,
        )
        .unwrap();

        let init_containers = pod_spec.init_containers.as_ref().unwrap();
        assert_eq!(init_containers.len(), 1);
        assert!(pod_spec.volumes.iter().flatten().all(|volume| volume.name != "logstore-certs"));
    }

    #[test]
    fn test_sidecar_tails_the_generated_configuration() {
        let mut pod_spec =
            PodSpec { containers: vec![app_container("app")], ..PodSpec::default() };

        inject(
            &mut pod_spec,
            &two_paths(),
            &external(Topology::SingleStore),
            &ShipperConfig::default(),
            None,
        )
        .unwrap();

        let sidecar = pod_spec.containers.last().unwrap();
        assert_eq!(
            sidecar.args.as_ref().unwrap(),
            &vec!["-e".to_string(), "-c".to_string(), "/etc/filebeat/filebeat.yml".to_string()]
        );

        let init = &pod_spec.init_containers.as_ref().unwrap()[0];
        let command = &init.args.as_ref().unwrap()[0];
        assert!(command.contains("filebeat.inputs"));
        assert!(command.ends_with("> /etc/filebeat/filebeat.yml"));
    }
}
