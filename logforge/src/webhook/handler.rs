//! Admission entry point: decides whether an incoming pod needs the shipper
//! sidecar and emits the mutation as a JSON patch.

use std::sync::Arc;

use axum::{Json, extract::State};
use k8s_openapi::api::core::v1::Pod;
use kube::core::{
    DynamicObject,
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
};
use logforge_base::consts::k8s::labels;

use super::{
    WebhookContext, annotations, external::ExternalConfig, paths, sidecar,
    transport::TransportBundle,
};
use crate::ext::PodExt;

/// Why a pod is admitted unchanged, or the log paths it enrolled with.
#[derive(Debug)]
pub enum Enrollment {
    /// The opt-out label short-circuits everything else.
    OptedOut,
    /// No annotation declares a log file path.
    NotEnrolled,
    Enrolled { log_paths: Vec<String> },
}

/// Pure classification of a pod, before any external read happens.
#[must_use]
pub fn classify(pod: &Pod) -> Enrollment {
    if pod.injection_disabled() {
        return Enrollment::OptedOut;
    }
    let filtered = annotations::filter_log_annotations(&pod.annotations());
    let log_paths = paths::collect_log_paths(&filtered, pod.display_name());
    if log_paths.is_empty() {
        return Enrollment::NotEnrolled;
    }
    Enrollment::Enrolled { log_paths }
}

/// Handles one `AdmissionReview` over HTTP.
pub async fn mutate_handler(
    State(context): State<Arc<WebhookContext>>,
    Json(review): Json<AdmissionReview<Pod>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<Pod> = match review.try_into() {
        Ok(request) => request,
        Err(err) => {
            tracing::error!("Failed to parse admission request, error: {err}");
            return Json(AdmissionResponse::invalid(err.to_string()).into_review());
        }
    };

    let response = mutate(&context, &request).await;
    Json(response.into_review())
}

/// One linear pass: classify, snapshot the external configuration, fetch the
/// certificate bundle if (and only if) the topology needs it, assemble the
/// sidecar, emit the patch. Every miss admits the pod unchanged; only
/// failures on a path that was actually required become admission errors.
async fn mutate(context: &WebhookContext, request: &AdmissionRequest<Pod>) -> AdmissionResponse {
    let Some(pod) = &request.object else {
        tracing::debug!("No pod object in admission request, allowing unchanged");
        return AdmissionResponse::from(request);
    };
    let namespace = request.namespace.clone().unwrap_or_default();
    let pod_name = pod.display_name();

    let log_paths = match classify(pod) {
        Enrollment::OptedOut => {
            tracing::info!(
                "Namespace: {namespace}; Pod: {pod_name}; label {}=\"false\" set, admitting \
                 without sidecar",
                labels::INJECTION_TOGGLE,
            );
            return AdmissionResponse::from(request);
        }
        Enrollment::NotEnrolled => {
            tracing::info!(
                "Namespace: {namespace}; Pod: {pod_name}; no log file annotations, admitting \
                 without sidecar",
            );
            return AdmissionResponse::from(request);
        }
        Enrollment::Enrolled { log_paths } => log_paths,
    };

    let external = match ExternalConfig::fetch(
        context.client.clone(),
        &context.namespace,
        &context.external_config_name,
        context.fetch_timeout,
    )
    .await
    {
        Ok(Some(external)) => external,
        Ok(None) => {
            tracing::info!(
                "External configuration {}/{} absent or incomplete, admitting without sidecar",
                context.namespace,
                context.external_config_name,
            );
            return AdmissionResponse::from(request);
        }
        Err(err) => {
            tracing::error!("{err}");
            return AdmissionResponse::from(request).deny(err.to_string());
        }
    };

    let transport_bundle = if external.topology.requires_tls() {
        match TransportBundle::fetch(
            context.client.clone(),
            &context.namespace,
            &context.transport_secret_name,
            context.fetch_timeout,
        )
        .await
        {
            Ok(bundle) => Some(bundle),
            Err(err) => {
                tracing::error!("{err}");
                return AdmissionResponse::from(request).deny(err.to_string());
            }
        }
    } else {
        None
    };

    let mut mutated = pod.clone();
    let Some(pod_spec) = mutated.spec.as_mut() else {
        tracing::debug!("Pod {namespace}/{pod_name} has no spec, allowing unchanged");
        return AdmissionResponse::from(request);
    };
    if let Err(err) = sidecar::inject(
        pod_spec,
        &log_paths,
        &external,
        &context.shipper,
        transport_bundle.as_ref(),
    ) {
        tracing::error!("{err}");
        return AdmissionResponse::from(request).deny(err.to_string());
    }

    tracing::info!(
        "Injecting shipper sidecar into {namespace}/{pod_name}; {} log path(s); topology {}; \
         route {}",
        log_paths.len(),
        external.topology,
        external.topology.profile().route(),
    );

    emit_patch(request, pod, &mutated)
}

/// Patch emitter: serializes the original and mutated pod and attaches the
/// resulting JSON patch to the admission response. Serialization trouble is
/// a mechanism failure, reported as an admission error.
fn emit_patch(
    request: &AdmissionRequest<Pod>,
    original: &Pod,
    mutated: &Pod,
) -> AdmissionResponse {
    let (original, mutated) =
        match (serde_json::to_value(original), serde_json::to_value(mutated)) {
            (Ok(original), Ok(mutated)) => (original, mutated),
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!("Failed to serialize pod for patching, error: {err}");
                return AdmissionResponse::from(request)
                    .deny(format!("pod serialization error: {err}"));
            }
        };

    let patch = json_patch::diff(&original, &mutated);
    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => response,
        Err(err) => {
            tracing::error!("Failed to serialize admission patch, error: {err}");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {err}"))
        }
    }
}
