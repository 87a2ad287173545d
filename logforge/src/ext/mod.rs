//! Extensions to Kubernetes API types.
//!
//! Adds webhook-specific accessors to `k8s_openapi` types so the admission
//! pipeline can stay free of metadata plumbing.

mod pod;

pub use self::pod::PodExt;
