//! Kubernetes client for kubenav
//!
//! This crate defines the [`ResourceClient`] interface the wizard talks to and
//! its Kubernetes implementation, [`KubeClient`].

mod client;
mod exec;
mod kubeconfig;
mod resource;
mod stream;

pub use client::KubeClient;
pub use kubeconfig::{
    NEW_KUBECONFIG_ENTRY, default_kubeconfig_path, discover_kubeconfigs, expand_home,
};
pub use resource::{ResourceClient, Subresources};
pub use stream::{LogLineSender, LogStream};

// Re-export types that are used in our public API
pub use kubenav_types::{ActionOutcome, ClientError, Invocation, LogTarget};
