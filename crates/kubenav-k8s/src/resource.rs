use std::future::Future;

use kubenav_types::{ActionOutcome, ClientError, Invocation, LogTarget};

use crate::stream::LogStream;

/// Subresource candidates together with the instance they were read from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subresources {
    pub instance: String,
    pub names: Vec<String>,
}

/// Remote operations the wizard depends on.
///
/// Every call is issued from a background task; implementations never touch
/// UI state.
pub trait ResourceClient: Clone + Send + Sync + 'static {
    /// Build a client from a kubeconfig path
    fn connect(kubeconfig: &str) -> impl Future<Output = Result<Self, ClientError>> + Send;

    /// Kubeconfig candidates offered in the context selector
    fn list_contexts() -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    fn list_namespaces(&self) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    /// Deployments in a namespace
    fn list_resources(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    /// Pods of a deployment, formatted for display
    fn list_instances(
        &self,
        namespace: &str,
        resource: &str,
    ) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    /// Containers of a pod. Without an instance the first pod of the
    /// deployment is used and reported back.
    fn list_subresources(
        &self,
        namespace: &str,
        resource: &str,
        instance: Option<&str>,
    ) -> impl Future<Output = Result<Subresources, ClientError>> + Send;

    /// Directories one level under `base_path` inside a container
    fn list_nested_folders(
        &self,
        namespace: &str,
        instance: &str,
        subresource: &str,
        base_path: &str,
    ) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    fn fetch_log(
        &self,
        target: &LogTarget,
        tail: i64,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Start following a container log. Dropping the stream stops it.
    fn stream_log(&self, target: &LogTarget, tail: i64) -> LogStream;

    fn invoke_action(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<ActionOutcome, ClientError>> + Send;
}
