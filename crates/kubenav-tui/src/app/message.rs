use kubenav_k8s::Subresources;
use kubenav_logs::StreamEvent;
use kubenav_types::{ActionOutcome, ClientError, Invocation, LogTarget};

/// Background work requested by the wizard. The runtime executes each one
/// off the UI thread and answers with a [`Message`].
#[derive(Clone, Debug)]
pub enum Effect {
    LoadContexts,
    Connect {
        path: String,
    },
    LoadNamespaces,
    LoadResources {
        namespace: String,
    },
    LoadInstances {
        namespace: String,
        resource: String,
    },
    LoadSubresources {
        namespace: String,
        resource: String,
        instance: Option<String>,
    },
    LoadFolders {
        namespace: String,
        instance: String,
        subresource: String,
        base_path: &'static str,
    },
    FetchLogs {
        target: LogTarget,
        tail: i64,
    },
    StartLogStream {
        target: LogTarget,
        tail: i64,
        stream: u64,
    },
    StopLogStream,
    Execute(Invocation),
    /// Write lines to a timestamped file named after `pod`
    ExportLogs {
        pod: String,
        lines: Vec<String>,
    },
}

/// Completion of background work, applied on the UI thread
#[derive(Clone, Debug)]
pub enum Message {
    ContextsLoaded(Result<Vec<String>, ClientError>),
    /// The runtime has already swapped its client when `result` is Ok
    Connected {
        path: String,
        result: Result<(), ClientError>,
    },
    NamespacesLoaded(Result<Vec<String>, ClientError>),
    ResourcesLoaded {
        namespace: String,
        result: Result<Vec<String>, ClientError>,
    },
    InstancesLoaded {
        resource: String,
        result: Result<Vec<String>, ClientError>,
    },
    /// `instance` is the pod the request named, if any
    SubresourcesLoaded {
        resource: String,
        instance: Option<String>,
        result: Result<Subresources, ClientError>,
    },
    FoldersLoaded {
        instance: String,
        subresource: String,
        result: Result<Vec<String>, ClientError>,
    },
    LogsFetched(Result<String, ClientError>),
    ExecutionFinished(Result<ActionOutcome, ClientError>),
    /// Path of the written file, or the failure
    LogsExported(Result<String, String>),
    Stream(StreamEvent),
}
