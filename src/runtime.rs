//! Executes wizard effects on background tasks
//!
//! Every effect except `StopLogStream` answers with exactly one [`Reply`];
//! log streams answer on their own channel with events tagged by stream id.
//! The active client lives here and is only replaced in [`Runtime::receive`],
//! which runs on the UI task.

use std::future::Future;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;

use kubenav_k8s::ResourceClient;
use kubenav_logs::{LogStreamManager, StreamEvent, StreamEventKind};
use kubenav_tui::{Effect, Message};
use kubenav_types::ClientError;

/// Completion of a background task
pub enum Reply<C> {
    Message(Message),
    /// A connect attempt, still carrying the new client
    Connected {
        path: String,
        result: Result<C, ClientError>,
    },
}

/// Receiving ends the main loop selects over
pub struct Channels<C> {
    pub replies: mpsc::UnboundedReceiver<Reply<C>>,
    pub streams: mpsc::UnboundedReceiver<StreamEvent>,
}

pub struct Runtime<C: ResourceClient> {
    client: Option<C>,
    replies: mpsc::UnboundedSender<Reply<C>>,
    stream_events: mpsc::UnboundedSender<StreamEvent>,
    streams: LogStreamManager,
    /// Directory log exports are written to
    export_dir: PathBuf,
}

impl<C: ResourceClient> Runtime<C> {
    pub fn new(client: Option<C>, export_dir: PathBuf) -> (Self, Channels<C>) {
        let (replies, replies_rx) = mpsc::unbounded_channel();
        let (stream_events, streams_rx) = mpsc::unbounded_channel();
        let runtime = Self {
            client,
            replies,
            stream_events,
            streams: LogStreamManager::new(),
            export_dir,
        };
        let channels = Channels {
            replies: replies_rx,
            streams: streams_rx,
        };
        (runtime, channels)
    }

    pub fn client(&self) -> Option<&C> {
        self.client.as_ref()
    }

    pub fn dispatch_all(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.dispatch(effect);
        }
    }

    pub fn dispatch(&mut self, effect: Effect) {
        tracing::debug!("dispatch {:?}", effect);
        match effect {
            Effect::LoadContexts => {
                self.spawn(async { Message::ContextsLoaded(C::list_contexts().await) })
            }
            Effect::Connect { path } => {
                let replies = self.replies.clone();
                tokio::spawn(async move {
                    let result = C::connect(&path).await;
                    if let Err(e) = &result {
                        tracing::warn!("connect with {} failed: {}", path, e);
                    }
                    let _ = replies.send(Reply::Connected { path, result });
                });
            }
            Effect::StopLogStream => self.streams.stop(),
            Effect::ExportLogs { pod, lines } => {
                let dir = self.export_dir.clone();
                self.spawn(export_logs(dir, pod, lines))
            }
            effect => match self.client.clone() {
                Some(client) => self.dispatch_remote(client, effect),
                None => {
                    if let Some(message) = disconnected(effect) {
                        self.send(message);
                    }
                }
            },
        }
    }

    fn dispatch_remote(&mut self, client: C, effect: Effect) {
        match effect {
            Effect::LoadNamespaces => {
                self.spawn(async move { Message::NamespacesLoaded(client.list_namespaces().await) })
            }
            Effect::LoadResources { namespace } => self.spawn(async move {
                let result = client.list_resources(&namespace).await;
                Message::ResourcesLoaded { namespace, result }
            }),
            Effect::LoadInstances {
                namespace,
                resource,
            } => self.spawn(async move {
                let result = client.list_instances(&namespace, &resource).await;
                Message::InstancesLoaded { resource, result }
            }),
            Effect::LoadSubresources {
                namespace,
                resource,
                instance,
            } => self.spawn(async move {
                let result = client
                    .list_subresources(&namespace, &resource, instance.as_deref())
                    .await;
                Message::SubresourcesLoaded {
                    resource,
                    instance,
                    result,
                }
            }),
            Effect::LoadFolders {
                namespace,
                instance,
                subresource,
                base_path,
            } => self.spawn(async move {
                let result = client
                    .list_nested_folders(&namespace, &instance, &subresource, base_path)
                    .await;
                Message::FoldersLoaded {
                    instance,
                    subresource,
                    result,
                }
            }),
            Effect::FetchLogs { target, tail } => self.spawn(async move {
                Message::LogsFetched(client.fetch_log(&target, tail).await)
            }),
            Effect::StartLogStream {
                target,
                tail,
                stream,
            } => self
                .streams
                .start(client, target, tail, stream, self.stream_events.clone()),
            Effect::Execute(invocation) => self.spawn(async move {
                let result = client.invoke_action(&invocation).await;
                if let Err(e) = &result {
                    tracing::warn!("{} failed: {}", invocation.action.name, e);
                }
                Message::ExecutionFinished(result)
            }),
            Effect::LoadContexts
            | Effect::Connect { .. }
            | Effect::StopLogStream
            | Effect::ExportLogs { .. } => {}
        }
    }

    /// Turn a reply into the message for the wizard, adopting a newly
    /// connected client
    pub fn receive(&mut self, reply: Reply<C>) -> Message {
        match reply {
            Reply::Message(message) => message,
            Reply::Connected { path, result } => match result {
                Ok(client) => {
                    tracing::debug!("switched client to {}", path);
                    self.streams.stop();
                    self.client = Some(client);
                    Message::Connected {
                        path,
                        result: Ok(()),
                    }
                }
                Err(e) => Message::Connected {
                    path,
                    result: Err(e),
                },
            },
        }
    }

    /// Stop background streaming
    pub fn shutdown(&mut self) {
        self.streams.stop();
    }

    fn send(&self, message: Message) {
        let _ = self.replies.send(Reply::Message(message));
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Message> + Send + 'static,
    {
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let _ = replies.send(Reply::Message(task.await));
        });
    }
}

/// Failure reply for remote work requested without a client
fn disconnected(effect: Effect) -> Option<Message> {
    let err = ClientError::Transport("no cluster connection".to_string());
    let message = match effect {
        Effect::LoadNamespaces => Message::NamespacesLoaded(Err(err)),
        Effect::LoadResources { namespace } => Message::ResourcesLoaded {
            namespace,
            result: Err(err),
        },
        Effect::LoadInstances { resource, .. } => Message::InstancesLoaded {
            resource,
            result: Err(err),
        },
        Effect::LoadSubresources {
            resource, instance, ..
        } => Message::SubresourcesLoaded {
            resource,
            instance,
            result: Err(err),
        },
        Effect::LoadFolders {
            instance,
            subresource,
            ..
        } => Message::FoldersLoaded {
            instance,
            subresource,
            result: Err(err),
        },
        Effect::FetchLogs { .. } => Message::LogsFetched(Err(err)),
        Effect::StartLogStream { stream, .. } => Message::Stream(StreamEvent {
            stream,
            kind: StreamEventKind::Ended(Some(err.to_string())),
        }),
        Effect::Execute(_) => Message::ExecutionFinished(Err(err)),
        Effect::LoadContexts
        | Effect::Connect { .. }
        | Effect::StopLogStream
        | Effect::ExportLogs { .. } => return None,
    };
    Some(message)
}

/// `<pod>_<YYYYmmdd_HHMMSS>.log`
pub fn export_file_name(pod: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.log", pod, at.format("%Y%m%d_%H%M%S"))
}

async fn export_logs(dir: PathBuf, pod: String, lines: Vec<String>) -> Message {
    let path = dir.join(export_file_name(&pod, chrono::Local::now().naive_local()));
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    let result = tokio::fs::write(&path, content)
        .await
        .map(|_| path.display().to_string())
        .map_err(|e| e.to_string());
    if let Err(e) = &result {
        tracing::warn!("failed to export logs to {}: {}", path.display(), e);
    }
    Message::LogsExported(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kubenav_k8s::{LogStream, Subresources};
    use kubenav_types::{ActionOutcome, ActionSpec, Invocation, LogTarget};

    #[derive(Clone, Debug)]
    struct FakeClient {
        kubeconfig: String,
    }

    impl ResourceClient for FakeClient {
        async fn connect(kubeconfig: &str) -> Result<Self, ClientError> {
            if kubeconfig == "broken" {
                return Err(ClientError::InvalidInput("failed to read kubeconfig".into()));
            }
            Ok(Self {
                kubeconfig: kubeconfig.to_string(),
            })
        }

        async fn list_contexts() -> Result<Vec<String>, ClientError> {
            Ok(vec!["/kube/config".into()])
        }

        async fn list_namespaces(&self) -> Result<Vec<String>, ClientError> {
            Ok(vec!["default".into(), self.kubeconfig.clone()])
        }

        async fn list_resources(&self, namespace: &str) -> Result<Vec<String>, ClientError> {
            Ok(vec![format!("{}-web", namespace)])
        }

        async fn list_instances(
            &self,
            _namespace: &str,
            resource: &str,
        ) -> Result<Vec<String>, ClientError> {
            Ok(vec![format!("{}-1 (Running)", resource)])
        }

        async fn list_subresources(
            &self,
            _namespace: &str,
            resource: &str,
            instance: Option<&str>,
        ) -> Result<Subresources, ClientError> {
            Ok(Subresources {
                instance: instance.map(str::to_string).unwrap_or(format!("{}-1", resource)),
                names: vec!["app".into()],
            })
        }

        async fn list_nested_folders(
            &self,
            _namespace: &str,
            _instance: &str,
            _subresource: &str,
            _base_path: &str,
        ) -> Result<Vec<String>, ClientError> {
            Err(ClientError::NotFound("/app/assets".into()))
        }

        async fn fetch_log(&self, target: &LogTarget, tail: i64) -> Result<String, ClientError> {
            Ok(format!("{} tail {}", target.pod, tail))
        }

        fn stream_log(&self, target: &LogTarget, _tail: i64) -> LogStream {
            let (sender, stream) = LogStream::channel(8);
            let pod = target.pod.clone();
            tokio::spawn(async move {
                for i in 0..2 {
                    sender.send(Ok(format!("{} line {}", pod, i))).await;
                }
            });
            stream
        }

        async fn invoke_action(&self, invocation: &Invocation) -> Result<ActionOutcome, ClientError> {
            Ok(ActionOutcome::Text(format!("ran {}", invocation.action.name)))
        }
    }

    fn connected() -> (Runtime<FakeClient>, Channels<FakeClient>) {
        let client = FakeClient {
            kubeconfig: "main".into(),
        };
        Runtime::new(Some(client), std::env::temp_dir())
    }

    async fn next_message(
        runtime: &mut Runtime<FakeClient>,
        channels: &mut Channels<FakeClient>,
    ) -> Message {
        let reply = channels.replies.recv().await.expect("runtime dropped");
        runtime.receive(reply)
    }

    fn target() -> LogTarget {
        LogTarget {
            namespace: "default".into(),
            pod: "web-1".into(),
            container: Some("app".into()),
        }
    }

    #[tokio::test]
    async fn test_load_replies_with_its_message() {
        let (mut runtime, mut channels) = connected();
        runtime.dispatch(Effect::LoadResources {
            namespace: "prod".into(),
        });

        match next_message(&mut runtime, &mut channels).await {
            Message::ResourcesLoaded { namespace, result } => {
                assert_eq!(namespace, "prod");
                assert_eq!(result, Ok(vec!["prod-web".to_string()]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pod_scoped_replies_name_their_request() {
        let (mut runtime, mut channels) = connected();
        runtime.dispatch(Effect::LoadSubresources {
            namespace: "default".into(),
            resource: "web".into(),
            instance: Some("web-2".into()),
        });
        match next_message(&mut runtime, &mut channels).await {
            Message::SubresourcesLoaded {
                resource,
                instance,
                result,
            } => {
                assert_eq!(resource, "web");
                assert_eq!(instance.as_deref(), Some("web-2"));
                assert_eq!(result.map(|found| found.instance), Ok("web-2".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }

        runtime.dispatch(Effect::LoadFolders {
            namespace: "default".into(),
            instance: "web-2".into(),
            subresource: "app".into(),
            base_path: "/app/assets",
        });
        match next_message(&mut runtime, &mut channels).await {
            Message::FoldersLoaded {
                instance,
                subresource,
                result: Err(ClientError::NotFound(_)),
            } => {
                assert_eq!(instance, "web-2");
                assert_eq!(subresource, "app");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_work_without_client_fails_fast() {
        let (mut runtime, mut channels) = Runtime::<FakeClient>::new(None, std::env::temp_dir());
        runtime.dispatch(Effect::LoadNamespaces);

        match next_message(&mut runtime, &mut channels).await {
            Message::NamespacesLoaded(Err(ClientError::Transport(_))) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_is_swapped_on_receive() {
        let (mut runtime, mut channels) = Runtime::<FakeClient>::new(None, std::env::temp_dir());
        runtime.dispatch(Effect::Connect {
            path: "staging".into(),
        });

        let reply = channels.replies.recv().await.expect("runtime dropped");
        assert!(runtime.client().is_none());
        match runtime.receive(reply) {
            Message::Connected { path, result } => {
                assert_eq!(path, "staging");
                assert_eq!(result, Ok(()));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(runtime.client().map(|c| c.kubeconfig.as_str()), Some("staging"));

        runtime.dispatch(Effect::LoadNamespaces);
        match next_message(&mut runtime, &mut channels).await {
            Message::NamespacesLoaded(Ok(names)) => assert_eq!(names, vec!["default", "staging"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_client() {
        let (mut runtime, mut channels) = connected();
        runtime.dispatch(Effect::Connect {
            path: "broken".into(),
        });

        match next_message(&mut runtime, &mut channels).await {
            Message::Connected { result: Err(_), .. } => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(runtime.client().map(|c| c.kubeconfig.as_str()), Some("main"));
    }

    #[tokio::test]
    async fn test_execute_and_fetch() {
        let (mut runtime, mut channels) = connected();
        let Some(action) = ActionSpec::find("describe") else {
            panic!("describe missing from catalog");
        };
        runtime.dispatch(Effect::Execute(Invocation {
            action,
            namespace: "default".into(),
            resource: "web".into(),
            instance: None,
            subresource: None,
            folder: None,
            input: None,
        }));
        match next_message(&mut runtime, &mut channels).await {
            Message::ExecutionFinished(Ok(ActionOutcome::Text(text))) => {
                assert_eq!(text, "ran describe")
            }
            other => panic!("unexpected {:?}", other),
        }

        runtime.dispatch(Effect::FetchLogs {
            target: target(),
            tail: 500,
        });
        match next_message(&mut runtime, &mut channels).await {
            Message::LogsFetched(Ok(text)) => assert_eq!(text, "web-1 tail 500"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_events_carry_stream_id() {
        let (mut runtime, mut channels) = connected();
        runtime.dispatch(Effect::StartLogStream {
            target: target(),
            tail: 100,
            stream: 7,
        });

        let mut kinds = Vec::new();
        while let Some(event) = channels.streams.recv().await {
            assert_eq!(event.stream, 7);
            let ended = matches!(event.kind, StreamEventKind::Ended(_));
            kinds.push(event.kind);
            if ended {
                break;
            }
        }
        assert_eq!(
            kinds,
            vec![
                StreamEventKind::Line("web-1 line 0".into()),
                StreamEventKind::Line("web-1 line 1".into()),
                StreamEventKind::Ended(None),
            ]
        );
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut runtime, mut channels) =
            Runtime::<FakeClient>::new(None, dir.path().to_path_buf());
        runtime.dispatch(Effect::ExportLogs {
            pod: "web-1".into(),
            lines: vec!["first".into(), "second".into()],
        });

        let path = match next_message(&mut runtime, &mut channels).await {
            Message::LogsExported(Ok(path)) => PathBuf::from(path),
            other => panic!("unexpected {:?}", other),
        };
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("web-1_"));
        assert!(name.ends_with(".log"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_export_file_name() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap();
        assert_eq!(export_file_name("api-7f9c", at), "api-7f9c_20240309_140507.log");
    }
}
