//! Kubernetes implementation of [`ResourceClient`]

use std::collections::{BTreeMap, BTreeSet};

use futures::{AsyncBufReadExt, TryStreamExt};
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::Api;
use kube::api::{ListParams, LogParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use serde_json::json;

use kubenav_types::{
    ActionInput, ActionOp, ActionOutcome, ClientError, Invocation, LogTarget, pod_display,
    pod_name,
};

use crate::exec;
use crate::kubeconfig::{discover_kubeconfigs, expand_home};
use crate::resource::{ResourceClient, Subresources};
use crate::stream::LogStream;

const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

/// Lines buffered between the log reader task and its consumer
const LOG_LINE_BUFFER: usize = 256;

/// Map a kube error onto the client error taxonomy
pub(crate) fn classify(err: kube::Error) -> ClientError {
    match &err {
        kube::Error::Api(resp) => match resp.code {
            404 => ClientError::NotFound(resp.message.clone()),
            401 | 403 => ClientError::Permission(resp.message.clone()),
            400 | 409 | 422 => ClientError::InvalidInput(resp.message.clone()),
            _ => ClientError::Other(resp.message.clone()),
        },
        kube::Error::HyperError(_) | kube::Error::Service(_) => {
            ClientError::Transport(err.to_string())
        }
        kube::Error::Auth(_) => ClientError::Permission(err.to_string()),
        _ => ClientError::Other(err.to_string()),
    }
}

fn require<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, ClientError> {
    value
        .as_deref()
        .ok_or_else(|| ClientError::InvalidInput(format!("no {} selected", what)))
}

/// Kubernetes client bound to one kubeconfig
#[derive(Clone)]
pub struct KubeClient {
    client: kube::Client,
    kubeconfig: String,
}

impl KubeClient {
    /// Path of the kubeconfig this client was built from
    pub fn kubeconfig(&self) -> &str {
        &self.kubeconfig
    }

    async fn connect_path(path: &str) -> Result<Self, ClientError> {
        let resolved = expand_home(path);
        let kubeconfig = Kubeconfig::read_from(&resolved).map_err(|e| {
            ClientError::InvalidInput(format!(
                "failed to read kubeconfig {}: {}",
                resolved.display(),
                e
            ))
        })?;

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                ClientError::InvalidInput(format!("invalid kubeconfig {}: {}", resolved.display(), e))
            })?;

        let client = kube::Client::try_from(config).map_err(classify)?;

        // Fail fast on unreachable clusters instead of on the first listing
        client.apiserver_version().await.map_err(classify)?;

        tracing::debug!("connected using {}", resolved.display());
        Ok(Self {
            client,
            kubeconfig: resolved.display().to_string(),
        })
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Label selector string for a deployment's pods
    async fn pod_selector(&self, namespace: &str, deployment: &str) -> Result<String, ClientError> {
        let deploy = self.deployments(namespace).get(deployment).await.map_err(classify)?;
        let labels = deploy
            .spec
            .and_then(|s| s.selector.match_labels)
            .unwrap_or_default();
        Ok(labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(","))
    }

    async fn pods_for_deployment(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<Vec<Pod>, ClientError> {
        let selector = self.pod_selector(namespace, deployment).await?;
        let list = self
            .pods(namespace)
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(classify)?;
        let mut pods = list.items;
        pods.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(pods)
    }

    async fn first_pod(&self, namespace: &str, deployment: &str) -> Result<String, ClientError> {
        self.pods_for_deployment(namespace, deployment)
            .await?
            .into_iter()
            .find_map(|p| p.metadata.name)
            .ok_or_else(|| {
                ClientError::NotFound(format!("no pods found for deployment {}", deployment))
            })
    }

    async fn scale(&self, namespace: &str, name: &str, replicas: i32) -> Result<String, ClientError> {
        let patch = json!({ "spec": { "replicas": replicas } });
        self.deployments(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(classify)?;
        Ok(format!("Scaled {} to {} replicas", name, replicas))
    }

    async fn patch_container(
        &self,
        namespace: &str,
        name: &str,
        container: serde_json::Value,
    ) -> Result<(), ClientError> {
        let patch = json!({ "spec": { "template": { "spec": { "containers": [container] } } } });
        self.deployments(namespace)
            .patch(name, &PatchParams::default(), &Patch::Strategic(&patch))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn list_env(&self, namespace: &str, name: &str, container: &str) -> Result<String, ClientError> {
        let deploy = self.deployments(namespace).get(name).await.map_err(classify)?;
        let spec = deploy
            .spec
            .and_then(|s| s.template.spec)
            .and_then(|s| s.containers.into_iter().find(|c| c.name == container))
            .ok_or_else(|| ClientError::NotFound(format!("container {} not found", container)))?;

        let env = spec.env.unwrap_or_default();
        if env.is_empty() {
            return Ok(format!("No environment variables set on {}", container));
        }

        let mut out = format!("Environment variables for {}:\n", container);
        for var in env {
            let value = match (var.value, var.value_from) {
                (Some(v), _) => v,
                (None, Some(from)) if from.secret_key_ref.is_some() => "<from secret>".to_string(),
                (None, Some(from)) if from.config_map_key_ref.is_some() => {
                    "<from configmap>".to_string()
                }
                (None, Some(_)) => "<from field>".to_string(),
                (None, None) => String::new(),
            };
            out.push_str(&format!("  {}={}\n", var.name, value));
        }
        Ok(out)
    }

    async fn list_pods_text(&self, namespace: &str, name: &str) -> Result<String, ClientError> {
        let pods = self.pods_for_deployment(namespace, name).await?;
        if pods.is_empty() {
            return Ok(format!("No pods found for {}", name));
        }

        let mut out = format!("Pods for {}:\n", name);
        for pod in pods {
            let pod_name = pod.metadata.name.unwrap_or_default();
            let status = pod.status.unwrap_or_default();
            let phase = status.phase.unwrap_or_else(|| "Unknown".to_string());
            let statuses = status.container_statuses.unwrap_or_default();
            let ready = statuses.iter().filter(|s| s.ready).count();
            out.push_str(&format!("  {}  {}  {}/{}\n", pod_name, phase, ready, statuses.len()));
        }
        Ok(out)
    }

    /// ReplicaSets owned by a deployment, keyed by revision
    async fn revisions(&self, namespace: &str, name: &str) -> Result<BTreeMap<i64, ReplicaSet>, ClientError> {
        let api: Api<ReplicaSet> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await.map_err(classify)?;

        Ok(list
            .items
            .into_iter()
            .filter(|rs| {
                rs.metadata
                    .owner_references
                    .as_ref()
                    .is_some_and(|owners| owners.iter().any(|o| o.kind == "Deployment" && o.name == name))
            })
            .filter_map(|rs| {
                let revision = rs
                    .metadata
                    .annotations
                    .as_ref()?
                    .get(REVISION_ANNOTATION)?
                    .parse::<i64>()
                    .ok()?;
                Some((revision, rs))
            })
            .collect())
    }

    async fn list_revisions(&self, namespace: &str, name: &str) -> Result<String, ClientError> {
        let revisions = self.revisions(namespace, name).await?;
        if revisions.is_empty() {
            return Ok(format!("No revisions found for {}", name));
        }

        let mut out = format!("Revisions for {}:\n", name);
        for (revision, rs) in revisions.iter().rev() {
            let replicas = rs.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
            let image = rs
                .spec
                .as_ref()
                .and_then(|s| s.template.as_ref())
                .and_then(|t| t.spec.as_ref())
                .and_then(|s| s.containers.first())
                .and_then(|c| c.image.clone())
                .unwrap_or_default();
            out.push_str(&format!("  Revision {}: {} replicas  {}\n", revision, replicas, image));
        }
        Ok(out)
    }

    async fn rollback(&self, namespace: &str, name: &str, revision: i64) -> Result<String, ClientError> {
        let mut revisions = self.revisions(namespace, name).await?;
        let rs = revisions.remove(&revision).ok_or_else(|| {
            ClientError::NotFound(format!("revision {} not found for {}", revision, name))
        })?;

        let mut template = rs
            .spec
            .and_then(|s| s.template)
            .ok_or_else(|| ClientError::Other(format!("revision {} has no pod template", revision)))?;
        if let Some(labels) = template.metadata.as_mut().and_then(|m| m.labels.as_mut()) {
            labels.remove("pod-template-hash");
        }

        let template = serde_json::to_value(&template).map_err(|e| ClientError::Other(e.to_string()))?;
        let patch = json!({ "spec": { "template": template } });
        self.deployments(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(classify)?;
        Ok(format!("Rolled back {} to revision {}", name, revision))
    }

    async fn ingress(&self, namespace: &str, name: &str) -> Result<String, ClientError> {
        let deploy = self.deployments(namespace).get(name).await.map_err(classify)?;
        let pod_labels = deploy
            .spec
            .and_then(|s| s.template.metadata)
            .and_then(|m| m.labels)
            .unwrap_or_default();

        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let matching: BTreeSet<String> = services
            .list(&ListParams::default())
            .await
            .map_err(classify)?
            .items
            .into_iter()
            .filter(|svc| {
                svc.spec
                    .as_ref()
                    .and_then(|s| s.selector.as_ref())
                    .is_some_and(|sel| !sel.is_empty() && sel.iter().all(|(k, v)| pod_labels.get(k) == Some(v)))
            })
            .filter_map(|svc| svc.metadata.name)
            .collect();

        let ingresses: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
        let mut routes = Vec::new();
        for ing in ingresses.list(&ListParams::default()).await.map_err(classify)?.items {
            let ing_name = ing.metadata.name.unwrap_or_default();
            for rule in ing.spec.and_then(|s| s.rules).unwrap_or_default() {
                let host = rule.host.unwrap_or_else(|| "*".to_string());
                for path in rule.http.map(|h| h.paths).unwrap_or_default() {
                    let Some(service) = path.backend.service else {
                        continue;
                    };
                    if !matching.contains(&service.name) {
                        continue;
                    }
                    let port = service
                        .port
                        .and_then(|p| p.number.map(|n| n.to_string()).or(p.name))
                        .unwrap_or_default();
                    routes.push(format!(
                        "  [{}] {}{} -> {}:{}",
                        ing_name,
                        host,
                        path.path.unwrap_or_else(|| "/".to_string()),
                        service.name,
                        port
                    ));
                }
            }
        }

        if routes.is_empty() {
            return Ok(format!("No ingresses found for {}", name));
        }
        Ok(format!("Ingress routes for {}:\n{}\n", name, routes.join("\n")))
    }

    async fn describe(&self, namespace: &str, name: &str) -> Result<String, ClientError> {
        let deploy = self.deployments(namespace).get(name).await.map_err(classify)?;
        let status = deploy.status.unwrap_or_default();
        let spec = deploy.spec.unwrap_or_default();

        let mut out = format!("Name:       {}\nNamespace:  {}\n", name, namespace);
        out.push_str(&format!(
            "Replicas:   {} desired, {} ready, {} available\n",
            spec.replicas.unwrap_or(1),
            status.ready_replicas.unwrap_or(0),
            status.available_replicas.unwrap_or(0)
        ));
        let strategy = spec
            .strategy
            .and_then(|s| s.type_)
            .unwrap_or_else(|| "RollingUpdate".to_string());
        out.push_str(&format!("Strategy:   {}\nContainers:\n", strategy));

        for container in spec.template.spec.map(|s| s.containers).unwrap_or_default() {
            out.push_str(&format!("  - {}\n", container.name));
            out.push_str(&format!("    Image: {}\n", container.image.unwrap_or_default()));
            let ports: Vec<String> = container
                .ports
                .unwrap_or_default()
                .iter()
                .map(|p| {
                    format!(
                        "{}/{}",
                        p.container_port,
                        p.protocol.as_deref().unwrap_or("TCP")
                    )
                })
                .collect();
            if !ports.is_empty() {
                out.push_str(&format!("    Ports: {}\n", ports.join(", ")));
            }
        }
        Ok(out)
    }

    async fn fast_deploy(
        &self,
        invocation: &Invocation,
        local_path: &str,
    ) -> Result<String, ClientError> {
        let pod = pod_name(require(&invocation.instance, "pod")?);
        let container = require(&invocation.subresource, "container")?;
        let folder = require(&invocation.folder, "asset folder")?;
        let base = invocation.action.nested_folder.unwrap_or(kubenav_types::ASSETS_BASE_PATH);

        let local = expand_home(local_path);
        let is_dir = tokio::fs::metadata(&local)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(ClientError::InvalidInput(format!(
                "local path is not a directory: {}",
                local.display()
            )));
        }

        let target = format!("{}/{}", base.trim_end_matches('/'), folder);
        let api = self.pods(&invocation.namespace);
        exec::clear_directory(&api, pod, container, &target).await?;
        let count = exec::upload_directory(&api, pod, container, &local, &target).await?;
        Ok(format!("Successfully deployed {} files to {}", count, target))
    }
}

impl ResourceClient for KubeClient {
    async fn connect(kubeconfig: &str) -> Result<Self, ClientError> {
        Self::connect_path(kubeconfig).await
    }

    async fn list_contexts() -> Result<Vec<String>, ClientError> {
        Ok(discover_kubeconfigs())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClientError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(classify)?;
        let mut names: Vec<String> = list.items.into_iter().filter_map(|ns| ns.metadata.name).collect();
        names.sort();
        Ok(names)
    }

    async fn list_resources(&self, namespace: &str) -> Result<Vec<String>, ClientError> {
        let list = self
            .deployments(namespace)
            .list(&ListParams::default())
            .await
            .map_err(classify)?;
        let mut names: Vec<String> = list.items.into_iter().filter_map(|d| d.metadata.name).collect();
        names.sort();
        Ok(names)
    }

    async fn list_instances(&self, namespace: &str, resource: &str) -> Result<Vec<String>, ClientError> {
        let pods = self.pods_for_deployment(namespace, resource).await?;
        Ok(pods
            .into_iter()
            .filter_map(|pod| {
                let name = pod.metadata.name?;
                let phase = pod
                    .status
                    .and_then(|s| s.phase)
                    .unwrap_or_else(|| "Unknown".to_string());
                Some(pod_display(&name, &phase))
            })
            .collect())
    }

    async fn list_subresources(
        &self,
        namespace: &str,
        resource: &str,
        instance: Option<&str>,
    ) -> Result<Subresources, ClientError> {
        let instance = match instance {
            Some(display) => pod_name(display).to_string(),
            None => self.first_pod(namespace, resource).await?,
        };

        let pod = self.pods(namespace).get(&instance).await.map_err(classify)?;
        let names = pod
            .spec
            .map(|s| s.containers.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        Ok(Subresources { instance, names })
    }

    async fn list_nested_folders(
        &self,
        namespace: &str,
        instance: &str,
        subresource: &str,
        base_path: &str,
    ) -> Result<Vec<String>, ClientError> {
        let api = self.pods(namespace);
        exec::list_directories(&api, pod_name(instance), subresource, base_path).await
    }

    async fn fetch_log(&self, target: &LogTarget, tail: i64) -> Result<String, ClientError> {
        let params = LogParams {
            container: target.container.clone(),
            tail_lines: Some(tail),
            ..Default::default()
        };
        self.pods(&target.namespace)
            .logs(pod_name(&target.pod), &params)
            .await
            .map_err(classify)
    }

    fn stream_log(&self, target: &LogTarget, tail: i64) -> LogStream {
        let (sender, stream) = LogStream::channel(LOG_LINE_BUFFER);
        let api = self.pods(&target.namespace);
        let pod = pod_name(&target.pod).to_string();
        let params = LogParams {
            follow: true,
            container: target.container.clone(),
            tail_lines: Some(tail),
            ..Default::default()
        };

        tokio::spawn(async move {
            let reader = match api.log_stream(&pod, &params).await {
                Ok(reader) => reader,
                Err(e) => {
                    sender.send(Err(classify(e))).await;
                    return;
                }
            };
            let mut lines = reader.lines();

            loop {
                tokio::select! {
                    _ = sender.cancelled() => break,

                    result = lines.try_next() => {
                        match result {
                            Ok(Some(line)) => {
                                if !sender.send(Ok(line)).await {
                                    break;
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                sender.send(Err(ClientError::Io(e.to_string()))).await;
                                break;
                            }
                        }
                    }
                }
            }
            tracing::debug!("log stream for {} finished", pod);
        });

        stream
    }

    async fn invoke_action(&self, invocation: &Invocation) -> Result<ActionOutcome, ClientError> {
        let ns = invocation.namespace.as_str();
        let name = invocation.resource.as_str();
        tracing::debug!("invoking {} on {}/{}", invocation.action.name, ns, name);

        let text = match (invocation.action.op, &invocation.input) {
            (ActionOp::ViewLogs, _) => {
                let target = invocation
                    .log_target()
                    .ok_or_else(|| ClientError::InvalidInput("no pod selected".to_string()))?;
                self.fetch_log(&target, kubenav_types::STATIC_LOG_TAIL).await?
            }
            (ActionOp::FollowLogs, _) => {
                return Err(ClientError::InvalidInput(
                    "followed logs are read through a log stream".to_string(),
                ));
            }
            (ActionOp::Shell, _) => {
                let pod = pod_name(require(&invocation.instance, "pod")?);
                let container = require(&invocation.subresource, "container")?;
                let shell = exec::detect_shell(&self.pods(ns), pod, container).await?;
                return Ok(ActionOutcome::HandOff { detail: Some(shell) });
            }
            (ActionOp::PortForward, Some(ActionInput::Ports { .. })) => {
                require(&invocation.instance, "pod")?;
                return Ok(ActionOutcome::HandOff { detail: None });
            }
            (ActionOp::FastDeploy, Some(ActionInput::LocalPath(path))) => {
                self.fast_deploy(invocation, path).await?
            }
            (ActionOp::Scale, Some(ActionInput::Replicas(replicas))) => {
                self.scale(ns, name, *replicas).await?
            }
            (ActionOp::UpdateImage, Some(ActionInput::Image(image))) => {
                let container = require(&invocation.subresource, "container")?;
                self.patch_container(ns, name, json!({ "name": container, "image": image }))
                    .await?;
                format!("Updated {} image to {}", container, image)
            }
            (ActionOp::Rollback, Some(ActionInput::Revision(revision))) => {
                self.rollback(ns, name, *revision).await?
            }
            (ActionOp::SetEnv, Some(ActionInput::EnvVar { key, value })) => {
                let container = require(&invocation.subresource, "container")?;
                self.patch_container(
                    ns,
                    name,
                    json!({ "name": container, "env": [{ "name": key, "value": value }] }),
                )
                .await?;
                format!("Set {}={} on {}", key, value, container)
            }
            (ActionOp::ListEnv, _) => {
                let container = require(&invocation.subresource, "container")?;
                self.list_env(ns, name, container).await?
            }
            (ActionOp::ListPods, _) => self.list_pods_text(ns, name).await?,
            (ActionOp::ListRevisions, _) => self.list_revisions(ns, name).await?,
            (ActionOp::Ingress, _) => self.ingress(ns, name).await?,
            (ActionOp::Describe, _) => self.describe(ns, name).await?,
            (op, _) => {
                return Err(ClientError::InvalidInput(format!(
                    "missing or invalid input for {}",
                    op
                )));
            }
        };

        Ok(ActionOutcome::Text(text))
    }
}
