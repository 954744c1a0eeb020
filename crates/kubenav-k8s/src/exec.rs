//! Commands run inside containers through the exec subresource

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::AttachParams;
use tokio::io::{AsyncRead, AsyncReadExt};

use kubenav_types::ClientError;

use crate::client::classify;

/// Shells probed in order when opening an interactive session
pub const SHELL_CANDIDATES: &[&str] = &["/bin/bash", "/bin/sh", "/bin/ash", "sh", "ash"];

/// Raw bytes per upload chunk; base64 inflates this by a third
const UPLOAD_CHUNK: usize = 48 * 1024;

/// Captured result of a finished command
#[derive(Debug, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Run a command in a container and collect its output
pub async fn run(
    api: &Api<Pod>,
    pod: &str,
    container: Option<&str>,
    command: Vec<String>,
) -> Result<ExecOutput, ClientError> {
    let mut params = AttachParams::default()
        .stdin(false)
        .stdout(true)
        .stderr(true);
    if let Some(container) = container {
        params = params.container(container);
    }

    let mut attached = api.exec(pod, command, &params).await.map_err(classify)?;
    let stdout = attached.stdout();
    let stderr = attached.stderr();
    let status = attached.take_status();

    let (stdout, stderr) = tokio::join!(read_all(stdout), read_all(stderr));
    let status = match status {
        Some(status) => status.await,
        None => None,
    };
    attached
        .join()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    let success = status
        .as_ref()
        .and_then(|s| s.status.as_deref())
        .is_some_and(|s| s == "Success");

    Ok(ExecOutput {
        stdout,
        stderr,
        success,
    })
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(&mut buf).await {
            tracing::debug!("exec output read failed: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn sh(script: String) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script]
}

/// Quote a value for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// First shell from [`SHELL_CANDIDATES`] that starts in the container
pub async fn detect_shell(api: &Api<Pod>, pod: &str, container: &str) -> Result<String, ClientError> {
    for shell in SHELL_CANDIDATES {
        let command = vec![shell.to_string(), "-c".to_string(), "exit 0".to_string()];
        match run(api, pod, Some(container), command).await {
            Ok(output) if output.success => return Ok(shell.to_string()),
            Ok(_) => {}
            Err(e) => tracing::debug!("shell probe {} failed: {}", shell, e),
        }
    }
    Err(ClientError::Other(format!(
        "no shell available in container {}",
        container
    )))
}

/// Names of the directories directly under `base_path`
pub async fn list_directories(
    api: &Api<Pod>,
    pod: &str,
    container: &str,
    base_path: &str,
) -> Result<Vec<String>, ClientError> {
    let path = shell_quote(base_path);
    let script = format!(
        "find {path} -mindepth 1 -maxdepth 1 -type d 2>/dev/null | xargs -n1 basename 2>/dev/null \
         || ls -d {path}/*/ 2>/dev/null | xargs -n1 basename"
    );
    let output = run(api, pod, Some(container), sh(script)).await?;
    if !output.success && output.stdout.trim().is_empty() {
        return Err(ClientError::NotFound(format!(
            "cannot list {}: {}",
            base_path,
            output.stderr.trim()
        )));
    }
    Ok(parse_directory_listing(&output.stdout))
}

fn parse_directory_listing(stdout: &str) -> Vec<String> {
    let mut names: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Remove everything inside `path`, creating it when missing
pub async fn clear_directory(
    api: &Api<Pod>,
    pod: &str,
    container: &str,
    path: &str,
) -> Result<(), ClientError> {
    let quoted = shell_quote(path);
    let script = format!("mkdir -p {quoted} && cd {quoted} && rm -rf -- * .[!.]* ..?*");
    let output = run(api, pod, Some(container), sh(script)).await?;
    if !output.success {
        return Err(ClientError::Other(format!(
            "failed to clear {}: {}",
            path,
            output.stderr.trim()
        )));
    }
    Ok(())
}

/// Copy every file under `local_root` into `remote_root`, returning the file count
pub async fn upload_directory(
    api: &Api<Pod>,
    pod: &str,
    container: &str,
    local_root: &Path,
    remote_root: &str,
) -> Result<usize, ClientError> {
    let files = collect_files(local_root).map_err(|e| ClientError::Io(e.to_string()))?;

    for file in &files {
        let relative = file
            .strip_prefix(local_root)
            .map_err(|e| ClientError::Io(e.to_string()))?;
        let remote = remote_path(remote_root, relative);
        let contents = tokio::fs::read(file)
            .await
            .map_err(|e| ClientError::Io(format!("{}: {}", file.display(), e)))?;
        upload_file(api, pod, container, &remote, &contents).await?;
    }

    Ok(files.len())
}

async fn upload_file(
    api: &Api<Pod>,
    pod: &str,
    container: &str,
    remote: &str,
    contents: &[u8],
) -> Result<(), ClientError> {
    let target = shell_quote(remote);
    let parent = match remote.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => "/",
    };
    let prepare = format!("mkdir -p {} && : > {}", shell_quote(parent), target);
    let output = run(api, pod, Some(container), sh(prepare)).await?;
    if !output.success {
        return Err(ClientError::Other(format!(
            "failed to create {}: {}",
            remote,
            output.stderr.trim()
        )));
    }

    for chunk in contents.chunks(UPLOAD_CHUNK) {
        let encoded = STANDARD.encode(chunk);
        let script = format!("printf '%s' '{}' | base64 -d >> {}", encoded, target);
        let output = run(api, pod, Some(container), sh(script)).await?;
        if !output.success {
            return Err(ClientError::Other(format!(
                "failed to write {}: {}",
                remote,
                output.stderr.trim()
            )));
        }
    }
    Ok(())
}

fn remote_path(remote_root: &str, relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("{}/{}", remote_root.trim_end_matches('/'), parts.join("/"))
}

/// Regular files below `root`, depth first, sorted per directory
pub fn collect_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries: Vec<_> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        entries.sort();
        for path in entries {
            if path.is_dir() {
                pending.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
