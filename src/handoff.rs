//! Commands that take over the terminal once the wizard has exited

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;

use kubenav_types::{ActionInput, ActionOp, HandOff, pod_name};

/// Shell used when detection reported nothing
const FALLBACK_SHELL: &str = "/bin/sh";

/// Arguments for the kubectl invocation that performs `hand_off`
pub fn kubectl_args(hand_off: &HandOff) -> Result<Vec<String>> {
    let pod = hand_off
        .instance
        .as_deref()
        .map(pod_name)
        .context("no pod selected")?;

    let mut args = Vec::new();
    if let Some(kubeconfig) = &hand_off.kubeconfig {
        args.push("--kubeconfig".to_string());
        args.push(kubeconfig.clone());
    }
    args.push("-n".to_string());
    args.push(hand_off.namespace.clone());

    match hand_off.op {
        ActionOp::Shell => {
            args.extend(["exec".to_string(), "-it".to_string(), pod.to_string()]);
            if let Some(container) = &hand_off.subresource {
                args.push("-c".to_string());
                args.push(container.clone());
            }
            let shell = hand_off.detail.as_deref().unwrap_or(FALLBACK_SHELL);
            args.push("--".to_string());
            args.push(shell.to_string());
        }
        ActionOp::PortForward => {
            let Some(ActionInput::Ports { local, remote }) = &hand_off.input else {
                bail!("port-forward needs local:remote ports");
            };
            args.push("port-forward".to_string());
            args.push(format!("pod/{}", pod));
            args.push(format!("{}:{}", local, remote));
        }
        other => bail!("{:?} does not take over the terminal", other),
    }
    Ok(args)
}

/// Run `hand_off` with inherited stdio until it exits
pub async fn run(hand_off: &HandOff) -> Result<()> {
    let args = kubectl_args(hand_off)?;
    tracing::debug!("handing off to kubectl {}", args.join(" "));

    if hand_off.op == ActionOp::PortForward {
        println!(
            "Forwarding {} (Ctrl+C to stop)",
            args.last().map(String::as_str).unwrap_or_default()
        );
    }

    let status = Command::new("kubectl")
        .args(&args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("failed to run kubectl {}", hand_off.action))?;

    if status.success() {
        Ok(())
    } else {
        bail!("kubectl {} exited with {}", hand_off.action, status)
    }
}
