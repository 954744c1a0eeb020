//! Non-interactive subcommands

use anyhow::{Context, Result, bail};

use kubenav_k8s::{KubeClient, ResourceClient, default_kubeconfig_path};
use kubenav_types::{
    ActionInput, ActionOp, ActionOutcome, ActionSpec, HandOff, Invocation, LogTarget,
};

use crate::cli::{Args, Command};
use crate::handoff;

fn need<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("--{} is required", flag),
    }
}

/// Check every flag `command` depends on before touching the cluster
pub fn validate(args: &Args, command: &Command) -> Result<()> {
    need(&args.namespace, "namespace")?;
    match command {
        Command::Logs { .. } | Command::Shell { .. } => {
            need(&args.pod, "pod")?;
            need(&args.container, "container")?;
        }
        Command::PortForward { .. } => {
            need(&args.pod, "pod")?;
        }
        Command::Scale { .. } => {
            need(&args.deployment, "deployment")?;
        }
        Command::UpdateImage { image } => {
            need(&args.deployment, "deployment")?;
            need(&args.container, "container")?;
            if image.trim().is_empty() {
                bail!("--image must not be empty");
            }
        }
    }
    Ok(())
}

fn kubeconfig(args: &Args) -> Result<String> {
    args.kubeconfig
        .clone()
        .or_else(|| default_kubeconfig_path().map(|p| p.display().to_string()))
        .context("no kubeconfig found; pass --kubeconfig")
}

fn invocation(args: &Args, name: &str, input: ActionInput) -> Result<Invocation> {
    let action = ActionSpec::find(name).with_context(|| format!("unknown action {}", name))?;
    Ok(Invocation {
        action,
        namespace: need(&args.namespace, "namespace")?.to_string(),
        resource: need(&args.deployment, "deployment")?.to_string(),
        instance: args.pod.clone(),
        subresource: args.container.clone(),
        folder: None,
        input: Some(input),
    })
}

fn terminal_hand_off(args: &Args, op: ActionOp, action: &str, kubeconfig: String) -> HandOff {
    HandOff {
        op,
        action: action.to_string(),
        kubeconfig: Some(kubeconfig),
        namespace: args.namespace.clone().unwrap_or_default(),
        resource: args.deployment.clone().unwrap_or_default(),
        instance: args.pod.clone(),
        subresource: args.container.clone(),
        input: None,
        detail: None,
    }
}

/// Run a subcommand to completion
pub async fn run(args: &Args, command: Command) -> Result<()> {
    validate(args, &command)?;
    let kubeconfig = kubeconfig(args)?;

    match command {
        Command::Shell { shell } => {
            let mut hand_off = terminal_hand_off(args, ActionOp::Shell, "shell", kubeconfig);
            hand_off.detail = Some(shell);
            handoff::run(&hand_off).await
        }
        Command::PortForward { local, remote } => {
            let mut hand_off =
                terminal_hand_off(args, ActionOp::PortForward, "port-forward", kubeconfig);
            hand_off.input = Some(ActionInput::Ports { local, remote });
            handoff::run(&hand_off).await
        }
        Command::Logs { follow, tail } => {
            let client = connect(&kubeconfig).await?;
            let target = LogTarget {
                namespace: need(&args.namespace, "namespace")?.to_string(),
                pod: need(&args.pod, "pod")?.to_string(),
                container: args.container.clone(),
            };
            if follow {
                follow_logs(&client, &target, tail).await
            } else {
                let text = client.fetch_log(&target, tail).await?;
                print!("{}", text);
                Ok(())
            }
        }
        Command::Scale { replicas } => {
            if replicas < 0 {
                bail!("invalid replica count: {}", replicas);
            }
            let client = connect(&kubeconfig).await?;
            let invocation = invocation(args, "scale", ActionInput::Replicas(replicas))?;
            print_outcome(client.invoke_action(&invocation).await?);
            Ok(())
        }
        Command::UpdateImage { image } => {
            let client = connect(&kubeconfig).await?;
            let invocation =
                invocation(args, "update-image", ActionInput::Image(image.trim().to_string()))?;
            print_outcome(client.invoke_action(&invocation).await?);
            Ok(())
        }
    }
}

async fn connect(kubeconfig: &str) -> Result<KubeClient> {
    KubeClient::connect(kubeconfig)
        .await
        .with_context(|| format!("failed to connect with {}", kubeconfig))
}

async fn follow_logs(client: &KubeClient, target: &LogTarget, tail: i64) -> Result<()> {
    let mut stream = client.stream_log(target, tail);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                stream.cancel();
                return Ok(());
            }
            next = stream.next_line() => match next {
                Some(Ok(line)) => println!("{}", line),
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            }
        }
    }
}

fn print_outcome(outcome: ActionOutcome) {
    if let ActionOutcome::Text(text) = outcome {
        println!("{}", text);
    }
}
