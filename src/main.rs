use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kubenav_k8s::{KubeClient, ResourceClient, default_kubeconfig_path};
use kubenav_tui::{Event, EventHandler, Message, Theme, Tui, Wizard, WizardOptions, WizardScreen};

mod cli;
mod commands;
mod config;
mod handoff;
mod runtime;

use cli::Args;
use config::{APP_DIR, FilePreferences};
use runtime::Runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.command.is_none());

    let result = match args.command.clone() {
        Some(command) => commands::run(&args, command).await,
        None => run_wizard(args).await,
    };

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Log to `~/.kubenav/kubenav.log` while the terminal belongs to the UI,
/// and to stderr for one-shot subcommands
fn init_tracing(interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if !interactive {
        builder.with_writer(std::io::stderr).init();
        return;
    }
    match open_log_file() {
        Some(file) => builder.with_writer(Mutex::new(file)).with_ansi(false).init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

fn open_log_file() -> Option<File> {
    let dir = dirs::home_dir()?.join(APP_DIR);
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("kubenav.log"))
        .ok()
}

/// Connect with the first kubeconfig we know of. Failure is not fatal: the
/// wizard starts at kubeconfig selection instead.
async fn startup_client(kubeconfig: Option<&str>) -> (Option<KubeClient>, Option<String>) {
    let Some(path) = kubeconfig else {
        return (None, Some("no kubeconfig found".to_string()));
    };
    match KubeClient::connect(path).await {
        Ok(client) => (Some(client), None),
        Err(e) => {
            tracing::warn!("startup connect with {} failed: {}", path, e);
            (None, Some(e.to_string()))
        }
    }
}

async fn run_wizard(args: Args) -> Result<()> {
    let prefs = FilePreferences::load().context("failed to load preferences")?;

    let kubeconfig = args
        .kubeconfig
        .clone()
        .or_else(|| prefs.kubeconfig().map(str::to_string))
        .or_else(|| default_kubeconfig_path().map(|p| p.display().to_string()));
    let (client, startup_error) = startup_client(kubeconfig.as_deref()).await;

    let options = WizardOptions {
        kubeconfig,
        connected: client.is_some(),
        namespace: args.namespace,
        resource: args.deployment,
        instance: args.pod,
        subresource: args.container,
        startup_error,
    };

    let export_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let (mut runtime, mut channels) = Runtime::new(client, export_dir);
    let mut wizard = Wizard::new(prefs, options);
    let theme = Theme::default();

    let mut tui = Tui::new().context("failed to set up terminal")?;
    let mut events = EventHandler::new(Duration::from_millis(100));

    let size = tui.terminal().size()?;
    wizard.set_size(size.width, size.height);
    runtime.dispatch_all(wizard.start());

    loop {
        tui.terminal()
            .draw(|frame| WizardScreen::render(frame, &wizard, &theme))?;

        let effects = tokio::select! {
            Some(event) = events.next() => match event {
                Event::Key(key) => wizard.handle_key(&key),
                Event::Tick => {
                    wizard.tick();
                    Vec::new()
                }
                Event::Resize(width, height) => {
                    wizard.set_size(width, height);
                    Vec::new()
                }
                Event::Error(e) => {
                    tracing::warn!("terminal event error: {}", e);
                    Vec::new()
                }
            },

            Some(reply) = channels.replies.recv() => {
                let message = runtime.receive(reply);
                wizard.handle_message(message)
            }

            Some(event) = channels.streams.recv() => {
                wizard.handle_message(Message::Stream(event))
            }

            else => break,
        };

        runtime.dispatch_all(effects);
        if wizard.should_quit() {
            break;
        }
    }

    runtime.shutdown();
    events.shutdown();
    tui.restore()?;

    let active_kubeconfig = runtime.client().map(|c| c.kubeconfig().to_string());
    if let Some(mut hand_off) = wizard.finish()? {
        if let Some(path) = active_kubeconfig {
            hand_off.kubeconfig = Some(path);
        }
        handoff::run(&hand_off).await?;
    }
    Ok(())
}
