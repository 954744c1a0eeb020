use clap::{Parser, Subcommand};

/// kubenav - An interactive terminal wizard for everyday Kubernetes deployment tasks
#[derive(Parser, Debug)]
#[command(name = "kubenav")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Kubernetes namespace (overrides the last used one)
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Deployment name; the wizard starts at action selection
    #[arg(short, long, global = true)]
    pub deployment: Option<String>,

    /// Pod used by actions that need one
    #[arg(short, long, global = true)]
    pub pod: Option<String>,

    /// Container used by actions that need one
    #[arg(short, long, global = true)]
    pub container: Option<String>,

    /// Kubeconfig file to connect with
    #[arg(long, global = true, value_name = "PATH")]
    pub kubeconfig: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// View container logs
    Logs {
        /// Follow log output
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short, long, default_value_t = 100)]
        tail: i64,
    },

    /// Open shell in container
    Shell {
        /// Shell to use
        #[arg(short, long, default_value = "/bin/sh")]
        shell: String,
    },

    /// Scale deployment
    Scale {
        /// Number of replicas
        #[arg(short, long)]
        replicas: i32,
    },

    /// Forward port to pod
    PortForward {
        /// Local port
        #[arg(short, long, default_value_t = 8080)]
        local: u16,

        /// Remote port
        #[arg(short, long, default_value_t = 80)]
        remote: u16,
    },

    /// Update container image
    UpdateImage {
        /// New image
        #[arg(short, long)]
        image: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let args = Args::parse_from(["kubenav", "-n", "prod", "-d", "api", "scale", "-r", "3"]);
        assert_eq!(args.namespace.as_deref(), Some("prod"));
        assert_eq!(args.deployment.as_deref(), Some("api"));
        assert_eq!(args.command, Some(Command::Scale { replicas: 3 }));
    }

    #[test]
    fn test_interactive_without_subcommand() {
        let args = Args::parse_from(["kubenav", "--kubeconfig", "~/.kube/dev"]);
        assert!(args.command.is_none());
        assert_eq!(args.kubeconfig.as_deref(), Some("~/.kube/dev"));
    }

    #[test]
    fn test_required_subcommand_flags() {
        assert!(Args::try_parse_from(["kubenav", "update-image"]).is_err());
        assert!(Args::try_parse_from(["kubenav", "scale"]).is_err());
    }

    #[test]
    fn test_logs_defaults() {
        let args = Args::parse_from(["kubenav", "logs", "-f"]);
        assert_eq!(args.command, Some(Command::Logs { follow: true, tail: 100 }));
    }
}
