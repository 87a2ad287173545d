//! The `logforge` binary provisions a cluster logging pipeline and injects
//! log-shipping sidecars into workloads that opt in via annotation.
//!
//! This module carries the command-line surface of the operator: the
//! admission webhook server plus the usual version, completion, and
//! configuration helpers.
//!
//! # Examples
//!
//! ```bash
//! # Run the admission webhook with the certificates mounted by the chart
//! logforge serve --tls-cert-file /var/run/certs/tls.crt --tls-key-file /var/run/certs/tls.key
//!
//! # Run against a custom operator namespace
//! logforge serve --namespace logging
//!
//! # Print the default configuration
//! logforge default-config
//! ```

pub mod error;
mod serve;

use std::{io::Write, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use futures::FutureExt;
use logforge_base::CLI_PROGRAM_NAME;
use snafu::ResultExt;
use tokio::runtime::Runtime;

pub use self::error::Error;
use self::serve::ServeCommand;
use crate::{config::Config, shadow};

/// `Cli` is the entry point of the logforge operator binary.
///
/// It parses command-line arguments and dispatches to the appropriate
/// subcommand.
#[derive(Parser)]
#[command(
    name = CLI_PROGRAM_NAME,
    author,
    version,
    long_version = shadow::CLAP_LONG_VERSION,
    about = "Logforge: log-shipping sidecar injection for Kubernetes workloads.",
    long_about = "Logforge provisions a cluster logging pipeline and runs a mutating admission \
                  webhook that attaches a log-shipping sidecar to any pod declaring its log \
                  file locations via annotations. Pods without the annotation, and clusters \
                  without a provisioned pipeline, are always admitted unchanged.",
    color = clap::ColorChoice::Always
)]
pub struct Cli {
    /// The subcommand to execute.
    #[clap(subcommand)]
    commands: Option<Commands>,

    /// Path to the configuration file.
    #[clap(
        long = "config",
        short = 'c',
        env = "LOGFORGE_CONFIG_FILE_PATH",
        help = "Specify a configuration file. Defaults to ~/.config/logforge/config.yaml or \
                LOGFORGE_CONFIG_FILE_PATH env var."
    )]
    config_file: Option<PathBuf>,

    /// Sets the logging level for the application.
    #[clap(
        long = "log-level",
        env = "LOGFORGE_LOG_LEVEL",
        help = "Set the logging level (e.g., info, debug, trace)."
    )]
    log_level: Option<tracing::Level>,
}

/// `Commands` enumerates the available subcommands.
#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Displays client and server version information.
    #[command(about = "Display client and server version information")]
    Version {
        #[clap(long = "client", help = "If true, shows client version only (no server required).")]
        client: bool,
    },

    /// Generates a shell completion script for the specified shell.
    #[command(about = "Generate shell completion script for the specified shell (bash, zsh, fish)")]
    Completions { shell: clap_complete::Shell },

    /// Outputs the default configuration in YAML format to standard output.
    #[command(about = "Output the default configuration in YAML format")]
    DefaultConfig,

    /// Runs the pod admission webhook server.
    #[command(alias = "s", about = "Run the pod admission webhook server")]
    Serve(ServeCommand),
}

impl Default for Cli {
    fn default() -> Self { Self::parse() }
}

impl Cli {
    /// Loads the configuration, applying the `--log-level` override.
    fn load_config(&self) -> Result<Config, Error> {
        let mut config =
            Config::load(self.config_file.clone().unwrap_or_else(Config::search_config_file_path))?;

        if let Some(log_level) = self.log_level {
            config.log.level = log_level;
        }

        Ok(config)
    }

    /// Executes the selected subcommand and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an `Error` if configuration loading, Kubernetes client
    /// initialization, runtime construction, or the subcommand itself fails.
    ///
    /// # Panics
    ///
    /// This method `expect`s on `std::io::stdout().write_all()` operations;
    /// in a CLI environment writing to stdout is expected to succeed.
    pub fn run(self) -> Result<i32, Error> {
        let client_version = Self::command().get_version().unwrap_or_default().to_string();
        match self.commands {
            Some(Commands::Version { client }) if client => {
                std::io::stdout()
                    .write_all(Self::command().render_long_version().as_bytes())
                    .expect("Failed to write to stdout");
                std::io::stdout()
                    .write_all(format!("Client Version: {client_version}\n").as_bytes())
                    .expect("Failed to write to stdout");

                return Ok(0);
            }
            Some(Commands::Completions { shell }) => {
                let mut app = Self::command();
                let bin_name = app.get_name().to_string();
                clap_complete::generate(shell, &mut app, bin_name, &mut std::io::stdout());
                return Ok(0);
            }
            Some(Commands::DefaultConfig) => {
                std::io::stdout()
                    .write_all(Config::template_basic().as_slice())
                    .expect("Failed to write to stdout");
                return Ok(0);
            }
            _ => {}
        }

        let config = self.load_config()?;
        config.log.registry();

        let fut = async move {
            let kube_client = kube::Client::try_default().await.context(error::KubeConfigSnafu)?;
            match self.commands {
                Some(Commands::Version { .. }) => {
                    let server_version = kube_client.apiserver_version().await.map_or_else(
                        |_| "unknown".to_string(),
                        |info| format!("{}.{}", info.major, info.minor),
                    );
                    let info = format!(
                        "Client Version: {client_version}\nServer Version: {server_version}\n",
                    );
                    std::io::stdout()
                        .write_all(Self::command().render_long_version().as_bytes())
                        .expect("Failed to write to stdout");
                    std::io::stdout()
                        .write_all(info.as_bytes())
                        .expect("Failed to write to stdout");

                    return Ok(0);
                }
                Some(Commands::Serve(cmd)) => cmd.run(kube_client, config).boxed().await?,
                _ => {
                    let help = Self::command().render_long_help().ansi().to_string();
                    std::io::stderr()
                        .write_all(help.as_bytes())
                        .expect("Failed to write to stderr");
                    return Ok(-1);
                }
            }

            Ok(0)
        };

        Runtime::new().context(error::InitializeTokioRuntimeSnafu)?.block_on(fut)
    }
}
