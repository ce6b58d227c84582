//! `pwprobe` command line
//!
//! Probes how database clients handle passwords with special characters.
//! `run` walks the scenario matrix and prints a report, the other commands
//! expose the encoders and parser for ad-hoc checks.

mod commands;
mod logging;

#[cfg(test)]
mod cli_tests;

use clap::{Args, Parser, Subcommand};
use pwprobe_harness::{
    DEFAULT_IMAGE, DEFAULT_MIGRATION_COMMAND, DEFAULT_URL_ENV, HarnessConfig,
    MigrationCommandConfig, PreflightConfig,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "pwprobe", version, about = "Probe password escaping across connection styles")]
pub(crate) struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "PWPROBE_LOG_JSON")]
    pub log_json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run the probe matrix and print the report
    Run(RunArgs),

    /// Show the escaped and encoded forms of a password
    Encode {
        password: String,
    },

    /// Parse a connection string into a structured config (printed as JSON)
    Parse {
        connection_string: String,

        /// Include the password in the output
        #[arg(long)]
        show_password: bool,
    },

    /// Start or remove the scenario database containers
    Services {
        #[command(subcommand)]
        action: ServicesAction,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum ServicesAction {
    /// Start one container per scenario
    Up(ServicesArgs),
    /// Remove the scenario containers
    Down(ServicesArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ServicesArgs {
    /// TOML file with `[[scenario]]` entries instead of the built-in list
    #[arg(long)]
    pub scenarios: Option<PathBuf>,

    /// Container image
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// After `up`, wait until every port accepts connections
    #[arg(long)]
    pub wait: bool,

    /// Seconds to wait with `--wait`
    #[arg(long, default_value_t = 120)]
    pub wait_timeout_secs: u64,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(long, default_value = "sa")]
    pub user: String,

    #[arg(long, default_value = "master")]
    pub database: String,

    /// URL scheme for string artifacts
    #[arg(long, default_value = pwprobe_core::DEFAULT_SCHEME)]
    pub scheme: String,

    /// Pause between consecutive probes
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,

    /// Migration command; the connection string is passed in `--url-env`
    #[arg(long, default_value = DEFAULT_MIGRATION_COMMAND)]
    pub command: String,

    #[arg(long, default_value_t = 30)]
    pub command_timeout_secs: u64,

    /// Environment variable the migration command reads
    #[arg(long, default_value = DEFAULT_URL_ENV)]
    pub url_env: String,

    /// Only run the direct probes
    #[arg(long)]
    pub skip_migration: bool,

    /// Do not wait for the database ports before probing
    #[arg(long)]
    pub skip_preflight: bool,

    #[arg(long, default_value_t = 60)]
    pub preflight_timeout_secs: u64,

    /// TOML file with `[[scenario]]` entries instead of the built-in list
    #[arg(long)]
    pub scenarios: Option<PathBuf>,

    /// Also write the report as Markdown to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Probe this connection string instead of the scenarios
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Run only the named scenario
    #[arg(long, env = "TEST_SCENARIO")]
    pub scenario: Option<String>,
}

impl RunArgs {
    pub fn harness_config(&self) -> pwprobe_core::Result<HarnessConfig> {
        let migration = if self.skip_migration {
            None
        } else {
            Some(
                MigrationCommandConfig::from_command_line(&self.command)?
                    .with_url_env(self.url_env.clone())
                    .with_timeout(Duration::from_secs(self.command_timeout_secs)),
            )
        };
        let preflight = (!self.skip_preflight).then(|| PreflightConfig {
            deadline: Duration::from_secs(self.preflight_timeout_secs),
            ..PreflightConfig::default()
        });

        Ok(HarnessConfig {
            host: self.host.clone(),
            user: self.user.clone(),
            database: self.database.clone(),
            scheme: self.scheme.clone(),
            delay: Duration::from_millis(self.delay_ms),
            migration,
            preflight,
            ..HarnessConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(logging::LoggingConfig::for_verbosity(cli.verbose, cli.log_json))?;

    match cli.command {
        Command::Run(args) => commands::run(args).await,
        Command::Encode { password } => commands::encode(&password),
        Command::Parse {
            connection_string,
            show_password,
        } => commands::parse(&connection_string, show_password),
        Command::Services { action } => commands::services(action).await,
    }
}
