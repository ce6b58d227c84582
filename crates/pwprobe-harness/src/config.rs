//! Harness configuration
//!
//! Everything a run needs is collected into a [`HarnessConfig`] once, at
//! startup, and passed down explicitly. Nothing below this layer reads the
//! process environment.

use crate::backoff::BackoffStrategy;
use pwprobe_core::{
    ConnectionOptions, ConnectionTarget, DEFAULT_SCHEME, ProbeError, Result, Scenario,
    parse_detailed, select_scenario,
};
use std::path::PathBuf;
use std::time::Duration;

/// Default external command: introspect the database without writing a schema file
pub const DEFAULT_MIGRATION_COMMAND: &str = "npx prisma db pull --print";

/// Default environment variable the migration command reads its URL from
pub const DEFAULT_URL_ENV: &str = "DATABASE_URL";

/// Name given to the ad-hoc target built from a connection string override
pub const OVERRIDE_SCENARIO: &str = "database_url";

/// External migration/introspection command settings
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationCommandConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Environment variable that receives the connection string
    pub url_env: String,
    pub timeout: Duration,
    pub working_dir: Option<PathBuf>,
}

impl MigrationCommandConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            url_env: DEFAULT_URL_ENV.to_string(),
            timeout: Duration::from_secs(30),
            working_dir: None,
        }
    }

    /// Build from a shell-style command line such as `npx prisma db pull`
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut words = shlex::split(command_line)
            .ok_or_else(|| {
                ProbeError::Configuration(format!(
                    "unbalanced quotes in command '{}'",
                    command_line
                ))
            })?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| ProbeError::Configuration("migration command is empty".to_string()))?;
        Ok(Self::new(program, words.collect()))
    }

    pub fn with_url_env(mut self, url_env: impl Into<String>) -> Self {
        self.url_env = url_env.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The command as it would be typed, for logs and reports
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|word| {
                shlex::try_quote(word)
                    .map(|quoted| quoted.into_owned())
                    .unwrap_or_else(|_| word.to_string())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for MigrationCommandConfig {
    fn default() -> Self {
        let mut words = DEFAULT_MIGRATION_COMMAND.split_whitespace().map(String::from);
        let program = words.next().unwrap_or_default();
        Self::new(program, words.collect())
    }
}

/// Service readiness check performed before any probe
#[derive(Debug, Clone, PartialEq)]
pub struct PreflightConfig {
    /// Total time to wait for each endpoint
    pub deadline: Duration,
    /// Bound on a single TCP connect attempt
    pub connect_timeout: Duration,
    pub backoff: BackoffStrategy,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(3),
            backoff: BackoffStrategy::default(),
        }
    }
}

/// Configuration for one harness run
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub host: String,
    pub user: String,
    pub database: String,
    pub scheme: String,
    pub options: ConnectionOptions,
    /// Pause between consecutive probes
    pub delay: Duration,
    /// `None` skips the migration probes
    pub migration: Option<MigrationCommandConfig>,
    /// `None` skips the readiness check
    pub preflight: Option<PreflightConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "sa".to_string(),
            database: "master".to_string(),
            scheme: DEFAULT_SCHEME.to_string(),
            options: ConnectionOptions::default(),
            delay: Duration::from_secs(2),
            migration: Some(MigrationCommandConfig::default()),
            preflight: Some(PreflightConfig::default()),
        }
    }
}

/// A scenario resolved against the harness config
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTarget {
    pub scenario: String,
    pub target: ConnectionTarget,
}

impl HarnessConfig {
    /// Resolve a scenario into a concrete login
    pub fn target_for(&self, scenario: &Scenario) -> ProbeTarget {
        ProbeTarget {
            scenario: scenario.name.clone(),
            target: ConnectionTarget::new(
                self.host.clone(),
                scenario.port,
                self.user.clone(),
                scenario.password.clone(),
                self.database.clone(),
            )
            .with_scheme(self.scheme.clone())
            .with_options(self.options),
        }
    }

    /// Decide what to probe.
    ///
    /// A connection string override wins and yields a single target. Otherwise
    /// `selector` picks one scenario by name, and without it every scenario runs.
    pub fn plan(
        &self,
        override_url: Option<&str>,
        selector: Option<&str>,
        scenarios: &[Scenario],
    ) -> Result<Vec<ProbeTarget>> {
        if let Some(url) = override_url.filter(|url| !url.trim().is_empty()) {
            let parsed = parse_detailed(url)?;
            let scheme = parsed.scheme.unwrap_or_else(|| self.scheme.clone());
            tracing::info!(
                server = %parsed.config.server,
                port = parsed.config.port,
                style = %parsed.style,
                "using connection string override"
            );
            return Ok(vec![ProbeTarget {
                scenario: OVERRIDE_SCENARIO.to_string(),
                target: ConnectionTarget::from_config(&parsed.config, scheme),
            }]);
        }

        if let Some(name) = selector.filter(|name| !name.trim().is_empty()) {
            let scenario = select_scenario(scenarios, name)?;
            tracing::info!(scenario = %scenario.name, "running selected scenario");
            return Ok(vec![self.target_for(&scenario)]);
        }

        Ok(scenarios.iter().map(|s| self.target_for(s)).collect())
    }
}
