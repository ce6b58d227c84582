//! Database service orchestration
//!
//! One SQL Server container per scenario, each with the scenario password as
//! its `sa` password and published on the scenario port. Containers are driven
//! through the `docker` CLI with explicit arguments, never through a shell.

use crate::config::{PreflightConfig, ProbeTarget};
use pwprobe_core::{DatabaseDriver, ProbeError, Result, Scenario};
use std::process::Stdio;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::Instant;

/// Default SQL Server image
pub const DEFAULT_IMAGE: &str = "mcr.microsoft.com/mssql/server:2022-latest";

/// Port SQL Server listens on inside the container
const CONTAINER_PORT: u16 = 1433;

/// Starts and removes the scenario containers
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceLauncher {
    docker: String,
    image: String,
    prefix: String,
}

impl Default for ServiceLauncher {
    fn default() -> Self {
        Self {
            docker: "docker".to_string(),
            image: DEFAULT_IMAGE.to_string(),
            prefix: "pwprobe".to_string(),
        }
    }
}

impl ServiceLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_docker(mut self, docker: impl Into<String>) -> Self {
        self.docker = docker.into();
        self
    }

    pub fn container_name(&self, scenario: &Scenario) -> String {
        format!("{}-{}", self.prefix, scenario.name)
    }

    /// Arguments for `docker run`
    pub fn run_args(&self, scenario: &Scenario) -> Vec<String> {
        vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            self.container_name(scenario),
            "-e".to_string(),
            "ACCEPT_EULA=Y".to_string(),
            "-e".to_string(),
            format!("MSSQL_SA_PASSWORD={}", scenario.password),
            "-p".to_string(),
            format!("{}:{}", scenario.port, CONTAINER_PORT),
            self.image.clone(),
        ]
    }

    /// Arguments for `docker rm -f`
    pub fn remove_args(&self, scenario: &Scenario) -> Vec<String> {
        vec![
            "rm".to_string(),
            "-f".to_string(),
            self.container_name(scenario),
        ]
    }

    /// Start one container per scenario
    pub async fn start(&self, scenarios: &[Scenario]) -> Result<()> {
        for scenario in scenarios {
            tracing::info!(
                scenario = %scenario.name,
                port = scenario.port,
                container = %self.container_name(scenario),
                "starting database container"
            );
            self.docker(&self.run_args(scenario)).await.map_err(|e| {
                ProbeError::ServicesUnavailable(format!(
                    "could not start container for '{}': {}",
                    scenario.name, e
                ))
            })?;
        }
        Ok(())
    }

    /// Remove every scenario container, continuing past failures
    pub async fn stop(&self, scenarios: &[Scenario]) -> Result<()> {
        let mut failed = Vec::new();
        for scenario in scenarios {
            let name = self.container_name(scenario);
            tracing::info!(container = %name, "removing database container");
            if let Err(e) = self.docker(&self.remove_args(scenario)).await {
                tracing::warn!(container = %name, error = %e, "failed to remove container");
                failed.push(name);
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ProbeError::Command(format!(
                "could not remove containers: {}",
                failed.join(", ")
            )))
        }
    }

    async fn docker(&self, args: &[String]) -> Result<()> {
        let output = Command::new(&self.docker)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProbeError::Command(format!("failed to run {}: {}", self.docker, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ProbeError::Command(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

/// Wait until every `(host, port)` endpoint accepts a TCP connection.
///
/// Each endpoint is polled with backoff until the deadline. The first endpoint
/// that never comes up fails the whole check.
pub async fn wait_for_services(
    endpoints: &[(String, u16)],
    config: &PreflightConfig,
) -> Result<()> {
    let connect_timeout = config.connect_timeout;
    for (host, port) in endpoints {
        let (host, port) = (host.as_str(), *port);
        let label = format!("{}:{}", host, port);
        poll_until_ready(&label, config, move || async move {
            match tokio::time::timeout(connect_timeout, TcpStream::connect((host, port))).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("connect timed out after {:?}", connect_timeout)),
            }
        })
        .await?;
    }
    Ok(())
}

/// Wait until every target accepts a login with its structured config.
///
/// SQL Server accepts TCP connections some time before it accepts logins, so
/// this runs after [`wait_for_services`]. Any error is retried until the
/// deadline.
pub async fn wait_for_logins(
    driver: &dyn DatabaseDriver,
    targets: &[ProbeTarget],
    config: &PreflightConfig,
) -> Result<()> {
    for target in targets {
        let login = target.target.structured_config();
        let login = &login;
        let label = format!("{}:{} ({})", login.server, login.port, target.scenario);
        poll_until_ready(&label, config, move || async move {
            driver
                .test_connection(login)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await?;
    }
    Ok(())
}

#[tracing::instrument(skip(config, check))]
async fn poll_until_ready<F, Fut>(
    label: &str,
    config: &PreflightConfig,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<(), String>>,
{
    let deadline = Instant::now() + config.deadline;
    let mut attempt: u32 = 0;

    loop {
        let last_error = match check().await {
            Ok(()) => {
                tracing::debug!(attempts = attempt + 1, "service is ready");
                return Ok(());
            }
            Err(e) => e,
        };

        let delay = config.backoff.calculate_delay(attempt);
        if Instant::now() + delay > deadline {
            return Err(ProbeError::ServicesUnavailable(format!(
                "{} not ready within {:?}: {}",
                label, config.deadline, last_error
            )));
        }

        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %last_error,
            "service not ready, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
