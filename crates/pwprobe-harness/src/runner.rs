//! Sequential scenario runner
//!
//! Walks every target through the probe matrix one probe at a time. A probe
//! never propagates its error: the message is captured in the outcome and
//! the runner moves on to the next probe after the configured delay.

use crate::config::{HarnessConfig, ProbeTarget};
use crate::external::MigrationRunner;
use crate::probe::{ProbeKind, ProbeMode, ProbeOutcome};
use crate::report::RunReport;
use pwprobe_core::{ConnectionStyle, DatabaseDriver, ProbeError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs the probe matrix against a list of targets
pub struct ScenarioRunner {
    driver: Arc<dyn DatabaseDriver>,
    migration: Option<MigrationRunner>,
    delay: Duration,
}

impl ScenarioRunner {
    pub fn new(driver: Arc<dyn DatabaseDriver>, delay: Duration) -> Self {
        Self {
            driver,
            migration: None,
            delay,
        }
    }

    pub fn with_migration(mut self, migration: MigrationRunner) -> Self {
        self.migration = Some(migration);
        self
    }

    /// Build a runner from the harness configuration
    pub fn from_config(driver: Arc<dyn DatabaseDriver>, config: &HarnessConfig) -> Self {
        let runner = Self::new(driver, config.delay);
        match &config.migration {
            Some(command) => runner.with_migration(MigrationRunner::new(command.clone())),
            None => runner,
        }
    }

    /// Modes this runner will probe, in order
    pub fn modes(&self) -> Vec<ProbeMode> {
        ProbeMode::matrix(self.migration.is_some())
    }

    /// Run every target through every mode, strictly one probe at a time
    pub async fn run(&self, targets: &[ProbeTarget]) -> RunReport {
        let modes = self.modes();
        let mut report = RunReport::new();

        tracing::info!(
            targets = targets.len(),
            modes = modes.len(),
            driver = self.driver.id(),
            "starting probe run"
        );

        for target in targets {
            for mode in &modes {
                if !report.is_empty() && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                report.push(self.probe(target, *mode).await);
            }
        }

        tracing::info!(
            passed = report.passed_count(),
            total = report.len(),
            "probe run finished"
        );
        report
    }

    /// Run a single probe and record its outcome
    #[tracing::instrument(skip(self, target, mode), fields(scenario = %target.scenario, mode = %mode))]
    pub async fn probe(&self, target: &ProbeTarget, mode: ProbeMode) -> ProbeOutcome {
        let started = Instant::now();
        let result = match mode.kind {
            ProbeKind::Direct => self.probe_direct(target, mode.style).await,
            ProbeKind::Migration => self.probe_migration(target, mode.style).await,
        };
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                tracing::info!(?elapsed, "probe passed");
                ProbeOutcome::passed(&target.scenario, mode, elapsed)
            }
            Err(e) => {
                tracing::warn!(?elapsed, error = %e, "probe failed");
                ProbeOutcome::failed(&target.scenario, mode, e.to_string(), elapsed)
            }
        }
    }

    async fn probe_direct(&self, target: &ProbeTarget, style: ConnectionStyle) -> Result<()> {
        // String artifacts are read by the driver itself
        let result = match target.target.connection_string(style) {
            Some(conn) => self.driver.test_connection_str(&conn).await?,
            None => {
                self.driver
                    .test_connection(&target.target.structured_config())
                    .await?
            }
        };
        match result.scalar().and_then(|v| v.as_i64()) {
            Some(1) => Ok(()),
            other => Err(ProbeError::Query(format!(
                "liveness query returned {:?} instead of 1",
                other
            ))),
        }
    }

    async fn probe_migration(&self, target: &ProbeTarget, style: ConnectionStyle) -> Result<()> {
        let migration = self.migration.as_ref().ok_or_else(|| {
            ProbeError::Configuration("no migration command configured".to_string())
        })?;
        let conn = target.target.connection_string(style).ok_or_else(|| {
            ProbeError::Configuration(format!(
                "migration command needs a connection string, not {} config",
                style
            ))
        })?;

        migration.run(&conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
