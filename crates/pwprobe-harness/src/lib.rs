//! Scenario harness for password special character handling
//!
//! Builds connection artifacts for each scenario, probes them through a
//! [`pwprobe_core::DatabaseDriver`] and an external migration command, and
//! renders the results.
//!
//! ```rust,ignore
//! let config = HarnessConfig::default();
//! let targets = config.plan(None, None, &builtin_scenarios())?;
//! let runner = ScenarioRunner::from_config(Arc::new(MssqlDriver::new()), &config);
//! let report = runner.run(&targets).await;
//! println!("{}", report.render_console());
//! ```

mod backoff;
mod config;
mod external;
mod probe;
mod report;
mod runner;
mod services;

pub use backoff::BackoffStrategy;
pub use config::{
    DEFAULT_MIGRATION_COMMAND, DEFAULT_URL_ENV, HarnessConfig, MigrationCommandConfig,
    OVERRIDE_SCENARIO, PreflightConfig, ProbeTarget,
};
pub use external::{CommandOutput, MigrationRunner};
pub use probe::{ProbeKind, ProbeMode, ProbeOutcome};
pub use report::{ModeSummary, RunReport};
pub use runner::ScenarioRunner;
pub use services::{DEFAULT_IMAGE, ServiceLauncher, wait_for_logins, wait_for_services};
