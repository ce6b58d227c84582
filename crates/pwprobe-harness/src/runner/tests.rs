use super::*;
use crate::config::MigrationCommandConfig;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use pwprobe_core::{Connection, ConnectionConfig, QueryResult, Scenario, Value, builtin_scenarios};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Accepts a login only if the password matches the one registered for its port
struct InMemoryDriver {
    accounts: HashMap<u16, String>,
    seen: Mutex<Vec<ConnectionConfig>>,
    strings: Mutex<Vec<String>>,
    scalar: Value,
    /// Read `password=` values verbatim, ignoring brace escapes
    brace_unaware: bool,
}

impl InMemoryDriver {
    fn for_scenarios(scenarios: &[Scenario]) -> Self {
        Self {
            accounts: scenarios
                .iter()
                .map(|s| (s.port, s.password.clone()))
                .collect(),
            seen: Mutex::new(Vec::new()),
            strings: Mutex::new(Vec::new()),
            scalar: Value::Int64(1),
            brace_unaware: false,
        }
    }

    fn reject(mut self, port: u16) -> Self {
        self.accounts.remove(&port);
        self
    }

    fn seen_strings(&self) -> Vec<String> {
        self.strings.lock().unwrap().clone()
    }

    fn seen_passwords(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.password.clone())
            .collect()
    }
}

struct InMemoryConnection {
    scalar: Value,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for InMemoryConnection {
    fn driver_name(&self) -> &str {
        "memory"
    }

    async fn query(&self, _sql: &str) -> Result<QueryResult> {
        Ok(QueryResult {
            columns: vec!["ok".to_string()],
            rows: vec![vec![self.scalar.clone()]],
            execution_time_ms: 0,
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseDriver for InMemoryDriver {
    fn id(&self) -> &'static str {
        "memory"
    }

    fn display_name(&self) -> &'static str {
        "In-memory"
    }

    fn default_port(&self) -> u16 {
        1433
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.seen.lock().unwrap().push(config.clone());
        match self.accounts.get(&config.port) {
            Some(password) if *password == config.password => Ok(Arc::new(InMemoryConnection {
                scalar: self.scalar.clone(),
                closed: AtomicBool::new(false),
            })),
            Some(_) => Err(ProbeError::Authentication(format!(
                "Login failed for user '{}'",
                config.user
            ))),
            None => Err(ProbeError::Connection(format!(
                "connection refused on port {}",
                config.port
            ))),
        }
    }

    async fn connect_str(&self, conn_str: &str) -> Result<Arc<dyn Connection>> {
        self.strings.lock().unwrap().push(conn_str.to_string());
        let mut config = self.parse_connection_string(conn_str)?;
        if self.brace_unaware
            && let Some(raw) = conn_str
                .split(';')
                .find_map(|segment| segment.strip_prefix("password="))
        {
            config.password = raw.to_string();
        }
        self.connect(&config).await
    }
}

fn targets(scenarios: &[Scenario]) -> Vec<ProbeTarget> {
    let config = HarnessConfig::default();
    scenarios.iter().map(|s| config.target_for(s)).collect()
}

fn shell_migration(script: &str) -> MigrationRunner {
    MigrationRunner::new(
        MigrationCommandConfig::new("sh", vec!["-c".to_string(), script.to_string()])
            .with_url_env("PWPROBE_RUNNER_URL")
            .with_timeout(Duration::from_secs(10)),
    )
}

#[tokio::test]
async fn test_all_builtin_scenarios_pass_every_direct_mode() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let runner = ScenarioRunner::new(driver.clone(), Duration::ZERO);

    let report = runner.run(&targets(&scenarios)).await;

    assert_eq!(report.len(), 15);
    assert_eq!(report.passed_count(), 15);
    assert_eq!(report.uniformly_reliable(), ProbeMode::DIRECT.to_vec());

    // Every artifact style delivered the raw password to the driver
    let expected: Vec<String> = scenarios
        .iter()
        .flat_map(|s| std::iter::repeat_n(s.password.clone(), 3))
        .collect();
    assert_eq!(driver.seen_passwords(), expected);
}

#[tokio::test]
async fn test_one_failing_scenario_does_not_affect_others() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios).reject(1435));
    let runner = ScenarioRunner::new(driver, Duration::ZERO);

    let report = runner.run(&targets(&scenarios)).await;

    for outcome in report.outcomes() {
        if outcome.scenario == "percent_ampersand" {
            assert!(!outcome.success);
            assert!(
                outcome.error.as_deref().unwrap().contains("connection refused"),
                "{:?}",
                outcome.error
            );
        } else {
            assert!(outcome.success, "{} {} failed", outcome.scenario, outcome.mode);
        }
    }
    assert_eq!(report.passed_count(), 12);
    assert!(report.uniformly_reliable().is_empty());
}

#[tokio::test]
async fn test_outcomes_follow_matrix_order() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let runner =
        ScenarioRunner::new(driver, Duration::ZERO).with_migration(shell_migration("true"));

    let report = runner.run(&targets(&scenarios[..2])).await;
    let order: Vec<String> = report
        .outcomes()
        .iter()
        .map(|o| format!("{} {}", o.scenario, o.mode))
        .collect();

    assert_eq!(
        order,
        vec![
            "curly_braces direct/structured",
            "curly_braces direct/url",
            "curly_braces direct/semicolon",
            "curly_braces migration/url",
            "curly_braces migration/semicolon",
            "at_hash direct/structured",
            "at_hash direct/url",
            "at_hash direct/semicolon",
            "at_hash migration/url",
            "at_hash migration/semicolon",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_delay_separates_consecutive_probes() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let runner = ScenarioRunner::new(driver, Duration::from_secs(2));

    let started = tokio::time::Instant::now();
    let report = runner.run(&targets(&scenarios[..2])).await;

    assert_eq!(report.len(), 6);
    // Five gaps between six probes, none before the first
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test]
async fn test_wrong_password_is_reported_as_authentication_failure() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let runner = ScenarioRunner::new(driver, Duration::ZERO);

    let mut target = HarnessConfig::default().target_for(&scenarios[0]);
    target.target.password = "wrong".to_string();

    let outcome = runner.probe(&target, ProbeMode::DIRECT[0]).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().starts_with("Authentication failed"));
}

#[tokio::test]
async fn test_unexpected_scalar_fails_the_probe() {
    let scenarios = builtin_scenarios();
    let mut driver = InMemoryDriver::for_scenarios(&scenarios);
    driver.scalar = Value::Int64(0);
    let runner = ScenarioRunner::new(Arc::new(driver), Duration::ZERO);

    let outcome = runner
        .probe(&targets(&scenarios)[0], ProbeMode::DIRECT[0])
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("instead of 1"));
}

#[tokio::test]
async fn test_string_artifacts_reach_the_driver_unparsed() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let runner = ScenarioRunner::new(driver.clone(), Duration::ZERO);
    let target = &targets(&scenarios)[0];

    for mode in ProbeMode::DIRECT {
        let outcome = runner.probe(target, mode).await;
        assert!(outcome.success, "{} {:?}", mode, outcome.error);
    }

    // The structured probe never goes through a string
    assert_eq!(
        driver.seen_strings(),
        vec![target.target.url_string(), target.target.semicolon_string()]
    );
}

#[tokio::test]
async fn test_driver_that_ignores_brace_escapes_fails_only_semicolon_style() {
    let scenarios = builtin_scenarios();
    let mut driver = InMemoryDriver::for_scenarios(&scenarios);
    driver.brace_unaware = true;
    let runner = ScenarioRunner::new(Arc::new(driver), Duration::ZERO);

    // curly_braces: the escaped form differs from the raw password
    let report = runner.run(&targets(&scenarios[..1])).await;
    let failed: Vec<String> = report.failures().map(|o| o.mode.to_string()).collect();
    assert_eq!(failed, vec!["direct/semicolon"]);
    assert!(
        report.failures().all(|o| o
            .error
            .as_deref()
            .unwrap()
            .starts_with("Authentication failed"))
    );
}

#[tokio::test]
async fn test_migration_probe_receives_connection_string() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let target = &targets(&scenarios)[1];
    let expected_url = target.target.url_string();

    let script = format!(r#"test "$PWPROBE_RUNNER_URL" = '{}'"#, expected_url);
    let runner =
        ScenarioRunner::new(driver, Duration::ZERO).with_migration(shell_migration(&script));

    let url_mode = ProbeMode::MIGRATION[0];
    let outcome = runner.probe(target, url_mode).await;
    assert!(outcome.success, "{:?}", outcome.error);

    // The semicolon artifact differs, so the same check fails
    let outcome = runner.probe(target, ProbeMode::MIGRATION[1]).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("exit code 1"));
}

#[tokio::test]
async fn test_migration_failures_are_captured_per_probe() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let runner = ScenarioRunner::new(driver, Duration::ZERO)
        .with_migration(shell_migration("echo 'P1000: Authentication failed' >&2; exit 1"));

    let report = runner.run(&targets(&scenarios[..1])).await;

    assert_eq!(report.len(), 5);
    assert_eq!(report.passed_count(), 3);
    for outcome in report.failures() {
        assert_eq!(outcome.mode.kind, ProbeKind::Migration);
        assert!(outcome.error.as_deref().unwrap().contains("P1000"));
    }
}

#[tokio::test]
async fn test_migration_probe_without_command_fails_cleanly() {
    let scenarios = builtin_scenarios();
    let driver = Arc::new(InMemoryDriver::for_scenarios(&scenarios));
    let runner = ScenarioRunner::new(driver, Duration::ZERO);

    assert_eq!(runner.modes(), ProbeMode::DIRECT.to_vec());
    let outcome = runner
        .probe(&targets(&scenarios)[0], ProbeMode::MIGRATION[0])
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("no migration command"));
}

#[test]
fn test_from_config_follows_migration_setting() {
    let driver: Arc<dyn DatabaseDriver> =
        Arc::new(InMemoryDriver::for_scenarios(&builtin_scenarios()));

    let with = ScenarioRunner::from_config(driver.clone(), &HarnessConfig::default());
    assert_eq!(with.modes().len(), 5);

    let config = HarnessConfig {
        migration: None,
        ..HarnessConfig::default()
    };
    let without = ScenarioRunner::from_config(driver, &config);
    assert_eq!(without.modes().len(), 3);
}
