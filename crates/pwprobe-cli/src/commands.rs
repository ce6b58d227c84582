use crate::{RunArgs, ServicesAction, ServicesArgs};
use anyhow::Context;
use pwprobe_core::escape::needs_cli_escaping;
use pwprobe_core::{
    ConnectionTarget, DEFAULT_PORT, Scenario, builtin_scenarios, encode_cli, encode_url,
    load_scenarios, parse_detailed,
};
use pwprobe_driver_mssql::MssqlDriver;
use pwprobe_harness::{
    BackoffStrategy, PreflightConfig, ProbeTarget, ScenarioRunner, ServiceLauncher,
    wait_for_logins, wait_for_services,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn scenario_list(path: Option<&Path>) -> anyhow::Result<Vec<Scenario>> {
    match path {
        Some(path) => load_scenarios(path)
            .with_context(|| format!("failed to load scenarios from {}", path.display())),
        None => Ok(builtin_scenarios()),
    }
}

fn endpoints(targets: &[ProbeTarget]) -> Vec<(String, u16)> {
    let mut endpoints: Vec<(String, u16)> = Vec::new();
    for target in targets {
        let endpoint = (target.target.host.clone(), target.target.port);
        if !endpoints.contains(&endpoint) {
            endpoints.push(endpoint);
        }
    }
    endpoints
}

pub(crate) async fn run(args: RunArgs) -> anyhow::Result<()> {
    let scenarios = scenario_list(args.scenarios.as_deref())?;
    let config = args.harness_config().context("invalid run options")?;
    let targets = config
        .plan(
            args.database_url.as_deref(),
            args.scenario.as_deref(),
            &scenarios,
        )
        .context("could not decide what to probe")?;

    let driver = Arc::new(MssqlDriver::new());

    if let Some(preflight) = &config.preflight {
        tracing::info!(endpoints = targets.len(), "waiting for database services");
        wait_for_services(&endpoints(&targets), preflight)
            .await
            .context("database services are not available; start them with `pwprobe services up --wait`")?;
        wait_for_logins(driver.as_ref(), &targets, preflight)
            .await
            .context("database services are up but not accepting logins")?;
    }

    let runner = ScenarioRunner::from_config(driver, &config);
    let report = runner.run(&targets).await;

    println!("{}", report.render_console());

    if let Some(path) = &args.report {
        std::fs::write(path, report.render_markdown())
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    // Probe failures are results, not errors
    Ok(())
}

pub(crate) fn encode(password: &str) -> anyhow::Result<()> {
    let target = ConnectionTarget::new("localhost", DEFAULT_PORT, "sa", password, "master");

    println!("raw:               {}", password);
    println!("needs escaping:    {}", if needs_cli_escaping(password) { "yes" } else { "no" });
    println!("brace-escaped:     {}", encode_cli(password));
    println!("percent-encoded:   {}", encode_url(password));
    println!("semicolon string:  {}", target.semicolon_string());
    println!("url string:        {}", target.url_string());
    Ok(())
}

pub(crate) fn parse(connection_string: &str, show_password: bool) -> anyhow::Result<()> {
    let parsed = parse_detailed(connection_string).context("invalid connection string")?;
    let config = if show_password {
        parsed.config
    } else {
        parsed.config.redacted()
    };

    let output = serde_json::json!({
        "style": parsed.style.as_str(),
        "scheme": parsed.scheme,
        "config": config,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub(crate) async fn services(action: ServicesAction) -> anyhow::Result<()> {
    match action {
        ServicesAction::Up(args) => services_up(args).await,
        ServicesAction::Down(args) => {
            let scenarios = scenario_list(args.scenarios.as_deref())?;
            launcher(&args).stop(&scenarios).await?;
            Ok(())
        }
    }
}

async fn services_up(args: ServicesArgs) -> anyhow::Result<()> {
    let scenarios = scenario_list(args.scenarios.as_deref())?;
    launcher(&args).start(&scenarios).await?;

    if args.wait {
        let endpoints: Vec<(String, u16)> = scenarios
            .iter()
            .map(|s| ("localhost".to_string(), s.port))
            .collect();
        let preflight = PreflightConfig {
            deadline: Duration::from_secs(args.wait_timeout_secs),
            backoff: BackoffStrategy::new(1_000, 10_000),
            ..PreflightConfig::default()
        };
        wait_for_services(&endpoints, &preflight).await?;
    }

    for scenario in &scenarios {
        println!(
            "{:<20} localhost:{:<6} {}",
            scenario.name,
            scenario.port,
            scenario.description.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

fn launcher(args: &ServicesArgs) -> ServiceLauncher {
    ServiceLauncher::new().with_image(args.image.clone())
}
