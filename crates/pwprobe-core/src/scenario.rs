//! Password scenarios
//!
//! A scenario pairs a password pattern with the port of the database
//! instance that was started with that password.

use crate::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named (password, port) pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub password: String,
    pub port: u16,
    #[serde(default)]
    pub description: Option<String>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, password: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            port,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// The five built-in scenarios, in run order
pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("curly_braces", "Strong{Pass}2024!", 1433)
            .with_description("Curly braces, which are themselves escape delimiters"),
        Scenario::new("at_hash", "Str0ng@Pass#2024", 1434)
            .with_description("URL userinfo and fragment delimiters"),
        Scenario::new("percent_ampersand", "Str0ng%Pass&2024", 1435)
            .with_description("Percent escapes and query separators"),
        Scenario::new("quotes", "Str0ng'Pass\"2024", 1436)
            .with_description("Single and double quotes"),
        Scenario::new("delimiters", "Str0ng;Pass=[2024]", 1437)
            .with_description("Connection string pair delimiters and brackets"),
    ]
}

/// Pick one scenario by name, failing with the list of valid names
pub fn select_scenario(scenarios: &[Scenario], name: &str) -> Result<Scenario> {
    scenarios
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .cloned()
        .ok_or_else(|| {
            let valid: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
            ProbeError::Configuration(format!(
                "unknown scenario '{}'; expected one of: {}",
                name,
                valid.join(", ")
            ))
        })
}

#[derive(Deserialize)]
struct ScenarioFile {
    #[serde(rename = "scenario", default)]
    scenarios: Vec<Scenario>,
}

/// Parse a scenario list from TOML (`[[scenario]]` tables)
pub fn scenarios_from_toml(source: &str) -> Result<Vec<Scenario>> {
    let file: ScenarioFile = toml::from_str(source)
        .map_err(|e| ProbeError::Configuration(format!("invalid scenario file: {}", e)))?;

    if file.scenarios.is_empty() {
        return Err(ProbeError::Configuration(
            "scenario file defines no [[scenario]] entries".to_string(),
        ));
    }

    for (idx, scenario) in file.scenarios.iter().enumerate() {
        if scenario.name.trim().is_empty() {
            return Err(ProbeError::Configuration(format!(
                "scenario #{} has an empty name",
                idx + 1
            )));
        }
        if scenario.port == 0 {
            return Err(ProbeError::Configuration(format!(
                "scenario '{}' has port 0",
                scenario.name
            )));
        }
        if file.scenarios[..idx]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&scenario.name))
        {
            return Err(ProbeError::Configuration(format!(
                "scenario '{}' is defined more than once",
                scenario.name
            )));
        }
    }

    Ok(file.scenarios)
}

/// Load a scenario list from a TOML file
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    tracing::debug!(path = %path.display(), "loading scenarios");
    let source = std::fs::read_to_string(path)?;
    scenarios_from_toml(&source)
}
