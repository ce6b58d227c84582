//! Run report and rendering
//!
//! [`RunReport`] keeps outcomes in the order they were produced. The console
//! and Markdown renderings are built from the same tables.

use crate::probe::{ProbeKind, ProbeMode, ProbeOutcome};
use chrono::{DateTime, Utc};
use comfy_table::presets::{ASCII_MARKDOWN, UTF8_FULL};
use comfy_table::{CellAlignment, Cell, ContentArrangement, Table};
use std::fmt::Write as _;

/// Aggregate for one probe mode across all scenarios
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSummary {
    pub mode: ProbeMode,
    pub passed: usize,
    pub total: usize,
}

impl ModeSummary {
    /// Success rate in percent, 0 when nothing ran
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passed as f64 * 100.0 / self.total as f64
    }

    /// True if the mode ran at least once and never failed
    pub fn is_uniformly_reliable(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

/// Ordered outcomes of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    outcomes: Vec<ProbeOutcome>,
    generated_at: DateTime<Utc>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn push(&mut self, outcome: ProbeOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Scenario names in first-seen order
    pub fn scenarios(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for outcome in &self.outcomes {
            if !names.contains(&outcome.scenario.as_str()) {
                names.push(&outcome.scenario);
            }
        }
        names
    }

    /// Modes in first-seen order
    pub fn modes(&self) -> Vec<ProbeMode> {
        let mut modes: Vec<ProbeMode> = Vec::new();
        for outcome in &self.outcomes {
            if !modes.contains(&outcome.mode) {
                modes.push(outcome.mode);
            }
        }
        modes
    }

    pub fn outcome(&self, scenario: &str, mode: ProbeMode) -> Option<&ProbeOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.scenario == scenario && o.mode == mode)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    /// Per-mode aggregates in mode order
    pub fn summaries(&self) -> Vec<ModeSummary> {
        self.modes()
            .into_iter()
            .map(|mode| {
                let (passed, total) = self
                    .outcomes
                    .iter()
                    .filter(|o| o.mode == mode)
                    .fold((0, 0), |(passed, total), o| {
                        (passed + usize::from(o.success), total + 1)
                    });
                ModeSummary {
                    mode,
                    passed,
                    total,
                }
            })
            .collect()
    }

    /// Modes that succeeded for every scenario
    pub fn uniformly_reliable(&self) -> Vec<ProbeMode> {
        self.summaries()
            .into_iter()
            .filter(ModeSummary::is_uniformly_reliable)
            .map(|s| s.mode)
            .collect()
    }

    /// Plain-text recommendation derived from the summaries
    pub fn recommendation(&self) -> String {
        let summaries = self.summaries();
        if summaries.is_empty() {
            return "No probes ran, so there is nothing to recommend.".to_string();
        }

        let reliable = self.uniformly_reliable();
        let mut text = String::new();

        if reliable.len() == summaries.len() {
            text.push_str("Every configuration style handled every password scenario.\n");
        } else if reliable.is_empty() {
            text.push_str(
                "No configuration style handled every password scenario. \
                 Avoid reserved characters in passwords until the failures below are resolved.\n",
            );
        } else {
            let _ = writeln!(text, "Uniformly reliable: {}.", join_modes(&reliable));
            let unreliable: Vec<String> = summaries
                .iter()
                .filter(|s| !s.is_uniformly_reliable())
                .map(|s| format!("{} ({:.0}%)", s.mode, s.percentage()))
                .collect();
            let _ = writeln!(text, "Not reliable: {}.", unreliable.join(", "));
        }

        for (kind, audience) in [
            (ProbeKind::Direct, "Application connections"),
            (ProbeKind::Migration, "Migration tooling"),
        ] {
            if let Some(best) = best_for(&summaries, kind) {
                let _ = writeln!(
                    text,
                    "{}: use the {} style ({}/{} passed).",
                    audience,
                    best.mode.style,
                    best.passed,
                    best.total
                );
            }
        }

        text.trim_end().to_string()
    }

    /// Scenario by mode PASS/FAIL table
    pub fn results_table(&self) -> Table {
        let modes = self.modes();
        let mut table = Table::new();
        table.set_header(
            std::iter::once("scenario".to_string()).chain(modes.iter().map(|m| m.to_string())),
        );
        for scenario in self.scenarios() {
            let mut row = vec![Cell::new(scenario)];
            for mode in &modes {
                let label = match self.outcome(scenario, *mode) {
                    Some(o) if o.success => "PASS",
                    Some(_) => "FAIL",
                    None => "-",
                };
                row.push(Cell::new(label).set_alignment(CellAlignment::Center));
            }
            table.add_row(row);
        }
        table
    }

    /// Mode / passed / total / percentage table
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["mode", "passed", "total", "success"]);
        for summary in self.summaries() {
            table.add_row(vec![
                Cell::new(summary.mode),
                Cell::new(summary.passed).set_alignment(CellAlignment::Right),
                Cell::new(summary.total).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.0}%", summary.percentage()))
                    .set_alignment(CellAlignment::Right),
            ]);
        }
        table
    }

    /// Full console report
    pub fn render_console(&self) -> String {
        let mut results = self.results_table();
        results
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        let mut summary = self.summary_table();
        summary.load_preset(UTF8_FULL);

        let mut out = String::new();
        let _ = writeln!(out, "Results\n{}\n", results);

        let failures: Vec<&ProbeOutcome> = self.failures().collect();
        if !failures.is_empty() {
            out.push_str("Failures\n");
            for outcome in failures {
                let _ = writeln!(
                    out,
                    "  {} {}: {}",
                    outcome.scenario,
                    outcome.mode,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            out.push('\n');
        }

        let _ = writeln!(out, "Summary\n{}\n", summary);
        let _ = writeln!(out, "Recommendation\n{}", self.recommendation());
        out
    }

    /// Recommendation document in Markdown
    pub fn render_markdown(&self) -> String {
        let mut results = self.results_table();
        results.load_preset(ASCII_MARKDOWN);
        let mut summary = self.summary_table();
        summary.load_preset(ASCII_MARKDOWN);

        let mut out = String::new();
        out.push_str("# Password special character handling\n\n");
        let _ = writeln!(
            out,
            "Generated {}.\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "## Results\n\n{}\n", results);
        let _ = writeln!(out, "## Summary\n\n{}\n", summary);

        let failures: Vec<&ProbeOutcome> = self.failures().collect();
        if !failures.is_empty() {
            out.push_str("## Failures\n\n");
            for outcome in failures {
                let _ = writeln!(
                    out,
                    "- `{}` {}: {}",
                    outcome.scenario,
                    outcome.mode,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            out.push('\n');
        }

        let _ = writeln!(out, "## Recommendation\n\n{}", self.recommendation());
        out
    }
}

fn join_modes(modes: &[ProbeMode]) -> String {
    modes
        .iter()
        .map(ProbeMode::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Highest-scoring mode of `kind`; the earliest mode wins ties
fn best_for(summaries: &[ModeSummary], kind: ProbeKind) -> Option<&ModeSummary> {
    summaries
        .iter()
        .filter(|s| s.mode.kind == kind && s.total > 0)
        .fold(None, |best: Option<&ModeSummary>, s| match best {
            Some(b) if b.percentage() >= s.percentage() => Some(b),
            _ => Some(s),
        })
}

#[cfg(test)]
mod tests;
