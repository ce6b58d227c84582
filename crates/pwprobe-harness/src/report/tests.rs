use super::*;
use pretty_assertions::assert_eq;
use pwprobe_core::ConnectionStyle;
use std::time::Duration;

const STRUCTURED: ProbeMode = ProbeMode::new(ProbeKind::Direct, ConnectionStyle::Structured);
const DIRECT_URL: ProbeMode = ProbeMode::new(ProbeKind::Direct, ConnectionStyle::Url);
const MIGRATION_URL: ProbeMode = ProbeMode::new(ProbeKind::Migration, ConnectionStyle::Url);
const MIGRATION_SEMI: ProbeMode =
    ProbeMode::new(ProbeKind::Migration, ConnectionStyle::Semicolon);

fn pass(scenario: &str, mode: ProbeMode) -> ProbeOutcome {
    ProbeOutcome::passed(scenario, mode, Duration::from_millis(12))
}

fn fail(scenario: &str, mode: ProbeMode, error: &str) -> ProbeOutcome {
    ProbeOutcome::failed(scenario, mode, error, Duration::from_millis(30))
}

fn report(outcomes: Vec<ProbeOutcome>) -> RunReport {
    let mut report = RunReport::new();
    for outcome in outcomes {
        report.push(outcome);
    }
    report
}

fn mixed_report() -> RunReport {
    report(vec![
        pass("curly_braces", STRUCTURED),
        pass("curly_braces", MIGRATION_URL),
        fail("curly_braces", MIGRATION_SEMI, "exit code 1: P1000 authentication failed"),
        pass("at_hash", STRUCTURED),
        pass("at_hash", MIGRATION_URL),
        pass("at_hash", MIGRATION_SEMI),
    ])
}

#[test]
fn test_empty_report() {
    let report = RunReport::new();
    assert!(report.is_empty());
    assert!(report.summaries().is_empty());
    assert!(report.uniformly_reliable().is_empty());
    assert_eq!(
        report.recommendation(),
        "No probes ran, so there is nothing to recommend."
    );
}

#[test]
fn test_order_is_first_seen() {
    let report = mixed_report();
    assert_eq!(report.scenarios(), vec!["curly_braces", "at_hash"]);
    assert_eq!(
        report.modes(),
        vec![STRUCTURED, MIGRATION_URL, MIGRATION_SEMI]
    );
}

#[test]
fn test_summaries_count_per_mode() {
    let summaries = mixed_report().summaries();
    assert_eq!(
        summaries,
        vec![
            ModeSummary { mode: STRUCTURED, passed: 2, total: 2 },
            ModeSummary { mode: MIGRATION_URL, passed: 2, total: 2 },
            ModeSummary { mode: MIGRATION_SEMI, passed: 1, total: 2 },
        ]
    );
    assert_eq!(summaries[2].percentage(), 50.0);
}

#[test]
fn test_percentage_of_empty_summary_is_zero() {
    let summary = ModeSummary { mode: STRUCTURED, passed: 0, total: 0 };
    assert_eq!(summary.percentage(), 0.0);
    assert!(!summary.is_uniformly_reliable());
}

#[test]
fn test_uniformly_reliable_modes() {
    assert_eq!(
        mixed_report().uniformly_reliable(),
        vec![STRUCTURED, MIGRATION_URL]
    );
}

#[test]
fn test_outcome_lookup_and_failures() {
    let report = mixed_report();
    assert!(report.outcome("at_hash", MIGRATION_SEMI).unwrap().success);
    assert!(report.outcome("at_hash", DIRECT_URL).is_none());

    let failures: Vec<&ProbeOutcome> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].scenario, "curly_braces");
    assert_eq!(report.passed_count(), 5);
}

#[test]
fn test_recommendation_names_reliable_and_unreliable_modes() {
    let text = mixed_report().recommendation();
    assert_eq!(
        text,
        "Uniformly reliable: direct/structured, migration/url.\n\
         Not reliable: migration/semicolon (50%).\n\
         Application connections: use the structured style (2/2 passed).\n\
         Migration tooling: use the url style (2/2 passed)."
    );
}

#[test]
fn test_recommendation_when_everything_passes() {
    let report = report(vec![pass("quotes", STRUCTURED), pass("quotes", DIRECT_URL)]);
    let text = report.recommendation();
    assert!(text.starts_with("Every configuration style handled every password scenario."));
    assert!(!text.contains("Migration tooling"));
}

#[test]
fn test_recommendation_when_nothing_is_reliable() {
    let report = report(vec![
        fail("quotes", STRUCTURED, "login failed"),
        pass("delimiters", STRUCTURED),
        fail("quotes", DIRECT_URL, "login failed"),
        fail("delimiters", DIRECT_URL, "login failed"),
    ]);
    let text = report.recommendation();
    assert!(text.starts_with("No configuration style handled every password scenario."));
    assert!(text.contains("Application connections: use the structured style (1/2 passed)."));
}

#[test]
fn test_console_rendering_contains_all_sections() {
    let out = mixed_report().render_console();
    for needle in [
        "Results",
        "curly_braces",
        "at_hash",
        "migration/semicolon",
        "PASS",
        "FAIL",
        "Failures",
        "P1000 authentication failed",
        "Summary",
        "50%",
        "Recommendation",
    ] {
        assert!(out.contains(needle), "missing '{}' in:\n{}", needle, out);
    }
}

#[test]
fn test_console_rendering_skips_failures_when_all_pass() {
    let out = report(vec![pass("quotes", STRUCTURED)]).render_console();
    assert!(!out.contains("Failures"));
}

#[test]
fn test_markdown_rendering() {
    let out = mixed_report().render_markdown();
    assert!(out.starts_with("# Password special character handling\n"));
    assert!(out.contains("## Results"));
    assert!(out.contains("## Summary"));
    assert!(out.contains("## Failures"));
    assert!(out.contains("- `curly_braces` migration/semicolon: exit code 1"));
    assert!(out.contains("## Recommendation"));
    assert!(out.contains("| curly_braces"));
}
