//! Probe modes and outcomes

use pwprobe_core::ConnectionStyle;
use std::fmt;
use std::time::Duration;

/// How a probe reaches the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Connect through the adapter and run a query
    Direct,
    /// Run the external migration command with the connection string in its environment
    Migration,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Direct => "direct",
            ProbeKind::Migration => "migration",
        }
    }
}

/// One column of the probe matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeMode {
    pub kind: ProbeKind,
    pub style: ConnectionStyle,
}

impl ProbeMode {
    pub const fn new(kind: ProbeKind, style: ConnectionStyle) -> Self {
        Self { kind, style }
    }

    /// Direct modes, in run order
    pub const DIRECT: [ProbeMode; 3] = [
        ProbeMode::new(ProbeKind::Direct, ConnectionStyle::Structured),
        ProbeMode::new(ProbeKind::Direct, ConnectionStyle::Url),
        ProbeMode::new(ProbeKind::Direct, ConnectionStyle::Semicolon),
    ];

    /// Migration modes, in run order. The command only takes a string.
    pub const MIGRATION: [ProbeMode; 2] = [
        ProbeMode::new(ProbeKind::Migration, ConnectionStyle::Url),
        ProbeMode::new(ProbeKind::Migration, ConnectionStyle::Semicolon),
    ];

    /// Modes to run, direct first
    pub fn matrix(include_migration: bool) -> Vec<ProbeMode> {
        let mut modes = Self::DIRECT.to_vec();
        if include_migration {
            modes.extend(Self::MIGRATION);
        }
        modes
    }
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.style.as_str())
    }
}

/// Result of one (scenario, mode) probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub scenario: String,
    pub mode: ProbeMode,
    pub success: bool,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ProbeOutcome {
    pub fn passed(scenario: impl Into<String>, mode: ProbeMode, elapsed: Duration) -> Self {
        Self {
            scenario: scenario.into(),
            mode,
            success: true,
            error: None,
            elapsed,
        }
    }

    pub fn failed(
        scenario: impl Into<String>,
        mode: ProbeMode,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            mode,
            success: false,
            error: Some(error.into()),
            elapsed,
        }
    }
}
