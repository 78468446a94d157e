//! Recognized signal vocabulary and severity strategies.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::extract::Entity;

/// Value used when an entity carries no recognized signal at all.
pub const NEUTRAL_SEVERITY: u32 = 50;

/// A numeric signal the scorer understands. Values are on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Risk,
    Urgency,
    Severity,
    Impact,
    BlastRadius,
    Criticality,
    Demand,
    Opportunity,
    Confidence,
    Trust,
    Reversibility,
    Capacity,
    Readiness,
    Resilience,
    Equity,
    Efficiency,
    Quality,
}

/// Whether a high value pushes severity up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Pressure,
    Relief,
}

impl Signal {
    pub const ALL: [Signal; 17] = [
        Signal::Risk,
        Signal::Urgency,
        Signal::Severity,
        Signal::Impact,
        Signal::BlastRadius,
        Signal::Criticality,
        Signal::Demand,
        Signal::Opportunity,
        Signal::Confidence,
        Signal::Trust,
        Signal::Reversibility,
        Signal::Capacity,
        Signal::Readiness,
        Signal::Resilience,
        Signal::Equity,
        Signal::Efficiency,
        Signal::Quality,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Urgency => "urgency",
            Self::Severity => "severity",
            Self::Impact => "impact",
            Self::BlastRadius => "blast_radius",
            Self::Criticality => "criticality",
            Self::Demand => "demand",
            Self::Opportunity => "opportunity",
            Self::Confidence => "confidence",
            Self::Trust => "trust",
            Self::Reversibility => "reversibility",
            Self::Capacity => "capacity",
            Self::Readiness => "readiness",
            Self::Resilience => "resilience",
            Self::Equity => "equity",
            Self::Efficiency => "efficiency",
            Self::Quality => "quality",
        }
    }

    /// Field name read from entities when no override is configured
    pub fn default_field(&self) -> &'static str {
        match self {
            Self::BlastRadius => "blastRadius",
            other => other.name(),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Risk
            | Self::Urgency
            | Self::Severity
            | Self::Impact
            | Self::BlastRadius
            | Self::Criticality
            | Self::Demand
            | Self::Opportunity => Direction::Pressure,
            Self::Confidence
            | Self::Trust
            | Self::Reversibility
            | Self::Capacity
            | Self::Readiness
            | Self::Resilience
            | Self::Equity
            | Self::Efficiency
            | Self::Quality => Direction::Relief,
        }
    }

    /// Parse a signal name, accepting snake_case or camelCase
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "blastRadius" => Some(Self::BlastRadius),
            other => Self::ALL.into_iter().find(|s| s.name() == other),
        }
    }

    /// This signal's push toward severity: the raw value for pressure
    /// signals, its complement for relief signals.
    pub fn contribution(&self, value: f64) -> f64 {
        match self.direction() {
            Direction::Pressure => value,
            Direction::Relief => 100.0 - value,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which entity field feeds a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDefinition {
    pub signal: Signal,
    pub field: String,
}

/// Build the full vocabulary, applying `signal_map` field overrides.
pub fn signal_definitions(signal_map: &BTreeMap<String, String>) -> Vec<SignalDefinition> {
    for name in signal_map.keys() {
        if Signal::from_name(name).is_none() {
            tracing::warn!(signal = %name, "Ignoring unrecognized signal in signal_map");
        }
    }

    Signal::ALL
        .into_iter()
        .map(|signal| {
            let field = signal_map
                .iter()
                .find(|(name, field)| Signal::from_name(name) == Some(signal) && !field.is_empty())
                .map(|(_, field)| field.clone())
                .unwrap_or_else(|| signal.default_field().to_string());
            SignalDefinition { signal, field }
        })
        .collect()
}

/// Maps an entity's signals to a composite severity in `0..=100`.
///
/// Implementations must be pure: no clock, no randomness, no dependence on
/// other entities.
pub trait SeverityStrategy: Send + Sync + fmt::Debug {
    fn severity(&self, entity: &Entity) -> u32;
}

/// Weighted mean of the signals that are present.
///
/// `risk`, `severity` and `blast_radius` weigh 1.5; everything else 1.0.
/// Relief signals contribute `100 - value`. An entity with no recognized
/// signal scores [`NEUTRAL_SEVERITY`]: missing data reads neither safe nor
/// dangerous.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSignalStrategy;

impl WeightedSignalStrategy {
    pub fn weight(signal: Signal) -> f64 {
        match signal {
            Signal::Risk | Signal::Severity | Signal::BlastRadius => 1.5,
            _ => 1.0,
        }
    }
}

impl SeverityStrategy for WeightedSignalStrategy {
    fn severity(&self, entity: &Entity) -> u32 {
        let (weighted, total_weight) = entity.signals.iter().fold(
            (0.0_f64, 0.0_f64),
            |(sum, weights), (signal, value)| {
                let w = Self::weight(*signal);
                (sum + signal.contribution(*value) * w, weights + w)
            },
        );

        if total_weight == 0.0 {
            return NEUTRAL_SEVERITY;
        }

        (weighted / total_weight).round().clamp(0.0, 100.0) as u32
    }
}

/// Severity is the single highest contribution. Useful for capabilities
/// where one bad signal should dominate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakSignalStrategy;

impl SeverityStrategy for PeakSignalStrategy {
    fn severity(&self, entity: &Entity) -> u32 {
        entity
            .signals
            .iter()
            .map(|(signal, value)| signal.contribution(*value))
            .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.max(c))))
            .map(|peak| peak.round().clamp(0.0, 100.0) as u32)
            .unwrap_or(NEUTRAL_SEVERITY)
    }
}
