//! Scoring and status classification.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::extract::Entity;
use super::signals::{Signal, SeverityStrategy};

/// Severity at which an entity moves from `nominal` to `watch`.
pub const WATCH_THRESHOLD: u32 = 40;
/// Severity at which an entity moves from `watch` to `critical`.
pub const CRITICAL_THRESHOLD: u32 = 70;

/// Ordered status tiers. Boundary values belong to the higher tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Nominal,
    Watch,
    Critical,
}

impl Status {
    pub fn from_severity(severity: u32) -> Self {
        if severity >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if severity >= WATCH_THRESHOLD {
            Self::Watch
        } else {
            Self::Nominal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::Watch => "watch",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity with its composite severity and tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEntity {
    pub index: usize,
    pub id: String,
    pub name: Option<String>,
    pub severity: u32,
    pub status: Status,
    /// Fraction of the recognized vocabulary present on the entity
    pub signal_coverage: f64,
    pub signals: BTreeMap<Signal, f64>,
}

/// Score one entity. Pure and independent of every other entity.
pub fn classify(entity: Entity, strategy: &dyn SeverityStrategy) -> ClassifiedEntity {
    let severity = strategy.severity(&entity).min(100);
    let signal_coverage = round_to(entity.signals.len() as f64 / Signal::ALL.len() as f64, 3);

    ClassifiedEntity {
        index: entity.index,
        id: entity.id,
        name: entity.name,
        severity,
        status: Status::from_severity(severity),
        signal_coverage,
        signals: entity.signals,
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
