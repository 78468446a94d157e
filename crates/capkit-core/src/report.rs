//! Evaluation report model.

use serde::{Deserialize, Serialize};

use crate::config::RecommendationRole;
use crate::engine::ClassifiedEntity;
use crate::error::Result;

/// A complete evaluation of one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub capability_id: String,
    /// Milliseconds since the Unix epoch, from the injected clock
    pub generated_at: i64,
    pub summary: Summary,
    /// Triggered alert tokens, in evaluation order, without duplicates
    pub alerts: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    /// Classified entities in input order
    #[serde(default)]
    pub entities: Vec<ClassifiedEntity>,
}

impl EvaluationReport {
    /// Parse a report produced elsewhere (e.g. a previous process)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn has_alert(&self, alert: &str) -> bool {
        self.alerts.iter().any(|a| a == alert)
    }

    pub fn recommendations_for(
        &self,
        role: RecommendationRole,
    ) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(move |r| r.role == role)
    }
}

/// Counts per tier plus capability-level counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Valid entities that were scored
    pub total: usize,
    pub nominal: usize,
    pub watch: usize,
    pub critical: usize,
    pub posture: String,
    /// Collection elements rejected by extraction
    pub invalid: usize,
    pub issues: Vec<DataQualityIssue>,
    pub max_severity: u32,
    pub avg_severity: f64,
    pub avg_signal_coverage: f64,
    pub low_coverage_count: usize,
}

impl Summary {
    pub fn line(&self) -> String {
        format!(
            "Posture: {}, Total: {}, Nominal: {}, Watch: {}, Critical: {}, Invalid: {}",
            self.posture, self.total, self.nominal, self.watch, self.critical, self.invalid
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingId,
    MalformedCollection,
}

/// A data-quality problem found while extracting entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    /// Element index, or `None` for collection-level problems
    pub index: Option<usize>,
    pub kind: IssueKind,
    pub message: String,
}

/// A suggested action routed to a target agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Triggering entity, `None` for collection-level recommendations
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub role: RecommendationRole,
    #[serde(rename = "type")]
    pub recommendation_type: String,
    pub target_agent: String,
    pub severity: u32,
    pub rationale: String,
}
