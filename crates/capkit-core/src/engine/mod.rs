//! Engine - extraction, scoring, aggregation, recommendations and dispatch.
//!
//! Every capability shares this one pipeline; capabilities differ only in
//! their [`CapabilityConfig`].

mod aggregate;
mod classify;
mod dispatcher;
mod extract;
mod recommend;
mod signals;

use std::sync::Arc;

use serde_json::Value;

pub use aggregate::{aggregate, SYSTEMIC_CRITICAL_COUNT};
pub use classify::{classify, ClassifiedEntity, Status, CRITICAL_THRESHOLD, WATCH_THRESHOLD};
pub use dispatcher::{to_tasks, DispatchOptions};
pub use extract::{extract, Entity, Extraction};
pub use recommend::recommend;
pub use signals::{
    signal_definitions, Direction, PeakSignalStrategy, SeverityStrategy, Signal,
    SignalDefinition, WeightedSignalStrategy, NEUTRAL_SEVERITY,
};

use crate::clock::Clock;
use crate::config::CapabilityConfig;
use crate::error::{ConfigurationError, Result};
use crate::protocol::TaskRequest;
use crate::report::EvaluationReport;
use crate::state::CapabilityManager;

/// One configured capability. Immutable and cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CapabilityToolkit {
    config: CapabilityConfig,
    signals: Vec<SignalDefinition>,
    strategy: Arc<dyn SeverityStrategy>,
}

impl CapabilityToolkit {
    /// Normalize and validate `config`. Routing defects fail here, never at
    /// call time.
    pub fn new(config: CapabilityConfig) -> std::result::Result<Self, ConfigurationError> {
        let config = config.normalize()?;
        let signals = signal_definitions(&config.signal_map);

        tracing::debug!(
            capability = %config.capability_id,
            collection = %config.collection_field,
            "Capability toolkit created"
        );

        Ok(Self {
            config,
            signals,
            strategy: Arc::new(WeightedSignalStrategy),
        })
    }

    /// Replace the severity strategy
    pub fn with_strategy(mut self, strategy: impl SeverityStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    pub fn config(&self) -> &CapabilityConfig {
        &self.config
    }

    pub fn capability_id(&self) -> &str {
        &self.config.capability_id
    }

    pub fn signal_definitions(&self) -> &[SignalDefinition] {
        &self.signals
    }

    /// Pull and validate the configured collection from `payload`
    pub fn extract(&self, payload: &Value) -> Extraction {
        extract(payload, &self.config, &self.signals)
    }

    /// Score one entity with this toolkit's strategy
    pub fn classify(&self, entity: Entity) -> ClassifiedEntity {
        classify(entity, self.strategy.as_ref())
    }

    /// Run the full pipeline over `payload`.
    pub fn evaluate(&self, payload: &Value, clock: &dyn Clock) -> Result<EvaluationReport> {
        let generated_at = clock.now_ms();

        let Extraction {
            entities,
            issues,
            raw_count,
        } = self.extract(payload);

        let classified: Vec<ClassifiedEntity> =
            entities.into_iter().map(|e| self.classify(e)).collect();

        let (summary, alerts) = aggregate(&classified, issues, &self.config);
        let recommendations = recommend(&classified, raw_count, &self.config)?;

        tracing::debug!(
            capability = %self.config.capability_id,
            total = summary.total,
            critical = summary.critical,
            invalid = summary.invalid,
            alerts = alerts.len(),
            posture = %summary.posture,
            "Evaluation complete"
        );

        Ok(EvaluationReport {
            capability_id: self.config.capability_id.clone(),
            generated_at,
            summary,
            alerts,
            recommendations,
            entities: classified,
        })
    }

    /// Convert a report's recommendations into task requests
    pub fn to_tasks(
        &self,
        report: &EvaluationReport,
        options: DispatchOptions<'_>,
    ) -> Result<Vec<TaskRequest>> {
        Ok(to_tasks(&self.config, report, options)?)
    }

    /// Stateful wrapper acting as `local_agent_id`
    pub fn manager(
        self: &Arc<Self>,
        local_agent_id: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> CapabilityManager {
        CapabilityManager::new(Arc::clone(self), local_agent_id, clock)
    }

    /// Bypasses normalization so tests can reach states `new` rejects
    #[cfg(test)]
    pub(crate) fn config_mut(&mut self) -> &mut CapabilityConfig {
        &mut self.config
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::clock::FixedClock;
    use crate::config::RecommendationRole;

    fn toolkit() -> CapabilityToolkit {
        CapabilityToolkit::new(
            CapabilityConfig::new("risk_scheduler")
                .with_collection("risks", "riskId")
                .with_ready_posture("schedule_ready")
                .with_route(RecommendationRole::Primary, "reschedule_risk", "agent:scheduler")
                .with_route(RecommendationRole::Guard, "guard_risk", "agent:safety")
                .with_route(RecommendationRole::Audit, "audit_risk_signals", "agent:research")
                .with_route(RecommendationRole::Publish, "publish_risk_digest", "agent:ops"),
        )
        .unwrap()
    }

    #[test]
    fn test_evaluate_pipeline() {
        let payload = json!({
            "risks": [
                {
                    "riskId": "r-1", "name": "Rollout",
                    "risk": 90, "urgency": 85, "severity": 80, "impact": 88, "criticality": 90
                },
                {
                    "riskId": "r-2",
                    "risk": 45, "urgency": 45, "confidence": 55, "impact": 45, "demand": 45
                },
                { "name": "orphan" }
            ]
        });

        let report = toolkit().evaluate(&payload, &FixedClock(7)).unwrap();
        assert_eq!(report.generated_at, 7);
        assert_eq!(report.capability_id, "risk_scheduler");
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.critical, 1);
        assert_eq!(report.summary.watch, 1);
        assert_eq!(report.summary.invalid, 1);
        assert_eq!(report.summary.posture, "degraded");
        assert_eq!(report.alerts, vec!["risk_scheduler_critical_present".to_string()]);

        let roles: Vec<_> = report.recommendations.iter().map(|r| r.role).collect();
        assert_eq!(
            roles,
            vec![
                RecommendationRole::Primary,
                RecommendationRole::Guard,
                RecommendationRole::Audit,
                RecommendationRole::Publish,
            ]
        );
        assert_eq!(report.entities.len(), 2);
    }

    #[test]
    fn test_strategy_is_replaceable() {
        let payload = json!({ "risks": [{ "riskId": "r-1", "risk": 10, "trust": 5 }] });

        let weighted = toolkit().evaluate(&payload, &FixedClock(0)).unwrap();
        let peak = toolkit()
            .with_strategy(PeakSignalStrategy)
            .evaluate(&payload, &FixedClock(0))
            .unwrap();

        assert_eq!(weighted.entities[0].status, Status::Watch);
        assert_eq!(peak.entities[0].severity, 95);
        assert_eq!(peak.entities[0].status, Status::Critical);
    }

    #[test]
    fn test_sparse_entities_raise_low_coverage() {
        let payload = json!({ "risks": [{ "riskId": "r-1", "risk": 20, "urgency": 20 }] });

        let report = toolkit().evaluate(&payload, &FixedClock(0)).unwrap();
        assert_eq!(report.summary.low_coverage_count, 1);
        assert_eq!(report.alerts, vec!["risk_scheduler_low_signal_coverage".to_string()]);

        let lenient = CapabilityToolkit::new(
            toolkit().config().clone().with_low_coverage_threshold(0.1),
        )
        .unwrap();
        let report = lenient.evaluate(&payload, &FixedClock(0)).unwrap();
        assert_eq!(report.summary.low_coverage_count, 0);
        assert!(report.alerts.is_empty());
    }

    #[test]
    fn test_signal_map_reaches_every_signal() {
        let toolkit = CapabilityToolkit::new(
            toolkit()
                .config()
                .clone()
                .with_signal_field("quality", "clarityQuality")
                .with_signal_field("readiness", "messageReadiness"),
        )
        .unwrap();
        let payload = json!({
            "risks": [{
                "riskId": "f-1",
                "clarityQuality": 2,
                "messageReadiness": 1,
                "demand": 99,
                "capacity": 1
            }]
        });

        let report = toolkit.evaluate(&payload, &FixedClock(0)).unwrap();
        let entity = &report.entities[0];
        assert_eq!(entity.signals.len(), 4);
        assert_eq!(entity.severity, 99);
        assert_eq!(entity.status, Status::Critical);
        assert_eq!(entity.signal_coverage, 0.235);
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let config = CapabilityConfig::new("broken")
            .with_route(RecommendationRole::Primary, "fix", "agent:ops");
        assert!(CapabilityToolkit::new(config).is_err());
    }
}
