//! Aggregation - reduces classified entities into a summary and alerts.

use super::classify::{round_to, ClassifiedEntity, Status};
use crate::config::CapabilityConfig;
use crate::report::{DataQualityIssue, IssueKind, Summary};

/// Critical count above which risk is treated as systemic.
pub const SYSTEMIC_CRITICAL_COUNT: usize = 5;

/// Build the summary and alert list. Never fails.
pub fn aggregate(
    entities: &[ClassifiedEntity],
    issues: Vec<DataQualityIssue>,
    config: &CapabilityConfig,
) -> (Summary, Vec<String>) {
    let count = |status: Status| entities.iter().filter(|e| e.status == status).count();
    let (nominal, watch, critical) = (
        count(Status::Nominal),
        count(Status::Watch),
        count(Status::Critical),
    );

    let total = entities.len();
    let max_severity = entities.iter().map(|e| e.severity).max().unwrap_or(0);
    let (avg_severity, avg_signal_coverage) = if total > 0 {
        let severity_sum: u32 = entities.iter().map(|e| e.severity).sum();
        let coverage_sum: f64 = entities.iter().map(|e| e.signal_coverage).sum();
        (
            round_to(f64::from(severity_sum) / total as f64, 2),
            round_to(coverage_sum / total as f64, 3),
        )
    } else {
        (0.0, 1.0)
    };
    let threshold = config.reliability_policy.low_coverage_threshold;
    let low_coverage_count = entities
        .iter()
        .filter(|e| e.signal_coverage < threshold)
        .count();

    let posture = if critical == 0 {
        config.ready_posture.clone()
    } else {
        config.degraded_posture.clone()
    };

    let invalid = issues
        .iter()
        .filter(|issue| issue.kind == IssueKind::MissingId)
        .count();

    let summary = Summary {
        total,
        nominal,
        watch,
        critical,
        posture,
        invalid,
        issues,
        max_severity,
        avg_severity,
        avg_signal_coverage,
        low_coverage_count,
    };

    let mut alerts = Vec::new();
    if critical > 0 {
        push_unique(&mut alerts, &config.alerts.critical_present);
    }
    if critical > SYSTEMIC_CRITICAL_COUNT {
        push_unique(&mut alerts, &config.alerts.systemic_risk);
    }
    if low_coverage_count > 0 {
        push_unique(&mut alerts, &config.alerts.low_signal_coverage);
    }

    (summary, alerts)
}

fn push_unique(alerts: &mut Vec<String>, alert: &str) {
    if !alerts.iter().any(|a| a == alert) {
        alerts.push(alert.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::engine::signals::Signal;

    fn config() -> CapabilityConfig {
        let mut config = CapabilityConfig::new("risk_scheduler");
        config.ready_posture = "schedule_ready".to_string();
        config.degraded_posture = "schedule_degraded".to_string();
        config.alerts.critical_present = "risk_critical_present".to_string();
        config.alerts.systemic_risk = "risk_systemic".to_string();
        config.alerts.low_signal_coverage = "risk_low_coverage".to_string();
        config
    }

    fn classified(index: usize, severity: u32) -> ClassifiedEntity {
        let signals: BTreeMap<Signal, f64> = [
            (Signal::Risk, f64::from(severity)),
            (Signal::Urgency, f64::from(severity)),
            (Signal::Impact, f64::from(severity)),
        ]
        .into_iter()
        .collect();
        ClassifiedEntity {
            index,
            id: format!("e-{index}"),
            name: None,
            severity,
            status: Status::from_severity(severity),
            signal_coverage: 0.333,
            signals,
        }
    }

    #[test]
    fn test_empty_collection_is_ready_without_alerts() {
        let (summary, alerts) = aggregate(&[], Vec::new(), &config());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.posture, "schedule_ready");
        assert_eq!(summary.avg_signal_coverage, 1.0);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_counts_and_posture() {
        let entities = vec![
            classified(0, 10),
            classified(1, 45),
            classified(2, 70),
            classified(3, 39),
        ];
        let (summary, alerts) = aggregate(&entities, Vec::new(), &config());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.nominal, 2);
        assert_eq!(summary.watch, 1);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.max_severity, 70);
        assert_eq!(summary.avg_severity, 41.0);
        assert_eq!(summary.posture, "schedule_degraded");
        assert_eq!(alerts, vec!["risk_critical_present".to_string()]);
    }

    #[test]
    fn test_systemic_alert_needs_more_than_five_criticals() {
        let five: Vec<_> = (0..5).map(|i| classified(i, 90)).collect();
        let (_, alerts) = aggregate(&five, Vec::new(), &config());
        assert_eq!(alerts, vec!["risk_critical_present".to_string()]);

        let six: Vec<_> = (0..6).map(|i| classified(i, 90)).collect();
        let (_, alerts) = aggregate(&six, Vec::new(), &config());
        assert_eq!(
            alerts,
            vec!["risk_critical_present".to_string(), "risk_systemic".to_string()]
        );
    }

    #[test]
    fn test_low_coverage_alert() {
        let mut sparse = classified(0, 20);
        sparse.signal_coverage = 0.111;
        let (summary, alerts) = aggregate(&[sparse], Vec::new(), &config());

        assert_eq!(summary.low_coverage_count, 1);
        assert_eq!(summary.posture, "schedule_ready");
        assert_eq!(alerts, vec!["risk_low_coverage".to_string()]);
    }

    #[test]
    fn test_issues_count_as_invalid() {
        let issues = vec![
            DataQualityIssue {
                index: Some(1),
                kind: IssueKind::MissingId,
                message: "entity at index 1 is missing its id field".to_string(),
            },
            DataQualityIssue {
                index: Some(4),
                kind: IssueKind::MissingId,
                message: "entity at index 4 is missing its id field".to_string(),
            },
        ];
        let (summary, _) = aggregate(&[classified(0, 10)], issues, &config());
        assert_eq!(summary.invalid, 2);
        assert_eq!(summary.issues.len(), 2);
    }

    #[test]
    fn test_low_coverage_threshold_is_configurable() {
        let mut sparse = classified(0, 20);
        sparse.signal_coverage = 0.176;

        let (summary, alerts) = aggregate(&[sparse.clone()], Vec::new(), &config());
        assert_eq!(summary.low_coverage_count, 1);
        assert_eq!(alerts, vec!["risk_low_coverage".to_string()]);

        let lenient = config().with_low_coverage_threshold(0.1);
        let (summary, alerts) = aggregate(&[sparse], Vec::new(), &lenient);
        assert_eq!(summary.low_coverage_count, 0);
        assert!(alerts.is_empty());
    }
}
