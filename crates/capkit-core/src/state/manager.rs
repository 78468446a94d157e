//! Capability manager - stateful evaluate/dispatch wrapper.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::history::{History, HistoryEntry};
use crate::clock::{Clock, IdGenerator, UuidIds};
use crate::engine::{CapabilityToolkit, DispatchOptions};
use crate::error::Result;
use crate::protocol::TaskRequest;
use crate::report::EvaluationReport;

/// Default number of evaluations kept per manager.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Wraps a toolkit with an agent identity, a clock and a bounded history.
///
/// Safe to share between threads; `evaluate` calls on one manager are
/// serialized on its history lock.
pub struct CapabilityManager {
    toolkit: Arc<CapabilityToolkit>,
    local_agent_id: String,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    history: Mutex<History>,
}

impl CapabilityManager {
    pub fn new(
        toolkit: Arc<CapabilityToolkit>,
        local_agent_id: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            toolkit,
            local_agent_id: local_agent_id.into(),
            clock,
            ids: Arc::new(UuidIds),
            history: Mutex::new(History::new(DEFAULT_HISTORY_CAPACITY)),
        }
    }

    /// Manager acting as the capability's default agent
    pub fn with_default_agent(toolkit: Arc<CapabilityToolkit>, clock: Arc<dyn Clock>) -> Self {
        let agent = toolkit.config().default_agent_id.clone();
        Self::new(toolkit, agent, clock)
    }

    /// Resize the history buffer, dropping anything recorded so far
    pub fn with_history_capacity(self, capacity: usize) -> Self {
        Self {
            history: Mutex::new(History::new(capacity)),
            ..self
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn toolkit(&self) -> &CapabilityToolkit {
        &self.toolkit
    }

    pub fn local_agent_id(&self) -> &str {
        &self.local_agent_id
    }

    pub fn history_capacity(&self) -> usize {
        self.lock_history().capacity()
    }

    /// Evaluate `payload` and record the report.
    ///
    /// Nothing is recorded if the evaluation fails.
    pub fn evaluate(&self, payload: &Value) -> Result<EvaluationReport> {
        let mut history = self.lock_history();

        let report = self.toolkit.evaluate(payload, self.clock.as_ref())?;
        history.push(HistoryEntry {
            report: report.clone(),
            timestamp: self.clock.now_ms(),
        });

        tracing::debug!(
            capability = %self.toolkit.capability_id(),
            agent = %self.local_agent_id,
            history = history.len(),
            "Recorded evaluation"
        );

        Ok(report)
    }

    /// Dispatch `report` as this manager's agent
    pub fn build_tasks(&self, report: &EvaluationReport) -> Result<Vec<TaskRequest>> {
        let options = DispatchOptions::new()
            .from_agent(&self.local_agent_id)
            .with_clock(self.clock.as_ref())
            .with_ids(self.ids.as_ref());
        self.toolkit.to_tasks(report, options)
    }

    /// The newest `limit` entries, newest first; `None` returns the whole buffer
    pub fn list_history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        self.lock_history().recent(limit)
    }

    // The buffer only ever holds complete entries, so a poisoned lock is
    // still consistent.
    fn lock_history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CapabilityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityManager")
            .field("capability", &self.toolkit.capability_id())
            .field("local_agent_id", &self.local_agent_id)
            .field("history", &self.lock_history().len())
            .finish()
    }
}
