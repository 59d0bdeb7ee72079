//! Commit audit hooks.
//!
//! Callers that want to observe the pipeline (tests, tracing overlays) install
//! a [`CommitAudit`] on the host and receive one record per stage.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Checkpoints of one commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    /// Pending mutation commands were applied to the scene graph.
    MutationsApplied,
    /// The layout pass finished and dirty regions are known.
    LayoutCompleted,
    /// The frame reached the sink and became the committed state.
    PaintCommitted,
    /// The frame was lost: the sink failed or the commit overran its budget.
    FrameDropped,
    /// The canvas changed size.
    Resized,
}

#[derive(Debug, Clone)]
pub struct CommitAuditEvent {
    pub timestamp: SystemTime,
    pub stage: CommitStage,
    pub details: Vec<(String, Value)>,
}

impl CommitAuditEvent {
    fn new(stage: CommitStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct CommitAuditEventBuilder {
    event: CommitAuditEvent,
}

impl CommitAuditEventBuilder {
    pub fn new(stage: CommitStage) -> Self {
        Self {
            event: CommitAuditEvent::new(stage),
        }
    }

    pub fn detail(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> CommitAuditEvent {
        self.event
    }
}

pub trait CommitAudit: Send + Sync {
    fn record(&self, event: CommitAuditEvent);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullCommitAudit;

impl CommitAudit for NullCommitAudit {
    fn record(&self, _event: CommitAuditEvent) {}
}

/// Buffers records in memory.
#[derive(Debug, Default)]
pub struct BufferedCommitAudit {
    events: Mutex<Vec<CommitAuditEvent>>,
}

impl BufferedCommitAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<CommitStage> {
        self.events
            .lock()
            .map(|events| events.iter().map(|event| event.stage).collect())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<CommitAuditEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl CommitAudit for BufferedCommitAudit {
    fn record(&self, event: CommitAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_details() {
        let mut builder = CommitAuditEventBuilder::new(CommitStage::Resized);
        builder.detail("width", 100).detail("height", 30);
        let event = builder.finish();
        assert_eq!(event.stage, CommitStage::Resized);
        assert_eq!(event.detail("width"), Some(&Value::from(100)));
        assert!(event.detail("depth").is_none());
    }

    #[test]
    fn buffered_audit_drains_in_order() {
        let audit = BufferedCommitAudit::new();
        audit.record(CommitAuditEventBuilder::new(CommitStage::MutationsApplied).finish());
        audit.record(CommitAuditEventBuilder::new(CommitStage::LayoutCompleted).finish());
        assert_eq!(
            audit.stages(),
            vec![CommitStage::MutationsApplied, CommitStage::LayoutCompleted]
        );
        assert_eq!(audit.drain().len(), 2);
        assert!(audit.stages().is_empty());
    }
}
