use crate::logging::{LogEvent, LogFields, LogLevel};
use serde::Serialize;
use std::time::Duration;

/// Running counters for the commit pipeline.
#[derive(Debug, Default, Clone)]
pub struct EngineMetrics {
    commits: u64,
    mutations: u64,
    dirty_regions: u64,
    full_redraws: u64,
    ops_emitted: u64,
    dropped_frames: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mutations(&mut self, count: usize) {
        self.mutations = self.mutations.saturating_add(count as u64);
    }

    /// A frame reached the sink.
    pub fn record_commit(&mut self, regions: usize, ops: usize, full_redraw: bool) {
        self.commits = self.commits.saturating_add(1);
        self.dirty_regions = self.dirty_regions.saturating_add(regions as u64);
        self.ops_emitted = self.ops_emitted.saturating_add(ops as u64);
        if full_redraw {
            self.full_redraws = self.full_redraws.saturating_add(1);
        }
    }

    pub fn record_dropped_frame(&mut self) {
        self.dropped_frames = self.dropped_frames.saturating_add(1);
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            commits: self.commits,
            mutations: self.mutations,
            dirty_regions: self.dirty_regions,
            full_redraws: self.full_redraws,
            ops_emitted: self.ops_emitted,
            dropped_frames: self.dropped_frames,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub commits: u64,
    pub mutations: u64,
    pub dirty_regions: u64,
    pub full_redraws: u64,
    pub ops_emitted: u64,
    pub dropped_frames: u64,
}

impl MetricSnapshot {
    pub fn as_fields(&self) -> LogFields {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => LogFields::new(),
        }
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "engine_metrics", self.as_fields())
    }
}
