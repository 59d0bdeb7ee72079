//! Host update adapter: owns the scene graph and drives one commit cycle
//! (mutate, layout, paint, clear) per frame.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::json;
use slotmap::SecondaryMap;

use crate::dirty::{DirtyConfig, DirtyEntry, DirtyRegions};
use crate::geometry::{Rect, Size};
use crate::layout::LayoutEngine;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::EngineMetrics;
use crate::render::{OpSink, Painter};
use crate::scene::{NodeId, SceneGraph};
use crate::Result;

pub mod audit;
pub mod commands;
pub mod driver;

use audit::{CommitAudit, CommitAuditEventBuilder, CommitStage};
use commands::{CommandBatch, MutationCommand, NodeKey};

const HOST_TARGET: &str = "room_engine::host";

/// Canvas capabilities reported by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasInfo {
    pub width: u16,
    pub height: u16,
    pub color: bool,
}

impl CanvasInfo {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            color: true,
        }
    }

    pub fn monochrome(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Configuration knobs for the host.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Target frames per second; sets the budget a commit should fit in.
    pub frame_rate: u16,
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Shared metrics accumulator.
    pub metrics: Option<Arc<Mutex<EngineMetrics>>>,
    /// Receives one record per commit stage.
    pub audit: Option<Arc<dyn CommitAudit>>,
    pub dirty: DirtyConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            logger: None,
            metrics: None,
            audit: None,
            dirty: DirtyConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Wall time one commit may take before it counts as a dropped frame.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs(1) / u32::from(self.frame_rate.max(1))
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(EngineMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<EngineMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// What one commit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub epoch: u64,
    pub mutations: usize,
    pub regions: usize,
    pub ops: usize,
    pub full_redraw: bool,
    pub elapsed: Duration,
    /// The commit took longer than the frame budget.
    pub over_budget: bool,
}

/// Owns the retained tree and turns command batches into terminal frames.
///
/// Batches arrive through [`RoomHost::submit`] or a channel from
/// [`RoomHost::sender`] and are coalesced until the next commit. A commit is
/// atomic: either the frame reaches the sink and becomes the committed state,
/// or the dirty set and the previous frame are kept for the next attempt.
pub struct RoomHost {
    scene: SceneGraph,
    keys: HashMap<NodeKey, NodeId>,
    names: SecondaryMap<NodeId, NodeKey>,
    epoch: u64,
    dirty: DirtyRegions,
    layout: LayoutEngine,
    painter: Painter,
    pending: CommandBatch,
    inbox_tx: Sender<CommandBatch>,
    inbox: Receiver<CommandBatch>,
    canvas: CanvasInfo,
    config: RuntimeConfig,
    started: Instant,
}

impl RoomHost {
    pub fn new(canvas: CanvasInfo) -> Self {
        Self::with_config(canvas, RuntimeConfig::default())
    }

    pub fn with_config(canvas: CanvasInfo, config: RuntimeConfig) -> Self {
        let scene = SceneGraph::new();
        let mut keys = HashMap::new();
        let mut names = SecondaryMap::new();
        keys.insert(NodeKey::ROOT, scene.root());
        names.insert(scene.root(), NodeKey::ROOT);
        let (inbox_tx, inbox) = mpsc::channel();

        Self {
            scene,
            keys,
            names,
            epoch: 0,
            dirty: DirtyRegions::with_config(canvas.size(), config.dirty),
            layout: LayoutEngine::new(),
            painter: Painter::new(canvas.size()).with_color(canvas.color),
            pending: CommandBatch::new(),
            inbox_tx,
            inbox,
            canvas,
            config,
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    pub fn canvas(&self) -> CanvasInfo {
        self.canvas
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Queue a batch for the next commit.
    pub fn submit(&mut self, batch: CommandBatch) {
        self.pending.merge(batch);
    }

    /// Channel endpoint for producers living elsewhere. Batches sent here are
    /// applied after directly submitted ones.
    pub fn sender(&self) -> Sender<CommandBatch> {
        self.inbox_tx.clone()
    }

    /// Apply every pending command to the scene graph. Structural only: no
    /// layout or painting happens here. Returns the number of commands
    /// processed.
    pub fn begin_commit(&mut self) -> usize {
        while let Ok(batch) = self.inbox.try_recv() {
            self.pending.merge(batch);
        }
        let batch = std::mem::take(&mut self.pending);
        let count = batch.len();
        if count == 0 {
            return 0;
        }

        let mut ignored = 0;
        for command in batch {
            if !self.apply(&command) {
                ignored += 1;
            }
        }

        self.with_metrics(|metrics| metrics.record_mutations(count));
        self.audit(CommitStage::MutationsApplied, |event| {
            event.detail("commands", count).detail("ignored", ignored);
        });
        count
    }

    /// Apply pending commands, lay out, paint the dirty set into `sink` and
    /// clear it.
    ///
    /// A sink error drops the frame: the committed cell buffer, node bounds
    /// and the dirty set are kept so the next commit repaints the same
    /// damage, and the error is returned.
    pub fn commit(&mut self, sink: &mut impl OpSink) -> Result<CommitReport> {
        let started = Instant::now();
        let mutations = self.begin_commit();

        self.epoch += 1;
        let stats = self.layout.run(&mut self.scene, &mut self.dirty, self.epoch);
        self.audit(CommitStage::LayoutCompleted, |event| {
            event
                .detail("epoch", self.epoch)
                .detail("arranged", stats.arranged)
                .detail("cache_hits", stats.cache_hits)
                .detail("dirty_regions", self.dirty.len());
        });

        let frame = self.painter.paint(&self.scene, &self.dirty);
        if !frame.is_empty() {
            if let Err(err) = sink.write_ops(&frame.ops) {
                self.layout.rollback(&mut self.scene);
                self.with_metrics(EngineMetrics::record_dropped_frame);
                self.audit(CommitStage::FrameDropped, |event| {
                    event.detail("epoch", self.epoch).detail("reason", err.to_string());
                });
                self.log_host_event(
                    LogLevel::Warn,
                    "frame_dropped",
                    [
                        json_kv("epoch", self.epoch),
                        json_kv("reason", err.to_string()),
                        json_kv("retained_regions", self.dirty.len()),
                    ],
                );
                return Err(err);
            }
        }

        let elapsed = started.elapsed();
        let report = CommitReport {
            epoch: self.epoch,
            mutations,
            regions: frame.regions,
            ops: frame.ops.len(),
            full_redraw: frame.full_redraw,
            elapsed,
            over_budget: elapsed > self.config.frame_budget(),
        };
        self.painter.adopt(frame);
        self.dirty.clear();

        self.with_metrics(|metrics| {
            metrics.record_commit(report.regions, report.ops, report.full_redraw);
            if report.over_budget {
                metrics.record_dropped_frame();
            }
        });
        self.audit(CommitStage::PaintCommitted, |event| {
            event
                .detail("epoch", report.epoch)
                .detail("regions", report.regions)
                .detail("ops", report.ops);
        });
        if report.over_budget {
            self.log_host_event(
                LogLevel::Warn,
                "frame_dropped",
                [
                    json_kv("epoch", report.epoch),
                    json_kv("reason", "over_budget"),
                    json_kv("elapsed_us", report.elapsed.as_micros() as u64),
                ],
            );
        }
        self.log_host_event(
            LogLevel::Debug,
            "commit_completed",
            [
                json_kv("epoch", report.epoch),
                json_kv("mutations", report.mutations),
                json_kv("regions", report.regions),
                json_kv("ops", report.ops),
                json_kv("full_redraw", report.full_redraw),
            ],
        );
        Ok(report)
    }

    /// Adopt a new canvas size. The next commit repaints everything.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.update_canvas(CanvasInfo {
            width,
            height,
            ..self.canvas
        });
    }

    /// Adopt new canvas capabilities, as reported on a terminal resize.
    pub fn update_canvas(&mut self, canvas: CanvasInfo) {
        self.canvas = canvas;
        self.dirty.resize(canvas.size());
        self.painter.resize(canvas.size());
        self.painter.set_color(canvas.color);
        self.audit(CommitStage::Resized, |event| {
            event.detail("width", canvas.width).detail("height", canvas.height);
        });
        self.log_host_event(
            LogLevel::Info,
            "resized",
            [
                json_kv("width", canvas.width),
                json_kv("height", canvas.height),
                json_kv("color", canvas.color),
            ],
        );
    }

    pub fn hide(&mut self, key: NodeKey) -> bool {
        self.set_hidden(key, true)
    }

    pub fn unhide(&mut self, key: NodeKey) -> bool {
        self.set_hidden(key, false)
    }

    fn set_hidden(&mut self, key: NodeKey, hidden: bool) -> bool {
        match self.keys.get(&key) {
            Some(&id) => self.scene.set_hidden(id, hidden),
            None => false,
        }
    }

    /// Regions waiting to be painted, already clipped to the canvas.
    pub fn dirty_regions(&self) -> Vec<Rect> {
        self.dirty.rects()
    }

    pub fn dirty_entries(&self) -> Vec<DirtyEntry> {
        self.dirty.regions()
    }

    pub fn needs_full_redraw(&self) -> bool {
        self.dirty.needs_full_redraw()
    }

    /// Committed bounds of a node.
    pub fn bounds(&self, key: NodeKey) -> Option<Rect> {
        self.keys.get(&key).and_then(|id| self.scene.bounds(*id))
    }

    pub fn node_id(&self, key: NodeKey) -> Option<NodeId> {
        self.keys.get(&key).copied()
    }

    /// Topmost visible node covering cell `(x, y)`.
    pub fn hit_test(&self, x: u16, y: u16) -> Option<NodeKey> {
        let mut hit = None;
        let mut stack = vec![self.scene.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.scene.get(id) else {
                continue;
            };
            if node.hidden {
                continue;
            }
            if node.bounds.is_some_and(|bounds| bounds.contains(x, y)) {
                hit = self.names.get(id).copied();
            }
            stack.extend(node.children.iter().rev().copied());
        }
        hit
    }

    /// Log a metrics snapshot when both a logger and metrics are configured.
    pub fn log_metrics_snapshot(&self) {
        let (Some(logger), Some(metrics)) = (self.config.logger.as_ref(), self.config.metrics.as_ref())
        else {
            return;
        };
        if let Ok(guard) = metrics.lock() {
            let event = guard
                .snapshot(self.started.elapsed())
                .to_log_event("room_engine::metrics");
            let _ = logger.log_event(event);
        }
    }

    fn apply(&mut self, command: &MutationCommand) -> bool {
        let applied = match command {
            MutationCommand::CreateContainer { key, .. } | MutationCommand::CreateText { key, .. }
                if self.keys.contains_key(key) =>
            {
                false
            }
            MutationCommand::CreateContainer { key, props } => {
                let id = self.scene.create_container(props.clone());
                self.remember(*key, id);
                true
            }
            MutationCommand::CreateText {
                key,
                content,
                props,
            } => {
                let id = self.scene.create_text_with(content.as_str(), *props);
                self.remember(*key, id);
                true
            }
            MutationCommand::AppendChild { parent, child } => match self.resolve2(*parent, *child) {
                Some((parent, child)) => self.scene.append_child(parent, child),
                None => false,
            },
            MutationCommand::InsertBefore {
                parent,
                child,
                before,
            } => match self.resolve2(*parent, *child) {
                Some((parent, child)) => match self.keys.get(before) {
                    Some(&before) => self.scene.insert_before(parent, child, before),
                    None => self.scene.append_child(parent, child),
                },
                None => false,
            },
            MutationCommand::RemoveChild { parent, child } => match self.resolve2(*parent, *child) {
                Some((parent, child)) => {
                    let removed = self.scene.remove_child(parent, child);
                    self.forget(&removed);
                    !removed.is_empty()
                }
                None => false,
            },
            MutationCommand::SetProps { key, props } => match self.keys.get(key) {
                Some(&id) => self.scene.set_props(id, props.clone()),
                None => false,
            },
            // Identical content is a successful no-op.
            MutationCommand::SetText { key, content } => match self.keys.get(key) {
                Some(&id) if self.scene.get(id).is_some_and(|node| node.text().is_some()) => {
                    self.scene.set_text(id, content);
                    true
                }
                _ => false,
            },
            MutationCommand::ResetChildren { key } => match self.keys.get(key) {
                Some(&id) => {
                    let removed = self.scene.reset_children(id);
                    self.forget(&removed);
                    true
                }
                None => false,
            },
            MutationCommand::SetHidden { key, hidden } => {
                let known = self.keys.contains_key(key);
                self.set_hidden(*key, *hidden);
                known
            }
        };

        if !applied {
            self.log_host_event(
                LogLevel::Debug,
                "command_ignored",
                [json_kv("op", command.name()), json_kv("command", json!(command))],
            );
        }
        applied
    }

    fn resolve2(&self, a: NodeKey, b: NodeKey) -> Option<(NodeId, NodeId)> {
        Some((*self.keys.get(&a)?, *self.keys.get(&b)?))
    }

    fn remember(&mut self, key: NodeKey, id: NodeId) {
        self.keys.insert(key, id);
        self.names.insert(id, key);
    }

    fn forget(&mut self, removed: &[NodeId]) {
        for id in removed {
            if let Some(key) = self.names.remove(*id) {
                self.keys.remove(&key);
            }
        }
    }

    fn with_metrics(&self, update: impl FnOnce(&mut EngineMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut guard);
            }
        }
    }

    fn audit(&self, stage: CommitStage, fill: impl FnOnce(&mut CommitAuditEventBuilder)) {
        if let Some(audit) = self.config.audit.as_ref() {
            let mut builder = CommitAuditEventBuilder::new(stage);
            fill(&mut builder);
            audit.record(builder.finish());
        }
    }

    fn log_host_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, HOST_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::audit::BufferedCommitAudit;
    use super::*;
    use crate::logging::MemorySink;
    use crate::render::{RecordingSink, TerminalOp};
    use crate::scene::{Color, ContainerProps, Props, Style, TextProps};

    fn container(key: u64, props: ContainerProps) -> MutationCommand {
        MutationCommand::CreateContainer {
            key: NodeKey(key),
            props,
        }
    }

    fn text(key: u64, content: &str) -> MutationCommand {
        MutationCommand::CreateText {
            key: NodeKey(key),
            content: content.into(),
            props: TextProps::default(),
        }
    }

    fn append(parent: u64, child: u64) -> MutationCommand {
        MutationCommand::AppendChild {
            parent: NodeKey(parent),
            child: NodeKey(child),
        }
    }

    fn toolbar_batch() -> CommandBatch {
        vec![
            container(1, ContainerProps::row().with_gap(1).with_padding(1)),
            text(2, "A"),
            text(3, "B"),
            text(4, "C"),
            append(0, 1),
            append(1, 2),
            append(1, 3),
            append(1, 4),
        ]
        .into()
    }

    #[test]
    fn commit_lays_out_and_paints_submitted_tree() {
        let mut host = RoomHost::new(CanvasInfo::new(30, 6));
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());

        let report = host.commit(&mut sink).expect("commit");
        assert_eq!(report.epoch, 1);
        assert_eq!(report.mutations, 8);
        assert!(report.full_redraw);
        assert_eq!(host.bounds(NodeKey(3)), Some(Rect::new(3, 1, 1, 1)));
        assert_eq!(sink.screen(Size::new(30, 6))[1].trim_end(), " A B C");
        assert!(host.dirty_regions().is_empty());
        assert!(!host.needs_full_redraw());
    }

    #[test]
    fn batches_are_coalesced_until_commit() {
        let mut host = RoomHost::new(CanvasInfo::new(20, 3));
        let sender = host.sender();
        host.submit(vec![text(1, "first")].into());
        sender
            .send(vec![append(0, 1), text(2, "second"), append(0, 2)].into())
            .expect("send");

        assert_eq!(host.begin_commit(), 4);
        assert_eq!(host.begin_commit(), 0);
        let mut sink = RecordingSink::new();
        host.commit(&mut sink).expect("commit");
        assert_eq!(host.bounds(NodeKey(2)), Some(Rect::new(0, 1, 6, 1)));
    }

    #[test]
    fn incremental_commit_paints_only_changes() {
        let mut host = RoomHost::new(CanvasInfo::new(30, 6));
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());
        host.commit(&mut sink).expect("first");

        host.submit(
            vec![MutationCommand::SetText {
                key: NodeKey(3),
                content: "X".into(),
            }]
            .into(),
        );
        let report = host.commit(&mut sink).expect("second");
        assert!(!report.full_redraw);
        assert_eq!(report.regions, 1);
        assert_eq!(
            sink.last_frame().expect("frame"),
            &[
                TerminalOp::Clear {
                    rect: Rect::new(3, 1, 1, 1)
                },
                TerminalOp::MoveTo { x: 3, y: 1 },
                TerminalOp::Write {
                    text: "X".into(),
                    style: Style::default()
                },
            ]
        );
    }

    #[test]
    fn identical_text_produces_empty_frame() {
        let mut host = RoomHost::new(CanvasInfo::new(30, 6));
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());
        host.commit(&mut sink).expect("first");

        host.submit(
            vec![MutationCommand::SetText {
                key: NodeKey(2),
                content: "A".into(),
            }]
            .into(),
        );
        let report = host.commit(&mut sink).expect("second");
        assert_eq!(report.ops, 0);
        assert_eq!(sink.frames().len(), 1);
    }

    #[test]
    fn failed_sink_retains_damage_for_next_tick() {
        let audit = Arc::new(BufferedCommitAudit::new());
        let mut config = RuntimeConfig::default();
        config.enable_metrics();
        config.audit = Some(audit.clone());
        let mut host = RoomHost::with_config(CanvasInfo::new(30, 6), config);
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());
        host.commit(&mut sink).expect("first");

        host.submit(
            vec![MutationCommand::SetText {
                key: NodeKey(4),
                content: "Z".into(),
            }]
            .into(),
        );
        sink.fail_next();
        assert!(host.commit(&mut sink).is_err());
        assert_eq!(host.dirty_regions(), vec![Rect::new(5, 1, 1, 1)]);
        assert!(audit.stages().contains(&CommitStage::FrameDropped));

        host.commit(&mut sink).expect("retry");
        assert!(host.dirty_regions().is_empty());
        assert_eq!(sink.screen(Size::new(30, 6))[1].trim_end(), " A B Z");

        let metrics = host.config().metrics_handle().expect("metrics");
        let metrics = metrics.lock().expect("lock");
        assert_eq!(metrics.dropped_frames(), 1);
        assert_eq!(metrics.commits(), 2);
    }

    #[test]
    fn dropped_frame_keeps_committed_bounds() {
        let mut host = RoomHost::new(CanvasInfo::new(10, 4));
        let mut sink = RecordingSink::new();
        host.submit(vec![text(1, "a"), text(2, "b"), append(0, 1), append(0, 2)].into());
        host.commit(&mut sink).expect("first");
        assert_eq!(host.bounds(NodeKey(2)), Some(Rect::new(0, 1, 1, 1)));

        host.submit(
            vec![MutationCommand::SetText {
                key: NodeKey(1),
                content: "a\nmore".into(),
            }]
            .into(),
        );
        sink.fail_next();
        assert!(host.commit(&mut sink).is_err());
        assert_eq!(host.bounds(NodeKey(1)), Some(Rect::new(0, 0, 1, 1)));
        assert_eq!(host.bounds(NodeKey(2)), Some(Rect::new(0, 1, 1, 1)));
        assert_eq!(host.hit_test(0, 1), Some(NodeKey(2)));

        host.commit(&mut sink).expect("retry");
        assert_eq!(host.bounds(NodeKey(2)), Some(Rect::new(0, 2, 1, 1)));
        let screen = sink.screen(Size::new(10, 4));
        assert_eq!(screen[0].trim_end(), "a");
        assert_eq!(screen[1].trim_end(), "more");
        assert_eq!(screen[2].trim_end(), "b");
    }

    #[test]
    fn resize_forces_full_redraw_until_painted() {
        let mut host = RoomHost::new(CanvasInfo::new(30, 6));
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());
        host.commit(&mut sink).expect("first");

        host.resize(100, 30);
        assert!(host.needs_full_redraw());
        assert_eq!(host.dirty_regions(), vec![Rect::new(0, 0, 100, 30)]);

        let report = host.commit(&mut sink).expect("after resize");
        assert!(report.full_redraw);
        assert_eq!(
            sink.last_frame().and_then(|ops| ops.first()),
            Some(&TerminalOp::Clear {
                rect: Rect::new(0, 0, 100, 30)
            })
        );
        assert!(!host.needs_full_redraw());
    }

    #[test]
    fn hide_and_unhide_keep_identity() {
        let mut host = RoomHost::new(CanvasInfo::new(30, 6));
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());
        host.commit(&mut sink).expect("first");

        assert!(host.hide(NodeKey(2)));
        host.commit(&mut sink).expect("hidden");
        assert!(host.bounds(NodeKey(2)).is_some_and(|rect| rect.is_empty()));
        assert_eq!(host.bounds(NodeKey(3)), Some(Rect::new(1, 1, 1, 1)));
        assert_eq!(sink.screen(Size::new(30, 6))[1].trim_end(), " B C");

        assert!(host.unhide(NodeKey(2)));
        host.commit(&mut sink).expect("shown");
        assert_eq!(sink.screen(Size::new(30, 6))[1].trim_end(), " A B C");
        assert!(!host.hide(NodeKey(99)));
    }

    #[test]
    fn removal_erases_and_forgets_subtree() {
        let mut host = RoomHost::new(CanvasInfo::new(30, 6));
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());
        host.commit(&mut sink).expect("first");

        host.submit(
            vec![MutationCommand::RemoveChild {
                parent: NodeKey::ROOT,
                child: NodeKey(1),
            }]
            .into(),
        );
        host.commit(&mut sink).expect("removed");
        assert!(host.bounds(NodeKey(1)).is_none());
        assert!(host.bounds(NodeKey(3)).is_none());
        assert!(sink.screen(Size::new(30, 6)).iter().all(|row| row.trim().is_empty()));

        // The key is free again.
        host.submit(vec![text(3, "again"), append(0, 3)].into());
        host.commit(&mut sink).expect("reused");
        assert_eq!(host.bounds(NodeKey(3)), Some(Rect::new(0, 0, 5, 1)));
    }

    #[test]
    fn remounted_node_is_painted_again() {
        let mut host = RoomHost::new(CanvasInfo::new(10, 2));
        let mut sink = RecordingSink::new();
        host.submit(vec![text(1, "hello"), append(0, 1)].into());
        host.commit(&mut sink).expect("mounted");
        assert_eq!(sink.screen(Size::new(10, 2))[0].trim_end(), "hello");

        host.submit(vec![container(9, ContainerProps::column()), append(9, 1)].into());
        host.commit(&mut sink).expect("parked");
        assert_eq!(sink.screen(Size::new(10, 2))[0].trim_end(), "");
        assert_eq!(host.hit_test(0, 0), Some(NodeKey::ROOT));

        host.submit(vec![append(0, 1)].into());
        let report = host.commit(&mut sink).expect("remounted");
        assert!(report.ops > 0);
        assert_eq!(sink.screen(Size::new(10, 2))[0].trim_end(), "hello");
        assert_eq!(host.bounds(NodeKey(1)), Some(Rect::new(0, 0, 5, 1)));
    }

    #[test]
    fn hit_test_returns_deepest_visible_node() {
        let mut host = RoomHost::new(CanvasInfo::new(30, 6));
        let mut sink = RecordingSink::new();
        host.submit(toolbar_batch());
        host.commit(&mut sink).expect("commit");

        assert_eq!(host.hit_test(3, 1), Some(NodeKey(3)));
        assert_eq!(host.hit_test(2, 1), Some(NodeKey(1)));
        assert_eq!(host.hit_test(0, 5), Some(NodeKey::ROOT));
        host.hide(NodeKey(1));
        host.commit(&mut sink).expect("hidden");
        assert_eq!(host.hit_test(3, 1), Some(NodeKey::ROOT));
        assert_eq!(host.hit_test(40, 1), None);
    }

    #[test]
    fn invalid_commands_are_logged_and_skipped() {
        let sink_log = Arc::new(MemorySink::new());
        let config = RuntimeConfig {
            logger: Some(Logger::from_shared(sink_log.clone())),
            ..RuntimeConfig::default()
        };
        let mut host = RoomHost::with_config(CanvasInfo::new(10, 2), config);
        host.submit(
            vec![
                text(1, "one"),
                text(1, "duplicate"),
                append(0, 7),
                append(1, 0),
                MutationCommand::SetProps {
                    key: NodeKey(1),
                    props: Props::Container(ContainerProps::row()),
                },
                append(0, 1),
            ]
            .into(),
        );
        let mut sink = RecordingSink::new();
        host.commit(&mut sink).expect("commit");

        let ignored = sink_log
            .messages()
            .iter()
            .filter(|message| *message == "command_ignored")
            .count();
        assert_eq!(ignored, 4);
        assert_eq!(sink.screen(Size::new(10, 2))[0].trim_end(), "one");
        assert!(sink_log.messages().contains(&"commit_completed".to_string()));
    }

    #[test]
    fn monochrome_canvas_paints_without_color() {
        let mut host = RoomHost::new(CanvasInfo::new(5, 1).monochrome());
        let styled = Style {
            fg: Color::Rgb(255, 0, 0),
            underline: true,
            ..Style::default()
        };
        host.submit(
            vec![
                MutationCommand::CreateText {
                    key: NodeKey(1),
                    content: "warn".into(),
                    props: TextProps {
                        style: styled,
                        ..TextProps::default()
                    },
                },
                append(0, 1),
            ]
            .into(),
        );
        let mut sink = RecordingSink::new();
        host.commit(&mut sink).expect("commit");
        assert!(sink.ops().any(|op| matches!(
            op,
            TerminalOp::Write { style, .. } if *style == styled.without_color()
        )));
    }

    #[test]
    fn frame_budget_follows_frame_rate() {
        let config = RuntimeConfig {
            frame_rate: 50,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.frame_budget(), Duration::from_millis(20));
        let stalled = RuntimeConfig {
            frame_rate: 0,
            ..RuntimeConfig::default()
        };
        assert_eq!(stalled.frame_budget(), Duration::from_secs(1));
    }
}
