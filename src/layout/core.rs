use crate::dirty::{DirtyKind, DirtyRegions, PRIORITY_DEFAULT, PRIORITY_MOVED};
use crate::geometry::{Rect, Size};
use crate::scene::{ContainerProps, Direction, Edges, NodeId, NodeKind, SceneGraph, WrapMode};

use super::flex::{FlexItem, main_axis_spans};
use super::text::measure_text;

/// Size limits handed down during measurement. `None` maxima are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Constraints {
    pub min_width: u16,
    pub max_width: Option<u16>,
    pub min_height: u16,
    pub max_height: Option<u16>,
}

impl Constraints {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn loose(max: Size) -> Self {
        Self {
            max_width: Some(max.width),
            max_height: Some(max.height),
            ..Self::default()
        }
    }

    pub fn tight(size: Size) -> Self {
        Self {
            min_width: size.width,
            max_width: Some(size.width),
            min_height: size.height,
            max_height: Some(size.height),
        }
    }

    /// Bring `size` inside the limits. Maxima win over minima.
    pub fn clamp(&self, size: Size) -> Size {
        let clamp_axis = |value: u16, min: u16, max: Option<u16>| {
            let value = value.max(min);
            max.map_or(value, |max| value.min(max))
        };
        Size::new(
            clamp_axis(size.width, self.min_width, self.max_width),
            clamp_axis(size.height, self.min_height, self.max_height),
        )
    }

    /// Stable 64-bit key for the measure cache.
    pub fn fingerprint(&self) -> u64 {
        let encode = |max: Option<u16>| max.map_or(u32::MAX, u32::from).to_le_bytes();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.min_width.to_le_bytes());
        hasher.update(&encode(self.max_width));
        hasher.update(&self.min_height.to_le_bytes());
        hasher.update(&encode(self.max_height));
        let mut key = [0u8; 8];
        key.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(key)
    }
}

/// Counters from one layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    pub measured: usize,
    pub cache_hits: usize,
    pub arranged: usize,
    pub regions_marked: usize,
}

/// Two-pass measure/arrange solver over a [`SceneGraph`].
///
/// Measurement is bottom-up and memoised per node for the current epoch.
/// Arrangement walks top-down once, writes bounds, and reports every bounds
/// change or pending repaint to the dirty regions.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    last: LayoutStats,
    journal: Vec<Placement>,
}

/// Bounds a node held before the latest run overwrote them.
#[derive(Debug, Clone, Copy)]
struct Placement {
    id: NodeId,
    bounds: Option<Rect>,
    previous: Option<Rect>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats of the most recent [`LayoutEngine::run`].
    pub fn last_stats(&self) -> LayoutStats {
        self.last
    }

    /// Lay out everything attached to the root inside the dirty canvas.
    pub fn run(&mut self, scene: &mut SceneGraph, dirty: &mut DirtyRegions, epoch: u64) -> LayoutStats {
        let canvas = dirty.canvas();
        let mut pass = Pass {
            scene,
            dirty: Some(dirty),
            epoch,
            stats: LayoutStats::default(),
            journal: Vec::new(),
        };

        for rect in pass.scene.take_pending_erase() {
            pass.mark(rect, PRIORITY_MOVED, None);
        }

        let root = pass.scene.root();
        pass.arrange(root, canvas.to_rect(), canvas);

        self.last = pass.stats;
        self.journal = pass.journal;
        self.last
    }

    /// Put back every bounds the latest [`LayoutEngine::run`] changed, for a
    /// frame that never reached the terminal. Dirty regions are left alone.
    pub fn rollback(&mut self, scene: &mut SceneGraph) {
        for placement in self.journal.drain(..).rev() {
            if let Some(node) = scene.get_mut(placement.id) {
                node.bounds = placement.bounds;
                node.previous_bounds = placement.previous;
            }
        }
    }

    /// Intrinsic border-box size of `id` under `constraints`.
    pub fn measure(&mut self, scene: &mut SceneGraph, id: NodeId, constraints: Constraints, epoch: u64) -> Size {
        let mut pass = Pass {
            scene,
            dirty: None,
            epoch,
            stats: LayoutStats::default(),
            journal: Vec::new(),
        };
        pass.measure(id, constraints)
    }
}

struct Pass<'a> {
    scene: &'a mut SceneGraph,
    dirty: Option<&'a mut DirtyRegions>,
    epoch: u64,
    stats: LayoutStats,
    journal: Vec<Placement>,
}

impl Pass<'_> {
    fn mark(&mut self, rect: Rect, priority: u8, kind: Option<DirtyKind>) {
        let Some(dirty) = self.dirty.as_deref_mut() else {
            return;
        };
        if dirty.mark(rect, priority, kind) {
            self.stats.regions_marked += 1;
        }
    }

    fn measure(&mut self, id: NodeId, constraints: Constraints) -> Size {
        let key = constraints.fingerprint();
        let Some(node) = self.scene.get(id) else {
            return Size::default();
        };
        if let Some(size) = node.cache.lookup(self.epoch, key) {
            self.stats.cache_hits += 1;
            return size;
        }

        let size = if node.is_collapsed() {
            Size::default()
        } else {
            match &node.kind {
                NodeKind::Text(text) => constraints.clamp(measure_text(
                    &text.content,
                    text.props.wrap,
                    constraints.max_width,
                )),
                NodeKind::Container(props) => {
                    let props = props.clone();
                    self.measure_container(id, &props, constraints)
                }
            }
        };

        self.stats.measured += 1;
        if let Some(node) = self.scene.get_mut(id) {
            node.cache.store(self.epoch, key, size);
        }
        size
    }

    fn measure_container(&mut self, id: NodeId, props: &ContainerProps, constraints: Constraints) -> Size {
        let chrome = props.chrome();
        let explicit_width = props.width.resolve(constraints.max_width);
        let explicit_height = props.height.resolve(constraints.max_height);
        let content_width = explicit_width
            .or(constraints.max_width)
            .map(|w| w.saturating_sub(chrome.horizontal()));
        let content_height = explicit_height
            .or(constraints.max_height)
            .map(|h| h.saturating_sub(chrome.vertical()));

        let direction = props.direction;
        let content_cross = cross_of(direction, content_width, content_height);

        let mut main: u32 = 0;
        let mut cross: u16 = 0;
        let mut visible: u32 = 0;
        for child in self.scene.children(id).to_vec() {
            if self.is_collapsed(child) {
                continue;
            }
            let margin = self.margin_of(child);
            let (margin_main, margin_cross) = along(direction, margin.horizontal(), margin.vertical());
            let child_constraints = constraints_for(
                direction,
                None,
                content_cross.map(|c| c.saturating_sub(margin_cross)),
            );
            let size = self.measure(child, child_constraints);
            let (child_main, child_cross) = along(direction, size.width, size.height);
            main += child_main as u32 + margin_main as u32;
            cross = cross.max(child_cross.saturating_add(margin_cross));
            visible += 1;
        }
        main += props.gap as u32 * visible.saturating_sub(1);
        let main = main.min(u16::MAX as u32) as u16;

        let (content_w, content_h) = along(direction, main, cross);
        let width = explicit_width.unwrap_or(content_w.saturating_add(chrome.horizontal()));
        let height = explicit_height.unwrap_or(content_h.saturating_add(chrome.vertical()));
        constraints.clamp(Size::new(width, height))
    }

    fn is_collapsed(&self, id: NodeId) -> bool {
        self.scene.get(id).is_none_or(|node| node.is_collapsed())
    }

    fn margin_of(&self, id: NodeId) -> Edges {
        self.scene
            .get(id)
            .and_then(|node| node.container())
            .map(|props| props.margin)
            .unwrap_or_default()
    }

    /// Top-down placement. `slot` is the space the parent reserved for the
    /// node, margins included; `basis` is the parent's content size that
    /// percentages resolve against.
    fn arrange(&mut self, root: NodeId, slot: Rect, basis: Size) {
        let mut stack = vec![(root, slot, basis)];
        while let Some((id, slot, basis)) = stack.pop() {
            if self.is_collapsed(id) {
                self.collapse(id, slot);
                continue;
            }
            let Some(node) = self.scene.get(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Text(_) => self.place(id, slot),
                NodeKind::Container(props) => {
                    let props = props.clone();
                    let inner = slot.inset(
                        props.margin.top,
                        props.margin.right,
                        props.margin.bottom,
                        props.margin.left,
                    );
                    let margin = props.margin;
                    let width = props
                        .width
                        .resolve(Some(basis.width.saturating_sub(margin.horizontal())))
                        .map_or(inner.width, |w| w.min(inner.width));
                    let height = props
                        .height
                        .resolve(Some(basis.height.saturating_sub(margin.vertical())))
                        .map_or(inner.height, |h| h.min(inner.height));
                    let bounds = Rect::new(inner.x, inner.y, width, height);
                    self.place(id, bounds);

                    let chrome = props.chrome();
                    let content = bounds.inset(chrome.top, chrome.right, chrome.bottom, chrome.left);
                    let slots = self.child_slots(id, &props, content);
                    stack.extend(
                        slots
                            .into_iter()
                            .rev()
                            .map(|(child, slot)| (child, slot, content.size())),
                    );
                }
            }
        }
    }

    /// Compute the slot of every child of a container whose content box is
    /// `content`. Collapsed children get an empty slot at the content origin.
    fn child_slots(&mut self, id: NodeId, props: &ContainerProps, content: Rect) -> Vec<(NodeId, Rect)> {
        let direction = props.direction;
        let (content_main, content_cross) = along(direction, content.width, content.height);
        let children = self.scene.children(id).to_vec();

        let mut visible = Vec::new();
        let mut items = Vec::new();
        let mut crosses = Vec::new();
        for &child in &children {
            if self.is_collapsed(child) {
                continue;
            }
            let (item, cross) = self.flex_item(child, direction, content_main, content_cross);
            visible.push(child);
            items.push(item);
            crosses.push(cross);
        }

        let spans = main_axis_spans(content_main, props.gap, &items);
        let (main_start, cross_start) = along(direction, content.x, content.y);
        let main_end = main_start as u32 + content_main as u32;

        let mut slots = Vec::with_capacity(children.len());
        let mut cursor = main_start as u32;
        let mut placed = visible.into_iter().zip(spans).zip(crosses).peekable();
        for &child in &children {
            let Some(((_, span), cross)) = placed.next_if(|((next, _), _)| *next == child) else {
                slots.push((child, Rect::new(content.x, content.y, 0, 0)));
                continue;
            };
            let start = cursor.min(main_end);
            let length = (span as u32).min(main_end - start);
            let cross = if direction == Direction::Row && self.wraps_text(child) {
                let wrapped = self.measure(child, constraints_for(direction, Some(length as u16), Some(content_cross)));
                wrapped.height.min(content_cross)
            } else {
                cross
            };
            let (x, y) = along(direction, start as u16, cross_start);
            let (width, height) = along(direction, length as u16, cross);
            slots.push((child, Rect::new(x, y, width, height)));
            cursor = cursor + span as u32 + props.gap as u32;
        }
        slots
    }

    /// Main-axis claim and cross-axis slot extent for one visible child.
    fn flex_item(&mut self, child: NodeId, direction: Direction, content_main: u16, content_cross: u16) -> (FlexItem, u16) {
        let Some(node) = self.scene.get(child) else {
            return (FlexItem::Fixed(0), 0);
        };
        match node.container() {
            Some(props) => {
                let margin = props.margin;
                let flex = props.flex;
                let main_dim = match direction {
                    Direction::Row => props.width,
                    Direction::Column => props.height,
                };
                let (margin_main, margin_cross) = along(direction, margin.horizontal(), margin.vertical());
                if flex > 0 {
                    return (FlexItem::Flexible(flex), content_cross);
                }
                let available = content_main.saturating_sub(margin_main);
                let main = match main_dim.resolve(Some(available)) {
                    Some(explicit) => explicit.min(available),
                    None => {
                        let constraints = constraints_for(
                            direction,
                            None,
                            Some(content_cross.saturating_sub(margin_cross)),
                        );
                        let size = self.measure(child, constraints);
                        along(direction, size.width, size.height).0
                    }
                };
                (FlexItem::Fixed(main.saturating_add(margin_main)), content_cross)
            }
            None => {
                let constraints = constraints_for(direction, None, Some(content_cross));
                let size = self.measure(child, constraints);
                let (main, cross) = along(direction, size.width, size.height);
                (FlexItem::Fixed(main), cross.min(content_cross))
            }
        }
    }

    fn wraps_text(&self, id: NodeId) -> bool {
        self.scene
            .get(id)
            .and_then(|node| node.text())
            .is_some_and(|text| text.props.wrap == WrapMode::Wrap)
    }

    /// Zero the bounds of a collapsed node and its whole subtree.
    fn collapse(&mut self, id: NodeId, slot: Rect) {
        let empty = Rect::new(slot.x, slot.y, 0, 0);
        for node in self.scene.preorder(id) {
            self.place(node, empty);
        }
    }

    /// Commit bounds and report what needs repainting.
    fn place(&mut self, id: NodeId, bounds: Rect) {
        self.stats.arranged += 1;
        let Some(node) = self.scene.get_mut(id) else {
            return;
        };
        let repaint = std::mem::take(&mut node.repaint);
        let kind = match node.container() {
            Some(props) if props.border.is_some() => DirtyKind::Border,
            _ => DirtyKind::Content,
        };
        let before = Placement {
            id,
            bounds: node.bounds,
            previous: node.previous_bounds,
        };
        match node.commit_bounds(bounds) {
            Some(previous) => {
                self.journal.push(before);
                if let Some(previous) = previous {
                    self.mark(previous, PRIORITY_MOVED, Some(kind));
                }
                self.mark(bounds, PRIORITY_MOVED, Some(kind));
            }
            None if repaint => self.mark(bounds, PRIORITY_DEFAULT, Some(kind)),
            None => {}
        }
    }
}

/// Reorder a (horizontal, vertical) pair into (main, cross) for `direction`.
/// The mapping is its own inverse.
fn along<T>(direction: Direction, horizontal: T, vertical: T) -> (T, T) {
    match direction {
        Direction::Row => (horizontal, vertical),
        Direction::Column => (vertical, horizontal),
    }
}

fn cross_of(direction: Direction, width: Option<u16>, height: Option<u16>) -> Option<u16> {
    along(direction, width, height).1
}

fn constraints_for(direction: Direction, main: Option<u16>, cross: Option<u16>) -> Constraints {
    let (max_width, max_height) = along(direction, main, cross);
    Constraints {
        max_width,
        max_height,
        ..Constraints::default()
    }
}
