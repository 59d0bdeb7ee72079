use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Size};

use super::rtree::{BBox, Bounded, DEFAULT_MAX_ENTRIES, RTree};

/// Paint order tie-break for regions that did not move.
pub const PRIORITY_DEFAULT: u8 = 0;
/// Regions produced by a node moving or resizing.
pub const PRIORITY_MOVED: u8 = 1;

/// What invalidated a region, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirtyKind {
    Content,
    Border,
}

/// One invalidated rectangle, already clipped to the canvas.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DirtyEntry {
    #[serde(flatten)]
    pub rect: Rect,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DirtyKind>,
    #[serde(skip)]
    seq: u64,
}

impl DirtyEntry {
    pub fn new(rect: Rect, priority: u8) -> Self {
        Self {
            rect,
            priority,
            kind: None,
            seq: 0,
        }
    }

    pub fn with_kind(mut self, kind: DirtyKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Insertion order within the current frame.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

// Insertion order is bookkeeping, not identity.
impl PartialEq for DirtyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.rect == other.rect && self.priority == other.priority && self.kind == other.kind
    }
}

impl Eq for DirtyEntry {}

impl Bounded for DirtyEntry {
    fn bbox(&self) -> BBox {
        BBox::from(self.rect)
    }
}

/// Tuning for the dirty-region policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyConfig {
    pub max_entries: usize,
    /// Fraction of the canvas that, once covered, promotes to a full redraw.
    pub coverage_threshold: f32,
}

impl Default for DirtyConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            coverage_threshold: 0.5,
        }
    }
}

/// Invalidated screen regions for the frame being built.
///
/// Regions are clipped on the way in, never merged, and promoted to a single
/// canvas-sized region once their union covers enough of the canvas.
#[derive(Debug, Clone)]
pub struct DirtyRegions {
    canvas: Size,
    tree: RTree<DirtyEntry>,
    coverage: BitVec,
    covered: u32,
    full_redraw: bool,
    next_seq: u64,
    config: DirtyConfig,
}

impl DirtyRegions {
    pub fn new(canvas: Size) -> Self {
        Self::with_config(canvas, DirtyConfig::default())
    }

    pub fn with_config(canvas: Size, config: DirtyConfig) -> Self {
        Self {
            canvas,
            tree: RTree::new(config.max_entries),
            coverage: bitvec![0; canvas.area() as usize],
            covered: 0,
            full_redraw: false,
            next_seq: 0,
            config,
        }
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn needs_full_redraw(&self) -> bool {
        self.full_redraw
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Invalidate `rect` with default priority.
    pub fn mark_dirty(&mut self, rect: Rect) -> bool {
        self.mark(rect, PRIORITY_DEFAULT, None)
    }

    /// Invalidate `rect`. Returns false when nothing was stored: the region
    /// fell outside the canvas or the frame is already a full redraw.
    pub fn mark(&mut self, rect: Rect, priority: u8, kind: Option<DirtyKind>) -> bool {
        if self.full_redraw {
            return false;
        }
        let Some(clipped) = rect.intersection(&self.canvas.to_rect()) else {
            return false;
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.tree.insert(DirtyEntry {
            rect: clipped,
            priority,
            kind,
            seq,
        });

        self.cover(clipped);
        if self.should_promote() {
            self.promote();
        }
        true
    }

    fn cover(&mut self, rect: Rect) {
        let stride = self.canvas.width as usize;
        for row in rect.y..rect.bottom() {
            let start = row as usize * stride + rect.x as usize;
            let cells = &mut self.coverage[start..start + rect.width as usize];
            self.covered += cells.count_zeros() as u32;
            cells.fill(true);
        }
    }

    fn should_promote(&self) -> bool {
        let area = self.canvas.area();
        area > 0 && self.covered as f64 >= self.config.coverage_threshold as f64 * area as f64
    }

    /// Replace everything with one canvas-sized region.
    fn promote(&mut self) {
        self.tree.clear();
        self.full_redraw = true;
        if self.canvas.area() > 0 {
            self.tree.insert(DirtyEntry {
                rect: self.canvas.to_rect(),
                priority: PRIORITY_DEFAULT,
                kind: None,
                seq: self.next_seq,
            });
            self.next_seq += 1;
        }
    }

    /// Adopt new canvas dimensions. Everything stored is discarded and the
    /// next frame is a full redraw.
    pub fn resize(&mut self, canvas: Size) {
        self.canvas = canvas;
        self.coverage = bitvec![0; canvas.area() as usize];
        self.covered = 0;
        self.promote();
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.coverage.fill(false);
        self.covered = 0;
        self.full_redraw = false;
        self.next_seq = 0;
    }

    /// Stored regions in paint order: ascending priority, then insertion order.
    pub fn regions(&self) -> Vec<DirtyEntry> {
        let mut regions: Vec<DirtyEntry> = self.tree.all().into_iter().copied().collect();
        regions.sort_by_key(|entry| (entry.priority, entry.seq));
        regions
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.regions().into_iter().map(|entry| entry.rect).collect()
    }

    /// Stored regions touching `rect`.
    pub fn search(&self, rect: Rect) -> Vec<DirtyEntry> {
        self.tree
            .search(&BBox::from(rect))
            .into_iter()
            .filter(|entry| entry.rect.intersects(&rect))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> DirtyRegions {
        DirtyRegions::new(Size::new(80, 24))
    }

    #[test]
    fn region_outside_canvas_is_dropped() {
        let mut dirty = canvas();
        assert!(!dirty.mark_dirty(Rect::new(80, 0, 5, 5)));
        assert!(!dirty.mark_dirty(Rect::new(0, 30, 5, 5)));
        assert!(dirty.is_empty());
    }

    #[test]
    fn straddling_region_is_clipped() {
        let mut dirty = canvas();
        assert!(dirty.mark_dirty(Rect::new(75, 20, 10, 10)));
        assert_eq!(dirty.rects(), vec![Rect::new(75, 20, 5, 4)]);
    }

    #[test]
    fn half_coverage_promotes_to_full_redraw() {
        let mut dirty = canvas();
        dirty.mark_dirty(Rect::new(0, 0, 50, 20));
        assert!(dirty.needs_full_redraw());
        assert_eq!(
            dirty.regions(),
            vec![DirtyEntry::new(Rect::new(0, 0, 80, 24), PRIORITY_DEFAULT)]
        );
    }

    #[test]
    fn coverage_counts_union_not_sum() {
        let mut dirty = canvas();
        // 40x20 = 800 cells, marked three times over: still below 960.
        for _ in 0..3 {
            dirty.mark_dirty(Rect::new(0, 0, 40, 20));
        }
        assert!(!dirty.needs_full_redraw());
        assert_eq!(dirty.len(), 3);
        dirty.mark_dirty(Rect::new(40, 0, 8, 20));
        assert!(dirty.needs_full_redraw());
    }

    #[test]
    fn marks_after_promotion_are_absorbed() {
        let mut dirty = canvas();
        dirty.mark_dirty(Rect::new(0, 0, 80, 24));
        assert!(!dirty.mark_dirty(Rect::new(1, 1, 1, 1)));
        assert_eq!(dirty.len(), 1);
    }

    #[test]
    fn resize_forces_single_full_region() {
        let mut dirty = canvas();
        dirty.mark_dirty(Rect::new(1, 1, 2, 2));
        dirty.resize(Size::new(100, 30));
        assert!(dirty.needs_full_redraw());
        assert_eq!(dirty.rects(), vec![Rect::new(0, 0, 100, 30)]);

        dirty.clear();
        assert!(!dirty.needs_full_redraw());
        dirty.mark_dirty(Rect::new(90, 25, 10, 5));
        assert_eq!(dirty.rects(), vec![Rect::new(90, 25, 10, 5)]);
    }

    #[test]
    fn regions_sort_by_priority_then_insertion() {
        let mut dirty = canvas();
        dirty.mark(Rect::new(10, 0, 1, 1), PRIORITY_MOVED, None);
        dirty.mark(Rect::new(20, 0, 1, 1), PRIORITY_DEFAULT, Some(DirtyKind::Content));
        dirty.mark(Rect::new(0, 0, 1, 1), PRIORITY_DEFAULT, None);
        let xs: Vec<u16> = dirty.regions().iter().map(|entry| entry.rect.x).collect();
        assert_eq!(xs, vec![20, 0, 10]);
    }

    #[test]
    fn overlapping_regions_are_kept_separately() {
        let mut dirty = canvas();
        dirty.mark_dirty(Rect::new(0, 0, 4, 4));
        dirty.mark_dirty(Rect::new(2, 2, 4, 4));
        assert_eq!(dirty.len(), 2);
        assert_eq!(dirty.search(Rect::new(5, 5, 1, 1)).len(), 1);
    }

    #[test]
    fn entries_serialize_flat() {
        let entry = DirtyEntry::new(Rect::new(0, 0, 80, 24), 0);
        let json = serde_json::to_value(entry).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"x": 0, "y": 0, "width": 80, "height": 24, "priority": 0})
        );
    }
}
