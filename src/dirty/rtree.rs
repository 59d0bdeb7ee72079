//! Bulk-insertion R-tree over axis-aligned rectangles.
//!
//! Insertion descends by least-area enlargement and splits overflowing nodes
//! with the classic margin-then-overlap heuristic. Enumeration walks the tree
//! with an explicit stack.

use crate::geometry::Rect;

pub const DEFAULT_MAX_ENTRIES: usize = 9;

/// Smallest fan-out the split heuristic can work with.
const MIN_FANOUT: usize = 4;

/// Axis-aligned box with exclusive max edges, in signed space so union and
/// enlargement never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BBox {
    pub const EMPTY: BBox = BBox {
        min_x: i32::MAX,
        min_y: i32::MAX,
        max_x: i32::MIN,
        max_y: i32::MIN,
    };

    pub fn area(&self) -> i64 {
        if self.max_x < self.min_x || self.max_y < self.min_y {
            return 0;
        }
        (self.max_x - self.min_x) as i64 * (self.max_y - self.min_y) as i64
    }

    /// Half perimeter.
    pub fn margin(&self) -> i64 {
        if self.max_x < self.min_x || self.max_y < self.min_y {
            return 0;
        }
        (self.max_x - self.min_x) as i64 + (self.max_y - self.min_y) as i64
    }

    pub fn extend(&mut self, other: &BBox) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        let mut merged = *self;
        merged.extend(other);
        merged
    }

    pub fn intersection_area(&self, other: &BBox) -> i64 {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        (max_x - min_x).max(0) as i64 * (max_y - min_y).max(0) as i64
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        other.min_x <= self.max_x
            && other.min_y <= self.max_y
            && other.max_x >= self.min_x
            && other.max_y >= self.min_y
    }

    pub fn contains(&self, other: &BBox) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }
}

impl From<Rect> for BBox {
    fn from(rect: Rect) -> Self {
        BBox {
            min_x: rect.x as i32,
            min_y: rect.y as i32,
            max_x: rect.right() as i32,
            max_y: rect.bottom() as i32,
        }
    }
}

/// Anything the tree can index.
pub trait Bounded {
    fn bbox(&self) -> BBox;
}

impl Bounded for Rect {
    fn bbox(&self) -> BBox {
        BBox::from(*self)
    }
}

#[derive(Debug, Clone)]
enum Children<T> {
    Leaf(Vec<T>),
    Branch(Vec<Node<T>>),
}

#[derive(Debug, Clone)]
struct Node<T> {
    bbox: BBox,
    height: usize,
    children: Children<T>,
}

impl<T: Bounded> Node<T> {
    fn leaf() -> Self {
        Self {
            bbox: BBox::EMPTY,
            height: 1,
            children: Children::Leaf(Vec::new()),
        }
    }

    fn len(&self) -> usize {
        match &self.children {
            Children::Leaf(items) => items.len(),
            Children::Branch(nodes) => nodes.len(),
        }
    }

    fn recalc(&mut self) {
        self.bbox = match &self.children {
            Children::Leaf(items) => dist_bbox(items, |item| item.bbox()),
            Children::Branch(nodes) => dist_bbox(nodes, |node| node.bbox),
        };
    }
}

#[derive(Debug, Clone)]
pub struct RTree<T> {
    root: Node<T>,
    max_entries: usize,
    min_entries: usize,
    len: usize,
}

impl<T: Bounded> Default for RTree<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl<T: Bounded> RTree<T> {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(MIN_FANOUT);
        let min_entries = 2usize.max((max_entries as f64 * 0.4).ceil() as usize);
        Self {
            root: Node::leaf(),
            max_entries,
            min_entries,
            len: 0,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn min_entries(&self) -> usize {
        self.min_entries
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn height(&self) -> usize {
        self.root.height
    }

    pub fn insert(&mut self, item: T) {
        let bbox = item.bbox();
        if let Some(sibling) =
            insert_into(&mut self.root, item, &bbox, self.max_entries, self.min_entries)
        {
            let old_root = std::mem::replace(&mut self.root, Node::leaf());
            let mut root = Node {
                bbox: BBox::EMPTY,
                height: old_root.height + 1,
                children: Children::Branch(vec![old_root, sibling]),
            };
            root.recalc();
            self.root = root;
        }
        self.len += 1;
    }

    /// Every stored item.
    pub fn all(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match &node.children {
                Children::Leaf(items) => out.extend(items.iter()),
                Children::Branch(nodes) => stack.extend(nodes.iter()),
            }
        }
        out
    }

    /// Items whose boxes touch `bbox`.
    pub fn search(&self, bbox: &BBox) -> Vec<&T> {
        let mut out = Vec::new();
        if !self.root.bbox.intersects(bbox) {
            return out;
        }
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match &node.children {
                Children::Leaf(items) => {
                    out.extend(items.iter().filter(|item| bbox.intersects(&item.bbox())));
                }
                Children::Branch(nodes) => {
                    stack.extend(nodes.iter().filter(|child| bbox.intersects(&child.bbox)));
                }
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.root = Node::leaf();
        self.len = 0;
    }
}

fn insert_into<T: Bounded>(
    node: &mut Node<T>,
    item: T,
    bbox: &BBox,
    max_entries: usize,
    min_entries: usize,
) -> Option<Node<T>> {
    node.bbox.extend(bbox);
    match &mut node.children {
        Children::Leaf(items) => items.push(item),
        Children::Branch(nodes) => {
            let idx = choose_subtree(nodes, bbox);
            if let Some(sibling) = insert_into(&mut nodes[idx], item, bbox, max_entries, min_entries)
            {
                nodes.insert(idx + 1, sibling);
            }
        }
    }

    if node.len() > max_entries {
        Some(split(node, min_entries))
    } else {
        None
    }
}

/// Child needing the least enlargement; ties go to the smaller child.
fn choose_subtree<T>(nodes: &[Node<T>], bbox: &BBox) -> usize {
    nodes
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| {
            let area = node.bbox.area();
            (node.bbox.union(bbox).area() - area, area)
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn split<T: Bounded>(node: &mut Node<T>, min_entries: usize) -> Node<T> {
    let children = match &mut node.children {
        Children::Leaf(items) => {
            let at = choose_split(items, min_entries, |item| item.bbox());
            Children::Leaf(items.split_off(at))
        }
        Children::Branch(nodes) => {
            let at = choose_split(nodes, min_entries, |child| child.bbox);
            Children::Branch(nodes.split_off(at))
        }
    };
    node.recalc();
    let mut sibling = Node {
        bbox: BBox::EMPTY,
        height: node.height,
        children,
    };
    sibling.recalc();
    sibling
}

/// Sort `entries` along the better axis and return the split index.
fn choose_split<E>(entries: &mut [E], min_entries: usize, bbox_of: impl Fn(&E) -> BBox) -> usize {
    let total = entries.len();
    debug_assert!(
        min_entries * 2 <= total,
        "cannot split {total} entries with min {min_entries}"
    );

    entries.sort_by_key(|e| bbox_of(e).min_x);
    let x_margin = all_dist_margin(entries, min_entries, &bbox_of);
    entries.sort_by_key(|e| bbox_of(e).min_y);
    let y_margin = all_dist_margin(entries, min_entries, &bbox_of);

    if x_margin < y_margin {
        entries.sort_by_key(|e| bbox_of(e).min_x);
    }

    choose_split_index(entries, min_entries, &bbox_of)
}

/// Summed margins of every legal distribution for the current ordering.
fn all_dist_margin<E>(entries: &[E], min_entries: usize, bbox_of: &impl Fn(&E) -> BBox) -> i64 {
    let total = entries.len();
    let mut left = dist_bbox(&entries[..min_entries], bbox_of);
    let mut right = dist_bbox(&entries[total - min_entries..], bbox_of);
    let mut margin = left.margin() + right.margin();

    for entry in &entries[min_entries..total - min_entries] {
        left.extend(&bbox_of(entry));
        margin += left.margin();
    }
    for entry in entries[min_entries..total - min_entries].iter().rev() {
        right.extend(&bbox_of(entry));
        margin += right.margin();
    }
    margin
}

fn choose_split_index<E>(entries: &[E], min_entries: usize, bbox_of: &impl Fn(&E) -> BBox) -> usize {
    let total = entries.len();
    let mut index = total - min_entries;
    let mut min_overlap = i64::MAX;
    let mut min_area = i64::MAX;

    for at in min_entries..=total - min_entries {
        let left = dist_bbox(&entries[..at], bbox_of);
        let right = dist_bbox(&entries[at..], bbox_of);
        let overlap = left.intersection_area(&right);
        let area = left.area() + right.area();

        if overlap < min_overlap {
            min_overlap = overlap;
            index = at;
            min_area = min_area.min(area);
        } else if overlap == min_overlap && area < min_area {
            min_area = area;
            index = at;
        }
    }
    index
}

fn dist_bbox<E>(entries: &[E], bbox_of: impl Fn(&E) -> BBox) -> BBox {
    entries.iter().fold(BBox::EMPTY, |mut acc, entry| {
        acc.extend(&bbox_of(entry));
        acc
    })
}
