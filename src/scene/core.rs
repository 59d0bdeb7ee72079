use slotmap::{SlotMap, new_key_type};

use crate::geometry::{Rect, Size};
use crate::width::sanitize;

use super::props::{ContainerProps, Props, TextProps};

new_key_type! {
    /// Opaque identifier for a node stored in the scene arena.
    pub struct NodeId;
}

/// Memoised result of the last measurement of a node.
///
/// Valid only for the epoch and constraints it was computed under, and only
/// while the node has not been mutated since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureCache {
    pub epoch: u64,
    pub constraints_hash: u64,
    pub intrinsic: Size,
    pub stale: bool,
}

impl Default for MeasureCache {
    fn default() -> Self {
        Self {
            epoch: 0,
            constraints_hash: 0,
            intrinsic: Size::default(),
            stale: true,
        }
    }
}

impl MeasureCache {
    pub fn lookup(&self, epoch: u64, constraints_hash: u64) -> Option<Size> {
        (!self.stale && self.epoch == epoch && self.constraints_hash == constraints_hash)
            .then_some(self.intrinsic)
    }

    pub fn store(&mut self, epoch: u64, constraints_hash: u64, intrinsic: Size) {
        *self = Self {
            epoch,
            constraints_hash,
            intrinsic,
            stale: false,
        };
    }
}

/// Text payload plus its content fingerprint.
#[derive(Debug, Clone)]
pub struct TextNode {
    pub content: String,
    pub props: TextProps,
    fingerprint: blake3::Hash,
}

impl TextNode {
    fn new(content: String, props: TextProps) -> Self {
        let content = sanitize(&content);
        let fingerprint = blake3::hash(content.as_bytes());
        Self {
            content,
            props,
            fingerprint,
        }
    }

    /// Replace the content, returning false when nothing changed.
    fn update(&mut self, content: &str) -> bool {
        let content = sanitize(content);
        let fingerprint = blake3::hash(content.as_bytes());
        if fingerprint == self.fingerprint {
            return false;
        }
        self.content = content;
        self.fingerprint = fingerprint;
        true
    }

    /// Whitespace-only text takes no part in sizing or sequencing.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Container(ContainerProps),
    Text(TextNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub hidden: bool,
    /// Last committed bounds, `None` until the node has been laid out once.
    pub bounds: Option<Rect>,
    /// Bounds as they were before the most recent overwrite.
    pub previous_bounds: Option<Rect>,
    pub cache: MeasureCache,
    /// Content or style changed; the node repaints even if its bounds hold.
    pub repaint: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            parent: None,
            hidden: false,
            bounds: None,
            previous_bounds: None,
            cache: MeasureCache::default(),
            repaint: true,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container(_))
    }

    pub fn container(&self) -> Option<&ContainerProps> {
        match &self.kind {
            NodeKind::Container(props) => Some(props),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&TextNode> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Container(_) => None,
        }
    }

    /// Hidden nodes and blank text are skipped by measurement and sequencing.
    pub fn is_collapsed(&self) -> bool {
        self.hidden || self.text().is_some_and(TextNode::is_blank)
    }

    /// Record freshly computed bounds. Returns the previous value when the
    /// bounds moved or this is the first placement.
    pub fn commit_bounds(&mut self, bounds: Rect) -> Option<Option<Rect>> {
        let previous = self.bounds;
        self.previous_bounds = previous;
        self.bounds = Some(bounds);
        (previous != Some(bounds)).then_some(previous)
    }

    fn invalidate(&mut self) {
        self.cache.stale = true;
    }
}

/// Retained tree of containers and text.
///
/// Nodes live in an arena; children are owned id lists and the parent link is
/// a plain id, used only to find out whether a node still reaches the root.
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    pending_erase: Vec<Rect>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph holding only the canvas root, a column container.
    pub fn new() -> Self {
        Self::with_root(ContainerProps::column())
    }

    pub fn with_root(props: ContainerProps) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Container(props)));
        Self {
            nodes,
            root,
            pending_erase: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn bounds(&self, id: NodeId) -> Option<Rect> {
        self.nodes.get(id).and_then(|node| node.bounds)
    }

    pub fn create_container(&mut self, props: ContainerProps) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Container(props)))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.create_text_with(content, TextProps::default())
    }

    pub fn create_text_with(&mut self, content: impl Into<String>, props: TextProps) -> NodeId {
        let text = TextNode::new(content.into(), props);
        self.nodes.insert(Node::new(NodeKind::Text(text)))
    }

    /// Whether the node can reach the canvas root through parent links.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent);
        }
        false
    }

    fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut cursor = Some(of);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent);
        }
        false
    }

    fn can_adopt(&self, parent: NodeId, child: NodeId) -> bool {
        if child == self.root || self.is_ancestor(child, parent) {
            return false;
        }
        matches!(self.nodes.get(parent), Some(node) if node.is_container())
            && self.nodes.contains_key(child)
    }

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already mounted elsewhere. Returns false when the edge is invalid.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.can_adopt(parent, child) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
            node.invalidate();
        }
        self.adopt(parent, child);
        true
    }

    /// Insert `child` before `before` under `parent`. A `before` that is not a
    /// child of `parent` degrades to an append.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) -> bool {
        if child == before {
            return self.contains(child);
        }
        if !self.can_adopt(parent, child) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(parent) {
            match node.children.iter().position(|id| *id == before) {
                Some(idx) => node.children.insert(idx, child),
                None => node.children.push(child),
            }
            node.invalidate();
        }
        self.adopt(parent, child);
        true
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.invalidate();
        }
    }

    /// Unlink a node from its parent, queueing an erase of its last bounds.
    /// The subtree forgets its placement, so mounting it again paints it
    /// even at the same position.
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if self.is_attached(id) {
            self.queue_erase(id);
            for node in self.preorder(id) {
                if let Some(node) = self.nodes.get_mut(node) {
                    node.bounds = None;
                    node.previous_bounds = None;
                    node.repaint = true;
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|child| *child != id);
            node.invalidate();
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    fn queue_erase(&mut self, id: NodeId) {
        if !self.is_attached(id) {
            return;
        }
        if let Some(bounds) = self.bounds(id).filter(|rect| !rect.is_empty()) {
            self.pending_erase.push(bounds);
        }
    }

    /// Remove `child` from `parent` and drop its whole subtree. Returns the ids
    /// that were destroyed so callers can forget them.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Vec<NodeId> {
        if self.parent(child) != Some(parent) {
            return Vec::new();
        }
        self.detach(child);
        self.destroy(child)
    }

    /// Drop every child of `id`.
    pub fn reset_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id).to_vec();
        let mut removed = Vec::new();
        for child in children {
            removed.extend(self.remove_child(id, child));
        }
        removed
    }

    fn destroy(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                removed.push(current);
            }
        }
        removed
    }

    /// Apply new properties. A variant that does not match the node is ignored.
    pub fn set_props(&mut self, id: NodeId, props: Props) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let applied = match (&mut node.kind, props) {
            (NodeKind::Container(current), Props::Container(next)) => {
                *current = next;
                true
            }
            (NodeKind::Text(text), Props::Text(next)) => {
                text.props = next;
                true
            }
            _ => false,
        };
        if applied {
            node.invalidate();
            node.repaint = true;
        }
        applied
    }

    /// Replace the content of a text node. Identical content is a no-op.
    pub fn set_text(&mut self, id: NodeId, content: &str) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let NodeKind::Text(text) = &mut node.kind else {
            return false;
        };
        if !text.update(content) {
            return false;
        }
        node.invalidate();
        node.repaint = true;
        true
    }

    /// Toggle visibility without touching identity or children.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.hidden == hidden {
            return false;
        }
        node.hidden = hidden;
        node.invalidate();
        node.repaint = true;
        true
    }

    /// Bounds of removed nodes waiting to be erased by the next layout pass.
    pub fn take_pending_erase(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.pending_erase)
    }

    /// Nodes reachable from `from` in paint order: parents before children,
    /// siblings in source order.
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }
}
