use crate::dirty::DirtyRegions;
use crate::geometry::{Rect, Size};
use crate::layout::shape_lines;
use crate::layout::text::glyph_cells;
use crate::scene::{Color, ContainerProps, NodeId, NodeKind, SceneGraph, Style, TextNode};

use super::buffer::{Cell, CellBuffer};
use super::ops::TerminalOp;

/// Output of one paint pass. The painter's committed buffer is untouched
/// until the frame is handed back through [`Painter::adopt`].
#[derive(Debug, Clone)]
pub struct Frame {
    pub ops: Vec<TerminalOp>,
    /// Dirty rectangles that were repainted.
    pub regions: usize,
    pub full_redraw: bool,
    buffer: CellBuffer,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Screen contents once this frame is on the terminal.
    pub fn buffer(&self) -> &CellBuffer {
        &self.buffer
    }
}

/// Differential painter: re-renders only the dirty rectangles of the canvas
/// and turns the changed cells into terminal ops.
#[derive(Debug, Clone)]
pub struct Painter {
    buffer: CellBuffer,
    color: bool,
}

impl Painter {
    pub fn new(size: Size) -> Self {
        Self {
            buffer: CellBuffer::new(size),
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Last committed frame.
    pub fn buffer(&self) -> &CellBuffer {
        &self.buffer
    }

    /// Discard the committed frame and start from a blank canvas of `size`.
    pub fn resize(&mut self, size: Size) {
        self.buffer = CellBuffer::new(size);
    }

    /// Accept a frame that reached the terminal as the new committed state.
    pub fn adopt(&mut self, frame: Frame) {
        self.buffer = frame.buffer;
    }

    /// Build the next frame from the scene's committed bounds and the dirty
    /// set. Regions are processed in paint order; each one is cleared, every
    /// intersecting node is re-rendered parents first, and the resulting
    /// cells are emitted as style-coalesced runs.
    pub fn paint(&self, scene: &SceneGraph, dirty: &DirtyRegions) -> Frame {
        let canvas = dirty.canvas();
        let mut next = if self.buffer.size() == canvas {
            self.buffer.clone()
        } else {
            CellBuffer::new(canvas)
        };

        let full_redraw = dirty.needs_full_redraw();
        let regions: Vec<Rect> = if full_redraw {
            Some(canvas.to_rect()).filter(|rect| !rect.is_empty()).into_iter().collect()
        } else {
            dirty.rects()
        };

        let order = paint_order(scene);
        let mut ops = Vec::new();
        for region in &regions {
            ops.push(TerminalOp::Clear { rect: *region });
            next.fill(*region, Cell::blank());
            for &id in &order {
                self.draw_node(&mut next, scene, id, *region);
            }
            emit_runs(&next, *region, &mut ops);
        }

        Frame {
            ops,
            regions: regions.len(),
            full_redraw,
            buffer: next,
        }
    }

    fn style(&self, style: Style) -> Style {
        if self.color { style } else { style.without_color() }
    }

    fn draw_node(&self, buffer: &mut CellBuffer, scene: &SceneGraph, id: NodeId, region: Rect) {
        let Some(node) = scene.get(id) else {
            return;
        };
        let Some(bounds) = node.bounds else {
            return;
        };
        let Some(clip) = bounds.intersection(&region) else {
            return;
        };
        match &node.kind {
            NodeKind::Container(props) => self.draw_container(buffer, props, bounds, clip),
            NodeKind::Text(text) => self.draw_text(buffer, text, bounds, clip),
        }
    }

    fn draw_container(&self, buffer: &mut CellBuffer, props: &ContainerProps, bounds: Rect, clip: Rect) {
        let style = self.style(props.style);
        if style.bg != Color::Reset {
            let fill = Style {
                bg: style.bg,
                ..Style::default()
            };
            buffer.fill(clip, Cell::new(' ', fill));
        }

        let Some(border) = props.border else {
            return;
        };
        if bounds.width < 2 || bounds.height < 2 {
            return;
        }
        let glyphs = border.glyphs();
        let (left, top) = (bounds.x, bounds.y);
        let (right, bottom) = (bounds.right() - 1, bounds.bottom() - 1);
        for x in clip.x..clip.right() {
            let (top_ch, bottom_ch) = match x {
                x if x == left => (glyphs.top_left, glyphs.bottom_left),
                x if x == right => (glyphs.top_right, glyphs.bottom_right),
                _ => (glyphs.horizontal, glyphs.horizontal),
            };
            put(buffer, clip, x, top, top_ch, style);
            put(buffer, clip, x, bottom, bottom_ch, style);
        }
        for y in clip.y.max(top + 1)..clip.bottom().min(bottom) {
            put(buffer, clip, left, y, glyphs.vertical, style);
            put(buffer, clip, right, y, glyphs.vertical, style);
        }
    }

    fn draw_text(&self, buffer: &mut CellBuffer, text: &TextNode, bounds: Rect, clip: Rect) {
        let style = self.style(text.props.style);
        let lines = shape_lines(&text.content, text.props.wrap, Some(bounds.width));
        for (row, line) in lines.iter().enumerate().take(bounds.height as usize) {
            let y = bounds.y + row as u16;
            if y < clip.y || y >= clip.bottom() {
                continue;
            }
            let mut x = bounds.x as u32;
            for (ch, cells) in glyph_cells(line) {
                if cells == 0 {
                    continue;
                }
                if x + cells as u32 > bounds.right() as u32 {
                    break;
                }
                let cx = x as u16;
                if cells == 2 {
                    if clip.contains(cx, y) && clip.contains(cx + 1, y) {
                        put(buffer, clip, cx, y, ch, style);
                        put(buffer, clip, cx + 1, y, Cell::CONTINUATION, style);
                    } else {
                        put(buffer, clip, cx, y, ' ', style);
                        put(buffer, clip, cx + 1, y, ' ', style);
                    }
                } else {
                    put(buffer, clip, cx, y, ch, style);
                }
                x += cells as u32;
            }
        }
    }
}

/// Write a glyph inside `clip`, keeping the background already in the cell
/// when `style` leaves it unset.
fn put(buffer: &mut CellBuffer, clip: Rect, x: u16, y: u16, ch: char, style: Style) {
    if !clip.contains(x, y) {
        return;
    }
    let bg = match style.bg {
        Color::Reset => buffer.get(x, y).map_or(Color::Reset, |cell| cell.style.bg),
        bg => bg,
    };
    buffer.set(x, y, Cell::new(ch, Style { bg, ..style }));
}

/// Visible nodes, parents before children, hidden subtrees pruned.
fn paint_order(scene: &SceneGraph) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut stack = vec![scene.root()];
    while let Some(id) = stack.pop() {
        let Some(node) = scene.get(id) else {
            continue;
        };
        if node.hidden {
            continue;
        }
        order.push(id);
        stack.extend(node.children.iter().rev().copied());
    }
    order
}

/// Emit one `MoveTo` + `Write` per same-style run of cells in `region`.
/// Blank default-style cells at the edges of a run are already covered by
/// the region's clear and are dropped.
fn emit_runs(buffer: &CellBuffer, region: Rect, ops: &mut Vec<TerminalOp>) {
    for y in region.y..region.bottom() {
        let cells = buffer.row_span(y, region.x, region.right());
        let mut idx = 0;
        while idx < cells.len() {
            let style = cells[idx].style;
            let start = idx;
            while idx < cells.len() && cells[idx].style == style {
                idx += 1;
            }
            let mut run = &cells[start..idx];
            let mut offset = start;
            if style.is_plain() {
                let lead = run.iter().take_while(|cell| cell.ch == ' ').count();
                let trail = run[lead..].iter().rev().take_while(|cell| cell.ch == ' ').count();
                run = &run[lead..run.len() - trail];
                offset += lead;
            }
            if run.is_empty() {
                continue;
            }
            let text: String = run
                .iter()
                .filter(|cell| !cell.is_continuation())
                .map(|cell| cell.ch)
                .collect();
            ops.push(TerminalOp::MoveTo {
                x: region.x + offset as u16,
                y,
            });
            ops.push(TerminalOp::Write { text, style });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirty::DirtyRegions;
    use crate::layout::LayoutEngine;
    use crate::scene::{BorderStyle, Props, TextProps};

    struct Stage {
        scene: SceneGraph,
        dirty: DirtyRegions,
        engine: LayoutEngine,
        painter: Painter,
        epoch: u64,
    }

    impl Stage {
        fn new(root: ContainerProps, size: Size) -> Self {
            Self {
                scene: SceneGraph::with_root(root),
                dirty: DirtyRegions::new(size),
                engine: LayoutEngine::new(),
                painter: Painter::new(size),
                epoch: 0,
            }
        }

        fn commit(&mut self) -> Vec<TerminalOp> {
            self.epoch += 1;
            self.engine.run(&mut self.scene, &mut self.dirty, self.epoch);
            let frame = self.painter.paint(&self.scene, &self.dirty);
            let ops = frame.ops.clone();
            self.painter.adopt(frame);
            self.dirty.clear();
            ops
        }

        fn rows(&self) -> Vec<String> {
            let size = self.painter.buffer().size();
            (0..size.height).map(|y| self.painter.buffer().row_text(y)).collect()
        }
    }

    fn write(text: &str) -> TerminalOp {
        TerminalOp::Write {
            text: text.into(),
            style: Style::default(),
        }
    }

    #[test]
    fn first_frame_clears_and_writes_coalesced_row() {
        let mut stage = Stage::new(ContainerProps::row().with_padding(1).with_gap(1), Size::new(30, 5));
        let root = stage.scene.root();
        for label in ["A", "B", "C"] {
            let id = stage.scene.create_text(label);
            stage.scene.append_child(root, id);
        }

        let ops = stage.commit();
        assert_eq!(
            ops,
            vec![
                TerminalOp::Clear {
                    rect: Rect::new(0, 0, 30, 5)
                },
                TerminalOp::MoveTo { x: 1, y: 1 },
                write("A B C"),
            ]
        );
    }

    #[test]
    fn text_change_repaints_only_its_cells() {
        let mut stage = Stage::new(ContainerProps::row().with_padding(1).with_gap(1), Size::new(30, 5));
        let root = stage.scene.root();
        let ids: Vec<NodeId> = ["A", "B", "C"]
            .into_iter()
            .map(|label| {
                let id = stage.scene.create_text(label);
                stage.scene.append_child(root, id);
                id
            })
            .collect();
        stage.commit();

        stage.scene.set_text(ids[1], "X");
        let ops = stage.commit();
        assert_eq!(
            ops,
            vec![
                TerminalOp::Clear {
                    rect: Rect::new(3, 1, 1, 1)
                },
                TerminalOp::MoveTo { x: 3, y: 1 },
                write("X"),
            ]
        );
        assert_eq!(stage.rows()[1].trim_end(), " A X C");
    }

    #[test]
    fn unchanged_scene_emits_nothing() {
        let mut stage = Stage::new(ContainerProps::column(), Size::new(10, 2));
        let root = stage.scene.root();
        let text = stage.scene.create_text("still");
        stage.scene.append_child(root, text);
        stage.commit();
        assert!(stage.commit().is_empty());
    }

    #[test]
    fn borders_use_style_glyphs() {
        let mut stage = Stage::new(ContainerProps::column(), Size::new(6, 4));
        let root = stage.scene.root();
        let boxed = stage.scene.create_container(
            ContainerProps::column()
                .with_border(BorderStyle::Single)
                .with_width(crate::scene::Dimension::Cells(4))
                .with_height(crate::scene::Dimension::Cells(3)),
        );
        let label = stage.scene.create_text("ok");
        stage.scene.append_child(root, boxed);
        stage.scene.append_child(boxed, label);
        stage.commit();

        assert_eq!(stage.rows(), vec!["┌──┐  ", "│ok│  ", "└──┘  ", "      "]);
    }

    #[test]
    fn hidden_nodes_are_not_painted() {
        let mut stage = Stage::new(ContainerProps::column(), Size::new(8, 2));
        let root = stage.scene.root();
        let shown = stage.scene.create_text("shown");
        let secret = stage.scene.create_text("secret");
        stage.scene.append_child(root, shown);
        stage.scene.append_child(root, secret);
        stage.scene.set_hidden(secret, true);
        stage.commit();
        assert_eq!(stage.rows(), vec!["shown   ", "        "]);

        stage.scene.set_hidden(secret, false);
        stage.commit();
        assert_eq!(stage.rows(), vec!["shown   ", "secret  "]);
    }

    #[test]
    fn truncated_text_ends_with_ellipsis_at_bounds() {
        let mut stage = Stage::new(ContainerProps::row(), Size::new(5, 1));
        let root = stage.scene.root();
        let text = stage
            .scene
            .create_text_with("abcdefgh", TextProps::wrapped(crate::scene::WrapMode::Truncate));
        stage.scene.append_child(root, text);
        stage.commit();
        assert_eq!(stage.rows(), vec!["abcd…"]);
    }

    #[test]
    fn text_composites_over_container_background() {
        let mut stage = Stage::new(ContainerProps::column(), Size::new(4, 1));
        let root = stage.scene.root();
        let panel_style = Style {
            bg: Color::Indexed(4),
            ..Style::default()
        };
        stage
            .scene
            .set_props(root, Props::Container(ContainerProps::column().with_style(panel_style)));
        let text = stage.scene.create_text("hi");
        stage.scene.append_child(root, text);
        let ops = stage.commit();

        assert!(ops.contains(&TerminalOp::Write {
            text: "hi  ".into(),
            style: panel_style,
        }));
    }

    #[test]
    fn monochrome_painter_strips_colors() {
        let mut stage = Stage::new(ContainerProps::column(), Size::new(3, 1));
        stage.painter.set_color(false);
        let root = stage.scene.root();
        let red = Style {
            fg: Color::Indexed(1),
            bold: true,
            ..Style::default()
        };
        let text = stage.scene.create_text_with(
            "r",
            TextProps {
                style: red,
                ..TextProps::default()
            },
        );
        stage.scene.append_child(root, text);
        let ops = stage.commit();
        assert!(ops.contains(&TerminalOp::Write {
            text: "r".into(),
            style: red.without_color(),
        }));
    }

    #[test]
    fn ops_never_leave_the_canvas() {
        let mut stage = Stage::new(ContainerProps::row(), Size::new(4, 2));
        let root = stage.scene.root();
        let wide = stage.scene.create_text("much too wide for this\nand tall\nreally");
        stage.scene.append_child(root, wide);
        let ops = stage.commit();
        for op in ops {
            match op {
                TerminalOp::MoveTo { x, y } => assert!(x < 4 && y < 2),
                TerminalOp::Clear { rect } => assert!(rect.right() <= 4 && rect.bottom() <= 2),
                TerminalOp::Write { text, .. } => assert!(crate::width::display_width(&text) <= 4),
            }
        }
    }
}
