use crate::geometry::{Rect, Size};
use crate::scene::{Color, Style};

/// One terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Cell {
    /// Placeholder occupying the right half of a double-width glyph.
    pub const CONTINUATION: char = '\0';

    pub const fn blank() -> Self {
        Self {
            ch: ' ',
            style: Style {
                fg: Color::Reset,
                bg: Color::Reset,
                bold: false,
                underline: false,
            },
        }
    }

    pub fn new(ch: char, style: Style) -> Self {
        Self { ch, style }
    }

    pub fn is_continuation(&self) -> bool {
        self.ch == Self::CONTINUATION
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

/// Row-major grid of cells covering the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBuffer {
    size: Size,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![Cell::blank(); size.area() as usize],
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.size.width && y < self.size.height)
            .then(|| y as usize * self.size.width as usize + x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|idx| &self.cells[idx])
    }

    /// Write one cell. Coordinates outside the buffer are ignored.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = cell;
        }
    }

    /// Overwrite every cell of `rect` that falls inside the buffer.
    pub fn fill(&mut self, rect: Rect, cell: Cell) {
        let Some(rect) = rect.intersection(&self.size.to_rect()) else {
            return;
        };
        for y in rect.y..rect.bottom() {
            let start = y as usize * self.size.width as usize + rect.x as usize;
            self.cells[start..start + rect.width as usize].fill(cell);
        }
    }

    /// Cells of row `y` between `from` (inclusive) and `to` (exclusive).
    pub fn row_span(&self, y: u16, from: u16, to: u16) -> &[Cell] {
        if y >= self.size.height {
            return &[];
        }
        let to = to.min(self.size.width);
        let from = from.min(to);
        let base = y as usize * self.size.width as usize;
        &self.cells[base + from as usize..base + to as usize]
    }

    /// Text of one full row, continuation cells dropped.
    pub fn row_text(&self, y: u16) -> String {
        self.row_span(y, 0, self.size.width)
            .iter()
            .filter(|cell| !cell.is_continuation())
            .map(|cell| cell.ch)
            .collect()
    }
}
