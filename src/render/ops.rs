use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::geometry::{Rect, Size};
use crate::scene::Style;
use crate::width::char_width;

/// One instruction in the painter's output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TerminalOp {
    MoveTo { x: u16, y: u16 },
    /// Styled text starting at the cursor; the cursor advances by its width.
    Write { text: String, style: Style },
    /// Reset every cell of `rect` to a blank default cell.
    Clear { rect: Rect },
}

/// Destination for a committed frame's operations.
///
/// A sink receives every op of one frame in a single call. Returning an error
/// tells the host the frame never reached the screen.
pub trait OpSink {
    fn write_ops(&mut self, ops: &[TerminalOp]) -> Result<()>;
}

impl<S: OpSink + ?Sized> OpSink for &mut S {
    fn write_ops(&mut self, ops: &[TerminalOp]) -> Result<()> {
        (**self).write_ops(ops)
    }
}

/// Test double that keeps every frame it was handed.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    frames: Vec<Vec<TerminalOp>>,
    fail_next: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `write_ops` call fail without recording anything.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    pub fn frames(&self) -> &[Vec<TerminalOp>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[TerminalOp]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Every op across every frame, in order.
    pub fn ops(&self) -> impl Iterator<Item = &TerminalOp> {
        self.frames.iter().flatten()
    }

    /// Replay all recorded frames onto a blank screen of `size` and return
    /// its rows as text.
    pub fn screen(&self, size: Size) -> Vec<String> {
        let width = size.width as usize;
        let mut rows = vec![vec![' '; width]; size.height as usize];
        let (mut cx, mut cy) = (0usize, 0usize);
        for op in self.ops() {
            match op {
                TerminalOp::MoveTo { x, y } => (cx, cy) = (*x as usize, *y as usize),
                TerminalOp::Write { text, .. } => {
                    for ch in text.chars() {
                        let cells = char_width(ch);
                        if let Some(slot) = rows.get_mut(cy).and_then(|row| row.get_mut(cx)) {
                            *slot = ch;
                        }
                        if cells == 2 {
                            if let Some(slot) = rows.get_mut(cy).and_then(|row| row.get_mut(cx + 1)) {
                                *slot = '\0';
                            }
                        }
                        cx += cells;
                    }
                }
                TerminalOp::Clear { rect } => {
                    for y in rect.y..rect.bottom() {
                        for x in rect.x..rect.right() {
                            if let Some(slot) = rows.get_mut(y as usize).and_then(|row| row.get_mut(x as usize)) {
                                *slot = ' ';
                            }
                        }
                    }
                }
            }
        }
        rows.into_iter()
            .map(|row| row.into_iter().filter(|ch| *ch != '\0').collect())
            .collect()
    }
}

impl OpSink for RecordingSink {
    fn write_ops(&mut self, ops: &[TerminalOp]) -> Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(EngineError::Sink("recording sink refused the frame".into()));
        }
        self.frames.push(ops.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_serialize_with_op_tag() {
        let op = TerminalOp::MoveTo { x: 3, y: 1 };
        let json = serde_json::to_value(&op).expect("serialize");
        assert_eq!(json, serde_json::json!({"op": "move_to", "x": 3, "y": 1}));
    }

    #[test]
    fn screen_replays_writes_and_clears() {
        let mut sink = RecordingSink::new();
        sink.write_ops(&[
            TerminalOp::MoveTo { x: 1, y: 0 },
            TerminalOp::Write {
                text: "abc".into(),
                style: Style::default(),
            },
        ])
        .expect("first frame");
        sink.write_ops(&[TerminalOp::Clear {
            rect: Rect::new(2, 0, 1, 1),
        }])
        .expect("second frame");
        assert_eq!(sink.screen(Size::new(5, 1)), vec![" a c ".to_string()]);
        assert_eq!(sink.frames().len(), 2);
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let mut sink = RecordingSink::new();
        sink.fail_next();
        assert!(sink.write_ops(&[]).is_err());
        assert!(sink.write_ops(&[]).is_ok());
        assert_eq!(sink.frames().len(), 1);
    }
}
