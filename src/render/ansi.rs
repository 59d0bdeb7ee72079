use std::io::Write;

use crate::cursor;
use crate::error::Result;

use super::ops::{OpSink, TerminalOp};

/// Sink runtime parameters.
#[derive(Debug, Clone, Default)]
pub struct AnsiSettings {
    /// Cell to park the cursor on after each frame.
    pub restore_cursor: Option<(u16, u16)>,
    /// Drop color attributes from every write.
    pub monochrome: bool,
}

/// Renders terminal ops as ANSI escape sequences onto a byte stream.
pub struct AnsiSink<W: Write> {
    writer: W,
    settings: AnsiSettings,
}

impl<W: Write> AnsiSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_settings(writer, AnsiSettings::default())
    }

    pub fn with_settings(writer: W, settings: AnsiSettings) -> Self {
        Self { writer, settings }
    }

    pub fn settings_mut(&mut self) -> &mut AnsiSettings {
        &mut self.settings
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&mut self, op: &TerminalOp) -> Result<()> {
        match op {
            TerminalOp::MoveTo { x, y } => write!(self.writer, "{}", cursor::move_to(*x, *y))?,
            TerminalOp::Write { text, style } => {
                let style = if self.settings.monochrome {
                    style.without_color()
                } else {
                    *style
                };
                let sgr = cursor::sgr(&style);
                if sgr.is_empty() {
                    write!(self.writer, "{text}")?;
                } else {
                    write!(self.writer, "{sgr}{text}{}", cursor::reset_style())?;
                }
            }
            TerminalOp::Clear { rect } => {
                let blank = " ".repeat(rect.width as usize);
                for row in rect.y..rect.bottom() {
                    write!(self.writer, "{}{blank}", cursor::move_to(rect.x, row))?;
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> OpSink for AnsiSink<W> {
    fn write_ops(&mut self, ops: &[TerminalOp]) -> Result<()> {
        for op in ops {
            self.render(op)?;
        }
        if let Some((x, y)) = self.settings.restore_cursor {
            write!(self.writer, "{}", cursor::move_to(x, y))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
