//! ANSI escape builders used by [`crate::render::AnsiSink`].
//!
//! Canvas coordinates are 0-based cells; terminals address 1-based rows and
//! columns, so the conversion happens here and nowhere else.

use crate::scene::{Color, Style};

const CSI: &str = "\x1b[";

/// Move the cursor to the 0-based canvas cell `(x, y)`.
pub fn move_to(x: u16, y: u16) -> String {
    format!("{CSI}{};{}H", y as u32 + 1, x as u32 + 1)
}

/// Reset every graphic attribute.
pub fn reset_style() -> &'static str {
    "\x1b[0m"
}

/// Select Graphic Rendition sequence for `style`. Plain styles produce an
/// empty string so unstyled runs cost no bytes.
pub fn sgr(style: &Style) -> String {
    if style.is_plain() {
        return String::new();
    }
    let mut params: Vec<String> = Vec::new();
    if style.bold {
        params.push("1".into());
    }
    if style.underline {
        params.push("4".into());
    }
    if let Some(fg) = color_param(style.fg, 38) {
        params.push(fg);
    }
    if let Some(bg) = color_param(style.bg, 48) {
        params.push(bg);
    }
    format!("{CSI}{}m", params.join(";"))
}

fn color_param(color: Color, base: u8) -> Option<String> {
    match color {
        Color::Reset => None,
        Color::Indexed(idx) => Some(format!("{base};5;{idx}")),
        Color::Rgb(r, g, b) => Some(format!("{base};2;{r};{g};{b}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        assert_eq!(move_to(0, 0), "\x1b[1;1H");
        assert_eq!(move_to(4, 2), "\x1b[3;5H");
    }

    #[test]
    fn plain_style_has_no_sequence() {
        assert_eq!(sgr(&Style::default()), "");
    }

    #[test]
    fn sgr_combines_attributes_and_colors() {
        let style = Style {
            fg: Color::Indexed(2),
            bg: Color::Rgb(1, 2, 3),
            bold: true,
            underline: false,
        };
        assert_eq!(sgr(&style), "\x1b[1;38;5;2;48;2;1;2;3m");
    }
}
