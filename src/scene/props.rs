use serde::{Deserialize, Serialize};

/// Main axis of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Row,
    #[default]
    Column,
}

/// Requested size along one axis.
///
/// `Auto` fills whatever the parent offers. Unparsable input collapses to
/// `Auto` so a bad style value can never fail a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DimensionRepr", into = "DimensionRepr")]
pub enum Dimension {
    #[default]
    Auto,
    Cells(u16),
    Percent(f32),
}

impl Dimension {
    /// Parse `"auto"`, `"12"` or `"50%"`. Anything else is `Auto`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(pct) = raw.strip_suffix('%') {
            return match pct.trim().parse::<f32>() {
                Ok(value) if value.is_finite() => Self::Percent(value.max(0.0)),
                _ => Self::Auto,
            };
        }
        match raw.parse::<i64>() {
            Ok(value) => Self::Cells(value.clamp(0, u16::MAX as i64) as u16),
            Err(_) => Self::Auto,
        }
    }

    /// Resolve against the space available along this axis. `None` means the
    /// dimension does not pin a size and the caller should use its default.
    pub fn resolve(self, available: Option<u16>) -> Option<u16> {
        match self {
            Self::Auto => None,
            Self::Cells(n) => Some(n),
            Self::Percent(p) if !p.is_finite() => None,
            Self::Percent(p) => {
                let available = available?;
                let cells = (available as f64 * p.max(0.0) as f64 / 100.0).floor();
                Some(cells.min(u16::MAX as f64) as u16)
            }
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DimensionRepr {
    Cells(i64),
    Float(f64),
    Text(String),
}

impl From<DimensionRepr> for Dimension {
    fn from(repr: DimensionRepr) -> Self {
        match repr {
            DimensionRepr::Cells(n) => Dimension::Cells(n.clamp(0, u16::MAX as i64) as u16),
            DimensionRepr::Float(f) if f.is_finite() => {
                Dimension::Cells(f.floor().clamp(0.0, u16::MAX as f64) as u16)
            }
            DimensionRepr::Float(_) => Dimension::Auto,
            DimensionRepr::Text(text) => Dimension::parse(&text),
        }
    }
}

impl From<Dimension> for DimensionRepr {
    fn from(dim: Dimension) -> Self {
        match dim {
            Dimension::Auto => DimensionRepr::Text("auto".to_string()),
            Dimension::Cells(n) => DimensionRepr::Cells(n as i64),
            Dimension::Percent(p) => DimensionRepr::Text(format!("{p}%")),
        }
    }
}

/// Four-sided inset in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Edges {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Edges {
    pub const ZERO: Edges = Edges::all(0);

    pub const fn all(n: u16) -> Self {
        Self {
            top: n,
            right: n,
            bottom: n,
            left: n,
        }
    }

    pub fn horizontal(&self) -> u16 {
        self.left.saturating_add(self.right)
    }

    pub fn vertical(&self) -> u16 {
        self.top.saturating_add(self.bottom)
    }

    pub fn add(&self, other: &Edges) -> Edges {
        Edges {
            top: self.top.saturating_add(other.top),
            right: self.right.saturating_add(other.right),
            bottom: self.bottom.saturating_add(other.bottom),
            left: self.left.saturating_add(other.left),
        }
    }
}

/// Terminal color. `Reset` leaves the terminal default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Reset,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

/// Visual attributes carried by every painted cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub underline: bool,
}

impl Style {
    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }

    /// Same attributes with colors removed, for monochrome canvases.
    pub fn without_color(self) -> Self {
        Self {
            fg: Color::Reset,
            bg: Color::Reset,
            ..self
        }
    }
}

/// Box-drawing glyph family used when a container draws a border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Single,
    Double,
    Rounded,
    Heavy,
}

/// Corner and edge glyphs for one border family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderGlyphs {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BorderStyle {
    pub fn glyphs(self) -> BorderGlyphs {
        let (tl, tr, bl, br, h, v) = match self {
            Self::Single => ('┌', '┐', '└', '┘', '─', '│'),
            Self::Double => ('╔', '╗', '╚', '╝', '═', '║'),
            Self::Rounded => ('╭', '╮', '╰', '╯', '─', '│'),
            Self::Heavy => ('┏', '┓', '┗', '┛', '━', '┃'),
        };
        BorderGlyphs {
            top_left: tl,
            top_right: tr,
            bottom_left: bl,
            bottom_right: br,
            horizontal: h,
            vertical: v,
        }
    }
}

/// Layout and style properties of a container node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerProps {
    pub direction: Direction,
    pub gap: u16,
    pub padding: Edges,
    pub margin: Edges,
    pub border: Option<BorderStyle>,
    pub width: Dimension,
    pub height: Dimension,
    /// Share of leftover main-axis space. Zero keeps the child at its
    /// measured size.
    pub flex: u16,
    pub style: Style,
}

impl ContainerProps {
    pub fn row() -> Self {
        Self {
            direction: Direction::Row,
            ..Self::default()
        }
    }

    pub fn column() -> Self {
        Self::default()
    }

    pub fn with_gap(mut self, gap: u16) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_padding(mut self, padding: u16) -> Self {
        self.padding = Edges::all(padding);
        self
    }

    pub fn with_margin(mut self, margin: u16) -> Self {
        self.margin = Edges::all(margin);
        self
    }

    pub fn with_border(mut self, border: BorderStyle) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_width(mut self, width: Dimension) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: Dimension) -> Self {
        self.height = height;
        self
    }

    pub fn with_flex(mut self, flex: u16) -> Self {
        self.flex = flex;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Border plus padding, the space between the outer box and the content box.
    pub fn chrome(&self) -> Edges {
        let border = if self.border.is_some() {
            Edges::all(1)
        } else {
            Edges::ZERO
        };
        border.add(&self.padding)
    }
}

/// How text reacts to a width constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    #[default]
    NoWrap,
    Truncate,
    Wrap,
}

/// Properties of a text node; the content itself is set separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProps {
    pub wrap: WrapMode,
    pub style: Style,
}

impl TextProps {
    pub fn wrapped(wrap: WrapMode) -> Self {
        Self {
            wrap,
            ..Self::default()
        }
    }
}

/// Property update targeting either node variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Props {
    Container(ContainerProps),
    Text(TextProps),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_cells_percent_and_auto() {
        assert_eq!(Dimension::parse("12"), Dimension::Cells(12));
        assert_eq!(Dimension::parse(" 50% "), Dimension::Percent(50.0));
        assert_eq!(Dimension::parse("auto"), Dimension::Auto);
    }

    #[test]
    fn invalid_sizes_fall_back() {
        assert_eq!(Dimension::parse("abc%"), Dimension::Auto);
        assert_eq!(Dimension::parse("wide"), Dimension::Auto);
        assert_eq!(Dimension::parse("-4"), Dimension::Cells(0));
        assert_eq!(Dimension::Percent(f32::NAN).resolve(Some(80)), None);
    }

    #[test]
    fn percentages_round_down() {
        assert_eq!(Dimension::Percent(33.0).resolve(Some(10)), Some(3));
        assert_eq!(Dimension::Percent(50.0).resolve(None), None);
    }

    #[test]
    fn dimension_deserializes_from_mixed_json() {
        let dims: Vec<Dimension> = serde_json::from_str(r#"[10, "25%", "auto", "bogus", -3]"#)
            .expect("decode dimensions");
        assert_eq!(
            dims,
            vec![
                Dimension::Cells(10),
                Dimension::Percent(25.0),
                Dimension::Auto,
                Dimension::Auto,
                Dimension::Cells(0),
            ]
        );
    }

    #[test]
    fn chrome_counts_border_as_one_cell() {
        let props = ContainerProps::row()
            .with_padding(2)
            .with_border(BorderStyle::Rounded);
        assert_eq!(props.chrome(), Edges::all(3));
    }
}
