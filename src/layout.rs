use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::Gray4,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use profont::{PROFONT_10_POINT, PROFONT_14_POINT, PROFONT_24_POINT};

// ── Colors ──────────────────────────────────────────────────────────

/// Foreground for text, outlines and chart marks.
pub const INK: Gray4 = Gray4::BLACK;
/// Background of every frame.
pub const PAPER: Gray4 = Gray4::WHITE;

// ── Layout constants (960x540 landscape) ────────────────────────────

pub const SCREEN_W: i32 = 960;
pub const SCREEN_H: i32 = 540;

pub const HEADER_X: i32 = 14;
pub const HEADER_Y: i32 = 0;
pub const HEADER_W: i32 = SCREEN_W - 28;
pub const HEADER_H: i32 = 33;

pub const BODY_X: i32 = 14;
pub const BODY_Y: i32 = 34;
pub const BODY_W: i32 = SCREEN_W - 28;
pub const BODY_H: i32 = SCREEN_H - 45;

// KPI tiles along the top of the body
pub const TILE_COUNT: i32 = 5;
pub const TILE_STRIDE: i32 = 188;
pub const TILE_ICON_SIZE: u32 = 88;
/// Separators run from `BODY_Y + 40` down to this absolute row.
pub const TILE_SEPARATOR_BOTTOM: i32 = BODY_H - 300;

// Power chart
pub const CHART_X: i32 = 15;
pub const CHART_Y: i32 = 200;
pub const CHART_W: i32 = 600;
pub const CHART_H: i32 = 300;
pub const CHART_TITLE: &str = "Active Power Chart (kWh) / Today (24h)";

// Savings gauges
pub const GAUGE_RADIUS: i32 = 85;
pub const GAUGE_ICON_SIZE: u32 = 52;

// ── Text ────────────────────────────────────────────────────────────

/// Text sizes used on the dashboard, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    /// Chart axis labels.
    Small,
    /// Header, labels, chart title.
    Medium,
    /// KPI values.
    Large,
    /// Full-screen messages.
    Huge,
}

impl TextSize {
    pub fn font(self) -> &'static MonoFont<'static> {
        match self {
            TextSize::Small => &PROFONT_10_POINT,
            TextSize::Medium => &PROFONT_14_POINT,
            TextSize::Large | TextSize::Huge => &PROFONT_24_POINT,
        }
    }
}

/// Draw `text` with its top edge at `y`; `x` is the left edge, center or
/// right edge depending on `align`.
pub fn draw_text<D>(target: &mut D, text: &str, x: i32, y: i32, size: TextSize, align: Alignment)
where
    D: DrawTarget<Color = Gray4>,
{
    let style = MonoTextStyle::new(size.font(), INK);
    let text_style = TextStyleBuilder::new()
        .alignment(align)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(text, Point::new(x, y), style, text_style)
        .draw(target)
        .ok();
}

pub fn draw_text_left<D>(target: &mut D, text: &str, x: i32, y: i32, size: TextSize)
where
    D: DrawTarget<Color = Gray4>,
{
    draw_text(target, text, x, y, size, Alignment::Left);
}

pub fn draw_text_centered<D>(target: &mut D, text: &str, x: i32, y: i32, size: TextSize)
where
    D: DrawTarget<Color = Gray4>,
{
    draw_text(target, text, x, y, size, Alignment::Center);
}

pub fn draw_text_right<D>(target: &mut D, text: &str, x: i32, y: i32, size: TextSize)
where
    D: DrawTarget<Color = Gray4>,
{
    draw_text(target, text, x, y, size, Alignment::Right);
}

/// Two decimals, left-padded with spaces to at least `fill_len` characters.
pub fn format_value(value: f32, fill_len: usize) -> String {
    format!("{:>width$.2}", value, width = fill_len)
}

// ── Shapes ──────────────────────────────────────────────────────────

/// One-pixel rectangle outline.
pub fn draw_frame<D>(target: &mut D, x: i32, y: i32, w: u32, h: u32)
where
    D: DrawTarget<Color = Gray4>,
{
    Rectangle::new(Point::new(x, y), Size::new(w, h))
        .into_styled(PrimitiveStyle::with_stroke(INK, 1))
        .draw(target)
        .ok();
}

/// Plot an arc of radius `r` around `(cx, cy)` one pixel per whole degree in
/// `[deg_from, deg_to)`. 0° points along +x and angles grow clockwise.
pub fn draw_arc<D>(target: &mut D, cx: i32, cy: i32, r: i32, deg_from: i32, deg_to: i32)
where
    D: DrawTarget<Color = Gray4>,
{
    let r = r as f32;
    let points = (deg_from..deg_to).map(|deg| {
        let rad = (deg as f32).to_radians();
        let px = cx as f32 + r * rad.cos();
        let py = cy as f32 + r * rad.sin();
        Pixel(Point::new(px as i32, py as i32), INK)
    });
    target.draw_iter(points).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer;

    #[test]
    fn values_are_padded_to_four_chars() {
        assert_eq!(format_value(0.0, 4), "0.00");
        assert_eq!(format_value(3.5, 4), "3.50");
        assert_eq!(format_value(3.5, 6), "  3.50");
        assert_eq!(format_value(1234.567, 4), "1234.57");
        assert_eq!(format_value(-2.0, 6), " -2.00");
    }

    #[test]
    fn bands_fill_the_canvas() {
        assert_eq!(HEADER_X + HEADER_W, SCREEN_W - 14);
        assert_eq!(BODY_Y + BODY_H, SCREEN_H - 11);
        assert_eq!(BODY_H, 495);
        assert_eq!(TILE_SEPARATOR_BOTTOM, 195);
    }

    #[test]
    fn arc_stays_on_its_radius() {
        let mut fb = Framebuffer::new(64, 64);
        draw_arc(&mut fb, 32, 32, 10, 0, 360);
        let inked = fb.count(INK);
        assert!(inked > 40 && inked <= 360, "inked {inked}");
        for y in 0..64 {
            for x in 0..64 {
                if fb.pixel(x, y) == Some(INK) {
                    let d = (((x - 32).pow(2) + (y - 32).pow(2)) as f32).sqrt();
                    assert!((d - 10.0).abs() < 1.5, "({x},{y}) at {d}");
                }
            }
        }
    }

    #[test]
    fn upper_arc_is_above_center() {
        // 225..315 is the upward-facing wedge of the WiFi symbol.
        let mut fb = Framebuffer::new(40, 40);
        draw_arc(&mut fb, 20, 30, 16, 225, 315);
        let below = fb.count_in(&Rectangle::new(Point::new(0, 31), Size::new(40, 9)), INK);
        assert_eq!(below, 0);
        assert!(fb.count(INK) > 0);
    }

    #[test]
    fn centered_text_straddles_anchor() {
        let mut fb = Framebuffer::new(200, 40);
        draw_text_centered(&mut fb, "8888", 100, 5, TextSize::Medium);
        let left = fb.count_in(&Rectangle::new(Point::new(0, 0), Size::new(100, 40)), INK);
        let right = fb.count_in(&Rectangle::new(Point::new(100, 0), Size::new(100, 40)), INK);
        assert!(left > 0 && right > 0);
        // Top baseline: nothing above the anchor row.
        assert_eq!(fb.count_in(&Rectangle::new(Point::zero(), Size::new(200, 5)), INK), 0);
    }
}
