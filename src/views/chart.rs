use embedded_graphics::{
    pixelcolor::Gray4,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
};

use crate::layout::*;

/// Value range shown on the chart axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: f32,
    pub y_max: f32,
}

/// Plot area in screen pixels plus the domain it maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plot {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub domain: Domain,
}

/// Axis bound as printed next to the plot.
fn bound_label(value: f32) -> String {
    format!("{}", value.round() as i64)
}

impl Plot {
    /// Place the plot inside the chart box `(x, y, dx, dy)`, leaving a gutter
    /// on the left wide enough for the y-axis labels and room for the title
    /// underneath.
    pub fn new(x: i32, y: i32, dx: i32, dy: i32, domain: Domain) -> Self {
        let longest = bound_label(domain.y_min)
            .len()
            .max(bound_label(domain.y_max).len());
        let gutter = 5 + (longest as f32 * 3.5) as i32;
        Self {
            x: x + 5 + gutter + 5,
            y: y + 35,
            width: dx - 20,
            height: dy - 55,
            domain,
        }
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Column of sample `index`. Samples sit a whole number of pixels apart
    /// (`width / span`), so a long series can stop short of the right edge.
    /// An empty x range puts everything on the left edge.
    pub fn x_pixel(&self, index: i32) -> i32 {
        let span = self.domain.x_max - self.domain.x_min;
        if span == 0 {
            return self.x;
        }
        self.x + self.width / span * (index - self.domain.x_min)
    }

    /// Row of `value`, clamped into the plot. An empty or inverted y range
    /// puts everything on the baseline.
    pub fn y_pixel(&self, value: f32) -> i32 {
        let Domain { y_min, y_max, .. } = self.domain;
        if y_max <= y_min {
            return self.bottom();
        }
        let h = self.height as f32;
        let raw = self.y as f32 + h - (value - y_min) * h / (y_max - y_min);
        // f32::max/min discard NaN, so a non-finite sample lands on a bound.
        raw.max(self.y as f32).min(self.bottom() as f32) as i32
    }
}

/// Line-and-dot chart of `values` (one per x step starting at `x_min`) in the
/// box `(x, y, dx, dy)`, titled underneath.
#[allow(clippy::too_many_arguments)]
pub fn draw_chart<D>(
    target: &mut D,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    title: &str,
    domain: Domain,
    values: &[f32],
) where
    D: DrawTarget<Color = Gray4>,
{
    let plot = Plot::new(x, y, dx, dy, domain);

    draw_text_centered(target, title, x + dx / 2, y + dy - 4, TextSize::Medium);
    draw_text_left(target, &bound_label(domain.y_max), x + 5, plot.y - 5, TextSize::Small);
    draw_text_left(target, &bound_label(domain.y_min), x + 5, plot.bottom() - 3, TextSize::Small);

    let stroke = PrimitiveStyle::with_stroke(INK, 1);

    if domain.y_min < 0.0 && domain.y_max > 0.0 {
        let zero = plot.y_pixel(0.0);
        draw_text_left(target, "0", plot.x - 20, zero, TextSize::Small);
        let mut dash = plot.x;
        while dash < plot.x + plot.width - 10 {
            Line::new(Point::new(dash, zero), Point::new(dash + 5, zero))
                .into_styled(stroke)
                .draw(target)
                .ok();
            dash += 10;
        }
    }

    let steps = (domain.x_max - domain.x_min).max(0) as usize + 1;
    let dot = PrimitiveStyle::with_fill(INK);
    let mut prev: Option<Point> = None;
    for (i, &value) in values.iter().take(steps).enumerate() {
        let p = Point::new(
            plot.x_pixel(domain.x_min + i as i32),
            plot.y_pixel(value),
        );
        Circle::with_center(p, 3).into_styled(dot).draw(target).ok();
        if let Some(prev) = prev {
            Line::new(prev, p).into_styled(stroke).draw(target).ok();
        }
        prev = Some(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer;
    use embedded_graphics::primitives::Rectangle;
    use pretty_assertions::assert_eq;

    fn day(y_max: f32) -> Domain {
        Domain {
            x_min: 0,
            x_max: 287,
            y_min: 0.0,
            y_max,
        }
    }

    #[test]
    fn plot_box_follows_label_gutter() {
        // "0" and "100": gutter 5 + 3 * 3.5 = 15.
        let plot = Plot::new(CHART_X, CHART_Y, CHART_W, CHART_H, day(100.0));
        assert_eq!(
            (plot.x, plot.y, plot.width, plot.height),
            (CHART_X + 25, CHART_Y + 35, 580, 245)
        );
    }

    #[test]
    fn half_scale_value_maps_to_mid_height() {
        let plot = Plot::new(CHART_X, CHART_Y, CHART_W, CHART_H, day(100.0));
        let h = plot.height as f32;
        let expected = (plot.y as f32 + h - 50.0 * h / 100.0) as i32;
        assert_eq!(plot.y_pixel(50.0), expected);
        assert_eq!(expected, 357);
        assert_eq!(plot.x_pixel(0), plot.x);
    }

    #[test]
    fn y_is_clamped_into_plot() {
        let plot = Plot::new(0, 0, 300, 200, day(10.0));
        assert_eq!(plot.y_pixel(1000.0), plot.y);
        assert_eq!(plot.y_pixel(-5.0), plot.bottom());
        assert_eq!(plot.y_pixel(f32::NAN), plot.y);
    }

    #[test]
    fn x_advances_in_whole_pixel_steps() {
        // 580 px over 287 steps: 2 px each, last sample at 574.
        let plot = Plot::new(0, 0, 600, 300, day(10.0));
        assert_eq!(plot.x_pixel(1) - plot.x_pixel(0), 2);
        assert_eq!(plot.x_pixel(143), plot.x + 286);
        assert_eq!(plot.x_pixel(287), plot.x + 574);
    }

    #[test]
    fn degenerate_domains_collapse_instead_of_dividing_by_zero() {
        let flat = Plot::new(0, 0, 300, 200, day(0.0));
        assert_eq!(flat.y_pixel(3.0), flat.bottom());
        let inverted = Plot::new(0, 0, 300, 200, day(-4.0));
        assert_eq!(inverted.y_pixel(3.0), inverted.bottom());

        let single = Plot::new(
            0,
            0,
            300,
            200,
            Domain {
                x_min: 5,
                x_max: 5,
                y_min: 0.0,
                y_max: 1.0,
            },
        );
        assert_eq!(single.x_pixel(5), single.x);
    }

    #[test]
    fn draws_only_supplied_samples() {
        let mut fb = Framebuffer::new(SCREEN_W as u32, SCREEN_H as u32);
        draw_chart(&mut fb, CHART_X, CHART_Y, CHART_W, CHART_H, "t", day(4.0), &[4.0, 4.0]);
        let plot = Plot::new(CHART_X, CHART_Y, CHART_W, CHART_H, day(4.0));
        // Nothing right of the second sample.
        let tail_x = plot.x_pixel(1) + 2;
        let tail = Rectangle::new(
            Point::new(tail_x, plot.y),
            Size::new((plot.x + plot.width - tail_x) as u32, plot.height as u32),
        );
        assert_eq!(fb.count_in(&tail, INK), 0);
        // Both samples sit on the top edge of the plot.
        assert_eq!(fb.pixel(plot.x, plot.y), Some(INK));
        assert_eq!(fb.pixel(plot.x_pixel(1), plot.y), Some(INK));
    }

    #[test]
    fn zero_line_only_for_signed_domains() {
        let signed = Domain {
            x_min: 0,
            x_max: 10,
            y_min: -10.0,
            y_max: 10.0,
        };
        let mut fb = Framebuffer::new(400, 300);
        draw_chart(&mut fb, 0, 0, 400, 300, "", signed, &[]);
        let plot = Plot::new(0, 0, 400, 300, signed);
        let zero = plot.y_pixel(0.0);
        assert_eq!(fb.pixel(plot.x, zero), Some(INK));
        assert_eq!(fb.pixel(plot.x + 7, zero), Some(PAPER));

        let mut fb = Framebuffer::new(400, 300);
        draw_chart(&mut fb, 0, 0, 400, 300, "", day(10.0), &[]);
        let plot = Plot::new(0, 0, 400, 300, day(10.0));
        assert_eq!(fb.pixel(plot.x, plot.y_pixel(5.0)), Some(PAPER));
    }
}
