use embedded_graphics::{
    pixelcolor::Gray4,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};

use crate::icons::{BlitMode, Icon};
use crate::layout::*;
use crate::state::SolarData;

/// One figure with its icon and a two-line caption.
struct Figure {
    icon: Icon,
    value: f32,
    caption: [&'static str; 2],
}

fn tiles(solar: &SolarData) -> [Figure; TILE_COUNT as usize] {
    [
        Figure {
            icon: Icon::RealTimePower,
            value: solar.real_time_power,
            caption: ["Real-Time", "power(kW)"],
        },
        Figure {
            icon: Icon::YieldToday,
            value: solar.daily_energy,
            caption: ["Yield Today", "(kWh)"],
        },
        Figure {
            icon: Icon::YieldMonth,
            value: solar.month_energy,
            caption: ["Yield this", "Month(kWh)"],
        },
        Figure {
            icon: Icon::YieldYear,
            value: solar.year_energy,
            caption: ["Yield this", "Year(kWh)"],
        },
        Figure {
            icon: Icon::YieldTotal,
            value: solar.cumulative_energy,
            caption: ["Total Yield", "(kWh)"],
        },
    ]
}

/// Gauge center, icon top-left corner and figure.
fn gauges(solar: &SolarData) -> [(Point, Point, Figure); 3] {
    [
        (
            Point::new(760, 300),
            Point::new(734, 225),
            Figure {
                icon: Icon::Co2,
                value: solar.co2_avoided,
                caption: ["Avoided of", "CO2 (kg)"],
            },
        ),
        (
            Point::new(685, 430),
            Point::new(659, 360),
            Figure {
                icon: Icon::Coal,
                value: solar.coal_saved,
                caption: ["Std. coal", "saved"],
            },
        ),
        (
            Point::new(835, 430),
            Point::new(809, 360),
            Figure {
                icon: Icon::Trees,
                value: solar.trees_planted,
                caption: ["trees", "planted"],
            },
        ),
    ]
}

/// Value over a two-line caption, centered on column `cx`.
fn draw_figure_text<D>(target: &mut D, cx: i32, value_top: i32, caption_top: i32, figure: &Figure)
where
    D: DrawTarget<Color = Gray4>,
{
    draw_text_centered(target, &format_value(figure.value, 4), cx, value_top, TextSize::Large);
    draw_text_centered(target, figure.caption[0], cx, caption_top, TextSize::Medium);
    draw_text_centered(target, figure.caption[1], cx, caption_top + 20, TextSize::Medium);
}

/// The five KPI tiles across the top of the body, with separators.
pub fn draw_tiles<D>(target: &mut D, solar: &SolarData)
where
    D: DrawTarget<Color = Gray4>,
{
    let stroke = PrimitiveStyle::with_stroke(INK, 1);
    for k in 1..TILE_COUNT {
        let x = BODY_X + TILE_STRIDE * k;
        Line::new(Point::new(x, BODY_Y + 40), Point::new(x, TILE_SEPARATOR_BOTTOM))
            .into_styled(stroke)
            .draw(target)
            .ok();
    }

    let ty = BODY_Y + 5;
    for (k, tile) in tiles(solar).iter().enumerate() {
        let tx = BODY_X + 5 + TILE_STRIDE * k as i32;
        draw_figure_text(target, tx + 90, ty + 105, ty + 135, tile);
        tile.icon.draw(target, tx + 43, ty + 10, BlitMode::Gray);
    }
}

/// The three environmental-savings gauges right of the chart.
pub fn draw_gauges<D>(target: &mut D, solar: &SolarData)
where
    D: DrawTarget<Color = Gray4>,
{
    for (center, icon_at, figure) in gauges(solar).iter() {
        draw_arc(target, center.x, center.y, GAUGE_RADIUS, 0, 360);
        figure.icon.draw(target, icon_at.x, icon_at.y, BlitMode::HighContrast);
        draw_figure_text(target, center.x, center.y - 10, center.y + 15, figure);
    }
}
