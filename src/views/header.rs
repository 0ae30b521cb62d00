use embedded_graphics::{
    pixelcolor::Gray4,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};

use crate::layout::*;
use crate::state::DeviceState;

/// Major.minor only; patch releases do not change the label.
pub const VERSION_LABEL: &str = concat!(
    "Version ",
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR")
);

const BATTERY_W: i32 = 40;
const BATTERY_H: i32 = 16;

/// WiFi arcs as (minimum quality %, radius), largest first.
const WIFI_ARCS: [(u8, i32); 5] = [(80, 16), (40, 12), (20, 8), (10, 4), (0, 2)];

pub fn draw<D>(target: &mut D, state: &DeviceState)
where
    D: DrawTarget<Color = Gray4>,
{
    let (x, y, dx) = (HEADER_X, HEADER_Y, HEADER_W);

    draw_text_left(target, VERSION_LABEL, x + 5, y + 13, TextSize::Medium);

    let updated = format!("Updated {}", state.last_update.as_deref().unwrap_or("--"));
    draw_text_centered(target, &updated, x + dx / 2, y + 13, TextSize::Medium);

    draw_wifi(target, x + dx - 130, y + 26, state.network.wifi_quality());
    draw_battery(target, x + dx - 49, y + 11, state.network.battery_percent);
}

/// Quality text plus one arc per threshold reached; the arcs share a center
/// 12 px right of `x`.
fn draw_wifi<D>(target: &mut D, x: i32, y: i32, quality: u8)
where
    D: DrawTarget<Color = Gray4>,
{
    draw_text_right(target, &format!("{quality}%"), x - 2, y - 14, TextSize::Medium);
    for (min, r) in WIFI_ARCS {
        if quality >= min {
            draw_arc(target, x + 12, y, r, 225, 315);
        }
    }
}

/// Filled columns of the battery body: columns are inked left to right up to
/// and including the first one past `percent`.
fn battery_fill_columns(percent: u8) -> i32 {
    (0..BATTERY_W)
        .find(|&i| i as f32 * 100.0 / BATTERY_W as f32 > f32::from(percent))
        .map_or(BATTERY_W, |i| i + 1)
}

fn draw_battery<D>(target: &mut D, x: i32, y: i32, percent: u8)
where
    D: DrawTarget<Color = Gray4>,
{
    draw_frame(target, x, y, BATTERY_W as u32, BATTERY_H as u32);
    draw_frame(target, x + BATTERY_W, y + 3, 4, 10);
    Rectangle::new(
        Point::new(x, y),
        Size::new(battery_fill_columns(percent) as u32, BATTERY_H as u32),
    )
    .into_styled(PrimitiveStyle::with_fill(INK))
    .draw(target)
    .ok();
    draw_text_right(target, &format!("{percent}%"), x - 2, y + 1, TextSize::Medium);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer;
    use crate::state::NetworkStatus;

    #[test]
    fn version_label_omits_patch_level() {
        assert_eq!(VERSION_LABEL, "Version 1.0");
    }

    fn header_with(network: NetworkStatus) -> Framebuffer {
        let mut fb = Framebuffer::new(SCREEN_W as u32, SCREEN_H as u32);
        let state = DeviceState {
            network,
            ..DeviceState::new()
        };
        draw(&mut fb, &state);
        fb
    }

    #[test]
    fn battery_fill_tracks_charge() {
        assert_eq!(battery_fill_columns(0), 2);
        assert_eq!(battery_fill_columns(50), 22);
        assert_eq!(battery_fill_columns(99), BATTERY_W);
        assert_eq!(battery_fill_columns(100), BATTERY_W);
    }

    #[test]
    fn full_battery_fills_the_outline() {
        let fb = header_with(NetworkStatus {
            rssi: None,
            battery_percent: 100,
        });
        let bx = HEADER_X + HEADER_W - 49;
        let body = Rectangle::new(Point::new(bx, 11), Size::new(40, 16));
        assert_eq!(fb.count_in(&body, INK), 40 * 16);
    }

    #[test]
    fn strong_signal_draws_more_arcs() {
        let arc_box = Rectangle::new(
            Point::new(HEADER_X + HEADER_W - 130 - 1, 26 - 17),
            Size::new(30, 18),
        );
        let weak = header_with(NetworkStatus {
            rssi: Some(-99),
            battery_percent: 0,
        });
        let strong = header_with(NetworkStatus {
            rssi: Some(-40),
            battery_percent: 0,
        });
        let weak_ink = weak.count_in(&arc_box, INK);
        let strong_ink = strong.count_in(&arc_box, INK);
        assert!(weak_ink > 0);
        assert!(strong_ink > weak_ink, "{strong_ink} <= {weak_ink}");
    }

    #[test]
    fn header_stays_in_its_band() {
        let fb = header_with(NetworkStatus {
            rssi: Some(-60),
            battery_percent: 73,
        });
        let below = Rectangle::new(
            Point::new(0, HEADER_H + 1),
            Size::new(SCREEN_W as u32, (SCREEN_H - HEADER_H - 1) as u32),
        );
        assert_eq!(fb.count_in(&below, INK), 0);
        assert!(fb.count(INK) > 0);
    }
}
