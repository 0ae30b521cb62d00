pub mod chart;
pub mod header;
pub mod kpi;

use embedded_graphics::{pixelcolor::Gray4, prelude::*};

use crate::layout::*;
use crate::state::{DeviceState, HISTORY_CAPACITY};
use chart::Domain;

/// Draw the full dashboard for `state`. Never fails; whatever the snapshot
/// holds is what gets drawn.
pub fn draw_dashboard<D>(target: &mut D, state: &DeviceState)
where
    D: DrawTarget<Color = Gray4>,
{
    target.clear(PAPER).ok();

    header::draw(target, state);

    draw_frame(target, BODY_X, BODY_Y, BODY_W as u32, BODY_H as u32);
    kpi::draw_tiles(target, &state.solar);

    let history = &state.solar.history;
    let domain = Domain {
        x_min: 0,
        x_max: HISTORY_CAPACITY as i32 - 1,
        y_min: 0.0,
        y_max: history.peak(),
    };
    chart::draw_chart(
        target,
        CHART_X,
        CHART_Y,
        CHART_W,
        CHART_H,
        CHART_TITLE,
        domain,
        history.as_slice(),
    );

    kpi::draw_gauges(target, &state.solar);
}

/// Full-screen notice shown instead of the dashboard when WiFi is down.
pub fn draw_wifi_error<D>(target: &mut D, ssid: &str)
where
    D: DrawTarget<Color = Gray4>,
{
    target.clear(PAPER).ok();
    let message = format!("WiFi error: [{ssid}]");
    draw_text_centered(target, &message, SCREEN_W / 2, SCREEN_H / 2, TextSize::Huge);
}
