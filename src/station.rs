use log::{info, warn};

use crate::battery::BatteryGauge;
use crate::config::redacted_url;
use crate::epd::Panel;
use crate::error::{FetchError, JoinError};
use crate::framebuffer::Framebuffer;
use crate::sensor::{refresh_climate, ClimateSensor};
use crate::solar;
use crate::state::DeviceState;
use crate::time_sync::Clock;
use crate::views;

/// WiFi station that is joined for one fetch and released afterwards.
pub trait Network {
    /// Associate and bring the interface up. Returns the AP RSSI when known.
    fn join(&mut self) -> Result<Option<i8>, JoinError>;
    fn get(&mut self, url: &str) -> Result<String, FetchError>;
    fn leave(&mut self);
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub wifi_joined: bool,
    pub fetch_ok: bool,
    /// None when no sensor is fitted.
    pub sensor_ok: Option<bool>,
    pub panel_ok: bool,
}

pub struct Station<N, P, S, B, C> {
    pub network: N,
    pub panel: P,
    pub sensor: Option<S>,
    pub battery: B,
    pub clock: C,
    pub kiosk_url: String,
}

impl<N, P, S, B, C> Station<N, P, S, B, C>
where
    N: Network,
    P: Panel,
    S: ClimateSensor,
    B: BatteryGauge,
    C: Clock,
{
    /// Join, measure, fetch, draw, push, release.
    ///
    /// Only a failed join changes what ends up on the panel: the WiFi error
    /// frame replaces the dashboard for that cycle and nothing is fetched.
    /// Any other failure is logged and the dashboard is drawn from whatever
    /// `state` already holds.
    pub fn run_cycle(&mut self, state: &mut DeviceState, fb: &mut Framebuffer) -> CycleReport {
        let mut report = CycleReport {
            wifi_joined: false,
            fetch_ok: false,
            sensor_ok: None,
            panel_ok: false,
        };

        let rssi = match self.network.join() {
            Ok(rssi) => rssi,
            Err(e) => {
                warn!("{}", e);
                views::draw_wifi_error(fb, &e.ssid);
                report.panel_ok = self.push(fb);
                return report;
            }
        };
        report.wifi_joined = true;
        state.network.rssi = rssi;

        match self.battery.percent() {
            Ok(pct) => state.network.battery_percent = pct,
            Err(e) => warn!("battery read failed: {}", e),
        }

        if let Some(sensor) = self.sensor.as_mut() {
            report.sensor_ok = Some(refresh_climate(sensor, state));
        }

        match self
            .network
            .get(&self.kiosk_url)
            .and_then(|body| solar::update_from_body(&mut state.solar, &body))
        {
            Ok(()) => {
                report.fetch_ok = true;
                state.last_update = self.clock.now();
            }
            Err(e) => warn!(
                "kiosk fetch from {} failed: {}",
                redacted_url(&self.kiosk_url),
                e
            ),
        }

        views::draw_dashboard(fb, state);
        report.panel_ok = self.push(fb);
        self.network.leave();

        info!(
            "cycle: wifi={} fetch={} sensor={:?} panel={} rssi={:?} battery={}%",
            report.wifi_joined,
            report.fetch_ok,
            report.sensor_ok,
            report.panel_ok,
            state.network.rssi,
            state.network.battery_percent
        );
        report
    }

    fn push(&mut self, fb: &Framebuffer) -> bool {
        match self.panel.push_full(fb) {
            Ok(()) => true,
            Err(e) => {
                warn!("panel push failed: {:#}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use crate::framebuffer::{FB_HEIGHT, FB_WIDTH};
    use crate::sensor::Reading;
    use crate::state::Climate;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = include_str!("sample_kiosk.json");

    #[derive(Default)]
    struct FakeNetwork {
        fail_join: bool,
        /// None answers every GET with a 503.
        body: Option<String>,
        gets: Vec<String>,
        leaves: usize,
    }

    impl Network for FakeNetwork {
        fn join(&mut self) -> Result<Option<i8>, JoinError> {
            if self.fail_join {
                Err(JoinError {
                    ssid: "garage-ap".into(),
                    reason: "no AP found".into(),
                })
            } else {
                Ok(Some(-61))
            }
        }

        fn get(&mut self, url: &str) -> Result<String, FetchError> {
            self.gets.push(url.to_string());
            self.body.clone().ok_or(FetchError::Status(503))
        }

        fn leave(&mut self) {
            self.leaves += 1;
        }
    }

    #[derive(Default)]
    struct FakePanel {
        frames: Vec<Vec<u8>>,
    }

    impl Panel for FakePanel {
        fn push_full(&mut self, fb: &Framebuffer) -> anyhow::Result<()> {
            self.frames.push(fb.as_bytes().to_vec());
            Ok(())
        }
    }

    struct FakeSensor(Result<Reading, SensorError>);

    impl ClimateSensor for FakeSensor {
        fn read(&mut self) -> Result<Reading, SensorError> {
            self.0.clone()
        }
    }

    struct FixedBattery(u8);

    impl BatteryGauge for FixedBattery {
        fn percent(&mut self) -> anyhow::Result<u8> {
            Ok(self.0)
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> Option<String> {
            Some("19.10.2026 12:05".into())
        }
    }

    type TestStation = Station<FakeNetwork, FakePanel, FakeSensor, FixedBattery, FixedClock>;

    fn station(network: FakeNetwork, sensor: Option<FakeSensor>) -> TestStation {
        Station {
            network,
            panel: FakePanel::default(),
            sensor,
            battery: FixedBattery(72),
            clock: FixedClock,
            kiosk_url: "https://kiosk.example/?kk=secret".into(),
        }
    }

    fn online() -> FakeNetwork {
        FakeNetwork {
            body: Some(SAMPLE.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn failed_join_shows_ssid_and_skips_fetch() {
        let mut st = station(
            FakeNetwork {
                fail_join: true,
                ..Default::default()
            },
            None,
        );
        let mut state = DeviceState::new();
        let before = state.clone();
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);

        let report = st.run_cycle(&mut state, &mut fb);

        assert_eq!(
            report,
            CycleReport {
                wifi_joined: false,
                fetch_ok: false,
                sensor_ok: None,
                panel_ok: true,
            }
        );
        assert!(st.network.gets.is_empty());
        assert_eq!(state, before);

        let mut expected = Framebuffer::new(FB_WIDTH, FB_HEIGHT);
        views::draw_wifi_error(&mut expected, "garage-ap");
        assert_eq!(st.panel.frames.len(), 1);
        assert!(st.panel.frames[0] == expected.as_bytes());
    }

    #[test]
    fn successful_cycle_updates_snapshot_and_stamps_time() {
        let mut st = station(online(), None);
        let mut state = DeviceState::new();
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);

        let report = st.run_cycle(&mut state, &mut fb);

        assert!(report.wifi_joined && report.fetch_ok && report.panel_ok);
        assert_eq!(st.network.gets, vec!["https://kiosk.example/?kk=secret".to_string()]);
        assert_eq!(st.network.leaves, 1);
        assert_eq!(state.last_update.as_deref(), Some("19.10.2026 12:05"));
        assert_eq!(state.network.rssi, Some(-61));
        assert_eq!(state.network.battery_percent, 72);
        assert_eq!(state.solar.real_time_power, 3.412);
        assert_eq!(state.solar.history.len(), 288);

        let mut expected = Framebuffer::new(FB_WIDTH, FB_HEIGHT);
        views::draw_dashboard(&mut expected, &state);
        assert!(st.panel.frames[0] == expected.as_bytes());
    }

    #[test]
    fn failed_fetch_keeps_previous_snapshot() {
        let mut st = station(online(), None);
        let mut state = DeviceState::new();
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);
        st.run_cycle(&mut state, &mut fb);
        let solar_before = state.solar.clone();
        let stamp_before = state.last_update.clone();

        st.network.body = None;
        let report = st.run_cycle(&mut state, &mut fb);

        assert!(report.wifi_joined);
        assert!(!report.fetch_ok);
        assert_eq!(state.solar, solar_before);
        assert_eq!(state.last_update, stamp_before);
        assert_eq!(st.panel.frames.len(), 2);
        assert_eq!(st.network.leaves, 2);
    }

    #[test]
    fn malformed_body_keeps_previous_snapshot() {
        let mut st = station(
            FakeNetwork {
                body: Some("{\"realKpi\":".into()),
                ..Default::default()
            },
            None,
        );
        let mut state = DeviceState::new();
        let before = state.solar.clone();
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);

        let report = st.run_cycle(&mut state, &mut fb);

        assert!(!report.fetch_ok);
        assert_eq!(state.solar, before);
        assert_eq!(state.last_update, None);
    }

    #[test]
    fn sensor_result_is_reported_when_fitted() {
        let reading = Reading {
            temperature_c: 21.9,
            humidity_pct: 48.2,
        };
        let mut st = station(online(), Some(FakeSensor(Ok(reading))));
        let mut state = DeviceState::new();
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);

        let report = st.run_cycle(&mut state, &mut fb);
        assert_eq!(report.sensor_ok, Some(true));
        assert_eq!(
            state.climate,
            Some(Climate {
                temperature_c: 21,
                humidity_pct: 48,
            })
        );

        st.sensor = Some(FakeSensor(Err(SensorError::Crc("humidity"))));
        let report = st.run_cycle(&mut state, &mut fb);
        assert_eq!(report.sensor_ok, Some(false));
        assert_eq!(
            state.climate,
            Some(Climate {
                temperature_c: 21,
                humidity_pct: 48,
            })
        );
    }
}
