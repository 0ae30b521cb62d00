mod battery;
mod config;
mod epd;
mod error;
mod framebuffer;
mod http_client;
mod icons;
mod layout;
mod sensor;
mod solar;
mod state;
mod station;
mod time_sync;
mod views;
#[cfg(target_os = "espidf")]
mod wifi;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    device::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    preview::run()
}

#[cfg(target_os = "espidf")]
mod device {
    use anyhow::Result;
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
    use log::{info, warn};
    use std::thread;

    use crate::battery::AdcBattery;
    use crate::config;
    use crate::epd::{It8951, It8951Pins};
    use crate::framebuffer::{Framebuffer, FB_HEIGHT, FB_WIDTH};
    use crate::sensor::{Sht30, SHT30_ADDR};
    use crate::state::DeviceState;
    use crate::station::{Network, Station};
    use crate::time_sync::{self, SystemClock};
    use crate::wifi::WifiLink;

    // ── Power rails ─────────────────────────────────────────────────────
    /// Holds the system on after the power button is released.
    const PIN_MAIN_PWR: i32 = 2;
    const PIN_EXT_PWR_EN: i32 = 5;
    const PIN_EPD_PWR_EN: i32 = 23;

    // ── I2C (SHT30, RTC) ────────────────────────────────────────────────
    const I2C_FREQ_HZ: u32 = 100_000;

    /// Panel rails need this long before the IT8951 answers.
    const EPD_POWER_UP_MS: u32 = 1_000;

    fn esp_check(res: esp_idf_sys::esp_err_t, msg: &str) -> Result<()> {
        if res != esp_idf_sys::ESP_OK {
            Err(anyhow::anyhow!("{} (err {})", msg, res))
        } else {
            Ok(())
        }
    }

    /// Drive the M5Paper supply enables high. Raw GPIO so the levels stay
    /// latched for the lifetime of the firmware.
    fn enable_power_rails() -> Result<()> {
        let pins = [PIN_MAIN_PWR, PIN_EXT_PWR_EN, PIN_EPD_PWR_EN];
        let io_conf = esp_idf_sys::gpio_config_t {
            pin_bit_mask: pins.iter().fold(0u64, |mask, &p| mask | (1u64 << p)),
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        esp_check(unsafe { esp_idf_sys::gpio_config(&io_conf) }, "gpio_config")?;
        for pin in pins {
            esp_check(unsafe { esp_idf_sys::gpio_set_level(pin, 1) }, "gpio_set_level")?;
        }
        info!("Power rails ON");
        Ok(())
    }

    fn scan_i2c(i2c: &mut I2cDriver<'_>) -> Vec<u8> {
        let found: Vec<u8> = (1..=127u8)
            .filter(|&addr| i2c.write(addr, &[0], 50).is_ok())
            .collect();
        if found.is_empty() {
            info!("I2C scan: no devices found");
        } else {
            info!("I2C scan: found {} device(s): {:02X?}", found.len(), found);
        }
        found
    }

    pub fn run() -> Result<()> {
        esp_idf_sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        info!(
            "BOOT: m5paper_solar dashboard v{}",
            env!("CARGO_PKG_VERSION")
        );

        // ── 1. Power ──
        enable_power_rails()?;
        FreeRtos::delay_ms(EPD_POWER_UP_MS);

        // ── 2. Peripherals ──
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs_partition = EspDefaultNvsPartition::take()?;

        // ── 3. NVS config ──
        let nvs = EspNvs::new(nvs_partition, config::NS, true)?;
        let cfg = config::Config::load(&nvs);

        // ── 4. Panel ──
        let panel = It8951::new(
            peripherals.spi2,
            It8951Pins {
                sclk: pins.gpio14.into(),
                mosi: pins.gpio12.into(),
                miso: pins.gpio13.into(),
                cs: pins.gpio15.into(),
                hrdy: pins.gpio27.into(),
            },
        )?;
        info!("Display initialized OK");

        // ── 5. I2C + SHT30 ──
        let i2c_config = I2cConfig::new().baudrate(Hertz(I2C_FREQ_HZ));
        let mut i2c = I2cDriver::new(peripherals.i2c0, pins.gpio21, pins.gpio22, &i2c_config)?;
        let sensor = if scan_i2c(&mut i2c).contains(&SHT30_ADDR) {
            info!("SHT30 sensor ready");
            Some(Sht30::new(i2c))
        } else {
            warn!("SHT30 not found at 0x{:02X}", SHT30_ADDR);
            None
        };

        // ── 6. Battery ADC ──
        let battery = AdcBattery::new(peripherals.adc1, pins.gpio35)?;

        // ── 7. WiFi + NTP ──
        let mut network = WifiLink::new(peripherals.modem, sysloop, &cfg.wifi_ssid, &cfg.wifi_pass)?;
        let _sntp = match network.join() {
            Ok(_) => {
                let sntp = time_sync::sync_time(&cfg.timezone);
                network.leave();
                match sntp {
                    Ok(sntp) => Some(sntp),
                    Err(e) => {
                        warn!("NTP sync failed: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                warn!("{}; timestamps unavailable until NTP syncs", e);
                None
            }
        };

        // ── 8. Poll loop ──
        let mut station = Station {
            network,
            panel,
            sensor,
            battery,
            clock: SystemClock,
            kiosk_url: cfg.kiosk_url.clone(),
        };
        let mut state = DeviceState::new();
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);
        let interval = cfg.refresh_interval();

        info!("Entering poll loop ({}s interval)", interval.as_secs());
        loop {
            station.run_cycle(&mut state, &mut fb);
            thread::sleep(interval);
        }
    }
}

/// Desktop build: run one cycle against the bundled kiosk sample and write
/// the frame to a PGM file (default `dashboard.pgm`).
#[cfg(not(target_os = "espidf"))]
mod preview {
    use anyhow::{Context, Result};
    use std::fs::File;
    use std::io::BufWriter;

    use crate::battery::BatteryGauge;
    use crate::epd::Panel;
    use crate::error::{FetchError, JoinError, SensorError};
    use crate::framebuffer::{Framebuffer, FB_HEIGHT, FB_WIDTH};
    use crate::sensor::{ClimateSensor, Reading};
    use crate::state::DeviceState;
    use crate::station::{Network, Station};
    use crate::time_sync::SystemClock;

    const SAMPLE_BODY: &str = include_str!("sample_kiosk.json");

    struct SampleNetwork;

    impl Network for SampleNetwork {
        fn join(&mut self) -> Result<Option<i8>, JoinError> {
            Ok(Some(-58))
        }

        fn get(&mut self, _url: &str) -> Result<String, FetchError> {
            Ok(SAMPLE_BODY.to_string())
        }

        fn leave(&mut self) {}
    }

    struct PgmPanel {
        path: String,
    }

    impl Panel for PgmPanel {
        fn push_full(&mut self, fb: &Framebuffer) -> Result<()> {
            let file = File::create(&self.path).with_context(|| format!("create {}", self.path))?;
            fb.write_pgm(&mut BufWriter::new(file))?;
            Ok(())
        }
    }

    struct RoomClimate;

    impl ClimateSensor for RoomClimate {
        fn read(&mut self) -> Result<Reading, SensorError> {
            Ok(Reading {
                temperature_c: 21.5,
                humidity_pct: 45.0,
            })
        }
    }

    struct MainsPowered;

    impl BatteryGauge for MainsPowered {
        fn percent(&mut self) -> Result<u8> {
            Ok(100)
        }
    }

    pub fn run() -> Result<()> {
        let path = std::env::args().nth(1).unwrap_or_else(|| "dashboard.pgm".into());
        let mut station = Station {
            network: SampleNetwork,
            panel: PgmPanel { path: path.clone() },
            sensor: Some(RoomClimate),
            battery: MainsPowered,
            clock: SystemClock,
            kiosk_url: crate::config::Config::default().kiosk_url,
        };
        let mut state = DeviceState::new();
        let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);

        let report = station.run_cycle(&mut state, &mut fb);
        if !report.fetch_ok || !report.panel_ok {
            anyhow::bail!("preview cycle failed: {:?}", report);
        }
        println!("wrote {}x{} preview to {}", FB_WIDTH, FB_HEIGHT, path);
        Ok(())
    }
}
