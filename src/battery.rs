/// Cell voltage shown as 0 %.
pub const EMPTY_MV: u32 = 3300;
/// Cell voltage shown as 100 % (on charger the cell floats above 4.2 V).
pub const FULL_MV: u32 = 4350;

/// 12-bit ADC at 11 dB attenuation, read uncalibrated.
const ADC_MAX: u32 = 4096;
const ADC_FULL_SCALE_MV: u32 = 3600;
/// The battery reaches GPIO35 through a 1:1 divider.
const DIVIDER: u32 = 2;

pub trait BatteryGauge {
    /// State of charge, 0..=100.
    fn percent(&mut self) -> anyhow::Result<u8>;
}

/// Linear state of charge between [`EMPTY_MV`] and [`FULL_MV`], clamped.
pub fn voltage_to_percent(mv: u32) -> u8 {
    let mv = mv.clamp(EMPTY_MV, FULL_MV);
    ((mv - EMPTY_MV) * 100 / (FULL_MV - EMPTY_MV)) as u8
}

/// Battery voltage for a raw ADC sample.
pub fn raw_to_millivolts(raw: u16) -> u32 {
    u32::from(raw) * ADC_FULL_SCALE_MV / ADC_MAX * DIVIDER
}

#[cfg(target_os = "espidf")]
pub use device::AdcBattery;

#[cfg(target_os = "espidf")]
mod device {
    use anyhow::Result;
    use esp_idf_hal::adc::attenuation::DB_11;
    use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
    use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
    use esp_idf_hal::adc::ADC1;
    use esp_idf_hal::gpio::Gpio35;
    use log::info;

    use super::*;

    /// Samples averaged per reading.
    const SAMPLES: u32 = 8;

    pub struct AdcBattery<'d> {
        channel: AdcChannelDriver<'d, Gpio35, AdcDriver<'d, ADC1>>,
    }

    impl<'d> AdcBattery<'d> {
        pub fn new(adc: ADC1, pin: Gpio35) -> Result<Self> {
            let config = AdcChannelConfig {
                attenuation: DB_11,
                ..Default::default()
            };
            let channel = AdcChannelDriver::new(AdcDriver::new(adc)?, pin, &config)?;
            info!("Battery ADC ready on GPIO35");
            Ok(Self { channel })
        }
    }

    impl BatteryGauge for AdcBattery<'_> {
        fn percent(&mut self) -> Result<u8> {
            let mut total = 0u32;
            for _ in 0..SAMPLES {
                total += u32::from(self.channel.read_raw()?);
            }
            let mv = raw_to_millivolts((total / SAMPLES) as u16);
            let pct = voltage_to_percent(mv);
            info!("Battery: {} mV ({}%)", mv, pct);
            Ok(pct)
        }
    }
}
