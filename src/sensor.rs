use crc::{Crc, CRC_8_NRSC_5};
use log::{info, warn};

use crate::error::SensorError;
use crate::state::{Climate, DeviceState};

/// SHT30 on the M5Paper's internal bus (ADDR pin low).
pub const SHT30_ADDR: u8 = 0x44;

/// Single shot, high repeatability, clock stretching disabled.
pub const CMD_MEASURE_HIGH: [u8; 2] = [0x24, 0x00];

/// Worst-case high-repeatability conversion time.
pub const MEASURE_DELAY_MS: u32 = 16;

/// Sensirion CRC-8: poly 0x31, init 0xFF, no reflection.
const SHT_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl Reading {
    /// Whole degrees and percent, truncated toward zero.
    pub fn truncated(&self) -> Climate {
        Climate {
            temperature_c: self.temperature_c as i32,
            humidity_pct: self.humidity_pct as i32,
        }
    }
}

pub trait ClimateSensor {
    fn read(&mut self) -> Result<Reading, SensorError>;
}

fn checked_word(bytes: &[u8], what: &'static str) -> Result<u16, SensorError> {
    if SHT_CRC.checksum(&bytes[..2]) != bytes[2] {
        return Err(SensorError::Crc(what));
    }
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Decode the 6-byte measurement frame: temperature word, CRC, humidity
/// word, CRC.
pub fn decode_measurement(frame: &[u8; 6]) -> Result<Reading, SensorError> {
    let raw_t = checked_word(&frame[0..3], "temperature")?;
    let raw_rh = checked_word(&frame[3..6], "humidity")?;
    Ok(Reading {
        temperature_c: -45.0 + 175.0 * f32::from(raw_t) / 65535.0,
        humidity_pct: 100.0 * f32::from(raw_rh) / 65535.0,
    })
}

/// Read the sensor into `state.climate`. A failed read keeps the previous
/// values. Returns whether the read succeeded.
pub fn refresh_climate<S>(sensor: &mut S, state: &mut DeviceState) -> bool
where
    S: ClimateSensor + ?Sized,
{
    match sensor.read() {
        Ok(reading) => {
            let climate = reading.truncated();
            info!(
                "SHT30: {} C, {} %RH",
                climate.temperature_c, climate.humidity_pct
            );
            state.climate = Some(climate);
            true
        }
        Err(e) => {
            warn!("SHT30 read failed: {}", e);
            false
        }
    }
}

#[cfg(target_os = "espidf")]
pub use device::Sht30;

#[cfg(target_os = "espidf")]
mod device {
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::i2c::I2cDriver;
    use log::info;

    use super::*;

    const I2C_TIMEOUT_TICKS: u32 = 100;

    pub struct Sht30<'d> {
        i2c: I2cDriver<'d>,
    }

    impl<'d> Sht30<'d> {
        pub fn new(i2c: I2cDriver<'d>) -> Self {
            info!("SHT30 on I2C 0x{:02X}", SHT30_ADDR);
            Self { i2c }
        }
    }

    impl ClimateSensor for Sht30<'_> {
        fn read(&mut self) -> Result<Reading, SensorError> {
            self.i2c
                .write(SHT30_ADDR, &CMD_MEASURE_HIGH, I2C_TIMEOUT_TICKS)
                .map_err(|e| SensorError::Bus(e.to_string()))?;
            FreeRtos::delay_ms(MEASURE_DELAY_MS);
            let mut frame = [0u8; 6];
            self.i2c
                .read(SHT30_ADDR, &mut frame, I2C_TIMEOUT_TICKS)
                .map_err(|e| SensorError::Bus(e.to_string()))?;
            decode_measurement(&frame)
        }
    }
}
