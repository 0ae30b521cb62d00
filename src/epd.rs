//! IT8951 e-paper controller as wired on the M5Paper.
//!
//! Every SPI transaction starts with a 16-bit preamble that selects command,
//! data write or data read; all words are big-endian and the host must wait
//! for HRDY before each one.

use crate::framebuffer::Framebuffer;

/// Full-frame sink for a rendered framebuffer.
pub trait Panel {
    fn push_full(&mut self, fb: &Framebuffer) -> anyhow::Result<()>;
}

// ── Wire protocol ───────────────────────────────────────────────────

pub const PREAMBLE_COMMAND: u16 = 0x6000;
pub const PREAMBLE_WRITE: u16 = 0x0000;
pub const PREAMBLE_READ: u16 = 0x1000;

pub const CMD_SYS_RUN: u16 = 0x0001;
pub const CMD_REG_RD: u16 = 0x0010;
pub const CMD_REG_WR: u16 = 0x0011;
pub const CMD_LD_IMG_AREA: u16 = 0x0021;
pub const CMD_LD_IMG_END: u16 = 0x0022;
pub const CMD_DPY_AREA: u16 = 0x0034;
pub const CMD_VCOM: u16 = 0x0039;
pub const CMD_GET_DEV_INFO: u16 = 0x0302;

/// Host interface packed-write enable.
pub const REG_I80CPCR: u16 = 0x0004;
/// Target image buffer address, low and high halves.
pub const REG_LISAR: u16 = 0x0208;
/// Non-zero while a waveform is still being driven.
pub const REG_LUTAFSR: u16 = 0x1224;

/// 16-level full refresh.
pub const UPDATE_MODE_GC16: u16 = 2;

const BPP_4: u16 = 2;
const ENDIAN_BIG: u16 = 1;
const ROTATE_0: u16 = 0;

/// M5Paper panel VCOM in millivolts (magnitude; the controller applies -).
pub const VCOM_MV: u16 = 2300;

/// Words returned by `GET_DEV_INFO`: size, image buffer address, two
/// 16-byte version strings.
pub const DEV_INFO_WORDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub width: u16,
    pub height: u16,
    pub image_buffer_addr: u32,
    pub firmware: String,
    pub lut: String,
}

/// Version strings are packed two ASCII bytes per word, NUL padded.
fn word_string(words: &[u16]) -> String {
    words
        .iter()
        .flat_map(|w| w.to_be_bytes())
        .take_while(|&b| b != 0)
        .map(char::from)
        .collect()
}

pub fn parse_device_info(words: &[u16; DEV_INFO_WORDS]) -> DeviceInfo {
    DeviceInfo {
        width: words[0],
        height: words[1],
        image_buffer_addr: u32::from(words[2]) | (u32::from(words[3]) << 16),
        firmware: word_string(&words[4..12]),
        lut: word_string(&words[12..20]),
    }
}

/// `LD_IMG_AREA` arguments for a 4 bpp big-endian load of the given area.
pub fn load_area_args(x: u16, y: u16, w: u16, h: u16) -> [u16; 5] {
    [(ENDIAN_BIG << 8) | (BPP_4 << 4) | ROTATE_0, x, y, w, h]
}

/// `DPY_AREA` arguments.
pub fn display_area_args(x: u16, y: u16, w: u16, h: u16, mode: u16) -> [u16; 5] {
    [x, y, w, h, mode]
}

/// `REG_WR` pairs pointing the next image load at `addr`.
pub fn target_address_writes(addr: u32) -> [(u16, u16); 2] {
    [
        (REG_LISAR + 2, (addr >> 16) as u16),
        (REG_LISAR, (addr & 0xFFFF) as u16),
    ]
}

#[cfg(target_os = "espidf")]
pub use device::{It8951, It8951Pins};

#[cfg(target_os = "espidf")]
mod device {
    use std::time::{Duration, Instant};

    use anyhow::{bail, Result};
    use embedded_graphics::geometry::OriginDimensions;
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
    use esp_idf_hal::spi::{config, SpiDeviceDriver, SpiDriver, SpiDriverConfig, SPI2};
    use esp_idf_hal::units::FromValueType;
    use log::info;

    use super::*;

    const SPI_BAUD_MHZ: u32 = 10;
    const READY_TIMEOUT: Duration = Duration::from_secs(5);
    const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);
    /// Bytes per SPI write while streaming pixels.
    const PIXEL_CHUNK: usize = 4096;

    /// M5Paper SPI wiring to the IT8951.
    pub struct It8951Pins {
        pub sclk: AnyOutputPin,
        pub mosi: AnyOutputPin,
        pub miso: AnyInputPin,
        pub cs: AnyOutputPin,
        pub hrdy: AnyInputPin,
    }

    pub struct It8951<'d> {
        spi: SpiDeviceDriver<'d, SpiDriver<'d>>,
        cs: PinDriver<'d, AnyOutputPin, Output>,
        hrdy: PinDriver<'d, AnyInputPin, Input>,
        info: DeviceInfo,
    }

    impl<'d> It8951<'d> {
        /// Bring up the bus, wake the controller and program VCOM. The panel
        /// supply rails must already be on.
        pub fn new(spi2: SPI2, pins: It8951Pins) -> Result<Self> {
            let driver = SpiDriver::new(
                spi2,
                pins.sclk,
                pins.mosi,
                Some(pins.miso),
                &SpiDriverConfig::new(),
            )?;
            let spi = SpiDeviceDriver::new(
                driver,
                Option::<AnyIOPin>::None,
                &config::Config::new().baudrate(SPI_BAUD_MHZ.MHz().into()),
            )?;
            let mut cs = PinDriver::output(pins.cs)?;
            cs.set_high()?;
            let hrdy = PinDriver::input(pins.hrdy)?;

            let mut epd = Self {
                spi,
                cs,
                hrdy,
                info: parse_device_info(&[0; DEV_INFO_WORDS]),
            };

            epd.command(CMD_SYS_RUN)?;
            let mut words = [0u16; DEV_INFO_WORDS];
            epd.command(CMD_GET_DEV_INFO)?;
            epd.read_words(&mut words)?;
            epd.info = parse_device_info(&words);
            info!(
                "IT8951: {}x{} buf=0x{:08X} fw={:?} lut={:?}",
                epd.info.width,
                epd.info.height,
                epd.info.image_buffer_addr,
                epd.info.firmware,
                epd.info.lut
            );
            if epd.info.width == 0 || epd.info.height == 0 {
                bail!("IT8951 did not report a panel size");
            }

            epd.write_reg(REG_I80CPCR, 0x0001)?;
            epd.command_args(CMD_VCOM, &[0x0001, VCOM_MV])?;
            info!("IT8951 VCOM set to -{} mV", VCOM_MV);
            Ok(epd)
        }

        fn wait_ready(&self, timeout: Duration) -> Result<()> {
            let start = Instant::now();
            while self.hrdy.is_low() {
                if start.elapsed() > timeout {
                    bail!("IT8951 busy for more than {:?}", timeout);
                }
                FreeRtos::delay_ms(1);
            }
            Ok(())
        }

        /// One CS-framed transaction: preamble, then `body`.
        fn transaction<F>(&mut self, preamble: u16, body: F) -> Result<()>
        where
            F: FnOnce(&mut Self) -> Result<()>,
        {
            self.wait_ready(READY_TIMEOUT)?;
            self.cs.set_low()?;
            let result = self
                .spi
                .write(&preamble.to_be_bytes())
                .map_err(anyhow::Error::from)
                .and_then(|_| body(self));
            self.cs.set_high()?;
            result
        }

        fn command(&mut self, cmd: u16) -> Result<()> {
            self.transaction(PREAMBLE_COMMAND, |epd| {
                epd.wait_ready(READY_TIMEOUT)?;
                epd.spi.write(&cmd.to_be_bytes())?;
                Ok(())
            })
        }

        fn write_word(&mut self, word: u16) -> Result<()> {
            self.transaction(PREAMBLE_WRITE, |epd| {
                epd.wait_ready(READY_TIMEOUT)?;
                epd.spi.write(&word.to_be_bytes())?;
                Ok(())
            })
        }

        fn read_words(&mut self, out: &mut [u16]) -> Result<()> {
            self.transaction(PREAMBLE_READ, |epd| {
                epd.wait_ready(READY_TIMEOUT)?;
                let mut dummy = [0u8; 2];
                epd.spi.read(&mut dummy)?;
                for word in out.iter_mut() {
                    epd.wait_ready(READY_TIMEOUT)?;
                    let mut buf = [0u8; 2];
                    epd.spi.read(&mut buf)?;
                    *word = u16::from_be_bytes(buf);
                }
                Ok(())
            })
        }

        fn command_args(&mut self, cmd: u16, args: &[u16]) -> Result<()> {
            self.command(cmd)?;
            for &arg in args {
                self.write_word(arg)?;
            }
            Ok(())
        }

        fn write_reg(&mut self, reg: u16, value: u16) -> Result<()> {
            self.command_args(CMD_REG_WR, &[reg, value])
        }

        fn read_reg(&mut self, reg: u16) -> Result<u16> {
            self.command_args(CMD_REG_RD, &[reg])?;
            let mut value = [0u16];
            self.read_words(&mut value)?;
            Ok(value[0])
        }

        fn wait_refresh_done(&mut self) -> Result<()> {
            let start = Instant::now();
            while self.read_reg(REG_LUTAFSR)? != 0 {
                if start.elapsed() > REFRESH_TIMEOUT {
                    bail!("IT8951 refresh did not finish within {:?}", REFRESH_TIMEOUT);
                }
                FreeRtos::delay_ms(10);
            }
            Ok(())
        }
    }

    impl Panel for It8951<'_> {
        fn push_full(&mut self, fb: &Framebuffer) -> Result<()> {
            let size = fb.size();
            let (w, h) = (size.width as u16, size.height as u16);
            if w != self.info.width || h != self.info.height {
                bail!(
                    "framebuffer {}x{} does not match panel {}x{}",
                    w,
                    h,
                    self.info.width,
                    self.info.height
                );
            }

            let t0 = Instant::now();
            self.wait_refresh_done()?;
            for (reg, value) in target_address_writes(self.info.image_buffer_addr) {
                self.write_reg(reg, value)?;
            }
            self.command_args(CMD_LD_IMG_AREA, &load_area_args(0, 0, w, h))?;
            self.transaction(PREAMBLE_WRITE, |epd| {
                for chunk in fb.as_bytes().chunks(PIXEL_CHUNK) {
                    epd.wait_ready(READY_TIMEOUT)?;
                    epd.spi.write(chunk)?;
                }
                Ok(())
            })?;
            self.command(CMD_LD_IMG_END)?;
            self.command_args(
                CMD_DPY_AREA,
                &display_area_args(0, 0, w, h, UPDATE_MODE_GC16),
            )?;
            info!("IT8951 GC16 push {}x{} in {}ms", w, h, t0.elapsed().as_millis());
            Ok(())
        }
    }
}
