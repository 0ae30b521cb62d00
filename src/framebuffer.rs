use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Dimensions, OriginDimensions, Size},
    pixelcolor::{Gray4, GrayColor},
    prelude::*,
    primitives::Rectangle,
    Pixel,
};

/// Logical framebuffer dimensions (landscape, same as the panel).
pub const FB_WIDTH: u32 = 960;
pub const FB_HEIGHT: u32 = 540;

/// 4 bpp grayscale framebuffer, two pixels per byte, left pixel in the high
/// nibble. Level 0 is black, 15 is white, which is also the IT8951's native
/// encoding, so rows go to the panel without conversion.
///
/// A full 960x540 frame is 259 200 bytes; on the device the allocation is
/// served from PSRAM (`CONFIG_SPIRAM_USE_MALLOC`).
pub struct Framebuffer {
    buf: Vec<u8>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    /// New framebuffer, cleared to white.
    pub fn new(width: u32, height: u32) -> Self {
        let row_bytes = width.div_ceil(2) as usize;
        Self {
            buf: vec![0xFF; row_bytes * height as usize],
            width,
            height,
        }
    }

    pub fn row_bytes(&self) -> usize {
        self.width.div_ceil(2) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear_color(&mut self, color: Gray4) {
        let l = color.luma();
        self.buf.fill((l << 4) | l);
    }

    /// Color at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Gray4> {
        let idx = self.index(x, y)?;
        let byte = self.buf[idx];
        let luma = if x % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        Some(Gray4::new(luma))
    }

    /// Write the frame as a binary PGM (P5), upscaling 4-bit levels to 8-bit.
    pub fn write_pgm<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "P5\n{} {}\n255\n", self.width, self.height)?;
        let mut row = Vec::with_capacity(self.width as usize);
        for y in 0..self.height as i32 {
            row.clear();
            for x in 0..self.width as i32 {
                let luma = self.pixel(x, y).map(|c| c.luma()).unwrap_or(15);
                row.push(luma * 17);
            }
            out.write_all(&row)?;
        }
        Ok(())
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.row_bytes() + x as usize / 2)
    }

    fn set(&mut self, x: i32, y: i32, luma: u8) {
        if let Some(idx) = self.index(x, y) {
            let byte = &mut self.buf[idx];
            if x % 2 == 0 {
                *byte = (*byte & 0x0F) | (luma << 4);
            } else {
                *byte = (*byte & 0xF0) | luma;
            }
        }
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = Gray4;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x, point.y, color.luma());
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let luma = color.luma();
        for y in area.rows() {
            for x in area.columns() {
                self.set(x, y, luma);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }
}

#[cfg(test)]
impl Framebuffer {
    /// Number of pixels exactly matching `color` inside `area`.
    pub fn count_in(&self, area: &Rectangle, color: Gray4) -> usize {
        let area = area.intersection(&self.bounding_box());
        let mut n = 0;
        for y in area.rows() {
            for x in area.columns() {
                if self.pixel(x, y) == Some(color) {
                    n += 1;
                }
            }
        }
        n
    }

    pub fn count(&self, color: Gray4) -> usize {
        self.count_in(&self.bounding_box(), color)
    }
}
