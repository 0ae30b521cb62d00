use embedded_graphics::{pixelcolor::Gray4, prelude::*};

/// Dashboard icons. Each raster is `size x size` little-endian 16-bit
/// samples, row-major, with the gray level (0 black .. 15 white) in the top
/// nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    RealTimePower,
    YieldToday,
    YieldMonth,
    YieldYear,
    YieldTotal,
    Co2,
    Coal,
    Trees,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitMode {
    /// Copy all 16 gray levels, white included.
    Gray,
    /// Black wherever the icon is darker than [`HIGH_CONTRAST_CUTOFF`];
    /// everything else is left untouched.
    HighContrast,
}

/// Levels below this count as ink in [`BlitMode::HighContrast`].
pub const HIGH_CONTRAST_CUTOFF: u8 = 15;

// ── 88x88 tile icons ────────────────────────────────────────────────

static ICON_REAL_TIME_POWER_88: &[u8] = include_bytes!("icons/real_time_power_88.raw");
static ICON_YIELD_TODAY_88: &[u8] = include_bytes!("icons/yield_today_88.raw");
static ICON_YIELD_MONTH_88: &[u8] = include_bytes!("icons/yield_month_88.raw");
static ICON_YIELD_YEAR_88: &[u8] = include_bytes!("icons/yield_year_88.raw");
static ICON_YIELD_TOTAL_88: &[u8] = include_bytes!("icons/yield_total_88.raw");

// ── 52x52 gauge icons ───────────────────────────────────────────────

static ICON_CO2_52: &[u8] = include_bytes!("icons/co2_52.raw");
static ICON_COAL_52: &[u8] = include_bytes!("icons/coal_52.raw");
static ICON_TREES_52: &[u8] = include_bytes!("icons/trees_52.raw");

impl Icon {
    pub const ALL: [Icon; 8] = [
        Icon::RealTimePower,
        Icon::YieldToday,
        Icon::YieldMonth,
        Icon::YieldYear,
        Icon::YieldTotal,
        Icon::Co2,
        Icon::Coal,
        Icon::Trees,
    ];

    /// Edge length in pixels.
    pub fn size(self) -> u32 {
        match self {
            Self::Co2 | Self::Coal | Self::Trees => 52,
            _ => 88,
        }
    }

    fn data(self) -> &'static [u8] {
        match self {
            Self::RealTimePower => ICON_REAL_TIME_POWER_88,
            Self::YieldToday => ICON_YIELD_TODAY_88,
            Self::YieldMonth => ICON_YIELD_MONTH_88,
            Self::YieldYear => ICON_YIELD_YEAR_88,
            Self::YieldTotal => ICON_YIELD_TOTAL_88,
            Self::Co2 => ICON_CO2_52,
            Self::Coal => ICON_COAL_52,
            Self::Trees => ICON_TREES_52,
        }
    }

    /// Draw the icon with its top-left corner at `(x, y)`.
    pub fn draw<D>(self, target: &mut D, x: i32, y: i32, mode: BlitMode)
    where
        D: DrawTarget<Color = Gray4>,
    {
        blit(target, Point::new(x, y), self.size(), self.data(), mode);
    }
}

/// Blit a raw `width`-wide raster of 16-bit samples. A truncated raster just
/// draws fewer pixels.
pub fn blit<D>(target: &mut D, origin: Point, width: u32, data: &[u8], mode: BlitMode)
where
    D: DrawTarget<Color = Gray4>,
{
    if width == 0 {
        return;
    }
    let pixels = data.chunks_exact(2).enumerate().filter_map(move |(i, sample)| {
        let level = (u16::from_le_bytes([sample[0], sample[1]]) >> 12) as u8;
        let at = origin + Point::new((i as u32 % width) as i32, (i as u32 / width) as i32);
        match mode {
            BlitMode::Gray => Some(Pixel(at, Gray4::new(level))),
            BlitMode::HighContrast if level < HIGH_CONTRAST_CUTOFF => Some(Pixel(at, Gray4::BLACK)),
            BlitMode::HighContrast => None,
        }
    });
    target.draw_iter(pixels).ok();
}
