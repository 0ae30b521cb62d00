/// One sample per 5-minute bucket of a day.
pub const HISTORY_CAPACITY: usize = 288;

/// Ordered active-power samples of the current day plus the session peak
/// used to scale the chart.
///
/// Inserts past capacity are dropped. The peak only ever grows: a fresh
/// history built with [`PowerHistory::with_peak`] inherits it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PowerHistory {
    samples: heapless::Vec<f32, HISTORY_CAPACITY>,
    peak: f32,
}

impl PowerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peak(peak: f32) -> Self {
        Self {
            samples: heapless::Vec::new(),
            peak,
        }
    }

    /// Append one sample. Returns `false` and drops it once the history is full.
    pub fn push(&mut self, value: f32) -> bool {
        if self.samples.push(value).is_err() {
            return false;
        }
        if value > self.peak {
            self.peak = value;
        }
        true
    }

    /// Append samples in order until full; returns how many were dropped.
    pub fn extend_clamped<I: IntoIterator<Item = f32>>(&mut self, values: I) -> usize {
        let mut dropped = 0;
        for v in values {
            if !self.push(v) {
                dropped += 1;
            }
        }
        dropped
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        HISTORY_CAPACITY
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }
}

/// Inverter KPIs as last reported by the kiosk endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolarData {
    /// kW
    pub real_time_power: f32,
    /// kWh
    pub daily_energy: f32,
    pub month_energy: f32,
    pub year_energy: f32,
    pub cumulative_energy: f32,
    /// kg
    pub co2_avoided: f32,
    /// t
    pub coal_saved: f32,
    pub trees_planted: f32,
    pub history: PowerHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkStatus {
    pub rssi: Option<i8>,
    pub battery_percent: u8,
}

impl NetworkStatus {
    /// Signal quality 0..=100 derived from RSSI (-100 dBm → 0, -50 dBm → 100).
    pub fn wifi_quality(&self) -> u8 {
        match self.rssi {
            None => 0,
            Some(rssi) if rssi <= -100 => 0,
            Some(rssi) if rssi >= -50 => 100,
            Some(rssi) => (2 * (rssi as i16 + 100)) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Climate {
    pub temperature_c: i32,
    pub humidity_pct: i32,
}

/// Everything the dashboard shows. Owned by the main loop and handed to each
/// stage by reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceState {
    pub network: NetworkStatus,
    pub solar: SolarData,
    pub climate: Option<Climate>,
    pub last_update: Option<String>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_drops_samples_past_capacity() {
        let mut h = PowerHistory::new();
        let dropped = h.extend_clamped((0..HISTORY_CAPACITY + 12).map(|i| i as f32));
        assert_eq!(dropped, 12);
        assert_eq!(h.len(), HISTORY_CAPACITY);
        assert_eq!(h.as_slice()[0], 0.0);
        assert_eq!(h.as_slice()[HISTORY_CAPACITY - 1], (HISTORY_CAPACITY - 1) as f32);
        // Dropped samples never count toward the peak.
        assert_eq!(h.peak(), (HISTORY_CAPACITY - 1) as f32);
    }

    #[test]
    fn peak_is_inherited_and_only_grows() {
        let mut h = PowerHistory::with_peak(7.5);
        h.extend_clamped([1.0, 2.0, 3.0]);
        assert_eq!(h.peak(), 7.5);
        h.push(9.25);
        assert_eq!(h.peak(), 9.25);
        assert_eq!(h.as_slice(), &[1.0, 2.0, 3.0, 9.25]);
    }

    #[test]
    fn wifi_quality_is_clamped_linear() {
        let q = |rssi| NetworkStatus { rssi, battery_percent: 0 }.wifi_quality();
        assert_eq!(q(None), 0);
        assert_eq!(q(Some(-110)), 0);
        assert_eq!(q(Some(-100)), 0);
        assert_eq!(q(Some(-75)), 50);
        assert_eq!(q(Some(-51)), 98);
        assert_eq!(q(Some(-50)), 100);
        assert_eq!(q(Some(-20)), 100);
    }
}
