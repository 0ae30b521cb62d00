/// Source of the "Updated" timestamp shown in the header.
pub trait Clock {
    /// Current local time formatted for display, or None if the clock was
    /// never set.
    fn now(&self) -> Option<String>;
}

/// Wall clock kept by the C library (set by SNTP on the device).
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<String> {
        format_local_time()
    }
}

/// "DD.MM.YYYY HH:MM".
pub fn format_timestamp(tm: &libc::tm) -> String {
    format!(
        "{:02}.{:02}.{:04} {:02}:{:02}",
        tm.tm_mday,
        tm.tm_mon + 1,
        tm.tm_year + 1900,
        tm.tm_hour,
        tm.tm_min
    )
}

/// Format the current local time, or None if the clock is not set.
pub fn format_local_time() -> Option<String> {
    let mut now: libc::time_t = 0;
    unsafe {
        libc::time(&mut now);
    }
    // If time is near epoch, clock probably hasn't been set yet
    if now < 1_000_000_000 {
        return None;
    }
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    unsafe {
        libc::localtime_r(&now, &mut tm);
    }
    Some(format_timestamp(&tm))
}

#[cfg(target_os = "espidf")]
pub use device::sync_time;

#[cfg(target_os = "espidf")]
mod device {
    use anyhow::Result;
    use esp_idf_svc::sntp::{EspSntp, OperatingMode, SntpConf, SyncMode, SyncStatus};
    use log::{info, warn};
    use std::thread;
    use std::time::Duration;

    use super::format_local_time;

    const SNTP_SERVER: &str = "pool.ntp.org";
    const SYNC_TIMEOUT_MS: u32 = 20_000;
    const POLL_INTERVAL_MS: u32 = 250;

    /// Export `tz` as TZ and start SNTP. Blocks until the first sync or
    /// `SYNC_TIMEOUT_MS`; keep the returned handle alive for background
    /// re-syncs while WiFi is up.
    pub fn sync_time(tz: &str) -> Result<EspSntp<'static>> {
        info!("Setting timezone: {}", tz);
        std::env::set_var("TZ", tz);

        let conf = SntpConf {
            servers: [SNTP_SERVER, "time.nist.gov"],
            sync_mode: SyncMode::Immediate,
            operating_mode: OperatingMode::Poll,
        };

        info!("Starting SNTP sync with {}", SNTP_SERVER);
        let sntp = EspSntp::new_with_callback(&conf, |_| {
            info!("SNTP sync callback triggered");
        })?;

        let mut elapsed_ms = 0u32;
        while elapsed_ms < SYNC_TIMEOUT_MS {
            if sntp.get_sync_status() == SyncStatus::Completed {
                info!("SNTP time synchronized after {}ms", elapsed_ms);
                if let Some(t) = format_local_time() {
                    info!("Current local time: {}", t);
                }
                return Ok(sntp);
            }
            thread::sleep(Duration::from_millis(POLL_INTERVAL_MS as u64));
            elapsed_ms += POLL_INTERVAL_MS;
        }

        warn!(
            "SNTP not synced after {}s; \"Updated\" shows -- until it is",
            SYNC_TIMEOUT_MS / 1000
        );
        Ok(sntp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_day_first_with_padding() {
        let mut tm: libc::tm = unsafe { std::mem::zeroed() };
        tm.tm_mday = 5;
        tm.tm_mon = 0;
        tm.tm_year = 126;
        tm.tm_hour = 7;
        tm.tm_min = 3;
        assert_eq!(format_timestamp(&tm), "05.01.2026 07:03");
    }

    #[test]
    fn system_clock_is_set_on_a_host() {
        let now = SystemClock.now().expect("host clock is set");
        assert_eq!(now.len(), "DD.MM.YYYY HH:MM".len());
    }
}
