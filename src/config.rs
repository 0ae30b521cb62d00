use std::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use log::info;

pub const NS: &str = "solar_cfg";

#[cfg(target_os = "espidf")]
const KEY_WIFI_SSID: &str = "wifi_ssid";
#[cfg(target_os = "espidf")]
const KEY_WIFI_PASS: &str = "wifi_pass";
#[cfg(target_os = "espidf")]
const KEY_KIOSK_URL: &str = "kiosk_url";
#[cfg(target_os = "espidf")]
const KEY_REFRESH_SECS: &str = "refresh_secs";
#[cfg(target_os = "espidf")]
const KEY_TIMEZONE: &str = "timezone";

// Compiled-in defaults; build.rs fills the LOCAL_* vars from wifi.local.rs.
const DEFAULT_WIFI_SSID: &str = match option_env!("LOCAL_WIFI_SSID") {
    Some(v) => v,
    None => "YOUR_WIFI_SSID",
};
const DEFAULT_WIFI_PASS: &str = match option_env!("LOCAL_WIFI_PASS") {
    Some(v) => v,
    None => "",
};
const DEFAULT_KIOSK_URL: &str = match option_env!("LOCAL_KIOSK_URL") {
    Some(v) => v,
    None => "https://region02eu5.fusionsolar.huawei.com/rest/pvms/web/kiosk/v1/station-kiosk-file?kk=YOUR_KEY",
};
const DEFAULT_TIMEZONE: &str = "CET-1CEST,M3.5.0,M10.5.0/3";

pub const DEFAULT_REFRESH_SECS: u32 = 600;
pub const MIN_REFRESH_SECS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub kiosk_url: String,
    pub refresh_interval_secs: u32,
    pub timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi_ssid: DEFAULT_WIFI_SSID.to_string(),
            wifi_pass: DEFAULT_WIFI_PASS.to_string(),
            kiosk_url: DEFAULT_KIOSK_URL.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Refresh interval with the floor applied.
pub fn clamp_refresh_secs(secs: u32) -> u32 {
    secs.max(MIN_REFRESH_SECS)
}

/// `url` safe for the log: the `kk=` access key is masked and long URLs are
/// cut at 80 characters.
pub fn redacted_url(url: &str) -> String {
    let masked = match url.find("kk=") {
        Some(start) => {
            let value_start = start + 3;
            let value_end = url[value_start..]
                .find('&')
                .map_or(url.len(), |i| value_start + i);
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    };
    masked.chars().take(80).collect()
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(u64::from(clamp_refresh_secs(self.refresh_interval_secs)))
    }
}

/// Read a string from NVS, returning None if the key is absent or on error.
#[cfg(target_os = "espidf")]
fn nvs_get_str(nvs: &EspNvs<NvsDefault>, key: &str) -> Option<String> {
    let len = match nvs.str_len(key) {
        Ok(Some(len)) => len,
        _ => return None,
    };

    let mut buf = vec![0u8; len];
    match nvs.get_str(key, &mut buf) {
        Ok(Some(val)) => {
            let s = val.trim_end_matches('\0').to_string();
            if s.is_empty() { None } else { Some(s) }
        }
        _ => None,
    }
}

#[cfg(target_os = "espidf")]
impl Config {
    /// Load configuration from NVS, falling back to the compiled defaults for
    /// any missing keys.
    pub fn load(nvs: &EspNvs<NvsDefault>) -> Config {
        let defaults = Config::default();

        let wifi_ssid = nvs_get_str(nvs, KEY_WIFI_SSID).unwrap_or(defaults.wifi_ssid);
        info!("NVS wifi_ssid = {:?}", wifi_ssid);

        let wifi_pass = nvs_get_str(nvs, KEY_WIFI_PASS).unwrap_or(defaults.wifi_pass);
        info!("NVS wifi_pass = <{} chars>", wifi_pass.len());

        let kiosk_url = nvs_get_str(nvs, KEY_KIOSK_URL).unwrap_or(defaults.kiosk_url);
        info!("NVS kiosk_url = {}", redacted_url(&kiosk_url));

        let refresh_interval_secs = clamp_refresh_secs(
            nvs.get_u32(KEY_REFRESH_SECS)
                .unwrap_or(None)
                .unwrap_or(defaults.refresh_interval_secs),
        );
        info!("NVS refresh_secs = {}", refresh_interval_secs);

        let timezone = nvs_get_str(nvs, KEY_TIMEZONE).unwrap_or(defaults.timezone);
        info!("NVS timezone = {:?}", timezone);

        Config {
            wifi_ssid,
            wifi_pass,
            kiosk_url,
            refresh_interval_secs,
            timezone,
        }
    }
}
