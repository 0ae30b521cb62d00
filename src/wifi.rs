use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{
    AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
};
use log::{info, warn};

use crate::error::{FetchError, JoinError};
use crate::http_client;
use crate::station::Network;

/// RSSI of the associated AP, logged with the current WiFi mode.
fn log_wifi_diag(label: &str) -> Option<i8> {
    unsafe {
        let mut mode: esp_idf_sys::wifi_mode_t = 0;
        let mode_str = if esp_idf_sys::esp_wifi_get_mode(&mut mode) == esp_idf_sys::ESP_OK {
            match mode {
                x if x == esp_idf_sys::wifi_mode_t_WIFI_MODE_STA => "STA",
                x if x == esp_idf_sys::wifi_mode_t_WIFI_MODE_AP => "AP",
                x if x == esp_idf_sys::wifi_mode_t_WIFI_MODE_APSTA => "AP+STA",
                _ => "?",
            }
        } else {
            "err"
        };

        let mut ap_info: esp_idf_sys::wifi_ap_record_t = core::mem::zeroed();
        let ap_rc = esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap_info);
        if ap_rc == esp_idf_sys::ESP_OK {
            info!(
                "WiFi [{}]: mode={} assoc=YES rssi={} ch={}",
                label, mode_str, ap_info.rssi, ap_info.primary
            );
            Some(ap_info.rssi)
        } else {
            info!(
                "WiFi [{}]: mode={} assoc=NO (ap_info err={})",
                label, mode_str, ap_rc
            );
            None
        }
    }
}

/// Station-mode WiFi that is brought up for one fetch per cycle and shut
/// down again.
pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    ssid: String,
}

impl WifiLink {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        ssid: &str,
        password: &str,
    ) -> Result<Self> {
        let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), None)?;

        let auth = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let mut wifi_ssid = heapless::String::<32>::new();
        let mut wifi_pass = heapless::String::<64>::new();
        if wifi_ssid.push_str(ssid).is_err() {
            warn!("WiFi SSID longer than 32 bytes, truncated");
        }
        if wifi_pass.push_str(password).is_err() {
            warn!("WiFi password longer than 64 bytes, truncated");
        }

        esp_wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: wifi_ssid,
            password: wifi_pass,
            auth_method: auth,
            ..Default::default()
        }))?;

        Ok(Self {
            wifi: BlockingWifi::wrap(esp_wifi, sysloop)?,
            ssid: ssid.to_string(),
        })
    }

    fn join_error(&self, reason: impl std::fmt::Display) -> JoinError {
        JoinError {
            ssid: self.ssid.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Network for WifiLink {
    fn join(&mut self) -> Result<Option<i8>, JoinError> {
        self.wifi.start().map_err(|e| self.join_error(e))?;
        info!("WiFi connecting to '{}'...", self.ssid);

        let t0 = unsafe { esp_idf_sys::esp_timer_get_time() };
        if let Err(e) = self.wifi.connect() {
            log_wifi_diag("connect FAIL");
            self.leave();
            return Err(self.join_error(e));
        }
        let elapsed_ms = (unsafe { esp_idf_sys::esp_timer_get_time() } - t0) / 1000;
        info!("WiFi connect OK ({}ms)", elapsed_ms);

        if let Err(e) = self.wifi.wait_netif_up() {
            self.leave();
            return Err(self.join_error(e));
        }
        match self.wifi.wifi().sta_netif().get_ip_info() {
            Ok(ip_info) => info!("WiFi connected, IP: {}", ip_info.ip),
            Err(e) => warn!("WiFi IP info unavailable: {}", e),
        }

        Ok(log_wifi_diag("joined"))
    }

    fn get(&mut self, url: &str) -> Result<String, FetchError> {
        http_client::https_get(url)
    }

    fn leave(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            info!("WiFi disconnect: {}", e);
        }
        if let Err(e) = self.wifi.stop() {
            warn!("WiFi stop failed: {}", e);
        }
    }
}
