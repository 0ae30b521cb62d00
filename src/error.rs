use thiserror::Error;

/// Why a kiosk fetch did not update the snapshot.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP transport error: {0}")]
    Transport(String),
    #[error("HTTP error: status {0}")]
    Status(u16),
    #[error("response too large (>{0} bytes)")]
    TooLarge(usize),
    #[error("kiosk reported failure (failCode {0})")]
    Upstream(i64),
    #[error("JSON parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Association with the access point failed; carries the SSID for the error frame.
#[derive(Debug, Error)]
#[error("WiFi join failed for '{ssid}': {reason}")]
pub struct JoinError {
    pub ssid: String,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    #[error("I2C bus error: {0}")]
    Bus(String),
    #[error("CRC mismatch on {0} word")]
    Crc(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(FetchError::Status(503).to_string(), "HTTP error: status 503");
        assert_eq!(
            FetchError::Upstream(20056).to_string(),
            "kiosk reported failure (failCode 20056)"
        );
        let join = JoinError {
            ssid: "garage".into(),
            reason: "timeout".into(),
        };
        assert_eq!(join.to_string(), "WiFi join failed for 'garage': timeout");
        assert_eq!(
            SensorError::Crc("humidity").to_string(),
            "CRC mismatch on humidity word"
        );
    }

    #[test]
    fn json_errors_convert_into_parse() {
        let err: FetchError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
