use std::fmt::Display;

use crate::error::FetchError;

/// Largest body accepted from the kiosk endpoint.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub(crate) fn transport<E: Display>(e: E) -> FetchError {
    FetchError::Transport(e.to_string())
}

/// Drain `read` into a UTF-8 string, failing once more than `limit` bytes
/// arrive. `read` returns 0 at end of body.
pub fn read_body<R, E>(mut read: R, limit: usize) -> Result<String, FetchError>
where
    R: FnMut(&mut [u8]) -> Result<usize, E>,
    E: Display,
{
    let mut body: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = read(&mut buf).map_err(transport)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
        if body.len() > limit {
            return Err(FetchError::TooLarge(limit));
        }
    }
    String::from_utf8(body).map_err(transport)
}

/// Perform an HTTPS GET request and return the response body as a String.
#[cfg(target_os = "espidf")]
pub fn https_get(url: &str) -> Result<String, FetchError> {
    use embedded_svc::http::client::Client;
    use embedded_svc::http::Method;
    use embedded_svc::io::Read;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use log::info;

    const TIMEOUT_MS: u64 = 15_000;

    let config = Configuration {
        timeout: Some(std::time::Duration::from_millis(TIMEOUT_MS)),
        use_global_ca_store: true,
        crt_bundle_attach: Some(esp_idf_sys::esp_crt_bundle_attach),
        ..Default::default()
    };

    let connection = EspHttpConnection::new(&config).map_err(transport)?;
    let mut client = Client::wrap(connection);

    let mut request = client
        .request(Method::Get, url, &[("Accept", "application/json")])
        .map_err(transport)?
        .submit()
        .map_err(transport)?;

    let status = request.status();
    info!("HTTP GET {} -> status {}", crate::config::redacted_url(url), status);

    if status != 200 {
        return Err(FetchError::Status(status));
    }

    read_body(|buf| request.read(buf), MAX_BODY_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves `data` in chunks of at most `chunk` bytes.
    fn chunked(data: &[u8], chunk: usize) -> impl FnMut(&mut [u8]) -> Result<usize, String> + '_ {
        let mut pos = 0;
        move |buf: &mut [u8]| {
            let n = chunk.min(buf.len()).min(data.len() - pos);
            buf[..n].copy_from_slice(&data[pos..pos + n]);
            pos += n;
            Ok(n)
        }
    }

    #[test]
    fn reads_until_end_of_body() {
        let body = "{\"data\":\"x\"}".repeat(300);
        let text = read_body(chunked(body.as_bytes(), 700), MAX_BODY_BYTES).unwrap();
        assert_eq!(text, body);
    }

    #[test]
    fn oversized_body_is_rejected() {
        let body = vec![b'a'; 5000];
        let err = read_body(chunked(&body, 1024), 4096).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge(4096)));
    }

    #[test]
    fn read_errors_become_transport_errors() {
        let err = read_body(|_: &mut [u8]| Err::<usize, _>("connection reset"), 10).unwrap_err();
        assert!(matches!(err, FetchError::Transport(ref m) if m == "connection reset"));
    }

    #[test]
    fn non_utf8_body_is_a_transport_error() {
        let body = [0xFFu8, 0xFE];
        let err = read_body(chunked(&body, 2), 10).unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
