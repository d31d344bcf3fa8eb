//! [`HttpTransport`] over the ESP-IDF HTTP client.

use core::time::Duration;

use embedded_svc::http::Status;
use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};
use esp_idf_svc::io::EspIOError;
use log::debug;

use crate::app::ports::{HttpResponse, HttpTransport};
use crate::error::HttpError;

/// Bodies past this are truncated; config and auth replies are small.
const MAX_BODY_BYTES: usize = 8 * 1024;

#[derive(Default)]
pub struct EspHttpTransport;

impl EspHttpTransport {
    pub fn new() -> Self {
        Self
    }

    fn client(timeout: Duration) -> Result<HttpClient<EspHttpConnection>, HttpError> {
        let conf = HttpClientConfiguration {
            timeout: Some(timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let conn = EspHttpConnection::new(&conf).map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(HttpClient::wrap(conn))
    }

    fn send(
        &mut self,
        url: &str,
        body: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let mut client = Self::client(timeout)?;
        let mut response = match body {
            None => client.get(url).map_err(map_io)?.submit().map_err(map_io)?,
            Some(body) => {
                let len = body.len().to_string();
                let headers = [
                    ("content-type", "application/x-www-form-urlencoded"),
                    ("content-length", len.as_str()),
                ];
                let mut request = client.post(url, &headers).map_err(map_io)?;
                request.write_all(body).map_err(map_io)?;
                request.flush().map_err(map_io)?;
                request.submit().map_err(map_io)?
            }
        };

        let status = response.status();
        let mut out = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let read = response.read(&mut chunk).map_err(map_io)?;
            if read == 0 {
                break;
            }
            let room = MAX_BODY_BYTES.saturating_sub(out.len());
            out.extend_from_slice(&chunk[..read.min(room)]);
        }
        debug!("HTTP | {} -> {} ({} bytes)", url, status, out.len());
        Ok(HttpResponse { status, body: out })
    }
}

fn map_io(e: EspIOError) -> HttpError {
    let code = e.0.code();
    if code == esp_idf_svc::sys::ESP_ERR_TIMEOUT as i32
        || code == esp_idf_svc::sys::ESP_ERR_HTTP_EAGAIN as i32
    {
        HttpError::Timeout
    } else {
        HttpError::Transport(e.to_string())
    }
}

impl HttpTransport for EspHttpTransport {
    fn get(&mut self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.send(url, None, timeout)
    }

    fn post(
        &mut self,
        url: &str,
        body: &[u8],
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        self.send(url, Some(body), timeout)
    }
}
