//! HTTP byte source for the emulator debug server
//!
//! Protocol:
//! - `GET {base}/read_byte?addr=0xAAAAAAAA` answers two hex digits, possibly
//!   padded with whitespace and interleaved with NUL bytes.
//! - A 5xx answer is a transient server fault and may be retried; any other
//!   non-success status is a protocol error.
//! - `GET {base}/status` answers JSON or a plaintext dump (see `core::status`).
//!
//! One `reqwest::blocking::Client` is kept for the lifetime of the reader so
//! the connection pool is reused across the thousands of single-byte requests
//! a snapshot issues.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::client::config::EmulatorSettings;
use crate::core::error::MemoryError;
use crate::core::status::{parse_status, EmulatorStatus};
use crate::core::traits::ByteSource;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("status request to {url} failed: {source}")]
    Status {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Memory reader over the emulator's HTTP debug interface
#[derive(Debug, Clone)]
pub struct HttpMemoryClient {
    client: reqwest::blocking::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpMemoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_settings(settings: &EmulatorSettings) -> Result<Self, ClientError> {
        Self::new(&settings.base_url, settings.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the emulator's `/status` endpoint
    pub fn status(&self) -> Result<EmulatorStatus, ClientError> {
        let url = format!("{}/status", self.base_url);
        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.text())
            .map_err(|source| ClientError::Status {
                url: url.clone(),
                source,
            })?;
        let status = parse_status(&body);
        debug!(
            running = status.running,
            rom_loaded = status.rom_loaded,
            "[http] Emulator status"
        );
        Ok(status)
    }

    fn transport_error(address: u32, e: &reqwest::Error) -> MemoryError {
        MemoryError::Transport {
            address,
            timed_out: e.is_timeout(),
            reason: e.to_string(),
        }
    }
}

impl ByteSource for HttpMemoryClient {
    fn read_byte(&self, address: u32) -> Result<u8, MemoryError> {
        let url = format!("{}/read_byte?addr=0x{:08X}", self.base_url, address);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Self::transport_error(address, &e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Self::transport_error(address, &e))?;

        if status.is_server_error() {
            return Err(MemoryError::Transport {
                address,
                timed_out: false,
                reason: format!("HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }
        if !status.is_success() {
            return Err(MemoryError::Protocol {
                address,
                body: format!("HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }

        let byte = parse_byte_response(address, &body)?;
        trace!(address = %format!("{:#010x}", address), byte, "[http] Read byte");
        Ok(byte)
    }
}

/// Interpret a `/read_byte` body
///
/// NUL bytes are dropped wherever they appear and surrounding whitespace is
/// trimmed; what remains must be exactly two hex digits. Anything else is a
/// protocol error, never zero.
pub fn parse_byte_response(address: u32, body: &str) -> Result<u8, MemoryError> {
    let cleaned: String = body.chars().filter(|&c| c != '\0').collect();
    let trimmed = cleaned.trim();
    let malformed = || MemoryError::Protocol {
        address,
        body: body.to_string(),
    };
    if trimmed.len() != 2 || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    u8::from_str_radix(trimmed, 16).map_err(|_| malformed())
}
