//! Advisory service client.
//!
//! Talks newline-delimited JSON over a persistent TCP connection to an
//! external advisory endpoint. The connection is lazily established on first
//! request; a dead or absent server degrades to `Err`, never a panic, so the
//! simulation can fall back to rule-based play.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9271;

/// Address of the advisory endpoint, `host:port`.
pub const ADDR_ENV: &str = "HEGEMON_ADVISORY_ADDR";
/// Optional bearer key forwarded with every request.
pub const KEY_ENV: &str = "HEGEMON_ADVISORY_KEY";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdvisoryRequest<'a> {
    country_id: &'a str,
    turn: u32,
    prompt: &'a str,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdvisoryResponse {
    response: Option<String>,
    latency_ms: Option<u64>,
    error: Option<String>,
}

/// Client for the advisory endpoint.
///
/// Holds one TCP stream across turns; advisory requests are rare (once per
/// cadence window per country) but slow, so the read timeout is generous.
pub struct AdvisoryClient {
    host: String,
    port: u16,
    api_key: Option<String>,
    stream: Option<TcpStream>,
    connect_timeout_ms: u64,
    read_timeout_ms: u64,
}

impl AdvisoryClient {
    pub fn new() -> Self {
        Self::with_address(DEFAULT_HOST, DEFAULT_PORT)
    }

    pub fn with_address(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            api_key: None,
            stream: None,
            connect_timeout_ms: 5_000,
            read_timeout_ms: 30_000,
        }
    }

    /// Build a client from the environment, or `None` when no endpoint is
    /// configured. `None` means the simulation runs without advisory input.
    pub fn from_env() -> Option<Self> {
        let addr = std::env::var(ADDR_ENV).ok()?;
        let (host, port) = match addr.rsplit_once(':') {
            Some((h, p)) => match p.parse::<u16>() {
                Ok(port) => (h.to_string(), port),
                Err(_) => {
                    log::warn!("{}='{}' has an invalid port, ignoring", ADDR_ENV, addr);
                    return None;
                }
            },
            None => (addr, DEFAULT_PORT),
        };
        let mut client = Self::with_address(host, port);
        client.api_key = std::env::var(KEY_ENV).ok();
        Some(client)
    }

    pub fn with_read_timeout(mut self, timeout_ms: u64) -> Self {
        self.read_timeout_ms = timeout_ms;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns Ok(true) if connected, Ok(false) if the server is not there.
    pub fn try_connect(&mut self) -> Result<bool> {
        if self.stream.is_some() {
            return Ok(true);
        }

        let addr = format!("{}:{}", self.host, self.port);
        log::info!("Connecting to advisory endpoint at {}", addr);

        match TcpStream::connect_timeout(
            &addr.parse().context("Invalid advisory address")?,
            Duration::from_millis(self.connect_timeout_ms),
        ) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(Duration::from_millis(self.read_timeout_ms)))
                    .context("Failed to set read timeout")?;
                stream
                    .set_write_timeout(Some(Duration::from_millis(5_000)))
                    .context("Failed to set write timeout")?;
                stream.set_nodelay(true).ok();

                log::info!("Connected to advisory endpoint");
                self.stream = Some(stream);
                Ok(true)
            }
            Err(e) => {
                log::warn!("Could not connect to advisory endpoint: {}", e);
                Ok(false)
            }
        }
    }

    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Disconnected from advisory endpoint");
        }
    }

    /// Request advice for one country. Returns the raw response text and the
    /// server-reported latency in milliseconds.
    pub fn advise(
        &mut self,
        country_id: &str,
        turn: u32,
        prompt: &str,
        max_tokens: usize,
    ) -> Result<(String, u64)> {
        if !self.try_connect()? {
            anyhow::bail!(
                "Advisory endpoint not available at {}:{}",
                self.host,
                self.port
            );
        }

        let request = AdvisoryRequest {
            country_id,
            turn,
            prompt,
            max_tokens,
            api_key: self.api_key.as_deref(),
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize request")?;

        // A failed round trip poisons the stream; drop it so the next call
        // reconnects instead of reading a half-consumed response.
        let result = self.round_trip(&request_json);
        if result.is_err() {
            self.stream = None;
        }
        result
    }

    fn round_trip(&mut self, request_json: &str) -> Result<(String, u64)> {
        let stream = self
            .stream
            .as_mut()
            .context("Advisory stream not connected")?;

        stream
            .write_all(request_json.as_bytes())
            .context("Failed to send request")?;
        stream.write_all(b"\n").context("Failed to send newline")?;
        stream.flush().context("Failed to flush")?;

        let mut reader = BufReader::new(stream.try_clone().context("Failed to clone stream")?);
        let mut response_line = String::new();
        reader
            .read_line(&mut response_line)
            .context("Failed to read response")?;

        let response: AdvisoryResponse =
            serde_json::from_str(&response_line).context("Failed to parse response")?;

        if let Some(error) = response.error {
            anyhow::bail!("Advisory endpoint error: {}", error);
        }
        let text = response
            .response
            .ok_or_else(|| anyhow::anyhow!("Missing response field"))?;
        Ok((text, response.latency_ms.unwrap_or(0)))
    }
}

impl Default for AdvisoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AdvisoryClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = AdvisoryRequest {
            country_id: "arcadia",
            turn: 3,
            prompt: "state",
            max_tokens: 512,
            api_key: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["countryId"], "arcadia");
        assert_eq!(json["turn"], 3);
        assert!(json.get("apiKey").is_none());
    }

    #[test]
    fn test_response_error_field_optional() {
        let ok: AdvisoryResponse =
            serde_json::from_str(r#"{"response":"hi","latencyMs":12}"#).unwrap();
        assert_eq!(ok.response.as_deref(), Some("hi"));
        assert_eq!(ok.latency_ms, Some(12));
        assert!(ok.error.is_none());

        let err: AdvisoryResponse = serde_json::from_str(r#"{"error":"overloaded"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("overloaded"));
    }

    #[test]
    fn test_advise_without_server_degrades_to_error() {
        // Port 1 is never listening.
        let mut client = AdvisoryClient::with_address("127.0.0.1", 1);
        let result = client.advise("arcadia", 3, "prompt", 64);
        assert!(result.is_err());
        assert!(!client.is_connected());
    }
}
