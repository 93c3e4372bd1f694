use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use super::constants::{
    DEFAULT_CHANNEL_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_DECODING_MESSAGE_SIZE,
};
use crate::common::{BenchError, BenchResult};

/// Parsed `host:port` address of a geyser provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub hostname: String,
    pub port: u16,
}

impl ProviderEndpoint {
    /// Parse `host:port`, `[v6]:port`, optionally prefixed with an `http(s)://` scheme
    pub fn parse(address: &str) -> BenchResult<Self> {
        let invalid = |reason| BenchError::InvalidAddress { address: address.to_string(), reason };

        let trimmed = address.trim();
        let trimmed = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(|| invalid("unclosed bracket"))?,
            None => host,
        };
        if host.is_empty() {
            return Err(invalid("empty hostname"));
        }
        if host.contains(':') && host.parse::<IpAddr>().is_err() {
            return Err(invalid("malformed hostname"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("port is not a number in 0-65535"))?;

        Ok(Self { hostname: host.to_string(), port })
    }

    /// Loopback targets are reached in plaintext, everything else over TLS
    pub fn is_local(&self) -> bool {
        let host = self.hostname.to_ascii_lowercase();
        if host == "localhost" || host.ends_with(".localhost") {
            return true;
        }
        host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
    }
}

impl FromStr for ProviderEndpoint {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hostname.contains(':') {
            write!(f, "[{}]:{}", self.hostname, self.port)
        } else {
            write!(f, "{}:{}", self.hostname, self.port)
        }
    }
}

/// One benchmarked provider: where it lives and how to authenticate
#[derive(Clone)]
pub struct ProviderConfig {
    pub endpoint: ProviderEndpoint,
    pub token: String,
}

impl ProviderConfig {
    pub fn new(endpoint: ProviderEndpoint, token: impl Into<String>) -> Self {
        Self { endpoint, token: token.into() }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Stream client tuning shared by both providers
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// Capacity of the queue between stream reads and record writes
    pub channel_size: usize,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
    /// Maximum decoded gRPC message size (bytes)
    pub max_decoding_message_size: usize,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            channel_size: DEFAULT_CHANNEL_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_decoding_message_size: DEFAULT_MAX_DECODING_MESSAGE_SIZE,
        }
    }
}

/// Parse a Go-style duration such as "300s", "5m", "1h30m", "1.5s" or "250ms".
/// A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> BenchResult<Duration> {
    let s = input.trim();
    let invalid = || BenchError::InvalidDuration(input.to_string());

    if s.is_empty() {
        return Err(invalid());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len =
            rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_nanos += value * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
