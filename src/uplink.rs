//! APRS-IS client for transmitting weather reports.
//!
//! Each report opens a short-lived connection, logs in with the station's
//! callsign and passcode, writes one packet and closes.

use crate::config::{StationConfig, UplinkConfig};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Default connect and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Uplink error types.
#[derive(Debug, Error)]
pub enum UplinkError {
    #[error("failed to connect to {server}: {message}")]
    Connect { server: String, message: String },
    #[error("timed out talking to {0}")]
    Timeout(String),
    #[error("uplink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// APRS-IS login passcode for `callsign`.
///
/// The SSID is ignored and letters are compared upper-cased.
pub fn passcode(callsign: &str) -> u16 {
    let base = callsign.split('-').next().unwrap_or_default().to_ascii_uppercase();

    let mut hash: u16 = 0x73e2;
    for pair in base.as_bytes().chunks(2) {
        hash ^= u16::from(pair[0]) << 8;
        if let Some(&low) = pair.get(1) {
            hash ^= u16::from(low);
        }
    }
    hash & 0x7fff
}

/// Client for a single APRS-IS server.
#[derive(Debug, Clone)]
pub struct AprsIsClient {
    server: String,
    login: String,
    passcode: u16,
    timeout: Duration,
}

impl AprsIsClient {
    /// Create a client logging in as `station`.
    pub fn new(config: &UplinkConfig, station: &StationConfig) -> Self {
        Self {
            server: config.server.clone(),
            login: station.source_address(),
            passcode: config
                .passcode
                .unwrap_or_else(|| passcode(&station.callsign)),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Login line including the trailing CRLF.
    pub fn login_line(&self) -> String {
        format!(
            "user {} pass {} vers rainwx {}\r\n",
            self.login,
            self.passcode,
            crate::VERSION
        )
    }

    /// Log in and transmit `packet`.
    pub async fn send(&self, packet: &str) -> Result<(), UplinkError> {
        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.server))
            .await
            .map_err(|_| UplinkError::Timeout(self.server.clone()))?
            .map_err(|e| UplinkError::Connect {
                server: self.server.clone(),
                message: e.to_string(),
            })?;

        let exchange = async {
            stream.write_all(self.login_line().as_bytes()).await?;
            stream.write_all(format!("{packet}\r\n").as_bytes()).await?;
            stream.flush().await?;
            stream.shutdown().await
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| UplinkError::Timeout(self.server.clone()))??;

        tracing::debug!(server = %self.server, "packet transmitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passcode_known_values() {
        assert_eq!(passcode("N0CALL"), 13023);
        assert_eq!(passcode("W1AW"), 25988);
    }

    #[test]
    fn test_passcode_ignores_ssid_and_case() {
        assert_eq!(passcode("n0call-15"), passcode("N0CALL"));
    }

    #[test]
    fn test_login_line() {
        let station = StationConfig {
            callsign: "N0CALL".to_string(),
            ssid: "13".to_string(),
            ..StationConfig::default()
        };
        let uplink = UplinkConfig {
            server: "127.0.0.1:14580".to_string(),
            passcode: None,
        };

        let client = AprsIsClient::new(&uplink, &station);
        assert_eq!(
            client.login_line(),
            format!("user N0CALL-13 pass 13023 vers rainwx {}\r\n", crate::VERSION)
        );

        let explicit = UplinkConfig {
            passcode: Some(12345),
            ..uplink
        };
        let client = AprsIsClient::new(&explicit, &station);
        assert!(client.login_line().contains("pass 12345 "));
    }
}
