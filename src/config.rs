//! Configuration for the rainfall reporter.

use crate::core::{DayBoundary, DayBoundaryKind};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default HTTP port for the ingest server.
pub const DEFAULT_PORT: u16 = 8080;

/// Longest free-text comment that fits an APRS position report.
pub const MAX_COMMENT_LEN: usize = 43;

/// Main configuration for the reporter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Station identity and location
    pub station: StationConfig,

    /// Where the ingest server listens
    pub listen: ListenConfig,

    /// Reporting cadence and data-quality tolerance
    pub report: ReportConfig,

    /// APRS-IS uplink; reports are only logged when absent
    pub uplink: Option<UplinkConfig>,
}

/// Station identity, position and local day definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub callsign: String,
    pub ssid: String,
    pub comment: String,
    /// Decimal degrees, north positive
    pub latitude: f64,
    /// Decimal degrees, east positive
    pub longitude: f64,
    /// IANA time zone used to decide where a day ends
    pub timezone: String,
    pub day_boundary: DayBoundaryKind,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            callsign: String::new(),
            ssid: "15".to_string(),
            comment: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            timezone: "UTC".to_string(),
            day_boundary: DayBoundaryKind::default(),
        }
    }
}

impl StationConfig {
    /// APRS source address, e.g. `N0CALL-15`. SSID 0 is left implicit.
    pub fn source_address(&self) -> String {
        if self.ssid == "0" {
            self.callsign.clone()
        } else {
            format!("{}-{}", self.callsign, self.ssid)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub address: IpAddr,
    /// 0 picks a free port
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl ListenConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// How often a weather packet is produced
    #[serde(rename = "interval_secs", with = "duration_serde")]
    pub interval: Duration,

    /// Allowed slack, beyond 24 hours, for the age of the baseline reading
    pub stale_threshold_minutes: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
            stale_threshold_minutes: 90,
        }
    }
}

/// APRS-IS server to transmit reports to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplinkConfig {
    /// `host:port`, e.g. `rotate.aprs2.net:14580`
    pub server: String,
    /// Login passcode; derived from the callsign when omitted
    #[serde(default)]
    pub passcode: Option<u16>,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rainwx")
            .join("config.json")
    }

    /// Check operator-supplied values and return a normalized copy.
    ///
    /// Callsign and SSID lose any surrounding `-`, and the callsign is
    /// upper-cased.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let station = &mut self.station;

        // Zero is what an unset coordinate looks like.
        if station.longitude == 0.0 || !(-180.0..=180.0).contains(&station.longitude) {
            return Err(ConfigError::InvalidLongitude(station.longitude));
        }
        if station.latitude == 0.0 || !(-90.0..=90.0).contains(&station.latitude) {
            return Err(ConfigError::InvalidLatitude(station.latitude));
        }

        station.ssid = station.ssid.trim_matches('-').to_string();
        if station.ssid.is_empty() {
            return Err(ConfigError::SsidEmpty);
        }
        if station.ssid.len() > 2 {
            return Err(ConfigError::SsidTooLong);
        }
        match station.ssid.parse::<u8>() {
            Ok(n) if n <= 15 => station.ssid = n.to_string(),
            _ => return Err(ConfigError::InvalidSsid(station.ssid.clone())),
        }

        station.callsign = station.callsign.trim_matches('-').to_ascii_uppercase();
        if station.callsign.is_empty() {
            return Err(ConfigError::MissingCallsign);
        }
        if station.callsign.len() > 8 {
            return Err(ConfigError::CallsignTooLong);
        }
        if station.callsign.len() < 3 {
            return Err(ConfigError::CallsignTooShort);
        }
        if !station.callsign.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidCallsign(station.callsign.clone()));
        }

        if station.comment.chars().count() > MAX_COMMENT_LEN {
            return Err(ConfigError::CommentTooLong);
        }

        self.timezone()?;

        if self.report.interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        if let Some(uplink) = &self.uplink {
            let valid = uplink
                .server
                .rsplit_once(':')
                .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidUplinkServer(uplink.server.clone()));
            }
        }

        Ok(self)
    }

    /// The station's time zone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.station
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.station.timezone.clone()))
    }

    /// The day-transition policy configured for this station.
    pub fn day_boundary(&self) -> Result<DayBoundary, ConfigError> {
        Ok(DayBoundary::new(self.station.day_boundary, self.timezone()?))
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("invalid longitude {0}")]
    InvalidLongitude(f64),
    #[error("invalid latitude {0}")]
    InvalidLatitude(f64),
    #[error("ssid empty")]
    SsidEmpty,
    #[error("ssid too long")]
    SsidTooLong,
    #[error("invalid ssid '{0}' (expected 0-15)")]
    InvalidSsid(String),
    #[error("missing callsign")]
    MissingCallsign,
    #[error("callsign too long")]
    CallsignTooLong,
    #[error("callsign too short")]
    CallsignTooShort,
    #[error("invalid callsign '{0}'")]
    InvalidCallsign(String),
    #[error("comment longer than {} characters", MAX_COMMENT_LEN)]
    CommentTooLong,
    #[error("report interval must be at least one second")]
    InvalidInterval,
    #[error("unknown time zone '{0}'")]
    UnknownTimezone(String),
    #[error("invalid uplink server '{0}' (expected host:port)")]
    InvalidUplinkServer(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.station.callsign = "n0call".to_string();
        config.station.latitude = 41.88;
        config.station.longitude = -87.63;
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen.port, DEFAULT_PORT);
        assert_eq!(config.listen.address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.station.ssid, "15");
        assert_eq!(config.report.interval, Duration::from_secs(300));
        assert_eq!(config.report.stale_threshold_minutes, 90);
        assert!(config.uplink.is_none());
    }

    #[test]
    fn test_validate_normalizes_identity() {
        let mut config = valid_config();
        config.station.callsign = "-n0call-".to_string();
        config.station.ssid = "-09".to_string();

        let config = config.validate().unwrap();
        assert_eq!(config.station.callsign, "N0CALL");
        assert_eq!(config.station.ssid, "9");
        assert_eq!(config.station.source_address(), "N0CALL-9");
    }

    #[test]
    fn test_validate_coordinates() {
        let mut config = valid_config();
        config.station.longitude = 0.0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::InvalidLongitude(0.0));

        let mut config = valid_config();
        config.station.latitude = 0.0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::InvalidLatitude(0.0));

        let mut config = valid_config();
        config.station.latitude = 91.0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::InvalidLatitude(91.0));
    }

    #[test]
    fn test_validate_ssid() {
        let mut config = valid_config();
        config.station.ssid = String::new();
        assert_eq!(config.validate().unwrap_err(), ConfigError::SsidEmpty);

        let mut config = valid_config();
        config.station.ssid = "115".to_string();
        assert_eq!(config.validate().unwrap_err(), ConfigError::SsidTooLong);

        let mut config = valid_config();
        config.station.ssid = "16".to_string();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::InvalidSsid("16".to_string())
        );
    }

    #[test]
    fn test_validate_interval() {
        let mut config = valid_config();
        config.report.interval = Duration::ZERO;
        assert_eq!(config.validate().unwrap_err(), ConfigError::InvalidInterval);

        let mut config = valid_config();
        config.report.interval = Duration::from_secs(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_callsign() {
        let mut config = valid_config();
        config.station.callsign = String::new();
        assert_eq!(config.validate().unwrap_err(), ConfigError::MissingCallsign);

        let mut config = valid_config();
        config.station.callsign = "AB".to_string();
        assert_eq!(config.validate().unwrap_err(), ConfigError::CallsignTooShort);

        let mut config = valid_config();
        config.station.callsign = "ABCDEFGHI".to_string();
        assert_eq!(config.validate().unwrap_err(), ConfigError::CallsignTooLong);

        let mut config = valid_config();
        config.station.callsign = "N0 CAL".to_string();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::InvalidCallsign("N0 CAL".to_string())
        );
    }

    #[test]
    fn test_validate_timezone_and_uplink() {
        let mut config = valid_config();
        config.station.timezone = "Mars/Olympus".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownTimezone(_))
        ));

        let mut config = valid_config();
        config.uplink = Some(UplinkConfig {
            server: "rotate.aprs2.net".to_string(),
            passcode: None,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUplinkServer(_))
        ));

        let mut config = valid_config();
        config.uplink = Some(UplinkConfig {
            server: "rotate.aprs2.net:14580".to_string(),
            passcode: None,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_day_boundary_from_config() {
        let mut config = valid_config();
        config.station.timezone = "America/Chicago".to_string();
        config.station.day_boundary = DayBoundaryKind::Weekday;

        let boundary = config.day_boundary().unwrap();
        assert_eq!(boundary, DayBoundary::Weekday(chrono_tz::America::Chicago));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "station": { "callsign": "W1AW", "latitude": 41.7, "longitude": -72.7 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.station.callsign, "W1AW");
        assert_eq!(config.station.ssid, "15");
        assert_eq!(config.listen.port, DEFAULT_PORT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_report_interval_key() {
        let json = r#"{ "report": { "interval_secs": 60, "stale_threshold_minutes": 30 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.report.interval, Duration::from_secs(60));
        assert_eq!(config.report.stale_threshold_minutes, 30);

        let written = serde_json::to_value(&config).unwrap();
        assert_eq!(written["report"]["interval_secs"], 60);
        assert!(written["report"].get("interval").is_none());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("rainwx-config-test-{}", std::process::id()))
            .join("config.json");
        let config = valid_config();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.station.callsign, "n0call");
        assert_eq!(loaded.report.interval, config.report.interval);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("rainwx-does-not-exist").join("config.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.listen.port, DEFAULT_PORT);
    }
}
