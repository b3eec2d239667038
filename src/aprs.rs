//! APRS weather report encoding.
//!
//! Produces a TNC2-format position report carrying the weather symbol and a
//! complete weather block in which only the 24-hour rain field is known:
//!
//! ```text
//! N0CALL-15>APRS,TCPIP*:!4152.80N/08737.80W_.../...g...t...p017comment
//! ```

use crate::config::StationConfig;
use thiserror::Error;

/// Destination and path used for packets injected over APRS-IS.
const DESTINATION_PATH: &str = "APRS,TCPIP*";

/// Largest value the three-digit rain field can carry.
pub const MAX_RAIN_FIELD: f64 = 999.0;

/// Encoding errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AprsError {
    #[error("latitude {0} out of range")]
    Latitude(f64),
    #[error("longitude {0} out of range")]
    Longitude(f64),
}

/// A weather report ready to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// Source address, e.g. `N0CALL-15`
    pub source: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Rain over the last 24 hours, in the station's counter units
    /// (hundredths of an inch for APRS)
    pub rain_24h: Option<f64>,
    pub comment: String,
}

impl WeatherReport {
    /// Build a report for `station`.
    pub fn for_station(station: &StationConfig, rain_24h: Option<f64>) -> Self {
        Self {
            source: station.source_address(),
            latitude: station.latitude,
            longitude: station.longitude,
            rain_24h,
            comment: station.comment.clone(),
        }
    }

    /// Encode as a single TNC2 line without line terminator.
    pub fn encode(&self) -> Result<String, AprsError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AprsError::Latitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AprsError::Longitude(self.longitude));
        }

        let lat = format_coordinate(self.latitude, 2, 'N', 'S');
        let lon = format_coordinate(self.longitude, 3, 'E', 'W');

        Ok(format!(
            "{}>{}:!{}/{}_.../...g...t...{}{}",
            self.source,
            DESTINATION_PATH,
            lat,
            lon,
            rain_field(self.rain_24h),
            self.comment
        ))
    }
}

/// `pNNN`, or `p...` when the value is unknown.
fn rain_field(rain: Option<f64>) -> String {
    match rain.filter(|r| r.is_finite()) {
        Some(r) => format!("p{:03}", r.round().clamp(0.0, MAX_RAIN_FIELD) as u16),
        None => "p...".to_string(),
    }
}

/// Degrees and decimal minutes, e.g. `4152.80N`.
///
/// Rounds on the total number of hundredths of a minute so the minutes part
/// never reads `60.00`.
fn format_coordinate(value: f64, degree_width: usize, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let hundredths = (value.abs() * 6000.0).round() as u64;
    let degrees = hundredths / 6000;
    let minutes = hundredths % 6000;

    format!(
        "{:0width$}{:02}.{:02}{}",
        degrees,
        minutes / 100,
        minutes % 100,
        hemisphere,
        width = degree_width
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(rain_24h: Option<f64>) -> WeatherReport {
        WeatherReport {
            source: "N0CALL-15".to_string(),
            latitude: 41.88,
            longitude: -87.63,
            rain_24h,
            comment: "rain gauge".to_string(),
        }
    }

    #[test]
    fn test_encode_with_rain() {
        assert_eq!(
            report(Some(17.0)).encode().unwrap(),
            "N0CALL-15>APRS,TCPIP*:!4152.80N/08737.80W_.../...g...t...p017rain gauge"
        );
    }

    #[test]
    fn test_encode_unknown_rain() {
        let packet = report(None).encode().unwrap();
        assert!(packet.contains("t...p...rain gauge"));

        let packet = report(Some(f64::NAN)).encode().unwrap();
        assert!(packet.contains("p..."));
    }

    #[test]
    fn test_rain_field_rounding_and_clamp() {
        assert_eq!(rain_field(Some(4.4)), "p004");
        assert_eq!(rain_field(Some(4.5)), "p005");
        assert_eq!(rain_field(Some(-3.0)), "p000");
        assert_eq!(rain_field(Some(1234.0)), "p999");
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(format_coordinate(-33.8688, 2, 'N', 'S'), "3352.13S");
        assert_eq!(format_coordinate(151.2093, 3, 'E', 'W'), "15112.56E");
        assert_eq!(format_coordinate(5.5, 3, 'E', 'W'), "00530.00E");
    }

    #[test]
    fn test_minutes_never_round_to_sixty() {
        assert_eq!(format_coordinate(45.999999, 2, 'N', 'S'), "4600.00N");
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let mut bad = report(None);
        bad.latitude = 95.0;
        assert_eq!(bad.encode(), Err(AprsError::Latitude(95.0)));

        let mut bad = report(None);
        bad.longitude = -181.0;
        assert_eq!(bad.encode(), Err(AprsError::Longitude(-181.0)));
    }

    #[test]
    fn test_for_station() {
        let station = StationConfig {
            callsign: "W1AW".to_string(),
            ssid: "0".to_string(),
            latitude: 41.7,
            longitude: -72.7,
            ..StationConfig::default()
        };
        let report = WeatherReport::for_station(&station, Some(2.0));
        assert_eq!(report.source, "W1AW");
        assert_eq!(report.rain_24h, Some(2.0));
    }
}
