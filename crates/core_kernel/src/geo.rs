//! Geographic coordinates of a farm

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A latitude/longitude pair in decimal degrees
///
/// Parsed from the `"lat,long"` form callers submit. Exact decimals keep
/// documents lossless across a store/fetch round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoCoordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GeoCoordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidCoordinates {
            value: format!("{},{}", latitude, longitude),
            reason: reason.to_string(),
        };
        if latitude < Decimal::from(-90) || latitude > Decimal::from(90) {
            return Err(invalid("latitude must be within [-90, 90]"));
        }
        if longitude < Decimal::from(-180) || longitude > Decimal::from(180) {
            return Err(invalid("longitude must be within [-180, 180]"));
        }
        Ok(Self { latitude, longitude })
    }
}

impl FromStr for GeoCoordinates {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidCoordinates {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let (lat, long) = s
            .split_once(',')
            .ok_or_else(|| invalid("expected \"latitude,longitude\""))?;
        let latitude = Decimal::from_str(lat.trim()).map_err(|_| invalid("latitude is not a number"))?;
        let longitude = Decimal::from_str(long.trim()).map_err(|_| invalid("longitude is not a number"))?;
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for GeoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_pair() {
        let coords: GeoCoordinates = "12.9716, 77.5946".parse().unwrap();
        assert_eq!(coords.latitude, dec!(12.9716));
        assert_eq!(coords.longitude, dec!(77.5946));
        assert_eq!(coords.to_string(), "12.9716,77.5946");
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!("91,0".parse::<GeoCoordinates>().is_err());
        assert!("0,-180.5".parse::<GeoCoordinates>().is_err());
    }

    #[test]
    fn test_free_text_rejected() {
        let err = "near the river".parse::<GeoCoordinates>().unwrap_err();
        assert!(err.to_string().contains("near the river"));
    }
}
