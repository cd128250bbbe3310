//! Heat profiles and boost arithmetic.

use std::time::Duration;

use crate::data::lantern::LanternColor;
use crate::error::{Error, Result};

/// Number of heat profiles stored on the device.
pub const PROFILE_COUNT: u8 = 4;

/// Lowest settable profile temperature in Fahrenheit.
pub const TEMPERATURE_MIN_FAHRENHEIT: f64 = 400.0;

/// Highest settable profile temperature in Fahrenheit.
pub const TEMPERATURE_MAX_FAHRENHEIT: f64 = 620.0;

/// Celsius added on top of the profile when boosting temperature.
pub const BOOST_ADDED_TEMP_CELSIUS: f32 = 5.0;

/// Seconds added when boosting time.
pub const BOOST_ADDED_TIME_SECS: f32 = 10.0;

/// Largest per-profile boost temperature in Celsius.
pub const BOOST_TEMP_MAX_CELSIUS: f32 = 20.0;

/// Largest per-profile boost duration in seconds.
pub const BOOST_TIME_MAX_SECS: f32 = 60.0;

/// Check a per-profile boost temperature, in Celsius.
pub fn check_boost_temperature(celsius: f32) -> Result<f32> {
    check_boost_value("boost temperature", celsius, BOOST_TEMP_MAX_CELSIUS)
}

/// Check a per-profile boost duration, in seconds.
pub fn check_boost_time(seconds: f32) -> Result<f32> {
    check_boost_value("boost time", seconds, BOOST_TIME_MAX_SECS)
}

fn check_boost_value(name: &str, value: f32, max: f32) -> Result<f32> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Check that `index` names one of the device's profiles.
pub fn check_profile_index(index: u8) -> Result<u8> {
    if index < PROFILE_COUNT {
        Ok(index)
    } else {
        Err(Error::InvalidParameter {
            name: "profile".to_string(),
            value: index.to_string(),
        })
    }
}

/// Encode a profile index for the current-profile parameter.
pub fn profile_index_bytes(index: u8) -> [u8; 4] {
    (index as f32).to_le_bytes()
}

/// Encode a profile index for the legacy profile selector.
pub fn profile_selector_bytes(index: u8) -> [u8; 4] {
    [index, 0, 0, 0]
}

/// One heat profile.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeatProfile {
    /// Position on the device, 0-based.
    pub index: u8,
    /// Display name, upper-cased.
    pub name: String,
    /// Preheat temperature in Celsius.
    pub temperature_celsius: Option<f32>,
    /// Heat cycle duration.
    pub duration: Option<Duration>,
    /// Lantern color shown while the profile runs.
    pub color: Option<LanternColor>,
}

impl HeatProfile {
    /// Preheat temperature in Fahrenheit.
    pub fn temperature_fahrenheit(&self) -> Option<f64> {
        self.temperature_celsius
            .map(|c| crate::utils::celsius_to_fahrenheit(c as f64))
    }
}

/// Time override for "boost now": the remaining cycle after subtracting the
/// profile's base time, plus the fixed boost increment.
pub fn boost_time_override(total_time: f32, base_time: f32) -> f32 {
    (total_time.max(0.0) - base_time).max(0.0) + BOOST_ADDED_TIME_SECS
}

/// Temperature override for "boost now", in Celsius.
pub fn boost_temp_override(target_temp: f32, base_temp: f32) -> f32 {
    target_temp - base_temp + BOOST_ADDED_TEMP_CELSIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boost_bounds() {
        assert_eq!(check_boost_temperature(0.0).unwrap(), 0.0);
        assert_eq!(check_boost_temperature(20.0).unwrap(), 20.0);
        assert!(check_boost_temperature(20.5).is_err());
        assert!(check_boost_temperature(-1.0).is_err());
        assert!(check_boost_temperature(f32::NAN).is_err());

        assert_eq!(check_boost_time(60.0).unwrap(), 60.0);
        assert!(check_boost_time(61.0).is_err());
        assert!(check_boost_time(-0.5).is_err());
        assert!(check_boost_time(f32::INFINITY).is_err());
    }

    #[test]
    fn test_profile_index_encoding() {
        assert_eq!(profile_index_bytes(0), [0, 0, 0, 0]);
        assert_eq!(profile_index_bytes(1), [0, 0, 128, 63]);
        assert_eq!(profile_index_bytes(2), [0, 0, 0, 64]);
        assert_eq!(profile_index_bytes(3), [0, 0, 64, 64]);
        assert_eq!(profile_selector_bytes(2), [2, 0, 0, 0]);
    }

    #[test]
    fn test_check_profile_index() {
        assert_eq!(check_profile_index(3).unwrap(), 3);
        assert!(check_profile_index(4).is_err());
    }

    #[test]
    fn test_boost_time_override() {
        assert_eq!(boost_time_override(45.0, 30.0), 25.0);
        assert_eq!(boost_time_override(20.0, 30.0), 10.0);
        assert_eq!(boost_time_override(-1.0, 0.0), 10.0);
    }

    #[test]
    fn test_boost_temp_override() {
        assert_eq!(boost_temp_override(260.0, 250.0), 15.0);
        assert_eq!(boost_temp_override(250.0, 250.0), 5.0);
    }

    #[test]
    fn test_temperature_fahrenheit() {
        let profile = HeatProfile {
            index: 0,
            name: "HOT".to_string(),
            temperature_celsius: Some(250.0),
            duration: None,
            color: None,
        };
        assert!((profile.temperature_fahrenheit().unwrap() - 482.0).abs() < 0.001);
    }
}
