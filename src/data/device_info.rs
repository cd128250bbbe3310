//! Device identity values.

use chrono::{DateTime, Utc};

use crate::utils::decode_uint_le;

/// Peak Pro hardware variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceModel {
    /// Standard black Peak Pro.
    PeakPro,
    /// Opal edition.
    Opal,
    /// Indiglow edition.
    Indiglow,
    /// Guardian edition.
    Guardian,
    /// Peach, white.
    PeachWhite,
    /// Peach, black.
    PeachBlack,
    /// Peach, desert.
    PeachDesert,
}

impl DeviceModel {
    /// Look up a model by the code the device reports.
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim() {
            "0" | "21" | "51" | "4294967295" => Self::PeakPro,
            "1" | "22" => Self::Opal,
            "2" => Self::Indiglow,
            "4" | "25" | "26" => Self::Guardian,
            "12" | "72" => Self::PeachWhite,
            "13" | "71" => Self::PeachBlack,
            "15" | "74" => Self::PeachDesert,
            _ => return None,
        })
    }

    /// Get a human-readable name for this model.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PeakPro => "Peak Pro",
            Self::Opal => "Opal Peak Pro",
            Self::Indiglow => "Indiglow Peak Pro",
            Self::Guardian => "Guardian Peak Pro",
            Self::PeachWhite => "Peach White Peak Pro",
            Self::PeachBlack => "Peach Black Peak Pro",
            Self::PeachDesert => "Peach Desert Peak Pro",
        }
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode a parameter that legacy firmware reports as text and the tunnel
/// reports as a little-endian integer.
pub fn text_or_number_from_bytes(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        return None;
    }

    let text = text_from_bytes(data);
    let text = text.trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        Some(text.to_string())
    } else {
        Some(decode_uint_le(data).to_string())
    }
}

/// Decode the manufacture date, stored as unix seconds.
pub fn birthday_from_bytes(data: &[u8]) -> Option<DateTime<Utc>> {
    if data.len() < 4 {
        return None;
    }
    DateTime::from_timestamp(decode_uint_le(data) as i64, 0)
}

/// Decode a text parameter, dropping trailing NUL padding.
pub fn text_from_bytes(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches('\0')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_model_lookup() {
        assert_eq!(DeviceModel::from_code("0"), Some(DeviceModel::PeakPro));
        assert_eq!(DeviceModel::from_code("22"), Some(DeviceModel::Opal));
        assert_eq!(DeviceModel::from_code("74"), Some(DeviceModel::PeachDesert));
        assert_eq!(DeviceModel::from_code("4294967295"), Some(DeviceModel::PeakPro));
        assert_eq!(DeviceModel::from_code("99"), None);
        assert_eq!(DeviceModel::Guardian.to_string(), "Guardian Peak Pro");
    }

    #[test]
    fn test_text_or_number_decoding() {
        assert_eq!(text_or_number_from_bytes(b"21"), Some("21".to_string()));
        assert_eq!(text_or_number_from_bytes(b"PCB-7 rev2\0"), Some("PCB-7 rev2".to_string()));
        assert_eq!(text_or_number_from_bytes(&[22, 0, 0, 0]), Some("22".to_string()));
        assert_eq!(
            text_or_number_from_bytes(&[0xFF, 0xFF, 0xFF, 0xFF]),
            Some("4294967295".to_string())
        );
        assert_eq!(text_or_number_from_bytes(&[]), None);
    }

    #[test]
    fn test_birthday() {
        let date = birthday_from_bytes(&1_600_000_000u32.to_le_bytes()).unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2020, 9, 13));
        assert_eq!(birthday_from_bytes(&[1, 2]), None);
    }

    #[test]
    fn test_text_from_bytes() {
        assert_eq!(text_from_bytes(b"PEAK\0\0"), "PEAK");
        assert_eq!(text_from_bytes(b""), "");
    }
}
