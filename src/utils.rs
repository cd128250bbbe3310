//! Value decoding helpers shared by the typed accessors.

/// Convert Celsius to Fahrenheit.
///
/// ```
/// use puffco_rust_ble::celsius_to_fahrenheit;
///
/// assert!((celsius_to_fahrenheit(232.0) - 449.6).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

/// Convert Fahrenheit to Celsius.
#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) / 1.8
}

/// Decode a little-endian `f32` from the first four bytes of a payload.
///
/// Returns `None` when the payload is too short or the value is NaN. The device
/// reports NaN for sensors it cannot read (no atomizer, no charge estimate), and an
/// empty payload is what a failed tunnel read produces.
pub fn decode_f32_le(data: &[u8]) -> Option<f32> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    let value = f32::from_le_bytes(bytes);
    (!value.is_nan()).then_some(value)
}

/// Encode a value the way the device stores numeric parameters.
#[inline]
pub fn encode_f32_le(value: f32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Decode a little-endian unsigned integer of up to four bytes.
///
/// Shorter payloads are zero-extended; an empty payload decodes to 0.
pub fn decode_uint_le(data: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    let len = data.len().min(4);
    bytes[..len].copy_from_slice(&data[..len]);
    u32::from_le_bytes(bytes)
}

/// Round to one decimal place.
#[inline]
pub fn round_tenths(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(-40.0) - (-40.0)).abs() < 0.001);
    }

    #[test]
    fn test_fahrenheit_to_celsius() {
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(-40.0) - (-40.0)).abs() < 0.001);
    }

    #[test]
    fn test_decode_f32() {
        assert_eq!(decode_f32_le(&87.0f32.to_le_bytes()), Some(87.0));
        assert_eq!(decode_f32_le(&[0, 0, 0xAE, 0x42, 0xFF]), Some(87.0));
        assert_eq!(decode_f32_le(&[0, 0]), None);
        assert_eq!(decode_f32_le(&[]), None);
        assert_eq!(decode_f32_le(&f32::NAN.to_le_bytes()), None);
    }

    #[test]
    fn test_decode_uint() {
        assert_eq!(decode_uint_le(&[]), 0);
        assert_eq!(decode_uint_le(&[0x01]), 1);
        assert_eq!(decode_uint_le(&[0x34, 0x12]), 0x1234);
        assert_eq!(decode_uint_le(&[0x78, 0x56, 0x34, 0x12, 0x99]), 0x1234_5678);
    }

    #[test]
    fn test_round_tenths() {
        assert!((round_tenths(3.14159) - 3.1).abs() < 0.0001);
        assert!((round_tenths(2.96) - 3.0).abs() < 0.0001);
    }

    #[test]
    fn test_encode_matches_decode() {
        assert_eq!(decode_f32_le(&encode_f32_le(450.5)), Some(450.5));
    }
}
