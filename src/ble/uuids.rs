//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants for the legacy one-characteristic-per-parameter
//! GATT layout and for the Lorax tunnel service.

use uuid::Uuid;

// Device Information Service (Standard BLE)
/// Manufacturer Name characteristic UUID.
pub const MANUFACTURER_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a29_0000_1000_8000_00805f9b34fb);
/// Model Number characteristic UUID.
pub const MODEL_NUMBER_UUID: Uuid = Uuid::from_u128(0x0000_2a24_0000_1000_8000_00805f9b34fb);
/// Serial Number characteristic UUID.
pub const SERIAL_NUMBER_UUID: Uuid = Uuid::from_u128(0x0000_2a25_0000_1000_8000_00805f9b34fb);
/// Hardware Revision characteristic UUID.
pub const HARDWARE_REVISION_UUID: Uuid = Uuid::from_u128(0x0000_2a27_0000_1000_8000_00805f9b34fb);
/// Software Revision characteristic UUID.
pub const SOFTWARE_REVISION_UUID: Uuid = Uuid::from_u128(0x0000_2a28_0000_1000_8000_00805f9b34fb);

/// Service advertised by Peak Pro devices, used to find them without a MAC address.
pub const PUFFCO_SERVICE_UUID: Uuid = Uuid::from_u128(0x06ca_f9c0_74d3_454f_9be9_e30cd999c17a);

/// Vendor MAC address prefix used as a fallback discovery filter.
pub const PUFFCO_ADDRESS_PREFIX: &str = "84:2E:14:";

/// Build a legacy Puffco characteristic UUID from its 16-bit suffix.
const fn puffco(suffix: u16) -> Uuid {
    Uuid::from_u128(0xf9a9_8c15_c651_4f34_b656_d100bf58_0000 | suffix as u128)
}

// Legacy Puffco characteristics
/// Firmware git hash.
pub const SOFTWARE_REV_GIT_HASH_UUID: Uuid = puffco(0x0002);
/// Access seed / unlock token exchange for the legacy handshake.
pub const ACCESS_SEED_KEY_UUID: Uuid = puffco(0x00E0);
/// Battery state of charge (f32 percent).
pub const BATTERY_SOC_UUID: Uuid = puffco(0x0020);
/// Operating state (f32 enumeration).
pub const OPERATING_STATE_UUID: Uuid = puffco(0x0022);
/// Seconds elapsed in the current operating state.
pub const STATE_ELAPSED_TIME_UUID: Uuid = puffco(0x0023);
/// Total seconds of the current operating state.
pub const STATE_TOTAL_TIME_UUID: Uuid = puffco(0x0024);
/// Heater temperature in Celsius.
pub const HEATER_TEMP_UUID: Uuid = puffco(0x0025);
/// Heater target temperature in Celsius.
pub const HEATER_TARGET_TEMP_UUID: Uuid = puffco(0x0026);
/// Lifetime dab count.
pub const TOTAL_DAB_COUNT_UUID: Uuid = puffco(0x002F);
/// Battery charge state.
pub const BATTERY_CHARGE_STATE_UUID: Uuid = puffco(0x0031);
/// Seconds until the battery is full.
pub const BATTERY_CHARGE_FULL_ETA_UUID: Uuid = puffco(0x0033);
/// Average dabs per day.
pub const DABS_PER_DAY_UUID: Uuid = puffco(0x003B);
/// Mode command (f32 device command).
pub const MODE_COMMAND_UUID: Uuid = puffco(0x0040);
/// Currently active heat profile.
pub const PROFILE_CURRENT_UUID: Uuid = puffco(0x0041);
/// Stealth mode flag.
pub const STEALTH_STATUS_UUID: Uuid = puffco(0x0042);
/// Temperature override used by boost.
pub const TEMPERATURE_OVERRIDE_UUID: Uuid = puffco(0x0045);
/// Time override used by boost.
pub const TIME_OVERRIDE_UUID: Uuid = puffco(0x0046);
/// Lantern color / animation pattern.
pub const LANTERN_COLOR_UUID: Uuid = puffco(0x0048);
/// Lantern on/off.
pub const LANTERN_STATUS_UUID: Uuid = puffco(0x004A);
/// Per-LED lantern brightness.
pub const LANTERN_BRIGHTNESS_UUID: Uuid = puffco(0x004B);
/// User-assigned device name.
pub const DEVICE_NAME_UUID: Uuid = puffco(0x004D);
/// Manufacture date (u32 unix seconds).
pub const DEVICE_BIRTHDAY_UUID: Uuid = puffco(0x004E);
/// Selects which profile the legacy profile characteristics refer to.
pub const PROFILE_UUID: Uuid = puffco(0x0061);
/// Name of the selected profile.
pub const PROFILE_NAME_UUID: Uuid = puffco(0x0062);
/// Preheat temperature of the selected profile.
pub const PROFILE_PREHEAT_TEMP_UUID: Uuid = puffco(0x0063);
/// Preheat duration of the selected profile.
pub const PROFILE_PREHEAT_TIME_UUID: Uuid = puffco(0x0064);
/// Color of the selected profile.
pub const PROFILE_COLOR_UUID: Uuid = puffco(0x0065);
/// Boost temperature of the selected profile.
pub const BOOST_TEMP_UUID: Uuid = puffco(0x0067);
/// Boost time of the selected profile.
pub const BOOST_TIME_UUID: Uuid = puffco(0x0068);

// Lorax tunnel service
/// Lorax service UUID. Its presence selects the tunnel protocol.
pub const LORAX_SERVICE_UUID: Uuid = Uuid::from_u128(0xe276_967f_ea8a_478a_a92e_d78f5dd15dd5);
/// Lorax protocol version characteristic.
pub const LORAX_VERSION_UUID: Uuid = Uuid::from_u128(0x0543_4bca_cc7f_4ef6_bbb3_b1c520b9800c);
/// Lorax command characteristic (write).
pub const LORAX_COMMAND_UUID: Uuid = Uuid::from_u128(0x6013_3d5c_5727_4f2c_9697_d842c5292a3c);
/// Lorax reply characteristic (notify).
pub const LORAX_REPLY_UUID: Uuid = Uuid::from_u128(0x8dc5_ec05_8f7d_45ad_99db_3fbde65dbd9c);
/// Lorax event characteristic (notify).
pub const LORAX_EVENT_UUID: Uuid = Uuid::from_u128(0x4331_2cd1_7d34_46ce_a7d3_0a98fd9b4cb8);

/// The four characteristics that carry the tunnel protocol itself.
pub const LORAX_PROTOCOL_UUIDS: [Uuid; 4] = [
    LORAX_VERSION_UUID,
    LORAX_COMMAND_UUID,
    LORAX_REPLY_UUID,
    LORAX_EVENT_UUID,
];

/// Check if a characteristic is one of the Lorax protocol characteristics.
pub fn is_lorax_protocol_characteristic(uuid: &Uuid) -> bool {
    LORAX_PROTOCOL_UUIDS.contains(uuid)
}

/// Check if a discovered service list indicates tunnel-capable firmware.
pub fn has_lorax_service(services: &[Uuid]) -> bool {
    services.contains(&LORAX_SERVICE_UUID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_uuid_format() {
        assert_eq!(
            BATTERY_SOC_UUID.to_string(),
            "f9a98c15-c651-4f34-b656-d100bf580020"
        );
        assert_eq!(
            ACCESS_SEED_KEY_UUID.to_string(),
            "f9a98c15-c651-4f34-b656-d100bf5800e0"
        );
        assert_eq!(
            PROFILE_COLOR_UUID.to_string(),
            "f9a98c15-c651-4f34-b656-d100bf580065"
        );
    }

    #[test]
    fn test_lorax_uuid_format() {
        assert_eq!(
            LORAX_SERVICE_UUID.to_string(),
            "e276967f-ea8a-478a-a92e-d78f5dd15dd5"
        );
        assert_eq!(
            LORAX_REPLY_UUID.to_string(),
            "8dc5ec05-8f7d-45ad-99db-3fbde65dbd9c"
        );
        assert_eq!(
            PUFFCO_SERVICE_UUID.to_string(),
            "06caf9c0-74d3-454f-9be9-e30cd999c17a"
        );
    }

    #[test]
    fn test_is_lorax_protocol_characteristic() {
        assert!(is_lorax_protocol_characteristic(&LORAX_VERSION_UUID));
        assert!(is_lorax_protocol_characteristic(&LORAX_EVENT_UUID));
        assert!(!is_lorax_protocol_characteristic(&BATTERY_SOC_UUID));
    }

    #[test]
    fn test_has_lorax_service() {
        assert!(has_lorax_service(&[PUFFCO_SERVICE_UUID, LORAX_SERVICE_UUID]));
        assert!(!has_lorax_service(&[PUFFCO_SERVICE_UUID]));
    }
}
