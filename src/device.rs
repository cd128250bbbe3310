//! Typed access to a connected Peak Pro.
//!
//! [`PeakPro`] wraps a [`Session`] and converts raw parameter values into
//! Rust types. Accessors return `Ok(None)` when the device has no value for a
//! parameter (a removed atomizer, a failed tunnel read, or a NaN sensor).

use btleplug::api::Peripheral as _;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ble::scanner::{BleScanner, ConnectTarget};
use crate::ble::transport::{BleTransport, BtleplugTransport};
use crate::ble::uuids::*;
use crate::config::SessionConfig;
use crate::data::device_info::{
    birthday_from_bytes, text_from_bytes, text_or_number_from_bytes, DeviceModel,
};
use crate::data::lantern::{
    brightness_bytes, brightness_from_bytes, flag_bytes, flag_from_bytes, LanternAnimation,
    LanternColor,
};
use crate::data::profile::{
    boost_temp_override, boost_time_override, check_boost_temperature, check_boost_time,
    check_profile_index, profile_index_bytes,
    profile_selector_bytes, HeatProfile, PROFILE_COUNT, TEMPERATURE_MAX_FAHRENHEIT,
    TEMPERATURE_MIN_FAHRENHEIT,
};
use crate::data::state::{ChargeState, DeviceCommand, OperatingState};
use crate::error::{Error, Result};
use crate::protocol::paths::ProtocolMode;
use crate::session::Session;
use crate::utils::{celsius_to_fahrenheit, decode_f32_le, encode_f32_le, round_tenths};

/// A connected Peak Pro.
pub struct PeakPro {
    session: Session,
}

impl PeakPro {
    /// Find, connect to and authenticate with a device.
    ///
    /// When scanning, a device that fails to connect is skipped and the next
    /// match is tried, up to the configured number of attempts.
    pub async fn connect(target: ConnectTarget, config: SessionConfig) -> Result<Self> {
        let scanner = BleScanner::new().await?;
        let mut attempted = HashSet::new();
        let rounds = match target {
            ConnectTarget::Address(_) => 1,
            ConnectTarget::Scan => config.max_connect_attempts.max(1),
        };

        let mut last_error = Error::DeviceNotFound {
            identifier: target.to_string(),
        };

        for round in 1..=rounds {
            let peripheral = scanner
                .find(&target, config.scan_timeout, &attempted)
                .await?;
            let address = peripheral.address().to_string();
            info!("Connecting to {} (device {} of {})", address, round, rounds);

            let transport = Arc::new(BtleplugTransport::new(peripheral, &config));
            match transport.connect().await {
                Ok(()) => return Self::with_transport(transport, config).await,
                Err(e) => {
                    warn!("Could not connect to {}: {}", address, e);
                    attempted.insert(address);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Establish a session over an already connected transport.
    pub async fn with_transport(
        transport: Arc<dyn BleTransport>,
        config: SessionConfig,
    ) -> Result<Self> {
        let session = Session::establish(transport, config).await?;
        info!(
            "Session ready with {} over {} protocol",
            session.address(),
            session.mode()
        );
        Ok(Self { session })
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The protocol in use.
    pub fn mode(&self) -> ProtocolMode {
        self.session.mode()
    }

    /// Close the session and disconnect.
    pub async fn disconnect(&self) -> Result<()> {
        self.session.close().await
    }

    async fn read(&self, characteristic: &Uuid) -> Result<Vec<u8>> {
        self.session.read(characteristic, None).await
    }

    async fn read_f32(&self, characteristic: &Uuid, index: Option<u8>) -> Result<Option<f32>> {
        Ok(decode_f32_le(&self.session.read(characteristic, index).await?))
    }

    async fn write_f32(&self, characteristic: &Uuid, value: f32, index: Option<u8>) -> Result<()> {
        self.session
            .write(characteristic, &encode_f32_le(value), index)
            .await
    }

    // Battery

    /// Battery state of charge in percent.
    pub async fn battery_percentage(&self) -> Result<Option<u8>> {
        Ok(self
            .read_f32(&BATTERY_SOC_UUID, None)
            .await?
            .map(|soc| soc.clamp(0.0, 100.0) as u8))
    }

    /// Charger state.
    pub async fn charge_state(&self) -> Result<Option<ChargeState>> {
        Ok(self
            .read_f32(&BATTERY_CHARGE_STATE_UUID, None)
            .await?
            .and_then(ChargeState::from_value))
    }

    /// Check if the battery is charging.
    pub async fn is_charging(&self) -> Result<bool> {
        Ok(self
            .charge_state()
            .await?
            .map(|state| state.is_charging())
            .unwrap_or(false))
    }

    /// Time until the battery is full. `None` when not charging or unknown.
    pub async fn charge_eta(&self) -> Result<Option<Duration>> {
        if !self.is_charging().await? {
            return Ok(None);
        }
        Ok(self
            .read_f32(&BATTERY_CHARGE_FULL_ETA_UUID, None)
            .await?
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f32))
    }

    // Heater

    /// Bowl temperature in Celsius. `None` when the atomizer is removed.
    pub async fn bowl_temperature(&self) -> Result<Option<f32>> {
        self.read_f32(&HEATER_TEMP_UUID, None).await
    }

    /// Bowl temperature in Fahrenheit.
    pub async fn bowl_temperature_fahrenheit(&self) -> Result<Option<f64>> {
        Ok(self
            .bowl_temperature()
            .await?
            .map(|c| celsius_to_fahrenheit(c as f64)))
    }

    /// Temperature the heater is driving toward, in Celsius.
    pub async fn target_temperature(&self) -> Result<Option<f32>> {
        self.read_f32(&HEATER_TARGET_TEMP_UUID, None).await
    }

    // Operating state

    /// What the device is doing.
    pub async fn operating_state(&self) -> Result<Option<OperatingState>> {
        Ok(self
            .read_f32(&OPERATING_STATE_UUID, None)
            .await?
            .and_then(OperatingState::from_value))
    }

    /// Seconds spent in the current state.
    pub async fn state_elapsed_time(&self) -> Result<Option<f32>> {
        self.read_f32(&STATE_ELAPSED_TIME_UUID, None).await
    }

    /// Total seconds the current state lasts.
    pub async fn state_total_time(&self) -> Result<Option<f32>> {
        self.read_f32(&STATE_TOTAL_TIME_UUID, None).await
    }

    /// Send a mode command.
    pub async fn send_command(&self, command: DeviceCommand) -> Result<()> {
        debug!("Sending {:?}", command);
        self.session
            .write(&MODE_COMMAND_UUID, &command.to_bytes(), None)
            .await
    }

    /// Start a heat cycle with the current profile.
    pub async fn preheat(&self) -> Result<()> {
        self.send_command(DeviceCommand::HeatCycleStart).await
    }

    /// Abort the running heat cycle.
    pub async fn cancel_preheat(&self) -> Result<()> {
        self.send_command(DeviceCommand::HeatCycleAbort).await
    }

    // Usage

    /// Lifetime dab count.
    pub async fn total_dab_count(&self) -> Result<Option<u32>> {
        Ok(self
            .read_f32(&TOTAL_DAB_COUNT_UUID, None)
            .await?
            .filter(|count| *count >= 0.0)
            .map(|count| count as u32))
    }

    /// Average dabs per day, to one decimal.
    pub async fn dabs_per_day(&self) -> Result<Option<f32>> {
        Ok(self
            .read_f32(&DABS_PER_DAY_UUID, None)
            .await?
            .map(round_tenths))
    }

    // Heat profiles

    /// Point the per-profile parameters at `index`.
    ///
    /// Legacy firmware has a single set of profile characteristics that follow
    /// the profile selector; the tunnel addresses each profile by path.
    async fn scope_profile(&self, index: u8) -> Result<Option<u8>> {
        let index = check_profile_index(index)?;
        if self.mode().is_legacy() {
            self.session
                .write(&PROFILE_UUID, &profile_selector_bytes(index), None)
                .await?;
        }
        Ok(Some(index))
    }

    /// Select a profile, optionally making it the one heat cycles use.
    pub async fn select_profile(&self, index: u8, make_current: bool) -> Result<()> {
        self.scope_profile(index).await?;
        if make_current {
            self.session
                .write(&PROFILE_CURRENT_UUID, &profile_index_bytes(index), None)
                .await?;
        }
        Ok(())
    }

    /// The profile heat cycles use.
    pub async fn current_profile(&self) -> Result<Option<u8>> {
        Ok(self
            .read_f32(&PROFILE_CURRENT_UUID, None)
            .await?
            .map(|index| index.round())
            .filter(|index| (0.0..PROFILE_COUNT as f32).contains(index))
            .map(|index| index as u8))
    }

    /// Profile name, upper-cased.
    pub async fn profile_name(&self, index: u8) -> Result<String> {
        let scope = self.scope_profile(index).await?;
        let data = self.session.read(&PROFILE_NAME_UUID, scope).await?;
        Ok(text_from_bytes(&data).to_uppercase())
    }

    /// Rename a profile. Only single-byte characters are accepted.
    pub async fn set_profile_name(&self, index: u8, name: &str) -> Result<()> {
        if !name.is_ascii() {
            return Err(Error::UnsupportedEncoding {
                text: name.to_string(),
            });
        }
        let scope = self.scope_profile(index).await?;
        self.session
            .write(&PROFILE_NAME_UUID, name.as_bytes(), scope)
            .await
    }

    /// Profile preheat temperature in Celsius.
    pub async fn profile_temperature(&self, index: u8) -> Result<Option<f32>> {
        let scope = self.scope_profile(index).await?;
        self.read_f32(&PROFILE_PREHEAT_TEMP_UUID, scope).await
    }

    /// Set a profile's preheat temperature in Celsius.
    pub async fn set_profile_temperature(&self, index: u8, celsius: f32) -> Result<()> {
        let fahrenheit = celsius_to_fahrenheit(celsius as f64).round();
        if !(TEMPERATURE_MIN_FAHRENHEIT..=TEMPERATURE_MAX_FAHRENHEIT).contains(&fahrenheit) {
            return Err(Error::InvalidParameter {
                name: "temperature".to_string(),
                value: format!("{}°C", celsius),
            });
        }
        let scope = self.scope_profile(index).await?;
        self.write_f32(&PROFILE_PREHEAT_TEMP_UUID, celsius, scope)
            .await
    }

    /// Profile heat cycle duration.
    pub async fn profile_duration(&self, index: u8) -> Result<Option<Duration>> {
        let scope = self.scope_profile(index).await?;
        Ok(self
            .read_f32(&PROFILE_PREHEAT_TIME_UUID, scope)
            .await?
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f32))
    }

    /// Set a profile's heat cycle duration.
    pub async fn set_profile_duration(&self, index: u8, duration: Duration) -> Result<()> {
        let scope = self.scope_profile(index).await?;
        self.write_f32(&PROFILE_PREHEAT_TIME_UUID, duration.as_secs_f32(), scope)
            .await
    }

    /// Profile lantern color.
    pub async fn profile_color(&self, index: u8) -> Result<Option<LanternColor>> {
        let scope = self.scope_profile(index).await?;
        let data = self.session.read(&PROFILE_COLOR_UUID, scope).await?;
        Ok(LanternColor::from_bytes(&data))
    }

    /// Set a profile's lantern color.
    pub async fn set_profile_color(&self, index: u8, color: LanternColor) -> Result<()> {
        let scope = self.scope_profile(index).await?;
        self.session
            .write(&PROFILE_COLOR_UUID, &color.to_bytes(), scope)
            .await
    }

    /// Fetch every setting of one profile.
    pub async fn heat_profile(&self, index: u8) -> Result<HeatProfile> {
        Ok(HeatProfile {
            index,
            name: self.profile_name(index).await?,
            temperature_celsius: self.profile_temperature(index).await?,
            duration: self.profile_duration(index).await?,
            color: self.profile_color(index).await?,
        })
    }

    /// Fetch all profiles.
    ///
    /// On legacy firmware the selector is restored to the current profile
    /// afterwards.
    pub async fn heat_profiles(&self) -> Result<Vec<HeatProfile>> {
        let mut profiles = Vec::with_capacity(PROFILE_COUNT as usize);
        for index in 0..PROFILE_COUNT {
            profiles.push(self.heat_profile(index).await?);
            if self.mode().is_legacy() {
                tokio::time::sleep(self.session.config().profile_fetch_delay).await;
            }
        }

        if self.mode().is_legacy() {
            if let Some(current) = self.current_profile().await? {
                self.scope_profile(current).await?;
            }
        }

        Ok(profiles)
    }

    // Lantern

    /// Whether the lantern is on.
    pub async fn lantern_enabled(&self) -> Result<Option<bool>> {
        let enabled = flag_from_bytes(&self.read(&LANTERN_STATUS_UUID).await?);
        if let Some(enabled) = enabled {
            self.session.set_cached_lantern_enabled(enabled);
        }
        Ok(enabled)
    }

    /// Turn the lantern on or off. Repeating the last known state is a no-op.
    pub async fn set_lantern(&self, enabled: bool) -> Result<()> {
        if self.session.cached_lantern_enabled() == Some(enabled) {
            debug!("Lantern already {}", if enabled { "on" } else { "off" });
            return Ok(());
        }
        self.session
            .write(&LANTERN_STATUS_UUID, &flag_bytes(enabled), None)
            .await?;
        self.session.set_cached_lantern_enabled(enabled);
        Ok(())
    }

    /// Solid lantern color. `None` while an animation runs.
    pub async fn lantern_color(&self) -> Result<Option<LanternColor>> {
        let data = self.read(&LANTERN_COLOR_UUID).await?;
        if LanternAnimation::from_pattern(&data).is_some() {
            return Ok(None);
        }
        Ok(LanternColor::from_bytes(&data))
    }

    /// Set a solid lantern color. Repeating the cached color is a no-op.
    pub async fn set_lantern_color(&self, color: LanternColor) -> Result<()> {
        self.write_lantern_pattern(&color.to_bytes()).await
    }

    /// Start a lantern animation.
    pub async fn set_lantern_animation(&self, animation: LanternAnimation) -> Result<()> {
        self.write_lantern_pattern(&animation.pattern()).await
    }

    async fn write_lantern_pattern(&self, pattern: &[u8]) -> Result<()> {
        if self.session.cached_lantern_color().as_deref() == Some(pattern) {
            debug!("Lantern color unchanged");
            return Ok(());
        }
        self.session.write(&LANTERN_COLOR_UUID, pattern, None).await
    }

    /// Stop any animation and show the current profile's color.
    pub async fn restore_lantern_color(&self) -> Result<()> {
        let current = self.current_profile().await?.unwrap_or(0);
        match self.profile_color(current).await? {
            Some(color) => self.set_lantern_color(color).await,
            None => Ok(()),
        }
    }

    /// The animation last set or read, from the session cache.
    pub fn active_lantern_animation(&self) -> Option<LanternAnimation> {
        self.session.active_animation()
    }

    /// Check if an animation preset is showing, from the session cache.
    pub fn is_lantern_animation_active(&self) -> bool {
        self.session.is_animation_active()
    }

    /// Lantern brightness, as the brightest LED.
    pub async fn lantern_brightness(&self) -> Result<Option<u8>> {
        Ok(brightness_from_bytes(
            &self.read(&LANTERN_BRIGHTNESS_UUID).await?,
        ))
    }

    /// Set every lantern LED to `brightness`, clamped to 0-255.
    pub async fn set_lantern_brightness(&self, brightness: i32) -> Result<()> {
        let brightness = brightness.clamp(0, u8::MAX as i32) as u8;
        self.session
            .write(&LANTERN_BRIGHTNESS_UUID, &brightness_bytes(brightness), None)
            .await
    }

    // Boost

    /// Extra Celsius a profile's boost adds.
    pub async fn boost_temperature(&self, index: u8) -> Result<Option<f32>> {
        let scope = self.scope_profile(index).await?;
        self.read_f32(&BOOST_TEMP_UUID, scope).await
    }

    /// Set the extra Celsius a profile's boost adds, at most 20.
    pub async fn set_boost_temperature(&self, index: u8, celsius: f32) -> Result<()> {
        let celsius = check_boost_temperature(celsius)?;
        let scope = self.scope_profile(index).await?;
        self.write_f32(&BOOST_TEMP_UUID, celsius, scope).await
    }

    /// Extra seconds a profile's boost adds.
    pub async fn boost_time(&self, index: u8) -> Result<Option<f32>> {
        let scope = self.scope_profile(index).await?;
        self.read_f32(&BOOST_TIME_UUID, scope).await
    }

    /// Set the extra seconds a profile's boost adds, at most 60.
    pub async fn set_boost_time(&self, index: u8, seconds: f32) -> Result<()> {
        let seconds = check_boost_time(seconds)?;
        let scope = self.scope_profile(index).await?;
        self.write_f32(&BOOST_TIME_UUID, seconds, scope).await
    }

    /// Raise the running cycle's temperature above the profile's `base_temp` (Celsius).
    pub async fn boost_temperature_now(&self, base_temp: f32) -> Result<()> {
        let target = self
            .target_temperature()
            .await?
            .ok_or_else(|| Error::InvalidData {
                context: "target temperature unavailable".to_string(),
            })?;
        let value = boost_temp_override(target, base_temp);
        debug!("Boosting temperature: override {}", value);
        self.write_f32(&TEMPERATURE_OVERRIDE_UUID, value, None).await
    }

    /// Extend the running cycle beyond the profile's `base_time` (seconds).
    pub async fn boost_time_now(&self, base_time: f32) -> Result<()> {
        let total = self.state_total_time().await?.unwrap_or(0.0);
        let value = boost_time_override(total, base_time);
        debug!("Boosting time: override {}", value);
        self.write_f32(&TIME_OVERRIDE_UUID, value, None).await
    }

    // Stealth

    /// Whether stealth mode (lantern off while idle) is on.
    pub async fn stealth_mode(&self) -> Result<Option<bool>> {
        Ok(flag_from_bytes(&self.read(&STEALTH_STATUS_UUID).await?))
    }

    /// Turn stealth mode on or off.
    pub async fn set_stealth_mode(&self, enabled: bool) -> Result<()> {
        self.session
            .write(&STEALTH_STATUS_UUID, &flag_bytes(enabled), None)
            .await
    }

    // Identity

    /// User-assigned device name.
    pub async fn device_name(&self) -> Result<String> {
        Ok(text_from_bytes(&self.read(&DEVICE_NAME_UUID).await?))
    }

    /// Rename the device. Only single-byte characters are accepted.
    pub async fn set_device_name(&self, name: &str) -> Result<()> {
        if !name.is_ascii() {
            return Err(Error::UnsupportedEncoding {
                text: name.to_string(),
            });
        }
        self.session
            .write(&DEVICE_NAME_UUID, name.as_bytes(), None)
            .await
    }

    /// Manufacturer name. Only legacy firmware exposes it.
    pub async fn manufacturer_name(&self) -> Result<String> {
        Ok(text_from_bytes(&self.read(&MANUFACTURER_NAME_UUID).await?))
    }

    /// Raw model code.
    pub async fn model_code(&self) -> Result<Option<String>> {
        Ok(text_or_number_from_bytes(
            &self.read(&MODEL_NUMBER_UUID).await?,
        ))
    }

    /// Hardware variant.
    pub async fn model(&self) -> Result<Option<DeviceModel>> {
        Ok(self
            .model_code()
            .await?
            .and_then(|code| DeviceModel::from_code(&code)))
    }

    /// Display name of the hardware variant.
    pub async fn model_name(&self) -> Result<String> {
        Ok(self
            .model()
            .await?
            .map(|model| model.name().to_string())
            .unwrap_or_else(|| "Unknown model".to_string()))
    }

    /// Serial number.
    pub async fn serial_number(&self) -> Result<Option<String>> {
        Ok(text_or_number_from_bytes(
            &self.read(&SERIAL_NUMBER_UUID).await?,
        ))
    }

    /// Hardware revision.
    pub async fn hardware_revision(&self) -> Result<Option<String>> {
        Ok(text_or_number_from_bytes(
            &self.read(&HARDWARE_REVISION_UUID).await?,
        ))
    }

    /// Firmware revision, e.g. `AA`.
    pub async fn firmware_revision(&self) -> Result<Option<String>> {
        let data = self.read(&SOFTWARE_REVISION_UUID).await?;
        Ok((!data.is_empty()).then(|| text_from_bytes(&data)))
    }

    /// Firmware build hash.
    pub async fn firmware_git_hash(&self) -> Result<Option<String>> {
        let data = self.read(&SOFTWARE_REV_GIT_HASH_UUID).await?;
        if data.is_empty() {
            return Ok(None);
        }
        let text = text_from_bytes(&data);
        if text.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Some(text))
        } else {
            Ok(Some(hex::encode(&data)))
        }
    }

    /// Manufacture date.
    pub async fn birthday(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(birthday_from_bytes(&self.read(&DEVICE_BIRTHDAY_UUID).await?))
    }
}
