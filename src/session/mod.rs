//! Connected device session.
//!
//! A [`Session`] picks the protocol once, from the services the device
//! exposes, and routes every parameter read and write through it. Legacy
//! firmware is addressed by characteristic; newer firmware by Lorax path.

pub mod legacy;
pub mod tunnel;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ble::transport::BleTransport;
use crate::ble::uuids::{has_lorax_service, LANTERN_COLOR_UUID, SOFTWARE_REVISION_UUID};
use crate::config::SessionConfig;
use crate::data::lantern::LanternAnimation;
use crate::error::Result;
use crate::protocol::auth::legacy_handshake;
use crate::protocol::lorax::LoraxLimits;
use crate::protocol::paths::ProtocolMode;
use crate::protocol::revision::decode_revision;
use crate::utils::decode_uint_le;

pub use legacy::LegacyProtocol;
pub use tunnel::TunnelProtocol;

/// Read and write device parameters by legacy characteristic.
///
/// An empty read means the device had no data for the parameter.
#[async_trait]
pub trait ParameterIo: Send + Sync {
    /// The protocol this implementation speaks.
    fn mode(&self) -> ProtocolMode;

    /// Read a parameter. `index` selects the profile for per-profile parameters.
    async fn read(&self, characteristic: &Uuid, index: Option<u8>) -> Result<Vec<u8>>;

    /// Write a parameter.
    async fn write(&self, characteristic: &Uuid, value: &[u8], index: Option<u8>) -> Result<()>;

    /// Release protocol resources.
    async fn close(&self) -> Result<()>;
}

/// The protocol chosen for a connection.
pub enum Protocol {
    /// Direct GATT access.
    Legacy(LegacyProtocol),
    /// Lorax tunnel.
    Tunnel(TunnelProtocol),
}

#[async_trait]
impl ParameterIo for Protocol {
    fn mode(&self) -> ProtocolMode {
        match self {
            Self::Legacy(p) => p.mode(),
            Self::Tunnel(p) => p.mode(),
        }
    }

    async fn read(&self, characteristic: &Uuid, index: Option<u8>) -> Result<Vec<u8>> {
        match self {
            Self::Legacy(p) => p.read(characteristic, index).await,
            Self::Tunnel(p) => p.read(characteristic, index).await,
        }
    }

    async fn write(&self, characteristic: &Uuid, value: &[u8], index: Option<u8>) -> Result<()> {
        match self {
            Self::Legacy(p) => p.write(characteristic, value, index).await,
            Self::Tunnel(p) => p.write(characteristic, value, index).await,
        }
    }

    async fn close(&self) -> Result<()> {
        match self {
            Self::Legacy(p) => p.close().await,
            Self::Tunnel(p) => p.close().await,
        }
    }
}

/// Per-connection cached values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Last lantern color read or written.
    pub lantern_color: Option<Vec<u8>>,
    /// Last lantern on/off state read or written.
    pub lantern_enabled: Option<bool>,
}

/// A connected, authenticated device.
pub struct Session {
    transport: Arc<dyn BleTransport>,
    protocol: Protocol,
    state: RwLock<SessionState>,
    config: SessionConfig,
}

impl Session {
    /// Discover services, pick the protocol and authenticate.
    ///
    /// The transport must already be connected.
    pub async fn establish(transport: Arc<dyn BleTransport>, config: SessionConfig) -> Result<Self> {
        let services = transport.discover_services().await?;

        let protocol = if has_lorax_service(&services) {
            info!("Lorax service present, using tunnel protocol");
            Protocol::Tunnel(TunnelProtocol::negotiate(transport.clone(), &config).await?)
        } else {
            info!("Lorax service absent, using legacy protocol");
            legacy_handshake(transport.as_ref()).await?;
            Protocol::Legacy(LegacyProtocol::new(transport.clone()))
        };

        Ok(Self {
            transport,
            protocol,
            state: RwLock::new(SessionState::default()),
            config,
        })
    }

    /// The protocol in use.
    pub fn mode(&self) -> ProtocolMode {
        self.protocol.mode()
    }

    /// Configuration this session was established with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Address of the connected device.
    pub fn address(&self) -> String {
        self.transport.address()
    }

    /// Tunnel protocol version, if the tunnel is in use.
    pub fn tunnel_version(&self) -> Option<u8> {
        match &self.protocol {
            Protocol::Tunnel(p) => Some(p.version()),
            Protocol::Legacy(_) => None,
        }
    }

    /// Negotiated tunnel limits, if the tunnel is in use.
    pub fn limits(&self) -> Option<LoraxLimits> {
        match &self.protocol {
            Protocol::Tunnel(p) => Some(p.limits()),
            Protocol::Legacy(_) => None,
        }
    }

    /// Read a parameter.
    ///
    /// The software revision is returned as its display string.
    pub async fn read(&self, characteristic: &Uuid, index: Option<u8>) -> Result<Vec<u8>> {
        let data = self.protocol.read(characteristic, index).await?;

        if *characteristic == LANTERN_COLOR_UUID && !data.is_empty() {
            self.state.write().lantern_color = Some(data.clone());
        }

        if *characteristic == SOFTWARE_REVISION_UUID && !data.is_empty() {
            let revision = decode_revision(decode_uint_le(&data));
            debug!("Software revision {:02X?} -> {}", data, revision);
            return Ok(revision.into_bytes());
        }

        Ok(data)
    }

    /// Write a parameter.
    pub async fn write(&self, characteristic: &Uuid, value: &[u8], index: Option<u8>) -> Result<()> {
        self.protocol.write(characteristic, value, index).await?;
        if *characteristic == LANTERN_COLOR_UUID {
            self.state.write().lantern_color = Some(value.to_vec());
        }
        Ok(())
    }

    /// Snapshot of the cached values.
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Last known lantern color.
    pub fn cached_lantern_color(&self) -> Option<Vec<u8>> {
        self.state.read().lantern_color.clone()
    }

    /// Record the lantern on/off state.
    pub fn set_cached_lantern_enabled(&self, enabled: bool) {
        self.state.write().lantern_enabled = Some(enabled);
    }

    /// Last known lantern on/off state.
    pub fn cached_lantern_enabled(&self) -> Option<bool> {
        self.state.read().lantern_enabled
    }

    /// The animation preset the cached lantern color selects, if any.
    pub fn active_animation(&self) -> Option<LanternAnimation> {
        self.state
            .read()
            .lantern_color
            .as_deref()
            .and_then(LanternAnimation::from_pattern)
    }

    /// Check if the cached lantern color is an animation preset.
    pub fn is_animation_active(&self) -> bool {
        self.active_animation().is_some()
    }

    /// Drop cached state, stop the protocol and disconnect.
    pub async fn close(&self) -> Result<()> {
        *self.state.write() = SessionState::default();
        self.protocol.close().await?;
        self.transport.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::mock::FakeLoraxDevice;
    use crate::ble::transport::MockBleTransport;
    use crate::ble::uuids::*;
    use crate::data::lantern::LanternColor;
    use crate::error::Error;
    use mockall::predicate::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn legacy_transport() -> MockBleTransport {
        let mut transport = MockBleTransport::new();
        transport
            .expect_discover_services()
            .returning(|| Ok(vec![PUFFCO_SERVICE_UUID]));
        transport
            .expect_read_characteristic()
            .with(eq(ACCESS_SEED_KEY_UUID))
            .returning(|_| Ok(vec![0u8; 16]));
        transport
            .expect_write_characteristic()
            .withf(|uuid, _, _| *uuid == ACCESS_SEED_KEY_UUID)
            .returning(|_, _, _| Ok(()));
        transport
    }

    fn quick_config() -> SessionConfig {
        SessionConfig::default()
            .with_auth_timeout(Duration::from_millis(200))
            .with_reply_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_legacy_mode_selected_without_lorax_service() {
        let session = Session::establish(Arc::new(legacy_transport()), quick_config())
            .await
            .unwrap();
        assert_eq!(session.mode(), ProtocolMode::Legacy);
        assert_eq!(session.tunnel_version(), None);
        assert_eq!(session.limits(), None);
    }

    #[tokio::test]
    async fn test_tunnel_mode_selected_with_lorax_service() {
        let session = Session::establish(Arc::new(FakeLoraxDevice::new()), quick_config())
            .await
            .unwrap();
        assert_eq!(session.mode(), ProtocolMode::Tunnel);
        assert_eq!(session.tunnel_version(), Some(3));
    }

    #[tokio::test]
    async fn test_software_revision_is_decoded_in_legacy_mode() {
        let mut transport = legacy_transport();
        transport
            .expect_read_characteristic()
            .with(eq(SOFTWARE_REVISION_UUID))
            .returning(|_| Ok(vec![22, 0, 0, 0]));

        let session = Session::establish(Arc::new(transport), quick_config())
            .await
            .unwrap();
        let revision = session.read(&SOFTWARE_REVISION_UUID, None).await.unwrap();
        assert_eq!(revision, b"AA".to_vec());
    }

    #[tokio::test]
    async fn test_software_revision_is_decoded_in_tunnel_mode() {
        let device = FakeLoraxDevice::new().with_path("/p/sys/fw/ver", &[0, 0, 0, 0]);
        let session = Session::establish(Arc::new(device), quick_config())
            .await
            .unwrap();
        let revision = session.read(&SOFTWARE_REVISION_UUID, None).await.unwrap();
        assert_eq!(revision, b"X*".to_vec());
    }

    #[tokio::test]
    async fn test_lantern_color_cache() {
        let session = Session::establish(Arc::new(FakeLoraxDevice::new()), quick_config())
            .await
            .unwrap();
        assert!(!session.is_animation_active());

        session
            .write(&LANTERN_COLOR_UUID, &LanternAnimation::Rotating.pattern(), None)
            .await
            .unwrap();
        assert_eq!(session.active_animation(), Some(LanternAnimation::Rotating));

        session
            .write(&LANTERN_COLOR_UUID, &LanternColor::new(1, 2, 3).to_bytes(), None)
            .await
            .unwrap();
        assert!(!session.is_animation_active());
    }

    #[tokio::test]
    async fn test_read_updates_lantern_cache() {
        let device = FakeLoraxDevice::new()
            .with_path("/p/app/ltrn/colr", &LanternAnimation::DiscoMode.pattern());
        let session = Session::establish(Arc::new(device), quick_config())
            .await
            .unwrap();

        session.read(&LANTERN_COLOR_UUID, None).await.unwrap();
        assert_eq!(session.active_animation(), Some(LanternAnimation::DiscoMode));
    }

    #[tokio::test]
    async fn test_failed_lantern_write_leaves_cache_untouched() {
        let mut transport = legacy_transport();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_write_characteristic()
            .withf(|uuid, _, _| *uuid == LANTERN_COLOR_UUID)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::Timeout));
        transport
            .expect_write_characteristic()
            .withf(|uuid, _, _| *uuid == LANTERN_COLOR_UUID)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let session = Session::establish(Arc::new(transport), quick_config())
            .await
            .unwrap();
        let pattern = LanternAnimation::Pulsing.pattern();

        assert!(session.write(&LANTERN_COLOR_UUID, &pattern, None).await.is_err());
        assert_eq!(session.cached_lantern_color(), None);
        assert!(!session.is_animation_active());

        session.write(&LANTERN_COLOR_UUID, &pattern, None).await.unwrap();
        assert_eq!(session.active_animation(), Some(LanternAnimation::Pulsing));
    }

    #[tokio::test]
    async fn test_close_clears_state() {
        let session = Session::establish(Arc::new(FakeLoraxDevice::new()), quick_config())
            .await
            .unwrap();
        session.set_cached_lantern_enabled(true);
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::default());
    }
}
