//! Direct characteristic access for firmware without the Lorax service.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

use crate::ble::transport::BleTransport;
use crate::error::Result;
use crate::protocol::paths::ProtocolMode;
use crate::session::ParameterIo;

/// Reads and writes go straight to the characteristic.
///
/// Per-profile characteristics refer to whichever profile was last written to
/// the profile selector, so the index is not used here.
pub struct LegacyProtocol {
    transport: Arc<dyn BleTransport>,
}

impl LegacyProtocol {
    /// Wrap a connected transport.
    pub fn new(transport: Arc<dyn BleTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ParameterIo for LegacyProtocol {
    fn mode(&self) -> ProtocolMode {
        ProtocolMode::Legacy
    }

    async fn read(&self, characteristic: &Uuid, _index: Option<u8>) -> Result<Vec<u8>> {
        let data = self.transport.read_characteristic(characteristic).await?;
        trace!("Legacy read {} -> {:02X?}", characteristic, data);
        Ok(data)
    }

    async fn write(&self, characteristic: &Uuid, value: &[u8], _index: Option<u8>) -> Result<()> {
        trace!("Legacy write {} <- {:02X?}", characteristic, value);
        self.transport
            .write_characteristic(characteristic, value, true)
            .await
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
