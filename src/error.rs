//! Error types for the puffco-rust-ble crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No matching device was found.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The address or filter that was searched for.
        identifier: String,
    },

    /// Operation requires a connection but the device is not connected.
    #[error("Device not connected")]
    NotConnected,

    /// Failed to establish a connection to the device.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// The connection to the device was lost.
    #[error("Connection lost")]
    ConnectionLost,

    /// Invalid data was received from the device.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// A tunnel request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The requested operation is not supported.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// Description of the unsupported operation.
        operation: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// A buffer access fell outside the buffer.
    #[error("Buffer access out of range: offset {offset} + width {width} > size {size}")]
    OutOfRange {
        /// Start offset of the access.
        offset: usize,
        /// Number of bytes accessed.
        width: usize,
        /// Size of the buffer.
        size: usize,
    },

    /// Text containing multi-byte characters cannot be written to a buffer.
    #[error("Unsupported text encoding: {text:?} contains multi-byte characters")]
    UnsupportedEncoding {
        /// The rejected text.
        text: String,
    },

    /// The characteristic has no tunnel path counterpart.
    #[error("No tunnel path registered for characteristic {uuid}")]
    UnknownParameter {
        /// The characteristic that could not be resolved.
        uuid: String,
    },

    /// The stashed reply for a transaction was already taken.
    #[error("Reply for sequence id {sequence_id} already consumed")]
    ReplyConsumed {
        /// Sequence id of the transaction.
        sequence_id: u16,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
