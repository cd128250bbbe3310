//! Scripted Lorax peripheral for tests.
//!
//! Answers tunnel commands from an in-memory path table and records every
//! write, so tunnel sessions can be exercised without hardware.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ble::characteristics::NotificationEvent;
use crate::ble::transport::BleTransport;
use crate::ble::uuids::*;
use crate::error::{Error, Result};
use crate::protocol::lorax::{LoraxOpCode, HEADER_SIZE};

/// Status the fake replies with for unknown paths.
pub const STATUS_NOT_FOUND: u8 = 1;

/// An in-memory Lorax peripheral.
pub struct FakeLoraxDevice {
    services: Vec<Uuid>,
    version: u8,
    seed: [u8; 16],
    limits: [u8; 6],
    paths: Mutex<HashMap<String, Vec<u8>>>,
    ignored: Mutex<HashSet<u8>>,
    commands: Mutex<Vec<Vec<u8>>>,
    writes: Mutex<Vec<(Uuid, Vec<u8>, bool)>>,
    subscriptions: Mutex<Vec<Uuid>>,
    notification_tx: broadcast::Sender<NotificationEvent>,
}

impl FakeLoraxDevice {
    /// A tunnel-capable device reporting protocol version 3.
    pub fn new() -> Self {
        let (notification_tx, _) = broadcast::channel(64);
        Self {
            services: vec![PUFFCO_SERVICE_UUID, LORAX_SERVICE_UUID],
            version: 3,
            seed: [0x5A; 16],
            // max_payload 500, 4 files, 8 commands
            limits: [0xF4, 0x01, 0x04, 0x00, 0x08, 0x00],
            paths: Mutex::new(HashMap::new()),
            ignored: Mutex::new(HashSet::new()),
            commands: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            notification_tx,
        }
    }

    /// Set the value served for `path`.
    pub fn with_path(self, path: &str, value: &[u8]) -> Self {
        self.paths.lock().insert(path.to_string(), value.to_vec());
        self
    }

    /// Never answer commands with this opcode.
    pub fn ignoring(self, opcode: LoraxOpCode) -> Self {
        self.ignored.lock().insert(opcode.to_raw());
        self
    }

    /// Current value stored for `path`.
    pub fn path_value(&self, path: &str) -> Option<Vec<u8>> {
        self.paths.lock().get(path).cloned()
    }

    /// Every command written to the command characteristic.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.commands.lock().clone()
    }

    /// Commands with the given opcode.
    pub fn commands_with(&self, opcode: LoraxOpCode) -> Vec<Vec<u8>> {
        self.commands()
            .into_iter()
            .filter(|c| c.get(2) == Some(&opcode.to_raw()))
            .collect()
    }

    /// Direct writes to characteristics other than the command characteristic.
    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>, bool)> {
        self.writes.lock().clone()
    }

    /// Characteristics subscribed to.
    pub fn subscriptions(&self) -> Vec<Uuid> {
        self.subscriptions.lock().clone()
    }

    /// The access seed this device hands out.
    pub fn seed(&self) -> [u8; 16] {
        self.seed
    }

    /// Push an unsolicited notification.
    pub fn notify(&self, uuid: Uuid, data: Vec<u8>) {
        let _ = self.notification_tx.send(NotificationEvent {
            characteristic_uuid: uuid,
            data,
        });
    }

    fn reply(&self, sequence: &[u8], status: u8, data: &[u8]) {
        let mut raw = sequence.to_vec();
        raw.push(status);
        raw.extend_from_slice(data);
        self.notify(LORAX_REPLY_UUID, raw);
    }

    fn handle_command(&self, command: &[u8]) {
        self.commands.lock().push(command.to_vec());

        if command.len() < HEADER_SIZE || self.ignored.lock().contains(&command[2]) {
            return;
        }

        let sequence = &command[..2];
        let payload = &command[HEADER_SIZE..];

        match LoraxOpCode::from_raw(command[2]) {
            Some(LoraxOpCode::GetAccessSeed) => self.reply(sequence, 0, &self.seed),
            Some(LoraxOpCode::UnlockAccess) => self.reply(sequence, 0, &[]),
            Some(LoraxOpCode::GetLimits) => self.reply(sequence, 0, &self.limits),
            Some(LoraxOpCode::ReadShort) => {
                let path = String::from_utf8_lossy(&payload[4.min(payload.len())..]).into_owned();
                let value = self.paths.lock().get(&path).cloned();
                match value {
                    Some(value) => self.reply(sequence, 0, &value),
                    None => self.reply(sequence, STATUS_NOT_FOUND, &[]),
                }
            }
            Some(LoraxOpCode::WriteShort) => {
                let body = &payload[4.min(payload.len())..];
                match body.iter().position(|&b| b == 0) {
                    Some(end) => {
                        let path = String::from_utf8_lossy(&body[..end]).into_owned();
                        self.paths.lock().insert(path, body[end + 1..].to_vec());
                        self.reply(sequence, 0, &[]);
                    }
                    None => self.reply(sequence, STATUS_NOT_FOUND, &[]),
                }
            }
            Some(LoraxOpCode::Write) => self.reply(sequence, 0, &[]),
            None => self.reply(sequence, STATUS_NOT_FOUND, &[]),
        }
    }
}

impl Default for FakeLoraxDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BleTransport for FakeLoraxDevice {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<Uuid>> {
        Ok(self.services.clone())
    }

    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>> {
        if *uuid == LORAX_VERSION_UUID {
            return Ok(vec![self.version]);
        }
        Err(Error::CharacteristicNotFound {
            uuid: uuid.to_string(),
        })
    }

    async fn write_characteristic(
        &self,
        uuid: &Uuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<()> {
        if *uuid == LORAX_COMMAND_UUID {
            self.handle_command(data);
        } else {
            self.writes.lock().push((*uuid, data.to_vec(), with_response));
        }
        Ok(())
    }

    async fn subscribe(&self, uuid: &Uuid) -> Result<()> {
        self.subscriptions.lock().push(*uuid);
        Ok(())
    }

    fn notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.notification_tx.subscribe()
    }

    fn address(&self) -> String {
        "84:2E:14:00:00:01".to_string()
    }
}
