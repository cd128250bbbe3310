//! Transaction ledger for the Lorax tunnel.
//!
//! Every command carries a sequence id. Replies come back on a single
//! notification stream in any order and are matched to their transaction
//! here. A transaction completes either by handing its payload to a
//! continuation, which may open further transactions, or by stashing the
//! payload and waking the task blocked on it.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::protocol::lorax::{encode_command, LoraxOpCode, Reply};

/// Largest sequence id before the counter wraps back to 1.
pub const MAX_SEQUENCE_ID: u16 = 65534;

/// Callback receiving a successful reply payload.
///
/// Runs on the notification task with the ledger lock released, so it may
/// open further transactions.
pub type Continuation = Box<dyn FnOnce(&TransactionLedger, Vec<u8>) + Send>;

/// How a transaction is completed once its reply arrives.
pub enum Completion {
    /// Hand the payload to a callback. Dropped without running on failure.
    Continue(Continuation),
    /// Stash the payload under `(sequence_id, path)` and wake the waiter.
    Stash(Arc<Notify>),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue(_) => write!(f, "Continue(..)"),
            Self::Stash(_) => write!(f, "Stash(..)"),
        }
    }
}

#[derive(Debug)]
struct Transaction {
    opcode: LoraxOpCode,
    path: Option<String>,
    completion: Completion,
}

type StashKey = (u16, Option<String>);

/// Handle to a transaction whose reply will be stashed.
#[derive(Debug, Clone)]
pub struct PendingReply {
    /// Sequence id assigned to the transaction.
    pub sequence_id: u16,
    /// Path the transaction concerns.
    pub path: Option<String>,
    notify: Arc<Notify>,
}

/// Tracks in-flight tunnel transactions keyed by sequence id.
#[derive(Debug, Default)]
pub struct TransactionLedger {
    counter: Mutex<u16>,
    pending: Mutex<HashMap<u16, Transaction>>,
    stash: Mutex<HashMap<StashKey, Option<Vec<u8>>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
}

impl TransactionLedger {
    /// Create an empty ledger with no outbound channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the queue commands are sent through.
    pub fn attach(&self, sender: mpsc::UnboundedSender<Bytes>) {
        *self.outbound.lock() = Some(sender);
    }

    /// Detach the outbound queue; later submissions fail with `NotConnected`.
    pub fn detach(&self) {
        *self.outbound.lock() = None;
    }

    /// Issue the next sequence id: 1, 2, ..., 65534, then 1 again.
    pub fn next_sequence_id(&self) -> u16 {
        let mut counter = self.counter.lock();
        let mut next = ((*counter as u32 + 1) % (MAX_SEQUENCE_ID as u32 + 1)) as u16;
        if next == 0 {
            next = 1;
        }
        *counter = next;
        next
    }

    /// Record a transaction and return its encoded command and sequence id.
    pub fn open(
        &self,
        opcode: LoraxOpCode,
        path: Option<String>,
        payload: &[u8],
        completion: Completion,
    ) -> Result<(Bytes, u16)> {
        let sequence_id = self.next_sequence_id();
        let command = encode_command(sequence_id, opcode, payload)?;

        trace!(
            "Opening {} #{} path={:?} ({} payload bytes)",
            opcode,
            sequence_id,
            path,
            payload.len()
        );

        let replaced = self.pending.lock().insert(
            sequence_id,
            Transaction {
                opcode,
                path,
                completion,
            },
        );

        // The counter wrapped onto a transaction that never got its reply.
        if let Some(stale) = replaced {
            warn!(
                "Sequence id {} reused while {} path={:?} was still pending",
                sequence_id, stale.opcode, stale.path
            );
            if let Completion::Stash(notify) = stale.completion {
                self.stash.lock().insert((sequence_id, stale.path), None);
                notify.notify_one();
            }
        }

        Ok((Bytes::from(command), sequence_id))
    }

    /// Open a transaction and queue its command for sending.
    pub fn submit(
        &self,
        opcode: LoraxOpCode,
        path: Option<String>,
        payload: &[u8],
        completion: Completion,
    ) -> Result<u16> {
        let sender = self.outbound.lock().clone().ok_or(Error::NotConnected)?;
        let (command, sequence_id) = self.open(opcode, path, payload, completion)?;

        if sender.send(command).is_err() {
            self.pending.lock().remove(&sequence_id);
            return Err(Error::ConnectionLost);
        }

        Ok(sequence_id)
    }

    /// Submit a transaction whose reply is handed to `continuation`.
    pub fn submit_with<F>(
        &self,
        opcode: LoraxOpCode,
        path: Option<String>,
        payload: &[u8],
        continuation: F,
    ) -> Result<u16>
    where
        F: FnOnce(&TransactionLedger, Vec<u8>) + Send + 'static,
    {
        self.submit(
            opcode,
            path,
            payload,
            Completion::Continue(Box::new(continuation)),
        )
    }

    /// Submit a transaction whose reply is stashed for [`Self::wait`].
    pub fn submit_waiting(
        &self,
        opcode: LoraxOpCode,
        path: Option<String>,
        payload: &[u8],
    ) -> Result<PendingReply> {
        let notify = Arc::new(Notify::new());
        let sequence_id = self.submit(
            opcode,
            path.clone(),
            payload,
            Completion::Stash(notify.clone()),
        )?;

        Ok(PendingReply {
            sequence_id,
            path,
            notify,
        })
    }

    /// Submit a transaction nobody waits on. Failures show up only in the log.
    pub fn submit_detached(
        &self,
        opcode: LoraxOpCode,
        path: Option<String>,
        payload: &[u8],
    ) -> Result<u16> {
        self.submit_with(opcode, path, payload, |_, _| {})
    }

    /// Open a waiting transaction without sending it.
    pub fn open_waiting(
        &self,
        opcode: LoraxOpCode,
        path: Option<String>,
        payload: &[u8],
    ) -> Result<(Bytes, PendingReply)> {
        let notify = Arc::new(Notify::new());
        let (command, sequence_id) = self.open(
            opcode,
            path.clone(),
            payload,
            Completion::Stash(notify.clone()),
        )?;

        Ok((
            command,
            PendingReply {
                sequence_id,
                path,
                notify,
            },
        ))
    }

    /// Route a raw reply notification to its transaction.
    ///
    /// Unknown sequence ids and malformed replies are logged and dropped. The
    /// transaction is removed from the ledger before its completion runs.
    pub fn deliver(&self, raw: &[u8]) {
        let reply = match Reply::parse(raw) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Dropping malformed Lorax reply: {}", e);
                return;
            }
        };

        let transaction = self.pending.lock().remove(&reply.sequence_id);
        let Some(transaction) = transaction else {
            warn!(
                "Lorax reply for unknown sequence id {} (status {})",
                reply.sequence_id, reply.status
            );
            return;
        };

        if !reply.is_success() {
            warn!(
                "{} #{} path={:?} failed with status {}",
                transaction.opcode, reply.sequence_id, transaction.path, reply.status
            );
            if let Completion::Stash(notify) = transaction.completion {
                self.stash
                    .lock()
                    .insert((reply.sequence_id, transaction.path), None);
                notify.notify_one();
            }
            return;
        }

        trace!(
            "{} #{} completed with {} bytes",
            transaction.opcode,
            reply.sequence_id,
            reply.data.len()
        );

        match transaction.completion {
            Completion::Continue(continuation) => continuation(self, reply.data),
            Completion::Stash(notify) => {
                self.stash
                    .lock()
                    .insert((reply.sequence_id, transaction.path), Some(reply.data));
                notify.notify_one();
            }
        }
    }

    /// Remove and return the stashed reply for `(sequence_id, path)`.
    ///
    /// `Ok(None)` means the device reported a failure. A second call for the
    /// same key fails with [`Error::ReplyConsumed`].
    pub fn take_reply(&self, sequence_id: u16, path: Option<&str>) -> Result<Option<Vec<u8>>> {
        self.stash
            .lock()
            .remove(&(sequence_id, path.map(str::to_string)))
            .ok_or(Error::ReplyConsumed { sequence_id })
    }

    /// Suspend until the reply for `pending` arrives, then consume it.
    pub async fn wait(&self, pending: &PendingReply) -> Result<Option<Vec<u8>>> {
        pending.notify.notified().await;
        self.take_reply(pending.sequence_id, pending.path.as_deref())
    }

    /// Forget a transaction nobody will wait for any more.
    pub fn abandon(&self, pending: &PendingReply) {
        self.pending.lock().remove(&pending.sequence_id);
        self.stash
            .lock()
            .remove(&(pending.sequence_id, pending.path.clone()));
    }

    /// Check if a transaction is still awaiting its reply.
    pub fn is_pending(&self, sequence_id: u16) -> bool {
        self.pending.lock().contains_key(&sequence_id)
    }

    /// Number of transactions awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop all state. Blocked waiters are woken with an absent result.
    pub fn clear(&self) {
        let drained: Vec<(u16, Transaction)> = self.pending.lock().drain().collect();
        let mut stash = self.stash.lock();
        stash.clear();

        for (sequence_id, transaction) in drained {
            if let Completion::Stash(notify) = transaction.completion {
                stash.insert((sequence_id, transaction.path), None);
                notify.notify_one();
            }
        }
        drop(stash);

        *self.counter.lock() = 0;
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    fn reply(sequence_id: u16, status: u8, data: &[u8]) -> Vec<u8> {
        let mut raw = sequence_id.to_le_bytes().to_vec();
        raw.push(status);
        raw.extend_from_slice(data);
        raw
    }

    #[test]
    fn test_first_sequence_id_is_one() {
        let ledger = TransactionLedger::new();
        assert_eq!(ledger.next_sequence_id(), 1);
        assert_eq!(ledger.next_sequence_id(), 2);
    }

    #[test]
    fn test_sequence_ids_wrap_to_one() {
        let ledger = TransactionLedger::new();
        let mut previous = 0;
        for _ in 0..MAX_SEQUENCE_ID {
            let id = ledger.next_sequence_id();
            assert_eq!(id, previous + 1);
            previous = id;
        }
        assert_eq!(previous, MAX_SEQUENCE_ID);
        assert_eq!(ledger.next_sequence_id(), 1);
        assert_eq!(ledger.next_sequence_id(), 2);
    }

    #[test]
    fn test_open_encodes_header() {
        let ledger = TransactionLedger::new();
        let (command, id) = ledger
            .open(LoraxOpCode::GetLimits, None, &[], Completion::Continue(Box::new(|_, _| {})))
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(command.as_ref(), &[1, 0, 2]);
        assert!(ledger.is_pending(1));
    }

    #[test]
    fn test_unknown_sequence_id_is_ignored() {
        let ledger = TransactionLedger::new();
        ledger.deliver(&reply(42, 0, &[1, 2, 3]));
        ledger.deliver(&[0x01]);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reply_is_consumed_once() {
        let ledger = TransactionLedger::new();
        for _ in 0..4 {
            ledger.next_sequence_id();
        }

        let (_, pending) = ledger
            .open_waiting(LoraxOpCode::ReadShort, Some("/p/bat/soc".to_string()), &[])
            .unwrap();
        assert_eq!(pending.sequence_id, 5);

        let payload = 87.0f32.to_le_bytes();
        ledger.deliver(&reply(5, 0, &payload));
        assert!(!ledger.is_pending(5));

        let received = assert_ok!(ledger.wait(&pending).await);
        assert_eq!(received, Some(payload.to_vec()));

        assert!(matches!(
            ledger.take_reply(5, Some("/p/bat/soc")),
            Err(Error::ReplyConsumed { sequence_id: 5 })
        ));
    }

    #[tokio::test]
    async fn test_failed_status_unblocks_waiter() {
        let ledger = Arc::new(TransactionLedger::new());
        let (_, pending) = ledger
            .open_waiting(LoraxOpCode::ReadShort, Some("/p/app/htr/temp".to_string()), &[])
            .unwrap();

        let waiter = {
            let ledger = ledger.clone();
            let pending = pending.clone();
            tokio::spawn(async move { ledger.wait(&pending).await })
        };

        tokio::task::yield_now().await;
        ledger.deliver(&reply(pending.sequence_id, 3, &[]));

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_failed_status_skips_continuation() {
        let ledger = TransactionLedger::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_, id) = ledger
            .open(
                LoraxOpCode::UnlockAccess,
                None,
                &[],
                Completion::Continue(Box::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        ledger.deliver(&reply(id, 1, &[]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!ledger.is_pending(id));
    }

    #[test]
    fn test_reply_delivered_exactly_once() {
        let ledger = TransactionLedger::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_, id) = ledger
            .open(
                LoraxOpCode::GetLimits,
                None,
                &[],
                Completion::Continue(Box::new(move |_, data| {
                    assert_eq!(data, vec![9, 9]);
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        ledger.deliver(&reply(id, 0, &[9, 9]));
        ledger.deliver(&reply(id, 0, &[9, 9]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_continuation_can_chain() {
        let ledger = TransactionLedger::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        ledger.attach(tx);

        ledger
            .submit_with(LoraxOpCode::GetAccessSeed, None, &[], |ledger, seed| {
                ledger
                    .submit_detached(LoraxOpCode::UnlockAccess, None, &seed)
                    .unwrap();
            })
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.as_ref(), &[1, 0, 0]);

        ledger.deliver(&reply(1, 0, &[7, 7]));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.as_ref(), &[2, 0, 1, 7, 7]);
        assert!(ledger.is_pending(2));
    }

    #[test]
    fn test_reused_sequence_id_releases_stale_waiter() {
        let ledger = TransactionLedger::new();
        let (_, stale) = ledger
            .open_waiting(LoraxOpCode::ReadShort, Some("/p/bat/soc".to_string()), &[])
            .unwrap();
        assert_eq!(stale.sequence_id, 1);

        for _ in 1..MAX_SEQUENCE_ID {
            ledger.next_sequence_id();
        }
        let (_, fresh) = ledger
            .open_waiting(LoraxOpCode::ReadShort, Some("/p/app/stat/id".to_string()), &[])
            .unwrap();
        assert_eq!(fresh.sequence_id, 1);
        assert_eq!(ledger.pending_count(), 1);

        let received = assert_ok!(tokio_test::block_on(ledger.wait(&stale)));
        assert_eq!(received, None);

        ledger.deliver(&reply(1, 0, &[5]));
        let received = assert_ok!(tokio_test::block_on(ledger.wait(&fresh)));
        assert_eq!(received, Some(vec![5]));
    }

    #[test]
    fn test_submit_without_channel_fails() {
        let ledger = TransactionLedger::new();
        assert!(matches!(
            ledger.submit_detached(LoraxOpCode::GetLimits, None, &[]),
            Err(Error::NotConnected)
        ));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_clear_wakes_waiters() {
        let ledger = TransactionLedger::new();
        let (_, pending) = ledger
            .open_waiting(LoraxOpCode::ReadShort, Some("/p/bat/soc".to_string()), &[])
            .unwrap();

        ledger.clear();
        assert_eq!(ledger.pending_count(), 0);
        let received = assert_ok!(tokio_test::block_on(ledger.wait(&pending)));
        assert_eq!(received, None);
        assert_eq!(ledger.next_sequence_id(), 1);
    }
}
