//! Start command hand-off between the messaging context and the RT cycle.
//!
//! Senders live wherever commands arrive (network thread, CLI, tests). The
//! cycle runner owns the single [`StartInbox`] and drains it at the top of
//! each cycle, so command handling never interleaves with a tick and the
//! tick never waits on a lock.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use dynid_common::messages::StartCommand;
use thiserror::Error;

/// Sender-side hand-off failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InboxError {
    /// The inbox already holds `command_queue_depth` pending commands.
    #[error("start command inbox full")]
    Full,
    /// The cycle runner is gone.
    #[error("start command inbox closed")]
    Disconnected,
}

/// Cloneable, non-blocking sender of start commands.
#[derive(Debug, Clone)]
pub struct StartSender {
    tx: Sender<StartCommand>,
}

/// Receiving end, drained once per cycle.
#[derive(Debug)]
pub struct StartInbox {
    rx: Receiver<StartCommand>,
}

/// Create a bounded command inbox holding up to `depth` pending commands.
pub fn command_channel(depth: usize) -> (StartSender, StartInbox) {
    let (tx, rx) = crossbeam_channel::bounded(depth.max(1));
    (StartSender { tx }, StartInbox { rx })
}

impl StartSender {
    /// Queue a command without blocking.
    pub fn send(&self, command: StartCommand) -> Result<(), InboxError> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => InboxError::Full,
            TrySendError::Disconnected(_) => InboxError::Disconnected,
        })
    }
}

impl StartInbox {
    /// Hand every pending command, oldest first, to `handle`.
    ///
    /// Returns the number of commands drained.
    pub fn drain(&self, mut handle: impl FnMut(StartCommand)) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(command) => {
                    handle(command);
                    drained += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    /// Number of commands waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
