use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

use crate::call::types::{CallSnapshot, CallUpdate, RecognitionEvent};

#[derive(Debug)]
pub(crate) enum CallCommand {
    Start,
    End,
    Toggle,
    Snapshot(oneshot::Sender<CallSnapshot>),
}

/// 引擎适配层用于投递识别回调的发送端。
#[derive(Debug, Clone)]
pub struct RecognitionEventSender {
    tx: mpsc::UnboundedSender<RecognitionEvent>,
}

impl RecognitionEventSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the call runtime is gone.
    pub fn send(&self, event: RecognitionEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(err) => {
                warn!(target: "turn_coordinator", event = ?err.0, "call runtime closed, dropping recognition event");
                false
            }
        }
    }
}

/// 通话运行时的控制句柄。
///
/// Dropping the handle closes the command channel; the worker then ends any
/// active call (aborting the engine and playback) and exits.
pub struct CallHandle {
    command_tx: mpsc::Sender<CallCommand>,
    recognition_tx: RecognitionEventSender,
    updates_tx: broadcast::Sender<CallUpdate>,
    worker: JoinHandle<()>,
}

impl CallHandle {
    pub(super) fn new(
        command_tx: mpsc::Sender<CallCommand>,
        recognition_tx: RecognitionEventSender,
        updates_tx: broadcast::Sender<CallUpdate>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            command_tx,
            recognition_tx,
            updates_tx,
            worker,
        }
    }

    pub async fn start_call(&self) -> Result<(), mpsc::error::SendError<()>> {
        self.send(CallCommand::Start).await
    }

    pub async fn end_call(&self) -> Result<(), mpsc::error::SendError<()>> {
        self.send(CallCommand::End).await
    }

    pub async fn toggle_call(&self) -> Result<(), mpsc::error::SendError<()>> {
        self.send(CallCommand::Toggle).await
    }

    pub async fn snapshot(&self) -> Option<CallSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(CallCommand::Snapshot(tx)).await.ok()?;
        rx.await.ok()
    }

    pub fn recognition_events(&self) -> RecognitionEventSender {
        self.recognition_tx.clone()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<CallUpdate> {
        self.updates_tx.subscribe()
    }

    /// Ends the active call and waits for the runtime to stop.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        let CallHandle {
            command_tx, worker, ..
        } = self;
        drop(command_tx);
        worker.await
    }

    async fn send(&self, command: CallCommand) -> Result<(), mpsc::error::SendError<()>> {
        self.command_tx.send(command).await.map_err(|_| {
            warn!(target: "turn_coordinator", "call runtime closed, dropping command");
            mpsc::error::SendError(())
        })
    }
}
