mod handle;
mod state;
mod worker;

pub use handle::{CallHandle, RecognitionEventSender};

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::call::config::CallConfig;
use crate::call::traits::{AudioOutput, CompletionService, RecognitionEngine, SpeechSynthesizer};
use crate::call::types::CallUpdate;
use crate::persona::Persona;

use self::worker::CallWorker;

const COMMAND_CAPACITY: usize = 16;
const UPDATE_CAPACITY: usize = 64;

/// 通话依赖的外部能力。
#[derive(Clone)]
pub struct CallComponents {
    pub engine: Arc<dyn RecognitionEngine>,
    pub completion: Arc<dyn CompletionService>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub output: Arc<dyn AudioOutput>,
}

/// Spawns the turn coordinator. Must be called inside a tokio runtime.
pub fn spawn_call(
    config: CallConfig,
    persona: Persona,
    components: CallComponents,
) -> (CallHandle, broadcast::Receiver<CallUpdate>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (recognition_tx, recognition_rx) = mpsc::unbounded_channel();
    let (updates_tx, updates_rx) = broadcast::channel(UPDATE_CAPACITY);

    let worker = CallWorker::new(
        config,
        persona,
        components,
        command_rx,
        recognition_rx,
        updates_tx.clone(),
    );

    let handle = CallHandle::new(
        command_tx,
        RecognitionEventSender::new(recognition_tx),
        updates_tx,
        worker.spawn(),
    );

    (handle, updates_rx)
}
