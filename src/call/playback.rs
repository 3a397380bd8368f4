//! 回复语音的合成与播放。
//!
//! Only one [`AudioPlaybackHandle`] exists at a time. Speaking a new text
//! drops the previous handle, which aborts its task and with it the
//! synthesis request or the audio output future. A single-permit output slot
//! keeps the next utterance waiting until the aborted future is really gone. Every outcome, including
//! failures, is reported back as a finished utterance.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::call::traits::{AudioOutput, SpeechSynthesizer};
use crate::telemetry::events::record_playback_outcome;

const TARGET: &str = "playback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpeechCue {
    Greeting,
    Reply,
}

impl SpeechCue {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            SpeechCue::Greeting => "greeting",
            SpeechCue::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlaybackOutcome {
    Completed,
    SynthesisFailed(String),
    PlaybackFailed(String),
}

impl PlaybackOutcome {
    pub(crate) fn is_failure(&self) -> bool {
        !matches!(self, PlaybackOutcome::Completed)
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            PlaybackOutcome::Completed => "completed",
            PlaybackOutcome::SynthesisFailed(_) => "synthesis_failed",
            PlaybackOutcome::PlaybackFailed(_) => "playback_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaybackFinished {
    id: u64,
    outcome: PlaybackOutcome,
}

pub(crate) struct AudioPlaybackHandle {
    id: u64,
    cue: SpeechCue,
    task: JoinHandle<()>,
}

impl Drop for AudioPlaybackHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) struct PlaybackController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
    finished_tx: mpsc::UnboundedSender<PlaybackFinished>,
    /// 音频输出槽：单一许可，被中止的任务在其 future 释放时归还。
    output_slot: Arc<Semaphore>,
    current: Option<AudioPlaybackHandle>,
    next_id: u64,
}

impl PlaybackController {
    pub(crate) fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output: Arc<dyn AudioOutput>,
        finished_tx: mpsc::UnboundedSender<PlaybackFinished>,
    ) -> Self {
        Self {
            synthesizer,
            output,
            finished_tx,
            output_slot: Arc::new(Semaphore::new(1)),
            current: None,
            next_id: 0,
        }
    }

    pub(crate) fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    pub(crate) fn speak(&mut self, text: String, cue: SpeechCue) {
        self.stop();
        self.next_id = self.next_id.wrapping_add(1);
        let id = self.next_id;
        let synthesizer = Arc::clone(&self.synthesizer);
        let output = Arc::clone(&self.output);
        let finished_tx = self.finished_tx.clone();
        let output_slot = Arc::clone(&self.output_slot);

        info!(target: TARGET, id, cue = cue.as_str(), chars = text.chars().count(), "generating voice");

        let task = tokio::spawn(async move {
            let outcome = match output_slot.acquire_owned().await {
                Ok(_slot) => match synthesizer.synthesize(&text).await {
                    Ok(clip) => {
                        debug!(target: TARGET, id, bytes = clip.len(), "playing synthesized audio");
                        match output.play(clip).await {
                            Ok(()) => PlaybackOutcome::Completed,
                            Err(err) => PlaybackOutcome::PlaybackFailed(err.to_string()),
                        }
                    }
                    Err(err) => PlaybackOutcome::SynthesisFailed(err.to_string()),
                },
                Err(err) => PlaybackOutcome::PlaybackFailed(err.to_string()),
            };
            let _ = finished_tx.send(PlaybackFinished { id, outcome });
        });

        self.current = Some(AudioPlaybackHandle { id, cue, task });
    }

    /// Returns `true` if something was playing.
    pub(crate) fn stop(&mut self) -> bool {
        match self.current.take() {
            Some(handle) => {
                info!(target: TARGET, id = handle.id, "stopping playback");
                true
            }
            None => false,
        }
    }

    /// Releases the handle the report belongs to; stale reports yield `None`.
    pub(crate) fn on_finished(
        &mut self,
        finished: PlaybackFinished,
    ) -> Option<(SpeechCue, PlaybackOutcome)> {
        match &self.current {
            Some(handle) if handle.id == finished.id => {}
            _ => {
                debug!(target: TARGET, id = finished.id, "ignoring stale playback report");
                return None;
            }
        }

        let handle = self.current.take()?;
        match &finished.outcome {
            PlaybackOutcome::Completed => {
                info!(target: TARGET, id = handle.id, "voice finished")
            }
            PlaybackOutcome::SynthesisFailed(reason) | PlaybackOutcome::PlaybackFailed(reason) => {
                warn!(
                    target: TARGET,
                    id = handle.id,
                    outcome = finished.outcome.as_str(),
                    %reason,
                    "voice failed, treating utterance as spoken"
                )
            }
        }
        record_playback_outcome(handle.cue.as_str(), finished.outcome.as_str());
        Some((handle.cue, finished.outcome))
    }
}
