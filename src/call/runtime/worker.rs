use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::call::config::CallConfig;
use crate::call::playback::{PlaybackController, PlaybackFinished, SpeechCue};
use crate::call::recognition::{RecognitionController, RecognitionError, RecognitionState};
use crate::call::scheduler::{Scheduler, TimerFired, TimerKind};
use crate::call::session::CallSession;
use crate::call::traits::CompletionService;
use crate::call::transcript::TranscriptRenderer;
use crate::call::types::{
    CallSnapshot, CallUpdate, NoticeLevel, RecognitionEvent, Role, StatusUpdate,
};
use crate::persona::Persona;
use crate::proxy::ProxyError;
use crate::telemetry::events::{
    record_call_ended, record_call_started, record_turn_completed, record_turn_dispatched,
    record_turn_failed,
};

use super::handle::CallCommand;
use super::state::PendingUtterance;
use super::CallComponents;

const TARGET: &str = "turn_coordinator";

const STATUS_CONNECTING: &str = "Connecting...";
const STATUS_LISTENING: &str = "Listening...";
const STATUS_CONNECTED: &str = "Connected";
const STATUS_MESSAGE_RECEIVED: &str = "Message received";
const STATUS_RETRYING: &str = "Error. Retrying...";
const STATUS_MICROPHONE_ERROR: &str = "Microphone error. Please try again.";
const STATUS_CALL_ENDED: &str = "Call ended";

struct CompletionFinished {
    call_id: u64,
    result: Result<String, ProxyError>,
    latency: Duration,
}

pub(crate) struct CallWorker {
    config: CallConfig,
    persona: Persona,
    completion: Arc<dyn CompletionService>,
    command_rx: mpsc::Receiver<CallCommand>,
    recognition_rx: mpsc::UnboundedReceiver<RecognitionEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
    playback_rx: mpsc::UnboundedReceiver<PlaybackFinished>,
    completion_tx: mpsc::UnboundedSender<CompletionFinished>,
    completion_rx: mpsc::UnboundedReceiver<CompletionFinished>,
    updates_tx: broadcast::Sender<CallUpdate>,
    scheduler: Scheduler,
    recognition: RecognitionController,
    playback: PlaybackController,
    transcript: TranscriptRenderer,
    pending: PendingUtterance,
    session: Option<CallSession>,
    next_call_id: u64,
}

impl CallWorker {
    pub(crate) fn new(
        config: CallConfig,
        persona: Persona,
        components: CallComponents,
        command_rx: mpsc::Receiver<CallCommand>,
        recognition_rx: mpsc::UnboundedReceiver<RecognitionEvent>,
        updates_tx: broadcast::Sender<CallUpdate>,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (playback_tx, playback_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let recognition = RecognitionController::new(components.engine, &config);
        let playback =
            PlaybackController::new(components.synthesizer, components.output, playback_tx);

        Self {
            config,
            persona,
            completion: components.completion,
            command_rx,
            recognition_rx,
            timer_rx,
            playback_rx,
            completion_tx,
            completion_rx,
            updates_tx,
            scheduler: Scheduler::new(timer_tx),
            recognition,
            playback,
            transcript: TranscriptRenderer::new(),
            pending: PendingUtterance::default(),
            session: None,
            next_call_id: 0,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(mut self) {
        let mut recognition_closed = false;

        loop {
            tokio::select! {
                biased;

                Some(fired) = self.timer_rx.recv() => {
                    self.handle_timer(fired);
                }

                Some(finished) = self.playback_rx.recv() => {
                    self.handle_playback_finished(finished);
                }

                Some(finished) = self.completion_rx.recv() => {
                    self.handle_completion(finished);
                }

                maybe_event = self.recognition_rx.recv(), if !recognition_closed => {
                    match maybe_event {
                        Some(event) => self.handle_recognition_event(event),
                        None => recognition_closed = true,
                    }
                }

                maybe_command = self.command_rx.recv() => {
                    match maybe_command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                }
            }
        }

        self.end_call();
        debug!(target: TARGET, "call runtime stopped");
    }

    fn handle_command(&mut self, command: CallCommand) {
        match command {
            CallCommand::Start => self.start_call(),
            CallCommand::End => self.end_call(),
            CallCommand::Toggle => {
                if self.is_active() {
                    self.end_call();
                } else {
                    self.start_call();
                }
            }
            CallCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .map(CallSession::is_active)
            .unwrap_or(false)
    }

    fn start_call(&mut self) {
        if self.is_active() {
            debug!(target: TARGET, "call already active");
            return;
        }

        self.next_call_id = self.next_call_id.wrapping_add(1);
        let call_id = self.next_call_id;
        info!(target: TARGET, call_id, "starting call");

        self.session = Some(CallSession::start(call_id));
        self.recognition.reset();
        self.pending.clear();
        self.transcript.clear();
        self.emit(CallUpdate::TranscriptCleared);
        self.status(NoticeLevel::Info, STATUS_CONNECTING);
        self.scheduler
            .arm(TimerKind::Connect, self.config.connect_delay);
        record_call_started(call_id);
    }

    fn end_call(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        info!(target: TARGET, call_id = session.call_id(), "ending call");
        let turns = session
            .history()
            .iter()
            .filter(|message| message.role == Role::User)
            .count();
        session.close();

        self.scheduler.cancel_all();
        let was_listening = self.recognition.is_listening();
        self.recognition.force_idle(&mut self.scheduler);
        let was_speaking = self.playback.stop();
        self.pending.clear();
        self.transcript.clear();

        if was_listening {
            self.emit(CallUpdate::Listening(false));
        }
        if was_speaking {
            self.emit(CallUpdate::Speaking(false));
        }
        self.emit(CallUpdate::TranscriptCleared);
        self.status(NoticeLevel::Info, STATUS_CALL_ENDED);
        record_call_ended(session.call_id(), turns);
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        if !self.scheduler.claim(fired) {
            debug!(target: TARGET, kind = fired.kind.as_str(), "ignoring stale timer");
            return;
        }

        match fired.kind {
            TimerKind::Connect => self.play_greeting(),
            TimerKind::StartTimeout => {
                if let Err(err) = self.recognition.on_start_timeout(&mut self.scheduler) {
                    self.surface_fatal(err);
                }
            }
            TimerKind::StartRetry | TimerKind::Resume => self.request_listening(),
            TimerKind::Silence => self.on_silence(),
        }
    }

    fn request_listening(&mut self) {
        if let Err(err) = self
            .recognition
            .request_start(self.session.as_ref(), &mut self.scheduler)
        {
            self.surface_fatal(err);
        }
    }

    fn surface_fatal(&mut self, err: RecognitionError) {
        error!(target: TARGET, %err, "giving up on microphone");
        self.status(NoticeLevel::Error, STATUS_MICROPHONE_ERROR);
    }

    fn play_greeting(&mut self) {
        let Some(session) = self.session.as_mut().filter(|session| session.is_active()) else {
            return;
        };

        let greeting = self.persona.greeting.clone();
        session.push_assistant(greeting.as_str());
        let line = self.transcript.push_assistant(&greeting);
        self.emit(CallUpdate::Transcript(line));
        info!(target: TARGET, "playing greeting");
        self.speak(greeting, SpeechCue::Greeting);
    }

    fn speak(&mut self, text: String, cue: SpeechCue) {
        self.playback.speak(text, cue);
        self.emit(CallUpdate::Speaking(true));
    }

    fn handle_playback_finished(&mut self, finished: PlaybackFinished) {
        let Some((cue, outcome)) = self.playback.on_finished(finished) else {
            return;
        };
        self.emit(CallUpdate::Speaking(false));

        if !self.is_active() {
            return;
        }

        if outcome.is_failure() {
            self.status(NoticeLevel::Warn, STATUS_MESSAGE_RECEIVED);
        } else {
            self.status(NoticeLevel::Info, STATUS_CONNECTED);
        }

        if cue == SpeechCue::Reply {
            if let Some(session) = self.session.as_mut() {
                session.finish_turn();
            }
        }
        info!(target: TARGET, cue = cue.as_str(), "resuming listening");
        self.scheduler
            .arm(TimerKind::Resume, self.config.playback_resume_delay);
    }

    fn handle_recognition_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                if self.recognition.on_started(&mut self.scheduler) {
                    self.emit(CallUpdate::Listening(true));
                    self.status(NoticeLevel::Info, STATUS_LISTENING);
                }
            }
            RecognitionEvent::Ended => {
                let was_listening = self.recognition.is_listening();
                self.recognition.on_ended(&mut self.scheduler);
                if was_listening {
                    self.emit(CallUpdate::Listening(false));
                }
                self.resume_if_idle(self.config.noise_restart_delay);
            }
            RecognitionEvent::Error { code } => {
                let was_listening = self.recognition.is_listening();
                let charged = self.recognition.on_error(&code, &mut self.scheduler);
                if was_listening {
                    self.emit(CallUpdate::Listening(false));
                }
                match charged {
                    Ok(()) => self.resume_if_idle(self.config.recovery_delay),
                    Err(err) => self.surface_fatal(err),
                }
            }
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => self.on_result(&transcript, is_final),
        }
    }

    /// Keeps the call listening after the engine stopped on its own.
    fn resume_if_idle(&mut self, delay: Duration) {
        let accepts = self
            .session
            .as_ref()
            .map(CallSession::accepts_listening)
            .unwrap_or(false);

        if !accepts
            || self.playback.is_speaking()
            || self.recognition.is_halted()
            || self.recognition.state() != RecognitionState::Idle
            || self.scheduler.is_armed(TimerKind::Silence)
            || self.scheduler.is_armed(TimerKind::Resume)
            || self.scheduler.is_armed(TimerKind::StartRetry)
            || self.scheduler.is_armed(TimerKind::Connect)
        {
            return;
        }

        debug!(target: TARGET, ?delay, "recognition went idle, scheduling resume");
        self.scheduler.arm(TimerKind::Resume, delay);
    }

    fn on_result(&mut self, transcript: &str, is_final: bool) {
        let accepts = self
            .session
            .as_ref()
            .map(CallSession::accepts_listening)
            .unwrap_or(false);
        if !accepts {
            debug!(target: TARGET, "ignoring recognition result outside a listening window");
            return;
        }

        self.pending.observe(transcript, is_final);
        if !self.pending.live().trim().is_empty() {
            let line = self.transcript.show_live(self.pending.live());
            self.emit(CallUpdate::Transcript(line));
        }

        if is_final {
            self.scheduler
                .arm(TimerKind::Silence, self.config.silence_debounce);
        }
    }

    fn on_silence(&mut self) {
        let utterance = self.pending.take_final();
        if !self.is_active() {
            return;
        }

        if utterance.is_empty() {
            debug!(target: TARGET, "empty utterance, listening again");
            self.scheduler
                .arm(TimerKind::Resume, self.config.noise_restart_delay);
            return;
        }

        info!(target: TARGET, chars = utterance.chars().count(), "user finished speaking");
        self.recognition.request_stop(&mut self.scheduler);
        self.scheduler.cancel(TimerKind::Resume);
        self.scheduler.cancel(TimerKind::StartRetry);

        if let Some(line) = self.transcript.finalize_live() {
            self.emit(CallUpdate::Transcript(line));
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.push_user(utterance.as_str());
        session.begin_turn();
        let call_id = session.call_id();
        let history_len = session.history().len();
        let messages = session.completion_messages(&self.persona.system_prompt);

        self.status(NoticeLevel::Info, &self.persona.thinking_status());
        record_turn_dispatched(call_id, history_len, utterance.chars().count());

        let completion = Arc::clone(&self.completion);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = completion.complete(&messages).await;
            let _ = completion_tx.send(CompletionFinished {
                call_id,
                result,
                latency: started.elapsed(),
            });
        });
    }

    fn handle_completion(&mut self, finished: CompletionFinished) {
        let session = match self.session.as_mut() {
            Some(session) if session.is_active() && session.call_id() == finished.call_id => {
                session
            }
            _ => {
                info!(
                    target: TARGET,
                    call_id = finished.call_id,
                    "discarding completion for an ended call"
                );
                return;
            }
        };

        match finished.result {
            Ok(reply) => {
                session.push_assistant(reply.as_str());
                record_turn_completed(
                    finished.call_id,
                    finished.latency,
                    reply.chars().count(),
                );
                let line = self.transcript.push_assistant(&reply);
                self.emit(CallUpdate::Transcript(line));
                self.status(NoticeLevel::Info, &self.persona.speaking_status());
                self.speak(reply, SpeechCue::Reply);
            }
            Err(err) => {
                warn!(target: TARGET, %err, status = ?err.status(), "completion failed, recovering");
                session.finish_turn();
                record_turn_failed(finished.call_id, finished.latency, err.to_string());
                self.recognition.force_idle(&mut self.scheduler);
                self.status(NoticeLevel::Warn, STATUS_RETRYING);
                self.scheduler
                    .arm(TimerKind::Resume, self.config.recovery_delay);
            }
        }
    }

    fn snapshot(&self) -> CallSnapshot {
        let (active, turn_in_progress, history) = match &self.session {
            Some(session) => (
                session.is_active(),
                session.turn_in_progress(),
                session.history().to_vec(),
            ),
            None => (false, false, Vec::new()),
        };

        CallSnapshot {
            active,
            turn_in_progress,
            history,
            recognition: self.recognition.state(),
            retry_count: self.recognition.retry_count(),
            speaking: self.playback.is_speaking(),
            transcript: self.transcript.lines().to_vec(),
        }
    }

    fn status(&self, level: NoticeLevel, message: &str) {
        info!(target: TARGET, status = message, "status update");
        self.emit(CallUpdate::Status(StatusUpdate {
            level,
            message: message.to_string(),
        }));
    }

    fn emit(&self, update: CallUpdate) {
        if self.updates_tx.receiver_count() == 0 {
            return;
        }
        if let Err(err) = self.updates_tx.send(update) {
            warn!(target: TARGET, %err, "failed to broadcast call update");
        }
    }
}
