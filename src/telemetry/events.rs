use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) const TARGET: &str = "telemetry::call";
pub(crate) const EVENT_CALL_STARTED: &str = "call_started";
pub(crate) const EVENT_CALL_ENDED: &str = "call_ended";
pub(crate) const EVENT_TURN_DISPATCHED: &str = "turn_dispatched";
pub(crate) const EVENT_TURN_COMPLETED: &str = "turn_completed";
pub(crate) const EVENT_TURN_FAILED: &str = "turn_failed";
pub(crate) const EVENT_RECOGNITION_RETRY: &str = "recognition_retry";
pub(crate) const EVENT_RECOGNITION_EXHAUSTED: &str = "recognition_exhausted";
pub(crate) const EVENT_PLAYBACK_OUTCOME: &str = "playback_outcome";

#[derive(Debug, Serialize)]
pub struct CallLifecycleEvent {
    pub call_id: u64,
    pub user_turns: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TurnDispatchedEvent {
    pub call_id: u64,
    pub history_len: usize,
    pub utterance_chars: usize,
}

#[derive(Debug, Serialize)]
pub struct TurnResultEvent {
    pub call_id: u64,
    pub latency_ms: u64,
    pub reply_chars: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecognitionRetryEvent {
    pub attempt: u8,
    pub max: u8,
    pub reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PlaybackOutcomeEvent {
    pub cue: &'static str,
    pub outcome: &'static str,
}

pub fn record_call_started(call_id: u64) {
    let event = CallLifecycleEvent {
        call_id,
        user_turns: None,
    };
    emit(EVENT_CALL_STARTED, &event);
}

pub fn record_call_ended(call_id: u64, user_turns: usize) {
    let event = CallLifecycleEvent {
        call_id,
        user_turns: Some(user_turns),
    };
    emit(EVENT_CALL_ENDED, &event);
}

pub fn record_turn_dispatched(call_id: u64, history_len: usize, utterance_chars: usize) {
    let event = TurnDispatchedEvent {
        call_id,
        history_len,
        utterance_chars,
    };
    emit(EVENT_TURN_DISPATCHED, &event);
}

pub fn record_turn_completed(call_id: u64, latency: Duration, reply_chars: usize) {
    let event = TurnResultEvent {
        call_id,
        latency_ms: duration_to_ms(latency),
        reply_chars: Some(reply_chars),
        error: None,
    };
    emit(EVENT_TURN_COMPLETED, &event);
}

pub fn record_turn_failed(call_id: u64, latency: Duration, error: impl Into<String>) {
    let event = TurnResultEvent {
        call_id,
        latency_ms: duration_to_ms(latency),
        reply_chars: None,
        error: Some(error.into()),
    };
    emit(EVENT_TURN_FAILED, &event);
}

pub fn record_recognition_retry(attempt: u8, max: u8, reason: &'static str) {
    let event = RecognitionRetryEvent {
        attempt,
        max,
        reason,
    };
    emit(EVENT_RECOGNITION_RETRY, &event);
}

pub fn record_recognition_exhausted(attempts: u8, reason: &'static str) {
    let event = RecognitionRetryEvent {
        attempt: attempts,
        max: attempts,
        reason,
    };
    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_RECOGNITION_EXHAUSTED,
            attempts,
            reason,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_RECOGNITION_EXHAUSTED,
            %err,
            "failed to encode telemetry event"
        ),
    }
}

pub fn record_playback_outcome(cue: &'static str, outcome: &'static str) {
    let event = PlaybackOutcomeEvent { cue, outcome };
    emit(EVENT_PLAYBACK_OUTCOME, &event);
}

fn emit<T: Serialize>(name: &'static str, event: &T) {
    match serde_json::to_string(event) {
        Ok(payload) => info!(target: TARGET, event = name, payload = %payload),
        Err(err) => warn!(
            target: TARGET,
            event = name,
            %err,
            "failed to encode telemetry event"
        ),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
