//! 语音识别引擎的生命周期状态机。
//!
//! The platform engine rejects `start()` while a previous run is still
//! starting or stopping, so every call into it is serialised through
//! [`RecognitionState`]. Failed starts are retried with a fixed delay until
//! the [`RetryBudget`] runs out, after which the controller halts until the
//! next call resets it.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::call::config::CallConfig;
use crate::call::scheduler::{Scheduler, TimerKind};
use crate::call::session::CallSession;
use crate::call::traits::RecognitionEngine;
use crate::telemetry::events::{record_recognition_exhausted, record_recognition_retry};

const TARGET: &str = "recognition";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl RecognitionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionState::Idle => "idle",
            RecognitionState::Starting => "starting",
            RecognitionState::Running => "running",
            RecognitionState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for RecognitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 连续启动失败计数，成功进入 RUNNING 或新通话开始时清零。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    used: u8,
    max: u8,
}

impl RetryBudget {
    pub fn new(max: u8) -> Self {
        Self { used: 0, max }
    }

    pub fn used(&self) -> u8 {
        self.used
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn record_failure(&mut self) -> u8 {
        self.used = self.used.saturating_add(1).min(self.max);
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("microphone failed to start after {attempts} attempts")]
    RetriesExhausted { attempts: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    Inactive,
    TurnInProgress,
    Busy(RecognitionState),
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartRequest {
    Issued,
    Skipped(SkipReason),
    RetryScheduled { attempt: u8 },
}

pub(crate) struct RecognitionController {
    engine: Arc<dyn RecognitionEngine>,
    state: RecognitionState,
    budget: RetryBudget,
    listening: bool,
    halted: bool,
    config: CallConfig,
}

impl RecognitionController {
    pub(crate) fn new(engine: Arc<dyn RecognitionEngine>, config: &CallConfig) -> Self {
        Self {
            engine,
            state: RecognitionState::Idle,
            budget: RetryBudget::new(config.max_start_retries),
            listening: false,
            halted: false,
            config: config.clone(),
        }
    }

    pub(crate) fn state(&self) -> RecognitionState {
        self.state
    }

    pub(crate) fn retry_count(&self) -> u8 {
        self.budget.used()
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listening
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted
    }

    /// Fresh budget for a new call.
    pub(crate) fn reset(&mut self) {
        self.state = RecognitionState::Idle;
        self.listening = false;
        self.halted = false;
        self.budget.reset();
    }

    pub(crate) fn request_start(
        &mut self,
        session: Option<&CallSession>,
        scheduler: &mut Scheduler,
    ) -> Result<StartRequest, RecognitionError> {
        let skip = if self.halted {
            Some(SkipReason::Halted)
        } else {
            match session {
                Some(session) if !session.is_active() => Some(SkipReason::Inactive),
                None => Some(SkipReason::Inactive),
                Some(session) if session.turn_in_progress() => Some(SkipReason::TurnInProgress),
                Some(_) if self.state != RecognitionState::Idle => {
                    Some(SkipReason::Busy(self.state))
                }
                Some(_) => None,
            }
        };

        if let Some(reason) = skip {
            match reason {
                SkipReason::Busy(state) => warn!(
                    target: TARGET,
                    %state,
                    "recognition busy, skipping start request"
                ),
                other => debug!(target: TARGET, reason = ?other, "skipping start request"),
            }
            return Ok(StartRequest::Skipped(reason));
        }

        info!(target: TARGET, "starting recognition (idle -> starting)");
        self.state = RecognitionState::Starting;

        match self.engine.start() {
            Ok(()) => {
                scheduler.arm(TimerKind::StartTimeout, self.config.start_timeout);
                Ok(StartRequest::Issued)
            }
            Err(fault) => {
                warn!(target: TARGET, %fault, "recognition engine refused to start");
                self.state = RecognitionState::Idle;
                scheduler.cancel(TimerKind::StartTimeout);
                self.record_failure(scheduler, "engine_fault")
            }
        }
    }

    pub(crate) fn on_start_timeout(
        &mut self,
        scheduler: &mut Scheduler,
    ) -> Result<(), RecognitionError> {
        if self.state != RecognitionState::Starting {
            debug!(target: TARGET, state = %self.state, "start timeout after state change");
            return Ok(());
        }

        warn!(
            target: TARGET,
            timeout = ?self.config.start_timeout,
            "recognition never reported started, aborting"
        );
        self.engine.abort();
        self.state = RecognitionState::Idle;
        self.listening = false;
        self.record_failure(scheduler, "start_timeout").map(|_| ())
    }

    fn record_failure(
        &mut self,
        scheduler: &mut Scheduler,
        reason: &'static str,
    ) -> Result<StartRequest, RecognitionError> {
        let attempt = self.budget.record_failure();

        if self.budget.is_exhausted() {
            self.halted = true;
            scheduler.cancel(TimerKind::StartRetry);
            error!(
                target: TARGET,
                attempts = attempt,
                reason,
                "max recognition retries exceeded"
            );
            record_recognition_exhausted(attempt, reason);
            return Err(RecognitionError::RetriesExhausted { attempts: attempt });
        }

        info!(
            target: TARGET,
            attempt,
            max = self.budget.max(),
            reason,
            "retrying recognition start"
        );
        record_recognition_retry(attempt, self.budget.max(), reason);
        scheduler.arm(TimerKind::StartRetry, self.config.start_retry_delay);
        Ok(StartRequest::RetryScheduled { attempt })
    }

    /// Returns `true` when the engine transitioned into RUNNING.
    pub(crate) fn on_started(&mut self, scheduler: &mut Scheduler) -> bool {
        if self.state != RecognitionState::Starting {
            debug!(target: TARGET, state = %self.state, "ignoring started event");
            return false;
        }

        info!(target: TARGET, "recognition running");
        self.state = RecognitionState::Running;
        self.listening = true;
        self.budget.reset();
        scheduler.cancel(TimerKind::StartTimeout);
        true
    }

    pub(crate) fn on_ended(&mut self, scheduler: &mut Scheduler) {
        debug!(target: TARGET, state = %self.state, "recognition ended");
        self.settle_idle(scheduler);
    }

    /// An error before `started` is a failed start and is charged to the budget;
    /// a runtime error only drops back to IDLE.
    pub(crate) fn on_error(
        &mut self,
        code: &str,
        scheduler: &mut Scheduler,
    ) -> Result<(), RecognitionError> {
        warn!(target: TARGET, code, state = %self.state, "recognition error");
        let failed_start = self.state == RecognitionState::Starting;
        self.settle_idle(scheduler);
        if failed_start {
            self.record_failure(scheduler, "start_error")?;
        }
        Ok(())
    }

    /// Returns `false` when the controller was already idle.
    pub(crate) fn request_stop(&mut self, scheduler: &mut Scheduler) -> bool {
        if self.state == RecognitionState::Idle {
            debug!(target: TARGET, "recognition already idle, nothing to stop");
            return false;
        }

        info!(target: TARGET, state = %self.state, "stopping recognition");
        self.state = RecognitionState::Stopping;
        scheduler.cancel(TimerKind::StartTimeout);

        if let Err(fault) = self.engine.stop() {
            warn!(target: TARGET, %fault, "failed to stop recognition");
            self.state = RecognitionState::Idle;
            self.listening = false;
        }
        true
    }

    /// Drops back to IDLE immediately, aborting the engine if it is still busy.
    pub(crate) fn force_idle(&mut self, scheduler: &mut Scheduler) {
        if self.state != RecognitionState::Idle {
            info!(target: TARGET, state = %self.state, "forcing recognition idle");
            self.engine.abort();
        }
        self.settle_idle(scheduler);
    }

    fn settle_idle(&mut self, scheduler: &mut Scheduler) {
        self.state = RecognitionState::Idle;
        self.listening = false;
        scheduler.cancel(TimerKind::StartTimeout);
    }
}
