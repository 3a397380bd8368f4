//! 与通话生命周期绑定的可取消定时器。
//!
//! Every timer kind has at most one armed instance. Re-arming or cancelling
//! aborts the sleeping task, and each fire carries a token so a fire that was
//! already queued before the cancellation is recognised as stale by `claim`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TimerKind {
    Connect,
    StartTimeout,
    StartRetry,
    Silence,
    Resume,
}

impl TimerKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Connect => "connect",
            TimerKind::StartTimeout => "start_timeout",
            TimerKind::StartRetry => "start_retry",
            TimerKind::Silence => "silence",
            TimerKind::Resume => "resume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerFired {
    pub(crate) kind: TimerKind,
    token: u64,
}

struct ArmedTimer {
    token: u64,
    task: JoinHandle<()>,
}

pub(crate) struct Scheduler {
    tx: mpsc::UnboundedSender<TimerFired>,
    next_token: u64,
    armed: HashMap<TimerKind, ArmedTimer>,
}

impl Scheduler {
    pub(crate) fn new(tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            tx,
            next_token: 0,
            armed: HashMap::new(),
        }
    }

    pub(crate) fn arm(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel(kind);
        self.next_token = self.next_token.wrapping_add(1);
        let token = self.next_token;
        let tx = self.tx.clone();

        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(TimerFired { kind, token });
        });

        self.armed.insert(kind, ArmedTimer { token, task });
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.armed.remove(&kind) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.task.abort();
        }
    }

    pub(crate) fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    /// Consumes the fire if it belongs to the currently armed timer of its kind.
    pub(crate) fn claim(&mut self, fired: TimerFired) -> bool {
        match self.armed.get(&fired.kind) {
            Some(timer) if timer.token == fired.token => {
                self.armed.remove(&fired.kind);
                true
            }
            _ => false,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
