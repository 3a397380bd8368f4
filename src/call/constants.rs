use std::time::Duration;

pub(crate) const START_TIMEOUT: Duration = Duration::from_millis(3_000);
pub(crate) const SILENCE_DEBOUNCE: Duration = Duration::from_millis(3_000);
pub(crate) const START_RETRY_DELAY: Duration = Duration::from_millis(500);
pub(crate) const NOISE_RESTART_DELAY: Duration = Duration::from_millis(200);
pub(crate) const PLAYBACK_RESUME_DELAY: Duration = Duration::from_millis(300);
pub(crate) const RECOVERY_DELAY: Duration = Duration::from_millis(2_000);
pub(crate) const CONNECT_DELAY: Duration = Duration::from_millis(500);
pub(crate) const MAX_START_RETRIES: u8 = 5;
