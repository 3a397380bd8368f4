use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::call::constants::{
    CONNECT_DELAY, MAX_START_RETRIES, NOISE_RESTART_DELAY, PLAYBACK_RESUME_DELAY,
    RECOVERY_DELAY, SILENCE_DEBOUNCE, START_RETRY_DELAY, START_TIMEOUT,
};

/// 通话状态机使用的全部时序常量。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallConfig {
    /// `start()` 之后等待引擎 `started` 事件的最长时长。
    pub start_timeout: Duration,
    /// 最后一个 final 结果之后判定用户说完的静默窗口。
    pub silence_debounce: Duration,
    /// 启动失败后重试前的等待时长。
    pub start_retry_delay: Duration,
    /// 空白转写（噪声）之后重新监听的等待时长。
    pub noise_restart_delay: Duration,
    /// 播放结束（或失败）之后恢复监听的等待时长。
    pub playback_resume_delay: Duration,
    /// 补全失败或识别运行时错误之后恢复监听的等待时长。
    pub recovery_delay: Duration,
    /// 通话开始到播放问候语之间的等待时长。
    pub connect_delay: Duration,
    /// 连续启动失败的上限，达到后停止自动重试。
    pub max_start_retries: u8,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            start_timeout: START_TIMEOUT,
            silence_debounce: SILENCE_DEBOUNCE,
            start_retry_delay: START_RETRY_DELAY,
            noise_restart_delay: NOISE_RESTART_DELAY,
            playback_resume_delay: PLAYBACK_RESUME_DELAY,
            recovery_delay: RECOVERY_DELAY,
            connect_delay: CONNECT_DELAY,
            max_start_retries: MAX_START_RETRIES,
        }
    }
}
