//! Frontdesk Core Library
//!
//! 语音前台助手的客户端核心：通话状态机（识别、轮次协调、播放、对话渲染）、
//! 文字聊天、服务端代理客户端以及观测性初始化。

pub mod call;
pub mod chat;
pub mod persona;
pub mod proxy;
pub mod telemetry;
