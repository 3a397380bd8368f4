//! 服务端代理客户端：凭据只存在于代理一侧。

mod client;
mod config;
mod error;
pub mod wire;

pub use client::HttpProxyClient;
pub use config::{ProxyConfig, API_BASE_ENV, HTTP_TIMEOUT_ENV};
pub use error::ProxyError;
pub use wire::HealthStatus;
