use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use frontdesk_core::chat::{ChatReply, TextChat};
use frontdesk_core::persona::Persona;
use frontdesk_core::proxy::{HttpProxyClient, ProxyConfig};
use frontdesk_core::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let client = HttpProxyClient::new(ProxyConfig::from_env()?);
    info!(
        base_url = %client.config().base_url,
        timeout = ?client.config().request_timeout,
        "using proxy"
    );

    match client.health().await {
        Ok(health) if health.is_ok() => info!(uptime = health.uptime, "proxy healthy"),
        Ok(health) => warn!(status = %health.status, "proxy reported degraded health"),
        Err(err) => warn!(%err, "proxy health check failed"),
    }

    let persona = Persona::default();
    let mut chat = TextChat::new(Arc::new(client), persona.clone());
    println!("{}: {}", persona.name, chat.open().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match chat.send(&line).await {
                    Some(ChatReply::Answer(text)) => println!("{}: {text}", persona.name),
                    Some(ChatReply::Unavailable(text)) => eprintln!("{text}"),
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, closing chat");
                break;
            }
        }
    }

    Ok(())
}
