//! Signal handling for graceful shutdown and config reload.

use std::sync::Arc;

use dbdoctor_core::runtime::AlertChannel;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;

use crate::config::{ConfigLoader, LoadedConfig};

/// Completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
    Ok(())
}

/// Spawns a task that reloads the configuration on SIGHUP.
///
/// The channel is pointed at the reloaded endpoint when it changed, or
/// reconnected when it is not currently open (for example after giving up).
/// Returns a Notify that stops the task.
pub fn spawn_config_reload_handler(
    channel: AlertChannel,
    config_loader: Arc<ConfigLoader>,
    current: LoadedConfig,
) -> std::io::Result<Arc<Notify>> {
    let mut sighup = signal(SignalKind::hangup())?;
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        let mut current = current;

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded_config) => {
                            apply_reload(&channel, &current, &loaded_config).await;
                            current = loaded_config;
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Config reload handler shutting down");
                    break;
                }
            }
        }
    });

    Ok(shutdown_notify)
}

async fn apply_reload(channel: &AlertChannel, current: &LoadedConfig, reloaded: &LoadedConfig) {
    if reloaded.channel != current.channel || reloaded.output != current.output {
        tracing::warn!("Changes to [channel] and [output] take effect on restart");
    }

    let endpoint_changed = reloaded.endpoint != current.endpoint;
    if !endpoint_changed && channel.is_connected() {
        tracing::info!("Configuration reloaded, endpoint unchanged");
        return;
    }

    if endpoint_changed {
        tracing::info!(endpoint = %reloaded.endpoint, "Alert endpoint changed, reconnecting");
    } else {
        tracing::info!(state = %channel.state(), "Alert channel not open, reconnecting");
    }
    if let Err(e) = channel.connect(reloaded.endpoint.clone()).await {
        tracing::error!("Failed to reconnect alert channel: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputConfig, OutputFormat};
    use dbdoctor_core::channel::ChannelState;
    use dbdoctor_sdk::config::{ChannelConfig, ReconnectPolicy};
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::watch;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{WebSocketStream, accept_async};
    use url::Url;

    const WAIT: Duration = Duration::from_secs(5);

    /// No heartbeats during a test, and a single failed open gives up.
    fn test_channel_config() -> ChannelConfig {
        ChannelConfig {
            heartbeat_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(2),
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(20),
                max_delay: Duration::from_millis(100),
                max_attempts: 0,
            },
        }
    }

    fn loaded(endpoint: &Url) -> LoadedConfig {
        LoadedConfig {
            endpoint: endpoint.clone(),
            channel: test_channel_config(),
            output: OutputConfig::default(),
        }
    }

    async fn bind() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url =
            Url::parse(&format!("ws://{}/ws/alerts", listener.local_addr().unwrap())).unwrap();
        (listener, url)
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (tcp, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        accept_async(tcp).await.unwrap()
    }

    async fn next_text(server: &mut WebSocketStream<TcpStream>) -> Option<String> {
        while let Some(frame) = server.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(text.to_string()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
        None
    }

    async fn wait_for_state(channel: &AlertChannel, state: ChannelState) {
        timeout(WAIT, channel.wait_for(|s| s.state == state))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_reload_connects_idle_channel() {
        let (listener, url) = bind().await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (channel, _driver) = AlertChannel::spawn(&test_channel_config(), shutdown_rx);
        assert_eq!(channel.state(), ChannelState::Idle);

        apply_reload(&channel, &loaded(&url), &loaded(&url)).await;

        let _server = accept(&listener).await;
        wait_for_state(&channel, ChannelState::Open).await;
    }

    #[tokio::test]
    async fn test_reload_resumes_channel_that_gave_up() {
        let (listener, url) = bind().await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (channel, _driver) = AlertChannel::spawn(&test_channel_config(), shutdown_rx);

        // Drop the first connection before the handshake.
        channel.connect(url.clone()).await.unwrap();
        let (tcp, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        drop(tcp);
        wait_for_state(&channel, ChannelState::GivenUp).await;

        apply_reload(&channel, &loaded(&url), &loaded(&url)).await;

        let _server = accept(&listener).await;
        wait_for_state(&channel, ChannelState::Open).await;
        assert_eq!(channel.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_reload_switches_to_changed_endpoint() {
        let (old_listener, old_url) = bind().await;
        let (new_listener, new_url) = bind().await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (channel, _driver) = AlertChannel::spawn(&test_channel_config(), shutdown_rx);

        channel.connect(old_url.clone()).await.unwrap();
        let mut old_server = accept(&old_listener).await;
        wait_for_state(&channel, ChannelState::Open).await;

        apply_reload(&channel, &loaded(&old_url), &loaded(&new_url)).await;

        let mut new_server = accept(&new_listener).await;
        assert_eq!(timeout(WAIT, next_text(&mut old_server)).await.unwrap(), None);
        wait_for_state(&channel, ChannelState::Open).await;

        channel.send("hello").await.unwrap();
        assert_eq!(
            timeout(WAIT, next_text(&mut new_server)).await.unwrap().as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn test_reload_leaves_open_channel_alone_when_endpoint_unchanged() {
        let (listener, url) = bind().await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (channel, _driver) = AlertChannel::spawn(&test_channel_config(), shutdown_rx);

        channel.connect(url.clone()).await.unwrap();
        let mut server = accept(&listener).await;
        wait_for_state(&channel, ChannelState::Open).await;

        let mut reloaded = loaded(&url);
        reloaded.output = OutputConfig {
            format: OutputFormat::Json,
            min_severity: None,
        };
        apply_reload(&channel, &loaded(&url), &reloaded).await;

        // Commands apply in order, so a reconnect would close this socket
        // before the frame is written.
        channel.send("still here").await.unwrap();
        assert_eq!(
            timeout(WAIT, next_text(&mut server)).await.unwrap().as_deref(),
            Some("still here")
        );
        assert!(
            timeout(Duration::from_millis(200), listener.accept())
                .await
                .is_err()
        );
        assert!(channel.is_connected());
    }
}
