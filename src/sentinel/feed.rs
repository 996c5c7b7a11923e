//! Launch feed websocket client.
//!
//! Subscribes to new-token events, forwards create events into the pipeline
//! queue and reconnects with a fixed delay whenever the connection drops. The
//! read loop only decodes and forwards; a full queue pauses reading.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::types::CREATE_EVENT_KIND;

/// How a single connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Disconnected,
    ReceiverClosed,
    Shutdown,
}

pub struct TokenFeed {
    url: String,
    reconnect_delay: Duration,
    events: mpsc::Sender<Value>,
}

impl TokenFeed {
    pub fn new(url: String, reconnect_delay: Duration, events: mpsc::Sender<Value>) -> Self {
        Self {
            url,
            reconnect_delay,
            events,
        }
    }

    /// Subscription request sent after every (re)connect.
    pub fn subscribe_message() -> Value {
        json!({ "method": "subscribeNewToken" })
    }

    /// Keep the feed connected until shutdown or until the pipeline goes away.
    /// Dropping the shutdown sender also stops the feed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            info!(url = %self.url, "Connecting to launch feed");
            match self.connect_and_stream(&mut shutdown).await {
                Ok(StreamEnd::Shutdown) => break,
                Ok(StreamEnd::ReceiverClosed) => {
                    info!("Pipeline queue closed, stopping feed");
                    break;
                }
                Ok(StreamEnd::Disconnected) => warn!("Launch feed disconnected"),
                Err(e) => error!("Launch feed error: {:#}", e),
            }

            info!(delay = ?self.reconnect_delay, "Reconnecting to launch feed");
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Launch feed stopped");
    }

    async fn connect_and_stream(&self, shutdown: &mut watch::Receiver<bool>) -> Result<StreamEnd> {
        let connected = tokio::select! {
            connected = connect_async(self.url.as_str()) => connected,
            _ = wait_for_shutdown(shutdown) => return Ok(StreamEnd::Shutdown),
        };
        let (ws_stream, _response) = connected.context("Failed to connect to launch feed")?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(Self::subscribe_message().to_string()))
            .await
            .context("Failed to send subscription")?;
        info!("Subscribed to new token events");

        loop {
            let message = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(StreamEnd::Shutdown);
                    }
                    continue;
                }
                message = read.next() => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    let Some(event) = parse_feed_message(&text) else {
                        continue;
                    };
                    if self.events.send(event).await.is_err() {
                        return Ok(StreamEnd::ReceiverClosed);
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        warn!("Failed to answer feed ping: {}", e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "Launch feed sent close frame");
                    return Ok(StreamEnd::Disconnected);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Launch feed read error: {}", e);
                    return Ok(StreamEnd::Disconnected);
                }
                None => return Ok(StreamEnd::Disconnected),
            }
        }
    }
}

/// Resolves once `true` is published or the shutdown sender is dropped.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Decode one text frame. Returns the object only for create events.
pub fn parse_feed_message(text: &str) -> Option<Value> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Undecodable feed message: {}", e);
            return None;
        }
    };

    if value.get("txType").and_then(Value::as_str) == Some(CREATE_EVENT_KIND) {
        Some(value)
    } else {
        debug!("Ignoring non-create feed message");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_message() {
        assert_eq!(
            TokenFeed::subscribe_message().to_string(),
            r#"{"method":"subscribeNewToken"}"#
        );
    }

    #[test]
    fn test_create_events_pass() {
        let event = parse_feed_message(r#"{"mint":"Abc","txType":"create"}"#).unwrap();
        assert_eq!(event["mint"], "Abc");
    }

    #[test]
    fn test_other_messages_are_ignored() {
        assert!(parse_feed_message(r#"{"message":"Successfully subscribed"}"#).is_none());
        assert!(parse_feed_message(r#"{"mint":"Abc","txType":"buy"}"#).is_none());
        assert!(parse_feed_message("not json").is_none());
    }

    #[tokio::test]
    async fn test_feed_stops_when_shutdown_already_set() {
        let (tx, _rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(true);
        let feed = TokenFeed::new("ws://127.0.0.1:9".to_string(), Duration::from_secs(5), tx);

        tokio::time::timeout(Duration::from_secs(1), feed.run(shutdown_rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_stalled_handshake() {
        // accepts connections but never answers the websocket upgrade
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let (tx, _rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let feed = TokenFeed::new(url, Duration::from_secs(5), tx);
        let handle = tokio::spawn(feed.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("feed did not stop")
            .unwrap();
    }
}
