// WebSocket handler and stream logic

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::hub::BroadcastHub;
use crate::models::ObservationMessage;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Releases the subscriber (cancelling its poll task) when the socket task
/// ends for any reason.
struct SubscriberGuard {
    hub: Arc<BroadcastHub>,
    id: u64,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}

pub(super) async fn ws_traffic(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_traffic(socket, hub).await {
            tracing::info!("Traffic stream error: {}", e);
        }
    })
}

async fn stream_traffic(socket: WebSocket, hub: Arc<BroadcastHub>) -> anyhow::Result<()> {
    let mut subscription = hub.connect();
    let id = subscription.id;
    let _guard = SubscriberGuard {
        hub: hub.clone(),
        id,
    };
    tracing::info!(subscriber = id, "Client connected to traffic stream");

    let (mut sender, mut receiver) = socket.split();

    let config_json = serde_json::to_string(&subscription.config)?;
    let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Text(config_json.into()))).await;
    if r.is_err() || r.unwrap_or(Ok(())).is_err() {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            observation = subscription.observations.recv() => {
                let Some(observation) = observation else { break };
                let message = ObservationMessage::from(observation);
                let json = serde_json::to_string(&message)?;
                let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Text(json.into()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match text.trim() {
                        "pause" => {
                            hub.pause(id);
                        }
                        "resume" => {
                            hub.resume(id);
                        }
                        other => {
                            tracing::debug!(subscriber = id, message = other, "ignoring unknown client message");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // pings/pongs
                    Some(Err(_)) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}
