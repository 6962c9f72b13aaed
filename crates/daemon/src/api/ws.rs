//! WebSocket event streaming over `GET /events`, adapted from the
//! teacher's `events_handler`/`QemuEvent` pattern.

use crate::supervisor::Supervisor;
use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn events_handler(ws: WebSocketUpgrade, State(supervisor): State<Arc<Supervisor>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, supervisor))
}

async fn handle_socket(mut socket: WebSocket, supervisor: Arc<Supervisor>) {
    info!("new WebSocket client connected");

    let mut rx = supervisor.events.subscribe();
    let mut dropped_count: usize = 0;

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if dropped_count > 0 {
                            let notice = serde_json::json!({
                                "type": "backpressure",
                                "droppedCount": dropped_count,
                            });
                            if let Ok(json) = serde_json::to_string(&notice) {
                                let _ = socket.send(axum::extract::ws::Message::Text(json)).await;
                            }
                            dropped_count = 0;
                        }

                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if let Err(e) = socket.send(axum::extract::ws::Message::Text(json)).await {
                                    error!("failed to send event to client: {e}");
                                    break;
                                }
                            }
                            Err(e) => error!("failed to serialize event: {e}"),
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        dropped_count += n as usize;
                        debug!("client lagging, dropped {n} events (total: {dropped_count})");
                    }
                    Err(e) => {
                        error!("event channel error: {e}");
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(axum::extract::ws::Message::Close(_))) => {
                        debug!("client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket closed");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
