// WebSocket observer stream: published frames, run status and effects as JSON.

use crate::domain::{DeviceState, Effect};
use crate::interface_adapters::http::latest_state;
use crate::interface_adapters::protocol::ServerMessage;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{RunStatus, Runtime, Snapshot};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug, Error)]
enum NetError {
    #[error("websocket error: {0}")]
    Ws(axum::Error),
    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),
}

enum LoopControl {
    Continue,
    Disconnect,
}

// Per-connection subscriptions, taken before the first await so nothing is missed.
struct Observer {
    frames_rx: watch::Receiver<Snapshot<DeviceState>>,
    status_rx: watch::Receiver<RunStatus>,
    effect_rx: broadcast::Receiver<Effect>,
    msgs_out: u64,
}

fn next_conn_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let span = info_span!("conn", conn_id = next_conn_id());
    observe(socket, state).instrument(span).await;
}

async fn observe(mut socket: WebSocket, state: Arc<AppState>) {
    let runtime = Arc::clone(&state.runtime);
    let mut observer = Observer {
        frames_rx: runtime.device(),
        status_rx: runtime.status(),
        effect_rx: state.effect_tx.subscribe(),
        msgs_out: 0,
    };
    info!("observer connected");

    if let Err(e) = run_observer_loop(&mut socket, &runtime, &mut observer).await {
        warn!(error = %e, "observer loop exited with error");
    }
    info!(msgs_out = observer.msgs_out, "observer disconnected");
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)
}

async fn run_observer_loop(
    socket: &mut WebSocket,
    runtime: &Runtime,
    observer: &mut Observer,
) -> Result<(), NetError> {
    // Initial sync: the current frame and status, marked seen so they are not resent.
    observer.frames_rx.mark_unchanged();
    let status = observer.status_rx.borrow_and_update().clone();
    send_message(socket, &ServerMessage::Frame(latest_state(runtime))).await?;
    send_message(socket, &ServerMessage::Status(status)).await?;
    observer.msgs_out += 2;

    let Observer {
        frames_rx,
        status_rx,
        effect_rx,
        msgs_out,
    } = observer;

    loop {
        let outgoing = tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => None,
                    Some(Err(e)) => return Err(NetError::Ws(e)),
                }
            }

            // Every publish replaces all three domains at once; one channel is enough to wake on.
            changed = frames_rx.changed() => match changed {
                Ok(()) => Some(ServerMessage::Frame(latest_state(runtime))),
                Err(_) => return Ok(()),
            },

            changed = status_rx.changed() => match changed {
                Ok(()) => Some(ServerMessage::Status(status_rx.borrow_and_update().clone())),
                Err(_) => return Ok(()),
            },

            effect = effect_rx.recv() => match effect {
                Ok(effect) => Some(ServerMessage::Effect(effect)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Effects are decorative; dropping some is fine.
                    debug!(missed = n, "effects lagged");
                    None
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        };

        let control = match outgoing {
            Some(msg) => match send_message(socket, &msg).await {
                Ok(()) => {
                    *msgs_out += 1;
                    LoopControl::Continue
                }
                Err(NetError::Serialization(e)) => {
                    warn!(error = %e, "failed to serialize observer message");
                    LoopControl::Continue
                }
                Err(e) => {
                    debug!(error = %e, "send failed; disconnecting");
                    LoopControl::Disconnect
                }
            },
            None => LoopControl::Continue,
        };

        if let LoopControl::Disconnect = control {
            return Ok(());
        }
    }
}
