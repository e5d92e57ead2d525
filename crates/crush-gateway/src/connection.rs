use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crush_types::events::{ChatCommand, ChatEvent};

use crate::relay::{ConnId, Relay};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one chat WebSocket until either side goes away.
pub async fn handle_connection(socket: WebSocket, relay: Relay) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut events) = relay.connect().await;
    info!("A user connected to chat ({})", conn);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward relay events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Could not encode event for {}: {}", conn, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping {}", missed_heartbeats, conn);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let relay_recv = relay.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ChatCommand>(text.as_str()) {
                    Ok(cmd) => handle_command(&relay_recv, conn, cmd).await,
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            conn,
                            e,
                            text.as_str().chars().take(200).collect::<String>()
                        );
                        relay_recv
                            .notify(conn, ChatEvent::Error { message: format!("bad command: {e}") })
                            .await;
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish; aborting the reader abandons any
    // history load still in flight.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    relay.disconnect(conn).await;
    info!("User disconnected from chat ({})", conn);
}

async fn handle_command(relay: &Relay, conn: ConnId, cmd: ChatCommand) {
    // Failures are already reported to the client by the relay.
    let result = match cmd {
        ChatCommand::JoinRoom { room, user } => relay.join(conn, &room, &user).await,
        ChatCommand::ChatMessage {
            room,
            sender,
            message,
        } => relay.send(conn, &room, &sender, &message).await.map(|_| ()),
        ChatCommand::Typing { room, user } => {
            debug!("{} typing in {}", user, room);
            relay.typing(conn, &room, &user).await
        }
        ChatCommand::StopTyping { room, user } => relay.stop_typing(conn, &room, &user).await,
        ChatCommand::MarkAsRead { room, user } => {
            relay.mark_as_read(conn, &room, &user).await.map(|_| ())
        }
    };

    if let Err(e) = result {
        debug!("command from {} failed: {}", conn, e);
    }
}
