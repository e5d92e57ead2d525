use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crush_db::MessageLog;
use crush_types::events::ChatEvent;
use crush_types::models::{ChatMessage, RoomId};

pub type ConnId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{user} is not a participant of room {room}")]
    NotParticipant { room: RoomId, user: String },
    #[error("message log unavailable: {0}")]
    PersistenceFailure(String),
}

/// Fans chat events out to the connections joined to each two-party room.
///
/// Messages are written to the log before they are broadcast, and both
/// steps run under a per-room lock, so every member sees a room's messages
/// in the order they were stored.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    log: Arc<dyn MessageLog>,
    state: RwLock<Membership>,
    /// Held across persist + broadcast for a room; entries live only while
    /// a turn is held or awaited.
    sequencers: Mutex<HashMap<RoomId, Arc<AsyncMutex<()>>>>,
}

#[derive(Default)]
struct Membership {
    connections: HashMap<ConnId, Member>,
    rooms: HashMap<RoomId, HashSet<ConnId>>,
}

struct Member {
    tx: mpsc::UnboundedSender<ChatEvent>,
    room: Option<RoomId>,
}

impl Membership {
    fn leave(&mut self, conn: ConnId) -> Option<RoomId> {
        let room = self.connections.get_mut(&conn)?.room.take()?;
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        Some(room)
    }
}

impl Relay {
    pub fn new(log: Arc<dyn MessageLog>) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                log,
                state: RwLock::new(Membership::default()),
                sequencers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a new connection. Events for it arrive on the receiver.
    pub async fn connect(&self) -> (ConnId, mpsc::UnboundedReceiver<ChatEvent>) {
        let conn = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .state
            .write()
            .await
            .connections
            .insert(conn, Member { tx, room: None });
        (conn, rx)
    }

    /// Drop the connection and its room membership.
    pub async fn disconnect(&self, conn: ConnId) {
        let mut state = self.inner.state.write().await;
        if let Some(room) = state.leave(conn) {
            debug!("connection {} left room {}", conn, room);
        }
        state.connections.remove(&conn);
    }

    /// Move `conn` into `room` and send it the room's full history.
    pub async fn join(&self, conn: ConnId, room: &RoomId, user: &str) -> Result<(), RelayError> {
        self.check_participant(conn, room, user).await?;

        let _turn = self.turn(room).await;

        {
            let mut state = self.inner.state.write().await;
            if !state.connections.contains_key(&conn) {
                return Ok(());
            }
            state.leave(conn);
            if let Some(member) = state.connections.get_mut(&conn) {
                member.room = Some(room.clone());
            }
            state.rooms.entry(room.clone()).or_default().insert(conn);
        }
        info!("User {} joined room {}", user, room);

        let lookup = room.clone();
        let messages = match self.with_log(move |log| log.history(&lookup)).await {
            Ok(messages) => messages,
            Err(e) => return Err(self.reject(conn, e).await),
        };
        // Silently dropped if the socket went away while loading.
        self.notify(conn, ChatEvent::ChatHistory { messages }).await;
        Ok(())
    }

    /// Store a message, then relay it to everyone in the room.
    pub async fn send(
        &self,
        conn: ConnId,
        room: &RoomId,
        sender: &str,
        text: &str,
    ) -> Result<ChatMessage, RelayError> {
        self.check_participant(conn, room, sender).await?;

        let _turn = self.turn(room).await;

        let message = ChatMessage::new(room.clone(), sender, text);
        let stored = message.clone();
        if let Err(e) = self.with_log(move |log| log.append(&stored)).await {
            return Err(self.reject(conn, e).await);
        }

        let delivered = self
            .broadcast(
                room,
                None,
                ChatEvent::ChatMessage {
                    sender: message.sender.clone(),
                    text: message.text.clone(),
                    timestamp: message.timestamp,
                },
            )
            .await;
        debug!("message {} in {} relayed to {} connections", message.id, room, delivered);
        Ok(message)
    }

    pub async fn typing(&self, conn: ConnId, room: &RoomId, user: &str) -> Result<(), RelayError> {
        self.check_participant(conn, room, user).await?;
        let event = ChatEvent::Typing {
            room: room.clone(),
            user: user.to_string(),
        };
        self.broadcast(room, Some(conn), event).await;
        Ok(())
    }

    pub async fn stop_typing(&self, conn: ConnId, room: &RoomId, user: &str) -> Result<(), RelayError> {
        self.check_participant(conn, room, user).await?;
        let event = ChatEvent::StopTyping {
            room: room.clone(),
            user: user.to_string(),
        };
        self.broadcast(room, Some(conn), event).await;
        Ok(())
    }

    /// Record that `user` has read everything in `room` and tell the rest
    /// of the room. Returns how many messages were newly marked; repeat calls
    /// mark nothing and stay quiet.
    pub async fn mark_as_read(&self, conn: ConnId, room: &RoomId, user: &str) -> Result<usize, RelayError> {
        self.check_participant(conn, room, user).await?;

        let _turn = self.turn(room).await;

        let (lookup, reader) = (room.clone(), user.to_string());
        let marked = match self.with_log(move |log| log.mark_read(&lookup, &reader)).await {
            Ok(marked) => marked,
            Err(e) => return Err(self.reject(conn, e).await),
        };

        if marked > 0 {
            let event = ChatEvent::MessagesRead { user: user.to_string() };
            self.broadcast(room, Some(conn), event).await;
        }
        Ok(marked)
    }

    /// Deliver an event to a single connection, if it is still around.
    pub async fn notify(&self, conn: ConnId, event: ChatEvent) {
        let state = self.inner.state.read().await;
        if let Some(member) = state.connections.get(&conn) {
            let _ = member.tx.send(event);
        }
    }

    #[cfg(test)]
    async fn room_size(&self, room: &RoomId) -> usize {
        self.inner
            .state
            .read()
            .await
            .rooms
            .get(room)
            .map_or(0, HashSet::len)
    }

    async fn broadcast(&self, room: &RoomId, except: Option<ConnId>, event: ChatEvent) -> usize {
        let state = self.inner.state.read().await;
        let Some(members) = state.rooms.get(room) else {
            return 0;
        };

        let mut delivered = 0;
        for conn in members {
            if Some(*conn) == except {
                continue;
            }
            if let Some(member) = state.connections.get(conn) {
                if member.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    async fn check_participant(&self, conn: ConnId, room: &RoomId, user: &str) -> Result<(), RelayError> {
        if room.has_participant(user) {
            return Ok(());
        }
        let err = RelayError::NotParticipant {
            room: room.clone(),
            user: user.to_string(),
        };
        Err(self.reject(conn, err).await)
    }

    /// Log a failed command and report it back to the connection that sent it.
    async fn reject(&self, conn: ConnId, err: RelayError) -> RelayError {
        match &err {
            RelayError::PersistenceFailure(_) => error!("connection {}: {}", conn, err),
            RelayError::NotParticipant { .. } => warn!("connection {}: {}", conn, err),
        }
        self.notify(conn, ChatEvent::Error { message: err.to_string() }).await;
        err
    }

    /// Wait for exclusive use of `room`'s sequencer.
    async fn turn(&self, room: &RoomId) -> RoomTurn<'_> {
        let sequencer = self
            .inner
            .sequencers
            .lock()
            .entry(room.clone())
            .or_default()
            .clone();
        let guard = sequencer.lock_owned().await;
        RoomTurn {
            inner: &self.inner,
            room: room.clone(),
            guard: Some(guard),
        }
    }

    /// Run a message log call on the blocking pool.
    async fn with_log<T, F>(&self, f: F) -> Result<T, RelayError>
    where
        F: FnOnce(&dyn MessageLog) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let log = self.inner.log.clone();
        tokio::task::spawn_blocking(move || f(log.as_ref()))
            .await
            .map_err(|e| RelayError::PersistenceFailure(format!("log task failed: {e}")))?
            .map_err(|e| RelayError::PersistenceFailure(format!("{e:#}")))
    }
}

/// A held room sequencer. Releasing the last turn on a room drops the
/// room's entry from the sequencer map.
struct RoomTurn<'a> {
    inner: &'a RelayInner,
    room: RoomId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RoomTurn<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut sequencers = self.inner.sequencers.lock();
        // Only the map's own handle left: nobody holds or waits on it.
        if sequencers
            .get(&self.room)
            .is_some_and(|s| Arc::strong_count(s) == 1)
        {
            sequencers.remove(&self.room);
        }
    }
}
