//! Router actor: the single Tokio task that owns all chat state.
//!
//! Connection handlers talk to the router through a [`RouterHandle`]. Each
//! call becomes a [`RouterCommand`] on a bounded mpsc channel; the actor
//! runs one command to completion (registry change plus every resulting
//! send) before it looks at the next, then answers on a oneshot channel.
//! Because outbound events are queued before the answer is sent, a handler
//! that forwards the answer to its client as an ack never overtakes the
//! envelopes that event produced.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use chitchat_presence::{User, UserRegistry};
use chitchat_protocol::{
    ChatMessage, JoinRequest, Location, LocationMessage, RoomData,
    ServerEvent,
};
use chitchat_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{ChatError, ContentFilter, RouterConfig};

/// Channel sender for delivering outbound events to one connection.
///
/// Unbounded so fan-out never waits on a slow client.
pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to the router actor.
pub(crate) enum RouterCommand {
    Join {
        conn_id: ConnectionId,
        request: JoinRequest,
        sender: ClientSender,
        reply: Reply<Result<(), ChatError>>,
    },
    SendMessage {
        conn_id: ConnectionId,
        text: String,
        reply: Reply<Result<(), ChatError>>,
    },
    SendLocation {
        conn_id: ConnectionId,
        location: Location,
        reply: Reply<Result<(), ChatError>>,
    },
    /// The transport saw the connection close. No reply.
    Disconnect { conn_id: ConnectionId },
    GetUser {
        conn_id: ConnectionId,
        reply: Reply<Option<User>>,
    },
    Roster {
        room: String,
        reply: Reply<Vec<String>>,
    },
    Shutdown,
}

/// Handle to the running router. Cheap to clone; every connection
/// handler holds one.
#[derive(Clone)]
pub struct RouterHandle {
    sender: mpsc::Sender<RouterCommand>,
}

impl RouterHandle {
    /// Joins `conn_id` to a room under a username.
    ///
    /// On success the connection receives the welcome notice and the
    /// room's roster through `sender`, and the rest of the room hears
    /// about the newcomer.
    ///
    /// # Errors
    /// [`ChatError::MissingFields`], [`ChatError::UsernameTaken`], or
    /// [`ChatError::AlreadyJoined`]; the connection stays unjoined (or in
    /// its current room) in every case.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        request: JoinRequest,
        sender: ClientSender,
    ) -> Result<(), ChatError> {
        self.request(|reply| RouterCommand::Join {
            conn_id,
            request,
            sender,
            reply,
        })
        .await?
    }

    /// Posts a text message to the sender's room, sender included.
    ///
    /// # Errors
    /// [`ChatError::NotJoined`] or [`ChatError::Profanity`]; nothing is
    /// sent to anyone in either case.
    pub async fn send_message(
        &self,
        conn_id: ConnectionId,
        text: impl Into<String>,
    ) -> Result<(), ChatError> {
        let text = text.into();
        self.request(|reply| RouterCommand::SendMessage {
            conn_id,
            text,
            reply,
        })
        .await?
    }

    /// Shares a map link to `location` with the sender's room.
    ///
    /// # Errors
    /// [`ChatError::NotJoined`].
    pub async fn send_location(
        &self,
        conn_id: ConnectionId,
        location: Location,
    ) -> Result<(), ChatError> {
        self.request(|reply| RouterCommand::SendLocation {
            conn_id,
            location,
            reply,
        })
        .await?
    }

    /// Reports that a connection closed (fire-and-forget).
    ///
    /// Connections that never joined are ignored by the router.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        if self
            .sender
            .send(RouterCommand::Disconnect { conn_id })
            .await
            .is_err()
        {
            tracing::debug!(%conn_id, "router gone, disconnect dropped");
        }
    }

    /// Returns the user bound to `conn_id`, if any.
    pub async fn get_user(
        &self,
        conn_id: ConnectionId,
    ) -> Result<Option<User>, ChatError> {
        self.request(|reply| RouterCommand::GetUser { conn_id, reply })
            .await
    }

    /// Returns the usernames in `room`, in join order.
    pub async fn roster(&self, room: &str) -> Result<Vec<String>, ChatError> {
        let room = room.to_string();
        self.request(|reply| RouterCommand::Roster { room, reply })
            .await
    }

    /// Stops the router. Later calls fail with [`ChatError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        self.sender
            .send(RouterCommand::Shutdown)
            .await
            .map_err(|_| ChatError::Unavailable)
    }

    /// Returns `true` once the router task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends a command built around a fresh reply channel and waits for
    /// the answer.
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> RouterCommand,
    ) -> Result<T, ChatError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| ChatError::Unavailable)?;
        reply_rx.await.map_err(|_| ChatError::Unavailable)
    }
}

/// The router's state. Runs inside a Tokio task.
struct RouterActor<F: ContentFilter> {
    registry: UserRegistry,
    /// Outbound queues of joined connections.
    senders: HashMap<ConnectionId, ClientSender>,
    filter: F,
    config: RouterConfig,
    receiver: mpsc::Receiver<RouterCommand>,
}

impl<F: ContentFilter> RouterActor<F> {
    /// Runs the actor loop, processing commands until shutdown or until
    /// every handle is dropped.
    async fn run(mut self) {
        tracing::info!("chat router started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RouterCommand::Join {
                    conn_id,
                    request,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(conn_id, request, sender);
                    let _ = reply.send(result);
                }
                RouterCommand::SendMessage {
                    conn_id,
                    text,
                    reply,
                } => {
                    let result = self.handle_send_message(conn_id, text);
                    let _ = reply.send(result);
                }
                RouterCommand::SendLocation {
                    conn_id,
                    location,
                    reply,
                } => {
                    let result = self.handle_send_location(conn_id, location);
                    let _ = reply.send(result);
                }
                RouterCommand::Disconnect { conn_id } => {
                    self.handle_disconnect(conn_id);
                }
                RouterCommand::GetUser { conn_id, reply } => {
                    let _ = reply.send(self.registry.get_user(conn_id).cloned());
                }
                RouterCommand::Roster { room, reply } => {
                    let _ = reply.send(self.registry.usernames_in_room(&room));
                }
                RouterCommand::Shutdown => {
                    tracing::info!(
                        users = self.registry.len(),
                        "chat router shutting down"
                    );
                    break;
                }
            }
        }

        tracing::info!("chat router stopped");
    }

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        request: JoinRequest,
        sender: ClientSender,
    ) -> Result<(), ChatError> {
        if self.registry.contains(conn_id) {
            tracing::debug!(%conn_id, "join from already-joined connection");
            return Err(ChatError::AlreadyJoined);
        }

        let user = self
            .registry
            .add_user(conn_id, &request.username, &request.room)
            .inspect_err(|e| {
                tracing::debug!(%conn_id, error = %e, "join rejected");
            })?;
        self.senders.insert(conn_id, sender);

        tracing::info!(
            %conn_id,
            username = %user.username(),
            room = %user.room(),
            members = self.registry.connections_in_room(user.room()).len(),
            "user joined"
        );

        let now = timestamp_millis();
        self.send_to(
            conn_id,
            ServerEvent::Message(ChatMessage::system(
                self.config.welcome_text.clone(),
                now,
            )),
        );
        self.broadcast_except(
            user.room(),
            conn_id,
            ServerEvent::Message(ChatMessage::system(
                format!("{} has joined", user.username()),
                now,
            )),
        );
        self.broadcast(user.room(), self.roster_event(user.room()));

        Ok(())
    }

    fn handle_send_message(
        &self,
        conn_id: ConnectionId,
        text: String,
    ) -> Result<(), ChatError> {
        let user = self.joined_user(conn_id)?;

        if self.filter.is_blocked(&text) {
            tracing::debug!(
                %conn_id,
                room = %user.room(),
                "message blocked by moderation"
            );
            return Err(ChatError::Profanity);
        }

        let event = ServerEvent::Message(ChatMessage::from_user(
            user.username(),
            text,
            timestamp_millis(),
        ));
        self.broadcast(user.room(), event);
        Ok(())
    }

    fn handle_send_location(
        &self,
        conn_id: ConnectionId,
        location: Location,
    ) -> Result<(), ChatError> {
        let user = self.joined_user(conn_id)?;

        let event = ServerEvent::LocationMessage(LocationMessage {
            username: user.username().to_string(),
            url: location.map_url(),
            created_at: timestamp_millis(),
        });
        self.broadcast(user.room(), event);
        Ok(())
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        self.senders.remove(&conn_id);

        let Some(user) = self.registry.remove_user(conn_id) else {
            tracing::debug!(%conn_id, "unjoined connection closed");
            return;
        };

        let remaining = self.registry.connections_in_room(user.room()).len();
        tracing::info!(
            %conn_id,
            username = %user.username(),
            room = %user.room(),
            remaining,
            "user left"
        );

        // The room only exists through its members; once empty there is
        // nobody to tell.
        if remaining == 0 {
            return;
        }

        self.broadcast(
            user.room(),
            ServerEvent::Message(ChatMessage::system(
                format!("{} has left.", user.username()),
                timestamp_millis(),
            )),
        );
        self.broadcast(user.room(), self.roster_event(user.room()));
    }

    fn joined_user(&self, conn_id: ConnectionId) -> Result<User, ChatError> {
        self.registry.get_user(conn_id).cloned().ok_or_else(|| {
            tracing::debug!(%conn_id, "event from unjoined connection");
            ChatError::NotJoined
        })
    }

    fn roster_event(&self, room: &str) -> ServerEvent {
        ServerEvent::RoomData(RoomData {
            room: room.to_string(),
            users: self.registry.usernames_in_room(room),
        })
    }

    /// Sends `event` to every member of `room`.
    fn broadcast(&self, room: &str, event: ServerEvent) {
        for member in self.registry.connections_in_room(room) {
            self.send_to(*member, event.clone());
        }
    }

    /// Sends `event` to every member of `room` except `excluded`.
    fn broadcast_except(
        &self,
        room: &str,
        excluded: ConnectionId,
        event: ServerEvent,
    ) {
        for member in self.registry.connections_in_room(room) {
            if *member != excluded {
                self.send_to(*member, event.clone());
            }
        }
    }

    /// Queues an event for one connection. A closed queue means the
    /// connection is going away; its disconnect is already on the way, so
    /// the event is dropped.
    fn send_to(&self, conn_id: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&conn_id) {
            if sender.send(event).is_err() {
                tracing::trace!(%conn_id, "recipient gone, event dropped");
            }
        }
    }
}

/// Milliseconds since the Unix epoch.
fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Spawns the router task and returns a handle to it.
///
/// The task stops on [`RouterHandle::shutdown`] or when the last handle
/// is dropped.
pub fn spawn_router<F: ContentFilter>(
    filter: F,
    config: RouterConfig,
) -> RouterHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let actor = RouterActor {
        registry: UserRegistry::new(),
        senders: HashMap::new(),
        filter,
        config,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RouterHandle { sender: tx }
}
