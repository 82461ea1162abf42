//! Per-connection handler: frame decoding, dispatch, and acknowledgment.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task. The flow is:
//!   1. Create the outbound queue and spawn the writer draining it
//!   2. Loop: receive frame → decode → forward to the router
//!   3. Push the ack (if requested) into the same outbound queue
//!   4. On close, report the disconnect to the router

use std::sync::Arc;

use chitchat_protocol::{
    Ack, ClientEvent, ClientFrame, Codec, FrameHeader, ServerEvent,
};
use chitchat_room::{ChatError, ClientSender, RouterHandle};
use chitchat_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ChitchatError;
use crate::server::ServerState;

/// Ack error code for a frame whose event could not be decoded.
const INVALID_FRAME: &str = "InvalidFrame";

/// Drop guard that reports the disconnect when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the router call.
struct DisconnectGuard {
    conn_id: ConnectionId,
    router: RouterHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let router = self.router.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                router.disconnect(conn_id).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ChitchatError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (outbound, queue) = mpsc::unbounded_channel();
    let writer =
        tokio::spawn(write_loop(Arc::clone(&conn), queue, Arc::clone(&state)));

    let _guard = DisconnectGuard {
        conn_id,
        router: state.router.clone(),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let frame: ClientFrame = match state.codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode frame");
                // A readable ack id still gets its answer.
                let header: Option<FrameHeader> = state.codec.decode(&data).ok();
                if let Some(id) = header.and_then(|h| h.ack) {
                    let ack = Ack::err(id, INVALID_FRAME, e.to_string());
                    if outbound.send(ServerEvent::Ack(ack)).is_err() {
                        break;
                    }
                }
                continue;
            }
        };

        let result = dispatch(&state.router, conn_id, frame.event, &outbound).await;

        if let Some(id) = frame.ack {
            let ack = match &result {
                Ok(()) => Ack::ok(id),
                Err(e) => Ack::err(id, e.code(), e.to_string()),
            };
            // The router has already queued this event's fan-out, so the
            // ack lands behind it.
            if outbound.send(ServerEvent::Ack(ack)).is_err() {
                tracing::debug!(%conn_id, "writer gone, ack dropped");
                break;
            }
        }

        if let Err(ChatError::Unavailable) = result {
            tracing::warn!(%conn_id, "router unavailable, closing connection");
            // The router's copies of the queue died with it; once ours is
            // gone the writer flushes the ack and exits.
            drop(outbound);
            let _ = writer.await;
            if let Err(e) = conn.close().await {
                tracing::debug!(%conn_id, error = %e, "close failed");
            }
            return Err(ChatError::Unavailable.into());
        }
    }

    // _guard drops here → disconnect is reported.
    Ok(())
}

/// Forwards one client event to the router.
async fn dispatch(
    router: &RouterHandle,
    conn_id: ConnectionId,
    event: ClientEvent,
    outbound: &ClientSender,
) -> Result<(), ChatError> {
    let result = match event {
        ClientEvent::Join(request) => {
            router.join(conn_id, request, outbound.clone()).await
        }
        ClientEvent::SendMessage(text) => router.send_message(conn_id, text).await,
        ClientEvent::SendLocation(location) => {
            router.send_location(conn_id, location).await
        }
    };

    if let Err(e) = &result {
        tracing::debug!(%conn_id, code = e.code(), "event rejected");
    }
    result
}

/// Drains the outbound queue onto the socket.
///
/// Ends when every sender is gone (the handler has exited and the router
/// has forgotten the connection) or when the socket stops accepting
/// writes.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut queue: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();

    while let Some(event) = queue.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };

        let sent = if state.codec.is_text() {
            match String::from_utf8(bytes) {
                Ok(text) => conn.send_text(text).await,
                Err(e) => conn.send(&e.into_bytes()).await,
            }
        } else {
            conn.send(&bytes).await
        };

        if let Err(e) = sent {
            tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
            break;
        }
    }

    tracing::trace!(%conn_id, "writer finished");
}
