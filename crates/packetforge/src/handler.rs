//! Per-connection handler: receive, dispatch, reply.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! Every frame the transport yields is decoded and routed; replies queued
//! by the handler go back on the same connection in order.

use std::sync::Arc;

use packetforge_transport::{Connection, TransportError};

use crate::router::{Dispatch, Outbox};
use crate::server::ServerState;
use crate::PacketforgeError;

/// Handles a single connection from accept to close.
///
/// Malformed packets and unknown headers are dropped and the loop goes on.
/// A framing violation (oversized frame, truncated stream) closes the
/// connection, as does the idle timeout.
pub(crate) async fn handle_connection<C>(
    conn: C,
    state: Arc<ServerState>,
) -> Result<(), PacketforgeError>
where
    C: Connection<Error = TransportError>,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    loop {
        let message = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(message))) => message,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) if e.is_framing_violation() => {
                tracing::warn!(%conn_id, error = %e, "framing violation, closing connection");
                close(&conn).await;
                return Err(e.into());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                close(&conn).await;
                break;
            }
        };

        let text = message.text();
        let mut outbox = Outbox::new(conn_id, state.router.codec());
        let outcome = state.router.dispatch(&text, &mut outbox);
        if outcome != Dispatch::Handled {
            continue;
        }

        for reply in outbox.into_messages() {
            tracing::trace!(%conn_id, packet = %reply, "sending reply");
            conn.send(reply.as_bytes()).await?;
        }
    }

    Ok(())
}

async fn close<C: Connection>(conn: &C) {
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
    }
}
