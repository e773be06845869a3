//! Heartbeat monitor
//!
//! A keep-alive loop spawned once per successful handshake, parameterized by
//! the interval the server announced in Hello. Each cycle sends
//! `{op: 1, d: <last sequence>}` and requires a heartbeat-ack before the next
//! cycle; a missing ack means the connection is stale and is escalated to the
//! read loop, which tears the session down.

use crate::protocol::Envelope;
use crate::session::SessionState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Spawn the heartbeat loop on the current runtime
///
/// `outbound` feeds the session's single writer task; `stale` is signalled
/// when an ack never arrived, then the loop stops. The returned handle is
/// aborted when the session closes.
pub(crate) fn spawn(
    state: Arc<SessionState>,
    outbound: mpsc::UnboundedSender<Envelope>,
    interval_ms: u64,
    stale: Arc<Notify>,
) -> JoinHandle<()> {
    let period = Duration::from_millis(interval_ms);

    tokio::spawn(async move {
        tracing::debug!(interval_ms, "Heartbeat monitor started");

        loop {
            if !state.ack() {
                tracing::error!("No heartbeat ack since last beat, connection is stale");
                stale.notify_one();
                return;
            }

            let beat = Envelope::heartbeat(state.sequence());
            if outbound.send(beat).is_err() {
                // Writer gone means the session is already shutting down
                return;
            }
            state.set_ack(false);

            tokio::time::sleep(period).await;
        }
    })
}
