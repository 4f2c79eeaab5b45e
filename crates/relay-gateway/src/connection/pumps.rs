//! Reader and writer pumps
//!
//! Each admitted connection runs three tasks:
//! - reader: transport -> hub (inbound messages, pongs)
//! - writer: outbound queue -> transport, plus pings and the pong deadline
//! - supervisor: waits for the first pump to stop, tears the connection
//!   down through the hub, stops the other pump, marks the connection closed

use super::{
    CloseReason, Connection, Frame, FrameSink, FrameStream, OutboundReceiver, SendError,
};
use crate::hub::Hub;
use crate::protocol::{GatewayMessage, MessageRejectedPayload, OpCode};
use futures::future::{self, Either};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Time allowed for flushing and sending the close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Run both pumps for an admitted connection until it closes
pub(crate) async fn supervise<S, R>(
    hub: Hub,
    connection: Arc<Connection>,
    outbound: OutboundReceiver,
    sink: S,
    stream: R,
    heartbeat_interval: Duration,
) -> CloseReason
where
    S: FrameSink,
    R: FrameStream,
{
    let reader = tokio::spawn(read_pump(hub.clone(), Arc::clone(&connection), stream));
    let writer = tokio::spawn(write_pump(
        Arc::clone(&connection),
        outbound,
        sink,
        heartbeat_interval,
    ));

    let (first, remaining) = match future::select(reader, writer).await {
        Either::Left((result, writer)) => (pump_outcome(result, "reader"), writer),
        Either::Right((result, reader)) => (pump_outcome(result, "writer"), reader),
    };

    match hub.dismiss_connection(connection.id(), first).await {
        Ok(removed) => {
            trace!(connection_id = %connection.id(), removed, "Teardown requested");
        }
        Err(e) => {
            // Hub is gone; nothing is left to unregister from
            warn!(connection_id = %connection.id(), error = %e, "Hub unavailable during teardown");
            connection.begin_close(first);
        }
    }

    if let Err(e) = remaining.await {
        error!(connection_id = %connection.id(), error = %e, "Pump task failed");
    }
    connection.mark_closed();

    let reason = connection.close_reason().unwrap_or(first);
    info!(
        connection_id = %connection.id(),
        user_id = %connection.user_id(),
        reason = %reason,
        connected_ms = connection.connected_for().as_millis() as u64,
        idle_ms = connection.idle_for().as_millis() as u64,
        dispatched = connection.current_sequence(),
        "Connection closed"
    );
    reason
}

fn pump_outcome(result: Result<CloseReason, JoinError>, pump: &'static str) -> CloseReason {
    result.unwrap_or_else(|e| {
        error!(pump, error = %e, "Pump task failed");
        CloseReason::TransportError
    })
}

/// Reason a pump reports when it was stopped by the teardown
fn teardown_reason(connection: &Connection) -> CloseReason {
    connection.close_reason().unwrap_or(CloseReason::Dismissed)
}

// === Writer ===

async fn write_pump<S: FrameSink>(
    connection: Arc<Connection>,
    mut outbound: OutboundReceiver,
    mut sink: S,
    heartbeat_interval: Duration,
) -> CloseReason {
    let shutdown = connection.shutdown_token().clone();
    let mut heartbeat = time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        let pong_deadline = connection.liveness_deadline();

        tokio::select! {
            biased;

            () = shutdown.cancelled() => break teardown_reason(&connection),

            () = sleep_until(pong_deadline) => {
                // A pong may have landed after the deadline was read
                if !connection.liveness_expired() {
                    continue;
                }
                warn!(
                    connection_id = %connection.id(),
                    user_id = %connection.user_id(),
                    idle_ms = connection.idle_for().as_millis() as u64,
                    "No pong within timeout"
                );
                break CloseReason::HeartbeatTimeout;
            }

            message = outbound.recv() => {
                let Some(message) = message else {
                    break teardown_reason(&connection);
                };
                let Some(frame) = encode(&connection, &message) else {
                    continue;
                };
                if let Err(reason) = write_frame(&connection, &shutdown, &mut sink, frame).await {
                    break reason;
                }
            }

            _ = heartbeat.tick() => {
                if connection.should_ping() {
                    if let Err(reason) =
                        write_frame(&connection, &shutdown, &mut sink, Frame::Ping(Vec::new())).await
                    {
                        break reason;
                    }
                    connection.record_ping_sent();
                    trace!(connection_id = %connection.id(), "Ping sent");
                }
            }
        }
    };

    finish(&mut sink, &mut outbound, &connection, reason).await;
    reason
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

fn encode(connection: &Connection, message: &GatewayMessage) -> Option<Frame> {
    match message.to_json() {
        Ok(json) => Some(Frame::Text(json)),
        Err(e) => {
            error!(connection_id = %connection.id(), error = %e, "Failed to encode message");
            None
        }
    }
}

/// Write one frame, giving up if the connection starts closing while the
/// transport is blocked
async fn write_frame<S: FrameSink>(
    connection: &Connection,
    shutdown: &CancellationToken,
    sink: &mut S,
    frame: Frame,
) -> Result<(), CloseReason> {
    tokio::select! {
        biased;
        result = sink.send(frame) => result.map_err(|e| {
            debug!(connection_id = %connection.id(), error = %e, "Write failed");
            CloseReason::TransportError
        }),
        () = shutdown.cancelled() => Err(teardown_reason(connection)),
    }
}

/// Flush what is already queued (when the reason allows it), then close
async fn finish<S: FrameSink>(
    sink: &mut S,
    outbound: &mut OutboundReceiver,
    connection: &Connection,
    reason: CloseReason,
) {
    if reason == CloseReason::TransportError {
        return;
    }

    let close = Frame::Close(reason.close_code().map(GatewayMessage::close_frame));
    let flushed = time::timeout(CLOSE_GRACE, async {
        if reason.flushes_queue() {
            while let Ok(message) = outbound.try_recv() {
                if let Some(frame) = encode(connection, &message) {
                    sink.send(frame).await?;
                }
            }
        }
        sink.send(close).await?;
        sink.close().await
    })
    .await;

    if !matches!(flushed, Ok(Ok(()))) {
        debug!(connection_id = %connection.id(), "Close frame not delivered");
    }
}

// === Reader ===

async fn read_pump<R: FrameStream>(
    hub: Hub,
    connection: Arc<Connection>,
    mut stream: R,
) -> CloseReason {
    let shutdown = connection.shutdown_token().clone();

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => return teardown_reason(&connection),
            next = stream.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                debug!(connection_id = %connection.id(), error = %e, "Read failed");
                return CloseReason::TransportError;
            }
            None => return CloseReason::PeerClosed,
        };
        connection.touch();

        match frame {
            Frame::Text(text) => {
                // A dismissal ends the reader even mid-message
                let handled = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => return teardown_reason(&connection),
                    handled = handle_text(&hub, &connection, &text) => handled,
                };
                if let Err(reason) = handled {
                    return reason;
                }
            }
            Frame::Pong(_) => {
                connection.record_pong();
                trace!(connection_id = %connection.id(), "Pong received");
            }
            Frame::Ping(_) => {
                // Answered by the transport
                trace!(connection_id = %connection.id(), "Ping received");
            }
            Frame::Binary(_) => {
                debug!(connection_id = %connection.id(), "Binary frames are not supported");
                return CloseReason::DecodeError;
            }
            Frame::Close(frame) => {
                debug!(connection_id = %connection.id(), close = ?frame, "Peer closed");
                return CloseReason::PeerClosed;
            }
        }
    }
}

/// Handle one text frame; `Err` ends the connection with that reason
async fn handle_text(
    hub: &Hub,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseReason> {
    let message = GatewayMessage::from_json(text).map_err(|e| {
        debug!(connection_id = %connection.id(), error = %e, "Failed to parse message");
        CloseReason::DecodeError
    })?;

    trace!(connection_id = %connection.id(), op = %message.op, "Received message");

    match message.op {
        OpCode::Heartbeat => {
            connection.record_pong();
            enqueue(connection, GatewayMessage::heartbeat_ack())
        }
        OpCode::SendMessage => {
            let payload = message.as_send_message().ok_or_else(|| {
                debug!(connection_id = %connection.id(), "Malformed SendMessage payload");
                CloseReason::DecodeError
            })?;

            // Awaited before the next frame is read, which keeps one
            // sender's messages in order.
            match hub
                .handle_inbound_message(connection.id(), &payload.content)
                .await
            {
                Ok(_) => Ok(()),
                Err(e) => {
                    debug!(
                        connection_id = %connection.id(),
                        code = e.code(),
                        error = %e,
                        "Message rejected"
                    );
                    let rejection = MessageRejectedPayload::new(payload.nonce, e.code(), e.to_string());
                    enqueue(connection, GatewayMessage::message_rejected(&rejection))?;
                    e.close_reason().map_or(Ok(()), Err)
                }
            }
        }
        op => {
            debug!(connection_id = %connection.id(), op = %op, "Server-only op code from client");
            Err(CloseReason::UnknownOpcode)
        }
    }
}

/// Queue a reply on the connection itself
fn enqueue(connection: &Connection, message: GatewayMessage) -> Result<(), CloseReason> {
    connection.send(message).map_err(|e| match e {
        SendError::Overflow => CloseReason::SlowConsumer,
        SendError::Closed => teardown_reason(connection),
    })
}
