//! WebSocket handlers
//!
//! Credentials and room membership are checked before the upgrade, so a
//! refused client gets a plain HTTP error instead of a socket.

use crate::connection::{ConnectionRole, Frame, FrameSink, FrameStream, TransportError};
use crate::hub::HubStats;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future;
use futures_util::{SinkExt, StreamExt};
use relay_common::{AppError, ErrorResponse};
use relay_core::Snowflake;
use serde::Deserialize;
use std::borrow::Cow;
use tracing::{debug, error, info, warn};

/// Query parameters accepted on the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// [`AppError`] rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = ?self.0, "Upgrade failed");
        } else {
            debug!(error = %self.0, status = status.as_u16(), "Upgrade refused");
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// `GET /ws/rooms/:room_id` - room-scoped chat connection
pub async fn room_handler(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let room_id: Snowflake = room_id
        .parse()
        .map_err(|_| AppError::invalid_input(format!("invalid room id: {room_id}")))?;
    let user_id = authenticate(&state, &params, &headers).await?;

    state
        .hub()
        .services()
        .room_authorizer()
        .authorize_room_membership(user_id, room_id)
        .await
        .map_err(AppError::from)?;

    let role = ConnectionRole::RoomScoped { room_id };
    Ok(ws.on_upgrade(move |socket| serve_socket(state, user_id, role, socket)))
}

/// `GET /ws/notifications` - user-scoped notification connection
pub async fn notification_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &params, &headers).await?;

    Ok(ws.on_upgrade(move |socket| {
        serve_socket(state, user_id, ConnectionRole::UserScoped, socket)
    }))
}

/// `GET /health` - registry counters
pub async fn health_handler(State(state): State<GatewayState>) -> Result<Json<HubStats>, ApiError> {
    let stats = state
        .hub()
        .stats()
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?;
    Ok(Json(stats))
}

async fn authenticate(
    state: &GatewayState,
    params: &ConnectParams,
    headers: &HeaderMap,
) -> Result<Snowflake, AppError> {
    let token = credential(params, headers).ok_or(AppError::MissingAuth)?;
    state
        .credentials()
        .validate_credential(token)
        .await
        .map_err(|e| {
            debug!(error = %e, "Credential rejected");
            AppError::from(e)
        })
}

/// The query token wins over the `Authorization` header
fn credential<'a>(params: &'a ConnectParams, headers: &'a HeaderMap) -> Option<&'a str> {
    if let Some(token) = params.token.as_deref().filter(|t| !t.is_empty()) {
        return Some(token);
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn serve_socket(state: GatewayState, user_id: Snowflake, role: ConnectionRole, socket: WebSocket) {
    let (sink, stream) = into_transport(socket);

    match state.hub().serve_connection(user_id, role, sink, stream).await {
        Ok(served) => {
            let connection_id = served.id();
            info!(
                connection_id = %connection_id,
                user_id = %user_id,
                role = role.name(),
                "WebSocket connection established"
            );
            let reason = served.closed().await;
            info!(connection_id = %connection_id, reason = %reason, "WebSocket connection closed");
        }
        Err(e) => {
            warn!(user_id = %user_id, role = role.name(), error = %e, "WebSocket connection refused");
        }
    }
}

/// Adapt an axum socket to the frame transport the pumps speak
fn into_transport(socket: WebSocket) -> (impl FrameSink, impl FrameStream) {
    let (ws_sink, ws_stream) = socket.split();

    let sink = ws_sink
        .sink_map_err(|e| TransportError::Io(e.to_string()))
        .with(|frame: Frame| future::ready(Ok::<_, TransportError>(into_message(frame))));
    let stream = ws_stream.map(from_message);

    (sink, stream)
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close(close) => Message::Close(close.map(|(code, reason)| CloseFrame {
            code,
            reason: Cow::Owned(reason),
        })),
    }
}

fn from_message(message: Result<Message, axum::Error>) -> Result<Frame, TransportError> {
    match message {
        Ok(Message::Text(text)) => Ok(Frame::Text(text)),
        Ok(Message::Binary(data)) => Ok(Frame::Binary(data)),
        Ok(Message::Ping(data)) => Ok(Frame::Ping(data)),
        Ok(Message::Pong(data)) => Ok(Frame::Pong(data)),
        Ok(Message::Close(close)) => Ok(Frame::Close(
            close.map(|frame| (frame.code, frame.reason.into_owned())),
        )),
        Err(e) => Err(TransportError::Io(e.to_string())),
    }
}
