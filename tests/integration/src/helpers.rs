//! Test helpers for integration tests
//!
//! A [`TestServer`] runs the real router on `127.0.0.1:0`. [`TestClient`]
//! reads in the background and answers pings like a healthy browser;
//! [`RawClient`] only reads when asked, so it can be made to go silent.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use relay_common::{AppConfig, Claims, HubConfig, TokenType};
use relay_db::{InMemoryChatStore, InMemoryNotificationStore, InMemoryRoomDirectory};
use relay_gateway::protocol::GatewayMessage;
use relay_gateway::{gateway_state_with_services, run_server, DeliveryServices, GatewayState};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const JWT_SECRET: &str = "integration-test-secret-key-long-enough";

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sign an access token for `user_id` with the test secret
pub fn token_for(user_id: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 3600,
        token_type: TokenType::Access,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Configuration for a server on an ephemeral port
pub fn test_config(hub: HubConfig) -> Result<AppConfig> {
    let mut config = AppConfig::from_source(|key| match key {
        "GATEWAY_HOST" => Some("127.0.0.1".to_string()),
        "GATEWAY_PORT" => Some("0".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        _ => None,
    })
    .map_err(|e| anyhow!("Config error: {e}"))?;
    config.hub = hub;
    Ok(config)
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub state: GatewayState,
    pub rooms: Arc<InMemoryRoomDirectory>,
    pub chats: Arc<InMemoryChatStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with_hub(HubConfig::default()).await
    }

    pub async fn start_with_hub(hub: HubConfig) -> Result<Self> {
        let config = test_config(hub)?;

        let rooms = Arc::new(InMemoryRoomDirectory::new());
        let chats = Arc::new(InMemoryChatStore::new());
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let services = DeliveryServices::new(rooms.clone(), chats.clone(), notifications.clone());
        let state = gateway_state_with_services(config, services);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let server_state = state.clone();
        let handle = tokio::spawn(async move {
            run_server(listener, server_state).await.ok();
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            client,
            state,
            rooms,
            chats,
            notifications,
            _handle: handle,
        })
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn room_url(&self, room_id: i64, user_id: i64) -> String {
        self.ws_url(&format!("/ws/rooms/{room_id}?token={}", token_for(user_id)))
    }

    /// Open a notification connection, sending the token as a bearer header
    pub async fn connect_notifications(&self, user_id: i64) -> Result<TestClient> {
        let mut request = self.ws_url("/ws/notifications").into_client_request()?;
        request.headers_mut().insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token_for(user_id)))?,
        );
        let (ws, _) = connect_async(request).await?;
        Ok(TestClient::spawn(ws))
    }

    pub async fn connect_room(&self, room_id: i64, user_id: i64) -> Result<TestClient> {
        let (ws, _) = connect_async(self.room_url(room_id, user_id)).await?;
        Ok(TestClient::spawn(ws))
    }

    pub async fn connect_room_raw(&self, room_id: i64, user_id: i64) -> Result<RawClient> {
        let (ws, _) = connect_async(self.room_url(room_id, user_id)).await?;
        Ok(RawClient { ws })
    }

    /// HTTP status of a refused upgrade
    pub async fn refused_status(&self, url: &str) -> Result<u16> {
        match connect_async(url).await {
            Ok(_) => bail!("Upgrade to {url} was accepted"),
            Err(WsError::Http(response)) => Ok(response.status().as_u16()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn health(&self) -> Result<Value> {
        let url = format!("http://{}/health", self.addr);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Health check returned {}", response.status());
        }
        Ok(response.json().await?)
    }

    /// Poll `/health` until the hub holds `expected` connections
    pub async fn wait_for_connections(&self, expected: u64, within: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            let stats = self.health().await?;
            if stats["connections"].as_u64() == Some(expected) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("Expected {expected} connections, health reports {stats}");
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

/// A client whose socket is read continuously in the background
pub struct TestClient {
    outgoing: mpsc::UnboundedSender<Message>,
    incoming: mpsc::UnboundedReceiver<Message>,
    _task: JoinHandle<()>,
}

impl TestClient {
    fn spawn(ws: WsStream) -> Self {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(ws, outgoing_rx, incoming_tx));
        Self {
            outgoing,
            incoming,
            _task: task,
        }
    }

    pub fn send_json(&self, value: &Value) -> Result<()> {
        self.outgoing
            .send(Message::Text(value.to_string()))
            .map_err(|_| anyhow!("Client connection closed"))
    }

    /// Next gateway message; fails on close
    pub async fn next_message(&mut self) -> Result<GatewayMessage> {
        loop {
            match self.next_frame().await? {
                Message::Text(text) => return Ok(GatewayMessage::from_json(&text)?),
                Message::Close(frame) => bail!("Connection closed: {frame:?}"),
                _ => continue,
            }
        }
    }

    /// Close code of the next close frame
    pub async fn next_close(&mut self) -> Result<Option<u16>> {
        loop {
            if let Message::Close(frame) = self.next_frame().await? {
                return Ok(frame.map(|f| u16::from(f.code)));
            }
        }
    }

    async fn next_frame(&mut self) -> Result<Message> {
        timeout(FRAME_TIMEOUT, self.incoming.recv())
            .await?
            .ok_or_else(|| anyhow!("Connection ended without a close frame"))
    }
}

async fn pump(
    mut ws: WsStream,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    incoming: mpsc::UnboundedSender<Message>,
) {
    loop {
        tokio::select! {
            message = outgoing.recv() => {
                let Some(message) = message else {
                    let _ = ws.close(None).await;
                    return;
                };
                if ws.send(message).await.is_err() {
                    return;
                }
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Ping(data))) => {
                    if ws.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(message)) => {
                    if incoming.send(message).is_err() {
                        return;
                    }
                }
                _ => return,
            }
        }
    }
}

/// A client that only touches its socket when a test calls it
pub struct RawClient {
    ws: WsStream,
}

impl RawClient {
    /// Next gateway message, skipping pings
    pub async fn next_message(&mut self) -> Result<GatewayMessage> {
        loop {
            match self.next_frame().await? {
                Message::Text(text) => return Ok(GatewayMessage::from_json(&text)?),
                Message::Close(frame) => bail!("Connection closed: {frame:?}"),
                _ => continue,
            }
        }
    }

    /// Close code of the next close frame
    pub async fn next_close(&mut self) -> Result<Option<u16>> {
        loop {
            if let Message::Close(frame) = self.next_frame().await? {
                return Ok(frame.map(|f| u16::from(f.code)));
            }
        }
    }

    async fn next_frame(&mut self) -> Result<Message> {
        timeout(FRAME_TIMEOUT, self.ws.next())
            .await?
            .ok_or_else(|| anyhow!("Connection ended without a close frame"))?
            .map_err(Into::into)
    }
}
