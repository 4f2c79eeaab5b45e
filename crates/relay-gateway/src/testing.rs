//! Test fixtures: a hub over in-memory collaborators and a channel transport

use async_trait::async_trait;
use crate::connection::{ConnectionRole, Frame, FrameSink, FrameStream, TransportError};
use crate::hub::{DeliveryServices, Hub};
use crate::protocol::GatewayMessage;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use relay_common::HubConfig;
use relay_core::{ChatMessage, ChatMessageStore, CollaboratorResult, Snowflake};
use relay_db::{InMemoryChatStore, InMemoryNotificationStore, InMemoryRoomDirectory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn room_role(room: i64) -> ConnectionRole {
    ConnectionRole::RoomScoped {
        room_id: Snowflake::new(room),
    }
}

pub(crate) struct TestHarness {
    pub hub: Hub,
    pub rooms: Arc<InMemoryRoomDirectory>,
    pub chats: Arc<InMemoryChatStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    pub fn with_config(config: HubConfig) -> Self {
        let chats = Arc::new(InMemoryChatStore::new());
        Self::build(config, chats.clone(), chats)
    }

    /// Chat writes park until [`GatedChatStore::release`]
    pub fn with_gated_chats(config: HubConfig) -> (Self, Arc<GatedChatStore>) {
        let chats = Arc::new(InMemoryChatStore::new());
        let gate = Arc::new(GatedChatStore::new(chats.clone()));
        (Self::build(config, gate.clone(), chats), gate)
    }

    fn build(
        config: HubConfig,
        chat_store: Arc<dyn ChatMessageStore>,
        chats: Arc<InMemoryChatStore>,
    ) -> Self {
        let rooms = Arc::new(InMemoryRoomDirectory::new());
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let services = DeliveryServices::new(rooms.clone(), chat_store, notifications.clone());

        Self {
            hub: Hub::spawn(config, services),
            rooms,
            chats,
            notifications,
        }
    }
}

/// Chat store that holds each write until the test lets it through
pub(crate) struct GatedChatStore {
    inner: Arc<InMemoryChatStore>,
    entered: Notify,
    release: Notify,
}

impl GatedChatStore {
    fn new(inner: Arc<InMemoryChatStore>) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Wait until a write is parked at the gate
    pub async fn wait_entered(&self) {
        tokio::time::timeout(FRAME_TIMEOUT, self.entered.notified())
            .await
            .expect("no write reached the store");
    }

    /// Let one parked write through
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl ChatMessageStore for GatedChatStore {
    async fn persist_chat_message(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        content: &str,
    ) -> CollaboratorResult<ChatMessage> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner
            .persist_chat_message(room_id, sender_id, content)
            .await
    }
}

/// The client end of a [`mock_transport`]
pub(crate) struct MockPeer {
    to_server: UnboundedSender<Result<Frame, TransportError>>,
    from_server: UnboundedReceiver<Frame>,
}

pub(crate) fn mock_transport() -> (impl FrameSink, impl FrameStream, MockPeer) {
    let (server_tx, from_server) = mpsc::unbounded::<Frame>();
    let (to_server, server_rx) = mpsc::unbounded::<Result<Frame, TransportError>>();
    let sink = server_tx.sink_map_err(|_| TransportError::Closed);
    (
        sink,
        server_rx,
        MockPeer {
            to_server,
            from_server,
        },
    )
}

impl MockPeer {
    pub fn send_frame(&self, frame: Frame) {
        self.to_server.unbounded_send(Ok(frame)).unwrap();
    }

    pub fn send_text(&self, text: &str) {
        self.send_frame(Frame::Text(text.to_string()));
    }

    /// Make the server's next read fail
    pub fn fail(&self, error: &str) {
        self.to_server
            .unbounded_send(Err(TransportError::Io(error.to_string())))
            .unwrap();
    }

    /// End the inbound stream while still reading what the server sends
    pub fn hang_up(&self) {
        self.to_server.close_channel();
    }

    pub async fn next_frame(&mut self) -> Option<Frame> {
        tokio::time::timeout(FRAME_TIMEOUT, self.from_server.next())
            .await
            .ok()
            .flatten()
    }

    /// Next text frame, skipping pings
    pub async fn next_message(&mut self) -> GatewayMessage {
        loop {
            match self.next_frame().await {
                Some(Frame::Text(text)) => return GatewayMessage::from_json(&text).unwrap(),
                Some(Frame::Ping(_)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    /// Close code of the next close frame, skipping everything before it
    pub async fn next_close(&mut self) -> Option<u16> {
        loop {
            match self.next_frame().await {
                Some(Frame::Close(frame)) => return frame.map(|(code, _)| code),
                Some(_) => continue,
                None => return None,
            }
        }
    }
}
