//! WebSocket front end.
//!
//! Each connection gets a reader task (this module's session loop) and a
//! writer task fed by a bounded queue. A broadcaster sends every joined
//! client the entities of the location its character stands in, and a
//! pinger keeps idle connections alive.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use loil_core::{CharacterId, LocationId, PlayerId};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::engine::{EngineClient, EngineError};
use crate::protocol::{
    CharacterUpdate, ClientMessage, ErrorCode, InteractionResult, InventoryItem, ServerMessage,
    now_ms, parse_client_message,
};

/// Network settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub addr: String,
    /// How often location updates are broadcast.
    pub update_interval: Duration,
    /// How often every client is pinged.
    pub ping_interval: Duration,
    /// A client that sends nothing for this long is disconnected.
    pub read_timeout: Duration,
    /// Largest accepted client message in bytes. Longer messages close the
    /// connection before they are buffered.
    pub max_message_size: usize,
    /// Outbound queue per client; messages beyond it are dropped.
    pub client_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".into(),
            update_interval: Duration::from_millis(100),
            ping_interval: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            max_message_size: 10 * 1024,
            client_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Set the listen address.
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Set how often location updates are broadcast.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set how long a silent connection is kept open.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the largest accepted message and frame, in bytes.
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    fn websocket(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_message_size))
            .max_frame_size(Some(self.max_message_size))
    }
}

/// What the broadcaster needs to know about a connection.
#[derive(Debug, Clone)]
struct ClientHandle {
    tx: mpsc::Sender<Message>,
    character: Option<CharacterId>,
}

type Clients = Arc<RwLock<HashMap<u64, ClientHandle>>>;

fn deliver(client: u64, tx: &mpsc::Sender<Message>, message: Message) {
    match tx.try_send(message) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(client, "outbound buffer full, message dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(client, "connection already closed");
        }
    }
}

/// A bound, not yet running server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    engine: EngineClient,
    clients: Clients,
}

impl Server {
    /// Bind the listener. Clients are accepted once [`Self::run`] is called.
    pub async fn bind(config: ServerConfig, engine: EngineClient) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.addr).await?;
        Ok(Self {
            listener,
            config,
            engine,
            clients: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// The address actually bound, useful with port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        tracing::info!(
            addr = %self.local_addr()?,
            update_ms = self.config.update_interval.as_millis() as u64,
            "server listening"
        );

        let broadcaster = tokio::spawn(broadcast_loop(
            self.engine.clone(),
            self.clients.clone(),
            self.config.update_interval,
        ));
        let pinger = tokio::spawn(ping_loop(self.clients.clone(), self.config.ping_interval));

        tokio::pin!(shutdown);
        let mut next_id = 0u64;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        next_id += 1;
                        tokio::spawn(handle_connection(
                            stream,
                            peer,
                            next_id,
                            self.engine.clone(),
                            self.clients.clone(),
                            self.config.clone(),
                        ));
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
        }

        broadcaster.abort();
        pinger.abort();
        self.clients.write().await.clear();
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: u64,
    engine: EngineClient,
    clients: Clients,
    config: ServerConfig,
) {
    let handshake = tokio_tungstenite::accept_async_with_config(stream, Some(config.websocket()));
    let ws = match handshake.await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    tracing::info!(client = id, %peer, "client connected");

    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::channel::<Message>(config.client_buffer.max(1));
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sink.send(message).await {
                tracing::debug!(client = id, error = %e, "write failed");
                break;
            }
        }
        if let Err(e) = sink.close().await {
            tracing::debug!(client = id, error = %e, "close failed");
        }
    });

    clients.write().await.insert(
        id,
        ClientHandle {
            tx: tx.clone(),
            character: None,
        },
    );

    let mut session = Session::new(id, tx);
    loop {
        let frame = match tokio::time::timeout(config.read_timeout, source.next()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(_) => {
                tracing::info!(client = id, "read timed out, closing");
                break;
            }
        };
        match frame {
            Ok(Message::Text(text)) => session.handle(text.as_str(), &engine, &clients).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(client = id, error = %e, "read failed, closing");
                break;
            }
        }
    }

    clients.write().await.remove(&id);
    drop(session);
    if let Err(e) = writer.await {
        tracing::debug!(client = id, error = %e, "writer task ended abnormally");
    }
    tracing::info!(client = id, %peer, "client disconnected");
}

/// Per-connection protocol state.
struct Session {
    id: u64,
    tx: mpsc::Sender<Message>,
    player: PlayerId,
    character: Option<CharacterId>,
    seq: i64,
}

impl Session {
    fn new(id: u64, tx: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            tx,
            player: PlayerId(0),
            character: None,
            seq: 0,
        }
    }

    fn send(&mut self, message: ServerMessage) {
        self.seq += 1;
        match message.to_json(self.seq) {
            Ok(json) => deliver(self.id, &self.tx, Message::text(json)),
            Err(e) => tracing::warn!(client = self.id, error = %e, "could not encode message"),
        }
    }

    fn send_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(client = self.id, %code, %message, "client error");
        self.send(ServerMessage::error(code, message));
    }

    fn engine_error(&mut self, error: EngineError, fallback: ErrorCode) {
        let code = match &error {
            EngineError::Busy => ErrorCode::ServerBusy,
            EngineError::ShuttingDown => ErrorCode::ShuttingDown,
            EngineError::Sim(loil_simulation::SimError::NoCharacter(_)) => ErrorCode::NoCharacter,
            EngineError::Sim(loil_simulation::SimError::LocationNotFound(_)) => {
                ErrorCode::LocationNotFound
            }
            _ => fallback,
        };
        self.send_error(code, error.to_string());
    }

    fn joined(&self) -> bool {
        !self.player.is_none()
    }

    async fn handle(&mut self, text: &str, engine: &EngineClient, clients: &Clients) {
        let message = match parse_client_message(text) {
            Ok(message) => message,
            Err(e) => return self.send_error(e.code, e.message),
        };

        match message {
            ClientMessage::Join {
                player,
                character,
                location,
            } => self.join(player, character, location, engine, clients).await,
            ClientMessage::Move {
                direction,
                vertical,
            } => {
                if !self.joined() {
                    return self.send_error(ErrorCode::NotJoined, "join the game first");
                }
                if let Err(e) = engine.set_heading(self.player, direction, vertical).await {
                    return self.engine_error(e, ErrorCode::MoveFailed);
                }
                self.send_character_update(engine);
            }
            ClientMessage::Stop => {
                if !self.joined() {
                    return;
                }
                if let Err(e) = engine.stop(self.player).await {
                    self.engine_error(e, ErrorCode::StopFailed);
                }
            }
            ClientMessage::Interact { object, index } => {
                if !self.joined() {
                    return self.send_error(ErrorCode::NotJoined, "join the game first");
                }
                match engine.interact(self.player, object, index).await {
                    Ok(outcome) => self.send(ServerMessage::InteractionResult(InteractionResult {
                        success: outcome.success,
                        object_id: outcome.object_id,
                        message: outcome.message,
                        items: outcome
                            .items
                            .into_iter()
                            .map(|i| InventoryItem {
                                item_id: i.item_id,
                                count: i.count,
                                name: i.name,
                            })
                            .collect(),
                        server_time: now_ms(),
                    })),
                    Err(e) => self.engine_error(e, ErrorCode::InteractFailed),
                }
            }
            ClientMessage::Pong => tracing::trace!(client = self.id, "pong"),
        }
    }

    async fn join(
        &mut self,
        player: PlayerId,
        character: Option<CharacterId>,
        location: LocationId,
        engine: &EngineClient,
        clients: &Clients,
    ) {
        let id = match engine.join(player, character, location).await {
            Ok(id) => id,
            Err(e) => return self.engine_error(e, ErrorCode::JoinFailed),
        };
        self.player = player;
        self.character = Some(id);

        let snapshot = engine.snapshot();
        let current = snapshot.character_location(id).unwrap_or(location);
        match snapshot.world_state(player, current) {
            Some(state) => {
                tracing::info!(client = self.id, player = %player, character = %id, location = %current, "client joined");
                self.send(ServerMessage::WorldState(state));
            }
            None => {
                return self.send_error(
                    ErrorCode::LocationNotFound,
                    format!("location {current} not found"),
                );
            }
        }

        // Broadcasts start only after the full state went out.
        if let Some(handle) = clients.write().await.get_mut(&self.id) {
            handle.character = Some(id);
        }
    }

    fn send_character_update(&mut self, engine: &EngineClient) {
        let Some(id) = self.character else {
            return;
        };
        let state = engine.snapshot().character(id).cloned();
        self.send(ServerMessage::CharacterUpdate(CharacterUpdate {
            character_id: id,
            state,
            server_time: now_ms(),
        }));
    }
}

/// Send each joined client the entities of its character's current location.
async fn broadcast_loop(engine: EngineClient, clients: Clients, period: Duration) {
    let mut timer = tokio::time::interval(period.max(Duration::from_millis(1)));
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        timer.tick().await;
        let snapshot = engine.snapshot();

        let mut by_location: BTreeMap<LocationId, Vec<(u64, mpsc::Sender<Message>)>> =
            BTreeMap::new();
        for (id, handle) in clients.read().await.iter() {
            let Some(location) = handle
                .character
                .and_then(|c| snapshot.character_location(c))
            else {
                continue;
            };
            by_location
                .entry(location)
                .or_default()
                .push((*id, handle.tx.clone()));
        }

        for (location, targets) in by_location {
            let Some(update) = snapshot.location_update(location) else {
                continue;
            };
            let json = match ServerMessage::LocationUpdate(update).to_json(0) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(location = %location, error = %e, "could not encode update");
                    continue;
                }
            };
            for (id, tx) in targets {
                deliver(id, &tx, Message::text(json.clone()));
            }
        }
    }
}

async fn ping_loop(clients: Clients, period: Duration) {
    let mut timer = tokio::time::interval(period.max(Duration::from_millis(1)));
    // The first tick fires immediately.
    timer.tick().await;
    loop {
        timer.tick().await;
        let json = match ServerMessage::Ping.to_json(0) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode ping");
                continue;
            }
        };
        for (id, handle) in clients.read().await.iter() {
            deliver(*id, &handle.tx, Message::text(json.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, EngineConfig};
    use crate::testing;

    fn session() -> (Session, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(16);
        (Session::new(1, tx), rx)
    }

    fn clients_with(session: &Session) -> Clients {
        let mut map = HashMap::new();
        map.insert(
            session.id,
            ClientHandle {
                tx: session.tx.clone(),
                character: None,
            },
        );
        Arc::new(RwLock::new(map))
    }

    fn next_json(rx: &mut mpsc::Receiver<Message>) -> serde_json::Value {
        match rx.try_recv().unwrap() {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn move_before_join_is_rejected() {
        let engine = Engine::spawn(testing::simulation(), EngineConfig::default()).unwrap();
        let (mut session, mut rx) = session();
        let clients = clients_with(&session);

        session
            .handle(
                r#"{"type":"move","payload":{"direction":1,"vertical":0}}"#,
                &engine.client(),
                &clients,
            )
            .await;
        let reply = next_json(&mut rx);
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["payload"]["code"], "not_joined");
        assert_eq!(reply["seq"], 1);

        engine.shutdown().unwrap();
    }

    #[tokio::test]
    async fn join_then_move_then_interact() {
        let engine = Engine::spawn(testing::simulation(), EngineConfig::default()).unwrap();
        let client = engine.client();
        let (mut session, mut rx) = session();
        let clients = clients_with(&session);

        session
            .handle(
                r#"{"type":"join","payload":{"player_id":7,"location_id":1}}"#,
                &client,
                &clients,
            )
            .await;
        let state = next_json(&mut rx);
        assert_eq!(state["type"], "world_state");
        assert_eq!(state["payload"]["player_id"], 7);
        assert_eq!(state["payload"]["location"]["width"], 8);
        assert_eq!(
            clients.read().await[&1].character,
            Some(CharacterId(2))
        );

        session
            .handle(
                r#"{"type":"move","payload":{"direction":-1,"vertical":1}}"#,
                &client,
                &clients,
            )
            .await;
        let update = next_json(&mut rx);
        assert_eq!(update["type"], "character_update");
        assert_eq!(update["payload"]["state"]["direction"], -1);
        assert_eq!(update["seq"], 2);

        session
            .handle(
                r#"{"type":"interact","payload":{"object_id":100,"interaction_idx":0}}"#,
                &client,
                &clients,
            )
            .await;
        let result = next_json(&mut rx);
        assert_eq!(result["type"], "interaction_result");
        assert_eq!(result["payload"]["success"], true);
        assert_eq!(result["payload"]["items"][0]["count"], 2);

        engine.shutdown().unwrap();
    }

    #[tokio::test]
    async fn bad_frames_get_error_codes() {
        let engine = Engine::spawn(testing::simulation(), EngineConfig::default()).unwrap();
        let client = engine.client();
        let (mut session, mut rx) = session();
        let clients = clients_with(&session);

        for (frame, code) in [
            ("{oops", "invalid_format"),
            (r#"{"type":"fly"}"#, "unknown_type"),
            (
                r#"{"type":"join","payload":{"player_id":1,"location_id":99}}"#,
                "location_not_found",
            ),
            (
                r#"{"type":"join","payload":{"player_id":1,"location_id":1}}"#,
                "no_character",
            ),
            (
                r#"{"type":"join","payload":{"player_id":1,"character_id":2,"location_id":1}}"#,
                "join_failed",
            ),
        ] {
            session.handle(frame, &client, &clients).await;
            assert_eq!(next_json(&mut rx)["payload"]["code"], code, "frame {frame}");
        }
        // Stop before joining is ignored silently.
        session.handle(r#"{"type":"stop"}"#, &client, &clients).await;
        assert!(rx.try_recv().is_err());

        engine.shutdown().unwrap();
    }

    #[tokio::test]
    async fn serves_websocket_clients() {
        use tokio_tungstenite::connect_async;

        let engine = Engine::spawn(testing::simulation(), EngineConfig::default()).unwrap();
        let config = ServerConfig::default()
            .with_addr("127.0.0.1:0")
            .with_update_interval(Duration::from_millis(20));
        let server = Server::bind(config, engine.client()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn(server.run(async {
            let _ = stop_rx.await;
        }));

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        ws.send(Message::text(
            r#"{"type":"join","payload":{"player_id":3,"character_id":1,"location_id":1}}"#
                .to_string(),
        ))
        .await
        .unwrap();

        let mut kinds = Vec::new();
        while kinds.len() < 2 {
            let Some(Ok(Message::Text(text))) = ws.next().await else {
                panic!("connection closed early");
            };
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            kinds.push(value["type"].as_str().unwrap().to_string());
        }
        assert_eq!(kinds[0], "world_state");
        assert_eq!(kinds[1], "location_update");

        ws.close(None).await.unwrap();
        stop_tx.send(()).unwrap();
        running.await.unwrap().unwrap();
        engine.shutdown().unwrap();
    }

    struct Running {
        addr: SocketAddr,
        shutdown: tokio::sync::oneshot::Sender<()>,
        task: tokio::task::JoinHandle<std::io::Result<()>>,
        engine: Engine,
    }

    impl Running {
        async fn start(config: ServerConfig) -> Self {
            let engine = Engine::spawn(testing::simulation(), EngineConfig::default()).unwrap();
            let server = Server::bind(config.with_addr("127.0.0.1:0"), engine.client())
                .await
                .unwrap();
            let addr = server.local_addr().unwrap();
            let (shutdown, stop_rx) = tokio::sync::oneshot::channel::<()>();
            let task = tokio::spawn(server.run(async {
                let _ = stop_rx.await;
            }));
            Self {
                addr,
                shutdown,
                task,
                engine,
            }
        }

        fn url(&self) -> String {
            format!("ws://{}/ws", self.addr)
        }

        async fn stop(self) {
            self.shutdown.send(()).unwrap();
            self.task.await.unwrap().unwrap();
            self.engine.shutdown().unwrap();
        }
    }

    /// Read until the server ends the connection; false if it stays open.
    async fn closed_by_server<S>(ws: &mut S) -> bool
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        let ended = async {
            loop {
                match ws.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(3), ended).await.is_ok()
    }

    #[tokio::test]
    async fn silent_clients_are_dropped_after_the_read_timeout() {
        let server =
            Running::start(ServerConfig::default().with_read_timeout(Duration::from_millis(150)))
                .await;

        let (mut ws, _) = tokio_tungstenite::connect_async(server.url()).await.unwrap();
        assert!(closed_by_server(&mut ws).await);

        server.stop().await;
    }

    #[tokio::test]
    async fn oversized_messages_close_the_connection() {
        let server = Running::start(ServerConfig::default().with_max_message_size(1024)).await;

        let (mut ws, _) = tokio_tungstenite::connect_async(server.url()).await.unwrap();
        ws.send(Message::binary(vec![0u8; 4096])).await.unwrap();
        assert!(closed_by_server(&mut ws).await);

        // A small message on a fresh connection is still answered.
        let (mut ws, _) = tokio_tungstenite::connect_async(server.url()).await.unwrap();
        ws.send(Message::text(r#"{"type":"fly"}"#.to_string()))
            .await
            .unwrap();
        let Some(Ok(Message::Text(text))) = ws.next().await else {
            panic!("no reply");
        };
        assert!(text.as_str().contains("unknown_type"));

        server.stop().await;
    }
}
