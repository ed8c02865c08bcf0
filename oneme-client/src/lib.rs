//! # oneme-client
//!
//! Async client engine for the Max messenger.
//!
//! One persistent WebSocket carries a multiplexed request/response protocol
//! interleaved with server pushes.  The engine provides:
//! - `call` — correlated request/response over the shared connection
//! - typed push dispatch: new / edited / deleted messages, chat updates,
//!   reaction changes, connection-ready
//! - the connect → handshake → auth → sync → ready lifecycle, with a
//!   fixed-delay reconnection loop that survives transport loss
//! - the auth sub-flow (code request → verification → token issuance)
//! - HTTP media uploads bridged back to protocol-level confirmations
//! - pluggable session persistence and upload retry policies

#![deny(unsafe_code)]

mod errors;
mod pending;
mod retry;
mod transport;
mod uploads;
pub mod media;
pub mod methods;
pub mod session_store;
pub mod update;

pub use errors::{ApiError, Error};
pub use media::UploadedAttach;
pub use methods::{AuthOutcome, GroupSettings, OutgoingMessage};
pub use retry::{ExponentialBackoff, NoRetries, RetryContext, UploadRetryPolicy};
pub use session_store::{JsonFileStore, MemoryStore, SessionStore};
pub use transport::{Connector, FrameSink, FrameSource, WsConnector};
pub use update::{Filter, ReactionUpdate};

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use oneme_proto::types::{Chat, Me, Message, MessageStatus, ReactionInfo};
use oneme_proto::{opcode, Frame};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use update::HandlerRegistry;

// ─── Protocol constants ───────────────────────────────────────────────────────

/// Production WebSocket endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://ws-api.oneme.ru/websocket";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";
const DEFAULT_APP_VERSION: &str = "25.10.13";
const DEFAULT_DEVICE_TYPE: &str = "WEB";

/// How many chats the sync request asks the server to return.
const SYNC_CHATS_COUNT: u32 = 40;

/// Capacity of the bounded outbound frame queue.
const OUTBOUND_QUEUE_CAPACITY: usize = 128;

// ─── ConnectionState ──────────────────────────────────────────────────────────

/// Where the connection lifecycle currently stands.
///
/// Within one attempt the state only moves forward; on failure it resets to
/// `Disconnected` or `Reconnecting`.  `Ready` is the only state in which
/// ordinary calls are expected to succeed promptly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Authenticating,
    Syncing,
    Ready,
    Reconnecting,
}

// ─── CodeProvider ─────────────────────────────────────────────────────────────

/// Supplies the verification code sent to the user's phone during auth.
///
/// The engine blocks on this for as long as it takes; there is no internal
/// timeout beyond the caller's own deadline.
pub trait CodeProvider: Send + Sync {
    fn verification_code(&self) -> BoxFuture<'_, Result<String, Error>>;
}

/// Profile submitted when the phone number has no account yet.
#[derive(Clone, Debug)]
pub struct ProfileName {
    pub first_name: String,
    pub last_name:  Option<String>,
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for [`Client::new`].
#[derive(Clone)]
pub struct Config {
    pub endpoint:        String,
    pub user_agent:      String,
    pub app_version:     String,
    pub device_type:     String,
    /// Language sent with the auth code request.
    pub language:        String,
    /// Phone number used when no token is stored; validated before dialing.
    pub phone:           Option<String>,
    pub code_provider:   Option<Arc<dyn CodeProvider>>,
    /// Name submitted if the phone turns out to be unregistered.
    pub profile_name:    Option<ProfileName>,
    /// Default deadline for `call`.
    pub request_timeout: Duration,
    pub reconnect:       bool,
    /// Fixed delay between reconnection attempts (not exponential — the push
    /// channel is expected to recover fast).
    pub reconnect_delay: Duration,
    pub session_store:   Arc<dyn SessionStore>,
    pub upload_retry:    Arc<dyn UploadRetryPolicy>,
    pub connector:       Arc<dyn Connector>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint:        DEFAULT_ENDPOINT.to_string(),
            user_agent:      DEFAULT_USER_AGENT.to_string(),
            app_version:     DEFAULT_APP_VERSION.to_string(),
            device_type:     DEFAULT_DEVICE_TYPE.to_string(),
            language:        "ru".to_string(),
            phone:           None,
            code_provider:   None,
            profile_name:    None,
            request_timeout: Duration::from_secs(10),
            reconnect:       true,
            reconnect_delay: Duration::from_secs(5),
            session_store:   Arc::new(JsonFileStore::new("oneme.session")),
            upload_retry:    Arc::new(ExponentialBackoff::default()),
            connector:       Arc::new(WsConnector::new(DEFAULT_USER_AGENT)),
        }
    }
}

// ─── ClientInner ──────────────────────────────────────────────────────────────

struct ClientInner {
    endpoint:        String,
    app_version:     String,
    device_type:     String,
    language:        String,
    phone:           Option<String>,
    code_provider:   Option<Arc<dyn CodeProvider>>,
    profile_name:    Option<ProfileName>,
    request_timeout: Duration,
    reconnect:       bool,
    reconnect_delay: Duration,

    session_store: Arc<dyn SessionStore>,
    upload_retry:  Arc<dyn UploadRetryPolicy>,
    connector:     Arc<dyn Connector>,
    http:          reqwest::Client,

    pending:  pending::PendingRequests,
    uploads:  uploads::UploadWaiters,
    handlers: HandlerRegistry,

    // Independent locks: registries, caches and the connection handle never
    // block each other.
    chats: std::sync::Mutex<HashMap<i64, Chat>>,
    me:    std::sync::Mutex<Option<Me>>,

    sink:       tokio::sync::Mutex<Option<Box<dyn FrameSink>>>,
    sink_ready: Notify,
    conn_gen:   AtomicU64,

    state_tx:    watch::Sender<ConnectionState>,
    outbound_tx: mpsc::Sender<Frame>,
    outbound_rx: std::sync::Mutex<Option<mpsc::Receiver<Frame>>>,
    loss_tx:     mpsc::UnboundedSender<u64>,
    loss_rx:     std::sync::Mutex<Option<mpsc::UnboundedReceiver<u64>>>,
    cancel:      CancellationToken,
}

/// The Max client engine.  Cheap to clone — internally Arc-wrapped.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    // ── Construction ───────────────────────────────────────────────────────

    pub fn new(config: Config) -> Result<Self, Error> {
        let (state_tx, _)  = watch::channel(ConnectionState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (loss_tx, loss_rx) = mpsc::unbounded_channel();

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint:        config.endpoint,
                app_version:     config.app_version,
                device_type:     config.device_type,
                language:        config.language,
                phone:           config.phone,
                code_provider:   config.code_provider,
                profile_name:    config.profile_name,
                request_timeout: config.request_timeout,
                reconnect:       config.reconnect,
                reconnect_delay: config.reconnect_delay,
                session_store:   config.session_store,
                upload_retry:    config.upload_retry,
                connector:       config.connector,
                http,
                pending:  pending::PendingRequests::new(),
                uploads:  uploads::UploadWaiters::new(),
                handlers: HandlerRegistry::default(),
                chats: std::sync::Mutex::new(HashMap::new()),
                me:    std::sync::Mutex::new(None),
                sink:       tokio::sync::Mutex::new(None),
                sink_ready: Notify::new(),
                conn_gen:   AtomicU64::new(0),
                state_tx,
                outbound_tx,
                outbound_rx: std::sync::Mutex::new(Some(outbound_rx)),
                loss_tx,
                loss_rx: std::sync::Mutex::new(Some(loss_rx)),
                cancel: CancellationToken::new(),
            }),
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────────────

    /// Connect, handshake, authenticate (when no token is stored), sync, and
    /// reach [`ConnectionState::Ready`].
    ///
    /// Fails only for handshake, initial-auth, or initial-sync failure; once
    /// ready, transport loss is handled by the internal reconnection loop.
    pub async fn start(&self) -> Result<(), Error> {
        let outbound_rx = self.inner.outbound_rx.lock().unwrap().take();
        let Some(outbound_rx) = outbound_rx else {
            return Err(Error::InvalidInput("client already started".into()));
        };
        let loss_rx = self
            .inner
            .loss_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::InvalidInput("client already started".into()))?;

        log::info!(
            "[oneme] Starting (session store: {}) …",
            self.inner.session_store.name()
        );
        tokio::spawn(run_writer(self.inner.clone(), outbound_rx));
        tokio::spawn(run_supervisor(self.clone(), loss_rx));

        match self.establish().await {
            Ok(()) => {
                self.set_state(ConnectionState::Ready);
                self.fire_ready();
                log::info!("[oneme] Client ready ✓");
                Ok(())
            }
            Err(e) => {
                // Full teardown: the writer, supervisor, and this attempt's
                // reader must not outlive a failed start, or a late transport
                // close would wake the reconnect loop for a client the caller
                // was told never came up.
                self.close().await;
                Err(e)
            }
        }
    }

    /// Cancel all background work, close the transport, and fail every
    /// outstanding call and upload waiter.  Idempotent.
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        if let Some(mut sink) = self.inner.sink.lock().await.take() {
            let _ = sink.close().await;
        }
        self.inner.pending.fail_all();
        self.inner.uploads.fail_all();
        self.set_state(ConnectionState::Disconnected);
        log::info!("[oneme] Closed");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.subscribe().borrow()
    }

    /// A watch receiver observing every lifecycle transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.inner.state_tx.send_replace(state);
        if previous != state {
            log::debug!("[oneme] {previous:?} → {state:?}");
        }
    }

    // ── Calls ──────────────────────────────────────────────────────────────

    /// Issue a request and wait for its correlated response.
    ///
    /// Waits for the connection to be ready first (bounded by the default
    /// request timeout), so a call issued mid-reconnect blocks until `Ready`
    /// or its own deadline, whichever comes first.
    pub async fn call(&self, op: i32, payload: Value) -> Result<Frame, Error> {
        self.call_with_timeout(op, payload, self.inner.request_timeout).await
    }

    /// [`Client::call`] with an explicit deadline.
    pub async fn call_with_timeout(
        &self,
        op: i32,
        payload: Value,
        timeout: Duration,
    ) -> Result<Frame, Error> {
        let deadline = Instant::now() + timeout;
        self.wait_ready(deadline).await?;
        self.invoke_raw(op, payload, deadline).await
    }

    /// Block until an attach-completion push for `resource_id` arrives.
    ///
    /// Call immediately after the raw-bytes HTTP upload for that resource
    /// succeeded; at most one waiter may exist per resource id.
    pub async fn await_upload(
        &self,
        resource_id: i64,
        timeout: Duration,
    ) -> Result<Frame, Error> {
        let (_guard, rx) = self.inner.uploads.register(resource_id)?;
        let deadline = Instant::now() + timeout;
        tokio::select! {
            _ = self.inner.cancel.cancelled() => Err(Error::ConnectionClosed),
            outcome = tokio::time::timeout_at(deadline, rx) => match outcome {
                Err(_elapsed)  => Err(Error::Timeout),
                Ok(Err(_gone)) => Err(Error::ConnectionClosed),
                Ok(Ok(frame))  => Ok(frame),
            },
        }
    }

    /// The multiplexer: register a waiter, enqueue the frame, await the
    /// response.  Registration happens strictly before the frame reaches the
    /// writer so a fast response can never miss its waiter; every exit path
    /// deregisters.  Does not gate on `Ready` — the lifecycle's own
    /// handshake/auth/sync calls come through here.
    async fn invoke_raw(&self, op: i32, payload: Value, deadline: Instant) -> Result<Frame, Error> {
        let (guard, rx) = self.inner.pending.register();
        let frame = Frame::request(guard.seq(), op, payload);

        // Bounded queue: a full queue blocks the caller instead of dropping.
        tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(Error::ConnectionClosed),
            sent = self.inner.outbound_tx.send(frame) => {
                sent.map_err(|_| Error::ConnectionClosed)?;
            }
        }

        let frame = tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(Error::ConnectionClosed),
            outcome = tokio::time::timeout_at(deadline, rx) => match outcome {
                Err(_elapsed)  => return Err(Error::Timeout),
                Ok(Err(_gone)) => return Err(Error::ConnectionClosed),
                Ok(Ok(frame))  => frame,
            },
        };

        match ApiError::from_payload(&frame.payload) {
            Some(api) => Err(Error::Api(api)),
            None      => Ok(frame),
        }
    }

    async fn wait_ready(&self, deadline: Instant) -> Result<(), Error> {
        let mut state_rx = self.inner.state_tx.subscribe();
        loop {
            if *state_rx.borrow_and_update() == ConnectionState::Ready {
                return Ok(());
            }
            tokio::select! {
                _ = self.inner.cancel.cancelled() => return Err(Error::ConnectionClosed),
                changed = tokio::time::timeout_at(deadline, state_rx.changed()) => match changed {
                    Err(_elapsed) => return Err(Error::Timeout),
                    Ok(Err(_))    => return Err(Error::ConnectionClosed),
                    Ok(Ok(()))    => {}
                },
            }
        }
    }

    pub(crate) fn default_deadline(&self) -> Instant {
        Instant::now() + self.inner.request_timeout
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn upload_retry(&self) -> &Arc<dyn UploadRetryPolicy> {
        &self.inner.upload_retry
    }

    pub(crate) fn language(&self) -> &str {
        &self.inner.language
    }

    pub(crate) async fn invoke(&self, op: i32, payload: Value) -> Result<Frame, Error> {
        self.invoke_raw(op, payload, self.default_deadline()).await
    }

    // ── Lifecycle internals ────────────────────────────────────────────────

    /// Dial the transport and replay handshake → auth (if needed) → sync.
    /// Used by both `start` and the reconnection loop.
    async fn establish(&self) -> Result<(), Error> {
        self.set_state(ConnectionState::Connecting);
        log::info!("[oneme] Connecting to {} …", self.inner.endpoint);
        let (sink, source) = self.inner.connector.connect(&self.inner.endpoint).await?;

        let generation = self.inner.conn_gen.fetch_add(1, Ordering::SeqCst) + 1;
        *self.inner.sink.lock().await = Some(sink);
        self.inner.sink_ready.notify_one();
        tokio::spawn(run_reader(self.clone(), source, generation));

        self.set_state(ConnectionState::Handshaking);
        self.session_init().await?;

        let token = match self.inner.session_store.token()? {
            Some(token) => token,
            None => {
                self.set_state(ConnectionState::Authenticating);
                self.authenticate().await?
            }
        };

        self.set_state(ConnectionState::Syncing);
        match self.sync_session(&token).await {
            Ok(_) => Ok(()),
            // The server invalidated the stored token: clear it, run the auth
            // sub-flow again, and retry the sync exactly once.
            Err(e) if e.is("login.token") => {
                log::warn!("[oneme] Stored token rejected — re-authenticating …");
                self.inner.session_store.clear_token()?;
                self.set_state(ConnectionState::Authenticating);
                let fresh = self.authenticate().await?;
                self.set_state(ConnectionState::Syncing);
                self.sync_session(&fresh).await.map(drop)
            }
            Err(e) => Err(e),
        }
    }

    async fn session_init(&self) -> Result<Frame, Error> {
        let device_id = self.inner.session_store.device_id()?;
        log::info!("[oneme] Handshaking (device {device_id}) …");
        let payload = json!({
            "deviceId": device_id.to_string(),
            "userAgent": {
                "appVersion": self.inner.app_version,
                "deviceType": self.inner.device_type,
            },
        });
        self.invoke(opcode::SESSION_INIT, payload).await
    }

    /// The sync request gating readiness.  Its response is also consumed by
    /// the reader to populate the chat/profile caches.
    async fn sync_session(&self, token: &str) -> Result<Frame, Error> {
        log::info!("[oneme] Syncing …");
        let payload = json!({
            "interactive":  true,
            "token":        token,
            "chatsSync":    0,
            "contactsSync": 0,
            "presenceSync": 0,
            "draftsSync":   0,
            "chatsCount":   SYNC_CHATS_COUNT,
        });
        self.invoke(opcode::LOGIN, payload).await
    }

    // ── Inbound routing ────────────────────────────────────────────────────

    /// Route one inbound frame: sync/login responses update the caches *and*
    /// resolve their pending call (the only frame consumed twice); everything
    /// else goes to exactly one of pending-call delivery, the upload
    /// correlator, or push dispatch.
    fn handle_frame(&self, frame: Frame) {
        if frame.opcode == opcode::SYNC || frame.opcode == opcode::LOGIN {
            self.apply_sync(&frame.payload);
            let _ = self.inner.pending.resolve(frame);
            return;
        }

        let Some(frame) = self.inner.pending.resolve(frame) else {
            return;
        };

        if frame.opcode == opcode::NOTIF_ATTACH {
            self.inner.uploads.resolve(frame);
            return;
        }
        self.dispatch_push(frame);
    }

    /// Classify a push frame and dispatch it to the matching handler set.
    /// Malformed payloads are logged and dropped — never an error that could
    /// halt the read path.
    fn dispatch_push(&self, frame: Frame) {
        match frame.opcode {
            opcode::NOTIF_MESSAGE => {
                let message: Message = match serde_json::from_value(frame.payload) {
                    Ok(m) => m,
                    Err(e) => {
                        log::warn!("[oneme] Dropping undecodable message push: {e}");
                        return;
                    }
                };
                // The status field picks exactly one handler category.
                let list = match message.status {
                    None                         => &self.inner.handlers.new_message,
                    Some(MessageStatus::Edited)  => &self.inner.handlers.edited,
                    Some(MessageStatus::Removed) => &self.inner.handlers.deleted,
                };
                for handler in HandlerRegistry::matching(list, &message) {
                    let client  = self.clone();
                    let message = message.clone();
                    tokio::spawn(async move { handler(client, message).await });
                }
            }

            opcode::NOTIF_CHAT => {
                let Some(raw) = frame.payload.get("chat") else {
                    return;
                };
                let chat: Chat = match serde_json::from_value(raw.clone()) {
                    Ok(c) => c,
                    Err(e) => {
                        log::warn!("[oneme] Dropping undecodable chat push: {e}");
                        return;
                    }
                };
                self.inner.chats.lock().unwrap().insert(chat.id, chat.clone());
                let handlers = self.inner.handlers.chat.read().unwrap().clone();
                for handler in handlers {
                    let client = self.clone();
                    let chat   = chat.clone();
                    tokio::spawn(async move { handler(client, chat).await });
                }
            }

            opcode::NOTIF_MSG_REACTIONS_CHANGED => {
                let payload = &frame.payload;
                let info: ReactionInfo = match serde_json::from_value(payload.clone()) {
                    Ok(i) => i,
                    Err(e) => {
                        log::warn!("[oneme] Dropping undecodable reaction push: {e}");
                        return;
                    }
                };
                let change = ReactionUpdate {
                    chat_id: payload.get("chatId").and_then(Value::as_i64).unwrap_or(0),
                    message_id: payload
                        .get("messageId")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    info,
                };
                let handlers = self.inner.handlers.reaction.read().unwrap().clone();
                for handler in handlers {
                    let client = self.clone();
                    let change = change.clone();
                    tokio::spawn(async move { handler(client, change).await });
                }
            }

            other => log::debug!("[oneme] Unrouted push opcode {other}"),
        }
    }

    /// Fold a sync/login response into the chat and profile caches.
    fn apply_sync(&self, payload: &Value) {
        if let Some(code) = payload.get("error").and_then(Value::as_str) {
            if !code.is_empty() {
                log::warn!("[oneme] Sync response carries error: {code}");
            }
        }

        if let Some(raw_chats) = payload.get("chats").and_then(Value::as_array) {
            let mut cache = self.inner.chats.lock().unwrap();
            for raw in raw_chats {
                match serde_json::from_value::<Chat>(raw.clone()) {
                    Ok(chat) => {
                        cache.insert(chat.id, chat);
                    }
                    Err(e) => log::warn!("[oneme] Skipping unparsable chat in sync: {e}"),
                }
            }
        }

        if let Some(contact) = payload.pointer("/profile/contact") {
            match serde_json::from_value::<Me>(contact.clone()) {
                Ok(me) => *self.inner.me.lock().unwrap() = Some(me),
                Err(e) => log::warn!("[oneme] Skipping unparsable profile in sync: {e}"),
            }
        }
    }

    fn fire_ready(&self) {
        let handlers = self.inner.handlers.ready.read().unwrap().clone();
        for handler in handlers {
            let client = self.clone();
            tokio::spawn(async move { handler(client).await });
        }
    }

    // ── Caches ─────────────────────────────────────────────────────────────

    /// All chats known from the last sync and subsequent pushes.
    pub fn chats(&self) -> Vec<Chat> {
        self.inner.chats.lock().unwrap().values().cloned().collect()
    }

    /// The cached record of one chat.
    pub fn chat(&self, chat_id: i64) -> Option<Chat> {
        self.inner.chats.lock().unwrap().get(&chat_id).cloned()
    }

    /// The logged-in profile from the last sync.
    pub fn me(&self) -> Option<Me> {
        self.inner.me.lock().unwrap().clone()
    }

    pub(crate) fn chats_cache(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Chat>> {
        self.inner.chats.lock().unwrap()
    }

    pub(crate) fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.session_store
    }

    pub(crate) fn phone(&self) -> Option<&str> {
        self.inner.phone.as_deref()
    }

    pub(crate) fn code_provider(&self) -> Option<&Arc<dyn CodeProvider>> {
        self.inner.code_provider.as_ref()
    }

    pub(crate) fn profile_name(&self) -> Option<&ProfileName> {
        self.inner.profile_name.as_ref()
    }

    // ── Handler registration ───────────────────────────────────────────────
    //
    // Registration is append-only; handlers fire in registration order but
    // each invocation runs on its own task, so cross-handler ordering for one
    // event is unspecified.

    /// Register a handler for brand-new incoming messages.
    pub fn on_message<F, Fut>(&self, handler: F)
    where
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_message_handler(&self.inner.handlers.new_message, None, handler);
    }

    /// Like [`Client::on_message`], gated by a [`Filter`].
    pub fn on_message_filtered<F, Fut>(&self, filter: Filter, handler: F)
    where
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_message_handler(&self.inner.handlers.new_message, Some(filter), handler);
    }

    /// Register a handler for edited messages.
    pub fn on_message_edited<F, Fut>(&self, handler: F)
    where
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_message_handler(&self.inner.handlers.edited, None, handler);
    }

    /// Like [`Client::on_message_edited`], gated by a [`Filter`].
    pub fn on_message_edited_filtered<F, Fut>(&self, filter: Filter, handler: F)
    where
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_message_handler(&self.inner.handlers.edited, Some(filter), handler);
    }

    /// Register a handler for deleted messages.
    pub fn on_message_deleted<F, Fut>(&self, handler: F)
    where
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_message_handler(&self.inner.handlers.deleted, None, handler);
    }

    /// Like [`Client::on_message_deleted`], gated by a [`Filter`].
    pub fn on_message_deleted_filtered<F, Fut>(&self, filter: Filter, handler: F)
    where
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_message_handler(&self.inner.handlers.deleted, Some(filter), handler);
    }

    /// Register a handler for chat-record updates.
    pub fn on_chat_update<F, Fut>(&self, handler: F)
    where
        F: Fn(Client, Chat) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: update::ChatHandler =
            Arc::new(move |client, chat| Box::pin(handler(client, chat)));
        self.inner.handlers.chat.write().unwrap().push(handler);
    }

    /// Register a handler for reaction changes.
    pub fn on_reaction_change<F, Fut>(&self, handler: F)
    where
        F: Fn(Client, ReactionUpdate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: update::ReactionHandler =
            Arc::new(move |client, change| Box::pin(handler(client, change)));
        self.inner.handlers.reaction.write().unwrap().push(handler);
    }

    /// Register a handler fired on every transition into `Ready` — once at
    /// start and again after each successful reconnect.
    pub fn on_ready<F, Fut>(&self, handler: F)
    where
        F: Fn(Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: update::ReadyHandler =
            Arc::new(move |client| Box::pin(handler(client)));
        self.inner.handlers.ready.write().unwrap().push(handler);
    }

    fn push_message_handler<F, Fut>(
        &self,
        list: &std::sync::RwLock<Vec<(update::MessageHandler, Option<Filter>)>>,
        filter: Option<Filter>,
        handler: F,
    ) where
        F: Fn(Client, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: update::MessageHandler =
            Arc::new(move |client, message| Box::pin(handler(client, message)));
        list.write().unwrap().push((handler, filter));
    }
}

// ─── Background tasks ─────────────────────────────────────────────────────────

/// The sole inbound reader for one connection generation.  Feeds the router;
/// reports transport loss tagged with its generation and exits.
async fn run_reader(client: Client, mut source: Box<dyn FrameSource>, generation: u64) {
    let inner = client.inner.clone();
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            next = source.next() => match next {
                Ok(Some(frame)) => client.handle_frame(frame),
                Ok(None) => {
                    log::info!("[oneme] Server closed the connection");
                    let _ = inner.loss_tx.send(generation);
                    return;
                }
                Err(e) => {
                    log::warn!("[oneme] Read error: {e}");
                    let _ = inner.loss_tx.send(generation);
                    return;
                }
            },
        }
    }
}

/// The sole outbound writer.  Drains the bounded queue in FIFO order into
/// whatever sink is currently installed; parks while reconnection is swapping
/// the transport out.
async fn run_writer(inner: Arc<ClientInner>, mut queue: mpsc::Receiver<Frame>) {
    loop {
        let frame = tokio::select! {
            _ = inner.cancel.cancelled() => return,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => return,
            },
        };

        loop {
            let mut sink = inner.sink.lock().await;
            // Read the generation under the sink lock so a write failure is
            // reported against the sink actually written to, not one that a
            // concurrent reconnect replaced in the meantime.
            let generation = inner.conn_gen.load(Ordering::SeqCst);
            match sink.as_mut() {
                Some(active) => {
                    match active.send(frame.clone()).await {
                        Ok(()) => {}
                        Err(e) => {
                            // The frame is dropped; its caller times out and
                            // the supervisor takes over the transport.
                            log::warn!("[oneme] Write error: {e}");
                            sink.take();
                            let _ = inner.loss_tx.send(generation);
                        }
                    }
                    break;
                }
                None => {
                    drop(sink);
                    tokio::select! {
                        _ = inner.cancel.cancelled() => return,
                        _ = inner.sink_ready.notified() => {}
                    }
                }
            }
        }
    }
}

/// The reconnection supervisor.  A generation guard collapses concurrent loss
/// reports from the reader and writer into a single recovery sequence; each
/// attempt replays dial → handshake → auth (if needed) → sync at a fixed
/// delay, indefinitely, until success or shutdown.
async fn run_supervisor(client: Client, mut loss_rx: mpsc::UnboundedReceiver<u64>) {
    let inner = client.inner.clone();
    loop {
        let generation = tokio::select! {
            _ = inner.cancel.cancelled() => return,
            report = loss_rx.recv() => match report {
                Some(generation) => generation,
                None => return,
            },
        };
        if generation < inner.conn_gen.load(Ordering::SeqCst) {
            continue; // loss of a connection that was already replaced
        }

        inner.sink.lock().await.take();

        if !inner.reconnect {
            log::warn!("[oneme] Connection lost and reconnection is disabled — shutting down");
            client.close().await;
            return;
        }

        log::warn!(
            "[oneme] Connection lost — reconnecting every {:?} …",
            inner.reconnect_delay
        );
        client.set_state(ConnectionState::Reconnecting);

        loop {
            tokio::select! {
                _ = inner.cancel.cancelled() => return,
                _ = tokio::time::sleep(inner.reconnect_delay) => {}
            }
            match client.establish().await {
                Ok(()) => {
                    client.set_state(ConnectionState::Ready);
                    client.fire_ready();
                    log::info!("[oneme] Reconnected ✓");
                    break;
                }
                Err(e) => {
                    log::warn!("[oneme] Reconnect attempt failed: {e} — retrying");
                    inner.sink.lock().await.take();
                    client.set_state(ConnectionState::Reconnecting);
                }
            }
        }
    }
}
