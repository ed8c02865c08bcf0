//! End-to-end engine tests over an in-memory frame transport.
//!
//! `ChannelConnector` stands in for the WebSocket: each `connect` hands out a
//! pre-built channel pair whose far end the test drives as the server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use oneme_client::{
    Client, CodeProvider, Config, ConnectionState, Connector, Error, Filter, FrameSink,
    FrameSource, GroupSettings, MemoryStore, SessionStore,
};
use oneme_proto::types::ChatType;
use oneme_proto::{opcode, Frame, PROTOCOL_VERSION};
use serde_json::{json, Value};
use tokio::sync::mpsc;

// ─── In-memory transport ──────────────────────────────────────────────────────

struct ChanSink(mpsc::UnboundedSender<Frame>);

impl FrameSink for ChanSink {
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), Error>> {
        let sent = self.0.send(frame).map_err(|_| Error::ConnectionClosed);
        Box::pin(async move { sent })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async { Ok(()) })
    }
}

struct ChanSource(mpsc::UnboundedReceiver<Frame>);

impl FrameSource for ChanSource {
    fn next(&mut self) -> BoxFuture<'_, Result<Option<Frame>, Error>> {
        Box::pin(async move { Ok(self.0.recv().await) })
    }
}

/// Hands out one pre-built link per `connect` call, in order.
struct ChannelConnector {
    links: Mutex<VecDeque<(ChanSink, ChanSource)>>,
}

impl Connector for ChannelConnector {
    fn connect(
        &self,
        _endpoint: &str,
    ) -> BoxFuture<'_, Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), Error>> {
        let link = self.links.lock().unwrap().pop_front();
        Box::pin(async move {
            match link {
                Some((sink, source)) => Ok((
                    Box::new(sink) as Box<dyn FrameSink>,
                    Box::new(source) as Box<dyn FrameSource>,
                )),
                None => Err(Error::Network("connection refused".into())),
            }
        })
    }
}

/// The server side of one link.  Dropping it severs the transport.
struct ServerEnd {
    to_client:   mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl ServerEnd {
    async fn recv(&mut self) -> Frame {
        self.from_client.recv().await.expect("client hung up")
    }

    fn reply(&self, request: &Frame, payload: Value) {
        let _ = self.to_client.send(Frame {
            ver:    PROTOCOL_VERSION,
            cmd:    1,
            seq:    request.seq,
            opcode: request.opcode,
            payload,
        });
    }

    /// Sever only the client→server direction, so the next client write fails
    /// while the server→client side stays open.
    fn sever_inbound(&mut self) {
        let (_tx, rx) = mpsc::unbounded_channel();
        self.from_client = rx;
    }

    fn push(&self, op: i32, payload: Value) {
        let _ = self.to_client.send(Frame {
            ver: PROTOCOL_VERSION,
            cmd: 2,
            seq: 0,
            opcode: op,
            payload,
        });
    }
}

fn pair(sessions: usize) -> (Arc<ChannelConnector>, Vec<ServerEnd>) {
    let mut links   = VecDeque::new();
    let mut servers = Vec::new();
    for _ in 0..sessions {
        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();
        links.push_back((ChanSink(client_tx), ChanSource(client_rx)));
        servers.push(ServerEnd { to_client, from_client });
    }
    (Arc::new(ChannelConnector { links: Mutex::new(links) }), servers)
}

fn config(connector: Arc<ChannelConnector>) -> Config {
    Config {
        connector,
        session_store: Arc::new(MemoryStore::with_token("token")),
        request_timeout: Duration::from_secs(2),
        reconnect_delay: Duration::from_millis(50),
        ..Config::default()
    }
}

/// Serve the handshake and sync of one fresh connection.
async fn serve_start(server: &mut ServerEnd) {
    let init = server.recv().await;
    assert_eq!(init.opcode, opcode::SESSION_INIT);
    assert!(init.payload["deviceId"].is_string());
    server.reply(&init, json!({}));

    let login = server.recv().await;
    assert_eq!(login.opcode, opcode::LOGIN);
    assert_eq!(login.payload["interactive"], true);
    server.reply(
        &login,
        json!({
            "chats":   [{"id": 999, "type": "CHAT", "title": "test chat"}],
            "profile": {"contact": {"id": 1, "phone": "+79990000000"}},
        }),
    );
}

async fn started_client(server: &mut ServerEnd, config: Config) -> Client {
    let client = Client::new(config).unwrap();
    let starting = {
        let client = client.clone();
        tokio::spawn(async move { client.start().await })
    };
    serve_start(server).await;
    starting.await.unwrap().unwrap();
    client
}

// ─── Handshake & calls ────────────────────────────────────────────────────────

#[tokio::test]
async fn start_reaches_ready_and_fills_the_caches() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    assert_eq!(client.state(), ConnectionState::Ready);
    assert_eq!(client.chats().len(), 1);
    assert_eq!(client.chat(999).unwrap().title.as_deref(), Some("test chat"));
    assert_eq!(client.me().unwrap().id, 1);
}

#[tokio::test]
async fn responses_resolve_by_sequence_even_out_of_order() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let first_call = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::CHAT_INFO, json!({"chatIds": [1]})).await })
    };
    let first = server.recv().await;
    let second_call = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::CHAT_INFO, json!({"chatIds": [2]})).await })
    };
    let second = server.recv().await;
    assert!(second.seq > first.seq);

    server.reply(&second, json!({"tag": 2}));
    server.reply(&first, json!({"tag": 1}));

    assert_eq!(first_call.await.unwrap().unwrap().payload["tag"], 1);
    assert_eq!(second_call.await.unwrap().unwrap().payload["tag"], 2);
}

#[tokio::test]
async fn unanswered_call_times_out_and_late_reply_is_dropped() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let mut cfg = config(connector);
    cfg.request_timeout = Duration::from_millis(100);
    let client = started_client(&mut server, cfg).await;

    let silent = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::PROFILE, json!({})).await })
    };
    let request = server.recv().await;
    assert!(matches!(silent.await.unwrap(), Err(Error::Timeout)));

    // The waiter is gone; a late reply must be dropped without disturbing
    // later calls.
    server.reply(&request, json!({"late": true}));

    let next = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::PROFILE, json!({})).await })
    };
    let request = server.recv().await;
    server.reply(&request, json!({"fresh": true}));
    assert_eq!(next.await.unwrap().unwrap().payload["fresh"], true);
}

#[tokio::test]
async fn error_payload_becomes_an_api_error() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let denied = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::CHAT_JOIN, json!({"link": "x"})).await })
    };
    let request = server.recv().await;
    server.reply(&request, json!({"error": "chat.access.denied", "message": "denied"}));

    let err = denied.await.unwrap().unwrap_err();
    assert!(err.is("chat.*"));
    assert!(matches!(err, Error::Api(api) if api.code == "chat.access.denied"));
}

#[tokio::test]
async fn send_message_round_trip() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let sending = {
        let client = client.clone();
        tokio::spawn(async move { client.send_message(999, "hello").await })
    };
    let request = server.recv().await;
    assert_eq!(request.opcode, opcode::MSG_SEND);
    assert_eq!(request.payload["chatId"], 999);
    assert_eq!(request.payload["message"]["text"], "hello");
    server.reply(
        &request,
        json!({"message": {"id": "12345", "chatId": 999, "text": "hello", "time": 1}}),
    );

    let message = sending.await.unwrap().unwrap();
    assert_eq!(message.id, 12345);
    assert_eq!(message.chat_id, Some(999));
}

// ─── Group management ─────────────────────────────────────────────────────────

#[tokio::test]
async fn group_management_requests_have_the_expected_shape() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let updating = {
        let client = client.clone();
        let settings = GroupSettings::new().only_admin_can_add_member(true);
        tokio::spawn(async move { client.change_group_settings(999, settings).await })
    };
    let request = server.recv().await;
    assert_eq!(request.opcode, opcode::CHAT_UPDATE);
    assert_eq!(request.payload["chatId"], 999);
    assert_eq!(request.payload["options"]["onlyAdminCanAddMember"], true);
    assert!(request.payload["options"].get("allCanPinMessage").is_none());
    server.reply(&request, json!({"chat": {"id": 999, "type": "CHAT", "title": "test chat"}}));
    updating.await.unwrap().unwrap();

    let renaming = {
        let client = client.clone();
        tokio::spawn(async move { client.change_group_profile(999, Some("ops"), None).await })
    };
    let request = server.recv().await;
    assert_eq!(request.opcode, opcode::CHAT_UPDATE);
    assert_eq!(request.payload["theme"], "ops");
    assert!(request.payload.get("description").is_none());
    server.reply(&request, json!({"chat": {"id": 999, "type": "CHAT", "title": "ops"}}));
    renaming.await.unwrap().unwrap();
    assert_eq!(client.chat(999).unwrap().title.as_deref(), Some("ops"));

    let reworking = {
        let client = client.clone();
        tokio::spawn(async move { client.rework_invite_link(999).await })
    };
    let request = server.recv().await;
    assert_eq!(request.opcode, opcode::CHAT_UPDATE);
    assert_eq!(request.payload["revokePrivateLink"], true);
    assert_eq!(request.payload["chatId"], 999);
    server.reply(
        &request,
        json!({"chat": {"id": 999, "type": "CHAT", "link": "https://max.ru/join/fresh"}}),
    );
    let chat = reworking.await.unwrap().unwrap();
    assert_eq!(chat.link.as_deref(), Some("https://max.ru/join/fresh"));
}

#[tokio::test]
async fn member_search_and_channel_resolution() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let finding = {
        let client = client.clone();
        tokio::spawn(async move { client.find_members(999, "ann").await })
    };
    let request = server.recv().await;
    assert_eq!(request.opcode, opcode::CHAT_MEMBERS);
    assert_eq!(request.payload["type"], "MEMBER");
    assert_eq!(request.payload["query"], "ann");
    assert_eq!(request.payload["chatId"], 999);
    server.reply(&request, json!({"members": [{"contact": {"id": 5}}]}));
    let members = finding.await.unwrap().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].contact.id, 5);

    let resolving = {
        let client = client.clone();
        tokio::spawn(async move { client.resolve_channel_by_name("news").await })
    };
    let request = server.recv().await;
    assert_eq!(request.opcode, opcode::LINK_INFO);
    assert_eq!(request.payload["link"], "https://max.ru/news");
    server.reply(&request, json!({"chat": {"id": 42, "type": "CHANNEL", "title": "news"}}));
    resolving.await.unwrap().unwrap();
    assert_eq!(client.chat(42).unwrap().kind, ChatType::Channel);
}

// ─── Push dispatch ────────────────────────────────────────────────────────────

#[tokio::test]
async fn message_pushes_route_by_status() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let (new_tx, mut new_rx) = mpsc::unbounded_channel();
    let (edit_tx, mut edit_rx) = mpsc::unbounded_channel();
    let (del_tx, mut del_rx) = mpsc::unbounded_channel();
    client.on_message(move |_, m| {
        let tx = new_tx.clone();
        async move { let _ = tx.send(m.id); }
    });
    client.on_message_edited(move |_, m| {
        let tx = edit_tx.clone();
        async move { let _ = tx.send(m.id); }
    });
    client.on_message_deleted(move |_, m| {
        let tx = del_tx.clone();
        async move { let _ = tx.send(m.id); }
    });

    server.push(opcode::NOTIF_MESSAGE, json!({"id": 1, "chatId": 999, "text": "new"}));
    server.push(
        opcode::NOTIF_MESSAGE,
        json!({"id": 2, "chatId": 999, "text": "edited", "status": "EDITED"}),
    );
    server.push(
        opcode::NOTIF_MESSAGE,
        json!({"id": 3, "chatId": 999, "status": "REMOVED"}),
    );

    assert_eq!(new_rx.recv().await, Some(1));
    assert_eq!(edit_rx.recv().await, Some(2));
    assert_eq!(del_rx.recv().await, Some(3));
    // Exactly one category per push.
    assert!(new_rx.try_recv().is_err());
    assert!(edit_rx.try_recv().is_err());
    assert!(del_rx.try_recv().is_err());
}

#[tokio::test]
async fn identical_pushes_dispatch_twice_without_deduplication() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_message(move |_, m| {
        let tx = tx.clone();
        async move { let _ = tx.send(m.id); }
    });

    let payload = json!({"id": 5, "chatId": 999, "text": "again"});
    server.push(opcode::NOTIF_MESSAGE, payload.clone());
    server.push(opcode::NOTIF_MESSAGE, payload);

    assert_eq!(rx.recv().await, Some(5));
    assert_eq!(rx.recv().await, Some(5));
}

#[tokio::test]
async fn filtered_handler_sees_only_matching_messages() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_message_filtered(Filter::new().chat(999), move |_, m| {
        let tx = tx.clone();
        async move { let _ = tx.send(m.id); }
    });

    server.push(opcode::NOTIF_MESSAGE, json!({"id": 1, "chatId": 1000, "text": "other"}));
    server.push(opcode::NOTIF_MESSAGE, json!({"id": 2, "chatId": 999, "text": "ours"}));

    assert_eq!(rx.recv().await, Some(2));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn chat_push_updates_the_cache_before_handlers_run() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_chat_update(move |client, chat| {
        let tx = tx.clone();
        async move {
            let cached = client.chat(chat.id).map(|c| c.title);
            let _ = tx.send((chat.id, cached));
        }
    });

    server.push(
        opcode::NOTIF_CHAT,
        json!({"chat": {"id": 42, "type": "CHANNEL", "title": "news"}}),
    );

    let (id, cached_title) = rx.recv().await.unwrap();
    assert_eq!(id, 42);
    assert_eq!(cached_title.flatten().as_deref(), Some("news"));
}

#[tokio::test]
async fn reaction_push_carries_chat_and_message_ids() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_reaction_change(move |_, change| {
        let tx = tx.clone();
        async move { let _ = tx.send(change); }
    });

    server.push(
        opcode::NOTIF_MSG_REACTIONS_CHANGED,
        json!({
            "chatId":     999,
            "messageId":  "555",
            "totalCount": 2,
            "counters":   [{"count": 2, "reaction": "👍"}],
        }),
    );

    let change = rx.recv().await.unwrap();
    assert_eq!(change.chat_id, 999);
    assert_eq!(change.message_id, "555");
    assert_eq!(change.info.total_count, 2);
    assert_eq!(change.info.counters[0].reaction, "👍");
}

// ─── Upload waiters ───────────────────────────────────────────────────────────

#[tokio::test]
async fn attach_push_resolves_the_registered_upload_waiter() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let client = started_client(&mut server, config(connector)).await;

    let waiting = {
        let client = client.clone();
        tokio::spawn(async move { client.await_upload(77, Duration::from_secs(2)).await })
    };
    tokio::task::yield_now().await;
    server.push(opcode::NOTIF_ATTACH, json!({"fileId": 77}));
    let frame = waiting.await.unwrap().unwrap();
    assert_eq!(frame.payload["fileId"], 77);

    // A duplicate confirmation has no waiter left and is dropped.
    server.push(opcode::NOTIF_ATTACH, json!({"fileId": 77}));
    assert_eq!(client.state(), ConnectionState::Ready);
}

// ─── Reconnection ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn transport_loss_triggers_reconnect_and_calls_block_until_ready() {
    let (connector, mut servers) = pair(2);
    let mut second = servers.remove(1);
    let mut first  = servers.remove(0);
    let client = started_client(&mut first, config(connector)).await;

    let mut states = client.state_changes();
    drop(first);
    loop {
        states.changed().await.unwrap();
        if *states.borrow_and_update() == ConnectionState::Reconnecting {
            break;
        }
    }

    // Issued mid-reconnect: must block until the new connection is ready.
    let blocked = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::PROFILE, json!({})).await })
    };

    serve_start(&mut second).await;
    let request = second.recv().await;
    assert_eq!(request.opcode, opcode::PROFILE);
    second.reply(&request, json!({"after": "reconnect"}));

    assert_eq!(blocked.await.unwrap().unwrap().payload["after"], "reconnect");
    assert_eq!(client.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn failed_start_leaves_no_background_reconnection() {
    let (connector, mut servers) = pair(2);
    // The spare link stays queued; only a leftover supervisor would dial it.
    let _spare = servers.remove(1);
    let mut first = servers.remove(0);

    let client = Client::new(config(connector.clone())).unwrap();
    let starting = {
        let client = client.clone();
        tokio::spawn(async move { client.start().await })
    };
    let init = first.recv().await;
    first.reply(&init, json!({"error": "session.init.failed"}));

    assert!(starting.await.unwrap().is_err());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // The dead transport closing afterwards must not wake anything: the
    // client stays down and never dials again.
    drop(first);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(connector.links.lock().unwrap().len(), 1);

    let err = client.call(opcode::PROFILE, json!({})).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
}

#[tokio::test]
async fn write_failure_hands_the_connection_to_the_supervisor() {
    let (connector, mut servers) = pair(2);
    let mut second = servers.remove(1);
    let mut first  = servers.remove(0);
    let mut cfg = config(connector);
    cfg.request_timeout = Duration::from_millis(300);
    let client = started_client(&mut first, cfg).await;

    first.sever_inbound();
    let doomed = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::PROFILE, json!({})).await })
    };

    // The failed write reports the loss and the supervisor dials the spare.
    serve_start(&mut second).await;

    // The frame died with the old sink, so its caller times out.
    assert!(matches!(doomed.await.unwrap(), Err(Error::Timeout)));

    let fresh = {
        let client = client.clone();
        tokio::spawn(async move { client.call(opcode::PROFILE, json!({})).await })
    };
    let request = second.recv().await;
    second.reply(&request, json!({"ok": true}));
    assert_eq!(fresh.await.unwrap().unwrap().payload["ok"], true);
    assert_eq!(client.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn disabled_reconnect_shuts_the_client_down_on_loss() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let mut cfg = config(connector);
    cfg.reconnect = false;
    let client = started_client(&mut server, cfg).await;

    let mut states = client.state_changes();
    drop(server);
    loop {
        states.changed().await.unwrap();
        if *states.borrow_and_update() == ConnectionState::Disconnected {
            break;
        }
    }

    let err = client.call(opcode::PROFILE, json!({})).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
}

// ─── Auth sub-flow ────────────────────────────────────────────────────────────

struct FixedCode(&'static str);

impl CodeProvider for FixedCode {
    fn verification_code(&self) -> BoxFuture<'_, Result<String, Error>> {
        let code = self.0.to_string();
        Box::pin(async move { Ok(code) })
    }
}

#[tokio::test]
async fn first_start_runs_the_code_flow_and_persists_the_token() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let store = Arc::new(MemoryStore::new());
    let mut cfg = config(connector);
    cfg.session_store = store.clone();
    cfg.phone = Some("+79991234567".into());
    cfg.code_provider = Some(Arc::new(FixedCode("1234")));

    let client = Client::new(cfg).unwrap();
    let starting = {
        let client = client.clone();
        tokio::spawn(async move { client.start().await })
    };

    let init = server.recv().await;
    assert_eq!(init.opcode, opcode::SESSION_INIT);
    server.reply(&init, json!({}));

    let code_request = server.recv().await;
    assert_eq!(code_request.opcode, opcode::AUTH_REQUEST);
    assert_eq!(code_request.payload["phone"], "+79991234567");
    assert_eq!(code_request.payload["type"], "START_AUTH");
    server.reply(&code_request, json!({"token": "round-token"}));

    let verify = server.recv().await;
    assert_eq!(verify.opcode, opcode::AUTH);
    assert_eq!(verify.payload["verifyCode"], "1234");
    assert_eq!(verify.payload["token"], "round-token");
    server.reply(&verify, json!({"tokenAttrs": {"LOGIN": {"token": "login-token"}}}));

    let login = server.recv().await;
    assert_eq!(login.opcode, opcode::LOGIN);
    assert_eq!(login.payload["token"], "login-token");
    server.reply(&login, json!({"chats": []}));

    starting.await.unwrap().unwrap();
    assert_eq!(store.token().unwrap().as_deref(), Some("login-token"));
}

#[tokio::test]
async fn rejected_token_is_cleared_and_auth_runs_again() {
    let (connector, mut servers) = pair(1);
    let mut server = servers.remove(0);
    let store = Arc::new(MemoryStore::with_token("stale"));
    let mut cfg = config(connector);
    cfg.session_store = store.clone();
    cfg.phone = Some("+79991234567".into());
    cfg.code_provider = Some(Arc::new(FixedCode("0000")));

    let client = Client::new(cfg).unwrap();
    let starting = {
        let client = client.clone();
        tokio::spawn(async move { client.start().await })
    };

    let init = server.recv().await;
    server.reply(&init, json!({}));

    let stale_login = server.recv().await;
    assert_eq!(stale_login.payload["token"], "stale");
    server.reply(&stale_login, json!({"error": "login.token"}));

    let code_request = server.recv().await;
    assert_eq!(code_request.opcode, opcode::AUTH_REQUEST);
    server.reply(&code_request, json!({"token": "round"}));
    let verify = server.recv().await;
    server.reply(&verify, json!({"tokenAttrs": {"LOGIN": {"token": "fresh"}}}));

    let retry_login = server.recv().await;
    assert_eq!(retry_login.opcode, opcode::LOGIN);
    assert_eq!(retry_login.payload["token"], "fresh");
    server.reply(&retry_login, json!({"chats": []}));

    starting.await.unwrap().unwrap();
    assert_eq!(store.token().unwrap().as_deref(), Some("fresh"));
}
