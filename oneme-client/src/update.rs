//! Push-notification handler registration and filters.
//!
//! Server pushes that survive pending-request matching are dispatched to the
//! registered handlers of their category only.  Message pushes are classified
//! by their optional `status` field: absent means a brand-new message,
//! `EDITED` and `REMOVED` route exclusively to the edit and delete handler
//! sets.
//!
//! Handlers receive a [`Client`] clone as an argument rather than capturing
//! one — the registry owns the handlers, so a captured clone would keep the
//! client alive through its own registry.

use std::sync::RwLock;

use futures_util::future::BoxFuture;
use oneme_proto::types::{Chat, Message, ReactionInfo};

use crate::Client;

/// Aggregated reaction change delivered with a reaction push.
#[derive(Clone, Debug)]
pub struct ReactionUpdate {
    pub chat_id:    i64,
    pub message_id: String,
    pub info:       ReactionInfo,
}

// ─── Filter ───────────────────────────────────────────────────────────────────

/// Optional predicate attached to a message handler registration.
///
/// All set conditions must hold for the handler to fire.
///
/// ```rust,no_run
/// use oneme_client::Filter;
///
/// let f = Filter::new().chat(999).text_contains("ping");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub chat_id:       Option<i64>,
    pub sender:        Option<i64>,
    pub text:          Option<String>,
    pub text_contains: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only messages in the given chat.
    pub fn chat(mut self, chat_id: i64) -> Self {
        self.chat_id = Some(chat_id); self
    }

    /// Only messages from the given sender.
    pub fn sender(mut self, user_id: i64) -> Self {
        self.sender = Some(user_id); self
    }

    /// Only messages whose text matches exactly.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into()); self
    }

    /// Only messages whose text contains the given substring.
    pub fn text_contains(mut self, needle: impl Into<String>) -> Self {
        self.text_contains = Some(needle.into()); self
    }

    pub fn matches(&self, message: &Message) -> bool {
        if let Some(chat_id) = self.chat_id {
            if message.chat_id != Some(chat_id) {
                return false;
            }
        }
        if let Some(sender) = self.sender {
            if message.sender != Some(sender) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if &message.text != text {
                return false;
            }
        }
        if let Some(needle) = &self.text_contains {
            if !message.text.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

// ─── Handler registry ─────────────────────────────────────────────────────────

pub(crate) type MessageHandler =
    std::sync::Arc<dyn Fn(Client, Message) -> BoxFuture<'static, ()> + Send + Sync>;
pub(crate) type ChatHandler =
    std::sync::Arc<dyn Fn(Client, Chat) -> BoxFuture<'static, ()> + Send + Sync>;
pub(crate) type ReactionHandler =
    std::sync::Arc<dyn Fn(Client, ReactionUpdate) -> BoxFuture<'static, ()> + Send + Sync>;
pub(crate) type ReadyHandler =
    std::sync::Arc<dyn Fn(Client) -> BoxFuture<'static, ()> + Send + Sync>;

/// Append-only handler lists, one per event category.
///
/// Mutated during setup, read during dispatch; each list clones out under a
/// read lock so a slow handler never holds the registry.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    pub(crate) new_message: RwLock<Vec<(MessageHandler, Option<Filter>)>>,
    pub(crate) edited:      RwLock<Vec<(MessageHandler, Option<Filter>)>>,
    pub(crate) deleted:     RwLock<Vec<(MessageHandler, Option<Filter>)>>,
    pub(crate) chat:        RwLock<Vec<ChatHandler>>,
    pub(crate) reaction:    RwLock<Vec<ReactionHandler>>,
    pub(crate) ready:       RwLock<Vec<ReadyHandler>>,
}

impl HandlerRegistry {
    /// Matching handlers for a message event category, in registration order.
    pub(crate) fn matching(
        list: &RwLock<Vec<(MessageHandler, Option<Filter>)>>,
        message: &Message,
    ) -> Vec<MessageHandler> {
        list.read()
            .unwrap()
            .iter()
            .filter(|(_, filter)| filter.as_ref().is_none_or(|f| f.matches(message)))
            .map(|(handler, _)| handler.clone())
            .collect()
    }
}
