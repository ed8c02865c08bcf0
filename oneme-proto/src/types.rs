//! Typed payload records.
//!
//! These mirror the JSON documents the server puts inside frame payloads.
//! Unknown fields are tolerated everywhere; the engine only decodes the
//! records it dispatches on, everything else stays a raw [`serde_json::Value`].

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Enums ────────────────────────────────────────────────────────────────────

/// Kind of conversation: personal dialog, group chat, or channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    Dialog,
    Chat,
    Channel,
}

/// Status a message push may carry; absent for brand-new messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Edited,
    Removed,
}

/// Access level of a chat or channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    Public,
    Private,
    Secret,
}

/// Attachment discriminator, carried as `_type` on every attach document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachType {
    Photo,
    Video,
    File,
    Sticker,
    Audio,
    Control,
}

// ─── Users ────────────────────────────────────────────────────────────────────

/// One representation of a user's display name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name:       Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name:  Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind:       Option<String>,
}

/// Last-seen presence information.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seen: Option<i64>,
}

/// The logged-in account's own profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
    pub id:             i64,
    #[serde(default)]
    pub phone:          String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names:          Vec<Name>,
    #[serde(default)]
    pub account_status: i32,
    #[serde(default)]
    pub update_time:    i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options:        Vec<String>,
}

/// An arbitrary user profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id:             i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names:          Vec<Name>,
    #[serde(default)]
    pub account_status: i32,
    #[serde(default)]
    pub update_time:    i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options:        Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url:       Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_id:       Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description:    Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link:           Option<String>,
}

/// An address-book entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id:             i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names:          Vec<Name>,
    #[serde(default)]
    pub account_status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_id:       Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url:       Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options:        Vec<String>,
    #[serde(default)]
    pub update_time:    i64,
}

/// A chat member: contact plus read position and presence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub contact:   Contact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence:  Option<Presence>,
    #[serde(default)]
    pub read_mark: i64,
}

// ─── Messages ─────────────────────────────────────────────────────────────────

/// A fragment of formatted text inside a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from:   Option<i32>,
    #[serde(default)]
    pub length: i32,
}

/// Per-reaction counter inside [`ReactionInfo`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionCounter {
    pub count:    i32,
    pub reaction: String,
}

/// Aggregated reaction state of a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionInfo {
    #[serde(default)]
    pub total_count:   i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_reaction: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counters:      Vec<ReactionCounter>,
}

/// A reference to a message in another chat (reply/forward link).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLink {
    #[serde(default)]
    pub chat_id: i64,
    #[serde(rename = "type")]
    pub kind:    String,
    pub message: Box<Message>,
}

/// A message in a chat.
///
/// The server sends `id` either as a JSON number or as a decimal string
/// depending on the endpoint; both decode into `i64` here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, deserialize_with = "id_from_string_or_number")]
    pub id:        i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id:   Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender:    Option<i64>,
    #[serde(default)]
    pub text:      String,
    #[serde(default)]
    pub time:      i64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind:      Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements:  Vec<Element>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attaches:  Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status:    Option<MessageStatus>,
    #[serde(rename = "reactionInfo", skip_serializing_if = "Option::is_none")]
    pub reactions: Option<ReactionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link:      Option<MessageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options:   Option<i32>,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse::<i64>().map_err(D::Error::custom),
    }
}

// ─── Chats ────────────────────────────────────────────────────────────────────

/// A group chat or channel.  Personal dialogs reuse the same record with
/// `kind == ChatType::Dialog` and most fields absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id:                 i64,
    #[serde(rename = "type")]
    pub kind:               ChatType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title:              Option<String>,
    #[serde(default)]
    pub owner:              i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access:             Option<AccessType>,
    #[serde(default)]
    pub participants_count: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admins:             Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description:        Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link:               Option<String>,
    #[serde(default)]
    pub created:            i64,
    #[serde(default)]
    pub join_time:          i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message:       Option<Message>,
    #[serde(default)]
    pub last_event_time:    i64,
    #[serde(default)]
    pub messages_count:     i32,
    #[serde(default)]
    pub modified:           i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_message_id:    Option<String>,
    #[serde(default)]
    pub status:             String,
}

// ─── Folders ──────────────────────────────────────────────────────────────────

/// A chat folder (user-defined filter over chats).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id:          String,
    #[serde(default)]
    pub title:       String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include:     Vec<i64>,
    #[serde(default)]
    pub source_id:   i64,
    #[serde(default)]
    pub update_time: i64,
}

/// The user's folder list as returned by the folders-get operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderList {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders:       Vec<Folder>,
    #[serde(default)]
    pub folder_sync:   i64,
}

// ─── Sessions ─────────────────────────────────────────────────────────────────

/// One active device session of the account.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub client:   String,
    #[serde(default)]
    pub info:     String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub time:     i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current:  Option<bool>,
}

// ─── Attaches ─────────────────────────────────────────────────────────────────

/// A photo attachment of a received message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAttach {
    #[serde(default)]
    pub photo_id: i64,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub width:    i32,
    #[serde(default)]
    pub height:   i32,
}

/// A video attachment of a received message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAttach {
    #[serde(default)]
    pub video_id: i64,
    #[serde(default)]
    pub width:    i32,
    #[serde(default)]
    pub height:   i32,
    #[serde(default)]
    pub duration: i32,
}

/// A plain file attachment of a received message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttach {
    #[serde(default)]
    pub id:   i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: i64,
}
