//! Auth sub-flow and typed request methods.
//!
//! Every method here is a thin wrapper over [`Client::call`]: build the
//! payload, issue the request, decode the interesting part of the response.
//! Payload shapes are part of the server contract and must match it
//! field-for-field.

use std::collections::HashMap;

use oneme_proto::opcode;
use oneme_proto::types::{
    Chat, Contact, Folder, FolderList, Me, Member, Message, ReactionInfo, SessionInfo, User,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::errors::Error;
use crate::Client;

// ─── Auth sub-flow ────────────────────────────────────────────────────────────

/// Result of verifying a one-time code: either the phone already has an
/// account, or it needs to register one.
#[derive(Debug)]
pub enum AuthOutcome {
    /// The account exists; carries the long-lived login token.
    LoggedIn(String),
    /// The phone is unregistered; carries the registration token to submit
    /// together with a profile name.
    Registration(String),
}

impl Client {
    /// Run the interactive auth sub-flow: request a code for the configured
    /// phone, verify the code supplied by the [`crate::CodeProvider`],
    /// register a profile when the phone has no account yet, and persist the
    /// issued login token.  Returns the token.
    ///
    /// The token is persisted only after the whole flow succeeds, so an
    /// interrupted flow never leaves a half-valid session behind.
    pub(crate) async fn authenticate(&self) -> Result<String, Error> {
        let phone = self
            .phone()
            .ok_or_else(|| Error::InvalidInput("no stored token and no phone configured".into()))?
            .to_string();
        validate_phone(&phone)?;
        let provider = self
            .code_provider()
            .ok_or_else(|| Error::InvalidInput("no stored token and no code provider configured".into()))?
            .clone();

        log::info!("[oneme] Requesting verification code for {phone} …");
        let auth_token = self.request_code(&phone).await?;

        let code = provider.verification_code().await?;
        let token = match self.confirm_code(&auth_token, code.trim()).await? {
            AuthOutcome::LoggedIn(token) => token,
            AuthOutcome::Registration(reg_token) => {
                log::info!("[oneme] Phone is unregistered — creating account …");
                self.register_profile(&reg_token).await?
            }
        };

        self.session_store().set_token(&token)?;
        log::info!("[oneme] Authenticated ✓");
        Ok(token)
    }

    /// Ask the server to text a one-time code to `phone`.  Returns the
    /// ephemeral auth token identifying this code round.
    async fn request_code(&self, phone: &str) -> Result<String, Error> {
        let frame = self
            .invoke(
                opcode::AUTH_REQUEST,
                json!({
                    "phone":    phone,
                    "type":     "START_AUTH",
                    "language": self.language(),
                }),
            )
            .await?;
        frame
            .payload
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Decode("auth response carries no token".into()))
    }

    /// Submit the one-time code.  The response carries token attributes for
    /// exactly one of the two outcomes.
    async fn confirm_code(&self, auth_token: &str, code: &str) -> Result<AuthOutcome, Error> {
        let frame = self
            .invoke(
                opcode::AUTH,
                json!({
                    "token":         auth_token,
                    "verifyCode":    code,
                    "authTokenType": "CHECK_CODE",
                }),
            )
            .await?;

        let attr_token = |name: &str| {
            frame
                .payload
                .pointer(&format!("/tokenAttrs/{name}/token"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        if let Some(token) = attr_token("LOGIN") {
            return Ok(AuthOutcome::LoggedIn(token));
        }
        if let Some(token) = attr_token("REGISTER") {
            return Ok(AuthOutcome::Registration(token));
        }
        Err(Error::Decode("code verification carries neither login nor register token".into()))
    }

    /// Finish registration with the configured profile name.  Returns the
    /// login token of the newly created account.
    async fn register_profile(&self, reg_token: &str) -> Result<String, Error> {
        let name = self.profile_name().ok_or_else(|| {
            Error::InvalidInput("phone is unregistered but no profile name configured".into())
        })?;
        let mut payload = Map::new();
        payload.insert("firstName".into(), json!(name.first_name));
        if let Some(last) = &name.last_name {
            payload.insert("lastName".into(), json!(last));
        }
        payload.insert("token".into(), json!(reg_token));
        payload.insert("tokenType".into(), json!("REGISTER"));

        let frame = self.invoke(opcode::AUTH_CONFIRM, Value::Object(payload)).await?;
        frame
            .payload
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Decode("registration response carries no token".into()))
    }
}

/// Accepts an optional leading `+` followed by 10 to 15 digits.
fn validate_phone(phone: &str) -> Result<(), Error> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let ok = (10..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid phone number: {phone:?}")))
    }
}

// ─── OutgoingMessage ──────────────────────────────────────────────────────────

/// Builder for an outgoing message.
///
/// ```rust,no_run
/// use oneme_client::OutgoingMessage;
///
/// let msg = OutgoingMessage::text("pong").reply_to(123456).silent();
/// ```
#[derive(Clone, Debug)]
pub struct OutgoingMessage {
    text:     String,
    reply_to: Option<i64>,
    attaches: Vec<Value>,
    notify:   bool,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text:     text.into(),
            reply_to: None,
            attaches: Vec::new(),
            notify:   true,
        }
    }

    /// Link this message as a reply to an existing one.
    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    /// Attach an upload result (see [`Client::upload_photo`] and friends).
    pub fn attach(mut self, attach: Value) -> Self {
        self.attaches.push(attach);
        self
    }

    /// Suppress the recipient-side notification.
    pub fn silent(mut self) -> Self {
        self.notify = false;
        self
    }

    fn into_payload(self, chat_id: i64) -> Value {
        let mut message = Map::new();
        message.insert("text".into(), json!(self.text));
        message.insert("cid".into(), json!(chrono::Utc::now().timestamp_millis()));
        message.insert("elements".into(), json!([]));
        message.insert("attaches".into(), json!(self.attaches));
        if let Some(message_id) = self.reply_to {
            message.insert(
                "link".into(),
                json!({"type": "REPLY", "messageId": message_id.to_string()}),
            );
        }
        json!({"chatId": chat_id, "message": message, "notify": self.notify})
    }
}

// ─── Messaging ────────────────────────────────────────────────────────────────

impl Client {
    /// Send a plain text message.
    pub async fn send_message(&self, chat_id: i64, text: impl Into<String>) -> Result<Message, Error> {
        self.send(chat_id, OutgoingMessage::text(text)).await
    }

    /// Send a built [`OutgoingMessage`].
    pub async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<Message, Error> {
        let frame = self.call(opcode::MSG_SEND, message.into_payload(chat_id)).await?;
        decode(frame.payload.get("message"), "sent message")
    }

    /// Replace the text of an existing message.
    pub async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: impl Into<String>,
    ) -> Result<(), Error> {
        self.call(
            opcode::MSG_EDIT,
            json!({
                "chatId":    chat_id,
                "messageId": message_id,
                "text":      text.into(),
                "elements":  [],
                "attaches":  [],
            }),
        )
        .await
        .map(drop)
    }

    /// Delete messages, for everyone or only for this account.
    pub async fn delete_messages(
        &self,
        chat_id: i64,
        message_ids: &[i64],
        for_me: bool,
    ) -> Result<(), Error> {
        self.call(
            opcode::MSG_DELETE,
            json!({"chatId": chat_id, "messageIds": message_ids, "forMe": for_me}),
        )
        .await
        .map(drop)
    }

    /// Fetch message history around position `from` (a message timestamp).
    /// `forward`/`backward` bound how many messages to return in each
    /// direction.
    pub async fn fetch_history(
        &self,
        chat_id: i64,
        from: i64,
        forward: i32,
        backward: i32,
    ) -> Result<Vec<Message>, Error> {
        let frame = self
            .call(
                opcode::CHAT_HISTORY,
                json!({
                    "chatId":      chat_id,
                    "from":        from,
                    "forward":     forward,
                    "backward":    backward,
                    "getMessages": true,
                }),
            )
            .await?;
        decode(frame.payload.get("messages"), "history messages")
    }

    /// Pin a message in a chat, optionally announcing the pin.
    pub async fn pin_message(
        &self,
        chat_id: i64,
        message_id: i64,
        notify: bool,
    ) -> Result<(), Error> {
        self.call(
            opcode::CHAT_UPDATE,
            json!({"chatId": chat_id, "notifyPin": notify, "pinMessageId": message_id}),
        )
        .await
        .map(drop)
    }

    /// Resolve a download URL for a file attachment.
    pub async fn file_url(
        &self,
        chat_id: i64,
        message_id: i64,
        file_id: i64,
    ) -> Result<String, Error> {
        let frame = self
            .call(
                opcode::FILE_DOWNLOAD,
                json!({"chatId": chat_id, "messageId": message_id, "fileId": file_id}),
            )
            .await?;
        frame
            .payload
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Decode("file download response carries no url".into()))
    }

    /// Resolve a playback URL for a video attachment.
    ///
    /// The response keys the URL by quality; any string field other than the
    /// `EXTERNAL`/`cache` markers is a playable source and the first one wins.
    pub async fn video_url(
        &self,
        chat_id: i64,
        message_id: i64,
        video_id: i64,
    ) -> Result<String, Error> {
        let frame = self
            .call(
                opcode::VIDEO_PLAY,
                json!({"chatId": chat_id, "messageId": message_id, "videoId": video_id}),
            )
            .await?;
        frame
            .payload
            .as_object()
            .and_then(|fields| {
                fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != "EXTERNAL" && key.as_str() != "cache")
                    .find_map(|(_, value)| value.as_str())
            })
            .map(str::to_string)
            .ok_or_else(|| Error::Decode("video play response carries no url".into()))
    }

    // ── Reactions ──────────────────────────────────────────────────────────

    /// Put an emoji reaction on a message.  Returns the updated aggregate.
    pub async fn add_reaction(
        &self,
        chat_id: i64,
        message_id: &str,
        emoji: &str,
    ) -> Result<ReactionInfo, Error> {
        let frame = self
            .call(
                opcode::MSG_REACTION,
                json!({
                    "chatId":    chat_id,
                    "messageId": message_id,
                    "reaction":  {"reactionType": "EMOJI", "id": emoji},
                }),
            )
            .await?;
        decode(frame.payload.get("reactionInfo"), "reaction info")
    }

    /// Withdraw this account's reaction from a message.
    pub async fn remove_reaction(&self, chat_id: i64, message_id: &str) -> Result<(), Error> {
        self.call(
            opcode::MSG_CANCEL_REACTION,
            json!({"chatId": chat_id, "messageId": message_id}),
        )
        .await
        .map(drop)
    }

    /// Fetch the reaction aggregates of several messages, keyed by message id.
    pub async fn get_reactions(
        &self,
        chat_id: i64,
        message_ids: &[&str],
    ) -> Result<HashMap<String, ReactionInfo>, Error> {
        let frame = self
            .call(
                opcode::MSG_GET_REACTIONS,
                json!({"chatId": chat_id, "messageIds": message_ids}),
            )
            .await?;
        decode(frame.payload.get("messagesReactions"), "message reactions")
    }
}

// ─── GroupSettings ────────────────────────────────────────────────────────────

/// Permission toggles for [`Client::change_group_settings`].
///
/// Only the toggles explicitly set are sent; the rest keep their server-side
/// values.
#[derive(Clone, Debug, Default)]
pub struct GroupSettings {
    all_can_pin_message:              Option<bool>,
    only_owner_can_change_icon_title: Option<bool>,
    only_admin_can_add_member:        Option<bool>,
    only_admin_can_call:              Option<bool>,
    members_can_see_private_link:     Option<bool>,
}

impl GroupSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_can_pin_message(mut self, allowed: bool) -> Self {
        self.all_can_pin_message = Some(allowed); self
    }

    pub fn only_owner_can_change_icon_title(mut self, restricted: bool) -> Self {
        self.only_owner_can_change_icon_title = Some(restricted); self
    }

    pub fn only_admin_can_add_member(mut self, restricted: bool) -> Self {
        self.only_admin_can_add_member = Some(restricted); self
    }

    pub fn only_admin_can_call(mut self, restricted: bool) -> Self {
        self.only_admin_can_call = Some(restricted); self
    }

    pub fn members_can_see_private_link(mut self, visible: bool) -> Self {
        self.members_can_see_private_link = Some(visible); self
    }

    fn into_options(self) -> Map<String, Value> {
        let mut options = Map::new();
        let mut set = |key: &str, value: Option<bool>| {
            if let Some(value) = value {
                options.insert(key.into(), json!(value));
            }
        };
        set("allCanPinMessage", self.all_can_pin_message);
        set("onlyOwnerCanChangeIconTitle", self.only_owner_can_change_icon_title);
        set("onlyAdminCanAddMember", self.only_admin_can_add_member);
        set("onlyAdminCanCall", self.only_admin_can_call);
        set("membersCanSeePrivateLink", self.members_can_see_private_link);
        options
    }
}

// ─── Chats & groups ───────────────────────────────────────────────────────────

impl Client {
    /// Fetch full chat records by id and refresh the cache with them.
    pub async fn chat_info(&self, chat_ids: &[i64]) -> Result<Vec<Chat>, Error> {
        let frame = self.call(opcode::CHAT_INFO, json!({"chatIds": chat_ids})).await?;
        let chats: Vec<Chat> = decode(frame.payload.get("chats"), "chats")?;
        self.cache_chats(&chats);
        Ok(chats)
    }

    /// Join a chat or channel by invite link.
    pub async fn join_chat(&self, link: &str) -> Result<Chat, Error> {
        let frame = self.call(opcode::CHAT_JOIN, json!({"link": link})).await?;
        let chat: Chat = decode(frame.payload.get("chat"), "joined chat")?;
        self.cache_chats(std::slice::from_ref(&chat));
        Ok(chat)
    }

    /// Page through the member list of a group.  `marker` is the continuation
    /// cursor from the previous page, if any.
    pub async fn chat_members(
        &self,
        chat_id: i64,
        marker: Option<i64>,
        count: i32,
    ) -> Result<Vec<Member>, Error> {
        let mut payload = Map::new();
        payload.insert("type".into(), json!("MEMBER"));
        if let Some(marker) = marker {
            payload.insert("marker".into(), json!(marker));
        }
        payload.insert("chatId".into(), json!(chat_id));
        payload.insert("count".into(), json!(count));

        let frame = self.call(opcode::CHAT_MEMBERS, Value::Object(payload)).await?;
        decode(frame.payload.get("members"), "chat members")
    }

    /// Create a group chat with the given members.  Returns the new chat and
    /// the service message announcing its creation.
    pub async fn create_group(
        &self,
        title: &str,
        user_ids: &[i64],
        notify: bool,
    ) -> Result<(Chat, Message), Error> {
        let frame = self
            .call(
                opcode::MSG_SEND,
                json!({
                    "message": {
                        "cid": chrono::Utc::now().timestamp_millis(),
                        "attaches": [{
                            "_type":    "CONTROL",
                            "event":    "new",
                            "chatType": "CHAT",
                            "title":    title,
                            "userIds":  user_ids,
                        }],
                    },
                    "notify": notify,
                }),
            )
            .await?;
        let chat: Chat = decode(frame.payload.get("chat"), "created chat")?;
        let message: Message = decode(Some(&frame.payload), "creation message")?;
        self.cache_chats(std::slice::from_ref(&chat));
        Ok((chat, message))
    }

    /// Add users to a group.  `show_history` opens past messages to them.
    pub async fn invite_users(
        &self,
        chat_id: i64,
        user_ids: &[i64],
        show_history: bool,
    ) -> Result<(), Error> {
        let frame = self
            .call(
                opcode::CHAT_MEMBERS_UPDATE,
                json!({
                    "chatId":      chat_id,
                    "userIds":     user_ids,
                    "showHistory": show_history,
                    "operation":   "add",
                }),
            )
            .await?;
        self.cache_chat_from(&frame.payload);
        Ok(())
    }

    /// Remove users from a group.  `clean_msg_period` additionally erases
    /// their messages from the last that many hours (0 keeps everything).
    pub async fn remove_users(
        &self,
        chat_id: i64,
        user_ids: &[i64],
        clean_msg_period: i32,
    ) -> Result<(), Error> {
        let frame = self
            .call(
                opcode::CHAT_MEMBERS_UPDATE,
                json!({
                    "chatId":         chat_id,
                    "userIds":        user_ids,
                    "operation":      "remove",
                    "cleanMsgPeriod": clean_msg_period,
                }),
            )
            .await?;
        self.cache_chat_from(&frame.payload);
        Ok(())
    }

    /// Apply permission toggles to a group.  Unset toggles are left as they
    /// are on the server.
    pub async fn change_group_settings(
        &self,
        chat_id: i64,
        settings: GroupSettings,
    ) -> Result<(), Error> {
        let frame = self
            .call(
                opcode::CHAT_UPDATE,
                json!({
                    "chatId":  chat_id,
                    "options": settings.into_options(),
                }),
            )
            .await?;
        self.cache_chat_from(&frame.payload);
        Ok(())
    }

    /// Change a group's title and/or description.  `None` leaves the field
    /// untouched.
    pub async fn change_group_profile(
        &self,
        chat_id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), Error> {
        let mut payload = Map::new();
        payload.insert("chatId".into(), json!(chat_id));
        if let Some(name) = name {
            payload.insert("theme".into(), json!(name));
        }
        if let Some(description) = description {
            payload.insert("description".into(), json!(description));
        }

        let frame = self.call(opcode::CHAT_UPDATE, Value::Object(payload)).await?;
        self.cache_chat_from(&frame.payload);
        Ok(())
    }

    /// Revoke a group's current private invite link and mint a new one.
    /// Returns the refreshed chat record carrying the new link.
    pub async fn rework_invite_link(&self, chat_id: i64) -> Result<Chat, Error> {
        let frame = self
            .call(
                opcode::CHAT_UPDATE,
                json!({
                    "revokePrivateLink": true,
                    "chatId":            chat_id,
                }),
            )
            .await?;
        let chat: Chat = decode(frame.payload.get("chat"), "chat with reworked link")?;
        self.cache_chats(std::slice::from_ref(&chat));
        Ok(chat)
    }

    /// Look up a public channel by its `max.ru` short name, caching the
    /// channel record when the server includes one.
    pub async fn resolve_channel_by_name(&self, name: &str) -> Result<(), Error> {
        let frame = self
            .call(
                opcode::LINK_INFO,
                json!({"link": format!("https://max.ru/{name}")}),
            )
            .await?;
        self.cache_chat_from(&frame.payload);
        Ok(())
    }

    /// Search the member list of a group by a free-form query string.
    pub async fn find_members(&self, chat_id: i64, query: &str) -> Result<Vec<Member>, Error> {
        let frame = self
            .call(
                opcode::CHAT_MEMBERS,
                json!({
                    "type":   "MEMBER",
                    "query":  query,
                    "chatId": chat_id,
                }),
            )
            .await?;
        decode(frame.payload.get("members"), "matching members")
    }

    fn cache_chats(&self, chats: &[Chat]) {
        let mut cache = self.chats_cache();
        for chat in chats {
            cache.insert(chat.id, chat.clone());
        }
    }

    fn cache_chat_from(&self, payload: &Value) {
        if let Some(raw) = payload.get("chat") {
            if let Ok(chat) = serde_json::from_value::<Chat>(raw.clone()) {
                self.chats_cache().insert(chat.id, chat);
            }
        }
    }
}

// ─── Contacts ─────────────────────────────────────────────────────────────────

impl Client {
    /// Fetch user profiles by id.
    pub async fn contacts(&self, contact_ids: &[i64]) -> Result<Vec<User>, Error> {
        let frame = self
            .call(opcode::CONTACT_INFO, json!({"contactIds": contact_ids}))
            .await?;
        decode(frame.payload.get("contacts"), "contacts")
    }

    /// Look a user up by phone number.
    pub async fn contact_by_phone(&self, phone: &str) -> Result<Contact, Error> {
        validate_phone(phone)?;
        let frame = self
            .call(opcode::CONTACT_INFO_BY_PHONE, json!({"phone": phone}))
            .await?;
        decode(frame.payload.get("contact"), "contact")
    }

    /// Add a user to the address book.
    pub async fn add_contact(&self, contact_id: i64) -> Result<(), Error> {
        self.call(
            opcode::CONTACT_UPDATE,
            json!({"contactId": contact_id, "action": "ADD"}),
        )
        .await
        .map(drop)
    }

    /// Remove a user from the address book.
    pub async fn remove_contact(&self, contact_id: i64) -> Result<(), Error> {
        self.call(
            opcode::CONTACT_UPDATE,
            json!({"contactId": contact_id, "action": "REMOVE"}),
        )
        .await
        .map(drop)
    }
}

// ─── Folders ──────────────────────────────────────────────────────────────────

impl Client {
    /// Fetch the folder list.  `folder_sync` is the cursor from the previous
    /// fetch (0 for everything).
    pub async fn folders(&self, folder_sync: i64) -> Result<FolderList, Error> {
        let frame = self
            .call(opcode::FOLDERS_GET, json!({"folderSync": folder_sync}))
            .await?;
        decode(Some(&frame.payload), "folder list")
    }

    /// Create or update a folder.
    pub async fn update_folder(&self, folder: &Folder) -> Result<(), Error> {
        self.call(
            opcode::FOLDERS_UPDATE,
            json!({
                "id":      folder.id,
                "title":   folder.title,
                "include": folder.include,
                "filters": [],
                "options": [],
            }),
        )
        .await
        .map(drop)
    }

    /// Delete folders by id.
    pub async fn delete_folders(&self, folder_ids: &[&str]) -> Result<(), Error> {
        self.call(opcode::FOLDERS_DELETE, json!({"folderIds": folder_ids}))
            .await
            .map(drop)
    }
}

// ─── Profile & sessions ───────────────────────────────────────────────────────

impl Client {
    /// Change the account's display name and description.
    pub async fn change_profile(
        &self,
        first_name: &str,
        last_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Me, Error> {
        let mut payload = Map::new();
        payload.insert("firstName".into(), json!(first_name));
        if let Some(last) = last_name {
            payload.insert("lastName".into(), json!(last));
        }
        if let Some(text) = description {
            payload.insert("description".into(), json!(text));
        }
        let frame = self.call(opcode::PROFILE, Value::Object(payload)).await?;
        decode(frame.payload.pointer("/profile/contact"), "profile")
    }

    /// List the account's active device sessions.
    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, Error> {
        let frame = self.call(opcode::SESSIONS_INFO, json!({})).await?;
        decode(frame.payload.get("sessions"), "sessions")
    }

    /// Invalidate the session server-side and forget the stored token.
    pub async fn logout(&self) -> Result<(), Error> {
        self.call(opcode::LOGOUT, json!({})).await?;
        self.session_store().clear_token()?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(value: Option<&Value>, what: &str) -> Result<T, Error> {
    let value = value.ok_or_else(|| Error::Decode(format!("response carries no {what}")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| Error::Decode(format!("undecodable {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_validation_accepts_plus_and_digits() {
        assert!(validate_phone("+79991234567").is_ok());
        assert!(validate_phone("79991234567").is_ok());
    }

    #[test]
    fn phone_validation_rejects_garbage() {
        assert!(validate_phone("").is_err());
        assert!(validate_phone("+7 999 123 45 67").is_err());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("+1234567890123456").is_err());
    }

    #[test]
    fn outgoing_message_payload_shape() {
        let payload = OutgoingMessage::text("hi").reply_to(42).silent().into_payload(7);
        assert_eq!(payload["chatId"], 7);
        assert_eq!(payload["notify"], false);
        assert_eq!(payload["message"]["text"], "hi");
        assert_eq!(payload["message"]["link"]["type"], "REPLY");
        assert_eq!(payload["message"]["link"]["messageId"], "42");
        assert!(payload["message"]["cid"].as_i64().unwrap() > 0);
    }

    #[test]
    fn outgoing_message_defaults_notify() {
        let payload = OutgoingMessage::text("hi").into_payload(7);
        assert_eq!(payload["notify"], true);
        assert!(payload["message"].get("link").is_none());
    }

    #[test]
    fn group_settings_send_only_what_was_set() {
        let options = GroupSettings::new()
            .all_can_pin_message(true)
            .only_admin_can_call(false)
            .into_options();
        assert_eq!(options.len(), 2);
        assert_eq!(options["allCanPinMessage"], true);
        assert_eq!(options["onlyAdminCanCall"], false);
        assert!(!options.contains_key("onlyAdminCanAddMember"));
    }
}
