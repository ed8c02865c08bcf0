//! The fixed opcode contract.
//!
//! These values identify a frame's request/response type or push-notification
//! category and must match the server bit-exactly.

// ─── Session / auth ───────────────────────────────────────────────────────────

pub const SESSION_INIT:  i32 = 6;
pub const PROFILE:       i32 = 16;
pub const AUTH_REQUEST:  i32 = 17;
pub const AUTH:          i32 = 18;
pub const LOGIN:         i32 = 19;
pub const LOGOUT:        i32 = 20;
pub const SYNC:          i32 = 21;
pub const CONFIG:        i32 = 22;
pub const AUTH_CONFIRM:  i32 = 23;
pub const SESSIONS_INFO: i32 = 96;

// ─── Contacts ─────────────────────────────────────────────────────────────────

pub const CONTACT_INFO:          i32 = 32;
pub const CONTACT_UPDATE:        i32 = 34;
pub const CONTACT_INFO_BY_PHONE: i32 = 46;

// ─── Chats ────────────────────────────────────────────────────────────────────

pub const CHAT_INFO:           i32 = 48;
pub const CHAT_HISTORY:        i32 = 49;
pub const CHAT_UPDATE:         i32 = 55;
pub const CHAT_JOIN:           i32 = 57;
pub const CHAT_MEMBERS:        i32 = 59;
pub const CHAT_MEMBERS_UPDATE: i32 = 77;

// ─── Messages ─────────────────────────────────────────────────────────────────

pub const MSG_SEND:            i32 = 64;
pub const MSG_DELETE:          i32 = 66;
pub const MSG_EDIT:            i32 = 67;
pub const MSG_REACTION:        i32 = 178;
pub const MSG_CANCEL_REACTION: i32 = 179;
pub const MSG_GET_REACTIONS:   i32 = 180;

// ─── Folders ──────────────────────────────────────────────────────────────────

pub const FOLDERS_GET:    i32 = 272;
pub const FOLDERS_UPDATE: i32 = 274;
pub const FOLDERS_DELETE: i32 = 276;

// ─── Media ────────────────────────────────────────────────────────────────────

pub const PHOTO_UPLOAD:  i32 = 80;
pub const VIDEO_UPLOAD:  i32 = 82;
pub const VIDEO_PLAY:    i32 = 83;
pub const FILE_UPLOAD:   i32 = 87;
pub const FILE_DOWNLOAD: i32 = 88;
pub const LINK_INFO:     i32 = 89;

// ─── Server pushes ────────────────────────────────────────────────────────────

pub const NOTIF_MESSAGE:                i32 = 128;
pub const NOTIF_TYPING:                 i32 = 129;
pub const NOTIF_CONTACT:                i32 = 131;
pub const NOTIF_CHAT:                   i32 = 135;
pub const NOTIF_ATTACH:                 i32 = 136;
pub const NOTIF_MSG_DELETE:             i32 = 142;
pub const NOTIF_MSG_REACTIONS_CHANGED:  i32 = 155;
