//! # oneme-proto
//!
//! Wire layer for the Max messaging protocol.
//!
//! Everything the server and client exchange travels over one WebSocket
//! connection as JSON frames (see [`Frame`]).  This crate defines the frame
//! envelope, the protocol constants, the opcode table and the typed payload
//! records — no I/O, no async.

#![deny(unsafe_code)]

pub mod frame;
pub mod opcode;
pub mod types;

pub use frame::{CMD_REQUEST, Frame, PROTOCOL_VERSION};
