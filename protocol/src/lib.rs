//! Wire protocol shared between the game server and its clients.
//!
//! Messages are JSON objects `{ "name": "...", "data": ... }` framed over a
//! full-duplex text WebSocket channel. This crate owns only the shapes and
//! names of those messages; framing and transport are handled by the
//! `game-server` binary.

pub mod close_codes;
pub mod env;
pub mod envelope;
pub mod events;
pub mod names;

pub use envelope::Envelope;
