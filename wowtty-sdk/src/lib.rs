//! Session-layer SDK for the WowTTY console client.
//!
//! The client core never touches sockets or frames directly. It holds a
//! [`client::Connection`] for fire-and-forget requests and consumes
//! [`event::Event`]s from a single ordered channel; [`engine::connect`] wires
//! both to a live server. Replies to requests are events like everything
//! else, so the consumer's reactor never blocks on the network.

pub mod client;
pub mod engine;
pub mod event;
pub mod packet;
pub mod types;
pub mod wire;

pub use client::{Chat, Connection, Request, Social};
pub use event::Event;
pub use packet::Packet;
