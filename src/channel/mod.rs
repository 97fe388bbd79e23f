// src/channel/mod.rs

//! Side-channel server children report progress through.
//!
//! - [`server`] binds the listener (retrying a range of ports) and queues
//!   accepted connections.
//! - [`connection`] turns one socket into an outbound sender plus an ordered
//!   inbound queue of decoded [`crate::protocol::Message`]s.

pub mod connection;
pub mod server;

pub use connection::{ChildEnd, Connection, Recv};
pub use server::ChannelServer;
