//! Socket-level connect-with-data.
//!
//! - [`fastopen`]: the per-platform TCP Fast Open connector
//! - [`config`]: knobs for the stream-level connect
//! - [`tfostream`]: tokio stream that connects, carries initial data in the
//!   SYN when possible, and writes the rest after the handshake

pub mod config;
pub mod fastopen;
pub mod tfostream;
