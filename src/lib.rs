//! # tfoconnect
//!
//! Cross-platform TCP Fast Open "connect-with-data" for Rust.
//!
//! Starting a TCP connection and sending the first bytes in the same round
//! trip takes a different syscall on every OS, and each reports back through
//! a different channel. `tfoconnect` puts one contract in front of them:
//! attempt the connect, learn how many payload bytes went out with the SYN,
//! and observe connection completion separately.
//!
//! ## Platforms
//!
//! - **Linux / Android**: `sendto` with `MSG_FASTOPEN`
//! - **macOS / iOS**: `connectx` with `CONNECT_DATA_IDEMPOTENT`
//! - **Windows**: `ConnectEx` with a caller-owned `OVERLAPPED`
//! - **Other targets**: every attempt fails with `Unsupported`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tfoconnect::socket::config::FastOpenConfig;
//! use tfoconnect::socket::tfostream::FastOpenStream;
//!
//! #[tokio::main]
//! async fn main() {
//!     let addr = "127.0.0.1:8080".parse().unwrap();
//!     let stream = FastOpenStream::connect(addr, b"GET / HTTP/1.1\r\n\r\n", &FastOpenConfig::new())
//!         .await
//!         .unwrap();
//!     println!("SYN carried {} bytes", stream.fast_open_bytes());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions and OS error mapping
//! - [`socket`] - The fast-open connector, its config and the tokio stream

pub mod base;
pub mod socket;
