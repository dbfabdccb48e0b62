//! Linux / Android: `sendto(2)` with `MSG_FASTOPEN`.
//!
//! The kernel starts the handshake and carries the payload in the SYN when
//! it holds a cookie for the peer. Without one it sends a cookie request,
//! and a non-blocking socket reports `EINPROGRESS` with nothing written.
//!
//! Client-side TFO is governed by bit 0 of `net.ipv4.tcp_fastopen`; when
//! it is cleared the call fails with `EOPNOTSUPP`, passed through as
//! `Errno`.

use super::outcome::{send_to_outcome, ErrorCodes};
use super::{ConnectOutcome, ConnectRequest, FastOpenConnect, SocketRef};
use socket2::{SockAddr, SockRef};
use std::io;

#[derive(Debug, Clone, Copy, Default)]
pub struct SendToConnector;

impl FastOpenConnect for SendToConnector {
    fn attempt(&self, request: ConnectRequest<'_>) -> ConnectOutcome {
        let len = match request.payload_len() {
            Ok(len) => len,
            Err(kind) => return ConnectOutcome::Failed(kind),
        };

        let socket = SockRef::from(&request.socket);
        let addr = SockAddr::from(request.addr);

        send_to_outcome(len, &ErrorCodes::native(), || {
            socket
                .send_to_with_flags(request.payload, &addr, libc::MSG_FASTOPEN)
                .map_err(|e| e.raw_os_error().unwrap_or(libc::EIO))
        })
    }
}

/// Nothing to set per socket: `MSG_FASTOPEN` itself requests fast open.
pub fn enable_client_fast_open(_socket: SocketRef<'_>) -> io::Result<()> {
    Ok(())
}
