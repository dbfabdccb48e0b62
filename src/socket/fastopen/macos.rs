//! macOS / iOS: `connectx(2)` with `CONNECT_DATA_IDEMPOTENT`.
//!
//! The destination list is always a single endpoint and the payload is a
//! one-entry gather buffer. The kernel writes the queued byte count back
//! through `len` even when the call reports `EINPROGRESS`, and may queue
//! plaintext SYN data without a cookie, so that count is authoritative.

use super::outcome::{connectx_outcome, ConnectxResult, ErrorCodes};
use super::{ConnectOutcome, ConnectRequest, FastOpenConnect, SocketRef};
use socket2::SockAddr;
use std::io;
use std::os::fd::AsRawFd;

type SaeAssocId = u32;
type SaeConnId = u32;

const SAE_ASSOCID_ANY: SaeAssocId = 0;
const CONNECT_DATA_IDEMPOTENT: libc::c_uint = 0x2;
/// `TCP_FASTOPEN_FORCE_ENABLE` from `<netinet/tcp.h>`.
const TCP_FASTOPEN_FORCE_ENABLE: libc::c_int = 0x218;

#[repr(C)]
struct SaEndpoints {
    sae_srcif: libc::c_uint,
    sae_srcaddr: *const libc::sockaddr,
    sae_srcaddrlen: libc::socklen_t,
    sae_dstaddr: *const libc::sockaddr,
    sae_dstaddrlen: libc::socklen_t,
}

extern "C" {
    fn connectx(
        socket: libc::c_int,
        endpoints: *const SaEndpoints,
        associd: SaeAssocId,
        flags: libc::c_uint,
        iov: *const libc::iovec,
        iovcnt: libc::c_uint,
        len: *mut libc::size_t,
        connid: *mut SaeConnId,
    ) -> libc::c_int;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectxConnector;

impl FastOpenConnect for ConnectxConnector {
    fn attempt(&self, request: ConnectRequest<'_>) -> ConnectOutcome {
        let len = match request.payload_len() {
            Ok(len) => len,
            Err(kind) => return ConnectOutcome::Failed(kind),
        };

        let fd = request.socket.as_raw_fd();
        let addr = SockAddr::from(request.addr);

        connectx_outcome(len, &ErrorCodes::native(), || {
            let endpoints = SaEndpoints {
                sae_srcif: 0,
                sae_srcaddr: std::ptr::null(),
                sae_srcaddrlen: 0,
                sae_dstaddr: addr.as_ptr().cast(),
                sae_dstaddrlen: addr.len(),
            };
            let iov = libc::iovec {
                iov_base: request.payload.as_ptr() as *mut libc::c_void,
                iov_len: len,
            };
            let mut sent: libc::size_t = 0;

            // SAFETY: `endpoints`, `iov` and `sent` outlive the call; the
            // address and payload are borrowed for the whole request.
            let rc = unsafe {
                connectx(
                    fd,
                    &endpoints,
                    SAE_ASSOCID_ANY,
                    CONNECT_DATA_IDEMPOTENT,
                    &iov,
                    1,
                    &mut sent,
                    std::ptr::null_mut(),
                )
            };
            let error = if rc < 0 {
                Some(io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO))
            } else {
                None
            };
            ConnectxResult { error, sent }
        })
    }
}

/// Forces client-side fast open on this socket regardless of the
/// heuristics that would otherwise disable it for the peer.
pub fn enable_client_fast_open(socket: SocketRef<'_>) -> io::Result<()> {
    const ENABLED: libc::c_int = 0x1;
    // SAFETY: plain setsockopt on a borrowed, open descriptor.
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_TCP,
            TCP_FASTOPEN_FORCE_ENABLE,
            &ENABLED as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use socket2::{Domain, Socket, Type};
    use std::net::{Ipv4Addr, TcpListener};
    use std::os::fd::AsFd;

    #[test]
    fn test_loopback_connectx() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();

        let socket = Socket::new(Domain::IPV4, Type::STREAM, None).unwrap();
        let outcome =
            ConnectxConnector.attempt(ConnectRequest::new(socket.as_fd(), addr, b"ping"));

        match outcome {
            ConnectOutcome::BytesTransferred(n) => assert!(n <= 4),
            ConnectOutcome::PendingNoCookie => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
