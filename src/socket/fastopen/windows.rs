//! Windows: `ConnectEx` with a caller-owned `OVERLAPPED`.
//!
//! `ConnectEx` is a Winsock extension and has to be looked up through
//! `WSAIoctl`; the pointer is resolved once per address family, since a
//! layered provider may hand out a different one for each. The socket must
//! already be bound (`ConnectEx` rejects unbound sockets with `WSAEINVAL`).
//!
//! After a successful connect, [`finish_connect`] must run before the
//! socket is used with `getpeername`, `shutdown` and friends.

use super::outcome::{overlapped_outcome, ErrorCodes, OverlappedStart};
use super::{CompletionToken, ConnectOutcome, ConnectRequest, FailureKind, FastOpenConnect, SocketRef};
use ::windows::Win32::Foundation::{BOOL, HANDLE};
use ::windows::Win32::Networking::WinSock::{
    setsockopt, WSAIoctl, IPPROTO_TCP, LPFN_CONNECTEX, SIO_GET_EXTENSION_FUNCTION_POINTER,
    SOCKET, SOCKET_ERROR, SOL_SOCKET, SO_UPDATE_CONNECT_CONTEXT, WSAID_CONNECTEX,
};
use ::windows::Win32::System::IO::GetOverlappedResult;
use socket2::SockAddr;
use std::ffi::c_void;
use std::io;
use std::net::SocketAddr;
use std::os::windows::io::AsRawSocket;
use std::sync::OnceLock;

const WSAEINVAL: i32 = 10022;
/// `TCP_FASTOPEN` from `<ws2ipdef.h>`.
const TCP_FASTOPEN: i32 = 15;

static CONNECT_EX_V4: OnceLock<LPFN_CONNECTEX> = OnceLock::new();
static CONNECT_EX_V6: OnceLock<LPFN_CONNECTEX> = OnceLock::new();

fn connect_ex_cache(addr: &SocketAddr) -> &'static OnceLock<LPFN_CONNECTEX> {
    match addr {
        SocketAddr::V4(_) => &CONNECT_EX_V4,
        SocketAddr::V6(_) => &CONNECT_EX_V6,
    }
}

fn last_error() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(WSAEINVAL)
}

fn raw(socket: &SocketRef<'_>) -> SOCKET {
    SOCKET(socket.as_raw_socket() as usize)
}

/// Looks up `ConnectEx` through `socket`. Only a successful lookup is cached.
fn connect_ex(
    socket: SOCKET,
    cache: &'static OnceLock<LPFN_CONNECTEX>,
) -> Result<LPFN_CONNECTEX, i32> {
    if let Some(func) = cache.get() {
        return Ok(*func);
    }

    let guid = WSAID_CONNECTEX;
    let mut func: LPFN_CONNECTEX = None;
    let mut returned = 0u32;

    // SAFETY: in/out buffers are locals sized exactly as passed.
    let rc = unsafe {
        WSAIoctl(
            socket,
            SIO_GET_EXTENSION_FUNCTION_POINTER,
            Some(&guid as *const _ as *const c_void),
            std::mem::size_of_val(&guid) as u32,
            Some(&mut func as *mut _ as *mut c_void),
            std::mem::size_of::<LPFN_CONNECTEX>() as u32,
            &mut returned,
            None,
            None,
        )
    };
    if rc == SOCKET_ERROR {
        return Err(last_error());
    }
    if func.is_none() {
        return Err(WSAEINVAL);
    }
    Ok(*cache.get_or_init(|| func))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectExConnector;

impl FastOpenConnect for ConnectExConnector {
    fn attempt(&self, request: ConnectRequest<'_>) -> ConnectOutcome {
        let len = match request.payload_len() {
            Ok(len) => len,
            Err(kind) => return ConnectOutcome::Failed(kind),
        };
        let Some(token) = request.completion else {
            return ConnectOutcome::Failed(FailureKind::Errno(WSAEINVAL));
        };

        let socket = raw(&request.socket);
        let func = match connect_ex(socket, connect_ex_cache(&request.addr)) {
            Ok(Some(func)) => func,
            Ok(None) => return ConnectOutcome::Failed(FailureKind::Errno(WSAEINVAL)),
            Err(code) => return ConnectOutcome::Failed(FailureKind::Errno(code)),
        };
        let addr = SockAddr::from(request.addr);
        let payload = request.payload;

        overlapped_outcome(
            len,
            &ErrorCodes::native(),
            token,
            request.blocking,
            |token: &mut CompletionToken| {
                let mut sent = 0u32;
                // SAFETY: address and payload are borrowed for the request;
                // the OVERLAPPED is caller-owned and outlives the operation.
                let ok = unsafe {
                    func(
                        socket,
                        addr.as_ptr().cast(),
                        addr.len() as i32,
                        payload.as_ptr() as *const c_void,
                        len as u32,
                        &mut sent,
                        &mut token.overlapped,
                    )
                };
                if ok.as_bool() {
                    OverlappedStart::Completed(sent as usize)
                } else {
                    OverlappedStart::Failed(last_error())
                }
            },
            |token: &mut CompletionToken, blocking| {
                let mut transferred = 0u32;
                // SAFETY: the OVERLAPPED was just handed to ConnectEx on this socket.
                let res = unsafe {
                    GetOverlappedResult(
                        HANDLE(socket.0 as *mut c_void),
                        &token.overlapped,
                        &mut transferred,
                        BOOL::from(blocking),
                    )
                };
                match res {
                    Ok(()) => Ok(transferred as usize),
                    Err(_) => Err(last_error()),
                }
            },
        )
    }
}

/// Completes the connect so the socket behaves like one connected through
/// `connect` (`SO_UPDATE_CONNECT_CONTEXT`).
pub fn finish_connect(socket: SocketRef<'_>) -> io::Result<()> {
    // SAFETY: option without payload on a borrowed, open socket.
    let rc = unsafe { setsockopt(raw(&socket), SOL_SOCKET, SO_UPDATE_CONNECT_CONTEXT, None) };
    if rc == SOCKET_ERROR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Client sockets opt in per socket with `TCP_FASTOPEN` before `ConnectEx`.
pub fn enable_client_fast_open(socket: SocketRef<'_>) -> io::Result<()> {
    let enabled = 1u32.to_ne_bytes();
    // SAFETY: plain setsockopt on a borrowed, open socket.
    let rc = unsafe { setsockopt(raw(&socket), IPPROTO_TCP.0, TCP_FASTOPEN, Some(&enabled)) };
    if rc == SOCKET_ERROR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use socket2::{Domain, Socket, Type};
    use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};
    use std::os::windows::io::AsSocket;

    #[test]
    fn test_missing_token_rejected() {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, None).unwrap();
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 9));
        let outcome =
            ConnectExConnector.attempt(ConnectRequest::new(socket.as_socket(), addr, b"x"));
        assert_eq!(outcome, ConnectOutcome::Failed(FailureKind::Errno(WSAEINVAL)));
    }

    #[test]
    fn test_blocking_loopback_connect_ex() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();

        let socket = Socket::new(Domain::IPV4, Type::STREAM, None).unwrap();
        socket
            .bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)).into())
            .unwrap();
        let mut token = CompletionToken::new();

        let outcome = ConnectExConnector.attempt(
            ConnectRequest::new(socket.as_socket(), addr, b"ping").completion(&mut token),
        );

        assert_eq!(outcome, ConnectOutcome::BytesTransferred(4));
        finish_connect(socket.as_socket()).unwrap();
        assert!(socket.peer_addr().is_ok());
    }

    #[test]
    fn test_lookup_cached_per_family() {
        let v4 = SocketAddr::from((Ipv4Addr::LOCALHOST, 9));
        let v6 = SocketAddr::from((Ipv6Addr::LOCALHOST, 9));
        assert!(std::ptr::eq(connect_ex_cache(&v4), &CONNECT_EX_V4));
        assert!(std::ptr::eq(connect_ex_cache(&v6), &CONNECT_EX_V6));

        let socket = Socket::new(Domain::IPV6, Type::STREAM, None).unwrap();
        let func = connect_ex(raw(&socket.as_socket()), connect_ex_cache(&v6)).unwrap();
        assert!(func.is_some());
        assert!(CONNECT_EX_V6.get().is_some());
    }

    #[test]
    fn test_blocking_loopback_connect_ex_v6() {
        let listener = match TcpListener::bind((Ipv6Addr::LOCALHOST, 0)) {
            Ok(listener) => listener,
            // No IPv6 loopback on this host.
            Err(_) => return,
        };
        let addr = listener.local_addr().unwrap();

        let socket = Socket::new(Domain::IPV6, Type::STREAM, None).unwrap();
        socket
            .bind(&SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)).into())
            .unwrap();
        let mut token = CompletionToken::new();

        let outcome = ConnectExConnector.attempt(
            ConnectRequest::new(socket.as_socket(), addr, b"ping").completion(&mut token),
        );

        assert_eq!(outcome, ConnectOutcome::BytesTransferred(4));
        finish_connect(socket.as_socket()).unwrap();
    }
}
