//! TCP Fast Open "connect-with-data".
//!
//! One contract over three OS mechanisms: start a TCP connection and carry
//! an initial payload in the same round trip, report how many payload
//! bytes went out (or were queued), and leave connection completion to be
//! observed separately through the usual readiness channel.
//!
//! ## Strategies
//! - **Linux / Android** ([`SendToConnector`]): `sendto` with `MSG_FASTOPEN`
//! - **macOS / iOS** ([`ConnectxConnector`]): `connectx` with
//!   `CONNECT_DATA_IDEMPOTENT` and a single-entry gather buffer
//! - **Windows** ([`ConnectExConnector`]): `ConnectEx` with a caller-owned
//!   [`CompletionToken`] (`OVERLAPPED`)
//! - **Anything else** ([`UnsupportedConnector`]): fails with
//!   [`FailureKind::Unsupported`] without touching the socket
//!
//! [`PlatformConnector`] names the strategy compiled for the current
//! target. The connector performs no logging and keeps no state between
//! calls.
//!
//! A socket must not have a second connect-type call issued against it
//! while an [`attempt`] on it is in flight, and a [`CompletionToken`]
//! must not be shared by two concurrent calls.

pub mod outcome;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

pub mod unsupported;

pub use unsupported::UnsupportedConnector;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use linux::SendToConnector;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use macos::ConnectxConnector;

#[cfg(target_os = "windows")]
pub use self::windows::ConnectExConnector;

use crate::base::neterror::NetError;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

#[cfg(unix)]
pub use std::os::fd::BorrowedFd as SocketRef;

#[cfg(windows)]
pub use std::os::windows::io::BorrowedSocket as SocketRef;

/// Strategy compiled for this target.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub type PlatformConnector = SendToConnector;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub type PlatformConnector = ConnectxConnector;

#[cfg(target_os = "windows")]
pub type PlatformConnector = ConnectExConnector;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "windows"
)))]
pub type PlatformConnector = UnsupportedConnector;

/// Largest payload a request may carry: the count must fit a signed 32-bit
/// native length.
pub const MAX_PAYLOAD_LEN: usize = i32::MAX as usize;

/// Why a fast-open attempt produced no usable byte count.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    #[error("TFO data too large")]
    PayloadTooLarge,
    /// Raw platform error code, as reported by the syscall or wait.
    #[error("os error {0}")]
    Errno(i32),
    #[error("TCP Fast Open is not supported on this platform")]
    Unsupported,
}

impl FailureKind {
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            FailureKind::Errno(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<FailureKind> for NetError {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::PayloadTooLarge => NetError::MsgTooBig,
            FailureKind::Unsupported => NetError::NotImplemented,
            FailureKind::Errno(code) => NetError::from_os_error(code),
        }
    }
}

/// Normalized result of one connect-with-data call.
///
/// A nonzero byte count says nothing about whether the connection has
/// completed; that is observed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// `n <= payload.len()` bytes were sent or queued with the SYN.
    BytesTransferred(usize),
    /// No fast-open cookie for this peer yet. Nothing was sent; connect
    /// and write the payload the ordinary way.
    PendingNoCookie,
    Failed(FailureKind),
}

impl ConnectOutcome {
    /// Bytes carried by the fast-open path, `Some(0)` when no cookie was available.
    pub fn bytes_sent(&self) -> Option<usize> {
        match self {
            ConnectOutcome::BytesTransferred(n) => Some(*n),
            ConnectOutcome::PendingNoCookie => Some(0),
            ConnectOutcome::Failed(_) => None,
        }
    }

    /// Bytes of a `len`-byte payload still to be written the ordinary way.
    pub fn remaining(&self, len: usize) -> Option<usize> {
        self.bytes_sent().map(|n| len.saturating_sub(n))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ConnectOutcome::PendingNoCookie)
    }

    pub fn into_result(self) -> Result<usize, FailureKind> {
        match self {
            ConnectOutcome::BytesTransferred(n) => Ok(n),
            ConnectOutcome::PendingNoCookie => Ok(0),
            ConnectOutcome::Failed(kind) => Err(kind),
        }
    }
}

/// Caller-owned completion context for the overlapped strategy.
///
/// The connector zeroes it at the start of every call and never keeps a
/// reference past return. When a non-blocking wait leaves the operation
/// outstanding, the token must stay alive and in place until the socket
/// is closed or the connect finishes.
#[cfg(windows)]
#[derive(Default)]
pub struct CompletionToken {
    pub(crate) overlapped: ::windows::Win32::System::IO::OVERLAPPED,
}

/// Placeholder so [`ConnectRequest`] has the same shape on every target;
/// only the overlapped strategy reads it.
#[cfg(not(windows))]
#[derive(Default)]
pub struct CompletionToken {
    _private: (),
}

impl CompletionToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken").finish_non_exhaustive()
    }
}

/// Everything one attempt needs. Borrowed for the call only.
#[derive(Debug)]
pub struct ConnectRequest<'a> {
    /// Connection-oriented, unconnected socket of `addr`'s family.
    pub socket: SocketRef<'a>,
    pub addr: SocketAddr,
    pub payload: &'a [u8],
    /// Whether the overlapped strategy waits for completion.
    pub blocking: bool,
    pub completion: Option<&'a mut CompletionToken>,
}

impl<'a> ConnectRequest<'a> {
    pub fn new(socket: SocketRef<'a>, addr: SocketAddr, payload: &'a [u8]) -> Self {
        Self {
            socket,
            addr,
            payload,
            blocking: true,
            completion: None,
        }
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn completion(mut self, token: &'a mut CompletionToken) -> Self {
        self.completion = Some(token);
        self
    }

    /// Payload length, or `PayloadTooLarge` when it cannot be expressed
    /// as a native signed 32-bit count.
    pub fn payload_len(&self) -> Result<usize, FailureKind> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(FailureKind::PayloadTooLarge);
        }
        Ok(self.payload.len())
    }
}

/// A connect-with-data strategy.
pub trait FastOpenConnect {
    fn attempt(&self, request: ConnectRequest<'_>) -> ConnectOutcome;
}

/// Runs `request` through the strategy compiled for this target.
pub fn attempt(request: ConnectRequest<'_>) -> ConnectOutcome {
    PlatformConnector::default().attempt(request)
}

/// Best-effort per-socket switch some platforms need before a client
/// fast-open connect. A no-op where the system setting alone governs it.
pub fn enable_client_fast_open(socket: SocketRef<'_>) -> std::io::Result<()> {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        linux::enable_client_fast_open(socket)
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        macos::enable_client_fast_open(socket)
    }

    #[cfg(target_os = "windows")]
    {
        self::windows::enable_client_fast_open(socket)
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "windows"
    )))]
    {
        let _ = socket;
        Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
    }
}
