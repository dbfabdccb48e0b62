use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Generic Errors
    #[error("IO pending")]
    IoPending,
    #[error("Generic failure")]
    Failed,
    #[error("Operation aborted")]
    Aborted,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Operation timed out")]
    TimedOut,
    #[error("Access denied")]
    AccessDenied,
    #[error("Not implemented")]
    NotImplemented,
    #[error("Insufficient resources")]
    InsufficientResources,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Socket is connected")]
    SocketIsConnected,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Internet disconnected")]
    InternetDisconnected,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Network access denied")]
    NetworkAccessDenied,
    #[error("Message too big")]
    MsgTooBig,
    #[error("Address in use")]
    AddressInUse,
    #[error("No buffer space")]
    NoBufferSpace,

    /// OS error with no portable equivalent. The raw code is kept verbatim.
    #[error("System error {0}")]
    Os(i32),

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    /// Chromium-compatible numeric code (`net_error_list.h`).
    ///
    /// `Os` has no slot in that table and reports `ERR_FAILED`.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::IoPending => -1,
            NetError::Failed => -2,
            NetError::Aborted => -3,
            NetError::InvalidArgument => -4,
            NetError::TimedOut => -7,
            NetError::AccessDenied => -10,
            NetError::NotImplemented => -11,
            NetError::InsufficientResources => -12,
            NetError::OutOfMemory => -13,
            NetError::SocketIsConnected => -23,

            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::InternetDisconnected => -106,
            NetError::AddressInvalid => -108,
            NetError::AddressUnreachable => -109,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,
            NetError::NetworkAccessDenied => -138,
            NetError::MsgTooBig => -142,
            NetError::AddressInUse => -147,
            NetError::NoBufferSpace => -176,

            NetError::Os(_) => -2,
            NetError::Unknown(code) => *code,
        }
    }

    /// Returns the raw OS code when this error was not mapped to a portable one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            NetError::Os(code) => Some(*code),
            _ => None,
        }
    }

    /// Maps a raw OS error (errno on Unix, WSA/Win32 code on Windows)
    /// to a portable error. Mirrors Chromium's `MapSystemError`.
    #[cfg(unix)]
    pub fn from_os_error(code: i32) -> Self {
        match code {
            libc::EAGAIN | libc::EINPROGRESS => NetError::IoPending,
            libc::EACCES | libc::EPERM => NetError::AccessDenied,
            libc::ENETDOWN => NetError::InternetDisconnected,
            libc::ETIMEDOUT => NetError::TimedOut,
            libc::ECONNRESET | libc::ENETRESET | libc::EPIPE => NetError::ConnectionReset,
            libc::ECONNABORTED => NetError::ConnectionAborted,
            libc::ECONNREFUSED => NetError::ConnectionRefused,
            libc::EHOSTUNREACH | libc::EHOSTDOWN | libc::ENETUNREACH | libc::EAFNOSUPPORT => {
                NetError::AddressUnreachable
            }
            libc::EADDRNOTAVAIL => NetError::AddressInvalid,
            libc::EMSGSIZE => NetError::MsgTooBig,
            libc::ENOTCONN => NetError::SocketNotConnected,
            libc::EISCONN => NetError::SocketIsConnected,
            libc::EINVAL | libc::EBADF | libc::EFAULT => NetError::InvalidArgument,
            libc::EADDRINUSE => NetError::AddressInUse,
            libc::ENOBUFS => NetError::NoBufferSpace,
            libc::ENOMEM => NetError::OutOfMemory,
            libc::EMFILE | libc::ENFILE => NetError::InsufficientResources,
            libc::EOPNOTSUPP => NetError::NotImplemented,
            libc::ECANCELED => NetError::Aborted,
            // Same value as EOPNOTSUPP on Linux, distinct on the BSDs.
            _ if code == libc::ENOTSUP => NetError::NotImplemented,
            _ => NetError::Os(code),
        }
    }

    #[cfg(windows)]
    pub fn from_os_error(code: i32) -> Self {
        use wsa::*;

        match code {
            ERROR_IO_PENDING | WSAEWOULDBLOCK => NetError::IoPending,
            WSAEACCES => NetError::AccessDenied,
            WSAENETDOWN => NetError::InternetDisconnected,
            WSAETIMEDOUT => NetError::TimedOut,
            WSAECONNRESET | WSAENETRESET => NetError::ConnectionReset,
            WSAECONNABORTED => NetError::ConnectionAborted,
            WSAECONNREFUSED | ERROR_CONNECTION_REFUSED => NetError::ConnectionRefused,
            WSA_IO_INCOMPLETE | WSAEDISCON => NetError::ConnectionClosed,
            WSAEISCONN => NetError::SocketIsConnected,
            WSAEHOSTUNREACH | WSAENETUNREACH | WSAEAFNOSUPPORT => NetError::AddressUnreachable,
            WSAEADDRNOTAVAIL => NetError::AddressInvalid,
            WSAEMSGSIZE => NetError::MsgTooBig,
            WSAENOTCONN => NetError::SocketNotConnected,
            WSAEINVAL | ERROR_INVALID_PARAMETER => NetError::InvalidArgument,
            WSAEADDRINUSE => NetError::AddressInUse,
            WSAENOBUFS => NetError::NoBufferSpace,
            WSAEOPNOTSUPP => NetError::NotImplemented,
            ERROR_OPERATION_ABORTED => NetError::Aborted,
            _ => NetError::Os(code),
        }
    }

    #[cfg(not(any(unix, windows)))]
    pub fn from_os_error(code: i32) -> Self {
        NetError::Os(code)
    }
}

#[cfg(windows)]
mod wsa {
    pub const ERROR_INVALID_PARAMETER: i32 = 87;
    pub const ERROR_OPERATION_ABORTED: i32 = 995;
    pub const ERROR_IO_PENDING: i32 = 997;
    pub const ERROR_CONNECTION_REFUSED: i32 = 1225;
    pub const WSA_IO_INCOMPLETE: i32 = 996;
    pub const WSAEACCES: i32 = 10013;
    pub const WSAEINVAL: i32 = 10022;
    pub const WSAEWOULDBLOCK: i32 = 10035;
    pub const WSAEMSGSIZE: i32 = 10040;
    pub const WSAEOPNOTSUPP: i32 = 10045;
    pub const WSAEAFNOSUPPORT: i32 = 10047;
    pub const WSAEADDRINUSE: i32 = 10048;
    pub const WSAEADDRNOTAVAIL: i32 = 10049;
    pub const WSAENETDOWN: i32 = 10050;
    pub const WSAENETUNREACH: i32 = 10051;
    pub const WSAENETRESET: i32 = 10052;
    pub const WSAECONNABORTED: i32 = 10053;
    pub const WSAECONNRESET: i32 = 10054;
    pub const WSAENOBUFS: i32 = 10055;
    pub const WSAEISCONN: i32 = 10056;
    pub const WSAENOTCONN: i32 = 10057;
    pub const WSAETIMEDOUT: i32 = 10060;
    pub const WSAECONNREFUSED: i32 = 10061;
    pub const WSAEHOSTUNREACH: i32 = 10065;
    pub const WSAEDISCON: i32 = 10101;
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -1 => NetError::IoPending,
            -2 => NetError::Failed,
            -3 => NetError::Aborted,
            -4 => NetError::InvalidArgument,
            -7 => NetError::TimedOut,
            -10 => NetError::AccessDenied,
            -11 => NetError::NotImplemented,
            -12 => NetError::InsufficientResources,
            -13 => NetError::OutOfMemory,
            -23 => NetError::SocketIsConnected,

            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -106 => NetError::InternetDisconnected,
            -108 => NetError::AddressInvalid,
            -109 => NetError::AddressUnreachable,
            -112 => NetError::SocketNotConnected,
            -118 => NetError::ConnectionTimedOut,
            -138 => NetError::NetworkAccessDenied,
            -142 => NetError::MsgTooBig,
            -147 => NetError::AddressInUse,
            -176 => NetError::NoBufferSpace,
            _ => NetError::Unknown(code),
        }
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        if let Some(code) = err.raw_os_error() {
            return NetError::from_os_error(code);
        }
        match err.kind() {
            io::ErrorKind::WouldBlock => NetError::IoPending,
            io::ErrorKind::TimedOut => NetError::TimedOut,
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => {
                NetError::ConnectionReset
            }
            io::ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            io::ErrorKind::NotConnected => NetError::SocketNotConnected,
            io::ErrorKind::AddrInUse => NetError::AddressInUse,
            io::ErrorKind::AddrNotAvailable => NetError::AddressInvalid,
            io::ErrorKind::PermissionDenied => NetError::AccessDenied,
            io::ErrorKind::InvalidInput => NetError::InvalidArgument,
            io::ErrorKind::Unsupported => NetError::NotImplemented,
            io::ErrorKind::UnexpectedEof => NetError::ConnectionClosed,
            _ => NetError::Failed,
        }
    }
}
