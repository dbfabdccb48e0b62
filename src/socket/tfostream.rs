//! Connect-with-data on tokio.
//!
//! [`FastOpenStream::connect`] hands the initial bytes to the platform's
//! fast-open connector, waits for the connection to complete, then writes
//! whatever the SYN did not carry through the ordinary write path. The
//! peer always receives the full payload, whether or not a cookie was
//! available.

use crate::base::neterror::NetError;
use crate::socket::config::FastOpenConfig;
#[cfg(windows)]
use crate::socket::fastopen::CompletionToken;
use crate::socket::fastopen::{self, ConnectOutcome, ConnectRequest, FailureKind, SocketRef};
use socket2::{Domain, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;

/// A TCP stream opened with TCP Fast Open.
#[derive(Debug)]
pub struct FastOpenStream {
    inner: TcpStream,
    fast_open_bytes: usize,
}

impl FastOpenStream {
    /// Connects to `addr` carrying `data` in the SYN when possible.
    ///
    /// On return the connection is established and all of `data` has been
    /// handed to the kernel.
    pub async fn connect(
        addr: SocketAddr,
        data: &[u8],
        config: &FastOpenConfig,
    ) -> Result<Self, NetError> {
        if !config.enabled {
            return Self::connect_then_write(addr, data, config).await;
        }

        let socket = new_socket(addr, config)?;
        if let Err(e) = fastopen::enable_client_fast_open(socket_ref(&socket)) {
            tracing::trace!(error = %e, "client fast open switch not applied");
        }

        let (socket, outcome) = attempt_connect(socket, addr, data, config).await?;
        tracing::debug!(peer = %addr, len = data.len(), ?outcome, "fast open attempt");
        Self::resolve(socket, outcome, addr, data, config).await
    }

    /// Turns the connector's outcome into a connected stream, or an error.
    async fn resolve(
        socket: Socket,
        outcome: ConnectOutcome,
        addr: SocketAddr,
        data: &[u8],
        config: &FastOpenConfig,
    ) -> Result<Self, NetError> {
        match outcome {
            ConnectOutcome::BytesTransferred(_) | ConnectOutcome::PendingNoCookie => {
                let sent = outcome.bytes_sent().unwrap_or(0);
                let stream = finish_connect(socket, config).await?;
                Self::complete(stream, &data[sent..], sent, config).await
            }
            ConnectOutcome::Failed(FailureKind::PayloadTooLarge) => {
                tracing::debug!(peer = %addr, len = data.len(), "payload exceeds SYN, writing after connect");
                drop(socket);
                Self::connect_then_write(addr, data, config).await
            }
            ConnectOutcome::Failed(kind) => {
                drop(socket);
                let err = NetError::from(kind);
                if config.fallback && err == NetError::NotImplemented {
                    tracing::warn!(peer = %addr, error = %kind, "fast open unavailable, using ordinary connect");
                    return Self::connect_then_write(addr, data, config).await;
                }
                Err(err)
            }
        }
    }

    async fn connect_then_write(
        addr: SocketAddr,
        data: &[u8],
        config: &FastOpenConfig,
    ) -> Result<Self, NetError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if let Some(local) = config.bind_addr {
            socket.bind(local)?;
        }

        let stream = timeout(config.connect_timeout, socket.connect(addr))
            .await
            .map_err(|_| NetError::ConnectionTimedOut)??;
        Self::complete(stream, data, 0, config).await
    }

    async fn complete(
        mut stream: TcpStream,
        rest: &[u8],
        fast_open_bytes: usize,
        config: &FastOpenConfig,
    ) -> Result<Self, NetError> {
        stream.set_nodelay(config.nodelay)?;
        if !rest.is_empty() {
            stream.write_all(rest).await?;
        }
        tracing::trace!(fast_open_bytes, written = rest.len(), "connect data delivered");
        Ok(Self {
            inner: stream,
            fast_open_bytes,
        })
    }

    /// Bytes of the connect data that went out with the SYN.
    pub fn fast_open_bytes(&self) -> usize {
        self.fast_open_bytes
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.inner
    }

    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

fn new_socket(addr: SocketAddr, config: &FastOpenConfig) -> Result<Socket, NetError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
    socket.set_nonblocking(true)?;

    match config.bind_addr {
        Some(local) => socket.bind(&local.into())?,
        // ConnectEx refuses unbound sockets.
        None if cfg!(windows) => {
            let any: SocketAddr = if addr.is_ipv4() {
                (Ipv4Addr::UNSPECIFIED, 0).into()
            } else {
                (Ipv6Addr::UNSPECIFIED, 0).into()
            };
            socket.bind(&any.into())?;
        }
        None => {}
    }
    Ok(socket)
}

#[cfg(unix)]
fn socket_ref(socket: &Socket) -> SocketRef<'_> {
    use std::os::fd::AsFd;
    socket.as_fd()
}

#[cfg(windows)]
fn socket_ref(socket: &Socket) -> SocketRef<'_> {
    use std::os::windows::io::AsSocket;
    socket.as_socket()
}

/// The socket is non-blocking, so the connector returns without waiting
/// for the handshake.
#[cfg(not(windows))]
async fn attempt_connect(
    socket: Socket,
    addr: SocketAddr,
    data: &[u8],
    _config: &FastOpenConfig,
) -> Result<(Socket, ConnectOutcome), NetError> {
    let outcome = fastopen::attempt(
        ConnectRequest::new(socket_ref(&socket), addr, data).blocking(false),
    );
    Ok((socket, outcome))
}

/// The overlapped strategy waits for completion inside the call, so it runs
/// off the runtime under `connect_timeout`. On expiry the worker keeps the
/// socket and token until the OS gives up on the handshake.
#[cfg(windows)]
async fn attempt_connect(
    socket: Socket,
    addr: SocketAddr,
    data: &[u8],
    config: &FastOpenConfig,
) -> Result<(Socket, ConnectOutcome), NetError> {
    let payload = data.to_vec();
    let task = tokio::task::spawn_blocking(move || {
        let mut token = CompletionToken::new();
        let request = ConnectRequest::new(socket_ref(&socket), addr, &payload)
            .blocking(true)
            .completion(&mut token);
        let outcome = fastopen::attempt(request);
        (socket, outcome)
    });

    match timeout(config.connect_timeout, task).await {
        Ok(joined) => joined.map_err(|e| {
            tracing::error!(error = %e, "fast open task failed");
            NetError::Failed
        }),
        Err(_) => {
            tracing::debug!(peer = %addr, timeout = ?config.connect_timeout, "fast open connect timed out");
            Err(NetError::ConnectionTimedOut)
        }
    }
}

/// Waits for an in-progress connect and hands the socket to tokio.
async fn finish_connect(socket: Socket, config: &FastOpenConfig) -> Result<TcpStream, NetError> {
    #[cfg(windows)]
    fastopen::windows::finish_connect(socket_ref(&socket))?;

    let stream = TcpStream::from_std(std::net::TcpStream::from(socket))?;
    timeout(config.connect_timeout, stream.writable())
        .await
        .map_err(|_| NetError::ConnectionTimedOut)??;

    if let Some(e) = stream.take_error()? {
        return Err(e.into());
    }
    Ok(stream)
}

impl AsyncRead for FastOpenStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for FastOpenStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
