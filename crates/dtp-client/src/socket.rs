//! Connections to datanodes.
//!
//! The reader only needs a byte stream it can also shut down from another
//! thread, so sockets are used through `&self` and shared behind an `Arc`.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use dtp_types::Location;

use crate::config::BlockReaderConfig;

/// A connected, bidirectional byte stream.
///
/// Implementations may be TCP or in-memory doubles. `shutdown` must make any
/// `recv` blocked in another thread return promptly.
pub trait DataSocket: Send + Sync + 'static {
    /// Receive up to `buf.len()` bytes; `Ok(0)` at end of stream.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send all of `data`.
    fn send(&self, data: &[u8]) -> io::Result<()>;

    /// Bound how long `recv` may block. `None` waits indefinitely.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Close both directions. Idempotent; errors are ignored.
    fn shutdown(&self);
}

/// Establishes connections to datanodes.
pub trait Connector: Send + Sync {
    type Socket: DataSocket;

    fn connect(&self, location: &Location, timeout: Duration) -> io::Result<Self::Socket>;
}

impl DataSocket for TcpStream {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut stream = self;
        stream.read(buf)
    }

    fn send(&self, data: &[u8]) -> io::Result<()> {
        let mut stream = self;
        stream.write_all(data)?;
        stream.flush()
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&self) {
        let _ = TcpStream::shutdown(self, Shutdown::Both);
    }
}

/// Plain TCP [`Connector`].
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    read_timeout: Option<Duration>,
    nodelay: bool,
}

impl TcpConnector {
    pub fn new(read_timeout: Option<Duration>, nodelay: bool) -> Self {
        Self {
            read_timeout,
            nodelay,
        }
    }

    pub fn from_config(config: &BlockReaderConfig) -> Self {
        Self::new(config.read_timeout, config.tcp_nodelay)
    }
}

impl Connector for TcpConnector {
    type Socket = TcpStream;

    /// Try each resolved address in turn; the last error wins.
    fn connect(&self, location: &Location, timeout: Duration) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in (location.host.as_str(), location.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(self.read_timeout)?;
                    stream.set_nodelay(self.nodelay)?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} resolved to no addresses", location),
            )
        }))
    }
}

/// `Read + Write` view of a shared socket, with room to push bytes back.
///
/// Bytes handed to [`unread`](Self::unread) are returned by subsequent reads
/// before anything new is received.
pub struct SocketIo<S> {
    socket: Arc<S>,
    pending: Bytes,
}

impl<S: DataSocket> SocketIo<S> {
    pub fn new(socket: Arc<S>) -> Self {
        Self {
            socket,
            pending: Bytes::new(),
        }
    }

    pub fn unread(&mut self, bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        if self.pending.is_empty() {
            self.pending = Bytes::from(bytes);
        } else {
            let mut joined = BytesMut::with_capacity(bytes.len() + self.pending.len());
            joined.extend_from_slice(&bytes);
            joined.extend_from_slice(&self.pending);
            self.pending = joined.freeze();
        }
    }

    pub fn socket(&self) -> &Arc<S> {
        &self.socket
    }
}

impl<S: DataSocket> Read for SocketIo<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.pending.is_empty() {
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.advance(n);
            return Ok(n);
        }
        self.socket.recv(buf)
    }
}

impl<S: DataSocket> Write for SocketIo<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
