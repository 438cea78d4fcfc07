//! Client Connection
//!
//! A single accepted client, shared between its read thread and the
//! broadcast path.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{RelayError, Result};

/// Handle to one connected client
///
/// The read side is a clone of the stream owned by the read thread, so
/// reads never contend with broadcast writes. Writes go through `writer`
/// so two broadcasts can't interleave their bytes on the wire. `control`
/// is another clone used only for shutdown, so closing never waits behind
/// a write that is blocked on a slow client.
pub struct ClientConnection {
    /// Registry-assigned id
    id: u64,

    /// Peer address for logging
    peer_addr: SocketAddr,

    /// Write half (serialized)
    writer: Mutex<TcpStream>,

    /// Unlocked handle for shutdown
    control: TcpStream,
}

impl ClientConnection {
    /// Wrap an accepted stream
    ///
    /// Disables Nagle's algorithm so console lines show up without delay.
    pub fn new(id: u64, stream: TcpStream, peer_addr: SocketAddr) -> Result<Self> {
        stream.set_nodelay(true)?;
        let control = stream.try_clone()?;

        Ok(Self {
            id,
            peer_addr,
            writer: Mutex::new(stream),
            control,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
    pub fn set_timeouts(&self, read_ms: u64, write_ms: u64) -> Result<()> {
        let to_duration = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        self.control.set_read_timeout(to_duration(read_ms))?;
        self.control.set_write_timeout(to_duration(write_ms))?;

        Ok(())
    }

    /// Clone a reader for the connection's read thread
    pub fn reader(&self) -> Result<ConnectionReader> {
        let stream = self.control.try_clone()?;
        Ok(ConnectionReader {
            stream,
            peer_addr: self.peer_addr,
        })
    }

    /// Write the whole message to this client
    pub fn send(&self, message: &[u8]) -> Result<()> {
        let mut stream = self.writer.lock();
        stream
            .write_all(message)
            .and_then(|_| stream.flush())
            .map_err(|source| RelayError::ClientIo {
                peer: self.peer_addr,
                source,
            })
    }

    /// Shut down both directions, unblocking any pending read or write
    pub fn close(&self) {
        // Already-closed sockets report NotConnected, which is fine
        let _ = self.control.shutdown(Shutdown::Both);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

/// Read half of a client connection, owned by its read thread
pub struct ConnectionReader {
    stream: TcpStream,
    peer_addr: SocketAddr,
}

impl ConnectionReader {
    /// Read the next chunk into `buf`
    ///
    /// `Ok(0)` means the client closed the connection. Interrupted reads
    /// are retried here.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(RelayError::ClientIo {
                        peer: self.peer_addr,
                        source,
                    })
                }
            }
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
