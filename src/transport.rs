use std::io::{self, Read, Write};
use std::net::TcpStream;
use tracing::debug;

/// Blocking byte stream to the relay.
///
/// The engine never has more than one request in flight: it sends a request,
/// then reads the full response before doing anything else.
pub trait Transport {
    fn connect(&mut self) -> io::Result<()>;

    /// Writes every byte or fails.
    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Blocks until exactly `len` bytes arrived. Fails with `UnexpectedEof`
    /// if the connection closes first.
    fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>>;

    fn disconnect(&mut self);
}

/// `Transport` over a plain TCP connection, opened per action.
#[derive(Debug)]
pub struct TcpTransport {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not connected to server"))
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> io::Result<()> {
        let stream = TcpStream::connect(&self.addr)?;
        debug!(addr = %self.addr, "connected to server");
        self.stream = Some(stream);
        Ok(())
    }

    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self.stream()?;
        stream.write_all(bytes)?;
        stream.flush()
    }

    fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let stream = self.stream()?;
        // Grows with the bytes that actually arrive, not the declared length.
        let mut buffer = Vec::new();
        stream.take(len as u64).read_to_end(&mut buffer)?;
        if buffer.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed after {} of {len} bytes", buffer.len()),
            ));
        }
        Ok(buffer)
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!(addr = %self.addr, "disconnected from server");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_round_trip_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = [0u8; 4];
            socket.read_exact(&mut request).unwrap();
            socket.write_all(&[request[0], 1, 2, 3, 4, 5]).unwrap();
            request
        });

        let mut transport = TcpTransport::new(addr);
        transport.connect().unwrap();
        transport.send_all(&[9, 8, 7, 6]).unwrap();

        assert_eq!(transport.recv_exact(2).unwrap(), vec![9, 1]);
        assert_eq!(transport.recv_exact(4).unwrap(), vec![2, 3, 4, 5]);
        assert_eq!(server.join().unwrap(), [9, 8, 7, 6]);

        transport.disconnect();
    }

    #[test]
    fn test_early_close_is_unexpected_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(&[1, 2, 3]).unwrap();
        });

        let mut transport = TcpTransport::new(addr);
        transport.connect().unwrap();
        server.join().unwrap();

        let err = transport.recv_exact(7).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_huge_declared_length_fails_on_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(&[1, 2, 3]).unwrap();
        });

        let mut transport = TcpTransport::new(addr);
        transport.connect().unwrap();
        server.join().unwrap();

        let err = transport.recv_exact(u32::MAX as usize).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_io_without_connection() {
        let mut transport = TcpTransport::new("127.0.0.1:1");
        assert_eq!(
            transport.send_all(&[1]).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(
            transport.recv_exact(1).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
    }
}
