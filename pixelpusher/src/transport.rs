// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The datagram socket shared by discovery and pixel streaming.
//!
//! The same socket that listens for discovery datagrams is used to send pixel packets, so a [Transport] is handed to
//! every send rather than captured by the controllers.

use std::{
    io,
    net::{SocketAddr, SocketAddrV4, UdpSocket},
    time::Duration,
};

/// Socket2 is used to set the socket options std does not expose before binding.
use socket2::{Domain, Protocol, Socket, Type};

/// The smallest read timeout handed to the socket, a zero timeout would block forever.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A datagram transport.
pub trait Transport {
    /// Wait up to `timeout` for a datagram.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>>;

    /// Send a datagram, returns the number of bytes sent.
    fn send_to(&mut self, buf: &[u8], dst: SocketAddrV4) -> io::Result<usize>;

    /// The address the transport is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// A UDP socket with address reuse and broadcast enabled.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a new socket to the given address.
    ///
    /// # Errors
    /// Any error from creating, configuring or binding the socket.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        socket.bind(&addr.into())?;

        Ok(Self { socket: socket.into() })
    }
}

impl Transport for UdpTransport {
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>> {
        self.socket.set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        match self.socket.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if is_timeout(e.kind()) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn send_to(&mut self, buf: &[u8], dst: SocketAddrV4) -> io::Result<usize> {
        self.socket.send_to(buf, dst)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

/// Both kinds are reported for an expired read timeout, depending on the platform.
fn is_timeout(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[test]
    fn test_recv_times_out_with_none() {
        let mut transport = UdpTransport::bind(loopback()).unwrap();
        let mut buf = [0u8; 64];
        assert!(transport.recv(&mut buf, Duration::from_millis(5)).unwrap().is_none());
    }

    #[test]
    fn test_zero_timeout_does_not_block_forever() {
        let mut transport = UdpTransport::bind(loopback()).unwrap();
        let mut buf = [0u8; 64];
        assert!(transport.recv(&mut buf, Duration::ZERO).unwrap().is_none());
    }

    #[test]
    fn test_send_and_receive_on_loopback() {
        let mut a = UdpTransport::bind(loopback()).unwrap();
        let mut b = UdpTransport::bind(loopback()).unwrap();
        let dst = match b.local_addr().unwrap() {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => unreachable!(),
        };

        assert_eq!(a.send_to(&[1, 2, 3], dst).unwrap(), 3);

        let mut buf = [0u8; 64];
        let (len, src) = b.recv(&mut buf, Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(&buf[..len], &[1, 2, 3]);
        assert_eq!(src, a.local_addr().unwrap());
    }
}
