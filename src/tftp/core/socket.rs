use std::{
    io,
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

/// Socket `trait` is the datagram transport the client talks through. It is
/// implemented for [`UdpSocket`] and can be implemented by test doubles to
/// script a peer without real networking.
pub trait Socket {
    /// Sends `buf` as one datagram to `to`.
    fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize>;
    /// Receives one datagram into `buf`, returning its length and sender. A
    /// read that outlives the read timeout fails with
    /// [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`].
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
    /// Bounds how long [`Socket::recv_from`] may block. `dur` is never zero.
    fn set_read_timeout(&mut self, dur: Duration) -> io::Result<()>;
}

impl Socket for UdpSocket {
    fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, to)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    fn set_read_timeout(&mut self, dur: Duration) -> io::Result<()> {
        UdpSocket::set_read_timeout(self, Some(dur))
    }
}

impl<T: Socket + ?Sized> Socket for Box<T> {
    fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize> {
        (**self).send_to(buf, to)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        (**self).recv_from(buf)
    }

    fn set_read_timeout(&mut self, dur: Duration) -> io::Result<()> {
        (**self).set_read_timeout(dur)
    }
}

/// Whether a receive error means "nothing arrived in time". Platforms
/// disagree on which kind a timed-out `recv_from` reports.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Binds an ephemeral local socket of the same address family as `server`.
pub fn bind_ephemeral(server: &SocketAddr) -> io::Result<UdpSocket> {
    let local = if server.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };
    UdpSocket::bind(local)
}
