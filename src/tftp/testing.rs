//! Deterministic transport double for unit tests.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io,
    net::SocketAddr,
    time::Duration,
};

use super::core::Socket;

type Reply = (SocketAddr, Vec<u8>);
type Responder = Box<dyn FnMut(usize, &[u8]) -> Vec<Reply>>;

/// Well-known address the client sends its request to.
pub(crate) fn server_addr() -> SocketAddr {
    "127.0.0.1:69".parse().unwrap()
}

/// Ephemeral address the scripted server answers from.
pub(crate) fn transfer_addr() -> SocketAddr {
    "127.0.0.1:50001".parse().unwrap()
}

/// A [`Socket`] whose peer is a closure. Every `send_to` is recorded and
/// handed to the responder together with its index; the replies it returns
/// are queued for `recv_from`. An empty queue reads as a timeout, so no test
/// ever sleeps.
pub(crate) struct ScriptedSocket {
    responder: RefCell<Responder>,
    sent: RefCell<Vec<Reply>>,
    inbox: RefCell<VecDeque<Reply>>,
    waits: Cell<u32>,
}

impl ScriptedSocket {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: FnMut(usize, &[u8]) -> Vec<Reply> + 'static,
    {
        Self {
            responder: RefCell::new(Box::new(responder)),
            sent: RefCell::new(Vec::new()),
            inbox: RefCell::new(VecDeque::new()),
            waits: Cell::new(0),
        }
    }

    /// A peer that never answers.
    pub(crate) fn silent() -> Self {
        Self::new(|_, _| Vec::new())
    }

    pub(crate) fn sent(&self) -> Vec<Reply> {
        self.sent.borrow().clone()
    }

    /// Number of receives that ended in a timeout.
    pub(crate) fn waits(&self) -> u32 {
        self.waits.get()
    }
}

impl Socket for ScriptedSocket {
    fn send_to(&self, buf: &[u8], to: SocketAddr) -> io::Result<usize> {
        let index = {
            let mut sent = self.sent.borrow_mut();
            sent.push((to, buf.to_vec()));
            sent.len() - 1
        };
        let replies = {
            let mut responder = self.responder.borrow_mut();
            (*responder)(index, buf)
        };
        self.inbox.borrow_mut().extend(replies);
        Ok(buf.len())
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        match self.inbox.borrow_mut().pop_front() {
            Some((from, bytes)) => {
                let amt = bytes.len().min(buf.len());
                buf[..amt].copy_from_slice(&bytes[..amt]);
                Ok((amt, from))
            }
            None => {
                self.waits.set(self.waits.get() + 1);
                Err(io::ErrorKind::WouldBlock.into())
            }
        }
    }

    fn set_read_timeout(&mut self, _dur: Duration) -> io::Result<()> {
        Ok(())
    }
}
