use std::net::SocketAddr;

use crate::tftp::core::{Datagram, Packet};

/// State of one file transfer.
///
/// The client first talks to the server's well-known port; the server answers
/// from a fresh port chosen for this transfer, which the session adopts as
/// the peer for the rest of the exchange.
#[derive(Debug)]
pub(crate) struct Session {
    peer: SocketAddr,
    peer_locked: bool,
    block: u16,
    finished: bool,
    bytes: u64,
    blocks: u64,
}

impl Session {
    pub(crate) fn new(server: SocketAddr) -> Self {
        Self {
            peer: server,
            peer_locked: false,
            block: 1,
            finished: false,
            bytes: 0,
            blocks: 0,
        }
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Switches to the transfer port the server answered from.
    pub(crate) fn adopt_peer(&mut self, from: SocketAddr) {
        if !self.peer_locked {
            if from != self.peer {
                log::debug!("Server switched to transfer port {}", from);
            }
            self.peer = from;
            self.peer_locked = true;
        }
    }

    /// Whether a datagram could belong to this transfer. Before the first
    /// response any port on the server's host is fine.
    pub(crate) fn is_from_peer(&self, datagram: &Datagram) -> bool {
        if self.peer_locked {
            datagram.from == self.peer
        } else {
            datagram.from.ip() == self.peer.ip()
        }
    }

    /// Block number of the data packet currently in flight.
    pub(crate) fn block(&self) -> u16 {
        self.block
    }

    /// Records a delivered block and moves to the next number, wrapping at 16 bits.
    pub(crate) fn advance(&mut self, payload_len: usize) {
        self.bytes += payload_len as u64;
        self.blocks += 1;
        self.block = self.block.wrapping_add(1);
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn blocks(&self) -> u64 {
        self.blocks
    }
}

/// Decodes a datagram only far enough to classify it, tolerating garbage.
pub(crate) fn peek(datagram: &Datagram) -> Option<Packet> {
    Packet::deserialize(&datagram.bytes).ok()
}
