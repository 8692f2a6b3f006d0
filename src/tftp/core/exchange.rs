//! Send-then-await primitive with timeout-driven retransmission.
//!
//! The exchange knows nothing about packet semantics. Callers pass a
//! classifier that decides what to do with each datagram that arrives while
//! the exchange is waiting.

use std::{
    io,
    net::SocketAddr,
    time::{Duration, Instant},
};

use thiserror::Error;

use super::packet::MAX_PACKET_SIZE;
use super::socket::{Socket, is_timeout};

/// How long to wait for each response, and how many times to retransmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }

    /// Upper bound on the time one exchange can block.
    pub fn ceiling(&self) -> Duration {
        self.timeout * (self.max_retries + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT, Self::DEFAULT_MAX_RETRIES)
    }
}

/// A datagram as it came off the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub from: SocketAddr,
}

/// What the exchange should do with a datagram that arrived while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// This is the response; stop waiting and hand it back.
    Accept,
    /// Stray or stale; ignore it and keep waiting.
    Discard,
    /// The peer repeated itself; retransmit the outbound packet right away
    /// and keep waiting. Does not consume a retry.
    Resend,
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("no response from {peer} after {attempts} attempts")]
    Timeout { peer: SocketAddr, attempts: u32 },
    #[error("network I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Sends `outbound` to `to` and returns the first datagram `classify` accepts.
///
/// Each attempt waits at most `policy.timeout`. After a silent attempt the
/// identical packet is sent again; after `policy.max_retries + 1` silent
/// attempts the exchange fails with [`ExchangeError::Timeout`].
pub fn exchange<S, F>(
    socket: &mut S,
    outbound: &[u8],
    to: SocketAddr,
    policy: &RetryPolicy,
    mut classify: F,
) -> Result<Datagram, ExchangeError>
where
    S: Socket + ?Sized,
    F: FnMut(&Datagram) -> Verdict,
{
    let mut attempts = 0;

    loop {
        socket.send_to(outbound, to)?;
        attempts += 1;

        if let Some(datagram) = await_response(socket, outbound, to, policy.timeout, &mut classify)? {
            return Ok(datagram);
        }

        if attempts > policy.max_retries {
            log::warn!("No response from {} in {} tries, giving up", to, attempts);
            return Err(ExchangeError::Timeout { peer: to, attempts });
        }
        log::warn!(
            "Timeout, retrying... ({}/{})",
            attempts,
            policy.max_retries
        );
    }
}

/// One attempt: waits until `timeout` has elapsed or a datagram is accepted.
fn await_response<S, F>(
    socket: &mut S,
    outbound: &[u8],
    to: SocketAddr,
    timeout: Duration,
    classify: &mut F,
) -> Result<Option<Datagram>, ExchangeError>
where
    S: Socket + ?Sized,
    F: FnMut(&Datagram) -> Verdict,
{
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; MAX_PACKET_SIZE];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        socket.set_read_timeout(remaining)?;

        let (amt, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if is_timeout(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let datagram = Datagram {
            bytes: buf[..amt].to_vec(),
            from,
        };

        match classify(&datagram) {
            Verdict::Accept => return Ok(Some(datagram)),
            Verdict::Discard => {
                log::debug!("Discarding {}-byte datagram from {}", amt, from);
            }
            Verdict::Resend => {
                log::debug!("Peer {} repeated itself, resending", from);
                socket.send_to(outbound, to)?;
            }
        }
    }
}
