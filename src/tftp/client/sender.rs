use std::io::Read;
use std::net::SocketAddr;

use super::error::TransferError;
use super::session::{Session, peek};
use crate::tftp::core::{
    BLOCK_SIZE, Datagram, ErrorCode, MODE, Packet, RetryPolicy, Socket, Verdict, exchange,
};

/// Uploads everything `source` yields as `remote_name` (WRQ).
///
/// Blocks are read straight from `source` and sent as read, so a final block
/// ending in NUL bytes goes out unchanged. A source whose length is a multiple
/// of the block size ends with an empty block.
pub(crate) fn send_file<S, R>(
    socket: &mut S,
    mut source: R,
    remote_name: &str,
    server: SocketAddr,
    policy: &RetryPolicy,
) -> Result<Session, TransferError>
where
    S: Socket + ?Sized,
    R: Read,
{
    let mut session = Session::new(server);

    let wrq = Packet::Wrq {
        filename: remote_name.to_string(),
        mode: MODE.to_string(),
    }
    .serialize()?;
    let response = exchange(socket, &wrq, session.peer(), policy, |d| {
        classify_ack(&session, d, 0)
    })?;
    expect_ack(&response)?;
    session.adopt_peer(response.from);
    log::debug!("Write request accepted by {}", session.peer());

    while !session.is_finished() {
        let mut data = Vec::with_capacity(BLOCK_SIZE);
        if let Err(e) = source
            .by_ref()
            .take(BLOCK_SIZE as u64)
            .read_to_end(&mut data)
        {
            notify_abort(socket, &session, ErrorCode::NotDefined, "client failed to read file");
            return Err(TransferError::FileIo(e));
        }

        let block = session.block();
        let len = data.len();
        let packet = Packet::Data {
            block_num: block,
            data,
        }
        .serialize()?;

        log::debug!("Sending block #{} of {} bytes", block, len);
        let response = exchange(socket, &packet, session.peer(), policy, |d| {
            classify_ack(&session, d, block)
        })?;
        expect_ack(&response)?;

        session.advance(len);
        if len < BLOCK_SIZE {
            session.finish();
        }
    }

    Ok(session)
}

/// Waits for the acknowledgment of `block`; stale acks are duplicates of an
/// earlier exchange and are dropped.
fn classify_ack(session: &Session, datagram: &Datagram, block: u16) -> Verdict {
    if !session.is_from_peer(datagram) {
        log::warn!("Ignoring datagram from unknown source {}", datagram.from);
        return Verdict::Discard;
    }
    match peek(datagram) {
        Some(Packet::Ack(n)) if n != block => {
            log::debug!("Ignoring stale ACK {} while waiting for {}", n, block);
            Verdict::Discard
        }
        _ => Verdict::Accept,
    }
}

fn expect_ack(datagram: &Datagram) -> Result<u16, TransferError> {
    match Packet::deserialize(&datagram.bytes)? {
        Packet::Ack(n) => Ok(n),
        Packet::Error { code, msg } => {
            log::error!("{} Error message: {}", code.description(), msg);
            Err(TransferError::Remote { code, message: msg })
        }
        other => Err(TransferError::UnexpectedPacket {
            opcode: other.opcode() as u16,
        }),
    }
}

/// Tells the peer the transfer is over. Best effort: the transfer has
/// already failed, so a send error here is only logged.
pub(crate) fn notify_abort<S: Socket + ?Sized>(
    socket: &mut S,
    session: &Session,
    code: ErrorCode,
    msg: &str,
) {
    let packet = Packet::Error {
        code,
        msg: msg.to_string(),
    };
    let sent = match packet.serialize() {
        Ok(bytes) => socket
            .send_to(&bytes, session.peer())
            .map(|_| ())
            .map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = sent {
        log::warn!("Failed to notify {} of abort: {}", session.peer(), e);
    }
}
