use std::io::Write;
use std::net::SocketAddr;

use super::error::TransferError;
use super::sender::notify_abort;
use super::session::{Session, peek};
use crate::tftp::core::{
    BLOCK_SIZE, Datagram, ErrorCode, MODE, Packet, RetryPolicy, Socket, Verdict, exchange,
};

/// Sends the read request for `remote_name` and waits for the first data
/// block. On success the session is bound to the server's transfer port.
pub(crate) fn request<S: Socket + ?Sized>(
    socket: &mut S,
    remote_name: &str,
    server: SocketAddr,
    policy: &RetryPolicy,
) -> Result<(Session, Vec<u8>), TransferError> {
    let mut session = Session::new(server);

    let rrq = Packet::Rrq {
        filename: remote_name.to_string(),
        mode: MODE.to_string(),
    }
    .serialize()?;
    let response = exchange(socket, &rrq, session.peer(), policy, |d| {
        if !session.is_from_peer(d) {
            return Verdict::Discard;
        }
        match peek(d) {
            Some(Packet::Data { block_num, .. }) if block_num != 1 => Verdict::Discard,
            _ => Verdict::Accept,
        }
    })?;

    let data = expect_data(&response)?;
    session.adopt_peer(response.from);
    log::debug!("Read request accepted by {}", session.peer());

    Ok((session, data))
}

/// Writes `first` and every following block to `sink`, acknowledging each.
///
/// The acknowledgment of the terminal block is sent once and not waited on.
/// A repeat of the block just acknowledged means the ack was lost, so it is
/// acknowledged again instead of being written twice.
pub(crate) fn stream<S, W>(
    socket: &mut S,
    session: &mut Session,
    first: Vec<u8>,
    sink: &mut W,
    policy: &RetryPolicy,
) -> Result<(), TransferError>
where
    S: Socket + ?Sized,
    W: Write + ?Sized,
{
    let mut data = first;

    loop {
        let block = session.block();
        log::debug!("Writing block #{} of {} bytes", block, data.len());
        if let Err(e) = sink.write_all(&data) {
            notify_abort(socket, session, ErrorCode::DiskFull, "client failed to write file");
            return Err(TransferError::FileIo(e));
        }

        let ack = Packet::Ack(block).serialize()?;
        session.advance(data.len());

        if data.len() < BLOCK_SIZE {
            socket
                .send_to(&ack, session.peer())
                .map_err(TransferError::Network)?;
            session.finish();
            break;
        }

        let next = session.block();
        let response = exchange(socket, &ack, session.peer(), policy, |d| {
            classify_data(session, d, next)
        })?;
        data = expect_data(&response)?;
    }

    sink.flush().map_err(TransferError::FileIo)
}

fn classify_data(session: &Session, datagram: &Datagram, block: u16) -> Verdict {
    if !session.is_from_peer(datagram) {
        log::warn!("Ignoring datagram from unknown source {}", datagram.from);
        return Verdict::Discard;
    }
    match peek(datagram) {
        Some(Packet::Data { block_num, .. }) if block_num == block => Verdict::Accept,
        Some(Packet::Data { block_num, .. }) if block_num == block.wrapping_sub(1) => {
            Verdict::Resend
        }
        Some(Packet::Data { block_num, .. }) => {
            log::debug!("Ignoring block {} while waiting for {}", block_num, block);
            Verdict::Discard
        }
        _ => Verdict::Accept,
    }
}

fn expect_data(datagram: &Datagram) -> Result<Vec<u8>, TransferError> {
    match Packet::deserialize(&datagram.bytes)? {
        Packet::Data { data, .. } => Ok(data),
        Packet::Error { code, msg } => {
            log::error!("{} Error message: {}", code.description(), msg);
            Err(TransferError::Remote { code, message: msg })
        }
        other => Err(TransferError::UnexpectedPacket {
            opcode: other.opcode() as u16,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tftp::testing::{ScriptedSocket, server_addr, transfer_addr};
    use std::io;
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(50), 3)
    }

    fn data(block_num: u16, payload: &[u8]) -> Vec<u8> {
        Packet::Data {
            block_num,
            data: payload.to_vec(),
        }
        .serialize()
        .unwrap()
    }

    /// A server that serves `content` block by block, one block per ack.
    fn serving(content: Vec<u8>) -> ScriptedSocket {
        ScriptedSocket::new(move |_, bytes| {
            let block = match Packet::deserialize(bytes).unwrap() {
                Packet::Rrq { .. } => 1,
                Packet::Ack(n) => n + 1,
                other => panic!("server got unexpected {:?}", other),
            };
            let start = (block as usize - 1) * BLOCK_SIZE;
            if start > content.len() {
                return vec![];
            }
            let end = (start + BLOCK_SIZE).min(content.len());
            vec![(transfer_addr(), data(block, &content[start..end]))]
        })
    }

    fn receive(socket: &mut ScriptedSocket) -> Result<(Session, Vec<u8>), TransferError> {
        let (mut session, first) = request(socket, "file.bin", server_addr(), &policy())?;
        let mut sink = Vec::new();
        stream(socket, &mut session, first, &mut sink, &policy())?;
        Ok((session, sink))
    }

    fn sent_acks(socket: &ScriptedSocket) -> Vec<u16> {
        socket
            .sent()
            .into_iter()
            .filter_map(|(_, bytes)| match Packet::deserialize(&bytes).unwrap() {
                Packet::Ack(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_receive_two_blocks() {
        let content: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
        let mut socket = serving(content.clone());
        let (session, sink) = receive(&mut socket).unwrap();

        assert_eq!(sink, content);
        assert_eq!(sent_acks(&socket), vec![1, 2]);
        assert_eq!(session.blocks(), 2);
        assert!(session.is_finished());

        let sent = socket.sent();
        assert_eq!(sent[0].0, server_addr());
        assert!(sent[1..].iter().all(|(to, _)| *to == transfer_addr()));
        // The final ack is fire-and-forget.
        assert_eq!(socket.waits(), 0);
    }

    #[test]
    fn test_receive_empty_file() {
        let mut socket = serving(Vec::new());
        let (_, sink) = receive(&mut socket).unwrap();

        assert!(sink.is_empty());
        assert_eq!(sent_acks(&socket), vec![1]);
    }

    #[test]
    fn test_receive_exact_multiple() {
        let content = vec![3u8; 1024];
        let mut socket = serving(content.clone());
        let (session, sink) = receive(&mut socket).unwrap();

        assert_eq!(sink, content);
        assert_eq!(sent_acks(&socket), vec![1, 2, 3]);
        assert_eq!(session.bytes(), 1024);
    }

    #[test]
    fn test_trailing_zeros_are_kept() {
        let mut socket = serving(vec![b'q', 0, 0]);
        let (_, sink) = receive(&mut socket).unwrap();
        assert_eq!(sink, vec![b'q', 0, 0]);
    }

    #[test]
    fn test_server_error_on_request() {
        let mut socket = ScriptedSocket::new(|_, _| {
            vec![(transfer_addr(), vec![0, 5, 0, 1, b'n', b'o', 0])]
        });
        let err = request(&mut socket, "missing", server_addr(), &policy()).unwrap_err();

        assert!(matches!(
            err,
            TransferError::Remote {
                code: ErrorCode::FileNotFound,
                ..
            }
        ));
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn test_duplicate_block_is_reacknowledged() {
        // The server repeats block 1 once after the first ack, as if that
        // ack had been lost, then carries on.
        let content = vec![1u8; 700];
        let mut socket = ScriptedSocket::new(move |n, bytes| {
            match Packet::deserialize(bytes).unwrap() {
                Packet::Rrq { .. } => vec![(transfer_addr(), data(1, &content[..512]))],
                Packet::Ack(1) if n == 1 => vec![(transfer_addr(), data(1, &content[..512]))],
                Packet::Ack(1) => vec![(transfer_addr(), data(2, &content[512..]))],
                Packet::Ack(_) => vec![],
                other => panic!("server got unexpected {:?}", other),
            }
        });
        let (_, sink) = receive(&mut socket).unwrap();

        assert_eq!(sink, vec![1u8; 700]);
        assert_eq!(sent_acks(&socket), vec![1, 1, 2]);
    }

    #[test]
    fn test_stray_blocks_are_ignored() {
        let mut socket = ScriptedSocket::new(|_, bytes| match Packet::deserialize(bytes).unwrap() {
            Packet::Rrq { .. } => vec![
                (transfer_addr(), data(3, b"stale")),
                (transfer_addr(), data(1, &[4u8; 512])),
            ],
            Packet::Ack(1) => {
                let intruder: SocketAddr = "127.0.0.1:50002".parse().unwrap();
                vec![
                    (intruder, data(2, b"evil")),
                    (transfer_addr(), data(7, b"junk")),
                    (transfer_addr(), data(2, b"end")),
                ]
            }
            _ => vec![],
        });
        let (_, sink) = receive(&mut socket).unwrap();

        let mut expected = vec![4u8; 512];
        expected.extend_from_slice(b"end");
        assert_eq!(sink, expected);
    }

    #[test]
    fn test_unexpected_packet() {
        let mut socket = ScriptedSocket::new(|_, _| vec![(transfer_addr(), vec![0, 4, 0, 0])]);
        let err = request(&mut socket, "file", server_addr(), &policy()).unwrap_err();
        assert!(matches!(err, TransferError::UnexpectedPacket { opcode: 4 }));
    }

    #[test]
    fn test_malformed_packet() {
        let mut socket = ScriptedSocket::new(|_, _| vec![(transfer_addr(), vec![0, 9])]);
        let err = request(&mut socket, "file", server_addr(), &policy()).unwrap_err();
        assert!(matches!(err, TransferError::Malformed(_)));
        assert_eq!(err.code(), 5);
    }

    #[test]
    fn test_timeout_mid_transfer() {
        let mut socket = ScriptedSocket::new(|_, bytes| match Packet::deserialize(bytes).unwrap() {
            Packet::Rrq { .. } => vec![(transfer_addr(), data(1, &[0u8; 512]))],
            _ => vec![],
        });
        let err = receive(&mut socket).unwrap_err();
        assert!(matches!(err, TransferError::Timeout { attempts: 4, .. }));
        // RRQ, then the ack for block 1 sent four times.
        assert_eq!(sent_acks(&socket), vec![1, 1, 1, 1]);
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_notifies_server() {
        let mut socket = serving(vec![1u8; 10]);
        let (mut session, first) = request(&mut socket, "f", server_addr(), &policy()).unwrap();
        let err = stream(&mut socket, &mut session, first, &mut FullDisk, &policy()).unwrap_err();

        assert_eq!(err.code(), -4);
        let (to, last) = socket.sent().pop().unwrap();
        assert_eq!(to, transfer_addr());
        assert!(matches!(
            Packet::deserialize(&last).unwrap(),
            Packet::Error {
                code: ErrorCode::DiskFull,
                ..
            }
        ));
        assert!(sent_acks(&socket).is_empty());
    }
}
