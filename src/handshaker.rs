use std::fmt;
use std::io::BufReader;

use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};

use crate::alert::*;
use crate::change_cipher_spec::ChangeCipherSpec;
use crate::config::*;
use crate::conn::*;
use crate::content::ContentType;
use crate::error::*;
use crate::flight::slots::*;
use crate::flight::*;

// [RFC6347 Section-4.2.4]
//                      +-----------+
//                +---> | PREPARING | <--------------------+
//                |     +-----------+                      |
//                |           |                            |
//                |           | Buffer next flight         |
//                |           |                            |
//                |          \|/                           |
//                |     +-----------+                      |
//                |     |  SENDING  |<------------------+  |
//                |     +-----------+                   |  |
//        Receive |           |                         |  |
//           next |           | Send flight             |  |
//         flight |  +--------+                         |  |
//                |  |        | Set retransmit timer    |  |
//                |  |       \|/                        |  |
//                |  |  +-----------+                   |  |
//                +--)--|  WAITING  |-------------------+  |
//                |  |  +-----------+   Timer expires   |  |
//                |  |         |                        |  |
//                |  |         +------------------------+  |
//        Receive |  | Send           Read retransmit      |
//           last |  | last                                |
//         flight |  | flight                              |
//                |  |                                     |
//               \|/\|/                                    |
//            +-----------+                                |
//            | FINISHED  | -------------------------------+
//            +-----------+
//                 |  /|\
//                 |   |
//                 +---+
//              Read retransmit
//           Retransmit last flight

#[derive(Copy, Clone)]
pub(crate) enum HandshakeState {
    Preparing,
    Sending,
    Waiting,
    Finished,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HandshakeState::Preparing => write!(f, "Preparing"),
            HandshakeState::Sending => write!(f, "Sending"),
            HandshakeState::Waiting => write!(f, "Waiting"),
            HandshakeState::Finished => write!(f, "Finished"),
        }
    }
}

enum WaitEvent {
    Record(Result<(ContentType, Vec<u8>)>),
    Timeout,
    Canceled,
}

pub(crate) struct HandshakeFsm {
    current_flight: Box<dyn Flight + Send + Sync>,
    slots: FlightSlots,
    retransmit: bool,
    // the serialized records of the last outbound flight, resent
    // byte-identically on timeout or when the peer missed them
    last_flight: Vec<(ContentType, Vec<u8>)>,
    retransmit_interval: tokio::time::Duration,
    retries: usize,
    epoch_rotated: bool,
    cancel_rx: Option<mpsc::Receiver<()>>,
}

impl HandshakeFsm {
    pub(crate) fn new(
        initial_flight: Box<dyn Flight + Send + Sync>,
        cancel_rx: Option<mpsc::Receiver<()>>,
    ) -> Self {
        HandshakeFsm {
            current_flight: initial_flight,
            slots: FlightSlots::empty(),
            retransmit: false,
            last_flight: vec![],
            retransmit_interval: DEFAULT_RETRANSMIT_INTERVAL,
            retries: 0,
            epoch_rotated: false,
            cancel_rx,
        }
    }

    pub(crate) async fn run(&mut self, conn: &mut HandshakeConn) -> Result<()> {
        let mut state = HandshakeState::Preparing;
        loop {
            trace!(
                "[handshake:{}] {}: {}",
                srv_cli_str(conn.state.is_client),
                self.current_flight,
                state
            );
            state = match state {
                HandshakeState::Preparing => self.prepare(conn).await?,
                HandshakeState::Sending => self.send(conn).await?,
                HandshakeState::Waiting => self.wait(conn).await?,
                HandshakeState::Finished => {
                    return self.finish(conn).await;
                }
            };
        }
    }

    async fn prepare(&mut self, conn: &mut HandshakeConn) -> Result<HandshakeState> {
        if self.current_flight.resets_receive_sequence() {
            conn.reassembly.reset();
        }

        let pkts = match self
            .current_flight
            .generate(&mut conn.state, &mut conn.transcript, &conn.cfg)
        {
            Ok(pkts) => pkts,
            Err((alert, err)) => return self.abort(conn, alert, err).await,
        };

        self.last_flight = conn.serialize_flight(&pkts)?;
        self.slots = self.current_flight.expected_slots(&conn.state, &conn.cfg);
        self.retransmit = self.current_flight.has_retransmit();
        self.retries = 0;
        self.retransmit_interval = conn.cfg.retransmit_interval;

        Ok(HandshakeState::Sending)
    }

    async fn send(&mut self, conn: &mut HandshakeConn) -> Result<HandshakeState> {
        for (content_type, payload) in &self.last_flight {
            conn.channel.send_record(*content_type, payload).await?;

            // the record layer switches to the pending write keys between
            // the ChangeCipherSpec and the Finished that follows it
            if *content_type == ContentType::ChangeCipherSpec && !self.epoch_rotated {
                trace!(
                    "[handshake:{}] -> changeCipherSpec",
                    srv_cli_str(conn.state.is_client)
                );
                conn.channel.rotate_write_epoch();
                self.epoch_rotated = true;
            }
        }

        if self.current_flight.is_last_send_flight() {
            Ok(HandshakeState::Finished)
        } else {
            Ok(HandshakeState::Waiting)
        }
    }

    async fn wait(&mut self, conn: &mut HandshakeConn) -> Result<HandshakeState> {
        let mut deadline = Instant::now() + self.retransmit_interval;

        loop {
            let event = tokio::select! {
                record = conn.channel.recv_record() => WaitEvent::Record(record),
                _ = sleep_until(deadline) => WaitEvent::Timeout,
                _ = recv_cancel(&mut self.cancel_rx) => WaitEvent::Canceled,
            };

            match event {
                WaitEvent::Record(Err(err)) => return Err(err),
                WaitEvent::Record(Ok((content_type, payload))) => {
                    if let Some(next) = self.handle_inbound(conn, content_type, &payload).await? {
                        return Ok(next);
                    }
                }
                WaitEvent::Timeout => {
                    self.retries += 1;
                    if self.retries > conn.cfg.max_retransmits {
                        let _ = conn
                            .notify(AlertLevel::Fatal, AlertDescription::HandshakeFailure)
                            .await;
                        return Err(Error::ErrRetransmitsExhausted {
                            retries: self.retries - 1,
                        });
                    }
                    self.retransmit_interval =
                        (self.retransmit_interval * 2).min(MAX_RETRANSMIT_INTERVAL);

                    if self.retransmit {
                        debug!(
                            "[handshake:{}] retransmit timer fired, resending {}",
                            srv_cli_str(conn.state.is_client),
                            self.current_flight
                        );
                        conn.stats.retransmits += 1;
                        return Ok(HandshakeState::Sending);
                    }
                    deadline = Instant::now() + self.retransmit_interval;
                }
                WaitEvent::Canceled => return self.cancel(conn).await,
            }
        }
    }

    // The sender of the last flight has nothing to wait for, but may
    // linger to answer retransmissions of the peer's closing flight.
    async fn finish(&mut self, conn: &mut HandshakeConn) -> Result<()> {
        if !self.current_flight.is_last_send_flight() {
            return Ok(());
        }
        let linger = conn.cfg.final_flight_linger;
        if linger.is_zero() {
            return Ok(());
        }

        loop {
            let event = tokio::select! {
                record = conn.channel.recv_record() => WaitEvent::Record(record),
                _ = sleep(linger) => WaitEvent::Timeout,
                _ = recv_cancel(&mut self.cancel_rx) => WaitEvent::Canceled,
            };

            match event {
                WaitEvent::Timeout | WaitEvent::Canceled | WaitEvent::Record(Err(_)) => {
                    return Ok(())
                }
                WaitEvent::Record(Ok((ContentType::Handshake, payload))) => {
                    let ingest = match conn.ingest_handshake(&payload) {
                        Ok(ingest) => ingest,
                        Err(_) => return Ok(()),
                    };
                    if ingest.stale_seen {
                        debug!(
                            "[handshake:{}] peer retransmitted its closing flight, resending {}",
                            srv_cli_str(conn.state.is_client),
                            self.current_flight
                        );
                        conn.stats.retransmits += 1;
                        for (content_type, payload) in &self.last_flight {
                            conn.channel.send_record(*content_type, payload).await?;
                        }
                    }
                }
                WaitEvent::Record(Ok(_)) => {}
            }
        }
    }

    async fn handle_inbound(
        &mut self,
        conn: &mut HandshakeConn,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Option<HandshakeState>> {
        match content_type {
            ContentType::Alert => {
                let mut reader = BufReader::new(payload);
                let alert = match Alert::unmarshal(&mut reader) {
                    Ok(alert) => alert,
                    Err(err) => {
                        debug!("dropping malformed alert record: {err}");
                        return Ok(None);
                    }
                };
                if alert.alert_level == AlertLevel::Fatal
                    || alert.alert_description == AlertDescription::CloseNotify
                {
                    warn!(
                        "[handshake:{}] peer raised {}",
                        srv_cli_str(conn.state.is_client),
                        alert
                    );
                    return Err(Error::ErrAlertFatalOrClose);
                }
                debug!(
                    "[handshake:{}] peer warning: {}",
                    srv_cli_str(conn.state.is_client),
                    alert
                );
                Ok(None)
            }
            ContentType::ChangeCipherSpec => {
                let mut reader = BufReader::new(payload);
                if ChangeCipherSpec::unmarshal(&mut reader).is_err() {
                    debug!("dropping malformed ChangeCipherSpec record");
                    return Ok(None);
                }
                if !conn.peer_ccs_seen {
                    trace!(
                        "[handshake:{}] <- changeCipherSpec",
                        srv_cli_str(conn.state.is_client)
                    );
                    conn.peer_ccs_seen = true;
                    conn.channel.rotate_read_epoch();
                }
                Ok(None)
            }
            ContentType::Handshake => self.handle_handshake(conn, payload).await,
            _ => {
                let _ = conn
                    .notify(AlertLevel::Fatal, AlertDescription::DecodeError)
                    .await;
                Err(Error::ErrInvalidContentType)
            }
        }
    }

    async fn handle_handshake(
        &mut self,
        conn: &mut HandshakeConn,
        payload: &[u8],
    ) -> Result<Option<HandshakeState>> {
        let ingest = match conn.ingest_handshake(payload) {
            Ok(ingest) => ingest,
            Err(err) => {
                let description = alert_for(&err);
                let _ = conn.notify(AlertLevel::Fatal, description).await;
                return Err(err);
            }
        };

        for delivered in ingest.delivered {
            let typ = delivered.handshake.handshake_header.handshake_type;
            match self.slots.deliver(delivered) {
                SlotOutcome::Stored => {
                    trace!(
                        "[handshake:{}] <- {}",
                        srv_cli_str(conn.state.is_client),
                        typ
                    );
                }
                SlotOutcome::Duplicate => {
                    conn.stats.duplicate_messages += 1;
                    debug!(
                        "[handshake:{}] ignoring duplicate {}",
                        srv_cli_str(conn.state.is_client),
                        typ
                    );
                }
                SlotOutcome::Unexpected => {
                    let _ = conn
                        .notify(AlertLevel::Fatal, AlertDescription::UnexpectedMessage)
                        .await;
                    return Err(Error::ErrUnexpectedHandshakeMessage(typ));
                }
            }
        }

        if self.slots.is_ready() {
            let transition = match self.current_flight.process(
                &mut conn.state,
                &mut conn.transcript,
                &self.slots,
                &conn.cfg,
            ) {
                Ok(transition) => transition,
                Err((alert, err)) => {
                    return self.abort(conn, alert, err).await.map(Some);
                }
            };

            return match transition {
                Transition::Next(next_flight) => {
                    trace!(
                        "[handshake:{}] {} -> {}",
                        srv_cli_str(conn.state.is_client),
                        self.current_flight,
                        next_flight
                    );
                    self.current_flight = next_flight;
                    Ok(Some(HandshakeState::Preparing))
                }
                Transition::Done => Ok(Some(HandshakeState::Finished)),
            };
        }

        if ingest.stale_seen && !self.last_flight.is_empty() {
            // the peer is replaying an earlier flight, so ours never
            // arrived
            debug!(
                "[handshake:{}] peer retransmitted an earlier flight, resending {}",
                srv_cli_str(conn.state.is_client),
                self.current_flight
            );
            conn.stats.retransmits += 1;
            return Ok(Some(HandshakeState::Sending));
        }

        Ok(None)
    }

    async fn abort(
        &mut self,
        conn: &mut HandshakeConn,
        alert: Option<Alert>,
        err: Option<Error>,
    ) -> Result<HandshakeState> {
        if let Some(alert) = alert {
            let _ = conn
                .notify(alert.alert_level, alert.alert_description)
                .await;
        }
        Err(err.unwrap_or(Error::ErrInvalidFsmTransition))
    }

    async fn cancel(&mut self, conn: &mut HandshakeConn) -> Result<HandshakeState> {
        let _ = conn
            .notify(AlertLevel::Warning, AlertDescription::UserCanceled)
            .await;
        let _ = conn
            .notify(AlertLevel::Warning, AlertDescription::CloseNotify)
            .await;
        Err(Error::ErrHandshakeCanceled)
    }
}

async fn recv_cancel(cancel_rx: &mut Option<mpsc::Receiver<()>>) {
    match cancel_rx {
        Some(cancel_rx) => {
            let _ = cancel_rx.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn alert_for(err: &Error) -> AlertDescription {
    match err {
        Error::ErrReassemblyQueueOverflow { .. } | Error::ErrReassemblyBytesOverflow { .. } => {
            AlertDescription::InternalError
        }
        Error::ErrUnexpectedHandshakeMessage(_) => AlertDescription::UnexpectedMessage,
        Error::ErrUnsupportedProtocolVersion => AlertDescription::ProtocolVersion,
        Error::ErrVerifyDataMismatch => AlertDescription::DecryptError,
        Error::Io(_) | Error::ErrBufferTooSmall | Error::ErrInvalidContentType => {
            AlertDescription::DecodeError
        }
        _ => AlertDescription::InternalError,
    }
}
