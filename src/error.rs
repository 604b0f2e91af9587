use std::io;

use thiserror::Error;
use tokio::sync::mpsc::error::SendError as MpscSendError;

use crate::handshake::HandshakeType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("conn is closed")]
    ErrConnClosed,
    #[error("buffer is too small")]
    ErrBufferTooSmall,
    #[error("invalid content type")]
    ErrInvalidContentType,
    #[error("cipher spec invalid")]
    ErrInvalidCipherSpec,
    #[error("unsupported protocol version")]
    ErrUnsupportedProtocolVersion,
    #[error("cookie must not be longer then 255 bytes")]
    ErrCookieTooLong,
    #[error("client+server cookie does not match")]
    ErrCookieMismatch,
    #[error("client+server do not support any shared cipher suites")]
    ErrCipherSuiteNoIntersection,
    #[error("invalid or unknown cipher suite")]
    ErrInvalidCipherSuite,
    #[error("cipher suite has not been negotiated")]
    ErrCipherSuiteUnset,
    #[error("Certificate is mandatory for server")]
    ErrServerMustHaveCertificate,
    #[error("server required client verification, but got none")]
    ErrClientCertificateRequired,
    #[error("expected and actual verify data does not match")]
    ErrVerifyDataMismatch,
    #[error("key agreement has not been initialized")]
    ErrKeyAgreementUnset,
    #[error("key agreement rejected the peer key exchange parameters")]
    ErrKeyExchangeParamsRejected,
    #[error("no signer available for CertificateVerify")]
    ErrNoTranscriptSigner,
    #[error("handshake message is not valid in the current flight: {0}")]
    ErrUnexpectedHandshakeMessage(HandshakeType),
    #[error("a mandatory handshake message is missing from the flight: {0}")]
    ErrMissingHandshakeMessage(HandshakeType),
    #[error("handshake fragment is incompatible with previously buffered fragments")]
    ErrFragmentMismatch,
    #[error("handshake fragment exceeds the declared message length")]
    ErrFragmentOutOfBounds,
    #[error("reassembly buffer holds too many pending messages ({pending} > {max})")]
    ErrReassemblyQueueOverflow { pending: usize, max: usize },
    #[error("reassembly buffer holds too many fragment bytes ({buffered} > {max})")]
    ErrReassemblyBytesOverflow { buffered: usize, max: usize },
    #[error("retransmit limit reached after {retries} attempts")]
    ErrRetransmitsExhausted { retries: usize },
    #[error("invalid state machine transition")]
    ErrInvalidFsmTransition,
    #[error("handshake canceled by the caller")]
    ErrHandshakeCanceled,
    #[error("Alert is Fatal or Close Notify")]
    ErrAlertFatalOrClose,

    #[error("{0}")]
    Io(#[source] IoError),
    #[error("mpsc send: {0}")]
    MpscSend(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

// Because Tokio SendError is parameterized, we sadly lose the backtrace.
impl<T> From<MpscSendError<T>> for Error {
    fn from(e: MpscSendError<T>) -> Self {
        Error::MpscSend(e.to_string())
    }
}
