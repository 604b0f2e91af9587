use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::time::Duration;

use super::*;
use crate::crypto::{PskCallback, TranscriptSigner, VerifyTranscriptSignatureFn};
use crate::record::RecordLayer;

struct PipeRecordLayer {
    tx: mpsc::Sender<(ContentType, Vec<u8>)>,
    rx: mpsc::Receiver<(ContentType, Vec<u8>)>,
    write_epochs: Arc<AtomicUsize>,
    read_epochs: Arc<AtomicUsize>,
}

fn record_pipe() -> (
    PipeRecordLayer,
    PipeRecordLayer,
    [Arc<AtomicUsize>; 4], // client write/read, server write/read
) {
    // roomy enough that storms of duplicated or retransmitted records
    // never exert backpressure on a peer that stopped reading
    let (client_tx, server_rx) = mpsc::channel(256);
    let (server_tx, client_rx) = mpsc::channel(256);

    let counters = [
        Arc::new(AtomicUsize::new(0)),
        Arc::new(AtomicUsize::new(0)),
        Arc::new(AtomicUsize::new(0)),
        Arc::new(AtomicUsize::new(0)),
    ];

    let client = PipeRecordLayer {
        tx: client_tx,
        rx: client_rx,
        write_epochs: counters[0].clone(),
        read_epochs: counters[1].clone(),
    };
    let server = PipeRecordLayer {
        tx: server_tx,
        rx: server_rx,
        write_epochs: counters[2].clone(),
        read_epochs: counters[3].clone(),
    };

    (client, server, counters)
}

#[async_trait]
impl RecordLayer for PipeRecordLayer {
    async fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<()> {
        self.tx
            .send((content_type, payload.to_vec()))
            .await
            .map_err(|_| Error::ErrConnClosed)
    }

    async fn recv_record(&mut self) -> Result<(ContentType, Vec<u8>)> {
        self.rx.recv().await.ok_or(Error::ErrConnClosed)
    }

    fn rotate_write_epoch(&mut self) {
        self.write_epochs.fetch_add(1, Ordering::SeqCst);
    }

    fn rotate_read_epoch(&mut self) {
        self.read_epochs.fetch_add(1, Ordering::SeqCst);
    }
}

// Applies a fault-injection closure to every outbound record: return
// false to drop it, or mutate the payload in place.
struct FilteredRecordLayer<F> {
    inner: PipeRecordLayer,
    sent: usize,
    filter: F,
}

#[async_trait]
impl<F> RecordLayer for FilteredRecordLayer<F>
where
    F: FnMut(usize, ContentType, &mut Vec<u8>) -> bool + Send,
{
    async fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<()> {
        let index = self.sent;
        self.sent += 1;

        let mut payload = payload.to_vec();
        if !(self.filter)(index, content_type, &mut payload) {
            return Ok(());
        }
        self.inner.send_record(content_type, &payload).await
    }

    async fn recv_record(&mut self) -> Result<(ContentType, Vec<u8>)> {
        self.inner.recv_record().await
    }

    fn rotate_write_epoch(&mut self) {
        self.inner.rotate_write_epoch();
    }

    fn rotate_read_epoch(&mut self) {
        self.inner.rotate_read_epoch();
    }
}

// Holds back the server hello flight and releases it in reverse order
// once ServerHelloDone is queued.
struct ReorderingRecordLayer {
    inner: PipeRecordLayer,
    held: Vec<Vec<u8>>,
}

#[async_trait]
impl RecordLayer for ReorderingRecordLayer {
    async fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<()> {
        if content_type == ContentType::Handshake && !payload.is_empty() {
            let msg_type = HandshakeType::from(payload[0]);
            if matches!(
                msg_type,
                HandshakeType::ServerHello
                    | HandshakeType::Certificate
                    | HandshakeType::ServerKeyExchange
                    | HandshakeType::CertificateRequest
            ) {
                self.held.push(payload.to_vec());
                return Ok(());
            }
            if msg_type == HandshakeType::ServerHelloDone {
                self.held.push(payload.to_vec());
                while let Some(record) = self.held.pop() {
                    self.inner
                        .send_record(ContentType::Handshake, &record)
                        .await?;
                }
                return Ok(());
            }
        }

        self.inner.send_record(content_type, payload).await
    }

    async fn recv_record(&mut self) -> Result<(ContentType, Vec<u8>)> {
        self.inner.recv_record().await
    }

    fn rotate_write_epoch(&mut self) {
        self.inner.rotate_write_epoch();
    }

    fn rotate_read_epoch(&mut self) {
        self.inner.rotate_read_epoch();
    }
}

fn client_addr() -> SocketAddr {
    "127.0.0.1:5684".parse().unwrap()
}

fn fake_der(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

fn psk_config() -> HandshakeConfig {
    let callback: PskCallback = Arc::new(|_hint: &[u8]| Ok(vec![0xab, 0xc1, 0x23, 0x10]));
    HandshakeConfig {
        local_cipher_suites: vec![CipherSuiteId::TlsPskWithAes128GcmSha256],
        psk_callback: Some(callback),
        psk_identity: b"dtls-handshake-test".to_vec(),
        retransmit_interval: Duration::from_millis(100),
        ..Default::default()
    }
}

fn ecdhe_config(certificates: Vec<Vec<u8>>) -> HandshakeConfig {
    HandshakeConfig {
        local_cipher_suites: vec![CipherSuiteId::TlsEcdheEcdsaWithAes128GcmSha256],
        local_certificates: certificates,
        retransmit_interval: Duration::from_millis(100),
        ..Default::default()
    }
}

async fn run_pair(
    mut client: HandshakeConn,
    mut server: HandshakeConn,
) -> (Result<HandshakeResult>, Result<HandshakeResult>) {
    tokio::join!(client.handshake(), server.handshake())
}

fn assert_keys_match(client: &HandshakeResult, server: &HandshakeResult) {
    assert_eq!(client.keys, server.keys, "both sides must derive one key block");
    assert_eq!(client.cipher_suite, server.cipher_suite);
    assert_eq!(client.keys.master_secret.len(), 48);
}

#[tokio::test]
async fn test_handshake_ecdhe_happy_path() {
    let (client_pipe, server_pipe, counters) = record_pipe();
    let certificate = fake_der(512);

    let client = HandshakeConn::client(Box::new(client_pipe), ecdhe_config(vec![]));
    let server = HandshakeConn::server(
        Box::new(server_pipe),
        ecdhe_config(vec![certificate.clone()]),
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;
    let client_result = client_result.expect("client side");
    let server_result = server_result.expect("server side");

    assert_keys_match(&client_result, &server_result);
    assert_eq!(client_result.peer_certificates, vec![certificate]);
    assert!(server_result.peer_certificates.is_empty());

    assert_eq!(client_result.stats, HandshakeStats::default());
    assert_eq!(server_result.stats, HandshakeStats::default());

    // every side rotated its write epoch at its own ChangeCipherSpec and
    // its read epoch at the peer's
    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_handshake_psk_happy_path() {
    let (client_pipe, server_pipe, _counters) = record_pipe();

    let client = HandshakeConn::client(Box::new(client_pipe), psk_config());
    let server = HandshakeConn::server(
        Box::new(server_pipe),
        psk_config(),
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;
    let client_result = client_result.expect("client side");
    let server_result = server_result.expect("server side");

    assert_keys_match(&client_result, &server_result);
    assert!(client_result.peer_certificates.is_empty());
    assert_eq!(
        client_result.cipher_suite,
        CipherSuiteId::TlsPskWithAes128GcmSha256
    );
}

#[tokio::test]
async fn test_fragmented_certificate_reassembles() {
    let (client_pipe, server_pipe, _counters) = record_pipe();
    let certificate = fake_der(3000);

    let mut server_cfg = ecdhe_config(vec![certificate.clone()]);
    // force the 3000 byte certificate into many fragments
    server_cfg.mtu = 300;

    let client = HandshakeConn::client(Box::new(client_pipe), ecdhe_config(vec![]));
    let server = HandshakeConn::server(
        Box::new(server_pipe),
        server_cfg,
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;
    let client_result = client_result.expect("client side");
    server_result.expect("server side");

    assert_eq!(client_result.peer_certificates, vec![certificate]);
}

#[tokio::test]
async fn test_reordered_server_flight_reassembles() {
    let (client_pipe, server_pipe, _counters) = record_pipe();
    let certificate = fake_der(700);

    let server_channel = ReorderingRecordLayer {
        inner: server_pipe,
        held: vec![],
    };

    let client = HandshakeConn::client(Box::new(client_pipe), ecdhe_config(vec![]));
    let server = HandshakeConn::server(
        Box::new(server_channel),
        ecdhe_config(vec![certificate.clone()]),
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;
    let client_result = client_result.expect("client side");
    server_result.expect("server side");

    assert_eq!(client_result.peer_certificates, vec![certificate]);
}

#[tokio::test]
async fn test_lost_server_flight_recovered_by_retransmit() {
    let (client_pipe, server_pipe, _counters) = record_pipe();

    // server sends HelloVerifyRequest (0), ServerHello (1),
    // ServerHelloDone (2): lose the hello flight's first transmission
    let server_channel = FilteredRecordLayer {
        inner: server_pipe,
        sent: 0,
        filter: |index: usize, _content_type: ContentType, _payload: &mut Vec<u8>| {
            !(index == 1 || index == 2)
        },
    };

    let client = HandshakeConn::client(Box::new(client_pipe), psk_config());
    let server = HandshakeConn::server(
        Box::new(server_channel),
        psk_config(),
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;
    let client_result = client_result.expect("client side");
    let server_result = server_result.expect("server side");

    assert_keys_match(&client_result, &server_result);
    assert!(
        client_result.stats.retransmits >= 1,
        "client must have resent its hello to trigger recovery"
    );
    assert!(
        server_result.stats.retransmits >= 1,
        "server must have resent its flight on the stale hello"
    );
}

#[tokio::test]
async fn test_duplicated_client_records_converge() {
    let (client_pipe, server_pipe, _counters) = record_pipe();

    // client side delivers every record twice
    struct DuplicatingRecordLayer {
        inner: PipeRecordLayer,
    }

    #[async_trait]
    impl RecordLayer for DuplicatingRecordLayer {
        async fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<()> {
            self.inner.send_record(content_type, payload).await?;
            self.inner.send_record(content_type, payload).await
        }

        async fn recv_record(&mut self) -> Result<(ContentType, Vec<u8>)> {
            self.inner.recv_record().await
        }

        fn rotate_write_epoch(&mut self) {
            self.inner.rotate_write_epoch();
        }

        fn rotate_read_epoch(&mut self) {
            self.inner.rotate_read_epoch();
        }
    }

    let client_channel = DuplicatingRecordLayer { inner: client_pipe };

    let mut server_cfg = psk_config();
    server_cfg.final_flight_linger = Duration::from_millis(200);

    let client = HandshakeConn::client(Box::new(client_channel), psk_config());
    let server = HandshakeConn::server(
        Box::new(server_pipe),
        server_cfg,
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;
    let client_result = client_result.expect("client side");
    let server_result = server_result.expect("server side");

    assert_keys_match(&client_result, &server_result);
    assert!(
        server_result.stats.dropped_fragments > 0 || server_result.stats.retransmits > 0,
        "the duplicated records must have been noticed and absorbed"
    );
}

#[tokio::test]
async fn test_tampered_finished_is_fatal() {
    let (client_pipe, server_pipe, _counters) = record_pipe();

    // flip one bit of the client Finished tag
    let client_channel = FilteredRecordLayer {
        inner: client_pipe,
        sent: 0,
        filter: |_index: usize, content_type: ContentType, payload: &mut Vec<u8>| {
            if content_type == ContentType::Handshake
                && payload.first() == Some(&(HandshakeType::Finished as u8))
            {
                if let Some(last) = payload.last_mut() {
                    *last ^= 0x01;
                }
            }
            true
        },
    };

    let client = HandshakeConn::client(Box::new(client_channel), psk_config());
    let server = HandshakeConn::server(
        Box::new(server_pipe),
        psk_config(),
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;

    assert_eq!(
        server_result.err(),
        Some(Error::ErrVerifyDataMismatch),
        "server must reject the forged tag"
    );
    assert_eq!(
        client_result.err(),
        Some(Error::ErrAlertFatalOrClose),
        "client must see the fatal decrypt_error alert"
    );
}

#[tokio::test]
async fn test_client_auth_round_trip() {
    let (client_pipe, server_pipe, _counters) = record_pipe();
    let server_certificate = fake_der(512);
    let client_certificate = fake_der(256);

    // toy signature scheme: SHA-256 of the transcript
    struct DigestSigner;
    impl TranscriptSigner for DigestSigner {
        fn sign(&self, transcript: &[u8]) -> Result<Vec<u8>> {
            Ok(Sha256::digest(transcript).to_vec())
        }
    }
    let verify: VerifyTranscriptSignatureFn =
        Arc::new(|transcript: &[u8], signature: &[u8], chain: &[Vec<u8>]| {
            if chain.is_empty() {
                return Err(Error::ErrClientCertificateRequired);
            }
            if Sha256::digest(transcript).as_slice() == signature {
                Ok(())
            } else {
                Err(Error::ErrVerifyDataMismatch)
            }
        });

    let mut client_cfg = ecdhe_config(vec![client_certificate.clone()]);
    client_cfg.transcript_signer = Some(Arc::new(DigestSigner {}));

    let mut server_cfg = ecdhe_config(vec![server_certificate]);
    server_cfg.client_auth = ClientAuthType::RequireAnyClientCert;
    server_cfg.verify_transcript_signature = Some(verify);

    let client = HandshakeConn::client(Box::new(client_pipe), client_cfg);
    let server = HandshakeConn::server(
        Box::new(server_pipe),
        server_cfg,
        client_addr(),
        Arc::new(CookieGenerator::new()),
    );

    let (client_result, server_result) = run_pair(client, server).await;
    let client_result = client_result.expect("client side");
    let server_result = server_result.expect("server side");

    assert_keys_match(&client_result, &server_result);
    assert_eq!(server_result.peer_certificates, vec![client_certificate]);
}

#[tokio::test]
async fn test_cancel_tears_down() {
    let (client_pipe, server_pipe, _counters) = record_pipe();
    // keep the far end alive so the client blocks in its first wait
    let _parked_server_side = server_pipe;

    let mut client = HandshakeConn::client(Box::new(client_pipe), psk_config());

    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    let canceler = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = cancel_tx.send(()).await;
        Ok::<(), Error>(())
    };

    let (result, _) = tokio::join!(client.handshake_with_cancel(cancel_rx), canceler);
    assert_eq!(result.err(), Some(Error::ErrHandshakeCanceled));
}

#[tokio::test]
async fn test_retransmits_exhausted() {
    let (client_pipe, server_pipe, _counters) = record_pipe();
    let _parked_server_side = server_pipe;

    let mut cfg = psk_config();
    cfg.retransmit_interval = Duration::from_millis(10);
    cfg.max_retransmits = 2;

    let mut client = HandshakeConn::client(Box::new(client_pipe), cfg);
    let result = client.handshake().await;

    assert_eq!(
        result.err(),
        Some(Error::ErrRetransmitsExhausted { retries: 2 })
    );
}
