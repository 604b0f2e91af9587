use std::fmt;

use rand::Rng;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::flight6::*;
use super::slots::*;
use super::*;
use crate::cipher_suite::CipherSuiteId;
use crate::crypto::key_agreement_for_suite;
use crate::error::Error;
use crate::handshake::handshake_message_certificate::*;
use crate::handshake::handshake_message_certificate_request::*;
use crate::handshake::handshake_message_server_hello::*;
use crate::handshake::handshake_message_server_hello_done::*;
use crate::handshake::handshake_message_server_key_exchange::*;
use crate::prf::*;

const SESSION_ID_LENGTH: usize = 32;

// Server main flight: ServerHello through ServerHelloDone out, then the
// client's certificate/key-exchange/Finished run back in. The send
// sequence re-anchors at zero here, putting ServerHello at message_seq 0
// exactly where the client expects it after the cookie exchange.
#[derive(Debug, PartialEq)]
pub(crate) struct Flight4;

impl fmt::Display for Flight4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight 4")
    }
}

impl Flight for Flight4 {
    fn generate(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Vec<Packet>> {
        let suite = match state.cipher_suite {
            Some(suite) => suite,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrCipherSuiteUnset,
                ))
            }
        };

        state.handshake_send_sequence = 0;
        state.session_id = {
            let mut session_id = vec![0u8; SESSION_ID_LENGTH];
            rand::thread_rng().fill(session_id.as_mut_slice());
            session_id
        };

        let mut pkts = vec![build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::ServerHello(HandshakeMessageServerHello {
                version: PROTOCOL_VERSION1_2,
                random: state.local_random.clone(),
                session_id: state.session_id.clone(),
                cipher_suite: suite,
            }),
            true,
        )?];

        if suite.requires_certificate() {
            if cfg.local_certificates.is_empty() {
                return Err(fatal(
                    AlertDescription::HandshakeFailure,
                    Error::ErrServerMustHaveCertificate,
                ));
            }
            let packet = build_handshake_packet(
                state,
                transcript,
                HandshakeMessage::Certificate(HandshakeMessageCertificate {
                    certificate: cfg.local_certificates.clone(),
                }),
                true,
            )?;
            pkts.push(packet);
        }

        let mut key_agreement =
            match key_agreement_for_suite(suite, cfg.psk_callback.as_ref(), &cfg.psk_identity) {
                Ok(key_agreement) => key_agreement,
                Err(err) => return Err(fatal(AlertDescription::HandshakeFailure, err)),
            };

        if suite.requires_server_key_exchange() {
            let params = match key_agreement.generate_server_params() {
                Ok(params) => params,
                Err(err) => return Err(fatal(AlertDescription::HandshakeFailure, err)),
            };
            let packet = build_handshake_packet(
                state,
                transcript,
                HandshakeMessage::ServerKeyExchange(HandshakeMessageServerKeyExchange { params }),
                true,
            )?;
            pkts.push(packet);
        }
        state.key_agreement = Some(key_agreement);

        if cfg.client_auth != ClientAuthType::NoClientCert {
            state.local_requested_certificate = true;
            let packet = build_handshake_packet(
                state,
                transcript,
                HandshakeMessage::CertificateRequest(HandshakeMessageCertificateRequest {
                    body: DEFAULT_CERTIFICATE_REQUEST_BODY.to_vec(),
                }),
                true,
            )?;
            pkts.push(packet);
        }

        let packet = build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::ServerHelloDone(HandshakeMessageServerHelloDone {}),
            true,
        )?;
        pkts.push(packet);

        Ok(pkts)
    }

    fn expected_slots(&self, state: &State, _cfg: &HandshakeConfig) -> FlightSlots {
        let mut rules = vec![];
        if state.local_requested_certificate {
            rules.push(SlotRule {
                typ: HandshakeType::Certificate,
                policy: SlotPolicy::Required,
            });
            rules.push(SlotRule {
                typ: HandshakeType::CertificateVerify,
                policy: SlotPolicy::RequiredWithClientCert,
            });
        }
        rules.push(SlotRule {
            typ: HandshakeType::ClientKeyExchange,
            policy: SlotPolicy::Required,
        });
        rules.push(SlotRule {
            typ: HandshakeType::Finished,
            policy: SlotPolicy::Required,
        });

        FlightSlots::new(rules)
    }

    fn process(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        slots: &FlightSlots,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Transition> {
        let suite = match state.cipher_suite {
            Some(suite) => suite,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrCipherSuiteUnset,
                ))
            }
        };

        if state.local_requested_certificate {
            let certificate = match slots.certificate() {
                Some(certificate) => certificate,
                None => {
                    return Err(fatal(
                        AlertDescription::HandshakeFailure,
                        Error::ErrMissingHandshakeMessage(HandshakeType::Certificate),
                    ))
                }
            };
            if certificate.certificate.is_empty()
                && cfg.client_auth == ClientAuthType::RequireAnyClientCert
            {
                return Err(fatal(
                    AlertDescription::HandshakeFailure,
                    Error::ErrClientCertificateRequired,
                ));
            }
            state.peer_certificates = certificate.certificate.clone();
        }

        // Certificate and ClientKeyExchange enter the transcript before
        // the signature that covers them is checked.
        for delivered in slots.sorted() {
            let typ = delivered.handshake.handshake_header.handshake_type;
            if typ == HandshakeType::Finished || typ == HandshakeType::CertificateVerify {
                continue;
            }
            transcript.append(
                typ,
                true,
                delivered.handshake.handshake_header.message_sequence,
                delivered.raw.clone(),
            );
        }

        derive_master_secret(state, suite, slots, cfg)?;

        if let Some(certificate_verify) = slots.certificate_verify() {
            if let Some(verify) = &cfg.verify_transcript_signature {
                if let Err(err) = verify(
                    &transcript.snapshot(),
                    &certificate_verify.signature,
                    &state.peer_certificates,
                ) {
                    return Err(fatal(AlertDescription::DecryptError, err));
                }
            }
            if let Some(delivered) = slots.get(HandshakeType::CertificateVerify) {
                transcript.append(
                    HandshakeType::CertificateVerify,
                    true,
                    delivered.handshake.handshake_header.message_sequence,
                    delivered.raw.clone(),
                );
            }
        }

        let finished = match slots.finished() {
            Some(finished) => finished,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrInvalidFsmTransition,
                ))
            }
        };

        // the expected tag covers everything before the peer Finished
        let expected =
            match transcript.finished_mac(true, &state.master_secret, suite.hash_func()) {
                Ok(expected) => expected,
                Err(err) => return Err(fatal(AlertDescription::InternalError, err)),
            };
        if !bool::from(expected.ct_eq(&finished.verify_data)) {
            return Err(fatal(
                AlertDescription::DecryptError,
                Error::ErrVerifyDataMismatch,
            ));
        }

        if let Some(delivered) = slots.get(HandshakeType::Finished) {
            transcript.append(
                HandshakeType::Finished,
                true,
                delivered.handshake.handshake_header.message_sequence,
                delivered.raw.clone(),
            );
        }

        Ok(Transition::Next(Box::new(Flight6 {})))
    }
}

fn derive_master_secret(
    state: &mut State,
    suite: CipherSuiteId,
    slots: &FlightSlots,
    cfg: &HandshakeConfig,
) -> FlightResult<()> {
    let client_key_exchange = match slots.client_key_exchange() {
        Some(client_key_exchange) => client_key_exchange,
        None => {
            return Err(fatal(
                AlertDescription::InternalError,
                Error::ErrInvalidFsmTransition,
            ))
        }
    };

    let key_agreement = match state.key_agreement.as_mut() {
        Some(key_agreement) => key_agreement,
        None => {
            return Err(fatal(
                AlertDescription::InternalError,
                Error::ErrKeyAgreementUnset,
            ))
        }
    };

    let mut pre_master_secret = match key_agreement.process_peer_params(&client_key_exchange.params)
    {
        Ok(pre_master_secret) => pre_master_secret,
        Err(err) => return Err(fatal(AlertDescription::HandshakeFailure, err)),
    };

    let master_secret = prf_master_secret(
        &pre_master_secret,
        &state.client_random(),
        &state.server_random(),
        suite.hash_func(),
    );
    pre_master_secret.zeroize();

    state.master_secret = match master_secret {
        Ok(master_secret) => master_secret,
        Err(err) => return Err(fatal(AlertDescription::InternalError, err)),
    };

    if let Some(key_log) = &cfg.key_log {
        key_log.log_master_secret(true, &state.local_random.marshal_fixed(), &state.master_secret);
    }

    Ok(())
}
