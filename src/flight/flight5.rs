use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::slots::*;
use super::*;
use crate::change_cipher_spec::ChangeCipherSpec;
use crate::crypto::key_agreement_for_suite;
use crate::error::Error;
use crate::handshake::handshake_message_certificate::*;
use crate::handshake::handshake_message_certificate_verify::*;
use crate::handshake::handshake_message_client_key_exchange::*;
use crate::handshake::handshake_message_finished::*;
use crate::prf::*;

// Client closing flight: certificate if the server asked for one, the
// key exchange, the signature over the transcript, then ChangeCipherSpec
// and Finished. Afterwards only the server's Finished is outstanding.
#[derive(Debug, PartialEq)]
pub(crate) struct Flight5;

impl fmt::Display for Flight5 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight 5")
    }
}

impl Flight for Flight5 {
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

        let mut pkts = vec![];

        let mut sending_certificate = false;
        if state.remote_requested_certificate {
            sending_certificate = !cfg.local_certificates.is_empty();
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

        let params = match key_agreement.generate_client_params() {
            Ok(params) => params,
            Err(err) => return Err(fatal(AlertDescription::HandshakeFailure, err)),
        };
        let packet = build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::ClientKeyExchange(HandshakeMessageClientKeyExchange { params }),
            true,
        )?;
        pkts.push(packet);

        let mut pre_master_secret =
            match key_agreement.process_peer_params(&state.remote_key_params) {
                Ok(pre_master_secret) => pre_master_secret,
                Err(err) => return Err(fatal(AlertDescription::HandshakeFailure, err)),
            };
        state.key_agreement = Some(key_agreement);

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
            key_log.log_master_secret(
                false,
                &state.local_random.marshal_fixed(),
                &state.master_secret,
            );
        }

        if sending_certificate {
            let signer = match &cfg.transcript_signer {
                Some(signer) => signer.clone(),
                None => {
                    return Err(fatal(
                        AlertDescription::InternalError,
                        Error::ErrNoTranscriptSigner,
                    ))
                }
            };
            let signature = match signer.sign(&transcript.snapshot()) {
                Ok(signature) => signature,
                Err(err) => return Err(fatal(AlertDescription::InternalError, err)),
            };
            let packet = build_handshake_packet(
                state,
                transcript,
                HandshakeMessage::CertificateVerify(HandshakeMessageCertificateVerify {
                    signature,
                }),
                true,
            )?;
            pkts.push(packet);
        }

        pkts.push(Packet {
            content: Content::ChangeCipherSpec(ChangeCipherSpec {}),
        });

        // our Finished covers everything sent and received so far but
        // not itself
        let verify_data =
            match transcript.finished_mac(true, &state.master_secret, suite.hash_func()) {
                Ok(verify_data) => verify_data,
                Err(err) => return Err(fatal(AlertDescription::InternalError, err)),
            };
        let packet = build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::Finished(HandshakeMessageFinished { verify_data }),
            true,
        )?;
        pkts.push(packet);

        Ok(pkts)
    }

    fn expected_slots(&self, _state: &State, _cfg: &HandshakeConfig) -> FlightSlots {
        FlightSlots::new(vec![SlotRule {
            typ: HandshakeType::Finished,
            policy: SlotPolicy::Required,
        }])
    }

    fn process(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        slots: &FlightSlots,
        _cfg: &HandshakeConfig,
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

        let finished = match slots.finished() {
            Some(finished) => finished,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrInvalidFsmTransition,
                ))
            }
        };

        // the server's tag covers our Finished but not its own
        let expected =
            match transcript.finished_mac(false, &state.master_secret, suite.hash_func()) {
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
                false,
                delivered.handshake.handshake_header.message_sequence,
                delivered.raw.clone(),
            );
        }

        Ok(Transition::Done)
    }
}
