//! # Layer 4 (Transport)
//!
//! Wraps the APDU with transport control information. Group-addressed
//! telegrams are connectionless and unacknowledged (`T_Data_Group`);
//! individually-addressed telegrams may be connection-oriented
//! (`T_Data_Connected`) with a 4-bit sequence number per peer.
//!
//! [`TransportLayer`] tracks the expected receive sequence per peer for
//! connection-oriented traffic. Out-of-sequence frames are reported
//! through [`TransportVerdict`], never escalated as errors; stale peer
//! state expires after a configurable inactivity window, so the next
//! frame from that peer starts a fresh sequence.

use crate::apdu::Apdu;
use crate::addressing::IndividualAddress;
use crate::constants::{
    TPCI_ACK, TPCI_CONNECT, TPCI_CONTROL_FLAG, TPCI_DISCONNECT, TPCI_MASK_SEQUENCE,
    TPCI_NACK, TPCI_NUMBERED_FLAG,
};
use crate::error::KnxError;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Transport control information carried in the TPCI octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportControl {
    /// Connectionless multicast data (group telegrams).
    DataGroup,
    /// Connection-oriented numbered data.
    DataConnected { seq: u8 },
    Connect,
    Disconnect,
    Ack { seq: u8 },
    Nack { seq: u8 },
}

/// A transport-layer frame: control information plus the wrapped APDU.
///
/// Control frames (connect/disconnect/ack/nack) carry no APDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tpdu {
    pub control: TransportControl,
    pub apdu: Option<Apdu>,
}

impl Tpdu {
    /// Wraps an APDU for connectionless group transmission.
    pub fn group(apdu: Apdu) -> Self {
        Self {
            control: TransportControl::DataGroup,
            apdu: Some(apdu),
        }
    }

    /// Wraps an APDU for connection-oriented transmission.
    pub fn connected(seq: u8, apdu: Apdu) -> Self {
        Self {
            control: TransportControl::DataConnected { seq: seq & 0x0F },
            apdu: Some(apdu),
        }
    }

    pub fn control_frame(control: TransportControl) -> Self {
        Self {
            control,
            apdu: None,
        }
    }

    /// Packs the TPDU into wire octets (TPCI bits merged into the first
    /// APDU octet for data frames).
    pub fn to_bytes(&self) -> Result<Vec<u8>, KnxError> {
        match (&self.control, &self.apdu) {
            (TransportControl::DataGroup, Some(apdu)) => apdu.to_bytes(),
            (TransportControl::DataConnected { seq }, Some(apdu)) => {
                let mut bytes = apdu.to_bytes()?;
                bytes[0] |= TPCI_NUMBERED_FLAG | ((seq & 0x0F) << 2);
                Ok(bytes)
            }
            (TransportControl::Connect, None) => Ok(vec![TPCI_CONNECT]),
            (TransportControl::Disconnect, None) => Ok(vec![TPCI_DISCONNECT]),
            (TransportControl::Ack { seq }, None) => Ok(vec![TPCI_ACK | ((seq & 0x0F) << 2)]),
            (TransportControl::Nack { seq }, None) => Ok(vec![TPCI_NACK | ((seq & 0x0F) << 2)]),
            (control, apdu) => Err(KnxError::MalformedApdu(format!(
                "inconsistent TPDU: {control:?} with apdu={}",
                apdu.is_some()
            ))),
        }
    }

    /// Parses a TPDU from wire octets.
    pub fn from_raw(bytes: &[u8]) -> Result<Self, KnxError> {
        let tpci = bytes[0];
        if tpci & TPCI_CONTROL_FLAG != 0 && bytes.len() == 1 {
            let seq = (tpci & TPCI_MASK_SEQUENCE) >> 2;
            let control = match tpci & !TPCI_MASK_SEQUENCE {
                TPCI_CONNECT => TransportControl::Connect,
                TPCI_DISCONNECT => TransportControl::Disconnect,
                TPCI_ACK => TransportControl::Ack { seq },
                TPCI_NACK => TransportControl::Nack { seq },
                other => {
                    return Err(KnxError::MalformedApdu(format!(
                        "unknown TPCI control code {other:#04x}"
                    )))
                }
            };
            return Ok(Self::control_frame(control));
        }

        let apdu = Apdu::from_bytes(bytes)?;
        let control = if tpci & TPCI_NUMBERED_FLAG != 0 {
            TransportControl::DataConnected {
                seq: (tpci & TPCI_MASK_SEQUENCE) >> 2,
            }
        } else {
            TransportControl::DataGroup
        };
        Ok(Self {
            control,
            apdu: Some(apdu),
        })
    }
}

/// Outcome of transport-layer receive processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportVerdict {
    /// Deliver the APDU upward.
    Deliver(Apdu),
    /// Frame consumed by the transport layer itself (connect, ack, ...).
    Consumed,
    /// Out-of-sequence connected frame; reported and dropped.
    OutOfSequence { expected: u8, received: u8 },
}

/// Per-peer connection state for connection-oriented transport.
#[derive(Debug)]
struct PeerState {
    next_seq: u8,
    last_seen: Instant,
}

/// Receive-side transport layer.
///
/// Mutated only by the single receive-processing path; per-peer sequence
/// state is keyed by source address.
#[derive(Debug)]
pub struct TransportLayer {
    peers: HashMap<u16, PeerState>,
    inactivity_window: Duration,
}

impl TransportLayer {
    pub fn new(inactivity_window: Duration) -> Self {
        Self {
            peers: HashMap::new(),
            inactivity_window,
        }
    }

    /// Processes an inbound TPDU from `source`.
    pub fn receive(&mut self, tpdu: Tpdu, source: IndividualAddress) -> TransportVerdict {
        self.receive_at(tpdu, source, Instant::now())
    }

    /// Same as [`TransportLayer::receive`] with an explicit clock reading.
    pub fn receive_at(
        &mut self,
        tpdu: Tpdu,
        source: IndividualAddress,
        now: Instant,
    ) -> TransportVerdict {
        match (tpdu.control, tpdu.apdu) {
            (TransportControl::DataGroup, Some(apdu)) => TransportVerdict::Deliver(apdu),
            (TransportControl::DataConnected { seq }, Some(apdu)) => {
                self.expire_stale(now);
                let state = self.peers.entry(source.raw()).or_insert(PeerState {
                    next_seq: seq,
                    last_seen: now,
                });
                state.last_seen = now;
                if state.next_seq != seq {
                    return TransportVerdict::OutOfSequence {
                        expected: state.next_seq,
                        received: seq,
                    };
                }
                state.next_seq = (seq + 1) & 0x0F;
                TransportVerdict::Deliver(apdu)
            }
            (TransportControl::Connect, _) => {
                self.peers.insert(
                    source.raw(),
                    PeerState {
                        next_seq: 0,
                        last_seen: now,
                    },
                );
                TransportVerdict::Consumed
            }
            (TransportControl::Disconnect, _) => {
                self.peers.remove(&source.raw());
                TransportVerdict::Consumed
            }
            (TransportControl::Ack { .. } | TransportControl::Nack { .. }, _) => {
                TransportVerdict::Consumed
            }
            // Data control without an APDU cannot be built by from_raw.
            (_, None) => TransportVerdict::Consumed,
        }
    }

    fn expire_stale(&mut self, now: Instant) {
        let window = self.inactivity_window;
        self.peers
            .retain(|_, state| now.duration_since(state.last_seen) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::{Apci, ApduPayload};

    fn peer() -> IndividualAddress {
        IndividualAddress::new(1, 1, 20).unwrap()
    }

    fn data(seq: u8) -> Tpdu {
        Tpdu::connected(
            seq,
            Apdu::new(Apci::DeviceDescriptorRead, ApduPayload::Small(0)),
        )
    }

    #[test]
    fn group_tpdu_round_trip() {
        let tpdu = Tpdu::group(Apdu::group_read());
        let bytes = tpdu.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x00, 0x00]);
        assert_eq!(Tpdu::from_raw(&bytes).unwrap(), tpdu);
    }

    #[test]
    fn connected_tpdu_carries_sequence_bits() {
        let tpdu = data(5);
        let bytes = tpdu.to_bytes().unwrap();
        // Numbered flag, sequence 5, APCI bits 9..8 of DeviceDescriptorRead.
        assert_eq!(bytes[0], 0x40 | (5 << 2) | 0x03);
        assert_eq!(Tpdu::from_raw(&bytes).unwrap(), tpdu);
    }

    #[test]
    fn control_frames_round_trip() {
        for control in [
            TransportControl::Connect,
            TransportControl::Disconnect,
            TransportControl::Ack { seq: 3 },
            TransportControl::Nack { seq: 9 },
        ] {
            let tpdu = Tpdu::control_frame(control);
            assert_eq!(Tpdu::from_raw(&tpdu.to_bytes().unwrap()).unwrap(), tpdu);
        }
    }

    #[test]
    fn in_sequence_frames_delivered() {
        let mut layer = TransportLayer::new(Duration::from_secs(60));
        layer.receive(Tpdu::control_frame(TransportControl::Connect), peer());
        for seq in 0..3 {
            assert!(matches!(
                layer.receive(data(seq), peer()),
                TransportVerdict::Deliver(_)
            ));
        }
    }

    #[test]
    fn out_of_sequence_reported_not_fatal() {
        let mut layer = TransportLayer::new(Duration::from_secs(60));
        layer.receive(Tpdu::control_frame(TransportControl::Connect), peer());
        assert!(matches!(
            layer.receive(data(0), peer()),
            TransportVerdict::Deliver(_)
        ));
        assert_eq!(
            layer.receive(data(0), peer()),
            TransportVerdict::OutOfSequence {
                expected: 1,
                received: 0
            }
        );
        // The expected sequence still advances only on a match.
        assert!(matches!(
            layer.receive(data(1), peer()),
            TransportVerdict::Deliver(_)
        ));
    }

    #[test]
    fn sequence_wraps_at_sixteen() {
        let mut layer = TransportLayer::new(Duration::from_secs(60));
        layer.receive(Tpdu::control_frame(TransportControl::Connect), peer());
        for seq in 0..16 {
            layer.receive(data(seq), peer());
        }
        assert!(matches!(
            layer.receive(data(0), peer()),
            TransportVerdict::Deliver(_)
        ));
    }

    #[test]
    fn stale_peer_state_expires() {
        let window = Duration::from_secs(10);
        let mut layer = TransportLayer::new(window);
        let start = Instant::now();
        layer.receive_at(data(0), peer(), start);
        // After the window, the old sequence is forgotten and any
        // sequence number starts fresh.
        let later = start + window + Duration::from_secs(1);
        assert!(matches!(
            layer.receive_at(data(7), peer(), later),
            TransportVerdict::Deliver(_)
        ));
    }
}
