//! # Layer 3 (Network)
//!
//! Stamps the source individual address, the destination (individual or
//! group) and the hop count onto a transport frame. This engine is an end
//! device, not a router, so it never decrements hop counts; it only
//! rejects received telegrams whose hop count is exhausted.

use crate::addressing::{IndividualAddress, KnxAddress};
use crate::constants::KNX_DEFAULT_HOP_COUNT;
use crate::error::KnxError;
use crate::layers::transport::Tpdu;

/// A network-layer frame: addressing envelope around a TPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npdu {
    pub source: IndividualAddress,
    pub destination: KnxAddress,
    pub hop_count: u8,
    pub tpdu: Tpdu,
}

impl Npdu {
    /// Wraps a TPDU with the default hop count.
    pub fn new(source: IndividualAddress, destination: KnxAddress, tpdu: Tpdu) -> Self {
        Self {
            source,
            destination,
            hop_count: KNX_DEFAULT_HOP_COUNT,
            tpdu,
        }
    }

    /// Receive-side validation: a telegram that arrives with hop count 0
    /// has been routed too far and must be rejected, not wrapped around.
    pub fn check_hop_count(&self) -> Result<(), KnxError> {
        if self.hop_count == 0 {
            return Err(KnxError::HopCountExceeded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::Apdu;

    #[test]
    fn default_hop_count_is_six() {
        let npdu = Npdu::new(
            IndividualAddress::new(1, 1, 1).unwrap(),
            KnxAddress::Group("1/1/1".parse().unwrap()),
            Tpdu::group(Apdu::group_read()),
        );
        assert_eq!(npdu.hop_count, 6);
        assert!(npdu.check_hop_count().is_ok());
    }

    #[test]
    fn exhausted_hop_count_rejected() {
        let mut npdu = Npdu::new(
            IndividualAddress::new(1, 1, 1).unwrap(),
            KnxAddress::Group("1/1/1".parse().unwrap()),
            Tpdu::group(Apdu::group_read()),
        );
        npdu.hop_count = 0;
        assert!(matches!(
            npdu.check_hop_count(),
            Err(KnxError::HopCountExceeded)
        ));
    }
}
