// Protocol packets exchanged between bridge nodes, and their deduplication

pub mod dedup;

pub use dedup::{MessageClass, MessageDeduplicator};

use crate::data_structures::{CancelReason, MessageDigest, TxId};
use crate::error::{BridgeError, BridgeResult};
use bincode::config::standard;
use sha2::{Digest, Sha256};

// Body of a swap offer as broadcast by its maker
#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct OfferBody {
    pub id: TxId,
    pub from: String,
    pub from_currency: String,
    pub from_amount: u64,
    pub to: String,
    pub to_currency: String,
    pub to_amount: u64,
    pub created_ms: i64, // Unix millis of creation on the maker side
}

#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum PacketCommand {
    Offer(OfferBody),
    Accept { id: TxId, result_id: TxId, from: String, to: String },
    Cancel { id: TxId, reason: CancelReason },
    Rollback { id: TxId },
    Finished { id: TxId },
    // Acknowledges that an offer reached the network
    Confirm { id: TxId },
}

impl PacketCommand {
    pub fn tx_id(&self) -> TxId {
        match self {
            PacketCommand::Offer(body) => body.id,
            PacketCommand::Accept { id, .. }
            | PacketCommand::Cancel { id, .. }
            | PacketCommand::Rollback { id }
            | PacketCommand::Finished { id }
            | PacketCommand::Confirm { id } => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PacketCommand::Offer(_) => "offer",
            PacketCommand::Accept { .. } => "accept",
            PacketCommand::Cancel { .. } => "cancel",
            PacketCommand::Rollback { .. } => "rollback",
            PacketCommand::Finished { .. } => "finished",
            PacketCommand::Confirm { .. } => "confirm",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct XBridgePacket {
    pub version: u32,
    pub command: PacketCommand,
}

impl XBridgePacket {
    pub fn new(version: u32, command: PacketCommand) -> Self {
        XBridgePacket { version, command }
    }

    pub fn encode(&self) -> BridgeResult<Vec<u8>> {
        bincode::encode_to_vec(self, standard())
            .map_err(|e| BridgeError::MalformedPacket(format!("encode failed: {}", e)))
    }

    pub fn decode(bytes: &[u8], expected_version: u32) -> BridgeResult<Self> {
        let (packet, consumed): (XBridgePacket, usize) = bincode::decode_from_slice(bytes, standard())
            .map_err(|e| BridgeError::MalformedPacket(format!("decode failed: {}", e)))?;
        if consumed != bytes.len() {
            return Err(BridgeError::MalformedPacket(format!(
                "{} trailing bytes after packet",
                bytes.len() - consumed
            )));
        }
        if packet.version != expected_version {
            return Err(BridgeError::MalformedPacket(format!(
                "unsupported protocol version {} (expected {})",
                packet.version, expected_version
            )));
        }
        Ok(packet)
    }

    pub fn digest(&self) -> BridgeResult<MessageDigest> {
        Ok(digest_bytes(&self.encode()?))
    }
}

pub fn digest_bytes(bytes: &[u8]) -> MessageDigest {
    let hash = Sha256::digest(bytes);
    MessageDigest(hash.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_offer() -> XBridgePacket {
        XBridgePacket::new(1, PacketCommand::Offer(OfferBody {
            id: TxId::from_bytes([3u8; 32]),
            from: "A".repeat(34),
            from_currency: "BLOCK".to_string(),
            from_amount: 150_000_000,
            to: "B".repeat(34),
            to_currency: "LTC".to_string(),
            to_amount: 2_000_000_000,
            created_ms: 1_700_000_000_000,
        }))
    }

    #[test]
    fn packet_encodes_and_decodes() {
        let packet = sample_offer();
        let bytes = packet.encode().unwrap();
        let decoded = XBridgePacket::decode(&bytes, 1).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.command.tx_id(), TxId::from_bytes([3u8; 32]));
        assert_eq!(decoded.command.name(), "offer");
    }

    #[test]
    fn wrong_version_is_malformed() {
        let bytes = sample_offer().encode().unwrap();
        assert!(matches!(XBridgePacket::decode(&bytes, 2), Err(BridgeError::MalformedPacket(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(XBridgePacket::decode(&[0xff, 0xff, 0xff], 1).is_err());
        let mut bytes = sample_offer().encode().unwrap();
        bytes.push(0);
        assert!(XBridgePacket::decode(&bytes, 1).is_err());
    }

    #[test]
    fn digest_is_stable_per_content() {
        let a = sample_offer();
        let b = sample_offer();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        let cancel = XBridgePacket::new(1, PacketCommand::Cancel {
            id: TxId::from_bytes([3u8; 32]),
            reason: CancelReason::Timeout,
        });
        assert_ne!(a.digest().unwrap(), cancel.digest().unwrap());
    }
}
