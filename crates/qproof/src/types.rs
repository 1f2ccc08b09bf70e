//! Core types for inclusion-proof verification
//!
//! Typed shapes are built from the wire model in `wire.rs` and serialize
//! back to the same JSON shape the proof server emits (hashes as hex).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 32-byte hash
pub type Hash32 = [u8; 32];

pub const HASH_LEN: usize = 32;

/// Layer ordinals of the micro → thread → block hierarchy.
pub const LAYER_MICRO: u32 = 0;
pub const LAYER_THREAD: u32 = 1;
pub const LAYER_BLOCK: u32 = 2;

/// One level of a Merkle authentication path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofLayer {
    pub layer_index: u32,
    /// Position of the node in this layer's tree; bit `i` picks the side at step `i`.
    pub merkle_index: u64,
    #[serde(with = "hex32")]
    pub root: Hash32,
    /// Sibling hashes from leaf depth to root depth
    #[serde(with = "hex32_vec")]
    pub merkle_path: Vec<Hash32>,
    #[serde(skip_serializing_if = "Option::is_none", with = "hex_opt")]
    pub mss_signature: Option<Vec<u8>>,
}

impl ProofLayer {
    pub fn depth(&self) -> usize {
        self.merkle_path.len()
    }
}

/// The leaf being proven.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub block_number: u64,
    pub thread_id: u64,
    pub leaf_index: u64,
    #[serde(with = "hex32")]
    pub hash: Hash32,
}

/// Server timestamps. Display-only, so any JSON shape is accepted: RFC 3339,
/// naive date-time text (read as UTC), epoch milliseconds, or anything else
/// kept as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Rfc3339(DateTime<Utc>),
    EpochMillis(i64),
    Text(String),
    Other(serde_json::Value),
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Rfc3339(dt) => Some(*dt),
            Timestamp::EpochMillis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Timestamp::Text(text) => {
                let text = text.trim();
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
                    .or_else(|| {
                        NAIVE_FORMATS
                            .iter()
                            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                            .map(|naive| naive.and_utc())
                    })
            }
            // fractional epoch milliseconds
            Timestamp::Other(value) => value
                .as_f64()
                .filter(|ms| ms.is_finite())
                .and_then(|ms| Utc.timestamp_millis_opt(ms.trunc() as i64).single()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub block_number: u64,
    /// finalized | pending | skipped, or whatever else the server reports
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl BlockHeader {
    pub fn is_finalized(&self) -> bool {
        self.status.eq_ignore_ascii_case("finalized")
    }
}

/// The server's own verdict. Reported next to ours, never relied on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ServerVerification {
    pub valid: bool,
}

/// Subject plus its micro → thread → block proof layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MicroProof {
    pub subject: Subject,
    pub proof_chain: Vec<ProofLayer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_header: Option<BlockHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<ServerVerification>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize)]
pub struct LayerProofs {
    pub layer_proofs: Vec<ProofLayer>,
}

/// Finalized provenance record, linked to its predecessor by `parent_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofChainEntry {
    pub proofchain_id: String,
    #[serde(with = "hex32")]
    pub hash: Hash32,
    #[serde(with = "hex32")]
    pub parent_hash: Hash32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<u64>,
    pub proof_chain: LayerProofs,
}

impl ProofChainEntry {
    pub fn layers(&self) -> &[ProofLayer] {
        &self.proof_chain.layer_proofs
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// Layer carries no signature
    Absent,
    Valid,
    Invalid,
    /// Signature present but no verifier configured
    Unchecked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LayerResult {
    pub layer_index: u32,
    #[serde(with = "hex32")]
    pub computed_root: Hash32,
    #[serde(with = "hex32")]
    pub claimed_root: Hash32,
    pub matches_claimed_root: bool,
    pub signature: SignatureStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainVerificationResult {
    pub valid: bool,
    pub layer_results: Vec<LayerResult>,
    pub first_mismatch_layer: Option<u32>,
}

impl ChainVerificationResult {
    /// Root recomputed for the topmost layer.
    pub fn top_root(&self) -> Option<Hash32> {
        self.layer_results.last().map(|r| r.computed_root)
    }

    pub fn mismatched_layers(&self) -> Vec<u32> {
        self.layer_results
            .iter()
            .filter(|r| !r.matches_claimed_root)
            .map(|r| r.layer_index)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MicroProofVerdict {
    pub subject: Subject,
    pub result: ChainVerificationResult,
    pub server_claim: Option<bool>,
    /// None when the server made no claim
    pub claim_agrees: Option<bool>,
}

pub(crate) fn parse_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(s)
}

pub(crate) mod hex32 {
    use super::{parse_hex, Hash32, HASH_LEN};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(h: &Hash32, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(h))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Hash32, D::Error> {
        let text = String::deserialize(d)?;
        let bytes = parse_hex(&text).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| D::Error::custom(format!("expected {HASH_LEN} bytes, got {}", b.len())))
    }
}

pub(crate) mod hex32_vec {
    use super::Hash32;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(v: &[Hash32], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(hex::encode))
    }
}

pub(crate) mod hex_opt {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => s.serialize_str(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }
}
