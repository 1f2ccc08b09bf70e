//! Proof server JSON shapes and their conversion to typed records
//!
//! Every field the verifier depends on is optional here so that an absent
//! field surfaces as `StructuralError::MissingField` naming it, rather than
//! as an opaque deserialization failure.

use serde::Deserialize;

use crate::types::{
    parse_hex, BlockHeader, LayerProofs, MicroProof, ProofChainEntry, ProofLayer,
    ServerVerification, Subject, Timestamp,
};
use crate::{Hash32, Result, StructuralError, VerifyError, HASH_LEN};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawProofLayer {
    pub layer_index: Option<u32>,
    pub merkle_index: Option<u64>,
    pub root: Option<String>,
    pub merkle_path: Option<Vec<String>>,
    #[serde(default)]
    pub mss_signature: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSubject {
    pub block_number: Option<u64>,
    pub thread_id: Option<u64>,
    pub leaf_index: Option<u64>,
    pub hash: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawBlockHeader {
    pub block_number: Option<u64>,
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawVerification {
    pub valid: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawMicroProof {
    pub subject: Option<RawSubject>,
    pub proof_chain: Option<Vec<RawProofLayer>>,
    #[serde(default)]
    pub block_header: Option<RawBlockHeader>,
    #[serde(default)]
    pub verification: Option<RawVerification>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawLayerProofs {
    #[serde(default)]
    pub layer_proofs: Option<Vec<RawProofLayer>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawProofChainEntry {
    /// Servers emit this as either a string or a number
    pub proofchain_id: Option<serde_json::Value>,
    pub hash: Option<String>,
    pub parent_hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub thread_id: Option<u64>,
    #[serde(default)]
    pub leaf_index: Option<u64>,
    #[serde(default)]
    pub proof_chain: Option<RawEntryLayers>,
}

/// Entries carry their layers either wrapped in `layer_proofs` or as a bare
/// array.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawEntryLayers {
    Bare(Vec<RawProofLayer>),
    Wrapped(RawLayerProofs),
}

impl RawEntryLayers {
    fn into_layers(self) -> Option<Vec<RawProofLayer>> {
        match self {
            RawEntryLayers::Bare(layers) => Some(layers),
            RawEntryLayers::Wrapped(wrapped) => wrapped.layer_proofs,
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> std::result::Result<T, StructuralError> {
    value.ok_or_else(|| StructuralError::MissingField(field.to_string()))
}

pub(crate) fn decode_hash(text: &str, field: &str) -> std::result::Result<Hash32, StructuralError> {
    let bytes = parse_hex(text).map_err(|e| StructuralError::MalformedHash {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    bytes.try_into().map_err(|b: Vec<u8>| StructuralError::MalformedHash {
        field: field.to_string(),
        reason: format!("expected {HASH_LEN} bytes, got {}", b.len()),
    })
}

fn decode_signature(text: &str) -> std::result::Result<Option<Vec<u8>>, StructuralError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_hex(text)
        .map(Some)
        .map_err(|e| StructuralError::MalformedSignature(e.to_string()))
}

impl TryFrom<RawProofLayer> for ProofLayer {
    type Error = StructuralError;

    fn try_from(raw: RawProofLayer) -> std::result::Result<Self, Self::Error> {
        let layer_index = required(raw.layer_index, "layer_index")?;
        let merkle_index = required(raw.merkle_index, "merkle_index")?;
        let root = decode_hash(&required(raw.root, "root")?, "root")?;
        let merkle_path = required(raw.merkle_path, "merkle_path")?
            .iter()
            .enumerate()
            .map(|(i, s)| decode_hash(s, &format!("merkle_path[{i}]")))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mss_signature = match raw.mss_signature {
            Some(s) => decode_signature(&s)?,
            None => None,
        };

        Ok(ProofLayer {
            layer_index,
            merkle_index,
            root,
            merkle_path,
            mss_signature,
        })
    }
}

/// Converts a layer list, tagging any failure with the offending layer.
fn convert_layers(raw: Vec<RawProofLayer>) -> Result<Vec<ProofLayer>> {
    raw.into_iter()
        .enumerate()
        .map(|(pos, layer)| {
            let tag = layer.layer_index.unwrap_or(pos as u32);
            ProofLayer::try_from(layer).map_err(|source| VerifyError::Structural {
                layer: Some(tag),
                source,
            })
        })
        .collect()
}

impl TryFrom<RawSubject> for Subject {
    type Error = StructuralError;

    fn try_from(raw: RawSubject) -> std::result::Result<Self, Self::Error> {
        Ok(Subject {
            block_number: required(raw.block_number, "subject.block_number")?,
            thread_id: required(raw.thread_id, "subject.thread_id")?,
            leaf_index: required(raw.leaf_index, "subject.leaf_index")?,
            hash: decode_hash(&required(raw.hash, "subject.hash")?, "subject.hash")?,
        })
    }
}

impl TryFrom<RawBlockHeader> for BlockHeader {
    type Error = StructuralError;

    fn try_from(raw: RawBlockHeader) -> std::result::Result<Self, Self::Error> {
        Ok(BlockHeader {
            block_number: required(raw.block_number, "block_header.block_number")?,
            status: required(raw.status, "block_header.status")?,
            created_at: raw.created_at,
        })
    }
}

impl TryFrom<RawMicroProof> for MicroProof {
    type Error = VerifyError;

    fn try_from(raw: RawMicroProof) -> Result<Self> {
        let subject = Subject::try_from(required(raw.subject, "subject")?)?;
        let proof_chain = convert_layers(required(raw.proof_chain, "proof_chain")?)?;
        let block_header = raw.block_header.map(BlockHeader::try_from).transpose()?;
        let verification = raw
            .verification
            .and_then(|v| v.valid)
            .map(|valid| ServerVerification { valid });

        Ok(MicroProof {
            subject,
            proof_chain,
            block_header,
            verification,
        })
    }
}

impl TryFrom<RawProofChainEntry> for ProofChainEntry {
    type Error = VerifyError;

    fn try_from(raw: RawProofChainEntry) -> Result<Self> {
        let proofchain_id = match required(raw.proofchain_id, "proofchain_id")? {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let hash = decode_hash(&required(raw.hash, "hash")?, "hash")?;
        let parent_hash = decode_hash(&required(raw.parent_hash, "parent_hash")?, "parent_hash")?;
        let layer_proofs = match raw.proof_chain.and_then(RawEntryLayers::into_layers) {
            Some(layers) => convert_layers(layers)?,
            None => Vec::new(),
        };

        Ok(ProofChainEntry {
            proofchain_id,
            hash,
            parent_hash,
            timestamp: raw.timestamp,
            block_number: raw.block_number,
            thread_id: raw.thread_id,
            leaf_index: raw.leaf_index,
            proof_chain: LayerProofs { layer_proofs },
        })
    }
}

impl MicroProof {
    pub fn from_json(s: &str) -> Result<Self> {
        let raw: RawMicroProof = serde_json::from_str(s)?;
        MicroProof::try_from(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawMicroProof = serde_json::from_value(value)?;
        MicroProof::try_from(raw)
    }
}

impl ProofChainEntry {
    pub fn from_json(s: &str) -> Result<Self> {
        let raw: RawProofChainEntry = serde_json::from_str(s)?;
        ProofChainEntry::try_from(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawProofChainEntry = serde_json::from_value(value)?;
        ProofChainEntry::try_from(raw)
    }
}
