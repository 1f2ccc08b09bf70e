//! QProof inclusion-proof verifier
//!
//! Recomputes micro → thread → block Merkle roots from a subject hash and its
//! proof layers, independently of any verdict the proof server supplies.

mod types;
mod wire;
mod crypto;
mod merkle;
mod chain;
mod signature;
mod config;
mod report;
mod batch;

pub use types::{
    Hash32, HASH_LEN, LAYER_MICRO, LAYER_THREAD, LAYER_BLOCK, ProofLayer, Subject, Timestamp,
    BlockHeader, ServerVerification, MicroProof, LayerProofs, ProofChainEntry, SignatureStatus,
    LayerResult, ChainVerificationResult, MicroProofVerdict,
};
pub use wire::{
    RawProofLayer, RawSubject, RawBlockHeader, RawVerification, RawMicroProof, RawLayerProofs, RawEntryLayers,
    RawProofChainEntry,
};
pub use crypto::{ProofHasher, Blake3Hasher, Sha256Hasher, HashAlgorithm};
pub use merkle::{fold_path, MerkleTree};
pub use chain::{LinkStatus, LinkResult, ChainAudit};
pub use signature::{RootSignatureVerifier, Ed25519RootVerifier};
pub use config::{VerifierConfig, DEFAULT_MAX_DEPTH};
pub use report::{Verdict, ValidationReport};
pub use batch::{BatchItem, verify_batch, verify_micro_proofs};

use thiserror::Error;
use tracing::debug;

/// The proof's shape is invalid, independent of any hashing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("malformed hash in {field}: {reason}")]
    MalformedHash { field: String, reason: String },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("merkle index {index} out of range for path depth {depth}")]
    IndexOutOfRange { index: u64, depth: usize },

    #[error("path depth {got} does not match expected depth {expected}")]
    DepthMismatch { expected: usize, got: usize },

    #[error("path depth {got} exceeds maximum {max}")]
    DepthTooLarge { max: usize, got: usize },

    #[error("proof chain has no layers")]
    EmptyChain,

    #[error("layer at position {position} has index {got}, expected {expected}")]
    NonContiguousLayers { position: usize, expected: u32, got: u32 },
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed proof: {source}")]
    Structural {
        layer: Option<u32>,
        source: StructuralError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StructuralError> for VerifyError {
    fn from(source: StructuralError) -> Self {
        VerifyError::Structural { layer: None, source }
    }
}

impl VerifyError {
    /// Layer the failure was found in, when known
    pub fn layer(&self) -> Option<u32> {
        match self {
            VerifyError::Structural { layer, .. } => *layer,
            VerifyError::Json(_) => None,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, VerifyError::Structural { .. })
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;

/// Stateless proof verifier. Safe to share across threads.
pub struct ProofVerifier {
    config: VerifierConfig,
    hasher: Box<dyn ProofHasher>,
    signatures: Option<Box<dyn RootSignatureVerifier>>,
}

impl ProofVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        let hasher = config.hash.hasher();
        Self::with_hasher(config, hasher)
    }

    /// Use a hasher other than the built-in one named by `config.hash`
    pub fn with_hasher(config: VerifierConfig, hasher: Box<dyn ProofHasher>) -> Self {
        Self {
            config,
            hasher,
            signatures: None,
        }
    }

    pub fn with_signature_verifier(mut self, verifier: Box<dyn RootSignatureVerifier>) -> Self {
        self.signatures = Some(verifier);
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn hasher(&self) -> &dyn ProofHasher {
        self.hasher.as_ref()
    }

    /// Fold `leaf_hash` up `layer.merkle_path` and compare with `layer.root`.
    ///
    /// A mismatch is a normal result. Only shape problems are errors.
    pub fn verify_layer(
        &self,
        leaf_hash: &Hash32,
        layer: &ProofLayer,
    ) -> std::result::Result<LayerResult, StructuralError> {
        let depth = layer.depth();
        if depth > self.config.max_depth {
            return Err(StructuralError::DepthTooLarge {
                max: self.config.max_depth,
                got: depth,
            });
        }
        if let Some(expected) = self.config.expected_depth(layer.layer_index) {
            if expected != depth {
                return Err(StructuralError::DepthMismatch { expected, got: depth });
            }
        }

        let computed_root = fold_path(self.hasher(), leaf_hash, layer.merkle_index, &layer.merkle_path)?;

        let signature = match (&layer.mss_signature, &self.signatures) {
            (None, _) => SignatureStatus::Absent,
            (Some(_), None) => SignatureStatus::Unchecked,
            (Some(sig), Some(v)) => {
                if v.verify_root(&layer.root, sig) {
                    SignatureStatus::Valid
                } else {
                    SignatureStatus::Invalid
                }
            }
        };

        Ok(LayerResult {
            layer_index: layer.layer_index,
            computed_root,
            claimed_root: layer.root,
            matches_claimed_root: computed_root == layer.root,
            signature,
        })
    }

    /// Verify layers in order, each layer's claimed root feeding the next as its leaf.
    pub fn verify_chain(&self, subject: &Subject, layers: &[ProofLayer]) -> Result<ChainVerificationResult> {
        check_layer_order(layers)?;

        let mut leaf = subject.hash;
        let mut layer_results = Vec::with_capacity(layers.len());
        let mut first_mismatch_layer = None;

        for layer in layers {
            let result = self
                .verify_layer(&leaf, layer)
                .map_err(|source| VerifyError::Structural {
                    layer: Some(layer.layer_index),
                    source,
                })?;

            let signed = !self.config.require_signatures || result.signature == SignatureStatus::Valid;
            if !(result.matches_claimed_root && signed) {
                debug!(
                    layer = layer.layer_index,
                    block = subject.block_number,
                    thread = subject.thread_id,
                    leaf = subject.leaf_index,
                    root_matches = result.matches_claimed_root,
                    signature = ?result.signature,
                    "proof layer rejected"
                );
                first_mismatch_layer.get_or_insert(layer.layer_index);
            }

            // claimed root, not computed: a divergence stays attributed to one layer
            leaf = layer.root;
            layer_results.push(result);
        }

        Ok(ChainVerificationResult {
            valid: first_mismatch_layer.is_none(),
            layer_results,
            first_mismatch_layer,
        })
    }

    /// `previous = None` means `entry` must be the genesis entry.
    pub fn verify_chain_link(&self, entry: &ProofChainEntry, previous: Option<&ProofChainEntry>) -> bool {
        !chain::link_status(entry, previous, &self.config.genesis_parent).is_broken()
    }

    /// Audit parent links across `entries`. With `anchored = false` the first
    /// entry's parent is not checked against the genesis sentinel.
    pub fn audit_proof_chain(&self, entries: &[ProofChainEntry], anchored: bool) -> ChainAudit {
        chain::audit(entries, &self.config.genesis_parent, anchored)
    }

    pub fn verify_micro_proof(&self, proof: &MicroProof) -> Result<MicroProofVerdict> {
        let result = self.verify_chain(&proof.subject, &proof.proof_chain)?;
        let server_claim = proof.verification.map(|v| v.valid);
        let claim_agrees = server_claim.map(|claimed| claimed == result.valid);

        Ok(MicroProofVerdict {
            subject: proof.subject.clone(),
            result,
            server_claim,
            claim_agrees,
        })
    }

    /// Verify a finalized entry's `layer_proofs` for the given subject leaf.
    pub fn verify_proof_chain_entry(
        &self,
        entry: &ProofChainEntry,
        leaf_hash: &Hash32,
    ) -> Result<ChainVerificationResult> {
        let subject = Subject {
            block_number: entry.block_number.unwrap_or_default(),
            thread_id: entry.thread_id.unwrap_or_default(),
            leaf_index: entry.leaf_index.unwrap_or_default(),
            hash: *leaf_hash,
        };
        self.verify_chain(&subject, entry.layers())
    }

    pub fn verify_batch(&self, items: &[BatchItem<'_>]) -> Vec<Result<ChainVerificationResult>> {
        batch::verify_batch(self, items)
    }
}

impl Default for ProofVerifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

fn check_layer_order(layers: &[ProofLayer]) -> Result<()> {
    if layers.is_empty() {
        return Err(StructuralError::EmptyChain.into());
    }
    for (position, layer) in layers.iter().enumerate() {
        let expected = position as u32;
        if layer.layer_index != expected {
            return Err(VerifyError::Structural {
                layer: Some(layer.layer_index),
                source: StructuralError::NonContiguousLayers {
                    position,
                    expected,
                    got: layer.layer_index,
                },
            });
        }
    }
    Ok(())
}
