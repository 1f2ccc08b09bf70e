use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use qproof::{
    Hash32, LayerProofs, MerkleTree, MicroProof, ProofChainEntry, ProofHasher, ProofVerifier,
    ServerVerification, Subject,
};

use crate::config::AppConfig;
use crate::source::{ProofSource, SourceInfo};
use crate::state::{AppState, SharedState};
use crate::types::SubjectRef;

#[derive(Default)]
pub struct FakeSource {
    pub proofs: HashMap<SubjectRef, JsonValue>,
    pub chains: HashMap<SubjectRef, JsonValue>,
    pub down: bool,
}

#[async_trait]
impl ProofSource for FakeSource {
    async fn micro_proof(&self, at: SubjectRef) -> anyhow::Result<Option<JsonValue>> {
        if self.down {
            anyhow::bail!("connection refused");
        }
        Ok(self.proofs.get(&at).cloned())
    }

    async fn proofchain(&self, at: SubjectRef) -> anyhow::Result<Option<JsonValue>> {
        if self.down {
            anyhow::bail!("connection refused");
        }
        Ok(self.chains.get(&at).cloned())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn info(&self) -> SourceInfo {
        SourceInfo { name: "fake".into(), base_url: String::new() }
    }
}

pub fn state_with(source: FakeSource) -> SharedState {
    let cfg = AppConfig::from_lookup(|_| None).unwrap();
    Arc::new(AppState::new(cfg, ProofVerifier::default(), Arc::new(source)))
}

/// Three real trees: subject at micro leaf 3, micro root at thread leaf 1,
/// thread root at block leaf 2.
pub fn sample_proof(hasher: &dyn ProofHasher, at: SubjectRef) -> MicroProof {
    let leaves = |label: &str, n: usize| -> Vec<Hash32> {
        (0..n).map(|i| hasher.hash(format!("{label}-{i}").as_bytes())).collect()
    };

    let micro_leaves = leaves("utxo", 4);
    let micro = MerkleTree::from_leaves(hasher, &micro_leaves).unwrap();
    let mut thread_leaves = leaves("thread", 2);
    thread_leaves[1] = micro.root();
    let thread = MerkleTree::from_leaves(hasher, &thread_leaves).unwrap();
    let mut block_leaves = leaves("block", 4);
    block_leaves[2] = thread.root();
    let block = MerkleTree::from_leaves(hasher, &block_leaves).unwrap();

    MicroProof {
        subject: Subject {
            block_number: at.block,
            thread_id: at.thread,
            leaf_index: at.leaf,
            hash: micro_leaves[3],
        },
        proof_chain: vec![
            micro.layer_proof(0, 3).unwrap(),
            thread.layer_proof(1, 1).unwrap(),
            block.layer_proof(2, 2).unwrap(),
        ],
        block_header: None,
        verification: Some(ServerVerification { valid: true }),
    }
}

pub fn sample_entry(id: &str, proof: &MicroProof) -> ProofChainEntry {
    ProofChainEntry {
        proofchain_id: id.to_string(),
        hash: [0x11; 32],
        parent_hash: [0; 32],
        timestamp: None,
        block_number: Some(proof.subject.block_number),
        thread_id: Some(proof.subject.thread_id),
        leaf_index: Some(proof.subject.leaf_index),
        proof_chain: LayerProofs { layer_proofs: proof.proof_chain.clone() },
    }
}
