//! Parallel verification of independent proofs

use rayon::prelude::*;

use crate::{ChainVerificationResult, MicroProof, MicroProofVerdict, ProofLayer, ProofVerifier, Result, Subject};

/// One (subject, layers) pair to verify.
#[derive(Clone, Copy, Debug)]
pub struct BatchItem<'a> {
    pub subject: &'a Subject,
    pub layers: &'a [ProofLayer],
}

impl<'a> From<&'a MicroProof> for BatchItem<'a> {
    fn from(proof: &'a MicroProof) -> Self {
        Self {
            subject: &proof.subject,
            layers: &proof.proof_chain,
        }
    }
}

/// Results come back in input order.
pub fn verify_batch(verifier: &ProofVerifier, items: &[BatchItem<'_>]) -> Vec<Result<ChainVerificationResult>> {
    items
        .par_iter()
        .map(|item| verifier.verify_chain(item.subject, item.layers))
        .collect()
}

pub fn verify_micro_proofs(verifier: &ProofVerifier, proofs: &[MicroProof]) -> Vec<Result<MicroProofVerdict>> {
    proofs
        .par_iter()
        .map(|proof| verifier.verify_micro_proof(proof))
        .collect()
}
