//! Verify demo
//!
//! Shows:
//! 1. Proof server builds micro, thread and block trees and signs each root
//! 2. Explorer recomputes every layer and checks the signatures
//! 3. Evil server swaps a sibling but still claims "valid"
//! 4. Out-of-range index is reported as malformed, not as a failure
//! 5. Proofchain audit points at the broken link

use ed25519_dalek::{Signer, SigningKey};
use qproof::{
    ChainVerificationResult, Ed25519RootVerifier, Hash32, LayerProofs, MerkleTree, MicroProof,
    ProofChainEntry, ProofHasher, ProofLayer, ProofVerifier, ServerVerification, Subject, Verdict,
    VerifierConfig,
};

type DemoResult<T> = Result<T, Box<dyn std::error::Error>>;

fn leaves(hasher: &dyn ProofHasher, label: &str, count: usize) -> Vec<Hash32> {
    (0..count)
        .map(|i| hasher.hash(format!("{label}-{i}").as_bytes()))
        .collect()
}

fn tree(hasher: &dyn ProofHasher, leaves: &[Hash32]) -> DemoResult<MerkleTree> {
    MerkleTree::from_leaves(hasher, leaves).ok_or_else(|| "empty tree".into())
}

fn layer(tree: &MerkleTree, layer_index: u32, position: usize, key: &SigningKey) -> DemoResult<ProofLayer> {
    let mut layer = tree
        .layer_proof(layer_index, position)
        .ok_or("position outside tree")?;
    layer.mss_signature = Some(key.sign(&layer.root).to_bytes().to_vec());
    Ok(layer)
}

fn server_builds_proof(hasher: &dyn ProofHasher, key: &SigningKey) -> DemoResult<MicroProof> {
    let utxos = leaves(hasher, "utxo", 8);
    let micro = tree(hasher, &utxos)?;

    let mut threads = leaves(hasher, "thread", 4);
    threads[2] = micro.root();
    let thread = tree(hasher, &threads)?;

    let mut blocks = leaves(hasher, "block", 4);
    blocks[1] = thread.root();
    let block = tree(hasher, &blocks)?;

    Ok(MicroProof {
        subject: Subject {
            block_number: 840_000,
            thread_id: 2,
            leaf_index: 5,
            hash: utxos[5],
        },
        proof_chain: vec![
            layer(&micro, 0, 5, key)?,
            layer(&thread, 1, 2, key)?,
            layer(&block, 2, 1, key)?,
        ],
        block_header: None,
        verification: Some(ServerVerification { valid: true }),
    })
}

fn print_layers(result: &ChainVerificationResult) {
    for r in &result.layer_results {
        println!(
            "   layer {}: root {}…  {}  signature {:?}",
            r.layer_index,
            &hex::encode(r.computed_root)[..16],
            if r.matches_claimed_root { "✓ matches" } else { "✗ MISMATCH" },
            r.signature,
        );
    }
}

fn entry(id: &str, hash: Hash32, parent: Hash32) -> ProofChainEntry {
    ProofChainEntry {
        proofchain_id: id.to_string(),
        hash,
        parent_hash: parent,
        timestamp: None,
        block_number: None,
        thread_id: None,
        leaf_index: None,
        proof_chain: LayerProofs::default(),
    }
}

fn main() -> DemoResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("╔════════════════════════════════════════════════╗");
    println!("║  QProof - Inclusion Proof Demo                 ║");
    println!("║  micro → thread → block, recomputed locally    ║");
    println!("╚════════════════════════════════════════════════╝\n");

    let key = SigningKey::from_bytes(&[7u8; 32]);
    let config = VerifierConfig {
        require_signatures: true,
        ..VerifierConfig::default()
    }
    .with_layer_depths(&[3, 2, 2]);
    let verifier = ProofVerifier::new(config)
        .with_signature_verifier(Box::new(Ed25519RootVerifier::new(key.verifying_key())));

    // 1. Server builds the proof
    println!("📝 Step 1: Proof server builds and signs a proof");
    println!("   ─────────────────────────────────────────────");
    let proof = server_builds_proof(verifier.hasher(), &key)?;
    let wire = serde_json::to_string(&proof)?;
    println!("   Subject: block {} thread {} leaf {}", proof.subject.block_number, proof.subject.thread_id, proof.subject.leaf_index);
    println!("   Wire size: {} bytes of JSON\n", wire.len());

    // 2. Explorer verifies from the wire form
    println!("🔍 Step 2: Explorer verifies independently");
    println!("   ───────────────────────────────────────");
    let received = MicroProof::from_json(&wire)?;
    let checked = verifier.verify_micro_proof(&received)?;
    print_layers(&checked.result);
    println!("   Verdict: {}\n", Verdict::from_result(&checked.result).label());

    // 3. Evil server swaps a thread-layer sibling
    println!("😈 Step 3: Evil server tampers with the thread layer");
    println!("   ─────────────────────────────────────────────────");
    let mut tampered = received.clone();
    tampered.proof_chain[1].merkle_path[0][0] ^= 0x01;
    let checked = verifier.verify_micro_proof(&tampered)?;
    print_layers(&checked.result);
    println!("   Server claims valid: {:?}", checked.server_claim);
    println!("   Verdict: {}", Verdict::from_result(&checked.result).label());
    if checked.claim_agrees == Some(false) {
        println!("   ✗ TAMPERING DETECTED, server verdict ignored");
    }
    println!();

    // 4. Malformed index
    println!("⚠️  Step 4: Index that cannot fit the path");
    println!("   ───────────────────────────────────────");
    let mut malformed = received.clone();
    malformed.proof_chain[0].merkle_index = 1 << 20;
    let outcome = verifier.verify_chain(&malformed.subject, &malformed.proof_chain);
    let verdict = Verdict::from_outcome(&outcome);
    println!("   Verdict: {} ({:?})\n", verdict.label(), verdict);

    // 5. Proofchain audit
    println!("🔗 Step 5: Proofchain audit");
    println!("   ────────────────────────");
    let h = |s: &str| verifier.hasher().hash(s.as_bytes());
    let e0 = entry("pc-0", h("zero"), [0u8; 32]);
    let e1 = entry("pc-1", h("one"), e0.hash);
    let e2 = entry("pc-2", h("two"), h("forged parent"));
    let audit = verifier.audit_proof_chain(&[e0, e1, e2], true);
    for link in &audit.links {
        println!("   {}: {:?}", link.proofchain_id, link.status);
    }
    println!("   Consistent: {}  first broken: {:?}\n", audit.consistent, audit.first_broken_link);

    println!("╔════════════════════════════════════════════════╗");
    println!("║  Summary                                       ║");
    println!("╠════════════════════════════════════════════════╣");
    println!("║  ✓ Roots recomputed, server verdict not used   ║");
    println!("║  ✓ Divergence pinned to a single layer         ║");
    println!("║  ✓ Malformed proofs never look verified        ║");
    println!("╚════════════════════════════════════════════════╝");

    Ok(())
}
