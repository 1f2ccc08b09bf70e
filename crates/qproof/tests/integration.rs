
use _fixtures::{default_chain, flip_bit, three_layer};
use ed25519_dalek::{Signer as _, SigningKey};
use qproof::{
    Blake3Hasher, BatchItem, Ed25519RootVerifier, HashAlgorithm, LayerProofs, LinkStatus, MerkleTree,
    MicroProof, ProofChainEntry, ProofHasher, ProofLayer, ProofVerifier, Sha256Hasher, SignatureStatus,
    StructuralError, Subject, ValidationReport, Verdict, VerifierConfig, VerifyError,
};
use rand::Rng;
use rand_core::OsRng;

#[test]
fn test_three_layer_chain_verifies() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());

    let result = verifier.verify_chain(&fx.subject, &fx.layers).unwrap();

    assert!(result.valid);
    assert_eq!(result.first_mismatch_layer, None);
    assert_eq!(result.layer_results.len(), 3);
    assert!(result.layer_results.iter().all(|r| r.matches_claimed_root));
    assert_eq!(result.top_root(), Some(fx.layers[2].root));
}

#[test]
fn test_index_0b01_combination_order() {
    let hasher = Blake3Hasher;
    let verifier = ProofVerifier::default();
    let leaf = hasher.hash(b"L");
    let a = hasher.hash(b"A");
    let b = hasher.hash(b"B");

    // bit0 = 1: H(A || L); bit1 = 0: H(result || B)
    let step0 = hasher.hash_pair(&a, &leaf);
    let root = hasher.hash_pair(&step0, &b);

    let layer = ProofLayer {
        layer_index: 0,
        merkle_index: 0b01,
        root,
        merkle_path: vec![a, b],
        mss_signature: None,
    };
    let res = verifier.verify_layer(&leaf, &layer).unwrap();
    assert!(res.matches_claimed_root);
    assert_eq!(res.computed_root, root);

    // every other combination order must miss
    let wrong_roots = [
        hasher.hash_pair(&hasher.hash_pair(&leaf, &a), &b),
        hasher.hash_pair(&b, &hasher.hash_pair(&a, &leaf)),
        hasher.hash_pair(&b, &hasher.hash_pair(&leaf, &a)),
    ];
    for wrong in wrong_roots {
        let res = verifier
            .verify_layer(&leaf, &ProofLayer { root: wrong, ..layer.clone() })
            .unwrap();
        assert!(!res.matches_claimed_root);
    }
    for index in [0b00, 0b10, 0b11] {
        let res = verifier
            .verify_layer(&leaf, &ProofLayer { merkle_index: index, ..layer.clone() })
            .unwrap();
        assert!(!res.matches_claimed_root, "index {index:#b} should not match");
    }
}

#[test]
fn test_layer_one_built_for_other_leaf_reports_layer_one() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());

    // thread layer whose tree holds some other micro root
    let other_micro = {
        let leaves: Vec<_> = (0..8).map(|i| verifier.hasher().hash(format!("other-{i}").as_bytes())).collect();
        MerkleTree::from_leaves(verifier.hasher(), &leaves).unwrap()
    };
    assert_ne!(other_micro.root(), fx.layers[0].root);

    let mut thread_leaves: Vec<_> = (0..4).map(|i| verifier.hasher().hash(format!("thread-{i}").as_bytes())).collect();
    thread_leaves[2] = other_micro.root();
    let thread = MerkleTree::from_leaves(verifier.hasher(), &thread_leaves).unwrap();

    let layers = vec![
        fx.layers[0].clone(),
        thread.layer_proof(1, 2).unwrap(),
        fx.layers[2].clone(),
    ];

    let result = verifier.verify_chain(&fx.subject, &layers).unwrap();
    assert!(!result.valid);
    assert!(result.layer_results[0].matches_claimed_root);
    assert_eq!(result.first_mismatch_layer, Some(1));
}

#[test]
fn test_single_bit_flip_affects_only_its_layer() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());

    for layer_pos in 0..fx.layers.len() {
        for sibling in 0..fx.layers[layer_pos].merkle_path.len() {
            for bit in [0, 7, 100, 255] {
                let mut layers = fx.layers.clone();
                flip_bit(&mut layers[layer_pos].merkle_path[sibling], bit);

                let result = verifier.verify_chain(&fx.subject, &layers).unwrap();
                assert!(!result.valid);
                assert_eq!(result.first_mismatch_layer, Some(layer_pos as u32));
                assert_eq!(result.mismatched_layers(), vec![layer_pos as u32]);
            }
        }
    }
}

#[test]
fn test_mismatch_does_not_stop_evaluation() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());
    let mut layers = fx.layers.clone();
    flip_bit(&mut layers[0].merkle_path[0], 3);
    flip_bit(&mut layers[2].merkle_path[1], 3);

    let result = verifier.verify_chain(&fx.subject, &layers).unwrap();
    assert_eq!(result.layer_results.len(), 3);
    assert_eq!(result.mismatched_layers(), vec![0, 2]);
    assert_eq!(result.first_mismatch_layer, Some(0));
}

#[test]
fn test_reversed_chain_is_structural() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());
    let mut layers = fx.layers.clone();
    layers.reverse();

    let err = verifier.verify_chain(&fx.subject, &layers).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::Structural { source: StructuralError::NonContiguousLayers { .. }, .. }
    ));
    assert_eq!(Verdict::from_outcome(&Err(err)).label(), "Malformed Proof");
}

#[test]
fn test_index_out_of_range_is_structural() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());

    let mut layers = fx.layers.clone();
    let depth = layers[1].merkle_path.len();
    layers[1].merkle_index = 1 << depth;

    match verifier.verify_chain(&fx.subject, &layers) {
        Err(VerifyError::Structural { layer, source }) => {
            assert_eq!(layer, Some(1));
            assert_eq!(source, StructuralError::IndexOutOfRange { index: 1 << depth, depth });
        }
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn test_expected_depth_enforced() {
    let fx = default_chain(&Blake3Hasher);
    let matching = ProofVerifier::new(VerifierConfig::default().with_layer_depths(&[3, 2, 4]));
    assert!(matching.verify_chain(&fx.subject, &fx.layers).unwrap().valid);

    let wrong = ProofVerifier::new(VerifierConfig::default().with_layer_depths(&[3, 3, 4]));
    let err = wrong.verify_chain(&fx.subject, &fx.layers).unwrap_err();
    assert_eq!(err.layer(), Some(1));
}

#[test]
fn test_verification_is_idempotent() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());
    let mut layers = fx.layers.clone();
    flip_bit(&mut layers[1].merkle_path[0], 9);

    let first = verifier.verify_chain(&fx.subject, &layers).unwrap();
    let second = verifier.verify_chain(&fx.subject, &layers).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_hashers_do_not_cross_verify() {
    let sha_fx = default_chain(&Sha256Hasher);
    let blake_fx = default_chain(&Blake3Hasher);

    let sha = ProofVerifier::new(VerifierConfig { hash: HashAlgorithm::Sha256, ..VerifierConfig::default() });
    let blake = ProofVerifier::default();

    assert!(sha.verify_chain(&sha_fx.subject, &sha_fx.layers).unwrap().valid);
    assert!(blake.verify_chain(&blake_fx.subject, &blake_fx.layers).unwrap().valid);
    assert!(!blake.verify_chain(&sha_fx.subject, &sha_fx.layers).unwrap().valid);
}

#[test]
fn test_server_claim_is_not_trusted() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());

    let honest = verifier.verify_micro_proof(&fx.micro_proof(true)).unwrap();
    assert!(honest.result.valid);
    assert_eq!(honest.claim_agrees, Some(true));

    let mut tampered = fx.micro_proof(true);
    tampered.subject.hash = verifier.hasher().hash(b"forged utxo");
    let verdict = verifier.verify_micro_proof(&tampered).unwrap();
    assert!(!verdict.result.valid);
    assert_eq!(verdict.server_claim, Some(true));
    assert_eq!(verdict.claim_agrees, Some(false));
    assert_eq!(verdict.result.first_mismatch_layer, Some(0));
}

#[test]
fn test_micro_proof_json_end_to_end() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());
    let json = serde_json::to_string(&fx.micro_proof(true)).unwrap();

    let parsed = MicroProof::from_json(&json).unwrap();
    let verdict = verifier.verify_micro_proof(&parsed).unwrap();
    assert!(verdict.result.valid);

    let report = ValidationReport::from_outcome(&Ok(verdict.result), parsed.proof_chain.len());
    assert!(report.valid);
    assert_eq!(report.proof_layers, 3);
    assert_eq!(report.root, hex::encode(fx.layers[2].root));
}

#[test]
fn test_malformed_json_hash_is_structural() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());
    let mut value = serde_json::to_value(fx.micro_proof(true)).unwrap();
    value["proof_chain"][2]["merkle_path"][0] = serde_json::json!("abcdef");

    let err = MicroProof::from_value(value).unwrap_err();
    assert_eq!(err.layer(), Some(2));
    assert!(matches!(
        err,
        VerifyError::Structural { source: StructuralError::MalformedHash { .. }, .. }
    ));
}

fn signed(layers: &[ProofLayer], key: &SigningKey) -> Vec<ProofLayer> {
    layers
        .iter()
        .map(|l| ProofLayer {
            mss_signature: Some(key.sign(&l.root).to_bytes().to_vec()),
            ..l.clone()
        })
        .collect()
}

#[test]
fn test_required_root_signatures() {
    let key = SigningKey::generate(&mut OsRng);
    let config = VerifierConfig { require_signatures: true, ..VerifierConfig::default() };
    let verifier = ProofVerifier::new(config)
        .with_signature_verifier(Box::new(Ed25519RootVerifier::new(key.verifying_key())));
    let fx = default_chain(verifier.hasher());

    let layers = signed(&fx.layers, &key);
    let result = verifier.verify_chain(&fx.subject, &layers).unwrap();
    assert!(result.valid);
    assert!(result.layer_results.iter().all(|r| r.signature == SignatureStatus::Valid));

    // thread layer signed over the block root
    let mut swapped = layers.clone();
    swapped[1].mss_signature = layers[2].mss_signature.clone();
    let result = verifier.verify_chain(&fx.subject, &swapped).unwrap();
    assert!(!result.valid);
    assert!(result.layer_results[1].matches_claimed_root);
    assert_eq!(result.layer_results[1].signature, SignatureStatus::Invalid);
    assert_eq!(result.first_mismatch_layer, Some(1));

    let report = ValidationReport::from_outcome(&Ok(result), swapped.len());
    assert_eq!(report.error_message.as_deref(), Some("layer 1 root signature is invalid"));

    // unsigned proofs fail when signatures are required
    let result = verifier.verify_chain(&fx.subject, &fx.layers).unwrap();
    assert_eq!(result.first_mismatch_layer, Some(0));
    let report = ValidationReport::from_outcome(&Ok(result), fx.layers.len());
    assert_eq!(report.error_message.as_deref(), Some("layer 0 root is not signed"));
}

#[test]
fn test_signatures_reported_but_optional() {
    let key = SigningKey::generate(&mut OsRng);
    let other = SigningKey::generate(&mut OsRng);
    let verifier = ProofVerifier::default()
        .with_signature_verifier(Box::new(Ed25519RootVerifier::new(key.verifying_key())));
    let fx = default_chain(verifier.hasher());

    let layers = signed(&fx.layers, &other);
    let result = verifier.verify_chain(&fx.subject, &layers).unwrap();
    assert!(result.valid);
    assert!(result.layer_results.iter().all(|r| r.signature == SignatureStatus::Invalid));
}

fn entry(id: &str, hash: &[u8], parent: [u8; 32]) -> ProofChainEntry {
    ProofChainEntry {
        proofchain_id: id.to_string(),
        hash: blake3::hash(hash).into(),
        parent_hash: parent,
        timestamp: None,
        block_number: None,
        thread_id: None,
        leaf_index: None,
        proof_chain: LayerProofs::default(),
    }
}

#[test]
fn test_chain_link_three_entries() {
    let verifier = ProofVerifier::default();
    let e0 = entry("pc-0", b"zero", [0u8; 32]);
    let e1 = entry("pc-1", b"one", e0.hash);
    let e2 = entry("pc-2", b"two", blake3::hash(b"somewhere else").into());

    assert!(verifier.verify_chain_link(&e0, None));
    assert!(verifier.verify_chain_link(&e1, Some(&e0)));
    assert!(!verifier.verify_chain_link(&e2, Some(&e1)));

    let audit = verifier.audit_proof_chain(&[e0, e1.clone(), e2.clone()], true);
    assert!(!audit.consistent);
    assert_eq!(audit.first_broken_link, Some(2));
    assert_eq!(
        audit.links[2].status,
        LinkStatus::Broken { expected: e1.hash, found: e2.parent_hash }
    );
}

#[test]
fn test_custom_genesis_parent() {
    let genesis = [0xee; 32];
    let verifier = ProofVerifier::new(VerifierConfig { genesis_parent: genesis, ..VerifierConfig::default() });
    assert!(verifier.verify_chain_link(&entry("g", b"g", genesis), None));
    assert!(!verifier.verify_chain_link(&entry("g", b"g", [0u8; 32]), None));
}

#[test]
fn test_proofchain_entry_layer_proofs() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());
    let mut e = entry("final", b"final", [0u8; 32]);
    e.proof_chain = LayerProofs { layer_proofs: fx.layers.clone() };

    assert!(verifier.verify_proof_chain_entry(&e, &fx.subject.hash).unwrap().valid);
    let wrong = verifier.verify_proof_chain_entry(&e, &[1u8; 32]).unwrap();
    assert_eq!(wrong.first_mismatch_layer, Some(0));
}

#[test]
fn test_batch_matches_sequential() {
    let verifier = ProofVerifier::default();
    let fixtures: Vec<_> = (0..32)
        .map(|i| three_layer(verifier.hasher(), [16, 8, 4], [i % 16, i % 8, i % 4]))
        .collect();
    let mut broken = fixtures[7].layers.clone();
    flip_bit(&mut broken[2].merkle_path[0], 1);

    let mut items: Vec<BatchItem> = fixtures
        .iter()
        .map(|f| BatchItem { subject: &f.subject, layers: &f.layers })
        .collect();
    items[7].layers = &broken;

    let batch = verifier.verify_batch(&items);
    assert_eq!(batch.len(), items.len());
    for (item, got) in items.iter().zip(&batch) {
        let expected = verifier.verify_chain(item.subject, item.layers).unwrap();
        assert_eq!(got.as_ref().unwrap(), &expected);
    }
    assert_eq!(batch[7].as_ref().unwrap().first_mismatch_layer, Some(2));

    let proofs: Vec<MicroProof> = fixtures.iter().map(|f| f.micro_proof(true)).collect();
    let verdicts = qproof::verify_micro_proofs(&verifier, &proofs);
    assert!(verdicts.iter().all(|v| v.as_ref().unwrap().claim_agrees == Some(true)));
}

#[test]
fn test_randomized_trees() {
    let verifier = ProofVerifier::default();
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let sizes = [rng.gen_range(1..=64), rng.gen_range(1..=32), rng.gen_range(1..=32)];
        let positions = [
            rng.gen_range(0..sizes[0]),
            rng.gen_range(0..sizes[1]),
            rng.gen_range(0..sizes[2]),
        ];
        let fx = three_layer(verifier.hasher(), sizes, positions);
        let result = verifier.verify_chain(&fx.subject, &fx.layers).unwrap();
        assert!(result.valid, "sizes {sizes:?} positions {positions:?}");
    }
}

#[test]
fn test_subject_hash_tamper_detected() {
    let verifier = ProofVerifier::default();
    let fx = default_chain(verifier.hasher());
    let forged = Subject { hash: [0u8; 32], ..fx.subject.clone() };
    let result = verifier.verify_chain(&forged, &fx.layers).unwrap();
    assert_eq!(Verdict::from_result(&result), Verdict::Failed { layer: 0 });
}
