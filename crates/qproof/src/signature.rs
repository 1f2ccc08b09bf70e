//! Root signature checks, independent of the hash path

use ed25519_dalek::{Signature, Verifier as _, VerifyingKey};

use crate::types::parse_hex;
use crate::{Hash32, StructuralError};

/// Checks a layer's `mss_signature` over its claimed root.
pub trait RootSignatureVerifier: Send + Sync {
    fn verify_root(&self, root: &Hash32, signature: &[u8]) -> bool;
}

/// ed25519 over the 32 raw root bytes
pub struct Ed25519RootVerifier {
    key: VerifyingKey,
}

impl Ed25519RootVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    pub fn from_hex(public_key: &str) -> Result<Self, StructuralError> {
        let malformed = |reason: String| StructuralError::MalformedHash {
            field: "root_public_key".to_string(),
            reason,
        };
        let bytes: [u8; 32] = parse_hex(public_key)
            .map_err(|e| malformed(e.to_string()))?
            .try_into()
            .map_err(|b: Vec<u8>| malformed(format!("expected 32 bytes, got {}", b.len())))?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|e| malformed(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key
    }
}

impl RootSignatureVerifier for Ed25519RootVerifier {
    fn verify_root(&self, root: &Hash32, signature: &[u8]) -> bool {
        let sig = match Signature::from_slice(signature) {
            Ok(s) => s,
            Err(_) => return false,
        };
        self.key.verify(root, &sig).is_ok()
    }
}
