//! Pluggable digests for path folding

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Hash32;

/// Deterministic, fixed-output digest used to combine path nodes.
pub trait ProofHasher: Send + Sync {
    fn hash(&self, data: &[u8]) -> Hash32;

    fn name(&self) -> &'static str;

    /// node = H(left || right)
    fn hash_pair(&self, left: &Hash32, right: &Hash32) -> Hash32 {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(left);
        data[32..].copy_from_slice(right);
        self.hash(&data)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl ProofHasher for Blake3Hasher {
    fn hash(&self, data: &[u8]) -> Hash32 {
        blake3::hash(data).into()
    }

    fn name(&self) -> &'static str {
        "blake3"
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl ProofHasher for Sha256Hasher {
    fn hash(&self, data: &[u8]) -> Hash32 {
        Sha256::digest(data).into()
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}

/// Config-level selector for the built-in hashers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl HashAlgorithm {
    pub fn hasher(self) -> Box<dyn ProofHasher> {
        match self {
            HashAlgorithm::Blake3 => Box::new(Blake3Hasher),
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blake3" => Ok(HashAlgorithm::Blake3),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            other => Err(format!("unknown hash algorithm: {other}")),
        }
    }
}
