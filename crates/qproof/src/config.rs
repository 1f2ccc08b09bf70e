use serde::{Deserialize, Serialize};

use crate::crypto::HashAlgorithm;
use crate::types::hex32;
use crate::{Hash32, VerifyError};

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Verifier settings. Immutable once a verifier is built from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub hash: HashAlgorithm,
    /// Expected path depth per layer_index; `None` (or past the end) = unknown
    pub layer_depths: Vec<Option<usize>>,
    pub max_depth: usize,
    /// Parent hash carried by the first proofchain entry
    #[serde(with = "hex32")]
    pub genesis_parent: Hash32,
    /// Treat a missing or invalid root signature as a failed layer
    pub require_signatures: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::default(),
            layer_depths: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            genesis_parent: [0u8; 32],
            require_signatures: false,
        }
    }
}

impl VerifierConfig {
    pub fn from_json(s: &str) -> Result<Self, VerifyError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn expected_depth(&self, layer_index: u32) -> Option<usize> {
        self.layer_depths.get(layer_index as usize).copied().flatten()
    }

    pub fn with_layer_depths(mut self, depths: &[usize]) -> Self {
        self.layer_depths = depths.iter().copied().map(Some).collect();
        self
    }
}
