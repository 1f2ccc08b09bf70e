use crate::crypto::ProofHasher;
use crate::{Hash32, ProofLayer, StructuralError};

/// Indices are u64, so paths at least this deep accept every index.
const INDEX_BITS: usize = 64;

pub(crate) fn check_index(index: u64, depth: usize) -> Result<(), StructuralError> {
    if depth < INDEX_BITS && (index >> depth) != 0 {
        return Err(StructuralError::IndexOutOfRange { index, depth });
    }
    Ok(())
}

/// Fold `leaf` up through `path`, taking the side at step `i` from bit `i` of `index`.
pub fn fold_path(
    hasher: &dyn ProofHasher,
    leaf: &Hash32,
    index: u64,
    path: &[Hash32],
) -> Result<Hash32, StructuralError> {
    check_index(index, path.len())?;
    let mut current = *leaf;
    for (h, sibling) in path.iter().enumerate() {
        current = if bit_at(index, h) {
            hasher.hash_pair(sibling, &current)
        } else {
            hasher.hash_pair(&current, sibling)
        };
    }
    Ok(current)
}

fn bit_at(index: u64, h: usize) -> bool {
    h < INDEX_BITS && (index >> h) & 1 == 1
}

/// Complete binary tree built bottom-up.
///
/// Odd leaf counts are padded to the next power of two by repeating the last
/// leaf. Used to produce fixtures that `fold_path` accepts; proof serving
/// lives with the proof server.
pub struct MerkleTree {
    /// levels[0] = padded leaves, last = [root]
    levels: Vec<Vec<Hash32>>,
    leaf_count: usize,
}

impl MerkleTree {
    pub fn from_leaves(hasher: &dyn ProofHasher, leaves: &[Hash32]) -> Option<Self> {
        let last = *leaves.last()?;
        let width = leaves.len().next_power_of_two();
        let mut level = leaves.to_vec();
        level.resize(width, last);

        let mut levels = vec![level];
        while levels[levels.len() - 1].len() > 1 {
            let next = levels[levels.len() - 1]
                .chunks(2)
                .map(|pair| hasher.hash_pair(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }

        Some(Self { levels, leaf_count: leaves.len() })
    }

    pub fn root(&self) -> Hash32 {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Number of leaves supplied, before padding
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn leaf(&self, position: usize) -> Option<Hash32> {
        if position >= self.leaf_count {
            return None;
        }
        Some(self.levels[0][position])
    }

    pub fn path(&self, position: usize) -> Option<Vec<Hash32>> {
        if position >= self.leaf_count {
            return None;
        }
        let mut idx = position;
        let mut path = Vec::with_capacity(self.depth());
        for level in &self.levels[..self.depth()] {
            path.push(level[idx ^ 1]);
            idx >>= 1;
        }
        Some(path)
    }

    pub fn layer_proof(&self, layer_index: u32, position: usize) -> Option<ProofLayer> {
        Some(ProofLayer {
            layer_index,
            merkle_index: position as u64,
            root: self.root(),
            merkle_path: self.path(position)?,
            mss_signature: None,
        })
    }
}
