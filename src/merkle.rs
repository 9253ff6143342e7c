use sha2::{Digest, Sha256};

pub type Hash = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub path: Vec<Hash>,
    /// `true` where the sibling sits on the left
    pub position: Vec<bool>,
}

/// Binary SHA-256 tree over pre-hashed leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    pub levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<Hash>) -> Self {
        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| {
                    // odd levels pair the last node with itself
                    let right = pair.get(1).unwrap_or(&pair[0]);
                    hash_pair(&pair[0], right)
                })
                .collect();
            levels.push(next);
        }
        MerkleTree { levels }
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn get_proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut path = Vec::new();
        let mut position = Vec::new();
        let mut current_index = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = current_index ^ 1;

            // the last node of an odd-sized level is its own sibling
            let sibling = level.get(sibling_index).unwrap_or(&level[current_index]);
            path.push(*sibling);
            position.push(current_index % 2 == 1);

            current_index /= 2;
        }

        Some(MerkleProof { path, position })
    }

    pub fn root(&self) -> Option<Hash> {
        self.levels.last().and_then(|level| level.first()).copied()
    }
}

pub fn verify_merkle_proof(leaf: &Hash, proof: &MerkleProof, root: &Hash) -> bool {
    if proof.path.len() != proof.position.len() {
        return false;
    }
    let mut current_hash = *leaf;

    for (sibling, is_left) in proof.path.iter().zip(proof.position.iter()) {
        current_hash = if *is_left {
            hash_pair(sibling, &current_hash)
        } else {
            hash_pair(&current_hash, sibling)
        };
    }

    current_hash == *root
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest_sha2;

    fn leaves(n: u64) -> Vec<Hash> {
        (1..=n).map(|i| digest_sha2(&i.to_le_bytes())).collect()
    }

    #[test]
    fn test_merkle_proof_verification() {
        let tree = MerkleTree::new(leaves(4));
        let root = tree.root().unwrap();

        for i in 0..4 {
            let proof = tree.get_proof(i).unwrap();
            let leaf = digest_sha2(&(i as u64 + 1).to_le_bytes());
            assert!(verify_merkle_proof(&leaf, &proof, &root));
        }
    }

    #[test]
    fn test_merkle_proof_odd_leaves() {
        let tree = MerkleTree::new(leaves(5));
        let root = tree.root().unwrap();

        for i in 0..5 {
            let proof = tree.get_proof(i).unwrap();
            let leaf = digest_sha2(&(i as u64 + 1).to_le_bytes());
            assert!(verify_merkle_proof(&leaf, &proof, &root));
        }
    }

    #[test]
    fn test_merkle_proof_single_leaf() {
        let tree = MerkleTree::new(leaves(1));
        let root = tree.root().unwrap();
        let proof = tree.get_proof(0).unwrap();
        assert!(proof.path.is_empty());
        assert!(verify_merkle_proof(&digest_sha2(&1u64.to_le_bytes()), &proof, &root));
    }

    #[test]
    fn test_wrong_leaf_rejected() {
        let tree = MerkleTree::new(leaves(4));
        let root = tree.root().unwrap();
        let proof = tree.get_proof(2).unwrap();
        assert!(!verify_merkle_proof(&digest_sha2(b"other"), &proof, &root));
        assert!(tree.get_proof(4).is_none());
    }
}
