//! Fiat-Shamir transcript for choosing which trace rows a proof opens.

use std::collections::HashSet;

use crate::digest_sha2;
use crate::scalar::Scalar;

/// Fiat-Shamir transcript for deriving verifier queries deterministically.
/// Both prover and verifier build identical transcripts to get the same queries.
pub struct FiatShamirTranscript {
    state: Vec<u8>,
}

impl FiatShamirTranscript {
    pub fn new() -> Self {
        Self {
            state: b"zkinfer-trace-v1".to_vec(),
        }
    }

    /// Absorb raw bytes into the transcript.
    pub fn absorb(&mut self, data: &[u8]) {
        self.state.extend_from_slice(data);
    }

    /// Absorb a 32-byte commitment or digest.
    pub fn absorb_commitment(&mut self, root: &[u8; 32]) {
        self.absorb(root);
    }

    pub fn absorb_scalar(&mut self, value: Scalar) {
        self.absorb(&value.value().to_le_bytes());
    }

    /// Squeeze `count` distinct indices in `[0, max)`.
    ///
    /// `count` is capped at `max`, so every index is returned when fewer
    /// rows exist than were asked for.
    pub fn squeeze_indices(&mut self, count: usize, max: usize) -> Vec<usize> {
        let count = count.min(max);
        let mut indices = Vec::with_capacity(count);
        let mut seen = HashSet::new();
        while indices.len() < count {
            let hash = digest_sha2(&self.state);
            // feed the hash back so the next squeeze differs
            self.state = hash.to_vec();
            let mut word = [0u8; 8];
            word.copy_from_slice(&hash[..8]);
            let idx = (u64::from_le_bytes(word) % max as u64) as usize;
            if seen.insert(idx) {
                indices.push(idx);
            }
        }
        indices
    }
}

impl Default for FiatShamirTranscript {
    fn default() -> Self {
        Self::new()
    }
}
