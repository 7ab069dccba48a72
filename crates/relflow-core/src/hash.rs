//! Job fingerprints.
//!
//! Each part of a compiled job is digested on its own (blake3 over its JSON
//! form) and the parts are folded together with XOR. Folding is order
//! independent, and a part folded in twice cancels out.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; blake3::OUT_LEN]);

impl Fingerprint {
    /// Digest of `part` serialized as JSON. Maps inside `part` must iterate
    /// in a stable order (`BTreeMap`).
    pub fn of<T: Serialize>(part: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(part).map_err(|e| Error::Hash(e.to_string()))?;
        Ok(Self(*blake3::hash(&bytes).as_bytes()))
    }

    /// Fold the digests of `parts` into one fingerprint.
    pub fn of_parts<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Fingerprint>,
    {
        parts
            .into_iter()
            .fold(Self([0; blake3::OUT_LEN]), Fingerprint::combine)
    }

    pub fn combine(self, other: Fingerprint) -> Self {
        let mut out = self.0;
        for (a, b) in out.iter_mut().zip(other.0) {
            *a ^= b;
        }
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
