use sha2::{Digest as _, Sha256};

/// Size of every digest in the AFTL format.
pub const DIGEST_SIZE: usize = 32;

pub type Digest = [u8; DIGEST_SIZE];

/// Incremental SHA-256.
#[derive(Clone)]
pub struct Hash {
    hash: Sha256,
}

impl Hash {
    pub fn new() -> Self {
        Hash {
            hash: Sha256::new(),
        }
    }

    pub fn update<T: AsRef<[u8]>>(&mut self, data: T) {
        self.hash.update(data.as_ref());
    }

    pub fn finalize(self) -> Digest {
        self.hash.finalize().into()
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot SHA-256 of `data`.
pub fn digest(data: impl AsRef<[u8]>) -> Digest {
    let mut hash = Hash::new();
    hash.update(data);
    hash.finalize()
}
