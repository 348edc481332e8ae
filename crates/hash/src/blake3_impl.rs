use urkel_types::Digest;

use crate::{HashContext, Hasher};

/// The Blake3 hash capability, digest width 32 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3;

/// Streaming context for [`Blake3`].
pub struct Blake3Context(blake3::Hasher);

impl HashContext for Blake3Context {
    fn update(&mut self, data: &[u8]) -> &mut Self {
        self.0.update(data);
        self
    }

    fn finalize(self) -> Digest {
        Digest::new(self.0.finalize().as_bytes().to_vec())
    }
}

impl Hasher for Blake3 {
    type Context = Blake3Context;

    const SIZE: usize = 32;

    fn hash(data: &[u8]) -> Digest {
        Digest::new(blake3::hash(data).as_bytes().to_vec())
    }

    fn context() -> Self::Context {
        Blake3Context(blake3::Hasher::new())
    }
}
