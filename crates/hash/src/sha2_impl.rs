use sha2::{Digest as _, Sha256 as Sha256Impl};
use urkel_types::Digest;

use crate::{HashContext, Hasher};

/// The SHA-256 hash capability, digest width 32 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256;

/// Streaming context for [`Sha256`].
pub struct Sha256Context(Sha256Impl);

impl HashContext for Sha256Context {
    fn update(&mut self, data: &[u8]) -> &mut Self {
        sha2::Digest::update(&mut self.0, data);
        self
    }

    fn finalize(self) -> Digest {
        Digest::new(self.0.finalize().to_vec())
    }
}

impl Hasher for Sha256 {
    type Context = Sha256Context;

    const SIZE: usize = 32;

    fn hash(data: &[u8]) -> Digest {
        Digest::new(Sha256Impl::digest(data).to_vec())
    }

    fn context() -> Self::Context {
        Sha256Context(Sha256Impl::new())
    }
}

/// SHA-256 truncated to `N` bytes.
///
/// Matches the specification's worked example (spec §8): "SHA-256
/// truncated to 20 bytes as `hash`" for a 160-bit key space. Truncation
/// happens only at the point of finalization; the full 32-byte digest is
/// always computed internally so the streaming context is identical to
/// plain [`Sha256`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Truncated<const N: usize>;

/// Streaming context for [`Sha256Truncated`].
pub struct Sha256TruncatedContext<const N: usize>(Sha256Impl);

impl<const N: usize> HashContext for Sha256TruncatedContext<N> {
    fn update(&mut self, data: &[u8]) -> &mut Self {
        sha2::Digest::update(&mut self.0, data);
        self
    }

    fn finalize(self) -> Digest {
        let full = self.0.finalize();
        Digest::new(full[..N].to_vec())
    }
}

impl<const N: usize> Hasher for Sha256Truncated<N> {
    type Context = Sha256TruncatedContext<N>;

    const SIZE: usize = N;

    fn hash(data: &[u8]) -> Digest {
        let full = Sha256Impl::digest(data);
        Digest::new(full[..N].to_vec())
    }

    fn context() -> Self::Context {
        Sha256TruncatedContext(Sha256Impl::new())
    }
}
