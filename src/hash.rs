//! 32-bit hash functions used to place nodes and keys on the ring.
//!
//! The ring does not depend on a concrete hashing library. Anything that can
//! be reset, fed bytes and asked for a 32-bit digest can be plugged in through
//! [`Hash32`]. Two implementations ship with the crate: [`Fnv1a32`] (the
//! default) and [`Sip32`].

use std::error::Error as StdError;
use std::hash::Hasher;

use siphasher::sip::SipHasher;
use thiserror::Error;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Failure reported by a [`Hash32`] implementation while digesting bytes.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HashError(Box<dyn StdError + Send + Sync>);

impl HashError {
    pub fn new<E>(error: E) -> HashError
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        HashError(error.into())
    }
}

impl From<Box<dyn StdError + Send + Sync>> for HashError {
    fn from(error: Box<dyn StdError + Send + Sync>) -> Self {
        HashError(error)
    }
}

impl From<std::io::Error> for HashError {
    fn from(error: std::io::Error) -> Self {
        HashError::new(error)
    }
}

/// A resettable 32-bit hash function.
///
/// The same value is reused for many independent digests: callers `reset`,
/// `write` the input and read `sum32`. Nothing written before a `reset` may
/// influence the next digest.
///
/// `Clone` is required because concurrent lookups each digest on their own
/// copy of the ring's hasher.
pub trait Hash32: Clone {
    /// Forget everything written so far.
    fn reset(&mut self);

    /// Feed `bytes` into the current digest.
    fn write(&mut self, bytes: &[u8]) -> Result<(), HashError>;

    /// The digest of everything written since the last `reset`.
    fn sum32(&self) -> u32;
}

/// Reset `hasher`, feed it `bytes` and return the digest.
pub fn hash32<H: Hash32>(hasher: &mut H, bytes: &[u8]) -> Result<u32, HashError> {
    hasher.reset();
    hasher.write(bytes)?;
    Ok(hasher.sum32())
}

/// 32-bit FNV-1a.
#[derive(Clone, Debug, PartialEq)]
pub struct Fnv1a32 {
    state: u32,
}

impl Default for Fnv1a32 {
    fn default() -> Self {
        Fnv1a32 {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Hash32 for Fnv1a32 {
    fn reset(&mut self) {
        self.state = FNV_OFFSET_BASIS;
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), HashError> {
        for &b in bytes {
            self.state ^= b as u32;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
        Ok(())
    }

    fn sum32(&self) -> u32 {
        self.state
    }
}

/// SipHash-2-4 with fixed keys, folded to 32 bits by XOR of the two halves.
#[derive(Clone, Debug)]
pub struct Sip32 {
    k0: u64,
    k1: u64,
    hasher: SipHasher,
}

impl Sip32 {
    pub fn with_keys(k0: u64, k1: u64) -> Sip32 {
        Sip32 {
            k0,
            k1,
            hasher: SipHasher::new_with_keys(k0, k1),
        }
    }
}

impl Default for Sip32 {
    fn default() -> Self {
        Sip32::with_keys(0, 0)
    }
}

impl Hash32 for Sip32 {
    fn reset(&mut self) {
        self.hasher = SipHasher::new_with_keys(self.k0, self.k1);
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), HashError> {
        Hasher::write(&mut self.hasher, bytes);
        Ok(())
    }

    fn sum32(&self) -> u32 {
        let hash = self.hasher.finish();
        ((hash >> 32) ^ hash) as u32
    }
}
