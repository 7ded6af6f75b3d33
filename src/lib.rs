//! A consistent hash ring that tells callers which node owns a key.
//!
//! Every node is placed at `replica_count` positions on a circular 32-bit
//! keyspace, at `hash("{node}:{i}")` for `i` in `0..replica_count`. A key belongs
//! to the node owning the first position at or after `hash(key)`; keys hashing
//! past the largest position wrap around to the smallest one. Adding or
//! removing a node only moves the keys next to that node's positions.
//!
//! The ring is safe to share between threads:
//! - `add` and `delete` hold an exclusive lock while they rebuild the sorted index
//! - `locate` holds a shared lock, so lookups run concurrently
//!
//! The hash function is pluggable through [`Hash32`]. [`Fnv1a32`] is used by
//! default, [`Sip32`] is available as an alternative.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use hashring::HashRing;
//!
//! let ring = Arc::new(HashRing::new(4).unwrap());
//! ring.add("10.0.0.1").unwrap();
//! ring.add("10.0.0.2").unwrap();
//!
//! let reader = Arc::clone(&ring);
//! let owner = thread::spawn(move || reader.locate("session:abc").unwrap())
//!     .join()
//!     .unwrap();
//!
//! assert_eq!(owner, ring.locate("session:abc").unwrap());
//! ```

#[cfg(feature = "derive")]
use serde::{Deserialize, Serialize};

pub mod error;
pub mod hash;
mod hashring;

pub use error::{Error, Result};
pub use hash::{Fnv1a32, Hash32, HashError, Sip32};
pub use hashring::ranges::Ownership;
pub use hashring::{HashRing, HashRingIterator};

/// Settings a [`HashRing`] is built from, see [`HashRing::from_config`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive", serde(default))]
pub struct RingConfig {
    pub replica_count: usize, // number of positions to create per node
}

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig { replica_count: 4 }
    }
}
