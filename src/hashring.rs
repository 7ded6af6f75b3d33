use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;
use tracing::warn;

use crate::RingConfig;
use crate::error::{Error, Result};
use crate::hash::{Fnv1a32, Hash32, hash32};

mod crud;
mod iterator;
pub mod ranges;

pub use iterator::HashRingIterator;

/// Everything the ring's lock protects.
#[derive(Debug)]
struct RingState<H> {
    hasher: H,
    // position -> owning node
    positions: HashMap<u32, String>,
    // ascending keys of `positions`, rebuilt after every mutation
    index: Vec<u32>,
    // nodes whose replicas were all added successfully
    members: BTreeSet<String>,
    // position -> nodes whose replica collided with its owner, in arrival order
    claimants: HashMap<u32, Vec<String>>,
}

impl<H: Hash32> RingState<H> {
    fn new(hasher: H) -> RingState<H> {
        RingState {
            hasher,
            positions: HashMap::new(),
            index: Vec::new(),
            members: BTreeSet::new(),
            claimants: HashMap::new(),
        }
    }

    /// Position of replica `id` of `node`, hashed from `"{node}:{id}"`.
    fn replica_position(&mut self, node: &str, id: usize) -> Result<u32> {
        digest(&mut self.hasher, &format!("{node}:{id}"))
    }
}

impl<H> RingState<H> {
    fn rebuild_index(&mut self) {
        self.index = self.positions.keys().copied().collect();
        self.index.sort_unstable();
    }

    /// First position at or after `hash`, wrapping around to the smallest one.
    fn successor(&self, hash: u32) -> Option<u32> {
        let n = self.index.partition_point(|&position| position < hash);
        self.index.get(n).or(self.index.first()).copied()
    }

    /// Positions in ring order together with their owners.
    fn snapshot(&self) -> Vec<(u32, String)> {
        self.index
            .iter()
            .filter_map(|position| {
                self.positions
                    .get(position)
                    .map(|node| (*position, node.clone()))
            })
            .collect()
    }
}

fn digest<H: Hash32>(hasher: &mut H, input: &str) -> Result<u32> {
    hash32(hasher, input.as_bytes()).map_err(|source| {
        warn!(input, error = %source, "hash computation failed");
        Error::HashComputation {
            input: input.to_owned(),
            source,
        }
    })
}

/// HashRing places every node at `replica_count` hashed positions on a circular
/// 32-bit keyspace and maps each key to the node owning the first position at
/// or after the key's hash.
///
/// All state sits behind a single reader/writer lock: `add` and `delete` take
/// it exclusively, `locate` and the inspection methods share it. A ring can be
/// shared between threads through an `Arc`.
#[derive(Debug)]
pub struct HashRing<H = Fnv1a32> {
    replica_count: usize,
    state: RwLock<RingState<H>>,
}

impl HashRing {
    /// Create an empty `HashRing` hashing with [`Fnv1a32`].
    ///
    /// # Arguments
    ///
    /// * `replica_count` - number of positions each node occupies on the ring (higher number means more even distribution of keys across all nodes, but more work per `add`/`delete`)
    ///
    /// # Examples
    ///
    /// ```
    /// use hashring::HashRing;
    ///
    /// let ring = HashRing::new(4).unwrap();
    /// ring.add("cache-1").unwrap();
    /// ring.add("cache-2").unwrap();
    ///
    /// let owner = ring.locate("user:42").unwrap();
    /// assert!(owner == "cache-1" || owner == "cache-2");
    /// ```
    pub fn new(replica_count: usize) -> Result<HashRing> {
        HashRing::with_hasher(replica_count, Fnv1a32::default())
    }

    /// Create an empty `HashRing` from `config`, hashing with [`Fnv1a32`].
    pub fn from_config(config: &RingConfig) -> Result<HashRing> {
        HashRing::new(config.replica_count)
    }
}

impl<H: Hash32> HashRing<H> {
    /// Create an empty `HashRing` which will use the given hash function.
    ///
    /// # Arguments
    ///
    /// * `replica_count` - number of positions each node occupies on the ring, must be positive
    /// * `hasher` - implementation of [`Hash32`] used to place nodes and keys
    ///
    /// # Examples
    ///
    /// ```
    /// use hashring::{HashRing, Sip32};
    ///
    /// let ring = HashRing::with_hasher(16, Sip32::with_keys(1, 2)).unwrap();
    /// assert!(ring.is_empty());
    ///
    /// assert!(HashRing::with_hasher(0, Sip32::default()).is_err());
    /// ```
    pub fn with_hasher(replica_count: usize, hasher: H) -> Result<HashRing<H>> {
        if replica_count == 0 {
            return Err(Error::InvalidReplicaCount(replica_count));
        }

        Ok(HashRing {
            replica_count,
            state: RwLock::new(RingState::new(hasher)),
        })
    }
}

impl<H> HashRing<H> {
    /// Number of positions every node occupies.
    pub fn replica_count(&self) -> usize {
        self.replica_count
    }

    /// Get the number of nodes that were added completely.
    pub fn len(&self) -> usize {
        self.state.read().members.len()
    }

    /// Get the number of positions on the ring.
    pub fn vlen(&self) -> usize {
        self.state.read().index.len()
    }

    /// Returns true if the ring has no positions.
    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.state.read().members.contains(node)
    }

    /// Member nodes in lexicographic order.
    pub fn nodes(&self) -> Vec<String> {
        self.state.read().members.iter().cloned().collect()
    }

    /// Every position in ascending order together with the node owning it.
    pub fn positions(&self) -> Vec<(u32, String)> {
        self.state.read().snapshot()
    }
}
