use thiserror::Error;

use crate::hash::HashError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The injected hash function failed while digesting `input`.
    #[error("failed to hash `{input}`")]
    HashComputation {
        input: String,
        #[source]
        source: HashError,
    },

    /// `locate` was called before any node was added.
    #[error("cannot locate a key on an empty ring")]
    EmptyRing,

    #[error("replica count must be positive, got {0}")]
    InvalidReplicaCount(usize),
}
