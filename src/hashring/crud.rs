use std::collections::hash_map::Entry;

use tracing::{debug, trace, warn};

use super::{HashRing, RingState, digest};
use crate::error::{Error, Result};
use crate::hash::Hash32;

impl<H: Hash32> RingState<H> {
    /// Inserts the positions of `node` that are still missing. A position
    /// already owned by another node keeps its owner and `node` is queued as a
    /// claimant for it.
    fn insert_replicas(&mut self, node: &str, replica_count: usize) -> Result<()> {
        for id in 0..replica_count {
            let position = self.replica_position(node, id)?;

            match self.positions.entry(position) {
                Entry::Vacant(vacant) => {
                    vacant.insert(node.to_owned());
                }
                Entry::Occupied(occupied) if occupied.get() == node => {}
                Entry::Occupied(occupied) => {
                    warn!(
                        node,
                        replica = id,
                        position,
                        owner = %occupied.get(),
                        "position collision, keeping existing owner"
                    );

                    let waiting = self.claimants.entry(position).or_default();
                    if !waiting.iter().any(|claimant| claimant == node) {
                        waiting.push(node.to_owned());
                    }
                }
            }
        }

        Ok(())
    }

    /// Removes the positions of `node`. Positions owned by other nodes are
    /// left alone. A freed position passes to its oldest waiting claimant.
    fn remove_replicas(&mut self, node: &str, replica_count: usize) -> Result<()> {
        for id in 0..replica_count {
            let position = self.replica_position(node, id)?;

            if self
                .positions
                .get(&position)
                .is_some_and(|owner| owner == node)
            {
                self.positions.remove(&position);
                self.hand_over(position, node);
            } else {
                self.withdraw_claim(position, node);
            }
        }

        Ok(())
    }
}

impl<H> RingState<H> {
    fn hand_over(&mut self, position: u32, previous: &str) {
        let Some(waiting) = self.claimants.get_mut(&position) else {
            return;
        };

        let heir = waiting.remove(0);
        if waiting.is_empty() {
            self.claimants.remove(&position);
        }

        debug!(position, previous, node = %heir, "handed freed position to colliding replica");
        self.positions.insert(position, heir);
    }

    fn withdraw_claim(&mut self, position: u32, node: &str) {
        if let Some(waiting) = self.claimants.get_mut(&position) {
            waiting.retain(|claimant| claimant != node);
            if waiting.is_empty() {
                self.claimants.remove(&position);
            }
        }
    }
}

impl<H: Hash32> HashRing<H> {
    /// Add `node` to the hash ring.
    ///
    /// The node is placed at `hash("{node}:{i}")` for every replica index `i`.
    /// Adding a node again only fills in positions it is missing, it never
    /// duplicates a position.
    ///
    /// When a position is already owned by another node (a 32-bit hash
    /// collision) the existing owner keeps it and `node` has one position less
    /// until the owner is deleted, at which point the position passes to
    /// `node`. With `n` positions on the ring the chance of any collision is
    /// roughly `n² / 2³³`.
    ///
    /// If hashing fails part-way, the positions inserted so far stay on the
    /// ring and `node` is not considered a member. Calling `add` again
    /// completes the missing positions, `delete` removes them.
    pub fn add(&self, node: &str) -> Result<()> {
        let mut state = self.state.write();

        let inserted = state.insert_replicas(node, self.replica_count);
        state.rebuild_index();
        inserted?;

        state.members.insert(node.to_owned());
        debug!(
            node,
            replicas = self.replica_count,
            positions = state.index.len(),
            "added node to ring"
        );

        Ok(())
    }

    /// Remove `node` from the hash ring.
    ///
    /// Removing a node that is not on the ring succeeds without changes. If
    /// hashing fails part-way, the positions removed so far stay removed.
    pub fn delete(&self, node: &str) -> Result<()> {
        let mut state = self.state.write();

        state.members.remove(node);
        let removed = state.remove_replicas(node, self.replica_count);
        state.rebuild_index();
        removed?;

        debug!(
            node,
            positions = state.index.len(),
            "removed node from ring"
        );

        Ok(())
    }

    /// Returns the node responsible for `key`: the owner of the first position
    /// at or after `hash(key)`, or of the smallest position if `hash(key)` lies
    /// past the largest one.
    pub fn locate(&self, key: &str) -> Result<String> {
        let state = self.state.read();

        if state.index.is_empty() {
            return Err(Error::EmptyRing);
        }

        // the shared lock allows concurrent readers, each digests on its own copy
        let mut hasher = state.hasher.clone();
        let hash = digest(&mut hasher, key)?;

        let node = state
            .successor(hash)
            .and_then(|position| state.positions.get(&position))
            .cloned()
            .ok_or(Error::EmptyRing)?;

        trace!(key, hash, %node, "located key");

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::test_support::TableHasher;
    use super::*;

    fn ring(replica_count: usize, table: &[(&str, u32)]) -> HashRing<TableHasher> {
        HashRing::with_hasher(replica_count, TableHasher::new(table.iter().copied())).unwrap()
    }

    fn owned_by(ring: &HashRing<TableHasher>, node: &str) -> Vec<u32> {
        ring.positions()
            .into_iter()
            .filter(|(_, owner)| owner == node)
            .map(|(position, _)| position)
            .collect()
    }

    #[test]
    fn single_replica_single_node_owns_every_key() {
        let ring = ring(
            1,
            &[("A:0", 1000), ("low", 5), ("exact", 1000), ("high", 4000)],
        );

        ring.add("A").unwrap();

        assert_eq!(ring.positions(), vec![(1000, "A".to_owned())]);
        assert_eq!(ring.locate("low").unwrap(), "A");
        assert_eq!(ring.locate("exact").unwrap(), "A");
        assert_eq!(ring.locate("high").unwrap(), "A");
    }

    #[test]
    fn delete_keeps_only_remaining_positions() {
        let ring = ring(
            4,
            &[
                ("A:0", 10),
                ("A:1", 40),
                ("A:2", 70),
                ("A:3", 100),
                ("B:0", 20),
                ("B:1", 50),
                ("B:2", 80),
                ("B:3", 110),
            ],
        );

        ring.add("A").unwrap();
        ring.add("B").unwrap();
        assert_eq!(ring.vlen(), 8);
        assert_eq!(ring.len(), 2);

        ring.delete("A").unwrap();
        assert_eq!(ring.vlen(), 4);
        assert_eq!(owned_by(&ring, "B"), vec![20, 50, 80, 110]);
        assert_eq!(owned_by(&ring, "A"), vec![]);
        assert_eq!(ring.nodes(), vec!["B".to_owned()]);
    }

    #[test]
    fn deleted_node_is_never_located() {
        let ring = ring(
            3,
            &[
                ("X:0", 100),
                ("X:1", 400),
                ("X:2", 700),
                ("Y:0", 200),
                ("Y:1", 500),
                ("Y:2", 800),
                ("Z:0", 300),
                ("Z:1", 600),
                ("Z:2", 900),
                ("k50", 50),
                ("k350", 350),
                ("k650", 650),
                ("k950", 950),
            ],
        );

        for node in ["X", "Y", "Z"] {
            ring.add(node).unwrap();
        }
        ring.delete("X").unwrap();

        assert_eq!(ring.vlen(), 6);
        assert!(
            ring.positions()
                .iter()
                .all(|(_, owner)| owner == "Y" || owner == "Z")
        );

        assert_eq!(ring.locate("k50").unwrap(), "Y"); // 200
        assert_eq!(ring.locate("k350").unwrap(), "Y"); // 500, X's 400 is gone
        assert_eq!(ring.locate("k650").unwrap(), "Y"); // 800, X's 700 is gone
        assert_eq!(ring.locate("k950").unwrap(), "Y"); // wraps to 200
    }

    #[test]
    fn locate_on_empty_ring_fails() {
        let ring = ring(2, &[("anything", 1)]);

        assert!(matches!(ring.locate("anything"), Err(Error::EmptyRing)));
    }

    #[test]
    fn locate_on_emptied_ring_fails() {
        let ring = ring(1, &[("A:0", 7), ("anything", 1)]);
        ring.add("A").unwrap();
        ring.delete("A").unwrap();

        assert!(ring.is_empty());
        assert!(matches!(ring.locate("anything"), Err(Error::EmptyRing)));
    }

    #[test]
    fn boundaries_belong_to_the_position_at_or_after_the_key() {
        let ring = ring(
            2,
            &[
                ("N:0", 100),
                ("N:1", 300),
                ("M:0", 200),
                ("M:1", 400),
                ("0", 0),
                ("100", 100),
                ("101", 101),
                ("200", 200),
                ("250", 250),
                ("300", 300),
                ("400", 400),
                ("401", 401),
                ("max", u32::MAX),
            ],
        );

        ring.add("N").unwrap();
        ring.add("M").unwrap();

        assert_eq!(ring.locate("0").unwrap(), "N");
        assert_eq!(ring.locate("100").unwrap(), "N");
        assert_eq!(ring.locate("101").unwrap(), "M");
        assert_eq!(ring.locate("200").unwrap(), "M");
        assert_eq!(ring.locate("250").unwrap(), "N");
        assert_eq!(ring.locate("300").unwrap(), "N");
        assert_eq!(ring.locate("400").unwrap(), "M");
        assert_eq!(ring.locate("401").unwrap(), "N");
        assert_eq!(ring.locate("max").unwrap(), "N");
    }

    #[test]
    fn re_adding_a_member_changes_nothing() {
        let ring = ring(2, &[("A:0", 10), ("A:1", 20)]);

        ring.add("A").unwrap();
        ring.add("A").unwrap();

        assert_eq!(ring.vlen(), 2);
        assert_eq!(ring.len(), 1);
        assert_eq!(owned_by(&ring, "A"), vec![10, 20]);
    }

    #[test]
    fn deleting_an_unknown_node_is_a_no_op() {
        let ring = ring(1, &[("A:0", 10), ("ghost:0", 99)]);
        ring.add("A").unwrap();

        ring.delete("ghost").unwrap();

        assert_eq!(ring.positions(), vec![(10, "A".to_owned())]);
    }

    #[test]
    fn collision_keeps_first_owner() {
        let ring = ring(
            2,
            &[("A:0", 100), ("A:1", 200), ("B:0", 100), ("B:1", 300)],
        );

        ring.add("A").unwrap();
        ring.add("B").unwrap();

        assert_eq!(
            ring.positions(),
            vec![
                (100, "A".to_owned()),
                (200, "A".to_owned()),
                (300, "B".to_owned())
            ]
        );

        // B's colliding replica must not take A's position with it
        ring.delete("B").unwrap();
        assert_eq!(owned_by(&ring, "A"), vec![100, 200]);
        assert_eq!(ring.vlen(), 2);
    }

    #[test]
    fn freed_position_passes_to_colliding_node() {
        let ring = ring(
            2,
            &[("A:0", 100), ("A:1", 200), ("B:0", 100), ("B:1", 300)],
        );

        ring.add("A").unwrap();
        ring.add("B").unwrap();
        assert_eq!(owned_by(&ring, "B"), vec![300]);

        ring.delete("A").unwrap();
        assert_eq!(
            ring.positions(),
            vec![(100, "B".to_owned()), (300, "B".to_owned())]
        );

        // adding B again finds both positions in place and changes nothing
        ring.add("B").unwrap();
        assert_eq!(owned_by(&ring, "B"), vec![100, 300]);
        assert_eq!(ring.vlen(), 2);
    }

    #[test]
    fn re_adding_restores_a_position_lost_to_a_collision() {
        let ring = ring(
            2,
            &[("A:0", 100), ("A:1", 200), ("B:0", 100), ("B:1", 300)],
        );

        ring.add("A").unwrap();
        ring.add("B").unwrap();
        ring.delete("B").unwrap();
        ring.delete("A").unwrap();
        assert!(ring.is_empty());

        ring.add("B").unwrap();
        assert_eq!(owned_by(&ring, "B"), vec![100, 300]);
    }

    #[test]
    fn deleted_claimant_does_not_inherit_a_position() {
        let ring = ring(
            1,
            &[("A:0", 100), ("B:0", 100), ("C:0", 100), ("D:0", 500)],
        );

        for node in ["A", "B", "C", "D"] {
            ring.add(node).unwrap();
        }
        assert_eq!(owned_by(&ring, "A"), vec![100]);

        ring.delete("B").unwrap();
        ring.delete("A").unwrap();
        assert_eq!(owned_by(&ring, "C"), vec![100]);
        assert_eq!(owned_by(&ring, "B"), vec![]);

        ring.delete("C").unwrap();
        assert_eq!(ring.positions(), vec![(500, "D".to_owned())]);
    }

    #[test]
    fn failed_add_keeps_partial_positions() {
        let ring = ring(3, &[("A:0", 100), ("A:1", 200), ("key", 150)]);

        let err = ring.add("A").unwrap_err();
        match err {
            Error::HashComputation { input, .. } => assert_eq!(input, "A:2"),
            other => panic!("unexpected error {other:?}"),
        }

        assert_eq!(owned_by(&ring, "A"), vec![100, 200]);
        assert!(!ring.contains("A"));
        assert_eq!(ring.len(), 0);

        // the ring stays usable
        assert_eq!(ring.locate("key").unwrap(), "A");
        ring.delete("A").unwrap_err();
        assert!(ring.is_empty());
    }

    #[test]
    fn failed_locate_reports_the_key() {
        let ring = ring(1, &[("A:0", 100)]);
        ring.add("A").unwrap();

        let err = ring.locate("unknown").unwrap_err();

        assert!(matches!(err, Error::HashComputation { ref input, .. } if input == "unknown"));
        assert_eq!(err.to_string(), "failed to hash `unknown`");
        assert_eq!(
            std::error::Error::source(&err).map(|cause| cause.to_string()),
            Some("no digest for `unknown`".to_owned())
        );
    }

    #[test]
    fn index_is_sorted_after_unordered_adds() {
        let ring = ring(
            2,
            &[
                ("c:0", 900),
                ("c:1", 5),
                ("a:0", 300),
                ("a:1", 7000),
                ("b:0", 42),
                ("b:1", 1),
            ],
        );

        for node in ["c", "a", "b"] {
            ring.add(node).unwrap();
        }

        let index: Vec<u32> = ring.positions().into_iter().map(|(p, _)| p).collect();
        assert_eq!(index, vec![1, 5, 42, 300, 900, 7000]);
        assert_eq!(ring.nodes(), vec!["a", "b", "c"]);
    }
}
