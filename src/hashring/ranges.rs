use std::ops::RangeInclusive;

#[cfg(feature = "derive")]
use serde::{Deserialize, Serialize};

use super::HashRing;

/// Ownership contains a range of key hashes and the node every key in that
/// range is located on.
///
/// * `hash_range` - key hashes that map to `node`. A node usually owns several ranges, one per position (two for the position that wraps around)
/// * `node` - owner of the range
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
pub struct Ownership {
    pub hash_range: RangeInclusive<u32>,
    pub node: String,
}

impl<H> HashRing<H> {
    /// Splits the keyspace into the arcs owned by each position.
    ///
    /// Each position owns the hashes after its predecessor up to and including
    /// itself. The smallest position also owns everything past the largest
    /// one, so its arc is returned as two ranges: the tail `last + 1..=u32::MAX`
    /// followed by `0..=first`. The result is empty for an empty ring.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashring::HashRing;
    ///
    /// let ring = HashRing::new(1).unwrap();
    /// ring.add("only").unwrap();
    ///
    /// let ranges = ring.ranges();
    /// assert_eq!(ranges.len(), 1);
    /// assert_eq!(ranges[0].hash_range, 0..=u32::MAX);
    /// ```
    pub fn ranges(&self) -> Vec<Ownership> {
        let positions = self.positions();

        let Some((last, _)) = positions.last() else {
            return vec![];
        };

        if positions.len() == 1 {
            return vec![Ownership {
                hash_range: 0..=u32::MAX,
                node: positions[0].1.clone(),
            }];
        }

        let mut ranges = Vec::with_capacity(positions.len() + 1);
        let mut left: Option<u32> = None;

        for (position, node) in positions.iter() {
            match left {
                None => {
                    if let Some(start) = last.checked_add(1) {
                        ranges.push(Ownership {
                            hash_range: start..=u32::MAX,
                            node: node.clone(),
                        });
                    }
                    ranges.push(Ownership {
                        hash_range: 0..=*position,
                        node: node.clone(),
                    });
                }
                Some(left) => ranges.push(Ownership {
                    hash_range: left + 1..=*position,
                    node: node.clone(),
                }),
            }

            left = Some(*position);
        }

        ranges
    }
}
