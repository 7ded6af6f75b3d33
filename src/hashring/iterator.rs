use super::HashRing;

/// Consumes a [`HashRing`], yielding `(position, node)` pairs in ring order.
pub struct HashRingIterator {
    ring: std::vec::IntoIter<(u32, String)>,
}

impl Iterator for HashRingIterator {
    type Item = (u32, String);

    fn next(&mut self) -> Option<Self::Item> {
        self.ring.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ring.size_hint()
    }
}

impl<H> IntoIterator for HashRing<H> {
    type Item = (u32, String);

    type IntoIter = HashRingIterator;

    fn into_iter(self) -> Self::IntoIter {
        HashRingIterator {
            ring: self.state.into_inner().snapshot().into_iter(),
        }
    }
}
