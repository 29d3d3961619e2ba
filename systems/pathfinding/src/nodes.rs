//! Fixed-capacity storage of search nodes.

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

/// Index of a node inside the pool.
pub(crate) type NodeIndex = u16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) f: u32,
    pub(crate) parent: Option<NodeIndex>,
}

/// Node pool reused across searches.
///
/// Nodes are never freed during a search; the pool refuses new nodes once
/// `capacity` is reached. Packed `(x << 16) | y` keys map coordinates back
/// to their node so revisits are detected without scanning.
#[derive(Debug)]
pub(crate) struct NodePool {
    capacity: usize,
    nodes: Vec<Node>,
    open: FixedBitSet,
    by_position: FxHashMap<u32, NodeIndex>,
    closed: usize,
}

impl NodePool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            nodes: Vec::with_capacity(capacity),
            open: FixedBitSet::with_capacity(capacity),
            by_position: FxHashMap::default(),
            closed: 0,
        }
    }

    /// Clears the pool and seeds it with an open root node.
    pub(crate) fn reset(&mut self, x: u16, y: u16) {
        self.nodes.clear();
        self.open.clear();
        self.by_position.clear();
        self.closed = 0;
        let _ = self.create_open(None, x, y, 0);
    }

    pub(crate) fn node(&self, index: NodeIndex) -> Node {
        self.nodes[usize::from(index)]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed
    }

    /// Open node with the lowest cost, the lowest index winning ties.
    pub(crate) fn best_open(&self) -> Option<NodeIndex> {
        let mut best: Option<(usize, u32)> = None;
        for index in self.open.ones() {
            let f = self.nodes[index].f;
            if best.map_or(true, |(_, best_f)| f < best_f) {
                best = Some((index, f));
            }
        }
        best.and_then(|(index, _)| NodeIndex::try_from(index).ok())
    }

    /// Appends an open node, returning `None` once the pool is full.
    pub(crate) fn create_open(
        &mut self,
        parent: Option<NodeIndex>,
        x: u16,
        y: u16,
        f: u32,
    ) -> Option<NodeIndex> {
        if self.nodes.len() >= self.capacity {
            return None;
        }
        let index = NodeIndex::try_from(self.nodes.len()).ok()?;
        self.nodes.push(Node { x, y, f, parent });
        self.open.insert(usize::from(index));
        let _ = self.by_position.insert(pack(x, y), index);
        Some(index)
    }

    pub(crate) fn find(&self, x: u16, y: u16) -> Option<NodeIndex> {
        self.by_position.get(&pack(x, y)).copied()
    }

    /// Lowers the cost of a known node, reparents it and puts it back on the
    /// open set.
    pub(crate) fn reopen(&mut self, index: NodeIndex, parent: NodeIndex, f: u32) {
        let slot = usize::from(index);
        let node = &mut self.nodes[slot];
        node.f = f;
        node.parent = Some(parent);
        if !self.open.contains(slot) {
            self.open.insert(slot);
            self.closed = self.closed.saturating_sub(1);
        }
    }

    pub(crate) fn close(&mut self, index: NodeIndex) {
        let slot = usize::from(index);
        if self.open.contains(slot) {
            self.open.set(slot, false);
            self.closed += 1;
        }
    }
}

fn pack(x: u16, y: u16) -> u32 {
    (u32::from(x) << 16) | u32::from(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_open_prefers_lowest_cost_then_lowest_index() {
        let mut pool = NodePool::new(8);
        pool.reset(5, 5);
        let a = pool.create_open(Some(0), 6, 5, 10).expect("room");
        let b = pool.create_open(Some(0), 4, 5, 10).expect("room");
        pool.close(0);

        assert_eq!(pool.best_open(), Some(a));
        pool.close(a);
        assert_eq!(pool.best_open(), Some(b));
        pool.close(b);
        assert_eq!(pool.best_open(), None);
        assert_eq!(pool.closed(), 3);
    }

    #[test]
    fn pool_refuses_nodes_beyond_capacity() {
        let mut pool = NodePool::new(2);
        pool.reset(0, 0);
        assert!(pool.create_open(Some(0), 1, 0, 10).is_some());
        assert!(pool.create_open(Some(0), 2, 0, 20).is_none());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn reopening_a_closed_node_restores_it() {
        let mut pool = NodePool::new(4);
        pool.reset(0, 0);
        let child = pool.create_open(Some(0), 1, 1, 25).expect("room");
        pool.close(child);
        assert_eq!(pool.closed(), 1);

        pool.reopen(child, 0, 20);

        assert_eq!(pool.closed(), 0);
        assert_eq!(pool.node(child).f, 20);
        assert_eq!(pool.find(1, 1), Some(child));
        assert_eq!(pool.find(2, 2), None);
    }
}
