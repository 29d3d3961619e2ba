//! Quadrant tree that resolves columns and rows to leaf buckets.
//!
//! Nodes live in an arena and refer to their children by index. Every level
//! consumes the most significant remaining bit of the column and the row, so
//! a leaf is reached after `16 - FLOOR_BITS` descents and covers an aligned
//! `FLOOR_SIZE` square.

use tracing::trace;

use crate::leaf::Leaf;

/// Number of low coordinate bits resolved inside a leaf.
pub(crate) const FLOOR_BITS: u32 = 3;
/// Side length of the square covered by a leaf.
pub(crate) const FLOOR_SIZE: u16 = 1 << FLOOR_BITS;
/// Mask selecting the in-leaf part of a coordinate.
pub(crate) const FLOOR_MASK: u16 = FLOOR_SIZE - 1;

const TOP_LEVEL: u32 = u16::BITS - 1;
const ROOT: usize = 0;

/// Index of a leaf inside the tree's leaf arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct LeafIndex(u32);

impl LeafIndex {
    fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug)]
enum Node {
    Branch([Option<u32>; 4]),
    Leaf(LeafIndex),
}

/// Smallest rectangle of leaf origins holding every leaf, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LeafExtent {
    pub(crate) min_x: u16,
    pub(crate) min_y: u16,
    pub(crate) max_x: u16,
    pub(crate) max_y: u16,
}

impl LeafExtent {
    fn include(self, x: u16, y: u16) -> Self {
        Self {
            min_x: self.min_x.min(x),
            min_y: self.min_y.min(y),
            max_x: self.max_x.max(x),
            max_y: self.max_y.max(y),
        }
    }
}

#[derive(Debug)]
pub(crate) struct SpatialTree {
    nodes: Vec<Node>,
    leaves: Vec<Leaf>,
    extent: Option<LeafExtent>,
}

impl SpatialTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::Branch([None; 4])],
            leaves: Vec::new(),
            extent: None,
        }
    }

    pub(crate) fn leaf(&self, index: LeafIndex) -> &Leaf {
        &self.leaves[index.get()]
    }

    pub(crate) fn leaf_mut(&mut self, index: LeafIndex) -> &mut Leaf {
        &mut self.leaves[index.get()]
    }

    pub(crate) fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Bounds of the leaf origins created so far.
    pub(crate) fn extent(&self) -> Option<LeafExtent> {
        self.extent
    }

    /// Descends to the leaf covering `(x, y)` without creating anything.
    pub(crate) fn leaf_at(&self, x: u16, y: u16) -> Option<LeafIndex> {
        let mut node = ROOT;
        let mut cursor_x = u32::from(x);
        let mut cursor_y = u32::from(y);
        loop {
            match self.nodes[node] {
                Node::Leaf(leaf) => return Some(leaf),
                Node::Branch(children) => {
                    node = children[child_slot(cursor_x, cursor_y)]? as usize;
                    cursor_x <<= 1;
                    cursor_y <<= 1;
                }
            }
        }
    }

    /// Descends to the leaf covering `(x, y)`, creating missing branches and
    /// the leaf itself. A newly created leaf is linked to the existing
    /// leaves on each of its four sides.
    pub(crate) fn ensure_leaf(&mut self, x: u16, y: u16) -> LeafIndex {
        let mut node = ROOT;
        let mut cursor_x = u32::from(x);
        let mut cursor_y = u32::from(y);
        let mut level = TOP_LEVEL;
        loop {
            let mut children = match self.nodes[node] {
                Node::Leaf(leaf) => return leaf,
                Node::Branch(children) => children,
            };

            let slot = child_slot(cursor_x, cursor_y);
            if let Some(child) = children[slot] {
                node = child as usize;
            } else {
                let child = self.nodes.len() as u32;
                if level == FLOOR_BITS {
                    let leaf = LeafIndex(self.leaves.len() as u32);
                    let created = Leaf::new(x, y);
                    let (origin_x, origin_y) = created.origin();
                    self.extent = Some(match self.extent {
                        Some(extent) => extent.include(origin_x, origin_y),
                        None => LeafExtent {
                            min_x: origin_x,
                            min_y: origin_y,
                            max_x: origin_x,
                            max_y: origin_y,
                        },
                    });
                    self.leaves.push(created);
                    self.nodes.push(Node::Leaf(leaf));
                    children[slot] = Some(child);
                    self.nodes[node] = Node::Branch(children);
                    self.link_neighbors(leaf, x, y);
                    trace!(x, y, leaf = leaf.0, "created leaf");
                    return leaf;
                }
                self.nodes.push(Node::Branch([None; 4]));
                children[slot] = Some(child);
                self.nodes[node] = Node::Branch(children);
                node = child as usize;
            }

            cursor_x <<= 1;
            cursor_y <<= 1;
            level -= 1;
        }
    }

    fn link_neighbors(&mut self, leaf: LeafIndex, x: u16, y: u16) {
        if let Some(north_y) = y.checked_sub(FLOOR_SIZE) {
            if let Some(north) = self.leaf_at(x, north_y) {
                self.leaf_mut(north).set_south(Some(leaf));
            }
        }
        if let Some(west_x) = x.checked_sub(FLOOR_SIZE) {
            if let Some(west) = self.leaf_at(west_x, y) {
                self.leaf_mut(west).set_east(Some(leaf));
            }
        }
        let south = y
            .checked_add(FLOOR_SIZE)
            .and_then(|south_y| self.leaf_at(x, south_y));
        self.leaf_mut(leaf).set_south(south);
        let east = x
            .checked_add(FLOOR_SIZE)
            .and_then(|east_x| self.leaf_at(east_x, y));
        self.leaf_mut(leaf).set_east(east);
    }
}

fn child_slot(x: u32, y: u32) -> usize {
    (((x & 0x8000) >> 15) | ((y & 0x8000) >> 14)) as usize
}
