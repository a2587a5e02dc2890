#![warn(missing_docs)]

//! Arena for the triangle complex that the cut surface is intersected
//! into: nodes, segments, triangles, and — once a triangle has been cut —
//! the subnodes/subtris/intersections that subdivide it.
//!
//! Every cross-reference (segment-to-triangle, subtri-to-subnode) is a
//! `slotmap` key rather than a pointer, so the triangle-segment-triangle
//! cycles of the original pointer graph become plain data.

mod node;
mod segment;
mod triangle;
mod triangulate;

pub use node::Node;
pub use segment::Segment;
pub use triangle::{Intersection, Subnode, Subtri, Triangle};

use knife_core::Tolerance;
use knife_math::Point3;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key for a [`Node`].
    pub struct NodeId;
    /// Key for a [`Segment`].
    pub struct SegmentId;
    /// Key for a [`Triangle`].
    pub struct TriangleId;
    /// Key for a [`Subnode`].
    pub struct SubnodeId;
    /// Key for a [`Subtri`].
    pub struct SubtriId;
    /// Key for an [`Intersection`].
    pub struct IntersectionId;
}

/// The node/segment/triangle arena for one `Domain`'s cutting pass.
pub struct Geom {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) segments: SlotMap<SegmentId, Segment>,
    pub(crate) triangles: SlotMap<TriangleId, Triangle>,
    pub(crate) subnodes: SlotMap<SubnodeId, Subnode>,
    pub(crate) subtris: SlotMap<SubtriId, Subtri>,
    pub(crate) intersections: SlotMap<IntersectionId, Intersection>,
    pub(crate) tolerance: Tolerance,
}

impl Default for Geom {
    fn default() -> Self {
        Self::new(Tolerance::default())
    }
}

impl Geom {
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            segments: SlotMap::with_key(),
            triangles: SlotMap::with_key(),
            subnodes: SlotMap::with_key(),
            subtris: SlotMap::with_key(),
            intersections: SlotMap::with_key(),
            tolerance,
        }
    }

    pub fn create_node(&mut self, xyz: Point3) -> NodeId {
        self.nodes.insert(Node { xyz })
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Create a segment between two nodes, grounded on `segment_create`.
    pub fn create_segment(&mut self, node0: NodeId, node1: NodeId) -> SegmentId {
        self.segments.insert(Segment {
            node0,
            node1,
            triangles: Vec::new(),
            intersections: Vec::new(),
        })
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id]
    }

    /// The node shared by two segments, or `None` if they share none.
    /// Grounded on `segment_common_node`.
    pub fn common_node(&self, a: SegmentId, b: SegmentId) -> Option<NodeId> {
        let sa = &self.segments[a];
        let sb = &self.segments[b];
        for &na in &[sa.node0, sa.node1] {
            for &nb in &[sb.node0, sb.node1] {
                if na == nb {
                    return Some(na);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_node_finds_shared_endpoint() {
        let mut geom = Geom::default();
        let a = geom.create_node(Point3::new(0.0, 0.0, 0.0));
        let b = geom.create_node(Point3::new(1.0, 0.0, 0.0));
        let c = geom.create_node(Point3::new(0.0, 1.0, 0.0));
        let s0 = geom.create_segment(a, b);
        let s1 = geom.create_segment(b, c);
        assert_eq!(geom.common_node(s0, s1), Some(b));
        let s2 = geom.create_segment(c, a);
        assert_eq!(geom.common_node(s0, s2), Some(a));
    }
}
