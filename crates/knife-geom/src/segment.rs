use crate::{IntersectionId, NodeId, TriangleId};

/// The connection between two [`Node`](crate::Node)s: an edge of the
/// primal surface mesh or of the cutting surface. Tracks which triangles
/// it bounds and where other triangles intersect it.
#[derive(Debug, Clone)]
pub struct Segment {
    pub node0: NodeId,
    pub node1: NodeId,
    pub triangles: Vec<TriangleId>,
    pub intersections: Vec<IntersectionId>,
}

impl Segment {
    pub fn part_of(&mut self, triangle: TriangleId) {
        if !self.triangles.contains(&triangle) {
            self.triangles.push(triangle);
        }
    }
}
