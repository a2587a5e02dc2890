use crate::{Geom, NodeId, SegmentId, SubnodeId, SubtriId, TriangleId};
use knife_core::{KnifeError, Result};
use knife_math::predicates::{orient2d, Sign};
use knife_math::{Point2, Point3};

/// A planar facet bounded by three segments, carrying the sub-triangulation
/// produced once cutting segments are inserted into it.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub segments: [SegmentId; 3],
    pub node0: NodeId,
    pub node1: NodeId,
    pub node2: NodeId,
    pub subnodes: Vec<SubnodeId>,
    pub subtris: Vec<SubtriId>,
    /// Cutting segments registered against this triangle, pending
    /// `triangulate_cuts`.
    pub cuts: Vec<SegmentId>,
}

/// A vertex of the triangle's sub-triangulation, located by barycentric
/// coordinates `(u, v, w)` with `w = 1 - u - v` (so `u` weights `node0`,
/// `v` weights `node1`, `w` weights `node2`).
#[derive(Debug, Clone, Copy)]
pub struct Subnode {
    pub uv: Point2,
    pub xyz: Point3,
    /// Set when this subnode coincides exactly with one of the triangle's
    /// three corners.
    pub parent_node: Option<NodeId>,
    /// Set when this subnode was created by inserting a cut intersection.
    pub intersection: Option<crate::IntersectionId>,
}

/// One facet of the sub-triangulation. `side_segment[i]` is the
/// constraining segment (cut or boundary) running along the side opposite
/// `subnodes[(i + 2) % 3]`, i.e. from `subnodes[i]` to `subnodes[(i + 1) %
/// 3]`, or `None` for an edge interior to the complex with no constraint.
#[derive(Debug, Clone)]
pub struct Subtri {
    pub subnodes: [SubnodeId; 3],
    pub side_segment: [Option<SegmentId>; 3],
}

impl Subtri {
    pub fn side(index: usize) -> (usize, usize) {
        [(0, 1), (1, 2), (2, 0)][index]
    }
}

/// Where a cutting segment crosses a triangle.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub segment: SegmentId,
    pub triangle: TriangleId,
    pub xyz: Point3,
    /// Parametric position along `segment`, in `[0, 1]`.
    pub t: f64,
}

impl Geom {
    /// Create a triangle from three segments, deriving its corner nodes
    /// from the segments' shared endpoints and seeding the sub-triangulation
    /// with a single subtri covering the whole triangle. Grounded on
    /// `triangle_initialize`.
    pub fn create_triangle(
        &mut self,
        segment0: SegmentId,
        segment1: SegmentId,
        segment2: SegmentId,
    ) -> Result<TriangleId> {
        let node0 = self
            .common_node(segment1, segment2)
            .ok_or_else(|| KnifeError::Inconsistent("segment1/segment2 share no node".into()))?;
        let node1 = self
            .common_node(segment0, segment2)
            .ok_or_else(|| KnifeError::Inconsistent("segment0/segment2 share no node".into()))?;
        let node2 = self
            .common_node(segment0, segment1)
            .ok_or_else(|| KnifeError::Inconsistent("segment0/segment1 share no node".into()))?;

        let sub0 = self.subnodes.insert(Subnode {
            uv: Point2::new(1.0, 0.0),
            xyz: self.node(node0).xyz,
            parent_node: Some(node0),
            intersection: None,
        });
        let sub1 = self.subnodes.insert(Subnode {
            uv: Point2::new(0.0, 1.0),
            xyz: self.node(node1).xyz,
            parent_node: Some(node1),
            intersection: None,
        });
        let sub2 = self.subnodes.insert(Subnode {
            uv: Point2::new(0.0, 0.0),
            xyz: self.node(node2).xyz,
            parent_node: Some(node2),
            intersection: None,
        });

        let initial = self.subtris.insert(Subtri {
            subnodes: [sub0, sub1, sub2],
            side_segment: [Some(segment2), Some(segment0), Some(segment1)],
        });

        let id = self.triangles.insert(Triangle {
            segments: [segment0, segment1, segment2],
            node0,
            node1,
            node2,
            subnodes: vec![sub0, sub1, sub2],
            subtris: vec![initial],
            cuts: Vec::new(),
        });

        for seg in [segment0, segment1, segment2] {
            self.segments[seg].part_of(id);
        }

        Ok(id)
    }

    pub fn triangle(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id]
    }

    pub fn subtri(&self, id: SubtriId) -> &Subtri {
        &self.subtris[id]
    }

    pub fn subnode_uv(&self, id: SubnodeId) -> Point2 {
        self.subnodes[id].uv
    }

    pub fn subnode_xyz(&self, id: SubnodeId) -> Point3 {
        self.subnodes[id].xyz
    }

    pub fn subnode_parent_node(&self, id: SubnodeId) -> Option<NodeId> {
        self.subnodes[id].parent_node
    }

    pub fn subnode_intersection(&self, id: SubnodeId) -> Option<crate::IntersectionId> {
        self.subnodes[id].intersection
    }

    pub fn intersection(&self, id: crate::IntersectionId) -> &Intersection {
        &self.intersections[id]
    }

    /// The cut segment a subnode was inserted for, if it came from an
    /// `Intersection` rather than a corner or an unrelated point insert.
    pub fn subnode_cut_segment(&self, id: SubnodeId) -> Option<SegmentId> {
        self.subnodes[id]
            .intersection
            .map(|ix| self.intersections[ix].segment)
    }

    /// The subtri of `triangle`, other than `subtri_id`, sharing the side
    /// at `side_index`, if any (a triangle-boundary side has none).
    pub fn neighbor_across(
        &self,
        triangle: TriangleId,
        subtri_id: SubtriId,
        side_index: usize,
    ) -> Option<SubtriId> {
        let subtri = &self.subtris[subtri_id];
        let (a, b) = Subtri::side(side_index);
        let (na, nb) = (subtri.subnodes[a], subtri.subnodes[b]);
        self.find_neighbor_across(triangle, subtri_id, na, nb)
    }

    fn triangle_xyz(&self, triangle: TriangleId, uv: Point2) -> Point3 {
        let t = &self.triangles[triangle];
        let w = 1.0 - uv.x - uv.y;
        let p0 = self.node(t.node0).xyz;
        let p1 = self.node(t.node1).xyz;
        let p2 = self.node(t.node2).xyz;
        Point3::from(p0.coords * uv.x + p1.coords * uv.y + p2.coords * w)
    }

    fn uv_close(&self, a: Point2, b: Point2) -> bool {
        (a - b).norm() < self.tolerance.distance.max(1.0e-9)
    }

    /// Register a cutting segment's intersection with a triangle: inserts
    /// a subnode at the crossing point (deduplicating against an existing
    /// subnode at the same location) and records the segment as a pending
    /// cut for `triangulate_cuts`. Grounded on the `Intersection`/`Subnode`
    /// relationship implied by `mask.h` and `triangle.h`.
    pub fn insert_intersection(
        &mut self,
        triangle: TriangleId,
        segment: SegmentId,
        xyz: Point3,
        t: f64,
        uv: Point2,
    ) -> Result<SubnodeId> {
        let intersection = self.intersections.insert(Intersection {
            segment,
            triangle,
            xyz,
            t,
        });
        self.segments[segment].intersections.push(intersection);

        let subnode = self.insert_subnode_at(triangle, uv, xyz, None, Some(intersection))?;

        let tri = self.triangles.get_mut(triangle).unwrap();
        if !tri.cuts.contains(&segment) {
            tri.cuts.push(segment);
        }

        Ok(subnode)
    }

    /// Insert a point into the sub-triangulation of `triangle` at
    /// barycentric coordinates `uv`, splitting whichever subtri currently
    /// contains it. Returns the existing subnode if one already sits at
    /// `uv` within tolerance.
    pub(crate) fn insert_subnode_at(
        &mut self,
        triangle: TriangleId,
        uv: Point2,
        xyz: Point3,
        parent_node: Option<NodeId>,
        intersection: Option<crate::IntersectionId>,
    ) -> Result<SubnodeId> {
        for &existing in &self.triangles[triangle].subnodes {
            if self.uv_close(self.subnode_uv(existing), uv) {
                return Ok(existing);
            }
        }

        let (containing, on_side) = self.locate(triangle, uv)?;

        let new_subnode = self.subnodes.insert(Subnode {
            uv,
            xyz,
            parent_node,
            intersection,
        });
        self.triangles
            .get_mut(triangle)
            .unwrap()
            .subnodes
            .push(new_subnode);

        match on_side {
            None => self.split_interior(triangle, containing, new_subnode),
            Some(side) => self.split_on_edge(triangle, containing, side, new_subnode)?,
        }

        Ok(new_subnode)
    }

    /// Locate the subtri containing `uv`: returns the subtri id and, if the
    /// point lies exactly on one of its sides, that side's index.
    fn locate(&self, triangle: TriangleId, uv: Point2) -> Result<(SubtriId, Option<usize>)> {
        for &subtri_id in &self.triangles[triangle].subtris {
            let subtri = &self.subtris[subtri_id];
            let corners: [Point2; 3] = std::array::from_fn(|i| self.subnode_uv(subtri.subnodes[i]));
            let mut signs = [Sign::Zero; 3];
            for side in 0..3 {
                let (a, b) = Subtri::side(side);
                signs[side] = orient2d(&corners[a], &corners[b], &uv);
            }
            let inside = signs.iter().all(|s| !s.is_negative());
            if !inside {
                continue;
            }
            let on_side = signs.iter().position(|s| s.is_zero());
            return Ok((subtri_id, on_side));
        }
        Err(KnifeError::NotFound(
            "point does not lie within the triangle's sub-triangulation".into(),
        ))
    }

    fn split_interior(&mut self, triangle: TriangleId, subtri_id: SubtriId, new: SubnodeId) {
        let old = self.subtris.remove(subtri_id).unwrap();
        let corners = old.subnodes;
        let sides = old.side_segment;
        let mut new_ids = Vec::with_capacity(3);
        for i in 0..3 {
            let (a, b) = Subtri::side(i);
            new_ids.push(self.subtris.insert(Subtri {
                subnodes: [corners[a], corners[b], new],
                side_segment: [sides[i], None, None],
            }));
        }
        let tri = self.triangles.get_mut(triangle).unwrap();
        tri.subtris.retain(|&id| id != subtri_id);
        tri.subtris.extend(new_ids);
    }

    fn split_on_edge(
        &mut self,
        triangle: TriangleId,
        subtri_id: SubtriId,
        side: usize,
        new: SubnodeId,
    ) -> Result<()> {
        let old = self.subtris.remove(subtri_id).unwrap();
        let (a, b) = Subtri::side(side);
        let opposite = 3 - a - b;
        let (edge_a, edge_b) = (old.subnodes[a], old.subnodes[b]);
        let constraint = old.side_segment[side];

        let mut removed = vec![subtri_id];
        let mut added = vec![
            self.subtris.insert(Subtri {
                subnodes: [edge_a, new, old.subnodes[opposite]],
                side_segment: [constraint, None, old.side_segment[(side + 2) % 3]],
            }),
            self.subtris.insert(Subtri {
                subnodes: [new, edge_b, old.subnodes[opposite]],
                side_segment: [constraint, old.side_segment[(side + 1) % 3], None],
            }),
        ];

        if let Some(neighbor_id) = self.find_neighbor_across(triangle, subtri_id, edge_a, edge_b) {
            let neighbor = self.subtris.remove(neighbor_id).unwrap();
            removed.push(neighbor_id);
            let n_side = (0..3)
                .find(|&i| {
                    let (x, y) = Subtri::side(i);
                    let verts = [neighbor.subnodes[x], neighbor.subnodes[y]];
                    verts.contains(&edge_a) && verts.contains(&edge_b)
                })
                .ok_or_else(|| {
                    KnifeError::Inconsistent("neighbor does not share the split edge".into())
                })?;
            let (na, nb) = Subtri::side(n_side);
            let n_opposite = 3 - na - nb;
            added.push(self.subtris.insert(Subtri {
                subnodes: [
                    neighbor.subnodes[na],
                    new,
                    neighbor.subnodes[n_opposite],
                ],
                side_segment: [constraint, None, neighbor.side_segment[(n_side + 2) % 3]],
            }));
            added.push(self.subtris.insert(Subtri {
                subnodes: [
                    new,
                    neighbor.subnodes[nb],
                    neighbor.subnodes[n_opposite],
                ],
                side_segment: [constraint, neighbor.side_segment[(n_side + 1) % 3], None],
            }));
        }

        let tri = self.triangles.get_mut(triangle).unwrap();
        tri.subtris.retain(|id| !removed.contains(id));
        tri.subtris.extend(added);
        Ok(())
    }

    fn find_neighbor_across(
        &self,
        triangle: TriangleId,
        exclude: SubtriId,
        a: SubnodeId,
        b: SubnodeId,
    ) -> Option<SubtriId> {
        self.triangles[triangle]
            .subtris
            .iter()
            .copied()
            .filter(|&id| id != exclude)
            .find(|&id| {
                let subtri = &self.subtris[id];
                (0..3).any(|side| {
                    let (x, y) = Subtri::side(side);
                    let verts = [subtri.subnodes[x], subtri.subnodes[y]];
                    verts.contains(&a) && verts.contains(&b)
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knife_math::Point3;

    fn flat_triangle() -> (Geom, TriangleId) {
        let mut geom = Geom::default();
        let n0 = geom.create_node(Point3::new(0.0, 0.0, 0.0));
        let n1 = geom.create_node(Point3::new(1.0, 0.0, 0.0));
        let n2 = geom.create_node(Point3::new(0.0, 1.0, 0.0));
        let s0 = geom.create_segment(n1, n2);
        let s1 = geom.create_segment(n0, n2);
        let s2 = geom.create_segment(n0, n1);
        let tri = geom.create_triangle(s0, s1, s2).unwrap();
        (geom, tri)
    }

    #[test]
    fn create_triangle_seeds_three_corner_subnodes() {
        let (geom, tri) = flat_triangle();
        assert_eq!(geom.triangle(tri).subnodes.len(), 3);
        assert_eq!(geom.triangle(tri).subtris.len(), 1);
    }

    #[test]
    fn interior_insert_splits_into_three() {
        let (mut geom, tri) = flat_triangle();
        let uv = Point2::new(0.25, 0.25);
        let xyz = geom.triangle_xyz(tri, uv);
        geom.insert_subnode_at(tri, uv, xyz, None, None).unwrap();
        assert_eq!(geom.triangle(tri).subtris.len(), 3);
        assert_eq!(geom.triangle(tri).subnodes.len(), 4);
    }

    #[test]
    fn edge_insert_splits_single_subtri_into_two() {
        let (mut geom, tri) = flat_triangle();
        // midpoint of the node0-node2 edge (v = 0, u in [0, 1]).
        let uv = Point2::new(0.5, 0.0);
        let xyz = geom.triangle_xyz(tri, uv);
        geom.insert_subnode_at(tri, uv, xyz, None, None).unwrap();
        assert_eq!(geom.triangle(tri).subtris.len(), 2);
    }
}
