use crate::{Geom, SegmentId, SubnodeId, SubtriId, Subtri, TriangleId};
use knife_core::{KnifeError, Result};
use knife_math::predicates::{orient2d, Sign};
use knife_math::Point2;

impl Geom {
    /// Retriangulate `triangle` so every cut segment registered against it
    /// (via `insert_intersection`) appears as a chain of constrained
    /// subtri edges. Grounded on the contract of `triangle_triangulate_cuts`,
    /// which is unimplemented in the retrieved source.
    ///
    /// The triangle's sub-triangulation domain is always the flat
    /// interior of one `Triangle`, so it is always convex; recovering a
    /// constraint by repeatedly flipping the subtri edges it crosses is
    /// guaranteed to terminate.
    pub fn triangulate_cuts(&mut self, triangle: TriangleId) -> Result<()> {
        let cuts: Vec<SegmentId> = self.triangles[triangle].cuts.clone();
        for segment in cuts {
            let endpoints: Vec<SubnodeId> = self.triangles[triangle]
                .subnodes
                .iter()
                .copied()
                .filter(|&sn| {
                    self.subnodes[sn]
                        .intersection
                        .map(|ix| self.intersections[ix].segment == segment)
                        .unwrap_or(false)
                })
                .collect();

            for pair in endpoints.windows(2) {
                self.recover_edge(triangle, pair[0], pair[1], segment)?;
            }
            // A straight cut ordinarily crosses a convex triangle at
            // exactly two points (entry/exit); more than two subnodes for
            // the same segment means it grazed a vertex — every
            // consecutive pair above is still recovered, so the whole
            // chain ends up constrained regardless of count.
        }
        Ok(())
    }

    fn edge_subtri(&self, triangle: TriangleId, a: SubnodeId, b: SubnodeId) -> Option<(SubtriId, usize)> {
        self.triangles[triangle].subtris.iter().copied().find_map(|id| {
            let subtri = &self.subtris[id];
            (0..3).find_map(|side| {
                let (x, y) = Subtri::side(side);
                let verts = [subtri.subnodes[x], subtri.subnodes[y]];
                if verts.contains(&a) && verts.contains(&b) {
                    Some((id, side))
                } else {
                    None
                }
            })
        })
    }

    fn recover_edge(
        &mut self,
        triangle: TriangleId,
        a: SubnodeId,
        b: SubnodeId,
        segment: SegmentId,
    ) -> Result<()> {
        if a == b {
            return Ok(());
        }

        let mut guard = 0usize;
        loop {
            if let Some((subtri_id, side)) = self.edge_subtri(triangle, a, b) {
                self.subtris[subtri_id].side_segment[side] = Some(segment);
                if let Some((other_id, other_side)) = self
                    .triangles[triangle]
                    .subtris
                    .iter()
                    .copied()
                    .filter(|&id| id != subtri_id)
                    .find_map(|id| {
                        let subtri = &self.subtris[id];
                        (0..3).find_map(|s| {
                            let (x, y) = Subtri::side(s);
                            let verts = [subtri.subnodes[x], subtri.subnodes[y]];
                            if verts.contains(&a) && verts.contains(&b) {
                                Some((id, s))
                            } else {
                                None
                            }
                        })
                    })
                {
                    self.subtris[other_id].side_segment[other_side] = Some(segment);
                }
                return Ok(());
            }

            guard += 1;
            if guard > 10_000 {
                return Err(KnifeError::Inconsistent(
                    "edge recovery failed to converge".into(),
                ));
            }

            self.flip_one_crossing(triangle, a, b)?;
        }
    }

    /// Find a subtri edge crossed by the open segment `a`-`b` and flip it.
    fn flip_one_crossing(&mut self, triangle: TriangleId, a: SubnodeId, b: SubnodeId) -> Result<()> {
        let uv_a = self.subnodes[a].uv;
        let uv_b = self.subnodes[b].uv;

        let subtris = self.triangles[triangle].subtris.clone();
        for &subtri_id in &subtris {
            let subtri = self.subtris[subtri_id].clone();
            for side in 0..3 {
                let (x, y) = Subtri::side(side);
                let (p, q) = (subtri.subnodes[x], subtri.subnodes[y]);
                if p == a || p == b || q == a || q == b {
                    continue; // only interior crossings count
                }
                if subtri.side_segment[side].is_some() {
                    continue; // never flip a constrained or boundary edge
                }
                let uv_p = self.subnodes[p].uv;
                let uv_q = self.subnodes[q].uv;
                if segments_properly_cross(uv_a, uv_b, uv_p, uv_q) {
                    self.flip_edge(triangle, subtri_id, side)?;
                    return Ok(());
                }
            }
        }

        Err(KnifeError::Inconsistent(format!(
            "no crossing edge found while recovering constraint between subnodes in {triangle:?}"
        )))
    }

    fn flip_edge(&mut self, triangle: TriangleId, subtri_id: SubtriId, side: usize) -> Result<()> {
        let t0 = self.subtris[subtri_id].clone();
        let (pi, qi) = Subtri::side(side);
        let ri = 3 - pi - qi;
        let (p, q, r) = (t0.subnodes[pi], t0.subnodes[qi], t0.subnodes[ri]);
        // t0.side_segment[side] (the p-q edge) is discarded: it is the
        // diagonal being flipped away, and flip_one_crossing never
        // selects a constrained edge, so it is always None anyway.
        let qr_segment = t0.side_segment[(side + 1) % 3];
        let rp_segment = t0.side_segment[(side + 2) % 3];

        let neighbor_id = self.triangles[triangle]
            .subtris
            .iter()
            .copied()
            .find(|&id| {
                id != subtri_id
                    && (0..3).any(|s| {
                        let (x, y) = Subtri::side(s);
                        let verts = [self.subtris[id].subnodes[x], self.subtris[id].subnodes[y]];
                        verts.contains(&p) && verts.contains(&q)
                    })
            })
            .ok_or_else(|| KnifeError::Inconsistent("edge to flip has no neighbor".into()))?;

        // Adjacent subtris store a shared edge in opposite vertex order
        // (consistent CCW winding on both faces), so the neighbor's side
        // covering (p, q) runs (nqi -> npi) with nqi identified with `p`
        // and npi identified with `q`.
        let t1 = self.subtris[neighbor_id].clone();
        let n_side = (0..3)
            .find(|&s| {
                let (x, y) = Subtri::side(s);
                let verts = [t1.subnodes[x], t1.subnodes[y]];
                verts.contains(&p) && verts.contains(&q)
            })
            .unwrap();
        let (npi, nqi) = Subtri::side(n_side);
        let nri = 3 - npi - nqi;
        let s = t1.subnodes[nri];
        let ps_segment = t1.side_segment[(n_side + 1) % 3];
        let qs_segment = t1.side_segment[(n_side + 2) % 3];

        self.subtris.remove(subtri_id);
        self.subtris.remove(neighbor_id);

        let new0 = self.subtris.insert(Subtri {
            subnodes: [r, p, s],
            side_segment: [rp_segment, ps_segment, None],
        });
        let new1 = self.subtris.insert(Subtri {
            subnodes: [s, q, r],
            side_segment: [qs_segment, qr_segment, None],
        });

        let tri = self.triangles.get_mut(triangle).unwrap();
        tri.subtris.retain(|&id| id != subtri_id && id != neighbor_id);
        tri.subtris.push(new0);
        tri.subtris.push(new1);
        Ok(())
    }
}

/// Proper intersection test for two open segments in barycentric `(u, v)`
/// space: true only when each segment's endpoints straddle the other.
fn segments_properly_cross(a: Point2, b: Point2, p: Point2, q: Point2) -> bool {
    let s1 = orient2d(&a, &b, &p);
    let s2 = orient2d(&a, &b, &q);
    let s3 = orient2d(&p, &q, &a);
    let s4 = orient2d(&p, &q, &b);
    straddles(s1, s2) && straddles(s3, s4)
}

fn straddles(s1: Sign, s2: Sign) -> bool {
    (s1.is_positive() && s2.is_negative()) || (s1.is_negative() && s2.is_positive())
}

#[cfg(test)]
mod tests {
    use crate::Geom;
    use knife_math::{Point2, Point3};

    fn flat_triangle() -> (Geom, crate::TriangleId) {
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
    fn triangulate_cuts_recovers_a_crossing_segment() {
        let (mut geom, tri) = flat_triangle();

        let cut_node_a = geom.create_node(Point3::new(0.0, 0.0, 0.0));
        let cut_node_b = geom.create_node(Point3::new(0.0, 0.0, 0.0));
        let cut_segment = geom.create_segment(cut_node_a, cut_node_b);

        // A cut entering through the node0-node2 edge (v=0 side, u=0.5)
        // and exiting through the node0-node1 edge (u+v=1 side, at (0.3,0.4)).
        let entry_uv = Point2::new(0.5, 0.0);
        let entry_xyz = Point3::new(0.5, 0.0, 0.0);
        geom.insert_intersection(tri, cut_segment, entry_xyz, 0.0, entry_uv)
            .unwrap();

        let exit_uv = Point2::new(0.3, 0.4);
        let exit_xyz = Point3::new(0.3, 0.4, 0.0);
        geom.insert_intersection(tri, cut_segment, exit_xyz, 1.0, exit_uv)
            .unwrap();

        geom.triangulate_cuts(tri).unwrap();

        let has_constrained_edge = geom.triangle(tri).subtris.iter().any(|&id| {
            geom.subtris[id]
                .side_segment
                .iter()
                .any(|s| *s == Some(cut_segment))
        });
        assert!(has_constrained_edge);
    }
}
