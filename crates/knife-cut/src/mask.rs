use knife_core::Result;
use knife_geom::{Geom, SegmentId, SubtriId, TriangleId};
use knife_math::predicates::{orient2d, Sign};
use knife_math::{Point2, Point3, Vec3};
use std::collections::HashSet;

/// A Triangle plus orientation plus an active/inactive label per Subtri.
/// `active = None` means "every current Subtri is active", matching
/// `mask_subtri_active`'s default before any `mask_deactivate_all_subtri`.
/// Grounded on `mask.h`.
#[derive(Debug, Clone)]
pub struct Mask {
    pub triangle: TriangleId,
    pub inward_pointing_normal: bool,
    active: Option<HashSet<SubtriId>>,
}

impl Mask {
    pub fn new(triangle: TriangleId, inward_pointing_normal: bool) -> Self {
        Self {
            triangle,
            inward_pointing_normal,
            active: None,
        }
    }

    pub fn is_active(&self, subtri: SubtriId) -> bool {
        match &self.active {
            None => true,
            Some(set) => set.contains(&subtri),
        }
    }

    pub fn active_subtris<'a>(&'a self, geom: &'a Geom) -> impl Iterator<Item = SubtriId> + 'a {
        geom.triangle(self.triangle)
            .subtris
            .iter()
            .copied()
            .filter(move |&id| self.is_active(id))
    }

    fn deactivate_all(&mut self, geom: &Geom) {
        self.active = Some(geom.triangle(self.triangle).subtris.iter().copied().collect());
    }

    fn deactivate(&mut self, geom: &Geom, subtri: SubtriId) {
        if self.active.is_none() {
            self.deactivate_all(geom);
        }
        self.active.as_mut().unwrap().remove(&subtri);
    }

    /// Run Boolean activation: for every cut chord on the wrapped Triangle,
    /// deactivate whichever side `kept_side` reports as outside the
    /// retained volume. `kept_side(segment)` returns the sign an interior
    /// point on the *retained* side would have under `orient2d(a, b, p)`
    /// for that chord's two intersection endpoints `a, b` (in the order
    /// they were inserted) — the domain computes this from the cutting
    /// Triangle's normal and `inward_pointing_normal`, since that
    /// information lives outside a single Triangle's own complex.
    pub fn paint(&mut self, geom: &Geom, kept_side: impl Fn(SegmentId) -> Sign) -> Result<()> {
        let triangle = geom.triangle(self.triangle);
        for &segment in &triangle.cuts {
            let chord_nodes: Vec<_> = triangle
                .subnodes
                .iter()
                .copied()
                .filter(|&sn| geom.subnode_cut_segment(sn) == Some(segment))
                .collect();
            if chord_nodes.len() < 2 {
                continue;
            }
            let keep = kept_side(segment);
            for pair in chord_nodes.windows(2) {
                let a = geom.subnode_uv(pair[0]);
                let b = geom.subnode_uv(pair[1]);
                for &subtri_id in &triangle.subtris {
                    if !self.is_active(subtri_id) {
                        continue;
                    }
                    let centroid = subtri_centroid_uv(geom, subtri_id);
                    let side = orient2d(&a, &b, &centroid);
                    if side != Sign::Zero && side != keep {
                        self.deactivate(geom, subtri_id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Assert no active Subtri shares a cut-chord edge with another active
    /// Subtri. Grounded on `mask_verify_paint`.
    pub fn verify_paint(&self, geom: &Geom) -> Result<()> {
        use knife_core::KnifeError;

        let triangle = geom.triangle(self.triangle);
        for &subtri_id in &triangle.subtris {
            if !self.is_active(subtri_id) {
                continue;
            }
            let subtri = geom.subtri(subtri_id);
            for side in 0..3 {
                let Some(edge_segment) = subtri.side_segment[side] else {
                    continue;
                };
                if !triangle.cuts.contains(&edge_segment) {
                    continue;
                }
                if let Some(neighbor) = geom.neighbor_across(self.triangle, subtri_id, side) {
                    if self.is_active(neighbor) {
                        return Err(KnifeError::Inconsistent(format!(
                            "{:?} has both sides of a cut chord active",
                            self.triangle
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Accumulate the signed tetrahedral volume from `origin` to every
    /// active Subtri, and the volume-weighted centroid numerator. The
    /// caller sums contributions from every Mask of a Poly region and
    /// divides by the total volume. Grounded on
    /// `mask_centroid_volume_contribution`.
    pub fn centroid_volume_contribution(
        &self,
        geom: &Geom,
        origin: Point3,
        centroid: &mut Vec3,
        volume: &mut f64,
    ) {
        let sign = if self.inward_pointing_normal { -1.0 } else { 1.0 };
        for subtri_id in self.active_subtris(geom) {
            let (p0, p1, p2) = subtri_vertices_xyz(geom, subtri_id);
            let v = sign * signed_tet_volume(origin, p0, p1, p2);
            let c = (p0.coords + p1.coords + p2.coords + origin.coords) / 4.0;
            *volume += v;
            *centroid += c * v;
        }
    }

    /// Vector area summed over active Subtris, flipped by
    /// `inward_pointing_normal` so the same Triangle shared by two Masks
    /// (e.g. the dual face between a pair of Polys) contributes
    /// equal-and-opposite areas to each.
    pub fn directed_area_contribution(&self, geom: &Geom, directed_area: &mut Vec3) {
        let sign = if self.inward_pointing_normal { -1.0 } else { 1.0 };
        for subtri_id in self.active_subtris(geom) {
            let (p0, p1, p2) = subtri_vertices_xyz(geom, subtri_id);
            *directed_area += (p1 - p0).cross(&(p2 - p0)) * (0.5 * sign);
        }
    }
}

fn subtri_centroid_uv(geom: &Geom, subtri: SubtriId) -> Point2 {
    let s = geom.subtri(subtri);
    let (a, b, c) = (
        geom.subnode_uv(s.subnodes[0]),
        geom.subnode_uv(s.subnodes[1]),
        geom.subnode_uv(s.subnodes[2]),
    );
    Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
}

fn subtri_vertices_xyz(geom: &Geom, subtri: SubtriId) -> (Point3, Point3, Point3) {
    let s = geom.subtri(subtri);
    (
        geom.subnode_xyz(s.subnodes[0]),
        geom.subnode_xyz(s.subnodes[1]),
        geom.subnode_xyz(s.subnodes[2]),
    )
}

fn signed_tet_volume(a: Point3, b: Point3, c: Point3, d: Point3) -> f64 {
    (b - a).cross(&(c - a)).dot(&(d - a)) / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use knife_geom::Geom;

    /// Same flat triangle and crossing chord as
    /// `knife_geom::triangulate`'s own recovery test: node0=(0,0,0),
    /// node1=(1,0,0), node2=(0,1,0), cut entering the node0-node2 edge at
    /// `(0.5, 0.0)` and exiting through the triangle's interior at
    /// `(0.3, 0.4)`.
    fn flat_triangle_with_chord() -> (Geom, TriangleId, SegmentId) {
        let mut geom = Geom::default();
        let n0 = geom.create_node(Point3::new(0.0, 0.0, 0.0));
        let n1 = geom.create_node(Point3::new(1.0, 0.0, 0.0));
        let n2 = geom.create_node(Point3::new(0.0, 1.0, 0.0));
        let s0 = geom.create_segment(n1, n2);
        let s1 = geom.create_segment(n0, n2);
        let s2 = geom.create_segment(n0, n1);
        let tri = geom.create_triangle(s0, s1, s2).unwrap();

        let cut_node_a = geom.create_node(Point3::new(0.0, 0.0, 0.0));
        let cut_node_b = geom.create_node(Point3::new(0.0, 0.0, 0.0));
        let cut_segment = geom.create_segment(cut_node_a, cut_node_b);

        geom.insert_intersection(tri, cut_segment, Point3::new(0.5, 0.0, 0.0), 0.0, Point2::new(0.5, 0.0))
            .unwrap();
        geom.insert_intersection(tri, cut_segment, Point3::new(0.3, 0.4, 0.0), 1.0, Point2::new(0.3, 0.4))
            .unwrap();
        geom.triangulate_cuts(tri).unwrap();

        (geom, tri, cut_segment)
    }

    #[test]
    fn paint_deactivates_the_side_of_a_real_chord_that_is_not_kept() {
        let (geom, tri, cut_segment) = flat_triangle_with_chord();
        let mut mask = Mask::new(tri, false);

        let total_subtris = geom.triangle(tri).subtris.len();
        assert!(total_subtris > 1, "a genuine chord should split the triangle into more than one Subtri");

        // node0's corner (uv = (1, 0)) sits strictly on the negative side
        // of the chord under orient2d(entry, exit, .); keep that side.
        mask.paint(&geom, |seg| {
            assert_eq!(seg, cut_segment);
            Sign::Negative
        })
        .unwrap();

        let active_after: Vec<_> = mask.active_subtris(&geom).collect();
        assert!(!active_after.is_empty(), "painting should not discard every Subtri");
        assert!(
            active_after.len() < total_subtris,
            "painting a real chord should deactivate at least one Subtri"
        );

        let node0_corner = geom.triangle(tri).subnodes[0];
        let node0_subtri = geom
            .triangle(tri)
            .subtris
            .iter()
            .copied()
            .find(|&id| geom.subtri(id).subnodes.contains(&node0_corner))
            .unwrap();
        assert!(mask.is_active(node0_subtri), "the kept side's own corner should remain active");

        mask.verify_paint(&geom).unwrap();
    }

    #[test]
    fn verify_paint_rejects_both_sides_of_a_chord_left_active() {
        let (geom, tri, _cut_segment) = flat_triangle_with_chord();
        // No painting at all: every Subtri stays active, including both
        // sides of the recovered chord, which verify_paint must reject.
        let mask = Mask::new(tri, false);
        assert!(mask.verify_paint(&geom).is_err());
    }
}
