use crate::Mask;
use knife_core::{KnifeError, Result};
use knife_geom::{Geom, Subtri, SubtriId};

/// One directed Subtri edge on the boundary of an active region: the
/// endpoint Subnodes plus which Subtri it bounds on its active side.
#[derive(Debug, Clone, Copy)]
pub struct Subsegment {
    pub subtri: SubtriId,
    pub side: usize,
}

/// A closed oriented chain of [`Subsegment`]s bordering one active region
/// of one [`Mask`]. Grounded on `loop.h`.
#[derive(Debug, Clone)]
pub struct Loop {
    pub edges: Vec<Subsegment>,
}

impl Loop {
    /// Extract every closed boundary loop of `mask`'s active region(s):
    /// walk active Subtris via shared edges, emitting an edge whenever its
    /// other side is inactive (or off the Triangle entirely) or carries a
    /// cut-chord constraint, until the walk returns to its start.
    pub fn trace(mask: &Mask, geom: &Geom) -> Result<Vec<Loop>> {
        let triangle = geom.triangle(mask.triangle);
        let mut boundary: Vec<Subsegment> = Vec::new();
        for &subtri_id in &triangle.subtris {
            if !mask.is_active(subtri_id) {
                continue;
            }
            for side in 0..3 {
                let other_active = geom
                    .neighbor_across(mask.triangle, subtri_id, side)
                    .map(|n| mask.is_active(n))
                    .unwrap_or(false);
                if !other_active {
                    boundary.push(Subsegment {
                        subtri: subtri_id,
                        side,
                    });
                }
            }
        }

        let mut remaining = boundary;
        let mut loops = Vec::new();
        while !remaining.is_empty() {
            let mut chain = vec![remaining.remove(0)];
            loop {
                let (_, tail) = subsegment_endpoints(geom, *chain.last().unwrap());
                let next_index = remaining.iter().position(|&seg| {
                    let (head, _) = subsegment_endpoints(geom, seg);
                    head == tail
                });
                match next_index {
                    Some(i) => chain.push(remaining.remove(i)),
                    None => break,
                }
            }
            let (head, _) = subsegment_endpoints(geom, chain[0]);
            let (_, tail) = subsegment_endpoints(geom, *chain.last().unwrap());
            if head != tail {
                return Err(KnifeError::Inconsistent(
                    "boundary walk did not close into a loop".into(),
                ));
            }
            loops.push(Loop { edges: chain });
        }
        Ok(loops)
    }
}

fn subsegment_endpoints(
    geom: &Geom,
    seg: Subsegment,
) -> (knife_geom::SubnodeId, knife_geom::SubnodeId) {
    let subtri = geom.subtri(seg.subtri);
    let (a, b) = Subtri::side(seg.side);
    (subtri.subnodes[a], subtri.subnodes[b])
}

#[cfg(test)]
mod tests {
    use super::*;
    use knife_math::Point3;

    fn flat_triangle() -> (Geom, knife_geom::TriangleId) {
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
    fn fully_active_mask_traces_one_loop_around_the_whole_triangle() {
        let (geom, tri) = flat_triangle();
        let mask = Mask::new(tri, false);
        let loops = Loop::trace(&mask, &geom).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].edges.len(), 3);
    }
}
