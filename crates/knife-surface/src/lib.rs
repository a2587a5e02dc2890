#![warn(missing_docs)]

//! The cutting surface: a triangulated 2-manifold with an orientation
//! flag, built from a subset of a primal's boundary patches, plus the
//! knife input script grammar that names it and applies transforms before
//! it becomes the subtrahend of the Boolean subtraction.

mod script;

pub use script::{apply_script, parse_script, ScriptDirective};

use knife_core::Result;
use knife_math::Point3;
use knife_primal::Primal;
use std::collections::BTreeSet;

/// A triangulated surface plus the orientation flag Masks consult when
/// deciding which side of a cut chord is "outside the kept volume".
/// Grounded on `surface.h`/`surface_from`.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    pub xyz: Vec<Point3>,
    /// Zero-based triangle connectivity.
    pub triangles: Vec<[u32; 3]>,
    /// Patch id each triangle inherited from the primal boundary face it
    /// came from.
    pub patch: Vec<u32>,
    pub inward_pointing_normal: bool,
}

impl SurfaceMesh {
    /// Build a surface from the boundary faces of `primal` whose patch id
    /// is in `patches` (or every boundary face, if `patches` is empty).
    pub fn from_primal(primal: &Primal, patches: &BTreeSet<u32>, inward_pointing_normal: bool) -> Result<Self> {
        let kept: Vec<usize> = if patches.is_empty() {
            (0..primal.nface()).collect()
        } else {
            (0..primal.nface())
                .filter(|&i| patches.contains(&primal.face(i).unwrap().patch))
                .collect()
        };

        let mut node_old_to_new: Vec<Option<u32>> = vec![None; primal.nnode()];
        let mut xyz = Vec::new();
        let mut triangles = Vec::new();
        let mut patch = Vec::new();
        for &i in &kept {
            let face = primal.face(i)?;
            let mut mapped = [0u32; 3];
            for (slot, &n) in mapped.iter_mut().zip(face.nodes.iter()) {
                let entry = &mut node_old_to_new[n as usize];
                *slot = *entry.get_or_insert_with(|| {
                    xyz.push(primal.xyz(n as usize).unwrap());
                    (xyz.len() - 1) as u32
                });
            }
            triangles.push(mapped);
            patch.push(face.patch);
        }

        Ok(Self {
            xyz,
            triangles,
            patch,
            inward_pointing_normal,
        })
    }

    pub fn nnode(&self) -> usize {
        self.xyz.len()
    }

    pub fn ntriangle(&self) -> usize {
        self.triangles.len()
    }

    /// The unnormalized outward-facing normal of triangle `t`, oriented per
    /// `inward_pointing_normal`.
    pub fn triangle_normal(&self, t: usize) -> knife_math::Vec3 {
        let [a, b, c] = self.triangles[t];
        let (p0, p1, p2) = (self.xyz[a as usize], self.xyz[b as usize], self.xyz[c as usize]);
        let n = (p1 - p0).cross(&(p2 - p0));
        if self.inward_pointing_normal {
            -n
        } else {
            n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_primal_keeps_only_requested_patches() {
        let mut primal = Primal::create(4, 2, 0);
        primal.copy_volume(
            &[0.0, 1.0, 0.0, 1.0],
            &[0.0, 0.0, 1.0, 1.0],
            &[0.0, 0.0, 0.0, 1.0],
            &[],
        );
        primal
            .copy_boundary(0, 1, &[[1, 2, 3]])
            .and_then(|next| primal.copy_boundary(next, 2, &[[1, 2, 4]]))
            .unwrap();

        let mut wanted = BTreeSet::new();
        wanted.insert(1);
        let surface = SurfaceMesh::from_primal(&primal, &wanted, false).unwrap();
        assert_eq!(surface.ntriangle(), 1);
        assert_eq!(surface.nnode(), 3);
    }

    #[test]
    fn inward_flag_negates_the_triangle_normal() {
        let mut primal = Primal::create(3, 1, 0);
        primal.copy_volume(&[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0], &[0.0, 0.0, 0.0], &[]);
        primal.copy_boundary(0, 1, &[[1, 2, 3]]).unwrap();

        let all = BTreeSet::new();
        let outward = SurfaceMesh::from_primal(&primal, &all, false).unwrap();
        let inward = SurfaceMesh::from_primal(&primal, &all, true).unwrap();
        assert!((outward.triangle_normal(0) + inward.triangle_normal(0)).norm() < 1e-12);
    }
}
