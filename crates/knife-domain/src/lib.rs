#![warn(missing_docs)]

//! The per-partition orchestrator: builds the median-dual Polys required
//! by a cutting surface, intersects it against them, and assembles the
//! resulting Regions. Grounded on `knife_fortran.c`'s `knife_required_local_dual`
//! and the `domain.h`/`domain.c` state it drives (`create_dual`,
//! `boolean_subtract`, `add_interior_poly`, `topo`), none of which survived
//! implemented in the retrieved source.

mod intersect;
mod median;

use intersect::{barycentric_uv, bbox, bboxes_overlap, inside_triangle, segment_plane_crossing};
use knife_core::{FrameCounter, KnifeError, Result};
use knife_cut::{FaceKind, Mask, Poly};
use knife_geom::{Geom, SegmentId, TriangleId};
use knife_io::write_tecplot_surface;
use knife_math::predicates::{orient3d, Sign};
use knife_primal::Primal;
use knife_surface::SurfaceMesh;
use median::MedianCache;
use std::collections::{HashMap, HashSet};

/// The coarse classification `topo` reports for a primal node, derived
/// from whether its Poly exists, was actually cut, and touches a
/// primal boundary patch. Grounded on `domain_topo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Topo {
    /// A Poly exists and no Mask of it was ever cut.
    Uncut = 0,
    /// At least one Mask of the Poly has an inactive Subtri.
    Cut = 1,
    /// Uncut, but bordered by a primal boundary patch.
    BoundaryAdjacent = 2,
    /// No Poly has been built for this node.
    Empty = 3,
}

/// Owns the triangle-complex arena and the median-dual Polys for one
/// partition's worth of primal nodes.
pub struct Domain {
    partition: u32,
    frame: FrameCounter,
    geom: Geom,
    polys: HashMap<usize, Poly>,
    median: MedianCache,
    cut_segment_surface_tri: HashMap<SegmentId, usize>,
    node_xyz: HashMap<usize, knife_math::Point3>,
}

impl Domain {
    /// A fresh, empty Domain for partition `partition`, whose diagnostic
    /// frame counter starts at the partition id (per spec, so the first
    /// dump from a never-before-failing partition is `surfaceNNNN.t` with
    /// `NNNN` equal to the partition id).
    pub fn new(partition: u32) -> Self {
        Self {
            partition,
            frame: FrameCounter::starting_at(partition),
            geom: Geom::default(),
            polys: HashMap::new(),
            median: MedianCache::default(),
            cut_segment_surface_tri: HashMap::new(),
            node_xyz: HashMap::new(),
        }
    }

    /// The triangle-complex arena backing every Poly's Masks.
    pub fn geom(&self) -> &Geom {
        &self.geom
    }

    /// The assembled Poly for `node`, if one has been built.
    pub fn poly(&self, node: usize) -> Option<&Poly> {
        self.polys.get(&node)
    }

    /// Mark every entry of `required` (indexed by primal node, sized
    /// `primal.nnode()`) that is an endpoint of a primal edge crossing
    /// `surface`. A quick bounding-box reject short-circuits partitions
    /// the surface never touches. Grounded on `knife_required_local_dual`.
    pub fn required_local_dual(&self, primal: &Primal, surface: &SurfaceMesh, required: &mut [u8]) -> Result<()> {
        if required.len() != primal.nnode() {
            return Err(KnifeError::ArrayBound(format!(
                "required_local_dual: required[] length {} does not match nnode {}",
                required.len(),
                primal.nnode()
            )));
        }
        for r in required.iter_mut() {
            *r = 0;
        }
        if surface.ntriangle() == 0 {
            return Ok(());
        }

        let Some((slo, shi)) = bbox(surface.xyz.iter().copied()) else {
            return Ok(());
        };
        let nnode = primal.nnode();
        let mut node_xyz = Vec::with_capacity(nnode);
        for n in 0..nnode {
            node_xyz.push(primal.xyz(n)?);
        }
        let Some((plo, phi)) = bbox(node_xyz.iter().copied()) else {
            return Ok(());
        };
        if !bboxes_overlap(plo, phi, slo, shi) {
            return Ok(());
        }

        let nedge = primal.nedge()?;
        for edge_id in 0..nedge as u32 {
            let nodes = primal.edge(edge_id as usize)?;
            let a = node_xyz[nodes[0] as usize];
            let b = node_xyz[nodes[1] as usize];
            for st in 0..surface.ntriangle() {
                let [i0, i1, i2] = surface.triangles[st];
                let (p0, p1, p2) = (
                    surface.xyz[i0 as usize],
                    surface.xyz[i1 as usize],
                    surface.xyz[i2 as usize],
                );
                if let Some((_, xyz)) = segment_plane_crossing(p0, p1, p2, a, b) {
                    if let Some(uv) = barycentric_uv(p0, p1, p2, xyz) {
                        if inside_triangle(uv) {
                            required[nodes[0] as usize] = 1;
                            required[nodes[1] as usize] = 1;
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Build the median-dual Poly for every node `required` flags,
    /// sharing Between/Boundary geometry with whichever neighbouring Poly
    /// touches it first. Grounded on `domain_create_dual`.
    pub fn create_dual(&mut self, primal: &Primal, required: &[u8]) -> Result<()> {
        for node in 0..primal.nnode() {
            if required.get(node).copied().unwrap_or(0) != 0 {
                self.build_poly(primal, node)?;
            }
        }
        Ok(())
    }

    /// Build a fully-active Poly for `node` with no surface intersection,
    /// for a node that needs a dual cell but lies nowhere near the
    /// cutting surface. A no-op if the node's Poly already exists.
    /// Grounded on `domain_add_interior_poly`.
    pub fn add_interior_poly(&mut self, primal: &Primal, node: usize) -> Result<()> {
        if self.polys.contains_key(&node) {
            return Ok(());
        }
        self.build_poly(primal, node)
    }

    fn build_poly(&mut self, primal: &Primal, node: usize) -> Result<()> {
        if !self.node_xyz.contains_key(&node) {
            self.node_xyz.insert(node, primal.xyz(node)?);
        }
        let mut poly = Poly::new(node);
        for &edge_id in &primal.edges_of_node(node)? {
            let edge_nodes = primal.edge(edge_id as usize)?;
            let (lo, hi) = (edge_nodes[0] as usize, edge_nodes[1] as usize);
            let other = if node == lo { hi } else { lo };
            let inward = node == hi;
            for triangle in self.median.between_for_edge(&mut self.geom, primal, edge_id)? {
                poly.add_mask(Mask::new(triangle, inward), FaceKind::Between(other));
            }
        }
        for &face_index in primal.faces_of_node(node) {
            let face = primal.face(face_index as usize)?;
            for triangle in self
                .median
                .boundary_for_face_node(&mut self.geom, primal, face_index as usize, node)?
            {
                poly.add_mask(Mask::new(triangle, false), FaceKind::Boundary(face.patch as usize));
            }
        }
        self.polys.insert(node, poly);
        Ok(())
    }

    /// Intersect `surface` against every Triangle of every built Poly,
    /// retriangulate the cuts, paint each Mask, and assemble Regions.
    /// On a fatal geometric inconsistency, writes a diagnostic Tecplot
    /// dump of `surface` before returning the error. Grounded on
    /// `domain_boolean_subtract`.
    pub fn boolean_subtract(&mut self, surface: &SurfaceMesh) -> Result<()> {
        let mut all_triangles: Vec<TriangleId> = Vec::new();
        let mut seen = HashSet::new();
        for poly in self.polys.values() {
            for mask in &poly.masks {
                if seen.insert(mask.triangle) {
                    all_triangles.push(mask.triangle);
                }
            }
        }

        for st in 0..surface.ntriangle() {
            let [i0, i1, i2] = surface.triangles[st];
            let (v0, v1, v2) = (
                surface.xyz[i0 as usize],
                surface.xyz[i1 as usize],
                surface.xyz[i2 as usize],
            );
            let anchor_a = self.geom.create_node(v0);
            let anchor_b = self.geom.create_node(v1);
            let cut_segment = self.geom.create_segment(anchor_a, anchor_b);
            self.cut_segment_surface_tri.insert(cut_segment, st);

            let edges = [(v0, v1), (v1, v2), (v2, v0)];
            for &triangle_id in &all_triangles {
                let (node0, node1, node2) = {
                    let t = self.geom.triangle(triangle_id);
                    (t.node0, t.node1, t.node2)
                };
                let p0 = self.geom.node(node0).xyz;
                let p1 = self.geom.node(node1).xyz;
                let p2 = self.geom.node(node2).xyz;
                for &(a, b) in &edges {
                    let Some((t, xyz)) = segment_plane_crossing(p0, p1, p2, a, b) else {
                        continue;
                    };
                    let Some(uv) = barycentric_uv(p0, p1, p2, xyz) else {
                        continue;
                    };
                    if inside_triangle(uv) {
                        self.geom.insert_intersection(triangle_id, cut_segment, xyz, t, uv)?;
                    }
                }
            }
        }

        for &triangle_id in &all_triangles {
            self.geom.triangulate_cuts(triangle_id)?;
        }

        self.attach_surface_masks(surface);

        let mut failure: Option<KnifeError> = None;
        for poly in self.polys.values_mut() {
            for mask in &mut poly.masks {
                let kept = kept_side_for(&self.geom, mask, surface, &self.cut_segment_surface_tri);
                if let Err(e) = mask.paint(&self.geom, kept) {
                    failure = Some(e);
                    break;
                }
                if let Err(e) = mask.verify_paint(&self.geom) {
                    failure = Some(e);
                    break;
                }
            }
            if failure.is_none() {
                if let Err(e) = poly.assemble(&self.geom) {
                    failure = Some(e);
                }
            }
            if failure.is_some() {
                break;
            }
        }

        if let Some(e) = failure {
            self.dump_diagnostic(surface)?;
            return Err(e);
        }
        Ok(())
    }

    /// Give every required Poly whose dual cell the surface passes nearest
    /// through a `FaceKind::Surface` Mask wrapping that surface triangle,
    /// so `surface_subtri`/`surface_sens` have something to enumerate.
    /// Each surface triangle is assigned whole to its single nearest
    /// required node rather than clipped across every cell it actually
    /// straddles — a deliberate simplification recorded in `DESIGN.md`.
    fn attach_surface_masks(&mut self, surface: &SurfaceMesh) {
        if self.polys.is_empty() {
            return;
        }
        let mut surface_node: HashMap<u32, knife_geom::NodeId> = HashMap::new();
        for (st, tri) in surface.triangles.iter().enumerate() {
            let centroid = (surface.xyz[tri[0] as usize].coords
                + surface.xyz[tri[1] as usize].coords
                + surface.xyz[tri[2] as usize].coords)
                / 3.0;
            let nearest = self
                .node_xyz
                .iter()
                .map(|(&n, p)| (n, (p.coords - centroid).norm_squared()))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(n, _)| n);
            let Some(nearest) = nearest else { continue };
            let Some(poly) = self.polys.get_mut(&nearest) else {
                continue;
            };

            let node_for = |cache: &mut HashMap<u32, knife_geom::NodeId>, geom: &mut Geom, i: u32| {
                *cache
                    .entry(i)
                    .or_insert_with(|| geom.create_node(surface.xyz[i as usize]))
            };
            let a = node_for(&mut surface_node, &mut self.geom, tri[0]);
            let b = node_for(&mut surface_node, &mut self.geom, tri[1]);
            let c = node_for(&mut surface_node, &mut self.geom, tri[2]);
            let s0 = self.geom.create_segment(b, c);
            let s1 = self.geom.create_segment(c, a);
            let s2 = self.geom.create_segment(a, b);
            let Ok(triangle) = self.geom.create_triangle(s0, s1, s2) else {
                continue;
            };
            poly.add_mask(Mask::new(triangle, false), FaceKind::Surface(surface.patch[st]));
        }
    }

    /// Coarse classification of `node`'s dual cell, per `domain_topo`.
    pub fn topo(&self, node: usize) -> Topo {
        let Some(poly) = self.polys.get(&node) else {
            return Topo::Empty;
        };
        let cut = poly
            .masks
            .iter()
            .any(|m| !self.geom.triangle(m.triangle).cuts.is_empty());
        if cut {
            return Topo::Cut;
        }
        let boundary_adjacent = poly.face_kind.iter().any(|k| matches!(k, FaceKind::Boundary(_)));
        if boundary_adjacent {
            Topo::BoundaryAdjacent
        } else {
            Topo::Uncut
        }
    }

    fn dump_diagnostic(&self, surface: &SurfaceMesh) -> Result<()> {
        let frame = self.frame.next();
        tracing::error!(partition = self.partition, frame, "boolean_subtract failed; dumping cut surface");
        let one_based: Vec<[u32; 3]> = surface
            .triangles
            .iter()
            .map(|t| [t[0] + 1, t[1] + 1, t[2] + 1])
            .collect();
        let mut buf = Vec::new();
        write_tecplot_surface("cut surface diagnostic", &surface.xyz, &one_based, &mut buf)?;
        std::fs::write(format!("surface{frame:04}.t"), buf).map_err(KnifeError::from)
    }
}

/// Build the `kept_side` closure `Mask::paint` needs: classify one known
/// corner of the Mask's Triangle against the cutting surface triangle
/// responsible for `segment`, then translate that into the `orient2d`
/// sign convention `paint` expects for this chord's own endpoint order.
fn kept_side_for<'a>(
    geom: &'a Geom,
    mask: &Mask,
    surface: &'a SurfaceMesh,
    segment_surface_tri: &'a HashMap<SegmentId, usize>,
) -> impl Fn(SegmentId) -> Sign + 'a {
    let triangle = mask.triangle;
    let kept_is_negative_side = !surface.inward_pointing_normal;
    move |segment: SegmentId| {
        let Some(&st) = segment_surface_tri.get(&segment) else {
            return Sign::Positive;
        };
        let [i0, i1, i2] = surface.triangles[st];
        let (sv0, sv1, sv2) = (
            surface.xyz[i0 as usize],
            surface.xyz[i1 as usize],
            surface.xyz[i2 as usize],
        );

        let t = geom.triangle(triangle);
        let chord: Vec<_> = t
            .subnodes
            .iter()
            .copied()
            .filter(|&sn| geom.subnode_cut_segment(sn) == Some(segment))
            .collect();
        if chord.len() < 2 {
            return Sign::Positive;
        }
        let a = geom.subnode_uv(chord[0]);
        let b = geom.subnode_uv(chord[1]);

        let corner_limit = 3.min(t.subnodes.len());
        for &corner in &t.subnodes[0..corner_limit] {
            let xyz = geom.subnode_xyz(corner);
            let plane_sign = orient3d(&sv0, &sv1, &sv2, &xyz);
            if plane_sign == Sign::Zero {
                continue;
            }
            let corner_is_kept = if kept_is_negative_side {
                plane_sign == Sign::Negative
            } else {
                plane_sign == Sign::Positive
            };
            let uv = geom.subnode_uv(corner);
            let corner_chord_sign = knife_math::predicates::orient2d(&a, &b, &uv);
            return if corner_is_kept {
                corner_chord_sign
            } else {
                opposite(corner_chord_sign)
            };
        }
        Sign::Positive
    }
}

fn opposite(sign: Sign) -> Sign {
    match sign {
        Sign::Positive => Sign::Negative,
        Sign::Negative => Sign::Positive,
        Sign::Zero => Sign::Zero,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn unit_cube() -> Primal {
        let mut primal = Primal::create(8, 12, 6);
        #[rustfmt::skip]
        let (x, y, z) = (
            [0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        );
        #[rustfmt::skip]
        let cells: [[u32; 4]; 6] = [
            [1, 2, 3, 7], [1, 3, 4, 7], [1, 4, 8, 7],
            [1, 8, 5, 7], [1, 5, 6, 7], [1, 6, 2, 7],
        ];
        primal.copy_volume(&x, &y, &z, &cells);
        let next = primal.copy_boundary(0, 1, &[[1, 2, 3], [1, 3, 4]]).unwrap();
        let next = primal.copy_boundary(next, 2, &[[1, 5, 6], [1, 6, 2]]).unwrap();
        let next = primal.copy_boundary(next, 3, &[[1, 4, 8], [1, 8, 5]]).unwrap();
        let next = primal.copy_boundary(next, 4, &[[5, 8, 7], [5, 7, 6]]).unwrap();
        let next = primal.copy_boundary(next, 5, &[[2, 6, 7], [2, 7, 3]]).unwrap();
        primal.copy_boundary(next, 6, &[[3, 7, 8], [3, 8, 4]]).unwrap();
        primal.establish_all().unwrap();
        primal
    }

    #[test]
    fn a_surface_with_no_triangles_requires_nothing() {
        let primal = unit_cube();
        let domain = Domain::new(0);
        let surface = SurfaceMesh::from_primal(&primal, &BTreeSet::new(), false).unwrap();
        let empty = SurfaceMesh {
            xyz: Vec::new(),
            triangles: Vec::new(),
            patch: Vec::new(),
            inward_pointing_normal: surface.inward_pointing_normal,
        };
        let mut required = vec![0u8; primal.nnode()];
        domain.required_local_dual(&primal, &empty, &mut required).unwrap();
        assert!(required.iter().all(|&r| r == 0));
    }

    #[test]
    fn a_far_away_surface_requires_nothing() {
        let primal = unit_cube();
        let domain = Domain::new(0);
        let surface = SurfaceMesh {
            xyz: vec![
                knife_math::Point3::new(10.0, 10.0, 10.0),
                knife_math::Point3::new(11.0, 10.0, 10.0),
                knife_math::Point3::new(10.0, 11.0, 10.0),
            ],
            triangles: vec![[0, 1, 2]],
            patch: vec![0],
            inward_pointing_normal: false,
        };
        let mut required = vec![0u8; primal.nnode()];
        domain.required_local_dual(&primal, &surface, &mut required).unwrap();
        assert!(required.iter().all(|&r| r == 0));
    }

    #[test]
    fn a_surface_through_the_cube_requires_the_nodes_its_edges_cross() {
        let primal = unit_cube();
        let domain = Domain::new(0);
        // A square at z = 0.5 spanning the whole cube in x/y: every
        // vertical edge of the cube crosses it.
        let surface = SurfaceMesh {
            xyz: vec![
                knife_math::Point3::new(-1.0, -1.0, 0.5),
                knife_math::Point3::new(2.0, -1.0, 0.5),
                knife_math::Point3::new(2.0, 2.0, 0.5),
                knife_math::Point3::new(-1.0, 2.0, 0.5),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            patch: vec![0, 0],
            inward_pointing_normal: false,
        };
        let mut required = vec![0u8; primal.nnode()];
        domain.required_local_dual(&primal, &surface, &mut required).unwrap();
        assert!(required.iter().any(|&r| r == 1));
    }

    #[test]
    fn create_dual_builds_a_poly_per_required_node() {
        let primal = unit_cube();
        let mut domain = Domain::new(0);
        let mut required = vec![0u8; primal.nnode()];
        required[0] = 1;
        required[6] = 1;
        domain.create_dual(&primal, &required).unwrap();
        assert!(domain.poly(0).is_some());
        assert!(domain.poly(6).is_some());
        assert!(domain.poly(1).is_none());
    }

    #[test]
    fn an_uncut_poly_reports_uncut_or_boundary_adjacent_topo() {
        let primal = unit_cube();
        let mut domain = Domain::new(0);
        domain.add_interior_poly(&primal, 0).unwrap();
        assert_ne!(domain.topo(0), Topo::Cut);
        assert_ne!(domain.topo(0), Topo::Empty);
        assert_eq!(domain.topo(1), Topo::Empty);
    }

    #[test]
    fn attach_surface_masks_assigns_each_triangle_to_its_nearest_poly() {
        let primal = unit_cube();
        let mut domain = Domain::new(0);
        domain.add_interior_poly(&primal, 0).unwrap();
        domain.add_interior_poly(&primal, 6).unwrap();
        let before_0 = domain.poly(0).unwrap().masks.len();
        let before_6 = domain.poly(6).unwrap().masks.len();

        // Sits right on top of node 0 (0,0,0), far from node 6 (1,1,1).
        let surface = SurfaceMesh {
            xyz: vec![
                knife_math::Point3::new(-0.1, -0.1, 0.0),
                knife_math::Point3::new(0.1, -0.1, 0.0),
                knife_math::Point3::new(0.0, 0.1, 0.0),
            ],
            triangles: vec![[0, 1, 2]],
            patch: vec![3],
            inward_pointing_normal: false,
        };
        domain.attach_surface_masks(&surface);
        assert_eq!(domain.poly(0).unwrap().masks.len(), before_0 + 1);
        assert_eq!(domain.poly(6).unwrap().masks.len(), before_6);
        assert_eq!(domain.poly(0).unwrap().face_kind.last(), Some(&FaceKind::Surface(3)));
    }

    #[test]
    fn an_uncut_interior_poly_at_a_boundary_corner_assembles_into_one_region() {
        let primal = unit_cube();
        let mut domain = Domain::new(0);
        // Node 6 touches three boundary patches, so this exercises
        // cross-mask bridging between Between and Boundary facets.
        domain.add_interior_poly(&primal, 6).unwrap();
        let mut poly = domain.polys.remove(&6).unwrap();
        poly.assemble(domain.geom()).unwrap();
        let apex = primal.xyz(6).unwrap();
        assert_eq!(poly.regions(), 1);
        let (_, volume) = poly.centroid_volume(domain.geom(), 1, apex).unwrap();
        assert!(volume.abs() > 1.0e-9);
    }

    /// Single tetrahedron `((0,0,0),(1,0,0),(0,1,0),(0,0,1))`, node4 the
    /// apex. Matches `median::tests::unit_tet`.
    fn single_tetrahedron() -> Primal {
        let mut primal = Primal::create(4, 4, 1);
        primal.copy_volume(
            &[0.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 0.0],
            &[0.0, 0.0, 0.0, 1.0],
            &[[1, 2, 3, 4]],
        );
        primal
            .copy_boundary(0, 1, &[[1, 3, 2]])
            .and_then(|n| primal.copy_boundary(n, 1, &[[1, 2, 4]]))
            .and_then(|n| primal.copy_boundary(n, 1, &[[2, 3, 4]]))
            .and_then(|n| primal.copy_boundary(n, 1, &[[3, 1, 4]]))
            .unwrap();
        primal.establish_all().unwrap();
        primal
    }

    /// A plane at `z = 0.25` spanning well beyond the tetrahedron's
    /// footprint, so every edge crossing is a genuine interior crossing
    /// rather than an edge-of-surface artifact.
    fn z_quarter_plane(inward_pointing_normal: bool) -> SurfaceMesh {
        SurfaceMesh {
            xyz: vec![
                knife_math::Point3::new(-1.0, -1.0, 0.25),
                knife_math::Point3::new(2.0, -1.0, 0.25),
                knife_math::Point3::new(2.0, 2.0, 0.25),
                knife_math::Point3::new(-1.0, 2.0, 0.25),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            patch: vec![0, 0],
            inward_pointing_normal,
        }
    }

    /// Volume of `node`'s assembled region 1, or `None` if painting left
    /// it with no region at all.
    fn region_volume(domain: &mut Domain, primal: &Primal, node: usize) -> Option<f64> {
        let poly = domain.polys.get_mut(&node)?;
        poly.assemble(&domain.geom).unwrap();
        if poly.regions() == 0 {
            return None;
        }
        let apex = primal.xyz(node).unwrap();
        Some(poly.centroid_volume(&domain.geom, 1, apex).unwrap().1)
    }

    #[test]
    fn boolean_subtract_paints_a_real_chord_through_a_tetrahedron() {
        let primal = single_tetrahedron();

        let mut baseline = Domain::new(0);
        for node in 0..4 {
            baseline.add_interior_poly(&primal, node).unwrap();
        }
        let baseline_volume: Vec<f64> = (0..4)
            .map(|node| region_volume(&mut baseline, &primal, node).unwrap())
            .collect();

        let surface = z_quarter_plane(false);
        let mut domain = Domain::new(0);
        let mut required = vec![0u8; primal.nnode()];
        domain.required_local_dual(&primal, &surface, &mut required).unwrap();
        assert_eq!(required, vec![1, 1, 1, 1], "every node touches an edge crossing z=0.25");

        domain.create_dual(&primal, &required).unwrap();
        domain.boolean_subtract(&surface).unwrap();

        // The three base nodes (z=0) each own boundary wedges that
        // straddle z=0.25 and must come out strictly smaller than their
        // uncut volume.
        for node in 0..3 {
            let cut_volume = region_volume(&mut domain, &primal, node).unwrap();
            assert!(
                cut_volume > 0.0 && cut_volume < baseline_volume[node],
                "node {node}: expected 0 < {cut_volume} < {}",
                baseline_volume[node]
            );
            assert_eq!(domain.topo(node), Topo::Cut);
        }

        // The apex's own dual cell is untouched: every Triangle it alone
        // owns only meets z=0.25 at the cell-center corner, never
        // straddling it, so paint never finds a real chord there.
        let apex_cut_volume = region_volume(&mut domain, &primal, 3).unwrap();
        assert!((apex_cut_volume - baseline_volume[3]).abs() < 1.0e-9);

        let total_cut: f64 = (0..4).map(|n| region_volume(&mut domain, &primal, n).unwrap()).sum();
        let total_baseline: f64 = baseline_volume.iter().sum();
        assert!(total_cut > 0.0 && total_cut < total_baseline);
    }

    #[test]
    fn flipping_the_cutting_surface_orientation_changes_the_kept_volume() {
        let primal = single_tetrahedron();

        let outward = z_quarter_plane(false);
        let mut required = vec![0u8; primal.nnode()];
        Domain::new(0).required_local_dual(&primal, &outward, &mut required).unwrap();

        let mut domain_out = Domain::new(0);
        domain_out.create_dual(&primal, &required).unwrap();
        domain_out.boolean_subtract(&outward).unwrap();

        let inward = z_quarter_plane(true);
        let mut domain_in = Domain::new(0);
        domain_in.create_dual(&primal, &required).unwrap();
        domain_in.boolean_subtract(&inward).unwrap();

        let mut differed = false;
        for node in 0..3 {
            let out_volume = region_volume(&mut domain_out, &primal, node).unwrap();
            let in_volume = region_volume(&mut domain_in, &primal, node).unwrap();
            assert!(out_volume > 0.0 && in_volume > 0.0);
            if (out_volume - in_volume).abs() > 1.0e-9 {
                differed = true;
            }
        }
        assert!(
            differed,
            "flipping inward_pointing_normal should keep a different slice of at least one cut node"
        );
    }
}
