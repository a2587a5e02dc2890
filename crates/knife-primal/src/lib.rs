#![warn(missing_docs)]

//! The primal tetrahedral volume mesh: nodes, boundary faces, cells, and
//! the edge/triangle connectivity derived from them.

mod adjacency;
pub mod topology;

use adjacency::AdjacencyIndex;
use knife_core::{KnifeError, Result};
use knife_math::{Point3, Transform, Vec3};
use std::collections::BTreeSet;
use topology::{TET_EDGES, TET_FACES};

/// A boundary triangle with the patch (boundary condition) id it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub nodes: [u32; 3],
    pub patch: u32,
}

/// Connectivity derived from the cell list by [`Primal::establish_all`]:
/// unique edges, unique triangles, and which volume nodes sit on the
/// surface.
#[derive(Debug, Default, Clone)]
struct Connectivity {
    c2e: Vec<[u32; 6]>,
    e2n: Vec<[u32; 2]>,
    c2t: Vec<[u32; 4]>,
    t2n: Vec<[u32; 3]>,
    surface_node: Vec<Option<u32>>,
    surface_volume_node: Vec<u32>,
}

/// The tetrahedral primal mesh: node coordinates, boundary faces, cells,
/// and (once [`Primal::establish_all`] has run) derived edges/triangles.
#[derive(Debug, Clone)]
pub struct Primal {
    xyz: Vec<Point3>,
    faces: Vec<Face>,
    cells: Vec<[u32; 4]>,
    cell_adj: AdjacencyIndex,
    face_adj: AdjacencyIndex,
    conn: Option<Connectivity>,
}

impl Primal {
    /// Allocate an empty mesh with room for `nnode` nodes, `nface` boundary
    /// faces, and `ncell` tetrahedra.
    pub fn create(nnode: usize, nface: usize, ncell: usize) -> Self {
        Self {
            xyz: vec![Point3::origin(); nnode],
            faces: vec![
                Face {
                    nodes: [0, 0, 0],
                    patch: 0
                };
                nface
            ],
            cells: vec![[0, 0, 0, 0]; ncell],
            cell_adj: AdjacencyIndex::with_node_count(nnode),
            face_adj: AdjacencyIndex::with_node_count(nnode),
            conn: None,
        }
    }

    pub fn nnode(&self) -> usize {
        self.xyz.len()
    }

    pub fn nface(&self) -> usize {
        self.faces.len()
    }

    pub fn ncell(&self) -> usize {
        self.cells.len()
    }

    pub fn nedge(&self) -> Result<usize> {
        Ok(self.connectivity()?.e2n.len())
    }

    pub fn ntri(&self) -> Result<usize> {
        Ok(self.connectivity()?.t2n.len())
    }

    fn connectivity(&self) -> Result<&Connectivity> {
        self.conn.as_ref().ok_or_else(|| {
            KnifeError::Inconsistent("connectivity not established; call establish_all".into())
        })
    }

    /// Copy volume-mesh coordinates and zero-based cell connectivity
    /// (`c2n` one-based, as delivered at the FFI boundary) into the mesh.
    pub fn copy_volume(&mut self, x: &[f64], y: &[f64], z: &[f64], c2n_one_based: &[[u32; 4]]) {
        for (i, p) in self.xyz.iter_mut().enumerate() {
            *p = Point3::new(x[i], y[i], z[i]);
        }
        for (cell, nodes) in c2n_one_based.iter().enumerate() {
            let zero_based = nodes.map(|n| n - 1);
            self.cells[cell] = zero_based;
            for n in zero_based {
                self.cell_adj.add(n, cell as u32);
            }
        }
    }

    /// Append `nface` boundary faces tagged with `patch`, given one-based
    /// node indices. `start` is the index of the first face slot to fill,
    /// matching the original's running `nface_added` counter without
    /// relying on a process-global.
    pub fn copy_boundary(
        &mut self,
        start: usize,
        patch: u32,
        f2n_one_based: &[[u32; 3]],
    ) -> Result<usize> {
        let mut added = start;
        for nodes in f2n_one_based {
            if added >= self.faces.len() {
                return Err(KnifeError::ArrayBound(
                    "copy_boundary: more faces than allocated".into(),
                ));
            }
            let zero_based = nodes.map(|n| n - 1);
            for n in zero_based {
                if n as usize >= self.nnode() {
                    return Err(KnifeError::ArrayBound(format!(
                        "copy_boundary: node {n} out of range"
                    )));
                }
            }
            self.faces[added] = Face {
                nodes: zero_based,
                patch,
            };
            for n in zero_based {
                self.face_adj.add(n, added as u32);
            }
            added += 1;
        }
        Ok(added)
    }

    /// Derive edges, triangles, and the surface-node map, in that order,
    /// matching `primal_establish_all`.
    pub fn establish_all(&mut self) -> Result<()> {
        self.establish_c2e();
        self.establish_c2t();
        self.establish_surface_node()?;
        Ok(())
    }

    fn cell_edge_nodes(&self, cell: usize, edge: usize) -> (u32, u32) {
        let (a, b) = TET_EDGES[edge];
        let nodes = self.cells[cell];
        (nodes[a], nodes[b])
    }

    fn establish_c2e(&mut self) {
        let ncell = self.ncell();
        let mut c2e = vec![[u32::MAX; 6]; ncell];
        let mut e2n = Vec::new();

        for cell in 0..ncell {
            for edge in 0..6 {
                if c2e[cell][edge] != u32::MAX {
                    continue;
                }
                let (node0, node1) = self.cell_edge_nodes(cell, edge);
                let index = e2n.len() as u32;
                // Tag this edge on every cell touching either endpoint.
                for &node in &[node0, node1] {
                    for &candidate_cell in self.cell_adj.of(node) {
                        for candidate_edge in 0..6 {
                            let (n0, n1) =
                                self.cell_edge_nodes(candidate_cell as usize, candidate_edge);
                            let matches = (n0 == node0 && n1 == node1)
                                || (n0 == node1 && n1 == node0);
                            if matches {
                                c2e[candidate_cell as usize][candidate_edge] = index;
                            }
                        }
                    }
                }
                e2n.push([node0.min(node1), node0.max(node1)]);
            }
        }

        self.conn.get_or_insert_with(Connectivity::default).c2e = c2e;
        self.conn.get_or_insert_with(Connectivity::default).e2n = e2n;
    }

    fn cell_side_nodes(&self, cell: usize, side: usize) -> (u32, u32, u32) {
        let face = TET_FACES[side];
        let nodes = self.cells[cell];
        (nodes[face[0]], nodes[face[1]], nodes[face[2]])
    }

    fn find_cell_side_raw(&self, node0: u32, node1: u32, node2: u32) -> Option<(u32, usize)> {
        for &cell in self.cell_adj.of(node0) {
            for side in 0..4 {
                let (n0, n1, n2) = self.cell_side_nodes(cell as usize, side);
                let rotated = (n0 == node0 && n1 == node1 && n2 == node2)
                    || (n1 == node0 && n2 == node1 && n0 == node2)
                    || (n2 == node0 && n0 == node1 && n1 == node2);
                if rotated {
                    return Some((cell, side));
                }
            }
        }
        None
    }

    fn establish_c2t(&mut self) {
        let ncell = self.ncell();
        let mut c2t = vec![[u32::MAX; 4]; ncell];
        let mut t2n = Vec::new();

        for cell in 0..ncell {
            for side in 0..4 {
                if c2t[cell][side] != u32::MAX {
                    continue;
                }
                let tri_index = t2n.len() as u32;
                c2t[cell][side] = tri_index;
                let (n0, n1, n2) = self.cell_side_nodes(cell, side);
                if let Some((other_cell, other_side)) = self.find_cell_side_raw(n1, n0, n2) {
                    c2t[other_cell as usize][other_side] = tri_index;
                }
                let mut sorted = [n0, n1, n2];
                sorted.sort_unstable();
                t2n.push(sorted);
            }
        }

        self.conn.get_or_insert_with(Connectivity::default).c2t = c2t;
        self.conn.get_or_insert_with(Connectivity::default).t2n = t2n;
    }

    fn establish_surface_node(&mut self) -> Result<()> {
        let mut surface_node = vec![None; self.nnode()];
        let mut surface_volume_node = Vec::new();

        for face in &self.faces {
            for &node in &face.nodes {
                if node as usize >= self.nnode() {
                    return Err(KnifeError::ArrayBound(format!(
                        "surface node {node} out of range"
                    )));
                }
                if surface_node[node as usize].is_none() {
                    surface_node[node as usize] = Some(surface_volume_node.len() as u32);
                    surface_volume_node.push(node);
                }
            }
        }

        let conn = self.conn.get_or_insert_with(Connectivity::default);
        conn.surface_node = surface_node;
        conn.surface_volume_node = surface_volume_node;
        Ok(())
    }

    pub fn xyz(&self, node: usize) -> Result<Point3> {
        self.xyz
            .get(node)
            .copied()
            .ok_or_else(|| KnifeError::ArrayBound(format!("node {node} out of range")))
    }

    pub fn face(&self, index: usize) -> Result<Face> {
        self.faces
            .get(index)
            .copied()
            .ok_or_else(|| KnifeError::ArrayBound(format!("face {index} out of range")))
    }

    pub fn cell(&self, index: usize) -> Result<[u32; 4]> {
        self.cells
            .get(index)
            .copied()
            .ok_or_else(|| KnifeError::ArrayBound(format!("cell {index} out of range")))
    }

    pub fn edge(&self, index: usize) -> Result<[u32; 2]> {
        self.connectivity()?
            .e2n
            .get(index)
            .copied()
            .ok_or_else(|| KnifeError::ArrayBound(format!("edge {index} out of range")))
    }

    pub fn tri(&self, index: usize) -> Result<[u32; 3]> {
        self.connectivity()?
            .t2n
            .get(index)
            .copied()
            .ok_or_else(|| KnifeError::ArrayBound(format!("tri {index} out of range")))
    }

    pub fn cell_center(&self, index: usize) -> Result<Point3> {
        let nodes = self.cell(index)?;
        let sum: Vec3 = nodes.iter().try_fold(Vec3::zeros(), |acc, &n| {
            Ok::<_, KnifeError>(acc + self.xyz(n as usize)?.coords)
        })?;
        Ok(Point3::from(sum * 0.25))
    }

    pub fn edge_center(&self, index: usize) -> Result<Point3> {
        let nodes = self.edge(index)?;
        let a = self.xyz(nodes[0] as usize)?;
        let b = self.xyz(nodes[1] as usize)?;
        Ok(Point3::from((a.coords + b.coords) * 0.5))
    }

    pub fn tri_center(&self, index: usize) -> Result<Point3> {
        let nodes = self.tri(index)?;
        let sum: Vec3 = nodes.iter().try_fold(Vec3::zeros(), |acc, &n| {
            Ok::<_, KnifeError>(acc + self.xyz(n as usize)?.coords)
        })?;
        Ok(Point3::from(sum * (1.0 / 3.0)))
    }

    /// True if `node` lies on the boundary surface, per `establish_surface_node`.
    pub fn is_surface_node(&self, node: usize) -> Result<bool> {
        Ok(self.connectivity()?.surface_node[node].is_some())
    }

    /// The cells touching `node`, for median-dual construction.
    pub fn cells_of_node(&self, node: usize) -> &[u32] {
        self.cell_adj.of(node as u32)
    }

    /// The boundary faces touching `node`, for median-dual construction.
    pub fn faces_of_node(&self, node: usize) -> &[u32] {
        self.face_adj.of(node as u32)
    }

    /// The edges incident to `node`, for median-dual construction.
    pub fn edges_of_node(&self, node: usize) -> Result<Vec<u32>> {
        Ok(self
            .connectivity()?
            .e2n
            .iter()
            .enumerate()
            .filter(|(_, e)| e[0] as usize == node || e[1] as usize == node)
            .map(|(i, _)| i as u32)
            .collect())
    }

    pub fn find_cell_side(&self, node0: u32, node1: u32, node2: u32) -> Result<(u32, usize)> {
        self.find_cell_side_raw(node0, node1, node2)
            .ok_or_else(|| KnifeError::NotFound("cell side not found".into()))
    }

    pub fn find_edge(&self, node0: u32, node1: u32) -> Result<u32> {
        for &cell in self.cell_adj.of(node0) {
            for edge in 0..6 {
                let (n0, n1) = self.cell_edge_nodes(cell as usize, edge);
                if (n0 == node0 && n1 == node1) || (n0 == node1 && n1 == node0) {
                    return Ok(self.connectivity()?.c2e[cell as usize][edge]);
                }
            }
        }
        Err(KnifeError::NotFound("edge not found".into()))
    }

    pub fn find_tri(&self, node0: u32, node1: u32, node2: u32) -> Result<u32> {
        if let Some((cell, side)) = self.find_cell_side_raw(node0, node1, node2) {
            return Ok(self.connectivity()?.c2t[cell as usize][side]);
        }
        if let Some((cell, side)) = self.find_cell_side_raw(node1, node0, node2) {
            return Ok(self.connectivity()?.c2t[cell as usize][side]);
        }
        Err(KnifeError::NotFound("triangle not found".into()))
    }

    pub fn find_tri_side(&self, tri: usize, node0: u32, node1: u32) -> Result<usize> {
        let nodes = self.tri(tri)?;
        for (side, &(a, b)) in topology::TRI_SIDES.iter().enumerate() {
            let (n0, n1) = (nodes[a], nodes[b]);
            if (n0 == node0 && n1 == node1) || (n0 == node1 && n1 == node0) {
                return Ok(side);
            }
        }
        Err(KnifeError::NotFound("triangle side not found".into()))
    }

    /// Apply an affine transform to every node, as used by the `translate`/
    /// `rotate`/`scale` knife script directives.
    pub fn apply_transform(&mut self, transform: &Transform) {
        for p in &mut self.xyz {
            *p = transform.apply_point(p);
        }
    }

    /// `flip_yz` script directive: swap the y and z coordinates.
    pub fn flip_yz(&mut self) {
        for p in &mut self.xyz {
            *p = Point3::new(p.x, -p.z, p.y);
        }
    }

    /// `flip_zy` script directive: the inverse axis swap.
    pub fn flip_zy(&mut self) {
        for p in &mut self.xyz {
            *p = Point3::new(p.x, p.z, -p.y);
        }
    }

    /// `reflect_y` script directive: mirror across the `y = 0` plane.
    pub fn reflect_y(&mut self) {
        for p in &mut self.xyz {
            *p = Point3::new(p.x, -p.y, p.z);
        }
    }

    /// Displace node `node` by `delta`, as used by the `massoud` script
    /// directive to apply a per-node aeroelastic deformation.
    pub fn displace_node(&mut self, node: usize, delta: Vec3) -> Result<()> {
        let p = self
            .xyz
            .get_mut(node)
            .ok_or_else(|| KnifeError::ArrayBound(format!("node {node} out of range")))?;
        *p += delta;
        Ok(())
    }

    /// Reverse the winding of every boundary face, flipping its normal.
    pub fn flip_face_normals(&mut self) {
        for face in &mut self.faces {
            face.nodes.swap(0, 1);
        }
    }

    /// Build a new `Primal` keeping only boundary faces whose patch id is
    /// in `patches`, with their nodes renumbered contiguously and patch ids
    /// renumbered in order of first appearance. Per the knife script's
    /// `faces id...` directive, a subset is taken purely for surface-mesh
    /// extraction: it carries no cells (`ncell` is always zero) and no
    /// volume connectivity — only the kept faces and the nodes they touch.
    /// `establish_all` is run on the result so `nedge`/`ntri` return `Ok(0)`
    /// rather than the "connectivity not established" error.
    pub fn subset(&self, patches: &BTreeSet<u32>) -> Primal {
        let mut node_old_to_new: Vec<Option<u32>> = vec![None; self.nnode()];
        let mut patch_old_to_new: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();
        let mut kept_faces = Vec::new();
        for face in &self.faces {
            if !patches.contains(&face.patch) {
                continue;
            }
            for &n in &face.nodes {
                if node_old_to_new[n as usize].is_none() {
                    node_old_to_new[n as usize] = Some(0);
                }
            }
            // One-based patch ids renumbered in order of first appearance.
            let next = patch_old_to_new.len() as u32 + 1;
            patch_old_to_new.entry(face.patch).or_insert(next);
            kept_faces.push(*face);
        }

        let mut new_xyz = Vec::new();
        for (old, slot) in node_old_to_new.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(new_xyz.len() as u32);
                new_xyz.push(self.xyz[old]);
            }
        }

        let mut subset = Primal::create(new_xyz.len(), kept_faces.len(), 0);
        subset.xyz = new_xyz;
        for (i, face) in kept_faces.into_iter().enumerate() {
            let remapped = face.nodes.map(|n| node_old_to_new[n as usize].unwrap());
            subset.faces[i] = Face {
                nodes: remapped,
                patch: patch_old_to_new[&face.patch],
            };
            for n in remapped {
                subset.face_adj.add(n, i as u32);
            }
        }
        subset
            .establish_all()
            .expect("subset faces reference only subset-local nodes");
        subset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A unit cube split into six tetrahedra sharing the long diagonal,
    /// used throughout the test suite (scenario A/B/E in `SPEC_FULL.md`).
    fn unit_cube() -> Primal {
        let corners: [[f64; 3]; 8] = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        // Six tets sharing the 0-6 diagonal, one-based as delivered at the
        // FFI boundary.
        let cells_one_based: [[u32; 4]; 6] = [
            [1, 2, 3, 7],
            [1, 3, 4, 7],
            [1, 4, 8, 7],
            [1, 8, 5, 7],
            [1, 5, 6, 7],
            [1, 6, 2, 7],
        ];
        let mut primal = Primal::create(8, 0, 6);
        let x: Vec<f64> = corners.iter().map(|c| c[0]).collect();
        let y: Vec<f64> = corners.iter().map(|c| c[1]).collect();
        let z: Vec<f64> = corners.iter().map(|c| c[2]).collect();
        primal.copy_volume(&x, &y, &z, &cells_one_based);
        primal
    }

    #[test]
    fn establish_all_derives_consistent_edges_and_tris() {
        let mut primal = unit_cube();
        primal.establish_all().unwrap();
        // Each tet has 6 edges, each boundary-free interior edge shared;
        // the unique-edge count must be far less than 6 * 6 = 36, and every
        // (edge, cell) pair must resolve back through find_edge.
        assert!(primal.nedge().unwrap() > 0);
        assert!(primal.nedge().unwrap() < 36);
        for cell in 0..primal.ncell() {
            let nodes = primal.cell(cell).unwrap();
            for &(a, b) in &TET_EDGES {
                let edge = primal.find_edge(nodes[a], nodes[b]).unwrap();
                assert!(edge < primal.nedge().unwrap() as u32);
            }
        }
    }

    #[test]
    fn every_interior_triangle_is_shared_by_two_cells() {
        let mut primal = unit_cube();
        primal.establish_all().unwrap();
        let mut tri_cell_count = vec![0u32; primal.ntri().unwrap()];
        for cell in 0..primal.ncell() {
            for side in 0..4 {
                let (n0, n1, n2) = primal.cell_side_nodes(cell, side);
                let tri = primal.find_tri(n0, n1, n2).unwrap();
                tri_cell_count[tri as usize] += 1;
            }
        }
        // boundary triangles are touched once, interior ones twice.
        assert!(tri_cell_count.iter().all(|&c| c == 1 || c == 2));
        assert!(tri_cell_count.iter().any(|&c| c == 2));
    }

    #[test]
    fn cell_center_uses_all_four_nodes() {
        let mut primal = unit_cube();
        primal.establish_all().unwrap();
        let center = primal.cell_center(0).unwrap();
        let nodes = primal.cell(0).unwrap();
        let expected: Point3 = Point3::from(
            nodes
                .iter()
                .map(|&n| primal.xyz(n as usize).unwrap().coords)
                .sum::<Vec3>()
                * 0.25,
        );
        assert!((center - expected).norm() < 1e-12);
    }

    #[test]
    fn translate_moves_every_node() {
        let mut primal = unit_cube();
        let before = primal.xyz(0).unwrap();
        primal.apply_transform(&Transform::translation(1.0, 2.0, 3.0));
        let after = primal.xyz(0).unwrap();
        assert!((after - before - Vec3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn flip_yz_swaps_coordinates() {
        let mut primal = unit_cube();
        primal.flip_yz();
        let p = primal.xyz(5).unwrap(); // originally (1,0,1)
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y + 1.0).abs() < 1e-12);
        assert!(p.z.abs() < 1e-12);
    }

    #[test]
    fn subset_keeps_only_matching_patches() {
        let mut primal = Primal::create(4, 2, 0);
        primal.copy_volume(
            &[0.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 0.0],
            &[0.0, 0.0, 0.0, 1.0],
            &[],
        );
        primal
            .copy_boundary(0, 1, &[[1, 2, 3]])
            .and_then(|next| primal.copy_boundary(next, 2, &[[1, 2, 4]]))
            .unwrap();

        let mut wanted = BTreeSet::new();
        wanted.insert(1);
        let subset = primal.subset(&wanted);
        assert_eq!(subset.nface(), 1);
        assert_eq!(subset.nnode(), 3);
    }

    #[test]
    fn subset_renumbers_patch_ids_by_first_appearance() {
        let mut primal = Primal::create(5, 2, 0);
        primal.copy_volume(
            &[0.0, 1.0, 0.0, 0.0, 1.0],
            &[0.0, 0.0, 1.0, 0.0, 1.0],
            &[0.0, 0.0, 0.0, 1.0, 1.0],
            &[],
        );
        primal
            .copy_boundary(0, 3, &[[1, 2, 3]])
            .and_then(|next| primal.copy_boundary(next, 7, &[[1, 2, 4]]))
            .unwrap();

        let mut wanted = BTreeSet::new();
        wanted.insert(3);
        wanted.insert(7);
        let subset = primal.subset(&wanted);
        let max_patch = (0..subset.nface())
            .map(|i| subset.face(i).unwrap().patch)
            .max()
            .unwrap();
        assert_eq!(max_patch, 2);
    }
}
