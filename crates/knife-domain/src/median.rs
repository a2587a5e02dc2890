//! Median-dual construction: the Between and Boundary Triangles of a
//! primal node's dual polyhedron, built by fanning primal-edge and
//! boundary-face contributions out to cell and face centers. Grounded on
//! `knife_fortran.c`'s description of the vertex-centered dual and on
//! `poly.h`'s `FaceKind` split between "between" and "boundary" facets.
//!
//! Geometry is cached by primal entity id (node, edge, face, cell) so a
//! dual facet shared by two neighbouring Polys is built exactly once and
//! referenced by both — required for [`knife_cut::Mask`]'s directed-area
//! and volume contributions to cancel between them.

use knife_core::{KnifeError, Result};
use knife_geom::{Geom, NodeId, SegmentId, TriangleId};
use knife_primal::{topology::TET_FACES, Primal};
use std::collections::HashMap;

#[derive(Default)]
pub struct MedianCache {
    primal_node: HashMap<usize, NodeId>,
    edge_mid: HashMap<u32, NodeId>,
    face_center: HashMap<u32, NodeId>,
    cell_center: HashMap<usize, NodeId>,
    segments: HashMap<(NodeId, NodeId), SegmentId>,
    between: HashMap<u32, Vec<TriangleId>>,
    boundary: HashMap<(usize, usize), [TriangleId; 2]>,
}

impl MedianCache {
    fn get_or_make_primal_node(&mut self, geom: &mut Geom, primal: &Primal, node: usize) -> Result<NodeId> {
        if let Some(&id) = self.primal_node.get(&node) {
            return Ok(id);
        }
        let id = geom.create_node(primal.xyz(node)?);
        self.primal_node.insert(node, id);
        Ok(id)
    }

    fn get_or_make_edge_mid(&mut self, geom: &mut Geom, primal: &Primal, edge_id: u32) -> Result<NodeId> {
        if let Some(&id) = self.edge_mid.get(&edge_id) {
            return Ok(id);
        }
        let id = geom.create_node(primal.edge_center(edge_id as usize)?);
        self.edge_mid.insert(edge_id, id);
        Ok(id)
    }

    fn get_or_make_face_center(&mut self, geom: &mut Geom, primal: &Primal, tri_id: u32) -> Result<NodeId> {
        if let Some(&id) = self.face_center.get(&tri_id) {
            return Ok(id);
        }
        let id = geom.create_node(primal.tri_center(tri_id as usize)?);
        self.face_center.insert(tri_id, id);
        Ok(id)
    }

    fn get_or_make_cell_center(&mut self, geom: &mut Geom, primal: &Primal, cell: usize) -> Result<NodeId> {
        if let Some(&id) = self.cell_center.get(&cell) {
            return Ok(id);
        }
        let id = geom.create_node(primal.cell_center(cell)?);
        self.cell_center.insert(cell, id);
        Ok(id)
    }

    /// The center node of the boundary patch face at `face_index`, shared
    /// with whichever `Between` triangle fans through the same tet face —
    /// a boundary patch face and the cell face it closes are the same
    /// triangle in `Primal`'s unique-triangle table, so without this
    /// sharing `Poly::assemble` could never bridge a Boundary Mask to the
    /// Between Mask it borders.
    fn get_or_make_boundary_center(&mut self, geom: &mut Geom, primal: &Primal, face_index: usize) -> Result<NodeId> {
        let face = primal.face(face_index)?;
        let tri_id = primal.find_tri(face.nodes[0], face.nodes[1], face.nodes[2])?;
        self.get_or_make_face_center(geom, primal, tri_id)
    }

    fn get_or_make_segment(&mut self, geom: &mut Geom, a: NodeId, b: NodeId) -> SegmentId {
        let key = if a <= b { (a, b) } else { (b, a) };
        *self.segments.entry(key).or_insert_with(|| geom.create_segment(a, b))
    }

    fn make_triangle(&mut self, geom: &mut Geom, a: NodeId, b: NodeId, c: NodeId) -> Result<TriangleId> {
        let s0 = self.get_or_make_segment(geom, b, c);
        let s1 = self.get_or_make_segment(geom, c, a);
        let s2 = self.get_or_make_segment(geom, a, b);
        geom.create_triangle(s0, s1, s2)
    }

    /// The Between Triangles straddling primal edge `edge_id`, built once
    /// and shared by both of the edge's endpoint Polys. Each incident cell
    /// contributes two Triangles, fanning from the edge midpoint through
    /// the cell center to the two tet faces that bound the edge within
    /// that cell.
    pub fn between_for_edge(&mut self, geom: &mut Geom, primal: &Primal, edge_id: u32) -> Result<Vec<TriangleId>> {
        if let Some(existing) = self.between.get(&edge_id) {
            return Ok(existing.clone());
        }
        let nodes = primal.edge(edge_id as usize)?;
        let (i, j) = (nodes[0], nodes[1]);
        let mid = self.get_or_make_edge_mid(geom, primal, edge_id)?;

        let mut triangles = Vec::new();
        for &cell_u32 in primal.cells_of_node(i as usize) {
            let cell = cell_u32 as usize;
            let cell_nodes = primal.cell(cell)?;
            if !cell_nodes.contains(&j) {
                continue;
            }
            let local_i = cell_nodes.iter().position(|&n| n == i).unwrap();
            let local_j = cell_nodes.iter().position(|&n| n == j).unwrap();
            let sides: Vec<usize> = (0..4)
                .filter(|&s| {
                    let f = TET_FACES[s];
                    f.contains(&local_i) && f.contains(&local_j)
                })
                .collect();
            if sides.len() != 2 {
                return Err(KnifeError::Inconsistent(
                    "primal edge does not bound exactly two faces of an incident cell".into(),
                ));
            }

            let center = self.get_or_make_cell_center(geom, primal, cell)?;
            let mut face_nodes = Vec::with_capacity(2);
            for &side in &sides {
                let f = TET_FACES[side];
                let global = [cell_nodes[f[0]], cell_nodes[f[1]], cell_nodes[f[2]]];
                let tri_id = primal.find_tri(global[0], global[1], global[2])?;
                face_nodes.push(self.get_or_make_face_center(geom, primal, tri_id)?);
            }

            triangles.push(self.make_triangle(geom, mid, face_nodes[0], center)?);
            triangles.push(self.make_triangle(geom, mid, center, face_nodes[1])?);
        }

        self.between.insert(edge_id, triangles.clone());
        Ok(triangles)
    }

    /// The two Boundary Triangles of primal boundary face `face_index`
    /// belonging to `node`, fanning from `node` through the face center to
    /// the midpoints of `node`'s two edges on that face.
    pub fn boundary_for_face_node(
        &mut self,
        geom: &mut Geom,
        primal: &Primal,
        face_index: usize,
        node: usize,
    ) -> Result<[TriangleId; 2]> {
        if let Some(&existing) = self.boundary.get(&(face_index, node)) {
            return Ok(existing);
        }
        let face = primal.face(face_index)?;
        let local = face
            .nodes
            .iter()
            .position(|&n| n as usize == node)
            .ok_or_else(|| KnifeError::Inconsistent("node is not on the given boundary face".into()))?;
        let a = face.nodes[(local + 1) % 3];
        let b = face.nodes[(local + 2) % 3];

        let node_id = self.get_or_make_primal_node(geom, primal, node)?;
        let edge_a = primal.find_edge(node as u32, a)?;
        let edge_b = primal.find_edge(node as u32, b)?;
        let mid_a = self.get_or_make_edge_mid(geom, primal, edge_a)?;
        let mid_b = self.get_or_make_edge_mid(geom, primal, edge_b)?;
        let center = self.get_or_make_boundary_center(geom, primal, face_index)?;

        let tri1 = self.make_triangle(geom, node_id, mid_a, center)?;
        let tri2 = self.make_triangle(geom, node_id, center, mid_b)?;
        let result = [tri1, tri2];
        self.boundary.insert((face_index, node), result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knife_primal::Primal;

    fn unit_tet() -> Primal {
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

    #[test]
    fn between_triangles_for_an_edge_are_cached_by_edge_id() {
        let primal = unit_tet();
        let mut geom = Geom::default();
        let mut cache = MedianCache::default();
        let edge_id = primal.find_edge(0, 1).unwrap();
        let first = cache.between_for_edge(&mut geom, &primal, edge_id).unwrap();
        let second = cache.between_for_edge(&mut geom, &primal, edge_id).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn boundary_triangles_for_a_face_node_are_cached() {
        let primal = unit_tet();
        let mut geom = Geom::default();
        let mut cache = MedianCache::default();
        let first = cache.boundary_for_face_node(&mut geom, &primal, 0, 0).unwrap();
        let second = cache.boundary_for_face_node(&mut geom, &primal, 0, 0).unwrap();
        assert_eq!(first, second);
    }
}
