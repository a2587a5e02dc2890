//! Canonical local numbering for a linear tetrahedron.
//!
//! Not present in the retrieved source (the `primal_cell_edge_node0/1` and
//! `primal_cell_side_node0/1/2` macros live in a header that wasn't part of
//! the retrieval); reconstructed here as the standard six-edge, four-face
//! tables, chosen so a positively-oriented tet `(n0, n1, n2, n3)` produces
//! outward-pointing face normals. See `DESIGN.md` Open Question 1.

/// The six edges of a tetrahedron, as local node index pairs.
pub const TET_EDGES: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

/// The four faces of a tetrahedron, each opposite the node of the same
/// index, listed so the winding is outward-facing for a positively
/// oriented tet.
pub const TET_FACES: [[usize; 3]; 4] = [[1, 3, 2], [0, 2, 3], [0, 3, 1], [0, 1, 2]];

/// The three sides (edges) of a triangle, as local node index pairs.
pub const TRI_SIDES: [(usize, usize); 3] = [(0, 1), (1, 2), (2, 0)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_node_appears_in_three_edges() {
        let mut count = [0u32; 4];
        for &(a, b) in &TET_EDGES {
            count[a] += 1;
            count[b] += 1;
        }
        assert_eq!(count, [3, 3, 3, 3]);
    }

    #[test]
    fn every_face_omits_its_opposite_node() {
        for (opposite, face) in TET_FACES.iter().enumerate() {
            assert!(!face.contains(&opposite));
        }
    }
}
