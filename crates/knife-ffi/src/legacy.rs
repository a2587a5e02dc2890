//! Zero-handle convenience wrappers for callers ported from a
//! single-partition API that never threaded an opaque handle through every
//! call, mirroring `knife_fortran.c`'s module-level statics. Exactly one
//! partition is live at a time; a second [`volume`] call replaces the first.
//!
//! These are plain Rust functions, not a second `#[no_mangle]` surface —
//! `#[no_mangle]` symbol names ignore module nesting, so exporting this
//! layer under the same names as the handle-taking `extern "C"` functions
//! in the crate root would collide with them at link time.

use crate::{KnifeHandle, SubtriTriangle};
use knife_core::{KnifeError, Result};
use knife_cut::VertexConstraint;
use knife_math::Point3;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

fn slot() -> &'static Mutex<Option<Box<KnifeHandle>>> {
    static SLOT: OnceLock<Mutex<Option<Box<KnifeHandle>>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

fn with_active<T>(what: &str, f: impl FnOnce(&mut KnifeHandle) -> Result<T>) -> Result<T> {
    let mut guard = slot().lock().expect("knife-ffi legacy mutex poisoned");
    let handle = guard.as_mut().ok_or_else(|| KnifeError::Null(format!("{what}: no active partition")))?;
    f(handle)
}

pub fn volume(
    part_id: i32,
    nnode0: usize,
    nnode: usize,
    x: &[f64],
    y: &[f64],
    z: &[f64],
    nface: usize,
    ncell: usize,
    c2n_one_based: &[[u32; 4]],
) -> Result<()> {
    let mut handle = KnifeHandle::new();
    handle.volume(part_id, nnode0, nnode, x, y, z, nface, ncell, c2n_one_based)?;
    *slot().lock().expect("knife-ffi legacy mutex poisoned") = Some(Box::new(handle));
    Ok(())
}

pub fn boundary(start: usize, patch: u32, f2n_one_based: &[[u32; 3]]) -> Result<usize> {
    with_active("knife_boundary", |h| h.boundary(start, patch, f2n_one_based))
}

pub fn required_local_dual(script_path: &Path, required: &mut [u8]) -> Result<()> {
    with_active("knife_required_local_dual", |h| h.required_local_dual(script_path, required))
}

pub fn cut(required: &[u8]) -> Result<()> {
    with_active("knife_cut", |h| h.cut(required))
}

pub fn dual_topo(topo: &mut [i32]) -> Result<()> {
    with_active("knife_dual_topo", |h| h.dual_topo(topo))
}

pub fn make_dual_required(node: usize) -> Result<()> {
    with_active("knife_make_dual_required", |h| h.make_dual_required(node))
}

pub fn dual_regions(node: usize) -> Result<usize> {
    with_active("knife_dual_regions", |h| h.dual_regions(node))
}

pub fn poly_centroid_volume(node: usize, region: usize) -> Result<(Point3, f64)> {
    with_active("knife_poly_centroid_volume", |h| h.poly_centroid_volume(node, region))
}

pub fn ntriangles_between_poly(node1: usize, region1: usize, node2: usize, region2: usize) -> Result<usize> {
    with_active("knife_ntriangles_between_poly", |h| {
        h.ntriangles_between_poly(node1, region1, node2, region2)
    })
}

pub fn triangles_between_poly(node1: usize, region1: usize, node2: usize) -> Result<Vec<SubtriTriangle>> {
    with_active("knife_triangles_between_poly", |h| h.triangles_between_poly(node1, region1, node2))
}

pub fn number_of_surface_triangles(node: usize, region: usize, patch: u32) -> Result<usize> {
    with_active("knife_number_of_surface_triangles", |h| {
        h.number_of_surface_triangles(node, region, patch)
    })
}

pub fn surface_triangles(node: usize, region: usize, patch: u32) -> Result<Vec<SubtriTriangle>> {
    with_active("knife_surface_triangles", |h| h.surface_triangles(node, region, patch))
}

pub fn number_of_boundary_triangles(node: usize, face_id: usize, region: usize) -> Result<usize> {
    with_active("knife_number_of_boundary_triangles", |h| {
        h.number_of_boundary_triangles(node, face_id, region)
    })
}

pub fn boundary_triangles(node: usize, face_id: usize, region: usize) -> Result<Vec<SubtriTriangle>> {
    with_active("knife_boundary_triangles", |h| h.boundary_triangles(node, face_id, region))
}

pub fn between_poly_sens(node1: usize, region1: usize, node2: usize) -> Result<Vec<[VertexConstraint; 3]>> {
    with_active("knife_between_poly_sens", |h| h.between_poly_sens(node1, region1, node2))
}

pub fn surface_sens(node: usize, region: usize, patch: u32) -> Result<Vec<[VertexConstraint; 3]>> {
    with_active("knife_surface_sens", |h| h.surface_sens(node, region, patch))
}

pub fn boundary_sens(node: usize, face_id: usize, region: usize) -> Result<Vec<[VertexConstraint; 3]>> {
    with_active("knife_boundary_sens", |h| h.boundary_sens(node, face_id, region))
}

pub fn cut_surface_dim() -> Result<(usize, usize)> {
    with_active("knife_cut_surface_dim", |h| h.cut_surface_dim())
}

pub fn cut_surface() -> Result<(Vec<Point3>, Vec<[u32; 3]>)> {
    with_active("knife_cut_surface", |h| {
        let (xyz, t2n) = h.cut_surface()?;
        Ok((xyz.to_vec(), t2n.to_vec()))
    })
}

/// Drops the active partition, if any, leaving the slot empty.
pub fn free() {
    *slot().lock().expect("knife-ffi legacy mutex poisoned") = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tet_volume() -> Result<()> {
        volume(
            0,
            4,
            4,
            &[0.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 0.0],
            &[0.0, 0.0, 0.0, 1.0],
            4,
            1,
            &[[1, 2, 3, 4]],
        )
    }

    #[test]
    fn no_active_partition_reports_null() {
        free();
        let err = dual_regions(0).unwrap_err();
        assert!(matches!(err, KnifeError::Null(_)));
    }

    #[test]
    fn volume_then_boundary_tracks_a_single_active_partition() {
        free();
        unit_tet_volume().unwrap();
        let next = boundary(0, 1, &[[1, 3, 2]]).unwrap();
        assert_eq!(next, 1);
        free();
    }
}
