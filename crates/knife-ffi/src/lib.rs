//! The foreign-callable boundary of `knife`: an opaque-handle `extern "C"`
//! surface for callers that manage their own partition state, plus a
//! [`legacy`] convenience layer for callers ported from a single-partition,
//! zero-handle API. Every index crossing this boundary is one-based on the
//! wire and zero-based in Rust; the shift happens exactly once, here.

mod handle;
pub mod legacy;

pub use handle::{constraint_kind_code, topo_code, KnifeHandle, SubtriTriangle};

use knife_core::{KnifeError, KnifeStatus};
use knife_cut::VertexConstraint;
use knife_math::Point3;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;
use std::slice;

/// Allocates a fresh, empty handle. The caller owns the returned pointer and
/// must release it with [`knife_destroy`].
#[no_mangle]
pub extern "C" fn knife_create() -> *mut KnifeHandle {
    Box::into_raw(Box::new(KnifeHandle::new()))
}

/// Releases a handle allocated by [`knife_create`]. `handle` may be null, in
/// which case this is a no-op.
///
/// # Safety
/// `handle` must either be null or a pointer previously returned by
/// [`knife_create`] that has not already been destroyed.
#[no_mangle]
pub unsafe extern "C" fn knife_destroy(handle: *mut KnifeHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `x`, `y`, `z` must
/// each point to `nnode` readable `f64`s; `c2n` to `4 * ncell` readable
/// one-based `i32` node indices.
#[no_mangle]
pub unsafe extern "C" fn knife_volume(
    handle: *mut KnifeHandle,
    part_id: i32,
    nnode0: usize,
    nnode: usize,
    x: *const f64,
    y: *const f64,
    z: *const f64,
    nface: usize,
    ncell: usize,
    c2n: *const i32,
) -> i32 {
    with_handle(handle, |h| {
        let x = slice::from_raw_parts(x, nnode);
        let y = slice::from_raw_parts(y, nnode);
        let z = slice::from_raw_parts(z, nnode);
        let c2n = slice::from_raw_parts(c2n, 4 * ncell);
        let cells = one_based_quads(c2n)?;
        h.volume(part_id, nnode0, nnode, x, y, z, nface, ncell, &cells)
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `f2n` must point
/// to `3 * nface_patch` readable one-based `i32` node indices.
#[no_mangle]
pub unsafe extern "C" fn knife_boundary(
    handle: *mut KnifeHandle,
    start: usize,
    patch: i32,
    nface_patch: usize,
    f2n: *const i32,
    next_start: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        let f2n = slice::from_raw_parts(f2n, 3 * nface_patch);
        let faces = one_based_tris(f2n)?;
        let result = h.boundary(start, patch as u32, &faces)?;
        if !next_start.is_null() {
            *next_start = result;
        }
        Ok(())
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `script_path` must
/// be a valid, nul-terminated C string. `required` must point to `nnode`
/// writable `u8`s.
#[no_mangle]
pub unsafe extern "C" fn knife_required_local_dual(
    handle: *mut KnifeHandle,
    script_path: *const c_char,
    nnode: usize,
    required: *mut u8,
) -> i32 {
    with_handle(handle, |h| {
        let path = cstr_path(script_path)?;
        let required = slice::from_raw_parts_mut(required, nnode);
        h.required_local_dual(&path, required)
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `required` must
/// point to `nnode` readable `u8`s.
#[no_mangle]
pub unsafe extern "C" fn knife_cut(handle: *mut KnifeHandle, nnode: usize, required: *const u8) -> i32 {
    with_handle(handle, |h| {
        let required = slice::from_raw_parts(required, nnode);
        h.cut(required)
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `topo` must point
/// to `nnode` writable `i32`s.
#[no_mangle]
pub unsafe extern "C" fn knife_dual_topo(handle: *mut KnifeHandle, nnode: usize, topo: *mut i32) -> i32 {
    with_handle(handle, |h| {
        let topo = slice::from_raw_parts_mut(topo, nnode);
        h.dual_topo(topo)
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `node` is one-based.
#[no_mangle]
pub unsafe extern "C" fn knife_make_dual_required(handle: *mut KnifeHandle, node: i32) -> i32 {
    with_handle(handle, |h| h.make_dual_required(zero_based(node)))
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `node` is
/// one-based; `regions` must point to one writable `usize`.
#[no_mangle]
pub unsafe extern "C" fn knife_dual_regions(handle: *mut KnifeHandle, node: i32, regions: *mut usize) -> i32 {
    with_handle(handle, |h| {
        *regions = h.dual_regions(zero_based(node))?;
        Ok(())
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `node`/`region`
/// are one-based; `centroid` must point to 3 writable `f64`s, `volume` to
/// one writable `f64`.
#[no_mangle]
pub unsafe extern "C" fn knife_poly_centroid_volume(
    handle: *mut KnifeHandle,
    node: i32,
    region: i32,
    centroid: *mut f64,
    volume: *mut f64,
) -> i32 {
    with_handle(handle, |h| {
        let (c, v) = h.poly_centroid_volume(zero_based(node), zero_based(region))?;
        write_point(centroid, c);
        *volume = v;
        Ok(())
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `node1`/`region1`/
/// `node2`/`region2` are one-based; `n` must point to one writable `usize`.
#[no_mangle]
pub unsafe extern "C" fn knife_ntriangles_between_poly(
    handle: *mut KnifeHandle,
    node1: i32,
    region1: i32,
    node2: i32,
    region2: i32,
    n: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        *n = h.ntriangles_between_poly(zero_based(node1), zero_based(region1), zero_based(node2), zero_based(region2))?;
        Ok(())
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `node1`/`region1`/
/// `node2` are one-based; `out` must point to `13 * max` writable `f64`s,
/// laid out per triangle as `[x0,y0,z0, x1,y1,z1, x2,y2,z2, nx,ny,nz, area]`.
/// `written` must point to one writable `usize`.
#[no_mangle]
pub unsafe extern "C" fn knife_triangles_between_poly(
    handle: *mut KnifeHandle,
    node1: i32,
    region1: i32,
    node2: i32,
    max: usize,
    out: *mut f64,
    written: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        let triangles = h.triangles_between_poly(zero_based(node1), zero_based(region1), zero_based(node2))?;
        write_triangles(&triangles, max, out, written)
    })
}

/// # Safety
/// See [`knife_ntriangles_between_poly`]; `patch` is one-based.
#[no_mangle]
pub unsafe extern "C" fn knife_number_of_surface_triangles(
    handle: *mut KnifeHandle,
    node: i32,
    region: i32,
    patch: i32,
    n: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        *n = h.number_of_surface_triangles(zero_based(node), zero_based(region), patch as u32)?;
        Ok(())
    })
}

/// # Safety
/// See [`knife_triangles_between_poly`]; `patch` is one-based.
#[no_mangle]
pub unsafe extern "C" fn knife_surface_triangles(
    handle: *mut KnifeHandle,
    node: i32,
    region: i32,
    patch: i32,
    max: usize,
    out: *mut f64,
    written: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        let triangles = h.surface_triangles(zero_based(node), zero_based(region), patch as u32)?;
        write_triangles(&triangles, max, out, written)
    })
}

/// # Safety
/// See [`knife_ntriangles_between_poly`]; `face_id` is one-based.
#[no_mangle]
pub unsafe extern "C" fn knife_number_of_boundary_triangles(
    handle: *mut KnifeHandle,
    node: i32,
    face_id: i32,
    region: i32,
    n: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        *n = h.number_of_boundary_triangles(zero_based(node), zero_based(face_id), zero_based(region))?;
        Ok(())
    })
}

/// # Safety
/// See [`knife_triangles_between_poly`]; `face_id` is one-based.
#[no_mangle]
pub unsafe extern "C" fn knife_boundary_triangles(
    handle: *mut KnifeHandle,
    node: i32,
    face_id: i32,
    region: i32,
    max: usize,
    out: *mut f64,
    written: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        let triangles = h.boundary_triangles(zero_based(node), zero_based(face_id), zero_based(region))?;
        write_triangles(&triangles, max, out, written)
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `node1`/`region1`/
/// `node2` are one-based. `kinds` and `parents` must each point to
/// `3 * max` writable elements (`parents` laid out as 9 `f64`s per
/// constraint: 3 parent points of 3 coordinates each). `written` must point
/// to one writable `usize`.
#[no_mangle]
pub unsafe extern "C" fn knife_between_poly_sens(
    handle: *mut KnifeHandle,
    node1: i32,
    region1: i32,
    node2: i32,
    max: usize,
    kinds: *mut i32,
    parents: *mut f64,
    written: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        let sens = h.between_poly_sens(zero_based(node1), zero_based(region1), zero_based(node2))?;
        write_sens(&sens, max, kinds, parents, written)
    })
}

/// # Safety
/// See [`knife_between_poly_sens`]; `patch` is one-based.
#[no_mangle]
pub unsafe extern "C" fn knife_surface_sens(
    handle: *mut KnifeHandle,
    node: i32,
    region: i32,
    patch: i32,
    max: usize,
    kinds: *mut i32,
    parents: *mut f64,
    written: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        let sens = h.surface_sens(zero_based(node), zero_based(region), patch as u32)?;
        write_sens(&sens, max, kinds, parents, written)
    })
}

/// # Safety
/// See [`knife_between_poly_sens`]; `face_id` is one-based.
#[no_mangle]
pub unsafe extern "C" fn knife_boundary_sens(
    handle: *mut KnifeHandle,
    node: i32,
    face_id: i32,
    region: i32,
    max: usize,
    kinds: *mut i32,
    parents: *mut f64,
    written: *mut usize,
) -> i32 {
    with_handle(handle, |h| {
        let sens = h.boundary_sens(zero_based(node), zero_based(face_id), zero_based(region))?;
        write_sens(&sens, max, kinds, parents, written)
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `nnode`/`ntriangle`
/// must each point to one writable `usize`.
#[no_mangle]
pub unsafe extern "C" fn knife_cut_surface_dim(handle: *mut KnifeHandle, nnode: *mut usize, ntriangle: *mut usize) -> i32 {
    with_handle(handle, |h| {
        let (n, t) = h.cut_surface_dim()?;
        *nnode = n;
        *ntriangle = t;
        Ok(())
    })
}

/// # Safety
/// `handle` must be a live pointer from [`knife_create`]. `xyz` must point
/// to `3 * nnode` writable `f64`s, `t2n` to `3 * ntriangle` writable
/// one-based `i32`s, both sized from a prior [`knife_cut_surface_dim`] call.
#[no_mangle]
pub unsafe extern "C" fn knife_cut_surface(handle: *mut KnifeHandle, xyz: *mut f64, t2n: *mut i32) -> i32 {
    with_handle(handle, |h| {
        let (points, triangles) = h.cut_surface()?;
        for (i, p) in points.iter().enumerate() {
            *xyz.add(3 * i) = p.x;
            *xyz.add(3 * i + 1) = p.y;
            *xyz.add(3 * i + 2) = p.z;
        }
        for (i, tri) in triangles.iter().enumerate() {
            *t2n.add(3 * i) = tri[0] as i32 + 1;
            *t2n.add(3 * i + 1) = tri[1] as i32 + 1;
            *t2n.add(3 * i + 2) = tri[2] as i32 + 1;
        }
        Ok(())
    })
}

/// Resets `handle` to a freshly-created state, dropping its primal, surface
/// and domain without deallocating the handle itself.
///
/// # Safety
/// `handle` must be a live pointer from [`knife_create`].
#[no_mangle]
pub unsafe extern "C" fn knife_free(handle: *mut KnifeHandle) -> i32 {
    if handle.is_null() {
        return KnifeStatus::Null as i32;
    }
    *handle = KnifeHandle::new();
    KnifeStatus::Success as i32
}

unsafe fn with_handle<F>(handle: *mut KnifeHandle, body: F) -> i32
where
    F: FnOnce(&mut KnifeHandle) -> knife_core::Result<()>,
{
    let Some(h) = handle.as_mut() else {
        return KnifeStatus::Null as i32;
    };
    KnifeStatus::from(body(h)) as i32
}

unsafe fn cstr_path(ptr: *const c_char) -> knife_core::Result<std::path::PathBuf> {
    if ptr.is_null() {
        return Err(KnifeError::Null("script_path NULL".into()));
    }
    let s = CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| KnifeError::FileError(e.to_string()))?;
    Ok(Path::new(s).to_path_buf())
}

fn zero_based(one_based: i32) -> usize {
    (one_based - 1).max(0) as usize
}

fn one_based_quads(flat: &[i32]) -> knife_core::Result<Vec<[u32; 4]>> {
    flat.chunks_exact(4)
        .map(|c| Ok([one_based_index(c[0])?, one_based_index(c[1])?, one_based_index(c[2])?, one_based_index(c[3])?]))
        .collect()
}

fn one_based_tris(flat: &[i32]) -> knife_core::Result<Vec<[u32; 3]>> {
    flat.chunks_exact(3)
        .map(|c| Ok([one_based_index(c[0])?, one_based_index(c[1])?, one_based_index(c[2])?]))
        .collect()
}

fn one_based_index(v: i32) -> knife_core::Result<u32> {
    if v < 1 {
        return Err(KnifeError::ArrayBound(format!("expected a one-based index, got {v}")));
    }
    Ok(v as u32)
}

unsafe fn write_point(out: *mut f64, p: Point3) {
    *out = p.x;
    *out.add(1) = p.y;
    *out.add(2) = p.z;
}

unsafe fn write_triangles(triangles: &[SubtriTriangle], max: usize, out: *mut f64, written: *mut usize) -> knife_core::Result<()> {
    let n = triangles.len().min(max);
    for (i, t) in triangles.iter().take(n).enumerate() {
        let base = out.add(13 * i);
        write_point(base, t.node0);
        write_point(base.add(3), t.node1);
        write_point(base.add(6), t.node2);
        *base.add(9) = t.normal.x;
        *base.add(10) = t.normal.y;
        *base.add(11) = t.normal.z;
        *base.add(12) = t.area;
    }
    *written = n;
    Ok(())
}

unsafe fn write_sens(
    sens: &[[VertexConstraint; 3]],
    max: usize,
    kinds: *mut i32,
    parents: *mut f64,
    written: *mut usize,
) -> knife_core::Result<()> {
    let n = sens.len().min(max);
    for (i, triple) in sens.iter().take(n).enumerate() {
        for (v, constraint) in triple.iter().enumerate() {
            let slot = 3 * i + v;
            *kinds.add(slot) = constraint_kind_code(constraint.kind);
            let base = parents.add(9 * slot);
            write_point(base, constraint.parents[0]);
            write_point(base.add(3), constraint.parents[1]);
            write_point(base.add(6), constraint.parents[2]);
        }
    }
    *written = n;
    Ok(())
}
