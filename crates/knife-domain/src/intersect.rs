//! Plane/segment intersection and barycentric classification shared by
//! `required_local_dual` and `boolean_subtract`. Grounded on the
//! segment-against-triangle test implied throughout `knife_fortran.c`'s
//! intersection bindings, none of which survived in the retrieved source.

use knife_math::{Point2, Point3};

/// Where segment `a`-`b` crosses the plane of triangle `(p0, p1, p2)`, if
/// the two endpoints lie strictly on opposite sides of it.
pub fn segment_plane_crossing(
    p0: Point3,
    p1: Point3,
    p2: Point3,
    a: Point3,
    b: Point3,
) -> Option<(f64, Point3)> {
    let normal = (p1 - p0).cross(&(p2 - p0));
    let da = normal.dot(&(a - p0));
    let db = normal.dot(&(b - p0));
    if (da > 0.0) == (db > 0.0) {
        return None;
    }
    let t = da / (da - db);
    Some((t, Point3::from(a.coords + (b.coords - a.coords) * t)))
}

/// The barycentric coordinates of `point` with respect to `(p0, p1, p2)`,
/// as `(u, v)` with `u` weighting `p0`, `v` weighting `p1`, and `1 - u - v`
/// weighting `p2` — matching `Subnode::uv`'s convention. `None` if the
/// triangle is degenerate.
pub fn barycentric_uv(p0: Point3, p1: Point3, p2: Point3, point: Point3) -> Option<Point2> {
    let v0 = p1 - p0;
    let v1 = p2 - p0;
    let v2 = point - p0;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1.0e-14 {
        return None;
    }
    let beta = (d11 * d20 - d01 * d21) / denom;
    let gamma = (d00 * d21 - d01 * d20) / denom;
    Some(Point2::new(1.0 - beta - gamma, beta))
}

/// Whether barycentric coordinates `uv` lie within the triangle, to a
/// small tolerance.
pub fn inside_triangle(uv: Point2) -> bool {
    const EPS: f64 = 1.0e-9;
    uv.x >= -EPS && uv.y >= -EPS && uv.x + uv.y <= 1.0 + EPS
}

pub fn bbox(points: impl Iterator<Item = Point3>) -> Option<(Point3, Point3)> {
    let mut iter = points;
    let first = iter.next()?;
    let mut lo = first;
    let mut hi = first;
    for p in iter {
        lo = Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z));
        hi = Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z));
    }
    Some((lo, hi))
}

pub fn bboxes_overlap(lo0: Point3, hi0: Point3, lo1: Point3, hi1: Point3) -> bool {
    lo0.x <= hi1.x && hi0.x >= lo1.x && lo0.y <= hi1.y && hi0.y >= lo1.y && lo0.z <= hi1.z && hi0.z >= lo1.z
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_finds_midpoint_of_a_perpendicular_segment() {
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, 1.0, 0.0);
        let a = Point3::new(0.25, 0.25, -1.0);
        let b = Point3::new(0.25, 0.25, 1.0);
        let (t, xyz) = segment_plane_crossing(p0, p1, p2, a, b).unwrap();
        assert!((t - 0.5).abs() < 1e-12);
        assert!((xyz.z).abs() < 1e-12);
    }

    #[test]
    fn barycentric_identifies_centroid() {
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, 1.0, 0.0);
        let centroid = Point3::new(1.0 / 3.0, 1.0 / 3.0, 0.0);
        let uv = barycentric_uv(p0, p1, p2, centroid).unwrap();
        assert!((uv.x - 1.0 / 3.0).abs() < 1e-12);
        assert!((uv.y - 1.0 / 3.0).abs() < 1e-12);
        assert!(inside_triangle(uv));
    }

    #[test]
    fn point_outside_triangle_fails_the_inside_test() {
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, 1.0, 0.0);
        let outside = Point3::new(1.0, 1.0, 0.0);
        let uv = barycentric_uv(p0, p1, p2, outside).unwrap();
        assert!(!inside_triangle(uv));
    }
}
