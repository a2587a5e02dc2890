#![warn(missing_docs)]

//! Point, vector, and transform types used by the mesh-cutting pipeline,
//! plus the orientation predicates the geometry crates build on.

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

pub mod predicates;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in the 2D plane a `Triangle`'s subtri complex is retriangulated in.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix, applied to primal and surface mesh
/// coordinates by the knife input script directives (`translate`, `rotate`,
/// `scale`, `flip_yz`, `flip_zy`, `reflect_y`).
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Uniform scale by `s`, as used by the `scale` script directive.
    pub fn uniform_scale(s: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = s;
        m[(1, 1)] = s;
        m[(2, 2)] = s;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle`
    /// radians, via Rodrigues' rotation formula. Backs the `rotate nx ny
    /// nz theta` script directive.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Mirror across the plane `y = z` (swaps y and z), the `flip_yz`
    /// script directive.
    pub fn flip_yz() -> Self {
        let mut m = Matrix4::identity();
        m[(1, 1)] = 0.0;
        m[(1, 2)] = 1.0;
        m[(2, 1)] = 1.0;
        m[(2, 2)] = 0.0;
        Self { matrix: m }
    }

    /// Mirror across the plane `z = y`, the `flip_zy` script directive.
    /// Identical to `flip_yz`: swapping two axes is its own inverse.
    pub fn flip_zy() -> Self {
        Self::flip_yz()
    }

    /// Mirror across the plane `y = 0`, the `reflect_y` script directive.
    pub fn reflect_y() -> Self {
        let mut m = Matrix4::identity();
        m[(1, 1)] = -1.0;
        Self { matrix: m }
    }

    /// Compose: apply `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a normal vector using the inverse transpose of the
    /// upper-left 3x3 block, so normals stay perpendicular under
    /// non-uniform scale.
    pub fn apply_normal(&self, n: &Vec3) -> Vec3 {
        let m3 = self.matrix.fixed_view::<3, 3>(0, 0);
        if let Some(inv) = m3.try_inverse() {
            inv.transpose() * n
        } else {
            *n
        }
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn translation_moves_point() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result.x - 11.0).abs() < 1e-12);
        assert!((result.y - 22.0).abs() < 1e-12);
        assert!((result.z - 33.0).abs() < 1e-12);
    }

    #[test]
    fn flip_yz_swaps_axes() {
        let t = Transform::flip_yz();
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result.x - 1.0).abs() < 1e-12);
        assert!((result.y - 3.0).abs() < 1e-12);
        assert!((result.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn reflect_y_negates_y() {
        let t = Transform::reflect_y();
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result.y + 2.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_about_axis_quarter_turn() {
        let axis = Dir3::new_normalize(Vec3::z());
        let t = Transform::rotation_about_axis(&axis, PI / 2.0);
        let p = Point3::new(1.0, 0.0, 0.0);
        let result = t.apply_point(&p);
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_undoes_transform() {
        let t = Transform::translation(1.0, 2.0, 3.0);
        let inv = t.inverse().unwrap();
        let composed = t.then(&inv);
        let p = Point3::new(5.0, 6.0, 7.0);
        let result = composed.apply_point(&p);
        assert!((result - p).norm() < 1e-12);
    }
}
