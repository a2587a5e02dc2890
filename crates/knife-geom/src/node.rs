use knife_math::Point3;

/// A point shared by one or more segments — either a primal mesh vertex or
/// a cutting-surface vertex.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub xyz: Point3,
}
