/// Geometric tolerances shared by the math, geometry, and cut crates.
///
/// A single `Tolerance` value is threaded through a `Domain`'s pipeline so
/// every stage (orientation predicates, node coincidence, area/volume
/// sanity checks) agrees on what "zero" means for that mesh's scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Distance below which two nodes are considered coincident.
    pub distance: f64,
    /// Absolute value below which a signed volume or area is treated as zero.
    pub volume: f64,
}

impl Tolerance {
    pub const fn new(distance: f64, volume: f64) -> Self {
        Self { distance, volume }
    }

    pub fn is_zero_distance(&self, value: f64) -> bool {
        value.abs() < self.distance
    }

    pub fn is_zero_volume(&self, value: f64) -> bool {
        value.abs() < self.volume
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(1.0e-12, 1.0e-14)
    }
}
