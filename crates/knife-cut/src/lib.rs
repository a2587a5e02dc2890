#![warn(missing_docs)]

//! Boolean subtraction at the sub-triangle level: [`Mask`] paints active
//! subtris per triangle, [`Loop`] extracts the boundary of a painted
//! region, and [`Poly`] groups masks into the final dual-cell regions.

mod loop_;
mod mask;
mod poly;

pub use loop_::{Loop, Subsegment};
pub use mask::Mask;
pub use poly::{ConstraintKind, FaceKind, Poly, Region, VertexConstraint};
