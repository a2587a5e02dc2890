#![warn(missing_docs)]

//! Peripheral mesh-file readers and writers: FAST `.fgrid`, `.tri` (ASCII
//! and Fortran-unformatted), Tecplot ASCII `.t`, and VTK ASCII `.vtu`.
//! None of these formats are part of the geometric cut engine; they exist
//! so a caller can get a [`knife_primal::Primal`] or a triangle list onto
//! disk and back, mirroring the peripheral exporters in the legacy source
//! (`primal_export_tri`, `primal_from_fgrid`, `surface_export_tec`, ...).

pub mod fgrid;
pub mod tecplot;
pub mod tri;
pub mod vtu;

pub use fgrid::{read_fgrid, write_fgrid};
pub use tecplot::{read_massoud, write_tecplot_surface};
pub use tri::{read_tri, write_tri, TriEncoding};
pub use vtu::{write_vtu_surface, write_vtu_volume};
