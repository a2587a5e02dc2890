//! Error taxonomy, tolerances, and per-domain frame bookkeeping shared by
//! every crate in the workspace.

mod error;
mod frame;
mod tolerance;

pub use error::{KnifeError, KnifeStatus};
pub use frame::FrameCounter;
pub use tolerance::Tolerance;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, KnifeError>;
