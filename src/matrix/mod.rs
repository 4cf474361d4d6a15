//! Matrix data structures and operations

pub mod mask;
pub mod reference;
pub mod sparse;

pub use mask::{Mask, MaskValue};
pub use reference::reference_multiply;
pub use sparse::{Format, SparseMatrix, Storage};
