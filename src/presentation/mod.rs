//! User-facing text and button layouts. Pure, no I/O.

pub mod format;
pub mod keyboards;
