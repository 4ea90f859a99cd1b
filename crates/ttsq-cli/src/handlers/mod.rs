//! Command handlers.
//!
//! Each handler parses CLI-specific input, calls into `ttsq_dispatch` and
//! formats the result for the terminal.

pub mod normalize;
pub mod speak;
pub mod split;
