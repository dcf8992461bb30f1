//! Hardware drivers for supported boards.

pub mod argon_one;
