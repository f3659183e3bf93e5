//! Role grant flattening.

pub mod flatten;

pub use flatten::flatten;
