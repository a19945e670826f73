//! Bar series transforms applied before signal generation.

pub mod resample;

pub use resample::resample;
