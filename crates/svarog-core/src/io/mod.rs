//! Dataset file formats consumed by the benchmark harnesses.

pub mod fvecs;


pub use fvecs::{read_fvecs, read_ivecs, write_fvecs, write_ivecs};
