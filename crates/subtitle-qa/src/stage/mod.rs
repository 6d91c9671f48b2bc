//! Analysis stages, run strictly forward by [`crate::pipeline::analyze`].

pub mod audit;
pub mod classifier;
pub mod merge;
pub mod mismatch;
pub mod select;
pub mod spelling;
pub mod sync;
pub mod tagger;
