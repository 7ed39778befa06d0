//! Similarity-based entry boundary detection for volumes whose closing
//! dates are too damaged for the terminator pattern.

pub mod locator;
pub mod peaks;
pub mod similarity;

pub use locator::{FuzzyLocator, Segment, merge_cutoffs};
pub use peaks::{find_peaks, plateau};
pub use similarity::{BigramProfile, similarity};
