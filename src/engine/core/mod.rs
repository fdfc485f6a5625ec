pub mod filter;
pub mod group;
pub mod quality;
pub mod reduce;
pub mod vector;

pub use quality::{QualityGate, SkipReason, SkipReport};
