//! Vector generalization algorithms
//!
//! - Normalize: explode multi-part geometries into single parts
//! - Reduce Bend: Wang & Müller (1998) bend simplification with topology checks
//! - Measurements: area, length, perimeter, adjusted area

mod measurements;
mod normalize;
pub mod reduce_bend;

pub use measurements::{
    adjusted_area, angle_between, area, length, min_adjusted_area, perimeter, signed_ring_area,
    vertex_count,
};
pub use normalize::normalize_features;
pub use reduce_bend::{reduce_bend, ReduceBend, ReduceBendParams, ReduceBendResults};
