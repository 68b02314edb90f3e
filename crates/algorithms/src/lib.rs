//! # geo-sim Algorithms
//!
//! Cartographic generalization algorithms for geo-sim.
//!
//! ## Available Algorithm Categories
//!
//! - **vector**: normalization of multi-part layers, Reduce Bend line and
//!   polygon generalization, geometric measurements

pub mod feedback;
pub(crate) mod maybe_rayon;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::feedback::{Feedback, LogFeedback};
    pub use crate::vector::{
        normalize_features, reduce_bend, ReduceBend, ReduceBendParams, ReduceBendResults,
    };
    pub use geosim_core::prelude::*;
}
