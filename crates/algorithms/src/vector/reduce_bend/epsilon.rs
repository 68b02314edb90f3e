//! Near-zero tolerances scaled to the dynamic range of the data.

use crate::maybe_rayon::*;
use geo::{BoundingRect, Rect};
use geosim_core::Feature;

/// Significant digits of an f64
const MAX_DIGIT: i32 = 15;
/// Orders of magnitude kept as margin
const SECURITY: i32 = 2;

/// Tolerances used for every comparison against zero during one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epsilon {
    /// Distance under which two positions are the same
    pub zero_relative: f64,
    /// Scale-free zero
    pub zero_absolute: f64,
    /// Angle (radians) under which a vertex is flat
    pub zero_angle: f64,
}

impl Epsilon {
    /// Tolerances for the extent of all feature geometries.
    pub fn from_features(features: &[Feature]) -> Self {
        let rects: Vec<Rect<f64>> = features
            .into_par_iter()
            .filter_map(|f| f.geometry.as_ref().and_then(|g| g.bounding_rect()))
            .collect();

        let extent = rects.into_iter().reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        });

        Self::from_extent(extent)
    }

    /// Tolerances for an extent; `None` stands for the unit square.
    ///
    /// The wider the coordinates, the more digits are lost to the integer
    /// part, so the relative zero grows with the extent.
    pub fn from_extent(extent: Option<Rect<f64>>) -> Self {
        let rect = extent.unwrap_or_else(|| Rect::new((0.0, 0.0), (1.0, 1.0)));

        let delta_x = rect.min().x.abs() + rect.max().x.abs();
        let delta_y = rect.min().y.abs() + rect.max().y.abs();
        let mut dynamic_xy = delta_x.max(delta_y);
        if !(dynamic_xy > 0.0) || !dynamic_xy.is_finite() {
            dynamic_xy = 1.0;
        }

        let log_loss = (dynamic_xy.log10() + 1.0).trunc() as i32;
        let abs_digit = MAX_DIGIT - SECURITY;
        let rel_digit = MAX_DIGIT - log_loss - SECURITY;

        Self {
            zero_relative: 10f64.powi(-rel_digit),
            zero_absolute: 10f64.powi(-abs_digit),
            zero_angle: 0.0001f64.to_radians(),
        }
    }
}
