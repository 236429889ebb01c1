//! Statistical primitives for validity estimation.
//!
//! This module provides the numeric infrastructure the estimators build on:
//! - Standard normal CDF and z-scores for probabilistic scoring
//! - Weighted least-squares line fitting via normal equations
//! - Weighted moments and residual summaries for distribution fits

mod fit;
mod normal;

pub use fit::{
    fit_line, fit_line_weighted, fit_quality, rms_residual, weighted_moments,
    weighted_rms_residual, LineFit,
};
pub use normal::{normal_cdf, z_score};
