//! The collection of implemented algorithms.
//!
//! * [Brent](brent) -- Bracketing root finder for one-dimensional systems,
//!   used for the inflow angle of blade sections.
//! * [Steffensen](steffensen) -- Fast and lightweight method for
//!   one-dimensional systems without bracketing guarantees.
//! * [Trust region](trust_region) -- General method for systems and
//!   bound-constrained optimization.
//! * [Augmented Lagrangian](augmented_lagrangian) -- Optimization with
//!   equality and inequality constraints.

pub mod augmented_lagrangian;
pub mod brent;
pub mod steffensen;
pub mod trust_region;

pub use augmented_lagrangian::{
    AugmentedLagrangian, AugmentedLagrangianError, AugmentedLagrangianOptions, InnerOptimizer,
    InnerTrustRegion,
};
pub use brent::{first_bracket, Brent};
pub use steffensen::Steffensen;
pub use trust_region::TrustRegion;
