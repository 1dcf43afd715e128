//! Core abstractions and types.
//!
//! Problems implement [`Problem`] together with [`System`] (residuals to be
//! driven to zero), [`Function`] (a value to be minimized) or
//! [`ConstrainedFunction`] (an objective with equality and inequality
//! constraints), optionally restricting the [domain](Domain).
//!
//! Algorithms implement [`Solver`], [`Optimizer`] or [`ConstrainedOptimizer`]
//! and approximate derivatives with the tools in the
//! [derivatives](crate::derivatives) module.

mod algorithm;
mod base;
mod constrained;
mod domain;
mod function;
mod system;

pub use algorithm::*;
pub use base::*;
pub use constrained::*;
pub use domain::*;
pub use function::*;
pub use system::*;
