#![allow(clippy::many_single_char_names)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # Bemopt
//!
//! Aerodynamic analysis and design optimization of propeller blades, written
//! entirely in Rust.
//!
//! The blade is described by a few control points of chord and twist
//! distributions. For every operating point, the sections along the blade
//! are solved by blade element momentum theory, where the only unknown of a
//! section is the inflow angle. Section loads are integrated to thrust,
//! torque, power and propulsive efficiency. A design problem then chooses
//! which inputs are varied, what is minimized and what is constrained, and a
//! constrained optimizer finds the best blade.
//!
//! ## Modules
//!
//! * [`units`] -- Unit strings, dimensions and conversions.
//! * [`airfoil`] -- Airfoil polars, extrapolation to the full angle range and
//!   interpolation in angle of attack and Reynolds number.
//! * [`geometry`] -- Chord and twist distributions from control points.
//! * [`inflow`] -- Section inflow velocities.
//! * [`bem`] -- Blade element momentum solution of sections and rotors.
//! * [`model`] -- Unit-aware inputs and outputs of the propeller analysis.
//! * [`design`] -- Scaled design variables, objective and constraints.
//! * [`algo`] -- Root finding and optimization algorithms.
//!
//! ## Problems
//!
//! The numerical part is built around problems that only need to be
//! evaluated. There is no need for gradients or Jacobian matrices; the
//! algorithms use [finite
//! differences](https://en.wikipedia.org/wiki/Finite_difference_method) or
//! are derivative-free by definition.
//!
//! ```rust
//! use bemopt::nalgebra as na;
//! use bemopt::{Domain, Problem, System};
//! use na::{Dyn, IsContiguous};
//!
//! // tan(x) = 1 on a bracketing interval.
//! struct Tangent;
//!
//! impl Problem for Tangent {
//!     type Field = f64;
//!
//!     fn domain(&self) -> Domain<Self::Field> {
//!         Domain::rect(vec![0.0], vec![1.5])
//!     }
//! }
//!
//! impl System for Tangent {
//!     fn eval<Sx, Sfx>(
//!         &self,
//!         x: &na::Vector<Self::Field, Dyn, Sx>,
//!         fx: &mut na::Vector<Self::Field, Dyn, Sfx>,
//!     ) where
//!         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//!         Sfx: na::storage::StorageMut<Self::Field, Dyn>,
//!     {
//!         fx[0] = x[0].tan() - 1.0;
//!     }
//! }
//! ```
//!
//! ## Solving
//!
//! Drivers run the iterative process until a stopping criterion is reached.
//! The [`SolverDriver`] uses Brent's method by default.
//!
//! ```rust
//! use bemopt::SolverDriver;
//! # use bemopt::nalgebra as na;
//! # use bemopt::{Domain, Problem, System};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct Tangent;
//! #
//! # impl Problem for Tangent {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::rect(vec![0.0], vec![1.5])
//! #     }
//! # }
//! #
//! # impl System for Tangent {
//! #     fn eval<Sx, Sfx>(
//! #         &self,
//! #         x: &na::Vector<Self::Field, Dyn, Sx>,
//! #         fx: &mut na::Vector<Self::Field, Dyn, Sfx>,
//! #     ) where
//! #         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//! #         Sfx: na::storage::StorageMut<Self::Field, Dyn>,
//! #     {
//! #         fx[0] = x[0].tan() - 1.0;
//! #     }
//! # }
//!
//! let f = Tangent;
//! let mut solver = SolverDriver::builder(&f).build();
//!
//! let (x, norm) = solver
//!     .find(|state| state.algo().is_converged() || state.iter() >= 100)
//!     .expect("solver encountered an error");
//!
//! assert!(norm <= 1e-10);
//! assert!((x[0] - std::f64::consts::FRAC_PI_4).abs() <= 1e-10);
//! ```
//!
//! The propeller design is optimized by [`design::optimize`], which runs the
//! [`ConstrainedDriver`] with the augmented Lagrangian method.
//!
//! ## License
//!
//! Licensed under MIT.

pub mod airfoil;
pub mod algo;
pub mod bem;
mod core;
pub mod derivatives;
pub mod design;
pub mod driver;
pub mod geometry;
pub mod inflow;
pub mod model;
pub mod units;

pub use core::*;
pub use driver::{ConstrainedDriver, OptimizerDriver, SolverDriver};

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
