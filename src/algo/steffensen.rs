//! Steffensen's method.
//!
//! [Steffensen's](https://en.wikipedia.org/wiki/Steffensen%27s_method) method
//! is a technique similar to Newton's method, but without using derivatives.
//! It converges quickly from a good initial guess, which makes it a cheap
//! alternative to bracketing for residuals that are well-behaved around the
//! initial point.
//!
//! **Important:** Only one-dimensional systems are supported.
//!
//! # References
//!
//! \[1\] [A variant of Steffensen's method of fourth-order convergence and its
//! applications](https://www.sciencedirect.com/science/article/pii/S0096300310002705)

use std::marker::PhantomData;

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::{storage::StorageMut, ComplexField, Dyn, IsContiguous, Vector};
use num_traits::Zero;
use thiserror::Error;

use crate::core::{Domain, Problem, RealField, Solver, System};

/// Variant of the Steffensen's method.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum SteffensenVariant {
    /// Standard (simplest) variant.
    Standard,
    /// Fourth-order variant by Liu et al.
    Liu,
}

/// Options for [`Steffensen`] solver.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct SteffensenOptions<P: Problem> {
    /// Variant of the Steffensen's method. Default: Liu (see
    /// [`SteffensenVariant`]).
    variant: SteffensenVariant,
    #[getset(skip)]
    _phantom: PhantomData<P::Field>,
}

impl<P: Problem> Default for SteffensenOptions<P> {
    fn default() -> Self {
        Self {
            variant: SteffensenVariant::Liu,
            _phantom: PhantomData,
        }
    }
}

/// Steffensen solver. See [module](self) documentation for more details.
pub struct Steffensen<P: Problem> {
    options: SteffensenOptions<P>,
}

impl<P: Problem> Steffensen<P> {
    /// Initializes Steffensen solver with default options.
    pub fn new(p: &P, dom: &Domain<P::Field>) -> Self {
        Self::with_options(p, dom, SteffensenOptions::default())
    }

    /// Initializes Steffensen solver with given options.
    pub fn with_options(_: &P, _: &Domain<P::Field>, options: SteffensenOptions<P>) -> Self {
        Self { options }
    }
}

/// Error returned from [`Steffensen`] solver.
#[derive(Debug, Error)]
pub enum SteffensenError {
    /// System is not one-dimensional.
    #[error("system is not one-dimensional")]
    InvalidDimensionality,
    /// Divided difference vanished so the next point is undefined.
    #[error("divided difference is zero")]
    ZeroDifference,
}

impl<R: System> Solver<R> for Steffensen<R> {
    const NAME: &'static str = "Steffensen";

    type Error = SteffensenError;

    fn solve_next<Sx, Srx>(
        &mut self,
        r: &R,
        dom: &Domain<R::Field>,
        x: &mut Vector<R::Field, Dyn, Sx>,
        rx: &mut Vector<R::Field, Dyn, Srx>,
    ) -> Result<(), Self::Error>
    where
        Sx: StorageMut<R::Field, Dyn> + IsContiguous,
        Srx: StorageMut<R::Field, Dyn>,
    {
        if dom.dim() != 1 {
            return Err(SteffensenError::InvalidDimensionality);
        }

        let zero = R::Field::zero();
        let x0 = x[0];

        r.eval(x, rx);
        let r0 = rx[0];

        if r0 == zero {
            return Ok(());
        }

        // z = x + r(x)
        let z0 = x0 + r0;
        x[0] = z0;
        r.eval(x, rx);
        let rz = rx[0];

        // First divided difference r[x, z].
        let r_xz = (rz - r0) / (z0 - x0);
        if r_xz == zero || !r_xz.is_finite() {
            x[0] = x0;
            r.eval(x, rx);
            return Err(SteffensenError::ZeroDifference);
        }

        x[0] = match self.options.variant {
            SteffensenVariant::Standard => x0 - r0 / r_xz,
            SteffensenVariant::Liu => {
                // y = x - r(x) / r[x, z]
                let y0 = x0 - r0 / r_xz;
                x[0] = y0;
                r.eval(x, rx);
                let ry = rx[0];

                let r_xy = (ry - r0) / (y0 - x0);
                let r_yz = (rz - ry) / (z0 - y0);

                let denom = r_xy * r_xy;
                if denom == zero || !denom.is_finite() {
                    y0
                } else {
                    y0 - (r_xy - r_yz + r_xz) / denom * ry
                }
            }
        };

        dom.project(x);
        r.eval(x, rx);
        debug!("Steffensen step to x = {}, r(x) = {}", x[0], rx[0]);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dvector, storage::Storage};

    struct Plane;

    impl Problem for Plane {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            Domain::unconstrained(2)
        }
    }

    impl System for Plane {
        fn eval<Sx, Srx>(&self, x: &Vector<f64, Dyn, Sx>, rx: &mut Vector<f64, Dyn, Srx>)
        where
            Sx: Storage<f64, Dyn> + IsContiguous,
            Srx: StorageMut<f64, Dyn>,
        {
            rx[0] = x[0] + x[1];
            rx[1] = x[0] - x[1];
        }
    }

    #[test]
    fn linear_standard() {
        let r = ScalarRoot::linear();
        let dom = r.domain();

        for x in r.initials() {
            let mut options = SteffensenOptions::default();
            options.set_variant(SteffensenVariant::Standard);
            let solver = Steffensen::with_options(&r, &dom, options);
            assert!(r.is_root(&solve(&r, &dom, solver, x, 10, 1e-12).unwrap(), 1e-12));
        }
    }

    #[test]
    fn cubic_liu() {
        let r = ScalarRoot::cubic();
        let dom = r.domain();

        let solver = Steffensen::new(&r, &dom);
        let x = solve(&r, &dom, solver, dvector![1.5], 25, 1e-12).unwrap();
        assert_abs_diff_eq!(x[0], 2f64.cbrt(), epsilon = 1e-9);
    }

    #[test]
    fn stays_in_domain() {
        let r = ScalarRoot::cubic();
        let dom = Domain::rect(vec![0.0], vec![1.0]);
        let mut solver = Steffensen::new(&r, &dom);

        let mut x = dvector![0.9];
        let mut rx = x.clone_owned();
        for _ in 0..5 {
            if solver.solve_next(&r, &dom, &mut x, &mut rx).is_err() {
                break;
            }
            assert!(dom.contains(&x));
        }
    }

    #[test]
    fn invalid_dimensionality() {
        let r = Plane;
        let dom = r.domain();
        let mut solver = Steffensen::new(&r, &dom);

        let mut x = dvector![1.0, 1.0];
        let mut rx = x.clone_owned();
        assert!(matches!(
            solver.solve_next(&r, &dom, &mut x, &mut rx),
            Err(SteffensenError::InvalidDimensionality)
        ));
    }
}
