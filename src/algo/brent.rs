//! Brent's bracketing method.
//!
//! [Brent's method](https://en.wikipedia.org/wiki/Brent%27s_method) combines
//! bisection, secant and inverse quadratic interpolation steps. It is
//! guaranteed to converge as long as the initial interval brackets a sign
//! change of the residual. The bracket is taken from the bounds of the
//! [domain](crate::Domain), so the domain must be bounded.
//!
//! **Important:** Only one-dimensional systems are supported.
//!
//! Use [`first_bracket`] to find a bracket in a larger interval.
//!
//! # References
//!
//! \[1\] [Algorithms for Minimization without
//! Derivatives](https://maths-people.anu.edu.au/~brent/pub/pub011.html)

use std::marker::PhantomData;

use approx::AbsDiffEq;
use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::{
    convert, storage::StorageMut, ComplexField, Dyn, IsContiguous, RealField as _, Vector,
};
use num_traits::Zero;
use thiserror::Error;

use crate::core::{Domain, Problem, RealField, Solver, System};

/// Options for [`Brent`] solver.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct BrentOptions<P: Problem> {
    /// Absolute tolerance on the bracket size. Default: `2e-12`.
    xtol: P::Field,
    /// Relative tolerance on the bracket size. Default: `4 * EPSILON`.
    rtol: P::Field,
}

impl<P: Problem> Default for BrentOptions<P> {
    fn default() -> Self {
        Self {
            xtol: convert(2e-12),
            rtol: P::Field::default_epsilon() * convert(4.0),
        }
    }
}

/// Error returned from [`Brent`] solver.
#[derive(Debug, Error)]
pub enum BrentError {
    /// System is not one-dimensional.
    #[error("system is not one-dimensional")]
    InvalidDimensionality,
    /// Domain has an infinite bound.
    #[error("domain is unbounded")]
    UnboundedDomain,
    /// Residuals at the domain bounds have the same sign.
    #[error("domain bounds do not bracket a root")]
    NoBracket,
}

#[derive(Debug, Clone, Copy)]
struct Bracket<T> {
    // Previous iterate.
    xpre: T,
    fpre: T,
    // Current best estimate.
    xcur: T,
    fcur: T,
    // Counterpoint, the root is between xcur and xblk.
    xblk: T,
    fblk: T,
    // Previous and current step.
    spre: T,
    scur: T,
}

/// Brent solver. See [module](self) documentation for more details.
pub struct Brent<P: Problem> {
    options: BrentOptions<P>,
    bracket: Option<Bracket<P::Field>>,
    converged: bool,
    _phantom: PhantomData<P>,
}

impl<P: Problem> Brent<P> {
    /// Initializes Brent solver with default options.
    pub fn new(p: &P, dom: &Domain<P::Field>) -> Self {
        Self::with_options(p, dom, BrentOptions::default())
    }

    /// Initializes Brent solver with given options.
    pub fn with_options(_: &P, _: &Domain<P::Field>, options: BrentOptions<P>) -> Self {
        Self {
            options,
            bracket: None,
            converged: false,
            _phantom: PhantomData,
        }
    }

    /// Resets the internal state of the solver. The bracket is taken from the
    /// domain again in the next iteration.
    pub fn reset(&mut self) {
        self.bracket = None;
        self.converged = false;
    }

    /// Whether the bracket shrank below the tolerance or the residual is
    /// exactly zero. Further iterations do not change the point.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Establishes the bracket invariants and tests for convergence.
    fn normalize(&mut self, b: &mut Bracket<P::Field>) {
        let zero = P::Field::zero();
        let two: P::Field = convert(2.0);

        if b.fpre != zero && b.fcur != zero && (b.fpre < zero) != (b.fcur < zero) {
            b.xblk = b.xpre;
            b.fblk = b.fpre;
            b.spre = b.xcur - b.xpre;
            b.scur = b.spre;
        }

        if b.fblk.abs() < b.fcur.abs() {
            b.xpre = b.xcur;
            b.xcur = b.xblk;
            b.xblk = b.xpre;

            b.fpre = b.fcur;
            b.fcur = b.fblk;
            b.fblk = b.fpre;
        }

        let tol = (self.options.xtol + self.options.rtol * b.xcur.abs()) / two;
        let sbis = (b.xblk - b.xcur) / two;
        self.converged = b.fcur == zero || sbis.abs() < tol;
    }
}

impl<R: System> Solver<R> for Brent<R> {
    const NAME: &'static str = "Brent";

    type Error = BrentError;

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
            return Err(BrentError::InvalidDimensionality);
        }

        let zero = R::Field::zero();
        let two: R::Field = convert(2.0);
        let three: R::Field = convert(3.0);

        let mut eval = |xi: R::Field, x: &mut Vector<R::Field, Dyn, Sx>| {
            x[0] = xi;
            r.eval(&*x, rx);
            rx[0]
        };

        let mut b = match self.bracket {
            Some(b) => b,
            None => {
                let lower = dom.lower()[0];
                let upper = dom.upper()[0];

                if !lower.is_finite() || !upper.is_finite() {
                    return Err(BrentError::UnboundedDomain);
                }

                let flower = eval(lower, x);
                let fupper = eval(upper, x);

                let product = flower * fupper;
                if product > zero || !product.is_finite() {
                    debug!("no sign change in [{}, {}]", lower, upper);
                    return Err(BrentError::NoBracket);
                }

                let mut b = Bracket {
                    xpre: lower,
                    fpre: flower,
                    xcur: upper,
                    fcur: fupper,
                    xblk: zero,
                    fblk: zero,
                    spre: zero,
                    scur: zero,
                };

                if flower == zero {
                    b.xcur = lower;
                    b.fcur = flower;
                    b.xblk = lower;
                    b.fblk = flower;
                    self.converged = true;
                } else if fupper == zero {
                    b.xblk = upper;
                    b.fblk = fupper;
                    self.converged = true;
                } else {
                    self.normalize(&mut b);
                }

                self.bracket = Some(b);

                x[0] = b.xcur;
                rx[0] = b.fcur;
                return Ok(());
            }
        };

        if self.converged {
            x[0] = b.xcur;
            rx[0] = b.fcur;
            return Ok(());
        }

        let tol = (self.options.xtol + self.options.rtol * b.xcur.abs()) / two;
        let sbis = (b.xblk - b.xcur) / two;

        if b.spre.abs() > tol && b.fcur.abs() < b.fpre.abs() {
            let stry = if b.xpre == b.xblk {
                // Secant.
                -b.fcur * (b.xcur - b.xpre) / (b.fcur - b.fpre)
            } else {
                // Inverse quadratic interpolation.
                let dpre = (b.fpre - b.fcur) / (b.xpre - b.xcur);
                let dblk = (b.fblk - b.fcur) / (b.xblk - b.xcur);
                -b.fcur * (b.fblk * dblk - b.fpre * dpre) / (dblk * dpre * (b.fblk - b.fpre))
            };

            if two * stry.abs() < b.spre.abs().min(three * sbis.abs() - tol) {
                b.spre = b.scur;
                b.scur = stry;
                debug!("interpolation step {}", stry);
            } else {
                b.spre = sbis;
                b.scur = sbis;
                debug!("bisection step {}", sbis);
            }
        } else {
            b.spre = sbis;
            b.scur = sbis;
            debug!("bisection step {}", sbis);
        }

        b.xpre = b.xcur;
        b.fpre = b.fcur;

        if b.scur.abs() > tol {
            b.xcur += b.scur;
        } else if sbis > zero {
            b.xcur += tol;
        } else {
            b.xcur -= tol;
        }

        b.fcur = eval(b.xcur, x);
        self.normalize(&mut b);
        self.bracket = Some(b);

        x[0] = b.xcur;
        rx[0] = b.fcur;

        Ok(())
    }
}

/// Finds the first subinterval of `[min, max]` divided into `n - 1` equal
/// parts in which `f` changes sign.
///
/// The subintervals are scanned from `min` (or from `max` if `backward` is
/// set). Returns the bracket ordered from lower to upper bound, or `None` if
/// there is no sign change on the grid.
pub fn first_bracket<T, F>(mut f: F, min: T, max: T, n: usize, backward: bool) -> Option<(T, T)>
where
    T: RealField,
    F: FnMut(T) -> T,
{
    assert!(n >= 2, "at least two points are needed");

    let step = (max - min) / convert::<f64, T>((n - 1) as f64);
    let point = |i: usize| {
        if i == n - 1 {
            max
        } else {
            min + step * convert::<f64, T>(i as f64)
        }
    };

    let mut indices: Box<dyn Iterator<Item = usize>> = if backward {
        Box::new((0..n).rev())
    } else {
        Box::new(0..n)
    };

    let mut prev = indices.next().map(|i| (i, f(point(i))))?;

    for i in indices {
        let fi = f(point(i));
        if prev.1 * fi < T::zero() {
            let (a, b) = (point(prev.0), point(i));
            return Some(if a < b { (a, b) } else { (b, a) });
        }
        prev = (i, fi);
    }

    None
}
