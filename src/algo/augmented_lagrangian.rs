//! Augmented Lagrangian method.
//!
//! General constraints are moved into a merit function
//!
//! _L(x) = f(x) + Σ_eq (λ c + μ/2 c^2) + Σ_ineq (μ/2 max(0, c + λ/μ)^2 - λ^2 / (2μ))_
//!
//! which is minimized by an inner bound-constrained [optimizer](crate::Optimizer)
//! over the [domain](crate::Domain). After every inner minimization, the
//! multipliers λ are updated from the constraint values and the penalty μ is
//! increased if the violation did not decrease sufficiently.
//!
//! One outer iteration corresponds to one call of
//! [`copt_next`](crate::ConstrainedOptimizer::copt_next).
//!
//! # References
//!
//! \[1\] [Numerical
//! Optimization](https://link.springer.com/book/10.1007/978-0-387-40065-5)
//!
//! \[2\] [LANCELOT: A Fortran Package for Large-Scale Nonlinear
//! Optimization](https://link.springer.com/book/10.1007/978-3-662-12211-2)

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::{
    convert,
    storage::{Storage, StorageMut},
    ComplexField, DimName, Dyn, IsContiguous, OVector, RealField as _, Vector, U1,
};
use num_traits::Zero;
use thiserror::Error;

use crate::{
    algo::TrustRegion,
    core::{
        max_violation, ConstrainedFunction, ConstrainedOptimizer, ConstraintKind, Domain,
        Function, Optimizer, Problem, RealField,
    },
};

/// Options for [`AugmentedLagrangian`] optimizer.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct AugmentedLagrangianOptions<P: Problem> {
    /// Initial penalty parameter. Default: `10`.
    mu_init: P::Field,
    /// Factor by which the penalty is increased. Default: `10`.
    penalty_growth: P::Field,
    /// Upper limit of the penalty. Default: `1e8`.
    penalty_max: P::Field,
    /// Required ratio of the new and the previous constraint violation for
    /// the penalty to stay the same. Default: `0.25`.
    violation_decrease: P::Field,
    /// Violation under which the penalty is never increased. Default: `1e-10`.
    violation_tol: P::Field,
    /// Maximum number of inner iterations in one outer iteration. Default:
    /// `50`.
    inner_max_iters: usize,
    /// Change of the merit function value under which the inner minimization
    /// is considered converged. Default: `1e-10`.
    inner_ftol: P::Field,
}

impl<P: Problem> Default for AugmentedLagrangianOptions<P> {
    fn default() -> Self {
        Self {
            mu_init: convert(10.0),
            penalty_growth: convert(10.0),
            penalty_max: convert(1e8),
            violation_decrease: convert(0.25),
            violation_tol: convert(1e-10),
            inner_max_iters: 50,
            inner_ftol: convert(1e-10),
        }
    }
}

/// Error returned from [`AugmentedLagrangian`] optimizer.
#[derive(Debug, Error)]
pub enum AugmentedLagrangianError {
    /// The constraint vector has a wrong number of rows.
    #[error("expected {expected} constraint values, got {actual}")]
    ConstraintDimension {
        /// Number of constraints of the function.
        expected: usize,
        /// Number of rows of the given vector.
        actual: usize,
    },
    /// The objective or the constraints are not finite in the current point.
    #[error("objective or constraints are not finite")]
    NotFinite,
}

/// Merit function of one outer iteration.
///
/// It is a [`Function`] on the same domain as the constrained function, so any
/// optimizer can be used for the inner minimization.
pub struct Merit<'a, F: ConstrainedFunction> {
    f: &'a F,
    kinds: &'a [ConstraintKind],
    lambda: &'a OVector<F::Field, Dyn>,
    mu: F::Field,
}

impl<'a, F: ConstrainedFunction> Merit<'a, F> {
    /// Current penalty parameter.
    pub fn penalty(&self) -> F::Field {
        self.mu
    }
}

impl<'a, F: ConstrainedFunction> Problem for Merit<'a, F> {
    type Field = F::Field;

    fn domain(&self) -> Domain<Self::Field> {
        self.f.domain()
    }
}

impl<'a, F: ConstrainedFunction> Function for Merit<'a, F> {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        let zero = F::Field::zero();
        let half: F::Field = convert(0.5);
        let mu = self.mu;

        let mut cx = OVector::zeros_generic(Dyn(self.kinds.len()), U1::name());
        let fx = self.f.eval_constrained(x, &mut cx);

        self.kinds
            .iter()
            .zip(self.lambda.iter())
            .zip(cx.iter())
            .fold(fx, |merit, ((kind, lambda), ci)| {
                let lambda = *lambda;
                let ci = *ci;

                match kind {
                    ConstraintKind::Equality => merit + lambda * ci + half * mu * ci * ci,
                    ConstraintKind::Inequality => {
                        let shifted = (ci + lambda / mu).max(zero);
                        merit + half * mu * shifted * shifted - half * lambda * lambda / mu
                    }
                }
            })
    }
}

/// Factory of the inner optimizer.
///
/// A fresh inner optimizer is created for the merit function of every outer
/// iteration.
pub trait InnerOptimizer<F: ConstrainedFunction> {
    /// Type of the inner optimizer.
    type Optimizer<'a>: Optimizer<Merit<'a, F>>
    where
        F: 'a;

    /// Creates the inner optimizer for given merit function.
    fn create<'a>(&self, merit: &Merit<'a, F>, dom: &Domain<F::Field>) -> Self::Optimizer<'a>;
}

/// [`TrustRegion`] with default options as the inner optimizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerTrustRegion;

impl<F: ConstrainedFunction> InnerOptimizer<F> for InnerTrustRegion {
    type Optimizer<'a> = TrustRegion<Merit<'a, F>> where F: 'a;

    fn create<'a>(&self, merit: &Merit<'a, F>, dom: &Domain<F::Field>) -> Self::Optimizer<'a> {
        TrustRegion::new(merit, dom)
    }
}

/// Augmented Lagrangian optimizer.
///
/// See [module](self) documentation for more details.
pub struct AugmentedLagrangian<F: ConstrainedFunction, I> {
    options: AugmentedLagrangianOptions<F>,
    inner: I,
    kinds: Vec<ConstraintKind>,
    lambda: OVector<F::Field, Dyn>,
    mu: F::Field,
    violation: F::Field,
    x_prev: OVector<F::Field, Dyn>,
}

impl<F: ConstrainedFunction> AugmentedLagrangian<F, InnerTrustRegion> {
    /// Initializes augmented Lagrangian optimizer with default options and
    /// trust region as the inner optimizer.
    pub fn new(f: &F, dom: &Domain<F::Field>) -> Self {
        Self::with_inner(f, dom, InnerTrustRegion, AugmentedLagrangianOptions::default())
    }

    /// Initializes augmented Lagrangian optimizer with given options and
    /// trust region as the inner optimizer.
    pub fn with_options(
        f: &F,
        dom: &Domain<F::Field>,
        options: AugmentedLagrangianOptions<F>,
    ) -> Self {
        Self::with_inner(f, dom, InnerTrustRegion, options)
    }
}

impl<F: ConstrainedFunction, I: InnerOptimizer<F>> AugmentedLagrangian<F, I> {
    /// Initializes augmented Lagrangian optimizer with given inner optimizer
    /// and options.
    pub fn with_inner(
        f: &F,
        dom: &Domain<F::Field>,
        inner: I,
        options: AugmentedLagrangianOptions<F>,
    ) -> Self {
        let kinds = f.constraint_kinds();

        Self {
            lambda: OVector::zeros_generic(Dyn(kinds.len()), U1::name()),
            mu: options.mu_init,
            violation: convert(f64::INFINITY),
            x_prev: OVector::zeros_generic(Dyn(dom.dim()), U1::name()),
            kinds,
            options,
            inner,
        }
    }
}

impl<F: ConstrainedFunction, I> AugmentedLagrangian<F, I> {
    /// Resets the multipliers and the penalty.
    pub fn reset(&mut self) {
        self.lambda.fill(F::Field::zero());
        self.mu = self.options.mu_init;
        self.violation = convert(f64::INFINITY);
    }

    /// Current estimates of the Lagrange multipliers.
    pub fn multipliers(&self) -> &[F::Field] {
        self.lambda.as_slice()
    }

    /// Current penalty parameter.
    pub fn penalty(&self) -> F::Field {
        self.mu
    }
}

impl<F, I> ConstrainedOptimizer<F> for AugmentedLagrangian<F, I>
where
    F: ConstrainedFunction,
    I: InnerOptimizer<F>,
{
    const NAME: &'static str = "Augmented Lagrangian";

    type Error = AugmentedLagrangianError;

    fn copt_next<Sx, Scx>(
        &mut self,
        f: &F,
        dom: &Domain<F::Field>,
        x: &mut Vector<F::Field, Dyn, Sx>,
        cx: &mut Vector<F::Field, Dyn, Scx>,
    ) -> Result<F::Field, Self::Error>
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
        Scx: StorageMut<F::Field, Dyn>,
    {
        let AugmentedLagrangianOptions {
            penalty_growth,
            penalty_max,
            violation_decrease,
            violation_tol,
            inner_max_iters,
            inner_ftol,
            ..
        } = self.options;

        if cx.nrows() != self.kinds.len() {
            return Err(AugmentedLagrangianError::ConstraintDimension {
                expected: self.kinds.len(),
                actual: cx.nrows(),
            });
        }

        {
            let merit = Merit {
                f,
                kinds: &self.kinds,
                lambda: &self.lambda,
                mu: self.mu,
            };

            let mut value = merit.apply(&*x);
            if !value.is_finite() {
                return Err(AugmentedLagrangianError::NotFinite);
            }

            let mut optimizer = self.inner.create(&merit, dom);

            for iter in 0..inner_max_iters {
                self.x_prev.copy_from(x);

                match optimizer.opt_next(&merit, dom, x) {
                    // Rejected step, the optimizer adapts and tries again.
                    Ok(_) if *x == self.x_prev => {}
                    Ok(next) => {
                        let change = (value - next).abs();
                        value = next;

                        if change <= inner_ftol {
                            debug!("inner minimization converged after {} iterations", iter + 1);
                            break;
                        }
                    }
                    Err(_) => {
                        debug!("inner optimizer stopped after {} iterations", iter + 1);
                        break;
                    }
                }
            }
        }

        let fx = f.eval_constrained(&*x, cx);
        if !fx.is_finite() || cx.iter().any(|ci| !ci.is_finite()) {
            return Err(AugmentedLagrangianError::NotFinite);
        }

        let zero = F::Field::zero();
        let mu = self.mu;

        for ((kind, lambda), ci) in self.kinds.iter().zip(self.lambda.iter_mut()).zip(cx.iter()) {
            *lambda = match kind {
                ConstraintKind::Equality => *lambda + mu * *ci,
                ConstraintKind::Inequality => (*lambda + mu * *ci).max(zero),
            };
        }

        debug!("multipliers updated to {:?}", self.lambda.as_slice());

        let violation = max_violation(&self.kinds, cx);

        if violation > violation_tol && violation > self.violation * violation_decrease {
            self.mu = (mu * penalty_growth).min(penalty_max);
            debug!(
                "violation decreased insufficiently ({} -> {}), penalty increased to {}",
                self.violation, violation, self.mu
            );
        }

        self.violation = violation;

        Ok(fx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::dvector;

    fn run(
        f: &ConstrainedQuadratic,
        x0: OVector<f64, Dyn>,
        iters: usize,
    ) -> (OVector<f64, Dyn>, Vec<f64>, f64) {
        let dom = f.domain();
        let mut optimizer = AugmentedLagrangian::new(f, &dom);
        let mut x = x0;
        let mut cx = dvector![0.0];

        for _ in 0..iters {
            optimizer.copt_next(f, &dom, &mut x, &mut cx).unwrap();
        }

        let violation = max_violation(&f.constraint_kinds(), &cx);
        (x, optimizer.multipliers().to_vec(), violation)
    }

    #[test]
    fn equality_constraint() {
        let f = ConstrainedQuadratic::equality();

        for x0 in f.initials() {
            let (x, lambda, _) = run(&f, x0, 15);
            assert_abs_diff_eq!(x, f.optimum(), epsilon = 1e-4);
            assert_abs_diff_eq!(lambda[0], -1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn active_inequality_constraint() {
        let f = ConstrainedQuadratic::inequality();

        for x0 in f.initials() {
            let (x, lambda, violation) = run(&f, x0, 15);
            assert_abs_diff_eq!(x, f.optimum(), epsilon = 1e-4);
            assert!(violation <= 2e-4);
            // The multiplier of an active inequality converges only linearly.
            assert_abs_diff_eq!(lambda[0], 2.0, epsilon = 5e-2);
        }
    }

    #[test]
    fn inactive_inequality_constraint() {
        let f = ConstrainedQuadratic::inactive();

        for x0 in f.initials() {
            let (x, lambda, violation) = run(&f, x0, 5);
            assert_eq!(violation, 0.0);
            assert_abs_diff_eq!(x, f.optimum(), epsilon = 1e-4);
            assert_eq!(lambda[0], 0.0);
        }
    }

    #[test]
    fn penalty_increases_without_progress() {
        let f = ConstrainedQuadratic::equality();
        let dom = f.domain();

        let mut options = AugmentedLagrangianOptions::default();
        options.set_inner_max_iters(0);
        let mut optimizer = AugmentedLagrangian::with_options(&f, &dom, options);

        let mut x = dvector![3.0, 3.0];
        let mut cx = dvector![0.0];

        optimizer.copt_next(&f, &dom, &mut x, &mut cx).unwrap();
        assert_eq!(optimizer.penalty(), 10.0);

        optimizer.copt_next(&f, &dom, &mut x, &mut cx).unwrap();
        assert_eq!(optimizer.penalty(), 100.0);

        optimizer.reset();
        assert_eq!(optimizer.penalty(), 10.0);
        assert_eq!(optimizer.multipliers(), &[0.0]);
    }

    #[test]
    fn merit_of_inequality_is_continuous_at_boundary() {
        let f = ConstrainedQuadratic::inequality();
        let kinds = f.constraint_kinds();
        let lambda = dvector![0.0];
        let merit = Merit {
            f: &f,
            kinds: &kinds,
            lambda: &lambda,
            mu: 10.0,
        };

        // Satisfied constraint does not change the objective.
        assert_eq!(merit.apply(&dvector![0.5, 0.5]), 4.5);
        // Violated constraint adds the quadratic penalty.
        assert_abs_diff_eq!(merit.apply(&dvector![2.0, 1.0]), 1.0 + 5.0);
    }

    #[test]
    fn constraint_dimension_mismatch() {
        let f = ConstrainedQuadratic::equality();
        let dom = f.domain();
        let mut optimizer = AugmentedLagrangian::new(&f, &dom);

        let mut x = dvector![0.0, 0.0];
        let mut cx = dvector![0.0, 0.0];

        assert!(matches!(
            optimizer.copt_next(&f, &dom, &mut x, &mut cx),
            Err(AugmentedLagrangianError::ConstraintDimension {
                expected: 1,
                actual: 2
            })
        ));
    }
}
