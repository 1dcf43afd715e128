//! Trust region optimization method.
//!
//! In every iteration, a quadratic model of the function is built from the
//! finite difference gradient and Hessian. The step is taken along the
//! [dogleg](https://en.wikipedia.org/wiki/Powell%27s_dog_leg_method) path
//! between the scaled Cauchy point and the Newton step, truncated to the trust
//! region. Trial points are projected into the domain, so the method handles
//! bound constraints.
//!
//! # References
//!
//! \[1\] [Numerical
//! Optimization](https://link.springer.com/book/10.1007/978-0-387-40065-5)
//!
//! \[2\] [Numerical Methods for Unconstrained Optimization and Nonlinear
//! Equations](https://epubs.siam.org/doi/book/10.1137/1.9781611971200)

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::{
    convert, storage::StorageMut, ComplexField, DimName, Dyn, IsContiguous, OVector, RealField as _,
    Vector, U1,
};
use num_traits::{One, Zero};
use thiserror::Error;

use crate::{
    core::{Domain, Function, Optimizer, Problem, RealField},
    derivatives::{Gradient, Hessian},
};

/// Specification for initial value of trust region size.
#[derive(Debug, Clone, Copy)]
pub enum DeltaInit<S> {
    /// Fixed value.
    Fixed(S),
    /// Estimated from the gradient norm in the initial point.
    Estimated,
}

/// Options for [`TrustRegion`] optimizer.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct TrustRegionOptions<P: Problem> {
    /// Minimum allowed trust region size. Default: `sqrt(EPSILON)`.
    delta_min: P::Field,
    /// Maximum allowed trust region size. Default: `1e9`.
    delta_max: P::Field,
    /// Initial trust region size. Default: estimated (see [`DeltaInit`]).
    delta_init: DeltaInit<P::Field>,
    /// Threshold for gain ratio to shrink trust region size if lower. Default:
    /// `0.25`.
    shrink_thresh: P::Field,
    /// Threshold for gain ratio to expand trust region size if higher. Default:
    /// `0.75`.
    expand_thresh: P::Field,
    /// Threshold for gain ratio that needs to be exceeded to accept the
    /// calculated step. Default: `0.0001`.
    accept_thresh: P::Field,
    /// Number of step rejections that are allowed to happen before returning
    /// [`TrustRegionError::NoProgress`] error. Default: `10`.
    rejections_thresh: usize,
    /// Relative epsilon used in gradient computations. Default:
    /// `sqrt(EPSILON)`.
    eps_sqrt: P::Field,
    /// Relative epsilon used in Hessian computations. Default: `cbrt(EPSILON)`.
    eps_cbrt: P::Field,
}

impl<P: Problem> Default for TrustRegionOptions<P> {
    fn default() -> Self {
        Self {
            delta_min: P::Field::EPSILON_SQRT,
            delta_max: convert(1e9),
            delta_init: DeltaInit::Estimated,
            shrink_thresh: convert(0.25),
            expand_thresh: convert(0.75),
            accept_thresh: convert(0.0001),
            rejections_thresh: 10,
            eps_sqrt: P::Field::EPSILON_SQRT,
            eps_cbrt: P::Field::EPSILON_CBRT,
        }
    }
}

/// Error returned from [`TrustRegion`] optimizer.
#[derive(Debug, Error)]
pub enum TrustRegionError {
    /// Could not take any valid step.
    #[error("neither newton nor steepest descent step can be taken from the point")]
    NoValidStep,
    /// Maximum number of step rejections exceeded.
    #[error("cannot make progress")]
    NoProgress,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StepType {
    FullNewton,
    ScaledNewton,
    ScaledCauchy,
    Dogleg,
}

/// Trust region optimizer.
///
/// See [module](self) documentation for more details.
pub struct TrustRegion<P: Problem> {
    options: TrustRegionOptions<P>,
    delta: P::Field,
    scale: OVector<P::Field, Dyn>,
    grad: Gradient<P>,
    hes: Hessian<P>,
    newton: OVector<P::Field, Dyn>,
    cauchy: OVector<P::Field, Dyn>,
    p: OVector<P::Field, Dyn>,
    x_trial: OVector<P::Field, Dyn>,
    rejections_cnt: usize,
}

impl<P: Problem> TrustRegion<P> {
    /// Initializes trust region optimizer with default options.
    pub fn new(p: &P, dom: &Domain<P::Field>) -> Self {
        Self::with_options(p, dom, TrustRegionOptions::default())
    }

    /// Initializes trust region optimizer with given options.
    pub fn with_options(_: &P, dom: &Domain<P::Field>, options: TrustRegionOptions<P>) -> Self {
        let n = dom.dim();
        let zeros = || OVector::zeros_generic(Dyn(n), U1::name());

        Self {
            delta: Self::initial_delta(&options),
            options,
            scale: dom.scale_or_ones(),
            grad: Gradient::zeros(n),
            hes: Hessian::zeros(n),
            newton: zeros(),
            cauchy: zeros(),
            p: zeros(),
            x_trial: zeros(),
            rejections_cnt: 0,
        }
    }

    /// Resets the internal state of the optimizer.
    pub fn reset(&mut self) {
        self.delta = Self::initial_delta(&self.options);
        self.rejections_cnt = 0;
    }

    fn initial_delta(options: &TrustRegionOptions<P>) -> P::Field {
        match options.delta_init {
            DeltaInit::Fixed(fixed) => fixed,
            // Zero is recognized in the first iteration.
            DeltaInit::Estimated => convert(0.0),
        }
    }
}

impl<P: Problem> TrustRegion<P> {
    /// Computes the step `p` of the current iteration from the gradient,
    /// Hessian and the trust region radius.
    fn compute_step(&mut self) -> Result<StepType, TrustRegionError> {
        let Self {
            delta,
            scale,
            grad,
            hes,
            newton,
            cauchy,
            p,
            ..
        } = self;

        let zero = P::Field::zero();
        let one = P::Field::one();
        let delta = *delta;

        // Newton step solves H p = -g. The QR decomposition tells us whether
        // the Hessian is singular.
        newton.copy_from(&**grad);
        newton.neg_mut();
        let is_newton_valid = hes.clone_owned().qr().solve_mut(newton);

        if !is_newton_valid {
            debug!("Newton step is invalid for singular Hessian");
        }

        let newton_scaled_norm = newton.component_mul(scale).norm();

        if is_newton_valid && newton_scaled_norm <= delta {
            p.copy_from(newton);
            debug!("take full Newton: {:?}", p.as_slice());
            return Ok(StepType::FullNewton);
        }

        if grad.norm() == zero {
            // Dogleg is undefined for zero gradient, the only sensible step
            // is along the Newton direction.
            return if is_newton_valid {
                p.copy_from(newton);
                *p *= delta / newton_scaled_norm;
                debug!("take scaled Newton to boundary: {:?}", p.as_slice());
                Ok(StepType::ScaledNewton)
            } else {
                Err(TrustRegionError::NoValidStep)
            };
        }

        // Steepest descent in the scaled space: d = -D^-2 g.
        let scale_inv2 = scale.map(|s| one / (s * s));
        let descent = -grad.component_mul(&scale_inv2);

        // Minimizer of the quadratic model along the descent direction,
        // tau = g^T D^-2 g / d^T H d, unbounded if the curvature is not
        // positive.
        let curvature = descent.dot(&(&**hes * &descent));
        let g_descent = -grad.dot(&descent);
        let descent_scaled_norm = descent.component_mul(scale).norm();

        let tau = if curvature <= zero {
            delta / descent_scaled_norm
        } else {
            (g_descent / curvature).min(delta / descent_scaled_norm)
        };

        cauchy.copy_from(&descent);
        *cauchy *= tau;
        let cauchy_scaled_norm = cauchy.component_mul(scale).norm();

        if !is_newton_valid || cauchy_scaled_norm >= delta * convert(0.999_999) {
            // The Cauchy point is on the boundary or the Newton step is not
            // available. Take the (truncated) Cauchy step.
            p.copy_from(cauchy);
            if cauchy_scaled_norm > delta {
                *p *= delta / cauchy_scaled_norm;
            }
            debug!("take scaled Cauchy: {:?}", p.as_slice());
            return Ok(StepType::ScaledCauchy);
        }

        // Find alpha in (0, 1] such that || D (cauchy + alpha (newton - cauchy)) || = delta.
        // With a = || D diff ||^2, b = cauchy^T D^2 diff and c = || D cauchy ||^2 - delta^2 < 0,
        // the positive root of a alpha^2 + 2 b alpha + c is taken.
        let diff = &*newton - &*cauchy;
        let diff_scaled = diff.component_mul(scale);
        let a = diff_scaled.norm_squared();
        let b = cauchy.component_mul(scale).dot(&diff_scaled);
        let c_neg = delta * delta - cauchy_scaled_norm * cauchy_scaled_norm;
        let d = (b * b + a * c_neg).sqrt();

        // Muller's formula avoids cancellation for b > 0.
        let alpha = if b <= zero {
            (-b + d) / a
        } else {
            c_neg / (b + d)
        };

        p.copy_from(cauchy);
        p.axpy(alpha.min(one), &diff, one);
        debug!("take dogleg (alpha = {}): {:?}", alpha, p.as_slice());
        Ok(StepType::Dogleg)
    }

    /// Updates the trust region radius based on the gain ratio and the size of
    /// the taken step.
    fn update_delta(&mut self, gain_ratio: P::Field) {
        let TrustRegionOptions {
            delta_min,
            delta_max,
            shrink_thresh,
            expand_thresh,
            ..
        } = self.options;

        let p_scaled_norm = self.p.component_mul(&self.scale).norm();
        let delta_old = self.delta;

        if gain_ratio < shrink_thresh {
            self.delta = (delta_old * convert(0.25))
                .min(p_scaled_norm * convert(0.25))
                .max(delta_min);
            debug!("shrink delta from {} to {}", delta_old, self.delta);
        } else if gain_ratio > expand_thresh {
            self.delta = (delta_old * convert(2.0))
                .max(p_scaled_norm * convert(3.0))
                .min(delta_max);
            debug!("expand delta from {} to {}", delta_old, self.delta);
        }
    }
}

impl<F: Function> Optimizer<F> for TrustRegion<F> {
    const NAME: &'static str = "Trust-region";

    type Error = TrustRegionError;

    fn opt_next<Sx>(
        &mut self,
        f: &F,
        dom: &Domain<F::Field>,
        x: &mut Vector<F::Field, Dyn, Sx>,
    ) -> Result<F::Field, Self::Error>
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
    {
        let TrustRegionOptions {
            accept_thresh,
            rejections_thresh,
            eps_sqrt,
            eps_cbrt,
            ..
        } = self.options;

        let zero = F::Field::zero();

        let fx = f.apply(x);
        self.grad.compute(f, x, &self.scale, fx, eps_sqrt);
        self.hes.compute(f, x, &self.scale, fx, eps_cbrt);

        if self.delta == zero {
            self.delta = (self.grad.norm() * convert(0.1)).max(self.options.delta_min);
            debug!("estimated initial delta = {}", self.delta);
        }

        let step_type = self.compute_step()?;

        self.x_trial.copy_from(x);
        self.x_trial += &self.p;

        if dom.project(&mut self.x_trial) {
            debug!("trial point is not feasible, performing the projection");
            self.x_trial.sub_to(x, &mut self.p);
        }

        let fx_trial = f.apply(&self.x_trial);

        let gain_ratio = if fx_trial.is_finite() {
            // Reduction predicted by the quadratic model: -(g^T p + 1/2 p^T H p).
            let p = &self.p;
            let predicted = -(self.grad.dot(p) + p.dot(&(&*self.hes * p)) * convert(0.5));

            if predicted == zero {
                debug!("predicted gain = 0");
                zero
            } else {
                let actual = fx - fx_trial;
                debug!(
                    "gain ratio = {} / {} = {}",
                    actual,
                    predicted,
                    actual / predicted
                );
                actual / predicted
            }
        } else {
            debug!("trial point is invalid, gain ratio = 0");
            zero
        };

        let fx = if gain_ratio > accept_thresh {
            x.copy_from(&self.x_trial);
            self.rejections_cnt = 0;
            debug!("{:?} step accepted, fx = {}", step_type, fx_trial);
            fx_trial
        } else {
            self.rejections_cnt += 1;
            debug!(
                "{:?} step rejected ({} in a row)",
                step_type, self.rejections_cnt
            );

            if self.rejections_cnt == rejections_thresh {
                return Err(TrustRegionError::NoProgress);
            }

            fx
        };

        self.update_delta(gain_ratio);

        Ok(fx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::*;

    #[test]
    fn sphere_optimization() {
        let f = Sphere::new(4);
        let dom = f.domain();

        for x in f.initials() {
            let optimizer = TrustRegion::new(&f, &dom);
            let x = optimize(&f, &dom, optimizer, x, 0.0, 25, 1e-12).unwrap();
            assert!(f.is_optimum(&x, 1e-5));
        }
    }

    #[test]
    fn rosenbrock_optimization() {
        let f = ExtendedRosenbrock::new(2);
        let dom = f.domain();

        for x in f.initials() {
            let optimizer = TrustRegion::new(&f, &dom);
            optimize(&f, &dom, optimizer, x, 0.0, 500, 1e-3).unwrap();
        }
    }

    #[test]
    fn bounded_sphere_stays_in_domain() {
        // Minimum of the sphere is outside of the domain, the optimum is on
        // the boundary.
        let f = Sphere::with_domain(Domain::rect(vec![1.0, 2.0], vec![5.0, 5.0]));
        let dom = f.domain();
        let mut optimizer = TrustRegion::new(&f, &dom);
        let mut x = nalgebra::dvector![4.0, 4.0];

        let mut fx = f.apply(&x);
        for _ in 0..50 {
            match optimizer.opt_next(&f, &dom, &mut x) {
                Ok(value) => fx = value,
                Err(TrustRegionError::NoProgress) => break,
                Err(error) => panic!("{:?}", error),
            }
            assert!(dom.contains(&x));
        }

        approx::assert_abs_diff_eq!(fx, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn reset_restores_initial_delta() {
        let f = Sphere::new(2);
        let dom = f.domain();
        let mut options = TrustRegionOptions::default();
        options.set_delta_init(DeltaInit::Fixed(0.5));

        let mut optimizer = TrustRegion::with_options(&f, &dom, options);
        let mut x = nalgebra::dvector![10.0, 10.0];
        optimizer.opt_next(&f, &dom, &mut x).unwrap();
        assert!(optimizer.delta != 0.5);

        optimizer.reset();
        assert_eq!(optimizer.delta, 0.5);
    }
}
