//! High-level API for solving and optimization.
//!
//! This module contains "drivers" that encapsulate all internal state and
//! provide a simple API to run the iterative process for solving, optimization
//! or constrained optimization. This documentation describes usage for the
//! constrained optimization, but the API is basically the same for the others.
//!
//! The simplest way of using the driver is to initialize it with the defaults:
//!
//! ```rust
//! use bemopt::ConstrainedDriver;
//! # use bemopt::nalgebra as na;
//! # use bemopt::{ConstrainedFunction, ConstraintKind, Domain, Problem};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct ClosestOnLine;
//! #
//! # impl Problem for ClosestOnLine {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
//! #     }
//! # }
//! #
//! # impl ConstrainedFunction for ClosestOnLine {
//! #     fn constraint_kinds(&self) -> Vec<ConstraintKind> {
//! #         vec![ConstraintKind::Equality]
//! #     }
//! #
//! #     fn eval_constrained<Sx, Scx>(
//! #         &self,
//! #         x: &na::Vector<Self::Field, Dyn, Sx>,
//! #         cx: &mut na::Vector<Self::Field, Dyn, Scx>,
//! #     ) -> Self::Field
//! #     where
//! #         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//! #         Scx: na::storage::StorageMut<Self::Field, Dyn>,
//! #     {
//! #         cx[0] = x[0] + x[1] - 1.0;
//! #         x[0].powi(2) + x[1].powi(2)
//! #     }
//! # }
//!
//! let f = ClosestOnLine;
//!
//! let mut optimizer = ConstrainedDriver::new(&f);
//! ```
//!
//! If you need to specify additional settings, use the builder:
//!
//! ```rust
//! use bemopt::ConstrainedDriver;
//! use bemopt::algo::AugmentedLagrangian;
//! # use bemopt::nalgebra as na;
//! # use bemopt::{ConstrainedFunction, ConstraintKind, Domain, Problem};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct ClosestOnLine;
//! #
//! # impl Problem for ClosestOnLine {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
//! #     }
//! # }
//! #
//! # impl ConstrainedFunction for ClosestOnLine {
//! #     fn constraint_kinds(&self) -> Vec<ConstraintKind> {
//! #         vec![ConstraintKind::Equality]
//! #     }
//! #
//! #     fn eval_constrained<Sx, Scx>(
//! #         &self,
//! #         x: &na::Vector<Self::Field, Dyn, Sx>,
//! #         cx: &mut na::Vector<Self::Field, Dyn, Scx>,
//! #     ) -> Self::Field
//! #     where
//! #         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//! #         Scx: na::storage::StorageMut<Self::Field, Dyn>,
//! #     {
//! #         cx[0] = x[0] + x[1] - 1.0;
//! #         x[0].powi(2) + x[1].powi(2)
//! #     }
//! # }
//!
//! let f = ClosestOnLine;
//!
//! let mut optimizer = ConstrainedDriver::builder(&f)
//!     .with_initial(vec![3.0, -1.0])
//!     .with_algo(AugmentedLagrangian::new)
//!     .build();
//! ```
//!
//! Once you have the optimizer, you can use it to find the optimum:
//!
//! ```rust
//! # use bemopt::nalgebra as na;
//! # use bemopt::{ConstrainedDriver, ConstrainedFunction, ConstraintKind, Domain, Problem};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct ClosestOnLine;
//! #
//! # impl Problem for ClosestOnLine {
//! #     type Field = f64;
//! #
//! #     fn domain(&self) -> Domain<Self::Field> {
//! #         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
//! #     }
//! # }
//! #
//! # impl ConstrainedFunction for ClosestOnLine {
//! #     fn constraint_kinds(&self) -> Vec<ConstraintKind> {
//! #         vec![ConstraintKind::Equality]
//! #     }
//! #
//! #     fn eval_constrained<Sx, Scx>(
//! #         &self,
//! #         x: &na::Vector<Self::Field, Dyn, Sx>,
//! #         cx: &mut na::Vector<Self::Field, Dyn, Scx>,
//! #     ) -> Self::Field
//! #     where
//! #         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
//! #         Scx: na::storage::StorageMut<Self::Field, Dyn>,
//! #     {
//! #         cx[0] = x[0] + x[1] - 1.0;
//! #         x[0].powi(2) + x[1].powi(2)
//! #     }
//! # }
//! #
//! # let f = ClosestOnLine;
//! #
//! # let mut optimizer = ConstrainedDriver::new(&f);
//! #
//! let result = optimizer.find(|state| state.violation() <= 1e-8 || state.iter() >= 20);
//! ```
//!
//! If you need more control over the iteration process, you can do the
//! iterations manually using the `next` method of the driver.

use nalgebra::{convert, DimName, Dyn, OVector, U1};

use crate::{
    algo::{augmented_lagrangian::InnerTrustRegion, AugmentedLagrangian, Brent, TrustRegion},
    core::max_violation,
    ConstrainedFunction, ConstrainedOptimizer, ConstraintKind, Domain, Function, Optimizer,
    Problem, Solver, System,
};

struct Builder<'a, F: Problem, A> {
    f: &'a F,
    dom: Domain<F::Field>,
    algo: A,
    x0: OVector<F::Field, Dyn>,
}

impl<'a, F: Problem, A> Builder<'a, F, A> {
    fn new<FA>(f: &'a F, factory: FA) -> Self
    where
        FA: FnOnce(&F, &Domain<F::Field>) -> A,
    {
        let dom = f.domain();
        let algo = factory(f, &dom);

        let dim = Dyn(dom.dim());
        let x0 = OVector::from_element_generic(dim, U1::name(), convert(0.0));

        Self { f, dom, algo, x0 }
    }

    fn with_initial(mut self, x0: Vec<F::Field>) -> Self {
        let dim = Dyn(self.dom.dim());
        self.x0 = OVector::from_vec_generic(dim, U1::name(), x0);
        self
    }

    fn with_algo<S2, FA>(self, factory: FA) -> Builder<'a, F, S2>
    where
        FA: FnOnce(&F, &Domain<F::Field>) -> S2,
    {
        let algo = factory(self.f, &self.dom);

        Builder {
            f: self.f,
            dom: self.dom,
            algo,
            x0: self.x0,
        }
    }

    fn build(mut self) -> Self {
        self.dom.project(&mut self.x0);
        self
    }
}

/// Builder for the [`SolverDriver`].
pub struct SolverBuilder<'a, F: Problem, A>(Builder<'a, F, A>);

impl<'a, F: Problem, A> SolverBuilder<'a, F, A> {
    /// Sets the initial point from which the iterative process starts.
    pub fn with_initial(self, x0: Vec<F::Field>) -> Self {
        Self(self.0.with_initial(x0))
    }

    /// Sets specific algorithm to be used.
    ///
    /// This builder method accepts a closure that takes the reference to the
    /// problem and its domain. For many algorithms in bemopt, you can simply
    /// pass the `new` constructor directly (e.g., `Steffensen::new`).
    pub fn with_algo<S2, FA>(self, factory: FA) -> SolverBuilder<'a, F, S2>
    where
        FA: FnOnce(&F, &Domain<F::Field>) -> S2,
    {
        SolverBuilder(self.0.with_algo(factory))
    }

    /// Builds the [`SolverDriver`].
    pub fn build(self) -> SolverDriver<'a, F, A> {
        let Builder { f, dom, algo, x0 } = self.0.build();
        let rx = x0.clone_owned();

        SolverDriver {
            f,
            dom,
            algo,
            x: x0,
            rx,
        }
    }
}

/// The driver for the process of solving a system of equations.
///
/// The default algorithm is [`Brent`], so the default driver is suitable for
/// scalar equations on a bounded interval. For the usage of the driver, see
/// [module](self) documentation.
pub struct SolverDriver<'a, F: Problem, A> {
    f: &'a F,
    dom: Domain<F::Field>,
    algo: A,
    x: OVector<F::Field, Dyn>,
    rx: OVector<F::Field, Dyn>,
}

impl<'a, F: Problem> SolverDriver<'a, F, Brent<F>> {
    /// Returns the builder for specifying additional settings.
    pub fn builder(f: &'a F) -> SolverBuilder<'a, F, Brent<F>> {
        SolverBuilder(Builder::new(f, Brent::new))
    }

    /// Initializes the driver with the default settings.
    pub fn new(f: &'a F) -> Self {
        SolverDriver::builder(f).build()
    }
}

impl<'a, F: Problem, S> SolverDriver<'a, F, S> {
    /// Returns reference to the current point.
    pub fn x(&self) -> &[F::Field] {
        self.x.as_slice()
    }

    /// Returns reference to the current residuals.
    pub fn rx(&self) -> &[F::Field] {
        self.rx.as_slice()
    }

    /// Returns norm of the residuals.
    pub fn norm(&self) -> F::Field {
        self.rx.norm()
    }

    /// Returns reference to the used algorithm.
    pub fn algo(&self) -> &S {
        &self.algo
    }
}

impl<'a, F: System, A: Solver<F>> SolverDriver<'a, F, A> {
    /// Does one iteration of the process, returning the norm of the residuals
    /// in case of no error.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<(&[F::Field], F::Field), A::Error> {
        self.algo
            .solve_next(self.f, &self.dom, &mut self.x, &mut self.rx)?;
        Ok((self.x.as_slice(), self.rx.norm()))
    }

    /// Runs the iterative process until given stopping criterion is satisfied.
    pub fn find<C>(&mut self, stop: C) -> Result<(&[F::Field], F::Field), A::Error>
    where
        C: Fn(SolverIterState<'_, F, A>) -> bool,
    {
        let mut iter = 0;

        loop {
            let norm = self.next()?.1;

            let state = SolverIterState {
                x: &self.x,
                rx: &self.rx,
                algo: &self.algo,
                iter,
            };

            if stop(state) {
                return Ok((self.x.as_slice(), norm));
            }

            iter += 1;
        }
    }

    /// Returns the name of the used solver.
    pub fn name(&self) -> &str {
        A::NAME
    }
}

/// State of the current iteration.
pub struct SolverIterState<'a, F: Problem, A> {
    x: &'a OVector<F::Field, Dyn>,
    rx: &'a OVector<F::Field, Dyn>,
    algo: &'a A,
    iter: usize,
}

impl<'a, F: Problem, A> SolverIterState<'a, F, A> {
    /// Returns reference to the current point.
    pub fn x(&self) -> &[F::Field] {
        self.x.as_slice()
    }

    /// Returns reference to the current residuals.
    pub fn rx(&self) -> &[F::Field] {
        self.rx.as_slice()
    }

    /// Returns norm of the residuals.
    pub fn norm(&self) -> F::Field {
        self.rx.norm()
    }

    /// Returns reference to the used algorithm, for algorithm-specific
    /// stopping criteria.
    pub fn algo(&self) -> &A {
        self.algo
    }

    /// Returns the current iteration number.
    pub fn iter(&self) -> usize {
        self.iter
    }
}

/// Builder for the [`OptimizerDriver`].
pub struct OptimizerBuilder<'a, F: Problem, A>(Builder<'a, F, A>);

impl<'a, F: Problem, A> OptimizerBuilder<'a, F, A> {
    /// Sets the initial point from which the iterative process starts.
    pub fn with_initial(self, x0: Vec<F::Field>) -> Self {
        Self(self.0.with_initial(x0))
    }

    /// Sets specific algorithm to be used.
    ///
    /// This builder method accepts a closure that takes the reference to the
    /// problem and its domain. For many algorithms in bemopt, you can simply
    /// pass the `new` constructor directly (e.g., `TrustRegion::new`).
    pub fn with_algo<S2, FA>(self, factory: FA) -> OptimizerBuilder<'a, F, S2>
    where
        FA: FnOnce(&F, &Domain<F::Field>) -> S2,
    {
        OptimizerBuilder(self.0.with_algo(factory))
    }

    /// Builds the [`OptimizerDriver`].
    pub fn build(self) -> OptimizerDriver<'a, F, A> {
        let Builder { f, dom, algo, x0 } = self.0.build();

        OptimizerDriver {
            f,
            dom,
            algo,
            x: x0,
            fx: convert(f64::INFINITY),
        }
    }
}

/// The driver for the process of function optimization.
///
/// For default settings, use [`OptimizerDriver::new`]. For more flexibility,
/// use [`OptimizerDriver::builder`]. For the usage of the driver, see
/// [module](self) documentation.
pub struct OptimizerDriver<'a, F: Problem, A> {
    f: &'a F,
    dom: Domain<F::Field>,
    algo: A,
    x: OVector<F::Field, Dyn>,
    fx: F::Field,
}

impl<'a, F: Problem> OptimizerDriver<'a, F, TrustRegion<F>> {
    /// Returns the builder for specifying additional settings.
    pub fn builder(f: &'a F) -> OptimizerBuilder<'a, F, TrustRegion<F>> {
        OptimizerBuilder(Builder::new(f, TrustRegion::new))
    }

    /// Initializes the driver with the default settings.
    pub fn new(f: &'a F) -> Self {
        OptimizerDriver::builder(f).build()
    }
}

impl<'a, F: Problem, A> OptimizerDriver<'a, F, A> {
    /// Returns reference to the current point.
    pub fn x(&self) -> &[F::Field] {
        self.x.as_slice()
    }

    /// Returns the current function value.
    pub fn fx(&self) -> F::Field {
        self.fx
    }
}

impl<'a, F: Function, A: Optimizer<F>> OptimizerDriver<'a, F, A> {
    /// Does one iteration of the process, returning the function value in case
    /// of no error.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<(&[F::Field], F::Field), A::Error> {
        self.fx = self.algo.opt_next(self.f, &self.dom, &mut self.x)?;
        Ok((self.x.as_slice(), self.fx))
    }

    /// Runs the iterative process until given stopping criterion is satisfied.
    pub fn find<C>(&mut self, stop: C) -> Result<(&[F::Field], F::Field), A::Error>
    where
        C: Fn(OptimizerIterState<'_, F>) -> bool,
    {
        let mut iter = 0;

        loop {
            self.next()?;

            let state = OptimizerIterState {
                x: &self.x,
                fx: self.fx,
                iter,
            };

            if stop(state) {
                return Ok((self.x.as_slice(), self.fx));
            }

            iter += 1;
        }
    }

    /// Returns the name of the used optimizer.
    pub fn name(&self) -> &str {
        A::NAME
    }
}

/// State of the current iteration.
pub struct OptimizerIterState<'a, F: Problem> {
    x: &'a OVector<F::Field, Dyn>,
    fx: F::Field,
    iter: usize,
}

impl<'a, F: Problem> OptimizerIterState<'a, F> {
    /// Returns reference to the current point.
    pub fn x(&self) -> &[F::Field] {
        self.x.as_slice()
    }

    /// Returns the current function value.
    pub fn fx(&self) -> F::Field {
        self.fx
    }

    /// Returns the current iteration number.
    pub fn iter(&self) -> usize {
        self.iter
    }
}

/// Builder for the [`ConstrainedDriver`].
pub struct ConstrainedBuilder<'a, F: Problem, A>(Builder<'a, F, A>);

impl<'a, F: ConstrainedFunction, A> ConstrainedBuilder<'a, F, A> {
    /// Sets the initial point from which the iterative process starts.
    pub fn with_initial(self, x0: Vec<F::Field>) -> Self {
        Self(self.0.with_initial(x0))
    }

    /// Sets specific algorithm to be used.
    ///
    /// This builder method accepts a closure that takes the reference to the
    /// problem and its domain, such as `AugmentedLagrangian::new`.
    pub fn with_algo<S2, FA>(self, factory: FA) -> ConstrainedBuilder<'a, F, S2>
    where
        FA: FnOnce(&F, &Domain<F::Field>) -> S2,
    {
        ConstrainedBuilder(self.0.with_algo(factory))
    }

    /// Builds the [`ConstrainedDriver`].
    pub fn build(self) -> ConstrainedDriver<'a, F, A> {
        let Builder { f, dom, algo, x0 } = self.0.build();
        let kinds = f.constraint_kinds();
        let cx = OVector::from_element_generic(
            Dyn(kinds.len()),
            U1::name(),
            convert(f64::INFINITY),
        );

        ConstrainedDriver {
            f,
            dom,
            algo,
            x: x0,
            fx: convert(f64::INFINITY),
            cx,
            kinds,
        }
    }
}

/// The driver for the process of constrained optimization.
///
/// For default settings, use [`ConstrainedDriver::new`]. For more
/// flexibility, use [`ConstrainedDriver::builder`]. For the usage of the
/// driver, see [module](self) documentation.
pub struct ConstrainedDriver<'a, F: Problem, A> {
    f: &'a F,
    dom: Domain<F::Field>,
    algo: A,
    x: OVector<F::Field, Dyn>,
    fx: F::Field,
    cx: OVector<F::Field, Dyn>,
    kinds: Vec<ConstraintKind>,
}

impl<'a, F: ConstrainedFunction> ConstrainedDriver<'a, F, AugmentedLagrangian<F, InnerTrustRegion>> {
    /// Returns the builder for specifying additional settings.
    pub fn builder(f: &'a F) -> ConstrainedBuilder<'a, F, AugmentedLagrangian<F, InnerTrustRegion>> {
        ConstrainedBuilder(Builder::new(f, AugmentedLagrangian::new))
    }

    /// Initializes the driver with the default settings.
    pub fn new(f: &'a F) -> Self {
        ConstrainedDriver::builder(f).build()
    }
}

impl<'a, F: Problem, A> ConstrainedDriver<'a, F, A> {
    /// Returns reference to the current point.
    pub fn x(&self) -> &[F::Field] {
        self.x.as_slice()
    }

    /// Returns the current objective value.
    pub fn fx(&self) -> F::Field {
        self.fx
    }

    /// Returns reference to the current constraint values.
    pub fn cx(&self) -> &[F::Field] {
        self.cx.as_slice()
    }

    /// Returns the maximum violation of the constraints.
    pub fn violation(&self) -> F::Field {
        max_violation(&self.kinds, &self.cx)
    }

    /// Returns reference to the used algorithm.
    pub fn algo(&self) -> &A {
        &self.algo
    }
}

impl<'a, F: ConstrainedFunction, A: ConstrainedOptimizer<F>> ConstrainedDriver<'a, F, A> {
    /// Does one iteration of the process, returning the objective value in
    /// case of no error.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<(&[F::Field], F::Field), A::Error> {
        self.fx = self
            .algo
            .copt_next(self.f, &self.dom, &mut self.x, &mut self.cx)?;
        Ok((self.x.as_slice(), self.fx))
    }

    /// Runs the iterative process until given stopping criterion is satisfied.
    pub fn find<C>(&mut self, stop: C) -> Result<(&[F::Field], F::Field), A::Error>
    where
        C: Fn(ConstrainedIterState<'_, F>) -> bool,
    {
        let mut iter = 0;

        loop {
            self.next()?;

            let state = ConstrainedIterState {
                x: &self.x,
                fx: self.fx,
                cx: &self.cx,
                kinds: &self.kinds,
                iter,
            };

            if stop(state) {
                return Ok((self.x.as_slice(), self.fx));
            }

            iter += 1;
        }
    }

    /// Returns the name of the used optimizer.
    pub fn name(&self) -> &str {
        A::NAME
    }
}

/// State of the current iteration.
pub struct ConstrainedIterState<'a, F: Problem> {
    x: &'a OVector<F::Field, Dyn>,
    fx: F::Field,
    cx: &'a OVector<F::Field, Dyn>,
    kinds: &'a [ConstraintKind],
    iter: usize,
}

impl<'a, F: Problem> ConstrainedIterState<'a, F> {
    /// Returns reference to the current point.
    pub fn x(&self) -> &[F::Field] {
        self.x.as_slice()
    }

    /// Returns the current objective value.
    pub fn fx(&self) -> F::Field {
        self.fx
    }

    /// Returns reference to the current constraint values.
    pub fn cx(&self) -> &[F::Field] {
        self.cx.as_slice()
    }

    /// Returns the maximum violation of the constraints.
    pub fn violation(&self) -> F::Field {
        max_violation(self.kinds, self.cx)
    }

    /// Returns the current iteration number.
    pub fn iter(&self) -> usize {
        self.iter
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        algo::{brent::BrentError, Steffensen},
        testing::{ConstrainedQuadratic, ScalarRoot, Sphere},
    };

    use super::*;

    use approx::assert_abs_diff_eq;

    struct WithDomain(pub Domain<f64>);

    impl Problem for WithDomain {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            self.0.clone()
        }
    }

    #[test]
    fn solver_basic_use_case() {
        let r = ScalarRoot::cos();
        let mut solver = SolverDriver::new(&r);

        let (x, _) = solver
            .find(|state| state.iter() >= 100 || state.algo().is_converged())
            .unwrap();

        assert_abs_diff_eq!(x[0], std::f64::consts::FRAC_PI_2, epsilon = 1e-10);
    }

    #[test]
    fn solver_custom() {
        let r = ScalarRoot::cubic();
        let mut solver = SolverDriver::builder(&r)
            .with_algo(Steffensen::new)
            .with_initial(vec![1.5])
            .build();

        let tolerance = 1e-10;
        let (_, norm) = solver
            .find(|state| state.iter() >= 100 || state.norm() < tolerance)
            .unwrap();

        assert!(norm <= tolerance);
    }

    #[test]
    fn solver_error() {
        let r = ScalarRoot::cos().with_bounds(1.0, 2.0);
        let mut solver = SolverDriver::new(&r);
        assert!(solver.next().is_ok());

        let r = ScalarRoot::cos().with_bounds(2.0, 3.0);
        let mut solver = SolverDriver::new(&r);
        assert!(matches!(solver.next(), Err(BrentError::NoBracket)));
    }

    #[test]
    fn solver_initial_in_domain() {
        let f = WithDomain(Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]));
        let solver = SolverDriver::builder(&f)
            .with_initial(vec![10.0, -10.0])
            .build();

        assert_eq!(solver.x(), &[1.0, 0.0]);
    }

    #[test]
    fn optimizer_basic_use_case() {
        let f = Sphere::new(4);
        let mut optimizer = OptimizerDriver::builder(&f)
            // Zeros are the optimum for sphere, there would be no point is such
            // test.
            .with_initial(vec![10.0; 4])
            .build();

        let tolerance = 1e-6;
        let (_, value) = optimizer
            .find(|state| state.iter() >= 100 || state.fx() < tolerance)
            .unwrap();

        assert!(value <= tolerance);
    }

    #[test]
    fn optimizer_initial() {
        let x0 = vec![10.0; 4];

        let f = Sphere::new(4);
        let optimizer = OptimizerDriver::builder(&f)
            .with_initial(x0.clone())
            .build();

        assert_eq!(optimizer.x(), &x0);
    }

    #[test]
    fn optimizer_initial_in_domain() {
        let f = WithDomain(Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]));
        let optimizer = OptimizerDriver::builder(&f)
            .with_initial(vec![10.0, -10.0])
            .build();

        assert_eq!(optimizer.x(), &[1.0, 0.0]);
    }

    #[test]
    fn constrained_basic_use_case() {
        let f = ConstrainedQuadratic::equality();
        let mut optimizer = ConstrainedDriver::builder(&f)
            .with_initial(vec![3.0, -1.0])
            .build();

        let (x, fx) = optimizer
            .find(|state| state.iter() >= 30 || state.violation() < 1e-6)
            .unwrap();

        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(x[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(fx, 0.5, epsilon = 1e-4);
        assert!(optimizer.violation() < 1e-6);
    }

    #[test]
    fn constrained_state_before_iteration() {
        let f = ConstrainedQuadratic::inequality();
        let optimizer = ConstrainedDriver::builder(&f)
            .with_initial(vec![10.0, 0.0])
            .build();

        // The initial point is projected into the domain.
        assert_eq!(optimizer.x(), &[5.0, 0.0]);
        assert_eq!(optimizer.cx().len(), 1);
        assert!(optimizer.fx().is_infinite());
        assert_eq!(optimizer.name(), "Augmented Lagrangian");
    }
}
