//! Testing problems and utilities useful for benchmarking, debugging and smoke
//! testing.
//!
//! [`Sphere`] and [`ExtendedRosenbrock`] are recommended for first tests of
//! optimizers, [`ScalarRoot`] for one-dimensional solvers and
//! [`ConstrainedQuadratic`] for constrained optimizers.
//!
//! # References
//!
//! \[1\] [A Literature Survey of Benchmark Functions For Global Optimization
//! Problems](https://arxiv.org/abs/1308.4008)
//!
//! \[2\] [Numerical Optimization](https://link.springer.com/book/10.1007/978-0-387-40065-5)

#![allow(unused)]

use std::error::Error as StdError;

use nalgebra::{
    dvector,
    storage::{Storage, StorageMut},
    DVector, Dyn, IsContiguous, OVector, Vector,
};
use thiserror::Error;

use crate::core::{
    ConstrainedFunction, ConstraintKind, Domain, Function, Optimizer, Problem, Solver, System,
};

/// Extension of the [`Problem`] trait that provides additional information that
/// is useful for testing algorithms.
pub trait TestProblem: Problem {
    /// Standard initial values for the problem. Using the same initial values is
    /// essential for fair comparison of methods.
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>>;
}

/// Extension of the [`System`] trait that provides additional information that
/// is useful for testing solvers.
pub trait TestSystem: System + TestProblem {
    /// A set of roots (if known and finite). For testing if a given point is
    /// root, [`TestSystem::is_root`] should be used.
    fn roots(&self) -> Vec<OVector<Self::Field, Dyn>> {
        Vec::new()
    }

    /// Test if given point is a root of the system, given the tolerance `eps`.
    fn is_root<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>, eps: Self::Field) -> bool
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        let mut rx = x.clone_owned();
        self.eval(x, &mut rx);
        rx.norm() <= eps
    }
}

/// Extension of the [`Function`] trait that provides additional information
/// that is useful for testing optimizers.
pub trait TestFunction: Function + TestProblem {
    /// A set of global optima (if known and finite).
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        Vec::new()
    }

    /// Test if given point is a global optimum of the function, given the
    /// tolerance `eps`.
    fn is_optimum<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>, eps: Self::Field) -> bool
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous;
}

/// [Sphere function](https://en.wikipedia.org/wiki/Test_functions_for_optimization)
/// \[1\].
///
/// This is a simple paraboloid which can be used in early development and
/// sanity checking as it can be considered a trivial problem. With a custom
/// domain, the minimum can be pushed to the boundary.
#[derive(Debug, Clone)]
pub struct Sphere {
    dom: Domain<f64>,
}

impl Sphere {
    /// Initializes the function with given dimension.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "n must be greater than zero");
        Self {
            dom: Domain::unconstrained(n),
        }
    }

    /// Initializes the function on given domain.
    pub fn with_domain(dom: Domain<f64>) -> Self {
        Self { dom }
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Problem for Sphere {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        self.dom.clone()
    }
}

impl Function for Sphere {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        x.norm_squared()
    }
}

impl TestProblem for Sphere {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        let n = self.dom.dim();
        let init = DVector::from_iterator(n, (0..n).map(|i| if i % 2 == 0 { 10.0 } else { -10.0 }));

        vec![init]
    }
}

impl TestFunction for Sphere {
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::zeros(self.dom.dim())]
    }

    fn is_optimum<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>, eps: Self::Field) -> bool
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        self.apply(x).abs() <= eps
    }
}

/// [Extended Rosenbrock
/// function](https://en.wikipedia.org/wiki/Rosenbrock_function) \[1,2\].
///
/// The minimum lies in a long, narrow valley which makes it a good test of
/// the trust region management.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedRosenbrock {
    n: usize,
}

impl ExtendedRosenbrock {
    /// Initializes the function with given dimension.
    ///
    /// The dimension **must** be a multiplier of 2.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "n must be greater than zero");
        assert!(n % 2 == 0, "n must be a multiple of 2");
        Self { n }
    }
}

impl Default for ExtendedRosenbrock {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Problem for ExtendedRosenbrock {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::unconstrained(self.n)
    }
}

impl Function for ExtendedRosenbrock {
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        (0..(self.n / 2))
            .map(|i| {
                let x1 = x[2 * i];
                let x2 = x[2 * i + 1];
                100.0 * (x2 - x1 * x1).powi(2) + (1.0 - x1).powi(2)
            })
            .sum()
    }
}

impl TestProblem for ExtendedRosenbrock {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        let init1 = DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| if i % 2 == 0 { -1.2 } else { 1.0 }),
        );

        let init2 = DVector::from_iterator(
            self.n,
            (0..self.n).map(|i| if i % 2 == 0 { 6.39 } else { -0.221 }),
        );

        vec![init1, init2]
    }
}

impl TestFunction for ExtendedRosenbrock {
    fn optima(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![DVector::from_element(self.n, 1.0)]
    }

    fn is_optimum<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>, eps: Self::Field) -> bool
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        self.apply(x) <= eps
    }
}

#[derive(Debug, Clone, Copy)]
enum ScalarKind {
    Linear,
    Cubic,
    Cos,
}

/// Scalar equations for one-dimensional solvers. The default interval is
/// _[0, 3]_.
#[derive(Debug, Clone, Copy)]
pub struct ScalarRoot {
    kind: ScalarKind,
    bounds: (f64, f64),
}

impl ScalarRoot {
    /// _x - 1 = 0_.
    pub fn linear() -> Self {
        Self {
            kind: ScalarKind::Linear,
            bounds: (0.0, 3.0),
        }
    }

    /// _x^3 - 2 = 0_.
    pub fn cubic() -> Self {
        Self {
            kind: ScalarKind::Cubic,
            bounds: (0.0, 3.0),
        }
    }

    /// _cos(x) = 0_.
    pub fn cos() -> Self {
        Self {
            kind: ScalarKind::Cos,
            bounds: (0.0, 3.0),
        }
    }

    /// Changes the interval on which the equation is considered.
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.bounds = (lower, upper);
        self
    }
}

impl Problem for ScalarRoot {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::rect(vec![self.bounds.0], vec![self.bounds.1])
    }
}

impl System for ScalarRoot {
    fn eval<Sx, Srx>(
        &self,
        x: &Vector<Self::Field, Dyn, Sx>,
        rx: &mut Vector<Self::Field, Dyn, Srx>,
    ) where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
        Srx: StorageMut<Self::Field, Dyn>,
    {
        rx[0] = match self.kind {
            ScalarKind::Linear => x[0] - 1.0,
            ScalarKind::Cubic => x[0].powi(3) - 2.0,
            ScalarKind::Cos => x[0].cos(),
        };
    }
}

impl TestProblem for ScalarRoot {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![dvector![0.5], dvector![2.5]]
    }
}

impl TestSystem for ScalarRoot {
    fn roots(&self) -> Vec<OVector<Self::Field, Dyn>> {
        let root = match self.kind {
            ScalarKind::Linear => 1.0,
            ScalarKind::Cubic => 2f64.cbrt(),
            ScalarKind::Cos => std::f64::consts::FRAC_PI_2,
        };

        vec![dvector![root]]
    }
}

/// Quadratic functions of two variables with one linear constraint \[2\].
#[derive(Debug, Clone, Copy)]
pub struct ConstrainedQuadratic {
    center: [f64; 2],
    kind: ConstraintKind,
    rhs: f64,
}

impl ConstrainedQuadratic {
    /// Minimize _x^2 + y^2_ subject to _x + y = 1_. The optimum is
    /// _(0.5, 0.5)_.
    pub fn equality() -> Self {
        Self {
            center: [0.0, 0.0],
            kind: ConstraintKind::Equality,
            rhs: 1.0,
        }
    }

    /// Minimize _(x - 2)^2 + (y - 2)^2_ subject to _x + y <= 2_. The optimum is
    /// _(1, 1)_ with the constraint active.
    pub fn inequality() -> Self {
        Self {
            center: [2.0, 2.0],
            kind: ConstraintKind::Inequality,
            rhs: 2.0,
        }
    }

    /// Minimize _(x - 2)^2 + (y - 2)^2_ subject to _x + y <= 5_. The
    /// constraint is inactive in the optimum _(2, 2)_.
    pub fn inactive() -> Self {
        Self {
            center: [2.0, 2.0],
            kind: ConstraintKind::Inequality,
            rhs: 5.0,
        }
    }

    /// The optimum of the problem.
    pub fn optimum(&self) -> OVector<f64, Dyn> {
        let [cx, cy] = self.center;
        let excess = cx + cy - self.rhs;

        match self.kind {
            ConstraintKind::Inequality if excess <= 0.0 => dvector![cx, cy],
            _ => dvector![cx - excess / 2.0, cy - excess / 2.0],
        }
    }
}

impl Problem for ConstrainedQuadratic {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
    }
}

impl ConstrainedFunction for ConstrainedQuadratic {
    fn constraint_kinds(&self) -> Vec<ConstraintKind> {
        vec![self.kind]
    }

    fn eval_constrained<Sx, Scx>(
        &self,
        x: &Vector<Self::Field, Dyn, Sx>,
        cx: &mut Vector<Self::Field, Dyn, Scx>,
    ) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
        Scx: StorageMut<Self::Field, Dyn>,
    {
        cx[0] = x[0] + x[1] - self.rhs;
        (x[0] - self.center[0]).powi(2) + (x[1] - self.center[1]).powi(2)
    }
}

impl TestProblem for ConstrainedQuadratic {
    fn initials(&self) -> Vec<OVector<Self::Field, Dyn>> {
        vec![dvector![3.0, -1.0], dvector![-4.0, 4.5]]
    }
}

/// Solving or optimization error of the testing solver/optimizer driver (see
/// [`solve`] and [`optimize`]).
#[derive(Debug, Error)]
pub enum TestingError<E: StdError + 'static> {
    /// Error of the algorithm used.
    #[error("{0}")]
    Inner(#[from] E),
    /// Algorithm did not terminate.
    #[error("algorithm did not terminate")]
    Termination,
}

/// A simple solver driver that can be used in tests.
pub fn solve<R: TestSystem, S: Solver<R>>(
    r: &R,
    dom: &Domain<R::Field>,
    mut solver: S,
    mut x: OVector<R::Field, Dyn>,
    max_iters: usize,
    tolerance: R::Field,
) -> Result<OVector<R::Field, Dyn>, TestingError<S::Error>>
where
    S::Error: StdError,
{
    let mut rx = x.clone_owned();
    let mut iter = 0;

    loop {
        solver.solve_next(r, dom, &mut x, &mut rx)?;

        if rx.norm() <= tolerance {
            return Ok(x);
        }

        if iter == max_iters {
            return Err(TestingError::Termination);
        } else {
            iter += 1;
        }
    }
}

/// A simple optimizer driver that can be used in tests.
pub fn optimize<F: Function, O: Optimizer<F>>(
    f: &F,
    dom: &Domain<F::Field>,
    mut optimizer: O,
    mut x: OVector<F::Field, Dyn>,
    min: F::Field,
    max_iters: usize,
    tolerance: F::Field,
) -> Result<OVector<F::Field, Dyn>, TestingError<O::Error>>
where
    O::Error: StdError,
{
    let mut iter = 0;

    loop {
        let fx = optimizer.opt_next(f, dom, &mut x)?;

        if fx <= min + tolerance {
            // Converged.
            return Ok(x);
        }

        if iter == max_iters {
            return Err(TestingError::Termination);
        } else {
            iter += 1;
        }
    }
}
