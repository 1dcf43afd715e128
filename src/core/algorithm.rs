use nalgebra::{storage::StorageMut, Dyn, IsContiguous, Vector};

use super::{constrained::ConstrainedFunction, domain::Domain, function::Function, system::System};

/// Iterative root finder of a [`System`].
///
/// Each call to [`solve_next`](Solver::solve_next) takes the current point and
/// moves it closer to a point where all residuals vanish. The inflow angle of
/// a blade section is found this way.
pub trait Solver<R: System> {
    /// Name of the solver.
    const NAME: &'static str;

    /// Error while computing the next step.
    type Error;

    /// Does one iteration.
    ///
    /// On return, `x` is the new point and `rx` _must_ hold the residuals in
    /// it as computed by [`System::eval`].
    fn solve_next<Sx, Srx>(
        &mut self,
        r: &R,
        dom: &Domain<R::Field>,
        x: &mut Vector<R::Field, Dyn, Sx>,
        rx: &mut Vector<R::Field, Dyn, Srx>,
    ) -> Result<(), Self::Error>
    where
        Sx: StorageMut<R::Field, Dyn> + IsContiguous,
        Srx: StorageMut<R::Field, Dyn>;
}

/// Iterative minimizer of a [`Function`] on a bounded domain.
pub trait Optimizer<F: Function> {
    /// Name of the optimizer.
    const NAME: &'static str;

    /// Error while computing the next step.
    type Error;

    /// Does one iteration and returns the function value in the new point,
    /// as computed by [`Function::apply`].
    ///
    /// Implementations may rely on `x` being the point returned from the
    /// previous call.
    fn opt_next<Sx>(
        &mut self,
        f: &F,
        dom: &Domain<F::Field>,
        x: &mut Vector<F::Field, Dyn, Sx>,
    ) -> Result<F::Field, Self::Error>
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous;
}

/// Interface of an optimizer for constrained functions.
///
/// One call to [`copt_next`](ConstrainedOptimizer::copt_next) is one outer
/// iteration of the algorithm, which typically consists of many evaluations of
/// the function.
pub trait ConstrainedOptimizer<F: ConstrainedFunction> {
    /// Name of the optimizer.
    const NAME: &'static str;

    /// Error while computing the next step.
    type Error;

    /// Computes the next step in the optimization process.
    ///
    /// After the method returns, `x` holds the new point, `cx` _must_ contain
    /// the constraint values in that point and the return value _must_ be the
    /// objective value in that point, both as computed by
    /// [`ConstrainedFunction::eval_constrained`].
    fn copt_next<Sx, Scx>(
        &mut self,
        f: &F,
        dom: &Domain<F::Field>,
        x: &mut Vector<F::Field, Dyn, Sx>,
        cx: &mut Vector<F::Field, Dyn, Scx>,
    ) -> Result<F::Field, Self::Error>
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
        Scx: StorageMut<F::Field, Dyn>;
}
