use nalgebra::{
    storage::{Storage, StorageMut},
    ComplexField, Dyn, IsContiguous, RealField as _, Vector,
};
use num_traits::Zero;

use super::{base::Problem, RealField};

/// Kind of a general (non-bound) constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Satisfied when _c(x) = 0_.
    Equality,
    /// Satisfied when _c(x) <= 0_.
    Inequality,
}

impl ConstraintKind {
    /// Amount by which a constraint value violates the constraint.
    pub fn violation<T: RealField>(&self, cx: T) -> T {
        match self {
            ConstraintKind::Equality => cx.abs(),
            ConstraintKind::Inequality => cx.max(T::zero()),
        }
    }
}

/// Definition of a function subject to general constraints on top of the
/// domain bounds.
///
/// ```rust
/// use bemopt::nalgebra as na;
/// use bemopt::{ConstrainedFunction, ConstraintKind, Domain, Problem};
/// use na::{Dyn, IsContiguous};
///
/// // Minimize x^2 + y^2 subject to x + y = 1.
/// struct ClosestOnLine;
///
/// impl Problem for ClosestOnLine {
///     type Field = f64;
///
///     fn domain(&self) -> Domain<Self::Field> {
///         Domain::unconstrained(2)
///     }
/// }
///
/// impl ConstrainedFunction for ClosestOnLine {
///     fn constraint_kinds(&self) -> Vec<ConstraintKind> {
///         vec![ConstraintKind::Equality]
///     }
///
///     fn eval_constrained<Sx, Scx>(
///         &self,
///         x: &na::Vector<Self::Field, Dyn, Sx>,
///         cx: &mut na::Vector<Self::Field, Dyn, Scx>,
///     ) -> Self::Field
///     where
///         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
///         Scx: na::storage::StorageMut<Self::Field, Dyn>,
///     {
///         cx[0] = x[0] + x[1] - 1.0;
///         x[0].powi(2) + x[1].powi(2)
///     }
/// }
/// ```
pub trait ConstrainedFunction: Problem {
    /// Kinds of the constraints in the order in which they are evaluated.
    fn constraint_kinds(&self) -> Vec<ConstraintKind>;

    /// Calculates the objective value and the constraint values in given
    /// point.
    fn eval_constrained<Sx, Scx>(
        &self,
        x: &Vector<Self::Field, Dyn, Sx>,
        cx: &mut Vector<Self::Field, Dyn, Scx>,
    ) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
        Scx: StorageMut<Self::Field, Dyn>;
}

/// Maximum violation over all constraints.
pub fn max_violation<T, Scx>(kinds: &[ConstraintKind], cx: &Vector<T, Dyn, Scx>) -> T
where
    T: RealField,
    Scx: Storage<T, Dyn>,
{
    kinds
        .iter()
        .zip(cx.iter())
        .fold(T::zero(), |max, (kind, ci)| max.max(kind.violation(*ci)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    #[test]
    fn violation_by_kind() {
        assert_eq!(ConstraintKind::Equality.violation(-2.0), 2.0);
        assert_eq!(ConstraintKind::Inequality.violation(-2.0), 0.0);
        assert_eq!(ConstraintKind::Inequality.violation(0.5), 0.5);
    }

    #[test]
    fn max_violation_over_constraints() {
        let kinds = [
            ConstraintKind::Equality,
            ConstraintKind::Inequality,
            ConstraintKind::Inequality,
        ];
        let cx = dvector![-0.1, -3.0, 0.25];

        assert_eq!(max_violation(&kinds, &cx), 0.25);
    }
}
