use nalgebra::{
    storage::{Storage, StorageMut},
    Dyn, IsContiguous, Vector,
};

use super::base::Problem;

/// Definition of a system of equations.
///
/// ## Defining a system
///
/// A system is any type that implements [`System`] and [`Problem`] traits. A
/// one-dimensional system is how a scalar residual (such as the inflow angle
/// residual of a blade section) is expressed.
///
/// ```rust
/// use bemopt::nalgebra as na;
/// use bemopt::{Domain, Problem, System};
/// use na::{Dyn, IsContiguous};
///
/// struct Cubic;
///
/// impl Problem for Cubic {
///     type Field = f64;
///
///     fn domain(&self) -> Domain<Self::Field> {
///         Domain::rect(vec![0.0], vec![3.0])
///     }
/// }
///
/// impl System for Cubic {
///     fn eval<Sx, Srx>(
///         &self,
///         x: &na::Vector<Self::Field, Dyn, Sx>,
///         rx: &mut na::Vector<Self::Field, Dyn, Srx>,
///     ) where
///         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
///         Srx: na::storage::StorageMut<Self::Field, Dyn>,
///     {
///         rx[0] = x[0].powi(3) - 2.0;
///     }
/// }
/// ```
pub trait System: Problem {
    /// Calculates the system residuals in given point.
    fn eval<Sx, Srx>(
        &self,
        x: &Vector<Self::Field, Dyn, Sx>,
        rx: &mut Vector<Self::Field, Dyn, Srx>,
    ) where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
        Srx: StorageMut<Self::Field, Dyn>;

    /// Calculates the system residuals vector norm.
    ///
    /// The default implementation allocates a temporary vector for the
    /// residuals on every call.
    fn norm<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        let mut rx = x.clone_owned();
        self.eval(x, &mut rx);
        rx.norm()
    }
}
