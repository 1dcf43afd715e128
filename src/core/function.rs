use nalgebra::{storage::Storage, Dyn, IsContiguous, Vector};

use super::{base::Problem, system::System};

/// Definition of a function.
///
/// ## Defining a function
///
/// A function is any type that implements [`Function`] and [`Problem`] traits.
///
/// ```rust
/// use bemopt::nalgebra as na;
/// use bemopt::{Domain, Function, Problem};
/// use na::{Dyn, IsContiguous};
///
/// struct Paraboloid {
///     center: [f64; 2],
/// }
///
/// impl Problem for Paraboloid {
///     type Field = f64;
///
///     fn domain(&self) -> Domain<Self::Field> {
///         Domain::rect(vec![-10.0, -10.0], vec![10.0, 10.0])
///     }
/// }
///
/// impl Function for Paraboloid {
///     fn apply<Sx>(&self, x: &na::Vector<Self::Field, Dyn, Sx>) -> Self::Field
///     where
///         Sx: na::storage::Storage<Self::Field, Dyn> + IsContiguous,
///     {
///         (x[0] - self.center[0]).powi(2) + (x[1] - self.center[1]).powi(2)
///     }
/// }
/// ```
pub trait Function: Problem {
    /// Calculates the function value in given point.
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous;
}

impl<F> Function for F
where
    F: System,
{
    fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: Storage<Self::Field, Dyn> + IsContiguous,
    {
        self.norm(x)
    }
}
