use super::domain::Domain;

/// Extension of the [`nalgebra::RealField`] trait with constants that are
/// used across the algorithms.
pub trait RealField: nalgebra::RealField + Copy {
    /// Square root of the machine epsilon. Standard relative step for
    /// approximating first-order derivatives.
    const EPSILON_SQRT: Self;

    /// Cubic root of the machine epsilon. Standard relative step for
    /// approximating second-order derivatives.
    const EPSILON_CBRT: Self;
}

impl RealField for f32 {
    const EPSILON_SQRT: Self = 0.00034526698;
    const EPSILON_CBRT: Self = 0.0049215667;
}

impl RealField for f64 {
    const EPSILON_SQRT: Self = 0.000000014901161193847656;
    const EPSILON_CBRT: Self = 0.0000060554544523933395;
}

/// The base trait for [`Function`](super::Function),
/// [`System`](super::System) and
/// [`ConstrainedFunction`](super::ConstrainedFunction).
pub trait Problem {
    /// Field type of the problem, f32 or f64.
    type Field: RealField;

    /// Gets the domain of the problem.
    fn domain(&self) -> Domain<Self::Field>;
}
