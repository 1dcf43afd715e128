//! Finite difference approximations of derivatives.
//!
//! The step in each component is computed relatively to the magnitude of the
//! variable. To avoid problems when a variable is close to zero, its typical
//! magnitude (the inverse of the scale from the [domain](crate::Domain)) is
//! taken instead.

use std::ops::Deref;

use nalgebra::{
    storage::Storage, storage::StorageMut, ComplexField, DimName, Dyn, IsContiguous, OMatrix, OVector,
    RealField as _, Vector, U1,
};
use num_traits::{One, Zero};

use crate::core::{Function, Problem, RealField};

/// Computes the step size for finite difference in given component.
fn step_size<T: RealField>(xi: T, scale_i: T, eps: T) -> T {
    let magnitude = T::one() / scale_i;
    let step = eps * xi.abs().max(magnitude) * T::one().copysign(xi);

    if step == T::zero() {
        eps
    } else {
        step
    }
}

/// Gradient vector of a function.
#[derive(Debug)]
pub struct Gradient<F: Problem> {
    grad: OVector<F::Field, Dyn>,
}

impl<F: Problem> Gradient<F> {
    /// Initializes the gradient vector with zeros.
    pub fn zeros(dim: usize) -> Self {
        Self {
            grad: OVector::zeros_generic(Dyn(dim), U1::name()),
        }
    }
}

impl<F: Function> Gradient<F> {
    /// Computes the gradient vector of the function in given point. See
    /// [`compute`](Gradient::compute) for more details.
    pub fn new<Sx, Sscale>(
        f: &F,
        x: &mut Vector<F::Field, Dyn, Sx>,
        scale: &Vector<F::Field, Dyn, Sscale>,
        fx: F::Field,
    ) -> Self
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
        Sscale: Storage<F::Field, Dyn>,
    {
        let mut grad = Self::zeros(x.nrows());
        grad.compute(f, x, scale, fx, F::Field::EPSILON_SQRT);
        grad
    }

    /// Computes the gradient vector of the function in given point with given
    /// scale of variables, using forward differences with relative step `eps`.
    ///
    /// The value of `x` is temporarily mutated, but it is exactly the same
    /// after the method returns.
    pub fn compute<Sx, Sscale>(
        &mut self,
        f: &F,
        x: &mut Vector<F::Field, Dyn, Sx>,
        scale: &Vector<F::Field, Dyn, Sscale>,
        fx: F::Field,
        eps: F::Field,
    ) -> &mut Self
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
        Sscale: Storage<F::Field, Dyn>,
    {
        for i in 0..x.nrows() {
            let xi = x[i];
            let step = step_size(xi, scale[i], eps);

            x[i] = xi + step;
            let fxi = f.apply(x);
            self.grad[i] = (fxi - fx) / step;

            x[i] = xi;
        }

        self
    }
}

impl<F: Problem> Deref for Gradient<F> {
    type Target = OVector<F::Field, Dyn>;

    fn deref(&self) -> &Self::Target {
        &self.grad
    }
}

/// Hessian matrix of a function.
#[derive(Debug)]
pub struct Hessian<F: Problem> {
    hes: OMatrix<F::Field, Dyn, Dyn>,
    steps: OVector<F::Field, Dyn>,
    neighbors: OVector<F::Field, Dyn>,
}

impl<F: Problem> Hessian<F> {
    /// Initializes the Hessian matrix with zeros.
    pub fn zeros(dim: usize) -> Self {
        Self {
            hes: OMatrix::zeros_generic(Dyn(dim), Dyn(dim)),
            steps: OVector::zeros_generic(Dyn(dim), U1::name()),
            neighbors: OVector::zeros_generic(Dyn(dim), U1::name()),
        }
    }
}

impl<F: Function> Hessian<F> {
    /// Computes the Hessian matrix of the function in given point. See
    /// [`compute`](Hessian::compute) for more details.
    pub fn new<Sx, Sscale>(
        f: &F,
        x: &mut Vector<F::Field, Dyn, Sx>,
        scale: &Vector<F::Field, Dyn, Sscale>,
        fx: F::Field,
    ) -> Self
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
        Sscale: Storage<F::Field, Dyn>,
    {
        let mut hes = Self::zeros(x.nrows());
        hes.compute(f, x, scale, fx, F::Field::EPSILON_CBRT);
        hes
    }

    /// Computes the Hessian matrix of the function in given point with given
    /// scale of variables, using forward differences with relative step `eps`.
    ///
    /// Needs _n (n + 3) / 2_ function evaluations. The value of `x` is
    /// temporarily mutated, but it is exactly the same after the method
    /// returns.
    pub fn compute<Sx, Sscale>(
        &mut self,
        f: &F,
        x: &mut Vector<F::Field, Dyn, Sx>,
        scale: &Vector<F::Field, Dyn, Sscale>,
        fx: F::Field,
        eps: F::Field,
    ) -> &mut Self
    where
        Sx: StorageMut<F::Field, Dyn> + IsContiguous,
        Sscale: Storage<F::Field, Dyn>,
    {
        let n = x.nrows();

        // f(x + h_i e_i) for all i.
        for i in 0..n {
            let xi = x[i];
            let step = step_size(xi, scale[i], eps);
            self.steps[i] = step;

            x[i] = xi + step;
            self.neighbors[i] = f.apply(x);
            x[i] = xi;
        }

        for i in 0..n {
            let xi = x[i];
            let hi = self.steps[i];
            let fi = self.neighbors[i];

            // H_ii = (f(x + 2 h_i e_i) - 2 f(x + h_i e_i) + f(x)) / h_i^2
            x[i] = xi + hi + hi;
            let fii = f.apply(x);
            self.hes[(i, i)] = ((fx - fi) + (fii - fi)) / (hi * hi);

            // H_ij = (f(x + h_i e_i + h_j e_j) - f(x + h_i e_i) - f(x + h_j e_j) + f(x)) / (h_i h_j)
            x[i] = xi + hi;
            for j in (i + 1)..n {
                let xj = x[j];
                let hj = self.steps[j];
                let fj = self.neighbors[j];

                x[j] = xj + hj;
                let fij = f.apply(x);
                x[j] = xj;

                let hij = ((fx - fi) + (fij - fj)) / (hi * hj);
                self.hes[(i, j)] = hij;
                self.hes[(j, i)] = hij;
            }

            x[i] = xi;
        }

        self
    }
}

impl<F: Problem> Deref for Hessian<F> {
    type Target = OMatrix<F::Field, Dyn, Dyn>;

    fn deref(&self) -> &Self::Target {
        &self.hes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Domain;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    struct MixedVars;

    impl Problem for MixedVars {
        type Field = f64;

        fn domain(&self) -> Domain<Self::Field> {
            Domain::unconstrained(2)
        }
    }

    impl Function for MixedVars {
        fn apply<Sx>(&self, x: &Vector<Self::Field, Dyn, Sx>) -> Self::Field
        where
            Sx: Storage<Self::Field, Dyn> + IsContiguous,
        {
            // Produces Hessian with non-zero off-diagonal elements.
            x[0].powi(2) + x[0] * x[1] + x[1].powi(3)
        }
    }

    #[test]
    fn mixed_vars_gradient() {
        let mut x = dvector![3.0, -3.0];
        let scale = dvector![1.0, 1.0];

        let f = MixedVars;
        let fx = f.apply(&x);
        let grad = Gradient::new(&f, &mut x, &scale, fx);

        assert_abs_diff_eq!(&*grad, &dvector![3.0, 30.0], epsilon = 1e-5);
        assert_eq!(x, dvector![3.0, -3.0]);
    }

    #[test]
    fn mixed_vars_hessian() {
        let mut x = dvector![3.0, -3.0];
        let scale = dvector![1.0, 1.0];

        let f = MixedVars;
        let fx = f.apply(&x);
        let hes = Hessian::new(&f, &mut x, &scale, fx);

        assert_abs_diff_eq!(&*hes, &dmatrix![2.0, 1.0; 1.0, -18.0], epsilon = 1e-3);
        assert_eq!(x, dvector![3.0, -3.0]);
    }

    #[test]
    fn step_in_zero() {
        let mut x = dvector![0.0, 0.0];
        let scale = dvector![1.0, 1.0];

        let f = MixedVars;
        let fx = f.apply(&x);
        let grad = Gradient::new(&f, &mut x, &scale, fx);

        assert_abs_diff_eq!(&*grad, &dvector![0.0, 0.0], epsilon = 1e-5);
    }
}
