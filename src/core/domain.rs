//! Problem domain definition (dimensionality, bounds, variable scale).

use std::iter::FromIterator;

use nalgebra::{
    convert, storage::StorageMut, ComplexField, Dim, DimName, Dyn, OVector, Storage, Vector, U1,
};
use num_traits::{One, Zero};

use super::base::RealField;

/// Domain of a problem.
///
/// The domain is a box given by lower and upper bounds for each variable.
/// Infinite bounds make the variable unbounded in that direction.
#[derive(Debug, Clone)]
pub struct Domain<T: RealField> {
    lower: OVector<T, Dyn>,
    upper: OVector<T, Dyn>,
    scale: Option<OVector<T, Dyn>>,
}

impl<T: RealField> Domain<T> {
    /// Creates an unconstrained domain of given dimensionality.
    pub fn unconstrained(dim: usize) -> Self {
        assert!(dim > 0, "empty domain");

        let inf: T = convert(f64::INFINITY);
        let n = Dyn(dim);

        Self {
            lower: OVector::from_element_generic(n, U1::name(), -inf),
            upper: OVector::from_element_generic(n, U1::name(), inf),
            scale: None,
        }
    }

    /// Creates a rectangular domain with given lower and upper bounds.
    ///
    /// The scale of the variables is estimated from the bounds. Use
    /// [`Domain::with_scale`] to override it.
    pub fn rect(lower: Vec<T>, upper: Vec<T>) -> Self {
        assert!(
            lower.len() == upper.len(),
            "lower and upper have different size"
        );
        assert!(!lower.is_empty(), "empty domain");

        let n = Dyn(lower.len());
        let scale = lower
            .iter()
            .zip(upper.iter())
            .map(|(l, u)| T::one() / estimate_magnitude_from_bounds(*l, *u));

        Self {
            scale: Some(OVector::from_iterator_generic(n, U1::name(), scale)),
            lower: OVector::from_vec_generic(n, U1::name(), lower),
            upper: OVector::from_vec_generic(n, U1::name(), upper),
        }
    }

    /// Sets a custom scale for the domain.
    ///
    /// Scale of a variable is the inverse of its expected magnitude.
    pub fn with_scale(mut self, scale: Vec<T>) -> Self {
        assert!(scale.len() == self.dim(), "scale has invalid dimension");

        let n = Dyn(self.dim());
        self.scale = Some(OVector::from_vec_generic(n, U1::name(), scale));
        self
    }

    /// Gets the dimensionality of the domain.
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Gets the lower bounds.
    pub fn lower(&self) -> &[T] {
        self.lower.as_slice()
    }

    /// Gets the upper bounds.
    pub fn upper(&self) -> &[T] {
        self.upper.as_slice()
    }

    /// Gets the scale if available.
    ///
    /// Scale is either provided by [`Domain::with_scale`] or estimated for a
    /// rectangular domain. For unconstrained domain, `None` is returned.
    pub fn scale(&self) -> Option<&OVector<T, Dyn>> {
        self.scale.as_ref()
    }

    /// Gets the scale or a vector of ones if not available.
    pub fn scale_or_ones(&self) -> OVector<T, Dyn> {
        self.scale
            .clone()
            .unwrap_or_else(|| OVector::from_element_generic(Dyn(self.dim()), U1::name(), T::one()))
    }

    /// Tests whether the point lies inside the domain.
    pub fn contains<D, Sx>(&self, x: &Vector<T, D, Sx>) -> bool
    where
        D: Dim,
        Sx: Storage<T, D>,
    {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .zip(x.iter())
            .all(|((li, ui), xi)| li <= xi && xi <= ui)
    }

    /// Projects given point into the domain. Returns `true` if the point was
    /// not feasible.
    pub fn project<D, Sx>(&self, x: &mut Vector<T, D, Sx>) -> bool
    where
        D: Dim,
        Sx: StorageMut<T, D>,
    {
        (0..self.dim()).fold(false, |not_feasible, i| {
            self.project_in(x, i) || not_feasible
        })
    }

    /// Projects given point into the domain in given dimension. Returns `true`
    /// if the component was not feasible.
    pub fn project_in<D, Sx>(&self, x: &mut Vector<T, D, Sx>, i: usize) -> bool
    where
        D: Dim,
        Sx: StorageMut<T, D>,
    {
        let li = self.lower[i];
        let ui = self.upper[i];
        let xi = &mut x[i];

        if *xi < li {
            *xi = li;
            true
        } else if *xi > ui {
            *xi = ui;
            true
        } else {
            false
        }
    }
}

impl<T: RealField> FromIterator<(T, T)> for Domain<T> {
    fn from_iter<I: IntoIterator<Item = (T, T)>>(iter: I) -> Self {
        let (lower, upper) = iter.into_iter().unzip();
        Self::rect(lower, upper)
    }
}

impl<T: RealField> FromIterator<T> for Domain<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let scale = iter
            .into_iter()
            .map(|magnitude| T::one() / magnitude)
            .collect::<Vec<_>>();

        Self::unconstrained(scale.len()).with_scale(scale)
    }
}

/// Estimates the order of magnitude of a variable given its bounds.
pub(crate) fn estimate_magnitude_from_bounds<T: RealField>(lower: T, upper: T) -> T {
    let ten: T = convert(10.0);
    let half: T = convert(0.5);

    let avg = half * (lower.abs() + upper.abs());
    let magnitude = ten.powf(avg.log10().trunc());

    // Range [0, 0] is allowed for fixing a variable to a value.
    if magnitude.is_finite() && magnitude > T::zero() {
        magnitude
    } else {
        T::one()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    #[test]
    fn magnitude() {
        assert_eq!(estimate_magnitude_from_bounds(-1e10f64, 1e10).log10(), 10.0);
        assert_eq!(estimate_magnitude_from_bounds(-1e4f64, -1e2).log10(), 3.0);
        assert_eq!(estimate_magnitude_from_bounds(0f64, 1e2).log10(), 1.0);
        assert_eq!(estimate_magnitude_from_bounds(0.0f64, 0.0), 1.0);
    }

    #[test]
    fn rect_scale_is_inverse_magnitude() {
        let dom = Domain::rect(vec![0.0, -500.0], vec![200.0, 500.0]);
        let scale = dom.scale().unwrap();

        assert_eq!(scale[0], 0.01);
        assert_eq!(scale[1], 0.01);
    }

    #[test]
    fn projection() {
        let dom: Domain<f64> = [(0.0, 1.0), (-1.0, 1.0), (2.0, 3.0)].into_iter().collect();
        let mut x = dvector![0.5, -5.0, 4.0];

        assert!(!dom.contains(&x));
        assert!(dom.project(&mut x));
        assert_eq!(x, dvector![0.5, -1.0, 3.0]);
        assert!(dom.contains(&x));
        assert!(!dom.project(&mut x));
    }

    #[test]
    fn unconstrained_contains_everything() {
        let dom = Domain::<f64>::unconstrained(2);
        assert!(dom.contains(&dvector![1e300, -1e300]));
        assert!(dom.scale().is_none());
        assert_eq!(dom.scale_or_ones(), dvector![1.0, 1.0]);
    }

    #[test]
    #[should_panic(expected = "lower and upper have different size")]
    fn rect_mismatch() {
        Domain::rect(vec![0.0], vec![1.0, 2.0]);
    }
}
