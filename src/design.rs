//! Design optimization of the propeller.
//!
//! A [`PropellerDesign`] selects which [inputs](Input) the optimizer may
//! change, which [output](Output) is minimized and which outputs are
//! constrained. Each quantity is given in a unit of its choice and is mapped
//! to the driver space as `(value + adder) * scaler`, so that the optimizer
//! works with variables, objective and constraints of comparable magnitude.
//!
//! Outputs of several nodes are flattened node by node. For per-section
//! outputs, index `node * num_radial + i` addresses section `i` of `node`.
//!
//! ```rust,no_run
//! use bemopt::airfoil::{AirfoilTable, Polar};
//! use bemopt::algo::AugmentedLagrangianOptions;
//! use bemopt::design::{optimize, Constraint, Convergence, DesignVariable, Objective, PropellerDesign};
//! use bemopt::model::{Input, Output, PropellerInputs, PropellerModel};
//!
//! # fn baseline() -> PropellerInputs { PropellerInputs::new(1, 6, 3) }
//! let airfoil = AirfoilTable::viterna(vec![Polar::thin_airfoil(5e5)], 1.3).unwrap();
//! let model = PropellerModel::new(airfoil, 6, 15).unwrap();
//!
//! let design = PropellerDesign::builder(model, baseline())
//!     .design_var(DesignVariable::new(Input::ChordDv).unit("cm").lower(1.0).upper(20.0).scaler(5e-2))
//!     .design_var(DesignVariable::new(Input::ThetaDv).lower(0.35).upper(1.57))
//!     .objective(Objective::new(Output::Efficiency).scaler(-1.0))
//!     .constraint(Constraint::new(Output::Thrust).unit("N").equals(700.0).scaler(1e-3))
//!     .build()
//!     .unwrap();
//!
//! let convergence = Convergence::new(1e-6, 1e-8, 50);
//! let result = optimize(&design, AugmentedLagrangianOptions::default(), |state| {
//!     convergence.is_done(&state)
//! })
//! .unwrap();
//!
//! println!("efficiency = {}", -result.objective);
//! ```

use std::{
    cell::Cell,
    collections::HashSet,
    time::{Duration, Instant},
};

use log::{debug, info};
use nalgebra::{
    storage::{Storage, StorageMut},
    Dyn, IsContiguous, Vector,
};
use thiserror::Error;

use crate::{
    airfoil::Airfoil,
    algo::{AugmentedLagrangian, AugmentedLagrangianError, AugmentedLagrangianOptions},
    core::{ConstrainedFunction, ConstraintKind, Domain, Problem},
    driver::{ConstrainedDriver, ConstrainedIterState},
    model::{Input, ModelError, Output, PropellerInputs, PropellerModel, Solution},
    units::{expect_dimension, Dimension, Unit, UnitError},
};

/// Error of the design problem.
#[derive(Debug, Error)]
pub enum DesignError {
    /// Error of the analysis.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// Invalid unit.
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// Error of the optimizer.
    #[error(transparent)]
    Optimizer(#[from] AugmentedLagrangianError),
    /// No design variable was added.
    #[error("no design variables")]
    NoDesignVariables,
    /// No objective was set.
    #[error("objective is missing")]
    MissingObjective,
    /// The same input was added as design variable twice.
    #[error("{0} is already a design variable")]
    DuplicateDesignVariable(Input),
    /// Lower bound is above the upper bound.
    #[error("invalid bounds of {name}: [{lower}, {upper}]")]
    InvalidBounds {
        /// Name of the quantity.
        name: &'static str,
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// Zero scaler.
    #[error("scaler of {0} must be nonzero")]
    ZeroScaler(&'static str),
    /// Constraint with neither equality target nor bounds.
    #[error("constraint on {0} has no bounds")]
    UnboundedConstraint(Output),
    /// Constraint with both equality target and bounds.
    #[error("constraint on {0} has both equality target and bounds")]
    EqualityWithBounds(Output),
    /// Index out of range of the output values.
    #[error("index {index} of {name} out of range, there are {len} values")]
    Index {
        /// Name of the output.
        name: &'static str,
        /// Requested index.
        index: usize,
        /// Number of values.
        len: usize,
    },
    /// The point has a wrong dimension.
    #[error("expected {expected} design values, got {actual}")]
    Dimension {
        /// Number of design values.
        expected: usize,
        /// Number of given values.
        actual: usize,
    },
}

/// Input changed by the optimizer.
#[derive(Debug, Clone)]
pub struct DesignVariable {
    input: Input,
    unit: Option<String>,
    lower: f64,
    upper: f64,
    scaler: f64,
    adder: f64,
}

impl DesignVariable {
    /// Unbounded design variable in SI units without scaling.
    pub fn new(input: Input) -> Self {
        Self {
            input,
            unit: None,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            scaler: 1.0,
            adder: 0.0,
        }
    }

    /// Unit of the bounds and of the scaling.
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Lower bound.
    pub fn lower(mut self, lower: f64) -> Self {
        self.lower = lower;
        self
    }

    /// Upper bound.
    pub fn upper(mut self, upper: f64) -> Self {
        self.upper = upper;
        self
    }

    /// Multiplier applied after the adder.
    pub fn scaler(mut self, scaler: f64) -> Self {
        self.scaler = scaler;
        self
    }

    /// Offset applied before the scaler.
    pub fn adder(mut self, adder: f64) -> Self {
        self.adder = adder;
        self
    }
}

/// Output value that is minimized.
#[derive(Debug, Clone)]
pub struct Objective {
    output: Output,
    index: usize,
    unit: Option<String>,
    scaler: f64,
    adder: f64,
}

impl Objective {
    /// Minimizes the first value of the output.
    pub fn new(output: Output) -> Self {
        Self {
            output,
            index: 0,
            unit: None,
            scaler: 1.0,
            adder: 0.0,
        }
    }

    /// Index into the flattened output values.
    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Unit in which the output is taken.
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Multiplier applied after the adder. Negative value maximizes.
    pub fn scaler(mut self, scaler: f64) -> Self {
        self.scaler = scaler;
        self
    }

    /// Offset applied before the scaler.
    pub fn adder(mut self, adder: f64) -> Self {
        self.adder = adder;
        self
    }
}

/// Constraint on output values.
///
/// Either an equality target, or a lower bound, an upper bound or both.
#[derive(Debug, Clone)]
pub struct Constraint {
    output: Output,
    indices: Option<Vec<usize>>,
    unit: Option<String>,
    equals: Option<f64>,
    lower: Option<f64>,
    upper: Option<f64>,
    scaler: f64,
    adder: f64,
}

impl Constraint {
    /// Constraint on all values of the output.
    pub fn new(output: Output) -> Self {
        Self {
            output,
            indices: None,
            unit: None,
            equals: None,
            lower: None,
            upper: None,
            scaler: 1.0,
            adder: 0.0,
        }
    }

    /// Constrains only the given indices of the flattened output values.
    pub fn indices<I: IntoIterator<Item = usize>>(mut self, indices: I) -> Self {
        self.indices = Some(indices.into_iter().collect());
        self
    }

    /// Unit of the target and bounds.
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Equality target. Cannot be combined with bounds.
    pub fn equals(mut self, value: f64) -> Self {
        self.equals = Some(value);
        self
    }

    /// Lower bound.
    pub fn lower(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }

    /// Upper bound.
    pub fn upper(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }

    /// Multiplier applied after the adder.
    pub fn scaler(mut self, scaler: f64) -> Self {
        self.scaler = scaler;
        self
    }

    /// Offset applied before the scaler.
    pub fn adder(mut self, adder: f64) -> Self {
        self.adder = adder;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Scaling {
    scaler: f64,
    adder: f64,
}

impl Scaling {
    fn new(name: &'static str, scaler: f64, adder: f64) -> Result<Self, DesignError> {
        if scaler == 0.0 || !scaler.is_finite() {
            return Err(DesignError::ZeroScaler(name));
        }

        Ok(Self { scaler, adder })
    }

    fn scale(&self, value: f64) -> f64 {
        (value + self.adder) * self.scaler
    }

    fn unscale(&self, value: f64) -> f64 {
        value / self.scaler - self.adder
    }

    // Bounds in the driver space, swapped for negative scaler.
    fn bounds(&self, lower: f64, upper: f64) -> (f64, f64) {
        let (lower, upper) = (self.scale(lower), self.scale(upper));
        if self.scaler < 0.0 {
            (upper, lower)
        } else {
            (lower, upper)
        }
    }
}

#[derive(Debug, Clone)]
struct ResolvedVariable {
    input: Input,
    unit: Unit,
    scaling: Scaling,
    offset: usize,
    len: usize,
}

#[derive(Debug, Clone)]
struct ResolvedObjective {
    output: Output,
    index: usize,
    unit: Unit,
    scaling: Scaling,
}

// One constraint row per index and bound, in the driver space.
#[derive(Debug, Clone, Copy)]
enum Row {
    Equals(f64),
    Lower(f64),
    Upper(f64),
}

impl Row {
    fn kind(&self) -> ConstraintKind {
        match self {
            Row::Equals(_) => ConstraintKind::Equality,
            Row::Lower(_) | Row::Upper(_) => ConstraintKind::Inequality,
        }
    }

    fn residual(&self, value: f64) -> f64 {
        match self {
            Row::Equals(target) => value - target,
            Row::Lower(lower) => lower - value,
            Row::Upper(upper) => value - upper,
        }
    }
}

#[derive(Debug, Clone)]
struct ResolvedConstraint {
    output: Output,
    unit: Unit,
    scaling: Scaling,
    indices: Vec<usize>,
    rows: Vec<Row>,
}

/// Builder of [`PropellerDesign`].
pub struct PropellerDesignBuilder<A> {
    model: PropellerModel<A>,
    baseline: PropellerInputs,
    design_vars: Vec<DesignVariable>,
    objective: Option<Objective>,
    constraints: Vec<Constraint>,
}

impl<A: Airfoil> PropellerDesignBuilder<A> {
    /// Adds a design variable. All values of the input are varied.
    pub fn design_var(mut self, var: DesignVariable) -> Self {
        self.design_vars.push(var);
        self
    }

    /// Sets the objective.
    pub fn objective(mut self, objective: Objective) -> Self {
        self.objective = Some(objective);
        self
    }

    /// Adds a constraint.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Validates the definition and builds the problem.
    pub fn build(self) -> Result<PropellerDesign<A>, DesignError> {
        if self.design_vars.is_empty() {
            return Err(DesignError::NoDesignVariables);
        }

        let num_nodes = self.baseline.num_nodes();
        let num_radial = self.model.num_radial();
        let output_len = |output: Output| {
            if output.is_rotor_level() {
                num_nodes
            } else {
                num_nodes * num_radial
            }
        };

        let mut seen = HashSet::new();
        let mut vars = Vec::with_capacity(self.design_vars.len());
        let mut lower = Vec::new();
        let mut upper = Vec::new();

        for var in self.design_vars {
            if !seen.insert(var.input) {
                return Err(DesignError::DuplicateDesignVariable(var.input));
            }

            let name = var.input.name();
            let unit = resolve_unit(var.unit.as_deref(), var.input.dimension())?;
            let scaling = Scaling::new(name, var.scaler, var.adder)?;

            if var.lower.is_nan() || var.upper.is_nan() || var.lower > var.upper {
                return Err(DesignError::InvalidBounds {
                    name,
                    lower: var.lower,
                    upper: var.upper,
                });
            }

            let len = self.baseline.si(var.input).len();
            let (lo, up) = scaling.bounds(var.lower, var.upper);
            lower.extend(std::iter::repeat(lo).take(len));
            upper.extend(std::iter::repeat(up).take(len));

            vars.push(ResolvedVariable {
                input: var.input,
                unit,
                scaling,
                offset: lower.len() - len,
                len,
            });
        }

        let objective = self.objective.ok_or(DesignError::MissingObjective)?;
        let len = output_len(objective.output);
        if objective.index >= len {
            return Err(DesignError::Index {
                name: objective.output.name(),
                index: objective.index,
                len,
            });
        }

        let objective = ResolvedObjective {
            output: objective.output,
            index: objective.index,
            unit: resolve_unit(objective.unit.as_deref(), objective.output.dimension())?,
            scaling: Scaling::new(objective.output.name(), objective.scaler, objective.adder)?,
        };

        let mut constraints = Vec::with_capacity(self.constraints.len());
        let mut kinds = Vec::new();

        for constraint in self.constraints {
            let output = constraint.output;
            let name = output.name();
            let unit = resolve_unit(constraint.unit.as_deref(), output.dimension())?;
            let scaling = Scaling::new(name, constraint.scaler, constraint.adder)?;

            let len = output_len(output);
            let indices = constraint.indices.unwrap_or_else(|| (0..len).collect());
            if let Some(&index) = indices.iter().find(|&&index| index >= len) {
                return Err(DesignError::Index { name, index, len });
            }

            let rows = match (constraint.equals, constraint.lower, constraint.upper) {
                (Some(target), None, None) => vec![Row::Equals(scaling.scale(target))],
                (Some(_), _, _) => return Err(DesignError::EqualityWithBounds(output)),
                (None, None, None) => return Err(DesignError::UnboundedConstraint(output)),
                (None, lower, upper) => {
                    let lo = lower.unwrap_or(f64::NEG_INFINITY);
                    let up = upper.unwrap_or(f64::INFINITY);

                    if lo.is_nan() || up.is_nan() || lo > up {
                        return Err(DesignError::InvalidBounds {
                            name,
                            lower: lo,
                            upper: up,
                        });
                    }

                    let (lo, up) = scaling.bounds(lo, up);
                    let mut rows = Vec::with_capacity(2);
                    if lo.is_finite() {
                        rows.push(Row::Lower(lo));
                    }
                    if up.is_finite() {
                        rows.push(Row::Upper(up));
                    }
                    rows
                }
            };

            for _ in &indices {
                kinds.extend(rows.iter().map(Row::kind));
            }

            constraints.push(ResolvedConstraint {
                output,
                unit,
                scaling,
                indices,
                rows,
            });
        }

        debug!(
            "design problem with {} variables and {} constraints",
            lower.len(),
            kinds.len()
        );

        Ok(PropellerDesign {
            model: self.model,
            baseline: self.baseline,
            vars,
            objective,
            constraints,
            kinds,
            lower,
            upper,
        })
    }
}

fn resolve_unit(unit: Option<&str>, dimension: Dimension) -> Result<Unit, UnitError> {
    expect_dimension(unit.unwrap_or(dimension.si_unit()), dimension)
}

/// Constrained design problem of the propeller.
///
/// The problem is a [`ConstrainedFunction`] in the scaled driver space.
/// Points where the analysis fails evaluate to NaN, which the optimizer
/// treats as infeasible.
pub struct PropellerDesign<A> {
    model: PropellerModel<A>,
    baseline: PropellerInputs,
    vars: Vec<ResolvedVariable>,
    objective: ResolvedObjective,
    constraints: Vec<ResolvedConstraint>,
    kinds: Vec<ConstraintKind>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl<A: Airfoil> PropellerDesign<A> {
    /// Starts the definition of a design problem. Inputs that are not design
    /// variables keep their values from `baseline`.
    pub fn builder(model: PropellerModel<A>, baseline: PropellerInputs) -> PropellerDesignBuilder<A> {
        PropellerDesignBuilder {
            model,
            baseline,
            design_vars: Vec::new(),
            objective: None,
            constraints: Vec::new(),
        }
    }

    /// The analysis model.
    pub fn model(&self) -> &PropellerModel<A> {
        &self.model
    }

    /// Inputs of the initial design.
    pub fn baseline(&self) -> &PropellerInputs {
        &self.baseline
    }

    /// Number of design values.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Initial point in the driver space.
    pub fn initial(&self) -> Result<Vec<f64>, DesignError> {
        let mut x = Vec::with_capacity(self.dim());

        for var in &self.vars {
            x.extend(
                self.baseline
                    .si(var.input)
                    .iter()
                    .map(|value| var.scaling.scale(var.unit.from_si(*value))),
            );
        }

        Ok(x)
    }

    /// Inputs corresponding to a point in the driver space.
    pub fn inputs_at(&self, x: &[f64]) -> Result<PropellerInputs, DesignError> {
        if x.len() != self.dim() {
            return Err(DesignError::Dimension {
                expected: self.dim(),
                actual: x.len(),
            });
        }

        let mut inputs = self.baseline.clone();

        for var in &self.vars {
            let values = x[var.offset..var.offset + var.len]
                .iter()
                .map(|value| var.scaling.unscale(*value))
                .collect::<Vec<_>>();

            inputs.set(var.input, &values, var.unit.name())?;
        }

        Ok(inputs)
    }

    /// Scaled objective and constraint values of a solution.
    pub fn scaled_values(&self, solution: &Solution) -> Result<(f64, Vec<f64>), DesignError> {
        let objective = &self.objective;
        let values = flattened(solution, objective.output, &objective.unit)?;
        let fx = objective.scaling.scale(values[objective.index]);

        let mut cx = Vec::with_capacity(self.kinds.len());
        for constraint in &self.constraints {
            let values = flattened(solution, constraint.output, &constraint.unit)?;

            for &index in &constraint.indices {
                let value = constraint.scaling.scale(values[index]);
                cx.extend(constraint.rows.iter().map(|row| row.residual(value)));
            }
        }

        Ok((fx, cx))
    }

    fn evaluate(&self, x: &[f64]) -> Result<(f64, Vec<f64>), DesignError> {
        let inputs = self.inputs_at(x)?;
        let solution = self.model.run(&inputs)?;
        self.scaled_values(&solution)
    }
}

// Values of all nodes, node by node.
fn flattened(solution: &Solution, output: Output, unit: &Unit) -> Result<Vec<f64>, ModelError> {
    let mut values = Vec::new();
    for node in 0..solution.num_nodes() {
        values.extend(solution.get_val(output, node, unit.name())?);
    }
    Ok(values)
}

impl<A: Airfoil> Problem for PropellerDesign<A> {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::rect(self.lower.clone(), self.upper.clone())
    }
}

impl<A: Airfoil> ConstrainedFunction for PropellerDesign<A> {
    fn constraint_kinds(&self) -> Vec<ConstraintKind> {
        self.kinds.clone()
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
        match self.evaluate(x.as_slice()) {
            Ok((fx, values)) => {
                for (ci, value) in cx.iter_mut().zip(values) {
                    *ci = value;
                }
                fx
            }
            Err(error) => {
                debug!("design evaluation failed: {}", error);
                cx.fill(f64::NAN);
                f64::NAN
            }
        }
    }
}

/// Outcome of [`optimize`].
#[derive(Debug, Clone)]
pub struct DesignResult {
    /// Final point in the driver space.
    pub x: Vec<f64>,
    /// Inputs of the final design.
    pub inputs: PropellerInputs,
    /// Analysis of the final design.
    pub solution: Solution,
    /// Scaled objective value.
    pub objective: f64,
    /// Scaled constraint values.
    pub constraints: Vec<f64>,
    /// Maximum constraint violation.
    pub violation: f64,
    /// Number of outer iterations.
    pub iterations: usize,
    /// Wall-clock duration of the optimization.
    pub elapsed: Duration,
}

/// Runs the augmented Lagrangian optimizer from the baseline design until
/// `stop` returns true.
pub fn optimize<A, C>(
    design: &PropellerDesign<A>,
    options: AugmentedLagrangianOptions<PropellerDesign<A>>,
    stop: C,
) -> Result<DesignResult, DesignError>
where
    A: Airfoil,
    C: Fn(ConstrainedIterState<'_, PropellerDesign<A>>) -> bool,
{
    let start = Instant::now();

    let mut driver = ConstrainedDriver::builder(design)
        .with_initial(design.initial()?)
        .with_algo(|f, dom| AugmentedLagrangian::with_options(f, dom, options))
        .build();

    let iterations = Cell::new(0);
    driver.find(|state| {
        iterations.set(state.iter() + 1);
        info!(
            "iteration {}: objective = {}, violation = {}",
            state.iter(),
            state.fx(),
            state.violation()
        );
        stop(state)
    })?;

    let x = driver.x().to_vec();
    let inputs = design.inputs_at(&x)?;
    let solution = design.model().run(&inputs)?;
    let elapsed = start.elapsed();

    info!(
        "optimization finished after {} iterations in {:?}",
        iterations.get(),
        elapsed
    );

    Ok(DesignResult {
        x,
        inputs,
        solution,
        objective: driver.fx(),
        constraints: driver.cx().to_vec(),
        violation: driver.violation(),
        iterations: iterations.get(),
        elapsed,
    })
}

/// Stopping criterion for [`optimize`].
///
/// Stops when the constraints are satisfied within `violation_tol` and the
/// objective changed by at most `ftol` since the previous iteration, or after
/// `max_iters` iterations.
#[derive(Debug)]
pub struct Convergence {
    violation_tol: f64,
    ftol: f64,
    max_iters: usize,
    previous: Cell<f64>,
}

impl Convergence {
    /// Creates the criterion.
    pub fn new(violation_tol: f64, ftol: f64, max_iters: usize) -> Self {
        Self {
            violation_tol,
            ftol,
            max_iters,
            previous: Cell::new(f64::INFINITY),
        }
    }

    /// Checks the state of an iteration. Must be called once per iteration.
    pub fn is_done<P: Problem<Field = f64>>(&self, state: &ConstrainedIterState<'_, P>) -> bool {
        let change = (self.previous.get() - state.fx()).abs();
        self.previous.set(state.fx());

        state.iter() + 1 >= self.max_iters
            || (state.violation() <= self.violation_tol && change <= self.ftol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::airfoil::{AirfoilTable, Polar};

    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::DVector;

    fn baseline() -> PropellerInputs {
        let mut inputs = PropellerInputs::new(1, 6, 3);
        inputs.fill(Input::Rho, 1.1, "kg/m**3").unwrap();
        inputs.fill(Input::Mu, 1.8e-5, "N/m**2*s").unwrap();
        inputs.fill(Input::Asound, 347.0, "m/s").unwrap();
        inputs.fill(Input::V, 77.2, "m/s").unwrap();
        inputs.fill(Input::Omega, 236.0, "rad/s").unwrap();
        inputs.fill(Input::HubDiameter, 30.0, "cm").unwrap();
        inputs.fill(Input::PropDiameter, 150.0, "cm").unwrap();
        inputs.fill(Input::ChordDv, 10.0, "cm").unwrap();
        inputs
            .set(Input::ThetaDv, &[65.0, 57.0, 49.0, 41.0, 33.0, 25.0], "deg")
            .unwrap();
        inputs
    }

    fn model() -> PropellerModel<AirfoilTable> {
        let airfoil = AirfoilTable::viterna(vec![Polar::thin_airfoil(5e5)], 1.3).unwrap();
        PropellerModel::new(airfoil, 6, 15).unwrap()
    }

    fn blade_design() -> PropellerDesign<AirfoilTable> {
        PropellerDesign::builder(model(), baseline())
            .design_var(
                DesignVariable::new(Input::ChordDv)
                    .unit("cm")
                    .lower(1.0)
                    .upper(20.0)
                    .scaler(5e-2),
            )
            .design_var(
                DesignVariable::new(Input::ThetaDv)
                    .lower(20f64.to_radians())
                    .upper(90f64.to_radians()),
            )
            .objective(Objective::new(Output::Efficiency).scaler(-1.0))
            .constraint(
                Constraint::new(Output::Thrust)
                    .unit("N")
                    .equals(700.0)
                    .scaler(1e-3)
                    .indices([0]),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn scaled_domain_and_initial_point() {
        let design = blade_design();
        let dom = design.domain();

        assert_eq!(design.dim(), 12);
        assert_relative_eq!(dom.lower()[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(dom.upper()[5], 1.0, epsilon = 1e-12);
        assert_relative_eq!(dom.lower()[6], 20f64.to_radians(), epsilon = 1e-12);

        let x0 = design.initial().unwrap();
        assert_relative_eq!(x0[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x0[6], 65f64.to_radians(), epsilon = 1e-12);

        let inputs = design.inputs_at(&x0).unwrap();
        for (actual, expected) in inputs
            .si(Input::ChordDv)
            .iter()
            .zip(baseline().si(Input::ChordDv))
        {
            assert_relative_eq!(*actual, *expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn negative_scaler_swaps_bounds() {
        let design = PropellerDesign::builder(model(), baseline())
            .design_var(
                DesignVariable::new(Input::V)
                    .lower(1.0)
                    .upper(3.0)
                    .scaler(-2.0),
            )
            .objective(Objective::new(Output::Thrust))
            .build()
            .unwrap();

        let dom = design.domain();
        assert_eq!(dom.lower(), &[-6.0]);
        assert_eq!(dom.upper(), &[-2.0]);

        let inputs = design.inputs_at(&[-4.0]).unwrap();
        assert_abs_diff_eq!(inputs.si(Input::V)[0], 2.0, epsilon = 1e-15);
    }

    #[test]
    fn objective_and_constraints_are_scaled() {
        let design = blade_design();
        let solution = model().run(&baseline()).unwrap();
        let thrust = solution.get_val(Output::Thrust, 0, "N").unwrap()[0];
        let efficiency = solution.get_val(Output::Efficiency, 0, "").unwrap()[0];

        let x0 = DVector::from_vec(design.initial().unwrap());
        let mut cx = DVector::zeros(1);
        let fx = design.eval_constrained(&x0, &mut cx);

        assert_eq!(design.constraint_kinds(), vec![ConstraintKind::Equality]);
        assert_relative_eq!(fx, -efficiency, epsilon = 1e-10);
        assert_relative_eq!(cx[0], (thrust - 700.0) * 1e-3, epsilon = 1e-10);
    }

    #[test]
    fn two_sided_constraint_rows() {
        let design = PropellerDesign::builder(model(), baseline())
            .design_var(DesignVariable::new(Input::Pitch).unit("deg").lower(-5.0).upper(5.0))
            .objective(Objective::new(Output::Power).unit("kW"))
            .constraint(Constraint::new(Output::Chord).unit("cm").lower(2.0).upper(8.0))
            .constraint(Constraint::new(Output::Torque).upper(500.0))
            .build()
            .unwrap();

        let kinds = design.constraint_kinds();
        assert_eq!(kinds.len(), 15 * 2 + 1);
        assert!(kinds.iter().all(|kind| *kind == ConstraintKind::Inequality));

        let x0 = DVector::from_vec(design.initial().unwrap());
        let mut cx = DVector::zeros(kinds.len());
        design.eval_constrained(&x0, &mut cx);

        // Chord is 10 cm everywhere: above the upper bound, within the lower.
        assert_relative_eq!(cx[0], 2.0 - 10.0, epsilon = 1e-10);
        assert_relative_eq!(cx[1], 10.0 - 8.0, epsilon = 1e-10);
    }

    #[test]
    fn failed_analysis_is_nan() {
        let design = PropellerDesign::builder(model(), baseline())
            .design_var(DesignVariable::new(Input::PropDiameter).unit("cm"))
            .objective(Objective::new(Output::Efficiency).scaler(-1.0))
            .constraint(Constraint::new(Output::Thrust).lower(0.0))
            .build()
            .unwrap();

        // Propeller smaller than the hub.
        let x = DVector::from_vec(vec![10.0]);
        let mut cx = DVector::zeros(1);
        let fx = design.eval_constrained(&x, &mut cx);

        assert!(fx.is_nan());
        assert!(cx[0].is_nan());
    }

    #[test]
    fn build_errors() {
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .objective(Objective::new(Output::Thrust))
                .build(),
            Err(DesignError::NoDesignVariables)
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V))
                .build(),
            Err(DesignError::MissingObjective)
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::ChordDv).unit("rad"))
                .objective(Objective::new(Output::Thrust))
                .build(),
            Err(DesignError::Unit(UnitError::IncompatibleUnits { .. }))
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V))
                .design_var(DesignVariable::new(Input::V))
                .objective(Objective::new(Output::Thrust))
                .build(),
            Err(DesignError::DuplicateDesignVariable(Input::V))
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V).lower(2.0).upper(1.0))
                .objective(Objective::new(Output::Thrust))
                .build(),
            Err(DesignError::InvalidBounds { name: "v", .. })
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V).scaler(0.0))
                .objective(Objective::new(Output::Thrust))
                .build(),
            Err(DesignError::ZeroScaler("v"))
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V))
                .objective(Objective::new(Output::Thrust).index(1))
                .build(),
            Err(DesignError::Index {
                name: "thrust",
                index: 1,
                len: 1
            })
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V))
                .objective(Objective::new(Output::Thrust))
                .constraint(Constraint::new(Output::Np).upper(1.0).indices([15]))
                .build(),
            Err(DesignError::Index {
                name: "Np",
                index: 15,
                len: 15
            })
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V))
                .objective(Objective::new(Output::Thrust))
                .constraint(Constraint::new(Output::Torque))
                .build(),
            Err(DesignError::UnboundedConstraint(Output::Torque))
        ));
        assert!(matches!(
            PropellerDesign::builder(model(), baseline())
                .design_var(DesignVariable::new(Input::V))
                .objective(Objective::new(Output::Thrust))
                .constraint(Constraint::new(Output::Thrust).equals(700.0).lower(600.0))
                .build(),
            Err(DesignError::EqualityWithBounds(Output::Thrust))
        ));
    }

    #[test]
    fn wrong_point_dimension() {
        let design = blade_design();
        assert!(matches!(
            design.inputs_at(&[0.5; 3]),
            Err(DesignError::Dimension {
                expected: 12,
                actual: 3
            })
        ));
    }

    #[test]
    fn pitch_for_required_thrust() {
        let mut target_inputs = baseline();
        target_inputs.fill(Input::Pitch, 2.0, "deg").unwrap();
        let target = model().run(&target_inputs).unwrap();
        let thrust = target.get_val(Output::Thrust, 0, "N").unwrap()[0];

        // Only one pitch satisfies the thrust equality.
        let design = PropellerDesign::builder(model(), baseline())
            .design_var(DesignVariable::new(Input::Pitch).unit("deg").lower(-10.0).upper(10.0))
            .objective(Objective::new(Output::Efficiency).scaler(-1.0))
            .constraint(Constraint::new(Output::Thrust).equals(thrust).scaler(1e-3))
            .build()
            .unwrap();

        let convergence = Convergence::new(1e-8, 1e-10, 30);
        let result = optimize(&design, AugmentedLagrangianOptions::default(), |state| {
            convergence.is_done(&state)
        })
        .unwrap();

        assert!(result.violation < 1e-6);
        assert!(result.iterations <= 30);
        assert_abs_diff_eq!(
            result.inputs.get(Input::Pitch, "deg").unwrap()[0],
            2.0,
            epsilon = 1e-2
        );

        let efficiency = result.solution.get_val(Output::Efficiency, 0, "").unwrap()[0];
        assert_relative_eq!(-result.objective, efficiency, epsilon = 1e-8);
    }
}
