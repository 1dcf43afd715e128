//! Propeller analysis model with unit-aware inputs and outputs.
//!
//! [`PropellerInputs`] hold the independent variables of the analysis for
//! `num_nodes` operating points. [`PropellerModel`] evaluates the blade
//! geometry, the inflow and the blade element momentum solution for every
//! node and returns a [`Solution`] from which all quantities can be read in
//! any compatible unit.
//!
//! ```rust
//! use bemopt::airfoil::{AirfoilTable, Polar};
//! use bemopt::model::{Input, Output, PropellerInputs, PropellerModel};
//!
//! let airfoil = AirfoilTable::viterna(vec![Polar::thin_airfoil(5e5)], 1.3).unwrap();
//! let model = PropellerModel::new(airfoil, 6, 15).unwrap();
//!
//! let mut inputs = PropellerInputs::new(1, 6, 3);
//! inputs.fill(Input::Rho, 1.1, "kg/m**3").unwrap();
//! inputs.fill(Input::Mu, 1.8e-5, "N/m**2*s").unwrap();
//! inputs.fill(Input::Asound, 347.0, "m/s").unwrap();
//! inputs.fill(Input::V, 77.2, "m/s").unwrap();
//! inputs.fill(Input::Omega, 2250.0, "rpm").unwrap();
//! inputs.fill(Input::HubDiameter, 30.0, "cm").unwrap();
//! inputs.fill(Input::PropDiameter, 150.0, "cm").unwrap();
//! inputs.fill(Input::ChordDv, 10.0, "cm").unwrap();
//! inputs
//!     .set(Input::ThetaDv, &[65.0, 57.0, 49.0, 41.0, 33.0, 25.0], "deg")
//!     .unwrap();
//!
//! let solution = model.run(&inputs).unwrap();
//! let thrust = solution.get_val(Output::Thrust, 0, "N").unwrap();
//! assert!(thrust[0] > 0.0);
//! ```

use std::fmt;

use log::debug;
use thiserror::Error;

use crate::{
    airfoil::Airfoil,
    bem::{Bem, BemOptions, OperatingPoint, Performance, Rotor, Section, SectionOutputs},
    geometry::{BladeGeometry, Geometry, GeometryError},
    inflow::{simple_inflow, Inflow},
    units::{expect_dimension, Dimension, UnitError},
};

/// Error of the propeller model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Invalid unit.
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// Invalid geometry.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// Wrong number of values.
    #[error("{name} expects {expected} values, got {actual}")]
    Length {
        /// Name of the quantity.
        name: &'static str,
        /// Required number of values.
        expected: usize,
        /// Number of given values.
        actual: usize,
    },
    /// Node index out of range.
    #[error("node {node} out of range, there are {num_nodes} nodes")]
    Node {
        /// Requested node.
        node: usize,
        /// Number of nodes.
        num_nodes: usize,
    },
}

/// Independent variable of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Air density, per node.
    Rho,
    /// Dynamic viscosity, per node.
    Mu,
    /// Speed of sound, per node.
    Asound,
    /// Freestream velocity, per node.
    V,
    /// Rotation speed, per node.
    Omega,
    /// Hub diameter, per node.
    HubDiameter,
    /// Propeller diameter, per node.
    PropDiameter,
    /// Collective pitch, per node.
    Pitch,
    /// Precone angle, scalar.
    Precone,
    /// Chord control points.
    ChordDv,
    /// Twist control points.
    ThetaDv,
}

impl Input {
    /// All inputs.
    pub const ALL: [Input; 11] = [
        Input::Rho,
        Input::Mu,
        Input::Asound,
        Input::V,
        Input::Omega,
        Input::HubDiameter,
        Input::PropDiameter,
        Input::Pitch,
        Input::Precone,
        Input::ChordDv,
        Input::ThetaDv,
    ];

    /// Name of the input.
    pub fn name(&self) -> &'static str {
        match self {
            Input::Rho => "rho",
            Input::Mu => "mu",
            Input::Asound => "asound",
            Input::V => "v",
            Input::Omega => "omega",
            Input::HubDiameter => "hub_diameter",
            Input::PropDiameter => "prop_diameter",
            Input::Pitch => "pitch",
            Input::Precone => "precone",
            Input::ChordDv => "chord_dv",
            Input::ThetaDv => "theta_dv",
        }
    }

    /// Physical dimension of the input.
    pub fn dimension(&self) -> Dimension {
        match self {
            Input::Rho => Dimension::Density,
            Input::Mu => Dimension::DynamicViscosity,
            Input::Asound | Input::V => Dimension::Velocity,
            Input::Omega => Dimension::AngularVelocity,
            Input::HubDiameter | Input::PropDiameter | Input::ChordDv => Dimension::Length,
            Input::Pitch | Input::Precone | Input::ThetaDv => Dimension::Angle,
        }
    }

    fn len(&self, num_nodes: usize, num_cp: usize) -> usize {
        match self {
            Input::Precone => 1,
            Input::ChordDv | Input::ThetaDv => num_cp,
            _ => num_nodes,
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values of the independent variables, stored in SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct PropellerInputs {
    num_nodes: usize,
    num_cp: usize,
    num_blades: usize,
    values: Vec<Vec<f64>>,
}

impl PropellerInputs {
    /// Creates the inputs with all values zero.
    pub fn new(num_nodes: usize, num_cp: usize, num_blades: usize) -> Self {
        let values = Input::ALL
            .iter()
            .map(|input| vec![0.0; input.len(num_nodes, num_cp)])
            .collect();

        Self {
            num_nodes,
            num_cp,
            num_blades,
            values,
        }
    }

    /// Number of operating points.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of control points of chord and twist.
    pub fn num_cp(&self) -> usize {
        self.num_cp
    }

    /// Number of blades.
    pub fn num_blades(&self) -> usize {
        self.num_blades
    }

    /// Sets the number of blades.
    pub fn set_num_blades(&mut self, num_blades: usize) {
        self.num_blades = num_blades;
    }

    /// Sets all values of an input given in `unit`.
    pub fn set(&mut self, input: Input, values: &[f64], unit: &str) -> Result<(), ModelError> {
        let unit = expect_dimension(unit, input.dimension())?;
        let slot = &mut self.values[index(input)];

        if values.len() != slot.len() {
            return Err(ModelError::Length {
                name: input.name(),
                expected: slot.len(),
                actual: values.len(),
            });
        }

        for (dst, src) in slot.iter_mut().zip(values.iter()) {
            *dst = unit.to_si(*src);
        }

        Ok(())
    }

    /// Sets all values of an input to the same value given in `unit`.
    pub fn fill(&mut self, input: Input, value: f64, unit: &str) -> Result<(), ModelError> {
        let unit = expect_dimension(unit, input.dimension())?;
        self.values[index(input)].fill(unit.to_si(value));
        Ok(())
    }

    /// Gets the values of an input in `unit`.
    pub fn get(&self, input: Input, unit: &str) -> Result<Vec<f64>, ModelError> {
        let unit = expect_dimension(unit, input.dimension())?;
        Ok(self.values[index(input)]
            .iter()
            .map(|value| unit.from_si(*value))
            .collect())
    }

    /// Values of an input in SI units.
    pub fn si(&self, input: Input) -> &[f64] {
        &self.values[index(input)]
    }
}

// Position in `Input::ALL`.
fn index(input: Input) -> usize {
    input as usize
}

/// Computed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    /// Radii of the sections.
    Radii,
    /// Widths of the sections.
    Dradii,
    /// Section chords.
    Chord,
    /// Section twist.
    Theta,
    /// Axial inflow velocity.
    Vx,
    /// Tangential inflow velocity.
    Vy,
    /// Normal load per unit length of one blade.
    Np,
    /// Tangential load per unit length of one blade.
    Tp,
    /// Axial induction factor.
    A,
    /// Tangential induction factor.
    Ap,
    /// Axial induced velocity.
    U,
    /// Tangential induced velocity.
    V,
    /// Inflow angle.
    Phi,
    /// Angle of attack.
    Alpha,
    /// Inflow speed.
    W,
    /// Lift coefficient.
    Cl,
    /// Drag coefficient.
    Cd,
    /// Normal force coefficient.
    Cn,
    /// Tangential force coefficient.
    Ct,
    /// Hub and tip loss factor.
    F,
    /// Effective loss factor of the induced velocities.
    G,
    /// Rotor thrust.
    Thrust,
    /// Rotor torque.
    Torque,
    /// Rotor power.
    Power,
    /// Propulsive efficiency.
    Efficiency,
}

impl Output {
    /// Name of the output.
    pub fn name(&self) -> &'static str {
        match self {
            Output::Radii => "radii",
            Output::Dradii => "dradii",
            Output::Chord => "chord",
            Output::Theta => "theta",
            Output::Vx => "Vx",
            Output::Vy => "Vy",
            Output::Np => "Np",
            Output::Tp => "Tp",
            Output::A => "a",
            Output::Ap => "ap",
            Output::U => "u",
            Output::V => "v",
            Output::Phi => "phi",
            Output::Alpha => "alpha",
            Output::W => "W",
            Output::Cl => "cl",
            Output::Cd => "cd",
            Output::Cn => "cn",
            Output::Ct => "ct",
            Output::F => "F",
            Output::G => "G",
            Output::Thrust => "thrust",
            Output::Torque => "torque",
            Output::Power => "power",
            Output::Efficiency => "efficiency",
        }
    }

    /// Physical dimension of the output.
    pub fn dimension(&self) -> Dimension {
        match self {
            Output::Radii | Output::Dradii | Output::Chord => Dimension::Length,
            Output::Theta | Output::Phi | Output::Alpha => Dimension::Angle,
            Output::Vx | Output::Vy | Output::U | Output::V | Output::W => Dimension::Velocity,
            Output::Np | Output::Tp => Dimension::ForcePerLength,
            Output::Thrust => Dimension::Force,
            Output::Torque => Dimension::Torque,
            Output::Power => Dimension::Power,
            Output::A
            | Output::Ap
            | Output::Cl
            | Output::Cd
            | Output::Cn
            | Output::Ct
            | Output::F
            | Output::G
            | Output::Efficiency => Dimension::Dimensionless,
        }
    }

    /// Whether the output has one value per node instead of one value per
    /// section.
    pub fn is_rotor_level(&self) -> bool {
        matches!(
            self,
            Output::Thrust | Output::Torque | Output::Power | Output::Efficiency
        )
    }

    fn section_value(&self, out: &SectionOutputs) -> Option<f64> {
        let value = match self {
            Output::Np => out.np,
            Output::Tp => out.tp,
            Output::A => out.a,
            Output::Ap => out.ap,
            Output::U => out.u,
            Output::V => out.v,
            Output::Phi => out.phi,
            Output::Alpha => out.alpha,
            Output::W => out.w,
            Output::Cl => out.cl,
            Output::Cd => out.cd,
            Output::Cn => out.cn,
            Output::Ct => out.ct,
            Output::F => out.f,
            Output::G => out.g,
            _ => return None,
        };

        Some(value)
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Solution of one operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSolution {
    /// Blade geometry.
    pub geometry: Geometry,
    /// Inflow velocities.
    pub inflow: Inflow,
    /// Section solutions and integrated loads.
    pub performance: Performance,
}

impl NodeSolution {
    fn values(&self, output: Output) -> Vec<f64> {
        match output {
            Output::Radii => self.geometry.radii.clone(),
            Output::Dradii => self.geometry.dradii.clone(),
            Output::Chord => self.geometry.chord.clone(),
            Output::Theta => self.geometry.theta.clone(),
            Output::Vx => self.inflow.vx.clone(),
            Output::Vy => self.inflow.vy.clone(),
            Output::Thrust => vec![self.performance.thrust],
            Output::Torque => vec![self.performance.torque],
            Output::Power => vec![self.performance.power],
            Output::Efficiency => vec![self.performance.efficiency],
            _ => self
                .performance
                .sections
                .iter()
                .filter_map(|out| output.section_value(out))
                .collect(),
        }
    }
}

/// Radial load distribution of all blades.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadDistribution {
    /// Radii of the sections (m).
    pub radii: Vec<f64>,
    /// Normal load multiplied by the number of blades (N/m).
    pub normal: Vec<f64>,
    /// Circumferential load multiplied by the number of blades (N/m).
    pub circumferential: Vec<f64>,
}

/// Results of the analysis of all operating points.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    num_blades: usize,
    nodes: Vec<NodeSolution>,
}

impl Solution {
    /// Number of operating points.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Solution of a node.
    pub fn node(&self, node: usize) -> Result<&NodeSolution, ModelError> {
        self.nodes.get(node).ok_or(ModelError::Node {
            node,
            num_nodes: self.nodes.len(),
        })
    }

    /// Values of an output at a node in `unit`. Rotor-level outputs have a
    /// single value.
    pub fn get_val(&self, output: Output, node: usize, unit: &str) -> Result<Vec<f64>, ModelError> {
        let unit = expect_dimension(unit, output.dimension())?;

        Ok(self
            .node(node)?
            .values(output)
            .into_iter()
            .map(|value| unit.from_si(value))
            .collect())
    }

    /// Normal and circumferential loads of all blades along the radius.
    pub fn load_distribution(&self, node: usize) -> Result<LoadDistribution, ModelError> {
        let solution = self.node(node)?;
        let b = self.num_blades as f64;

        Ok(LoadDistribution {
            radii: solution.geometry.radii.clone(),
            normal: solution.performance.sections.iter().map(|s| s.np * b).collect(),
            circumferential: solution.performance.sections.iter().map(|s| s.tp * b).collect(),
        })
    }
}

/// Propeller analysis: geometry, inflow and blade element momentum theory.
#[derive(Debug, Clone)]
pub struct PropellerModel<A> {
    airfoil: A,
    blade: BladeGeometry,
    options: BemOptions,
}

impl<A: Airfoil> PropellerModel<A> {
    /// Creates the model with given airfoil and discretization.
    pub fn new(airfoil: A, num_cp: usize, num_radial: usize) -> Result<Self, ModelError> {
        Self::with_options(airfoil, num_cp, num_radial, BemOptions::default())
    }

    /// Creates the model with given options of the section solution.
    pub fn with_options(
        airfoil: A,
        num_cp: usize,
        num_radial: usize,
        options: BemOptions,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            airfoil,
            blade: BladeGeometry::new(num_cp, num_radial)?,
            options,
        })
    }

    /// Number of control points.
    pub fn num_cp(&self) -> usize {
        self.blade.num_cp()
    }

    /// Number of radial sections.
    pub fn num_radial(&self) -> usize {
        self.blade.num_radial()
    }

    /// Airfoil of the blade.
    pub fn airfoil(&self) -> &A {
        &self.airfoil
    }

    /// Evaluates all operating points.
    pub fn run(&self, inputs: &PropellerInputs) -> Result<Solution, ModelError> {
        if inputs.num_cp() != self.num_cp() {
            return Err(ModelError::Length {
                name: Input::ChordDv.name(),
                expected: self.num_cp(),
                actual: inputs.num_cp(),
            });
        }

        let precone = inputs.si(Input::Precone)[0];
        let chord_dv = inputs.si(Input::ChordDv);
        let theta_dv = inputs.si(Input::ThetaDv);

        let nodes = (0..inputs.num_nodes())
            .map(|node| -> Result<NodeSolution, ModelError> {
                let at = |input: Input| inputs.si(input)[node];

                let geometry = self.blade.evaluate(
                    at(Input::HubDiameter),
                    at(Input::PropDiameter),
                    chord_dv,
                    theta_dv,
                    at(Input::Pitch),
                )?;

                let inflow = simple_inflow(at(Input::V), at(Input::Omega), &geometry.radii, precone);

                let rotor = Rotor {
                    hub_radius: geometry.hub_radius,
                    tip_radius: geometry.tip_radius,
                    num_blades: inputs.num_blades(),
                    precone,
                    turbine: false,
                };

                let bem = Bem::with_options(rotor, &self.airfoil, self.options.clone());
                let sections = Section::from_geometry(&geometry);
                let ops =
                    OperatingPoint::from_inflow(&inflow, at(Input::Rho), at(Input::Mu), at(Input::Asound));

                let performance =
                    bem.performance(&sections, &ops, at(Input::V), at(Input::Omega), at(Input::Rho));

                debug!(
                    "node {}: thrust = {} N, efficiency = {}",
                    node, performance.thrust, performance.efficiency
                );

                Ok(NodeSolution {
                    geometry,
                    inflow,
                    performance,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        Ok(Solution {
            num_blades: inputs.num_blades(),
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::airfoil::{AirfoilTable, Polar};

    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn inputs(num_nodes: usize) -> PropellerInputs {
        let mut inputs = PropellerInputs::new(num_nodes, 6, 3);
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

    #[test]
    fn inputs_are_stored_in_si() {
        let inputs = inputs(1);

        assert_abs_diff_eq!(inputs.si(Input::HubDiameter)[0], 0.3, epsilon = 1e-15);
        assert_relative_eq!(inputs.si(Input::ThetaDv)[0], 65f64.to_radians());
        assert_relative_eq!(inputs.get(Input::ChordDv, "mm").unwrap()[3], 100.0, epsilon = 1e-12);
        assert_eq!(inputs.si(Input::Precone), &[0.0]);
    }

    #[test]
    fn input_errors() {
        let mut inputs = inputs(1);

        assert!(matches!(
            inputs.set(Input::ChordDv, &[1.0, 2.0], "cm"),
            Err(ModelError::Length {
                name: "chord_dv",
                expected: 6,
                actual: 2
            })
        ));
        assert!(matches!(
            inputs.fill(Input::ChordDv, 1.0, "rad"),
            Err(ModelError::Unit(UnitError::IncompatibleUnits { .. }))
        ));
        assert!(matches!(
            inputs.get(Input::V, "parsec"),
            Err(ModelError::Unit(UnitError::UnknownUnit(_)))
        ));
    }

    #[test]
    fn solution_values_and_units() {
        let solution = model().run(&inputs(1)).unwrap();

        let radii_m = solution.get_val(Output::Radii, 0, "m").unwrap();
        let radii_cm = solution.get_val(Output::Radii, 0, "cm").unwrap();
        assert_eq!(radii_m.len(), 15);
        assert_relative_eq!(radii_cm[0], radii_m[0] * 100.0, epsilon = 1e-12);

        let thrust = solution.get_val(Output::Thrust, 0, "N").unwrap();
        let thrust_kn = solution.get_val(Output::Thrust, 0, "kN").unwrap();
        assert_eq!(thrust.len(), 1);
        assert!(thrust[0] > 0.0);
        assert_relative_eq!(thrust_kn[0] * 1e3, thrust[0], epsilon = 1e-9);

        let power = solution.get_val(Output::Power, 0, "W").unwrap()[0];
        let torque = solution.get_val(Output::Torque, 0, "N*m").unwrap()[0];
        assert_relative_eq!(power, torque * 236.0, epsilon = 1e-9);

        let efficiency = solution.get_val(Output::Efficiency, 0, "").unwrap()[0];
        assert_relative_eq!(efficiency, thrust[0] * 77.2 / power, epsilon = 1e-12);

        assert_eq!(solution.get_val(Output::Cl, 0, "unitless").unwrap().len(), 15);
    }

    #[test]
    fn load_distribution_integrates_to_thrust() {
        let solution = model().run(&inputs(1)).unwrap();
        let loads = solution.load_distribution(0).unwrap();
        let dradii = solution.get_val(Output::Dradii, 0, "m").unwrap();

        let thrust: f64 = loads
            .normal
            .iter()
            .zip(dradii.iter())
            .map(|(np, dr)| np * dr)
            .sum();
        let torque: f64 = loads
            .circumferential
            .iter()
            .zip(dradii.iter().zip(loads.radii.iter()))
            .map(|(tp, (dr, r))| tp * r * dr)
            .sum();

        assert_relative_eq!(thrust, solution.get_val(Output::Thrust, 0, "N").unwrap()[0], epsilon = 1e-9);
        assert_relative_eq!(torque, solution.get_val(Output::Torque, 0, "N*m").unwrap()[0], epsilon = 1e-9);
    }

    #[test]
    fn nodes_are_independent() {
        let mut inputs = inputs(2);
        inputs.set(Input::V, &[77.2, 90.0], "m/s").unwrap();

        let solution = model().run(&inputs).unwrap();
        assert_eq!(solution.num_nodes(), 2);

        let single = model().run(&self::inputs(1)).unwrap();
        assert_eq!(
            solution.get_val(Output::Thrust, 0, "N").unwrap(),
            single.get_val(Output::Thrust, 0, "N").unwrap()
        );

        // Higher advance ratio gives less thrust.
        let slow = solution.get_val(Output::Thrust, 0, "N").unwrap()[0];
        let fast = solution.get_val(Output::Thrust, 1, "N").unwrap()[0];
        assert!(fast < slow);
    }

    #[test]
    fn output_errors() {
        let solution = model().run(&inputs(1)).unwrap();

        assert!(matches!(
            solution.get_val(Output::Thrust, 1, "N"),
            Err(ModelError::Node {
                node: 1,
                num_nodes: 1
            })
        ));
        assert!(matches!(
            solution.get_val(Output::Thrust, 0, "W"),
            Err(ModelError::Unit(_))
        ));
    }

    #[test]
    fn invalid_geometry() {
        let mut inputs = inputs(1);
        inputs.fill(Input::PropDiameter, 20.0, "cm").unwrap();

        assert!(matches!(
            model().run(&inputs),
            Err(ModelError::Geometry(GeometryError::InvalidSpan { .. }))
        ));
    }
}
